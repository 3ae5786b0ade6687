use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use pt::{
    AdapterInfo, AdapterPropertiesMemoryHeaps, AdapterPropertiesSubgroupMatrixConfigs,
    AdapterType, BackendType, DeviceLostReason, DrmFormatCapabilities, FeatureLevel, FeatureName,
    FormatCapabilities, InstanceFeatureName, InstanceLimits, Limits, PowerPreference,
    RequestAdapterStatus, RequestDeviceStatus, SupportedFeatures, SupportedInstanceFeatures,
    SupportedWgslLanguageFeatures, TextureFormat, WaitStatus, WgslLanguageFeatureName,
};
use thiserror::Error;

use crate::{
    api::{AdapterDescription, Api, ApiInfo},
    api_log,
    device::{global::register_device, resource::Device, DeviceDescriptor},
    error::FailedLimit,
    event::{CallbackInfo, EventManager, EventOutcome, FutureId, FutureWaitInfo},
    global::Global,
    hub::Hub,
    id::{self, AdapterId, DeviceId},
    resource::{Resource, ResourceInfo},
    storage::InvalidId,
};

/// Describes an [`Instance`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstanceDescriptor {
    pub required_features: Vec<InstanceFeatureName>,
    /// Limits to enable. When `None`, enabling
    /// [`InstanceFeatureName::TimedWaitAny`] enables the best limits of the
    /// backend.
    pub required_limits: Option<InstanceLimits>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CreateInstanceError {
    #[error("Instance feature {0:?} is not supported")]
    MissingFeature(InstanceFeatureName),
    #[error(transparent)]
    Limit(#[from] FailedLimit),
}

#[derive(Debug)]
pub struct Instance {
    pub(crate) info: ResourceInfo,
    pub(crate) api: ApiInfo,
    pub(crate) features: SupportedInstanceFeatures,
    pub(crate) limits: InstanceLimits,
    pub(crate) events: EventManager,
}

impl Resource for Instance {
    type Marker = id::markers::Instance;
    const TYPE: &'static str = "Instance";

    fn info(&self) -> &ResourceInfo {
        &self.info
    }

    fn on_release(&self, _hub: &Hub) {
        self.events.cancel_all();
    }
}

impl Instance {
    fn new(api: ApiInfo, desc: &InstanceDescriptor) -> Result<Self, CreateInstanceError> {
        for &feature in &desc.required_features {
            if !api.instance_features.contains(feature) {
                return Err(CreateInstanceError::MissingFeature(feature));
            }
        }

        let features = desc
            .required_features
            .iter()
            .copied()
            .collect::<SupportedInstanceFeatures>();

        let limits = match desc.required_limits {
            Some(limits) => {
                let allowed = api.instance_limits.timed_wait_any_max_count;

                if limits.timed_wait_any_max_count > allowed {
                    return Err(FailedLimit {
                        name: "timed_wait_any_max_count",
                        requested: limits.timed_wait_any_max_count as u64,
                        allowed: allowed as u64,
                    }
                    .into());
                }

                limits
            }
            None if features.contains(InstanceFeatureName::TimedWaitAny) => api.instance_limits,
            None => InstanceLimits::default(),
        };

        Ok(Self {
            info: ResourceInfo::new(None, false),
            api,
            features,
            limits,
            events: EventManager::new(),
        })
    }

    pub(crate) fn has_feature(&self, feature: InstanceFeatureName) -> bool {
        self.features.contains(feature)
    }

    fn wait_any(&self, futures: &mut [FutureWaitInfo], timeout: Duration) -> WaitStatus {
        if !timeout.is_zero() {
            if !self.has_feature(InstanceFeatureName::TimedWaitAny) {
                log::warn!("Timed wait any requires the TimedWaitAny instance feature");
                return WaitStatus::Error;
            }

            if futures.len() > self.limits.timed_wait_any_max_count {
                log::warn!(
                    "Timed wait any on {} futures exceeds the limit of {}",
                    futures.len(),
                    self.limits.timed_wait_any_max_count
                );
                return WaitStatus::Error;
            }
        }

        self.events.wait_any(futures, timeout)
    }
}

/// Options used to pick an adapter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestAdapterOptions {
    pub feature_level: FeatureLevel,
    pub power_preference: PowerPreference,
    /// Only consider software adapters.
    pub force_fallback_adapter: bool,
    /// Only consider adapters of this type, unless `Undefined`.
    pub backend_type: BackendType,
    pub compatible_surface: Option<id::SurfaceId>,
}

pub type RequestAdapterCallback = Box<dyn FnOnce(RequestAdapterStatus, Option<AdapterId>, &str) + Send>;
pub type RequestAdapterCallbackInfo = CallbackInfo<RequestAdapterCallback>;

pub type RequestDeviceCallback = Box<dyn FnOnce(RequestDeviceStatus, Option<DeviceId>, &str) + Send>;
pub type RequestDeviceCallbackInfo = CallbackInfo<RequestDeviceCallback>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RequestDeviceError {
    #[error("Feature {0:?} is not supported by the adapter")]
    UnsupportedFeature(FeatureName),
    #[error(transparent)]
    LimitsExceeded(#[from] FailedLimit),
    #[error("Adapter has already been used to create a device")]
    AdapterConsumed,
}

#[derive(Debug)]
pub struct Adapter {
    pub(crate) info: ResourceInfo,
    pub(crate) instance: Arc<Instance>,
    pub(crate) desc: AdapterDescription,
    consumed: Mutex<bool>,
}

crate::resource::impl_resource_type!(Adapter, Adapter, "Adapter");

impl Adapter {
    fn new(instance: &Arc<Instance>, desc: AdapterDescription) -> Self {
        Self {
            info: ResourceInfo::new(None, false),
            instance: instance.clone(),
            desc,
            consumed: Mutex::new(false),
        }
    }

    pub(crate) fn events(&self) -> &EventManager {
        &self.instance.events
    }

    /// Validate a device descriptor against the adapter, consuming the
    /// adapter on success.
    pub(crate) fn check_device_descriptor(&self, desc: &DeviceDescriptor) -> Result<(), RequestDeviceError> {
        for &feature in &desc.required_features {
            if !self.desc.has_feature(feature) {
                return Err(RequestDeviceError::UnsupportedFeature(feature));
            }
        }

        if let Some(limits) = &desc.required_limits {
            let mut failed = None;
            limits.check_limits_with_fail_fn(&self.desc.limits, true, |name, requested, allowed| {
                failed = Some(FailedLimit {
                    name,
                    requested,
                    allowed,
                });
            });

            if let Some(failed) = failed {
                return Err(failed.into());
            }
        }

        let multiple = self
            .instance
            .has_feature(InstanceFeatureName::MultipleDevicesPerAdapter);

        let mut consumed = self.consumed.lock();

        if *consumed && !multiple {
            return Err(RequestDeviceError::AdapterConsumed);
        }

        *consumed = true;
        Ok(())
    }

    fn create_device(self: &Arc<Self>, hub: &Hub, desc: DeviceDescriptor) -> Result<DeviceId, RequestDeviceError> {
        if let Err(err) = self.check_device_descriptor(&desc) {
            if let Some(CallbackInfo { mode, callback }) = desc.device_lost_callback_info {
                let message = err.to_string();

                self.events().track(mode, true, move |outcome| match outcome {
                    EventOutcome::Ready => callback(DeviceLostReason::FailedCreation, &message),
                    EventOutcome::Cancelled => {
                        callback(DeviceLostReason::CallbackCancelled, "Instance dropped.")
                    }
                });
            }

            return Err(err);
        }

        let queue_label = desc.default_queue_label.clone().map(|label| label.into_owned());
        let device = Device::new(self, desc);
        Ok(register_device(hub, device, queue_label.as_deref()))
    }
}

impl Global {
    fn instance_api<A: Api>(&self) -> ApiInfo {
        profiling::scope!("Global::instance_api");
        ApiInfo::of::<A>()
    }

    pub fn create_instance<A: Api>(
        &self,
        desc: Option<&InstanceDescriptor>,
    ) -> Result<id::InstanceId, CreateInstanceError> {
        api_log!("create_instance {:?}", A::VARIANT);

        let default = InstanceDescriptor::default();
        let instance = Instance::new(self.instance_api::<A>(), desc.unwrap_or(&default))?;
        let (id, _) = self.hub.instances.register(instance);
        Ok(id)
    }

    pub fn get_instance_features<A: Api>(&self) -> SupportedInstanceFeatures {
        A::instance_features()
    }

    pub fn get_instance_limits<A: Api>(&self) -> InstanceLimits {
        A::instance_limits()
    }

    pub fn has_instance_feature<A: Api>(&self, feature: InstanceFeatureName) -> bool {
        A::instance_features().contains(feature)
    }

    pub fn adapter_create_device(
        &self,
        adapter_id: AdapterId,
        desc: DeviceDescriptor,
    ) -> Result<Option<DeviceId>, InvalidId> {
        profiling::scope!("Adapter::create_device");
        api_log!("Adapter::create_device {adapter_id:?}");

        let adapter = self.hub.adapters.get(adapter_id)?;

        match adapter.create_device(&self.hub, desc) {
            Ok(id) => Ok(Some(id)),
            Err(err) => {
                log::warn!("Failed to create device: {err}");
                Ok(None)
            }
        }
    }

    pub fn adapter_get_features(&self, adapter_id: AdapterId) -> Result<SupportedFeatures, InvalidId> {
        Ok(self.hub.adapters.get(adapter_id)?.desc.features.clone())
    }

    pub fn adapter_get_format_capabilities(
        &self,
        adapter_id: AdapterId,
        format: TextureFormat,
    ) -> Result<FormatCapabilities, InvalidId> {
        Ok(self
            .hub
            .adapters
            .get(adapter_id)?
            .desc
            .format_capabilities(format))
    }

    pub fn adapter_get_info(&self, adapter_id: AdapterId) -> Result<AdapterInfo, InvalidId> {
        Ok(self.hub.adapters.get(adapter_id)?.desc.info.clone())
    }

    /// Get a new reference to the instance the adapter came from.
    pub fn adapter_get_instance(&self, adapter_id: AdapterId) -> Result<id::InstanceId, InvalidId> {
        let adapter = self.hub.adapters.get(adapter_id)?;
        Ok(self.hub.instances.acquire(&adapter.instance))
    }

    pub fn adapter_get_limits(&self, adapter_id: AdapterId) -> Result<Limits, InvalidId> {
        Ok(self.hub.adapters.get(adapter_id)?.desc.limits)
    }

    pub fn adapter_has_feature(&self, adapter_id: AdapterId, feature: FeatureName) -> Result<bool, InvalidId> {
        Ok(self.hub.adapters.get(adapter_id)?.desc.has_feature(feature))
    }

    pub fn adapter_request_device(
        &self,
        adapter_id: AdapterId,
        desc: DeviceDescriptor,
        callback_info: RequestDeviceCallbackInfo,
    ) -> Result<FutureId, InvalidId> {
        profiling::scope!("Adapter::request_device");
        api_log!("Adapter::request_device {adapter_id:?}");

        let adapter = self.hub.adapters.get(adapter_id)?;
        let CallbackInfo { mode, callback } = callback_info;

        let result = adapter
            .create_device(&self.hub, desc)
            .map_err(|err| err.to_string());

        let hub = Arc::downgrade(&self.hub);

        Ok(adapter.events().track(mode, true, move |outcome| match (outcome, result) {
            (EventOutcome::Ready, Ok(id)) => callback(RequestDeviceStatus::Success, Some(id), ""),
            (EventOutcome::Ready, Err(message)) => {
                callback(RequestDeviceStatus::Error, None, &message)
            }
            (EventOutcome::Cancelled, result) => {
                // The device was registered eagerly, drop the reference the
                // callback would have handed out.
                if let (Ok(id), Some(hub)) = (result, hub.upgrade()) {
                    if let Ok(Some(device)) = hub.devices.release(id) {
                        device.on_release(&hub);
                    }
                }

                callback(
                    RequestDeviceStatus::CallbackCancelled,
                    None,
                    "Instance dropped before the device was delivered.",
                )
            }
        }))
    }

    pub fn adapter_info_free_members(&self, value: AdapterInfo) {
        drop(value);
    }

    pub fn adapter_properties_memory_heaps_free_members(&self, value: AdapterPropertiesMemoryHeaps) {
        drop(value);
    }

    pub fn adapter_properties_subgroup_matrix_configs_free_members(
        &self,
        value: AdapterPropertiesSubgroupMatrixConfigs,
    ) {
        drop(value);
    }

    pub fn dawn_drm_format_capabilities_free_members(&self, value: DrmFormatCapabilities) {
        drop(value);
    }

    pub fn supported_features_free_members(&self, value: SupportedFeatures) {
        drop(value);
    }

    pub fn supported_instance_features_free_members(&self, value: SupportedInstanceFeatures) {
        drop(value);
    }

    pub fn supported_wgsl_language_features_free_members(&self, value: SupportedWgslLanguageFeatures) {
        drop(value);
    }

    pub fn instance_get_wgsl_language_features(
        &self,
        instance_id: id::InstanceId,
    ) -> Result<SupportedWgslLanguageFeatures, InvalidId> {
        Ok(self
            .hub
            .instances
            .get(instance_id)?
            .api
            .wgsl_language_features
            .clone())
    }

    pub fn instance_has_wgsl_language_feature(
        &self,
        instance_id: id::InstanceId,
        feature: WgslLanguageFeatureName,
    ) -> Result<bool, InvalidId> {
        Ok(self
            .hub
            .instances
            .get(instance_id)?
            .api
            .wgsl_language_features
            .contains(feature))
    }

    /// Deliver the callbacks of every ready future that allows it.
    pub fn instance_process_events(&self, instance_id: id::InstanceId) -> Result<(), InvalidId> {
        profiling::scope!("Instance::process_events");
        let instance = self.hub.instances.get(instance_id)?;
        let fired = instance.events.process_events();
        api_log!("Instance::process_events {instance_id:?} fired {fired}");
        Ok(())
    }

    /// Request an adapter matching `options`.
    ///
    /// The adapter handle is only created once the callback is delivered.
    pub fn instance_request_adapter(
        &self,
        instance_id: id::InstanceId,
        options: Option<&RequestAdapterOptions>,
        callback_info: RequestAdapterCallbackInfo,
    ) -> Result<FutureId, InvalidId> {
        profiling::scope!("Instance::request_adapter");
        api_log!("Instance::request_adapter {instance_id:?}");

        let instance = self.hub.instances.get(instance_id)?;
        let default = RequestAdapterOptions::default();
        let options = options.unwrap_or(&default);

        let selected = match options.compatible_surface {
            Some(surface_id) if !self.hub.surfaces.contains(surface_id) => {
                Err(RequestAdapterStatus::Error)
            }
            _ => instance
                .api
                .adapters
                .iter()
                .find(|adapter| {
                    let fallback = !options.force_fallback_adapter
                        || adapter.info.adapter_type == AdapterType::Cpu;
                    let backend = options.backend_type == BackendType::Undefined
                        || options.backend_type == adapter.info.backend_type;
                    fallback && backend
                })
                .cloned()
                .ok_or(RequestAdapterStatus::Unavailable),
        };

        let hub = Arc::downgrade(&self.hub);
        let weak_instance = Arc::downgrade(&instance);
        let CallbackInfo { mode, callback } = callback_info;

        Ok(instance.events.track(mode, true, move |outcome| {
            if outcome == EventOutcome::Cancelled {
                callback(
                    RequestAdapterStatus::CallbackCancelled,
                    None,
                    "Instance dropped before the adapter was delivered.",
                );
                return;
            }

            match (selected, hub.upgrade(), weak_instance.upgrade()) {
                (Ok(desc), Some(hub), Some(instance)) => {
                    let (id, _) = hub
                        .adapters
                        .register(Adapter::new(&instance, desc));
                    callback(RequestAdapterStatus::Success, Some(id), "");
                }
                (Ok(_), _, _) => callback(
                    RequestAdapterStatus::CallbackCancelled,
                    None,
                    "Instance dropped before the adapter was delivered.",
                ),
                (Err(RequestAdapterStatus::Unavailable), _, _) => callback(
                    RequestAdapterStatus::Unavailable,
                    None,
                    "No supported adapters are available.",
                ),
                (Err(status), _, _) => callback(status, None, "Compatible surface is invalid."),
            }
        }))
    }

    /// Wait for any of `futures` to complete, delivering their callbacks.
    ///
    /// A `timeout_ns` of zero only polls. `u64::MAX` waits forever.
    pub fn instance_wait_any(
        &self,
        instance_id: id::InstanceId,
        futures: &mut [FutureWaitInfo],
        timeout_ns: u64,
    ) -> Result<WaitStatus, InvalidId> {
        profiling::scope!("Instance::wait_any");
        api_log!("Instance::wait_any {instance_id:?} count {} timeout {timeout_ns}", futures.len());

        let instance = self.hub.instances.get(instance_id)?;
        Ok(instance.wait_any(futures, Duration::from_nanos(timeout_ns)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Null;

    #[test]
    fn timed_wait_any_enables_backend_limits() {
        let desc = InstanceDescriptor {
            required_features: vec![InstanceFeatureName::TimedWaitAny],
            required_limits: None,
        };

        let instance = Instance::new(ApiInfo::of::<Null>(), &desc).unwrap();
        assert_eq!(instance.limits.timed_wait_any_max_count, 64);

        let instance = Instance::new(ApiInfo::of::<Null>(), &InstanceDescriptor::default()).unwrap();
        assert_eq!(instance.limits.timed_wait_any_max_count, 0);

        let mut futures = [FutureWaitInfo::new(FutureId(1))];
        assert_eq!(
            instance.wait_any(&mut futures, Duration::from_millis(1)),
            WaitStatus::Error
        );
    }

    #[test]
    fn wait_any_on_no_futures() {
        let desc = InstanceDescriptor {
            required_features: vec![InstanceFeatureName::TimedWaitAny],
            required_limits: None,
        };

        let instance = Instance::new(ApiInfo::of::<Null>(), &desc).unwrap();
        assert_eq!(instance.wait_any(&mut [], Duration::ZERO), WaitStatus::Success);
        assert_eq!(
            instance.wait_any(&mut [], Duration::from_nanos(u64::MAX)),
            WaitStatus::Success
        );
    }

    #[test]
    fn instance_limits_are_checked() {
        let desc = InstanceDescriptor {
            required_features: Vec::new(),
            required_limits: Some(InstanceLimits {
                timed_wait_any_max_count: 65,
            }),
        };

        match Instance::new(ApiInfo::of::<Null>(), &desc) {
            Err(CreateInstanceError::Limit(failed)) => {
                assert_eq!(failed.name, "timed_wait_any_max_count")
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

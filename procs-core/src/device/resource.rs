use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use pt::{
    CallbackMode, DeviceLostReason, ErrorFilter, ErrorType, FeatureName, Limits, LoggingType,
    PopErrorScopeStatus, SupportedFeatures,
};

use crate::{
    device::{DeviceDescriptor, LoggingCallback, PopErrorScopeError, UncapturedErrorCallback},
    error::{Error, MissingFeature},
    event::{CallbackInfo, EventManager, EventOutcome, FutureId},
    hub::Hub,
    id::{self, QueueId},
    instance::Adapter,
    resource::{Resource, ResourceInfo},
    resource_log, LabelHelpers,
};

type LostState = Arc<Mutex<Option<(DeviceLostReason, String)>>>;

#[derive(Debug)]
struct ErrorScope {
    filter: ErrorFilter,
    error: Option<Error>,
}

/// Structure describing a logical device.
///
/// The device owns the error sink every validation error of the objects
/// created from it is reported to, and the lost state shared with its lost
/// future.
pub struct Device {
    pub(crate) info: ResourceInfo,
    pub(crate) adapter: Arc<Adapter>,
    pub(crate) features: SupportedFeatures,
    pub(crate) limits: Limits,
    /// The default queue, which holds one reference on behalf of the device.
    pub(crate) queue_id: OnceCell<QueueId>,
    lost_future: FutureId,
    lost: LostState,
    error_scopes: Mutex<Vec<ErrorScope>>,
    uncaptured_error_callback: Option<UncapturedErrorCallback>,
    logging_callback: Mutex<Option<Arc<LoggingCallback>>>,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("label", &self.info.label())
            .field("features", &self.features)
            .field("lost", &self.lost.lock())
            .finish_non_exhaustive()
    }
}

impl Resource for Device {
    type Marker = id::markers::Device;
    const TYPE: &'static str = "Device";

    fn info(&self) -> &ResourceInfo {
        &self.info
    }

    fn on_release(&self, hub: &Hub) {
        self.lose(DeviceLostReason::Destroyed, "Device was released.");

        if let Some(&queue_id) = self.queue_id.get() {
            if let Ok(Some(queue)) = hub.queues.release(queue_id) {
                queue.on_release(hub);
            }
        }
    }
}

impl Device {
    pub(crate) fn new(adapter: &Arc<Adapter>, desc: DeviceDescriptor) -> Self {
        let lost = LostState::default();

        let lost_future = match desc.device_lost_callback_info {
            Some(CallbackInfo { mode, callback }) => {
                let lost = lost.clone();

                adapter.events().track(mode, false, move |outcome| match outcome {
                    EventOutcome::Ready => {
                        let (reason, message) = lost
                            .lock()
                            .clone()
                            .unwrap_or((DeviceLostReason::Unknown, String::new()));
                        callback(reason, &message);
                    }
                    EventOutcome::Cancelled => callback(
                        DeviceLostReason::CallbackCancelled,
                        "Instance dropped before the device was lost.",
                    ),
                })
            }
            None => adapter
                .events()
                .track(CallbackMode::AllowProcessEvents, false, |_| {}),
        };

        Self {
            info: ResourceInfo::new(desc.label.borrow_option(), false),
            adapter: adapter.clone(),
            features: desc.required_features.iter().copied().collect(),
            limits: desc.required_limits.unwrap_or_default(),
            queue_id: OnceCell::new(),
            lost_future,
            lost,
            error_scopes: Mutex::new(Vec::new()),
            uncaptured_error_callback: desc.uncaptured_error_callback,
            logging_callback: Mutex::new(None),
        }
    }

    pub(crate) fn events(&self) -> &EventManager {
        self.adapter.events()
    }

    pub(crate) fn has_feature(&self, feature: FeatureName) -> bool {
        self.features.contains(feature)
    }

    pub(crate) fn require_feature(&self, feature: FeatureName) -> Result<(), MissingFeature> {
        if self.has_feature(feature) {
            Ok(())
        } else {
            Err(MissingFeature(feature))
        }
    }

    pub(crate) fn lost_future(&self) -> FutureId {
        self.lost_future
    }

    pub(crate) fn is_lost(&self) -> bool {
        self.lost.lock().is_some()
    }

    /// Lose the device, making its lost future ready. Only the first loss
    /// counts.
    pub(crate) fn lose(&self, reason: DeviceLostReason, message: &str) {
        {
            let mut lost = self.lost.lock();

            if lost.is_some() {
                return;
            }

            *lost = Some((reason, message.to_owned()));
        }

        resource_log!("Device::lose {:?} {reason:?}: {message}", self.info.label());
        self.events().set_ready(self.lost_future);
    }

    /// Route an error to the innermost scope capturing it, or to the
    /// uncaptured error callback.
    ///
    /// Errors of a lost device are dropped.
    pub(crate) fn handle_error(&self, error: Error) {
        if self.is_lost() {
            return;
        }

        {
            let mut scopes = self.error_scopes.lock();

            if let Some(scope) = scopes
                .iter_mut()
                .rev()
                .find(|scope| error.matches(scope.filter))
            {
                scope.error.get_or_insert(error);
                return;
            }
        }

        match &self.uncaptured_error_callback {
            Some(callback) => callback(error.error_type(), error.message()),
            None => log::warn!(
                "Uncaptured {:?} error on device {:?}: {}",
                error.error_type(),
                self.info.label(),
                error.message()
            ),
        }
    }

    /// Report a validation error.
    pub(crate) fn validation_error(&self, err: impl std::error::Error + 'static) {
        self.handle_error(Error::validation(err));
    }

    pub(crate) fn push_error_scope(&self, filter: ErrorFilter) {
        self.error_scopes.lock().push(ErrorScope {
            filter,
            error: None,
        });
    }

    /// Pop the innermost error scope, returning what its callback receives.
    pub(crate) fn pop_error_scope(&self) -> (PopErrorScopeStatus, ErrorType, String) {
        let scope = self.error_scopes.lock().pop();

        match scope {
            // A lost device behaves as if every scope was empty.
            _ if self.is_lost() => (PopErrorScopeStatus::Success, ErrorType::NoError, String::new()),
            Some(ErrorScope {
                error: Some(error), ..
            }) => (
                PopErrorScopeStatus::Success,
                error.error_type(),
                error.message().to_owned(),
            ),
            Some(ErrorScope { error: None, .. }) => {
                (PopErrorScopeStatus::Success, ErrorType::NoError, String::new())
            }
            None => (
                PopErrorScopeStatus::Error,
                ErrorType::NoError,
                PopErrorScopeError::Empty.to_string(),
            ),
        }
    }

    pub(crate) fn set_logging_callback(&self, callback: Option<LoggingCallback>) {
        *self.logging_callback.lock() = callback.map(Arc::new);
    }

    /// Send a message to the logging callback, if there is one.
    pub(crate) fn log(&self, ty: LoggingType, message: &str) {
        let callback = self.logging_callback.lock().clone();

        match callback {
            Some(callback) => callback(ty, message),
            None => log::debug!("{ty:?}: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{api::Null, global::Global, instance::RequestAdapterCallbackInfo};

    fn device(global: &Global, desc: DeviceDescriptor) -> Arc<Device> {
        let instance = global.create_instance::<Null>(None).unwrap();
        let adapter = Arc::new(Mutex::new(None));

        let slot = adapter.clone();
        global
            .instance_request_adapter(
                instance,
                None,
                RequestAdapterCallbackInfo::new(
                    CallbackMode::AllowSpontaneous,
                    Box::new(move |_, id, _| *slot.lock() = id),
                ),
            )
            .unwrap();

        let adapter = adapter.lock().take().unwrap();
        let device = global.adapter_create_device(adapter, desc).unwrap().unwrap();
        global.hub.devices.get(device).unwrap()
    }

    #[test]
    fn innermost_matching_scope_captures() {
        let global = Global::new();
        let device = device(&global, DeviceDescriptor::default());

        device.push_error_scope(ErrorFilter::Validation);
        device.push_error_scope(ErrorFilter::OutOfMemory);
        device.handle_error(Error::Validation(String::from("first")));
        device.handle_error(Error::Validation(String::from("second")));

        let (status, ty, _) = device.pop_error_scope();
        assert_eq!((status, ty), (PopErrorScopeStatus::Success, ErrorType::NoError));

        let (status, ty, message) = device.pop_error_scope();
        assert_eq!((status, ty), (PopErrorScopeStatus::Success, ErrorType::Validation));
        assert_eq!(message, "first");

        let (status, _, _) = device.pop_error_scope();
        assert_eq!(status, PopErrorScopeStatus::Error);
    }

    #[test]
    fn lost_device_drops_errors() {
        let count = Arc::new(AtomicUsize::new(0));
        let global = Global::new();

        let counter = count.clone();
        let device = device(
            &global,
            DeviceDescriptor {
                uncaptured_error_callback: Some(Box::new(move |_, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })),
                ..Default::default()
            },
        );

        device.handle_error(Error::Validation(String::from("seen")));
        device.lose(DeviceLostReason::Unknown, "lost");
        device.handle_error(Error::Validation(String::from("dropped")));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(device.is_lost());
    }
}

use std::sync::Arc;

use pt::{
    AdapterInfo, CreatePipelineAsyncStatus, DeviceLostReason, ErrorFilter, ErrorType, FeatureName,
    Limits, PopErrorScopeStatus, SupportedFeatures,
};

use crate::{
    api_log,
    binding_model::{
        BindGroup, BindGroupDescriptor, BindGroupLayout, BindGroupLayoutDescriptor,
        PipelineLayout, PipelineLayoutDescriptor, ResourceTable, ResourceTableDescriptor,
    },
    command::{
        CommandEncoder, CommandEncoderDescriptor, RenderBundleEncoder,
        RenderBundleEncoderDescriptor,
    },
    device::{
        queue::Queue, AHardwareBufferProperties, Device, DeviceError, LoggingCallback,
        PopErrorScopeCallbackInfo,
    },
    error::Error,
    event::{CallbackInfo, EventOutcome, FutureId},
    global::Global,
    hub::Hub,
    id::{self, DeviceId, Id},
    pipeline::{
        ComputePipeline, ComputePipelineDescriptor, CreateComputePipelineAsyncCallbackInfo,
        CreateRenderPipelineAsyncCallbackInfo, RenderPipeline, RenderPipelineDescriptor,
        ShaderModule, ShaderModuleDescriptor,
    },
    registry::Registry,
    resource::{
        self, Buffer, BufferDescriptor, ExternalTexture, ExternalTextureDescriptor, QuerySet,
        QuerySetDescriptor, Resource, Sampler, SamplerDescriptor, Texture, TextureDescriptor,
    },
    shared::{
        SharedBufferMemory, SharedBufferMemoryDescriptor, SharedFence, SharedFenceDescriptor,
        SharedTextureMemory, SharedTextureMemoryDescriptor,
    },
    resource_log,
    storage::InvalidId,
    LabelHelpers as _,
};

/// Register a new device together with its default queue.
pub(crate) fn register_device(hub: &Hub, device: Device, queue_label: Option<&str>) -> DeviceId {
    let (id, device) = hub.devices.register(device);
    let (queue_id, _) = hub.queues.register(Queue::new(&device, queue_label));

    if device.queue_id.set(queue_id).is_err() {
        log::error!("Device {id:?} already has a default queue");
    }

    resource_log!("Device::new {id:?} with queue {queue_id:?}");
    id
}

type AsyncPipelineCallback<T> = Box<
    dyn FnOnce(CreatePipelineAsyncStatus, Option<Id<<T as Resource>::Marker>>, &str) + Send,
>;

/// Deliver the outcome of an async pipeline creation.
///
/// The pipeline is registered eagerly. If the callback is cancelled the
/// reference it would have handed out is released again.
fn track_pipeline<T: Resource>(
    hub: &Arc<Hub>,
    device: &Device,
    result: Result<Id<T::Marker>, String>,
    registry: fn(&Hub) -> &Registry<T>,
    callback_info: CallbackInfo<AsyncPipelineCallback<T>>,
) -> FutureId {
    let CallbackInfo { mode, callback } = callback_info;
    let hub = Arc::downgrade(hub);

    device
        .events()
        .track(mode, true, move |outcome| match (outcome, result) {
            (EventOutcome::Ready, Ok(id)) => {
                callback(CreatePipelineAsyncStatus::Success, Some(id), "")
            }
            (EventOutcome::Ready, Err(message)) => {
                callback(CreatePipelineAsyncStatus::ValidationError, None, &message)
            }
            (EventOutcome::Cancelled, result) => {
                if let (Ok(id), Some(hub)) = (result, hub.upgrade()) {
                    if let Ok(Some(pipeline)) = registry(&hub).release(id) {
                        pipeline.on_release(&hub);
                    }
                }

                callback(
                    CreatePipelineAsyncStatus::CallbackCancelled,
                    None,
                    "Instance dropped before the pipeline was delivered.",
                )
            }
        })
}

impl Global {
    pub fn device_create_bind_group(
        &self,
        device_id: DeviceId,
        desc: &BindGroupDescriptor,
    ) -> Result<id::BindGroupId, InvalidId> {
        profiling::scope!("Device::create_bind_group");
        api_log!("Device::create_bind_group {device_id:?}");

        let device = self.hub.devices.get(device_id)?;

        let bind_group = match BindGroup::create(&self.hub, &device, desc) {
            Ok(bind_group) => bind_group,
            Err(err) => {
                device.validation_error(err);
                BindGroup::error(&device, desc.label.borrow_option())
            }
        };

        let (id, _) = self.hub.bind_groups.register(bind_group);
        Ok(id)
    }

    pub fn device_create_bind_group_layout(
        &self,
        device_id: DeviceId,
        desc: &BindGroupLayoutDescriptor,
    ) -> Result<id::BindGroupLayoutId, InvalidId> {
        profiling::scope!("Device::create_bind_group_layout");
        api_log!("Device::create_bind_group_layout {device_id:?}");

        let device = self.hub.devices.get(device_id)?;

        let layout = match BindGroupLayout::create(&device, desc) {
            Ok(layout) => layout,
            Err(err) => {
                device.validation_error(err);
                BindGroupLayout::error(&device, desc.label.borrow_option())
            }
        };

        let (id, _) = self.hub.bind_group_layouts.register(layout);
        Ok(id)
    }

    pub fn device_create_buffer(
        &self,
        device_id: DeviceId,
        desc: &BufferDescriptor,
    ) -> Result<id::BufferId, InvalidId> {
        profiling::scope!("Device::create_buffer");
        api_log!("Device::create_buffer {device_id:?} size {}", desc.size);

        let device = self.hub.devices.get(device_id)?;

        let error = match Buffer::validate_descriptor(&device, desc) {
            Ok(()) => false,
            Err(err) => {
                device.validation_error(err);
                true
            }
        };

        let (id, _) = self
            .hub
            .buffers
            .register(Buffer::new(&device, desc, error, None));
        Ok(id)
    }

    pub fn device_create_command_encoder(
        &self,
        device_id: DeviceId,
        desc: Option<&CommandEncoderDescriptor>,
    ) -> Result<id::CommandEncoderId, InvalidId> {
        profiling::scope!("Device::create_command_encoder");
        api_log!("Device::create_command_encoder {device_id:?}");

        let device = self.hub.devices.get(device_id)?;
        let desc = desc.cloned().unwrap_or_default();

        let (id, _) = self
            .hub
            .command_encoders
            .register(CommandEncoder::new(&device, &desc));
        Ok(id)
    }

    pub fn device_create_compute_pipeline(
        &self,
        device_id: DeviceId,
        desc: &ComputePipelineDescriptor,
    ) -> Result<id::ComputePipelineId, InvalidId> {
        profiling::scope!("Device::create_compute_pipeline");
        api_log!("Device::create_compute_pipeline {device_id:?}");

        let device = self.hub.devices.get(device_id)?;

        let pipeline = match ComputePipeline::create(&self.hub, &device, desc) {
            Ok(pipeline) => pipeline,
            Err(err) => {
                device.validation_error(err);
                ComputePipeline::error(&device, desc.label.borrow_option())
            }
        };

        let (id, _) = self.hub.compute_pipelines.register(pipeline);
        Ok(id)
    }

    /// Create a compute pipeline, delivering it through a callback.
    ///
    /// Validation errors are passed to the callback instead of the device's
    /// error sink. A lost device delivers an error pipeline successfully.
    pub fn device_create_compute_pipeline_async(
        &self,
        device_id: DeviceId,
        desc: &ComputePipelineDescriptor,
        callback_info: CreateComputePipelineAsyncCallbackInfo,
    ) -> Result<FutureId, InvalidId> {
        profiling::scope!("Device::create_compute_pipeline_async");
        api_log!("Device::create_compute_pipeline_async {device_id:?}");

        let device = self.hub.devices.get(device_id)?;

        let result = match ComputePipeline::create(&self.hub, &device, desc) {
            Ok(pipeline) => Ok(pipeline),
            Err(_) if device.is_lost() => {
                Ok(ComputePipeline::error(&device, desc.label.borrow_option()))
            }
            Err(err) => Err(Error::validation(err).message().to_owned()),
        };

        let result = result.map(|pipeline| self.hub.compute_pipelines.register(pipeline).0);

        Ok(track_pipeline(
            &self.hub,
            &device,
            result,
            |hub| &hub.compute_pipelines,
            callback_info,
        ))
    }

    pub fn device_create_error_buffer(
        &self,
        device_id: DeviceId,
        desc: &BufferDescriptor,
    ) -> Result<id::BufferId, InvalidId> {
        api_log!("Device::create_error_buffer {device_id:?}");

        let device = self.hub.devices.get(device_id)?;
        let (id, _) = self
            .hub
            .buffers
            .register(Buffer::new(&device, desc, true, None));
        Ok(id)
    }

    pub fn device_create_error_external_texture(
        &self,
        device_id: DeviceId,
    ) -> Result<id::ExternalTextureId, InvalidId> {
        api_log!("Device::create_error_external_texture {device_id:?}");

        let device = self.hub.devices.get(device_id)?;
        let (id, _) = self
            .hub
            .external_textures
            .register(ExternalTexture::error(&device, None));
        Ok(id)
    }

    /// Create an error shader module whose compilation info carries
    /// `error_message`.
    pub fn device_create_error_shader_module(
        &self,
        device_id: DeviceId,
        desc: &ShaderModuleDescriptor,
        error_message: &str,
    ) -> Result<id::ShaderModuleId, InvalidId> {
        api_log!("Device::create_error_shader_module {device_id:?}");

        let device = self.hub.devices.get(device_id)?;
        device.validation_error(crate::pipeline::CreateShaderModuleError::Injected(
            error_message.to_owned(),
        ));

        let (id, _) = self.hub.shader_modules.register(ShaderModule::error(
            &device,
            desc.label.borrow_option(),
            error_message,
        ));
        Ok(id)
    }

    pub fn device_create_error_texture(
        &self,
        device_id: DeviceId,
        desc: &TextureDescriptor,
    ) -> Result<id::TextureId, InvalidId> {
        api_log!("Device::create_error_texture {device_id:?}");

        let device = self.hub.devices.get(device_id)?;
        let (id, _) = self
            .hub
            .textures
            .register(Texture::new(&device, desc, true, None));
        Ok(id)
    }

    pub fn device_create_external_texture(
        &self,
        device_id: DeviceId,
        desc: &ExternalTextureDescriptor,
    ) -> Result<id::ExternalTextureId, InvalidId> {
        profiling::scope!("Device::create_external_texture");
        api_log!("Device::create_external_texture {device_id:?}");

        let device = self.hub.devices.get(device_id)?;

        let texture = match self.create_external_texture(&device, desc) {
            Ok(texture) => texture,
            Err(err) => {
                device.validation_error(err);
                ExternalTexture::error(&device, desc.label.borrow_option())
            }
        };

        let (id, _) = self.hub.external_textures.register(texture);
        Ok(id)
    }

    pub fn device_create_pipeline_layout(
        &self,
        device_id: DeviceId,
        desc: &PipelineLayoutDescriptor,
    ) -> Result<id::PipelineLayoutId, InvalidId> {
        profiling::scope!("Device::create_pipeline_layout");
        api_log!("Device::create_pipeline_layout {device_id:?}");

        let device = self.hub.devices.get(device_id)?;

        let layout = match PipelineLayout::create(&self.hub, &device, desc) {
            Ok(layout) => layout,
            Err(err) => {
                device.validation_error(err);
                PipelineLayout::error(&device, desc.label.borrow_option())
            }
        };

        let (id, _) = self.hub.pipeline_layouts.register(layout);
        Ok(id)
    }

    pub fn device_create_query_set(
        &self,
        device_id: DeviceId,
        desc: &QuerySetDescriptor,
    ) -> Result<id::QuerySetId, InvalidId> {
        profiling::scope!("Device::create_query_set");
        api_log!("Device::create_query_set {device_id:?} {:?}", desc.ty);

        let device = self.hub.devices.get(device_id)?;

        let error = match QuerySet::validate_descriptor(&device, desc) {
            Ok(()) => false,
            Err(err) => {
                device.validation_error(err);
                true
            }
        };

        let (id, _) = self
            .hub
            .query_sets
            .register(QuerySet::new(&device, desc, error));
        Ok(id)
    }

    pub fn device_create_render_bundle_encoder(
        &self,
        device_id: DeviceId,
        desc: &RenderBundleEncoderDescriptor,
    ) -> Result<id::RenderBundleEncoderId, InvalidId> {
        profiling::scope!("Device::create_render_bundle_encoder");
        api_log!("Device::create_render_bundle_encoder {device_id:?}");

        let device = self.hub.devices.get(device_id)?;

        let encoder = match RenderBundleEncoder::create(&device, desc) {
            Ok(encoder) => encoder,
            Err(err) => {
                device.validation_error(err);
                RenderBundleEncoder::error(&device, desc)
            }
        };

        let (id, _) = self.hub.render_bundle_encoders.register(encoder);
        Ok(id)
    }

    pub fn device_create_render_pipeline(
        &self,
        device_id: DeviceId,
        desc: &RenderPipelineDescriptor,
    ) -> Result<id::RenderPipelineId, InvalidId> {
        profiling::scope!("Device::create_render_pipeline");
        api_log!("Device::create_render_pipeline {device_id:?}");

        let device = self.hub.devices.get(device_id)?;

        let pipeline = match RenderPipeline::create(&self.hub, &device, desc) {
            Ok(pipeline) => pipeline,
            Err(err) => {
                device.validation_error(err);
                RenderPipeline::error(&device, desc.label.borrow_option())
            }
        };

        let (id, _) = self.hub.render_pipelines.register(pipeline);
        Ok(id)
    }

    /// Create a render pipeline, delivering it through a callback.
    ///
    /// See [`Global::device_create_compute_pipeline_async`].
    pub fn device_create_render_pipeline_async(
        &self,
        device_id: DeviceId,
        desc: &RenderPipelineDescriptor,
        callback_info: CreateRenderPipelineAsyncCallbackInfo,
    ) -> Result<FutureId, InvalidId> {
        profiling::scope!("Device::create_render_pipeline_async");
        api_log!("Device::create_render_pipeline_async {device_id:?}");

        let device = self.hub.devices.get(device_id)?;

        let result = match RenderPipeline::create(&self.hub, &device, desc) {
            Ok(pipeline) => Ok(pipeline),
            Err(_) if device.is_lost() => {
                Ok(RenderPipeline::error(&device, desc.label.borrow_option()))
            }
            Err(err) => Err(Error::validation(err).message().to_owned()),
        };

        let result = result.map(|pipeline| self.hub.render_pipelines.register(pipeline).0);

        Ok(track_pipeline(
            &self.hub,
            &device,
            result,
            |hub| &hub.render_pipelines,
            callback_info,
        ))
    }

    pub fn device_create_resource_table(
        &self,
        device_id: DeviceId,
        desc: &ResourceTableDescriptor,
    ) -> Result<id::ResourceTableId, InvalidId> {
        profiling::scope!("Device::create_resource_table");
        api_log!("Device::create_resource_table {device_id:?} size {}", desc.size);

        let device = self.hub.devices.get(device_id)?;

        let error = match ResourceTable::validate_descriptor(&device, desc) {
            Ok(()) => false,
            Err(err) => {
                device.validation_error(err);
                true
            }
        };

        let (id, _) = self
            .hub
            .resource_tables
            .register(ResourceTable::new(&device, desc, error));
        Ok(id)
    }

    pub fn device_create_sampler(
        &self,
        device_id: DeviceId,
        desc: Option<&SamplerDescriptor>,
    ) -> Result<id::SamplerId, InvalidId> {
        profiling::scope!("Device::create_sampler");
        api_log!("Device::create_sampler {device_id:?}");

        let device = self.hub.devices.get(device_id)?;
        let desc = desc.cloned().unwrap_or_default();

        let error = match Sampler::validate_descriptor(&desc) {
            Ok(()) => false,
            Err(err) => {
                device.validation_error(err);
                true
            }
        };

        let (id, _) = self
            .hub
            .samplers
            .register(Sampler::new(&device, &desc, error));
        Ok(id)
    }

    pub fn device_create_shader_module(
        &self,
        device_id: DeviceId,
        desc: &ShaderModuleDescriptor,
    ) -> Result<id::ShaderModuleId, InvalidId> {
        profiling::scope!("Device::create_shader_module");
        api_log!("Device::create_shader_module {device_id:?}");

        let device = self.hub.devices.get(device_id)?;

        let module = match ShaderModule::create(&device, desc) {
            Ok(module) => module,
            Err(err) => {
                let message = err.to_string();
                device.validation_error(err);
                ShaderModule::error(&device, desc.label.borrow_option(), &message)
            }
        };

        let (id, _) = self.hub.shader_modules.register(module);
        Ok(id)
    }

    pub fn device_create_texture(
        &self,
        device_id: DeviceId,
        desc: &TextureDescriptor,
    ) -> Result<id::TextureId, InvalidId> {
        profiling::scope!("Device::create_texture");
        api_log!("Device::create_texture {device_id:?} {:?}", desc.format);

        let device = self.hub.devices.get(device_id)?;

        let error = match resource::validate_texture_descriptor(&device, desc) {
            Ok(()) => false,
            Err(err) => {
                device.validation_error(err);
                true
            }
        };

        let (id, _) = self
            .hub
            .textures
            .register(Texture::new(&device, desc, error, None));
        Ok(id)
    }

    /// Destroy the device, losing it with [`DeviceLostReason::Destroyed`].
    ///
    /// Objects created from the device stay alive, but their errors are no
    /// longer reported.
    pub fn device_destroy(&self, device_id: DeviceId) -> Result<(), InvalidId> {
        api_log!("Device::destroy {device_id:?}");
        self.hub
            .devices
            .get(device_id)?
            .lose(DeviceLostReason::Destroyed, "Device was destroyed.");
        Ok(())
    }

    pub fn device_force_loss(
        &self,
        device_id: DeviceId,
        reason: DeviceLostReason,
        message: &str,
    ) -> Result<(), InvalidId> {
        api_log!("Device::force_loss {device_id:?} {reason:?}");
        self.hub.devices.get(device_id)?.lose(reason, message);
        Ok(())
    }

    /// Get a new reference to the adapter the device was created from.
    pub fn device_get_adapter(&self, device_id: DeviceId) -> Result<id::AdapterId, InvalidId> {
        let device = self.hub.devices.get(device_id)?;
        Ok(self.hub.adapters.acquire(&device.adapter))
    }

    pub fn device_get_adapter_info(&self, device_id: DeviceId) -> Result<AdapterInfo, InvalidId> {
        Ok(self.hub.devices.get(device_id)?.adapter.desc.info.clone())
    }

    /// Always fails: no backend imports Android hardware buffers.
    pub fn device_get_a_hardware_buffer_properties(
        &self,
        device_id: DeviceId,
        _handle: *mut std::ffi::c_void,
    ) -> Result<AHardwareBufferProperties, DeviceError> {
        let device = self.hub.devices.get(device_id)?;
        device.validation_error(DeviceError::AHardwareBufferUnsupported);
        Err(DeviceError::AHardwareBufferUnsupported)
    }

    pub fn device_get_features(&self, device_id: DeviceId) -> Result<SupportedFeatures, InvalidId> {
        Ok(self.hub.devices.get(device_id)?.features.clone())
    }

    pub fn device_get_limits(&self, device_id: DeviceId) -> Result<Limits, InvalidId> {
        Ok(self.hub.devices.get(device_id)?.limits)
    }

    /// The future that becomes ready when the device is lost.
    pub fn device_get_lost_future(&self, device_id: DeviceId) -> Result<FutureId, InvalidId> {
        Ok(self.hub.devices.get(device_id)?.lost_future())
    }

    /// Get a new reference to the default queue.
    pub fn device_get_queue(&self, device_id: DeviceId) -> Result<id::QueueId, InvalidId> {
        let device = self.hub.devices.get(device_id)?;
        let queue_id = device
            .queue_id
            .get()
            .copied()
            .ok_or(InvalidId { kind: Queue::TYPE })?;

        self.hub.queues.add_ref(queue_id)?;
        Ok(queue_id)
    }

    pub fn device_has_feature(&self, device_id: DeviceId, feature: FeatureName) -> Result<bool, InvalidId> {
        Ok(self.hub.devices.get(device_id)?.has_feature(feature))
    }

    pub fn device_import_shared_buffer_memory(
        &self,
        device_id: DeviceId,
        desc: &SharedBufferMemoryDescriptor,
    ) -> Result<id::SharedBufferMemoryId, InvalidId> {
        profiling::scope!("Device::import_shared_buffer_memory");
        api_log!("Device::import_shared_buffer_memory {device_id:?}");

        let device = self.hub.devices.get(device_id)?;

        let memory = match SharedBufferMemory::import(&device, desc) {
            Ok(memory) => memory,
            Err(err) => {
                device.validation_error(err);
                SharedBufferMemory::new(&device, desc, true)
            }
        };

        let (id, _) = self.hub.shared_buffer_memories.register(memory);
        Ok(id)
    }

    pub fn device_import_shared_fence(
        &self,
        device_id: DeviceId,
        desc: &SharedFenceDescriptor,
    ) -> Result<id::SharedFenceId, InvalidId> {
        api_log!("Device::import_shared_fence {device_id:?} {:?}", desc.ty);

        let device = self.hub.devices.get(device_id)?;

        let fence = match SharedFence::import(&device, desc) {
            Ok(fence) => fence,
            Err(err) => {
                device.validation_error(err);
                SharedFence::error(&device, desc)
            }
        };

        let (id, _) = self.hub.shared_fences.register(fence);
        Ok(id)
    }

    pub fn device_import_shared_texture_memory(
        &self,
        device_id: DeviceId,
        desc: &SharedTextureMemoryDescriptor,
    ) -> Result<id::SharedTextureMemoryId, InvalidId> {
        profiling::scope!("Device::import_shared_texture_memory");
        api_log!("Device::import_shared_texture_memory {device_id:?}");

        let device = self.hub.devices.get(device_id)?;

        let memory = match SharedTextureMemory::import(&device, desc) {
            Ok(memory) => memory,
            Err(err) => {
                device.validation_error(err);
                SharedTextureMemory::new(&device, desc, true)
            }
        };

        let (id, _) = self.hub.shared_texture_memories.register(memory);
        Ok(id)
    }

    /// Report an error of type `ty` as if the device had produced it.
    ///
    /// Only validation, out-of-memory and internal errors can be injected,
    /// anything else is a validation error.
    pub fn device_inject_error(&self, device_id: DeviceId, ty: ErrorType, message: &str) -> Result<(), InvalidId> {
        api_log!("Device::inject_error {device_id:?} {ty:?}");

        let device = self.hub.devices.get(device_id)?;

        let error = match ty {
            ErrorType::Validation => Error::Validation(message.to_owned()),
            ErrorType::OutOfMemory => Error::OutOfMemory(message.to_owned()),
            ErrorType::Internal => Error::Internal(message.to_owned()),
            ty => Error::validation(DeviceError::InvalidErrorType(ty)),
        };

        device.handle_error(error);
        Ok(())
    }

    pub fn device_pop_error_scope(
        &self,
        device_id: DeviceId,
        callback_info: PopErrorScopeCallbackInfo,
    ) -> Result<FutureId, InvalidId> {
        api_log!("Device::pop_error_scope {device_id:?}");

        let device = self.hub.devices.get(device_id)?;
        let (status, ty, message) = device.pop_error_scope();
        let CallbackInfo { mode, callback } = callback_info;

        Ok(device.events().track(mode, true, move |outcome| match outcome {
            EventOutcome::Ready => callback(status, ty, &message),
            EventOutcome::Cancelled => callback(
                PopErrorScopeStatus::CallbackCancelled,
                ErrorType::NoError,
                "Instance dropped before the error scope was popped.",
            ),
        }))
    }

    pub fn device_push_error_scope(&self, device_id: DeviceId, filter: ErrorFilter) -> Result<(), InvalidId> {
        api_log!("Device::push_error_scope {device_id:?} {filter:?}");
        self.hub.devices.get(device_id)?.push_error_scope(filter);
        Ok(())
    }

    pub fn device_set_logging_callback(
        &self,
        device_id: DeviceId,
        callback: Option<LoggingCallback>,
    ) -> Result<(), InvalidId> {
        self.hub
            .devices
            .get(device_id)?
            .set_logging_callback(callback);
        Ok(())
    }

    /// Deliver ready callbacks, returning `true` if some are still waiting
    /// for `wait_any`.
    pub fn device_tick(&self, device_id: DeviceId) -> Result<bool, InvalidId> {
        profiling::scope!("Device::tick");

        let device = self.hub.devices.get(device_id)?;
        let fired = device.events().process_events();
        api_log!("Device::tick {device_id:?} fired {fired}");
        Ok(device.events().has_pending())
    }

    /// Validate a texture descriptor without creating the texture.
    pub fn device_validate_texture_descriptor(
        &self,
        device_id: DeviceId,
        desc: &TextureDescriptor,
    ) -> Result<(), InvalidId> {
        let device = self.hub.devices.get(device_id)?;

        if let Err(err) = resource::validate_texture_descriptor(&device, desc) {
            device.validation_error(err);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use pt::CallbackMode;

    use super::*;
    use crate::{
        api::Null,
        device::DeviceDescriptor,
        instance::RequestAdapterCallbackInfo,
        pipeline::{ProgrammableStage, ShaderSource},
    };

    fn adapter(global: &Global) -> id::AdapterId {
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
        adapter
    }

    fn device(global: &Global) -> DeviceId {
        let adapter = adapter(global);
        global
            .adapter_create_device(adapter, DeviceDescriptor::default())
            .unwrap()
            .unwrap()
    }

    fn pop(global: &Global, device: DeviceId) -> (PopErrorScopeStatus, ErrorType, String) {
        let result = Arc::new(Mutex::new(None));
        let slot = result.clone();

        global
            .device_pop_error_scope(
                device,
                CallbackInfo::new(
                    CallbackMode::AllowSpontaneous,
                    Box::new(move |status, ty, message: &str| {
                        *slot.lock() = Some((status, ty, message.to_owned()))
                    }),
                ),
            )
            .unwrap();

        let result = result.lock().take().unwrap();
        result
    }

    #[test]
    fn invalid_buffer_is_captured_by_scope() {
        let global = Global::new();
        let device = device(&global);

        global
            .device_push_error_scope(device, ErrorFilter::Validation)
            .unwrap();

        let buffer = global
            .device_create_buffer(
                device,
                &BufferDescriptor {
                    size: 16,
                    ..Default::default()
                },
            )
            .unwrap();

        let (status, ty, message) = pop(&global, device);
        assert_eq!((status, ty), (PopErrorScopeStatus::Success, ErrorType::Validation));
        assert!(message.contains("usage"), "{message}");

        // Error objects still answer getters.
        assert_eq!(global.buffer_get_size(buffer).unwrap(), 16);
    }

    #[test]
    fn injected_errors_are_typed() {
        let global = Global::new();
        let device = device(&global);

        global
            .device_push_error_scope(device, ErrorFilter::OutOfMemory)
            .unwrap();
        global
            .device_inject_error(device, ErrorType::OutOfMemory, "oom")
            .unwrap();
        assert_eq!(
            pop(&global, device),
            (PopErrorScopeStatus::Success, ErrorType::OutOfMemory, String::from("oom"))
        );

        global
            .device_push_error_scope(device, ErrorFilter::Validation)
            .unwrap();
        global
            .device_inject_error(device, ErrorType::NoError, "nothing")
            .unwrap();
        let (_, ty, _) = pop(&global, device);
        assert_eq!(ty, ErrorType::Validation);
    }

    #[test]
    fn queue_is_shared_and_released_with_device() {
        let global = Global::new();
        let device = device(&global);

        let queue = global.device_get_queue(device).unwrap();
        assert_eq!(global.device_get_queue(device).unwrap(), queue);
        global.queue_release(queue).unwrap();
        global.queue_release(queue).unwrap();

        // The device still holds its own reference.
        assert!(global.hub.queues.contains(queue));

        global.device_release(device).unwrap();
        assert!(!global.hub.queues.contains(queue));
    }

    #[test]
    fn destroy_fires_lost_callback() {
        let global = Global::new();
        let adapter = adapter(&global);
        let reasons = Arc::new(Mutex::new(Vec::new()));

        let slot = reasons.clone();
        let device = global
            .adapter_create_device(
                adapter,
                DeviceDescriptor {
                    device_lost_callback_info: Some(CallbackInfo::new(
                        CallbackMode::AllowSpontaneous,
                        Box::new(move |reason, _: &str| slot.lock().push(reason)),
                    )),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();

        global.device_destroy(device).unwrap();
        global
            .device_force_loss(device, DeviceLostReason::Unknown, "again")
            .unwrap();
        assert_eq!(*reasons.lock(), [DeviceLostReason::Destroyed]);

        // Nothing is reported once lost.
        global
            .device_inject_error(device, ErrorType::Validation, "dropped")
            .unwrap();
    }

    #[test]
    fn async_pipeline_reports_validation_error() {
        let global = Global::new();
        let device = device(&global);

        let module = global
            .device_create_shader_module(
                device,
                &ShaderModuleDescriptor {
                    label: None,
                    source: ShaderSource::Wgsl("@compute @workgroup_size(1) fn main() {}".into()),
                },
            )
            .unwrap();

        let mut stage = ProgrammableStage::new(module);
        stage.entry_point = Some("missing".into());

        let status = Arc::new(Mutex::new(None));
        let slot = status.clone();

        global
            .device_push_error_scope(device, ErrorFilter::Validation)
            .unwrap();

        global
            .device_create_compute_pipeline_async(
                device,
                &ComputePipelineDescriptor {
                    label: None,
                    layout: None,
                    compute: stage,
                },
                CallbackInfo::new(
                    CallbackMode::AllowProcessEvents,
                    Box::new(move |status, id, _: &str| *slot.lock() = Some((status, id))),
                ),
            )
            .unwrap();

        assert!(status.lock().is_none());
        assert!(!global.device_tick(device).unwrap());
        assert_eq!(
            *status.lock(),
            Some((CreatePipelineAsyncStatus::ValidationError, None))
        );

        let (_, ty, _) = pop(&global, device);
        assert_eq!(ty, ErrorType::NoError);
    }

    #[test]
    fn resource_tables_need_feature() {
        let global = Global::new();
        let device = device(&global);

        global
            .device_push_error_scope(device, ErrorFilter::Validation)
            .unwrap();
        let table = global
            .device_create_resource_table(
                device,
                &ResourceTableDescriptor {
                    label: None,
                    size: 4,
                },
            )
            .unwrap();

        let (_, ty, _) = pop(&global, device);
        assert_eq!(ty, ErrorType::Validation);
        assert_eq!(global.resource_table_get_size(table).unwrap(), 4);
    }

    #[test]
    fn oversized_resource_tables_are_errors() {
        let global = Global::new();
        let device = global
            .adapter_create_device(
                adapter(&global),
                DeviceDescriptor {
                    required_features: vec![FeatureName::ResourceTables],
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();

        for (size, expected) in [
            (pt::RESOURCE_TABLE_MAX_SIZE, ErrorType::NoError),
            (pt::RESOURCE_TABLE_MAX_SIZE + 1, ErrorType::Validation),
            (u32::MAX, ErrorType::Validation),
        ] {
            global
                .device_push_error_scope(device, ErrorFilter::Validation)
                .unwrap();
            let table = global
                .device_create_resource_table(device, &ResourceTableDescriptor { label: None, size })
                .unwrap();

            let (_, ty, _) = pop(&global, device);
            assert_eq!(ty, expected, "size {size}");
            assert_eq!(global.resource_table_get_size(table).unwrap(), size);
            global.resource_table_release(table).unwrap();
        }
    }

    #[test]
    fn a_hardware_buffers_are_unsupported() {
        let global = Global::new();
        let device = device(&global);

        assert_eq!(
            global.device_get_a_hardware_buffer_properties(device, std::ptr::null_mut()),
            Err(DeviceError::AHardwareBufferUnsupported)
        );
        assert!(!global.device_has_feature(device, FeatureName::ResourceTables).unwrap());
        assert_eq!(
            global.device_get_limits(device).unwrap(),
            Limits::default()
        );

        let adapter = global.device_get_adapter(device).unwrap();
        assert_eq!(
            global.device_get_adapter_info(device).unwrap(),
            global.adapter_get_info(adapter).unwrap()
        );
    }
}

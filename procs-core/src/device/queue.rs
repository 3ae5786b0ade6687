use std::sync::Arc;

use pt::{
    BufferAddress, BufferUsages, Extent3d, Origin3d, QueueWorkDoneStatus, TextureFormat,
    TextureUsages, COPY_BUFFER_ALIGNMENT,
};
use thiserror::Error;

use crate::{
    api_log,
    command::{
        check_buffer_usage, check_texture_usage, validate_buffer_range,
        validate_linear_texture_data, validate_texture_copy_range, CommandBuffer, CopySide,
        TexelCopyBufferLayout, TexelCopyTextureInfo, TransferError,
    },
    device::Device,
    error::ObjectError,
    event::{CallbackInfo, EventOutcome, FutureId},
    global::Global,
    id,
    resource::{
        resolve, ExternalTextureError, ParentDevice, QueueUseError, Resource, ResourceInfo, Texture,
    },
    storage::InvalidId,
};

pub type QueueWorkDoneCallback = Box<dyn FnOnce(QueueWorkDoneStatus, &str) + Send>;
pub type QueueWorkDoneCallbackInfo = CallbackInfo<QueueWorkDoneCallback>;

#[derive(Debug)]
pub struct Queue {
    pub(crate) info: ResourceInfo,
    pub(crate) device: Arc<Device>,
}

crate::resource::impl_resource_type!(Queue, Queue, "Queue");
crate::resource::impl_parent_device!(Queue);

impl Queue {
    pub(crate) fn new(device: &Arc<Device>, label: Option<&str>) -> Self {
        Self {
            info: ResourceInfo::new(label, false),
            device: device.clone(),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum QueueWriteError {
    #[error(transparent)]
    Object(#[from] ObjectError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Queue(#[from] QueueUseError),
    #[error("Write destination texture is multisampled")]
    Multisampled,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum QueueSubmitError {
    #[error("Command buffer with label {0:?} is an error object")]
    ErrorCommandBuffer(String),
    #[error("Command buffer with label {0:?} was already submitted")]
    AlreadySubmitted(String),
    #[error("Command buffer with label {0:?} appears more than once in the submit")]
    Duplicate(String),
    #[error(transparent)]
    Object(#[from] ObjectError),
    #[error(transparent)]
    Queue(#[from] QueueUseError),
}

/// How alpha is encoded in the source or destination of a browser copy.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AlphaMode {
    Opaque,
    Premultiplied,
    #[default]
    Unpremultiplied,
}

/// Conversions applied by `queue_copy_texture_for_browser`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CopyTextureForBrowserOptions {
    pub flip_y: bool,
    pub needs_color_space_conversion: bool,
    pub src_alpha_mode: AlphaMode,
    pub src_transfer_function_parameters: Option<[f32; 7]>,
    pub conversion_matrix: Option<[f32; 9]>,
    pub dst_transfer_function_parameters: Option<[f32; 7]>,
    pub dst_alpha_mode: AlphaMode,
}

/// An external texture used as the source of a browser copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageCopyExternalTexture {
    pub external_texture: id::ExternalTextureId,
    pub origin: Origin3d,
    pub natural_size: Extent3d,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CopyForBrowserError {
    #[error(transparent)]
    Object(#[from] ObjectError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Queue(#[from] QueueUseError),
    #[error(transparent)]
    ExternalTexture(#[from] ExternalTextureError),
    #[error("Color space conversion needs transfer functions and a conversion matrix")]
    IncompleteColorSpaceConversion,
    #[error("Source and destination can't be the same texture")]
    SameSourceDestinationTexture,
    #[error("Copy depth must be 1, got {0}")]
    InvalidDepth(u32),
    #[error("Copy of {size:?} at {origin:?} overruns the external texture of size {natural_size:?}")]
    ExternalTextureOverrun {
        origin: Origin3d,
        size: Extent3d,
        natural_size: Extent3d,
    },
}

impl CopyTextureForBrowserOptions {
    fn validate(&self) -> Result<(), CopyForBrowserError> {
        let complete = self.src_transfer_function_parameters.is_some()
            && self.conversion_matrix.is_some()
            && self.dst_transfer_function_parameters.is_some();

        if self.needs_color_space_conversion && !complete {
            return Err(CopyForBrowserError::IncompleteColorSpaceConversion);
        }

        Ok(())
    }
}

/// Formats a browser copy can write to.
fn is_browser_copy_destination(format: TextureFormat) -> bool {
    use TextureFormat as Tf;

    matches!(
        format,
        Tf::R8Unorm
            | Tf::R16Float
            | Tf::R32Float
            | Tf::Rg8Unorm
            | Tf::Rg16Float
            | Tf::Rg32Float
            | Tf::Rgba8Unorm
            | Tf::Rgba8UnormSrgb
            | Tf::Bgra8Unorm
            | Tf::Bgra8UnormSrgb
            | Tf::Rgb10a2Unorm
            | Tf::Rgba16Float
            | Tf::Rgba32Float
    )
}

fn check_browser_destination(
    destination: &TexelCopyTextureInfo,
    dst: &Texture,
    copy_size: &Extent3d,
) -> Result<(), CopyForBrowserError> {
    check_texture_usage(dst, TextureUsages::COPY_DST | TextureUsages::RENDER_ATTACHMENT)?;

    if !is_browser_copy_destination(dst.format) {
        return Err(TransferError::InvalidBrowserCopyFormat(dst.format).into());
    }

    if dst.sample_count != 1 {
        return Err(TransferError::MismatchedSampleCounts {
            src: 1,
            dst: dst.sample_count,
        }
        .into());
    }

    if copy_size.depth_or_array_layers > 1 {
        return Err(CopyForBrowserError::InvalidDepth(copy_size.depth_or_array_layers));
    }

    validate_texture_copy_range(destination, dst, CopySide::Destination, copy_size)?;
    dst.check_queue_use()?;
    Ok(())
}

impl Global {
    fn queue_check_submit(
        queue: &Queue,
        command_buffers: &[Arc<CommandBuffer>],
    ) -> Result<(), QueueSubmitError> {
        for (index, buffer) in command_buffers.iter().enumerate() {
            if buffer.is_error() {
                return Err(QueueSubmitError::ErrorCommandBuffer(buffer.label()));
            }

            if command_buffers[..index].iter().any(|b| Arc::ptr_eq(b, buffer)) {
                return Err(QueueSubmitError::Duplicate(buffer.label()));
            }

            if *buffer.submitted.lock() {
                return Err(QueueSubmitError::AlreadySubmitted(buffer.label()));
            }

            buffer.same_device(&queue.device)?;
            buffer.used.check_queue_use()?;
        }

        Ok(())
    }

    /// Submit command buffers to the queue.
    ///
    /// The whole submit is rejected if any buffer can't be submitted, and
    /// each buffer can be submitted at most once.
    pub fn queue_submit(
        &self,
        queue_id: id::QueueId,
        command_buffers: &[id::CommandBufferId],
    ) -> Result<(), InvalidId> {
        profiling::scope!("Queue::submit");
        api_log!("Queue::submit {queue_id:?} {command_buffers:?}");

        let queue = self.hub.queues.get(queue_id)?;
        let buffers = command_buffers
            .iter()
            .map(|&id| self.hub.command_buffers.get(id))
            .collect::<Result<Vec<_>, _>>()?;

        match Self::queue_check_submit(&queue, &buffers) {
            Ok(()) => {
                for buffer in &buffers {
                    *buffer.submitted.lock() = true;
                    log::trace!(
                        "Submitted command buffer {:?} with {} commands",
                        buffer.label(),
                        buffer.commands
                    );
                }
            }
            Err(err) => queue.device.validation_error(err),
        }

        Ok(())
    }

    fn queue_check_write_buffer(
        &self,
        queue: &Queue,
        buffer_id: id::BufferId,
        offset: BufferAddress,
        data: &[u8],
    ) -> Result<Arc<crate::resource::Buffer>, QueueWriteError> {
        let buffer = resolve(&self.hub.buffers, buffer_id, &queue.device)?;
        let size = data.len() as BufferAddress;

        check_buffer_usage(&buffer, BufferUsages::COPY_DST)?;

        if size % COPY_BUFFER_ALIGNMENT != 0 {
            return Err(TransferError::UnalignedCopySize(size).into());
        }

        if offset % COPY_BUFFER_ALIGNMENT != 0 {
            return Err(TransferError::UnalignedBufferOffset(offset).into());
        }

        validate_buffer_range(&buffer, offset, size, CopySide::Destination)?;
        buffer.check_queue_use()?;
        Ok(buffer)
    }

    /// Write `data` into the contents of `buffer_id` at `offset`.
    pub fn queue_write_buffer(
        &self,
        queue_id: id::QueueId,
        buffer_id: id::BufferId,
        offset: BufferAddress,
        data: &[u8],
    ) -> Result<(), InvalidId> {
        profiling::scope!("Queue::write_buffer");
        api_log!("Queue::write_buffer {queue_id:?} {buffer_id:?} {offset} {}", data.len());

        let queue = self.hub.queues.get(queue_id)?;

        match self.queue_check_write_buffer(&queue, buffer_id, offset, data) {
            Ok(buffer) if !data.is_empty() => buffer.write_contents(offset, data),
            Ok(_) => {}
            Err(err) => queue.device.validation_error(err),
        }

        Ok(())
    }

    fn queue_check_write_texture(
        &self,
        queue: &Queue,
        destination: &TexelCopyTextureInfo,
        data: &[u8],
        layout: &TexelCopyBufferLayout,
        size: &Extent3d,
    ) -> Result<(), QueueWriteError> {
        let texture = resolve(&self.hub.textures, destination.texture, &queue.device)?;

        check_texture_usage(&texture, TextureUsages::COPY_DST)?;

        if texture.sample_count != 1 {
            return Err(QueueWriteError::Multisampled);
        }

        validate_texture_copy_range(destination, &texture, CopySide::Destination, size)?;
        validate_linear_texture_data(
            layout,
            texture.format,
            destination.aspect,
            data.len() as u64,
            size,
            false,
        )?;
        texture.check_queue_use()?;
        Ok(())
    }

    /// Validate a write of `data` into a texture. Texture contents are not
    /// kept, so nothing is written.
    pub fn queue_write_texture(
        &self,
        queue_id: id::QueueId,
        destination: &TexelCopyTextureInfo,
        data: &[u8],
        layout: &TexelCopyBufferLayout,
        size: &Extent3d,
    ) -> Result<(), InvalidId> {
        profiling::scope!("Queue::write_texture");
        api_log!(
            "Queue::write_texture {queue_id:?} {:?} {} {size:?}",
            destination.texture,
            data.len()
        );

        let queue = self.hub.queues.get(queue_id)?;

        if let Err(err) = self.queue_check_write_texture(&queue, destination, data, layout, size) {
            queue.device.validation_error(err);
        }

        Ok(())
    }

    fn queue_check_copy_texture_for_browser(
        &self,
        queue: &Queue,
        source: &TexelCopyTextureInfo,
        destination: &TexelCopyTextureInfo,
        copy_size: &Extent3d,
        options: &CopyTextureForBrowserOptions,
    ) -> Result<(), CopyForBrowserError> {
        options.validate()?;

        let src = resolve(&self.hub.textures, source.texture, &queue.device)?;
        let dst = resolve(&self.hub.textures, destination.texture, &queue.device)?;

        if Arc::ptr_eq(&src, &dst) {
            return Err(CopyForBrowserError::SameSourceDestinationTexture);
        }

        check_texture_usage(&src, TextureUsages::COPY_SRC | TextureUsages::TEXTURE_BINDING)?;

        if src.sample_count != 1 {
            return Err(TransferError::MismatchedSampleCounts {
                src: src.sample_count,
                dst: 1,
            }
            .into());
        }

        if src.format.is_depth_stencil() || src.format.is_compressed() {
            return Err(TransferError::MismatchedFormats {
                src: src.format,
                dst: dst.format,
            }
            .into());
        }

        validate_texture_copy_range(source, &src, CopySide::Source, copy_size)?;
        src.check_queue_use()?;
        check_browser_destination(destination, &dst, copy_size)
    }

    /// Validate a copy between textures with the conversions of `options`.
    pub fn queue_copy_texture_for_browser(
        &self,
        queue_id: id::QueueId,
        source: &TexelCopyTextureInfo,
        destination: &TexelCopyTextureInfo,
        copy_size: &Extent3d,
        options: &CopyTextureForBrowserOptions,
    ) -> Result<(), InvalidId> {
        profiling::scope!("Queue::copy_texture_for_browser");
        api_log!(
            "Queue::copy_texture_for_browser {queue_id:?} {:?} -> {:?} {copy_size:?}",
            source.texture,
            destination.texture
        );

        let queue = self.hub.queues.get(queue_id)?;

        if let Err(err) =
            self.queue_check_copy_texture_for_browser(&queue, source, destination, copy_size, options)
        {
            queue.device.validation_error(err);
        }

        Ok(())
    }

    fn queue_check_copy_external_texture_for_browser(
        &self,
        queue: &Queue,
        source: &ImageCopyExternalTexture,
        destination: &TexelCopyTextureInfo,
        copy_size: &Extent3d,
        options: &CopyTextureForBrowserOptions,
    ) -> Result<(), CopyForBrowserError> {
        options.validate()?;

        let external = resolve(&self.hub.external_textures, source.external_texture, &queue.device)?;
        external.check_active()?;

        let end_x = source.origin.x.saturating_add(copy_size.width);
        let end_y = source.origin.y.saturating_add(copy_size.height);

        if end_x > source.natural_size.width || end_y > source.natural_size.height {
            return Err(CopyForBrowserError::ExternalTextureOverrun {
                origin: source.origin,
                size: *copy_size,
                natural_size: source.natural_size,
            });
        }

        let dst = resolve(&self.hub.textures, destination.texture, &queue.device)?;

        if external.planes.iter().any(|plane| Arc::ptr_eq(&plane.texture, &dst)) {
            return Err(CopyForBrowserError::SameSourceDestinationTexture);
        }

        check_browser_destination(destination, &dst, copy_size)
    }

    /// Validate a copy from an external texture with the conversions of
    /// `options`.
    pub fn queue_copy_external_texture_for_browser(
        &self,
        queue_id: id::QueueId,
        source: &ImageCopyExternalTexture,
        destination: &TexelCopyTextureInfo,
        copy_size: &Extent3d,
        options: &CopyTextureForBrowserOptions,
    ) -> Result<(), InvalidId> {
        profiling::scope!("Queue::copy_external_texture_for_browser");
        api_log!(
            "Queue::copy_external_texture_for_browser {queue_id:?} {:?} -> {:?} {copy_size:?}",
            source.external_texture,
            destination.texture
        );

        let queue = self.hub.queues.get(queue_id)?;

        if let Err(err) = self.queue_check_copy_external_texture_for_browser(
            &queue,
            source,
            destination,
            copy_size,
            options,
        ) {
            queue.device.validation_error(err);
        }

        Ok(())
    }

    /// Get a future that completes once all work submitted so far is done,
    /// which is immediately.
    pub fn queue_on_submitted_work_done(
        &self,
        queue_id: id::QueueId,
        callback_info: QueueWorkDoneCallbackInfo,
    ) -> Result<FutureId, InvalidId> {
        api_log!("Queue::on_submitted_work_done {queue_id:?}");

        let queue = self.hub.queues.get(queue_id)?;
        let CallbackInfo { mode, callback } = callback_info;
        let lost = queue.device.is_lost();

        Ok(queue.device.events().track(mode, true, move |outcome| match outcome {
            EventOutcome::Ready if lost => callback(QueueWorkDoneStatus::Error, "Device is lost."),
            EventOutcome::Ready => callback(QueueWorkDoneStatus::Success, ""),
            EventOutcome::Cancelled => callback(
                QueueWorkDoneStatus::CallbackCancelled,
                "Instance dropped before the work was done.",
            ),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_space_conversion_needs_every_parameter() {
        let mut options = CopyTextureForBrowserOptions {
            needs_color_space_conversion: true,
            src_transfer_function_parameters: Some([1.0; 7]),
            conversion_matrix: Some([0.0; 9]),
            ..Default::default()
        };
        assert_eq!(
            options.validate(),
            Err(CopyForBrowserError::IncompleteColorSpaceConversion)
        );

        options.dst_transfer_function_parameters = Some([1.0; 7]);
        assert_eq!(options.validate(), Ok(()));
    }

    #[test]
    fn depth_formats_are_not_browser_destinations() {
        assert!(is_browser_copy_destination(TextureFormat::Rgba8Unorm));
        assert!(!is_browser_copy_destination(TextureFormat::Depth32Float));
        assert!(!is_browser_copy_destination(TextureFormat::R8Uint));
    }
}

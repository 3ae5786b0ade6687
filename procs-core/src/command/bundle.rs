/*! Render bundles.

A render bundle encoder records draws without any attachments. The bundle it
finishes into can be executed by every render pass whose attachment formats
match the formats the encoder was created with.
!*/

use std::sync::Arc;

use arrayvec::ArrayVec;
use parking_lot::Mutex;
use pt::{BufferAddress, IndexFormat, TextureFormat};
use thiserror::Error;

use crate::{
    api_log,
    command::{
        validate_immediates, DrawState, PassErrorScope, PassStatus, Recording, RenderCommandContext,
        RenderCommandError, UsedResources,
    },
    device::{Device, RenderPassContext, MAX_COLOR_ATTACHMENTS},
    error::MissingFeature,
    global::Global,
    hub::Hub,
    id,
    resource::{impl_parent_device, impl_resource_type, Resource, ResourceInfo},
    storage::InvalidId,
    Label, LabelHelpers,
};

/// Describes a [`RenderBundleEncoder`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderBundleEncoderDescriptor<'a> {
    pub label: Label<'a>,
    pub color_formats: Vec<Option<TextureFormat>>,
    pub depth_stencil_format: Option<TextureFormat>,
    pub sample_count: u32,
    pub depth_read_only: bool,
    pub stencil_read_only: bool,
}

impl Default for RenderBundleEncoderDescriptor<'_> {
    fn default() -> Self {
        Self {
            label: None,
            color_formats: Vec::new(),
            depth_stencil_format: None,
            sample_count: 1,
            depth_read_only: false,
            stencil_read_only: false,
        }
    }
}

/// Describes the [`RenderBundle`] produced by `render_bundle_encoder_finish`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderBundleDescriptor<'a> {
    pub label: Label<'a>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CreateRenderBundleError {
    #[error("The number of color formats {given} exceeds the limit {limit}")]
    TooManyColorAttachments { given: usize, limit: usize },
    #[error("Format {0:?} can't be used as a color attachment")]
    InvalidColorFormat(TextureFormat),
    #[error("Format {0:?} is not a depth or stencil format")]
    InvalidDepthStencilFormat(TextureFormat),
    #[error("Sample count {0} is not supported")]
    InvalidSampleCount(u32),
    #[error("Render bundle has no color or depth-stencil format")]
    MissingAttachments,
    #[error(transparent)]
    MissingFeature(#[from] MissingFeature),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RenderBundleErrorInner {
    #[error(transparent)]
    RenderCommand(#[from] RenderCommandError),
    #[error("Render bundle encoder is an error object")]
    InvalidEncoder,
    #[error("Render bundle encoder is already finished")]
    Finished,
}

/// Error encountered when recording a render bundle.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{scope}")]
pub struct RenderBundleError {
    pub scope: PassErrorScope,
    #[source]
    pub(crate) inner: RenderBundleErrorInner,
}

impl RenderBundleError {
    pub fn inner(&self) -> &RenderBundleErrorInner {
        &self.inner
    }
}

fn validate_bundle_context(
    device: &Device,
    desc: &RenderBundleEncoderDescriptor,
) -> Result<RenderPassContext, CreateRenderBundleError> {
    let limit = (device.limits.max_color_attachments as usize).min(MAX_COLOR_ATTACHMENTS);

    if desc.color_formats.len() > limit {
        return Err(CreateRenderBundleError::TooManyColorAttachments {
            given: desc.color_formats.len(),
            limit,
        });
    }

    let mut colors = ArrayVec::<Option<TextureFormat>, MAX_COLOR_ATTACHMENTS>::new();

    for &format in &desc.color_formats {
        if let Some(format) = format {
            if format.is_depth_stencil() || !format.is_renderable() {
                return Err(CreateRenderBundleError::InvalidColorFormat(format));
            }

            if let Some(feature) = format.required_feature() {
                device.require_feature(feature)?;
            }
        }

        colors.push(format);
    }

    if let Some(format) = desc.depth_stencil_format {
        if !format.is_depth_stencil() {
            return Err(CreateRenderBundleError::InvalidDepthStencilFormat(format));
        }

        if let Some(feature) = format.required_feature() {
            device.require_feature(feature)?;
        }
    }

    if !matches!(desc.sample_count, 1 | 4) {
        return Err(CreateRenderBundleError::InvalidSampleCount(desc.sample_count));
    }

    if colors.iter().all(Option::is_none) && desc.depth_stencil_format.is_none() {
        return Err(CreateRenderBundleError::MissingAttachments);
    }

    Ok(RenderPassContext {
        colors,
        depth_stencil: desc.depth_stencil_format,
        sample_count: desc.sample_count,
    })
}

#[derive(Debug)]
struct RenderBundleState {
    status: PassStatus,
    recording: Recording<RenderBundleError>,
    draw: DrawState,
    draw_count: u64,
}

#[derive(Debug)]
pub struct RenderBundleEncoder {
    pub(crate) info: ResourceInfo,
    pub(crate) device: Arc<Device>,
    context: RenderPassContext,
    depth_read_only: bool,
    stencil_read_only: bool,
    state: Mutex<RenderBundleState>,
}

impl_resource_type!(RenderBundleEncoder, RenderBundleEncoder, "RenderBundleEncoder");
impl_parent_device!(RenderBundleEncoder);

impl RenderBundleEncoder {
    fn with_context(
        device: &Arc<Device>,
        desc: &RenderBundleEncoderDescriptor,
        context: RenderPassContext,
        error: bool,
    ) -> Self {
        let has_depth = desc.depth_stencil_format.map_or(false, |f| f.has_depth_aspect());
        let has_stencil = desc.depth_stencil_format.map_or(false, |f| f.has_stencil_aspect());

        Self {
            info: ResourceInfo::new(desc.label.borrow_option(), error),
            device: device.clone(),
            context,
            depth_read_only: desc.depth_read_only || !has_depth,
            stencil_read_only: desc.stencil_read_only || !has_stencil,
            state: Mutex::new(RenderBundleState {
                status: PassStatus::Recording,
                recording: Recording::default(),
                draw: DrawState::default(),
                draw_count: 0,
            }),
        }
    }

    pub(crate) fn create(
        device: &Arc<Device>,
        desc: &RenderBundleEncoderDescriptor,
    ) -> Result<Self, CreateRenderBundleError> {
        let context = validate_bundle_context(device, desc)?;
        Ok(Self::with_context(device, desc, context, false))
    }

    pub(crate) fn error(device: &Arc<Device>, desc: &RenderBundleEncoderDescriptor) -> Self {
        Self::with_context(device, desc, RenderPassContext::default(), true)
    }

    fn command_context<'a>(&'a self, hub: &'a Hub) -> RenderCommandContext<'a> {
        RenderCommandContext {
            hub,
            device: &self.device,
            context: &self.context,
            depth_read_only: self.depth_read_only,
            stencil_read_only: self.stencil_read_only,
        }
    }

    /// Record one command with `f`.
    ///
    /// Using a finished encoder is reported to the device right away.
    fn record<F>(&self, scope: PassErrorScope, f: F)
    where
        F: FnOnce(&mut RenderBundleState) -> Result<(), RenderCommandError>,
    {
        let mut state = self.state.lock();

        if state.status == PassStatus::Ended {
            drop(state);
            self.device.validation_error(RenderBundleError {
                scope,
                inner: RenderBundleErrorInner::Finished,
            });
            return;
        }

        match f(&mut *state) {
            Ok(()) => state.recording.commands += 1,
            Err(err) => state.recording.set_error(RenderBundleError {
                scope,
                inner: err.into(),
            }),
        }
    }

    /// Take what was recorded, along with the number of draws.
    fn finish(&self) -> Result<(Recording<RenderBundleError>, u64), RenderBundleError> {
        let end_error = |inner| RenderBundleError {
            scope: PassErrorScope::End,
            inner,
        };

        let mut state = self.state.lock();

        if state.status == PassStatus::Ended {
            return Err(end_error(RenderBundleErrorInner::Finished));
        }

        state.status = PassStatus::Ended;
        state.draw.reset();

        let mut recording = std::mem::take(&mut state.recording);
        let draw_count = state.draw_count;
        drop(state);

        if self.is_error() {
            return Err(end_error(RenderBundleErrorInner::InvalidEncoder));
        }

        if let Some(error) = recording.error.take() {
            return Err(error);
        }

        if recording.debug_depth != 0 {
            return Err(end_error(
                RenderCommandError::UnbalancedDebugGroups(recording.debug_depth).into(),
            ));
        }

        Ok((recording, draw_count))
    }
}

#[derive(Debug)]
pub struct RenderBundle {
    pub(crate) info: ResourceInfo,
    pub(crate) device: Arc<Device>,
    pub(crate) context: RenderPassContext,
    pub(crate) depth_read_only: bool,
    pub(crate) stencil_read_only: bool,
    pub(crate) used: UsedResources,
    pub(crate) draw_count: u64,
    pub(crate) commands: usize,
}

impl_resource_type!(RenderBundle, RenderBundle, "RenderBundle");
impl_parent_device!(RenderBundle);

impl Global {
    pub fn render_bundle_encoder_draw(
        &self,
        encoder_id: id::RenderBundleEncoderId,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> Result<(), InvalidId> {
        api_log!(
            "RenderBundleEncoder::draw {encoder_id:?} {vertex_count} {instance_count} {first_vertex} {first_instance}"
        );

        let encoder = self.hub.render_bundle_encoders.get(encoder_id)?;
        let scope = PassErrorScope::Draw {
            indexed: false,
            indirect: false,
        };

        encoder.record(scope, |state| {
            state.draw.validate_draw()?;
            state.draw_count += 1;
            Ok(())
        });

        Ok(())
    }

    pub fn render_bundle_encoder_draw_indexed(
        &self,
        encoder_id: id::RenderBundleEncoderId,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    ) -> Result<(), InvalidId> {
        api_log!(
            "RenderBundleEncoder::draw_indexed {encoder_id:?} {index_count} {instance_count} {first_index} {base_vertex} {first_instance}"
        );

        let encoder = self.hub.render_bundle_encoders.get(encoder_id)?;
        let scope = PassErrorScope::Draw {
            indexed: true,
            indirect: false,
        };

        encoder.record(scope, |state| {
            state.draw.validate_draw_indexed(Some((first_index, index_count)))?;
            state.draw_count += 1;
            Ok(())
        });

        Ok(())
    }

    pub fn render_bundle_encoder_draw_indexed_indirect(
        &self,
        encoder_id: id::RenderBundleEncoderId,
        indirect_buffer_id: id::BufferId,
        indirect_offset: BufferAddress,
    ) -> Result<(), InvalidId> {
        api_log!(
            "RenderBundleEncoder::draw_indexed_indirect {encoder_id:?} {indirect_buffer_id:?} {indirect_offset}"
        );
        self.render_bundle_draw_indirect(encoder_id, indirect_buffer_id, indirect_offset, true)
    }

    pub fn render_bundle_encoder_draw_indirect(
        &self,
        encoder_id: id::RenderBundleEncoderId,
        indirect_buffer_id: id::BufferId,
        indirect_offset: BufferAddress,
    ) -> Result<(), InvalidId> {
        api_log!("RenderBundleEncoder::draw_indirect {encoder_id:?} {indirect_buffer_id:?} {indirect_offset}");
        self.render_bundle_draw_indirect(encoder_id, indirect_buffer_id, indirect_offset, false)
    }

    fn render_bundle_draw_indirect(
        &self,
        encoder_id: id::RenderBundleEncoderId,
        indirect_buffer_id: id::BufferId,
        indirect_offset: BufferAddress,
        indexed: bool,
    ) -> Result<(), InvalidId> {
        let encoder = self.hub.render_bundle_encoders.get(encoder_id)?;
        let cx = encoder.command_context(&self.hub);
        let scope = PassErrorScope::Draw {
            indexed,
            indirect: true,
        };

        encoder.record(scope, |state| {
            cx.draw_indirect(
                &state.draw,
                &mut state.recording.used,
                indirect_buffer_id,
                indirect_offset,
                indexed,
                1,
            )?;
            state.draw_count += 1;
            Ok(())
        });

        Ok(())
    }

    pub fn render_bundle_encoder_finish(
        &self,
        encoder_id: id::RenderBundleEncoderId,
        desc: Option<&RenderBundleDescriptor>,
    ) -> Result<id::RenderBundleId, InvalidId> {
        api_log!("RenderBundleEncoder::finish {encoder_id:?}");

        let encoder = self.hub.render_bundle_encoders.get(encoder_id)?;
        let label = desc.and_then(|desc| desc.label.borrow_option());

        let (recording, draw_count, error) = match encoder.finish() {
            Ok((recording, draw_count)) => (recording, draw_count, false),
            Err(err) => {
                encoder.device.validation_error(err);
                (Recording::default(), 0, true)
            }
        };

        let bundle = RenderBundle {
            info: ResourceInfo::new(label, error),
            device: encoder.device.clone(),
            context: encoder.context.clone(),
            depth_read_only: encoder.depth_read_only,
            stencil_read_only: encoder.stencil_read_only,
            used: recording.used,
            draw_count,
            commands: recording.commands,
        };

        let (id, _) = self.hub.render_bundles.register(bundle);
        Ok(id)
    }

    pub fn render_bundle_encoder_insert_debug_marker(
        &self,
        encoder_id: id::RenderBundleEncoderId,
        marker: &str,
    ) -> Result<(), InvalidId> {
        api_log!("RenderBundleEncoder::insert_debug_marker {encoder_id:?} {marker}");

        let encoder = self.hub.render_bundle_encoders.get(encoder_id)?;
        encoder.record(PassErrorScope::Pass, |_| Ok(()));
        Ok(())
    }

    pub fn render_bundle_encoder_pop_debug_group(
        &self,
        encoder_id: id::RenderBundleEncoderId,
    ) -> Result<(), InvalidId> {
        api_log!("RenderBundleEncoder::pop_debug_group {encoder_id:?}");

        let encoder = self.hub.render_bundle_encoders.get(encoder_id)?;
        encoder.record(PassErrorScope::PopDebugGroup, |state| {
            if state.recording.pop_debug_group() {
                Ok(())
            } else {
                Err(RenderCommandError::InvalidPopDebugGroup)
            }
        });
        Ok(())
    }

    pub fn render_bundle_encoder_push_debug_group(
        &self,
        encoder_id: id::RenderBundleEncoderId,
        label: &str,
    ) -> Result<(), InvalidId> {
        api_log!("RenderBundleEncoder::push_debug_group {encoder_id:?} {label}");

        let encoder = self.hub.render_bundle_encoders.get(encoder_id)?;
        encoder.record(PassErrorScope::Pass, |state| {
            state.recording.push_debug_group();
            Ok(())
        });
        Ok(())
    }

    pub fn render_bundle_encoder_set_bind_group(
        &self,
        encoder_id: id::RenderBundleEncoderId,
        index: u32,
        bind_group_id: Option<id::BindGroupId>,
        offsets: &[u32],
    ) -> Result<(), InvalidId> {
        api_log!("RenderBundleEncoder::set_bind_group {encoder_id:?} {index} {bind_group_id:?}");

        let encoder = self.hub.render_bundle_encoders.get(encoder_id)?;
        let cx = encoder.command_context(&self.hub);

        encoder.record(PassErrorScope::SetBindGroup(index), |state| {
            cx.set_bind_group(
                &mut state.draw,
                &mut state.recording.used,
                index,
                bind_group_id,
                offsets,
            )
        });

        Ok(())
    }

    pub fn render_bundle_encoder_set_immediates(
        &self,
        encoder_id: id::RenderBundleEncoderId,
        offset: u32,
        data: &[u8],
    ) -> Result<(), InvalidId> {
        api_log!("RenderBundleEncoder::set_immediates {encoder_id:?} {offset} {}", data.len());

        let encoder = self.hub.render_bundle_encoders.get(encoder_id)?;
        let device = &encoder.device;

        encoder.record(PassErrorScope::SetImmediates, |_| {
            validate_immediates(device, offset, data.len())?;
            Ok(())
        });

        Ok(())
    }

    pub fn render_bundle_encoder_set_index_buffer(
        &self,
        encoder_id: id::RenderBundleEncoderId,
        buffer_id: id::BufferId,
        format: IndexFormat,
        offset: BufferAddress,
        size: Option<BufferAddress>,
    ) -> Result<(), InvalidId> {
        api_log!(
            "RenderBundleEncoder::set_index_buffer {encoder_id:?} {buffer_id:?} {format:?} {offset} {size:?}"
        );

        let encoder = self.hub.render_bundle_encoders.get(encoder_id)?;
        let cx = encoder.command_context(&self.hub);

        encoder.record(PassErrorScope::SetIndexBuffer, |state| {
            cx.set_index_buffer(
                &mut state.draw,
                &mut state.recording.used,
                buffer_id,
                format,
                offset,
                size,
            )
        });

        Ok(())
    }

    pub fn render_bundle_encoder_set_pipeline(
        &self,
        encoder_id: id::RenderBundleEncoderId,
        pipeline_id: id::RenderPipelineId,
    ) -> Result<(), InvalidId> {
        api_log!("RenderBundleEncoder::set_pipeline {encoder_id:?} {pipeline_id:?}");

        let encoder = self.hub.render_bundle_encoders.get(encoder_id)?;
        let cx = encoder.command_context(&self.hub);

        encoder.record(PassErrorScope::SetPipeline, |state| {
            cx.set_pipeline(&mut state.draw, pipeline_id)
        });

        Ok(())
    }

    pub fn render_bundle_encoder_set_vertex_buffer(
        &self,
        encoder_id: id::RenderBundleEncoderId,
        slot: u32,
        buffer_id: Option<id::BufferId>,
        offset: BufferAddress,
        size: Option<BufferAddress>,
    ) -> Result<(), InvalidId> {
        api_log!(
            "RenderBundleEncoder::set_vertex_buffer {encoder_id:?} {slot} {buffer_id:?} {offset} {size:?}"
        );

        let encoder = self.hub.render_bundle_encoders.get(encoder_id)?;
        let cx = encoder.command_context(&self.hub);

        encoder.record(PassErrorScope::SetVertexBuffer(slot), |state| {
            cx.set_vertex_buffer(
                &mut state.draw,
                &mut state.recording.used,
                slot,
                buffer_id,
                offset,
                size,
            )
        });

        Ok(())
    }
}

use std::sync::Arc;

use arrayvec::ArrayVec;
use parking_lot::Mutex;
use pt::{
    BufferAddress, Color, FeatureName, IndexFormat, LoadOp, QueryType, StoreOp,
    TextureFormat, TextureUsages, TextureViewDimension,
};
use thiserror::Error;

use crate::{
    api_log,
    command::{
        check_indirect_buffer, query::resolve_timestamp_query, validate_immediates, validate_timestamp_writes,
        CommandEncoder, CommandEncoderError, DrawState, MapPassErr, PassErrorScope, PassStatus,
        PassTimestampWrites, QueryError, Recording, RenderCommandContext, RenderCommandError,
    },
    device::{Device, RenderPassCompatibilityError, RenderPassContext, MAX_COLOR_ATTACHMENTS},
    error::{MissingFeature, ObjectError},
    global::Global,
    hub::Hub,
    id,
    resource::{resolve, QuerySet, ResourceInfo, TextureView},
    storage::InvalidId,
    Label, LabelHelpers,
};

/// Default limit on the number of draws in a render pass.
pub const DEFAULT_MAX_DRAW_COUNT: u64 = 50_000_000;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderPassColorAttachment {
    pub view: id::TextureViewId,
    /// Depth slice rendered to, for views of 3D textures.
    pub depth_slice: Option<u32>,
    pub resolve_target: Option<id::TextureViewId>,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear_value: Color,
}

impl RenderPassColorAttachment {
    pub fn new(view: id::TextureViewId) -> Self {
        Self {
            view,
            depth_slice: None,
            resolve_target: None,
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
            clear_value: Color::default(),
        }
    }
}

/// Depth and stencil operations of a depth-stencil attachment.
///
/// Operations of an aspect must be set if the format has the aspect and the
/// aspect is not read-only, and must be `None` otherwise.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderPassDepthStencilAttachment {
    pub view: id::TextureViewId,
    pub depth_load_op: Option<LoadOp>,
    pub depth_store_op: Option<StoreOp>,
    pub depth_clear_value: f32,
    pub depth_read_only: bool,
    pub stencil_load_op: Option<LoadOp>,
    pub stencil_store_op: Option<StoreOp>,
    pub stencil_clear_value: u32,
    pub stencil_read_only: bool,
}

/// Describes the attachments of a render pass.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderPassDescriptor<'a> {
    pub label: Label<'a>,
    pub color_attachments: Vec<Option<RenderPassColorAttachment>>,
    pub depth_stencil_attachment: Option<RenderPassDepthStencilAttachment>,
    pub occlusion_query_set: Option<id::QuerySetId>,
    pub timestamp_writes: Option<PassTimestampWrites>,
    pub max_draw_count: u64,
}

impl Default for RenderPassDescriptor<'_> {
    fn default() -> Self {
        Self {
            label: None,
            color_attachments: Vec::new(),
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
            max_draw_count: DEFAULT_MAX_DRAW_COUNT,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachmentKind {
    Color(usize),
    ResolveTarget(usize),
    DepthStencil,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttachmentError {
    #[error(transparent)]
    Object(#[from] ObjectError),
    #[error("The number of color attachments {given} exceeds the limit {limit}")]
    TooManyColorAttachments { given: usize, limit: usize },
    #[error("Render pass has no attachments")]
    MissingAttachments,
    #[error("{0:?} attachment's texture lacks the usage RENDER_ATTACHMENT")]
    MissingRenderAttachmentUsage(AttachmentKind),
    #[error("{0:?} attachment's texture is destroyed")]
    Destroyed(AttachmentKind),
    #[error("{kind:?} attachment has the format {format:?}, which can't be used there")]
    InvalidFormat { kind: AttachmentKind, format: TextureFormat },
    #[error("{0:?} attachment must view a single mip level and array layer")]
    NotSingleSubresource(AttachmentKind),
    #[error("{kind:?} attachment is {actual:?}, other attachments are {expected:?}")]
    SizeMismatch {
        kind: AttachmentKind,
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("{kind:?} attachment has sample count {actual}, other attachments have {expected}")]
    SampleCountMismatch { kind: AttachmentKind, expected: u32, actual: u32 },
    #[error("Resolve target {0} needs a multisampled color attachment and a single-sampled target")]
    InvalidResolveSampleCount(usize),
    #[error("Depth slice of color attachment {index} is invalid for its view")]
    InvalidDepthSlice { index: usize },
    #[error("Operations of the {aspect} aspect must be set exactly when the aspect is present and writable (required: {required})")]
    InvalidAspectOps { aspect: &'static str, required: bool },
    #[error("Depth clear value {0} is outside of 0.0..=1.0")]
    InvalidDepthClearValue(String),
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Error encountered when performing a render pass.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RenderPassErrorInner {
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    #[error(transparent)]
    RenderCommand(#[from] RenderCommandError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    MissingFeature(#[from] MissingFeature),
    #[error("Pass has already ended")]
    Ended,
    #[error("Viewport {x},{y} {w}x{h} with depth range {min_depth}..{max_depth} is invalid")]
    InvalidViewport {
        x: String,
        y: String,
        w: String,
        h: String,
        min_depth: String,
        max_depth: String,
    },
    #[error("Scissor {x},{y} {w}x{h} is not contained in the render target {target:?}")]
    InvalidScissorRect { x: u32, y: u32, w: u32, h: u32, target: (u32, u32) },
    #[error(transparent)]
    IncompatibleBundle(RenderPassCompatibilityError),
    #[error("Render bundle writes depth or stencil, which the pass accesses read-only")]
    IncompatibleBundleReadOnly,
    #[error("Draw count exceeds the pass's maximum of {0}")]
    DrawCountExceeded(u64),
    #[error("An occlusion query is still active at the end of the pass")]
    OcclusionQueryActive,
    #[error("Cannot pop debug group, because the number of pushed debug groups is zero")]
    InvalidPopDebugGroup,
    #[error("{0} debug groups were pushed but never popped")]
    UnbalancedDebugGroups(u32),
}

impl From<ObjectError> for RenderPassErrorInner {
    fn from(err: ObjectError) -> Self {
        Self::RenderCommand(err.into())
    }
}

/// Error encountered when performing a render pass.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{scope}")]
pub struct RenderPassError {
    pub scope: PassErrorScope,
    #[source]
    pub(crate) inner: RenderPassErrorInner,
}

impl RenderPassError {
    pub fn inner(&self) -> &RenderPassErrorInner {
        &self.inner
    }
}

impl<T, E> MapPassErr<T, RenderPassError> for Result<T, E>
where
    E: Into<RenderPassErrorInner>,
{
    fn map_pass_err(self, scope: PassErrorScope) -> Result<T, RenderPassError> {
        self.map_err(|inner| RenderPassError {
            scope,
            inner: inner.into(),
        })
    }
}

/// Everything a render pass learns from its descriptor.
#[derive(Debug, Default)]
struct PassAttachments {
    context: RenderPassContext,
    /// Width and height of the attachments.
    extent: (u32, u32),
    depth_read_only: bool,
    stencil_read_only: bool,
    occlusion_query_set: Option<Arc<QuerySet>>,
}

struct AttachmentChecker {
    extent: Option<(u32, u32)>,
    sample_count: Option<u32>,
}

impl AttachmentChecker {
    fn check_view(&mut self, kind: AttachmentKind, view: &TextureView) -> Result<(), AttachmentError> {
        if !view.usage.contains(TextureUsages::RENDER_ATTACHMENT) {
            return Err(AttachmentError::MissingRenderAttachmentUsage(kind));
        }

        if view.texture.is_destroyed() {
            return Err(AttachmentError::Destroyed(kind));
        }

        let single_layer = view.dimension == TextureViewDimension::D3 || view.layers.len() == 1;

        if view.mips.len() != 1 || !single_layer {
            return Err(AttachmentError::NotSingleSubresource(kind));
        }

        let size = view.extent();
        let actual = (size.width, size.height);

        match self.extent {
            Some(expected) if expected != actual => {
                return Err(AttachmentError::SizeMismatch { kind, expected, actual })
            }
            _ => self.extent = Some(actual),
        }

        Ok(())
    }

    fn check_sample_count(&mut self, kind: AttachmentKind, actual: u32) -> Result<(), AttachmentError> {
        match self.sample_count {
            Some(expected) if expected != actual => {
                Err(AttachmentError::SampleCountMismatch { kind, expected, actual })
            }
            _ => {
                self.sample_count = Some(actual);
                Ok(())
            }
        }
    }
}

fn check_aspect_ops<L, S>(
    aspect: &'static str,
    has_aspect: bool,
    read_only: bool,
    load: Option<L>,
    store: Option<S>,
) -> Result<(), AttachmentError> {
    let required = has_aspect && !read_only;

    if load.is_some() != required || store.is_some() != required {
        return Err(AttachmentError::InvalidAspectOps { aspect, required });
    }

    Ok(())
}

fn validate_attachments(
    hub: &Hub,
    device: &Arc<Device>,
    desc: &RenderPassDescriptor,
) -> Result<PassAttachments, AttachmentError> {
    let limit = (device.limits.max_color_attachments as usize).min(MAX_COLOR_ATTACHMENTS);

    if desc.color_attachments.len() > limit {
        return Err(AttachmentError::TooManyColorAttachments {
            given: desc.color_attachments.len(),
            limit,
        });
    }

    let mut checker = AttachmentChecker {
        extent: None,
        sample_count: None,
    };

    let mut colors = ArrayVec::<Option<TextureFormat>, MAX_COLOR_ATTACHMENTS>::new();

    for (index, attachment) in desc.color_attachments.iter().enumerate() {
        let Some(attachment) = attachment else {
            colors.push(None);
            continue;
        };

        let kind = AttachmentKind::Color(index);
        let view = resolve(&hub.texture_views, attachment.view, device)?;
        checker.check_view(kind, &view)?;

        if view.format.is_depth_stencil() || !view.format.is_renderable() {
            return Err(AttachmentError::InvalidFormat {
                kind,
                format: view.format,
            });
        }

        let sample_count = view.texture.sample_count;
        checker.check_sample_count(kind, sample_count)?;

        match (view.dimension, attachment.depth_slice) {
            (TextureViewDimension::D3, Some(slice)) => {
                let depth = view.texture.mip_level_size(view.mips.start).depth_or_array_layers;

                if slice >= depth {
                    return Err(AttachmentError::InvalidDepthSlice { index });
                }
            }
            (TextureViewDimension::D3, None) | (_, Some(_)) => {
                return Err(AttachmentError::InvalidDepthSlice { index })
            }
            (_, None) => {}
        }

        if let Some(target_id) = attachment.resolve_target {
            let kind = AttachmentKind::ResolveTarget(index);
            let target = resolve(&hub.texture_views, target_id, device)?;

            if sample_count == 1 || target.texture.sample_count != 1 {
                return Err(AttachmentError::InvalidResolveSampleCount(index));
            }

            if target.format != view.format {
                return Err(AttachmentError::InvalidFormat {
                    kind,
                    format: target.format,
                });
            }

            checker.check_view(kind, &target)?;
        }

        colors.push(Some(view.format));
    }

    let mut depth_read_only = false;
    let mut stencil_read_only = false;
    let mut depth_stencil = None;

    if let Some(attachment) = &desc.depth_stencil_attachment {
        let kind = AttachmentKind::DepthStencil;
        let view = resolve(&hub.texture_views, attachment.view, device)?;
        checker.check_view(kind, &view)?;
        checker.check_sample_count(kind, view.texture.sample_count)?;

        let format = view.format;

        if !format.is_depth_stencil() {
            return Err(AttachmentError::InvalidFormat { kind, format });
        }

        check_aspect_ops(
            "depth",
            format.has_depth_aspect(),
            attachment.depth_read_only,
            attachment.depth_load_op,
            attachment.depth_store_op,
        )?;
        check_aspect_ops(
            "stencil",
            format.has_stencil_aspect(),
            attachment.stencil_read_only,
            attachment.stencil_load_op,
            attachment.stencil_store_op,
        )?;

        if attachment.depth_load_op == Some(LoadOp::Clear)
            && !(0.0..=1.0).contains(&attachment.depth_clear_value)
        {
            return Err(AttachmentError::InvalidDepthClearValue(
                attachment.depth_clear_value.to_string(),
            ));
        }

        depth_read_only = attachment.depth_read_only || !format.has_depth_aspect();
        stencil_read_only = attachment.stencil_read_only || !format.has_stencil_aspect();
        depth_stencil = Some(format);
    }

    let (Some(extent), Some(sample_count)) = (checker.extent, checker.sample_count) else {
        return Err(AttachmentError::MissingAttachments);
    };

    let occlusion_query_set = desc
        .occlusion_query_set
        .map(|id| -> Result<_, AttachmentError> {
            let query_set = resolve(&hub.query_sets, id, device)?;

            if query_set.ty != QueryType::Occlusion {
                return Err(QueryError::IncompatibleType {
                    expected: QueryType::Occlusion,
                    actual: query_set.ty,
                }
                .into());
            }

            Ok(query_set)
        })
        .transpose()?;

    Ok(PassAttachments {
        context: RenderPassContext {
            colors,
            depth_stencil,
            sample_count,
        },
        extent,
        depth_read_only,
        stencil_read_only,
        occlusion_query_set,
    })
}

#[derive(Debug)]
struct RenderPassState {
    status: PassStatus,
    recording: Recording<RenderPassError>,
    draw: DrawState,
    /// Index of the active occlusion query.
    active_query: Option<u32>,
    /// Occlusion queries already written by the pass.
    written_queries: Vec<u32>,
    draw_count: u64,
}

#[derive(Debug)]
pub struct RenderPassEncoder {
    pub(crate) info: ResourceInfo,
    pub(crate) parent: Arc<CommandEncoder>,
    /// Whether the pass locked its parent when it began.
    locks_parent: bool,
    attachments: PassAttachments,
    max_draw_count: u64,
    state: Mutex<RenderPassState>,
}

crate::resource::impl_resource_type!(RenderPassEncoder, RenderPassEncoder, "RenderPassEncoder");

impl RenderPassEncoder {
    fn command_context<'a>(&'a self, hub: &'a Hub) -> RenderCommandContext<'a> {
        RenderCommandContext {
            hub,
            device: &self.parent.device,
            context: &self.attachments.context,
            depth_read_only: self.attachments.depth_read_only,
            stencil_read_only: self.attachments.stencil_read_only,
        }
    }

    /// Record one command with `f`.
    ///
    /// Commands recorded after `end` are errors of the parent encoder.
    fn record<F>(&self, scope: PassErrorScope, f: F)
    where
        F: FnOnce(&mut RenderPassState) -> Result<(), RenderPassErrorInner>,
    {
        let mut state = self.state.lock();

        if state.status == PassStatus::Ended {
            drop(state);
            self.parent
                .record_error(RenderPassError { scope, inner: RenderPassErrorInner::Ended }.into());
            return;
        }

        match f(&mut *state).map_pass_err(scope) {
            Ok(()) => state.recording.commands += 1,
            Err(err) => state.recording.set_error(err),
        }
    }

    /// Record a draw, counting it against the maximum draw count.
    fn record_draw<F>(&self, scope: PassErrorScope, draws: u64, f: F)
    where
        F: FnOnce(&mut RenderPassState) -> Result<(), RenderPassErrorInner>,
    {
        let max_draw_count = self.max_draw_count;

        self.record(scope, |state| {
            f(&mut *state)?;
            state.draw_count += draws;

            if state.draw_count > max_draw_count {
                return Err(RenderPassErrorInner::DrawCountExceeded(max_draw_count));
            }

            Ok(())
        });
    }

    fn end(&self) {
        let mut state = self.state.lock();

        if state.status == PassStatus::Ended {
            drop(state);
            self.parent.record_error(
                RenderPassError {
                    scope: PassErrorScope::End,
                    inner: RenderPassErrorInner::Ended,
                }
                .into(),
            );
            return;
        }

        state.status = PassStatus::Ended;
        state.draw.reset();

        let active_query = state.active_query.take();
        let mut recording = std::mem::take(&mut state.recording);
        drop(state);

        let end_error = |inner: RenderPassErrorInner| RenderPassError {
            scope: PassErrorScope::End,
            inner,
        };

        if active_query.is_some() {
            recording.set_error(end_error(RenderPassErrorInner::OcclusionQueryActive));
        }

        if recording.debug_depth != 0 {
            recording.set_error(end_error(RenderPassErrorInner::UnbalancedDebugGroups(
                recording.debug_depth,
            )));
        }

        if !self.locks_parent {
            return;
        }

        if let Err(err) = self.parent.unlock(recording) {
            self.parent.record_error(CommandEncoderError::State(err));
        }
    }
}

impl Global {
    pub fn command_encoder_begin_render_pass(
        &self,
        encoder_id: id::CommandEncoderId,
        desc: &RenderPassDescriptor,
    ) -> Result<id::RenderPassEncoderId, InvalidId> {
        profiling::scope!("CommandEncoder::begin_render_pass");
        api_log!("CommandEncoder::begin_render_pass {encoder_id:?}");

        let encoder = self.hub.command_encoders.get(encoder_id)?;
        let locks_parent = encoder.lock();

        let mut recording = Recording::default();
        let pass_error = |inner: RenderPassErrorInner| RenderPassError {
            scope: PassErrorScope::Pass,
            inner,
        };

        let attachments = match validate_attachments(&self.hub, &encoder.device, desc) {
            Ok(attachments) => {
                if let Some(query_set) = &attachments.occlusion_query_set {
                    recording.used.add_query_set(query_set);
                }

                attachments
            }
            Err(err) => {
                recording.set_error(pass_error(err.into()));
                PassAttachments::default()
            }
        };

        if let Some(writes) = &desc.timestamp_writes {
            match validate_timestamp_writes(&self.hub, &encoder.device, writes) {
                Ok(query_set) => recording.used.add_query_set(&query_set),
                Err(err) => recording.set_error(pass_error(err.into())),
            }
        }

        let pass = RenderPassEncoder {
            info: ResourceInfo::new(desc.label.borrow_option(), false),
            parent: encoder,
            locks_parent,
            attachments,
            max_draw_count: desc.max_draw_count,
            state: Mutex::new(RenderPassState {
                status: PassStatus::Recording,
                recording,
                draw: DrawState::default(),
                active_query: None,
                written_queries: Vec::new(),
                draw_count: 0,
            }),
        };

        let (id, _) = self.hub.render_passes.register(pass);
        Ok(id)
    }

    pub fn render_pass_encoder_begin_occlusion_query(
        &self,
        pass_id: id::RenderPassEncoderId,
        query_index: u32,
    ) -> Result<(), InvalidId> {
        api_log!("RenderPass::begin_occlusion_query {pass_id:?} {query_index}");

        let pass = self.hub.render_passes.get(pass_id)?;
        let query_set = pass.attachments.occlusion_query_set.clone();

        pass.record(PassErrorScope::BeginOcclusionQuery, |state| {
            let query_set = query_set.ok_or(QueryError::MissingOcclusionQuerySet)?;

            if state.active_query.is_some() {
                return Err(QueryError::AlreadyActive.into());
            }

            query_set.validate_query(QueryType::Occlusion, query_index)?;

            if state.written_queries.contains(&query_index) {
                return Err(QueryError::QueryAlreadyWritten(query_index).into());
            }

            state.written_queries.push(query_index);
            state.active_query = Some(query_index);
            Ok(())
        });

        Ok(())
    }

    pub fn render_pass_encoder_draw(
        &self,
        pass_id: id::RenderPassEncoderId,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> Result<(), InvalidId> {
        api_log!(
            "RenderPass::draw {pass_id:?} {vertex_count} {instance_count} {first_vertex} {first_instance}"
        );

        let pass = self.hub.render_passes.get(pass_id)?;
        let scope = PassErrorScope::Draw {
            indexed: false,
            indirect: false,
        };

        pass.record_draw(scope, 1, |state| {
            state.draw.validate_draw().map_err(RenderCommandError::from)?;
            Ok(())
        });

        Ok(())
    }

    pub fn render_pass_encoder_draw_indexed(
        &self,
        pass_id: id::RenderPassEncoderId,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    ) -> Result<(), InvalidId> {
        api_log!(
            "RenderPass::draw_indexed {pass_id:?} {index_count} {instance_count} {first_index} {base_vertex} {first_instance}"
        );

        let pass = self.hub.render_passes.get(pass_id)?;
        let scope = PassErrorScope::Draw {
            indexed: true,
            indirect: false,
        };

        pass.record_draw(scope, 1, |state| {
            state
                .draw
                .validate_draw_indexed(Some((first_index, index_count)))
                .map_err(RenderCommandError::from)?;
            Ok(())
        });

        Ok(())
    }

    pub fn render_pass_encoder_draw_indexed_indirect(
        &self,
        pass_id: id::RenderPassEncoderId,
        indirect_buffer_id: id::BufferId,
        indirect_offset: BufferAddress,
    ) -> Result<(), InvalidId> {
        api_log!("RenderPass::draw_indexed_indirect {pass_id:?} {indirect_buffer_id:?} {indirect_offset}");
        self.render_pass_draw_indirect(pass_id, indirect_buffer_id, indirect_offset, true)
    }

    pub fn render_pass_encoder_draw_indirect(
        &self,
        pass_id: id::RenderPassEncoderId,
        indirect_buffer_id: id::BufferId,
        indirect_offset: BufferAddress,
    ) -> Result<(), InvalidId> {
        api_log!("RenderPass::draw_indirect {pass_id:?} {indirect_buffer_id:?} {indirect_offset}");
        self.render_pass_draw_indirect(pass_id, indirect_buffer_id, indirect_offset, false)
    }

    fn render_pass_draw_indirect(
        &self,
        pass_id: id::RenderPassEncoderId,
        indirect_buffer_id: id::BufferId,
        indirect_offset: BufferAddress,
        indexed: bool,
    ) -> Result<(), InvalidId> {
        let pass = self.hub.render_passes.get(pass_id)?;
        let cx = pass.command_context(&self.hub);
        let scope = PassErrorScope::Draw {
            indexed,
            indirect: true,
        };

        pass.record_draw(scope, 1, |state| {
            cx.draw_indirect(
                &state.draw,
                &mut state.recording.used,
                indirect_buffer_id,
                indirect_offset,
                indexed,
                1,
            )?;
            Ok(())
        });

        Ok(())
    }

    pub fn render_pass_encoder_end(&self, pass_id: id::RenderPassEncoderId) -> Result<(), InvalidId> {
        api_log!("RenderPass::end {pass_id:?}");

        self.hub.render_passes.get(pass_id)?.end();
        Ok(())
    }

    pub fn render_pass_encoder_end_occlusion_query(&self, pass_id: id::RenderPassEncoderId) -> Result<(), InvalidId> {
        api_log!("RenderPass::end_occlusion_query {pass_id:?}");

        let pass = self.hub.render_passes.get(pass_id)?;
        pass.record(PassErrorScope::EndOcclusionQuery, |state| {
            state.active_query.take().ok_or(QueryError::NotActive)?;
            Ok(())
        });

        Ok(())
    }

    pub fn render_pass_encoder_execute_bundles(
        &self,
        pass_id: id::RenderPassEncoderId,
        bundle_ids: &[id::RenderBundleId],
    ) -> Result<(), InvalidId> {
        api_log!("RenderPass::execute_bundles {pass_id:?} {bundle_ids:?}");

        let pass = self.hub.render_passes.get(pass_id)?;
        let device = &pass.parent.device;
        let attachments = &pass.attachments;

        let mut draws = 0;
        let mut bundles = Vec::with_capacity(bundle_ids.len());

        let result = bundle_ids.iter().try_for_each(|&id| -> Result<(), RenderPassErrorInner> {
            let bundle = resolve(&self.hub.render_bundles, id, device)?;

            attachments
                .context
                .check_compatible(&bundle.context)
                .map_err(RenderPassErrorInner::IncompatibleBundle)?;

            if (attachments.depth_read_only && !bundle.depth_read_only)
                || (attachments.stencil_read_only && !bundle.stencil_read_only)
            {
                return Err(RenderPassErrorInner::IncompatibleBundleReadOnly);
            }

            draws += bundle.draw_count;
            bundles.push(bundle);
            Ok(())
        });

        pass.record_draw(PassErrorScope::ExecuteBundles, draws, |state| {
            result?;

            for bundle in &bundles {
                state.recording.used.merge(&bundle.used);
                state.recording.commands += bundle.commands;
            }

            state.draw.reset();
            Ok(())
        });

        Ok(())
    }

    pub fn render_pass_encoder_insert_debug_marker(
        &self,
        pass_id: id::RenderPassEncoderId,
        marker: &str,
    ) -> Result<(), InvalidId> {
        api_log!("RenderPass::insert_debug_marker {pass_id:?} {marker}");

        let pass = self.hub.render_passes.get(pass_id)?;
        pass.record(PassErrorScope::Pass, |_| Ok(()));
        Ok(())
    }

    pub fn render_pass_encoder_multi_draw_indexed_indirect(
        &self,
        pass_id: id::RenderPassEncoderId,
        indirect_buffer_id: id::BufferId,
        indirect_offset: BufferAddress,
        max_draw_count: u32,
        draw_count_buffer_id: Option<id::BufferId>,
        draw_count_buffer_offset: BufferAddress,
    ) -> Result<(), InvalidId> {
        api_log!(
            "RenderPass::multi_draw_indexed_indirect {pass_id:?} {indirect_buffer_id:?} {indirect_offset} {max_draw_count}"
        );

        self.render_pass_multi_draw_indirect(
            pass_id,
            indirect_buffer_id,
            indirect_offset,
            max_draw_count,
            draw_count_buffer_id,
            draw_count_buffer_offset,
            true,
        )
    }

    pub fn render_pass_encoder_multi_draw_indirect(
        &self,
        pass_id: id::RenderPassEncoderId,
        indirect_buffer_id: id::BufferId,
        indirect_offset: BufferAddress,
        max_draw_count: u32,
        draw_count_buffer_id: Option<id::BufferId>,
        draw_count_buffer_offset: BufferAddress,
    ) -> Result<(), InvalidId> {
        api_log!(
            "RenderPass::multi_draw_indirect {pass_id:?} {indirect_buffer_id:?} {indirect_offset} {max_draw_count}"
        );

        self.render_pass_multi_draw_indirect(
            pass_id,
            indirect_buffer_id,
            indirect_offset,
            max_draw_count,
            draw_count_buffer_id,
            draw_count_buffer_offset,
            false,
        )
    }

    fn render_pass_multi_draw_indirect(
        &self,
        pass_id: id::RenderPassEncoderId,
        indirect_buffer_id: id::BufferId,
        indirect_offset: BufferAddress,
        max_draw_count: u32,
        draw_count_buffer_id: Option<id::BufferId>,
        draw_count_buffer_offset: BufferAddress,
        indexed: bool,
    ) -> Result<(), InvalidId> {
        let pass = self.hub.render_passes.get(pass_id)?;
        let cx = pass.command_context(&self.hub);

        pass.record_draw(
            PassErrorScope::MultiDrawIndirect { indexed },
            max_draw_count as u64,
            |state| {
                cx.device.require_feature(FeatureName::MultiDrawIndirect)?;

                cx.draw_indirect(
                    &state.draw,
                    &mut state.recording.used,
                    indirect_buffer_id,
                    indirect_offset,
                    indexed,
                    max_draw_count,
                )?;

                if let Some(count_buffer_id) = draw_count_buffer_id {
                    let count_buffer = resolve(&self.hub.buffers, count_buffer_id, cx.device)?;
                    check_indirect_buffer(&count_buffer, draw_count_buffer_offset, 4)
                        .map_err(RenderCommandError::from)?;
                    state.recording.used.add_buffer(&count_buffer);
                }

                Ok(())
            },
        );

        Ok(())
    }

    pub fn render_pass_encoder_pixel_local_storage_barrier(
        &self,
        pass_id: id::RenderPassEncoderId,
    ) -> Result<(), InvalidId> {
        api_log!("RenderPass::pixel_local_storage_barrier {pass_id:?}");

        let pass = self.hub.render_passes.get(pass_id)?;
        let device = &pass.parent.device;

        pass.record(PassErrorScope::PixelLocalStorageBarrier, |_| {
            if device.has_feature(FeatureName::PixelLocalStorageCoherent) {
                return Ok(());
            }

            device.require_feature(FeatureName::PixelLocalStorageNonCoherent)?;
            Ok(())
        });

        Ok(())
    }

    pub fn render_pass_encoder_pop_debug_group(&self, pass_id: id::RenderPassEncoderId) -> Result<(), InvalidId> {
        api_log!("RenderPass::pop_debug_group {pass_id:?}");

        let pass = self.hub.render_passes.get(pass_id)?;
        pass.record(PassErrorScope::PopDebugGroup, |state| {
            if state.recording.pop_debug_group() {
                Ok(())
            } else {
                Err(RenderPassErrorInner::InvalidPopDebugGroup)
            }
        });
        Ok(())
    }

    pub fn render_pass_encoder_push_debug_group(
        &self,
        pass_id: id::RenderPassEncoderId,
        label: &str,
    ) -> Result<(), InvalidId> {
        api_log!("RenderPass::push_debug_group {pass_id:?} {label}");

        let pass = self.hub.render_passes.get(pass_id)?;
        pass.record(PassErrorScope::Pass, |state| {
            state.recording.push_debug_group();
            Ok(())
        });
        Ok(())
    }

    pub fn render_pass_encoder_set_bind_group(
        &self,
        pass_id: id::RenderPassEncoderId,
        index: u32,
        bind_group_id: Option<id::BindGroupId>,
        offsets: &[u32],
    ) -> Result<(), InvalidId> {
        api_log!("RenderPass::set_bind_group {pass_id:?} {index} {bind_group_id:?}");

        let pass = self.hub.render_passes.get(pass_id)?;
        let cx = pass.command_context(&self.hub);

        pass.record(PassErrorScope::SetBindGroup(index), |state| {
            cx.set_bind_group(
                &mut state.draw,
                &mut state.recording.used,
                index,
                bind_group_id,
                offsets,
            )?;
            Ok(())
        });

        Ok(())
    }

    pub fn render_pass_encoder_set_blend_constant(
        &self,
        pass_id: id::RenderPassEncoderId,
        color: &Color,
    ) -> Result<(), InvalidId> {
        api_log!("RenderPass::set_blend_constant {pass_id:?} {color:?}");

        let pass = self.hub.render_passes.get(pass_id)?;
        pass.record(PassErrorScope::SetBlendConstant, |_| Ok(()));
        Ok(())
    }

    pub fn render_pass_encoder_set_immediates(
        &self,
        pass_id: id::RenderPassEncoderId,
        offset: u32,
        data: &[u8],
    ) -> Result<(), InvalidId> {
        api_log!("RenderPass::set_immediates {pass_id:?} {offset} {}", data.len());

        let pass = self.hub.render_passes.get(pass_id)?;
        let device = &pass.parent.device;

        pass.record(PassErrorScope::SetImmediates, |_| {
            validate_immediates(device, offset, data.len()).map_err(RenderCommandError::from)?;
            Ok(())
        });

        Ok(())
    }

    pub fn render_pass_encoder_set_index_buffer(
        &self,
        pass_id: id::RenderPassEncoderId,
        buffer_id: id::BufferId,
        format: IndexFormat,
        offset: BufferAddress,
        size: Option<BufferAddress>,
    ) -> Result<(), InvalidId> {
        api_log!("RenderPass::set_index_buffer {pass_id:?} {buffer_id:?} {format:?} {offset} {size:?}");

        let pass = self.hub.render_passes.get(pass_id)?;
        let cx = pass.command_context(&self.hub);

        pass.record(PassErrorScope::SetIndexBuffer, |state| {
            cx.set_index_buffer(
                &mut state.draw,
                &mut state.recording.used,
                buffer_id,
                format,
                offset,
                size,
            )?;
            Ok(())
        });

        Ok(())
    }

    pub fn render_pass_encoder_set_pipeline(
        &self,
        pass_id: id::RenderPassEncoderId,
        pipeline_id: id::RenderPipelineId,
    ) -> Result<(), InvalidId> {
        api_log!("RenderPass::set_pipeline {pass_id:?} {pipeline_id:?}");

        let pass = self.hub.render_passes.get(pass_id)?;
        let cx = pass.command_context(&self.hub);

        pass.record(PassErrorScope::SetPipeline, |state| {
            cx.set_pipeline(&mut state.draw, pipeline_id)?;
            Ok(())
        });

        Ok(())
    }

    pub fn render_pass_encoder_set_scissor_rect(
        &self,
        pass_id: id::RenderPassEncoderId,
        x: u32,
        y: u32,
        w: u32,
        h: u32,
    ) -> Result<(), InvalidId> {
        api_log!("RenderPass::set_scissor_rect {pass_id:?} {x} {y} {w} {h}");

        let pass = self.hub.render_passes.get(pass_id)?;
        let target = pass.attachments.extent;

        pass.record(PassErrorScope::SetScissorRect, |_| {
            let fits = |start: u32, len: u32, bound: u32| {
                start.checked_add(len).map_or(false, |end| end <= bound)
            };

            if !fits(x, w, target.0) || !fits(y, h, target.1) {
                return Err(RenderPassErrorInner::InvalidScissorRect { x, y, w, h, target });
            }

            Ok(())
        });

        Ok(())
    }

    pub fn render_pass_encoder_set_stencil_reference(
        &self,
        pass_id: id::RenderPassEncoderId,
        reference: u32,
    ) -> Result<(), InvalidId> {
        api_log!("RenderPass::set_stencil_reference {pass_id:?} {reference}");

        let pass = self.hub.render_passes.get(pass_id)?;
        pass.record(PassErrorScope::SetStencilReference, |_| Ok(()));
        Ok(())
    }

    pub fn render_pass_encoder_set_vertex_buffer(
        &self,
        pass_id: id::RenderPassEncoderId,
        slot: u32,
        buffer_id: Option<id::BufferId>,
        offset: BufferAddress,
        size: Option<BufferAddress>,
    ) -> Result<(), InvalidId> {
        api_log!("RenderPass::set_vertex_buffer {pass_id:?} {slot} {buffer_id:?} {offset} {size:?}");

        let pass = self.hub.render_passes.get(pass_id)?;
        let cx = pass.command_context(&self.hub);

        pass.record(PassErrorScope::SetVertexBuffer(slot), |state| {
            cx.set_vertex_buffer(
                &mut state.draw,
                &mut state.recording.used,
                slot,
                buffer_id,
                offset,
                size,
            )?;
            Ok(())
        });

        Ok(())
    }

    pub fn render_pass_encoder_set_viewport(
        &self,
        pass_id: id::RenderPassEncoderId,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        min_depth: f32,
        max_depth: f32,
    ) -> Result<(), InvalidId> {
        api_log!("RenderPass::set_viewport {pass_id:?} {x} {y} {w} {h} {min_depth} {max_depth}");

        let pass = self.hub.render_passes.get(pass_id)?;
        let max = pass.parent.device.limits.max_texture_dimension_2d as f32;

        pass.record(PassErrorScope::SetViewport, |_| {
            let valid = [x, y, w, h, min_depth, max_depth].iter().all(|v| v.is_finite())
                && w >= 0.0
                && h >= 0.0
                && x >= -2.0 * max
                && y >= -2.0 * max
                && x + w <= 2.0 * max - 1.0
                && y + h <= 2.0 * max - 1.0
                && (0.0..=1.0).contains(&min_depth)
                && (0.0..=1.0).contains(&max_depth)
                && min_depth <= max_depth;

            if !valid {
                return Err(RenderPassErrorInner::InvalidViewport {
                    x: x.to_string(),
                    y: y.to_string(),
                    w: w.to_string(),
                    h: h.to_string(),
                    min_depth: min_depth.to_string(),
                    max_depth: max_depth.to_string(),
                });
            }

            Ok(())
        });

        Ok(())
    }

    pub fn render_pass_encoder_write_timestamp(
        &self,
        pass_id: id::RenderPassEncoderId,
        query_set_id: id::QuerySetId,
        query_index: u32,
    ) -> Result<(), InvalidId> {
        api_log!("RenderPass::write_timestamp {pass_id:?} {query_set_id:?} {query_index}");

        let pass = self.hub.render_passes.get(pass_id)?;
        let device = &pass.parent.device;

        pass.record(PassErrorScope::WriteTimestamp, |state| {
            let query_set = resolve_timestamp_query(&self.hub, device, query_set_id, query_index)?;
            state.recording.used.add_query_set(&query_set);
            Ok(())
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_ops_follow_read_only() {
        assert!(check_aspect_ops("depth", true, false, Some(LoadOp::Load), Some(StoreOp::Store)).is_ok());
        assert!(check_aspect_ops::<LoadOp, StoreOp>("depth", true, true, None, None).is_ok());
        assert!(check_aspect_ops::<LoadOp, StoreOp>("stencil", false, false, None, None).is_ok());

        assert_eq!(
            check_aspect_ops("depth", true, true, Some(LoadOp::Clear), Some(StoreOp::Store)),
            Err(AttachmentError::InvalidAspectOps {
                aspect: "depth",
                required: false
            })
        );
        assert_eq!(
            check_aspect_ops::<LoadOp, StoreOp>("stencil", true, false, None, None),
            Err(AttachmentError::InvalidAspectOps {
                aspect: "stencil",
                required: true
            })
        );
    }

    #[test]
    fn default_descriptor_limits_draws() {
        let desc = RenderPassDescriptor::default();
        assert_eq!(desc.max_draw_count, DEFAULT_MAX_DRAW_COUNT);
        assert!(desc.color_attachments.is_empty());
    }
}

/*! Draw state shared between render passes and bundles.
!*/

use std::sync::Arc;

use pt::{BufferAddress, BufferUsages, IndexFormat};
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    binding_model::BindError,
    command::{Binder, BinderError, ImmediatesError, UsedResources},
    device::{Device, RenderPassCompatibilityError, RenderPassContext},
    error::{MissingFeature, ObjectError},
    hub::Hub,
    id,
    pipeline::RenderPipeline,
    resource::{resolve, Buffer},
};

/// Size in bytes of the arguments of an indirect draw.
pub const DRAW_INDIRECT_SIZE: u64 = 16;
/// Size in bytes of the arguments of an indirect indexed draw.
pub const DRAW_INDEXED_INDIRECT_SIZE: u64 = 20;

/// Error validating a draw call.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum DrawError {
    #[error("Render pipeline must be set")]
    MissingPipeline,
    #[error(transparent)]
    Binder(#[from] BinderError),
    #[error("Vertex buffer {index} must be set")]
    MissingVertexBuffer { index: u32 },
    #[error("Index buffer must be set")]
    MissingIndexBuffer,
    #[error("Index {last_index} extends beyond limit {index_limit}. Did you bind the correct index buffer?")]
    IndexBeyondLimit { last_index: u64, index_limit: u64 },
    #[error("Pipeline index format ({pipeline:?}) and buffer index format ({buffer:?}) do not match")]
    UnmatchedIndexFormats {
        pipeline: IndexFormat,
        buffer: IndexFormat,
    },
}

/// Error validating a buffer used for indirect arguments.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum IndirectBufferError {
    #[error("Indirect buffer lacks the usage INDIRECT")]
    MissingIndirectUsage,
    #[error("Indirect buffer offset {0} is not a multiple of 4")]
    UnalignedOffset(BufferAddress),
    #[error("Indirect arguments {offset}..{end} overrun a buffer of size {size}")]
    Overrun { offset: u64, end: u64, size: u64 },
}

/// Validate that `size` bytes of indirect arguments can be read from
/// `buffer` at `offset`.
pub(crate) fn check_indirect_buffer(
    buffer: &Buffer,
    offset: BufferAddress,
    size: u64,
) -> Result<(), IndirectBufferError> {
    if !buffer.usage.contains(BufferUsages::INDIRECT) {
        return Err(IndirectBufferError::MissingIndirectUsage);
    }

    if offset % 4 != 0 {
        return Err(IndirectBufferError::UnalignedOffset(offset));
    }

    let end = offset.saturating_add(size);

    if end > buffer.size {
        return Err(IndirectBufferError::Overrun {
            offset,
            end,
            size: buffer.size,
        });
    }

    Ok(())
}

/// Error encountered when encoding a render command.
/// This is the shared error set between render bundles and passes.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum RenderCommandError {
    #[error(transparent)]
    Object(#[from] ObjectError),
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    Draw(#[from] DrawError),
    #[error(transparent)]
    Indirect(#[from] IndirectBufferError),
    #[error(transparent)]
    Immediates(#[from] ImmediatesError),
    #[error(transparent)]
    MissingFeature(#[from] MissingFeature),
    #[error(transparent)]
    IncompatiblePipelineTargets(#[from] RenderPassCompatibilityError),
    #[error("Pipeline writes to depth, while the pass has read-only depth access")]
    IncompatibleDepthAccess,
    #[error("Pipeline writes to stencil, while the pass has read-only stencil access")]
    IncompatibleStencilAccess,
    #[error("Vertex buffer slot {slot} is greater than the limit {max}")]
    VertexBufferIndexOutOfRange { slot: u32, max: u32 },
    #[error("Buffer lacks the usage {0:?}")]
    MissingBufferUsage(BufferUsages),
    #[error("Buffer offset {offset} is not a multiple of {alignment}")]
    UnalignedBufferOffset { offset: u64, alignment: u64 },
    #[error("Buffer range {offset}..+{size:?} is out of bounds of a buffer of size {buffer_size}")]
    BufferRangeOutOfBounds {
        offset: u64,
        size: Option<u64>,
        buffer_size: u64,
    },
    #[error("Cannot pop debug group, because the number of pushed debug groups is zero")]
    InvalidPopDebugGroup,
    #[error("{0} debug groups were pushed but never popped")]
    UnbalancedDebugGroups(u32),
}

/// Resolve the bound range of an index or vertex buffer.
fn check_bound_buffer(
    buffer: &Buffer,
    usage: BufferUsages,
    offset: BufferAddress,
    size: Option<BufferAddress>,
    alignment: u64,
) -> Result<u64, RenderCommandError> {
    if !buffer.usage.contains(usage) {
        return Err(RenderCommandError::MissingBufferUsage(usage));
    }

    if offset % alignment != 0 {
        return Err(RenderCommandError::UnalignedBufferOffset { offset, alignment });
    }

    let out_of_bounds = || RenderCommandError::BufferRangeOutOfBounds {
        offset,
        size,
        buffer_size: buffer.size,
    };

    let remaining = buffer.size.checked_sub(offset).ok_or_else(out_of_bounds)?;

    match size {
        Some(size) if size > remaining => Err(out_of_bounds()),
        Some(size) => Ok(size),
        None => Ok(remaining),
    }
}

#[derive(Debug)]
struct IndexState {
    format: IndexFormat,
    /// Size in bytes of the bound range.
    size: u64,
}

impl IndexState {
    fn limit(&self) -> u64 {
        self.size / self.format.byte_size()
    }
}

/// Pipeline, buffers and bind groups set on a render pass or bundle.
#[derive(Debug, Default)]
pub(crate) struct DrawState {
    pub(crate) pipeline: Option<Arc<RenderPipeline>>,
    index: Option<IndexState>,
    vertex: SmallVec<[bool; 8]>,
    pub(crate) binder: Binder,
}

impl DrawState {
    /// Set the pipeline, checking it renders into `context` and respects the
    /// read-only aspects of the pass.
    pub(crate) fn set_pipeline(
        &mut self,
        context: &RenderPassContext,
        depth_read_only: bool,
        stencil_read_only: bool,
        pipeline: Arc<RenderPipeline>,
    ) -> Result<(), RenderCommandError> {
        context.check_compatible(&pipeline.context)?;

        if depth_read_only && pipeline.writes_depth {
            return Err(RenderCommandError::IncompatibleDepthAccess);
        }

        if stencil_read_only && pipeline.writes_stencil {
            return Err(RenderCommandError::IncompatibleStencilAccess);
        }

        self.pipeline = Some(pipeline);
        Ok(())
    }

    pub(crate) fn set_index_buffer(
        &mut self,
        buffer: &Buffer,
        format: IndexFormat,
        offset: BufferAddress,
        size: Option<BufferAddress>,
    ) -> Result<(), RenderCommandError> {
        let size = check_bound_buffer(buffer, BufferUsages::INDEX, offset, size, format.byte_size())?;
        self.index = Some(IndexState { format, size });
        Ok(())
    }

    /// Set or clear vertex buffer `slot`.
    pub(crate) fn set_vertex_buffer(
        &mut self,
        device: &Device,
        slot: u32,
        buffer: Option<&Buffer>,
        offset: BufferAddress,
        size: Option<BufferAddress>,
    ) -> Result<(), RenderCommandError> {
        let max = device.limits.max_vertex_buffers;

        if slot >= max {
            return Err(RenderCommandError::VertexBufferIndexOutOfRange { slot, max });
        }

        let bound = match buffer {
            Some(buffer) => {
                check_bound_buffer(buffer, BufferUsages::VERTEX, offset, size, 4)?;
                true
            }
            None => false,
        };

        let slot = slot as usize;

        if self.vertex.len() <= slot {
            self.vertex.resize(slot + 1, false);
        }

        self.vertex[slot] = bound;
        Ok(())
    }

    /// Validate the state used by any draw, returning the pipeline.
    pub(crate) fn validate_draw(&self) -> Result<&Arc<RenderPipeline>, DrawError> {
        let pipeline = self.pipeline.as_ref().ok_or(DrawError::MissingPipeline)?;

        self.binder.check_compatible(&pipeline.bind_group_layouts)?;

        for index in 0..pipeline.vertex_buffer_count {
            if !self.vertex.get(index).copied().unwrap_or(false) {
                return Err(DrawError::MissingVertexBuffer { index: index as u32 });
            }
        }

        Ok(pipeline)
    }

    /// Validate the state used by an indexed draw.
    ///
    /// `indices` is the range of indices read, if known.
    pub(crate) fn validate_draw_indexed(&self, indices: Option<(u32, u32)>) -> Result<(), DrawError> {
        let pipeline = self.validate_draw()?;
        let index = self.index.as_ref().ok_or(DrawError::MissingIndexBuffer)?;

        if let Some(format) = pipeline.strip_index_format {
            if format != index.format {
                return Err(DrawError::UnmatchedIndexFormats {
                    pipeline: format,
                    buffer: index.format,
                });
            }
        }

        if let Some((first_index, index_count)) = indices {
            let last_index = first_index as u64 + index_count as u64;
            let index_limit = index.limit();

            if last_index > index_limit {
                return Err(DrawError::IndexBeyondLimit {
                    last_index,
                    index_limit,
                });
            }
        }

        Ok(())
    }

    /// Forget all state, as happens after executing bundles.
    pub(crate) fn reset(&mut self) {
        self.pipeline = None;
        self.index = None;
        self.vertex.clear();
        self.binder.reset();
    }
}


/// Render commands recorded the same way by passes and bundles.
pub(crate) struct RenderCommandContext<'a> {
    pub(crate) hub: &'a Hub,
    pub(crate) device: &'a Arc<Device>,
    pub(crate) context: &'a RenderPassContext,
    pub(crate) depth_read_only: bool,
    pub(crate) stencil_read_only: bool,
}

impl RenderCommandContext<'_> {
    pub(crate) fn set_bind_group(
        &self,
        state: &mut DrawState,
        used: &mut UsedResources,
        index: u32,
        bind_group_id: Option<id::BindGroupId>,
        offsets: &[u32],
    ) -> Result<(), RenderCommandError> {
        let group = bind_group_id
            .map(|id| resolve(&self.hub.bind_groups, id, self.device))
            .transpose()?;

        state.binder.assign(self.device, index, group.clone(), offsets)?;

        if let Some(group) = &group {
            used.add_bind_group(group);
        }

        Ok(())
    }

    pub(crate) fn set_pipeline(
        &self,
        state: &mut DrawState,
        pipeline_id: id::RenderPipelineId,
    ) -> Result<(), RenderCommandError> {
        let pipeline = resolve(&self.hub.render_pipelines, pipeline_id, self.device)?;
        state.set_pipeline(self.context, self.depth_read_only, self.stencil_read_only, pipeline)
    }

    pub(crate) fn set_index_buffer(
        &self,
        state: &mut DrawState,
        used: &mut UsedResources,
        buffer_id: id::BufferId,
        format: IndexFormat,
        offset: BufferAddress,
        size: Option<BufferAddress>,
    ) -> Result<(), RenderCommandError> {
        let buffer = resolve(&self.hub.buffers, buffer_id, self.device)?;
        state.set_index_buffer(&buffer, format, offset, size)?;
        used.add_buffer(&buffer);
        Ok(())
    }

    pub(crate) fn set_vertex_buffer(
        &self,
        state: &mut DrawState,
        used: &mut UsedResources,
        slot: u32,
        buffer_id: Option<id::BufferId>,
        offset: BufferAddress,
        size: Option<BufferAddress>,
    ) -> Result<(), RenderCommandError> {
        let buffer = buffer_id
            .map(|id| resolve(&self.hub.buffers, id, self.device))
            .transpose()?;

        state.set_vertex_buffer(self.device, slot, buffer.as_deref(), offset, size)?;

        if let Some(buffer) = &buffer {
            used.add_buffer(buffer);
        }

        Ok(())
    }

    /// Validate an indirect draw reading `count` sets of arguments.
    pub(crate) fn draw_indirect(
        &self,
        state: &DrawState,
        used: &mut UsedResources,
        buffer_id: id::BufferId,
        offset: BufferAddress,
        indexed: bool,
        count: u32,
    ) -> Result<(), RenderCommandError> {
        let buffer = resolve(&self.hub.buffers, buffer_id, self.device)?;

        let stride = if indexed {
            state.validate_draw_indexed(None)?;
            DRAW_INDEXED_INDIRECT_SIZE
        } else {
            state.validate_draw()?;
            DRAW_INDIRECT_SIZE
        };

        check_indirect_buffer(&buffer, offset, stride * count as u64)?;
        used.add_buffer(&buffer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_state_has_no_pipeline() {
        let state = DrawState::default();
        assert_eq!(state.validate_draw().err(), Some(DrawError::MissingPipeline));
        assert_eq!(
            state.validate_draw_indexed(Some((0, 3))),
            Err(DrawError::MissingPipeline)
        );
    }

    #[test]
    fn index_limit_depends_on_format() {
        let index = IndexState {
            format: IndexFormat::Uint16,
            size: 12,
        };
        assert_eq!(index.limit(), 6);

        let index = IndexState {
            format: IndexFormat::Uint32,
            size: 12,
        };
        assert_eq!(index.limit(), 3);
    }
}

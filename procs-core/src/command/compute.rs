use std::sync::Arc;

use parking_lot::Mutex;
use pt::BufferAddress;
use thiserror::Error;

use crate::{
    api_log,
    binding_model::BindError,
    command::{
        check_indirect_buffer, query::resolve_timestamp_query, validate_immediates,
        validate_timestamp_writes, Binder, BinderError, CommandEncoder, CommandEncoderError,
        ImmediatesError, IndirectBufferError, MapPassErr, PassErrorScope,
        PassStatus, PassTimestampWrites, QueryError, Recording,
    },
    error::ObjectError,
    global::Global,
    id,
    pipeline::ComputePipeline,
    resource::{resolve, ResourceInfo},
    storage::InvalidId,
    Label, LabelHelpers,
};

/// Size in bytes of the arguments of an indirect dispatch.
pub const DISPATCH_INDIRECT_SIZE: u64 = 12;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComputePassDescriptor<'a> {
    pub label: Label<'a>,
    /// Defines where and when timestamp values will be written for this pass.
    pub timestamp_writes: Option<PassTimestampWrites>,
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum DispatchError {
    #[error("Compute pipeline must be set")]
    MissingPipeline,
    #[error(transparent)]
    Binder(#[from] BinderError),
    #[error("Each current dispatch group size dimension ({current:?}) must be less or equal to {limit}")]
    InvalidGroupSize { current: [u32; 3], limit: u32 },
    #[error(transparent)]
    Indirect(#[from] IndirectBufferError),
}

/// Error encountered when performing a compute pass.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ComputePassErrorInner {
    #[error(transparent)]
    Object(#[from] ObjectError),
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Immediates(#[from] ImmediatesError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("Pass has already ended")]
    Ended,
    #[error("Cannot pop debug group, because the number of pushed debug groups is zero")]
    InvalidPopDebugGroup,
    #[error("{0} debug groups were pushed but never popped")]
    UnbalancedDebugGroups(u32),
}

/// Error encountered when performing a compute pass.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{scope}")]
pub struct ComputePassError {
    pub scope: PassErrorScope,
    #[source]
    pub(crate) inner: ComputePassErrorInner,
}

impl ComputePassError {
    pub fn inner(&self) -> &ComputePassErrorInner {
        &self.inner
    }
}

impl<T, E> MapPassErr<T, ComputePassError> for Result<T, E>
where
    E: Into<ComputePassErrorInner>,
{
    fn map_pass_err(self, scope: PassErrorScope) -> Result<T, ComputePassError> {
        self.map_err(|inner| ComputePassError {
            scope,
            inner: inner.into(),
        })
    }
}

#[derive(Debug)]
struct ComputePassState {
    status: PassStatus,
    recording: Recording<ComputePassError>,
    pipeline: Option<Arc<ComputePipeline>>,
    binder: Binder,
}

impl ComputePassState {
    fn validate_dispatch(&self) -> Result<(), DispatchError> {
        let pipeline = self.pipeline.as_ref().ok_or(DispatchError::MissingPipeline)?;
        self.binder.check_compatible(&pipeline.bind_group_layouts)?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct ComputePassEncoder {
    pub(crate) info: ResourceInfo,
    pub(crate) parent: Arc<CommandEncoder>,
    /// Whether the pass locked its parent when it began.
    locks_parent: bool,
    state: Mutex<ComputePassState>,
}

crate::resource::impl_resource_type!(ComputePassEncoder, ComputePassEncoder, "ComputePassEncoder");

impl ComputePassEncoder {
    /// Record one command with `f`.
    ///
    /// Commands recorded after `end` are errors of the parent encoder.
    fn record<F>(&self, scope: PassErrorScope, f: F)
    where
        F: FnOnce(&mut ComputePassState) -> Result<(), ComputePassErrorInner>,
    {
        let mut state = self.state.lock();

        if state.status == PassStatus::Ended {
            drop(state);
            self.parent
                .record_error(ComputePassError { scope, inner: ComputePassErrorInner::Ended }.into());
            return;
        }

        match f(&mut *state).map_pass_err(scope) {
            Ok(()) => state.recording.commands += 1,
            Err(err) => state.recording.set_error(err),
        }
    }

    fn end(&self) {
        let mut state = self.state.lock();

        if state.status == PassStatus::Ended {
            drop(state);
            self.parent.record_error(
                ComputePassError {
                    scope: PassErrorScope::End,
                    inner: ComputePassErrorInner::Ended,
                }
                .into(),
            );
            return;
        }

        state.status = PassStatus::Ended;
        state.pipeline = None;
        state.binder.reset();

        let mut recording = std::mem::take(&mut state.recording);
        drop(state);

        if recording.debug_depth != 0 {
            recording.set_error(ComputePassError {
                scope: PassErrorScope::End,
                inner: ComputePassErrorInner::UnbalancedDebugGroups(recording.debug_depth),
            });
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
    pub fn command_encoder_begin_compute_pass(
        &self,
        encoder_id: id::CommandEncoderId,
        desc: &ComputePassDescriptor,
    ) -> Result<id::ComputePassEncoderId, InvalidId> {
        api_log!("CommandEncoder::begin_compute_pass {encoder_id:?}");

        let encoder = self.hub.command_encoders.get(encoder_id)?;
        let locks_parent = encoder.lock();

        let mut recording = Recording::default();

        if let Some(writes) = &desc.timestamp_writes {
            match validate_timestamp_writes(&self.hub, &encoder.device, writes) {
                Ok(query_set) => recording.used.add_query_set(&query_set),
                Err(err) => recording.set_error(ComputePassError {
                    scope: PassErrorScope::Pass,
                    inner: err.into(),
                }),
            }
        }

        let pass = ComputePassEncoder {
            info: ResourceInfo::new(desc.label.borrow_option(), false),
            parent: encoder,
            locks_parent,
            state: Mutex::new(ComputePassState {
                status: PassStatus::Recording,
                recording,
                pipeline: None,
                binder: Binder::default(),
            }),
        };

        let (id, _) = self.hub.compute_passes.register(pass);
        Ok(id)
    }

    pub fn compute_pass_encoder_dispatch_workgroups(
        &self,
        pass_id: id::ComputePassEncoderId,
        workgroup_count_x: u32,
        workgroup_count_y: u32,
        workgroup_count_z: u32,
    ) -> Result<(), InvalidId> {
        api_log!(
            "ComputePass::dispatch {pass_id:?} {workgroup_count_x} {workgroup_count_y} {workgroup_count_z}"
        );

        let pass = self.hub.compute_passes.get(pass_id)?;
        let limit = pass.parent.device.limits.max_compute_workgroups_per_dimension;

        pass.record(PassErrorScope::Dispatch { indirect: false }, |state| {
            state.validate_dispatch()?;

            let current = [workgroup_count_x, workgroup_count_y, workgroup_count_z];

            if current.iter().any(|&count| count > limit) {
                return Err(DispatchError::InvalidGroupSize { current, limit }.into());
            }

            Ok(())
        });

        Ok(())
    }

    pub fn compute_pass_encoder_dispatch_workgroups_indirect(
        &self,
        pass_id: id::ComputePassEncoderId,
        indirect_buffer_id: id::BufferId,
        indirect_offset: BufferAddress,
    ) -> Result<(), InvalidId> {
        api_log!("ComputePass::dispatch_indirect {pass_id:?} {indirect_buffer_id:?} {indirect_offset}");

        let pass = self.hub.compute_passes.get(pass_id)?;
        let device = &pass.parent.device;

        pass.record(PassErrorScope::Dispatch { indirect: true }, |state| {
            let buffer = resolve(&self.hub.buffers, indirect_buffer_id, device)?;

            state.validate_dispatch()?;
            check_indirect_buffer(&buffer, indirect_offset, DISPATCH_INDIRECT_SIZE)
                .map_err(DispatchError::from)?;

            state.recording.used.add_buffer(&buffer);
            Ok(())
        });

        Ok(())
    }

    pub fn compute_pass_encoder_end(&self, pass_id: id::ComputePassEncoderId) -> Result<(), InvalidId> {
        api_log!("ComputePass::end {pass_id:?}");

        self.hub.compute_passes.get(pass_id)?.end();
        Ok(())
    }

    pub fn compute_pass_encoder_insert_debug_marker(
        &self,
        pass_id: id::ComputePassEncoderId,
        marker: &str,
    ) -> Result<(), InvalidId> {
        api_log!("ComputePass::insert_debug_marker {pass_id:?} {marker}");

        let pass = self.hub.compute_passes.get(pass_id)?;
        pass.record(PassErrorScope::Pass, |_| Ok(()));
        Ok(())
    }

    pub fn compute_pass_encoder_pop_debug_group(&self, pass_id: id::ComputePassEncoderId) -> Result<(), InvalidId> {
        api_log!("ComputePass::pop_debug_group {pass_id:?}");

        let pass = self.hub.compute_passes.get(pass_id)?;
        pass.record(PassErrorScope::PopDebugGroup, |state| {
            if state.recording.pop_debug_group() {
                Ok(())
            } else {
                Err(ComputePassErrorInner::InvalidPopDebugGroup)
            }
        });
        Ok(())
    }

    pub fn compute_pass_encoder_push_debug_group(
        &self,
        pass_id: id::ComputePassEncoderId,
        label: &str,
    ) -> Result<(), InvalidId> {
        api_log!("ComputePass::push_debug_group {pass_id:?} {label}");

        let pass = self.hub.compute_passes.get(pass_id)?;
        pass.record(PassErrorScope::Pass, |state| {
            state.recording.push_debug_group();
            Ok(())
        });
        Ok(())
    }

    pub fn compute_pass_encoder_set_bind_group(
        &self,
        pass_id: id::ComputePassEncoderId,
        index: u32,
        bind_group_id: Option<id::BindGroupId>,
        offsets: &[u32],
    ) -> Result<(), InvalidId> {
        api_log!("ComputePass::set_bind_group {pass_id:?} {index} {bind_group_id:?}");

        let pass = self.hub.compute_passes.get(pass_id)?;
        let device = &pass.parent.device;

        pass.record(PassErrorScope::SetBindGroup(index), |state| {
            let group = bind_group_id
                .map(|id| resolve(&self.hub.bind_groups, id, device))
                .transpose()?;

            if let Some(group) = &group {
                state.recording.used.add_bind_group(group);
            }

            state.binder.assign(device, index, group, offsets)?;
            Ok(())
        });

        Ok(())
    }

    pub fn compute_pass_encoder_set_immediates(
        &self,
        pass_id: id::ComputePassEncoderId,
        offset: u32,
        data: &[u8],
    ) -> Result<(), InvalidId> {
        api_log!("ComputePass::set_immediates {pass_id:?} {offset} {}", data.len());

        let pass = self.hub.compute_passes.get(pass_id)?;
        let device = &pass.parent.device;

        pass.record(PassErrorScope::SetImmediates, |_| {
            validate_immediates(device, offset, data.len())?;
            Ok(())
        });

        Ok(())
    }

    pub fn compute_pass_encoder_set_pipeline(
        &self,
        pass_id: id::ComputePassEncoderId,
        pipeline_id: id::ComputePipelineId,
    ) -> Result<(), InvalidId> {
        api_log!("ComputePass::set_pipeline {pass_id:?} {pipeline_id:?}");

        let pass = self.hub.compute_passes.get(pass_id)?;
        let device = &pass.parent.device;

        pass.record(PassErrorScope::SetPipeline, |state| {
            state.pipeline = Some(resolve(&self.hub.compute_pipelines, pipeline_id, device)?);
            Ok(())
        });

        Ok(())
    }

    pub fn compute_pass_encoder_write_timestamp(
        &self,
        pass_id: id::ComputePassEncoderId,
        query_set_id: id::QuerySetId,
        query_index: u32,
    ) -> Result<(), InvalidId> {
        api_log!("ComputePass::write_timestamp {pass_id:?} {query_set_id:?} {query_index}");

        let pass = self.hub.compute_passes.get(pass_id)?;
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
    fn pass_errors_keep_their_scope() {
        let result: Result<(), _> =
            Err(DispatchError::MissingPipeline).map_pass_err(PassErrorScope::Dispatch { indirect: false });

        let err = result.unwrap_err();
        assert_eq!(err.scope, PassErrorScope::Dispatch { indirect: false });
        assert_eq!(
            err.inner(),
            &ComputePassErrorInner::Dispatch(DispatchError::MissingPipeline)
        );
        assert_eq!(err.to_string(), "In a dispatch command, indirect:false");
    }
}

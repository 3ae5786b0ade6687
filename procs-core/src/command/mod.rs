mod bind;
mod bundle;
mod compute;
mod draw;
mod query;
mod render;
mod transfer;

use std::sync::Arc;

use parking_lot::Mutex;
use pt::FeatureName;
use thiserror::Error;

pub(crate) use self::bind::{validate_immediates, Binder};
pub use self::{
    bind::{BinderError, ImmediatesError},
    bundle::*,
    compute::*,
    draw::*,
    query::*,
    render::*,
    transfer::*,
};

use crate::{
    api_log,
    binding_model::ResourceTable,
    device::Device,
    error::{MissingFeature, ObjectError},
    global::Global,
    id,
    resource::{resolve, Buffer, QuerySet, QueueUseError, Resource, ResourceInfo, Texture},
    storage::InvalidId,
    Label, LabelHelpers,
};

/// Describes a [`CommandEncoder`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandEncoderDescriptor<'a> {
    pub label: Label<'a>,
}

/// Describes the [`CommandBuffer`] produced by `command_encoder_finish`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandBufferDescriptor<'a> {
    pub label: Label<'a>,
}

/// Timestamps written at the beginning and end of a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PassTimestampWrites {
    pub query_set: id::QuerySetId,
    pub beginning_of_pass_write_index: Option<u32>,
    pub end_of_pass_write_index: Option<u32>,
}

/// The current state of a [`CommandEncoder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CommandEncoderStatus {
    /// Ready to record commands.
    Open,
    /// A pass is being recorded. Commands recorded on the encoder itself
    /// are errors until the pass ends.
    Locked,
    /// `command_encoder_finish` has been called.
    Ended,
}

/// Whether a pass is still recording.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PassStatus {
    Recording,
    Ended,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EncoderStateError {
    #[error("Encoder is locked by a previously created render/compute pass. Before recording any new commands, the pass must be ended.")]
    Locked,
    #[error("Encoder is finished and can't be used")]
    Ended,
    #[error("Encoder is not currently locked. A pass can only be ended while the encoder is locked.")]
    Unlocked,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CommandEncoderError {
    #[error(transparent)]
    State(#[from] EncoderStateError),
    #[error(transparent)]
    Object(#[from] ObjectError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Clear(#[from] ClearError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    ComputePass(#[from] ComputePassError),
    #[error(transparent)]
    RenderPass(#[from] RenderPassError),
    #[error(transparent)]
    MissingFeature(#[from] MissingFeature),
    #[error("Cannot pop debug group, because the number of pushed debug groups is zero")]
    InvalidPopDebugGroup,
    #[error("{0} debug groups were pushed but never popped")]
    UnbalancedDebugGroups(u32),
    #[error("{0}")]
    Injected(String),
}

/// The pass command an error happened in.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum PassErrorScope {
    #[error("In a pass parameter")]
    Pass,
    #[error("In a set_bind_group command")]
    SetBindGroup(u32),
    #[error("In a set_pipeline command")]
    SetPipeline,
    #[error("In a set_immediates command")]
    SetImmediates,
    #[error("In a set_index_buffer command")]
    SetIndexBuffer,
    #[error("In a set_vertex_buffer command")]
    SetVertexBuffer(u32),
    #[error("In a set_viewport command")]
    SetViewport,
    #[error("In a set_scissor_rect command")]
    SetScissorRect,
    #[error("In a set_blend_constant command")]
    SetBlendConstant,
    #[error("In a set_stencil_reference command")]
    SetStencilReference,
    #[error("In a dispatch command, indirect:{indirect}")]
    Dispatch { indirect: bool },
    #[error("In a draw command, indexed:{indexed} indirect:{indirect}")]
    Draw { indexed: bool, indirect: bool },
    #[error("In a multi_draw_indirect command, indexed:{indexed}")]
    MultiDrawIndirect { indexed: bool },
    #[error("In a begin_occlusion_query command")]
    BeginOcclusionQuery,
    #[error("In an end_occlusion_query command")]
    EndOcclusionQuery,
    #[error("In an execute_bundles command")]
    ExecuteBundles,
    #[error("In a pixel_local_storage_barrier command")]
    PixelLocalStorageBarrier,
    #[error("In a write_timestamp command")]
    WriteTimestamp,
    #[error("In a pop_debug_group command")]
    PopDebugGroup,
    #[error("In an end command")]
    End,
}

trait MapPassErr<T, O> {
    fn map_pass_err(self, scope: PassErrorScope) -> Result<T, O>;
}

/// Resources referenced by recorded commands, checked when the commands are
/// submitted.
#[derive(Debug, Default)]
pub(crate) struct UsedResources {
    pub(crate) buffers: Vec<Arc<Buffer>>,
    pub(crate) textures: Vec<Arc<Texture>>,
    pub(crate) query_sets: Vec<Arc<QuerySet>>,
}

fn push_unique<T>(list: &mut Vec<Arc<T>>, value: &Arc<T>) {
    if !list.iter().any(|v| Arc::ptr_eq(v, value)) {
        list.push(value.clone());
    }
}

impl UsedResources {
    pub(crate) fn add_buffer(&mut self, buffer: &Arc<Buffer>) {
        push_unique(&mut self.buffers, buffer);
    }

    pub(crate) fn add_texture(&mut self, texture: &Arc<Texture>) {
        push_unique(&mut self.textures, texture);
    }

    pub(crate) fn add_query_set(&mut self, query_set: &Arc<QuerySet>) {
        push_unique(&mut self.query_sets, query_set);
    }

    pub(crate) fn add_bind_group(&mut self, group: &crate::binding_model::BindGroup) {
        for buffer in group.buffers() {
            self.add_buffer(buffer);
        }

        for texture in group.textures() {
            self.add_texture(texture);
        }
    }

    pub(crate) fn merge(&mut self, other: &UsedResources) {
        for buffer in &other.buffers {
            self.add_buffer(buffer);
        }

        for texture in &other.textures {
            self.add_texture(texture);
        }

        for query_set in &other.query_sets {
            self.add_query_set(query_set);
        }
    }

    pub(crate) fn check_queue_use(&self) -> Result<(), QueueUseError> {
        for buffer in &self.buffers {
            buffer.check_queue_use()?;
        }

        for texture in &self.textures {
            texture.check_queue_use()?;
        }

        for query_set in &self.query_sets {
            query_set.check_queue_use()?;
        }

        Ok(())
    }
}

/// Recording state shared by encoders and passes.
#[derive(Debug)]
pub(crate) struct Recording<E> {
    /// First error encountered while recording.
    pub(crate) error: Option<E>,
    pub(crate) commands: usize,
    pub(crate) debug_depth: u32,
    pub(crate) used: UsedResources,
}

impl<E> Default for Recording<E> {
    fn default() -> Self {
        Self {
            error: None,
            commands: 0,
            debug_depth: 0,
            used: UsedResources::default(),
        }
    }
}

impl<E> Recording<E> {
    /// Keep the first error, later ones are consequences of it.
    pub(crate) fn set_error(&mut self, error: E) {
        self.error.get_or_insert(error);
    }

    pub(crate) fn push_debug_group(&mut self) {
        self.debug_depth += 1;
    }

    /// Returns `false` if no debug group is open.
    pub(crate) fn pop_debug_group(&mut self) -> bool {
        if self.debug_depth == 0 {
            return false;
        }

        self.debug_depth -= 1;
        true
    }
}

#[derive(Debug)]
pub(crate) struct EncoderState {
    pub(crate) status: CommandEncoderStatus,
    pub(crate) recording: Recording<CommandEncoderError>,
    pub(crate) resource_table: Option<Arc<ResourceTable>>,
}

#[derive(Debug)]
pub struct CommandEncoder {
    pub(crate) info: ResourceInfo,
    pub(crate) device: Arc<Device>,
    pub(crate) state: Mutex<EncoderState>,
}

crate::resource::impl_resource_type!(CommandEncoder, CommandEncoder, "CommandEncoder");
crate::resource::impl_parent_device!(CommandEncoder);

impl CommandEncoder {
    pub(crate) fn new(device: &Arc<Device>, desc: &CommandEncoderDescriptor) -> Self {
        Self {
            info: ResourceInfo::new(desc.label.borrow_option(), false),
            device: device.clone(),
            state: Mutex::new(EncoderState {
                status: CommandEncoderStatus::Open,
                recording: Recording::default(),
                resource_table: None,
            }),
        }
    }

    /// Record one command with `f`.
    ///
    /// A finished encoder reports the misuse to the device right away. A
    /// locked encoder, or a failing `f`, stores the error until `finish`.
    pub(crate) fn record<F>(&self, f: F)
    where
        F: FnOnce(&mut Recording<CommandEncoderError>) -> Result<(), CommandEncoderError>,
    {
        let mut state = self.state.lock();

        match state.status {
            CommandEncoderStatus::Ended => {
                drop(state);
                self.device.validation_error(EncoderStateError::Ended);
            }
            CommandEncoderStatus::Locked => {
                state.recording.set_error(EncoderStateError::Locked.into());
            }
            CommandEncoderStatus::Open => match f(&mut state.recording) {
                Ok(()) => state.recording.commands += 1,
                Err(err) => state.recording.set_error(err),
            },
        }
    }

    /// Record an error produced outside of [`CommandEncoder::record`], such
    /// as from a pass.
    pub(crate) fn record_error(&self, error: CommandEncoderError) {
        let mut state = self.state.lock();

        if state.status == CommandEncoderStatus::Ended {
            drop(state);
            self.device.validation_error(error);
        } else {
            state.recording.set_error(error);
        }
    }

    /// Lock the encoder for a new pass.
    ///
    /// Returns `true` if the pass owns the lock.
    pub(crate) fn lock(&self) -> bool {
        let mut state = self.state.lock();

        match state.status {
            CommandEncoderStatus::Open => {
                state.status = CommandEncoderStatus::Locked;
                true
            }
            CommandEncoderStatus::Locked => {
                state.recording.set_error(EncoderStateError::Locked.into());
                false
            }
            CommandEncoderStatus::Ended => {
                drop(state);
                self.device.validation_error(EncoderStateError::Ended);
                false
            }
        }
    }

    /// Unlock the encoder at the end of a pass, taking over what the pass
    /// recorded.
    pub(crate) fn unlock<E>(&self, pass: Recording<E>) -> Result<(), EncoderStateError>
    where
        CommandEncoderError: From<E>,
    {
        let mut state = self.state.lock();

        match state.status {
            CommandEncoderStatus::Locked => {
                state.status = CommandEncoderStatus::Open;
                state.recording.commands += pass.commands + 1;
                state.recording.used.merge(&pass.used);

                if let Some(error) = pass.error {
                    state.recording.set_error(error.into());
                }

                Ok(())
            }
            CommandEncoderStatus::Open => Err(EncoderStateError::Unlocked),
            CommandEncoderStatus::Ended => Err(EncoderStateError::Ended),
        }
    }

    fn finish(&self) -> Result<Recording<CommandEncoderError>, CommandEncoderError> {
        let mut state = self.state.lock();

        let status = std::mem::replace(&mut state.status, CommandEncoderStatus::Ended);
        let recording = std::mem::take(&mut state.recording);
        state.resource_table = None;
        drop(state);

        match status {
            CommandEncoderStatus::Open => {}
            CommandEncoderStatus::Locked => return Err(EncoderStateError::Locked.into()),
            CommandEncoderStatus::Ended => return Err(EncoderStateError::Ended.into()),
        }

        if let Some(error) = recording.error {
            return Err(error);
        }

        if recording.debug_depth != 0 {
            return Err(CommandEncoderError::UnbalancedDebugGroups(recording.debug_depth));
        }

        Ok(recording)
    }
}

#[derive(Debug)]
pub struct CommandBuffer {
    pub(crate) info: ResourceInfo,
    pub(crate) device: Arc<Device>,
    pub(crate) submitted: Mutex<bool>,
    pub(crate) used: UsedResources,
    pub(crate) commands: usize,
}

crate::resource::impl_resource_type!(CommandBuffer, CommandBuffer, "CommandBuffer");
crate::resource::impl_parent_device!(CommandBuffer);

impl CommandBuffer {
    fn new(device: &Arc<Device>, label: Option<&str>, recording: Option<Recording<CommandEncoderError>>) -> Self {
        let error = recording.is_none();
        let recording = recording.unwrap_or_default();

        Self {
            info: ResourceInfo::new(label, error),
            device: device.clone(),
            submitted: Mutex::new(false),
            used: recording.used,
            commands: recording.commands,
        }
    }
}

impl Global {
    pub fn command_encoder_finish(
        &self,
        encoder_id: id::CommandEncoderId,
        desc: Option<&CommandBufferDescriptor>,
    ) -> Result<id::CommandBufferId, InvalidId> {
        profiling::scope!("CommandEncoder::finish");
        api_log!("CommandEncoder::finish {encoder_id:?}");

        let encoder = self.hub.command_encoders.get(encoder_id)?;
        let label = desc.and_then(|desc| desc.label.borrow_option());

        let recording = match encoder.finish() {
            Ok(recording) => Some(recording),
            Err(err) => {
                encoder.device.validation_error(err);
                None
            }
        };

        let buffer = CommandBuffer::new(&encoder.device, label, recording);
        let (id, _) = self.hub.command_buffers.register(buffer);
        Ok(id)
    }

    pub fn command_encoder_inject_validation_error(
        &self,
        encoder_id: id::CommandEncoderId,
        message: &str,
    ) -> Result<(), InvalidId> {
        api_log!("CommandEncoder::inject_validation_error {encoder_id:?} {message}");

        let encoder = self.hub.command_encoders.get(encoder_id)?;
        encoder.record(|_| Err(CommandEncoderError::Injected(message.to_owned())));
        Ok(())
    }

    pub fn command_encoder_insert_debug_marker(
        &self,
        encoder_id: id::CommandEncoderId,
        marker: &str,
    ) -> Result<(), InvalidId> {
        api_log!("CommandEncoder::insert_debug_marker {encoder_id:?} {marker}");

        let encoder = self.hub.command_encoders.get(encoder_id)?;
        encoder.record(|_| Ok(()));
        Ok(())
    }

    pub fn command_encoder_pop_debug_group(&self, encoder_id: id::CommandEncoderId) -> Result<(), InvalidId> {
        api_log!("CommandEncoder::pop_debug_group {encoder_id:?}");

        let encoder = self.hub.command_encoders.get(encoder_id)?;
        encoder.record(|recording| {
            if recording.pop_debug_group() {
                Ok(())
            } else {
                Err(CommandEncoderError::InvalidPopDebugGroup)
            }
        });
        Ok(())
    }

    pub fn command_encoder_push_debug_group(
        &self,
        encoder_id: id::CommandEncoderId,
        label: &str,
    ) -> Result<(), InvalidId> {
        api_log!("CommandEncoder::push_debug_group {encoder_id:?} {label}");

        let encoder = self.hub.command_encoders.get(encoder_id)?;
        encoder.record(|recording| {
            recording.push_debug_group();
            Ok(())
        });
        Ok(())
    }

    /// Set the resource table used by the passes recorded afterwards.
    pub fn command_encoder_set_resource_table(
        &self,
        encoder_id: id::CommandEncoderId,
        resource_table_id: Option<id::ResourceTableId>,
    ) -> Result<(), InvalidId> {
        api_log!("CommandEncoder::set_resource_table {encoder_id:?} {resource_table_id:?}");

        let encoder = self.hub.command_encoders.get(encoder_id)?;

        let table = resource_table_id.map(|id| resolve(&self.hub.resource_tables, id, &encoder.device));
        let mut state = encoder.state.lock();

        match check_resource_table(&encoder.device, state.status, table) {
            Ok(table) => {
                state.resource_table = table;
                state.recording.commands += 1;
            }
            Err(CommandEncoderError::State(EncoderStateError::Ended)) => {
                drop(state);
                encoder.device.validation_error(EncoderStateError::Ended);
            }
            Err(err) => state.recording.set_error(err),
        }

        Ok(())
    }
}

fn check_resource_table(
    device: &Device,
    status: CommandEncoderStatus,
    table: Option<Result<Arc<ResourceTable>, ObjectError>>,
) -> Result<Option<Arc<ResourceTable>>, CommandEncoderError> {
    match status {
        CommandEncoderStatus::Open => {}
        CommandEncoderStatus::Locked => return Err(EncoderStateError::Locked.into()),
        CommandEncoderStatus::Ended => return Err(EncoderStateError::Ended.into()),
    }

    device.require_feature(FeatureName::ResourceTables)?;
    let table = table.transpose()?;

    if let Some(table) = &table {
        if table.is_destroyed() {
            return Err(ObjectError::Destroyed(ResourceTable::TYPE, table.label()).into());
        }
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_error_wins() {
        let mut recording = Recording::<CommandEncoderError>::default();
        recording.set_error(CommandEncoderError::InvalidPopDebugGroup);
        recording.set_error(CommandEncoderError::Injected(String::from("later")));
        assert_eq!(recording.error, Some(CommandEncoderError::InvalidPopDebugGroup));
    }

    #[test]
    fn debug_groups_balance() {
        let mut recording = Recording::<CommandEncoderError>::default();
        assert!(!recording.pop_debug_group());

        recording.push_debug_group();
        recording.push_debug_group();
        assert!(recording.pop_debug_group());
        assert_eq!(recording.debug_depth, 1);
    }
}

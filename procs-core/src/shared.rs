//! Shared buffer and texture memory, and the fences that order access to it.
//!
//! A resource created from a shared memory object can only be used by the
//! queue between `begin_access` and `end_access`. A buffer memory allows one
//! access at a time. A texture memory also allows any number of concurrent
//! read accesses on initialized contents.
//!
//! Fences are plain values here: importing one records its type and native
//! handle, and ending an access hands back fences that are already signaled.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use parking_lot::Mutex;
use pt::{
    BufferAddress, BufferUsages, Extent3d, FeatureName, SharedFenceType, TextureDimension,
    TextureFormat, TextureUsages,
};
use thiserror::Error;

use crate::{
    api_log,
    device::Device,
    error::{MissingFeature, ObjectError},
    global::Global,
    hub::Hub,
    id,
    resource::{
        resolve, validate_texture_descriptor, Buffer, BufferDescriptor, CreateBufferError,
        CreateTextureError, QueueUseError, Resource, ResourceInfo, Texture, TextureDescriptor,
    },
    storage::InvalidId,
    Label, LabelHelpers,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SharedMemoryError {
    #[error(transparent)]
    Invalid(#[from] InvalidId),
    #[error(transparent)]
    Object(#[from] ObjectError),
    #[error(transparent)]
    MissingFeature(#[from] MissingFeature),
    #[error("{0} is an error object")]
    ErrorMemory(&'static str),
    #[error("{0} with label {1:?} was not created from this memory")]
    ForeignResource(&'static str, String),
    #[error("{0} with label {1:?} is already being accessed")]
    AlreadyAccessed(&'static str, String),
    #[error("{0} with label {1:?} is not being accessed")]
    NotAccessed(&'static str, String),
    #[error("Memory is exclusively accessed by another resource")]
    Exclusive,
    #[error("Concurrent read access requires initialized contents")]
    ConcurrentReadUninitialized,
    #[error("Buffers can't be accessed concurrently")]
    ConcurrentBuffer,
    #[error("{fences} fences were given with {signaled_values} signaled values")]
    FenceCountMismatch { fences: usize, signaled_values: usize },
    #[error("Descriptor does not match the memory: {0}")]
    IncompatibleDescriptor(&'static str),
    #[error(transparent)]
    CreateBuffer(#[from] CreateBufferError),
    #[error(transparent)]
    CreateTexture(#[from] CreateTextureError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AccessKind {
    Exclusive,
    ConcurrentRead,
}

#[derive(Debug, Default)]
struct MemoryAccess {
    exclusive: bool,
    readers: u32,
}

#[derive(Debug)]
struct ResourceAccess {
    kind: Option<AccessKind>,
    initialized: bool,
    fences: Vec<(Arc<SharedFence>, u64)>,
}

/// Access tracking of a resource created from shared memory.
#[derive(Debug)]
pub(crate) struct SharedAccess {
    memory: Arc<Mutex<MemoryAccess>>,
    state: Mutex<ResourceAccess>,
}

impl SharedAccess {
    fn new(memory: &Arc<Mutex<MemoryAccess>>) -> Self {
        Self {
            memory: memory.clone(),
            state: Mutex::new(ResourceAccess {
                kind: None,
                initialized: false,
                fences: Vec::new(),
            }),
        }
    }

    /// Fails unless an access to the resource is active.
    pub(crate) fn check_access(&self, kind: &'static str, label: &str) -> Result<(), QueueUseError> {
        if self.state.lock().kind.is_some() {
            Ok(())
        } else {
            Err(QueueUseError::NoSharedAccess(kind, label.to_owned()))
        }
    }

    fn is_from(&self, memory: &Arc<Mutex<MemoryAccess>>) -> bool {
        Arc::ptr_eq(&self.memory, memory)
    }

    fn begin(
        &self,
        ty: &'static str,
        label: String,
        desc: &BeginAccessState,
        fences: Vec<Arc<SharedFence>>,
    ) -> Result<(), SharedMemoryError> {
        let kind = if desc.concurrent_read {
            if !desc.initialized {
                return Err(SharedMemoryError::ConcurrentReadUninitialized);
            }
            AccessKind::ConcurrentRead
        } else {
            AccessKind::Exclusive
        };

        let mut state = self.state.lock();

        if state.kind.is_some() {
            return Err(SharedMemoryError::AlreadyAccessed(ty, label));
        }

        let mut memory = self.memory.lock();

        match kind {
            AccessKind::Exclusive if memory.exclusive || memory.readers > 0 => {
                return Err(SharedMemoryError::Exclusive)
            }
            AccessKind::ConcurrentRead if memory.exclusive => return Err(SharedMemoryError::Exclusive),
            AccessKind::Exclusive => memory.exclusive = true,
            AccessKind::ConcurrentRead => memory.readers += 1,
        }

        state.kind = Some(kind);
        state.initialized = desc.initialized;
        state.fences = fences
            .into_iter()
            .zip(desc.signaled_values.iter().copied())
            .collect();
        Ok(())
    }

    fn end(&self, ty: &'static str, label: String) -> Result<ResourceAccess, SharedMemoryError> {
        let mut state = self.state.lock();

        let kind = state
            .kind
            .take()
            .ok_or(SharedMemoryError::NotAccessed(ty, label))?;

        let mut memory = self.memory.lock();

        match kind {
            AccessKind::Exclusive => memory.exclusive = false,
            AccessKind::ConcurrentRead => memory.readers = memory.readers.saturating_sub(1),
        }

        Ok(ResourceAccess {
            kind: Some(kind),
            initialized: state.initialized,
            fences: std::mem::take(&mut state.fences),
        })
    }
}

/// Passed to `*_begin_access`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BeginAccessState {
    /// Only for textures: other read accesses may happen at the same time.
    pub concurrent_read: bool,
    /// Whether the contents are initialized when the access begins.
    pub initialized: bool,
    /// Fences to wait on before the access.
    pub fences: Vec<id::SharedFenceId>,
    pub signaled_values: Vec<u64>,
}

/// Filled in by `*_end_access`. Owns a reference to each fence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndAccessState {
    pub initialized: bool,
    /// Fences signaled once the access is over.
    pub fences: Vec<id::SharedFenceId>,
    pub signaled_values: Vec<u64>,
}

/// Describes a [`SharedFence`] to import.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharedFenceDescriptor<'a> {
    pub label: Label<'a>,
    pub ty: SharedFenceType,
    /// The native handle, such as a file descriptor.
    pub handle: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SharedFenceExportInfo {
    pub ty: SharedFenceType,
    pub handle: u64,
}

#[derive(Debug)]
pub struct SharedFence {
    pub(crate) info: ResourceInfo,
    pub(crate) device: Arc<Device>,
    ty: SharedFenceType,
    handle: u64,
}

crate::resource::impl_resource_type!(SharedFence, SharedFence, "SharedFence");
crate::resource::impl_parent_device!(SharedFence);

/// Handles of the fences created when an access ends.
static NEXT_FENCE_HANDLE: AtomicU64 = AtomicU64::new(1);

impl SharedFence {
    pub(crate) fn import(device: &Arc<Device>, desc: &SharedFenceDescriptor) -> Result<Self, SharedMemoryError> {
        device.require_feature(FeatureName::SharedFence)?;

        Ok(Self {
            info: ResourceInfo::new(desc.label.borrow_option(), false),
            device: device.clone(),
            ty: desc.ty,
            handle: desc.handle,
        })
    }

    pub(crate) fn error(device: &Arc<Device>, desc: &SharedFenceDescriptor) -> Self {
        Self {
            info: ResourceInfo::new(desc.label.borrow_option(), true),
            device: device.clone(),
            ty: desc.ty,
            handle: 0,
        }
    }

    fn signaled(device: &Arc<Device>) -> Self {
        Self {
            info: ResourceInfo::new(None, false),
            device: device.clone(),
            ty: SharedFenceType::SyncFd,
            handle: NEXT_FENCE_HANDLE.fetch_add(1, Ordering::Relaxed),
        }
    }
}

/// Properties of a [`SharedBufferMemory`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SharedBufferMemoryProperties {
    pub usage: BufferUsages,
    pub size: BufferAddress,
}

/// Describes a [`SharedBufferMemory`] to import.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SharedBufferMemoryDescriptor<'a> {
    pub label: Label<'a>,
    /// What the imported native memory supports.
    pub properties: SharedBufferMemoryProperties,
}

#[derive(Debug)]
pub struct SharedBufferMemory {
    pub(crate) info: ResourceInfo,
    pub(crate) device: Arc<Device>,
    properties: SharedBufferMemoryProperties,
    access: Arc<Mutex<MemoryAccess>>,
}

crate::resource::impl_resource_type!(SharedBufferMemory, SharedBufferMemory, "SharedBufferMemory");
crate::resource::impl_parent_device!(SharedBufferMemory);

impl SharedBufferMemory {
    pub(crate) fn import(
        device: &Arc<Device>,
        desc: &SharedBufferMemoryDescriptor,
    ) -> Result<Self, SharedMemoryError> {
        device.require_feature(FeatureName::SharedBufferMemory)?;
        Ok(Self::new(device, desc, false))
    }

    pub(crate) fn new(device: &Arc<Device>, desc: &SharedBufferMemoryDescriptor, error: bool) -> Self {
        Self {
            info: ResourceInfo::new(desc.label.borrow_option(), error),
            device: device.clone(),
            properties: desc.properties,
            access: Arc::default(),
        }
    }

    fn create_buffer(self: &Arc<Self>, desc: &BufferDescriptor) -> Result<Buffer, SharedMemoryError> {
        if self.is_error() {
            return Err(SharedMemoryError::ErrorMemory(Self::TYPE));
        }

        if desc.size != self.properties.size {
            return Err(SharedMemoryError::IncompatibleDescriptor("size"));
        }

        if !self.properties.usage.contains(desc.usage) {
            return Err(SharedMemoryError::IncompatibleDescriptor("usage"));
        }

        if desc.mapped_at_creation {
            return Err(SharedMemoryError::IncompatibleDescriptor("mapped_at_creation"));
        }

        Buffer::validate_descriptor(&self.device, desc)?;

        Ok(Buffer::new(
            &self.device,
            desc,
            false,
            Some(SharedAccess::new(&self.access)),
        ))
    }
}

/// Properties of a [`SharedTextureMemory`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SharedTextureMemoryProperties {
    pub usage: TextureUsages,
    pub size: Extent3d,
    pub format: TextureFormat,
}

/// Describes a [`SharedTextureMemory`] to import.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharedTextureMemoryDescriptor<'a> {
    pub label: Label<'a>,
    /// What the imported native memory supports.
    pub properties: SharedTextureMemoryProperties,
}

#[derive(Debug)]
pub struct SharedTextureMemory {
    pub(crate) info: ResourceInfo,
    pub(crate) device: Arc<Device>,
    properties: SharedTextureMemoryProperties,
    access: Arc<Mutex<MemoryAccess>>,
}

crate::resource::impl_resource_type!(SharedTextureMemory, SharedTextureMemory, "SharedTextureMemory");
crate::resource::impl_parent_device!(SharedTextureMemory);

impl SharedTextureMemory {
    pub(crate) fn import(
        device: &Arc<Device>,
        desc: &SharedTextureMemoryDescriptor,
    ) -> Result<Self, SharedMemoryError> {
        device.require_feature(FeatureName::SharedTextureMemory)?;

        if let Some(feature) = desc.properties.format.required_feature() {
            device.require_feature(feature)?;
        }

        Ok(Self::new(device, desc, false))
    }

    pub(crate) fn new(device: &Arc<Device>, desc: &SharedTextureMemoryDescriptor, error: bool) -> Self {
        Self {
            info: ResourceInfo::new(desc.label.borrow_option(), error),
            device: device.clone(),
            properties: desc.properties,
            access: Arc::default(),
        }
    }

    /// The descriptor of a texture covering the whole memory.
    fn default_texture_descriptor(&self) -> TextureDescriptor<'static> {
        TextureDescriptor::new_2d(
            None,
            self.properties.size,
            self.properties.format,
            self.properties.usage,
        )
    }

    fn create_texture(self: &Arc<Self>, desc: &TextureDescriptor) -> Result<Texture, SharedMemoryError> {
        if self.is_error() {
            return Err(SharedMemoryError::ErrorMemory(Self::TYPE));
        }

        if desc.dimension != TextureDimension::D2 {
            return Err(SharedMemoryError::IncompatibleDescriptor("dimension"));
        }

        if desc.size != self.properties.size {
            return Err(SharedMemoryError::IncompatibleDescriptor("size"));
        }

        if desc.format != self.properties.format {
            return Err(SharedMemoryError::IncompatibleDescriptor("format"));
        }

        if desc.mip_level_count != 1 || desc.sample_count != 1 {
            return Err(SharedMemoryError::IncompatibleDescriptor("mip level or sample count"));
        }

        if !self.properties.usage.contains(desc.usage) {
            return Err(SharedMemoryError::IncompatibleDescriptor("usage"));
        }

        validate_texture_descriptor(&self.device, desc)?;

        Ok(Texture::new(
            &self.device,
            desc,
            false,
            Some(SharedAccess::new(&self.access)),
        ))
    }
}

/// Look up the fences of a begin access.
fn resolve_fences(
    hub: &Hub,
    device: &Arc<Device>,
    desc: &BeginAccessState,
) -> Result<Vec<Arc<SharedFence>>, SharedMemoryError> {
    if desc.fences.len() != desc.signaled_values.len() {
        return Err(SharedMemoryError::FenceCountMismatch {
            fences: desc.fences.len(),
            signaled_values: desc.signaled_values.len(),
        });
    }

    desc.fences
        .iter()
        .map(|&fence| resolve(&hub.shared_fences, fence, device).map_err(SharedMemoryError::from))
        .collect()
}

/// Register the fences of an ended access, creating a signaled fence when the
/// access had none to hand back.
fn end_access_state(hub: &Hub, device: &Arc<Device>, access: ResourceAccess) -> EndAccessState {
    let mut state = EndAccessState {
        initialized: access.initialized,
        ..EndAccessState::default()
    };

    if access.fences.is_empty() {
        let (fence, _) = hub.shared_fences.register(SharedFence::signaled(device));
        state.fences.push(fence);
        state.signaled_values.push(1);
    }

    for (fence, value) in access.fences {
        state.fences.push(hub.shared_fences.acquire(&fence));
        state.signaled_values.push(value + 1);
    }

    state
}

impl Global {
    /// Report `result` to `device` as well as returning it.
    fn shared_memory_status<T>(
        device: &Device,
        result: Result<T, SharedMemoryError>,
    ) -> Result<T, SharedMemoryError> {
        if let Err(err) = &result {
            device.validation_error(err.clone());
        }

        result
    }

    /// Begin an access to `buffer_id`, which must come from this memory.
    pub fn shared_buffer_memory_begin_access(
        &self,
        memory_id: id::SharedBufferMemoryId,
        buffer_id: id::BufferId,
        desc: &BeginAccessState,
    ) -> Result<(), SharedMemoryError> {
        api_log!("SharedBufferMemory::begin_access {memory_id:?} {buffer_id:?}");

        let memory = self.hub.shared_buffer_memories.get(memory_id)?;
        let buffer = self.hub.buffers.get(buffer_id)?;

        let result = (|| {
            if desc.concurrent_read {
                return Err(SharedMemoryError::ConcurrentBuffer);
            }

            let shared = buffer
                .shared
                .as_ref()
                .filter(|shared| shared.is_from(&memory.access))
                .ok_or_else(|| SharedMemoryError::ForeignResource(Buffer::TYPE, buffer.label()))?;

            let fences = resolve_fences(&self.hub, &memory.device, desc)?;
            shared.begin(Buffer::TYPE, buffer.label(), desc, fences)
        })();

        Self::shared_memory_status(&memory.device, result)
    }

    pub fn shared_buffer_memory_create_buffer(
        &self,
        memory_id: id::SharedBufferMemoryId,
        desc: Option<&BufferDescriptor>,
    ) -> Result<id::BufferId, InvalidId> {
        api_log!("SharedBufferMemory::create_buffer {memory_id:?}");

        let memory = self.hub.shared_buffer_memories.get(memory_id)?;

        let default = BufferDescriptor {
            label: None,
            usage: memory.properties.usage,
            size: memory.properties.size,
            mapped_at_creation: false,
        };
        let desc = desc.unwrap_or(&default);

        let buffer = match memory.create_buffer(desc) {
            Ok(buffer) => buffer,
            Err(err) => {
                memory.device.validation_error(err);
                Buffer::new(&memory.device, desc, true, None)
            }
        };

        let (id, _) = self.hub.buffers.register(buffer);
        Ok(id)
    }

    /// End the access to `buffer_id`, returning the fences that signal its
    /// end.
    pub fn shared_buffer_memory_end_access(
        &self,
        memory_id: id::SharedBufferMemoryId,
        buffer_id: id::BufferId,
    ) -> Result<EndAccessState, SharedMemoryError> {
        api_log!("SharedBufferMemory::end_access {memory_id:?} {buffer_id:?}");

        let memory = self.hub.shared_buffer_memories.get(memory_id)?;
        let buffer = self.hub.buffers.get(buffer_id)?;

        let result = buffer
            .shared
            .as_ref()
            .filter(|shared| shared.is_from(&memory.access))
            .ok_or_else(|| SharedMemoryError::ForeignResource(Buffer::TYPE, buffer.label()))
            .and_then(|shared| shared.end(Buffer::TYPE, buffer.label()));

        Self::shared_memory_status(&memory.device, result)
            .map(|access| end_access_state(&self.hub, &memory.device, access))
    }

    pub fn shared_buffer_memory_get_properties(
        &self,
        memory_id: id::SharedBufferMemoryId,
    ) -> Result<SharedBufferMemoryProperties, InvalidId> {
        Ok(self.hub.shared_buffer_memories.get(memory_id)?.properties)
    }

    pub fn shared_buffer_memory_is_device_lost(&self, memory_id: id::SharedBufferMemoryId) -> Result<bool, InvalidId> {
        Ok(self.hub.shared_buffer_memories.get(memory_id)?.device.is_lost())
    }

    /// Release the fences of `state`.
    pub fn shared_buffer_memory_end_access_state_free_members(&self, state: EndAccessState) {
        self.release_end_access_fences(state);
    }

    pub fn shared_texture_memory_begin_access(
        &self,
        memory_id: id::SharedTextureMemoryId,
        texture_id: id::TextureId,
        desc: &BeginAccessState,
    ) -> Result<(), SharedMemoryError> {
        api_log!("SharedTextureMemory::begin_access {memory_id:?} {texture_id:?}");

        let memory = self.hub.shared_texture_memories.get(memory_id)?;
        let texture = self.hub.textures.get(texture_id)?;

        let result = (|| {
            let shared = texture
                .shared
                .as_ref()
                .filter(|shared| shared.is_from(&memory.access))
                .ok_or_else(|| SharedMemoryError::ForeignResource(Texture::TYPE, texture.label()))?;

            let fences = resolve_fences(&self.hub, &memory.device, desc)?;
            shared.begin(Texture::TYPE, texture.label(), desc, fences)
        })();

        Self::shared_memory_status(&memory.device, result)
    }

    pub fn shared_texture_memory_create_texture(
        &self,
        memory_id: id::SharedTextureMemoryId,
        desc: Option<&TextureDescriptor>,
    ) -> Result<id::TextureId, InvalidId> {
        api_log!("SharedTextureMemory::create_texture {memory_id:?}");

        let memory = self.hub.shared_texture_memories.get(memory_id)?;
        let default = memory.default_texture_descriptor();
        let desc = desc.unwrap_or(&default);

        let texture = match memory.create_texture(desc) {
            Ok(texture) => texture,
            Err(err) => {
                memory.device.validation_error(err);
                Texture::new(&memory.device, desc, true, None)
            }
        };

        let (id, _) = self.hub.textures.register(texture);
        Ok(id)
    }

    pub fn shared_texture_memory_end_access(
        &self,
        memory_id: id::SharedTextureMemoryId,
        texture_id: id::TextureId,
    ) -> Result<EndAccessState, SharedMemoryError> {
        api_log!("SharedTextureMemory::end_access {memory_id:?} {texture_id:?}");

        let memory = self.hub.shared_texture_memories.get(memory_id)?;
        let texture = self.hub.textures.get(texture_id)?;

        let result = texture
            .shared
            .as_ref()
            .filter(|shared| shared.is_from(&memory.access))
            .ok_or_else(|| SharedMemoryError::ForeignResource(Texture::TYPE, texture.label()))
            .and_then(|shared| shared.end(Texture::TYPE, texture.label()));

        Self::shared_memory_status(&memory.device, result)
            .map(|access| end_access_state(&self.hub, &memory.device, access))
    }

    pub fn shared_texture_memory_get_properties(
        &self,
        memory_id: id::SharedTextureMemoryId,
    ) -> Result<SharedTextureMemoryProperties, InvalidId> {
        Ok(self.hub.shared_texture_memories.get(memory_id)?.properties)
    }

    pub fn shared_texture_memory_is_device_lost(
        &self,
        memory_id: id::SharedTextureMemoryId,
    ) -> Result<bool, InvalidId> {
        Ok(self.hub.shared_texture_memories.get(memory_id)?.device.is_lost())
    }

    pub fn shared_texture_memory_end_access_state_free_members(&self, state: EndAccessState) {
        self.release_end_access_fences(state);
    }

    fn release_end_access_fences(&self, state: EndAccessState) {
        for fence in state.fences {
            if let Err(err) = self.shared_fence_release(fence) {
                log::warn!("End access state holds a dead fence: {err}");
            }
        }
    }

    pub fn shared_fence_export_info(&self, fence_id: id::SharedFenceId) -> Result<SharedFenceExportInfo, InvalidId> {
        let fence = self.hub.shared_fences.get(fence_id)?;

        if fence.is_error() {
            fence
                .device
                .validation_error(ObjectError::ErrorObject(SharedFence::TYPE, fence.label()));
        }

        Ok(SharedFenceExportInfo {
            ty: fence.ty,
            handle: fence.handle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn access(memory: &Arc<Mutex<MemoryAccess>>) -> SharedAccess {
        SharedAccess::new(memory)
    }

    fn begin(concurrent_read: bool, initialized: bool) -> BeginAccessState {
        BeginAccessState {
            concurrent_read,
            initialized,
            ..Default::default()
        }
    }

    #[test]
    fn exclusive_access_blocks_others() {
        let memory = Arc::default();
        let (a, b) = (access(&memory), access(&memory));

        assert!(a.check_access("Texture", "a").is_err());
        a.begin("Texture", "a".into(), &begin(false, false), Vec::new())
            .unwrap();
        assert_eq!(a.check_access("Texture", "a"), Ok(()));

        assert_eq!(
            b.begin("Texture", "b".into(), &begin(true, true), Vec::new()),
            Err(SharedMemoryError::Exclusive)
        );

        a.end("Texture", "a".into()).unwrap();
        b.begin("Texture", "b".into(), &begin(false, true), Vec::new())
            .unwrap();
    }

    #[test]
    fn concurrent_reads_share_memory() {
        let memory = Arc::default();
        let (a, b, c) = (access(&memory), access(&memory), access(&memory));

        a.begin("Texture", "a".into(), &begin(true, true), Vec::new())
            .unwrap();
        b.begin("Texture", "b".into(), &begin(true, true), Vec::new())
            .unwrap();
        assert_eq!(
            c.begin("Texture", "c".into(), &begin(false, true), Vec::new()),
            Err(SharedMemoryError::Exclusive)
        );
        assert_eq!(
            c.begin("Texture", "c".into(), &begin(true, false), Vec::new()),
            Err(SharedMemoryError::ConcurrentReadUninitialized)
        );

        a.end("Texture", "a".into()).unwrap();
        assert!(matches!(
            a.end("Texture", "a".into()),
            Err(SharedMemoryError::NotAccessed(..))
        ));
    }
}

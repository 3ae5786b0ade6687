use std::{
    ops::Range,
    ptr::{self, NonNull},
    sync::Arc,
};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use pt::{
    AddressMode, BufferAddress, BufferMapState, BufferUsages, CompareFunction, Extent3d,
    FeatureName, FilterMode, MapAsyncStatus, MapMode,
    QueryType, TextureAspect, TextureDimension, TextureFormat, TextureUsages,
    TextureViewDimension, COPY_BUFFER_ALIGNMENT, MAP_ALIGNMENT, QUERY_SET_MAX_QUERIES,
    TEXEL_BUFFER_OFFSET_ALIGNMENT, WHOLE_MAP_SIZE, WHOLE_SIZE,
};
use thiserror::Error;

use crate::{
    api_log,
    device::Device,
    error::{MissingFeature, ObjectError},
    event::{CallbackInfo, EventOutcome, FutureId},
    global::Global,
    hub::Hub,
    id::{self, Id, Marker, RawId},
    registry::Registry,
    shared::SharedAccess,
    storage::InvalidId,
    Label, LabelHelpers,
};

/// Information shared by every object.
#[derive(Debug)]
pub struct ResourceInfo {
    label: Mutex<String>,
    error: bool,
    /// Id the object is currently registered under, if any.
    id: Mutex<Option<RawId>>,
}

impl ResourceInfo {
    pub(crate) fn new(label: Option<&str>, error: bool) -> Self {
        Self {
            label: Mutex::new(label.unwrap_or_default().to_owned()),
            error,
            id: Mutex::new(None),
        }
    }

    pub fn label(&self) -> String {
        self.label.lock().clone()
    }

    pub(crate) fn set_label(&self, label: &str) {
        *self.label.lock() = label.to_owned();
    }

    /// Returns `true` for error objects.
    pub fn is_error(&self) -> bool {
        self.error
    }

    pub(crate) fn id(&self) -> Option<RawId> {
        *self.id.lock()
    }

    pub(crate) fn set_id(&self, id: Option<RawId>) {
        *self.id.lock() = id;
    }
}

pub trait Resource: 'static + Sized + Send + Sync {
    type Marker: Marker;
    const TYPE: &'static str;

    fn info(&self) -> &ResourceInfo;

    fn label(&self) -> String {
        self.info().label()
    }

    fn is_error(&self) -> bool {
        self.info().is_error()
    }

    /// Called once the last external reference has been released.
    fn on_release(&self, _hub: &Hub) {}
}

/// An object created from, and validated against, a device.
pub(crate) trait ParentDevice: Resource {
    fn device(&self) -> &Arc<Device>;

    fn same_device(&self, device: &Arc<Device>) -> Result<(), ObjectError> {
        if Arc::ptr_eq(self.device(), device) {
            Ok(())
        } else {
            Err(ObjectError::WrongDevice(Self::TYPE, self.label()))
        }
    }
}

/// Look up an object referenced by a descriptor or argument, checking that
/// it can be used with `device`.
pub(crate) fn resolve<T: ParentDevice>(
    registry: &Registry<T>,
    id: Id<T::Marker>,
    device: &Arc<Device>,
) -> Result<Arc<T>, ObjectError> {
    let value = registry
        .get(id)
        .map_err(|_| ObjectError::Invalid(T::TYPE))?;

    if value.is_error() {
        return Err(ObjectError::ErrorObject(T::TYPE, value.label()));
    }

    value.same_device(device)?;
    Ok(value)
}

macro_rules! impl_resource_type {
    ($ty:ident, $marker:ident, $name:literal) => {
        impl $crate::resource::Resource for $ty {
            type Marker = $crate::id::markers::$marker;
            const TYPE: &'static str = $name;

            fn info(&self) -> &$crate::resource::ResourceInfo {
                &self.info
            }
        }
    };
}
pub(crate) use impl_resource_type;

macro_rules! impl_parent_device {
    ($ty:ident) => {
        impl $crate::resource::ParentDevice for $ty {
            fn device(&self) -> &std::sync::Arc<$crate::device::Device> {
                &self.device
            }
        }
    };
}
pub(crate) use impl_parent_device;

/// A stable zero-initialized host allocation backing a buffer.
///
/// The allocation never moves, so pointers into it stay valid for as long
/// as the buffer lives.
#[derive(Debug)]
pub(crate) struct HostAllocation {
    ptr: NonNull<[u8]>,
}

// SAFETY: The allocation is uniquely owned, and every access goes through a
// buffer whose state lock serializes copies in and out of it.
unsafe impl Send for HostAllocation {}
// SAFETY: See above.
unsafe impl Sync for HostAllocation {}

impl HostAllocation {
    fn zeroed(len: usize) -> Self {
        let boxed = vec![0u8; len].into_boxed_slice();
        Self {
            ptr: NonNull::from(Box::leak(boxed)),
        }
    }

    fn len(&self) -> usize {
        self.ptr.len()
    }

    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.ptr.cast::<u8>().as_ptr()
    }

    /// Copy `data` into the allocation at `offset`.
    pub(crate) fn write(&self, offset: usize, data: &[u8]) {
        assert!(offset <= self.len() && data.len() <= self.len() - offset);
        // SAFETY: The range is in bounds, and `data` can't alias an
        // allocation we uniquely own.
        unsafe { ptr::copy_nonoverlapping(data.as_ptr(), self.as_ptr().add(offset), data.len()) }
    }

    /// Copy out of the allocation at `offset` into `data`.
    pub(crate) fn read(&self, offset: usize, data: &mut [u8]) {
        assert!(offset <= self.len() && data.len() <= self.len() - offset);
        // SAFETY: The range is in bounds, see `write`.
        unsafe { ptr::copy_nonoverlapping(self.as_ptr().add(offset), data.as_mut_ptr(), data.len()) }
    }
}

impl Drop for HostAllocation {
    fn drop(&mut self) {
        // SAFETY: The pointer came from `Box::leak` in `zeroed`.
        unsafe { drop(Box::from_raw(self.ptr.as_ptr())) }
    }
}

/// Describes a [`Buffer`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BufferDescriptor<'a> {
    pub label: Label<'a>,
    pub usage: BufferUsages,
    pub size: BufferAddress,
    pub mapped_at_creation: bool,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CreateBufferError {
    #[error("Buffer usage must not be empty")]
    EmptyUsage,
    #[error("Usage {0:?} is not allowed together with map usages")]
    UsageMismatch(BufferUsages),
    #[error("Buffer size {requested} is greater than the maximum {maximum}")]
    MaxBufferSize { requested: u64, maximum: u64 },
    #[error("Buffers mapped at creation must have a size aligned to {COPY_BUFFER_ALIGNMENT}")]
    UnalignedSize,
    #[error(transparent)]
    MissingFeature(#[from] MissingFeature),
}

/// Error from one of the mapped range entry points, or from `map_async`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BufferAccessError {
    #[error(transparent)]
    Invalid(#[from] InvalidId),
    #[error("Buffer is an error object")]
    ErrorBuffer,
    #[error("Buffer is destroyed")]
    Destroyed,
    #[error("Buffer is already mapped")]
    AlreadyMapped,
    #[error("Buffer map is pending")]
    MapAlreadyPending,
    #[error("Buffer is not mapped")]
    NotMapped,
    #[error("Buffer is mapped for reading and can't be written")]
    MappedForRead,
    #[error("Map mode {0:?} must be exactly one of READ or WRITE")]
    InvalidMapMode(MapMode),
    #[error("Buffer usage {actual:?} doesn't contain {expected:?}")]
    MissingUsage {
        actual: BufferUsages,
        expected: BufferUsages,
    },
    #[error("Map offset {0} must be a multiple of {MAP_ALIGNMENT}")]
    UnalignedOffset(u64),
    #[error("Map size {0} must be a multiple of {COPY_BUFFER_ALIGNMENT}")]
    UnalignedSize(u64),
    #[error("Range {start}..{end} is out of bounds of {bound_start}..{bound_end}")]
    OutOfBounds {
        start: u64,
        end: u64,
        bound_start: u64,
        bound_end: u64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum HostMap {
    Read,
    Write,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum BufferMapping {
    Unmapped,
    Pending {
        token: u64,
        host: HostMap,
        range: Range<u64>,
    },
    Mapped {
        host: HostMap,
        range: Range<u64>,
    },
}

#[derive(Debug)]
pub(crate) struct BufferState {
    pub(crate) mapping: BufferMapping,
    pub(crate) destroyed: bool,
    next_token: u64,
}

pub type BufferMapCallback = Box<dyn FnOnce(MapAsyncStatus, &str) + Send>;
pub type BufferMapCallbackInfo = CallbackInfo<BufferMapCallback>;

#[derive(Debug)]
pub struct Buffer {
    pub(crate) info: ResourceInfo,
    pub(crate) device: Arc<Device>,
    pub(crate) usage: BufferUsages,
    pub(crate) size: BufferAddress,
    memory: OnceCell<HostAllocation>,
    pub(crate) state: Mutex<BufferState>,
    pub(crate) shared: Option<SharedAccess>,
}

impl Resource for Buffer {
    type Marker = id::markers::Buffer;
    const TYPE: &'static str = "Buffer";

    fn info(&self) -> &ResourceInfo {
        &self.info
    }

    fn on_release(&self, _hub: &Hub) {
        self.destroy();
    }
}

impl_parent_device!(Buffer);

impl Buffer {
    pub(crate) fn new(
        device: &Arc<Device>,
        desc: &BufferDescriptor,
        error: bool,
        shared: Option<SharedAccess>,
    ) -> Self {
        let mapping = if desc.mapped_at_creation && !error {
            BufferMapping::Mapped {
                host: HostMap::Write,
                range: 0..desc.size,
            }
        } else {
            BufferMapping::Unmapped
        };

        Self {
            info: ResourceInfo::new(desc.label.borrow_option(), error),
            device: device.clone(),
            usage: desc.usage,
            size: desc.size,
            memory: OnceCell::new(),
            state: Mutex::new(BufferState {
                mapping,
                destroyed: false,
                next_token: 0,
            }),
            shared,
        }
    }

    pub(crate) fn validate_descriptor(
        device: &Device,
        desc: &BufferDescriptor,
    ) -> Result<(), CreateBufferError> {
        if desc.usage.is_empty() {
            return Err(CreateBufferError::EmptyUsage);
        }

        if !device.features.contains(FeatureName::BufferMapExtendedUsages) {
            let write_mismatch = desc.usage.contains(BufferUsages::MAP_WRITE)
                && !(BufferUsages::MAP_WRITE | BufferUsages::COPY_SRC).contains(desc.usage);
            let read_mismatch = desc.usage.contains(BufferUsages::MAP_READ)
                && !(BufferUsages::MAP_READ | BufferUsages::COPY_DST).contains(desc.usage);

            if write_mismatch || read_mismatch {
                return Err(CreateBufferError::UsageMismatch(desc.usage));
            }
        }

        if desc.usage.contains(BufferUsages::TEXEL_BUFFER) {
            device.require_feature(FeatureName::TexelBuffers)?;
        }

        if desc.size > device.limits.max_buffer_size {
            return Err(CreateBufferError::MaxBufferSize {
                requested: desc.size,
                maximum: device.limits.max_buffer_size,
            });
        }

        if desc.mapped_at_creation && desc.size % COPY_BUFFER_ALIGNMENT != 0 {
            return Err(CreateBufferError::UnalignedSize);
        }

        Ok(())
    }

    fn memory(&self) -> &HostAllocation {
        self.memory
            .get_or_init(|| HostAllocation::zeroed(self.size as usize))
    }

    pub(crate) fn map_state(&self) -> BufferMapState {
        match self.state.lock().mapping {
            BufferMapping::Unmapped => BufferMapState::Unmapped,
            BufferMapping::Pending { .. } => BufferMapState::Pending,
            BufferMapping::Mapped { .. } => BufferMapState::Mapped,
        }
    }

    pub(crate) fn check_usage(&self, expected: BufferUsages) -> Result<(), BufferAccessError> {
        if self.usage.contains(expected) {
            Ok(())
        } else {
            Err(BufferAccessError::MissingUsage {
                actual: self.usage,
                expected,
            })
        }
    }

    /// Check that the buffer can be used by the queue.
    pub(crate) fn check_queue_use(&self) -> Result<(), QueueUseError> {
        let state = self.state.lock();

        if state.destroyed {
            return Err(QueueUseError::Destroyed(Self::TYPE, self.label()));
        }

        if state.mapping != BufferMapping::Unmapped {
            return Err(QueueUseError::Mapped(self.label()));
        }

        drop(state);

        if let Some(shared) = &self.shared {
            shared.check_access(Self::TYPE, &self.label())?;
        }

        Ok(())
    }

    fn resolve_map_range(&self, offset: usize, size: usize) -> Range<u64> {
        let offset = offset as u64;
        let end = if size == WHOLE_MAP_SIZE {
            self.size.max(offset)
        } else {
            offset.saturating_add(size as u64)
        };

        offset..end
    }

    /// Start mapping, returning the token the completion checks against.
    fn map_async(&self, mode: MapMode, offset: usize, size: usize) -> Result<u64, BufferAccessError> {
        if self.is_error() {
            return Err(BufferAccessError::ErrorBuffer);
        }

        let host = if mode == MapMode::READ {
            self.check_usage(BufferUsages::MAP_READ)?;
            HostMap::Read
        } else if mode == MapMode::WRITE {
            self.check_usage(BufferUsages::MAP_WRITE)?;
            HostMap::Write
        } else {
            return Err(BufferAccessError::InvalidMapMode(mode));
        };

        let range = self.resolve_map_range(offset, size);

        if range.start % MAP_ALIGNMENT != 0 {
            return Err(BufferAccessError::UnalignedOffset(range.start));
        }

        if (range.end - range.start) % COPY_BUFFER_ALIGNMENT != 0 {
            return Err(BufferAccessError::UnalignedSize(range.end - range.start));
        }

        if range.end > self.size {
            return Err(BufferAccessError::OutOfBounds {
                start: range.start,
                end: range.end,
                bound_start: 0,
                bound_end: self.size,
            });
        }

        let mut state = self.state.lock();

        if state.destroyed {
            return Err(BufferAccessError::Destroyed);
        }

        match state.mapping {
            BufferMapping::Unmapped => {}
            BufferMapping::Pending { .. } => return Err(BufferAccessError::MapAlreadyPending),
            BufferMapping::Mapped { .. } => return Err(BufferAccessError::AlreadyMapped),
        }

        state.next_token += 1;
        let token = state.next_token;
        state.mapping = BufferMapping::Pending { token, host, range };
        Ok(token)
    }

    /// Complete the mapping started with `token`, if it is still current.
    fn resolve_map(&self, token: u64) -> (MapAsyncStatus, &'static str) {
        let mut state = self.state.lock();

        if state.destroyed {
            return (
                MapAsyncStatus::Aborted,
                "Buffer was destroyed before mapping was resolved.",
            );
        }

        match &state.mapping {
            BufferMapping::Pending {
                token: current,
                host,
                range,
            } if *current == token => {
                state.mapping = BufferMapping::Mapped {
                    host: *host,
                    range: range.clone(),
                };
                (MapAsyncStatus::Success, "")
            }
            _ => (
                MapAsyncStatus::Aborted,
                "Buffer was unmapped before mapping was resolved.",
            ),
        }
    }

    /// Validate a mapped range access, returning the byte range within the
    /// buffer.
    fn check_mapped_range(
        &self,
        state: &BufferState,
        offset: usize,
        size: usize,
        write: bool,
    ) -> Result<Range<usize>, BufferAccessError> {
        if self.is_error() {
            return Err(BufferAccessError::ErrorBuffer);
        }

        if state.destroyed {
            return Err(BufferAccessError::Destroyed);
        }

        let (host, mapped) = match &state.mapping {
            BufferMapping::Mapped { host, range } => (*host, range.clone()),
            BufferMapping::Pending { .. } => return Err(BufferAccessError::MapAlreadyPending),
            BufferMapping::Unmapped => return Err(BufferAccessError::NotMapped),
        };

        if write && host == HostMap::Read {
            return Err(BufferAccessError::MappedForRead);
        }

        let offset = offset as u64;
        let end = if size == WHOLE_MAP_SIZE {
            mapped.end.max(offset)
        } else {
            offset.saturating_add(size as u64)
        };

        if offset % MAP_ALIGNMENT != 0 {
            return Err(BufferAccessError::UnalignedOffset(offset));
        }

        if (end - offset) % COPY_BUFFER_ALIGNMENT != 0 {
            return Err(BufferAccessError::UnalignedSize(end - offset));
        }

        if offset < mapped.start || end > mapped.end {
            return Err(BufferAccessError::OutOfBounds {
                start: offset,
                end,
                bound_start: mapped.start,
                bound_end: mapped.end,
            });
        }

        Ok(offset as usize..end as usize)
    }

    fn mapped_range(&self, offset: usize, size: usize, write: bool) -> Result<*mut u8, BufferAccessError> {
        let state = self.state.lock();
        let range = self.check_mapped_range(&state, offset, size, write)?;
        // SAFETY: `range.start` is within the allocation, which is `size` bytes.
        Ok(unsafe { self.memory().as_ptr().add(range.start) })
    }

    /// Write `data` at `offset` through the host memory, as the queue does.
    pub(crate) fn write_contents(&self, offset: u64, data: &[u8]) {
        let _state = self.state.lock();
        self.memory().write(offset as usize, data);
    }

    fn unmap(&self) {
        self.state.lock().mapping = BufferMapping::Unmapped;
    }

    pub(crate) fn destroy(&self) {
        let mut state = self.state.lock();
        state.destroyed = true;
        state.mapping = BufferMapping::Unmapped;
    }

    /// Resolve the range `offset..offset + size` against the size of the
    /// buffer, where `size` may be [`WHOLE_SIZE`].
    pub(crate) fn resolve_range(&self, offset: u64, size: u64) -> Result<Range<u64>, BufferAccessError> {
        let end = if size == WHOLE_SIZE {
            self.size.max(offset)
        } else {
            offset.saturating_add(size)
        };

        if offset > self.size || end > self.size {
            return Err(BufferAccessError::OutOfBounds {
                start: offset,
                end,
                bound_start: 0,
                bound_end: self.size,
            });
        }

        Ok(offset..end)
    }
}

/// A resource can't be used by the queue.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QueueUseError {
    #[error("{0} with label {1:?} is destroyed")]
    Destroyed(&'static str, String),
    #[error("Buffer with label {0:?} is mapped")]
    Mapped(String),
    #[error("{0} with label {1:?} is created from shared memory without an active access")]
    NoSharedAccess(&'static str, String),
}

/// Describes a [`TexelBufferView`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TexelBufferViewDescriptor<'a> {
    pub label: Label<'a>,
    pub format: TextureFormat,
    pub offset: BufferAddress,
    pub size: BufferAddress,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CreateTexelBufferViewError {
    #[error(transparent)]
    MissingFeature(#[from] MissingFeature),
    #[error(transparent)]
    Access(#[from] BufferAccessError),
    #[error("Texel buffer view offset {0} must be a multiple of {TEXEL_BUFFER_OFFSET_ALIGNMENT}")]
    UnalignedOffset(u64),
    #[error("Format {0:?} can't be used for texel buffer views")]
    InvalidFormat(TextureFormat),
    #[error("Texel buffer view size {size} is not a multiple of the texel size {texel_size}")]
    UnalignedSize { size: u64, texel_size: u64 },
}

#[derive(Debug)]
pub struct TexelBufferView {
    pub(crate) info: ResourceInfo,
    pub(crate) buffer: Arc<Buffer>,
    pub(crate) format: TextureFormat,
}

impl_resource_type!(TexelBufferView, TexelBufferView, "TexelBufferView");

impl TexelBufferView {
    fn create(buffer: &Arc<Buffer>, desc: &TexelBufferViewDescriptor) -> Result<Self, CreateTexelBufferViewError> {
        buffer.device.require_feature(FeatureName::TexelBuffers)?;

        if buffer.is_error() {
            return Err(BufferAccessError::ErrorBuffer.into());
        }

        buffer.check_usage(BufferUsages::TEXEL_BUFFER)?;

        if desc.offset % TEXEL_BUFFER_OFFSET_ALIGNMENT != 0 {
            return Err(CreateTexelBufferViewError::UnalignedOffset(desc.offset));
        }

        let texel_size = match desc.format.block_copy_size() {
            Some(size) if !desc.format.is_depth_stencil() && !desc.format.is_compressed() => {
                size as u64
            }
            _ => return Err(CreateTexelBufferViewError::InvalidFormat(desc.format)),
        };

        let range = buffer.resolve_range(desc.offset, desc.size)?;
        let size = range.end - range.start;

        if size % texel_size != 0 {
            return Err(CreateTexelBufferViewError::UnalignedSize { size, texel_size });
        }

        Ok(Self {
            info: ResourceInfo::new(desc.label.borrow_option(), false),
            buffer: buffer.clone(),
            format: desc.format,
        })
    }

    fn error(buffer: &Arc<Buffer>, desc: &TexelBufferViewDescriptor) -> Self {
        Self {
            info: ResourceInfo::new(desc.label.borrow_option(), true),
            buffer: buffer.clone(),
            format: desc.format,
        }
    }
}

/// Describes a [`Texture`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureDescriptor<'a> {
    pub label: Label<'a>,
    pub usage: TextureUsages,
    pub dimension: TextureDimension,
    pub size: Extent3d,
    pub format: TextureFormat,
    pub mip_level_count: u32,
    pub sample_count: u32,
    pub view_formats: Vec<TextureFormat>,
    /// View dimension used when the texture is bound, in compatibility mode.
    pub texture_binding_view_dimension: Option<TextureViewDimension>,
}

impl<'a> TextureDescriptor<'a> {
    /// A single-sampled 2D texture with one mip level.
    pub fn new_2d(label: Label<'a>, size: Extent3d, format: TextureFormat, usage: TextureUsages) -> Self {
        Self {
            label,
            usage,
            dimension: TextureDimension::D2,
            size,
            format,
            mip_level_count: 1,
            sample_count: 1,
            view_formats: Vec::new(),
            texture_binding_view_dimension: None,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CreateTextureError {
    #[error("Texture usage must not be empty")]
    EmptyUsage,
    #[error("Texture size {0:?} has a zero dimension")]
    ZeroSize(Extent3d),
    #[error("Texture size {size:?} exceeds the limit {limit} for dimension {dimension:?}")]
    TooLarge {
        size: Extent3d,
        dimension: TextureDimension,
        limit: u32,
    },
    #[error("Mip level count {requested} must be between 1 and {maximum}")]
    InvalidMipLevelCount { requested: u32, maximum: u32 },
    #[error("Sample count {0} is not supported")]
    InvalidSampleCount(u32),
    #[error("Multisampled textures must be 2D, single mip and single layer, and renderable")]
    InvalidMultisample,
    #[error("Format {0:?} can't be used with dimension {1:?}")]
    InvalidDimensionForFormat(TextureFormat, TextureDimension),
    #[error("Size {size:?} is not a multiple of the block size of {format:?}")]
    UnalignedCompressedSize { size: Extent3d, format: TextureFormat },
    #[error("View format {view:?} is not compatible with {format:?}")]
    InvalidViewFormat {
        view: TextureFormat,
        format: TextureFormat,
    },
    #[error("Texture binding view dimension {0:?} doesn't match the texture")]
    InvalidBindingViewDimension(TextureViewDimension),
    #[error("Format {0:?} can't be a render attachment")]
    NotRenderable(TextureFormat),
    #[error(transparent)]
    MissingFeature(#[from] MissingFeature),
}

pub(crate) fn srgb_counterpart(format: TextureFormat) -> Option<TextureFormat> {
    match format {
        TextureFormat::Rgba8Unorm => Some(TextureFormat::Rgba8UnormSrgb),
        TextureFormat::Rgba8UnormSrgb => Some(TextureFormat::Rgba8Unorm),
        TextureFormat::Bgra8Unorm => Some(TextureFormat::Bgra8UnormSrgb),
        TextureFormat::Bgra8UnormSrgb => Some(TextureFormat::Bgra8Unorm),
        _ => None,
    }
}

/// The view dimension used when binding a texture, absent any override.
fn default_binding_view_dimension(dimension: TextureDimension, layers: u32) -> TextureViewDimension {
    match dimension {
        TextureDimension::D1 => TextureViewDimension::D1,
        TextureDimension::D2 if layers == 1 => TextureViewDimension::D2,
        TextureDimension::D2 => TextureViewDimension::D2Array,
        TextureDimension::D3 => TextureViewDimension::D3,
    }
}

pub(crate) fn validate_texture_descriptor(
    device: &Device,
    desc: &TextureDescriptor,
) -> Result<(), CreateTextureError> {
    let limits = &device.limits;
    let size = desc.size;

    if desc.usage.is_empty() {
        return Err(CreateTextureError::EmptyUsage);
    }

    if size.width == 0 || size.height == 0 || size.depth_or_array_layers == 0 {
        return Err(CreateTextureError::ZeroSize(size));
    }

    let (extent_limit, layer_limit) = match desc.dimension {
        TextureDimension::D1 => (limits.max_texture_dimension_1d, 1),
        TextureDimension::D2 => (limits.max_texture_dimension_2d, limits.max_texture_array_layers),
        TextureDimension::D3 => (limits.max_texture_dimension_3d, limits.max_texture_dimension_3d),
    };

    let height_limit = match desc.dimension {
        TextureDimension::D1 => 1,
        _ => extent_limit,
    };

    if size.width > extent_limit || size.height > height_limit || size.depth_or_array_layers > layer_limit {
        return Err(CreateTextureError::TooLarge {
            size,
            dimension: desc.dimension,
            limit: extent_limit,
        });
    }

    if let Some(feature) = desc.format.required_feature() {
        device.require_feature(feature)?;
    }

    if desc.format.is_depth_stencil() || desc.format.is_compressed() {
        if desc.dimension != TextureDimension::D2 {
            return Err(CreateTextureError::InvalidDimensionForFormat(desc.format, desc.dimension));
        }
    }

    let (block_width, block_height) = desc.format.block_dimensions();

    if size.width % block_width != 0 || size.height % block_height != 0 {
        return Err(CreateTextureError::UnalignedCompressedSize {
            size,
            format: desc.format,
        });
    }

    let max_mips = size.max_mips(desc.dimension);

    if desc.mip_level_count == 0 || desc.mip_level_count > max_mips {
        return Err(CreateTextureError::InvalidMipLevelCount {
            requested: desc.mip_level_count,
            maximum: max_mips,
        });
    }

    match desc.sample_count {
        1 => {}
        4 => {
            if desc.dimension != TextureDimension::D2
                || desc.mip_level_count != 1
                || size.depth_or_array_layers != 1
                || !desc.format.is_renderable()
                || desc.usage.contains(TextureUsages::STORAGE_BINDING)
            {
                return Err(CreateTextureError::InvalidMultisample);
            }
        }
        other => return Err(CreateTextureError::InvalidSampleCount(other)),
    }

    if desc.usage.contains(TextureUsages::RENDER_ATTACHMENT) && !desc.format.is_renderable() {
        return Err(CreateTextureError::NotRenderable(desc.format));
    }

    for &view in &desc.view_formats {
        if view != desc.format && srgb_counterpart(desc.format) != Some(view) {
            return Err(CreateTextureError::InvalidViewFormat {
                view,
                format: desc.format,
            });
        }
    }

    if let Some(binding) = desc.texture_binding_view_dimension {
        if binding.compatible_texture_dimension() != desc.dimension {
            return Err(CreateTextureError::InvalidBindingViewDimension(binding));
        }
    }

    Ok(())
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TexturePinError {
    #[error("Texture is already pinned")]
    AlreadyPinned,
    #[error("Texture is not pinned")]
    NotPinned,
    #[error("Pin usage {requested:?} is not a subset of texture usage {usage:?}")]
    InvalidUsage {
        requested: TextureUsages,
        usage: TextureUsages,
    },
    #[error("Texture is not created from shared texture memory")]
    NotShared,
}

#[derive(Debug, Default)]
pub(crate) struct TextureState {
    pub(crate) destroyed: bool,
    pub(crate) pinned: Option<TextureUsages>,
    pub(crate) memory_dump_owner: Option<u64>,
}

#[derive(Debug)]
pub struct Texture {
    pub(crate) info: ResourceInfo,
    pub(crate) device: Arc<Device>,
    pub(crate) usage: TextureUsages,
    pub(crate) dimension: TextureDimension,
    pub(crate) size: Extent3d,
    pub(crate) format: TextureFormat,
    pub(crate) mip_level_count: u32,
    pub(crate) sample_count: u32,
    pub(crate) view_formats: Vec<TextureFormat>,
    pub(crate) binding_view_dimension: TextureViewDimension,
    pub(crate) state: Mutex<TextureState>,
    pub(crate) shared: Option<SharedAccess>,
}

impl Resource for Texture {
    type Marker = id::markers::Texture;
    const TYPE: &'static str = "Texture";

    fn info(&self) -> &ResourceInfo {
        &self.info
    }

    fn on_release(&self, _hub: &Hub) {
        self.destroy();
    }
}

impl_parent_device!(Texture);

impl Texture {
    pub(crate) fn new(
        device: &Arc<Device>,
        desc: &TextureDescriptor,
        error: bool,
        shared: Option<SharedAccess>,
    ) -> Self {
        Self {
            info: ResourceInfo::new(desc.label.borrow_option(), error),
            device: device.clone(),
            usage: desc.usage,
            dimension: desc.dimension,
            size: desc.size,
            format: desc.format,
            mip_level_count: desc.mip_level_count,
            sample_count: desc.sample_count,
            view_formats: desc.view_formats.clone(),
            binding_view_dimension: desc.texture_binding_view_dimension.unwrap_or_else(|| {
                default_binding_view_dimension(desc.dimension, desc.size.depth_or_array_layers)
            }),
            state: Mutex::new(TextureState::default()),
            shared,
        }
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    pub(crate) fn destroy(&self) {
        self.state.lock().destroyed = true;
    }

    /// Check that the texture can be used by the queue.
    pub(crate) fn check_queue_use(&self) -> Result<(), QueueUseError> {
        if self.is_destroyed() {
            return Err(QueueUseError::Destroyed(Self::TYPE, self.label()));
        }

        if let Some(shared) = &self.shared {
            shared.check_access(Self::TYPE, &self.label())?;
        }

        Ok(())
    }

    /// Size of mip level `level`.
    pub(crate) fn mip_level_size(&self, level: u32) -> Extent3d {
        self.size.mip_level_size(level, self.dimension)
    }

    fn pin(&self, usage: TextureUsages) -> Result<(), TexturePinError> {
        if self.shared.is_none() {
            return Err(TexturePinError::NotShared);
        }

        if !self.usage.contains(usage) {
            return Err(TexturePinError::InvalidUsage {
                requested: usage,
                usage: self.usage,
            });
        }

        let mut state = self.state.lock();

        if state.pinned.is_some() {
            return Err(TexturePinError::AlreadyPinned);
        }

        state.pinned = Some(usage);
        Ok(())
    }

    fn unpin(&self) -> Result<(), TexturePinError> {
        match self.state.lock().pinned.take() {
            Some(_) => Ok(()),
            None => Err(TexturePinError::NotPinned),
        }
    }
}

/// Describes a [`TextureView`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextureViewDescriptor<'a> {
    pub label: Label<'a>,
    pub format: Option<TextureFormat>,
    pub dimension: Option<TextureViewDimension>,
    pub usage: Option<TextureUsages>,
    pub aspect: TextureAspect,
    pub base_mip_level: u32,
    pub mip_level_count: Option<u32>,
    pub base_array_layer: u32,
    pub array_layer_count: Option<u32>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CreateTextureViewError {
    #[error("Texture is an error object")]
    ErrorTexture,
    #[error("View format {view:?} is not {format:?} or one of the texture's view formats")]
    InvalidFormat {
        view: TextureFormat,
        format: TextureFormat,
    },
    #[error("View dimension {view:?} is not compatible with texture dimension {texture:?}")]
    InvalidDimension {
        view: TextureViewDimension,
        texture: TextureDimension,
    },
    #[error("Mip levels {start}..{end} are out of range of {count} levels")]
    MipRange { start: u32, end: u32, count: u32 },
    #[error("Array layers {start}..{end} are out of range of {count} layers")]
    LayerRange { start: u32, end: u32, count: u32 },
    #[error("View dimension {dimension:?} can't have {count} array layers")]
    InvalidLayerCount {
        dimension: TextureViewDimension,
        count: u32,
    },
    #[error("Aspect {aspect:?} is not present in format {format:?}")]
    InvalidAspect {
        aspect: TextureAspect,
        format: TextureFormat,
    },
    #[error("View usage {view:?} is not a subset of texture usage {texture:?}")]
    InvalidUsage {
        view: TextureUsages,
        texture: TextureUsages,
    },
}

#[derive(Debug)]
pub struct TextureView {
    pub(crate) info: ResourceInfo,
    pub(crate) texture: Arc<Texture>,
    pub(crate) format: TextureFormat,
    pub(crate) dimension: TextureViewDimension,
    pub(crate) usage: TextureUsages,
    pub(crate) mips: Range<u32>,
    pub(crate) layers: Range<u32>,
}

impl_resource_type!(TextureView, TextureView, "TextureView");

impl ParentDevice for TextureView {
    fn device(&self) -> &Arc<Device> {
        &self.texture.device
    }
}

impl TextureView {
    fn create(texture: &Arc<Texture>, desc: &TextureViewDescriptor) -> Result<Self, CreateTextureViewError> {
        if texture.is_error() {
            return Err(CreateTextureViewError::ErrorTexture);
        }

        let format = desc.format.unwrap_or(texture.format);

        if format != texture.format && !texture.view_formats.contains(&format) {
            return Err(CreateTextureViewError::InvalidFormat {
                view: format,
                format: texture.format,
            });
        }

        let usage = desc.usage.unwrap_or(texture.usage);

        if !texture.usage.contains(usage) {
            return Err(CreateTextureViewError::InvalidUsage {
                view: usage,
                texture: texture.usage,
            });
        }

        let base_mip = desc.base_mip_level;
        let mip_count = desc
            .mip_level_count
            .unwrap_or_else(|| texture.mip_level_count.saturating_sub(base_mip));
        let mip_end = base_mip.saturating_add(mip_count);

        if mip_count == 0 || mip_end > texture.mip_level_count {
            return Err(CreateTextureViewError::MipRange {
                start: base_mip,
                end: mip_end,
                count: texture.mip_level_count,
            });
        }

        let texture_layers = match texture.dimension {
            TextureDimension::D3 => 1,
            _ => texture.size.depth_or_array_layers,
        };

        let base_layer = desc.base_array_layer;

        let dimension = desc.dimension.unwrap_or_else(|| match texture.dimension {
            TextureDimension::D2 => {
                let count = desc
                    .array_layer_count
                    .unwrap_or_else(|| texture_layers.saturating_sub(base_layer));
                default_binding_view_dimension(TextureDimension::D2, count)
            }
            other => default_binding_view_dimension(other, 1),
        });

        if dimension.compatible_texture_dimension() != texture.dimension {
            return Err(CreateTextureViewError::InvalidDimension {
                view: dimension,
                texture: texture.dimension,
            });
        }

        let layer_count = desc.array_layer_count.unwrap_or_else(|| match dimension {
            TextureViewDimension::D1 | TextureViewDimension::D2 | TextureViewDimension::D3 => 1,
            TextureViewDimension::Cube => 6,
            _ => texture_layers.saturating_sub(base_layer),
        });

        let layer_end = base_layer.saturating_add(layer_count);

        if layer_count == 0 || layer_end > texture_layers {
            return Err(CreateTextureViewError::LayerRange {
                start: base_layer,
                end: layer_end,
                count: texture_layers,
            });
        }

        let valid_layers = match dimension {
            TextureViewDimension::D1 | TextureViewDimension::D2 | TextureViewDimension::D3 => {
                layer_count == 1
            }
            TextureViewDimension::Cube => layer_count == 6,
            TextureViewDimension::CubeArray => layer_count % 6 == 0,
            TextureViewDimension::D2Array => true,
        };

        if !valid_layers {
            return Err(CreateTextureViewError::InvalidLayerCount {
                dimension,
                count: layer_count,
            });
        }

        let aspect_present = match desc.aspect {
            TextureAspect::All => true,
            TextureAspect::DepthOnly => format.has_depth_aspect(),
            TextureAspect::StencilOnly => format.has_stencil_aspect(),
        };

        if !aspect_present {
            return Err(CreateTextureViewError::InvalidAspect {
                aspect: desc.aspect,
                format,
            });
        }

        Ok(Self {
            info: ResourceInfo::new(desc.label.borrow_option(), false),
            texture: texture.clone(),
            format,
            dimension,
            usage,
            mips: base_mip..mip_end,
            layers: base_layer..layer_end,
        })
    }

    fn error(texture: &Arc<Texture>, desc: &TextureViewDescriptor) -> Self {
        Self {
            info: ResourceInfo::new(desc.label.borrow_option(), true),
            texture: texture.clone(),
            format: desc.format.unwrap_or(texture.format),
            dimension: desc
                .dimension
                .unwrap_or(texture.binding_view_dimension),
            usage: desc.usage.unwrap_or(texture.usage),
            mips: 0..0,
            layers: 0..0,
        }
    }

    /// Size of the base mip level of the view.
    pub(crate) fn extent(&self) -> Extent3d {
        let size = self.texture.mip_level_size(self.mips.start);
        Extent3d {
            depth_or_array_layers: self.layers.end - self.layers.start,
            ..size
        }
    }
}

/// Describes a [`Sampler`].
#[derive(Clone, Debug, PartialEq)]
pub struct SamplerDescriptor<'a> {
    pub label: Label<'a>,
    pub address_modes: [AddressMode; 3],
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    pub mipmap_filter: FilterMode,
    pub lod_min_clamp: f32,
    pub lod_max_clamp: f32,
    pub compare: Option<CompareFunction>,
    pub max_anisotropy: u16,
}

impl Default for SamplerDescriptor<'_> {
    fn default() -> Self {
        Self {
            label: None,
            address_modes: Default::default(),
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Nearest,
            mipmap_filter: FilterMode::Nearest,
            lod_min_clamp: 0.0,
            lod_max_clamp: 32.0,
            compare: None,
            max_anisotropy: 1,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum CreateSamplerError {
    #[error("Invalid lod clamp range {0}..{1}")]
    InvalidLodClamp(f32, f32),
    #[error("Max anisotropy must be at least 1")]
    InvalidAnisotropy,
    #[error("Anisotropic filtering requires all filters to be linear")]
    InvalidFilterModeWithAnisotropy,
}

#[derive(Debug)]
pub struct Sampler {
    pub(crate) info: ResourceInfo,
    pub(crate) device: Arc<Device>,
    /// Comparison samplers can only be bound to comparison bindings.
    pub(crate) comparison: bool,
    pub(crate) filtering: bool,
}

impl_resource_type!(Sampler, Sampler, "Sampler");
impl_parent_device!(Sampler);

impl Sampler {
    pub(crate) fn validate_descriptor(desc: &SamplerDescriptor) -> Result<(), CreateSamplerError> {
        if !(desc.lod_min_clamp >= 0.0 && desc.lod_max_clamp >= desc.lod_min_clamp) {
            return Err(CreateSamplerError::InvalidLodClamp(
                desc.lod_min_clamp,
                desc.lod_max_clamp,
            ));
        }

        if desc.max_anisotropy == 0 {
            return Err(CreateSamplerError::InvalidAnisotropy);
        }

        if desc.max_anisotropy > 1
            && [desc.mag_filter, desc.min_filter, desc.mipmap_filter]
                .iter()
                .any(|&filter| filter != FilterMode::Linear)
        {
            return Err(CreateSamplerError::InvalidFilterModeWithAnisotropy);
        }

        Ok(())
    }

    pub(crate) fn new(device: &Arc<Device>, desc: &SamplerDescriptor, error: bool) -> Self {
        Self {
            info: ResourceInfo::new(desc.label.borrow_option(), error),
            device: device.clone(),
            comparison: desc.compare.is_some(),
            filtering: [desc.mag_filter, desc.min_filter, desc.mipmap_filter]
                .contains(&FilterMode::Linear),
        }
    }
}

/// Describes a [`QuerySet`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuerySetDescriptor<'a> {
    pub label: Label<'a>,
    pub ty: QueryType,
    pub count: u32,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CreateQuerySetError {
    #[error("Query set count {0} must be between 1 and {QUERY_SET_MAX_QUERIES}")]
    InvalidCount(u32),
    #[error(transparent)]
    MissingFeature(#[from] MissingFeature),
}

#[derive(Debug)]
pub struct QuerySet {
    pub(crate) info: ResourceInfo,
    pub(crate) device: Arc<Device>,
    pub(crate) ty: QueryType,
    pub(crate) count: u32,
    destroyed: Mutex<bool>,
}

impl Resource for QuerySet {
    type Marker = id::markers::QuerySet;
    const TYPE: &'static str = "QuerySet";

    fn info(&self) -> &ResourceInfo {
        &self.info
    }

    fn on_release(&self, _hub: &Hub) {
        *self.destroyed.lock() = true;
    }
}

impl_parent_device!(QuerySet);

impl QuerySet {
    pub(crate) fn new(device: &Arc<Device>, desc: &QuerySetDescriptor, error: bool) -> Self {
        Self {
            info: ResourceInfo::new(desc.label.borrow_option(), error),
            device: device.clone(),
            ty: desc.ty,
            count: desc.count,
            destroyed: Mutex::new(false),
        }
    }

    pub(crate) fn validate_descriptor(device: &Device, desc: &QuerySetDescriptor) -> Result<(), CreateQuerySetError> {
        if desc.count == 0 || desc.count > QUERY_SET_MAX_QUERIES {
            return Err(CreateQuerySetError::InvalidCount(desc.count));
        }

        if desc.ty == QueryType::Timestamp {
            device.require_feature(FeatureName::TimestampQuery)?;
        }

        Ok(())
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        *self.destroyed.lock()
    }

    pub(crate) fn check_queue_use(&self) -> Result<(), QueueUseError> {
        if self.is_destroyed() {
            Err(QueueUseError::Destroyed(Self::TYPE, self.label()))
        } else {
            Ok(())
        }
    }
}

/// Describes an [`ExternalTexture`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalTextureDescriptor<'a> {
    pub label: Label<'a>,
    pub plane0: id::TextureViewId,
    pub plane1: Option<id::TextureViewId>,
    /// Visible size of the texture.
    pub visible_size: Option<Extent3d>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExternalTextureError {
    #[error(transparent)]
    Object(#[from] ObjectError),
    #[error("Plane {0} must be a 2D view")]
    InvalidPlane(usize),
    #[error("External texture is destroyed")]
    Destroyed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExternalTextureState {
    Active,
    Expired,
    Destroyed,
}

#[derive(Debug)]
pub struct ExternalTexture {
    pub(crate) info: ResourceInfo,
    pub(crate) device: Arc<Device>,
    pub(crate) planes: Vec<Arc<TextureView>>,
    pub(crate) state: Mutex<ExternalTextureState>,
}

impl_resource_type!(ExternalTexture, ExternalTexture, "ExternalTexture");
impl_parent_device!(ExternalTexture);

impl ExternalTexture {
    pub(crate) fn error(device: &Arc<Device>, label: Option<&str>) -> Self {
        Self {
            info: ResourceInfo::new(label, true),
            device: device.clone(),
            planes: Vec::new(),
            state: Mutex::new(ExternalTextureState::Destroyed),
        }
    }

    pub(crate) fn check_active(&self) -> Result<(), ExternalTextureError> {
        match *self.state.lock() {
            ExternalTextureState::Active => Ok(()),
            _ => Err(ExternalTextureError::Destroyed),
        }
    }
}

impl Global {
    pub(crate) fn create_external_texture(
        &self,
        device: &Arc<Device>,
        desc: &ExternalTextureDescriptor,
    ) -> Result<ExternalTexture, ExternalTextureError> {
        let mut planes = Vec::with_capacity(2);

        for (index, plane) in std::iter::once(desc.plane0).chain(desc.plane1).enumerate() {
            let view = resolve(&self.hub.texture_views, plane, device)?;

            if view.dimension != TextureViewDimension::D2 {
                return Err(ExternalTextureError::InvalidPlane(index));
            }

            planes.push(view);
        }

        Ok(ExternalTexture {
            info: ResourceInfo::new(desc.label.borrow_option(), false),
            device: device.clone(),
            planes,
            state: Mutex::new(ExternalTextureState::Active),
        })
    }

    pub fn buffer_create_texel_view(
        &self,
        buffer_id: id::BufferId,
        desc: &TexelBufferViewDescriptor,
    ) -> Result<id::TexelBufferViewId, InvalidId> {
        profiling::scope!("Buffer::create_texel_view");
        api_log!("Buffer::create_texel_view {buffer_id:?}");

        let buffer = self.hub.buffers.get(buffer_id)?;

        let view = match TexelBufferView::create(&buffer, desc) {
            Ok(view) => view,
            Err(err) => {
                buffer.device.validation_error(err);
                TexelBufferView::error(&buffer, desc)
            }
        };

        let (id, _) = self.hub.texel_buffer_views.register(view);
        Ok(id)
    }

    pub fn buffer_destroy(&self, buffer_id: id::BufferId) -> Result<(), InvalidId> {
        api_log!("Buffer::destroy {buffer_id:?}");
        self.hub.buffers.get(buffer_id)?.destroy();
        Ok(())
    }

    pub fn buffer_get_const_mapped_range(
        &self,
        buffer_id: id::BufferId,
        offset: usize,
        size: usize,
    ) -> Result<*const u8, BufferAccessError> {
        api_log!("Buffer::get_const_mapped_range {buffer_id:?} offset {offset} size {size}");
        let buffer = self.hub.buffers.get(buffer_id)?;
        Ok(buffer.mapped_range(offset, size, false)?.cast_const())
    }

    pub fn buffer_get_mapped_range(
        &self,
        buffer_id: id::BufferId,
        offset: usize,
        size: usize,
    ) -> Result<*mut u8, BufferAccessError> {
        api_log!("Buffer::get_mapped_range {buffer_id:?} offset {offset} size {size}");
        let buffer = self.hub.buffers.get(buffer_id)?;
        buffer.mapped_range(offset, size, true)
    }

    pub fn buffer_get_map_state(&self, buffer_id: id::BufferId) -> Result<BufferMapState, InvalidId> {
        Ok(self.hub.buffers.get(buffer_id)?.map_state())
    }

    pub fn buffer_get_size(&self, buffer_id: id::BufferId) -> Result<BufferAddress, InvalidId> {
        Ok(self.hub.buffers.get(buffer_id)?.size)
    }

    pub fn buffer_get_usage(&self, buffer_id: id::BufferId) -> Result<BufferUsages, InvalidId> {
        Ok(self.hub.buffers.get(buffer_id)?.usage)
    }

    /// Map a range of the buffer for host access.
    ///
    /// The mapping takes effect when the returned future's callback is
    /// delivered. Unmapping or destroying the buffer before then delivers
    /// [`MapAsyncStatus::Aborted`]. Validation failures are reported to the
    /// device and delivered as [`MapAsyncStatus::Error`].
    pub fn buffer_map_async(
        &self,
        buffer_id: id::BufferId,
        mode: MapMode,
        offset: usize,
        size: usize,
        callback_info: BufferMapCallbackInfo,
    ) -> Result<FutureId, InvalidId> {
        profiling::scope!("Buffer::map_async");
        api_log!("Buffer::map_async {buffer_id:?} offset {offset} size {size} mode {mode:?}");

        let buffer = self.hub.buffers.get(buffer_id)?;
        let CallbackInfo { mode: callback_mode, callback } = callback_info;

        let future = match buffer.map_async(mode, offset, size) {
            Ok(token) => {
                let weak = Arc::downgrade(&buffer);

                buffer.device.events().track(callback_mode, true, move |outcome| {
                    let (status, message) = match (outcome, weak.upgrade()) {
                        (EventOutcome::Cancelled, _) => (
                            MapAsyncStatus::CallbackCancelled,
                            "Instance dropped before mapping was resolved.",
                        ),
                        (EventOutcome::Ready, Some(buffer)) => buffer.resolve_map(token),
                        (EventOutcome::Ready, None) => (
                            MapAsyncStatus::Aborted,
                            "Buffer was destroyed before mapping was resolved.",
                        ),
                    };

                    callback(status, message);
                })
            }
            Err(err) => {
                let message = err.to_string();
                buffer.device.validation_error(err);

                buffer.device.events().track(callback_mode, true, move |outcome| {
                    let status = match outcome {
                        EventOutcome::Ready => MapAsyncStatus::Error,
                        EventOutcome::Cancelled => MapAsyncStatus::CallbackCancelled,
                    };

                    callback(status, &message);
                })
            }
        };

        Ok(future)
    }

    /// Copy out of the mapped range starting at `offset` into `data`.
    pub fn buffer_read_mapped_range(
        &self,
        buffer_id: id::BufferId,
        offset: usize,
        data: &mut [u8],
    ) -> Result<(), BufferAccessError> {
        api_log!("Buffer::read_mapped_range {buffer_id:?} offset {offset} size {}", data.len());

        let buffer = self.hub.buffers.get(buffer_id)?;
        let state = buffer.state.lock();
        let range = buffer.check_mapped_range(&state, offset, data.len(), false)?;
        buffer.memory().read(range.start, data);
        Ok(())
    }

    pub fn buffer_unmap(&self, buffer_id: id::BufferId) -> Result<(), InvalidId> {
        api_log!("Buffer::unmap {buffer_id:?}");
        self.hub.buffers.get(buffer_id)?.unmap();
        Ok(())
    }

    /// Copy `data` into the mapped range starting at `offset`.
    pub fn buffer_write_mapped_range(
        &self,
        buffer_id: id::BufferId,
        offset: usize,
        data: &[u8],
    ) -> Result<(), BufferAccessError> {
        api_log!("Buffer::write_mapped_range {buffer_id:?} offset {offset} size {}", data.len());

        let buffer = self.hub.buffers.get(buffer_id)?;
        let state = buffer.state.lock();
        let range = buffer.check_mapped_range(&state, offset, data.len(), true)?;
        buffer.memory().write(range.start, data);
        Ok(())
    }

    pub fn external_texture_destroy(&self, external_texture_id: id::ExternalTextureId) -> Result<(), InvalidId> {
        api_log!("ExternalTexture::destroy {external_texture_id:?}");
        let texture = self.hub.external_textures.get(external_texture_id)?;
        *texture.state.lock() = ExternalTextureState::Destroyed;
        Ok(())
    }

    pub fn external_texture_expire(&self, external_texture_id: id::ExternalTextureId) -> Result<(), InvalidId> {
        api_log!("ExternalTexture::expire {external_texture_id:?}");
        let texture = self.hub.external_textures.get(external_texture_id)?;
        let mut state = texture.state.lock();

        if *state == ExternalTextureState::Active {
            *state = ExternalTextureState::Expired;
        }

        Ok(())
    }

    /// Make an expired external texture usable again.
    pub fn external_texture_refresh(&self, external_texture_id: id::ExternalTextureId) -> Result<(), InvalidId> {
        api_log!("ExternalTexture::refresh {external_texture_id:?}");
        let texture = self.hub.external_textures.get(external_texture_id)?;
        let mut state = texture.state.lock();

        match *state {
            ExternalTextureState::Destroyed => {
                drop(state);
                texture.device.validation_error(ExternalTextureError::Destroyed);
            }
            _ => *state = ExternalTextureState::Active,
        }

        Ok(())
    }

    pub fn query_set_destroy(&self, query_set_id: id::QuerySetId) -> Result<(), InvalidId> {
        api_log!("QuerySet::destroy {query_set_id:?}");
        *self.hub.query_sets.get(query_set_id)?.destroyed.lock() = true;
        Ok(())
    }

    pub fn query_set_get_count(&self, query_set_id: id::QuerySetId) -> Result<u32, InvalidId> {
        Ok(self.hub.query_sets.get(query_set_id)?.count)
    }

    pub fn query_set_get_type(&self, query_set_id: id::QuerySetId) -> Result<QueryType, InvalidId> {
        Ok(self.hub.query_sets.get(query_set_id)?.ty)
    }

    /// Create a view that is an error object, without reporting an error.
    pub fn texture_create_error_view(
        &self,
        texture_id: id::TextureId,
        desc: Option<&TextureViewDescriptor>,
    ) -> Result<id::TextureViewId, InvalidId> {
        api_log!("Texture::create_error_view {texture_id:?}");

        let texture = self.hub.textures.get(texture_id)?;
        let view = TextureView::error(&texture, desc.unwrap_or(&TextureViewDescriptor::default()));
        let (id, _) = self.hub.texture_views.register(view);
        Ok(id)
    }

    pub fn texture_create_view(
        &self,
        texture_id: id::TextureId,
        desc: Option<&TextureViewDescriptor>,
    ) -> Result<id::TextureViewId, InvalidId> {
        profiling::scope!("Texture::create_view");
        api_log!("Texture::create_view {texture_id:?}");

        let texture = self.hub.textures.get(texture_id)?;
        let default = TextureViewDescriptor::default();
        let desc = desc.unwrap_or(&default);

        let view = match TextureView::create(&texture, desc) {
            Ok(view) => view,
            Err(err) => {
                texture.device.validation_error(err);
                TextureView::error(&texture, desc)
            }
        };

        let (id, _) = self.hub.texture_views.register(view);
        Ok(id)
    }

    pub fn texture_destroy(&self, texture_id: id::TextureId) -> Result<(), InvalidId> {
        api_log!("Texture::destroy {texture_id:?}");
        self.hub.textures.get(texture_id)?.destroy();
        Ok(())
    }

    pub fn texture_get_depth_or_array_layers(&self, texture_id: id::TextureId) -> Result<u32, InvalidId> {
        Ok(self.hub.textures.get(texture_id)?.size.depth_or_array_layers)
    }

    pub fn texture_get_dimension(&self, texture_id: id::TextureId) -> Result<TextureDimension, InvalidId> {
        Ok(self.hub.textures.get(texture_id)?.dimension)
    }

    pub fn texture_get_format(&self, texture_id: id::TextureId) -> Result<TextureFormat, InvalidId> {
        Ok(self.hub.textures.get(texture_id)?.format)
    }

    pub fn texture_get_height(&self, texture_id: id::TextureId) -> Result<u32, InvalidId> {
        Ok(self.hub.textures.get(texture_id)?.size.height)
    }

    pub fn texture_get_mip_level_count(&self, texture_id: id::TextureId) -> Result<u32, InvalidId> {
        Ok(self.hub.textures.get(texture_id)?.mip_level_count)
    }

    pub fn texture_get_sample_count(&self, texture_id: id::TextureId) -> Result<u32, InvalidId> {
        Ok(self.hub.textures.get(texture_id)?.sample_count)
    }

    pub fn texture_get_texture_binding_view_dimension(
        &self,
        texture_id: id::TextureId,
    ) -> Result<TextureViewDimension, InvalidId> {
        Ok(self.hub.textures.get(texture_id)?.binding_view_dimension)
    }

    pub fn texture_get_usage(&self, texture_id: id::TextureId) -> Result<TextureUsages, InvalidId> {
        Ok(self.hub.textures.get(texture_id)?.usage)
    }

    pub fn texture_get_width(&self, texture_id: id::TextureId) -> Result<u32, InvalidId> {
        Ok(self.hub.textures.get(texture_id)?.size.width)
    }

    /// Pin a texture created from shared texture memory to `usage`.
    pub fn texture_pin(&self, texture_id: id::TextureId, usage: TextureUsages) -> Result<(), InvalidId> {
        api_log!("Texture::pin {texture_id:?} {usage:?}");
        let texture = self.hub.textures.get(texture_id)?;

        if let Err(err) = texture.pin(usage) {
            texture.device.validation_error(err);
        }

        Ok(())
    }

    pub fn texture_set_ownership_for_memory_dump(
        &self,
        texture_id: id::TextureId,
        owner_guid: u64,
    ) -> Result<(), InvalidId> {
        let texture = self.hub.textures.get(texture_id)?;
        texture.state.lock().memory_dump_owner = Some(owner_guid);
        Ok(())
    }

    pub fn texture_unpin(&self, texture_id: id::TextureId) -> Result<(), InvalidId> {
        api_log!("Texture::unpin {texture_id:?}");
        let texture = self.hub.textures.get(texture_id)?;

        if let Err(err) = texture.unpin() {
            texture.device.validation_error(err);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_allocation_copies() {
        let memory = HostAllocation::zeroed(16);
        memory.write(4, &[1, 2, 3, 4]);

        let mut out = [0; 8];
        memory.read(2, &mut out);
        assert_eq!(out, [0, 0, 1, 2, 3, 4, 0, 0]);

        memory.clear(4..6);
        memory.read(2, &mut out);
        assert_eq!(out, [0, 0, 0, 0, 3, 4, 0, 0]);
    }

    #[test]
    fn empty_host_allocation() {
        let memory = HostAllocation::zeroed(0);
        memory.write(0, &[]);
        assert_eq!(memory.len(), 0);
    }

    #[test]
    fn srgb_view_formats() {
        assert_eq!(
            srgb_counterpart(TextureFormat::Bgra8Unorm),
            Some(TextureFormat::Bgra8UnormSrgb)
        );
        assert_eq!(srgb_counterpart(TextureFormat::R8Unorm), None);
        assert_eq!(
            default_binding_view_dimension(TextureDimension::D2, 6),
            TextureViewDimension::D2Array
        );
    }
}

use std::{ops::Range, sync::Arc};

use parking_lot::Mutex;
use pt::{
    BufferAddress, BufferBindingType, BufferUsages, FeatureName, SamplerBindingType,
    ShaderStages, StorageTextureAccess, TextureFormat, TextureSampleType, TextureUsages,
    TextureViewDimension, RESOURCE_TABLE_MAX_SIZE, WHOLE_SIZE,
};
use thiserror::Error;

use crate::{
    api_log,
    device::{Device, MAX_BIND_GROUPS},
    error::{MissingFeature, ObjectError},
    global::Global,
    hub::Hub,
    id,
    resource::{
        impl_parent_device, impl_resource_type, resolve, Buffer, ExternalTexture, ParentDevice,
        Resource, ResourceInfo, Sampler, TexelBufferView, Texture, TextureView,
    },
    storage::InvalidId,
    FastHashMap, Label, LabelHelpers,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingType {
    Buffer {
        ty: BufferBindingType,
        has_dynamic_offset: bool,
        min_binding_size: Option<BufferAddress>,
    },
    Sampler(SamplerBindingType),
    Texture {
        sample_type: TextureSampleType,
        view_dimension: TextureViewDimension,
        multisampled: bool,
    },
    StorageTexture {
        access: StorageTextureAccess,
        format: TextureFormat,
        view_dimension: TextureViewDimension,
    },
    ExternalTexture,
    TexelBuffer {
        format: TextureFormat,
    },
}

impl BindingType {
    fn name(&self) -> &'static str {
        match self {
            Self::Buffer { .. } => "buffer",
            Self::Sampler(_) => "sampler",
            Self::Texture { .. } => "texture",
            Self::StorageTexture { .. } => "storage texture",
            Self::ExternalTexture => "external texture",
            Self::TexelBuffer { .. } => "texel buffer",
        }
    }
}

/// Describes a single binding inside a bind group layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BindGroupLayoutEntry {
    pub binding: u32,
    pub visibility: ShaderStages,
    pub ty: BindingType,
}

/// Describes a [`BindGroupLayout`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BindGroupLayoutDescriptor<'a> {
    pub label: Label<'a>,
    pub entries: Vec<BindGroupLayoutEntry>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CreateBindGroupLayoutError {
    #[error("Conflicting binding at index {0}")]
    ConflictBinding(u32),
    #[error("Binding {binding} exceeds the limit of {maximum} bindings per bind group")]
    InvalidBindingIndex { binding: u32, maximum: u32 },
    #[error("Too many dynamic {kind} buffers: {count} > {limit}")]
    TooManyDynamicBuffers {
        kind: &'static str,
        count: u32,
        limit: u32,
    },
    #[error("Binding {0} has a visibility that is not allowed for its type")]
    InvalidVisibility(u32),
    #[error("Binding {0} uses a storage texture format that can't be stored to")]
    InvalidStorageTextureFormat(u32),
    #[error("Binding {0} is multisampled with an unsupported view dimension or sample type")]
    InvalidMultisample(u32),
    #[error(transparent)]
    MissingFeature(#[from] MissingFeature),
}

#[derive(Debug)]
pub struct BindGroupLayout {
    pub(crate) info: ResourceInfo,
    pub(crate) device: Arc<Device>,
    /// Entries sorted by binding index.
    pub(crate) entries: Vec<BindGroupLayoutEntry>,
    pub(crate) dynamic_count: usize,
}

impl_resource_type!(BindGroupLayout, BindGroupLayout, "BindGroupLayout");
impl_parent_device!(BindGroupLayout);

impl BindGroupLayout {
    pub(crate) fn create(
        device: &Arc<Device>,
        desc: &BindGroupLayoutDescriptor,
    ) -> Result<Self, CreateBindGroupLayoutError> {
        let limits = &device.limits;
        let mut entries = desc.entries.clone();
        entries.sort_by_key(|entry| entry.binding);

        for pair in entries.windows(2) {
            if pair[0].binding == pair[1].binding {
                return Err(CreateBindGroupLayoutError::ConflictBinding(pair[0].binding));
            }
        }

        let mut dynamic_uniform = 0;
        let mut dynamic_storage = 0;

        for entry in &entries {
            if entry.binding >= limits.max_bindings_per_bind_group {
                return Err(CreateBindGroupLayoutError::InvalidBindingIndex {
                    binding: entry.binding,
                    maximum: limits.max_bindings_per_bind_group,
                });
            }

            match entry.ty {
                BindingType::Buffer {
                    ty,
                    has_dynamic_offset,
                    ..
                } => {
                    if has_dynamic_offset {
                        match ty {
                            BufferBindingType::Uniform => dynamic_uniform += 1,
                            BufferBindingType::Storage { .. } => dynamic_storage += 1,
                        }
                    }

                    let writable = ty == BufferBindingType::Storage { read_only: false };

                    if writable && entry.visibility.contains(ShaderStages::VERTEX) {
                        return Err(CreateBindGroupLayoutError::InvalidVisibility(entry.binding));
                    }
                }
                BindingType::StorageTexture { access, format, .. } => {
                    if access != StorageTextureAccess::ReadOnly
                        && entry.visibility.contains(ShaderStages::VERTEX)
                    {
                        return Err(CreateBindGroupLayoutError::InvalidVisibility(entry.binding));
                    }

                    if format.is_depth_stencil() || format.is_compressed() {
                        return Err(CreateBindGroupLayoutError::InvalidStorageTextureFormat(
                            entry.binding,
                        ));
                    }
                }
                BindingType::Texture {
                    sample_type,
                    view_dimension,
                    multisampled: true,
                } => {
                    if view_dimension != TextureViewDimension::D2
                        || sample_type == (TextureSampleType::Float { filterable: true })
                    {
                        return Err(CreateBindGroupLayoutError::InvalidMultisample(entry.binding));
                    }
                }
                BindingType::TexelBuffer { .. } => {
                    device.require_feature(FeatureName::TexelBuffers)?;
                }
                _ => {}
            }
        }

        let checks = [
            (
                "uniform",
                dynamic_uniform,
                limits.max_dynamic_uniform_buffers_per_pipeline_layout,
            ),
            (
                "storage",
                dynamic_storage,
                limits.max_dynamic_storage_buffers_per_pipeline_layout,
            ),
        ];

        for (kind, count, limit) in checks {
            if count > limit {
                return Err(CreateBindGroupLayoutError::TooManyDynamicBuffers { kind, count, limit });
            }
        }

        Ok(Self {
            info: ResourceInfo::new(desc.label.borrow_option(), false),
            device: device.clone(),
            entries,
            dynamic_count: (dynamic_uniform + dynamic_storage) as usize,
        })
    }

    /// A layout with no entries, as used for unset groups of a pipeline
    /// layout.
    pub(crate) fn empty(device: &Arc<Device>) -> Self {
        Self {
            info: ResourceInfo::new(None, false),
            device: device.clone(),
            entries: Vec::new(),
            dynamic_count: 0,
        }
    }

    pub(crate) fn error(device: &Arc<Device>, label: Option<&str>) -> Self {
        Self {
            info: ResourceInfo::new(label, true),
            device: device.clone(),
            entries: Vec::new(),
            dynamic_count: 0,
        }
    }

    fn entry(&self, binding: u32) -> Option<&BindGroupLayoutEntry> {
        self.entries
            .binary_search_by_key(&binding, |entry| entry.binding)
            .ok()
            .map(|index| &self.entries[index])
    }

    /// Two layouts are compatible when their entries are identical.
    pub(crate) fn is_compatible(&self, other: &Self) -> bool {
        if self.is_error() || other.is_error() {
            return false;
        }

        std::ptr::eq(self, other) || self.entries == other.entries
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferBinding {
    pub buffer: id::BufferId,
    pub offset: BufferAddress,
    /// Size of the binding, or the rest of the buffer when `None`.
    pub size: Option<BufferAddress>,
}

/// A resource bound to a bind group or resource table slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingResource {
    Buffer(BufferBinding),
    Sampler(id::SamplerId),
    TextureView(id::TextureViewId),
    ExternalTexture(id::ExternalTextureId),
    TexelBufferView(id::TexelBufferViewId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindGroupEntry {
    pub binding: u32,
    pub resource: BindingResource,
}

/// Describes a [`BindGroup`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindGroupDescriptor<'a> {
    pub label: Label<'a>,
    pub layout: id::BindGroupLayoutId,
    pub entries: Vec<BindGroupEntry>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CreateBindGroupError {
    #[error(transparent)]
    Object(#[from] ObjectError),
    #[error("Binding {0} is missing from the bind group")]
    MissingBinding(u32),
    #[error("Binding {0} is set more than once")]
    DuplicateBinding(u32),
    #[error("Binding {0} is not part of the layout")]
    UnexpectedBinding(u32),
    #[error("Binding {binding} expects a {expected} resource")]
    WrongBindingType {
        binding: u32,
        expected: &'static str,
    },
    #[error("Binding {binding} needs a buffer with usage {expected:?}")]
    MissingBufferUsage {
        binding: u32,
        expected: BufferUsages,
    },
    #[error("Binding {binding} needs a texture with usage {expected:?}")]
    MissingTextureUsage {
        binding: u32,
        expected: TextureUsages,
    },
    #[error("Binding {binding} range {start}..{end} is out of bounds of a buffer of size {size}")]
    BindingRangeTooLarge {
        binding: u32,
        start: u64,
        end: u64,
        size: u64,
    },
    #[error("Binding {binding} of size {actual} is smaller than the minimum {min}")]
    BindingSizeTooSmall { binding: u32, actual: u64, min: u64 },
    #[error("Binding {binding} offset {offset} must be a multiple of {alignment}")]
    UnalignedBufferOffset {
        binding: u32,
        offset: u64,
        alignment: u64,
    },
    #[error("Binding {binding} expects view dimension {expected:?}, got {actual:?}")]
    InvalidViewDimension {
        binding: u32,
        expected: TextureViewDimension,
        actual: TextureViewDimension,
    },
    #[error("Binding {binding} expects a {} texture", if *.multisampled { "multisampled" } else { "single sampled" })]
    InvalidSampleCount { binding: u32, multisampled: bool },
    #[error("Binding {binding} expects format {expected:?}, got {actual:?}")]
    InvalidFormat {
        binding: u32,
        expected: TextureFormat,
        actual: TextureFormat,
    },
    #[error("Binding {binding} needs a sampler of type {expected:?}")]
    WrongSamplerType {
        binding: u32,
        expected: SamplerBindingType,
    },
    #[error("Binding {0} is destroyed")]
    Destroyed(u32),
}

/// A resource held by a bind group or resource table.
#[derive(Clone, Debug)]
pub(crate) enum BoundResource {
    Buffer {
        buffer: Arc<Buffer>,
        range: Range<u64>,
    },
    Sampler(Arc<Sampler>),
    TextureView(Arc<TextureView>),
    ExternalTexture(Arc<ExternalTexture>),
    TexelBufferView(Arc<TexelBufferView>),
}

impl BoundResource {
    pub(crate) fn resolve(
        hub: &Hub,
        device: &Arc<Device>,
        resource: &BindingResource,
    ) -> Result<Self, ObjectError> {
        Ok(match *resource {
            BindingResource::Buffer(binding) => {
                let buffer = resolve(&hub.buffers, binding.buffer, device)?;
                let end = match binding.size {
                    Some(size) if size != WHOLE_SIZE => binding.offset.saturating_add(size),
                    _ => buffer.size.max(binding.offset),
                };

                Self::Buffer {
                    buffer,
                    range: binding.offset..end,
                }
            }
            BindingResource::Sampler(id) => Self::Sampler(resolve(&hub.samplers, id, device)?),
            BindingResource::TextureView(id) => {
                Self::TextureView(resolve(&hub.texture_views, id, device)?)
            }
            BindingResource::ExternalTexture(id) => {
                Self::ExternalTexture(resolve(&hub.external_textures, id, device)?)
            }
            BindingResource::TexelBufferView(id) => {
                let view = hub
                    .texel_buffer_views
                    .get(id)
                    .map_err(|_| ObjectError::Invalid(TexelBufferView::TYPE))?;

                if view.is_error() {
                    return Err(ObjectError::ErrorObject(TexelBufferView::TYPE, view.label()));
                }

                view.buffer.same_device(device)?;
                Self::TexelBufferView(view)
            }
        })
    }

    fn buffer(&self) -> Option<&Arc<Buffer>> {
        match self {
            Self::Buffer { buffer, .. } => Some(buffer),
            Self::TexelBufferView(view) => Some(&view.buffer),
            _ => None,
        }
    }

    fn texture(&self) -> Option<&Arc<Texture>> {
        match self {
            Self::TextureView(view) => Some(&view.texture),
            _ => None,
        }
    }

    /// Check `self` against the layout entry it is bound to.
    fn check_entry(&self, entry: &BindGroupLayoutEntry, device: &Device) -> Result<(), CreateBindGroupError> {
        let binding = entry.binding;
        let wrong_type = || CreateBindGroupError::WrongBindingType {
            binding,
            expected: entry.ty.name(),
        };

        match (&entry.ty, self) {
            (
                &BindingType::Buffer {
                    ty,
                    has_dynamic_offset,
                    min_binding_size,
                },
                Self::Buffer { buffer, range },
            ) => {
                let expected = ty.required_usage();

                if !buffer.usage.contains(expected) {
                    return Err(CreateBindGroupError::MissingBufferUsage { binding, expected });
                }

                if range.start > range.end || range.end > buffer.size {
                    return Err(CreateBindGroupError::BindingRangeTooLarge {
                        binding,
                        start: range.start,
                        end: range.end,
                        size: buffer.size,
                    });
                }

                let alignment = offset_alignment(device, ty);

                if !has_dynamic_offset && range.start % alignment != 0 {
                    return Err(CreateBindGroupError::UnalignedBufferOffset {
                        binding,
                        offset: range.start,
                        alignment,
                    });
                }

                let actual = range.end - range.start;
                let min = min_binding_size.unwrap_or(0).max(1);

                if actual < min {
                    return Err(CreateBindGroupError::BindingSizeTooSmall { binding, actual, min });
                }

                Ok(())
            }
            (&BindingType::Sampler(ty), Self::Sampler(sampler)) => {
                let valid = match ty {
                    SamplerBindingType::Comparison => sampler.comparison,
                    SamplerBindingType::Filtering => !sampler.comparison,
                    SamplerBindingType::NonFiltering => !sampler.comparison && !sampler.filtering,
                };

                if valid {
                    Ok(())
                } else {
                    Err(CreateBindGroupError::WrongSamplerType { binding, expected: ty })
                }
            }
            (
                &BindingType::Texture {
                    view_dimension,
                    multisampled,
                    ..
                },
                Self::TextureView(view),
            ) => {
                check_view(binding, view, view_dimension, TextureUsages::TEXTURE_BINDING)?;

                if (view.texture.sample_count > 1) != multisampled {
                    return Err(CreateBindGroupError::InvalidSampleCount { binding, multisampled });
                }

                Ok(())
            }
            (
                &BindingType::StorageTexture {
                    format,
                    view_dimension,
                    ..
                },
                Self::TextureView(view),
            ) => {
                check_view(binding, view, view_dimension, TextureUsages::STORAGE_BINDING)?;

                if view.format != format {
                    return Err(CreateBindGroupError::InvalidFormat {
                        binding,
                        expected: format,
                        actual: view.format,
                    });
                }

                Ok(())
            }
            (BindingType::ExternalTexture, Self::ExternalTexture(texture)) => texture
                .check_active()
                .map_err(|_| CreateBindGroupError::Destroyed(binding)),
            (&BindingType::TexelBuffer { format }, Self::TexelBufferView(view)) => {
                if view.format != format {
                    return Err(CreateBindGroupError::InvalidFormat {
                        binding,
                        expected: format,
                        actual: view.format,
                    });
                }

                Ok(())
            }
            _ => Err(wrong_type()),
        }
    }
}

fn check_view(
    binding: u32,
    view: &TextureView,
    expected: TextureViewDimension,
    usage: TextureUsages,
) -> Result<(), CreateBindGroupError> {
    if view.dimension != expected {
        return Err(CreateBindGroupError::InvalidViewDimension {
            binding,
            expected,
            actual: view.dimension,
        });
    }

    if !view.usage.contains(usage) {
        return Err(CreateBindGroupError::MissingTextureUsage {
            binding,
            expected: usage,
        });
    }

    Ok(())
}

fn offset_alignment(device: &Device, ty: BufferBindingType) -> u64 {
    match ty {
        BufferBindingType::Uniform => device.limits.min_uniform_buffer_offset_alignment as u64,
        BufferBindingType::Storage { .. } => device.limits.min_storage_buffer_offset_alignment as u64,
    }
}

/// A binding with a dynamic offset, in binding order.
#[derive(Clone, Debug)]
pub(crate) struct DynamicBinding {
    pub(crate) binding: u32,
    pub(crate) alignment: u64,
    pub(crate) range: Range<u64>,
    pub(crate) buffer_size: u64,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("Bind group index {index} is greater than the device's limit of {max}")]
    InvalidGroupIndex { index: u32, max: u32 },
    #[error("Bind group has {expected} dynamic bindings, but {actual} dynamic offsets were provided")]
    MismatchedDynamicOffsetCount { expected: usize, actual: usize },
    #[error("Dynamic offset {offset} for binding {binding} must be a multiple of {alignment}")]
    UnalignedDynamicBinding {
        binding: u32,
        offset: u32,
        alignment: u64,
    },
    #[error("Dynamic offset {offset} for binding {binding} moves the range {start}..{end} out of a buffer of size {size}")]
    DynamicBindingOutOfBounds {
        binding: u32,
        offset: u32,
        start: u64,
        end: u64,
        size: u64,
    },
    #[error(transparent)]
    Object(#[from] ObjectError),
}

#[derive(Debug)]
pub struct BindGroup {
    pub(crate) info: ResourceInfo,
    pub(crate) device: Arc<Device>,
    pub(crate) layout: Arc<BindGroupLayout>,
    pub(crate) entries: Vec<(u32, BoundResource)>,
    pub(crate) dynamic_bindings: Vec<DynamicBinding>,
}

impl_resource_type!(BindGroup, BindGroup, "BindGroup");
impl_parent_device!(BindGroup);

impl BindGroup {
    pub(crate) fn create(
        hub: &Hub,
        device: &Arc<Device>,
        desc: &BindGroupDescriptor,
    ) -> Result<Self, CreateBindGroupError> {
        let layout = resolve(&hub.bind_group_layouts, desc.layout, device)?;
        let mut seen = FastHashMap::default();

        for entry in &desc.entries {
            if seen.insert(entry.binding, ()).is_some() {
                return Err(CreateBindGroupError::DuplicateBinding(entry.binding));
            }

            if layout.entry(entry.binding).is_none() {
                return Err(CreateBindGroupError::UnexpectedBinding(entry.binding));
            }
        }

        let mut entries = Vec::with_capacity(layout.entries.len());
        let mut dynamic_bindings = Vec::new();

        for layout_entry in &layout.entries {
            let entry = desc
                .entries
                .iter()
                .find(|entry| entry.binding == layout_entry.binding)
                .ok_or(CreateBindGroupError::MissingBinding(layout_entry.binding))?;

            let bound = BoundResource::resolve(hub, device, &entry.resource)?;
            bound.check_entry(layout_entry, device)?;

            if let (
                BindingType::Buffer {
                    ty,
                    has_dynamic_offset: true,
                    ..
                },
                BoundResource::Buffer { buffer, range },
            ) = (&layout_entry.ty, &bound)
            {
                dynamic_bindings.push(DynamicBinding {
                    binding: layout_entry.binding,
                    alignment: offset_alignment(device, *ty),
                    range: range.clone(),
                    buffer_size: buffer.size,
                });
            }

            entries.push((layout_entry.binding, bound));
        }

        Ok(Self {
            info: ResourceInfo::new(desc.label.borrow_option(), false),
            device: device.clone(),
            layout,
            entries,
            dynamic_bindings,
        })
    }

    pub(crate) fn error(device: &Arc<Device>, label: Option<&str>) -> Self {
        Self {
            info: ResourceInfo::new(label, true),
            device: device.clone(),
            layout: Arc::new(BindGroupLayout::error(device, None)),
            entries: Vec::new(),
            dynamic_bindings: Vec::new(),
        }
    }

    /// Validate the dynamic offsets used when setting this group.
    pub(crate) fn validate_dynamic_offsets(&self, offsets: &[u32]) -> Result<(), BindError> {
        if offsets.len() != self.dynamic_bindings.len() {
            return Err(BindError::MismatchedDynamicOffsetCount {
                expected: self.dynamic_bindings.len(),
                actual: offsets.len(),
            });
        }

        for (dynamic, &offset) in self.dynamic_bindings.iter().zip(offsets) {
            if offset as u64 % dynamic.alignment != 0 {
                return Err(BindError::UnalignedDynamicBinding {
                    binding: dynamic.binding,
                    offset,
                    alignment: dynamic.alignment,
                });
            }

            let end = dynamic.range.end + offset as u64;

            if end > dynamic.buffer_size {
                return Err(BindError::DynamicBindingOutOfBounds {
                    binding: dynamic.binding,
                    offset,
                    start: dynamic.range.start,
                    end,
                    size: dynamic.buffer_size,
                });
            }
        }

        Ok(())
    }

    pub(crate) fn buffers(&self) -> impl Iterator<Item = &Arc<Buffer>> {
        self.entries.iter().filter_map(|(_, bound)| bound.buffer())
    }

    pub(crate) fn textures(&self) -> impl Iterator<Item = &Arc<Texture>> {
        self.entries.iter().filter_map(|(_, bound)| bound.texture())
    }
}

/// Describes a [`PipelineLayout`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineLayoutDescriptor<'a> {
    pub label: Label<'a>,
    /// Layouts of each group. `None` leaves a group empty.
    pub bind_group_layouts: Vec<Option<id::BindGroupLayoutId>>,
    pub immediate_size: u32,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CreatePipelineLayoutError {
    #[error(transparent)]
    Object(#[from] ObjectError),
    #[error("Bind group layout count {actual} exceeds device bind group limit {max}")]
    TooManyGroups { actual: usize, max: usize },
    #[error("Immediate size {size} must be a multiple of 4 and at most {max}")]
    InvalidImmediateSize { size: u32, max: u32 },
    #[error("Too many dynamic buffers across the layout: {count} > {limit}")]
    TooManyDynamicBuffers { count: usize, limit: u32 },
}

#[derive(Debug)]
pub struct PipelineLayout {
    pub(crate) info: ResourceInfo,
    pub(crate) device: Arc<Device>,
    pub(crate) bind_group_layouts: Vec<Arc<BindGroupLayout>>,
}

impl_resource_type!(PipelineLayout, PipelineLayout, "PipelineLayout");
impl_parent_device!(PipelineLayout);

impl PipelineLayout {
    pub(crate) fn create(
        hub: &Hub,
        device: &Arc<Device>,
        desc: &PipelineLayoutDescriptor,
    ) -> Result<Self, CreatePipelineLayoutError> {
        let max = (device.limits.max_bind_groups as usize).min(MAX_BIND_GROUPS);

        if desc.bind_group_layouts.len() > max {
            return Err(CreatePipelineLayoutError::TooManyGroups {
                actual: desc.bind_group_layouts.len(),
                max,
            });
        }

        if desc.immediate_size % 4 != 0 || desc.immediate_size > device.limits.max_immediate_size {
            return Err(CreatePipelineLayoutError::InvalidImmediateSize {
                size: desc.immediate_size,
                max: device.limits.max_immediate_size,
            });
        }

        let bind_group_layouts = desc
            .bind_group_layouts
            .iter()
            .map(|&id| match id {
                Some(id) => resolve(&hub.bind_group_layouts, id, device),
                None => Ok(Arc::new(BindGroupLayout::empty(device))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let count = bind_group_layouts
            .iter()
            .map(|layout| layout.dynamic_count)
            .sum::<usize>();
        let limit = device.limits.max_dynamic_uniform_buffers_per_pipeline_layout
            + device.limits.max_dynamic_storage_buffers_per_pipeline_layout;

        if count > limit as usize {
            return Err(CreatePipelineLayoutError::TooManyDynamicBuffers { count, limit });
        }

        Ok(Self {
            info: ResourceInfo::new(desc.label.borrow_option(), false),
            device: device.clone(),
            bind_group_layouts,
        })
    }

    pub(crate) fn error(device: &Arc<Device>, label: Option<&str>) -> Self {
        Self {
            info: ResourceInfo::new(label, true),
            device: device.clone(),
            bind_group_layouts: Vec::new(),
        }
    }
}

/// Describes a [`ResourceTable`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceTableDescriptor<'a> {
    pub label: Label<'a>,
    pub size: u32,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CreateResourceTableError {
    #[error("Resource table size {0} exceeds the maximum of {RESOURCE_TABLE_MAX_SIZE}")]
    TooLarge(u32),
    #[error(transparent)]
    MissingFeature(#[from] MissingFeature),
}

/// Error returned by the resource table entry points.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResourceTableError {
    #[error(transparent)]
    Invalid(#[from] InvalidId),
    #[error("Resource table is an error object")]
    ErrorTable,
    #[error("Resource table is destroyed")]
    Destroyed,
    #[error("Slot {slot} is out of range of a table of size {size}")]
    SlotOutOfRange { slot: u32, size: u32 },
    #[error("Resource table is full")]
    Full,
    #[error(transparent)]
    Object(#[from] ObjectError),
}

#[derive(Debug)]
pub struct ResourceTable {
    pub(crate) info: ResourceInfo,
    pub(crate) device: Arc<Device>,
    pub(crate) size: u32,
    /// `None` once destroyed.
    slots: Mutex<Option<Vec<Option<BoundResource>>>>,
}

impl Resource for ResourceTable {
    type Marker = id::markers::ResourceTable;
    const TYPE: &'static str = "ResourceTable";

    fn info(&self) -> &ResourceInfo {
        &self.info
    }

    fn on_release(&self, _hub: &Hub) {
        self.destroy();
    }
}

impl_parent_device!(ResourceTable);

impl ResourceTable {
    pub(crate) fn validate_descriptor(
        device: &Device,
        desc: &ResourceTableDescriptor,
    ) -> Result<(), CreateResourceTableError> {
        device.require_feature(FeatureName::ResourceTables)?;

        if desc.size > RESOURCE_TABLE_MAX_SIZE {
            return Err(CreateResourceTableError::TooLarge(desc.size));
        }

        Ok(())
    }

    pub(crate) fn new(device: &Arc<Device>, desc: &ResourceTableDescriptor, error: bool) -> Self {
        let slots = (!error).then(|| vec![None; desc.size as usize]);

        Self {
            info: ResourceInfo::new(desc.label.borrow_option(), error),
            device: device.clone(),
            size: desc.size,
            slots: Mutex::new(slots),
        }
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.slots.lock().is_none()
    }

    fn destroy(&self) {
        *self.slots.lock() = None;
    }

    fn with_slots<T>(
        &self,
        f: impl FnOnce(&mut Vec<Option<BoundResource>>) -> Result<T, ResourceTableError>,
    ) -> Result<T, ResourceTableError> {
        if self.is_error() {
            return Err(ResourceTableError::ErrorTable);
        }

        match &mut *self.slots.lock() {
            Some(slots) => f(slots),
            None => Err(ResourceTableError::Destroyed),
        }
    }

    fn slot<'a>(
        slots: &'a mut [Option<BoundResource>],
        slot: u32,
    ) -> Result<&'a mut Option<BoundResource>, ResourceTableError> {
        let size = slots.len() as u32;
        slots
            .get_mut(slot as usize)
            .ok_or(ResourceTableError::SlotOutOfRange { slot, size })
    }
}

impl Global {
    pub fn resource_table_destroy(&self, resource_table_id: id::ResourceTableId) -> Result<(), InvalidId> {
        api_log!("ResourceTable::destroy {resource_table_id:?}");
        self.hub.resource_tables.get(resource_table_id)?.destroy();
        Ok(())
    }

    pub fn resource_table_get_size(&self, resource_table_id: id::ResourceTableId) -> Result<u32, InvalidId> {
        Ok(self.hub.resource_tables.get(resource_table_id)?.size)
    }

    /// Bind `resource` to the first free slot, returning the slot.
    pub fn resource_table_insert_binding(
        &self,
        resource_table_id: id::ResourceTableId,
        resource: &BindingResource,
    ) -> Result<u32, ResourceTableError> {
        api_log!("ResourceTable::insert_binding {resource_table_id:?} {resource:?}");

        let table = self.hub.resource_tables.get(resource_table_id)?;
        let bound = BoundResource::resolve(&self.hub, &table.device, resource)?;

        table.with_slots(|slots| {
            let slot = slots
                .iter()
                .position(Option::is_none)
                .ok_or(ResourceTableError::Full)?;
            slots[slot] = Some(bound);
            Ok(slot as u32)
        })
    }

    /// Clear `slot`. Clearing an empty slot is allowed.
    pub fn resource_table_remove_binding(
        &self,
        resource_table_id: id::ResourceTableId,
        slot: u32,
    ) -> Result<(), ResourceTableError> {
        api_log!("ResourceTable::remove_binding {resource_table_id:?} {slot}");

        let table = self.hub.resource_tables.get(resource_table_id)?;
        table.with_slots(|slots| {
            *ResourceTable::slot(slots, slot)? = None;
            Ok(())
        })
    }

    /// Bind `resource` to `slot`, replacing what was there.
    pub fn resource_table_update(
        &self,
        resource_table_id: id::ResourceTableId,
        slot: u32,
        resource: &BindingResource,
    ) -> Result<(), ResourceTableError> {
        api_log!("ResourceTable::update {resource_table_id:?} {slot} {resource:?}");

        let table = self.hub.resource_tables.get(resource_table_id)?;
        let bound = BoundResource::resolve(&self.hub, &table.device, resource)?;

        table.with_slots(|slots| {
            *ResourceTable::slot(slots, slot)? = Some(bound);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_bounded_by_the_table() {
        let mut slots: Vec<Option<BoundResource>> = vec![None; 3];

        assert!(ResourceTable::slot(&mut slots, 2).is_ok());
        assert_eq!(
            ResourceTable::slot(&mut slots, 3).err(),
            Some(ResourceTableError::SlotOutOfRange { slot: 3, size: 3 })
        );
        assert_eq!(
            ResourceTable::slot(&mut [], u32::MAX).err(),
            Some(ResourceTableError::SlotOutOfRange {
                slot: u32::MAX,
                size: 0
            })
        );
    }
}

use std::{borrow::Cow, sync::Arc};

use arrayvec::ArrayVec;
use pt::{
    BufferAddress, ColorWrites, CompareFunction, CompilationInfo, CompilationInfoRequestStatus,
    CompilationMessage, CompilationMessageType, FeatureName, IndexFormat, InstanceFeatureName,
    Limits, LoggingType, PrimitiveTopology, ShaderStages, TextureFormat, VertexFormat, VertexStepMode,
};
use thiserror::Error;

use crate::{
    api_log,
    binding_model::{BindGroupLayout, PipelineLayout},
    device::{Device, RenderPassContext, MAX_BIND_GROUPS, MAX_COLOR_ATTACHMENTS},
    error::{MissingFeature, ObjectError},
    event::{CallbackInfo, EventOutcome, FutureId},
    global::Global,
    hub::Hub,
    id,
    resource::{impl_parent_device, impl_resource_type, resolve, Resource, ResourceInfo},
    storage::InvalidId,
    Label, LabelHelpers,
};

/// First word of every SPIR-V module.
const SPIRV_MAGIC_NUMBER: u32 = 0x0723_0203;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShaderSource<'a> {
    Wgsl(Cow<'a, str>),
    SpirV(Cow<'a, [u32]>),
}

/// Describes a [`ShaderModule`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderModuleDescriptor<'a> {
    pub label: Label<'a>,
    pub source: ShaderSource<'a>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CreateShaderModuleError {
    #[error("SPIR-V shader sources require the {0:?} instance feature")]
    MissingInstanceFeature(InstanceFeatureName),
    #[error("SPIR-V module starts with {0:#010x} instead of the SPIR-V magic number")]
    InvalidSpirvMagic(u32),
    #[error("SPIR-V module is empty")]
    EmptySpirv,
    #[error("{0}")]
    Injected(String),
}

/// An entry point found in a shader module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ShaderEntryPoint {
    pub(crate) stage: ShaderStages,
    pub(crate) name: String,
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn ident_len(source: &str) -> usize {
    source.find(|c: char| !is_ident(c)).unwrap_or(source.len())
}

/// Find the `fn` keyword in `source`, returning the text after it.
fn after_fn_keyword(source: &str) -> Option<&str> {
    source.match_indices("fn").find_map(|(index, _)| {
        let before = source[..index].chars().next_back();
        let after = &source[index + 2..];

        let starts_word = before.map_or(true, |c| !is_ident(c));
        let ends_word = after.chars().next().map_or(false, char::is_whitespace);

        (starts_word && ends_word).then_some(after)
    })
}

/// Find the entry points declared in WGSL source by their stage attribute.
///
/// This is a token scan, not a parser. Entry points inside comments are
/// found too.
pub(crate) fn scan_entry_points(source: &str) -> Vec<ShaderEntryPoint> {
    let mut entry_points = Vec::new();
    let mut rest = source;

    while let Some(at) = rest.find('@') {
        rest = &rest[at + 1..];
        let len = ident_len(rest);

        let stage = match &rest[..len] {
            "compute" => ShaderStages::COMPUTE,
            "vertex" => ShaderStages::VERTEX,
            "fragment" => ShaderStages::FRAGMENT,
            _ => continue,
        };

        let Some(after) = after_fn_keyword(&rest[len..]) else {
            break;
        };

        let after = after.trim_start();
        let len = ident_len(after);

        if len > 0 {
            entry_points.push(ShaderEntryPoint {
                stage,
                name: after[..len].to_owned(),
            });
        }

        rest = &after[len..];
    }

    entry_points
}

fn message(message_type: CompilationMessageType, message: String) -> CompilationMessage {
    CompilationMessage {
        message,
        message_type,
        line_num: 0,
        line_pos: 0,
        offset: 0,
        length: 0,
    }
}

#[derive(Debug)]
pub struct ShaderModule {
    pub(crate) info: ResourceInfo,
    pub(crate) device: Arc<Device>,
    /// Entry points of the module, or `None` when they can't be known, as
    /// for SPIR-V.
    pub(crate) entry_points: Option<Vec<ShaderEntryPoint>>,
    pub(crate) compilation_info: CompilationInfo,
}

impl_resource_type!(ShaderModule, ShaderModule, "ShaderModule");
impl_parent_device!(ShaderModule);

impl ShaderModule {
    pub(crate) fn create(
        device: &Arc<Device>,
        desc: &ShaderModuleDescriptor,
    ) -> Result<Self, CreateShaderModuleError> {
        let mut compilation_info = CompilationInfo::default();

        let entry_points = match &desc.source {
            ShaderSource::Wgsl(source) => {
                if source.trim().is_empty() {
                    let text = String::from("Shader source is empty");
                    device.log(LoggingType::Warning, &text);
                    compilation_info
                        .messages
                        .push(message(CompilationMessageType::Warning, text));
                }

                Some(scan_entry_points(source))
            }
            ShaderSource::SpirV(words) => {
                let feature = InstanceFeatureName::ShaderSourceSpirv;

                if !device.adapter.instance.has_feature(feature) {
                    return Err(CreateShaderModuleError::MissingInstanceFeature(feature));
                }

                match words.first() {
                    None => return Err(CreateShaderModuleError::EmptySpirv),
                    Some(&word) if word != SPIRV_MAGIC_NUMBER => {
                        return Err(CreateShaderModuleError::InvalidSpirvMagic(word))
                    }
                    Some(_) => None,
                }
            }
        };

        Ok(Self {
            info: ResourceInfo::new(desc.label.borrow_option(), false),
            device: device.clone(),
            entry_points,
            compilation_info,
        })
    }

    /// An error module, whose compilation info reports `error`.
    pub(crate) fn error(device: &Arc<Device>, label: Option<&str>, error: &str) -> Self {
        Self {
            info: ResourceInfo::new(label, true),
            device: device.clone(),
            entry_points: Some(Vec::new()),
            compilation_info: CompilationInfo {
                messages: vec![message(CompilationMessageType::Error, error.to_owned())],
            },
        }
    }

    fn find_entry_point(&self, stage: ShaderStages, name: Option<&str>) -> Result<(), StageError> {
        let Some(entry_points) = &self.entry_points else {
            return match name {
                Some(_) => Ok(()),
                None => Err(StageError::NoEntryPoint),
            };
        };

        let mut candidates = entry_points.iter().filter(|entry| entry.stage == stage);

        match name {
            Some(name) => candidates
                .find(|entry| entry.name == name)
                .map(|_| ())
                .ok_or_else(|| StageError::MissingEntryPoint(name.to_owned())),
            None => match (candidates.next(), candidates.next()) {
                (Some(_), None) => Ok(()),
                (None, _) => Err(StageError::NoEntryPoint),
                (Some(_), Some(_)) => Err(StageError::AmbiguousEntryPoint),
            },
        }
    }
}

/// A shader stage of a pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgrammableStage<'a> {
    pub module: id::ShaderModuleId,
    /// The entry point to use, or the only entry point of the stage when
    /// `None`.
    pub entry_point: Option<Cow<'a, str>>,
    /// Pipeline-overridable constants.
    pub constants: Vec<(String, f64)>,
}

impl<'a> ProgrammableStage<'a> {
    pub fn new(module: id::ShaderModuleId) -> Self {
        Self {
            module,
            entry_point: None,
            constants: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum StageError {
    #[error(transparent)]
    Object(#[from] ObjectError),
    #[error("Entry point {0:?} doesn't exist in the module")]
    MissingEntryPoint(String),
    #[error("The module has no entry point for the stage")]
    NoEntryPoint,
    #[error("The module has several entry points for the stage, one must be named")]
    AmbiguousEntryPoint,
    #[error("Constant {0:?} is not a finite number")]
    InvalidConstant(String),
}

fn validate_stage(
    hub: &Hub,
    device: &Arc<Device>,
    stage: ShaderStages,
    desc: &ProgrammableStage,
) -> Result<(), CreatePipelineError> {
    let map_err = |error| CreatePipelineError::Stage { stage, error };

    let module = resolve(&hub.shader_modules, desc.module, device)
        .map_err(|err| map_err(StageError::Object(err)))?;

    module
        .find_entry_point(stage, desc.entry_point.as_deref())
        .map_err(map_err)?;

    if let Some((name, _)) = desc.constants.iter().find(|(_, value)| !value.is_finite()) {
        return Err(map_err(StageError::InvalidConstant(name.clone())));
    }

    Ok(())
}

/// Describes a [`ComputePipeline`].
#[derive(Clone, Debug, PartialEq)]
pub struct ComputePipelineDescriptor<'a> {
    pub label: Label<'a>,
    /// The layout, or `None` for a layout derived from the shader.
    pub layout: Option<id::PipelineLayoutId>,
    pub compute: ProgrammableStage<'a>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    pub format: VertexFormat,
    pub offset: BufferAddress,
    pub shader_location: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexBufferLayout {
    pub array_stride: BufferAddress,
    pub step_mode: VertexStepMode,
    pub attributes: Vec<VertexAttribute>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VertexState<'a> {
    pub stage: ProgrammableStage<'a>,
    pub buffers: Vec<VertexBufferLayout>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrimitiveState {
    pub topology: PrimitiveTopology,
    /// Index format of strip topologies, needed to detect primitive restart.
    pub strip_index_format: Option<IndexFormat>,
    /// Disable depth clipping. Requires [`FeatureName::DepthClipControl`].
    pub unclipped_depth: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthStencilState {
    pub format: TextureFormat,
    pub depth_write_enabled: bool,
    pub depth_compare: Option<CompareFunction>,
    pub stencil_read_mask: u32,
    pub stencil_write_mask: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MultisampleState {
    pub count: u32,
    pub mask: u32,
    pub alpha_to_coverage_enabled: bool,
}

impl Default for MultisampleState {
    fn default() -> Self {
        Self {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorTargetState {
    pub format: TextureFormat,
    pub write_mask: ColorWrites,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FragmentState<'a> {
    pub stage: ProgrammableStage<'a>,
    pub targets: Vec<Option<ColorTargetState>>,
}

/// Describes a [`RenderPipeline`].
#[derive(Clone, Debug, PartialEq)]
pub struct RenderPipelineDescriptor<'a> {
    pub label: Label<'a>,
    /// The layout, or `None` for a layout derived from the shaders.
    pub layout: Option<id::PipelineLayoutId>,
    pub vertex: VertexState<'a>,
    pub primitive: PrimitiveState,
    pub depth_stencil: Option<DepthStencilState>,
    pub multisample: MultisampleState,
    pub fragment: Option<FragmentState<'a>>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CreatePipelineError {
    #[error(transparent)]
    Object(#[from] ObjectError),
    #[error("Error in stage {stage:?}")]
    Stage {
        stage: ShaderStages,
        #[source]
        error: StageError,
    },
    #[error(transparent)]
    MissingFeature(#[from] MissingFeature),
    #[error("The number of vertex buffers {given} exceeds the limit {limit}")]
    TooManyVertexBuffers { given: usize, limit: u32 },
    #[error("Vertex buffer {index} stride {given} exceeds the limit {limit}")]
    VertexStrideTooLarge { index: usize, given: u64, limit: u32 },
    #[error("Vertex buffer {index} stride {stride} is not a multiple of 4")]
    UnalignedVertexStride { index: usize, stride: u64 },
    #[error("The total number of vertex attributes {given} exceeds the limit {limit}")]
    TooManyVertexAttributes { given: usize, limit: u32 },
    #[error("Vertex attribute at location {location} has an invalid offset {offset}")]
    InvalidVertexAttributeOffset { location: u32, offset: u64 },
    #[error("Shader location {location} exceeds the limit {limit}")]
    InvalidShaderLocation { location: u32, limit: u32 },
    #[error("Shader location {0} is used by several vertex attributes")]
    ShaderLocationClash(u32),
    #[error("Strip index format {format:?} can't be used with topology {topology:?}")]
    StripIndexFormatForNonStripTopology {
        format: IndexFormat,
        topology: PrimitiveTopology,
    },
    #[error("Format {0:?} is not a depth or stencil format")]
    InvalidDepthStencilFormat(TextureFormat),
    #[error("Depth writes or comparisons need a format with a depth aspect")]
    MissingDepthAspect,
    #[error("Sample count {0} is not supported")]
    InvalidSampleCount(u32),
    #[error("Alpha to coverage needs a sample count greater than one")]
    AlphaToCoverageWithoutMultisampling,
    #[error("The number of color targets {given} exceeds the limit {limit}")]
    TooManyColorTargets { given: usize, limit: u32 },
    #[error("Color target {index} has format {format:?}, which is not color renderable")]
    InvalidColorTargetFormat { index: usize, format: TextureFormat },
    #[error("A render pipeline needs a color target or a depth-stencil state")]
    NoTargets,
}

/// Resolve the bind group layouts of a pipeline, padded to the device's
/// bind group limit with empty layouts.
fn pipeline_bind_group_layouts(
    hub: &Hub,
    device: &Arc<Device>,
    layout: Option<id::PipelineLayoutId>,
) -> Result<Vec<Arc<BindGroupLayout>>, ObjectError> {
    let count = (device.limits.max_bind_groups as usize).min(MAX_BIND_GROUPS);

    let mut layouts = match layout {
        Some(id) => {
            let layout: Arc<PipelineLayout> = resolve(&hub.pipeline_layouts, id, device)?;
            layout.bind_group_layouts.clone()
        }
        None => Vec::with_capacity(count),
    };

    while layouts.len() < count {
        layouts.push(Arc::new(BindGroupLayout::empty(device)));
    }

    Ok(layouts)
}

#[derive(Debug)]
pub struct ComputePipeline {
    pub(crate) info: ResourceInfo,
    pub(crate) device: Arc<Device>,
    pub(crate) bind_group_layouts: Vec<Arc<BindGroupLayout>>,
}

impl_resource_type!(ComputePipeline, ComputePipeline, "ComputePipeline");
impl_parent_device!(ComputePipeline);

impl ComputePipeline {
    pub(crate) fn create(
        hub: &Hub,
        device: &Arc<Device>,
        desc: &ComputePipelineDescriptor,
    ) -> Result<Self, CreatePipelineError> {
        let bind_group_layouts = pipeline_bind_group_layouts(hub, device, desc.layout)?;
        validate_stage(hub, device, ShaderStages::COMPUTE, &desc.compute)?;

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

#[derive(Debug)]
pub struct RenderPipeline {
    pub(crate) info: ResourceInfo,
    pub(crate) device: Arc<Device>,
    pub(crate) bind_group_layouts: Vec<Arc<BindGroupLayout>>,
    pub(crate) context: RenderPassContext,
    pub(crate) strip_index_format: Option<IndexFormat>,
    /// Number of vertex buffer slots the pipeline reads from.
    pub(crate) vertex_buffer_count: usize,
    pub(crate) writes_depth: bool,
    pub(crate) writes_stencil: bool,
}

impl_resource_type!(RenderPipeline, RenderPipeline, "RenderPipeline");
impl_parent_device!(RenderPipeline);

fn validate_vertex_buffers(limits: &Limits, buffers: &[VertexBufferLayout]) -> Result<(), CreatePipelineError> {

    if buffers.len() > limits.max_vertex_buffers as usize {
        return Err(CreatePipelineError::TooManyVertexBuffers {
            given: buffers.len(),
            limit: limits.max_vertex_buffers,
        });
    }

    let total_attributes = buffers.iter().map(|buffer| buffer.attributes.len()).sum::<usize>();

    if total_attributes > limits.max_vertex_attributes as usize {
        return Err(CreatePipelineError::TooManyVertexAttributes {
            given: total_attributes,
            limit: limits.max_vertex_attributes,
        });
    }

    let mut locations = Vec::with_capacity(total_attributes);

    for (index, buffer) in buffers.iter().enumerate() {
        if buffer.array_stride > limits.max_vertex_buffer_array_stride as u64 {
            return Err(CreatePipelineError::VertexStrideTooLarge {
                index,
                given: buffer.array_stride,
                limit: limits.max_vertex_buffer_array_stride,
            });
        }

        if buffer.array_stride % 4 != 0 {
            return Err(CreatePipelineError::UnalignedVertexStride {
                index,
                stride: buffer.array_stride,
            });
        }

        for attribute in &buffer.attributes {
            let size = attribute.format.size();
            let end = attribute.offset.checked_add(size);
            let bound = if buffer.array_stride == 0 {
                limits.max_vertex_buffer_array_stride as u64
            } else {
                buffer.array_stride
            };

            if attribute.offset % size.min(4) != 0 || end.map_or(true, |end| end > bound) {
                return Err(CreatePipelineError::InvalidVertexAttributeOffset {
                    location: attribute.shader_location,
                    offset: attribute.offset,
                });
            }

            if attribute.shader_location >= limits.max_vertex_attributes {
                return Err(CreatePipelineError::InvalidShaderLocation {
                    location: attribute.shader_location,
                    limit: limits.max_vertex_attributes,
                });
            }

            if locations.contains(&attribute.shader_location) {
                return Err(CreatePipelineError::ShaderLocationClash(attribute.shader_location));
            }

            locations.push(attribute.shader_location);
        }
    }

    Ok(())
}

impl RenderPipeline {
    pub(crate) fn create(
        hub: &Hub,
        device: &Arc<Device>,
        desc: &RenderPipelineDescriptor,
    ) -> Result<Self, CreatePipelineError> {
        let bind_group_layouts = pipeline_bind_group_layouts(hub, device, desc.layout)?;

        validate_stage(hub, device, ShaderStages::VERTEX, &desc.vertex.stage)?;
        validate_vertex_buffers(&device.limits, &desc.vertex.buffers)?;

        let primitive = &desc.primitive;

        if let Some(format) = primitive.strip_index_format {
            if !primitive.topology.is_strip() {
                return Err(CreatePipelineError::StripIndexFormatForNonStripTopology {
                    format,
                    topology: primitive.topology,
                });
            }
        }

        if primitive.unclipped_depth {
            device.require_feature(FeatureName::DepthClipControl)?;
        }

        let mut writes_depth = false;
        let mut writes_stencil = false;

        if let Some(ds) = &desc.depth_stencil {
            if !ds.format.is_depth_stencil() {
                return Err(CreatePipelineError::InvalidDepthStencilFormat(ds.format));
            }

            if let Some(feature) = ds.format.required_feature() {
                device.require_feature(feature)?;
            }

            let needs_depth = ds.depth_write_enabled
                || ds
                    .depth_compare
                    .map_or(false, |compare| compare != CompareFunction::Always);

            if needs_depth && !ds.format.has_depth_aspect() {
                return Err(CreatePipelineError::MissingDepthAspect);
            }

            writes_depth = ds.depth_write_enabled;
            writes_stencil = ds.format.has_stencil_aspect() && ds.stencil_write_mask != 0;
        }

        let multisample = &desc.multisample;

        if !matches!(multisample.count, 1 | 4) {
            return Err(CreatePipelineError::InvalidSampleCount(multisample.count));
        }

        if multisample.alpha_to_coverage_enabled && multisample.count == 1 {
            return Err(CreatePipelineError::AlphaToCoverageWithoutMultisampling);
        }

        let mut colors = ArrayVec::<Option<TextureFormat>, MAX_COLOR_ATTACHMENTS>::new();

        if let Some(fragment) = &desc.fragment {
            validate_stage(hub, device, ShaderStages::FRAGMENT, &fragment.stage)?;

            let limit = (device.limits.max_color_attachments as usize).min(MAX_COLOR_ATTACHMENTS);

            if fragment.targets.len() > limit {
                return Err(CreatePipelineError::TooManyColorTargets {
                    given: fragment.targets.len(),
                    limit: limit as u32,
                });
            }

            for (index, target) in fragment.targets.iter().enumerate() {
                if let Some(target) = target {
                    if !target.format.is_renderable() || target.format.is_depth_stencil() {
                        return Err(CreatePipelineError::InvalidColorTargetFormat {
                            index,
                            format: target.format,
                        });
                    }

                    if let Some(feature) = target.format.required_feature() {
                        device.require_feature(feature)?;
                    }
                }

                colors.push(target.map(|target| target.format));
            }
        }

        if colors.iter().all(Option::is_none) && desc.depth_stencil.is_none() {
            return Err(CreatePipelineError::NoTargets);
        }

        Ok(Self {
            info: ResourceInfo::new(desc.label.borrow_option(), false),
            device: device.clone(),
            bind_group_layouts,
            context: RenderPassContext {
                colors,
                depth_stencil: desc.depth_stencil.map(|ds| ds.format),
                sample_count: multisample.count,
            },
            strip_index_format: primitive.strip_index_format,
            vertex_buffer_count: desc.vertex.buffers.len(),
            writes_depth,
            writes_stencil,
        })
    }

    pub(crate) fn error(device: &Arc<Device>, label: Option<&str>) -> Self {
        Self {
            info: ResourceInfo::new(label, true),
            device: device.clone(),
            bind_group_layouts: Vec::new(),
            context: RenderPassContext::default(),
            strip_index_format: None,
            vertex_buffer_count: 0,
            writes_depth: false,
            writes_stencil: false,
        }
    }
}

pub type CompilationInfoCallback = Box<dyn FnOnce(CompilationInfoRequestStatus, &CompilationInfo) + Send>;
pub type CompilationInfoCallbackInfo = CallbackInfo<CompilationInfoCallback>;

pub type CreateComputePipelineAsyncCallback =
    Box<dyn FnOnce(pt::CreatePipelineAsyncStatus, Option<id::ComputePipelineId>, &str) + Send>;
pub type CreateComputePipelineAsyncCallbackInfo = CallbackInfo<CreateComputePipelineAsyncCallback>;

pub type CreateRenderPipelineAsyncCallback =
    Box<dyn FnOnce(pt::CreatePipelineAsyncStatus, Option<id::RenderPipelineId>, &str) + Send>;
pub type CreateRenderPipelineAsyncCallbackInfo = CallbackInfo<CreateRenderPipelineAsyncCallback>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GetBindGroupLayoutError {
    #[error("Pipeline is an error object")]
    InvalidPipeline,
    #[error("Bind group layout index {index} is out of range of the {count} groups of the pipeline")]
    InvalidGroupIndex { index: u32, count: u32 },
}

/// Hand out a reference to bind group layout `index`, or register an error
/// layout.
fn get_bind_group_layout(
    hub: &Hub,
    device: &Arc<Device>,
    is_error: bool,
    layouts: &[Arc<BindGroupLayout>],
    index: u32,
) -> id::BindGroupLayoutId {
    let result = if is_error {
        Err(GetBindGroupLayoutError::InvalidPipeline)
    } else {
        layouts
            .get(index as usize)
            .ok_or(GetBindGroupLayoutError::InvalidGroupIndex {
                index,
                count: layouts.len() as u32,
            })
    };

    match result {
        Ok(layout) => hub.bind_group_layouts.acquire(layout),
        Err(err) => {
            device.validation_error(err);
            let (id, _) = hub
                .bind_group_layouts
                .register(BindGroupLayout::error(device, None));
            id
        }
    }
}

impl Global {
    pub fn compute_pipeline_get_bind_group_layout(
        &self,
        pipeline_id: id::ComputePipelineId,
        index: u32,
    ) -> Result<id::BindGroupLayoutId, InvalidId> {
        api_log!("ComputePipeline::get_bind_group_layout {pipeline_id:?} {index}");

        let pipeline = self.hub.compute_pipelines.get(pipeline_id)?;
        Ok(get_bind_group_layout(
            &self.hub,
            &pipeline.device,
            pipeline.is_error(),
            &pipeline.bind_group_layouts,
            index,
        ))
    }

    pub fn render_pipeline_get_bind_group_layout(
        &self,
        pipeline_id: id::RenderPipelineId,
        index: u32,
    ) -> Result<id::BindGroupLayoutId, InvalidId> {
        api_log!("RenderPipeline::get_bind_group_layout {pipeline_id:?} {index}");

        let pipeline = self.hub.render_pipelines.get(pipeline_id)?;
        Ok(get_bind_group_layout(
            &self.hub,
            &pipeline.device,
            pipeline.is_error(),
            &pipeline.bind_group_layouts,
            index,
        ))
    }

    pub fn shader_module_get_compilation_info(
        &self,
        shader_module_id: id::ShaderModuleId,
        callback_info: CompilationInfoCallbackInfo,
    ) -> Result<FutureId, InvalidId> {
        api_log!("ShaderModule::get_compilation_info {shader_module_id:?}");

        let module = self.hub.shader_modules.get(shader_module_id)?;
        let info = module.compilation_info.clone();
        let CallbackInfo { mode, callback } = callback_info;

        Ok(module.device.events().track(mode, true, move |outcome| match outcome {
            EventOutcome::Ready => callback(CompilationInfoRequestStatus::Success, &info),
            EventOutcome::Cancelled => callback(
                CompilationInfoRequestStatus::CallbackCancelled,
                &CompilationInfo::default(),
            ),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_points_by_stage() {
        let source = r#"
            @group(0) @binding(0) var<storage, read_write> data: array<u32>;

            @compute @workgroup_size(64)
            fn main(@builtin(global_invocation_id) id: vec3<u32>) {
                data[id.x] = 0u;
            }

            @vertex fn vs_main() -> @builtin(position) vec4<f32> {
                return vec4<f32>(0.0);
            }

            @fragment
            fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }

            fn helper() {}
        "#;

        let entry_points = scan_entry_points(source);
        let names = entry_points
            .iter()
            .map(|entry| (entry.stage, entry.name.as_str()))
            .collect::<Vec<_>>();

        assert_eq!(
            names,
            [
                (ShaderStages::COMPUTE, "main"),
                (ShaderStages::VERTEX, "vs_main"),
                (ShaderStages::FRAGMENT, "fs_main"),
            ]
        );
    }

    #[test]
    fn vertex_attribute_offsets_are_bounded() {
        let limits = Limits::default();

        let layout = |array_stride, offset| VertexBufferLayout {
            array_stride,
            step_mode: VertexStepMode::Vertex,
            attributes: vec![VertexAttribute {
                format: VertexFormat::Float32x4,
                offset,
                shader_location: 0,
            }],
        };

        assert_eq!(validate_vertex_buffers(&limits, &[layout(16, 0)]), Ok(()));
        assert_eq!(validate_vertex_buffers(&limits, &[layout(0, 2032)]), Ok(()));

        for (stride, offset) in [(16, 4), (0, 2036), (0, u64::MAX - 3), (16, u64::MAX - 15)] {
            assert_eq!(
                validate_vertex_buffers(&limits, &[layout(stride, offset)]),
                Err(CreatePipelineError::InvalidVertexAttributeOffset { location: 0, offset }),
                "stride {stride} offset {offset}"
            );
        }
    }

    #[test]
    fn fn_keyword_needs_word_boundaries() {
        assert_eq!(after_fn_keyword("define fn x"), Some(" x"));
        assert_eq!(after_fn_keyword("fnord"), None);
        assert!(scan_entry_points("@compute fnx()").is_empty());
    }
}

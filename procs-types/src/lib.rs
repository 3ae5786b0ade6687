//! This library describes the plain data types shared by every layer of the
//! procedure table: enums, flags, limits, feature names and the statuses
//! reported to callbacks.

#![allow(
    // We don't use syntax sugar where it's not necessary.
    clippy::match_like_matches_macro,
)]
#![warn(missing_docs, unsafe_op_in_unsafe_fn)]

use std::{fmt, str::FromStr};

mod features;
mod limits;

pub use features::*;
pub use limits::*;

/// Integral type used for buffer offsets.
pub type BufferAddress = u64;

/// Sentinel for "the rest of the buffer" in size arguments.
pub const WHOLE_SIZE: u64 = u64::MAX;

/// Sentinel for "the rest of the mapping" in mapped range sizes.
pub const WHOLE_MAP_SIZE: usize = usize::MAX;

/// Required alignment of a buffer mapping offset.
pub const MAP_ALIGNMENT: BufferAddress = 8;

/// Required alignment of buffer copy offsets and sizes.
pub const COPY_BUFFER_ALIGNMENT: BufferAddress = 4;

/// Required alignment of a texel buffer view offset.
pub const TEXEL_BUFFER_OFFSET_ALIGNMENT: BufferAddress = 256;

/// Maximum number of queries in a query set.
pub const QUERY_SET_MAX_QUERIES: u32 = 4096;

/// Maximum number of slots in a resource table.
pub const RESOURCE_TABLE_MAX_SIZE: u32 = 1 << 16;

/// Backends that can populate a procedure table.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Backend {
    /// Dummy backend, which exposes no adapters.
    Empty = 0,
    /// Host-memory backend with a single CPU adapter.
    Null = 1,
}

impl Backend {
    /// Environment variable consulted by [`Backend::from_env`].
    pub const ENV: &'static str = "PROCS_BACKEND";

    /// Returns the string name of the backend.
    pub const fn to_str(self) -> &'static str {
        match self {
            Backend::Empty => "empty",
            Backend::Null => "null",
        }
    }

    /// Read the backend to use from the `PROCS_BACKEND` environment variable.
    ///
    /// Returns `None` if the variable is unset or names an unknown backend.
    pub fn from_env() -> Option<Self> {
        std::env::var(Self::ENV).ok()?.parse().ok()
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

/// Error returned when parsing a [`Backend`] from an unknown name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownBackend(pub String);

impl fmt::Display for UnknownBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown backend `{}`", self.0)
    }
}

impl std::error::Error for UnknownBackend {}

impl FromStr for Backend {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "empty" => Ok(Backend::Empty),
            "null" | "noop" => Ok(Backend::Null),
            _ => Err(UnknownBackend(s.to_owned())),
        }
    }
}

/// The graphics API an adapter is implemented on top of.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum BackendType {
    #[default]
    Undefined,
    Null,
    WebGpu,
    D3D11,
    D3D12,
    Metal,
    Vulkan,
    OpenGl,
    OpenGles,
}

/// Supported physical device types.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AdapterType {
    /// Other or unknown.
    #[default]
    Unknown,
    /// Discrete GPU, separate from the CPU.
    DiscreteGpu,
    /// Integrated GPU, sharing memory with the CPU.
    IntegratedGpu,
    /// Software rendering on the CPU.
    Cpu,
}

/// Power preference when choosing an adapter.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum PowerPreference {
    #[default]
    Undefined,
    LowPower,
    HighPerformance,
}

/// The feature level requested from an adapter.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum FeatureLevel {
    Undefined,
    Compatibility,
    #[default]
    Core,
}

/// How a callback attached to a future is allowed to be delivered.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CallbackMode {
    /// Only delivered from `instance_wait_any` naming the future.
    WaitAnyOnly,
    /// Delivered from `instance_wait_any` or `instance_process_events`.
    #[default]
    AllowProcessEvents,
    /// Delivered as soon as the work completes, on whichever thread completes it.
    AllowSpontaneous,
}

/// Outcome of `instance_wait_any`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WaitStatus {
    /// At least one of the futures completed.
    Success,
    /// None of the futures completed before the timeout.
    TimedOut,
    /// The wait could not be performed.
    Error,
}

macro_rules! statuses {
    ($(
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident),* $(,)? }
    )*) => {
        $(
            $(#[$meta])*
            #[repr(C)]
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
            #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
            #[allow(missing_docs)]
            pub enum $name { $($variant),* }
        )*
    }
}

statuses! {
    /// Status passed to a buffer map callback.
    pub enum MapAsyncStatus { Success, CallbackCancelled, Error, Aborted }
    /// Status passed to a request adapter callback.
    pub enum RequestAdapterStatus { Success, CallbackCancelled, Unavailable, Error }
    /// Status passed to a request device callback.
    pub enum RequestDeviceStatus { Success, CallbackCancelled, Error }
    /// Status passed to a pop error scope callback.
    pub enum PopErrorScopeStatus { Success, CallbackCancelled, Error }
    /// Status passed to a queue work done callback.
    pub enum QueueWorkDoneStatus { Success, CallbackCancelled, Error }
    /// Status passed to an async pipeline creation callback.
    pub enum CreatePipelineAsyncStatus { Success, CallbackCancelled, ValidationError, InternalError }
    /// Status passed to a compilation info callback.
    pub enum CompilationInfoRequestStatus { Success, CallbackCancelled }
}

/// Reason a device was lost.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceLostReason {
    /// Lost for an unspecified reason, including `device_force_loss`.
    Unknown,
    /// Lost because `device_destroy` was called or the last handle was released.
    Destroyed,
    /// The owning instance went away before the loss was observed.
    CallbackCancelled,
    /// Device creation failed.
    FailedCreation,
}

/// Filter of an error scope.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum ErrorFilter {
    Validation,
    OutOfMemory,
    Internal,
}

/// Type of an error reported through a scope or the uncaptured error callback.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum ErrorType {
    NoError,
    Validation,
    OutOfMemory,
    Internal,
    Unknown,
}

/// Severity of a message passed to a device logging callback.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum LoggingType {
    Verbose,
    Info,
    Warning,
    Error,
}

bitflags::bitflags! {
    /// Different ways that you can use a buffer.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct BufferUsages: u64 {
        /// Allow a buffer to be mapped for reading.
        const MAP_READ = 1 << 0;
        /// Allow a buffer to be mapped for writing.
        const MAP_WRITE = 1 << 1;
        /// Allow a buffer to be the source of a copy.
        const COPY_SRC = 1 << 2;
        /// Allow a buffer to be the destination of a copy.
        const COPY_DST = 1 << 3;
        /// Allow a buffer to be an index buffer.
        const INDEX = 1 << 4;
        /// Allow a buffer to be a vertex buffer.
        const VERTEX = 1 << 5;
        /// Allow a buffer to be a uniform binding.
        const UNIFORM = 1 << 6;
        /// Allow a buffer to be a storage binding.
        const STORAGE = 1 << 7;
        /// Allow a buffer to be the source of indirect draws and dispatches.
        const INDIRECT = 1 << 8;
        /// Allow a buffer to be the destination of a query resolve.
        const QUERY_RESOLVE = 1 << 9;
        /// Allow texel buffer views to be created from the buffer.
        const TEXEL_BUFFER = 1 << 10;
    }
}

bitflags::bitflags! {
    /// Different ways that you can use a texture.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct TextureUsages: u64 {
        /// Allow a texture to be the source of a copy.
        const COPY_SRC = 1 << 0;
        /// Allow a texture to be the destination of a copy.
        const COPY_DST = 1 << 1;
        /// Allow a texture to be sampled.
        const TEXTURE_BINDING = 1 << 2;
        /// Allow a texture to be a storage binding.
        const STORAGE_BINDING = 1 << 3;
        /// Allow a texture to be a render attachment.
        const RENDER_ATTACHMENT = 1 << 4;
        /// Render attachment that never outlives its render pass.
        const TRANSIENT_ATTACHMENT = 1 << 5;
        /// Allow a texture to be a pixel local storage attachment.
        const STORAGE_ATTACHMENT = 1 << 6;
    }
}

bitflags::bitflags! {
    /// Access requested when mapping a buffer.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct MapMode: u64 {
        /// Map for reading.
        const READ = 1 << 0;
        /// Map for writing.
        const WRITE = 1 << 1;
    }
}

bitflags::bitflags! {
    /// Shader stages a binding is visible from.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ShaderStages: u64 {
        /// Vertex stage.
        const VERTEX = 1 << 0;
        /// Fragment stage.
        const FRAGMENT = 1 << 1;
        /// Compute stage.
        const COMPUTE = 1 << 2;
    }
}

bitflags::bitflags! {
    /// Color channels written by a color target.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ColorWrites: u64 {
        /// Red channel.
        const RED = 1 << 0;
        /// Green channel.
        const GREEN = 1 << 1;
        /// Blue channel.
        const BLUE = 1 << 2;
        /// Alpha channel.
        const ALPHA = 1 << 3;
        /// All channels.
        const ALL = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits() | Self::ALPHA.bits();
    }
}

impl Default for ColorWrites {
    fn default() -> Self {
        Self::ALL
    }
}

bitflags::bitflags! {
    /// Properties of a memory heap reported by an adapter.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct HeapProperty: u64 {
        /// Local to the device.
        const DEVICE_LOCAL = 1 << 0;
        /// Visible from the host.
        const HOST_VISIBLE = 1 << 1;
        /// Host writes are coherent without flushes.
        const HOST_COHERENT = 1 << 2;
        /// Host accesses are uncached.
        const HOST_UNCACHED = 1 << 3;
        /// Host accesses are cached.
        const HOST_CACHED = 1 << 4;
    }
}

/// Current mapping state of a buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BufferMapState {
    /// Not mapped and no mapping requested.
    #[default]
    Unmapped,
    /// A `map_async` request is in flight.
    Pending,
    /// Mapped and accessible from the host.
    Mapped,
}

/// Dimensionality of a texture.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum TextureDimension {
    D1,
    #[default]
    D2,
    D3,
}

/// Dimensionality of a texture view.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum TextureViewDimension {
    D1,
    D2,
    D2Array,
    Cube,
    CubeArray,
    D3,
}

impl TextureViewDimension {
    /// Texture dimension compatible with this view dimension.
    pub const fn compatible_texture_dimension(self) -> TextureDimension {
        match self {
            Self::D1 => TextureDimension::D1,
            Self::D2 | Self::D2Array | Self::Cube | Self::CubeArray => TextureDimension::D2,
            Self::D3 => TextureDimension::D3,
        }
    }
}

/// Which aspect of a texture a view or copy addresses.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum TextureAspect {
    #[default]
    All,
    StencilOnly,
    DepthOnly,
}

/// Texel formats understood by the procedure table.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum TextureFormat {
    R8Unorm,
    R8Snorm,
    R8Uint,
    R16Float,
    Rg8Unorm,
    R32Float,
    R32Uint,
    Rg16Float,
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Rgb10a2Unorm,
    Rg11b10Ufloat,
    Rg32Float,
    Rgba16Float,
    Rgba32Float,
    Stencil8,
    Depth16Unorm,
    Depth24Plus,
    Depth24PlusStencil8,
    Depth32Float,
    Depth32FloatStencil8,
    Bc1RgbaUnorm,
    Etc2Rgb8Unorm,
    Astc4x4Unorm,
}

impl TextureFormat {
    /// Every format, in declaration order.
    pub const ALL: &'static [TextureFormat] = &[
        Self::R8Unorm,
        Self::R8Snorm,
        Self::R8Uint,
        Self::R16Float,
        Self::Rg8Unorm,
        Self::R32Float,
        Self::R32Uint,
        Self::Rg16Float,
        Self::Rgba8Unorm,
        Self::Rgba8UnormSrgb,
        Self::Bgra8Unorm,
        Self::Bgra8UnormSrgb,
        Self::Rgb10a2Unorm,
        Self::Rg11b10Ufloat,
        Self::Rg32Float,
        Self::Rgba16Float,
        Self::Rgba32Float,
        Self::Stencil8,
        Self::Depth16Unorm,
        Self::Depth24Plus,
        Self::Depth24PlusStencil8,
        Self::Depth32Float,
        Self::Depth32FloatStencil8,
        Self::Bc1RgbaUnorm,
        Self::Etc2Rgb8Unorm,
        Self::Astc4x4Unorm,
    ];

    /// Width and height of a texel block.
    pub const fn block_dimensions(self) -> (u32, u32) {
        match self {
            Self::Bc1RgbaUnorm | Self::Etc2Rgb8Unorm | Self::Astc4x4Unorm => (4, 4),
            _ => (1, 1),
        }
    }

    /// Size in bytes of one texel block when copied to or from a buffer.
    ///
    /// Returns `None` for combined depth-stencil formats and opaque depth
    /// formats, which can't be copied as a whole.
    pub const fn block_copy_size(self) -> Option<u32> {
        Some(match self {
            Self::R8Unorm | Self::R8Snorm | Self::R8Uint | Self::Stencil8 => 1,
            Self::R16Float | Self::Rg8Unorm | Self::Depth16Unorm => 2,
            Self::R32Float
            | Self::R32Uint
            | Self::Rg16Float
            | Self::Rgba8Unorm
            | Self::Rgba8UnormSrgb
            | Self::Bgra8Unorm
            | Self::Bgra8UnormSrgb
            | Self::Rgb10a2Unorm
            | Self::Rg11b10Ufloat
            | Self::Depth32Float => 4,
            Self::Rg32Float | Self::Rgba16Float | Self::Bc1RgbaUnorm | Self::Etc2Rgb8Unorm => 8,
            Self::Rgba32Float | Self::Astc4x4Unorm => 16,
            Self::Depth24Plus | Self::Depth24PlusStencil8 | Self::Depth32FloatStencil8 => {
                return None
            }
        })
    }

    /// Returns `true` if the format has a depth aspect.
    pub const fn has_depth_aspect(self) -> bool {
        match self {
            Self::Depth16Unorm
            | Self::Depth24Plus
            | Self::Depth24PlusStencil8
            | Self::Depth32Float
            | Self::Depth32FloatStencil8 => true,
            _ => false,
        }
    }

    /// Returns `true` if the format has a stencil aspect.
    pub const fn has_stencil_aspect(self) -> bool {
        match self {
            Self::Stencil8 | Self::Depth24PlusStencil8 | Self::Depth32FloatStencil8 => true,
            _ => false,
        }
    }

    /// Returns `true` for depth and/or stencil formats.
    pub const fn is_depth_stencil(self) -> bool {
        self.has_depth_aspect() || self.has_stencil_aspect()
    }

    /// Returns `true` for block-compressed formats.
    pub const fn is_compressed(self) -> bool {
        let (w, h) = self.block_dimensions();
        w != 1 || h != 1
    }

    /// The device feature that must be enabled to create textures of this format.
    pub const fn required_feature(self) -> Option<FeatureName> {
        match self {
            Self::Depth32FloatStencil8 => Some(FeatureName::Depth32FloatStencil8),
            Self::Bc1RgbaUnorm => Some(FeatureName::TextureCompressionBc),
            Self::Etc2Rgb8Unorm => Some(FeatureName::TextureCompressionEtc2),
            Self::Astc4x4Unorm => Some(FeatureName::TextureCompressionAstc),
            _ => None,
        }
    }

    /// Returns `true` if the format can be rendered to.
    pub const fn is_renderable(self) -> bool {
        !self.is_compressed() && !matches!(self, Self::R8Snorm)
    }
}

/// Extent of a texture or copy.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub struct Extent3d {
    pub width: u32,
    pub height: u32,
    pub depth_or_array_layers: u32,
}

impl Default for Extent3d {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        }
    }
}

impl Extent3d {
    /// Extent of mip level `level` of a texture of this size.
    ///
    /// Array layers are not reduced for non-3D dimensions.
    pub fn mip_level_size(&self, level: u32, dimension: TextureDimension) -> Extent3d {
        let shrink = |v: u32| (v >> level.min(31)).max(1);
        Extent3d {
            width: shrink(self.width),
            height: match dimension {
                TextureDimension::D1 => 1,
                _ => shrink(self.height),
            },
            depth_or_array_layers: match dimension {
                TextureDimension::D3 => shrink(self.depth_or_array_layers),
                _ => self.depth_or_array_layers,
            },
        }
    }

    /// Maximum number of mip levels for a texture of this size.
    pub fn max_mips(&self, dimension: TextureDimension) -> u32 {
        let max_dim = match dimension {
            TextureDimension::D1 => return 1,
            TextureDimension::D2 => self.width.max(self.height),
            TextureDimension::D3 => self.width.max(self.height).max(self.depth_or_array_layers),
        };
        32 - max_dim.max(1).leading_zeros()
    }
}

/// Origin of a copy within a texture.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub struct Origin3d {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

/// RGBA double precision color.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

/// Format of indices used with an index buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

impl IndexFormat {
    /// Size in bytes of one index.
    pub const fn byte_size(self) -> u64 {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }
}

/// Type of queries contained in a query set.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum QueryType {
    Occlusion,
    Timestamp,
}

/// How edges are handled when sampling.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum AddressMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirrorRepeat,
}

/// Texel filter used when sampling.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

/// Comparison function used by depth tests and comparison samplers.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Primitive topology used by a render pipeline.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
}

impl PrimitiveTopology {
    /// Returns `true` for strip topologies, which need a strip index format.
    pub const fn is_strip(self) -> bool {
        matches!(self, Self::LineStrip | Self::TriangleStrip)
    }
}

/// Format of a vertex attribute.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum VertexFormat {
    Uint32,
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
    Unorm8x4,
}

impl VertexFormat {
    /// Size in bytes of one attribute of this format.
    pub const fn size(self) -> u64 {
        match self {
            Self::Uint32 | Self::Float32 | Self::Unorm8x4 => 4,
            Self::Float32x2 => 8,
            Self::Float32x3 => 12,
            Self::Float32x4 => 16,
        }
    }
}

/// Whether a vertex buffer is indexed by vertex or by instance.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum VertexStepMode {
    #[default]
    Vertex,
    Instance,
}

/// Operation applied to an attachment at the start of a render pass.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum LoadOp {
    #[default]
    Clear,
    Load,
}

/// Operation applied to an attachment at the end of a render pass.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum StoreOp {
    #[default]
    Store,
    Discard,
}

/// How the presentation engine hands out surface textures.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum PresentMode {
    #[default]
    Fifo,
    FifoRelaxed,
    Immediate,
    Mailbox,
}

/// How the alpha channel of surface textures is composited.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum CompositeAlphaMode {
    #[default]
    Auto,
    Opaque,
    Premultiplied,
    Unpremultiplied,
    Inherit,
}

/// Status of `surface_get_current_texture`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum SurfaceGetCurrentTextureStatus {
    SuccessOptimal,
    SuccessSuboptimal,
    Timeout,
    Outdated,
    Lost,
    Error,
}

/// Capabilities of a surface for a given adapter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceCapabilities {
    /// Usages surface textures can be configured with.
    pub usages: TextureUsages,
    /// Supported formats, preferred first.
    pub formats: Vec<TextureFormat>,
    /// Supported present modes.
    pub present_modes: Vec<PresentMode>,
    /// Supported alpha modes.
    pub alpha_modes: Vec<CompositeAlphaMode>,
}

/// Severity of a shader compilation message.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum CompilationMessageType {
    Error,
    Warning,
    Info,
}

/// One message produced while compiling a shader module.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub struct CompilationMessage {
    pub message: String,
    pub message_type: CompilationMessageType,
    pub line_num: u64,
    pub line_pos: u64,
    pub offset: u64,
    pub length: u64,
}

/// All messages produced while compiling a shader module.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompilationInfo {
    /// Messages in source order.
    pub messages: Vec<CompilationMessage>,
}

impl CompilationInfo {
    /// Returns `true` if any message is an error.
    pub fn has_errors(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.message_type == CompilationMessageType::Error)
    }
}

/// Kinds of native fences that can be imported as shared fences.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum SharedFenceType {
    VkSemaphoreOpaqueFd,
    SyncFd,
    VkSemaphoreZirconHandle,
    DxgiSharedHandle,
    MtlSharedEvent,
    EglSync,
}

/// Component type of a subgroup matrix.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum SubgroupMatrixComponentType {
    F32,
    F16,
    U32,
    I32,
}

/// Kind of buffer a buffer binding accepts.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum BufferBindingType {
    Uniform,
    Storage { read_only: bool },
}

impl BufferBindingType {
    /// Usage a buffer needs to be bound as this type.
    pub const fn required_usage(self) -> BufferUsages {
        match self {
            Self::Uniform => BufferUsages::UNIFORM,
            Self::Storage { .. } => BufferUsages::STORAGE,
        }
    }
}

/// Kind of sampler a sampler binding accepts.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum SamplerBindingType {
    #[default]
    Filtering,
    NonFiltering,
    Comparison,
}

/// Component type a sampled texture binding reads.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum TextureSampleType {
    Float { filterable: bool },
    Depth,
    Sint,
    Uint,
}

/// Access a storage texture binding is allowed.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum StorageTextureAccess {
    WriteOnly,
    ReadOnly,
    ReadWrite,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_from_str() {
        assert_eq!("null".parse::<Backend>(), Ok(Backend::Null));
        assert_eq!(" Empty ".parse::<Backend>(), Ok(Backend::Empty));
        assert!("vulkan".parse::<Backend>().is_err());
    }

    #[test]
    fn mip_level_sizes() {
        let size = Extent3d {
            width: 256,
            height: 64,
            depth_or_array_layers: 6,
        };

        assert_eq!(size.max_mips(TextureDimension::D2), 9);
        assert_eq!(size.max_mips(TextureDimension::D1), 1);

        let level = size.mip_level_size(7, TextureDimension::D2);
        assert_eq!((level.width, level.height), (2, 1));
        assert_eq!(level.depth_or_array_layers, 6);

        let level = size.mip_level_size(1, TextureDimension::D3);
        assert_eq!(level.depth_or_array_layers, 3);
    }

    #[test]
    fn depth_formats_have_no_whole_copy_size() {
        assert_eq!(TextureFormat::Depth24PlusStencil8.block_copy_size(), None);
        assert_eq!(TextureFormat::Rgba8Unorm.block_copy_size(), Some(4));
        assert!(TextureFormat::Stencil8.is_depth_stencil());
        assert!(!TextureFormat::Bgra8Unorm.is_depth_stencil());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn usages_serialize_by_name() {
        let usage = BufferUsages::MAP_READ | BufferUsages::COPY_DST;
        let json = serde_json::to_string(&usage).unwrap();
        assert!(json.contains("MAP_READ"), "{json}");
        assert_eq!(serde_json::from_str::<BufferUsages>(&json).unwrap(), usage);
    }
}

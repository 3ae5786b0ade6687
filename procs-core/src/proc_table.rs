//! The procedure table.
//!
//! [`ProcTable`] is a flat aggregate of function pointers, one slot per entry
//! point of the API surface. Slots are grouped by the kind of object they
//! operate on, in the order of the C `DawnProcTable`, and within each group
//! `*_add_ref` / `*_release` come last.
//!
//! The empty table is a `const`, so it can be placed in a `static` and filled
//! in with struct-update syntax. Populated tables for the built-in backends
//! are process-wide statics, and are never mutated.

use std::{collections::hash_map::Entry, fmt, ptr};

use heck::ToSnakeCase as _;
use once_cell::sync::{Lazy, OnceCell};
use pt::{
    AdapterInfo, AdapterPropertiesMemoryHeaps, AdapterPropertiesSubgroupMatrixConfigs, Backend,
    BufferAddress, BufferMapState, BufferUsages, Color, DeviceLostReason, DrmFormatCapabilities,
    ErrorFilter, ErrorType, Extent3d, FeatureName, FormatCapabilities, IndexFormat,
    InstanceFeatureName, InstanceLimits, Limits, MapMode, QueryType, SupportedFeatures,
    SupportedInstanceFeatures, SupportedWgslLanguageFeatures, SurfaceCapabilities,
    TextureDimension, TextureFormat, TextureUsages, TextureViewDimension, UnknownBackend,
    WaitStatus, WgslLanguageFeatureName,
};
use thiserror::Error;

use crate::{
    api::{Api, Empty, Null},
    binding_model::{
        BindGroupDescriptor, BindGroupLayoutDescriptor, BindingResource, PipelineLayoutDescriptor,
        ResourceTableDescriptor, ResourceTableError,
    },
    command::{
        CommandBufferDescriptor, CommandEncoderDescriptor, ComputePassDescriptor,
        RenderBundleDescriptor, RenderBundleEncoderDescriptor, RenderPassDescriptor,
        TexelCopyBufferInfo, TexelCopyBufferLayout, TexelCopyTextureInfo,
    },
    device::{
        queue::{CopyTextureForBrowserOptions, ImageCopyExternalTexture, QueueWorkDoneCallbackInfo},
        AHardwareBufferProperties, DeviceDescriptor, DeviceError, LoggingCallback,
        PopErrorScopeCallbackInfo,
    },
    event::{FutureId, FutureWaitInfo},
    global::Global,
    id::{self, AdapterId, DeviceId},
    instance::{
        CreateInstanceError, InstanceDescriptor, RequestAdapterCallbackInfo,
        RequestAdapterOptions, RequestDeviceCallbackInfo,
    },
    pipeline::{
        CompilationInfoCallbackInfo, ComputePipelineDescriptor,
        CreateComputePipelineAsyncCallbackInfo, CreateRenderPipelineAsyncCallbackInfo,
        RenderPipelineDescriptor, ShaderModuleDescriptor,
    },
    present::{ConfigureSurfaceError, SurfaceConfiguration, SurfaceDescriptor, SurfaceError, SurfaceOutput},
    resource::{
        BufferAccessError, BufferDescriptor, BufferMapCallbackInfo, ExternalTextureDescriptor,
        QuerySetDescriptor, SamplerDescriptor, TexelBufferViewDescriptor, TextureDescriptor,
        TextureViewDescriptor,
    },
    shared::{
        BeginAccessState, EndAccessState, SharedBufferMemoryDescriptor,
        SharedBufferMemoryProperties, SharedFenceDescriptor, SharedFenceExportInfo,
        SharedMemoryError, SharedTextureMemoryDescriptor, SharedTextureMemoryProperties,
    },
    storage::InvalidId,
    FastHashMap,
};

/// The kind of object a group of entry points operates on.
///
/// `Global` holds the entry points that take no object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Group {
    Global,
    Adapter,
    AdapterInfo,
    AdapterPropertiesMemoryHeaps,
    AdapterPropertiesSubgroupMatrixConfigs,
    BindGroup,
    BindGroupLayout,
    Buffer,
    CommandBuffer,
    CommandEncoder,
    ComputePassEncoder,
    ComputePipeline,
    DawnDrmFormatCapabilities,
    Device,
    ExternalTexture,
    Instance,
    PipelineLayout,
    QuerySet,
    Queue,
    RenderBundle,
    RenderBundleEncoder,
    RenderPassEncoder,
    RenderPipeline,
    ResourceTable,
    Sampler,
    ShaderModule,
    SharedBufferMemory,
    SharedBufferMemoryEndAccessState,
    SharedFence,
    SharedTextureMemory,
    SharedTextureMemoryEndAccessState,
    SupportedFeatures,
    SupportedInstanceFeatures,
    SupportedWgslLanguageFeatures,
    Surface,
    SurfaceCapabilities,
    TexelBufferView,
    Texture,
    TextureView,
}

/// Describes one slot of a [`ProcTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntryPoint {
    /// Position of the slot in the table.
    pub index: usize,
    /// Name of the slot, and of the [`Global`] method it is populated with.
    pub name: &'static str,
    /// Name of the entry point in the C table, such as `bufferGetSize`.
    pub proc_name: &'static str,
    pub group: Group,
}

impl EntryPoint {
    /// The exported C symbol, such as `wgpuBufferGetSize`.
    pub fn symbol(&self) -> String {
        let mut chars = self.proc_name.chars();
        let first = chars.next().map(|c| c.to_ascii_uppercase());
        format!("wgpu{}{}", first.into_iter().collect::<String>(), chars.as_str())
    }

    /// Returns `true` if the entry point adds or drops an external reference.
    pub fn is_ref_counting(&self) -> bool {
        self.name.ends_with("_add_ref") || self.name.ends_with("_release")
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{} entry points are not populated: {}", .names.len(), .names.join(", "))]
pub struct MissingProcs {
    /// Names of the unpopulated slots, in table order.
    pub names: Vec<&'static str>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InstallProcTableError {
    #[error("A procedure table is already installed")]
    AlreadyInstalled,
    #[error(transparent)]
    Missing(#[from] MissingProcs),
}

#[cold]
#[track_caller]
fn unpopulated(proc_name: &str) -> ! {
    panic!("Entry point `{proc_name}` is not populated")
}

/// Helper macro to construct the procedure table, its slot types and the
/// entry point descriptions from one list.
macro_rules! proc_table {
    (
        $(#[$($meta:meta)*])*
        pub struct ProcTable {
            $(
                $group:ident {
                    $(
                        fn $name:ident $(<$generic:ident>)? ($($arg_name:ident: $arg:ty),* $(,)?) $(-> $ret:ty)?
                            = $proc_name:literal, $alias:ident;
                    )*
                }
            )*
        }
    ) => {
        $(
            $(
                #[doc = concat!("Type of the [`ProcTable::", stringify!($name), "`] slot.")]
                pub type $alias = fn(&Global, $($arg),*) $(-> $ret)?;
            )*
        )*

        $(#[$($meta)*])*
        #[derive(Clone)]
        pub struct ProcTable {
            /// The backend the slots were populated from, if any.
            pub backend: Option<Backend>,
            $(
                $(
                    pub $name: Option<$alias>,
                )*
            )*
        }

        /// Every entry point, in table order.
        pub static ENTRY_POINTS: &[EntryPoint] = &{
            let names: [(&str, &str, Group); ENTRY_POINT_COUNT] = [
                $($((stringify!($name), $proc_name, Group::$group),)*)*
            ];

            let mut entries = [EntryPoint {
                index: 0,
                name: "",
                proc_name: "",
                group: Group::Global,
            }; ENTRY_POINT_COUNT];

            let mut index = 0;

            while index < ENTRY_POINT_COUNT {
                let (name, proc_name, group) = names[index];
                entries[index] = EntryPoint {
                    index,
                    name,
                    proc_name,
                    group,
                };
                index += 1;
            }

            entries
        };

        /// Number of slots of a [`ProcTable`].
        pub const ENTRY_POINT_COUNT: usize = [$($(stringify!($name),)*)*].len();

        impl ProcTable {
            /// A table with every slot unpopulated.
            pub const EMPTY: ProcTable = ProcTable {
                backend: None,
                $($($name: None,)*)*
            };

            const fn populated<A: Api>() -> ProcTable {
                ProcTable {
                    backend: Some(A::VARIANT),
                    $($($name: Some(Global::$name $(::<$generic>)?),)*)*
                }
            }

            /// Whether each slot is populated, in table order.
            fn slots(&self) -> [bool; ENTRY_POINT_COUNT] {
                [$($(self.$name.is_some(),)*)*]
            }

            $(
                $(
                    #[doc = concat!("Call the `", $proc_name, "` entry point.")]
                    ///
                    /// # Panics
                    ///
                    /// Panics if the slot is not populated.
                    #[inline]
                    pub fn $name(&self, global: &Global, $($arg_name: $arg),*) $(-> $ret)? {
                        match self.$name {
                            Some(f) => f(global, $($arg_name),*),
                            None => unpopulated($proc_name),
                        }
                    }
                )*
            )*
        }
    };
}

proc_table! {
    /// Table of every entry point of the API surface.
    ///
    /// Every slot takes the [`Global`] context first. Use
    /// [`ProcTable::new`] or [`ProcTable::from_backend`] to get a populated
    /// table, or start from [`ProcTable::EMPTY`] to build a partial one:
    ///
    /// ```
    /// use procs_core::{ProcTable, api::Null};
    ///
    /// static TABLE: ProcTable = ProcTable::EMPTY;
    /// assert!(TABLE.validate().is_err());
    ///
    /// let table = ProcTable::new::<Null>();
    /// assert!(table.validate().is_ok());
    /// ```
    pub struct ProcTable {
    Global {
        fn create_instance<A>(desc: Option<&InstanceDescriptor>) -> Result<id::InstanceId, CreateInstanceError> = "createInstance", ProcCreateInstance;
        fn get_instance_features<A>() -> SupportedInstanceFeatures = "getInstanceFeatures", ProcGetInstanceFeatures;
        fn get_instance_limits<A>() -> InstanceLimits = "getInstanceLimits", ProcGetInstanceLimits;
        fn has_instance_feature<A>(feature: InstanceFeatureName) -> bool = "hasInstanceFeature", ProcHasInstanceFeature;
        fn get_proc_address(name: &str) -> Option<&'static EntryPoint> = "getProcAddress", ProcGetProcAddress;
    }
    Adapter {
        fn adapter_create_device(adapter_id: AdapterId, desc: DeviceDescriptor) -> Result<Option<DeviceId>, InvalidId> = "adapterCreateDevice", ProcAdapterCreateDevice;
        fn adapter_get_features(adapter_id: AdapterId) -> Result<SupportedFeatures, InvalidId> = "adapterGetFeatures", ProcAdapterGetFeatures;
        fn adapter_get_format_capabilities(adapter_id: AdapterId, format: TextureFormat) -> Result<FormatCapabilities, InvalidId> = "adapterGetFormatCapabilities", ProcAdapterGetFormatCapabilities;
        fn adapter_get_info(adapter_id: AdapterId) -> Result<AdapterInfo, InvalidId> = "adapterGetInfo", ProcAdapterGetInfo;
        fn adapter_get_instance(adapter_id: AdapterId) -> Result<id::InstanceId, InvalidId> = "adapterGetInstance", ProcAdapterGetInstance;
        fn adapter_get_limits(adapter_id: AdapterId) -> Result<Limits, InvalidId> = "adapterGetLimits", ProcAdapterGetLimits;
        fn adapter_has_feature(adapter_id: AdapterId, feature: FeatureName) -> Result<bool, InvalidId> = "adapterHasFeature", ProcAdapterHasFeature;
        fn adapter_request_device(adapter_id: AdapterId, desc: DeviceDescriptor, callback_info: RequestDeviceCallbackInfo) -> Result<FutureId, InvalidId> = "adapterRequestDevice", ProcAdapterRequestDevice;
        fn adapter_add_ref(id: AdapterId) -> Result<(), InvalidId> = "adapterAddRef", ProcAdapterAddRef;
        fn adapter_release(id: AdapterId) -> Result<(), InvalidId> = "adapterRelease", ProcAdapterRelease;
    }
    AdapterInfo {
        fn adapter_info_free_members(value: AdapterInfo) = "adapterInfoFreeMembers", ProcAdapterInfoFreeMembers;
    }
    AdapterPropertiesMemoryHeaps {
        fn adapter_properties_memory_heaps_free_members(value: AdapterPropertiesMemoryHeaps) = "adapterPropertiesMemoryHeapsFreeMembers", ProcAdapterPropertiesMemoryHeapsFreeMembers;
    }
    AdapterPropertiesSubgroupMatrixConfigs {
        fn adapter_properties_subgroup_matrix_configs_free_members(value: AdapterPropertiesSubgroupMatrixConfigs) = "adapterPropertiesSubgroupMatrixConfigsFreeMembers", ProcAdapterPropertiesSubgroupMatrixConfigsFreeMembers;
    }
    BindGroup {
        fn bind_group_set_label(id: id::BindGroupId, label: &str) -> Result<(), InvalidId> = "bindGroupSetLabel", ProcBindGroupSetLabel;
        fn bind_group_add_ref(id: id::BindGroupId) -> Result<(), InvalidId> = "bindGroupAddRef", ProcBindGroupAddRef;
        fn bind_group_release(id: id::BindGroupId) -> Result<(), InvalidId> = "bindGroupRelease", ProcBindGroupRelease;
    }
    BindGroupLayout {
        fn bind_group_layout_set_label(id: id::BindGroupLayoutId, label: &str) -> Result<(), InvalidId> = "bindGroupLayoutSetLabel", ProcBindGroupLayoutSetLabel;
        fn bind_group_layout_add_ref(id: id::BindGroupLayoutId) -> Result<(), InvalidId> = "bindGroupLayoutAddRef", ProcBindGroupLayoutAddRef;
        fn bind_group_layout_release(id: id::BindGroupLayoutId) -> Result<(), InvalidId> = "bindGroupLayoutRelease", ProcBindGroupLayoutRelease;
    }
    Buffer {
        fn buffer_create_texel_view(buffer_id: id::BufferId, desc: &TexelBufferViewDescriptor) -> Result<id::TexelBufferViewId, InvalidId> = "bufferCreateTexelView", ProcBufferCreateTexelView;
        fn buffer_destroy(buffer_id: id::BufferId) -> Result<(), InvalidId> = "bufferDestroy", ProcBufferDestroy;
        fn buffer_get_const_mapped_range(buffer_id: id::BufferId, offset: usize, size: usize) -> Result<*const u8, BufferAccessError> = "bufferGetConstMappedRange", ProcBufferGetConstMappedRange;
        fn buffer_get_mapped_range(buffer_id: id::BufferId, offset: usize, size: usize) -> Result<*mut u8, BufferAccessError> = "bufferGetMappedRange", ProcBufferGetMappedRange;
        fn buffer_get_map_state(buffer_id: id::BufferId) -> Result<BufferMapState, InvalidId> = "bufferGetMapState", ProcBufferGetMapState;
        fn buffer_get_size(buffer_id: id::BufferId) -> Result<BufferAddress, InvalidId> = "bufferGetSize", ProcBufferGetSize;
        fn buffer_get_usage(buffer_id: id::BufferId) -> Result<BufferUsages, InvalidId> = "bufferGetUsage", ProcBufferGetUsage;
        fn buffer_map_async(buffer_id: id::BufferId, mode: MapMode, offset: usize, size: usize, callback_info: BufferMapCallbackInfo) -> Result<FutureId, InvalidId> = "bufferMapAsync", ProcBufferMapAsync;
        fn buffer_read_mapped_range(buffer_id: id::BufferId, offset: usize, data: &mut [u8]) -> Result<(), BufferAccessError> = "bufferReadMappedRange", ProcBufferReadMappedRange;
        fn buffer_set_label(id: id::BufferId, label: &str) -> Result<(), InvalidId> = "bufferSetLabel", ProcBufferSetLabel;
        fn buffer_unmap(buffer_id: id::BufferId) -> Result<(), InvalidId> = "bufferUnmap", ProcBufferUnmap;
        fn buffer_write_mapped_range(buffer_id: id::BufferId, offset: usize, data: &[u8]) -> Result<(), BufferAccessError> = "bufferWriteMappedRange", ProcBufferWriteMappedRange;
        fn buffer_add_ref(id: id::BufferId) -> Result<(), InvalidId> = "bufferAddRef", ProcBufferAddRef;
        fn buffer_release(id: id::BufferId) -> Result<(), InvalidId> = "bufferRelease", ProcBufferRelease;
    }
    CommandBuffer {
        fn command_buffer_set_label(id: id::CommandBufferId, label: &str) -> Result<(), InvalidId> = "commandBufferSetLabel", ProcCommandBufferSetLabel;
        fn command_buffer_add_ref(id: id::CommandBufferId) -> Result<(), InvalidId> = "commandBufferAddRef", ProcCommandBufferAddRef;
        fn command_buffer_release(id: id::CommandBufferId) -> Result<(), InvalidId> = "commandBufferRelease", ProcCommandBufferRelease;
    }
    CommandEncoder {
        fn command_encoder_begin_compute_pass(encoder_id: id::CommandEncoderId, desc: &ComputePassDescriptor) -> Result<id::ComputePassEncoderId, InvalidId> = "commandEncoderBeginComputePass", ProcCommandEncoderBeginComputePass;
        fn command_encoder_begin_render_pass(encoder_id: id::CommandEncoderId, desc: &RenderPassDescriptor) -> Result<id::RenderPassEncoderId, InvalidId> = "commandEncoderBeginRenderPass", ProcCommandEncoderBeginRenderPass;
        fn command_encoder_clear_buffer(encoder_id: id::CommandEncoderId, buffer_id: id::BufferId, offset: BufferAddress, size: Option<BufferAddress>) -> Result<(), InvalidId> = "commandEncoderClearBuffer", ProcCommandEncoderClearBuffer;
        fn command_encoder_copy_buffer_to_buffer(encoder_id: id::CommandEncoderId, source: id::BufferId, source_offset: BufferAddress, destination: id::BufferId, destination_offset: BufferAddress, size: BufferAddress) -> Result<(), InvalidId> = "commandEncoderCopyBufferToBuffer", ProcCommandEncoderCopyBufferToBuffer;
        fn command_encoder_copy_buffer_to_texture(encoder_id: id::CommandEncoderId, source: &TexelCopyBufferInfo, destination: &TexelCopyTextureInfo, copy_size: &Extent3d) -> Result<(), InvalidId> = "commandEncoderCopyBufferToTexture", ProcCommandEncoderCopyBufferToTexture;
        fn command_encoder_copy_texture_to_buffer(encoder_id: id::CommandEncoderId, source: &TexelCopyTextureInfo, destination: &TexelCopyBufferInfo, copy_size: &Extent3d) -> Result<(), InvalidId> = "commandEncoderCopyTextureToBuffer", ProcCommandEncoderCopyTextureToBuffer;
        fn command_encoder_copy_texture_to_texture(encoder_id: id::CommandEncoderId, source: &TexelCopyTextureInfo, destination: &TexelCopyTextureInfo, copy_size: &Extent3d) -> Result<(), InvalidId> = "commandEncoderCopyTextureToTexture", ProcCommandEncoderCopyTextureToTexture;
        fn command_encoder_finish(encoder_id: id::CommandEncoderId, desc: Option<&CommandBufferDescriptor>) -> Result<id::CommandBufferId, InvalidId> = "commandEncoderFinish", ProcCommandEncoderFinish;
        fn command_encoder_inject_validation_error(encoder_id: id::CommandEncoderId, message: &str) -> Result<(), InvalidId> = "commandEncoderInjectValidationError", ProcCommandEncoderInjectValidationError;
        fn command_encoder_insert_debug_marker(encoder_id: id::CommandEncoderId, marker: &str) -> Result<(), InvalidId> = "commandEncoderInsertDebugMarker", ProcCommandEncoderInsertDebugMarker;
        fn command_encoder_pop_debug_group(encoder_id: id::CommandEncoderId) -> Result<(), InvalidId> = "commandEncoderPopDebugGroup", ProcCommandEncoderPopDebugGroup;
        fn command_encoder_push_debug_group(encoder_id: id::CommandEncoderId, label: &str) -> Result<(), InvalidId> = "commandEncoderPushDebugGroup", ProcCommandEncoderPushDebugGroup;
        fn command_encoder_resolve_query_set(encoder_id: id::CommandEncoderId, query_set_id: id::QuerySetId, first_query: u32, query_count: u32, destination: id::BufferId, destination_offset: BufferAddress) -> Result<(), InvalidId> = "commandEncoderResolveQuerySet", ProcCommandEncoderResolveQuerySet;
        fn command_encoder_set_label(id: id::CommandEncoderId, label: &str) -> Result<(), InvalidId> = "commandEncoderSetLabel", ProcCommandEncoderSetLabel;
        fn command_encoder_set_resource_table(encoder_id: id::CommandEncoderId, resource_table_id: Option<id::ResourceTableId>) -> Result<(), InvalidId> = "commandEncoderSetResourceTable", ProcCommandEncoderSetResourceTable;
        fn command_encoder_write_buffer(encoder_id: id::CommandEncoderId, buffer_id: id::BufferId, offset: BufferAddress, data: &[u8]) -> Result<(), InvalidId> = "commandEncoderWriteBuffer", ProcCommandEncoderWriteBuffer;
        fn command_encoder_write_timestamp(encoder_id: id::CommandEncoderId, query_set_id: id::QuerySetId, query_index: u32) -> Result<(), InvalidId> = "commandEncoderWriteTimestamp", ProcCommandEncoderWriteTimestamp;
        fn command_encoder_add_ref(id: id::CommandEncoderId) -> Result<(), InvalidId> = "commandEncoderAddRef", ProcCommandEncoderAddRef;
        fn command_encoder_release(id: id::CommandEncoderId) -> Result<(), InvalidId> = "commandEncoderRelease", ProcCommandEncoderRelease;
    }
    ComputePassEncoder {
        fn compute_pass_encoder_dispatch_workgroups(pass_id: id::ComputePassEncoderId, workgroup_count_x: u32, workgroup_count_y: u32, workgroup_count_z: u32) -> Result<(), InvalidId> = "computePassEncoderDispatchWorkgroups", ProcComputePassEncoderDispatchWorkgroups;
        fn compute_pass_encoder_dispatch_workgroups_indirect(pass_id: id::ComputePassEncoderId, indirect_buffer_id: id::BufferId, indirect_offset: BufferAddress) -> Result<(), InvalidId> = "computePassEncoderDispatchWorkgroupsIndirect", ProcComputePassEncoderDispatchWorkgroupsIndirect;
        fn compute_pass_encoder_end(pass_id: id::ComputePassEncoderId) -> Result<(), InvalidId> = "computePassEncoderEnd", ProcComputePassEncoderEnd;
        fn compute_pass_encoder_insert_debug_marker(pass_id: id::ComputePassEncoderId, marker: &str) -> Result<(), InvalidId> = "computePassEncoderInsertDebugMarker", ProcComputePassEncoderInsertDebugMarker;
        fn compute_pass_encoder_pop_debug_group(pass_id: id::ComputePassEncoderId) -> Result<(), InvalidId> = "computePassEncoderPopDebugGroup", ProcComputePassEncoderPopDebugGroup;
        fn compute_pass_encoder_push_debug_group(pass_id: id::ComputePassEncoderId, label: &str) -> Result<(), InvalidId> = "computePassEncoderPushDebugGroup", ProcComputePassEncoderPushDebugGroup;
        fn compute_pass_encoder_set_bind_group(pass_id: id::ComputePassEncoderId, index: u32, bind_group_id: Option<id::BindGroupId>, offsets: &[u32]) -> Result<(), InvalidId> = "computePassEncoderSetBindGroup", ProcComputePassEncoderSetBindGroup;
        fn compute_pass_encoder_set_immediates(pass_id: id::ComputePassEncoderId, offset: u32, data: &[u8]) -> Result<(), InvalidId> = "computePassEncoderSetImmediates", ProcComputePassEncoderSetImmediates;
        fn compute_pass_encoder_set_label(id: id::ComputePassEncoderId, label: &str) -> Result<(), InvalidId> = "computePassEncoderSetLabel", ProcComputePassEncoderSetLabel;
        fn compute_pass_encoder_set_pipeline(pass_id: id::ComputePassEncoderId, pipeline_id: id::ComputePipelineId) -> Result<(), InvalidId> = "computePassEncoderSetPipeline", ProcComputePassEncoderSetPipeline;
        fn compute_pass_encoder_write_timestamp(pass_id: id::ComputePassEncoderId, query_set_id: id::QuerySetId, query_index: u32) -> Result<(), InvalidId> = "computePassEncoderWriteTimestamp", ProcComputePassEncoderWriteTimestamp;
        fn compute_pass_encoder_add_ref(id: id::ComputePassEncoderId) -> Result<(), InvalidId> = "computePassEncoderAddRef", ProcComputePassEncoderAddRef;
        fn compute_pass_encoder_release(id: id::ComputePassEncoderId) -> Result<(), InvalidId> = "computePassEncoderRelease", ProcComputePassEncoderRelease;
    }
    ComputePipeline {
        fn compute_pipeline_get_bind_group_layout(pipeline_id: id::ComputePipelineId, index: u32) -> Result<id::BindGroupLayoutId, InvalidId> = "computePipelineGetBindGroupLayout", ProcComputePipelineGetBindGroupLayout;
        fn compute_pipeline_set_label(id: id::ComputePipelineId, label: &str) -> Result<(), InvalidId> = "computePipelineSetLabel", ProcComputePipelineSetLabel;
        fn compute_pipeline_add_ref(id: id::ComputePipelineId) -> Result<(), InvalidId> = "computePipelineAddRef", ProcComputePipelineAddRef;
        fn compute_pipeline_release(id: id::ComputePipelineId) -> Result<(), InvalidId> = "computePipelineRelease", ProcComputePipelineRelease;
    }
    DawnDrmFormatCapabilities {
        fn dawn_drm_format_capabilities_free_members(value: DrmFormatCapabilities) = "dawnDrmFormatCapabilitiesFreeMembers", ProcDawnDrmFormatCapabilitiesFreeMembers;
    }
    Device {
        fn device_create_bind_group(device_id: DeviceId, desc: &BindGroupDescriptor) -> Result<id::BindGroupId, InvalidId> = "deviceCreateBindGroup", ProcDeviceCreateBindGroup;
        fn device_create_bind_group_layout(device_id: DeviceId, desc: &BindGroupLayoutDescriptor) -> Result<id::BindGroupLayoutId, InvalidId> = "deviceCreateBindGroupLayout", ProcDeviceCreateBindGroupLayout;
        fn device_create_buffer(device_id: DeviceId, desc: &BufferDescriptor) -> Result<id::BufferId, InvalidId> = "deviceCreateBuffer", ProcDeviceCreateBuffer;
        fn device_create_command_encoder(device_id: DeviceId, desc: Option<&CommandEncoderDescriptor>) -> Result<id::CommandEncoderId, InvalidId> = "deviceCreateCommandEncoder", ProcDeviceCreateCommandEncoder;
        fn device_create_compute_pipeline(device_id: DeviceId, desc: &ComputePipelineDescriptor) -> Result<id::ComputePipelineId, InvalidId> = "deviceCreateComputePipeline", ProcDeviceCreateComputePipeline;
        fn device_create_compute_pipeline_async(device_id: DeviceId, desc: &ComputePipelineDescriptor, callback_info: CreateComputePipelineAsyncCallbackInfo) -> Result<FutureId, InvalidId> = "deviceCreateComputePipelineAsync", ProcDeviceCreateComputePipelineAsync;
        fn device_create_error_buffer(device_id: DeviceId, desc: &BufferDescriptor) -> Result<id::BufferId, InvalidId> = "deviceCreateErrorBuffer", ProcDeviceCreateErrorBuffer;
        fn device_create_error_external_texture(device_id: DeviceId) -> Result<id::ExternalTextureId, InvalidId> = "deviceCreateErrorExternalTexture", ProcDeviceCreateErrorExternalTexture;
        fn device_create_error_shader_module(device_id: DeviceId, desc: &ShaderModuleDescriptor, error_message: &str) -> Result<id::ShaderModuleId, InvalidId> = "deviceCreateErrorShaderModule", ProcDeviceCreateErrorShaderModule;
        fn device_create_error_texture(device_id: DeviceId, desc: &TextureDescriptor) -> Result<id::TextureId, InvalidId> = "deviceCreateErrorTexture", ProcDeviceCreateErrorTexture;
        fn device_create_external_texture(device_id: DeviceId, desc: &ExternalTextureDescriptor) -> Result<id::ExternalTextureId, InvalidId> = "deviceCreateExternalTexture", ProcDeviceCreateExternalTexture;
        fn device_create_pipeline_layout(device_id: DeviceId, desc: &PipelineLayoutDescriptor) -> Result<id::PipelineLayoutId, InvalidId> = "deviceCreatePipelineLayout", ProcDeviceCreatePipelineLayout;
        fn device_create_query_set(device_id: DeviceId, desc: &QuerySetDescriptor) -> Result<id::QuerySetId, InvalidId> = "deviceCreateQuerySet", ProcDeviceCreateQuerySet;
        fn device_create_render_bundle_encoder(device_id: DeviceId, desc: &RenderBundleEncoderDescriptor) -> Result<id::RenderBundleEncoderId, InvalidId> = "deviceCreateRenderBundleEncoder", ProcDeviceCreateRenderBundleEncoder;
        fn device_create_render_pipeline(device_id: DeviceId, desc: &RenderPipelineDescriptor) -> Result<id::RenderPipelineId, InvalidId> = "deviceCreateRenderPipeline", ProcDeviceCreateRenderPipeline;
        fn device_create_render_pipeline_async(device_id: DeviceId, desc: &RenderPipelineDescriptor, callback_info: CreateRenderPipelineAsyncCallbackInfo) -> Result<FutureId, InvalidId> = "deviceCreateRenderPipelineAsync", ProcDeviceCreateRenderPipelineAsync;
        fn device_create_resource_table(device_id: DeviceId, desc: &ResourceTableDescriptor) -> Result<id::ResourceTableId, InvalidId> = "deviceCreateResourceTable", ProcDeviceCreateResourceTable;
        fn device_create_sampler(device_id: DeviceId, desc: Option<&SamplerDescriptor>) -> Result<id::SamplerId, InvalidId> = "deviceCreateSampler", ProcDeviceCreateSampler;
        fn device_create_shader_module(device_id: DeviceId, desc: &ShaderModuleDescriptor) -> Result<id::ShaderModuleId, InvalidId> = "deviceCreateShaderModule", ProcDeviceCreateShaderModule;
        fn device_create_texture(device_id: DeviceId, desc: &TextureDescriptor) -> Result<id::TextureId, InvalidId> = "deviceCreateTexture", ProcDeviceCreateTexture;
        fn device_destroy(device_id: DeviceId) -> Result<(), InvalidId> = "deviceDestroy", ProcDeviceDestroy;
        fn device_force_loss(device_id: DeviceId, reason: DeviceLostReason, message: &str) -> Result<(), InvalidId> = "deviceForceLoss", ProcDeviceForceLoss;
        fn device_get_adapter(device_id: DeviceId) -> Result<AdapterId, InvalidId> = "deviceGetAdapter", ProcDeviceGetAdapter;
        fn device_get_adapter_info(device_id: DeviceId) -> Result<AdapterInfo, InvalidId> = "deviceGetAdapterInfo", ProcDeviceGetAdapterInfo;
        fn device_get_a_hardware_buffer_properties(device_id: DeviceId, handle: *mut std::ffi::c_void) -> Result<AHardwareBufferProperties, DeviceError> = "deviceGetAHardwareBufferProperties", ProcDeviceGetAHardwareBufferProperties;
        fn device_get_features(device_id: DeviceId) -> Result<SupportedFeatures, InvalidId> = "deviceGetFeatures", ProcDeviceGetFeatures;
        fn device_get_limits(device_id: DeviceId) -> Result<Limits, InvalidId> = "deviceGetLimits", ProcDeviceGetLimits;
        fn device_get_lost_future(device_id: DeviceId) -> Result<FutureId, InvalidId> = "deviceGetLostFuture", ProcDeviceGetLostFuture;
        fn device_get_queue(device_id: DeviceId) -> Result<id::QueueId, InvalidId> = "deviceGetQueue", ProcDeviceGetQueue;
        fn device_has_feature(device_id: DeviceId, feature: FeatureName) -> Result<bool, InvalidId> = "deviceHasFeature", ProcDeviceHasFeature;
        fn device_import_shared_buffer_memory(device_id: DeviceId, desc: &SharedBufferMemoryDescriptor) -> Result<id::SharedBufferMemoryId, InvalidId> = "deviceImportSharedBufferMemory", ProcDeviceImportSharedBufferMemory;
        fn device_import_shared_fence(device_id: DeviceId, desc: &SharedFenceDescriptor) -> Result<id::SharedFenceId, InvalidId> = "deviceImportSharedFence", ProcDeviceImportSharedFence;
        fn device_import_shared_texture_memory(device_id: DeviceId, desc: &SharedTextureMemoryDescriptor) -> Result<id::SharedTextureMemoryId, InvalidId> = "deviceImportSharedTextureMemory", ProcDeviceImportSharedTextureMemory;
        fn device_inject_error(device_id: DeviceId, ty: ErrorType, message: &str) -> Result<(), InvalidId> = "deviceInjectError", ProcDeviceInjectError;
        fn device_pop_error_scope(device_id: DeviceId, callback_info: PopErrorScopeCallbackInfo) -> Result<FutureId, InvalidId> = "devicePopErrorScope", ProcDevicePopErrorScope;
        fn device_push_error_scope(device_id: DeviceId, filter: ErrorFilter) -> Result<(), InvalidId> = "devicePushErrorScope", ProcDevicePushErrorScope;
        fn device_set_label(id: DeviceId, label: &str) -> Result<(), InvalidId> = "deviceSetLabel", ProcDeviceSetLabel;
        fn device_set_logging_callback(device_id: DeviceId, callback: Option<LoggingCallback>) -> Result<(), InvalidId> = "deviceSetLoggingCallback", ProcDeviceSetLoggingCallback;
        fn device_tick(device_id: DeviceId) -> Result<bool, InvalidId> = "deviceTick", ProcDeviceTick;
        fn device_validate_texture_descriptor(device_id: DeviceId, desc: &TextureDescriptor) -> Result<(), InvalidId> = "deviceValidateTextureDescriptor", ProcDeviceValidateTextureDescriptor;
        fn device_add_ref(id: DeviceId) -> Result<(), InvalidId> = "deviceAddRef", ProcDeviceAddRef;
        fn device_release(id: DeviceId) -> Result<(), InvalidId> = "deviceRelease", ProcDeviceRelease;
    }
    ExternalTexture {
        fn external_texture_destroy(external_texture_id: id::ExternalTextureId) -> Result<(), InvalidId> = "externalTextureDestroy", ProcExternalTextureDestroy;
        fn external_texture_expire(external_texture_id: id::ExternalTextureId) -> Result<(), InvalidId> = "externalTextureExpire", ProcExternalTextureExpire;
        fn external_texture_refresh(external_texture_id: id::ExternalTextureId) -> Result<(), InvalidId> = "externalTextureRefresh", ProcExternalTextureRefresh;
        fn external_texture_set_label(id: id::ExternalTextureId, label: &str) -> Result<(), InvalidId> = "externalTextureSetLabel", ProcExternalTextureSetLabel;
        fn external_texture_add_ref(id: id::ExternalTextureId) -> Result<(), InvalidId> = "externalTextureAddRef", ProcExternalTextureAddRef;
        fn external_texture_release(id: id::ExternalTextureId) -> Result<(), InvalidId> = "externalTextureRelease", ProcExternalTextureRelease;
    }
    Instance {
        fn instance_create_surface(instance_id: id::InstanceId, desc: &SurfaceDescriptor) -> Result<id::SurfaceId, InvalidId> = "instanceCreateSurface", ProcInstanceCreateSurface;
        fn instance_get_wgsl_language_features(instance_id: id::InstanceId) -> Result<SupportedWgslLanguageFeatures, InvalidId> = "instanceGetWGSLLanguageFeatures", ProcInstanceGetWgslLanguageFeatures;
        fn instance_has_wgsl_language_feature(instance_id: id::InstanceId, feature: WgslLanguageFeatureName) -> Result<bool, InvalidId> = "instanceHasWGSLLanguageFeature", ProcInstanceHasWgslLanguageFeature;
        fn instance_process_events(instance_id: id::InstanceId) -> Result<(), InvalidId> = "instanceProcessEvents", ProcInstanceProcessEvents;
        fn instance_request_adapter(instance_id: id::InstanceId, options: Option<&RequestAdapterOptions>, callback_info: RequestAdapterCallbackInfo) -> Result<FutureId, InvalidId> = "instanceRequestAdapter", ProcInstanceRequestAdapter;
        fn instance_wait_any(instance_id: id::InstanceId, futures: &mut [FutureWaitInfo], timeout_ns: u64) -> Result<WaitStatus, InvalidId> = "instanceWaitAny", ProcInstanceWaitAny;
        fn instance_add_ref(id: id::InstanceId) -> Result<(), InvalidId> = "instanceAddRef", ProcInstanceAddRef;
        fn instance_release(id: id::InstanceId) -> Result<(), InvalidId> = "instanceRelease", ProcInstanceRelease;
    }
    PipelineLayout {
        fn pipeline_layout_set_label(id: id::PipelineLayoutId, label: &str) -> Result<(), InvalidId> = "pipelineLayoutSetLabel", ProcPipelineLayoutSetLabel;
        fn pipeline_layout_add_ref(id: id::PipelineLayoutId) -> Result<(), InvalidId> = "pipelineLayoutAddRef", ProcPipelineLayoutAddRef;
        fn pipeline_layout_release(id: id::PipelineLayoutId) -> Result<(), InvalidId> = "pipelineLayoutRelease", ProcPipelineLayoutRelease;
    }
    QuerySet {
        fn query_set_destroy(query_set_id: id::QuerySetId) -> Result<(), InvalidId> = "querySetDestroy", ProcQuerySetDestroy;
        fn query_set_get_count(query_set_id: id::QuerySetId) -> Result<u32, InvalidId> = "querySetGetCount", ProcQuerySetGetCount;
        fn query_set_get_type(query_set_id: id::QuerySetId) -> Result<QueryType, InvalidId> = "querySetGetType", ProcQuerySetGetType;
        fn query_set_set_label(id: id::QuerySetId, label: &str) -> Result<(), InvalidId> = "querySetSetLabel", ProcQuerySetSetLabel;
        fn query_set_add_ref(id: id::QuerySetId) -> Result<(), InvalidId> = "querySetAddRef", ProcQuerySetAddRef;
        fn query_set_release(id: id::QuerySetId) -> Result<(), InvalidId> = "querySetRelease", ProcQuerySetRelease;
    }
    Queue {
        fn queue_copy_external_texture_for_browser(queue_id: id::QueueId, source: &ImageCopyExternalTexture, destination: &TexelCopyTextureInfo, copy_size: &Extent3d, options: &CopyTextureForBrowserOptions) -> Result<(), InvalidId> = "queueCopyExternalTextureForBrowser", ProcQueueCopyExternalTextureForBrowser;
        fn queue_copy_texture_for_browser(queue_id: id::QueueId, source: &TexelCopyTextureInfo, destination: &TexelCopyTextureInfo, copy_size: &Extent3d, options: &CopyTextureForBrowserOptions) -> Result<(), InvalidId> = "queueCopyTextureForBrowser", ProcQueueCopyTextureForBrowser;
        fn queue_on_submitted_work_done(queue_id: id::QueueId, callback_info: QueueWorkDoneCallbackInfo) -> Result<FutureId, InvalidId> = "queueOnSubmittedWorkDone", ProcQueueOnSubmittedWorkDone;
        fn queue_set_label(id: id::QueueId, label: &str) -> Result<(), InvalidId> = "queueSetLabel", ProcQueueSetLabel;
        fn queue_submit(queue_id: id::QueueId, command_buffers: &[id::CommandBufferId]) -> Result<(), InvalidId> = "queueSubmit", ProcQueueSubmit;
        fn queue_write_buffer(queue_id: id::QueueId, buffer_id: id::BufferId, offset: BufferAddress, data: &[u8]) -> Result<(), InvalidId> = "queueWriteBuffer", ProcQueueWriteBuffer;
        fn queue_write_texture(queue_id: id::QueueId, destination: &TexelCopyTextureInfo, data: &[u8], layout: &TexelCopyBufferLayout, size: &Extent3d) -> Result<(), InvalidId> = "queueWriteTexture", ProcQueueWriteTexture;
        fn queue_add_ref(id: id::QueueId) -> Result<(), InvalidId> = "queueAddRef", ProcQueueAddRef;
        fn queue_release(id: id::QueueId) -> Result<(), InvalidId> = "queueRelease", ProcQueueRelease;
    }
    RenderBundle {
        fn render_bundle_set_label(id: id::RenderBundleId, label: &str) -> Result<(), InvalidId> = "renderBundleSetLabel", ProcRenderBundleSetLabel;
        fn render_bundle_add_ref(id: id::RenderBundleId) -> Result<(), InvalidId> = "renderBundleAddRef", ProcRenderBundleAddRef;
        fn render_bundle_release(id: id::RenderBundleId) -> Result<(), InvalidId> = "renderBundleRelease", ProcRenderBundleRelease;
    }
    RenderBundleEncoder {
        fn render_bundle_encoder_draw(encoder_id: id::RenderBundleEncoderId, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) -> Result<(), InvalidId> = "renderBundleEncoderDraw", ProcRenderBundleEncoderDraw;
        fn render_bundle_encoder_draw_indexed(encoder_id: id::RenderBundleEncoderId, index_count: u32, instance_count: u32, first_index: u32, base_vertex: i32, first_instance: u32) -> Result<(), InvalidId> = "renderBundleEncoderDrawIndexed", ProcRenderBundleEncoderDrawIndexed;
        fn render_bundle_encoder_draw_indexed_indirect(encoder_id: id::RenderBundleEncoderId, indirect_buffer_id: id::BufferId, indirect_offset: BufferAddress) -> Result<(), InvalidId> = "renderBundleEncoderDrawIndexedIndirect", ProcRenderBundleEncoderDrawIndexedIndirect;
        fn render_bundle_encoder_draw_indirect(encoder_id: id::RenderBundleEncoderId, indirect_buffer_id: id::BufferId, indirect_offset: BufferAddress) -> Result<(), InvalidId> = "renderBundleEncoderDrawIndirect", ProcRenderBundleEncoderDrawIndirect;
        fn render_bundle_encoder_finish(encoder_id: id::RenderBundleEncoderId, desc: Option<&RenderBundleDescriptor>) -> Result<id::RenderBundleId, InvalidId> = "renderBundleEncoderFinish", ProcRenderBundleEncoderFinish;
        fn render_bundle_encoder_insert_debug_marker(encoder_id: id::RenderBundleEncoderId, marker: &str) -> Result<(), InvalidId> = "renderBundleEncoderInsertDebugMarker", ProcRenderBundleEncoderInsertDebugMarker;
        fn render_bundle_encoder_pop_debug_group(encoder_id: id::RenderBundleEncoderId) -> Result<(), InvalidId> = "renderBundleEncoderPopDebugGroup", ProcRenderBundleEncoderPopDebugGroup;
        fn render_bundle_encoder_push_debug_group(encoder_id: id::RenderBundleEncoderId, label: &str) -> Result<(), InvalidId> = "renderBundleEncoderPushDebugGroup", ProcRenderBundleEncoderPushDebugGroup;
        fn render_bundle_encoder_set_bind_group(encoder_id: id::RenderBundleEncoderId, index: u32, bind_group_id: Option<id::BindGroupId>, offsets: &[u32]) -> Result<(), InvalidId> = "renderBundleEncoderSetBindGroup", ProcRenderBundleEncoderSetBindGroup;
        fn render_bundle_encoder_set_immediates(encoder_id: id::RenderBundleEncoderId, offset: u32, data: &[u8]) -> Result<(), InvalidId> = "renderBundleEncoderSetImmediates", ProcRenderBundleEncoderSetImmediates;
        fn render_bundle_encoder_set_index_buffer(encoder_id: id::RenderBundleEncoderId, buffer_id: id::BufferId, format: IndexFormat, offset: BufferAddress, size: Option<BufferAddress>) -> Result<(), InvalidId> = "renderBundleEncoderSetIndexBuffer", ProcRenderBundleEncoderSetIndexBuffer;
        fn render_bundle_encoder_set_label(id: id::RenderBundleEncoderId, label: &str) -> Result<(), InvalidId> = "renderBundleEncoderSetLabel", ProcRenderBundleEncoderSetLabel;
        fn render_bundle_encoder_set_pipeline(encoder_id: id::RenderBundleEncoderId, pipeline_id: id::RenderPipelineId) -> Result<(), InvalidId> = "renderBundleEncoderSetPipeline", ProcRenderBundleEncoderSetPipeline;
        fn render_bundle_encoder_set_vertex_buffer(encoder_id: id::RenderBundleEncoderId, slot: u32, buffer_id: Option<id::BufferId>, offset: BufferAddress, size: Option<BufferAddress>) -> Result<(), InvalidId> = "renderBundleEncoderSetVertexBuffer", ProcRenderBundleEncoderSetVertexBuffer;
        fn render_bundle_encoder_add_ref(id: id::RenderBundleEncoderId) -> Result<(), InvalidId> = "renderBundleEncoderAddRef", ProcRenderBundleEncoderAddRef;
        fn render_bundle_encoder_release(id: id::RenderBundleEncoderId) -> Result<(), InvalidId> = "renderBundleEncoderRelease", ProcRenderBundleEncoderRelease;
    }
    RenderPassEncoder {
        fn render_pass_encoder_begin_occlusion_query(pass_id: id::RenderPassEncoderId, query_index: u32) -> Result<(), InvalidId> = "renderPassEncoderBeginOcclusionQuery", ProcRenderPassEncoderBeginOcclusionQuery;
        fn render_pass_encoder_draw(pass_id: id::RenderPassEncoderId, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) -> Result<(), InvalidId> = "renderPassEncoderDraw", ProcRenderPassEncoderDraw;
        fn render_pass_encoder_draw_indexed(pass_id: id::RenderPassEncoderId, index_count: u32, instance_count: u32, first_index: u32, base_vertex: i32, first_instance: u32) -> Result<(), InvalidId> = "renderPassEncoderDrawIndexed", ProcRenderPassEncoderDrawIndexed;
        fn render_pass_encoder_draw_indexed_indirect(pass_id: id::RenderPassEncoderId, indirect_buffer_id: id::BufferId, indirect_offset: BufferAddress) -> Result<(), InvalidId> = "renderPassEncoderDrawIndexedIndirect", ProcRenderPassEncoderDrawIndexedIndirect;
        fn render_pass_encoder_draw_indirect(pass_id: id::RenderPassEncoderId, indirect_buffer_id: id::BufferId, indirect_offset: BufferAddress) -> Result<(), InvalidId> = "renderPassEncoderDrawIndirect", ProcRenderPassEncoderDrawIndirect;
        fn render_pass_encoder_end(pass_id: id::RenderPassEncoderId) -> Result<(), InvalidId> = "renderPassEncoderEnd", ProcRenderPassEncoderEnd;
        fn render_pass_encoder_end_occlusion_query(pass_id: id::RenderPassEncoderId) -> Result<(), InvalidId> = "renderPassEncoderEndOcclusionQuery", ProcRenderPassEncoderEndOcclusionQuery;
        fn render_pass_encoder_execute_bundles(pass_id: id::RenderPassEncoderId, bundle_ids: &[id::RenderBundleId]) -> Result<(), InvalidId> = "renderPassEncoderExecuteBundles", ProcRenderPassEncoderExecuteBundles;
        fn render_pass_encoder_insert_debug_marker(pass_id: id::RenderPassEncoderId, marker: &str) -> Result<(), InvalidId> = "renderPassEncoderInsertDebugMarker", ProcRenderPassEncoderInsertDebugMarker;
        fn render_pass_encoder_multi_draw_indexed_indirect(pass_id: id::RenderPassEncoderId, indirect_buffer_id: id::BufferId, indirect_offset: BufferAddress, max_draw_count: u32, draw_count_buffer_id: Option<id::BufferId>, draw_count_buffer_offset: BufferAddress) -> Result<(), InvalidId> = "renderPassEncoderMultiDrawIndexedIndirect", ProcRenderPassEncoderMultiDrawIndexedIndirect;
        fn render_pass_encoder_multi_draw_indirect(pass_id: id::RenderPassEncoderId, indirect_buffer_id: id::BufferId, indirect_offset: BufferAddress, max_draw_count: u32, draw_count_buffer_id: Option<id::BufferId>, draw_count_buffer_offset: BufferAddress) -> Result<(), InvalidId> = "renderPassEncoderMultiDrawIndirect", ProcRenderPassEncoderMultiDrawIndirect;
        fn render_pass_encoder_pixel_local_storage_barrier(pass_id: id::RenderPassEncoderId) -> Result<(), InvalidId> = "renderPassEncoderPixelLocalStorageBarrier", ProcRenderPassEncoderPixelLocalStorageBarrier;
        fn render_pass_encoder_pop_debug_group(pass_id: id::RenderPassEncoderId) -> Result<(), InvalidId> = "renderPassEncoderPopDebugGroup", ProcRenderPassEncoderPopDebugGroup;
        fn render_pass_encoder_push_debug_group(pass_id: id::RenderPassEncoderId, label: &str) -> Result<(), InvalidId> = "renderPassEncoderPushDebugGroup", ProcRenderPassEncoderPushDebugGroup;
        fn render_pass_encoder_set_bind_group(pass_id: id::RenderPassEncoderId, index: u32, bind_group_id: Option<id::BindGroupId>, offsets: &[u32]) -> Result<(), InvalidId> = "renderPassEncoderSetBindGroup", ProcRenderPassEncoderSetBindGroup;
        fn render_pass_encoder_set_blend_constant(pass_id: id::RenderPassEncoderId, color: &Color) -> Result<(), InvalidId> = "renderPassEncoderSetBlendConstant", ProcRenderPassEncoderSetBlendConstant;
        fn render_pass_encoder_set_immediates(pass_id: id::RenderPassEncoderId, offset: u32, data: &[u8]) -> Result<(), InvalidId> = "renderPassEncoderSetImmediates", ProcRenderPassEncoderSetImmediates;
        fn render_pass_encoder_set_index_buffer(pass_id: id::RenderPassEncoderId, buffer_id: id::BufferId, format: IndexFormat, offset: BufferAddress, size: Option<BufferAddress>) -> Result<(), InvalidId> = "renderPassEncoderSetIndexBuffer", ProcRenderPassEncoderSetIndexBuffer;
        fn render_pass_encoder_set_label(id: id::RenderPassEncoderId, label: &str) -> Result<(), InvalidId> = "renderPassEncoderSetLabel", ProcRenderPassEncoderSetLabel;
        fn render_pass_encoder_set_pipeline(pass_id: id::RenderPassEncoderId, pipeline_id: id::RenderPipelineId) -> Result<(), InvalidId> = "renderPassEncoderSetPipeline", ProcRenderPassEncoderSetPipeline;
        fn render_pass_encoder_set_scissor_rect(pass_id: id::RenderPassEncoderId, x: u32, y: u32, w: u32, h: u32) -> Result<(), InvalidId> = "renderPassEncoderSetScissorRect", ProcRenderPassEncoderSetScissorRect;
        fn render_pass_encoder_set_stencil_reference(pass_id: id::RenderPassEncoderId, reference: u32) -> Result<(), InvalidId> = "renderPassEncoderSetStencilReference", ProcRenderPassEncoderSetStencilReference;
        fn render_pass_encoder_set_vertex_buffer(pass_id: id::RenderPassEncoderId, slot: u32, buffer_id: Option<id::BufferId>, offset: BufferAddress, size: Option<BufferAddress>) -> Result<(), InvalidId> = "renderPassEncoderSetVertexBuffer", ProcRenderPassEncoderSetVertexBuffer;
        fn render_pass_encoder_set_viewport(pass_id: id::RenderPassEncoderId, x: f32, y: f32, w: f32, h: f32, min_depth: f32, max_depth: f32) -> Result<(), InvalidId> = "renderPassEncoderSetViewport", ProcRenderPassEncoderSetViewport;
        fn render_pass_encoder_write_timestamp(pass_id: id::RenderPassEncoderId, query_set_id: id::QuerySetId, query_index: u32) -> Result<(), InvalidId> = "renderPassEncoderWriteTimestamp", ProcRenderPassEncoderWriteTimestamp;
        fn render_pass_encoder_add_ref(id: id::RenderPassEncoderId) -> Result<(), InvalidId> = "renderPassEncoderAddRef", ProcRenderPassEncoderAddRef;
        fn render_pass_encoder_release(id: id::RenderPassEncoderId) -> Result<(), InvalidId> = "renderPassEncoderRelease", ProcRenderPassEncoderRelease;
    }
    RenderPipeline {
        fn render_pipeline_get_bind_group_layout(pipeline_id: id::RenderPipelineId, index: u32) -> Result<id::BindGroupLayoutId, InvalidId> = "renderPipelineGetBindGroupLayout", ProcRenderPipelineGetBindGroupLayout;
        fn render_pipeline_set_label(id: id::RenderPipelineId, label: &str) -> Result<(), InvalidId> = "renderPipelineSetLabel", ProcRenderPipelineSetLabel;
        fn render_pipeline_add_ref(id: id::RenderPipelineId) -> Result<(), InvalidId> = "renderPipelineAddRef", ProcRenderPipelineAddRef;
        fn render_pipeline_release(id: id::RenderPipelineId) -> Result<(), InvalidId> = "renderPipelineRelease", ProcRenderPipelineRelease;
    }
    ResourceTable {
        fn resource_table_destroy(resource_table_id: id::ResourceTableId) -> Result<(), InvalidId> = "resourceTableDestroy", ProcResourceTableDestroy;
        fn resource_table_get_size(resource_table_id: id::ResourceTableId) -> Result<u32, InvalidId> = "resourceTableGetSize", ProcResourceTableGetSize;
        fn resource_table_insert_binding(resource_table_id: id::ResourceTableId, resource: &BindingResource) -> Result<u32, ResourceTableError> = "resourceTableInsertBinding", ProcResourceTableInsertBinding;
        fn resource_table_remove_binding(resource_table_id: id::ResourceTableId, slot: u32) -> Result<(), ResourceTableError> = "resourceTableRemoveBinding", ProcResourceTableRemoveBinding;
        fn resource_table_update(resource_table_id: id::ResourceTableId, slot: u32, resource: &BindingResource) -> Result<(), ResourceTableError> = "resourceTableUpdate", ProcResourceTableUpdate;
        fn resource_table_add_ref(id: id::ResourceTableId) -> Result<(), InvalidId> = "resourceTableAddRef", ProcResourceTableAddRef;
        fn resource_table_release(id: id::ResourceTableId) -> Result<(), InvalidId> = "resourceTableRelease", ProcResourceTableRelease;
    }
    Sampler {
        fn sampler_set_label(id: id::SamplerId, label: &str) -> Result<(), InvalidId> = "samplerSetLabel", ProcSamplerSetLabel;
        fn sampler_add_ref(id: id::SamplerId) -> Result<(), InvalidId> = "samplerAddRef", ProcSamplerAddRef;
        fn sampler_release(id: id::SamplerId) -> Result<(), InvalidId> = "samplerRelease", ProcSamplerRelease;
    }
    ShaderModule {
        fn shader_module_get_compilation_info(shader_module_id: id::ShaderModuleId, callback_info: CompilationInfoCallbackInfo) -> Result<FutureId, InvalidId> = "shaderModuleGetCompilationInfo", ProcShaderModuleGetCompilationInfo;
        fn shader_module_set_label(id: id::ShaderModuleId, label: &str) -> Result<(), InvalidId> = "shaderModuleSetLabel", ProcShaderModuleSetLabel;
        fn shader_module_add_ref(id: id::ShaderModuleId) -> Result<(), InvalidId> = "shaderModuleAddRef", ProcShaderModuleAddRef;
        fn shader_module_release(id: id::ShaderModuleId) -> Result<(), InvalidId> = "shaderModuleRelease", ProcShaderModuleRelease;
    }
    SharedBufferMemory {
        fn shared_buffer_memory_begin_access(memory_id: id::SharedBufferMemoryId, buffer_id: id::BufferId, desc: &BeginAccessState) -> Result<(), SharedMemoryError> = "sharedBufferMemoryBeginAccess", ProcSharedBufferMemoryBeginAccess;
        fn shared_buffer_memory_create_buffer(memory_id: id::SharedBufferMemoryId, desc: Option<&BufferDescriptor>) -> Result<id::BufferId, InvalidId> = "sharedBufferMemoryCreateBuffer", ProcSharedBufferMemoryCreateBuffer;
        fn shared_buffer_memory_end_access(memory_id: id::SharedBufferMemoryId, buffer_id: id::BufferId) -> Result<EndAccessState, SharedMemoryError> = "sharedBufferMemoryEndAccess", ProcSharedBufferMemoryEndAccess;
        fn shared_buffer_memory_get_properties(memory_id: id::SharedBufferMemoryId) -> Result<SharedBufferMemoryProperties, InvalidId> = "sharedBufferMemoryGetProperties", ProcSharedBufferMemoryGetProperties;
        fn shared_buffer_memory_is_device_lost(memory_id: id::SharedBufferMemoryId) -> Result<bool, InvalidId> = "sharedBufferMemoryIsDeviceLost", ProcSharedBufferMemoryIsDeviceLost;
        fn shared_buffer_memory_set_label(id: id::SharedBufferMemoryId, label: &str) -> Result<(), InvalidId> = "sharedBufferMemorySetLabel", ProcSharedBufferMemorySetLabel;
        fn shared_buffer_memory_add_ref(id: id::SharedBufferMemoryId) -> Result<(), InvalidId> = "sharedBufferMemoryAddRef", ProcSharedBufferMemoryAddRef;
        fn shared_buffer_memory_release(id: id::SharedBufferMemoryId) -> Result<(), InvalidId> = "sharedBufferMemoryRelease", ProcSharedBufferMemoryRelease;
    }
    SharedBufferMemoryEndAccessState {
        fn shared_buffer_memory_end_access_state_free_members(state: EndAccessState) = "sharedBufferMemoryEndAccessStateFreeMembers", ProcSharedBufferMemoryEndAccessStateFreeMembers;
    }
    SharedFence {
        fn shared_fence_export_info(fence_id: id::SharedFenceId) -> Result<SharedFenceExportInfo, InvalidId> = "sharedFenceExportInfo", ProcSharedFenceExportInfo;
        fn shared_fence_add_ref(id: id::SharedFenceId) -> Result<(), InvalidId> = "sharedFenceAddRef", ProcSharedFenceAddRef;
        fn shared_fence_release(id: id::SharedFenceId) -> Result<(), InvalidId> = "sharedFenceRelease", ProcSharedFenceRelease;
    }
    SharedTextureMemory {
        fn shared_texture_memory_begin_access(memory_id: id::SharedTextureMemoryId, texture_id: id::TextureId, desc: &BeginAccessState) -> Result<(), SharedMemoryError> = "sharedTextureMemoryBeginAccess", ProcSharedTextureMemoryBeginAccess;
        fn shared_texture_memory_create_texture(memory_id: id::SharedTextureMemoryId, desc: Option<&TextureDescriptor>) -> Result<id::TextureId, InvalidId> = "sharedTextureMemoryCreateTexture", ProcSharedTextureMemoryCreateTexture;
        fn shared_texture_memory_end_access(memory_id: id::SharedTextureMemoryId, texture_id: id::TextureId) -> Result<EndAccessState, SharedMemoryError> = "sharedTextureMemoryEndAccess", ProcSharedTextureMemoryEndAccess;
        fn shared_texture_memory_get_properties(memory_id: id::SharedTextureMemoryId) -> Result<SharedTextureMemoryProperties, InvalidId> = "sharedTextureMemoryGetProperties", ProcSharedTextureMemoryGetProperties;
        fn shared_texture_memory_is_device_lost(memory_id: id::SharedTextureMemoryId) -> Result<bool, InvalidId> = "sharedTextureMemoryIsDeviceLost", ProcSharedTextureMemoryIsDeviceLost;
        fn shared_texture_memory_set_label(id: id::SharedTextureMemoryId, label: &str) -> Result<(), InvalidId> = "sharedTextureMemorySetLabel", ProcSharedTextureMemorySetLabel;
        fn shared_texture_memory_add_ref(id: id::SharedTextureMemoryId) -> Result<(), InvalidId> = "sharedTextureMemoryAddRef", ProcSharedTextureMemoryAddRef;
        fn shared_texture_memory_release(id: id::SharedTextureMemoryId) -> Result<(), InvalidId> = "sharedTextureMemoryRelease", ProcSharedTextureMemoryRelease;
    }
    SharedTextureMemoryEndAccessState {
        fn shared_texture_memory_end_access_state_free_members(state: EndAccessState) = "sharedTextureMemoryEndAccessStateFreeMembers", ProcSharedTextureMemoryEndAccessStateFreeMembers;
    }
    SupportedFeatures {
        fn supported_features_free_members(value: SupportedFeatures) = "supportedFeaturesFreeMembers", ProcSupportedFeaturesFreeMembers;
    }
    SupportedInstanceFeatures {
        fn supported_instance_features_free_members(value: SupportedInstanceFeatures) = "supportedInstanceFeaturesFreeMembers", ProcSupportedInstanceFeaturesFreeMembers;
    }
    SupportedWgslLanguageFeatures {
        fn supported_wgsl_language_features_free_members(value: SupportedWgslLanguageFeatures) = "supportedWGSLLanguageFeaturesFreeMembers", ProcSupportedWgslLanguageFeaturesFreeMembers;
    }
    Surface {
        fn surface_configure(surface_id: id::SurfaceId, config: &SurfaceConfiguration) -> Result<(), ConfigureSurfaceError> = "surfaceConfigure", ProcSurfaceConfigure;
        fn surface_get_capabilities(surface_id: id::SurfaceId, adapter_id: AdapterId) -> Result<SurfaceCapabilities, InvalidId> = "surfaceGetCapabilities", ProcSurfaceGetCapabilities;
        fn surface_get_current_texture(surface_id: id::SurfaceId) -> Result<SurfaceOutput, InvalidId> = "surfaceGetCurrentTexture", ProcSurfaceGetCurrentTexture;
        fn surface_present(surface_id: id::SurfaceId) -> Result<(), SurfaceError> = "surfacePresent", ProcSurfacePresent;
        fn surface_set_label(id: id::SurfaceId, label: &str) -> Result<(), InvalidId> = "surfaceSetLabel", ProcSurfaceSetLabel;
        fn surface_unconfigure(surface_id: id::SurfaceId) -> Result<(), InvalidId> = "surfaceUnconfigure", ProcSurfaceUnconfigure;
        fn surface_add_ref(id: id::SurfaceId) -> Result<(), InvalidId> = "surfaceAddRef", ProcSurfaceAddRef;
        fn surface_release(id: id::SurfaceId) -> Result<(), InvalidId> = "surfaceRelease", ProcSurfaceRelease;
    }
    SurfaceCapabilities {
        fn surface_capabilities_free_members(value: SurfaceCapabilities) = "surfaceCapabilitiesFreeMembers", ProcSurfaceCapabilitiesFreeMembers;
    }
    TexelBufferView {
        fn texel_buffer_view_set_label(id: id::TexelBufferViewId, label: &str) -> Result<(), InvalidId> = "texelBufferViewSetLabel", ProcTexelBufferViewSetLabel;
        fn texel_buffer_view_add_ref(id: id::TexelBufferViewId) -> Result<(), InvalidId> = "texelBufferViewAddRef", ProcTexelBufferViewAddRef;
        fn texel_buffer_view_release(id: id::TexelBufferViewId) -> Result<(), InvalidId> = "texelBufferViewRelease", ProcTexelBufferViewRelease;
    }
    Texture {
        fn texture_create_error_view(texture_id: id::TextureId, desc: Option<&TextureViewDescriptor>) -> Result<id::TextureViewId, InvalidId> = "textureCreateErrorView", ProcTextureCreateErrorView;
        fn texture_create_view(texture_id: id::TextureId, desc: Option<&TextureViewDescriptor>) -> Result<id::TextureViewId, InvalidId> = "textureCreateView", ProcTextureCreateView;
        fn texture_destroy(texture_id: id::TextureId) -> Result<(), InvalidId> = "textureDestroy", ProcTextureDestroy;
        fn texture_get_depth_or_array_layers(texture_id: id::TextureId) -> Result<u32, InvalidId> = "textureGetDepthOrArrayLayers", ProcTextureGetDepthOrArrayLayers;
        fn texture_get_dimension(texture_id: id::TextureId) -> Result<TextureDimension, InvalidId> = "textureGetDimension", ProcTextureGetDimension;
        fn texture_get_format(texture_id: id::TextureId) -> Result<TextureFormat, InvalidId> = "textureGetFormat", ProcTextureGetFormat;
        fn texture_get_height(texture_id: id::TextureId) -> Result<u32, InvalidId> = "textureGetHeight", ProcTextureGetHeight;
        fn texture_get_mip_level_count(texture_id: id::TextureId) -> Result<u32, InvalidId> = "textureGetMipLevelCount", ProcTextureGetMipLevelCount;
        fn texture_get_sample_count(texture_id: id::TextureId) -> Result<u32, InvalidId> = "textureGetSampleCount", ProcTextureGetSampleCount;
        fn texture_get_texture_binding_view_dimension(texture_id: id::TextureId) -> Result<TextureViewDimension, InvalidId> = "textureGetTextureBindingViewDimension", ProcTextureGetTextureBindingViewDimension;
        fn texture_get_usage(texture_id: id::TextureId) -> Result<TextureUsages, InvalidId> = "textureGetUsage", ProcTextureGetUsage;
        fn texture_get_width(texture_id: id::TextureId) -> Result<u32, InvalidId> = "textureGetWidth", ProcTextureGetWidth;
        fn texture_pin(texture_id: id::TextureId, usage: TextureUsages) -> Result<(), InvalidId> = "texturePin", ProcTexturePin;
        fn texture_set_label(id: id::TextureId, label: &str) -> Result<(), InvalidId> = "textureSetLabel", ProcTextureSetLabel;
        fn texture_set_ownership_for_memory_dump(texture_id: id::TextureId, owner_guid: u64) -> Result<(), InvalidId> = "textureSetOwnershipForMemoryDump", ProcTextureSetOwnershipForMemoryDump;
        fn texture_unpin(texture_id: id::TextureId) -> Result<(), InvalidId> = "textureUnpin", ProcTextureUnpin;
        fn texture_add_ref(id: id::TextureId) -> Result<(), InvalidId> = "textureAddRef", ProcTextureAddRef;
        fn texture_release(id: id::TextureId) -> Result<(), InvalidId> = "textureRelease", ProcTextureRelease;
    }
    TextureView {
        fn texture_view_set_label(id: id::TextureViewId, label: &str) -> Result<(), InvalidId> = "textureViewSetLabel", ProcTextureViewSetLabel;
        fn texture_view_add_ref(id: id::TextureViewId) -> Result<(), InvalidId> = "textureViewAddRef", ProcTextureViewAddRef;
        fn texture_view_release(id: id::TextureViewId) -> Result<(), InvalidId> = "textureViewRelease", ProcTextureViewRelease;
    }
    }
}

static NULL_PROCS: ProcTable = ProcTable::populated::<Null>();
static EMPTY_PROCS: ProcTable = ProcTable::populated::<Empty>();
static UNPOPULATED: ProcTable = ProcTable::EMPTY;

static INSTALLED: OnceCell<&'static ProcTable> = OnceCell::new();

static BY_NAME: Lazy<FastHashMap<&'static str, &'static EntryPoint>> = Lazy::new(|| {
    let mut map = FastHashMap::default();

    for entry in ENTRY_POINTS {
        match map.entry(entry.name) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
            Entry::Occupied(_) => log::error!("Duplicate entry point {}", entry.name),
        }
    }

    map
});

impl ProcTable {
    /// The populated table of backend `A`.
    pub fn new<A: Api>() -> &'static ProcTable {
        profiling::scope!("ProcTable::new");
        Self::from_backend(A::VARIANT)
    }

    /// The populated table of `backend`.
    pub fn from_backend(backend: Backend) -> &'static ProcTable {
        match backend {
            Backend::Null => &NULL_PROCS,
            Backend::Empty => &EMPTY_PROCS,
        }
    }

    /// The populated table of the backend named `name`.
    pub fn try_from_backend(name: &str) -> Result<&'static ProcTable, UnknownBackend> {
        Ok(Self::from_backend(name.parse()?))
    }

    /// The table of the backend selected by the `PROCS_BACKEND` environment
    /// variable, if any.
    pub fn from_env() -> Option<&'static ProcTable> {
        profiling::scope!("ProcTable::from_env");
        let backend = Backend::from_env()?;
        log::debug!("Using the {backend} procedure table");
        Some(Self::from_backend(backend))
    }

    /// The backend the table was populated for, if any.
    ///
    /// Tables built with struct-update syntax keep the backend of the table
    /// they were built from.
    pub fn backend(&self) -> Option<Backend> {
        self.backend
    }

    /// Entry points whose slot is not populated.
    pub fn missing(&self) -> impl Iterator<Item = &'static EntryPoint> {
        let slots = self.slots();
        ENTRY_POINTS
            .iter()
            .filter(move |entry| !slots[entry.index])
    }

    /// Check that every slot is populated.
    pub fn validate(&self) -> Result<(), MissingProcs> {
        let names = self.missing().map(|entry| entry.name).collect::<Vec<_>>();

        if names.is_empty() {
            Ok(())
        } else {
            Err(MissingProcs { names })
        }
    }

    /// Returns `true` if the slot of the entry point `name` is populated.
    ///
    /// `name` is looked up like in [`get_proc_address`].
    pub fn is_populated(&self, name: &str) -> bool {
        match get_proc_address(name) {
            Some(entry) => self.slots()[entry.index],
            None => false,
        }
    }
}

impl Default for ProcTable {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for ProcTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let populated = self.slots().iter().filter(|&&slot| slot).count();

        f.debug_struct("ProcTable")
            .field("backend", &self.backend)
            .field("populated", &populated)
            .field("count", &ENTRY_POINT_COUNT)
            .finish()
    }
}

/// Tables are compared by address.
impl PartialEq for ProcTable {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other)
    }
}

impl Eq for ProcTable {}

#[cfg(feature = "serde")]
impl serde::Serialize for ProcTable {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serde::Serialize::serialize(&self.backend, serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for &'static ProcTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let backend = <Option<Backend>>::deserialize(deserializer)?;
        Ok(backend.map_or(&UNPOPULATED, ProcTable::from_backend))
    }
}

/// Look up an entry point by name.
///
/// `name` may be the C table name (`bufferGetSize`), the exported symbol
/// (`wgpuBufferGetSize`) or the slot name (`buffer_get_size`).
pub fn get_proc_address(name: &str) -> Option<&'static EntryPoint> {
    let snake = name.to_snake_case();
    let snake = snake.strip_prefix("wgpu_").unwrap_or(&snake);
    BY_NAME.get(snake).copied()
}

impl Global {
    pub fn get_proc_address(&self, name: &str) -> Option<&'static EntryPoint> {
        get_proc_address(name)
    }
}

/// Install `table` as the process-wide procedure table.
///
/// The table must be fully populated, and only one table can ever be
/// installed.
pub fn set_proc_table(table: &'static ProcTable) -> Result<(), InstallProcTableError> {
    table.validate()?;

    INSTALLED
        .set(table)
        .map_err(|_| InstallProcTableError::AlreadyInstalled)?;

    log::info!("Installed procedure table {:?}", table.backend());
    Ok(())
}

/// The process-wide procedure table, if one was installed.
pub fn proc_table() -> Option<&'static ProcTable> {
    INSTALLED.get().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(ProcTable: Send, Sync, Clone);
    static_assertions::assert_not_impl_any!(ProcTable: Copy);

    #[test]
    fn entry_points_are_complete() {
        assert_eq!(ENTRY_POINTS.len(), 273);
        assert_eq!(BY_NAME.len(), ENTRY_POINTS.len());

        for (index, entry) in ENTRY_POINTS.iter().enumerate() {
            assert_eq!(entry.index, index);
            assert_eq!(entry.proc_name.to_snake_case(), entry.name);
        }
    }

    #[test]
    fn ref_counting_comes_last() {
        let mut groups = Vec::<(Group, Vec<&EntryPoint>)>::new();

        for entry in ENTRY_POINTS {
            match groups.last_mut() {
                Some((group, entries)) if *group == entry.group => entries.push(entry),
                _ => groups.push((entry.group, vec![entry])),
            }
        }

        // Each group is contiguous.
        for (index, (group, _)) in groups.iter().enumerate() {
            assert!(
                groups[index + 1..].iter().all(|(other, _)| other != group),
                "{group:?} is split"
            );
        }

        for (group, entries) in &groups {
            let first = entries
                .iter()
                .position(|entry| entry.is_ref_counting())
                .unwrap_or(entries.len());

            assert!(
                entries[first..].iter().all(|entry| entry.is_ref_counting()),
                "{group:?} has entry points after its reference counting"
            );

            if first < entries.len() {
                assert!(entries[first].name.ends_with("_add_ref"));
                assert!(entries[entries.len() - 1].name.ends_with("_release"));
            }
        }
    }

    #[test]
    fn empty_table_is_unpopulated() {
        static TABLE: ProcTable = ProcTable::EMPTY;

        assert_eq!(TABLE.backend(), None);
        assert_eq!(TABLE.missing().count(), ENTRY_POINT_COUNT);
        assert!(!TABLE.is_populated("bufferGetSize"));

        let err = TABLE.validate().unwrap_err();
        assert_eq!(err.names.first(), Some(&"create_instance"));
        assert_eq!(err.names.last(), Some(&"texture_view_release"));
    }

    #[test]
    fn populated_tables() {
        for backend in [Backend::Null, Backend::Empty] {
            let table = ProcTable::from_backend(backend);
            assert_eq!(table.validate(), Ok(()));
            assert_eq!(table.backend(), Some(backend));
            assert_eq!(ProcTable::try_from_backend(backend.to_str()), Ok(table));
        }

        assert_eq!(ProcTable::new::<Null>(), ProcTable::new::<Null>());
        assert_ne!(ProcTable::new::<Null>(), ProcTable::new::<Empty>());
        assert!(ProcTable::try_from_backend("vulkan").is_err());
    }

    #[test]
    fn lookup_by_any_name() {
        let entry = get_proc_address("bufferGetSize").unwrap();
        assert_eq!(entry.name, "buffer_get_size");
        assert_eq!(entry.group, Group::Buffer);
        assert_eq!(entry.symbol(), "wgpuBufferGetSize");

        assert_eq!(get_proc_address("wgpuBufferGetSize"), Some(entry));
        assert_eq!(get_proc_address("buffer_get_size"), Some(entry));

        let entry = get_proc_address("wgpuInstanceGetWGSLLanguageFeatures").unwrap();
        assert_eq!(entry.proc_name, "instanceGetWGSLLanguageFeatures");

        let entry = get_proc_address("deviceGetAHardwareBufferProperties").unwrap();
        assert_eq!(entry.name, "device_get_a_hardware_buffer_properties");

        assert_eq!(get_proc_address("bufferGetSizes"), None);
    }

    #[test]
    fn interpose_one_slot() {
        fn size(_: &Global, _: id::BufferId) -> Result<BufferAddress, InvalidId> {
            Ok(42)
        }

        let table = ProcTable {
            buffer_get_size: Some(size),
            ..ProcTable::new::<Null>().clone()
        };

        let global = Global::new();
        assert_eq!(table.buffer_get_size(&global, id::BufferId::zip(0, 1)), Ok(42));
        assert!(table.validate().is_ok());
        assert_ne!(&table, ProcTable::new::<Null>());
    }

    #[test]
    #[should_panic(expected = "`bufferGetSize` is not populated")]
    fn calling_unpopulated_slot_panics() {
        let global = Global::new();
        let _ = ProcTable::EMPTY.buffer_get_size(&global, id::BufferId::zip(0, 1));
    }
}

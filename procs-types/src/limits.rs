//! Resource limits, adapter information and format capabilities.

use crate::{AdapterType, BackendType, HeapProperty, SubgroupMatrixComponentType};

/// Whether a limit is better when larger or when smaller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LimitDirection {
    /// Larger values are more capable, e.g. `max_bind_groups`.
    Maximum,
    /// Smaller values are more capable, e.g. alignments.
    Minimum,
}

macro_rules! limits {
    ($(
        $(#[doc = $doc:literal])*
        $name:ident: $ty:ty = $default:expr, $direction:ident;
    )*) => {
        /// Resource limits of an adapter or device.
        ///
        /// [`Limits::default`] is the set every conformant implementation
        /// supports.
        #[repr(C)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
        pub struct Limits {
            $(
                $(#[doc = $doc])*
                pub $name: $ty,
            )*
        }

        impl Default for Limits {
            fn default() -> Self {
                Self {
                    $($name: $default,)*
                }
            }
        }

        impl Limits {
            /// Compare every limit in `self` against `allowed`, calling
            /// `fail_fn` with the name, requested and allowed value of each
            /// limit that is better than what is allowed.
            ///
            /// If `fatal` is set, stop at the first failure.
            pub fn check_limits_with_fail_fn(
                &self,
                allowed: &Limits,
                fatal: bool,
                mut fail_fn: impl FnMut(&'static str, u64, u64),
            ) {
                $(
                    let requested = self.$name as u64;
                    let limit = allowed.$name as u64;

                    let failed = match LimitDirection::$direction {
                        LimitDirection::Maximum => requested > limit,
                        LimitDirection::Minimum => requested < limit,
                    };

                    if failed {
                        fail_fn(stringify!($name), requested, limit);

                        if fatal {
                            return;
                        }
                    }
                )*
            }

            /// Returns `true` if every limit in `self` is within `allowed`.
            pub fn check_limits(&self, allowed: &Limits) -> bool {
                let mut within = true;
                self.check_limits_with_fail_fn(allowed, true, |_, _, _| within = false);
                within
            }
        }
    };
}

limits! {
    /// Largest width of a 1D texture.
    max_texture_dimension_1d: u32 = 8192, Maximum;
    /// Largest width or height of a 2D texture.
    max_texture_dimension_2d: u32 = 8192, Maximum;
    /// Largest width, height or depth of a 3D texture.
    max_texture_dimension_3d: u32 = 2048, Maximum;
    /// Largest number of array layers of a texture.
    max_texture_array_layers: u32 = 256, Maximum;
    max_bind_groups: u32 = 4, Maximum;
    max_bind_groups_plus_vertex_buffers: u32 = 24, Maximum;
    max_bindings_per_bind_group: u32 = 1000, Maximum;
    max_dynamic_uniform_buffers_per_pipeline_layout: u32 = 8, Maximum;
    max_dynamic_storage_buffers_per_pipeline_layout: u32 = 4, Maximum;
    max_sampled_textures_per_shader_stage: u32 = 16, Maximum;
    max_samplers_per_shader_stage: u32 = 16, Maximum;
    max_storage_buffers_per_shader_stage: u32 = 8, Maximum;
    max_storage_textures_per_shader_stage: u32 = 4, Maximum;
    max_uniform_buffers_per_shader_stage: u32 = 12, Maximum;
    max_uniform_buffer_binding_size: u64 = 64 << 10, Maximum;
    max_storage_buffer_binding_size: u64 = 128 << 20, Maximum;
    /// Required alignment of dynamic uniform buffer offsets.
    min_uniform_buffer_offset_alignment: u32 = 256, Minimum;
    /// Required alignment of dynamic storage buffer offsets.
    min_storage_buffer_offset_alignment: u32 = 256, Minimum;
    max_vertex_buffers: u32 = 8, Maximum;
    /// Largest size of a single buffer.
    max_buffer_size: u64 = 256 << 20, Maximum;
    max_vertex_attributes: u32 = 16, Maximum;
    max_vertex_buffer_array_stride: u32 = 2048, Maximum;
    max_inter_stage_shader_variables: u32 = 16, Maximum;
    max_color_attachments: u32 = 8, Maximum;
    max_color_attachment_bytes_per_sample: u32 = 32, Maximum;
    max_compute_workgroup_storage_size: u32 = 16384, Maximum;
    max_compute_invocations_per_workgroup: u32 = 256, Maximum;
    max_compute_workgroup_size_x: u32 = 256, Maximum;
    max_compute_workgroup_size_y: u32 = 256, Maximum;
    max_compute_workgroup_size_z: u32 = 64, Maximum;
    max_compute_workgroups_per_dimension: u32 = 65535, Maximum;
    /// Largest amount of immediate data set on a pass or bundle.
    max_immediate_size: u32 = 64, Maximum;
}

/// Limits of an instance.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceLimits {
    /// Largest number of futures accepted by a timed `instance_wait_any`.
    pub timed_wait_any_max_count: usize,
}

impl Default for InstanceLimits {
    fn default() -> Self {
        Self {
            timed_wait_any_max_count: 0,
        }
    }
}

/// One memory heap of an adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub struct MemoryHeapInfo {
    pub properties: HeapProperty,
    pub size: u64,
}

/// Memory heaps reported with adapter info.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub struct AdapterPropertiesMemoryHeaps {
    pub heaps: Vec<MemoryHeapInfo>,
}

/// One supported subgroup matrix shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub struct SubgroupMatrixConfig {
    pub component_type: SubgroupMatrixComponentType,
    pub result_component_type: SubgroupMatrixComponentType,
    pub m: u32,
    pub n: u32,
    pub k: u32,
}

/// Subgroup matrix shapes reported with adapter info.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub struct AdapterPropertiesSubgroupMatrixConfigs {
    pub configs: Vec<SubgroupMatrixConfig>,
}

/// Information about an adapter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdapterInfo {
    /// Vendor name.
    pub vendor: String,
    /// Architecture name.
    pub architecture: String,
    /// Device name.
    pub device: String,
    /// Driver description.
    pub description: String,
    /// API the adapter is implemented on.
    pub backend_type: BackendType,
    /// Type of device.
    pub adapter_type: AdapterType,
    /// PCI vendor id, or zero.
    pub vendor_id: u32,
    /// PCI device id, or zero.
    pub device_id: u32,
    /// Smallest subgroup size.
    pub subgroup_min_size: u32,
    /// Largest subgroup size.
    pub subgroup_max_size: u32,
    /// Present if the adapter supports `AdapterPropertiesMemoryHeaps`.
    pub memory_heaps: Option<AdapterPropertiesMemoryHeaps>,
    /// Present if the adapter supports `SubgroupMatrix`.
    pub subgroup_matrix_configs: Option<AdapterPropertiesSubgroupMatrixConfigs>,
}

/// One DRM format modifier supported for a format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub struct DrmFormatProperties {
    pub modifier: u64,
    pub modifier_plane_count: u32,
}

/// DRM format modifiers supported for a format.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub struct DrmFormatCapabilities {
    pub properties: Vec<DrmFormatProperties>,
}

/// Capabilities of an adapter for one texture format.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormatCapabilities {
    /// Present if the adapter supports `DawnDrmFormatCapabilities`.
    pub drm: Option<DrmFormatCapabilities>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_limits_compare_inverted() {
        let allowed = Limits::default();

        let mut requested = Limits::default();
        requested.min_uniform_buffer_offset_alignment = 512;
        assert!(requested.check_limits(&allowed));

        requested.min_uniform_buffer_offset_alignment = 64;
        assert!(!requested.check_limits(&allowed));
    }

    #[test]
    fn collects_every_failure_when_not_fatal() {
        let allowed = Limits::default();
        let mut requested = Limits::default();
        requested.max_bind_groups = 8;
        requested.max_buffer_size = u64::MAX;

        let mut failed = Vec::new();
        requested.check_limits_with_fail_fn(&allowed, false, |name, requested, allowed| {
            failed.push((name, requested, allowed));
        });

        assert_eq!(
            failed,
            [
                ("max_bind_groups", 8, 4),
                ("max_buffer_size", u64::MAX, 256 << 20)
            ]
        );
    }
}

//! Backends that can populate a procedure table.
//!
//! A backend is a zero-sized type implementing [`Api`]. The only generic
//! entry points are the instance-less ones; an instance created through them
//! captures an [`ApiInfo`] snapshot of its backend, and everything created
//! from that instance consults the snapshot at runtime.

use pt::{
    AdapterInfo, AdapterPropertiesMemoryHeaps, AdapterPropertiesSubgroupMatrixConfigs,
    AdapterType, Backend, BackendType, CompositeAlphaMode, DrmFormatCapabilities,
    DrmFormatProperties, FeatureName, FormatCapabilities, HeapProperty, InstanceFeatureName,
    InstanceLimits, Limits, MemoryHeapInfo, PresentMode, SubgroupMatrixComponentType,
    SubgroupMatrixConfig, SupportedFeatures, SupportedInstanceFeatures,
    SupportedWgslLanguageFeatures, SurfaceCapabilities, TextureFormat, TextureUsages,
    WgslLanguageFeatureName,
};

/// Static description of a backend.
pub trait Api: 'static + Sized + Send + Sync {
    const VARIANT: Backend;

    /// Instance features the backend supports.
    fn instance_features() -> SupportedInstanceFeatures;

    /// Best instance limits the backend supports.
    fn instance_limits() -> InstanceLimits;

    /// WGSL language extensions the backend supports.
    fn wgsl_language_features() -> SupportedWgslLanguageFeatures;

    /// Adapters exposed by the backend, most preferred first.
    fn enumerate_adapters() -> Vec<AdapterDescription>;
}

/// Everything an adapter reports about itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdapterDescription {
    pub info: AdapterInfo,
    pub features: SupportedFeatures,
    pub limits: Limits,
    pub surface_capabilities: SurfaceCapabilities,
}

impl AdapterDescription {
    pub fn has_feature(&self, feature: FeatureName) -> bool {
        self.features.contains(feature)
    }

    /// Capabilities of the adapter for `format`.
    ///
    /// DRM format modifiers are only reported when the adapter supports
    /// [`FeatureName::DawnDrmFormatCapabilities`].
    pub fn format_capabilities(&self, format: TextureFormat) -> FormatCapabilities {
        let drm = self
            .has_feature(FeatureName::DawnDrmFormatCapabilities)
            .then(|| DrmFormatCapabilities {
                properties: if format.is_renderable() && !format.is_depth_stencil() {
                    vec![DrmFormatProperties {
                        // DRM_FORMAT_MOD_LINEAR
                        modifier: 0,
                        modifier_plane_count: 1,
                    }]
                } else {
                    Vec::new()
                },
            });

        FormatCapabilities { drm }
    }
}

/// Snapshot of a backend, owned by each instance.
#[derive(Clone, Debug)]
pub(crate) struct ApiInfo {
    pub(crate) instance_features: SupportedInstanceFeatures,
    pub(crate) instance_limits: InstanceLimits,
    pub(crate) wgsl_language_features: SupportedWgslLanguageFeatures,
    pub(crate) adapters: Vec<AdapterDescription>,
}

impl ApiInfo {
    pub(crate) fn of<A: Api>() -> Self {
        Self {
            instance_features: A::instance_features(),
            instance_limits: A::instance_limits(),
            wgsl_language_features: A::wgsl_language_features(),
            adapters: A::enumerate_adapters(),
        }
    }
}

fn host_instance_features() -> SupportedInstanceFeatures {
    [
        InstanceFeatureName::TimedWaitAny,
        InstanceFeatureName::ShaderSourceSpirv,
        InstanceFeatureName::MultipleDevicesPerAdapter,
    ]
    .into_iter()
    .collect()
}

fn host_instance_limits() -> InstanceLimits {
    InstanceLimits {
        timed_wait_any_max_count: 64,
    }
}

/// Backend with a single adapter backed by host memory.
///
/// The adapter supports every feature at the default limits. Nothing is
/// executed: buffers are plain host allocations and command encoders only
/// track their state.
#[derive(Debug)]
pub enum Null {}

impl Api for Null {
    const VARIANT: Backend = Backend::Null;

    fn instance_features() -> SupportedInstanceFeatures {
        host_instance_features()
    }

    fn instance_limits() -> InstanceLimits {
        host_instance_limits()
    }

    fn wgsl_language_features() -> SupportedWgslLanguageFeatures {
        [
            WgslLanguageFeatureName::ReadonlyAndReadwriteStorageTextures,
            WgslLanguageFeatureName::Packed4x8IntegerDotProduct,
            WgslLanguageFeatureName::UnrestrictedPointerParameters,
            WgslLanguageFeatureName::PointerCompositeAccess,
        ]
        .into_iter()
        .collect()
    }

    fn enumerate_adapters() -> Vec<AdapterDescription> {
        let features = FeatureName::ALL.iter().copied().collect::<SupportedFeatures>();

        let memory_heaps = features
            .contains(FeatureName::AdapterPropertiesMemoryHeaps)
            .then(|| AdapterPropertiesMemoryHeaps {
                heaps: vec![MemoryHeapInfo {
                    properties: HeapProperty::DEVICE_LOCAL
                        | HeapProperty::HOST_VISIBLE
                        | HeapProperty::HOST_COHERENT
                        | HeapProperty::HOST_CACHED,
                    size: 1 << 30,
                }],
            });

        let subgroup_matrix_configs = features
            .contains(FeatureName::SubgroupMatrix)
            .then(|| AdapterPropertiesSubgroupMatrixConfigs {
                configs: vec![SubgroupMatrixConfig {
                    component_type: SubgroupMatrixComponentType::F32,
                    result_component_type: SubgroupMatrixComponentType::F32,
                    m: 8,
                    n: 8,
                    k: 8,
                }],
            });

        vec![AdapterDescription {
            info: AdapterInfo {
                vendor: String::from("procs"),
                architecture: String::from("host"),
                device: String::from("Null Adapter"),
                description: String::from("Adapter backed by host memory"),
                backend_type: BackendType::Null,
                adapter_type: AdapterType::Cpu,
                vendor_id: 0,
                device_id: 0,
                subgroup_min_size: 4,
                subgroup_max_size: 64,
                memory_heaps,
                subgroup_matrix_configs,
            },
            features,
            limits: Limits::default(),
            surface_capabilities: SurfaceCapabilities {
                usages: TextureUsages::RENDER_ATTACHMENT
                    | TextureUsages::COPY_SRC
                    | TextureUsages::COPY_DST
                    | TextureUsages::TEXTURE_BINDING,
                formats: vec![
                    TextureFormat::Bgra8Unorm,
                    TextureFormat::Rgba8Unorm,
                    TextureFormat::Bgra8UnormSrgb,
                    TextureFormat::Rgba8UnormSrgb,
                    TextureFormat::Rgba16Float,
                ],
                present_modes: vec![
                    PresentMode::Fifo,
                    PresentMode::FifoRelaxed,
                    PresentMode::Immediate,
                    PresentMode::Mailbox,
                ],
                alpha_modes: vec![CompositeAlphaMode::Opaque, CompositeAlphaMode::Premultiplied],
            },
        }]
    }
}

/// Dummy backend, which exposes no adapters.
#[derive(Debug)]
pub enum Empty {}

impl Api for Empty {
    const VARIANT: Backend = Backend::Empty;

    fn instance_features() -> SupportedInstanceFeatures {
        host_instance_features()
    }

    fn instance_limits() -> InstanceLimits {
        host_instance_limits()
    }

    fn wgsl_language_features() -> SupportedWgslLanguageFeatures {
        SupportedWgslLanguageFeatures::default()
    }

    fn enumerate_adapters() -> Vec<AdapterDescription> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drm_capabilities_follow_feature() {
        let adapters = Null::enumerate_adapters();
        let adapter = &adapters[0];

        let caps = adapter.format_capabilities(TextureFormat::Rgba8Unorm);
        assert_eq!(caps.drm.map(|drm| drm.properties.len()), Some(1));

        let caps = adapter.format_capabilities(TextureFormat::Depth32Float);
        assert_eq!(caps.drm.map(|drm| drm.properties.len()), Some(0));

        let mut without = adapter.clone();
        without.features = SupportedFeatures::default();
        assert_eq!(without.format_capabilities(TextureFormat::Rgba8Unorm).drm, None);
    }

    #[test]
    fn empty_has_no_adapters() {
        assert!(Empty::enumerate_adapters().is_empty());
        assert!(ApiInfo::of::<Empty>().adapters.is_empty());
    }
}

//! Feature names and the owned feature lists handed out by getters.

/// Optional device capabilities.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum FeatureName {
    DepthClipControl,
    Depth32FloatStencil8,
    TimestampQuery,
    TextureCompressionBc,
    TextureCompressionEtc2,
    TextureCompressionAstc,
    IndirectFirstInstance,
    ShaderF16,
    Rg11b10UfloatRenderable,
    Bgra8UnormStorage,
    Float32Filterable,
    Subgroups,
    MultiDrawIndirect,
    PixelLocalStorageCoherent,
    PixelLocalStorageNonCoherent,
    AdapterPropertiesMemoryHeaps,
    SubgroupMatrix,
    BufferMapExtendedUsages,
    DawnDrmFormatCapabilities,
    TexelBuffers,
    ResourceTables,
    SharedBufferMemory,
    SharedTextureMemory,
    SharedFence,
}

impl FeatureName {
    /// Every feature, in declaration order.
    pub const ALL: &'static [FeatureName] = &[
        Self::DepthClipControl,
        Self::Depth32FloatStencil8,
        Self::TimestampQuery,
        Self::TextureCompressionBc,
        Self::TextureCompressionEtc2,
        Self::TextureCompressionAstc,
        Self::IndirectFirstInstance,
        Self::ShaderF16,
        Self::Rg11b10UfloatRenderable,
        Self::Bgra8UnormStorage,
        Self::Float32Filterable,
        Self::Subgroups,
        Self::MultiDrawIndirect,
        Self::PixelLocalStorageCoherent,
        Self::PixelLocalStorageNonCoherent,
        Self::AdapterPropertiesMemoryHeaps,
        Self::SubgroupMatrix,
        Self::BufferMapExtendedUsages,
        Self::DawnDrmFormatCapabilities,
        Self::TexelBuffers,
        Self::ResourceTables,
        Self::SharedBufferMemory,
        Self::SharedTextureMemory,
        Self::SharedFence,
    ];
}

/// Optional instance capabilities.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InstanceFeatureName {
    /// `instance_wait_any` may be called with a non-zero timeout.
    TimedWaitAny,
    /// Shader modules may be created from SPIR-V.
    ShaderSourceSpirv,
    /// Adapters are not consumed by their first device.
    MultipleDevicesPerAdapter,
}

/// WGSL language extensions known to an instance.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum WgslLanguageFeatureName {
    ReadonlyAndReadwriteStorageTextures,
    Packed4x8IntegerDotProduct,
    UnrestrictedPointerParameters,
    PointerCompositeAccess,
    SizedBindingArray,
}

macro_rules! feature_list {
    ($(#[$meta:meta])* $name:ident($item:ty)) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, Eq)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name {
            /// Features in the list, sorted and without duplicates.
            pub features: Vec<$item>,
        }

        impl $name {
            /// Returns `true` if `feature` is in the list.
            pub fn contains(&self, feature: $item) -> bool {
                self.features.binary_search(&feature).is_ok()
            }

            /// Returns `true` if the list contains every feature in `other`.
            pub fn contains_all(&self, other: &[$item]) -> bool {
                other.iter().all(|&f| self.contains(f))
            }
        }

        impl FromIterator<$item> for $name {
            fn from_iter<I: IntoIterator<Item = $item>>(iter: I) -> Self {
                let mut features = iter.into_iter().collect::<Vec<_>>();
                features.sort_unstable();
                features.dedup();
                Self { features }
            }
        }
    };
}

feature_list! {
    /// Device features supported by an adapter or enabled on a device.
    SupportedFeatures(FeatureName)
}

feature_list! {
    /// Instance features supported by a backend.
    SupportedInstanceFeatures(InstanceFeatureName)
}

feature_list! {
    /// WGSL language features supported by an instance.
    SupportedWgslLanguageFeatures(WgslLanguageFeatureName)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_lists_are_sorted_sets() {
        let features = [
            FeatureName::TimestampQuery,
            FeatureName::DepthClipControl,
            FeatureName::TimestampQuery,
        ]
        .into_iter()
        .collect::<SupportedFeatures>();

        assert_eq!(
            features.features,
            [FeatureName::DepthClipControl, FeatureName::TimestampQuery]
        );
        assert!(features.contains(FeatureName::TimestampQuery));
        assert!(!features.contains(FeatureName::ShaderF16));
        assert!(features.contains_all(&[]));
    }
}

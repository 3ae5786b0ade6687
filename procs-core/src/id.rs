use crate::{Epoch, Index};
use std::{
    cmp::Ordering,
    fmt::{self, Debug},
    hash::Hash,
    marker::PhantomData,
};

type NonZeroId = std::num::NonZeroU64;

const INDEX_BITS: u32 = 32;
const EPOCH_MASK: u64 = (1 << (64 - INDEX_BITS)) - 1;

/// The raw underlying representation of an identifier.
#[repr(transparent)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawId(NonZeroId);

impl RawId {
    /// Zip together an identifier and return its raw underlying representation.
    ///
    /// Epochs start at one, so every valid identifier is non-zero.
    pub fn zip(index: Index, epoch: Epoch) -> RawId {
        let v = (index as u64) | ((epoch as u64 & EPOCH_MASK) << INDEX_BITS);
        // A zero epoch is never handed out by `IdentityManager`.
        match NonZeroId::new(v) {
            Some(id) => RawId(id),
            None => panic!("Zero epoch and index do not form an identifier"),
        }
    }

    /// Unzip a raw identifier into its components.
    pub fn unzip(self) -> (Index, Epoch) {
        (
            (self.0.get() & ((1 << INDEX_BITS) - 1)) as Index,
            (self.0.get() >> INDEX_BITS) as Epoch,
        )
    }

    /// The raw 64-bit value, as handed across an ABI boundary.
    pub fn into_raw(self) -> u64 {
        self.0.get()
    }

    /// Rebuild a raw identifier from its 64-bit value.
    ///
    /// Returns `None` for zero, which is the null handle.
    pub fn from_raw(raw: u64) -> Option<RawId> {
        NonZeroId::new(raw).map(RawId)
    }
}

impl Debug for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (index, epoch) = self.unzip();
        write!(f, "Id({index},{epoch})")
    }
}

/// An identifier for an object created through the procedure table.
///
/// An `Id<T>` value identifies an object stored in one of the [`Hub`]'s
/// registries. The marker `T` only exists so that a buffer handle can't be
/// passed where a texture handle is expected; all identifiers share the same
/// representation.
///
/// Identifiers are plain values. They are reference counted explicitly via
/// the `*_add_ref` and `*_release` entry points, or implicitly by wrapping
/// them in a [`Ref`].
///
/// [`Hub`]: crate::hub::Hub
/// [`Ref`]: crate::handle::Ref
#[repr(transparent)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Id<T: Marker>(RawId, PhantomData<T>);

impl<T> Id<T>
where
    T: Marker,
{
    #[inline]
    pub(crate) fn zip(index: Index, epoch: Epoch) -> Self {
        Id(RawId::zip(index, epoch), PhantomData)
    }

    #[inline]
    pub fn unzip(self) -> (Index, Epoch) {
        self.0.unzip()
    }

    /// Access the raw underlying representation of the identifier.
    #[inline]
    pub fn into_raw(self) -> RawId {
        self.0
    }

    /// Construct an identifier from its raw representation.
    ///
    /// Nothing is checked here. A forged identifier simply fails lookup with
    /// [`InvalidId`](crate::InvalidId).
    #[inline]
    pub fn from_raw(raw: RawId) -> Self {
        Id(raw, PhantomData)
    }
}

impl<T> Copy for Id<T> where T: Marker {}

impl<T> Clone for Id<T>
where
    T: Marker,
{
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Debug for Id<T>
where
    T: Marker,
{
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        let (index, epoch) = self.unzip();
        write!(formatter, "Id({index},{epoch})")
    }
}

impl<T> Hash for Id<T>
where
    T: Marker,
{
    #[inline]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<T> PartialEq for Id<T>
where
    T: Marker,
{
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Eq for Id<T> where T: Marker {}

impl<T> PartialOrd for Id<T>
where
    T: Marker,
{
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T>
where
    T: Marker,
{
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

/// Marker trait used to determine which types uniquely identify an object.
pub trait Marker: 'static + Send + Sync {}

// This allows `()` to be used as a marker type for tests.
//
// We don't want these in production code, since they essentially remove type
// safety, like how identifiers across different types can be compared.
#[cfg(test)]
impl Marker for () {}

/// Define identifiers for each object kind.
macro_rules! ids {
    ($(
        $(#[$($meta:meta)*])*
        pub type $name:ident $marker:ident;
    )*) => {
        /// Marker types for each object kind.
        pub mod markers {
            $(
                #[derive(Debug)]
                pub enum $marker {}
                impl super::Marker for $marker {}
            )*
        }

        $(
            $(#[$($meta)*])*
            pub type $name = Id<self::markers::$marker>;
        )*
    }
}

ids! {
    pub type InstanceId Instance;
    pub type AdapterId Adapter;
    pub type SurfaceId Surface;
    pub type DeviceId Device;
    pub type QueueId Queue;
    pub type BufferId Buffer;
    pub type TexelBufferViewId TexelBufferView;
    pub type TextureId Texture;
    pub type TextureViewId TextureView;
    pub type ExternalTextureId ExternalTexture;
    pub type SamplerId Sampler;
    pub type BindGroupLayoutId BindGroupLayout;
    pub type BindGroupId BindGroup;
    pub type PipelineLayoutId PipelineLayout;
    pub type ResourceTableId ResourceTable;
    pub type ShaderModuleId ShaderModule;
    pub type ComputePipelineId ComputePipeline;
    pub type RenderPipelineId RenderPipeline;
    pub type CommandEncoderId CommandEncoder;
    pub type CommandBufferId CommandBuffer;
    pub type ComputePassEncoderId ComputePassEncoder;
    pub type RenderPassEncoderId RenderPassEncoder;
    pub type RenderBundleEncoderId RenderBundleEncoder;
    pub type RenderBundleId RenderBundle;
    pub type QuerySetId QuerySet;
    pub type SharedBufferMemoryId SharedBufferMemory;
    pub type SharedTextureMemoryId SharedTextureMemory;
    pub type SharedFenceId SharedFence;
}

#[test]
fn test_id_zip() {
    let id = Id::<()>::zip(7, 3);
    assert_eq!(id.unzip(), (7, 3));

    let last = Id::<()>::zip(Index::MAX, Epoch::MAX);
    assert_eq!(last.unzip(), (Index::MAX, Epoch::MAX));
}

#[test]
fn test_id_raw_round_trip() {
    let id = Id::<()>::zip(1, 1);
    let raw = id.into_raw().into_raw();
    assert_eq!(Id::<()>::from_raw(RawId::from_raw(raw).unwrap()), id);
    assert!(RawId::from_raw(0).is_none());
}

/*! Allocating handles to objects, and tracking the objects they refer to.

Every entry point names its objects with identifiers of type [`Id<M>`].
For example, [`id::DeviceId`] is an alias for `Id<markers::Device>`, and
[`id::BufferId`] is an alias for `Id<markers::Buffer>`. `Id` implements
`Copy`, `Hash`, `Eq`, `Ord`, and of course `Debug`.

[`id::DeviceId`]: crate::id::DeviceId
[`id::BufferId`]: crate::id::BufferId
[`Id<M>`]: crate::id::Id

`Id`s incorporate a generation number, so a handle whose object has been
released never refers to an object created later in the same slot. Using
such a handle elicits an [`InvalidId`](crate::InvalidId) error.

## Reference counts

Each handle carries an explicit count of external references. Creating an
object hands out one reference, `*_add_ref` adds one and `*_release` drops
one. When the count reaches zero the handle is freed and the object's
release hook runs, which for example destroys a buffer or loses a device.

Objects also hold `Arc`s to the objects they were created from, so a
texture view keeps its texture alive after the texture's handle has been
released. Only the handle becomes invalid.

## Locking

Each field in `Hub` is a [`Registry`] holding all the values of a
particular kind of object, protected by a single `RwLock`. The lock is only
held for as long as it takes to look up or insert an `Arc`; entry points
work on cloned `Arc`s, never on lock guards.
*/

use std::sync::Arc;

use crate::{
    binding_model::{BindGroup, BindGroupLayout, PipelineLayout, ResourceTable},
    command::{
        CommandBuffer, CommandEncoder, ComputePassEncoder, RenderBundle, RenderBundleEncoder,
        RenderPassEncoder,
    },
    device::{queue::Queue, Device},
    instance::{Adapter, Instance},
    pipeline::{ComputePipeline, RenderPipeline, ShaderModule},
    present::Surface,
    registry::{Registry, RegistryReport},
    resource::{
        Buffer, ExternalTexture, QuerySet, Resource, Sampler, TexelBufferView, Texture,
        TextureView,
    },
    resource_log,
    shared::{SharedBufferMemory, SharedFence, SharedTextureMemory},
};

macro_rules! hub {
    ($($field:ident: $ty:ty,)*) => {
        #[derive(Debug, PartialEq, Eq)]
        pub struct HubReport {
            $(pub $field: RegistryReport,)*
        }

        impl HubReport {
            /// Returns `true` if no handles are alive.
            pub fn is_empty(&self) -> bool {
                true $(&& self.$field.is_empty())*
            }
        }

        /// All the objects of a [`crate::global::Global`].
        ///
        /// Fields are declared in the order they are cleared in: objects
        /// first, the objects they are created from last.
        pub struct Hub {
            $(pub(crate) $field: Registry<$ty>,)*
        }

        /// Objects taken out of a [`Hub`] by [`Hub::clear`].
        pub(crate) struct Cleared {
            $($field: Vec<Arc<$ty>>,)*
        }

        impl Cleared {
            /// Run the release hook of every object, then drop them.
            pub(crate) fn release(self, hub: &Hub) {
                $(
                    for value in self.$field {
                        value.on_release(hub);
                    }
                )*
            }
        }

        impl Hub {
            pub(crate) fn new() -> Self {
                Self {
                    $($field: Registry::new(),)*
                }
            }

            /// Release every handle, returning the objects so they can be
            /// released outside of the registry locks.
            pub(crate) fn clear(&self) -> Cleared {
                resource_log!("Hub::clear");

                Cleared {
                    $($field: self.$field.clear(),)*
                }
            }

            pub fn generate_report(&self) -> HubReport {
                HubReport {
                    $($field: self.$field.generate_report(),)*
                }
            }
        }
    };
}

hub! {
    command_buffers: CommandBuffer,
    render_bundles: RenderBundle,
    compute_passes: ComputePassEncoder,
    render_passes: RenderPassEncoder,
    render_bundle_encoders: RenderBundleEncoder,
    command_encoders: CommandEncoder,
    bind_groups: BindGroup,
    resource_tables: ResourceTable,
    compute_pipelines: ComputePipeline,
    render_pipelines: RenderPipeline,
    pipeline_layouts: PipelineLayout,
    bind_group_layouts: BindGroupLayout,
    shader_modules: ShaderModule,
    external_textures: ExternalTexture,
    texel_buffer_views: TexelBufferView,
    texture_views: TextureView,
    samplers: Sampler,
    query_sets: QuerySet,
    buffers: Buffer,
    textures: Texture,
    shared_fences: SharedFence,
    shared_buffer_memories: SharedBufferMemory,
    shared_texture_memories: SharedTextureMemory,
    queues: Queue,
    devices: Device,
    surfaces: Surface,
    adapters: Adapter,
    instances: Instance,
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub").finish_non_exhaustive()
    }
}

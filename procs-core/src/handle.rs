//! Owned handles.
//!
//! A [`Ref`] owns one external reference to an object. Cloning it calls the
//! object's `*_add_ref` entry point and dropping it calls `*_release`, both
//! through the procedure table it was created with.

use std::fmt;

use crate::{global::Global, id, storage::InvalidId, ProcTable};

/// An id with `*_add_ref` and `*_release` entry points.
pub trait Handle: Copy + fmt::Debug {
    fn add_ref(self, procs: &ProcTable, global: &Global) -> Result<(), InvalidId>;
    fn release(self, procs: &ProcTable, global: &Global) -> Result<(), InvalidId>;
}

macro_rules! impl_handle {
    ($($id:ty: $add_ref:ident, $release:ident;)*) => {
        $(
            impl Handle for $id {
                #[inline]
                fn add_ref(self, procs: &ProcTable, global: &Global) -> Result<(), InvalidId> {
                    procs.$add_ref(global, self)
                }

                #[inline]
                fn release(self, procs: &ProcTable, global: &Global) -> Result<(), InvalidId> {
                    procs.$release(global, self)
                }
            }
        )*
    };
}

impl_handle! {
    id::AdapterId: adapter_add_ref, adapter_release;
    id::BindGroupId: bind_group_add_ref, bind_group_release;
    id::BindGroupLayoutId: bind_group_layout_add_ref, bind_group_layout_release;
    id::BufferId: buffer_add_ref, buffer_release;
    id::CommandBufferId: command_buffer_add_ref, command_buffer_release;
    id::CommandEncoderId: command_encoder_add_ref, command_encoder_release;
    id::ComputePassEncoderId: compute_pass_encoder_add_ref, compute_pass_encoder_release;
    id::ComputePipelineId: compute_pipeline_add_ref, compute_pipeline_release;
    id::DeviceId: device_add_ref, device_release;
    id::ExternalTextureId: external_texture_add_ref, external_texture_release;
    id::InstanceId: instance_add_ref, instance_release;
    id::PipelineLayoutId: pipeline_layout_add_ref, pipeline_layout_release;
    id::QuerySetId: query_set_add_ref, query_set_release;
    id::QueueId: queue_add_ref, queue_release;
    id::RenderBundleId: render_bundle_add_ref, render_bundle_release;
    id::RenderBundleEncoderId: render_bundle_encoder_add_ref, render_bundle_encoder_release;
    id::RenderPassEncoderId: render_pass_encoder_add_ref, render_pass_encoder_release;
    id::RenderPipelineId: render_pipeline_add_ref, render_pipeline_release;
    id::ResourceTableId: resource_table_add_ref, resource_table_release;
    id::SamplerId: sampler_add_ref, sampler_release;
    id::ShaderModuleId: shader_module_add_ref, shader_module_release;
    id::SharedBufferMemoryId: shared_buffer_memory_add_ref, shared_buffer_memory_release;
    id::SharedFenceId: shared_fence_add_ref, shared_fence_release;
    id::SharedTextureMemoryId: shared_texture_memory_add_ref, shared_texture_memory_release;
    id::SurfaceId: surface_add_ref, surface_release;
    id::TexelBufferViewId: texel_buffer_view_add_ref, texel_buffer_view_release;
    id::TextureId: texture_add_ref, texture_release;
    id::TextureViewId: texture_view_add_ref, texture_view_release;
}

/// One owned reference to the object behind `I`.
pub struct Ref<'g, I: Handle> {
    id: I,
    global: &'g Global,
    procs: &'static ProcTable,
}

impl<'g, I: Handle> Ref<'g, I> {
    /// Take ownership of a reference the caller already holds, such as the
    /// one handed out by a `create_*` entry point.
    pub fn adopt(procs: &'static ProcTable, global: &'g Global, id: I) -> Self {
        Self { id, global, procs }
    }

    /// Add a reference to `id` and own it.
    pub fn acquire(procs: &'static ProcTable, global: &'g Global, id: I) -> Result<Self, InvalidId> {
        id.add_ref(procs, global)?;
        Ok(Self::adopt(procs, global, id))
    }

    pub fn id(&self) -> I {
        self.id
    }

    pub fn procs(&self) -> &'static ProcTable {
        self.procs
    }

    /// Give up ownership without releasing the reference.
    pub fn into_id(self) -> I {
        let id = self.id;
        std::mem::forget(self);
        id
    }
}

impl<I: Handle> Clone for Ref<'_, I> {
    fn clone(&self) -> Self {
        if let Err(err) = self.id.add_ref(self.procs, self.global) {
            log::warn!("Cloning {:?}: {err}", self.id);
        }

        Self {
            id: self.id,
            global: self.global,
            procs: self.procs,
        }
    }
}

impl<I: Handle> Drop for Ref<'_, I> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }

        if let Err(err) = self.id.release(self.procs, self.global) {
            log::warn!("Dropping {:?}: {err}", self.id);
        }
    }
}

impl<I: Handle> fmt::Debug for Ref<'_, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Ref").field(&self.id).finish()
    }
}

impl<I: Handle + PartialEq> PartialEq for Ref<'_, I> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<I: Handle + Eq> Eq for Ref<'_, I> {}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use pt::CallbackMode;

    use super::*;
    use crate::{
        api::Null, device::DeviceDescriptor, instance::RequestAdapterCallbackInfo,
        resource::BufferDescriptor,
    };

    static_assertions::assert_impl_all!(Ref<'static, id::BufferId>: Send, Sync);

    fn buffer(procs: &ProcTable, global: &Global) -> id::BufferId {
        let instance = procs.create_instance(global, None).unwrap();
        let adapter = Arc::new(Mutex::new(None));

        let slot = adapter.clone();
        procs
            .instance_request_adapter(
                global,
                instance,
                None,
                RequestAdapterCallbackInfo::new(
                    CallbackMode::AllowSpontaneous,
                    Box::new(move |_, id, _| *slot.lock() = id),
                ),
            )
            .unwrap();

        let adapter = adapter.lock().take().unwrap();
        let device = procs
            .adapter_create_device(global, adapter, DeviceDescriptor::default())
            .unwrap()
            .unwrap();

        procs
            .device_create_buffer(
                global,
                device,
                &BufferDescriptor {
                    usage: pt::BufferUsages::COPY_DST,
                    size: 4,
                    ..Default::default()
                },
            )
            .unwrap()
    }

    #[test]
    fn clone_and_drop_balance() {
        let procs = ProcTable::new::<Null>();
        let global = Global::new();
        let id = buffer(procs, &global);

        let first = Ref::adopt(procs, &global, id);
        let second = first.clone();
        assert_eq!(global.hub.buffers.refs(id).unwrap(), 2);
        assert_eq!(first, second);

        drop(first);
        assert_eq!(global.hub.buffers.refs(id).unwrap(), 1);
        drop(second);
        assert!(!global.hub.buffers.contains(id));
    }

    #[test]
    fn into_id_keeps_reference() {
        let procs = ProcTable::new::<Null>();
        let global = Global::new();
        let id = buffer(procs, &global);

        let owned = Ref::acquire(procs, &global, id).unwrap();
        assert_eq!(owned.into_id(), id);
        assert_eq!(global.hub.buffers.refs(id).unwrap(), 2);
    }
}

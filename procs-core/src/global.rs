use std::sync::Arc;

use crate::{
    hub::{Hub, HubReport},
    id,
    resource::Resource,
    resource_log,
    storage::InvalidId,
};

#[derive(Debug, PartialEq, Eq)]
pub struct GlobalReport {
    pub hub: HubReport,
}

impl GlobalReport {
    pub fn hub_report(&self) -> &HubReport {
        &self.hub
    }

    /// Returns `true` if no handles are alive.
    pub fn is_empty(&self) -> bool {
        self.hub.is_empty()
    }
}

/// The context every entry point of a procedure table is called with.
///
/// A `Global` owns every object created through it. Dropping it releases all
/// remaining handles, which cancels the callbacks of every pending future.
pub struct Global {
    pub(crate) hub: Arc<Hub>,
}

impl Global {
    pub fn new() -> Self {
        profiling::scope!("Global::new");
        Self {
            hub: Arc::new(Hub::new()),
        }
    }

    pub fn generate_report(&self) -> GlobalReport {
        GlobalReport {
            hub: self.hub.generate_report(),
        }
    }
}

impl Default for Global {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Global {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Global").finish_non_exhaustive()
    }
}

impl Drop for Global {
    fn drop(&mut self) {
        profiling::scope!("Global::drop");
        resource_log!("Global::drop");

        // Release outside of the registry locks, release hooks may look
        // objects up again.
        let cleared = self.hub.clear();
        cleared.release(&self.hub);
    }
}

/// Generate the reference counting entry points of each object kind, and
/// `set_label` where the kind has one.
macro_rules! lifecycle {
    ($(
        $registry:ident($id:ty) {
            $add_ref:ident, $release:ident $(, $set_label:ident)?
        }
    )*) => {
        impl Global {
            $(
                pub fn $add_ref(&self, id: $id) -> Result<(), InvalidId> {
                    resource_log!("{}::add_ref {id:?}", self.hub.$registry.kind());
                    self.hub.$registry.add_ref(id)
                }

                pub fn $release(&self, id: $id) -> Result<(), InvalidId> {
                    resource_log!("{}::release {id:?}", self.hub.$registry.kind());

                    if let Some(value) = self.hub.$registry.release(id)? {
                        resource_log!("{}::drop {id:?}", self.hub.$registry.kind());
                        value.on_release(&self.hub);
                    }

                    Ok(())
                }

                $(
                    pub fn $set_label(&self, id: $id, label: &str) -> Result<(), InvalidId> {
                        self.hub.$registry.get(id)?.info().set_label(label);
                        Ok(())
                    }
                )?
            )*
        }
    };
}

lifecycle! {
    adapters(id::AdapterId) { adapter_add_ref, adapter_release }
    bind_groups(id::BindGroupId) { bind_group_add_ref, bind_group_release, bind_group_set_label }
    bind_group_layouts(id::BindGroupLayoutId) {
        bind_group_layout_add_ref, bind_group_layout_release, bind_group_layout_set_label
    }
    buffers(id::BufferId) { buffer_add_ref, buffer_release, buffer_set_label }
    command_buffers(id::CommandBufferId) {
        command_buffer_add_ref, command_buffer_release, command_buffer_set_label
    }
    command_encoders(id::CommandEncoderId) {
        command_encoder_add_ref, command_encoder_release, command_encoder_set_label
    }
    compute_passes(id::ComputePassEncoderId) {
        compute_pass_encoder_add_ref, compute_pass_encoder_release, compute_pass_encoder_set_label
    }
    compute_pipelines(id::ComputePipelineId) {
        compute_pipeline_add_ref, compute_pipeline_release, compute_pipeline_set_label
    }
    devices(id::DeviceId) { device_add_ref, device_release, device_set_label }
    external_textures(id::ExternalTextureId) {
        external_texture_add_ref, external_texture_release, external_texture_set_label
    }
    instances(id::InstanceId) { instance_add_ref, instance_release }
    pipeline_layouts(id::PipelineLayoutId) {
        pipeline_layout_add_ref, pipeline_layout_release, pipeline_layout_set_label
    }
    query_sets(id::QuerySetId) { query_set_add_ref, query_set_release, query_set_set_label }
    queues(id::QueueId) { queue_add_ref, queue_release, queue_set_label }
    render_bundles(id::RenderBundleId) {
        render_bundle_add_ref, render_bundle_release, render_bundle_set_label
    }
    render_bundle_encoders(id::RenderBundleEncoderId) {
        render_bundle_encoder_add_ref, render_bundle_encoder_release, render_bundle_encoder_set_label
    }
    render_passes(id::RenderPassEncoderId) {
        render_pass_encoder_add_ref, render_pass_encoder_release, render_pass_encoder_set_label
    }
    render_pipelines(id::RenderPipelineId) {
        render_pipeline_add_ref, render_pipeline_release, render_pipeline_set_label
    }
    resource_tables(id::ResourceTableId) { resource_table_add_ref, resource_table_release }
    samplers(id::SamplerId) { sampler_add_ref, sampler_release, sampler_set_label }
    shader_modules(id::ShaderModuleId) {
        shader_module_add_ref, shader_module_release, shader_module_set_label
    }
    shared_buffer_memories(id::SharedBufferMemoryId) {
        shared_buffer_memory_add_ref, shared_buffer_memory_release, shared_buffer_memory_set_label
    }
    shared_fences(id::SharedFenceId) { shared_fence_add_ref, shared_fence_release }
    shared_texture_memories(id::SharedTextureMemoryId) {
        shared_texture_memory_add_ref, shared_texture_memory_release, shared_texture_memory_set_label
    }
    surfaces(id::SurfaceId) { surface_add_ref, surface_release, surface_set_label }
    texel_buffer_views(id::TexelBufferViewId) {
        texel_buffer_view_add_ref, texel_buffer_view_release, texel_buffer_view_set_label
    }
    textures(id::TextureId) { texture_add_ref, texture_release, texture_set_label }
    texture_views(id::TextureViewId) {
        texture_view_add_ref, texture_view_release, texture_view_set_label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(Global: Send, Sync);

    #[test]
    fn new_global_is_empty() {
        let global = Global::new();
        assert!(global.generate_report().is_empty());
    }
}

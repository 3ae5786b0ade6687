//! Shared helpers for `procs-core` integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use procs_core::{
    api::Null,
    device::DeviceDescriptor,
    event::{CallbackInfo, FutureId},
    id,
    instance::RequestAdapterCallbackInfo,
    resource::{BufferDescriptor, TextureDescriptor},
    types::{
        BufferUsages, CallbackMode, ErrorFilter, ErrorType, Extent3d, FeatureName, MapAsyncStatus,
        MapMode, TextureFormat, TextureUsages, WHOLE_MAP_SIZE,
    },
    Global, ProcTable,
};

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct Context {
    pub procs: &'static ProcTable,
    pub instance: id::InstanceId,
    pub adapter: id::AdapterId,
    pub device: id::DeviceId,
}

/// A device on the null backend with the default features.
pub fn context(global: &Global) -> Context {
    context_with(global, &[])
}

/// A device on the null backend with `features` enabled.
pub fn context_with(global: &Global, features: &[FeatureName]) -> Context {
    let procs = ProcTable::new::<Null>();
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
                Box::new(move |_, id, _: &str| *slot.lock() = id),
            ),
        )
        .unwrap();

    let adapter = adapter.lock().take().unwrap();
    let device = procs
        .adapter_create_device(
            global,
            adapter,
            DeviceDescriptor {
                required_features: features.to_vec(),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();

    Context {
        procs,
        instance,
        adapter,
        device,
    }
}

impl Context {
    pub fn buffer(&self, global: &Global, usage: BufferUsages, size: u64) -> id::BufferId {
        self.procs
            .device_create_buffer(
                global,
                self.device,
                &BufferDescriptor {
                    usage,
                    size,
                    ..Default::default()
                },
            )
            .unwrap()
    }

    pub fn texture(
        &self,
        global: &Global,
        format: TextureFormat,
        usage: TextureUsages,
        width: u32,
        height: u32,
    ) -> id::TextureId {
        let size = Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        global
            .device_create_texture(self.device, &TextureDescriptor::new_2d(None, size, format, usage))
            .unwrap()
    }

    /// Map the whole of `buffer` for reading.
    pub fn map(
        &self,
        global: &Global,
        buffer: id::BufferId,
        mode: CallbackMode,
    ) -> (FutureId, Arc<Mutex<Option<MapAsyncStatus>>>) {
        self.map_range(global, buffer, MapMode::READ, 0, WHOLE_MAP_SIZE, mode)
    }

    pub fn map_range(
        &self,
        global: &Global,
        buffer: id::BufferId,
        map_mode: MapMode,
        offset: usize,
        size: usize,
        mode: CallbackMode,
    ) -> (FutureId, Arc<Mutex<Option<MapAsyncStatus>>>) {
        let status = Arc::new(Mutex::new(None));
        let slot = status.clone();

        let future = self
            .procs
            .buffer_map_async(
                global,
                buffer,
                map_mode,
                offset,
                size,
                CallbackInfo::new(
                    mode,
                    Box::new(move |status, _: &str| *slot.lock() = Some(status)),
                ),
            )
            .unwrap();

        (future, status)
    }

    /// Run `f` inside a validation error scope, returning the type of the
    /// first error it reported.
    pub fn errors(&self, global: &Global, f: impl FnOnce()) -> ErrorType {
        global
            .device_push_error_scope(self.device, ErrorFilter::Validation)
            .unwrap();

        f();

        let popped = Arc::new(Mutex::new(None));
        let slot = popped.clone();

        global
            .device_pop_error_scope(
                self.device,
                CallbackInfo::new(
                    CallbackMode::AllowSpontaneous,
                    Box::new(move |_, ty, _: &str| *slot.lock() = Some(ty)),
                ),
            )
            .unwrap();

        let ty = popped.lock().take().unwrap();
        ty
    }

    pub fn release(self, global: &Global) {
        self.procs.device_release(global, self.device).unwrap();
        self.procs.adapter_release(global, self.adapter).unwrap();
        self.procs.instance_release(global, self.instance).unwrap();
    }
}

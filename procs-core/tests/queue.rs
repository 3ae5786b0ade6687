mod common;

use common::{context, context_with, init, Context};
use procs_core::{
    command::{TexelCopyBufferLayout, TexelCopyTextureInfo},
    id,
    shared::{
        BeginAccessState, SharedBufferMemoryDescriptor, SharedBufferMemoryProperties,
        SharedFenceDescriptor, SharedMemoryError, SharedTextureMemoryDescriptor,
        SharedTextureMemoryProperties,
    },
    types::{
        BufferUsages, ErrorType, Extent3d, FeatureName, SharedFenceType, TextureFormat, TextureUsages,
    },
    Global,
};

/// Finish an encoder with the commands recorded by `record`.
fn command_buffer(cx: &Context, global: &Global, record: impl FnOnce(id::CommandEncoderId)) -> id::CommandBufferId {
    let encoder = global.device_create_command_encoder(cx.device, None).unwrap();
    record(encoder);
    let buffer = global.command_encoder_finish(encoder, None).unwrap();
    global.command_encoder_release(encoder).unwrap();
    buffer
}

#[test]
fn command_buffers_are_submitted_once() {
    init();

    let global = Global::new();
    let cx = context(&global);
    let queue = global.device_get_queue(cx.device).unwrap();

    let first = command_buffer(&cx, &global, |_| {});
    let second = command_buffer(&cx, &global, |_| {});

    assert_eq!(cx.errors(&global, || global.queue_submit(queue, &[first]).unwrap()), ErrorType::NoError);
    assert_eq!(
        cx.errors(&global, || global.queue_submit(queue, &[first]).unwrap()),
        ErrorType::Validation
    );

    // A duplicate rejects the submit without consuming the buffer.
    assert_eq!(
        cx.errors(&global, || global.queue_submit(queue, &[second, second]).unwrap()),
        ErrorType::Validation
    );
    assert_eq!(cx.errors(&global, || global.queue_submit(queue, &[second]).unwrap()), ErrorType::NoError);
}

#[test]
fn error_buffer_rejects_the_whole_batch() {
    init();

    let global = Global::new();
    let cx = context(&global);
    let queue = global.device_get_queue(cx.device).unwrap();

    let good = command_buffer(&cx, &global, |_| {});

    let mut bad = None;
    assert_eq!(
        cx.errors(&global, || {
            bad = Some(command_buffer(&cx, &global, |encoder| {
                global
                    .command_encoder_inject_validation_error(encoder, "broken")
                    .unwrap()
            }));
        }),
        ErrorType::Validation
    );
    let bad = bad.unwrap();

    assert_eq!(
        cx.errors(&global, || global.queue_submit(queue, &[good, bad]).unwrap()),
        ErrorType::Validation
    );

    // Nothing in the rejected batch was submitted.
    assert_eq!(cx.errors(&global, || global.queue_submit(queue, &[good]).unwrap()), ErrorType::NoError);
}

#[test]
fn destroyed_resources_block_submit() {
    init();

    let global = Global::new();
    let cx = context(&global);
    let queue = global.device_get_queue(cx.device).unwrap();
    let buffer = cx.buffer(&global, BufferUsages::COPY_DST, 16);

    let commands = command_buffer(&cx, &global, |encoder| {
        global
            .command_encoder_clear_buffer(encoder, buffer, 0, None)
            .unwrap()
    });

    global.buffer_destroy(buffer).unwrap();
    assert_eq!(
        cx.errors(&global, || global.queue_submit(queue, &[commands]).unwrap()),
        ErrorType::Validation
    );
}

fn shared_buffer(cx: &Context, global: &Global) -> (id::SharedBufferMemoryId, id::BufferId) {
    let memory = global
        .device_import_shared_buffer_memory(
            cx.device,
            &SharedBufferMemoryDescriptor {
                label: None,
                properties: SharedBufferMemoryProperties {
                    usage: BufferUsages::COPY_SRC | BufferUsages::COPY_DST,
                    size: 16,
                },
            },
        )
        .unwrap();

    let buffer = global.shared_buffer_memory_create_buffer(memory, None).unwrap();
    (memory, buffer)
}

#[test]
fn shared_buffers_need_an_active_access() {
    init();

    let global = Global::new();
    let cx = context_with(&global, &[FeatureName::SharedBufferMemory, FeatureName::SharedFence]);
    let queue = global.device_get_queue(cx.device).unwrap();
    let (memory, buffer) = shared_buffer(&cx, &global);

    let commands = command_buffer(&cx, &global, |encoder| {
        global
            .command_encoder_clear_buffer(encoder, buffer, 0, None)
            .unwrap()
    });

    assert_eq!(
        cx.errors(&global, || global.queue_submit(queue, &[commands]).unwrap()),
        ErrorType::Validation
    );

    let begin = BeginAccessState {
        initialized: true,
        ..Default::default()
    };

    global
        .shared_buffer_memory_begin_access(memory, buffer, &begin)
        .unwrap();
    assert!(matches!(
        global.shared_buffer_memory_begin_access(memory, buffer, &begin),
        Err(SharedMemoryError::AlreadyAccessed(..))
    ));

    assert_eq!(cx.errors(&global, || global.queue_submit(queue, &[commands]).unwrap()), ErrorType::NoError);
    assert_eq!(
        cx.errors(&global, || global.queue_write_buffer(queue, buffer, 0, &[0; 4]).unwrap()),
        ErrorType::NoError
    );

    let end = global.shared_buffer_memory_end_access(memory, buffer).unwrap();
    assert!(end.initialized);
    assert_eq!(end.fences.len(), 1);
    assert_eq!(end.signaled_values, [1]);

    assert!(matches!(
        global.shared_buffer_memory_end_access(memory, buffer),
        Err(SharedMemoryError::NotAccessed(..))
    ));
    assert_eq!(
        cx.errors(&global, || global.queue_write_buffer(queue, buffer, 0, &[0; 4]).unwrap()),
        ErrorType::Validation
    );

    let fence = end.fences[0];
    assert_eq!(global.shared_fence_export_info(fence).unwrap().ty, SharedFenceType::SyncFd);

    global.shared_buffer_memory_end_access_state_free_members(end);
    assert!(global.shared_fence_export_info(fence).is_err());
}

#[test]
fn end_access_hands_back_begin_fences() {
    init();

    let global = Global::new();
    let cx = context_with(&global, &[FeatureName::SharedBufferMemory, FeatureName::SharedFence]);
    let (memory, buffer) = shared_buffer(&cx, &global);

    let fence = global
        .device_import_shared_fence(
            cx.device,
            &SharedFenceDescriptor {
                label: None,
                ty: SharedFenceType::VkSemaphoreOpaqueFd,
                handle: 42,
            },
        )
        .unwrap();

    assert!(matches!(
        global.shared_buffer_memory_begin_access(
            memory,
            buffer,
            &BeginAccessState {
                fences: vec![fence],
                ..Default::default()
            },
        ),
        Err(SharedMemoryError::FenceCountMismatch {
            fences: 1,
            signaled_values: 0
        })
    ));

    global
        .shared_buffer_memory_begin_access(
            memory,
            buffer,
            &BeginAccessState {
                fences: vec![fence],
                signaled_values: vec![3],
                ..Default::default()
            },
        )
        .unwrap();

    let end = global.shared_buffer_memory_end_access(memory, buffer).unwrap();
    assert_eq!(end.fences, [fence]);
    assert_eq!(end.signaled_values, [4]);

    // Freeing the state drops its reference, not ours.
    global.shared_buffer_memory_end_access_state_free_members(end);
    assert_eq!(global.shared_fence_export_info(fence).unwrap().handle, 42);

    global.shared_fence_release(fence).unwrap();
    assert!(global.shared_fence_export_info(fence).is_err());
}

#[test]
fn shared_textures_allow_concurrent_reads() {
    init();

    let global = Global::new();
    let cx = context_with(&global, &[FeatureName::SharedTextureMemory, FeatureName::SharedFence]);
    let queue = global.device_get_queue(cx.device).unwrap();

    let memory = global
        .device_import_shared_texture_memory(
            cx.device,
            &SharedTextureMemoryDescriptor {
                label: None,
                properties: SharedTextureMemoryProperties {
                    usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
                    size: Extent3d {
                        width: 4,
                        height: 4,
                        depth_or_array_layers: 1,
                    },
                    format: TextureFormat::Rgba8Unorm,
                },
            },
        )
        .unwrap();

    let a = global.shared_texture_memory_create_texture(memory, None).unwrap();
    let b = global.shared_texture_memory_create_texture(memory, None).unwrap();

    let read = BeginAccessState {
        concurrent_read: true,
        initialized: true,
        ..Default::default()
    };
    let write = BeginAccessState::default();

    assert_eq!(
        global.shared_texture_memory_begin_access(
            memory,
            a,
            &BeginAccessState {
                initialized: false,
                ..read.clone()
            },
        ),
        Err(SharedMemoryError::ConcurrentReadUninitialized)
    );

    global.shared_texture_memory_begin_access(memory, a, &read).unwrap();
    global.shared_texture_memory_begin_access(memory, b, &read).unwrap();

    let end = global.shared_texture_memory_end_access(memory, b).unwrap();
    global.shared_texture_memory_end_access_state_free_members(end);

    // A reader is still active.
    assert_eq!(
        global.shared_texture_memory_begin_access(memory, b, &write),
        Err(SharedMemoryError::Exclusive)
    );

    let end = global.shared_texture_memory_end_access(memory, a).unwrap();
    assert!(end.initialized);
    global.shared_texture_memory_end_access_state_free_members(end);

    global.shared_texture_memory_begin_access(memory, b, &write).unwrap();
    assert_eq!(
        global.shared_texture_memory_begin_access(memory, a, &read),
        Err(SharedMemoryError::Exclusive)
    );

    let upload = |texture| {
        cx.errors(&global, || {
            global
                .queue_write_texture(
                    queue,
                    &TexelCopyTextureInfo::new(texture),
                    &[0; 4],
                    &TexelCopyBufferLayout::default(),
                    &Extent3d::default(),
                )
                .unwrap()
        })
    };

    assert_eq!(upload(b), ErrorType::NoError);
    assert_eq!(upload(a), ErrorType::Validation);

    let end = global.shared_texture_memory_end_access(memory, b).unwrap();
    assert!(!end.initialized);
    global.shared_texture_memory_end_access_state_free_members(end);
    assert_eq!(upload(b), ErrorType::Validation);

    // Textures that don't come from the memory can't be accessed through it.
    let other = cx.texture(&global, TextureFormat::Rgba8Unorm, TextureUsages::COPY_DST, 4, 4);
    assert!(matches!(
        global.shared_texture_memory_begin_access(memory, other, &write),
        Err(SharedMemoryError::ForeignResource(..))
    ));
}

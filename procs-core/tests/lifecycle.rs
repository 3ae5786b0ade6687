mod common;

use std::sync::Arc;

use common::{context, init};
use parking_lot::Mutex;
use procs_core::{
    event::{CallbackInfo, FutureWaitInfo},
    handle::Ref,
    types::{
        BufferMapState, BufferUsages, CallbackMode, ErrorFilter, ErrorType, MapAsyncStatus,
        PopErrorScopeStatus, WaitStatus,
    },
    Global,
};

#[test]
fn releasing_every_handle_empties_the_registry() {
    init();

    let global = Global::new();
    let cx = context(&global);

    let buffer = cx.buffer(&global, BufferUsages::COPY_DST, 16);
    let queue = cx.procs.device_get_queue(&global, cx.device).unwrap();
    assert!(!global.generate_report().is_empty());

    cx.procs.buffer_release(&global, buffer).unwrap();
    cx.procs.queue_release(&global, queue).unwrap();
    cx.release(&global);

    assert!(global.generate_report().is_empty());
}

#[test]
fn write_then_map_for_reading() {
    init();

    let global = Global::new();
    let cx = context(&global);
    let procs = cx.procs;

    let buffer = cx.buffer(&global, BufferUsages::MAP_READ | BufferUsages::COPY_DST, 8);
    let queue = Ref::adopt(procs, &global, procs.device_get_queue(&global, cx.device).unwrap());

    procs
        .queue_write_buffer(&global, queue.id(), buffer, 4, &[1, 2, 3, 4])
        .unwrap();

    let (_, status) = cx.map(&global, buffer, CallbackMode::AllowProcessEvents);
    assert_eq!(procs.buffer_get_map_state(&global, buffer).unwrap(), BufferMapState::Pending);
    assert_eq!(*status.lock(), None);

    procs.instance_process_events(&global, cx.instance).unwrap();
    assert_eq!(*status.lock(), Some(MapAsyncStatus::Success));
    assert_eq!(procs.buffer_get_map_state(&global, buffer).unwrap(), BufferMapState::Mapped);

    let mut data = [0; 8];
    procs
        .buffer_read_mapped_range(&global, buffer, 0, &mut data)
        .unwrap();
    assert_eq!(data, [0, 0, 0, 0, 1, 2, 3, 4]);

    // Read mappings cannot be written through.
    assert!(procs
        .buffer_write_mapped_range(&global, buffer, 0, &[9])
        .is_err());

    procs.buffer_unmap(&global, buffer).unwrap();
    assert_eq!(procs.buffer_get_map_state(&global, buffer).unwrap(), BufferMapState::Unmapped);
}

#[test]
fn unmap_aborts_pending_map() {
    init();

    let global = Global::new();
    let cx = context(&global);
    let buffer = cx.buffer(&global, BufferUsages::MAP_READ, 4);

    let (_, status) = cx.map(&global, buffer, CallbackMode::AllowProcessEvents);
    cx.procs.buffer_unmap(&global, buffer).unwrap();
    cx.procs.instance_process_events(&global, cx.instance).unwrap();

    assert_eq!(*status.lock(), Some(MapAsyncStatus::Aborted));
    assert_eq!(
        cx.procs.buffer_get_map_state(&global, buffer).unwrap(),
        BufferMapState::Unmapped
    );
}

#[test]
fn wait_any_only_futures_need_wait_any() {
    init();

    let global = Global::new();
    let cx = context(&global);
    let buffer = cx.buffer(&global, BufferUsages::MAP_READ, 4);

    let (future, status) = cx.map(&global, buffer, CallbackMode::WaitAnyOnly);
    cx.procs.instance_process_events(&global, cx.instance).unwrap();
    assert_eq!(*status.lock(), None);

    let mut futures = [FutureWaitInfo::new(future)];
    assert_eq!(
        cx.procs
            .instance_wait_any(&global, cx.instance, &mut futures, 0)
            .unwrap(),
        WaitStatus::Success
    );
    assert!(futures[0].completed);
    assert_eq!(*status.lock(), Some(MapAsyncStatus::Success));
}

#[test]
fn dropping_global_cancels_pending_callbacks() {
    init();

    let global = Global::new();
    let cx = context(&global);
    let buffer = cx.buffer(&global, BufferUsages::MAP_READ, 4);

    let (_, status) = cx.map(&global, buffer, CallbackMode::AllowProcessEvents);
    drop(global);

    assert_eq!(*status.lock(), Some(MapAsyncStatus::CallbackCancelled));
}

#[test]
fn error_scopes_are_per_device() {
    init();

    let global = Global::new();
    let first = context(&global);
    let second = context(&global);
    let procs = first.procs;

    procs
        .device_push_error_scope(&global, first.device, ErrorFilter::Validation)
        .unwrap();
    procs
        .device_push_error_scope(&global, second.device, ErrorFilter::Validation)
        .unwrap();

    // Empty usage is invalid.
    first.buffer(&global, BufferUsages::empty(), 4);

    let popped = Arc::new(Mutex::new(Vec::new()));

    for device in [first.device, second.device] {
        let slot = popped.clone();
        procs
            .device_pop_error_scope(
                &global,
                device,
                CallbackInfo::new(
                    CallbackMode::AllowSpontaneous,
                    Box::new(move |status, ty, _: &str| slot.lock().push((status, ty))),
                ),
            )
            .unwrap();
    }

    assert_eq!(
        *popped.lock(),
        [
            (PopErrorScopeStatus::Success, ErrorType::Validation),
            (PopErrorScopeStatus::Success, ErrorType::NoError),
        ]
    );
}

#[test]
fn table_is_shared_between_threads() {
    init();

    let global = Global::new();
    let cx = context(&global);
    let procs = cx.procs;

    let buffer = Ref::adopt(procs, &global, cx.buffer(&global, BufferUsages::COPY_DST, 4));

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let buffer = buffer.clone();
            let global = &global;
            let device = cx.device;

            scope.spawn(move || {
                for _ in 0..16 {
                    let owned = buffer.clone();
                    let encoder = procs
                        .device_create_command_encoder(global, device, None)
                        .unwrap();
                    procs.command_encoder_release(global, encoder).unwrap();
                    drop(owned);
                }
            });
        }
    });

    let buffer = buffer.into_id();
    cx.procs.buffer_release(&global, buffer).unwrap();
    cx.release(&global);

    assert!(global.generate_report().is_empty());
}

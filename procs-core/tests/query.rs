mod common;

use common::{context, context_with, init, Context};
use procs_core::{
    command::{QUERY_RESOLVE_BUFFER_ALIGNMENT, QUERY_SIZE},
    id,
    resource::QuerySetDescriptor,
    types::{BufferUsages, ErrorType, FeatureName, QueryType, QUERY_SET_MAX_QUERIES},
    Global,
};

fn query_set(global: &Global, cx: &Context, ty: QueryType, count: u32) -> id::QuerySetId {
    global
        .device_create_query_set(
            cx.device,
            &QuerySetDescriptor {
                label: None,
                ty,
                count,
            },
        )
        .unwrap()
}

/// Record commands with `record` and finish the encoder.
fn encode(cx: &Context, global: &Global, record: impl FnOnce(id::CommandEncoderId)) -> id::CommandBufferId {
    let encoder = global.device_create_command_encoder(cx.device, None).unwrap();
    record(encoder);
    global.command_encoder_finish(encoder, None).unwrap()
}

#[test]
fn query_set_counts_are_bounded() {
    init();

    let global = Global::new();
    let cx = context(&global);

    for (count, expected) in [
        (0, ErrorType::Validation),
        (1, ErrorType::NoError),
        (QUERY_SET_MAX_QUERIES, ErrorType::NoError),
        (QUERY_SET_MAX_QUERIES + 1, ErrorType::Validation),
    ] {
        assert_eq!(
            cx.errors(&global, || {
                query_set(&global, &cx, QueryType::Occlusion, count);
            }),
            expected,
            "{count}"
        );
    }

    // Timestamps need a feature.
    assert_eq!(
        cx.errors(&global, || {
            query_set(&global, &cx, QueryType::Timestamp, 1);
        }),
        ErrorType::Validation
    );
}

#[test]
fn resolve_query_set() {
    init();

    let global = Global::new();
    let cx = context(&global);
    let queue = global.device_get_queue(cx.device).unwrap();
    let queries = query_set(&global, &cx, QueryType::Occlusion, 4);

    let size = QUERY_RESOLVE_BUFFER_ALIGNMENT + 4 * QUERY_SIZE as u64;
    let resolve = cx.buffer(&global, BufferUsages::QUERY_RESOLVE, size);
    let small = cx.buffer(&global, BufferUsages::QUERY_RESOLVE, 16);
    let plain = cx.buffer(&global, BufferUsages::COPY_DST, size);

    let mut commands = None;
    assert_eq!(
        cx.errors(&global, || {
            commands = Some(encode(&cx, &global, |encoder| {
                global
                    .command_encoder_resolve_query_set(encoder, queries, 0, 4, resolve, 0)
                    .unwrap();
                global
                    .command_encoder_resolve_query_set(
                        encoder,
                        queries,
                        0,
                        4,
                        resolve,
                        QUERY_RESOLVE_BUFFER_ALIGNMENT,
                    )
                    .unwrap();
            }));
        }),
        ErrorType::NoError
    );
    assert_eq!(
        cx.errors(&global, || global.queue_submit(queue, &[commands.unwrap()]).unwrap()),
        ErrorType::NoError
    );

    for (first, count, destination, offset) in [
        // Range past the end of the set.
        (2, 3, resolve, 0),
        (u32::MAX, 2, resolve, 0),
        // Destination offset alignment.
        (0, 1, resolve, 8),
        // Destination usage.
        (0, 1, plain, 0),
        // Destination size.
        (0, 4, small, 0),
        (0, 1, resolve, 2 * QUERY_RESOLVE_BUFFER_ALIGNMENT),
    ] {
        assert_eq!(
            cx.errors(&global, || {
                encode(&cx, &global, |encoder| {
                    global
                        .command_encoder_resolve_query_set(encoder, queries, first, count, destination, offset)
                        .unwrap()
                });
            }),
            ErrorType::Validation,
            "{first} {count} {offset}"
        );
    }
}

#[test]
fn timestamps_need_the_feature() {
    init();

    let global = Global::new();
    let cx = context(&global);
    let queries = query_set(&global, &cx, QueryType::Occlusion, 2);

    assert_eq!(
        cx.errors(&global, || {
            encode(&cx, &global, |encoder| {
                global.command_encoder_write_timestamp(encoder, queries, 0).unwrap()
            });
        }),
        ErrorType::Validation
    );
}

#[test]
fn write_timestamp() {
    init();

    let global = Global::new();
    let cx = context_with(&global, &[FeatureName::TimestampQuery]);
    let queue = global.device_get_queue(cx.device).unwrap();
    let timestamps = query_set(&global, &cx, QueryType::Timestamp, 2);
    let occlusion = query_set(&global, &cx, QueryType::Occlusion, 2);

    let write = |query_set, index| {
        let mut commands = None;
        let ty = cx.errors(&global, || {
            commands = Some(encode(&cx, &global, |encoder| {
                global
                    .command_encoder_write_timestamp(encoder, query_set, index)
                    .unwrap()
            }));
        });
        (ty, commands.unwrap())
    };

    assert_eq!(write(timestamps, 1).0, ErrorType::NoError);
    assert_eq!(write(timestamps, 2).0, ErrorType::Validation);
    assert_eq!(write(occlusion, 0).0, ErrorType::Validation);

    // Destroyed query sets are caught at submit.
    let (ty, commands) = write(timestamps, 0);
    assert_eq!(ty, ErrorType::NoError);
    global.query_set_destroy(timestamps).unwrap();
    assert_eq!(
        cx.errors(&global, || global.queue_submit(queue, &[commands]).unwrap()),
        ErrorType::Validation
    );
}

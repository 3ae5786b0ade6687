mod common;

use common::{context, init, Context};
use procs_core::{
    command::{RenderBundleEncoderDescriptor, RenderPassColorAttachment, RenderPassDescriptor},
    id,
    types::{BufferUsages, ErrorType, TextureFormat, TextureUsages},
    Global,
};

fn bundle_encoder(cx: &Context, global: &Global, format: TextureFormat) -> id::RenderBundleEncoderId {
    global
        .device_create_render_bundle_encoder(
            cx.device,
            &RenderBundleEncoderDescriptor {
                color_formats: vec![Some(format)],
                ..Default::default()
            },
        )
        .unwrap()
}

/// Record a render pass into `view` that executes `bundles`.
fn execute(
    cx: &Context,
    global: &Global,
    view: id::TextureViewId,
    bundles: &[id::RenderBundleId],
) -> id::CommandBufferId {
    let encoder = global.device_create_command_encoder(cx.device, None).unwrap();

    let pass = global
        .command_encoder_begin_render_pass(
            encoder,
            &RenderPassDescriptor {
                color_attachments: vec![Some(RenderPassColorAttachment::new(view))],
                ..Default::default()
            },
        )
        .unwrap();

    global.render_pass_encoder_execute_bundles(pass, bundles).unwrap();
    global.render_pass_encoder_end(pass).unwrap();
    global.command_encoder_finish(encoder, None).unwrap()
}

fn target(cx: &Context, global: &Global) -> id::TextureViewId {
    let texture = cx.texture(
        global,
        TextureFormat::Rgba8Unorm,
        TextureUsages::RENDER_ATTACHMENT,
        4,
        4,
    );
    global.texture_create_view(texture, None).unwrap()
}

#[test]
fn bundles_run_in_compatible_passes() {
    init();

    let global = Global::new();
    let cx = context(&global);
    let queue = global.device_get_queue(cx.device).unwrap();
    let view = target(&cx, &global);
    let vertices = cx.buffer(&global, BufferUsages::VERTEX, 16);

    let mut bundle = None;
    assert_eq!(
        cx.errors(&global, || {
            let encoder = bundle_encoder(&cx, &global, TextureFormat::Rgba8Unorm);
            global.render_bundle_encoder_push_debug_group(encoder, "vertices").unwrap();
            global
                .render_bundle_encoder_set_vertex_buffer(encoder, 0, Some(vertices), 0, None)
                .unwrap();
            global.render_bundle_encoder_pop_debug_group(encoder).unwrap();
            bundle = Some(global.render_bundle_encoder_finish(encoder, None).unwrap());
        }),
        ErrorType::NoError
    );
    let bundle = bundle.unwrap();

    let other = {
        let encoder = bundle_encoder(&cx, &global, TextureFormat::Bgra8Unorm);
        global.render_bundle_encoder_finish(encoder, None).unwrap()
    };

    let mut commands = None;
    assert_eq!(
        cx.errors(&global, || commands = Some(execute(&cx, &global, view, &[bundle, bundle]))),
        ErrorType::NoError
    );
    assert_eq!(
        cx.errors(&global, || global.queue_submit(queue, &[commands.unwrap()]).unwrap()),
        ErrorType::NoError
    );

    // Attachment formats must match.
    assert_eq!(
        cx.errors(&global, || {
            execute(&cx, &global, view, &[bundle, other]);
        }),
        ErrorType::Validation
    );

    // The resources the bundle uses are checked when the pass is submitted.
    let commands = execute(&cx, &global, view, &[bundle]);
    global.buffer_destroy(vertices).unwrap();
    assert_eq!(
        cx.errors(&global, || global.queue_submit(queue, &[commands]).unwrap()),
        ErrorType::Validation
    );
}

#[test]
fn bundle_encoders_finish_once() {
    init();

    let global = Global::new();
    let cx = context(&global);
    let view = target(&cx, &global);
    let encoder = bundle_encoder(&cx, &global, TextureFormat::Rgba8Unorm);

    let bundle = global.render_bundle_encoder_finish(encoder, None).unwrap();

    assert_eq!(
        cx.errors(&global, || global.render_bundle_encoder_insert_debug_marker(encoder, "late").unwrap()),
        ErrorType::Validation
    );

    let mut finished_twice = None;
    assert_eq!(
        cx.errors(&global, || {
            finished_twice = Some(global.render_bundle_encoder_finish(encoder, None).unwrap());
        }),
        ErrorType::Validation
    );

    assert_eq!(
        cx.errors(&global, || {
            execute(&cx, &global, view, &[bundle]);
        }),
        ErrorType::NoError
    );
    assert_eq!(
        cx.errors(&global, || {
            execute(&cx, &global, view, &[finished_twice.unwrap()]);
        }),
        ErrorType::Validation
    );
}

#[test]
fn bundle_recording_errors_surface_at_finish() {
    init();

    let global = Global::new();
    let cx = context(&global);

    let unbalanced = bundle_encoder(&cx, &global, TextureFormat::Rgba8Unorm);
    global.render_bundle_encoder_push_debug_group(unbalanced, "open").unwrap();
    assert_eq!(
        cx.errors(&global, || {
            global.render_bundle_encoder_finish(unbalanced, None).unwrap();
        }),
        ErrorType::Validation
    );

    // Drawing without a pipeline is recorded, then reported by finish.
    let draw = bundle_encoder(&cx, &global, TextureFormat::Rgba8Unorm);
    assert_eq!(
        cx.errors(&global, || global.render_bundle_encoder_draw(draw, 3, 1, 0, 0).unwrap()),
        ErrorType::NoError
    );
    assert_eq!(
        cx.errors(&global, || {
            global.render_bundle_encoder_finish(draw, None).unwrap();
        }),
        ErrorType::Validation
    );

    // An encoder without attachments is an error object.
    let mut empty = None;
    assert_eq!(
        cx.errors(&global, || {
            empty = Some(
                global
                    .device_create_render_bundle_encoder(cx.device, &RenderBundleEncoderDescriptor::default())
                    .unwrap(),
            );
        }),
        ErrorType::Validation
    );
    assert_eq!(
        cx.errors(&global, || {
            global.render_bundle_encoder_finish(empty.unwrap(), None).unwrap();
        }),
        ErrorType::Validation
    );
}

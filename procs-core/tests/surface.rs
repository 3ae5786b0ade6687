mod common;

use common::{context, init};
use procs_core::{
    command::{TexelCopyBufferLayout, TexelCopyTextureInfo},
    present::{SurfaceConfiguration, SurfaceDescriptor, SurfaceError},
    types::{ErrorType, Extent3d, SurfaceGetCurrentTextureStatus, TextureFormat, TextureUsages},
    Global,
};

#[test]
fn acquire_and_present() {
    init();

    let global = Global::new();
    let cx = context(&global);
    let queue = global.device_get_queue(cx.device).unwrap();
    let surface = global
        .instance_create_surface(cx.instance, &SurfaceDescriptor::default())
        .unwrap();

    let output = global.surface_get_current_texture(surface).unwrap();
    assert_eq!(output.status, SurfaceGetCurrentTextureStatus::Error);
    assert_eq!(output.texture, None);
    assert_eq!(global.surface_present(surface), Err(SurfaceError::NotConfigured));

    let config = SurfaceConfiguration {
        usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::COPY_DST,
        ..SurfaceConfiguration::new(cx.device, TextureFormat::Bgra8Unorm, 64, 32)
    };
    global.surface_configure(surface, &config).unwrap();

    // Nothing was acquired yet.
    assert_eq!(global.surface_present(surface), Err(SurfaceError::NothingToPresent));

    let first = global.surface_get_current_texture(surface).unwrap();
    assert_eq!(first.status, SurfaceGetCurrentTextureStatus::SuccessOptimal);
    let texture = first.texture.unwrap();
    assert_eq!(global.texture_get_width(texture).unwrap(), 64);
    assert_eq!(global.texture_get_height(texture).unwrap(), 32);
    assert_eq!(global.texture_get_format(texture).unwrap(), TextureFormat::Bgra8Unorm);

    // Acquiring again before presenting hands back the same texture.
    let second = global.surface_get_current_texture(surface).unwrap();
    assert_eq!(second.texture, Some(texture));

    let write = || {
        global
            .queue_write_texture(
                queue,
                &TexelCopyTextureInfo::new(texture),
                &[0; 4],
                &TexelCopyBufferLayout::default(),
                &Extent3d::default(),
            )
            .unwrap()
    };

    assert_eq!(cx.errors(&global, write), ErrorType::NoError);

    global.surface_present(surface).unwrap();
    assert_eq!(global.surface_present(surface), Err(SurfaceError::NothingToPresent));

    // The presented texture is destroyed.
    assert_eq!(cx.errors(&global, write), ErrorType::Validation);

    let next = global.surface_get_current_texture(surface).unwrap();
    assert_ne!(next.texture, Some(texture));
}

#[test]
fn unconfigure_destroys_the_acquired_texture() {
    init();

    let global = Global::new();
    let cx = context(&global);
    let surface = global
        .instance_create_surface(cx.instance, &SurfaceDescriptor::default())
        .unwrap();

    let config = SurfaceConfiguration::new(cx.device, TextureFormat::Rgba8Unorm, 16, 16);
    global.surface_configure(surface, &config).unwrap();

    let texture = global
        .surface_get_current_texture(surface)
        .unwrap()
        .texture
        .unwrap();

    global.surface_unconfigure(surface).unwrap();
    assert_eq!(global.surface_present(surface), Err(SurfaceError::NotConfigured));

    let view = global.texture_create_view(texture, None).unwrap();
    let encoder = global.device_create_command_encoder(cx.device, None).unwrap();

    let pass = procs_core::command::RenderPassDescriptor {
        color_attachments: vec![Some(procs_core::command::RenderPassColorAttachment::new(view))],
        ..Default::default()
    };

    assert_eq!(
        cx.errors(&global, || {
            let pass = global.command_encoder_begin_render_pass(encoder, &pass).unwrap();
            global.render_pass_encoder_end(pass).unwrap();
            global.command_encoder_finish(encoder, None).unwrap();
        }),
        ErrorType::Validation
    );
}

#[test]
fn configuration_is_validated() {
    init();

    let global = Global::new();
    let cx = context(&global);
    let surface = global
        .instance_create_surface(cx.instance, &SurfaceDescriptor::default())
        .unwrap();

    let zero = SurfaceConfiguration::new(cx.device, TextureFormat::Bgra8Unorm, 0, 16);
    assert_eq!(
        cx.errors(&global, || assert!(global.surface_configure(surface, &zero).is_err())),
        ErrorType::Validation
    );

    let output = global.surface_get_current_texture(surface).unwrap();
    assert_eq!(output.status, SurfaceGetCurrentTextureStatus::Error);
}

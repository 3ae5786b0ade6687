mod common;

use common::{context, context_with, init};
use procs_core::{
    binding_model::{BindingResource, ResourceTableDescriptor, ResourceTableError},
    command::TexelCopyTextureInfo,
    device::queue::{CopyTextureForBrowserOptions, ImageCopyExternalTexture},
    resource::{ExternalTextureDescriptor, TextureViewDescriptor},
    types::{
        BufferMapState, BufferUsages, CallbackMode, ErrorType, Extent3d, FeatureName,
        MapAsyncStatus, MapMode, Origin3d, TextureFormat, TextureUsages, TextureViewDimension,
    },
    Global,
};

#[test]
fn misaligned_maps_are_rejected() {
    init();

    let global = Global::new();
    let cx = context(&global);
    let buffer = cx.buffer(&global, BufferUsages::MAP_READ, 16);

    for (mode, offset, size) in [
        // Offsets are aligned to 8 bytes.
        (MapMode::READ, 4, 4),
        // Sizes are aligned to 4 bytes.
        (MapMode::READ, 0, 6),
        (MapMode::READ | MapMode::WRITE, 0, 8),
        (MapMode::WRITE, 0, 8),
        (MapMode::READ, 8, 16),
    ] {
        let mut status = None;

        let ty = cx.errors(&global, || {
            status = Some(cx.map_range(&global, buffer, mode, offset, size, CallbackMode::AllowSpontaneous).1);
        });

        assert_eq!(ty, ErrorType::Validation, "{mode:?} {offset} {size}");
        assert_eq!(*status.unwrap().lock(), Some(MapAsyncStatus::Error));
        assert_eq!(global.buffer_get_map_state(buffer).unwrap(), BufferMapState::Unmapped);
    }

    let (_, status) = cx.map_range(&global, buffer, MapMode::READ, 8, 8, CallbackMode::AllowSpontaneous);
    assert_eq!(*status.lock(), Some(MapAsyncStatus::Success));
    assert_eq!(global.buffer_get_map_state(buffer).unwrap(), BufferMapState::Mapped);

    let mut status = None;
    assert_eq!(
        cx.errors(&global, || {
            status = Some(cx.map(&global, buffer, CallbackMode::AllowSpontaneous).1);
        }),
        ErrorType::Validation
    );
    assert_eq!(*status.unwrap().lock(), Some(MapAsyncStatus::Error));
}

#[test]
fn resource_table_slots() {
    init();

    let global = Global::new();
    let cx = context_with(&global, &[FeatureName::ResourceTables]);

    let table = global
        .device_create_resource_table(
            cx.device,
            &ResourceTableDescriptor {
                label: None,
                size: 2,
            },
        )
        .unwrap();

    let sampler = BindingResource::Sampler(global.device_create_sampler(cx.device, None).unwrap());

    assert_eq!(global.resource_table_insert_binding(table, &sampler), Ok(0));
    assert_eq!(global.resource_table_insert_binding(table, &sampler), Ok(1));
    assert_eq!(
        global.resource_table_insert_binding(table, &sampler),
        Err(ResourceTableError::Full)
    );

    // Removal frees the slot for the next insert, even twice over.
    global.resource_table_remove_binding(table, 0).unwrap();
    global.resource_table_remove_binding(table, 0).unwrap();
    assert_eq!(global.resource_table_insert_binding(table, &sampler), Ok(0));

    assert_eq!(
        global.resource_table_remove_binding(table, 5),
        Err(ResourceTableError::SlotOutOfRange { slot: 5, size: 2 })
    );

    global.resource_table_update(table, 1, &sampler).unwrap();
    assert_eq!(
        global.resource_table_update(table, 2, &sampler),
        Err(ResourceTableError::SlotOutOfRange { slot: 2, size: 2 })
    );

    let released = global.device_create_sampler(cx.device, None).unwrap();
    global.sampler_release(released).unwrap();
    assert!(matches!(
        global.resource_table_update(table, 1, &BindingResource::Sampler(released)),
        Err(ResourceTableError::Object(..))
    ));

    global.resource_table_destroy(table).unwrap();
    assert_eq!(global.resource_table_get_size(table).unwrap(), 2);
    assert_eq!(
        global.resource_table_insert_binding(table, &sampler),
        Err(ResourceTableError::Destroyed)
    );
    assert_eq!(
        global.resource_table_remove_binding(table, 0),
        Err(ResourceTableError::Destroyed)
    );
}

#[test]
fn resource_table_without_feature_is_an_error_table() {
    init();

    let global = Global::new();
    let cx = context(&global);

    let mut table = None;
    assert_eq!(
        cx.errors(&global, || {
            table = Some(
                global
                    .device_create_resource_table(cx.device, &ResourceTableDescriptor { label: None, size: 1 })
                    .unwrap(),
            );
        }),
        ErrorType::Validation
    );

    let sampler = BindingResource::Sampler(global.device_create_sampler(cx.device, None).unwrap());
    assert_eq!(
        global.resource_table_insert_binding(table.unwrap(), &sampler),
        Err(ResourceTableError::ErrorTable)
    );
}

#[test]
fn external_texture_states() {
    init();

    let global = Global::new();
    let cx = context(&global);
    let queue = global.device_get_queue(cx.device).unwrap();

    let source = cx.texture(
        &global,
        TextureFormat::Rgba8Unorm,
        TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_SRC,
        4,
        4,
    );
    let destination = cx.texture(
        &global,
        TextureFormat::Rgba8Unorm,
        TextureUsages::COPY_DST | TextureUsages::RENDER_ATTACHMENT,
        4,
        4,
    );

    let plane = global.texture_create_view(source, None).unwrap();
    let external = global
        .device_create_external_texture(
            cx.device,
            &ExternalTextureDescriptor {
                label: None,
                plane0: plane,
                plane1: None,
                visible_size: None,
            },
        )
        .unwrap();

    let size = Extent3d {
        width: 4,
        height: 4,
        depth_or_array_layers: 1,
    };

    let copy = || {
        global
            .queue_copy_external_texture_for_browser(
                queue,
                &ImageCopyExternalTexture {
                    external_texture: external,
                    origin: Origin3d::default(),
                    natural_size: size,
                },
                &TexelCopyTextureInfo::new(destination),
                &size,
                &CopyTextureForBrowserOptions::default(),
            )
            .unwrap()
    };

    assert_eq!(cx.errors(&global, copy), ErrorType::NoError);

    global.external_texture_expire(external).unwrap();
    assert_eq!(cx.errors(&global, copy), ErrorType::Validation);

    global.external_texture_refresh(external).unwrap();
    assert_eq!(cx.errors(&global, copy), ErrorType::NoError);

    global.external_texture_destroy(external).unwrap();
    assert_eq!(cx.errors(&global, copy), ErrorType::Validation);

    // Expiring a destroyed texture keeps it destroyed, refreshing it fails.
    global.external_texture_expire(external).unwrap();
    assert_eq!(
        cx.errors(&global, || global.external_texture_refresh(external).unwrap()),
        ErrorType::Validation
    );
    assert_eq!(cx.errors(&global, copy), ErrorType::Validation);
}

#[test]
fn external_texture_planes_are_2d() {
    init();

    let global = Global::new();
    let cx = context(&global);

    let texture = cx.texture(&global, TextureFormat::Rgba8Unorm, TextureUsages::TEXTURE_BINDING, 4, 4);
    let array = global
        .texture_create_view(
            texture,
            Some(&TextureViewDescriptor {
                dimension: Some(TextureViewDimension::D2Array),
                ..Default::default()
            }),
        )
        .unwrap();

    assert_eq!(
        cx.errors(&global, || {
            global
                .device_create_external_texture(
                    cx.device,
                    &ExternalTextureDescriptor {
                        label: None,
                        plane0: array,
                        plane1: None,
                        visible_size: None,
                    },
                )
                .unwrap();
        }),
        ErrorType::Validation
    );
}

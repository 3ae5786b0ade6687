mod common;

use common::{context, init, Context};
use procs_core::{
    binding_model::{
        BindGroupDescriptor, BindGroupEntry, BindGroupLayoutDescriptor, BindGroupLayoutEntry,
        BindingResource, BindingType, BufferBinding, PipelineLayoutDescriptor,
    },
    id,
    types::{
        BufferBindingType, BufferUsages, ErrorType, SamplerBindingType, ShaderStages, TextureFormat,
    },
    Global,
};

fn uniform(binding: u32) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
    }
}

fn sampler(binding: u32, ty: SamplerBindingType) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::FRAGMENT,
        ty: BindingType::Sampler(ty),
    }
}

fn layout(cx: &Context, global: &Global, entries: Vec<BindGroupLayoutEntry>) -> id::BindGroupLayoutId {
    global
        .device_create_bind_group_layout(
            cx.device,
            &BindGroupLayoutDescriptor {
                label: None,
                entries,
            },
        )
        .unwrap()
}

fn buffer_entry(binding: u32, buffer: id::BufferId, offset: u64, size: Option<u64>) -> BindGroupEntry {
    BindGroupEntry {
        binding,
        resource: BindingResource::Buffer(BufferBinding { buffer, offset, size }),
    }
}

#[test]
fn bind_group_layouts_are_validated() {
    init();

    let global = Global::new();
    let cx = context(&global);

    let storage = |read_only| BindGroupLayoutEntry {
        binding: 0,
        visibility: ShaderStages::VERTEX,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
    };

    let texel = BindGroupLayoutEntry {
        binding: 0,
        visibility: ShaderStages::COMPUTE,
        ty: BindingType::TexelBuffer {
            format: TextureFormat::Rgba8Unorm,
        },
    };

    for (entries, expected) in [
        (vec![uniform(0), sampler(1, SamplerBindingType::Filtering)], ErrorType::NoError),
        (vec![uniform(3), uniform(3)], ErrorType::Validation),
        (vec![uniform(1000)], ErrorType::Validation),
        (vec![storage(true)], ErrorType::NoError),
        // Vertex shaders can't write to storage buffers.
        (vec![storage(false)], ErrorType::Validation),
        (vec![texel], ErrorType::Validation),
    ] {
        assert_eq!(
            cx.errors(&global, || {
                layout(&cx, &global, entries.clone());
            }),
            expected,
            "{entries:?}"
        );
    }
}

#[test]
fn bind_groups_match_their_layout() {
    init();

    let global = Global::new();
    let cx = context(&global);

    let group = layout(
        &cx,
        &global,
        vec![uniform(0), sampler(1, SamplerBindingType::Filtering)],
    );
    let comparison = layout(&cx, &global, vec![sampler(0, SamplerBindingType::Comparison)]);

    let buffer = cx.buffer(&global, BufferUsages::UNIFORM, 512);
    let vertices = cx.buffer(&global, BufferUsages::VERTEX, 512);
    let filtering = BindGroupEntry {
        binding: 1,
        resource: BindingResource::Sampler(global.device_create_sampler(cx.device, None).unwrap()),
    };

    let create = |layout, entries: Vec<BindGroupEntry>| {
        cx.errors(&global, || {
            global
                .device_create_bind_group(
                    cx.device,
                    &BindGroupDescriptor {
                        label: None,
                        layout,
                        entries,
                    },
                )
                .unwrap();
        })
    };

    assert_eq!(
        create(group, vec![buffer_entry(0, buffer, 0, None), filtering]),
        ErrorType::NoError
    );
    assert_eq!(
        create(group, vec![buffer_entry(0, buffer, 256, Some(16)), filtering]),
        ErrorType::NoError
    );

    for entries in [
        // Missing, unexpected and repeated bindings.
        vec![buffer_entry(0, buffer, 0, None)],
        vec![buffer_entry(0, buffer, 0, None), filtering, buffer_entry(2, buffer, 0, None)],
        vec![buffer_entry(0, buffer, 0, None), buffer_entry(0, buffer, 0, None), filtering],
        // Resource doesn't fit the entry.
        vec![buffer_entry(0, vertices, 0, None), filtering],
        vec![buffer_entry(0, buffer, 0, Some(1024)), filtering],
        vec![buffer_entry(0, buffer, 16, Some(16)), filtering],
        vec![buffer_entry(0, buffer, 0, Some(0)), filtering],
        vec![BindGroupEntry { binding: 0, ..filtering }, BindGroupEntry { binding: 1, ..filtering }],
    ] {
        assert_eq!(create(group, entries.clone()), ErrorType::Validation, "{entries:?}");
    }

    assert_eq!(
        create(comparison, vec![BindGroupEntry { binding: 0, ..filtering }]),
        ErrorType::Validation
    );

    global.buffer_release(buffer).unwrap();
    assert_eq!(
        create(group, vec![buffer_entry(0, buffer, 0, None), filtering]),
        ErrorType::Validation
    );
}

#[test]
fn error_layouts_poison_their_users() {
    init();

    let global = Global::new();
    let cx = context(&global);

    let mut broken = None;
    assert_eq!(
        cx.errors(&global, || broken = Some(layout(&cx, &global, vec![uniform(0), uniform(0)]))),
        ErrorType::Validation
    );
    let broken = broken.unwrap();

    assert_eq!(
        cx.errors(&global, || {
            global
                .device_create_bind_group(
                    cx.device,
                    &BindGroupDescriptor {
                        label: None,
                        layout: broken,
                        entries: Vec::new(),
                    },
                )
                .unwrap();
        }),
        ErrorType::Validation
    );

    assert_eq!(
        cx.errors(&global, || {
            global
                .device_create_pipeline_layout(
                    cx.device,
                    &PipelineLayoutDescriptor {
                        bind_group_layouts: vec![None, Some(broken)],
                        ..Default::default()
                    },
                )
                .unwrap();
        }),
        ErrorType::Validation
    );
}

#[test]
fn pipeline_layouts_are_bounded() {
    init();

    let global = Global::new();
    let cx = context(&global);
    let uniforms = layout(&cx, &global, vec![uniform(0)]);

    let create = |desc: PipelineLayoutDescriptor| {
        cx.errors(&global, || {
            global.device_create_pipeline_layout(cx.device, &desc).unwrap();
        })
    };

    assert_eq!(
        create(PipelineLayoutDescriptor {
            bind_group_layouts: vec![Some(uniforms), None, Some(uniforms)],
            ..Default::default()
        }),
        ErrorType::NoError
    );
    assert_eq!(
        create(PipelineLayoutDescriptor {
            bind_group_layouts: vec![None; 9],
            ..Default::default()
        }),
        ErrorType::Validation
    );
    assert_eq!(
        create(PipelineLayoutDescriptor {
            immediate_size: 6,
            ..Default::default()
        }),
        ErrorType::Validation
    );
}

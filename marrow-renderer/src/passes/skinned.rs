use crate::{Camera, Entity, Light, Material, SkinnedVertex};

use super::FrameBindings;

/// Draw dispatch for skinned entities. Owns the pipeline and the per-frame
/// camera/light bindings; entities rebind everything else on every draw.
pub struct SkinnedPass {
    pipeline: wgpu::RenderPipeline,
    frame: FrameBindings,
}

impl SkinnedPass {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        let frame = FrameBindings::new(device);

        let shader = device.create_shader_module(wgpu::include_wgsl!("skinned.wgsl"));

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("SkinnedPass pipeline layout"),
            bind_group_layouts: &[
                &frame.bind_group_layout,
                &device.create_bind_group_layout(Entity::DESC),
                &device.create_bind_group_layout(Material::DESC),
            ],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("SkinnedPass render pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[SkinnedVertex::LAYOUT],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
                format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        Self { pipeline, frame }
    }

    /// Uploads this frame's camera/light payload.
    pub fn prepare(&self, queue: &wgpu::Queue, camera: &Camera, lights: &[Light]) {
        self.frame.update(queue, camera, lights);
    }

    pub fn begin(&self, rpass: &mut wgpu::RenderPass<'_>) {
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.frame.bind_group, &[]);
    }
}

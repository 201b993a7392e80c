use wgpu::util::DeviceExt;

use crate::Texture;

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct MaterialUniforms {
    color: [f32; 4],
    roughness: f32,
    _pad: [f32; 3],
}

/// Per-channel texture maps. Unbound channels fall back to flat single-pixel
/// textures so one pipeline serves textured and untextured materials.
#[derive(Default)]
pub struct MaterialTextures {
    pub albedo: Option<Texture>,
    pub normal: Option<Texture>,
    pub roughness: Option<Texture>,
    pub metalness: Option<Texture>,
}

/// Shader inputs for one surface: a color tint, a roughness scalar and four
/// texture channels bound at fixed slots. Shared across entities; wrap in an
/// `Arc` and clone the handle.
pub struct Material {
    pub color: glam::Vec4,
    pub roughness: f32,
    bind_group: wgpu::BindGroup,
}

impl Material {
    pub const DESC: &'static wgpu::BindGroupLayoutDescriptor<'static> =
        &wgpu::BindGroupLayoutDescriptor {
            label: Some("Material bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Albedo
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Normal
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Roughness
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Metalness
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 5,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        };

    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        color: glam::Vec4,
        roughness: f32,
        textures: MaterialTextures,
        sampler: &wgpu::Sampler,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Material buffer: {label}")),
            contents: bytemuck::bytes_of(&MaterialUniforms {
                color: color.to_array(),
                roughness,
                _pad: [0.0; 3],
            }),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let albedo = textures.albedo.unwrap_or_else(|| {
            Texture::flat(device, queue, [255, 255, 255, 255], "Albedo fallback")
        });
        let normal = textures.normal.unwrap_or_else(|| {
            Texture::flat(device, queue, [128, 128, 255, 255], "Normal fallback")
        });
        let roughness_map = textures.roughness.unwrap_or_else(|| {
            Texture::flat(device, queue, [255, 255, 255, 255], "Roughness fallback")
        });
        let metalness = textures.metalness.unwrap_or_else(|| {
            Texture::flat(device, queue, [0, 0, 0, 255], "Metalness fallback")
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("Material bind group: {label}")),
            layout: &device.create_bind_group_layout(Self::DESC),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&albedo.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&normal.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&roughness_map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&metalness.view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        Self {
            color,
            roughness,
            bind_group,
        }
    }

    pub fn bind(&self, rpass: &mut wgpu::RenderPass<'_>) {
        rpass.set_bind_group(2, &self.bind_group, &[]);
    }
}

use crate::{Camera, Light, MAX_LIGHTS};

mod mesh;
mod skinned;

pub use mesh::MeshPass;
pub use skinned::SkinnedPass;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct FrameUniforms {
    camera_position: [f32; 3],
    _pad: f32,
    lights: [Light; MAX_LIGHTS],
}

/// Per-frame camera/light payload shared by every entity drawn in a pass.
pub(crate) struct FrameBindings {
    buffer: wgpu::Buffer,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
}

impl FrameBindings {
    const DESC: &'static wgpu::BindGroupLayoutDescriptor<'static> =
        &wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame bind group layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        };

    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as _,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(Self::DESC);

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self {
            buffer,
            bind_group_layout,
            bind_group,
        }
    }

    /// Write-discard update. Light slots past [`MAX_LIGHTS`] are ignored.
    pub fn update(&self, queue: &wgpu::Queue, camera: &Camera, lights: &[Light]) {
        let mut frame = FrameUniforms {
            camera_position: camera.position().to_array(),
            _pad: 0.0,
            lights: [Light::default(); MAX_LIGHTS],
        };
        for (slot, light) in frame.lights.iter_mut().zip(lights) {
            *slot = *light;
        }

        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&frame));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_uniforms_match_their_shader_layout() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 16 + MAX_LIGHTS * 80);
    }
}

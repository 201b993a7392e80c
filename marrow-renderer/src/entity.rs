use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::{Camera, Material, Mesh, Skeleton, Transform};

/// Upper bound on the flattened joint array handed to the GPU per draw.
/// Skeletons above this are rejected at entity construction.
pub const MAX_JOINTS: usize = 256;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct EntityUniforms {
    world: glam::Mat4,
    world_inv_transpose: glam::Mat4,
    view: glam::Mat4,
    projection: glam::Mat4,
}

impl EntityUniforms {
    fn new(transform: &Transform, camera: &Camera) -> Self {
        Self {
            world: transform.world(),
            world_inv_transpose: transform.world_inv_transpose(),
            view: camera.view,
            projection: camera.projection,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct AnimatedEntityUniforms {
    entity: EntityUniforms,
    joints: [glam::Mat4; MAX_JOINTS],
}

/// A (material, mesh) pairing within one imported entity.
pub struct Submesh {
    pub material: Arc<Material>,
    pub mesh: Mesh,
}

fn entity_bindings(device: &wgpu::Device, label: &str, size: u64) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(&format!("{label} uniforms")),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("{label} bind group")),
        layout: &device.create_bind_group_layout(Entity::DESC),
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    });

    (buffer, bind_group)
}

/// A drawable static model: a transform plus its submesh collection.
pub struct Entity {
    pub transform: Transform,
    submeshes: Vec<Submesh>,
    uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl Entity {
    pub const DESC: &'static wgpu::BindGroupLayoutDescriptor<'static> =
        &wgpu::BindGroupLayoutDescriptor {
            label: Some("Entity bind group layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        };

    pub fn new(device: &wgpu::Device, transform: Transform, submeshes: Vec<Submesh>) -> Self {
        let (uniforms, bind_group) =
            entity_bindings(device, "Entity", std::mem::size_of::<EntityUniforms>() as u64);

        Self {
            transform,
            submeshes,
            uniforms,
            bind_group,
        }
    }

    pub fn submeshes(&self) -> &[Submesh] {
        &self.submeshes
    }

    /// Rewrites the transform payload, then binds and draws every submesh.
    /// Nothing is retained between calls.
    pub fn draw(&self, queue: &wgpu::Queue, rpass: &mut wgpu::RenderPass<'_>, camera: &Camera) {
        queue.write_buffer(
            &self.uniforms,
            0,
            bytemuck::bytes_of(&EntityUniforms::new(&self.transform, camera)),
        );
        rpass.set_bind_group(1, &self.bind_group, &[]);

        for submesh in &self.submeshes {
            submesh.material.bind(rpass);
            submesh.mesh.draw(rpass);
        }
    }
}

/// A drawable skinned model. Owns its skeleton exclusively; materials are
/// shared handles.
pub struct AnimatedEntity {
    pub transform: Transform,
    skeleton: Skeleton,
    submeshes: Vec<Submesh>,
    uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl AnimatedEntity {
    pub fn new(
        device: &wgpu::Device,
        transform: Transform,
        skeleton: Skeleton,
        submeshes: Vec<Submesh>,
    ) -> Result<Self> {
        if skeleton.joint_count() > MAX_JOINTS {
            return Err(anyhow!(
                "skeleton has {} joints, draw dispatch supports at most {MAX_JOINTS}",
                skeleton.joint_count()
            ));
        }

        let (uniforms, bind_group) = entity_bindings(
            device,
            "AnimatedEntity",
            std::mem::size_of::<AnimatedEntityUniforms>() as u64,
        );

        Ok(Self {
            transform,
            skeleton,
            submeshes,
            uniforms,
            bind_group,
        })
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn submeshes(&self) -> &[Submesh] {
        &self.submeshes
    }

    /// Rewrites the transform payload and the flattened joint array, then
    /// binds and draws every submesh.
    pub fn draw(&self, queue: &wgpu::Queue, rpass: &mut wgpu::RenderPass<'_>, camera: &Camera) {
        let mut joints = [glam::Mat4::IDENTITY; MAX_JOINTS];
        for (slot, joint) in joints.iter_mut().zip(self.skeleton.joints()) {
            *slot = joint.inv_bind_pose;
        }

        queue.write_buffer(
            &self.uniforms,
            0,
            bytemuck::bytes_of(&AnimatedEntityUniforms {
                entity: EntityUniforms::new(&self.transform, camera),
                joints,
            }),
        );
        rpass.set_bind_group(1, &self.bind_group, &[]);

        for submesh in &self.submeshes {
            submesh.material.bind(rpass);
            submesh.mesh.draw(rpass);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_payloads_match_their_shader_layouts() {
        assert_eq!(std::mem::size_of::<EntityUniforms>(), 256);
        assert_eq!(
            std::mem::size_of::<AnimatedEntityUniforms>(),
            256 + MAX_JOINTS * 64
        );
    }
}

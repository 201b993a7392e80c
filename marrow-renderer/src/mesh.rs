use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
}

impl Vertex {
    pub const SIZE: wgpu::BufferAddress = std::mem::size_of::<Self>() as _;

    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: Self::SIZE,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![
            // Position
            0 => Float32x3,
            // Normal
            1 => Float32x3,
            // UV
            2 => Float32x2,
            // Tangent
            3 => Float32x3,
        ],
    };
}

/// [`Vertex`] extended with fixed-capacity joint influences.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SkinnedVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
    pub joint_weights: [f32; 3],
    pub joint_indices: [i32; 4],
}

impl SkinnedVertex {
    /// Marks an unused influence slot.
    pub const NO_JOINT: i32 = -1;

    pub const SIZE: wgpu::BufferAddress = std::mem::size_of::<Self>() as _;

    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: Self::SIZE,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x3,
            2 => Float32x2,
            3 => Float32x3,
            // Joint weights
            4 => Float32x3,
            // Joint indices
            5 => Sint32x4,
        ],
    };
}

impl Default for SkinnedVertex {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            normal: [0.0; 3],
            uv: [0.0; 2],
            tangent: [0.0; 3],
            joint_weights: [0.0; 3],
            joint_indices: [Self::NO_JOINT; 4],
        }
    }
}

/// Immutable GPU vertex/index buffer pair.
pub struct Mesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    vertex_count: u32,
    index_count: u32,
}

impl Mesh {
    pub fn new<V: bytemuck::Pod>(
        device: &wgpu::Device,
        label: &str,
        vertices: &[V],
        indices: &[u32],
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Vertex buffer: {label}")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Index buffer: {label}")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            vertex_count: vertices.len() as u32,
            index_count: indices.len() as u32,
        }
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn draw(&self, rpass: &mut wgpu::RenderPass<'_>) {
        rpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        rpass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// Rebuilds per-vertex tangents from triangle geometry and UV gradients.
///
/// Tangents accumulate per triangle, then get Gram-Schmidt-orthogonalized
/// against the vertex normal and normalized. Triangles with a degenerate UV
/// mapping contribute nothing and are skipped with a warning; vertices no
/// triangle contributes to end up with a zero tangent.
pub fn compute_tangents(
    positions: &[glam::Vec3],
    normals: &[glam::Vec3],
    uvs: &[glam::Vec2],
    indices: &[u32],
) -> Vec<glam::Vec3> {
    let mut tangents = vec![glam::Vec3::ZERO; positions.len()];

    for triangle in indices.chunks_exact(3) {
        let [i1, i2, i3] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];

        let edge1 = positions[i2] - positions[i1];
        let edge2 = positions[i3] - positions[i1];
        let delta1 = uvs[i2] - uvs[i1];
        let delta2 = uvs[i3] - uvs[i1];

        let denom = delta1.x * delta2.y - delta2.x * delta1.y;
        if denom.abs() <= f32::EPSILON {
            log::warn!("triangle ({i1} {i2} {i3}) has a degenerate UV mapping, tangent skipped");
            continue;
        }

        let tangent = (edge1 * delta2.y - edge2 * delta1.y) / denom;
        tangents[i1] += tangent;
        tangents[i2] += tangent;
        tangents[i3] += tangent;
    }

    for (tangent, normal) in tangents.iter_mut().zip(normals) {
        *tangent = (*tangent - *normal * normal.dot(*tangent)).normalize_or_zero();
    }

    tangents
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{vec2, vec3, Vec2, Vec3};

    #[test]
    fn unit_triangle_tangent_follows_u() {
        let positions = [vec3(0.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0), vec3(0.0, 1.0, 0.0)];
        let normals = [Vec3::Z; 3];
        let uvs = [vec2(0.0, 0.0), vec2(1.0, 0.0), vec2(0.0, 1.0)];

        for tangent in compute_tangents(&positions, &normals, &uvs, &[0, 1, 2]) {
            assert!(tangent.abs_diff_eq(Vec3::X, 1e-5));
        }
    }

    #[test]
    fn tangents_are_orthogonal_to_normals() {
        // Two triangles of a quad folded slightly out of plane.
        let positions = [
            vec3(0.0, 0.0, 0.0),
            vec3(1.0, 0.0, 0.0),
            vec3(1.0, 1.0, 0.2),
            vec3(0.0, 1.0, 0.0),
        ];
        let normals = vec![vec3(0.1, 0.2, 1.0).normalize(); 4];
        let uvs = [
            vec2(0.0, 0.0),
            vec2(1.0, 0.0),
            vec2(1.0, 1.0),
            vec2(0.0, 1.0),
        ];
        let indices = [0, 1, 2, 0, 2, 3];

        for (tangent, normal) in compute_tangents(&positions, &normals, &uvs, &indices)
            .iter()
            .zip(&normals)
        {
            assert!(tangent.dot(*normal).abs() < 1e-5);
            assert!((tangent.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn degenerate_uv_triangle_is_skipped() {
        let positions = [vec3(0.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0), vec3(0.0, 1.0, 0.0)];
        let normals = [Vec3::Z; 3];
        let uvs = [Vec2::ZERO; 3];

        for tangent in compute_tangents(&positions, &normals, &uvs, &[0, 1, 2]) {
            assert!(tangent.is_finite());
            assert_eq!(tangent, Vec3::ZERO);
        }
    }

    #[test]
    fn vertex_layouts_match_their_strides() {
        assert_eq!(Vertex::SIZE, 44);
        assert_eq!(SkinnedVertex::SIZE, 72);
        assert_eq!(
            SkinnedVertex::default().joint_indices,
            [SkinnedVertex::NO_JOINT; 4]
        );
    }
}

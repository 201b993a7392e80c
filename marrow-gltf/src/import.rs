use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use renderer::{
    compute_tangents, default_sampler, wgpu, AnimatedEntity, Entity, Joint, Material,
    MaterialTextures, Mesh, Skeleton, SkinnedVertex, Submesh, Texture, Transform, Vertex,
    MAX_JOINTS, NO_PARENT,
};

use crate::{
    skinning::apply_bone_weights, ImportError, MeshRecord, SceneDocument,
};

/// Imports a scene document as a skinned entity.
///
/// The whole pipeline runs before anything is committed: a failure in any
/// stage leaves no partially built entity behind.
pub fn load_animated(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    doc: &SceneDocument,
) -> Result<AnimatedEntity, ImportError> {
    validate(doc)?;

    let skeleton = build_skeleton(doc)?;
    let materials = build_materials(device, queue, doc)?;

    // Transient name cross-reference; discarded once skinning is assembled.
    let joint_indices: HashMap<&str, usize> = skeleton
        .joints()
        .iter()
        .enumerate()
        .map(|(index, joint)| (joint.name.as_str(), index))
        .collect();

    let mut submeshes = Vec::with_capacity(doc.meshes.len());
    for record in &doc.meshes {
        let (vertices, indices) = assemble_skinned(record, &joint_indices)?;
        submeshes.push(Submesh {
            material: materials.resolve(record.material),
            mesh: Mesh::new(device, &record.name, &vertices, &indices),
        });
    }

    log::debug!(
        "imported skinned entity: {} submeshes, {} joints, {} materials",
        submeshes.len(),
        skeleton.joint_count(),
        doc.materials.len(),
    );

    Ok(AnimatedEntity::new(
        device,
        Transform::default(),
        skeleton,
        submeshes,
    )?)
}

/// Imports a scene document as a static entity, ignoring any bone data.
pub fn load_static(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    doc: &SceneDocument,
) -> Result<Entity, ImportError> {
    validate(doc)?;

    let materials = build_materials(device, queue, doc)?;

    let mut submeshes = Vec::with_capacity(doc.meshes.len());
    for record in &doc.meshes {
        let (vertices, indices) = assemble_static(record);
        submeshes.push(Submesh {
            material: materials.resolve(record.material),
            mesh: Mesh::new(device, &record.name, &vertices, &indices),
        });
    }

    log::debug!(
        "imported static entity: {} submeshes, {} materials",
        submeshes.len(),
        doc.materials.len(),
    );

    Ok(Entity::new(device, Transform::default(), submeshes))
}

fn validate(doc: &SceneDocument) -> Result<(), ImportError> {
    if doc.meshes.is_empty() {
        return Err(ImportError::EmptyScene);
    }
    Ok(())
}

/// Walks the node tree breadth-first, producing one joint per scene node —
/// including non-bone nodes; callers wanting bones only must filter the
/// document first. Parents are always dequeued before their children, so
/// joints land in parent-first storage order without a re-sort.
pub fn build_skeleton(doc: &SceneDocument) -> Result<Skeleton, ImportError> {
    let mut skeleton = Skeleton::new();
    let mut nodes = VecDeque::new();
    nodes.push_back((&doc.root, NO_PARENT));

    let mut counter = 0;
    while let Some((node, parent_index)) = nodes.pop_front() {
        skeleton.add_joint(Joint {
            name: node.name.clone(),
            inv_bind_pose: node.transform,
            parent_index,
        });

        for child in &node.children {
            nodes.push_back((child, counter));
        }
        counter += 1;
    }

    if skeleton.joint_count() > MAX_JOINTS {
        return Err(ImportError::TooManyJoints {
            count: skeleton.joint_count(),
            max: MAX_JOINTS,
        });
    }

    Ok(skeleton)
}

struct ImportedMaterials {
    by_index: Vec<Arc<Material>>,
    fallback: Arc<Material>,
}

impl ImportedMaterials {
    fn resolve(&self, index: Option<usize>) -> Arc<Material> {
        index
            .and_then(|index| self.by_index.get(index))
            .unwrap_or(&self.fallback)
            .clone()
    }
}

fn build_materials(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    doc: &SceneDocument,
) -> Result<ImportedMaterials, ImportError> {
    let sampler = default_sampler(device);

    let by_index = doc
        .materials
        .iter()
        .map(|record| {
            Ok(Arc::new(Material::new(
                device,
                queue,
                &record.name,
                record.base_color,
                record.roughness,
                MaterialTextures {
                    albedo: resolve_texture(device, queue, doc, record.albedo.as_deref())?,
                    normal: resolve_texture(device, queue, doc, record.normal.as_deref())?,
                    roughness: resolve_texture(device, queue, doc, record.roughness_map.as_deref())?,
                    metalness: resolve_texture(device, queue, doc, record.metalness.as_deref())?,
                },
                &sampler,
            )))
        })
        .collect::<Result<Vec<_>, ImportError>>()?;

    let fallback = Arc::new(Material::new(
        device,
        queue,
        "fallback",
        glam::Vec4::new(0.0, 0.0, 0.0, 1.0),
        0.5,
        MaterialTextures::default(),
        &sampler,
    ));

    Ok(ImportedMaterials { by_index, fallback })
}

/// Resolves a per-channel texture reference. Embedded `*<index>` tokens are
/// decoded and uploaded; an out-of-range index is an asset reference error.
fn resolve_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    doc: &SceneDocument,
    reference: Option<&str>,
) -> Result<Option<Texture>, ImportError> {
    let Some(reference) = reference else {
        return Ok(None);
    };

    let Some(index) = embedded_texture_index(reference) else {
        // TODO: load file-referenced textures.
        log::warn!("texture reference {reference:?} is not embedded, skipped");
        return Ok(None);
    };

    let embedded = doc
        .textures
        .get(index)
        .ok_or_else(|| ImportError::BadTextureRef {
            reference: reference.to_owned(),
            count: doc.textures.len(),
        })?;

    Texture::from_rgba8(
        device,
        queue,
        embedded.width,
        embedded.height,
        &embedded.pixels,
        reference,
    )
    .map(Some)
    .map_err(ImportError::from)
}

/// Parses the `*<index>` embedded-texture token.
fn embedded_texture_index(reference: &str) -> Option<usize> {
    reference.strip_prefix('*')?.parse().ok()
}

/// Builds host-side skinned vertices for one mesh record. Absent attributes
/// stay zeroed; tangents are reconstructed when the record carries UVs and
/// normals but no tangent data.
fn assemble_skinned(
    record: &MeshRecord,
    joint_indices: &HashMap<&str, usize>,
) -> Result<(Vec<SkinnedVertex>, Vec<u32>), ImportError> {
    let mut vertices = vec![SkinnedVertex::default(); record.positions.len()];

    for (index, vertex) in vertices.iter_mut().enumerate() {
        vertex.position = record.positions[index].to_array();
        if let Some(normal) = record.normals.get(index) {
            vertex.normal = normal.to_array();
        }
        if let Some(tangent) = record.tangents.get(index) {
            vertex.tangent = tangent.to_array();
        }
        if let Some(uv) = record.uvs.get(index) {
            vertex.uv = uv.to_array();
        }
    }

    if needs_tangents(record) {
        let tangents =
            compute_tangents(&record.positions, &record.normals, &record.uvs, &record.indices);
        for (vertex, tangent) in vertices.iter_mut().zip(tangents) {
            vertex.tangent = tangent.to_array();
        }
    }

    apply_bone_weights(&mut vertices, &record.bones, joint_indices)?;

    Ok((vertices, record.indices.clone()))
}

fn assemble_static(record: &MeshRecord) -> (Vec<Vertex>, Vec<u32>) {
    let mut vertices = vec![Vertex::default(); record.positions.len()];

    for (index, vertex) in vertices.iter_mut().enumerate() {
        vertex.position = record.positions[index].to_array();
        if let Some(normal) = record.normals.get(index) {
            vertex.normal = normal.to_array();
        }
        if let Some(tangent) = record.tangents.get(index) {
            vertex.tangent = tangent.to_array();
        }
        if let Some(uv) = record.uvs.get(index) {
            vertex.uv = uv.to_array();
        }
    }

    if needs_tangents(record) {
        let tangents =
            compute_tangents(&record.positions, &record.normals, &record.uvs, &record.indices);
        for (vertex, tangent) in vertices.iter_mut().zip(tangents) {
            vertex.tangent = tangent.to_array();
        }
    }

    (vertices, record.indices.clone())
}

fn needs_tangents(record: &MeshRecord) -> bool {
    record.tangents.is_empty()
        && record.normals.len() == record.positions.len()
        && record.uvs.len() == record.positions.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SceneNode;
    use glam::{Mat4, Vec2, Vec3};

    fn node(name: &str, children: Vec<SceneNode>) -> SceneNode {
        SceneNode {
            name: name.into(),
            transform: Mat4::IDENTITY,
            children,
        }
    }

    fn document(root: SceneNode, meshes: Vec<MeshRecord>) -> SceneDocument {
        SceneDocument {
            root,
            meshes,
            materials: Vec::new(),
            textures: Vec::new(),
        }
    }

    #[test]
    fn skeleton_extraction_walks_breadth_first() {
        let doc = document(
            node(
                "root",
                vec![
                    node("hips", vec![node("leg", vec![])]),
                    node("chest", vec![]),
                ],
            ),
            vec![MeshRecord::default()],
        );

        let skeleton = build_skeleton(&doc).unwrap();

        let names: Vec<&str> = skeleton
            .joints()
            .iter()
            .map(|joint| joint.name.as_str())
            .collect();
        assert_eq!(names, ["root", "hips", "chest", "leg"]);

        let parents: Vec<i32> = skeleton
            .joints()
            .iter()
            .map(|joint| joint.parent_index)
            .collect();
        assert_eq!(parents, [NO_PARENT, 0, 0, 1]);
        assert!(skeleton.is_parent_ordered());
    }

    #[test]
    fn empty_scene_is_rejected() {
        let doc = document(node("root", vec![]), Vec::new());
        assert!(matches!(validate(&doc), Err(ImportError::EmptyScene)));
    }

    #[test]
    fn oversized_skeletons_fail_loudly() {
        let children = (0..MAX_JOINTS)
            .map(|i| node(&format!("bone{i}"), vec![]))
            .collect();
        let doc = document(node("root", children), vec![MeshRecord::default()]);

        assert!(matches!(
            build_skeleton(&doc),
            Err(ImportError::TooManyJoints { .. })
        ));
    }

    #[test]
    fn embedded_tokens_parse_the_star_convention() {
        assert_eq!(embedded_texture_index("*0"), Some(0));
        assert_eq!(embedded_texture_index("*17"), Some(17));
        assert_eq!(embedded_texture_index("texture.png"), None);
        assert_eq!(embedded_texture_index("*"), None);
    }

    #[test]
    fn missing_tangents_are_reconstructed() {
        let record = MeshRecord {
            name: "tri".into(),
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            normals: vec![Vec3::Z; 3],
            uvs: vec![Vec2::ZERO, Vec2::X, Vec2::Y],
            indices: vec![0, 1, 2],
            ..Default::default()
        };

        let (vertices, indices) = assemble_skinned(&record, &HashMap::new()).unwrap();

        assert_eq!(indices, [0, 1, 2]);
        for vertex in vertices {
            assert!(Vec3::from(vertex.tangent).abs_diff_eq(Vec3::X, 1e-5));
            assert_eq!(vertex.joint_indices, [SkinnedVertex::NO_JOINT; 4]);
        }
    }

    #[test]
    fn supplied_tangents_are_kept() {
        let record = MeshRecord {
            name: "tri".into(),
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            normals: vec![Vec3::Z; 3],
            tangents: vec![Vec3::Y; 3],
            uvs: vec![Vec2::ZERO, Vec2::X, Vec2::Y],
            indices: vec![0, 1, 2],
            ..Default::default()
        };

        let (vertices, _) = assemble_skinned(&record, &HashMap::new()).unwrap();
        for vertex in vertices {
            assert_eq!(vertex.tangent, [0.0, 1.0, 0.0]);
        }
    }
}

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::ImportError;

/// One node of the source scene graph: a name, a local transform and child
/// nodes. Bone hierarchies arrive as a subtree of this.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: Mat4,
    pub children: Vec<SceneNode>,
}

#[derive(Debug, Clone, Copy)]
pub struct VertexWeight {
    pub vertex: u32,
    pub weight: f32,
}

/// Per-mesh bone record: every vertex this bone influences, with weights.
#[derive(Debug, Clone)]
pub struct BoneRecord {
    pub name: String,
    pub weights: Vec<VertexWeight>,
}

/// Triangulated mesh record. Attribute lists other than `positions` may be
/// empty; absent attributes import as zeroes.
#[derive(Debug, Clone, Default)]
pub struct MeshRecord {
    pub name: String,
    pub material: Option<usize>,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
    pub bones: Vec<BoneRecord>,
}

/// Material record with per-channel texture references. Embedded textures
/// use the `*<index>` token convention, indexing the document's texture
/// table.
#[derive(Debug, Clone)]
pub struct MaterialRecord {
    pub name: String,
    pub base_color: Vec4,
    pub roughness: f32,
    pub albedo: Option<String>,
    pub normal: Option<String>,
    pub roughness_map: Option<String>,
    pub metalness: Option<String>,
}

/// Decoded RGBA8 image packed inside the scene document.
#[derive(Debug, Clone)]
pub struct EmbeddedTexture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Parsed scene document: a named node tree plus flat mesh, material and
/// embedded-texture tables. This is the entire surface the importer reads;
/// the glTF specifics stay in this module.
#[derive(Debug, Clone)]
pub struct SceneDocument {
    pub root: SceneNode,
    pub meshes: Vec<MeshRecord>,
    pub materials: Vec<MaterialRecord>,
    pub textures: Vec<EmbeddedTexture>,
}

impl SceneDocument {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, ImportError> {
        let (doc, buffers, images) = gltf::import(path)?;
        Self::from_gltf(&doc, &buffers, &images)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ImportError> {
        let (doc, buffers, images) = gltf::import_slice(bytes)?;
        Self::from_gltf(&doc, &buffers, &images)
    }

    pub fn from_gltf(
        doc: &gltf::Document,
        buffers: &[gltf::buffer::Data],
        images: &[gltf::image::Data],
    ) -> Result<Self, ImportError> {
        let root = build_node_tree(doc);
        let meshes = build_mesh_records(doc, buffers)?;
        let materials = doc.materials().map(build_material_record).collect();
        let textures = images
            .iter()
            .map(decode_embedded)
            .collect::<Result<_, _>>()?;

        Ok(Self {
            root,
            meshes,
            materials,
            textures,
        })
    }
}

fn node_name(node: &gltf::Node<'_>) -> String {
    node.name()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("Node{}", node.index()))
}

fn build_node_tree(doc: &gltf::Document) -> SceneNode {
    fn convert(node: gltf::Node<'_>) -> SceneNode {
        SceneNode {
            name: node_name(&node),
            transform: Mat4::from_cols_array_2d(&node.transform().matrix()),
            children: node.children().map(convert).collect(),
        }
    }

    let scene = doc.default_scene().or_else(|| doc.scenes().next());

    SceneNode {
        name: scene
            .as_ref()
            .and_then(|scene| scene.name())
            .unwrap_or("RootNode")
            .to_owned(),
        transform: Mat4::IDENTITY,
        children: scene
            .map(|scene| scene.nodes().map(convert).collect())
            .unwrap_or_default(),
    }
}

fn build_mesh_records(
    doc: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> Result<Vec<MeshRecord>, ImportError> {
    let mut records = Vec::new();

    for mesh in doc.meshes() {
        // The node referencing this mesh carries the skin, if any.
        let skin = doc
            .nodes()
            .find(|node| node.mesh().map(|m| m.index()) == Some(mesh.index()))
            .and_then(|node| node.skin());

        let mesh_name = mesh
            .name()
            .map(str::to_owned)
            .unwrap_or_else(|| format!("Mesh{}", mesh.index()));

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                return Err(ImportError::UnsupportedPrimitive {
                    mesh: mesh_name.clone(),
                    mode: primitive.mode(),
                });
            }

            let reader =
                primitive.reader(|buffer| buffers.get(buffer.index()).map(std::ops::Deref::deref));

            let positions: Vec<Vec3> = reader
                .read_positions()
                .map(|iter| iter.map(Vec3::from).collect())
                .unwrap_or_default();

            let normals = reader
                .read_normals()
                .map(|iter| iter.map(Vec3::from).collect())
                .unwrap_or_default();

            // glTF tangents are vec4 with a handedness sign in w.
            let tangents = reader
                .read_tangents()
                .map(|iter| {
                    iter.map(|tangent| Vec3::new(tangent[0], tangent[1], tangent[2]))
                        .collect()
                })
                .unwrap_or_default();

            let uvs = reader
                .read_tex_coords(0)
                .map(|iter| iter.into_f32().map(Vec2::from).collect())
                .unwrap_or_default();

            let indices = reader
                .read_indices()
                .map(|iter| iter.into_u32().collect())
                .unwrap_or_else(|| (0..positions.len() as u32).collect());

            let bones = match &skin {
                Some(skin) => {
                    let names = skin.joints().map(|node| node_name(&node)).collect();
                    let joint_sets: Vec<[u16; 4]> = reader
                        .read_joints(0)
                        .map(|iter| iter.into_u16().collect())
                        .unwrap_or_default();
                    let weight_sets: Vec<[f32; 4]> = reader
                        .read_weights(0)
                        .map(|iter| iter.into_f32().collect())
                        .unwrap_or_default();

                    bone_records(names, &joint_sets, &weight_sets)
                }
                None => Vec::new(),
            };

            records.push(MeshRecord {
                name: format!("{mesh_name}.{}", primitive.index()),
                material: primitive.material().index(),
                positions,
                normals,
                tangents,
                uvs,
                indices,
                bones,
            });
        }
    }

    Ok(records)
}

/// Inverts glTF's per-vertex joint/weight sets into per-bone weight lists,
/// keyed by the skin's joint node names. Bones that touch no vertex are
/// omitted.
fn bone_records(
    joint_names: Vec<String>,
    joint_sets: &[[u16; 4]],
    weight_sets: &[[f32; 4]],
) -> Vec<BoneRecord> {
    let mut records: Vec<BoneRecord> = joint_names
        .into_iter()
        .map(|name| BoneRecord {
            name,
            weights: Vec::new(),
        })
        .collect();

    for (vertex, (joints, weights)) in joint_sets.iter().zip(weight_sets).enumerate() {
        for (&joint, &weight) in joints.iter().zip(weights) {
            if weight <= 0.0 {
                continue;
            }
            if let Some(record) = records.get_mut(joint as usize) {
                record.weights.push(VertexWeight {
                    vertex: vertex as u32,
                    weight,
                });
            }
        }
    }

    records.retain(|record| !record.weights.is_empty());
    records
}

fn texture_token(texture: gltf::texture::Texture<'_>) -> String {
    format!("*{}", texture.source().index())
}

fn build_material_record(material: gltf::Material<'_>) -> MaterialRecord {
    let pbr = material.pbr_metallic_roughness();

    // glTF packs roughness and metalness into one map; both channels
    // reference it.
    let metallic_roughness = pbr
        .metallic_roughness_texture()
        .map(|info| texture_token(info.texture()));

    MaterialRecord {
        name: material
            .name()
            .map(str::to_owned)
            .unwrap_or_else(|| format!("Material{}", material.index().unwrap_or_default())),
        base_color: Vec4::from(pbr.base_color_factor()),
        roughness: pbr.roughness_factor(),
        albedo: pbr
            .base_color_texture()
            .map(|info| texture_token(info.texture())),
        normal: material
            .normal_texture()
            .map(|info| texture_token(info.texture())),
        roughness_map: metallic_roughness.clone(),
        metalness: metallic_roughness,
    }
}

fn decode_embedded(data: &gltf::image::Data) -> Result<EmbeddedTexture, ImportError> {
    use gltf::image::Format;

    let malformed = ImportError::MalformedTexture {
        width: data.width,
        height: data.height,
    };

    let buf = match data.format {
        Format::R8G8B8A8 => {
            image::ImageBuffer::from_raw(data.width, data.height, data.pixels.clone())
                .map(image::DynamicImage::ImageRgba8)
        }
        Format::R8G8B8 => {
            image::ImageBuffer::from_raw(data.width, data.height, data.pixels.clone())
                .map(image::DynamicImage::ImageRgb8)
        }
        Format::R8 => image::ImageBuffer::from_raw(data.width, data.height, data.pixels.clone())
            .map(image::DynamicImage::ImageLuma8),
        format => return Err(ImportError::UnsupportedTexture { format }),
    }
    .ok_or(malformed)?;

    Ok(EmbeddedTexture {
        width: data.width,
        height: data.height,
        pixels: buf.to_rgba8().into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_sets_invert_into_bone_weight_lists() {
        // Two vertices: the first weighted by joints 0 and 1, the second
        // fully by joint 1. Joint 2 never contributes and is omitted.
        let names = vec!["a".to_owned(), "b".to_owned(), "c".to_owned()];
        let joint_sets = [[0u16, 1, 0, 0], [1, 0, 0, 0]];
        let weight_sets = [[0.5f32, 0.5, 0.0, 0.0], [1.0, 0.0, 0.0, 0.0]];

        let records = bone_records(names, &joint_sets, &weight_sets);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "a");
        assert_eq!(records[0].weights.len(), 1);
        assert_eq!(records[0].weights[0].vertex, 0);
        assert_eq!(records[1].name, "b");
        assert_eq!(records[1].weights.len(), 2);
    }
}

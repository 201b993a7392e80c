use thiserror::Error;

/// Import failures, split along three lines: asset-format errors,
/// reference-resolution errors and capacity errors. Any of these aborts the
/// import before an entity is committed.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("invalid scene document: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("scene document contains no meshes")]
    EmptyScene,

    #[error("mesh {mesh:?} uses primitive mode {mode:?}, only triangulated input is accepted")]
    UnsupportedPrimitive { mesh: String, mode: gltf::mesh::Mode },

    #[error("embedded texture reference {reference:?} is out of range ({count} textures in document)")]
    BadTextureRef { reference: String, count: usize },

    #[error("unsupported embedded texture format {format:?}")]
    UnsupportedTexture { format: gltf::image::Format },

    #[error("embedded texture data does not match its {width}x{height} dimensions")]
    MalformedTexture { width: u32, height: u32 },

    #[error("bone {0:?} does not resolve to any skeleton joint")]
    UnknownBone(String),

    #[error("bone {bone:?} weights vertex {vertex} outside the mesh ({count} vertices)")]
    BadVertexRef {
        bone: String,
        vertex: u32,
        count: usize,
    },

    #[error("skeleton has {count} joints, draw dispatch supports at most {max}")]
    TooManyJoints { count: usize, max: usize },

    #[error(transparent)]
    Renderer(#[from] anyhow::Error),
}

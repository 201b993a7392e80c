#![warn(clippy::all)]

mod document;
mod error;
mod import;
mod skinning;

pub use document::{
    BoneRecord, EmbeddedTexture, MaterialRecord, MeshRecord, SceneDocument, SceneNode,
    VertexWeight,
};
pub use error::ImportError;
pub use import::{build_skeleton, load_animated, load_static};
pub use skinning::apply_bone_weights;

#![warn(clippy::all)]

#[cfg(feature = "gltf")]
pub use gltf;
pub use renderer;

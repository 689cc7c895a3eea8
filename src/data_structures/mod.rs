//! Scene data: geometry, meshes, transforms and render target textures.
//!
//! - `geometry` holds CPU-side vertex data and the GPU vertex layout
//! - `mesh` pairs backend geometry and material handles with a transform
//! - `transform` turns position, rotation and scale into a model matrix
//! - `texture` wraps the depth, multisample and offscreen targets

pub mod geometry;
pub mod mesh;
pub mod texture;
pub mod transform;

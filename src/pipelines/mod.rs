//! Render pipelines.
//!
//! Every material is a pipeline built by [`basic::mk_render_pipeline`]. The
//! shader depends on the material mode, the primitive topology on whether
//! the mesh is drawn as a wireframe.

pub mod basic;
pub mod material;

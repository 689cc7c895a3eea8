//! sdf-backdrop
//!
//! A decorative page background: a fractal signed-distance-field sculpture,
//! meshed on the CPU with surface nets and drawn with `wgpu` through an
//! orthographic camera while it slowly turns. The same scene runs in the
//! browser (WebGL through `wasm-bindgen`) and in a native preview window.
//!
//! High-level modules
//! - `settings`: sculpture settings and the material modes
//! - `viewport`: canvas sizing from container and window metrics
//! - `camera`: orthographic camera and its GPU uniform
//! - `controls`: orbit controls with damping
//! - `clock`: frame delta timing
//! - `sdf`: distance fields and mesh generation
//! - `data_structures`: geometry, meshes, transforms, render targets
//! - `render`: the backend seam used by the controller
//! - `context`: the `wgpu` backend
//! - `pipelines`: material pipelines and shaders
//! - `controller`: the scene lifecycle
//! - `web` (wasm32): `initThreeScene` and `SceneHandle`
//! - `flow` (native): the preview window
//!

pub mod camera;
pub mod clock;
pub mod context;
pub mod controller;
pub mod controls;
pub mod data_structures;
#[cfg(not(target_arch = "wasm32"))]
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod sdf;
pub mod settings;
pub mod viewport;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use controller::SceneController;
pub use settings::{MaterialMode, Settings};

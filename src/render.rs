//! The seam between scene logic and the GPU.
//!
//! [`RenderBackend`] owns every GPU-side resource. The controller only holds
//! the opaque geometry and material handles the backend hands out and gives
//! them back for disposal, so replacing a resource is always an explicit
//! dispose of the old handle.

use crate::{
    camera::OrthographicCamera,
    data_structures::{geometry::MeshData, mesh::Scene},
    settings::MaterialMode,
    viewport::Viewport,
};

/// Everything needed to build a material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialDesc {
    pub mode: MaterialMode,
    pub wireframe: bool,
}

pub trait RenderBackend {
    type Geometry;
    type Material;

    fn upload_geometry(&mut self, data: &MeshData) -> Self::Geometry;

    /// Releases the GPU buffers behind `geometry`.
    fn dispose_geometry(&mut self, geometry: Self::Geometry);

    fn create_material(&mut self, desc: MaterialDesc) -> Self::Material;

    fn dispose_material(&mut self, material: Self::Material);

    /// Resizes the drawing surface to the viewport (times its pixel ratio).
    fn set_size(&mut self, viewport: &Viewport);

    /// Draws one frame of `scene` as seen by `camera`.
    fn render(
        &mut self,
        scene: &Scene<Self::Geometry, Self::Material>,
        camera: &OrthographicCamera,
    ) -> anyhow::Result<()>;
}

//! Meshes and the scene that holds them.
//!
//! Both are generic over the geometry and material handles of a
//! [`RenderBackend`](crate::render::RenderBackend), so scene logic does not
//! depend on a GPU being present.

use anyhow::bail;

use crate::data_structures::transform::Transform;

#[derive(Debug)]
pub struct Mesh<G, M> {
    pub geometry: G,
    pub material: M,
    pub transform: Transform,
    /// Base colour, linear RGB.
    pub color: [f32; 3],
}

impl<G, M> Mesh<G, M> {
    pub fn new(geometry: G, material: M) -> Self {
        Self {
            geometry,
            material,
            transform: Transform::new(),
            color: [1.0; 3],
        }
    }

    /// Sets the base colour from a `0xRRGGBB` value.
    pub fn set_color_hex(&mut self, hex: u32) {
        let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
        self.color = [channel(16), channel(8), channel(0)];
    }
}

/// Scene root. The backdrop shows a single sculpture, so the scene holds at
/// most one mesh.
#[derive(Debug)]
pub struct Scene<G, M> {
    mesh: Option<Mesh<G, M>>,
}

impl<G, M> Scene<G, M> {
    pub fn new() -> Self {
        Self { mesh: None }
    }

    pub fn add(&mut self, mesh: Mesh<G, M>) -> anyhow::Result<()> {
        if self.mesh.is_some() {
            bail!("the scene already holds a mesh");
        }
        self.mesh = Some(mesh);
        Ok(())
    }

    pub fn mesh(&self) -> Option<&Mesh<G, M>> {
        self.mesh.as_ref()
    }

    pub fn mesh_mut(&mut self) -> Option<&mut Mesh<G, M>> {
        self.mesh.as_mut()
    }

    /// Detaches the mesh, leaving the scene empty.
    pub fn take(&mut self) -> Option<Mesh<G, M>> {
        self.mesh.take()
    }

    pub fn len(&self) -> usize {
        usize::from(self.mesh.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.mesh.is_none()
    }
}

impl<G, M> Default for Scene<G, M> {
    fn default() -> Self {
        Self::new()
    }
}

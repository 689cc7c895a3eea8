//! Geometry from signed distance fields.
//!
//! A [`DistanceField`] is sampled on a regular lattice spanning
//! `[-bounds, bounds]³` and the zero level set is extracted with surface nets.
//! Negative distances are inside the surface.

use cgmath::Vector3;

use crate::data_structures::geometry::MeshData;

mod sculpture;
mod surface_nets;

pub use sculpture::Sculpture;

/// Upper bound on cells per axis. Finer lattices are clamped to it.
pub const MAX_SUBDIVISIONS: u32 = 256;

pub trait DistanceField {
    fn distance(&self, p: Vector3<f32>) -> f32;
}

impl<F> DistanceField for F
where
    F: Fn(Vector3<f32>) -> f32,
{
    fn distance(&self, p: Vector3<f32>) -> f32 {
        self(p)
    }
}

/// Samples distance fields into triangle meshes.
#[derive(Clone, Copy, Debug, Default)]
pub struct SdfGeometryGenerator;

impl SdfGeometryGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Builds a mesh of the surface of `field` inside `[-bounds, bounds]³`
    /// using `subdivisions` cells per axis, clamped to `1..=MAX_SUBDIVISIONS`.
    /// Normals are not computed.
    pub fn generate(&self, subdivisions: u32, field: &dyn DistanceField, bounds: f32) -> MeshData {
        let grid = SampleGrid::sample(cells_per_axis(subdivisions), field, bounds);
        surface_nets::extract(&grid)
    }
}

fn cells_per_axis(subdivisions: u32) -> usize {
    subdivisions.clamp(1, MAX_SUBDIVISIONS) as usize
}

/// Distances on the `(cells + 1)³` lattice points, x fastest.
pub(crate) struct SampleGrid {
    pub(crate) cells: usize,
    pub(crate) bounds: f32,
    pub(crate) values: Vec<f32>,
}

impl SampleGrid {
    fn sample(cells: usize, field: &dyn DistanceField, bounds: f32) -> Self {
        let points = cells + 1;
        let mut values = Vec::with_capacity(points * points * points);
        for z in 0..points {
            for y in 0..points {
                for x in 0..points {
                    let p = Vector3::new(
                        lattice_to_world(x as f32, cells, bounds),
                        lattice_to_world(y as f32, cells, bounds),
                        lattice_to_world(z as f32, cells, bounds),
                    );
                    values.push(field.distance(p));
                }
            }
        }
        Self {
            cells,
            bounds,
            values,
        }
    }

    pub(crate) fn points_per_axis(&self) -> usize {
        self.cells + 1
    }

    pub(crate) fn value(&self, x: usize, y: usize, z: usize) -> f32 {
        let points = self.points_per_axis();
        self.values[x + points * (y + points * z)]
    }
}

/// Lattice coordinate (possibly fractional) to world coordinate.
pub(crate) fn lattice_to_world(coord: f32, cells: usize, bounds: f32) -> f32 {
    -bounds + 2.0 * bounds * coord / cells as f32
}

//! Naive surface nets.
//!
//! Every cell whose corners disagree in sign gets one vertex at the mean of
//! the points where its edges cross zero. Every lattice edge that crosses
//! zero produces a quad connecting the four cells around it.

use cgmath::{Vector3, Zero};

use super::{SampleGrid, lattice_to_world};
use crate::data_structures::geometry::MeshData;

/// The 12 cube edges as pairs of corner indices. Corner `i` sits at offset
/// `(i & 1, (i >> 1) & 1, (i >> 2) & 1)`.
const CUBE_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (2, 3),
    (4, 5),
    (6, 7),
    (0, 2),
    (1, 3),
    (4, 6),
    (5, 7),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

const NO_VERTEX: u32 = u32::MAX;

fn corner_offset(corner: usize) -> Vector3<f32> {
    Vector3::new(
        (corner & 1) as f32,
        ((corner >> 1) & 1) as f32,
        ((corner >> 2) & 1) as f32,
    )
}

pub(crate) fn extract(grid: &SampleGrid) -> MeshData {
    let n = grid.cells;
    let mut mesh = MeshData::default();
    let mut cell_vertex = vec![NO_VERTEX; n * n * n];
    let cell_index = |x: usize, y: usize, z: usize| x + n * (y + n * z);

    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let mut corners = [0.0f32; 8];
                let mut mask = 0u8;
                for (corner, value) in corners.iter_mut().enumerate() {
                    *value = grid.value(x + (corner & 1), y + ((corner >> 1) & 1), z + ((corner >> 2) & 1));
                    if *value < 0.0 {
                        mask |= 1 << corner;
                    }
                }
                if mask == 0 || mask == 0xff {
                    continue;
                }

                let mut sum = Vector3::zero();
                let mut crossings = 0;
                for &(a, b) in CUBE_EDGES.iter() {
                    let inside_a = mask & (1 << a) != 0;
                    let inside_b = mask & (1 << b) != 0;
                    if inside_a == inside_b {
                        continue;
                    }
                    let (da, db) = (corners[a], corners[b]);
                    let denom = da - db;
                    let t = if denom.abs() > f32::EPSILON { da / denom } else { 0.5 };
                    sum += corner_offset(a) + (corner_offset(b) - corner_offset(a)) * t.clamp(0.0, 1.0);
                    crossings += 1;
                }
                let local = sum / crossings as f32;
                let base = Vector3::new(x as f32, y as f32, z as f32);
                let lattice = base + local;

                cell_vertex[cell_index(x, y, z)] = mesh.positions.len() as u32;
                mesh.positions.push([
                    lattice_to_world(lattice.x, n, grid.bounds),
                    lattice_to_world(lattice.y, n, grid.bounds),
                    lattice_to_world(lattice.z, n, grid.bounds),
                ]);
            }
        }
    }

    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let center = cell_vertex[cell_index(x, y, z)];
                if center == NO_VERTEX {
                    continue;
                }
                let inside = grid.value(x, y, z) < 0.0;
                let coords = [x, y, z];
                for axis in 0..3 {
                    let mut end = coords;
                    end[axis] += 1;
                    if (grid.value(end[0], end[1], end[2]) < 0.0) == inside {
                        continue;
                    }
                    let u = (axis + 1) % 3;
                    let v = (axis + 2) % 3;
                    if coords[u] == 0 || coords[v] == 0 {
                        continue;
                    }
                    let neighbour = |du: usize, dv: usize| {
                        let mut c = coords;
                        c[u] -= du;
                        c[v] -= dv;
                        cell_vertex[cell_index(c[0], c[1], c[2])]
                    };
                    let quad = [center, neighbour(1, 0), neighbour(1, 1), neighbour(0, 1)];
                    if quad.contains(&NO_VERTEX) {
                        continue;
                    }
                    // Counter-clockwise seen from the outside, which lies in the
                    // direction of the corner that is not inside.
                    let [a, b, c, d] = if inside {
                        quad
                    } else {
                        [quad[0], quad[3], quad[2], quad[1]]
                    };
                    mesh.indices.extend_from_slice(&[a, b, c, a, c, d]);
                }
            }
        }
    }

    mesh
}

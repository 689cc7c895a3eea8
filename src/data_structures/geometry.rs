//! CPU-side geometry.
//!
//! [`MeshData`] is what the SDF generator produces and what render backends
//! upload. It is an indexed triangle list with one normal per vertex.

use std::collections::HashSet;

use cgmath::{InnerSpace, Vector3, Zero};

/// Describes the memory layout of a vertex type for a vertex buffer.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/// Interleaved vertex as stored on the GPU.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GeometryVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex for GeometryVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<GeometryVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    /// Empty until [`MeshData::compute_vertex_normals`] ran.
    pub normals: Vec<[f32; 3]>,
    /// Triangle list, counter-clockwise when seen from outside.
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Area weighted vertex normals: every triangle adds its unnormalized face
    /// normal to its three vertices, the sums are then normalized.
    pub fn compute_vertex_normals(&mut self) {
        let mut sums = vec![Vector3::<f32>::zero(); self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let pa = Vector3::from(self.positions[a]);
            let pb = Vector3::from(self.positions[b]);
            let pc = Vector3::from(self.positions[c]);
            let face = (pb - pa).cross(pc - pa);
            sums[a] += face;
            sums[b] += face;
            sums[c] += face;
        }
        self.normals = sums
            .into_iter()
            .map(|n| {
                if n.magnitude2() > 0.0 {
                    n.normalize().into()
                } else {
                    [0.0; 3]
                }
            })
            .collect();
    }

    /// Every distinct triangle edge once, as a line list.
    pub fn wireframe_indices(&self) -> Vec<u32> {
        let mut seen = HashSet::with_capacity(self.indices.len());
        let mut lines = Vec::with_capacity(self.indices.len() * 2);
        for tri in self.indices.chunks_exact(3) {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                if seen.insert((a.min(b), a.max(b))) {
                    lines.push(a);
                    lines.push(b);
                }
            }
        }
        lines
    }

    /// Interleaves positions and normals. Missing normals are zero.
    pub fn vertices(&self) -> Vec<GeometryVertex> {
        self.positions
            .iter()
            .enumerate()
            .map(|(i, position)| GeometryVertex {
                position: *position,
                normal: self.normals.get(i).copied().unwrap_or([0.0; 3]),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit quad in the XY plane facing +Z, split into two triangles.
    fn quad() -> MeshData {
        MeshData {
            positions: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            normals: Vec::new(),
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    #[test]
    fn normals_follow_counter_clockwise_winding() {
        let mut mesh = quad();
        mesh.compute_vertex_normals();
        assert_eq!(mesh.normals.len(), 4);
        for normal in &mesh.normals {
            assert_eq!(*normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn unreferenced_vertices_get_zero_normals() {
        let mut mesh = quad();
        mesh.positions.push([5.0, 5.0, 5.0]);
        mesh.compute_vertex_normals();
        assert_eq!(mesh.normals[4], [0.0; 3]);
    }

    #[test]
    fn wireframe_lists_shared_edges_once() {
        let lines = quad().wireframe_indices();
        // 4 outer edges plus the diagonal
        assert_eq!(lines.len(), 5 * 2);
        assert_eq!(&lines[..6], &[0, 1, 1, 2, 2, 0]);
    }

    #[test]
    fn vertices_interleave_positions_and_normals() {
        let mut mesh = quad();
        assert_eq!(mesh.vertices()[2].normal, [0.0; 3]);
        mesh.compute_vertex_normals();
        let vertices = mesh.vertices();
        assert_eq!(vertices.len(), mesh.vertex_count());
        assert_eq!(vertices[2].position, [1.0, 1.0, 0.0]);
        assert_eq!(vertices[2].normal, [0.0, 0.0, 1.0]);
        assert_eq!(mesh.triangle_count(), 2);
    }
}

use crate::{
    data_structures::{
        geometry::{GeometryVertex, Vertex},
        texture::Texture,
    },
    render::MaterialDesc,
    settings::MaterialMode,
};

use super::basic::mk_render_pipeline;

/// A compiled material: the pipeline plus what it was built from.
#[derive(Debug)]
pub struct Material {
    pub desc: MaterialDesc,
    pub pipeline: wgpu::RenderPipeline,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        color_format: wgpu::TextureFormat,
        sample_count: u32,
        desc: MaterialDesc,
    ) -> Self {
        let shader = match desc.mode {
            MaterialMode::Depth => wgpu::ShaderModuleDescriptor {
                label: Some("Depth Material Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("depth.wgsl").into()),
            },
            MaterialMode::Normal => wgpu::ShaderModuleDescriptor {
                label: Some("Normal Material Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("normal.wgsl").into()),
            },
        };
        let pipeline = mk_render_pipeline(
            device,
            layout,
            color_format,
            Some(Texture::DEPTH_FORMAT),
            &[GeometryVertex::desc()],
            topology(desc.wireframe),
            sample_count,
            shader,
        );
        Self { desc, pipeline }
    }
}

/// Wireframes are drawn as line lists over the unique triangle edges,
/// since WebGL has no line polygon mode.
pub fn topology(wireframe: bool) -> wgpu::PrimitiveTopology {
    if wireframe {
        wgpu::PrimitiveTopology::LineList
    } else {
        wgpu::PrimitiveTopology::TriangleList
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wireframe_selects_lines() {
        assert_eq!(topology(true), wgpu::PrimitiveTopology::LineList);
        assert_eq!(topology(false), wgpu::PrimitiveTopology::TriangleList);
    }
}

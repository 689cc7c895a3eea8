//! The wgpu render backend.
//!
//! [`Context`] owns the device, queue and (when attached to a window or
//! canvas) the surface. It draws with 4x MSAA when the adapter supports it
//! and keeps the camera and model matrices in one uniform bind group that
//! every material pipeline shares.

use std::iter;

use anyhow::Context as _;
use wgpu::util::DeviceExt;

use crate::{
    camera::{CameraUniform, OrthographicCamera},
    data_structures::{
        geometry::{GeometryVertex, MeshData},
        mesh::Scene,
        texture::Texture,
        transform::{Transform, TransformRaw},
    },
    pipelines::material::Material,
    render::{MaterialDesc, RenderBackend},
    viewport::Viewport,
};

const PREFERRED_SAMPLE_COUNT: u32 = 4;
const HEADLESS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Vertex, triangle index and edge index buffers of one uploaded mesh.
#[derive(Debug)]
pub struct GpuGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    wire_index_buffer: wgpu::Buffer,
    index_count: u32,
    wire_index_count: u32,
}

impl GpuGeometry {
    fn destroy(self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
        self.wire_index_buffer.destroy();
    }
}

#[derive(Debug)]
pub struct Context {
    surface: Option<wgpu::Surface<'static>>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub sample_count: u32,
    pub clear_colour: wgpu::Color,
    pub(crate) depth_texture: Texture,
    pub(crate) msaa_texture: Option<Texture>,
    offscreen: Option<Texture>,
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    transform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    pipeline_layout: wgpu::PipelineLayout,
}

impl Context {
    /// Creates a context that presents to `target`, a window on native
    /// platforms or a canvas on the web.
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        viewport: &Viewport,
    ) -> anyhow::Result<Self> {
        let instance = Self::instance();
        let surface = instance
            .create_surface(target)
            .context("cannot create a drawing surface")?;
        Self::build(instance, Some(surface), viewport).await
    }

    /// Creates a context that renders into an offscreen texture.
    pub async fn headless(viewport: &Viewport) -> anyhow::Result<Self> {
        Self::build(Self::instance(), None, viewport).await
    }

    fn instance() -> wgpu::Instance {
        // BackendBit::PRIMARY => Vulkan + Metal + DX12 + Browser WebGPU
        wgpu::Instance::new(wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        })
    }

    async fn build(
        instance: wgpu::Instance,
        surface: Option<wgpu::Surface<'static>>,
        viewport: &Viewport,
    ) -> anyhow::Result<Self> {
        log::info!("WGPU setup");
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: surface.as_ref(),
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable GPU adapter")?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                ..Default::default()
            })
            .await
            .context("cannot open the GPU device")?;

        let (width, height) = viewport.physical_size();
        let config = match &surface {
            Some(surface) => {
                let caps = surface.get_capabilities(&adapter);
                // The shaders write linear colour and rely on an sRGB target.
                let format = caps
                    .formats
                    .iter()
                    .copied()
                    .find(|f| f.is_srgb())
                    .or_else(|| caps.formats.first().copied())
                    .context("the surface supports no texture format")?;
                wgpu::SurfaceConfiguration {
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    format,
                    width,
                    height,
                    present_mode: caps
                        .present_modes
                        .first()
                        .copied()
                        .unwrap_or(wgpu::PresentMode::Fifo),
                    alpha_mode: caps
                        .alpha_modes
                        .first()
                        .copied()
                        .unwrap_or(wgpu::CompositeAlphaMode::Auto),
                    view_formats: vec![],
                    desired_maximum_frame_latency: 2,
                }
            }
            None => wgpu::SurfaceConfiguration {
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                format: HEADLESS_FORMAT,
                width,
                height,
                present_mode: wgpu::PresentMode::Fifo,
                alpha_mode: wgpu::CompositeAlphaMode::Opaque,
                view_formats: vec![],
                desired_maximum_frame_latency: 2,
            },
        };
        if let Some(surface) = &surface {
            surface.configure(&device, &config);
        }

        let sample_count = if adapter
            .get_texture_format_features(config.format)
            .flags
            .sample_count_supported(PREFERRED_SAMPLE_COUNT)
        {
            PREFERRED_SAMPLE_COUNT
        } else {
            log::warn!("{:?} cannot be multisampled, antialiasing is off", config.format);
            1
        };

        let camera_uniform = CameraUniform::new();
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let transform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Transform Buffer"),
            contents: bytemuck::cast_slice(&[Transform::new().to_raw()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_entry = |binding: u32, visibility: wgpu::ShaderStages| {
            wgpu::BindGroupLayoutEntry {
                binding,
                visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
                uniform_entry(1, wgpu::ShaderStages::VERTEX),
            ],
            label: Some("scene_bind_group_layout"),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: transform_buffer.as_entire_binding(),
                },
            ],
            label: Some("scene_bind_group"),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Material Pipeline Layout"),
            bind_group_layouts: &[Some(&bind_group_layout)],
            immediate_size: 0,
        });

        let size = [config.width, config.height];
        let depth_texture =
            Texture::create_depth_texture(&device, size, sample_count, "depth_texture");
        let msaa_texture = (sample_count > 1)
            .then(|| Texture::create_msaa_texture(&device, size, sample_count, config.format));
        let offscreen = surface
            .is_none()
            .then(|| Texture::create_offscreen_target(&device, size, config.format));

        Ok(Self {
            surface,
            device,
            queue,
            config,
            sample_count,
            clear_colour: wgpu::Color::BLACK,
            depth_texture,
            msaa_texture,
            offscreen,
            camera_uniform,
            camera_buffer,
            transform_buffer,
            bind_group,
            pipeline_layout,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.config);
        }
        let size = [width, height];
        self.depth_texture =
            Texture::create_depth_texture(&self.device, size, self.sample_count, "depth_texture");
        if self.sample_count > 1 {
            self.msaa_texture = Some(Texture::create_msaa_texture(
                &self.device,
                size,
                self.sample_count,
                self.config.format,
            ));
        }
        if self.offscreen.is_some() {
            self.offscreen = Some(Texture::create_offscreen_target(
                &self.device,
                size,
                self.config.format,
            ));
        }
    }

    /// Reads the offscreen target back. Only available on headless contexts.
    #[cfg(feature = "integration-tests")]
    pub async fn read_pixels(&self) -> anyhow::Result<image::RgbaImage> {
        let target = self
            .offscreen
            .as_ref()
            .context("only headless contexts can be read back")?;
        let (width, height) = (self.config.width, self.config.height);
        let u32_size = std::mem::size_of::<u32>() as u32;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row = (u32_size * width).div_ceil(align) * align;

        let output_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            size: (padded_row * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            label: Some("Readback Buffer"),
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(iter::once(encoder.finish()));

        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        let buffer_slice = output_buffer.slice(..);
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });
        self.device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(std::time::Duration::from_secs(3)),
        })?;
        rx.receive()
            .await
            .context("the readback channel closed")??;

        let data = buffer_slice.get_mapped_range();
        let row_bytes = (u32_size * width) as usize;
        let pixels: Vec<u8> = data
            .chunks(padded_row as usize)
            .flat_map(|row| &row[..row_bytes])
            .copied()
            .collect();
        drop(data);
        output_buffer.unmap();
        image::RgbaImage::from_raw(width, height, pixels).context("readback has the wrong size")
    }
}

/// Non-empty contents for a buffer that may have nothing to hold.
fn padded<T: bytemuck::Pod + bytemuck::Zeroable>(items: Vec<T>) -> Vec<T> {
    if items.is_empty() {
        vec![T::zeroed()]
    } else {
        items
    }
}

impl RenderBackend for Context {
    type Geometry = GpuGeometry;
    type Material = Material;

    fn upload_geometry(&mut self, data: &MeshData) -> GpuGeometry {
        let wire_indices = data.wireframe_indices();
        let index_count = data.indices.len() as u32;
        let wire_index_count = wire_indices.len() as u32;
        let vertices: Vec<GeometryVertex> = padded(data.vertices());

        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Index Buffer"),
                contents: bytemuck::cast_slice(&padded(data.indices.clone())),
                usage: wgpu::BufferUsages::INDEX,
            });
        let wire_index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Wireframe Index Buffer"),
                contents: bytemuck::cast_slice(&padded(wire_indices)),
                usage: wgpu::BufferUsages::INDEX,
            });
        log::debug!(
            "uploaded {} vertices and {} triangles",
            data.vertex_count(),
            data.triangle_count()
        );
        GpuGeometry {
            vertex_buffer,
            index_buffer,
            wire_index_buffer,
            index_count,
            wire_index_count,
        }
    }

    fn dispose_geometry(&mut self, geometry: GpuGeometry) {
        geometry.destroy();
    }

    fn create_material(&mut self, desc: MaterialDesc) -> Material {
        Material::new(
            &self.device,
            &self.pipeline_layout,
            self.config.format,
            self.sample_count,
            desc,
        )
    }

    fn dispose_material(&mut self, material: Material) {
        drop(material);
    }

    fn set_size(&mut self, viewport: &Viewport) {
        let (width, height) = viewport.physical_size();
        self.resize(width, height);
    }

    fn render(
        &mut self,
        scene: &Scene<GpuGeometry, Material>,
        camera: &OrthographicCamera,
    ) -> anyhow::Result<()> {
        self.camera_uniform.update_view_proj(camera);
        self.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        );
        if let Some(mesh) = scene.mesh() {
            let raw: TransformRaw = mesh.transform.to_raw();
            self.queue
                .write_buffer(&self.transform_buffer, 0, bytemuck::cast_slice(&[raw]));
        }

        let output = match &self.surface {
            Some(surface) => match surface.get_current_texture() {
                wgpu::CurrentSurfaceTexture::Success(output)
                | wgpu::CurrentSurfaceTexture::Suboptimal(output) => Some(output),
                wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated => {
                    // Reconfigure and skip this frame.
                    self.resize(self.config.width, self.config.height);
                    return Ok(());
                }
                e @ (wgpu::CurrentSurfaceTexture::Timeout
                | wgpu::CurrentSurfaceTexture::Occluded
                | wgpu::CurrentSurfaceTexture::Validation) => {
                    anyhow::bail!("failed to acquire surface texture: {e:?}")
                }
            },
            None => None,
        };
        let frame_view = match (&output, &self.offscreen) {
            (Some(output), _) => output
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default()),
            (None, Some(offscreen)) => offscreen.view.clone(),
            (None, None) => anyhow::bail!("the context has no render target"),
        };
        let (view, resolve_target) = match &self.msaa_texture {
            Some(msaa) => (&msaa.view, Some(&frame_view)),
            None => (&frame_view, None),
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_colour),
                        // the multisampled buffer is only needed until resolved
                        store: if resolve_target.is_some() {
                            wgpu::StoreOp::Discard
                        } else {
                            wgpu::StoreOp::Store
                        },
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            if let Some(mesh) = scene.mesh() {
                let geometry = &mesh.geometry;
                let (index_buffer, count) = if mesh.material.desc.wireframe {
                    (&geometry.wire_index_buffer, geometry.wire_index_count)
                } else {
                    (&geometry.index_buffer, geometry.index_count)
                };
                if count > 0 {
                    render_pass.set_pipeline(&mesh.material.pipeline);
                    render_pass.set_bind_group(0, &self.bind_group, &[]);
                    render_pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
                    render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..count, 0, 0..1);
                }
            }
        }
        self.queue.submit(iter::once(encoder.finish()));

        if let Some(output) = output {
            output.present();
        }
        Ok(())
    }
}

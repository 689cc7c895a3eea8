//! Orthographic camera and its GPU uniform.
//!
//! The camera frustum is expressed in CSS pixels so that one world unit maps
//! to one pixel on screen. The sculpture is scaled accordingly by the
//! controller.

use cgmath::{EuclideanSpace, Matrix4, Point3, Vector3};

use crate::viewport::Viewport;

/// cgmath produces OpenGL clip space (z in [-1, 1]); wgpu expects z in [0, 1].
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

pub const NEAR: f32 = 0.01;
pub const FAR: f32 = 1600.0;
/// Distance of the camera from the origin along +Z.
pub const DEPTH_OFFSET: f32 = 1100.0;

#[derive(Clone, Debug)]
pub struct OrthographicCamera {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub near: f32,
    pub far: f32,
    pub zoom: f32,
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    projection: Matrix4<f32>,
}

impl OrthographicCamera {
    pub fn new(left: f32, right: f32, top: f32, bottom: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            left,
            right,
            top,
            bottom,
            near,
            far,
            zoom: 1.0,
            position: Point3::new(0.0, 0.0, DEPTH_OFFSET),
            target: Point3::origin(),
            up: Vector3::unit_y(),
            projection: Matrix4::from_scale(1.0),
        };
        camera.update_projection_matrix();
        camera
    }

    /// The initial framing used when the page first mounts. It is deliberately
    /// off-centre: the sculpture sits towards the lower left of the viewport
    /// until the first resize.
    pub fn for_viewport(viewport: &Viewport) -> Self {
        let w = viewport.width as f32;
        let h = viewport.height as f32;
        Self::new(w / -5.0, w / 2.0, h / 4.0, h / -2.0, NEAR, FAR)
    }

    /// Centres the frustum on the viewport: edges at ±half its size.
    pub fn fit_viewport(&mut self, viewport: &Viewport) {
        let w = viewport.width as f32;
        let h = viewport.height as f32;
        self.left = w / -2.0;
        self.right = w / 2.0;
        self.top = h / 2.0;
        self.bottom = h / -2.0;
        self.update_projection_matrix();
    }

    /// Recomputes the cached projection from the frustum fields and zoom.
    pub fn update_projection_matrix(&mut self) {
        let zoom = if self.zoom > 0.0 { self.zoom } else { 1.0 };
        let dx = (self.right - self.left) / (2.0 * zoom);
        let dy = (self.top - self.bottom) / (2.0 * zoom);
        let cx = (self.right + self.left) / 2.0;
        let cy = (self.top + self.bottom) / 2.0;
        self.projection = cgmath::ortho(cx - dx, cx + dx, cy - dy, cy + dy, self.near, self.far);
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    /// Combined view-projection in wgpu clip space.
    pub fn view_projection(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * self.projection * self.view_matrix()
    }
}

/// Camera data as stored on the GPU.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view: Matrix4::identity().into(),
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &OrthographicCamera) {
        self.view = camera.view_matrix().into();
        self.view_proj = camera.view_projection().into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

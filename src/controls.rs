//! Orbit-style camera controls.
//!
//! Pointer input is accumulated into pending spherical and pan deltas which
//! are applied to the camera in [`OrbitControls::update`], once per frame.
//! With damping enabled only a fraction of the pending delta is applied each
//! frame, so the camera keeps drifting after the pointer is released.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Point3, Vector3, Zero};

use crate::camera::OrthographicCamera;

const EPS: f32 = 0.000_001;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Drag {
    None,
    Rotate { x: f32, y: f32 },
    Pan { x: f32, y: f32 },
}

/// Spherical coordinates around the orbit target: `phi` is the polar angle
/// from +Y, `theta` the azimuth around Y measured from +Z.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Spherical {
    radius: f32,
    phi: f32,
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius == 0.0 {
            return Self::default();
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

#[derive(Clone, Debug)]
pub struct OrbitControls {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub enable_rotate: bool,
    pub enable_pan: bool,
    pub enable_zoom: bool,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    delta: Spherical,
    pan_offset: Vector3<f32>,
    zoom_scale: f32,
    drag: Drag,
}

impl OrbitControls {
    pub fn new() -> Self {
        Self {
            enable_damping: false,
            damping_factor: 0.05,
            enable_rotate: true,
            enable_pan: true,
            enable_zoom: true,
            rotate_speed: 1.0,
            pan_speed: 1.0,
            zoom_speed: 1.0,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            min_zoom: 0.0,
            max_zoom: f32::INFINITY,
            delta: Spherical::default(),
            pan_offset: Vector3::zero(),
            zoom_scale: 1.0,
            drag: Drag::None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag != Drag::None
    }

    pub fn pointer_down(&mut self, button: PointerButton, x: f32, y: f32) {
        self.drag = match button {
            PointerButton::Primary if self.enable_rotate => Drag::Rotate { x, y },
            PointerButton::Secondary if self.enable_pan => Drag::Pan { x, y },
            _ => Drag::None,
        };
    }

    /// `element_size` is the CSS size of the element receiving the pointer.
    pub fn pointer_move(
        &mut self,
        camera: &OrthographicCamera,
        x: f32,
        y: f32,
        element_size: (f32, f32),
    ) {
        let (width, height) = (element_size.0.max(1.0), element_size.1.max(1.0));
        match self.drag {
            Drag::None => (),
            Drag::Rotate { x: last_x, y: last_y } => {
                let dx = (x - last_x) * self.rotate_speed;
                let dy = (y - last_y) * self.rotate_speed;
                // Both directions are scaled by the height so a full drag
                // across the element is one full turn.
                self.rotate_left(2.0 * PI * dx / height);
                self.rotate_up(2.0 * PI * dy / height);
                self.drag = Drag::Rotate { x, y };
            }
            Drag::Pan { x: last_x, y: last_y } => {
                let dx = (x - last_x) * self.pan_speed;
                let dy = (y - last_y) * self.pan_speed;
                self.pan(camera, dx, dy, width, height);
                self.drag = Drag::Pan { x, y };
            }
        }
    }

    pub fn pointer_up(&mut self) {
        self.drag = Drag::None;
    }

    /// Positive `delta_y` zooms out, negative zooms in. Ignored when zoom is disabled.
    pub fn wheel(&mut self, delta_y: f32) {
        if !self.enable_zoom || delta_y == 0.0 {
            return;
        }
        let step = 0.95f32.powf(self.zoom_speed);
        if delta_y < 0.0 {
            self.zoom_scale /= step;
        } else {
            self.zoom_scale *= step;
        }
    }

    fn rotate_left(&mut self, angle: f32) {
        self.delta.theta -= angle;
    }

    fn rotate_up(&mut self, angle: f32) {
        self.delta.phi -= angle;
    }

    fn pan(&mut self, camera: &OrthographicCamera, dx: f32, dy: f32, width: f32, height: f32) {
        let zoom = if camera.zoom > 0.0 { camera.zoom } else { 1.0 };
        let forward = camera.target - camera.position;
        if forward.magnitude2() == 0.0 {
            return;
        }
        let forward = forward.normalize();
        let right = forward.cross(camera.up).normalize();
        let up = right.cross(forward);
        let left_distance = dx * (camera.right - camera.left) / zoom / width;
        let up_distance = dy * (camera.top - camera.bottom) / zoom / height;
        self.pan_offset += right * -left_distance + up * up_distance;
    }

    /// Applies pending input to the camera. Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut OrthographicCamera) -> bool {
        let old_position = camera.position;
        let old_target = camera.target;
        let old_zoom = camera.zoom;

        let mut spherical = Spherical::from_offset(camera.position - camera.target);
        let step = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        spherical.theta += self.delta.theta * step;
        spherical.phi += self.delta.phi * step;
        spherical.phi = spherical
            .phi
            .clamp(self.min_polar_angle, self.max_polar_angle)
            .clamp(EPS, PI - EPS);

        camera.target += self.pan_offset * step;
        camera.position = camera.target + spherical.to_offset();

        if self.zoom_scale != 1.0 {
            camera.zoom = (camera.zoom * self.zoom_scale).clamp(self.min_zoom, self.max_zoom);
            camera.update_projection_matrix();
        }

        if self.enable_damping {
            self.delta.theta *= 1.0 - self.damping_factor;
            self.delta.phi *= 1.0 - self.damping_factor;
            self.pan_offset *= 1.0 - self.damping_factor;
        } else {
            self.delta = Spherical::default();
            self.pan_offset = Vector3::zero();
        }
        self.zoom_scale = 1.0;

        moved(old_position, camera.position)
            || moved(old_target, camera.target)
            || old_zoom != camera.zoom
    }
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new()
    }
}

fn moved(a: Point3<f32>, b: Point3<f32>) -> bool {
    (a - b).magnitude2() > EPS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{camera::DEPTH_OFFSET, viewport::Viewport};

    fn camera() -> OrthographicCamera {
        let viewport = Viewport {
            width: 800,
            height: 600,
            pixel_ratio: 1.0,
        };
        let mut camera = OrthographicCamera::for_viewport(&viewport);
        camera.fit_viewport(&viewport);
        camera
    }

    fn azimuth(camera: &OrthographicCamera) -> f32 {
        let offset = camera.position - camera.target;
        offset.x.atan2(offset.z)
    }

    #[test]
    fn idle_update_keeps_the_camera_in_place() {
        let mut camera = camera();
        let mut controls = OrbitControls::new();
        controls.enable_damping = true;
        assert!(!controls.update(&mut camera));
        assert!((camera.position.z - DEPTH_OFFSET).abs() < 1e-3);
    }

    #[test]
    fn drag_rotates_immediately_without_damping() {
        let mut camera = camera();
        let mut controls = OrbitControls::new();
        controls.pointer_down(PointerButton::Primary, 100.0, 100.0);
        // a quarter of the element height is a quarter turn
        controls.pointer_move(&camera, 250.0, 100.0, (800.0, 600.0));
        controls.pointer_up();
        assert!(controls.update(&mut camera));
        assert!((azimuth(&camera) + PI / 2.0).abs() < 1e-4);
        let radius = (camera.position - camera.target).magnitude();
        assert!((radius - DEPTH_OFFSET).abs() < 1e-2);
    }

    #[test]
    fn damping_spreads_rotation_over_frames() {
        let mut camera = camera();
        let mut controls = OrbitControls::new();
        controls.enable_damping = true;
        controls.pointer_down(PointerButton::Primary, 0.0, 0.0);
        controls.pointer_move(&camera, -60.0, 0.0, (800.0, 600.0));
        controls.pointer_up();

        controls.update(&mut camera);
        let first = azimuth(&camera);
        let expected_total = 2.0 * PI * 60.0 / 600.0;
        assert!(first > 0.0 && first < expected_total * 0.1);

        for _ in 0..400 {
            controls.update(&mut camera);
        }
        assert!((azimuth(&camera) - expected_total).abs() < 1e-3);
    }

    #[test]
    fn polar_angle_is_clamped_away_from_the_poles() {
        let mut camera = camera();
        let mut controls = OrbitControls::new();
        controls.pointer_down(PointerButton::Primary, 0.0, 0.0);
        controls.pointer_move(&camera, 0.0, 5000.0, (800.0, 600.0));
        controls.update(&mut camera);
        let offset = camera.position - camera.target;
        assert!(offset.y > 0.0);
        assert!(offset.x.abs() + offset.z.abs() > 0.0);
    }

    #[test]
    fn disabled_zoom_ignores_the_wheel() {
        let mut camera = camera();
        let mut controls = OrbitControls::new();
        controls.enable_zoom = false;
        controls.wheel(-120.0);
        controls.update(&mut camera);
        assert_eq!(camera.zoom, 1.0);

        controls.enable_zoom = true;
        controls.wheel(-120.0);
        controls.update(&mut camera);
        assert!(camera.zoom > 1.0);
    }

    #[test]
    fn secondary_drag_pans_the_target() {
        let mut camera = camera();
        let mut controls = OrbitControls::new();
        controls.pointer_down(PointerButton::Secondary, 0.0, 0.0);
        controls.pointer_move(&camera, 80.0, 0.0, (800.0, 600.0));
        controls.update(&mut camera);
        // dragging right moves the view left
        assert!((camera.target.x + 80.0).abs() < 1e-3);
        assert!((camera.position.x + 80.0).abs() < 1e-3);
    }

    #[test]
    fn other_buttons_do_nothing() {
        let camera = camera();
        let mut controls = OrbitControls::new();
        controls.pointer_down(PointerButton::Other, 0.0, 0.0);
        assert!(!controls.is_dragging());
        controls.pointer_move(&camera, 100.0, 100.0, (800.0, 600.0));
    }
}

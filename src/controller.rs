//! Scene lifecycle.
//!
//! [`SceneController`] owns the camera, the scene, the orbit controls and the
//! frame clock, and drives a [`RenderBackend`]. Hosts (the browser entry point
//! and the native preview) feed it host metrics, pointer input and frame
//! ticks. All state lives here; nothing is global.

use std::f32::consts::PI;

use cgmath::Rad;
use instant::Instant;

use crate::{
    camera::OrthographicCamera,
    clock::Clock,
    controls::{OrbitControls, PointerButton},
    data_structures::mesh::{Mesh, Scene},
    render::{MaterialDesc, RenderBackend},
    sdf::{DistanceField, SdfGeometryGenerator},
    settings::{MaterialMode, Settings},
    viewport::HostMetrics,
};

/// Mesh scale per half of the smaller window side.
pub const SCALE_FACTOR: f32 = 10.66;
pub const BASE_COLOR: u32 = 0x0bb338;
/// Auto-rotation speed around Y in radians per second.
pub const ROTATION_SPEED: f32 = PI * 0.05;
/// Highest accepted resolution level (256 cells per axis).
pub const MAX_RESOLUTION: u32 = 6;

fn clamp_resolution(resolution: u32) -> u32 {
    if resolution > MAX_RESOLUTION {
        log::warn!("resolution {resolution} is too high, using {MAX_RESOLUTION}");
    }
    resolution.min(MAX_RESOLUTION)
}

pub struct SceneController<B: RenderBackend> {
    backend: B,
    field: Box<dyn DistanceField>,
    generator: SdfGeometryGenerator,
    settings: Settings,
    scene: Scene<B::Geometry, B::Material>,
    camera: OrthographicCamera,
    controls: OrbitControls,
    clock: Clock,
    metrics: HostMetrics,
}

impl<B: RenderBackend> SceneController<B> {
    /// Sizes the backend to the host and sets up the camera and controls.
    /// The scene stays empty until [`SceneController::compile`].
    pub fn new(
        mut backend: B,
        field: Box<dyn DistanceField>,
        mut settings: Settings,
        metrics: HostMetrics,
    ) -> Self {
        settings.resolution = clamp_resolution(settings.resolution);
        let viewport = metrics.viewport();
        backend.set_size(&viewport);
        let camera = OrthographicCamera::for_viewport(&viewport);

        let mut controls = OrbitControls::new();
        controls.enable_damping = true;
        controls.damping_factor = 0.05;
        controls.enable_zoom = false;

        Self {
            backend,
            field,
            generator: SdfGeometryGenerator::new(),
            settings,
            scene: Scene::new(),
            camera,
            controls,
            clock: Clock::new(),
            metrics,
        }
    }

    fn material_desc(&self) -> MaterialDesc {
        MaterialDesc {
            mode: self.settings.material,
            wireframe: self.settings.wireframe,
        }
    }

    /// Samples the distance field and puts the result in the scene.
    ///
    /// The first call creates the mesh. Later calls swap the geometry of the
    /// existing mesh and dispose the previous one.
    pub fn compile(&mut self) -> anyhow::Result<()> {
        let mut data = self.generator.generate(
            self.settings.subdivisions(),
            self.field.as_ref(),
            self.settings.bounds,
        );
        data.compute_vertex_normals();
        self.settings.vertex_count = data.vertex_count();

        let geometry = self.backend.upload_geometry(&data);
        match self.scene.mesh_mut() {
            Some(mesh) => {
                let previous = std::mem::replace(&mut mesh.geometry, geometry);
                self.backend.dispose_geometry(previous);
            }
            None => {
                let material = self.backend.create_material(self.material_desc());
                let mut mesh = Mesh::new(geometry, material);
                mesh.transform
                    .set_uniform_scale(self.metrics.window_min_side() as f32 / 2.0 * SCALE_FACTOR);
                mesh.set_color_hex(BASE_COLOR);
                self.scene.add(mesh)?;
            }
        }
        log::info!(
            "compiled sculpture at {} cells per axis: {} vertices",
            self.settings.subdivisions(),
            self.settings.vertex_count
        );
        Ok(())
    }

    /// Rebuilds the mesh material from the current settings. Does nothing
    /// before the first compile.
    pub fn set_material(&mut self) {
        let desc = self.material_desc();
        let Some(mesh) = self.scene.mesh_mut() else {
            return;
        };
        let material = self.backend.create_material(desc);
        let previous = std::mem::replace(&mut mesh.material, material);
        self.backend.dispose_material(previous);
    }

    pub fn set_material_mode(&mut self, mode: MaterialMode) {
        self.settings.material = mode;
        self.set_material();
    }

    /// Parses `name` and applies it. An unknown name leaves the current
    /// material in place.
    pub fn set_material_name(&mut self, name: &str) -> anyhow::Result<()> {
        let mode: MaterialMode = name.parse()?;
        self.set_material_mode(mode);
        Ok(())
    }

    pub fn set_wireframe(&mut self, wireframe: bool) {
        self.settings.wireframe = wireframe;
        self.set_material();
    }

    pub fn set_auto_rotate(&mut self, auto_rotate: bool) {
        self.settings.auto_rotate = auto_rotate;
    }

    /// Stores the resolution level and regenerates the geometry if the
    /// sculpture was already compiled.
    pub fn set_resolution(&mut self, resolution: u32) -> anyhow::Result<()> {
        self.settings.resolution = clamp_resolution(resolution);
        if self.scene.is_empty() {
            return Ok(());
        }
        self.compile()
    }

    /// Follows a change of the host size. The frustum becomes symmetric.
    pub fn resize(&mut self, metrics: HostMetrics) {
        self.metrics = metrics;
        let viewport = metrics.viewport();
        self.backend.set_size(&viewport);
        self.camera.fit_viewport(&viewport);
    }

    pub fn pointer_down(&mut self, button: PointerButton, x: f32, y: f32) {
        self.controls.pointer_down(button, x, y);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        let viewport = self.metrics.viewport();
        self.controls.pointer_move(
            &self.camera,
            x,
            y,
            (viewport.width as f32, viewport.height as f32),
        );
    }

    pub fn pointer_up(&mut self) {
        self.controls.pointer_up();
    }

    pub fn wheel(&mut self, delta_y: f32) {
        self.controls.wheel(delta_y);
    }

    pub fn frame(&mut self) -> anyhow::Result<()> {
        self.frame_at(Instant::now())
    }

    /// One display frame: apply controls, advance auto-rotation by the time
    /// since the previous frame, render. The first frame does not rotate.
    pub fn frame_at(&mut self, now: Instant) -> anyhow::Result<()> {
        self.controls.update(&mut self.camera);
        let delta = self.clock.delta_at(now);
        if self.settings.auto_rotate {
            if let Some(mesh) = self.scene.mesh_mut() {
                mesh.transform.rotation.y += Rad(ROTATION_SPEED * delta.as_secs_f32());
            }
        }
        self.backend.render(&self.scene, &self.camera)
    }

    /// Releases the mesh resources. Safe to call more than once.
    pub fn dispose(&mut self) {
        if let Some(mesh) = self.scene.take() {
            self.backend.dispose_geometry(mesh.geometry);
            self.backend.dispose_material(mesh.material);
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn scene(&self) -> &Scene<B::Geometry, B::Material> {
        &self.scene
    }

    pub fn camera(&self) -> &OrthographicCamera {
        &self.camera
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{InnerSpace, Vector3};
    use instant::Duration;

    use super::*;
    use crate::{data_structures::geometry::MeshData, viewport::Viewport};

    /// Hands out numbered handles and records what the controller asks for.
    #[derive(Debug, Default)]
    struct RecordingBackend {
        next_id: u32,
        uploaded_vertices: Vec<usize>,
        disposed_geometry: Vec<u32>,
        created_materials: Vec<MaterialDesc>,
        disposed_materials: Vec<u32>,
        sizes: Vec<Viewport>,
        renders: usize,
    }

    impl RecordingBackend {
        fn id(&mut self) -> u32 {
            self.next_id += 1;
            self.next_id
        }
    }

    impl RenderBackend for RecordingBackend {
        type Geometry = u32;
        type Material = (u32, MaterialDesc);

        fn upload_geometry(&mut self, data: &MeshData) -> u32 {
            self.uploaded_vertices.push(data.vertex_count());
            self.id()
        }

        fn dispose_geometry(&mut self, geometry: u32) {
            self.disposed_geometry.push(geometry);
        }

        fn create_material(&mut self, desc: MaterialDesc) -> (u32, MaterialDesc) {
            self.created_materials.push(desc);
            (self.id(), desc)
        }

        fn dispose_material(&mut self, material: (u32, MaterialDesc)) {
            self.disposed_materials.push(material.0);
        }

        fn set_size(&mut self, viewport: &Viewport) {
            self.sizes.push(*viewport);
        }

        fn render(
            &mut self,
            _scene: &Scene<u32, (u32, MaterialDesc)>,
            _camera: &OrthographicCamera,
        ) -> anyhow::Result<()> {
            self.renders += 1;
            Ok(())
        }
    }

    fn controller(settings: Settings) -> SceneController<RecordingBackend> {
        let sphere = |p: Vector3<f32>| p.magnitude() - 0.5f32;
        SceneController::new(
            RecordingBackend::default(),
            Box::new(sphere),
            settings,
            HostMetrics::window(1280, 720, 2.0),
        )
    }

    fn low_res() -> Settings {
        Settings {
            resolution: 1,
            ..Settings::default()
        }
    }

    #[test]
    fn new_sizes_the_backend_and_frames_off_centre() {
        let ctrl = controller(low_res());
        let size = ctrl.backend().sizes[0];
        assert_eq!((size.width, size.height, size.pixel_ratio), (1280, 720, 2.0));
        assert_eq!(ctrl.camera().left, -1280.0 / 5.0);
        assert_eq!(ctrl.camera().top, 720.0 / 4.0);
        assert!(ctrl.scene().is_empty());
        assert!(!ctrl.controls().enable_zoom);
        assert!(ctrl.controls().enable_damping);
    }

    #[test]
    fn first_compile_creates_one_scaled_green_mesh() {
        let mut ctrl = controller(low_res());
        ctrl.compile().unwrap();

        assert_eq!(ctrl.scene().len(), 1);
        let mesh = ctrl.scene().mesh().unwrap();
        assert_eq!(mesh.transform.scale.x, 360.0 * SCALE_FACTOR);
        assert_eq!(mesh.color, [11.0 / 255.0, 179.0 / 255.0, 56.0 / 255.0]);
        assert_eq!(mesh.material.1, MaterialDesc {
            mode: MaterialMode::Depth,
            wireframe: true,
        });
        assert!(ctrl.settings().vertex_count > 0);
        assert_eq!(ctrl.backend().uploaded_vertices, vec![ctrl.settings().vertex_count]);
    }

    #[test]
    fn recompile_swaps_geometry_and_disposes_the_old_one_once() {
        let mut ctrl = controller(low_res());
        ctrl.compile().unwrap();
        let first = ctrl.scene().mesh().unwrap().geometry;
        let material = ctrl.scene().mesh().unwrap().material.0;

        ctrl.compile().unwrap();
        let mesh = ctrl.scene().mesh().unwrap();
        assert_ne!(mesh.geometry, first);
        assert_eq!(mesh.material.0, material);
        assert_eq!(ctrl.scene().len(), 1);
        assert_eq!(ctrl.backend().disposed_geometry, vec![first]);
    }

    #[test]
    fn switching_material_disposes_the_previous_once_per_switch() {
        let mut ctrl = controller(low_res());
        ctrl.compile().unwrap();
        let depth = ctrl.scene().mesh().unwrap().material.0;

        ctrl.set_material_mode(MaterialMode::Normal);
        let normal = ctrl.scene().mesh().unwrap().material;
        assert_eq!(normal.1.mode, MaterialMode::Normal);
        assert!(normal.1.wireframe);
        assert_eq!(ctrl.backend().disposed_materials, vec![depth]);

        ctrl.set_wireframe(false);
        let current = ctrl.scene().mesh().unwrap().material;
        assert!(!current.1.wireframe);
        assert_eq!(current.1.mode, MaterialMode::Normal);
        assert_eq!(ctrl.backend().disposed_materials, vec![depth, normal.0]);
    }

    #[test]
    fn unknown_material_name_keeps_the_current_material() {
        let mut ctrl = controller(low_res());
        ctrl.compile().unwrap();
        let before = ctrl.scene().mesh().unwrap().material;

        assert!(ctrl.set_material_name("phong").is_err());
        assert_eq!(ctrl.scene().mesh().unwrap().material, before);
        assert!(ctrl.backend().disposed_materials.is_empty());

        ctrl.set_material_name(" Normal ").unwrap();
        assert_eq!(ctrl.settings().material, MaterialMode::Normal);
    }

    #[test]
    fn set_material_without_mesh_is_a_no_op() {
        let mut ctrl = controller(low_res());
        ctrl.set_material_mode(MaterialMode::Normal);
        assert!(ctrl.backend().created_materials.is_empty());
        assert_eq!(ctrl.settings().material, MaterialMode::Normal);
    }

    #[test]
    fn resize_falls_back_per_dimension_and_centres_the_frustum() {
        let mut ctrl = controller(low_res());
        ctrl.resize(HostMetrics {
            container_width: 0,
            container_height: 500,
            window_width: 1024,
            window_height: 768,
            pixel_ratio: 1.0,
        });
        let size = *ctrl.backend().sizes.last().unwrap();
        assert_eq!((size.width, size.height), (1024, 500));
        let camera = ctrl.camera();
        assert_eq!(
            (camera.left, camera.right, camera.top, camera.bottom),
            (-512.0, 512.0, 250.0, -250.0)
        );
    }

    #[test]
    fn auto_rotate_advances_by_elapsed_time() {
        let mut ctrl = controller(low_res());
        ctrl.compile().unwrap();
        let start = Instant::now();
        ctrl.frame_at(start).unwrap();
        let before = ctrl.scene().mesh().unwrap().transform.rotation.y;

        ctrl.frame_at(start + Duration::from_millis(500)).unwrap();
        let after = ctrl.scene().mesh().unwrap().transform.rotation.y;
        assert!((after.0 - before.0 - ROTATION_SPEED * 0.5).abs() < 1e-6);
        assert_eq!(ctrl.backend().renders, 2);
    }

    #[test]
    fn first_frame_does_not_count_setup_time() {
        let mut ctrl = controller(low_res());
        let created = Instant::now();
        ctrl.compile().unwrap();
        ctrl.frame_at(created + Duration::from_secs(3)).unwrap();
        assert_eq!(ctrl.scene().mesh().unwrap().transform.rotation.y, Rad(0.0));

        ctrl.frame_at(created + Duration::from_secs(4)).unwrap();
        let rotation = ctrl.scene().mesh().unwrap().transform.rotation.y;
        assert!((rotation.0 - ROTATION_SPEED).abs() < 1e-6);
    }

    #[test]
    fn auto_rotate_off_leaves_rotation_alone() {
        let mut ctrl = controller(low_res());
        ctrl.compile().unwrap();
        ctrl.set_auto_rotate(false);
        let start = Instant::now();
        ctrl.frame_at(start).unwrap();
        ctrl.frame_at(start + Duration::from_secs(2)).unwrap();
        assert_eq!(ctrl.scene().mesh().unwrap().transform.rotation.y, Rad(0.0));
    }

    #[test]
    fn set_resolution_recompiles_an_existing_mesh() {
        let mut ctrl = controller(low_res());
        ctrl.set_resolution(2).unwrap();
        assert!(ctrl.backend().uploaded_vertices.is_empty());

        ctrl.compile().unwrap();
        let coarse = ctrl.settings().vertex_count;
        ctrl.set_resolution(3).unwrap();
        assert!(ctrl.settings().vertex_count > coarse);
        assert_eq!(ctrl.backend().disposed_geometry.len(), 1);
    }

    #[test]
    fn resolution_is_clamped() {
        let mut ctrl = controller(low_res());
        ctrl.set_resolution(40).unwrap();
        assert_eq!(ctrl.settings().resolution, MAX_RESOLUTION);
    }

    #[test]
    fn oversized_initial_resolution_is_clamped() {
        let ctrl = controller(Settings {
            resolution: 29,
            ..Settings::default()
        });
        assert_eq!(ctrl.settings().resolution, MAX_RESOLUTION);
        assert_eq!(ctrl.settings().subdivisions(), 256);
    }

    #[test]
    fn dispose_releases_mesh_resources_once() {
        let mut ctrl = controller(low_res());
        ctrl.compile().unwrap();
        ctrl.dispose();
        ctrl.dispose();
        assert!(ctrl.scene().is_empty());
        assert_eq!(ctrl.backend().disposed_geometry.len(), 1);
        assert_eq!(ctrl.backend().disposed_materials.len(), 1);
    }

    #[test]
    fn primary_drag_rotates_the_camera() {
        let mut ctrl = controller(low_res());
        let before = ctrl.camera().position;
        ctrl.pointer_down(PointerButton::Primary, 100.0, 100.0);
        ctrl.pointer_move(160.0, 100.0);
        ctrl.pointer_up();
        ctrl.frame().unwrap();
        assert_ne!(ctrl.camera().position, before);
    }
}

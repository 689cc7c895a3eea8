#![cfg(not(target_arch = "wasm32"))]

#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
mod render {
    use sdf_backdrop::{MaterialMode, Settings};

    use crate::common::{SIZE, block_on, pixel, sphere_controller};

    fn solid(material: MaterialMode) -> Settings {
        Settings {
            wireframe: false,
            auto_rotate: false,
            material,
            ..Settings::default()
        }
    }

    #[test]
    fn should_render_clear_colour() {
        let mut controller = sphere_controller(Settings::default());
        controller.backend_mut().clear_colour = wgpu::Color::WHITE;
        controller.frame().unwrap();

        let image = block_on(controller.backend().read_pixels()).unwrap();
        assert_eq!(image.dimensions(), (SIZE, SIZE));
        for p in image.pixels() {
            assert_eq!(p.0, [255, 255, 255, 255]);
        }
    }

    #[test]
    fn depth_material_shades_the_sculpture_on_black() {
        let mut controller = sphere_controller(solid(MaterialMode::Depth));
        controller.compile().unwrap();
        controller.frame().unwrap();

        let image = block_on(controller.backend().read_pixels()).unwrap();
        let centre = pixel(&image, SIZE / 2, SIZE / 2);
        assert!(centre[0] > 100, "centre is {centre:?}");
        assert_eq!(centre[0], centre[1]);
        assert_eq!(centre[1], centre[2]);
        assert_eq!(pixel(&image, 0, 0), [0, 0, 0, 255]);
        assert_eq!(pixel(&image, SIZE - 1, SIZE - 1), [0, 0, 0, 255]);
    }

    #[test]
    fn normal_material_colours_camera_facing_surface_blue() {
        let mut controller = sphere_controller(solid(MaterialMode::Normal));
        controller.compile().unwrap();
        controller.frame().unwrap();

        let image = block_on(controller.backend().read_pixels()).unwrap();
        let [r, g, b, _] = pixel(&image, SIZE / 2, SIZE / 2);
        assert!(b > 240, "blue is {b}");
        assert!(r > 150 && r < 220, "red is {r}");
        assert!(g > 150 && g < 220, "green is {g}");
    }

    #[test]
    fn wireframe_leaves_gaps_between_edges() {
        let mut solid_ctrl = sphere_controller(solid(MaterialMode::Depth));
        solid_ctrl.compile().unwrap();
        solid_ctrl.frame().unwrap();
        let solid_image = block_on(solid_ctrl.backend().read_pixels()).unwrap();

        let mut wire_ctrl = sphere_controller(Settings {
            wireframe: true,
            ..solid(MaterialMode::Depth)
        });
        wire_ctrl.compile().unwrap();
        wire_ctrl.frame().unwrap();
        let wire_image = block_on(wire_ctrl.backend().read_pixels()).unwrap();

        let lit = |image: &image::RgbaImage| image.pixels().filter(|p| p.0[0] > 0).count();
        assert!(lit(&wire_image) > 0);
        assert!(lit(&wire_image) < lit(&solid_image));
    }

    #[test]
    fn switching_material_and_resolution_keeps_rendering() {
        let mut controller = sphere_controller(solid(MaterialMode::Depth));
        controller.compile().unwrap();
        controller.set_material_mode(MaterialMode::Normal);
        controller.set_resolution(3).unwrap();
        controller.frame().unwrap();
        assert_eq!(controller.scene().len(), 1);

        controller.dispose();
        controller.frame().unwrap();
        let image = block_on(controller.backend().read_pixels()).unwrap();
        assert_eq!(pixel(&image, SIZE / 2, SIZE / 2), [0, 0, 0, 255]);
    }
}

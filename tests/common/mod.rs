use std::future::Future;

use cgmath::{InnerSpace, Vector3};
use sdf_backdrop::{
    Settings, context::Context, controller::SceneController, viewport::HostMetrics,
};

pub const SIZE: u32 = 256;

pub fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Runtime::new()
        .expect("tokio runtime")
        .block_on(future)
}

pub fn metrics() -> HostMetrics {
    HostMetrics::window(SIZE, SIZE, 1.0)
}

/// A controller over an offscreen context showing a small sphere.
pub fn sphere_controller(settings: Settings) -> SceneController<Context> {
    let context = block_on(Context::headless(&metrics().viewport())).expect("headless context");
    let sphere = |p: Vector3<f32>| p.magnitude() - 0.08f32;
    let mut controller = SceneController::new(context, Box::new(sphere), settings, metrics());
    // symmetric frustum centred on the origin
    controller.resize(metrics());
    controller
}

pub fn pixel(image: &image::RgbaImage, x: u32, y: u32) -> [u8; 4] {
    image.get_pixel(x, y).0
}

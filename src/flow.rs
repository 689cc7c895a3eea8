//! Native preview host.
//!
//! Opens a window with `winit` and drives the same [`SceneController`] the
//! browser uses. The window plays the role of the container, so host metrics
//! are the logical window size and the scale factor is the pixel ratio.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::LogicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use crate::{
    context::Context,
    controller::SceneController,
    controls::PointerButton,
    sdf::Sculpture,
    settings::Settings,
    viewport::HostMetrics,
};

fn metrics(window: &Window) -> HostMetrics {
    let scale_factor = window.scale_factor();
    let size = window.inner_size().to_logical::<u32>(scale_factor);
    HostMetrics::window(size.width, size.height, scale_factor)
}

fn pointer_button(button: MouseButton) -> PointerButton {
    match button {
        MouseButton::Left => PointerButton::Primary,
        MouseButton::Right => PointerButton::Secondary,
        _ => PointerButton::Other,
    }
}

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    settings: Settings,
    window: Option<Arc<Window>>,
    controller: Option<SceneController<Context>>,
    cursor: LogicalPosition<f32>,
}

impl App {
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        Ok(Self {
            async_runtime: tokio::runtime::Runtime::new()?,
            settings,
            window: None,
            controller: None,
            cursor: LogicalPosition::new(0.0, 0.0),
        })
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attributes = Window::default_attributes().with_title("sdf-backdrop");
        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let metrics = metrics(&window);

        let context = self
            .async_runtime
            .block_on(Context::new(window.clone(), &metrics.viewport()))?;
        let mut controller = SceneController::new(
            context,
            Box::new(Sculpture::default()),
            self.settings.clone(),
            metrics,
        );
        controller.compile()?;

        window.request_redraw();
        self.window = Some(window);
        self.controller = Some(controller);
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            log::error!("App initialization failed: {e:#}");
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let (Some(window), Some(controller)) = (&self.window, self.controller.as_mut()) else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => {
                controller.dispose();
                event_loop.exit();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                controller.resize(metrics(window));
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = position.to_logical(window.scale_factor());
                controller.pointer_move(self.cursor.x, self.cursor.y);
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => {
                    controller.pointer_down(pointer_button(button), self.cursor.x, self.cursor.y)
                }
                ElementState::Released => controller.pointer_up(),
            },
            WindowEvent::MouseWheel { delta, .. } => {
                // winit reports scrolling up as positive, the DOM as negative
                let delta_y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y * 100.0,
                    MouseScrollDelta::PixelDelta(position) => -position.y as f32,
                };
                controller.wheel(delta_y);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = controller.frame() {
                    log::error!("{e:#}");
                }
                window.request_redraw();
            }
            _ => {}
        }
    }
}

/// Opens the preview window and blocks until it is closed.
pub fn run(settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(settings)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}

//! Browser host.
//!
//! `initThreeScene(containerId)` waits for the DOM, mounts a canvas inside the
//! container and drives a [`SceneController`] from `requestAnimationFrame`.
//! Each backdrop stays registered with the page until `dispose()`, so the
//! returned [`SceneHandle`] may be dropped or ignored. `stop()` unregisters
//! the frame callback and the listeners, and `dispose()` also releases the
//! GPU resources and removes the canvas.
//!
//! Callbacks hold weak references to the host state; the registry holds the
//! only strong one besides the handles.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use anyhow::{Context as _, anyhow};
use wasm_bindgen::{JsCast, JsValue, prelude::*};
use web_sys::{
    AddEventListenerOptions, Document, Event, EventTarget, HtmlCanvasElement,
    HtmlElement, PointerEvent, WheelEvent,
};

use crate::{
    context::Context,
    controller::SceneController,
    controls::PointerButton,
    sdf::Sculpture,
    settings::{MaterialMode, Settings},
    viewport::{HostMetrics, Viewport},
};

pub const DEFAULT_CONTAINER_ID: &str = "three-container";

fn js_error(value: JsValue) -> anyhow::Error {
    anyhow!("{value:?}")
}

/// A DOM event listener that unregisters itself when dropped.
struct Listener {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Listener {
    fn add(
        target: &EventTarget,
        kind: &'static str,
        callback: Closure<dyn FnMut(Event)>,
    ) -> anyhow::Result<Self> {
        target
            .add_event_listener_with_callback(kind, callback.as_ref().unchecked_ref())
            .map_err(js_error)?;
        Ok(Self {
            target: target.clone(),
            kind,
            callback,
        })
    }

    fn add_once(
        target: &EventTarget,
        kind: &'static str,
        callback: Closure<dyn FnMut(Event)>,
    ) -> anyhow::Result<Self> {
        let options = AddEventListenerOptions::new();
        options.set_once(true);
        target
            .add_event_listener_with_callback_and_add_event_listener_options(
                kind,
                callback.as_ref().unchecked_ref(),
                &options,
            )
            .map_err(js_error)?;
        Ok(Self {
            target: target.clone(),
            kind,
            callback,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.kind, self.callback.as_ref().unchecked_ref());
    }
}

struct Host {
    container_id: String,
    frames: u32,
    settings: Settings,
    container: Option<HtmlElement>,
    canvas: Option<HtmlCanvasElement>,
    controller: Option<SceneController<Context>>,
    frame: Option<Closure<dyn FnMut()>>,
    frame_id: Option<i32>,
    listeners: Vec<Listener>,
    stopped: bool,
}

impl Host {
    fn new(container_id: String) -> Self {
        Self {
            container_id,
            frames: 0,
            settings: Settings::default(),
            container: None,
            canvas: None,
            controller: None,
            frame: None,
            frame_id: None,
            listeners: Vec::new(),
            stopped: false,
        }
    }

    fn request_frame(&mut self) {
        let (Some(window), Some(callback)) = (web_sys::window(), self.frame.as_ref()) else {
            return;
        };
        match window.request_animation_frame(callback.as_ref().unchecked_ref()) {
            Ok(id) => self.frame_id = Some(id),
            Err(e) => log::error!("cannot schedule the next frame: {e:?}"),
        }
    }

    fn cancel_frame(&mut self) {
        if let (Some(window), Some(id)) = (web_sys::window(), self.frame_id.take()) {
            let _ = window.cancel_animation_frame(id);
        }
    }

    fn stop(&mut self) {
        self.stopped = true;
        self.cancel_frame();
        self.frame = None;
        self.listeners.clear();
    }

    fn is_running(&self) -> bool {
        self.frame_id.is_some() || !self.listeners.is_empty()
    }

    /// Stopped without ever placing a canvas.
    fn abandoned(&self) -> bool {
        self.stopped && self.canvas.is_none()
    }

    fn resize(&mut self) {
        let (Some(window), Some(container)) = (web_sys::window(), self.container.as_ref()) else {
            return;
        };
        let metrics = measure(&window, container);
        if let Some(canvas) = &self.canvas {
            if let Err(e) = size_canvas(canvas, &metrics.viewport()) {
                log::warn!("cannot resize the canvas: {e:#}");
            }
        }
        if let Some(controller) = self.controller.as_mut() {
            controller.resize(metrics);
        }
    }
}

thread_local! {
    static HOSTS: RefCell<Vec<Rc<RefCell<Host>>>> = const { RefCell::new(Vec::new()) };
}

/// Keeps `host` alive until [`unregister`]. Hosts that never found their
/// container are dropped here.
fn register(host: &Rc<RefCell<Host>>) {
    HOSTS.with_borrow_mut(|hosts| {
        hosts.retain(|h| h.try_borrow().map_or(true, |h| !h.abandoned()));
        hosts.push(host.clone());
    });
}

fn unregister(host: &Rc<RefCell<Host>>) {
    HOSTS.with_borrow_mut(|hosts| hosts.retain(|h| !Rc::ptr_eq(h, host)));
}

/// The live or pending backdrop for `container_id`, if any.
fn registered(container_id: &str) -> Option<Rc<RefCell<Host>>> {
    HOSTS.with_borrow(|hosts| {
        hosts
            .iter()
            .find(|h| {
                h.try_borrow()
                    .is_ok_and(|h| h.container_id == container_id && !h.abandoned())
            })
            .cloned()
    })
}

impl Drop for Host {
    fn drop(&mut self) {
        self.cancel_frame();
    }
}

fn measure(window: &web_sys::Window, container: &HtmlElement) -> HostMetrics {
    let dimension = |value: Result<JsValue, JsValue>| {
        value
            .ok()
            .and_then(|v| v.as_f64())
            .map(|v| v.max(0.0) as u32)
            .unwrap_or(0)
    };
    HostMetrics {
        container_width: container.client_width().max(0) as u32,
        container_height: container.client_height().max(0) as u32,
        window_width: dimension(window.inner_width()),
        window_height: dimension(window.inner_height()),
        pixel_ratio: window.device_pixel_ratio(),
    }
}

/// CSS size from the viewport, backing store scaled by the pixel ratio.
fn size_canvas(canvas: &HtmlCanvasElement, viewport: &Viewport) -> anyhow::Result<()> {
    let (width, height) = viewport.physical_size();
    canvas.set_width(width);
    canvas.set_height(height);
    let style = canvas.style();
    style
        .set_property("width", &format!("{}px", viewport.width))
        .map_err(js_error)?;
    style
        .set_property("height", &format!("{}px", viewport.height))
        .map_err(js_error)?;
    style.set_property("display", "block").map_err(js_error)?;
    Ok(())
}

fn with_controller(host: &Weak<RefCell<Host>>, f: impl FnOnce(&mut SceneController<Context>)) {
    if let Some(host) = host.upgrade() {
        if let Some(controller) = host.borrow_mut().controller.as_mut() {
            f(controller);
        }
    }
}

fn button(event: &PointerEvent) -> PointerButton {
    match event.button() {
        0 => PointerButton::Primary,
        2 => PointerButton::Secondary,
        _ => PointerButton::Other,
    }
}

fn document() -> anyhow::Result<Document> {
    web_sys::window()
        .context("no window")?
        .document()
        .context("no document")
}

/// Creates the canvas and listeners and starts GPU setup. A missing
/// container is logged and leaves the page untouched.
fn mount(host: &Rc<RefCell<Host>>) -> anyhow::Result<()> {
    let window = web_sys::window().context("no window")?;
    let document = document()?;
    let id = host.borrow().container_id.clone();
    let Some(container) = document.get_element_by_id(&id) else {
        log::error!("no element with id \"{id}\", the backdrop is not mounted");
        host.borrow_mut().stopped = true;
        return Ok(());
    };
    let container: HtmlElement = container
        .dyn_into()
        .map_err(|_| anyhow!("#{id} is not an HTML element"))?;

    let canvas: HtmlCanvasElement = document
        .create_element("canvas")
        .map_err(js_error)?
        .dyn_into()
        .map_err(|_| anyhow!("created element is not a canvas"))?;
    let metrics = measure(&window, &container);
    size_canvas(&canvas, &metrics.viewport())?;
    container.append_child(&canvas).map_err(js_error)?;
    log::info!("mounted backdrop canvas in #{id}");

    {
        let mut state = host.borrow_mut();
        state.container = Some(container);
        state.canvas = Some(canvas.clone());
    }
    add_listeners(host, &window, &canvas)?;

    let weak = Rc::downgrade(host);
    wasm_bindgen_futures::spawn_local(async move {
        let viewport = metrics.viewport();
        let context = match Context::new(wgpu::SurfaceTarget::Canvas(canvas), &viewport).await {
            Ok(context) => context,
            Err(e) => {
                log::error!("cannot create the GPU context: {e:#}");
                return;
            }
        };
        let Some(host) = weak.upgrade() else {
            return;
        };
        if let Err(e) = start(&host, context) {
            log::error!("cannot start the backdrop: {e:#}");
        }
    });
    Ok(())
}

fn add_listeners(
    host: &Rc<RefCell<Host>>,
    window: &web_sys::Window,
    canvas: &HtmlCanvasElement,
) -> anyhow::Result<()> {
    let mut listeners = Vec::new();

    let weak = Rc::downgrade(host);
    listeners.push(Listener::add(
        window,
        "resize",
        Closure::wrap(Box::new(move |_: Event| {
            if let Some(host) = weak.upgrade() {
                host.borrow_mut().resize();
            }
        }) as Box<dyn FnMut(Event)>),
    )?);

    let weak = Rc::downgrade(host);
    let target = canvas.clone();
    listeners.push(Listener::add(
        canvas,
        "pointerdown",
        Closure::wrap(Box::new(move |event: Event| {
            let Some(event) = event.dyn_ref::<PointerEvent>() else {
                return;
            };
            let _ = target.set_pointer_capture(event.pointer_id());
            let (x, y) = (event.client_x() as f32, event.client_y() as f32);
            with_controller(&weak, |c| c.pointer_down(button(event), x, y));
        }) as Box<dyn FnMut(Event)>),
    )?);

    let weak = Rc::downgrade(host);
    listeners.push(Listener::add(
        canvas,
        "pointermove",
        Closure::wrap(Box::new(move |event: Event| {
            let Some(event) = event.dyn_ref::<PointerEvent>() else {
                return;
            };
            let (x, y) = (event.client_x() as f32, event.client_y() as f32);
            with_controller(&weak, |c| c.pointer_move(x, y));
        }) as Box<dyn FnMut(Event)>),
    )?);

    let weak = Rc::downgrade(host);
    listeners.push(Listener::add(
        canvas,
        "pointerup",
        Closure::wrap(Box::new(move |_: Event| {
            with_controller(&weak, |c| c.pointer_up());
        }) as Box<dyn FnMut(Event)>),
    )?);

    let weak = Rc::downgrade(host);
    listeners.push(Listener::add(
        canvas,
        "wheel",
        Closure::wrap(Box::new(move |event: Event| {
            let Some(event) = event.dyn_ref::<WheelEvent>() else {
                return;
            };
            let delta = event.delta_y() as f32;
            with_controller(&weak, |c| c.wheel(delta));
        }) as Box<dyn FnMut(Event)>),
    )?);

    // secondary drag pans
    listeners.push(Listener::add(
        canvas,
        "contextmenu",
        Closure::wrap(Box::new(move |event: Event| event.prevent_default()) as Box<dyn FnMut(Event)>),
    )?);

    host.borrow_mut().listeners.extend(listeners);
    Ok(())
}

/// Builds the controller once the GPU is ready and starts the frame loop.
fn start(host: &Rc<RefCell<Host>>, context: Context) -> anyhow::Result<()> {
    let mut state = host.borrow_mut();
    if state.stopped {
        return Ok(());
    }
    let window = web_sys::window().context("no window")?;
    let container = state.container.as_ref().context("the canvas is not mounted")?;
    let metrics = measure(&window, container);

    let mut controller = SceneController::new(
        context,
        Box::new(Sculpture::default()),
        state.settings.clone(),
        metrics,
    );
    controller.compile()?;
    state.controller = Some(controller);

    let weak = Rc::downgrade(host);
    state.frame = Some(Closure::wrap(Box::new(move || {
        let Some(host) = weak.upgrade() else {
            return;
        };
        let mut host = host.borrow_mut();
        host.frame_id = None;
        if host.stopped {
            return;
        }
        let rendered = host.controller.as_mut().map(|controller| controller.frame());
        match rendered {
            Some(Ok(())) => host.frames = host.frames.wrapping_add(1),
            Some(Err(e)) => log::warn!("frame skipped: {e:#}"),
            None => {}
        }
        host.request_frame();
    }) as Box<dyn FnMut()>));
    state.request_frame();
    Ok(())
}

/// Handle to a mounted (or pending) backdrop.
#[wasm_bindgen]
pub struct SceneHandle {
    host: Rc<RefCell<Host>>,
}

#[wasm_bindgen]
impl SceneHandle {
    /// Whether a canvas was placed in the container.
    pub fn mounted(&self) -> bool {
        self.host.borrow().canvas.is_some()
    }

    /// Whether a frame callback or an event listener is still registered.
    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.host.borrow().is_running()
    }

    /// Cancels the frame loop and removes all listeners.
    pub fn stop(&self) {
        self.host.borrow_mut().stop();
    }

    /// Frames rendered so far.
    #[wasm_bindgen(js_name = frameCount)]
    pub fn frame_count(&self) -> u32 {
        self.host.borrow().frames
    }

    /// Stops, releases the mesh resources and removes the canvas. The
    /// container may be initialised again afterwards.
    pub fn dispose(&self) {
        unregister(&self.host);
        let mut host = self.host.borrow_mut();
        host.stop();
        if let Some(mut controller) = host.controller.take() {
            controller.dispose();
        }
        if let Some(canvas) = host.canvas.take() {
            canvas.remove();
        }
        host.container = None;
    }

    /// Switches to the `"depth"` or `"normal"` material. Throws on any other name.
    #[wasm_bindgen(js_name = setMaterial)]
    pub fn set_material(&self, mode: &str) -> Result<(), JsValue> {
        let mode: MaterialMode = mode
            .parse()
            .map_err(|e: anyhow::Error| JsValue::from_str(&e.to_string()))?;
        let mut guard = self.host.borrow_mut();
        let host = &mut *guard;
        match host.controller.as_mut() {
            Some(controller) => controller.set_material_mode(mode),
            None => host.settings.material = mode,
        }
        Ok(())
    }

    #[wasm_bindgen(js_name = setWireframe)]
    pub fn set_wireframe(&self, wireframe: bool) {
        let mut guard = self.host.borrow_mut();
        let host = &mut *guard;
        match host.controller.as_mut() {
            Some(controller) => controller.set_wireframe(wireframe),
            None => host.settings.wireframe = wireframe,
        }
    }

    #[wasm_bindgen(js_name = setAutoRotate)]
    pub fn set_auto_rotate(&self, auto_rotate: bool) {
        let mut guard = self.host.borrow_mut();
        let host = &mut *guard;
        match host.controller.as_mut() {
            Some(controller) => controller.set_auto_rotate(auto_rotate),
            None => host.settings.auto_rotate = auto_rotate,
        }
    }

    #[wasm_bindgen(js_name = setResolution)]
    pub fn set_resolution(&self, resolution: u32) -> Result<(), JsValue> {
        let mut guard = self.host.borrow_mut();
        let host = &mut *guard;
        match host.controller.as_mut() {
            Some(controller) => controller
                .set_resolution(resolution)
                .map_err(|e| JsValue::from_str(&format!("{e:#}"))),
            None => {
                host.settings.resolution = resolution.min(crate::controller::MAX_RESOLUTION);
                Ok(())
            }
        }
    }

    #[wasm_bindgen(js_name = vertexCount)]
    pub fn vertex_count(&self) -> usize {
        let host = self.host.borrow();
        match host.controller.as_ref() {
            Some(controller) => controller.settings().vertex_count,
            None => host.settings.vertex_count,
        }
    }
}

/// Mounts right away, or on `DOMContentLoaded` while the document is
/// still `loading`.
fn mount_when_ready(
    host: &Rc<RefCell<Host>>,
    document: &Document,
    loading: bool,
) -> anyhow::Result<()> {
    if !loading {
        return mount(host);
    }
    let weak = Rc::downgrade(host);
    let listener = Listener::add_once(
        document,
        "DOMContentLoaded",
        Closure::wrap(Box::new(move |_: Event| {
            if let Some(host) = weak.upgrade() {
                if let Err(e) = mount(&host) {
                    log::error!("cannot mount the backdrop: {e:#}");
                }
            }
        }) as Box<dyn FnMut(Event)>),
    )?;
    host.borrow_mut().listeners.push(listener);
    Ok(())
}

/// Mounts the backdrop into the element with id `container_id`
/// (`"three-container"` when omitted) as soon as the DOM is ready.
///
/// The backdrop runs until [`SceneHandle::dispose`]. Calling this again for
/// a container that already has a live or pending backdrop returns a handle
/// to that one.
#[wasm_bindgen(js_name = initThreeScene)]
pub fn init_three_scene(container_id: Option<String>) -> SceneHandle {
    // A second initialisation keeps the first logger.
    let _ = console_log::init_with_level(log::Level::Info);

    let id = container_id.unwrap_or_else(|| DEFAULT_CONTAINER_ID.to_string());
    if let Some(host) = registered(&id) {
        log::warn!("#{id} already has a backdrop");
        return SceneHandle { host };
    }
    let host = Rc::new(RefCell::new(Host::new(id)));
    register(&host);

    let result = document().and_then(|document| {
        let loading = document.ready_state() == "loading";
        mount_when_ready(&host, &document, loading)
    });
    if let Err(e) = result {
        log::error!("cannot mount the backdrop: {e:#}");
    }
    SceneHandle { host }
}

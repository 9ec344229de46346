use gloo::events::{EventListener, EventListenerOptions, EventListenerPhase};
use js_sys::Promise;
use log::debug;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{
    AddEventListenerOptions, Document, Element, Event, EventTarget, HtmlCanvasElement, HtmlElement,
    Storage, WebGl2RenderingContext as GL, WebGlContextAttributes, WebGlPowerPreference, Window,
};

use super::render::{lose_context, WebGlBackend};
use crate::config::{BufferSize, ContextAttributes, Viewport};
use crate::context::{ContextSurface, LossState};
use crate::error::{FxError, FxResult};
use crate::prefs::KeyValueStorage;

pub const FALLBACK_BACKGROUND: &str = "radial-gradient(circle at 50% 50%, \
    rgba(88, 101, 242, 0.2) 0%, rgba(0, 0, 0, 0.95) 50%, rgba(0, 0, 0, 1) 100%)";

pub fn window() -> FxResult<Window> {
    web_sys::window().ok_or_else(|| FxError::Js("no window".into()))
}

pub fn document() -> FxResult<Document> {
    window()?.document().ok_or_else(|| FxError::Js("no document".into()))
}

pub fn viewport(window: &Window) -> Viewport {
    let read = |v: Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64()).unwrap_or(1.0);
    Viewport::new(read(window.inner_width()), read(window.inner_height()), window.device_pixel_ratio())
}

/// Passive bubbling listener for `event` on `target`, handed the event
/// already cast to `E`. Dropping the listener removes it.
pub fn listen<E>(target: &EventTarget, event: &'static str, mut handler: impl FnMut(&E) + 'static) -> EventListener
where
    E: JsCast,
{
    let options = EventListenerOptions { phase: EventListenerPhase::Bubble, passive: true };
    EventListener::new_with_options(target, event, options, move |event: &Event| {
        if let Some(event) = event.dyn_ref::<E>() {
            handler(event);
        }
    })
}

pub fn set_style(element: &HtmlElement, property: &str, value: &str) {
    if let Err(err) = element.style().set_property(property, value) {
        debug!("setting {property} failed: {err:?}");
    }
}

pub fn set_class(element: &Element, class: &str, on: bool) {
    if let Err(err) = element.class_list().toggle_with_force(class, on) {
        debug!("toggling {class} failed: {err:?}");
    }
}

/// Shows or hides the static gradient on `container`.
pub fn show_fallback(container: &HtmlElement, on: bool) {
    let background = if on { FALLBACK_BACKGROUND } else { "" };
    set_style(container, "background", background);
}

/// Where a surface puts its canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Fills the container.
    Fill,
    /// Fixed over the whole window, ignoring pointer events.
    Overlay,
}

/// A mount point in the document.
pub struct DomSurface {
    window: Window,
    document: Document,
    container: HtmlElement,
    placement: Placement,
    existing: Option<HtmlCanvasElement>,
    lost: Option<Promise>,
}

impl DomSurface {
    pub fn new(window: Window, container: HtmlElement, placement: Placement) -> FxResult<Self> {
        let document = window.document().ok_or_else(|| FxError::Js("no document".into()))?;
        Ok(Self { window, document, container, placement, existing: None, lost: None })
    }

    /// Resolves once the previous canvas reported `webglcontextlost`. Only
    /// set after [`ContextSurface::lose_existing`] returned `Pending`.
    pub fn take_loss_signal(&mut self) -> Option<Promise> {
        self.lost.take()
    }

    fn create_canvas(&self) -> Option<HtmlCanvasElement> {
        self.document.create_element("canvas").ok()?.dyn_into::<HtmlCanvasElement>().ok()
    }

    fn style_canvas(&self, canvas: &HtmlCanvasElement) {
        set_style(canvas, "display", "block");
        match self.placement {
            Placement::Fill => {
                set_style(canvas, "width", "100%");
                set_style(canvas, "height", "100%");
            }
            Placement::Overlay => {
                set_style(canvas, "position", "fixed");
                set_style(canvas, "inset", "0");
                set_style(canvas, "width", "100vw");
                set_style(canvas, "height", "100vh");
                set_style(canvas, "pointer-events", "none");
                set_style(canvas, "z-index", "9998");
            }
        }
    }
}

fn context_lost_promise(canvas: &HtmlCanvasElement) -> Promise {
    Promise::new(&mut |resolve, _reject| {
        let on_lost = Closure::once_into_js(move |_: Event| {
            let _ = resolve.call0(&JsValue::UNDEFINED);
        });
        let options = AddEventListenerOptions::new();
        options.set_once(true);
        if canvas
            .add_event_listener_with_callback_and_add_event_listener_options(
                "webglcontextlost",
                on_lost.unchecked_ref(),
                &options,
            )
            .is_err()
        {
            debug!("could not watch for context loss");
        }
    })
}

impl ContextSurface for DomSurface {
    type Context = WebGlBackend;

    fn lose_existing(&mut self) -> LossState {
        let canvas = match self.container.query_selector("canvas") {
            Ok(Some(el)) => el.dyn_into::<HtmlCanvasElement>().ok(),
            _ => None,
        };
        let Some(canvas) = canvas else {
            return LossState::NoCanvas;
        };

        // getContext hands back the context the canvas already holds.
        let state = match canvas.get_context("webgl2") {
            Ok(Some(ctx)) => {
                let gl: GL = ctx.unchecked_into();
                if gl.is_context_lost() {
                    LossState::Lost
                } else {
                    let lost = context_lost_promise(&canvas);
                    if lose_context(&gl) {
                        self.lost = Some(lost);
                        LossState::Pending
                    } else {
                        LossState::Lost
                    }
                }
            }
            _ => LossState::Lost,
        };
        self.existing = Some(canvas);
        state
    }

    fn remove_existing(&mut self) {
        if let Some(canvas) = self.existing.take() {
            canvas.remove();
        }
    }

    fn probe_support(&self) -> bool {
        let Some(probe) = self.create_canvas() else {
            return false;
        };
        match probe.get_context("webgl2") {
            Ok(Some(ctx)) => {
                lose_context(&ctx.unchecked_into::<GL>());
                true
            }
            _ => false,
        }
    }

    fn container_size(&self) -> (f64, f64) {
        let window_size = || {
            let vp = viewport(&self.window);
            (vp.width, vp.height)
        };
        match self.placement {
            Placement::Overlay => window_size(),
            Placement::Fill => {
                let (w, h) = (self.container.client_width(), self.container.client_height());
                if w > 0 && h > 0 {
                    (w as f64, h as f64)
                } else {
                    window_size()
                }
            }
        }
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.window.device_pixel_ratio()
    }

    fn attach_context(&mut self, size: BufferSize, attrs: &ContextAttributes) -> Option<WebGlBackend> {
        let canvas = self.create_canvas()?;
        canvas.set_width(size.width);
        canvas.set_height(size.height);
        self.style_canvas(&canvas);
        self.container.append_child(&canvas).ok()?;

        let options = WebGlContextAttributes::new();
        options.set_alpha(attrs.alpha);
        options.set_antialias(attrs.antialias);
        options.set_power_preference(WebGlPowerPreference::Default);
        options.set_fail_if_major_performance_caveat(attrs.fail_if_major_performance_caveat);
        options.set_preserve_drawing_buffer(attrs.preserve_drawing_buffer);
        options.set_desynchronized(attrs.desynchronized);

        let gl = canvas
            .get_context_with_context_options("webgl2", &options)
            .ok()
            .flatten()
            .and_then(|ctx| ctx.dyn_into::<GL>().ok());
        match gl {
            Some(gl) => Some(WebGlBackend::new(gl, canvas)),
            None => {
                canvas.remove();
                None
            }
        }
    }
}

/// `window.localStorage`.
pub struct LocalStorage {
    storage: Storage,
}

impl LocalStorage {
    pub fn open() -> FxResult<Self> {
        window()?
            .local_storage()?
            .map(|storage| Self { storage })
            .ok_or_else(|| FxError::Storage("localStorage disabled".into()))
    }
}

impl KeyValueStorage for LocalStorage {
    fn get_item(&self, key: &str) -> FxResult<Option<String>> {
        self.storage.get_item(key).map_err(|err| FxError::Storage(format!("{err:?}")))
    }

    fn set_item(&self, key: &str, value: &str) -> FxResult<()> {
        self.storage.set_item(key, value).map_err(|err| FxError::Storage(format!("{err:?}")))
    }
}

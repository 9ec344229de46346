use std::cell::RefCell;
use std::rc::{Rc, Weak};

use glam::Vec2;
use js_sys::Function;
use log::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{Element, HtmlElement, MouseEvent, TouchEvent};

use super::dom::{self, DomSurface, LocalStorage, Placement};
use super::render::{RafScheduler, WebGlBackend};
use crate::config::{ContextAttributes, SceneOptions};
use crate::context::{acquire, begin_clear, finish_clear, LossState, SetupTicket};
use crate::cursor::CursorHost;
use crate::error::FxResult;
use crate::host::{BackgroundHost, HostPhase};
use crate::intro::{IntroPhase, IntroSequence};
use crate::pointer::normalize;
use crate::prefs::{self, ChatConsent, KeyValueStorage, MemoryStorage, PreferenceStore};
use crate::signal::{Signal, Subscription};

/// Clears whatever canvas the container still holds, waiting for its
/// context to be lost if necessary, then acquires a fresh one.
async fn acquire_context(
    mut surface: DomSurface,
    ticket: &SetupTicket,
    attrs: ContextAttributes,
) -> Option<WebGlBackend> {
    if begin_clear(&mut surface) == LossState::Pending {
        if let Some(lost) = surface.take_loss_signal() {
            if let Err(err) = JsFuture::from(lost).await {
                debug!("waiting for context loss failed: {err:?}");
            }
        }
        finish_clear(&mut surface);
    }
    acquire(&mut surface, ticket, &attrs)
}

fn random_seed() -> u64 {
    (js_sys::Math::random() * u32::MAX as f64) as u64
}

fn first_touch(event: &TouchEvent) -> Option<(f64, f64)> {
    event.touches().get(0).map(|t| (t.client_x() as f64, t.client_y() as f64))
}

/// Runs `f` on the host if it is still alive and not already borrowed.
fn with_host<H>(host: &Weak<RefCell<H>>, f: impl FnOnce(&mut H)) {
    if let Some(host) = host.upgrade() {
        if let Ok(mut host) = host.try_borrow_mut() {
            f(&mut host);
        }
    }
}

type SceneHost = BackgroundHost<WebGlBackend, RafScheduler>;

/// The hero background: particle field and grid on a WebGL2 canvas, or a
/// static gradient when that is not possible.
#[wasm_bindgen]
pub struct BackgroundFx {
    host: Rc<RefCell<SceneHost>>,
    fallback: Signal<bool>,
    scheduler: RafScheduler,
    container: Option<HtmlElement>,
    watchers: Vec<Subscription>,
}

#[wasm_bindgen]
impl BackgroundFx {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<BackgroundFx, JsValue> {
        let window = dom::window()?;
        let host = BackgroundHost::new(dom::viewport(&window));
        Ok(Self {
            fallback: host.fallback(),
            host: Rc::new(RefCell::new(host)),
            scheduler: RafScheduler::new(window),
            container: None,
            watchers: Vec::new(),
        })
    }

    pub fn mount(&mut self, container: HtmlElement) -> Result<(), JsValue> {
        let Some(ticket) = self.host.borrow_mut().mount() else {
            return Ok(());
        };
        let window = dom::window()?;
        let surface = DomSurface::new(window.clone(), container.clone(), Placement::Fill)?;
        let attrs = self.host.borrow().context_attributes();

        let target = container.clone();
        self.watchers.push(self.fallback.subscribe(move |on| dom::show_fallback(&target, *on)));
        self.container = Some(container);

        let host = Rc::downgrade(&self.host);
        let scheduler = self.scheduler.clone();
        spawn_local(async move {
            let context = acquire_context(surface, &ticket, attrs).await;
            if let Err(err) = start_scene(&host, &ticket, context, scheduler) {
                warn!("background listeners unavailable: {err}");
            }
        });
        Ok(())
    }

    /// Synchronous teardown; the canvas is gone when this returns.
    pub fn unmount(&mut self) {
        self.host.borrow_mut().unmount();
        self.scheduler.clear();
        self.watchers.clear();
        if let Some(container) = self.container.take() {
            dom::show_fallback(&container, false);
        }
    }

    #[wasm_bindgen(js_name = isFallback)]
    pub fn is_fallback(&self) -> bool {
        self.fallback.get()
    }

    /// Calls `callback(isFallback)` whenever the fallback state changes.
    #[wasm_bindgen(js_name = onFallback)]
    pub fn on_fallback(&mut self, callback: Function) {
        self.watchers.push(self.fallback.subscribe(move |on| {
            if let Err(err) = callback.call1(&JsValue::NULL, &JsValue::from_bool(*on)) {
                warn!("fallback callback threw: {err:?}");
            }
        }));
    }
}

impl Drop for BackgroundFx {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn start_scene(
    host: &Weak<RefCell<SceneHost>>,
    ticket: &SetupTicket,
    context: Option<WebGlBackend>,
    scheduler: RafScheduler,
) -> FxResult<()> {
    let Some(rc) = host.upgrade() else {
        return Ok(());
    };
    if !ticket.is_cancelled() {
        let frames = host.clone();
        scheduler.install(move |now| {
            let Some(rc) = frames.upgrade() else {
                return;
            };
            let Ok(mut h) = rc.try_borrow_mut() else {
                return;
            };
            h.frame(now);
            let update = h.fallback_update();
            drop(h);
            // A subscriber may unmount, which drops this very callback, so
            // it only hears about the failure once the frame has returned.
            if update.is_change() {
                spawn_local(async move { update.publish() });
            }
        });
    }
    let setup = BackgroundHost::step(&rc, |h| {
        h.complete_setup(ticket, context.map(|gl| (gl, scheduler)), random_seed())
    });
    if setup != Some(HostPhase::Running) {
        return Ok(());
    }

    let window = dom::window()?;
    let (a, b, c) = (host.clone(), host.clone(), host.clone());
    let listeners = [
        dom::listen(&window, "mousemove", move |e: &MouseEvent| {
            with_host(&a, |h| h.pointer_move(e.client_x() as f64, e.client_y() as f64))
        }),
        dom::listen(&window, "touchmove", move |e: &TouchEvent| {
            with_host(&b, |h| h.touch_move(first_touch(e)))
        }),
        dom::listen(&window, "resize", move |_: &web_sys::Event| {
            if let Ok(window) = dom::window() {
                with_host(&c, |h| h.resize(dom::viewport(&window)));
            }
        }),
    ];
    let mut host = rc.borrow_mut();
    for listener in listeners {
        host.hold(listener);
    }
    Ok(())
}

type TrailHost = CursorHost<WebGlBackend, RafScheduler>;

/// The custom cursor dot plus its WebGL trail.
#[wasm_bindgen]
pub struct CursorFx {
    host: Rc<RefCell<TrailHost>>,
    scheduler: RafScheduler,
    watchers: Vec<Subscription>,
}

#[wasm_bindgen]
impl CursorFx {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<CursorFx, JsValue> {
        let window = dom::window()?;
        let scheduler = RafScheduler::new(window.clone());
        let host = CursorHost::new(scheduler.clone(), dom::viewport(&window));
        Ok(Self { host: Rc::new(RefCell::new(host)), scheduler, watchers: Vec::new() })
    }

    /// `container` receives the trail canvas; `cursor` is the element that
    /// follows the pointer.
    pub fn mount(&mut self, container: HtmlElement, cursor: HtmlElement) -> Result<(), JsValue> {
        if self.host.borrow().phase() != HostPhase::Uninitialized {
            return Ok(());
        }
        // The dot moves from the first frame on, so the callback has to be
        // in place before the loop starts.
        let weak = Rc::downgrade(&self.host);
        let dot = cursor.clone();
        self.scheduler.install(move |now| {
            let mut position = None;
            with_host(&weak, |h| position = h.frame(now));
            if let Some(p) = position {
                dom::set_style(&dot, "transform", &format!("translate3d({}px, {}px, 0)", p.x, p.y));
            }
        });

        let Some(ticket) = self.host.borrow_mut().mount()? else {
            return Ok(());
        };
        self.bind_styles(&cursor);
        self.bind_listeners()?;

        let window = dom::window()?;
        let attrs = ContextAttributes::for_quality(SceneOptions::for_viewport(&dom::viewport(&window)).quality);
        let surface = DomSurface::new(window, container, Placement::Overlay)?;
        let host = Rc::downgrade(&self.host);
        spawn_local(async move {
            let context = acquire_context(surface, &ticket, attrs).await;
            match host.upgrade() {
                Some(host) => {
                    host.borrow_mut().complete_setup(&ticket, context);
                }
                None => drop(context),
            }
        });
        Ok(())
    }

    pub fn unmount(&mut self) {
        self.host.borrow_mut().unmount();
        self.scheduler.clear();
        self.watchers.clear();
    }
}

impl CursorFx {
    fn bind_styles(&mut self, cursor: &HtmlElement) {
        let host = self.host.borrow();
        let (a, b, c) = (cursor.clone(), cursor.clone(), cursor.clone());
        self.watchers.push(host.visible().subscribe(move |on| {
            dom::set_style(&a, "opacity", if *on { "1" } else { "0" })
        }));
        self.watchers.push(host.hovering().subscribe(move |on| dom::set_class(&b, "hovering", *on)));
        self.watchers.push(host.pressed().subscribe(move |on| dom::set_class(&c, "clicking", *on)));
    }

    fn bind_listeners(&mut self) -> FxResult<()> {
        let window = dom::window()?;
        let document = dom::document()?;
        let weak = Rc::downgrade(&self.host);
        let h = || weak.clone();

        let (a, b, c, d, e, f, g) = (h(), h(), h(), h(), h(), h(), h());
        let listeners = [
            dom::listen(&window, "mousemove", move |ev: &MouseEvent| {
                with_host(&a, |h| h.pointer_move(ev.client_x() as f64, ev.client_y() as f64))
            }),
            dom::listen(&document, "mouseleave", move |_: &MouseEvent| with_host(&b, |h| h.pointer_leave())),
            dom::listen(&document, "mouseenter", move |_: &MouseEvent| with_host(&c, |h| h.pointer_enter())),
            dom::listen(&document, "mousedown", move |_: &MouseEvent| with_host(&d, |h| h.pointer_down())),
            dom::listen(&document, "mouseup", move |_: &MouseEvent| with_host(&e, |h| h.pointer_up())),
            dom::listen(&document, "mouseover", move |ev: &MouseEvent| {
                let Some(target) = ev.target().and_then(|t| t.dyn_into::<Element>().ok()) else {
                    return;
                };
                let role = target.get_attribute("role");
                with_host(&f, |h| h.hover(&target.tag_name(), role.as_deref(), &target.class_name()))
            }),
            dom::listen(&window, "resize", move |_: &web_sys::Event| {
                if let Ok(window) = dom::window() {
                    with_host(&g, |h| h.resize(dom::viewport(&window)));
                }
            }),
        ];
        let mut host = self.host.borrow_mut();
        for listener in listeners {
            host.hold(listener);
        }
        Ok(())
    }
}

impl Drop for CursorFx {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// The countdown splash. The page drives it from its own frame callback.
#[wasm_bindgen]
pub struct IntroFx {
    sequence: IntroSequence,
}

#[wasm_bindgen]
impl IntroFx {
    #[wasm_bindgen(constructor)]
    pub fn new(on_complete: Option<Function>) -> IntroFx {
        let sequence = IntroSequence::new(move || {
            if let Some(callback) = on_complete {
                if let Err(err) = callback.call0(&JsValue::NULL) {
                    warn!("intro completion callback threw: {err:?}");
                }
            }
        });
        Self { sequence }
    }

    /// Starts the countdown. Returns false if it was already running.
    pub fn activate(&mut self) -> bool {
        let now = dom::window().ok().and_then(|w| w.performance()).map(|p| p.now()).unwrap_or(0.0);
        self.sequence.activate(now)
    }

    /// Steps to `now_ms` (a `requestAnimationFrame` timestamp) and returns
    /// the phase name.
    pub fn advance(&mut self, now_ms: f64) -> String {
        match self.sequence.advance(now_ms) {
            IntroPhase::Interaction => "interaction",
            IntroPhase::Countdown => "countdown",
            IntroPhase::Transition => "transition",
            IntroPhase::Complete => "complete",
        }
        .to_string()
    }

    pub fn pointer(&mut self, client_x: f64, client_y: f64) {
        if let Ok(window) = dom::window() {
            self.sequence.pointer(normalize(client_x, client_y, &dom::viewport(&window)));
        }
    }

    #[wasm_bindgen(getter)]
    pub fn message(&self) -> String {
        self.sequence.message().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn countdown(&self) -> u32 {
        self.sequence.countdown()
    }

    #[wasm_bindgen(getter, js_name = digitOpacity)]
    pub fn digit_opacity(&self) -> f32 {
        self.sequence.digit_opacity()
    }

    #[wasm_bindgen(getter)]
    pub fn opacity(&self) -> f32 {
        self.sequence.opacity()
    }

    #[wasm_bindgen(getter, js_name = isFlashing)]
    pub fn is_flashing(&self) -> bool {
        self.sequence.is_flashing()
    }

    #[wasm_bindgen(getter, js_name = cameraOffset)]
    pub fn camera_offset(&self) -> Vec<f32> {
        let Vec2 { x, y } = self.sequence.camera_offset();
        vec![x, y]
    }

    #[wasm_bindgen(getter, js_name = portalScale)]
    pub fn portal_scale(&self) -> f32 {
        self.sequence.portal_scale()
    }
}

fn browser_storage() -> Box<dyn KeyValueStorage> {
    match LocalStorage::open() {
        Ok(storage) => Box::new(storage),
        Err(err) => {
            warn!("{err}, preferences will not persist");
            Box::new(MemoryStorage::default())
        }
    }
}

/// Visit and interest tracking for the personalized greeting.
#[wasm_bindgen]
pub struct Preferences {
    store: PreferenceStore<Box<dyn KeyValueStorage>>,
}

#[wasm_bindgen]
impl Preferences {
    pub fn load() -> Preferences {
        Self { store: PreferenceStore::load(browser_storage()) }
    }

    #[wasm_bindgen(js_name = recordVisit)]
    pub fn record_visit(&mut self) -> Result<u32, JsValue> {
        let now: String = js_sys::Date::new_0().to_iso_string().into();
        Ok(self.store.record_visit(&now)?.visit_count)
    }

    #[wasm_bindgen(js_name = addInterests)]
    pub fn add_interests(&mut self, tags: Vec<String>) -> Result<(), JsValue> {
        self.store.add_interests(tags)?;
        Ok(())
    }

    #[wasm_bindgen(js_name = viewContent)]
    pub fn view_content(&mut self, content_id: &str) -> Result<(), JsValue> {
        self.store.view_content(content_id)?;
        Ok(())
    }

    #[wasm_bindgen(js_name = toJson)]
    pub fn to_json(&self) -> Result<String, JsValue> {
        Ok(serde_json::to_string(self.store.get()).map_err(crate::error::FxError::from)?)
    }

    /// Time-of-day greeting in the visitor's local time.
    pub fn greeting(&self) -> String {
        prefs::greeting(js_sys::Date::new_0().get_hours()).to_string()
    }

    #[wasm_bindgen(js_name = welcomeMessage)]
    pub fn welcome_message(&self) -> String {
        prefs::welcome_message(self.store.get().visit_count).to_string()
    }
}

#[wasm_bindgen(js_name = hasChatConsent)]
pub fn has_chat_consent() -> bool {
    ChatConsent::new(browser_storage()).granted()
}

#[wasm_bindgen(js_name = grantChatConsent)]
pub fn grant_chat_consent() -> Result<(), JsValue> {
    Ok(ChatConsent::new(browser_storage()).grant()?)
}

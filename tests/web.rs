#![cfg(target_arch = "wasm32")]

use backdrop_fx::{BackgroundFx, CursorFx, IntroFx, Preferences};
use js_sys::Promise;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;
use web_sys::{HtmlCanvasElement, HtmlElement, MouseEvent, MouseEventInit, WebGl2RenderingContext};

wasm_bindgen_test_configure!(run_in_browser);

fn container() -> HtmlElement {
    let document = web_sys::window().unwrap().document().unwrap();
    let div: HtmlElement = document.create_element("div").unwrap().dyn_into().unwrap();
    div.style().set_property("width", "320px").unwrap();
    div.style().set_property("height", "200px").unwrap();
    document.body().unwrap().append_child(&div).unwrap();
    div
}

fn canvas_count(div: &HtmlElement) -> u32 {
    div.query_selector_all("canvas").unwrap().length()
}

async fn next_frame() {
    let promise = Promise::new(&mut |resolve, _| {
        web_sys::window().unwrap().request_animation_frame(&resolve).unwrap();
    });
    JsFuture::from(promise).await.unwrap();
}

async fn settle() {
    for _ in 0..3 {
        next_frame().await;
    }
}

#[wasm_bindgen_test(async)]
async fn unmount_before_setup_attaches_nothing() {
    let div = container();
    let mut fx = BackgroundFx::new().unwrap();
    fx.mount(div.clone()).unwrap();
    fx.unmount();
    settle().await;
    assert_eq!(canvas_count(&div), 0);
}

#[wasm_bindgen_test(async)]
async fn mount_shows_canvas_or_gradient() {
    let div = container();
    let mut fx = BackgroundFx::new().unwrap();
    fx.mount(div.clone()).unwrap();
    settle().await;

    if fx.is_fallback() {
        assert_eq!(canvas_count(&div), 0);
        let background = div.style().get_property_value("background").unwrap();
        assert!(background.contains("radial-gradient"), "{background}");
    } else {
        assert_eq!(canvas_count(&div), 1);
    }

    fx.unmount();
    fx.unmount();
    assert_eq!(canvas_count(&div), 0);
}

#[wasm_bindgen_test(async)]
async fn mount_replaces_a_live_canvas() {
    let div = container();
    let document = web_sys::window().unwrap().document().unwrap();
    let stale: HtmlCanvasElement = document.create_element("canvas").unwrap().dyn_into().unwrap();
    div.append_child(&stale).unwrap();
    let stale_gl = stale
        .get_context("webgl2")
        .unwrap()
        .map(|ctx| ctx.dyn_into::<WebGl2RenderingContext>().unwrap());

    let mut fx = BackgroundFx::new().unwrap();
    fx.mount(div.clone()).unwrap();
    settle().await;

    assert!(stale.parent_node().is_none());
    if let Some(gl) = &stale_gl {
        assert!(gl.is_context_lost());
    }
    if fx.is_fallback() {
        assert_eq!(canvas_count(&div), 0);
        let background = div.style().get_property_value("background").unwrap();
        assert!(background.contains("radial-gradient"), "{background}");
    } else {
        assert_eq!(canvas_count(&div), 1);
        let fresh: HtmlCanvasElement = div.query_selector("canvas").unwrap().unwrap().dyn_into().unwrap();
        assert_ne!(fresh, stale);
    }

    fx.unmount();
    assert_eq!(canvas_count(&div), 0);
}

#[wasm_bindgen_test(async)]
async fn fallback_callback_can_unmount() {
    let div = container();
    let fx = std::rc::Rc::new(std::cell::RefCell::new(BackgroundFx::new().unwrap()));
    let weak = std::rc::Rc::downgrade(&fx);
    let on_fallback = wasm_bindgen::closure::Closure::<dyn FnMut(bool)>::new(move |on: bool| {
        if let Some(fx) = weak.upgrade() {
            let mut fx = fx.borrow_mut();
            assert_eq!(fx.is_fallback(), on);
            fx.unmount();
        }
    });
    fx.borrow_mut().on_fallback(on_fallback.as_ref().clone().unchecked_into());
    fx.borrow_mut().mount(div.clone()).unwrap();
    settle().await;

    assert_eq!(canvas_count(&div) > 0, !fx.borrow().is_fallback());
    fx.borrow_mut().unmount();
    assert_eq!(canvas_count(&div), 0);
}

#[wasm_bindgen_test(async)]
async fn cursor_follows_mouse() {
    let div = container();
    let dot = container();
    let mut fx = CursorFx::new().unwrap();
    fx.mount(div.clone(), dot.clone()).unwrap();

    let init = MouseEventInit::new();
    init.set_client_x(120);
    init.set_client_y(80);
    let event = MouseEvent::new_with_mouse_event_init_dict("mousemove", &init).unwrap();
    web_sys::window().unwrap().dispatch_event(&event).unwrap();
    settle().await;

    assert_eq!(dot.style().get_property_value("opacity").unwrap(), "1");
    assert!(dot.style().get_property_value("transform").unwrap().contains("translate3d"));

    fx.unmount();
    assert_eq!(canvas_count(&div), 0);
}

#[wasm_bindgen_test]
fn intro_completes_once_time_has_passed() {
    let mut intro = IntroFx::new(None);
    assert_eq!(intro.advance(0.0), "interaction");
    assert!(intro.activate());
    assert!(!intro.activate());
    let now = web_sys::window().unwrap().performance().unwrap().now();
    assert_eq!(intro.advance(now + 10_000.0), "complete");
    assert_eq!(intro.countdown(), 0);
}

#[wasm_bindgen_test]
fn preferences_persist_in_local_storage() {
    let storage = web_sys::window().unwrap().local_storage().unwrap().unwrap();
    storage.remove_item("user_preferences").unwrap();

    let mut prefs = Preferences::load();
    assert_eq!(prefs.record_visit().unwrap(), 1);
    assert_eq!(prefs.welcome_message(), "Welcome to AI Transform!");
    prefs.add_interests(vec!["automation".into(), "automation".into()]).unwrap();

    let mut again = Preferences::load();
    assert_eq!(again.record_visit().unwrap(), 2);
    let json = again.to_json().unwrap();
    assert!(json.contains("\"interests\":[\"automation\"]"), "{json}");

    backdrop_fx::grant_chat_consent().unwrap();
    assert!(backdrop_fx::has_chat_consent());
}

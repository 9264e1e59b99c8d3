//! Small DOM helpers shared by the bindings.

use std::future::Future;

use futures::channel::oneshot;
use gloo_events::EventListener;
use gloo_timers::future::TimeoutFuture;
use showreel_core::{Delay, Rect, ShowreelError, ShowreelResult, Viewport};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, Event, EventTarget, Node, Window};

pub fn window() -> ShowreelResult<Window> {
    web_sys::window().ok_or_else(|| ShowreelError::missing("window"))
}

pub fn document() -> ShowreelResult<Document> {
    window()?
        .document()
        .ok_or_else(|| ShowreelError::missing("document"))
}

/// First element matching `selector` in the document.
pub fn query(selector: &str) -> Option<Element> {
    document().ok()?.query_selector(selector).ok().flatten()
}

pub fn query_in(parent: &Element, selector: &str) -> Option<Element> {
    parent.query_selector(selector).ok().flatten()
}

pub fn query_all(selector: &str) -> Vec<Element> {
    let Some(list) = document()
        .ok()
        .and_then(|d| d.query_selector_all(selector).ok())
    else {
        return Vec::new();
    };
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

/// Nearest ancestor of the event target (inclusive) matching `selector`.
pub fn closest(event: &Event, selector: &str) -> Option<Element> {
    let node: Node = event.target()?.dyn_into().ok()?;
    let element = match node.dyn_ref::<Element>() {
        Some(el) => el.clone(),
        None => node.parent_element()?,
    };
    element.closest(selector).ok().flatten()
}

pub fn bounds(element: &Element) -> Rect {
    let r = element.get_bounding_client_rect();
    Rect::new(r.left(), r.top(), r.width(), r.height())
}

pub fn viewport() -> Viewport {
    let Ok(window) = window() else {
        return Viewport::new(0.0, 0.0);
    };
    let dim = |v: Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
    Viewport::new(dim(window.inner_width()), dim(window.inner_height()))
}

/// True when `window[name]` exists.
pub fn has_global(name: &str) -> bool {
    window()
        .ok()
        .and_then(|w| js_sys::Reflect::has(&w, &JsValue::from_str(name)).ok())
        .unwrap_or(false)
}

pub fn js_error(value: JsValue) -> ShowreelError {
    let message = value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{:?}", value));
    ShowreelError::Js(message)
}

/// Resolves on the next `kind` event on `target`. Dropping the future
/// removes the listener.
pub fn once(target: &EventTarget, kind: &'static str) -> impl Future<Output = ()> + 'static {
    let (tx, rx) = oneshot::channel::<()>();
    let listener = EventListener::once(target, kind, move |_| {
        let _ = tx.send(());
    });
    async move {
        let _listener = listener;
        let _ = rx.await;
    }
}

pub fn sleep(delay: Delay) -> TimeoutFuture {
    TimeoutFuture::new(delay.as_millis())
}

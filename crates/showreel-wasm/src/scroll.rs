//! Page scrolling: Lenis smooth scroll when the page ships it, native otherwise.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use showreel_core::{ScrollController, ScrollEngine};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::Window;

use crate::dom;

#[wasm_bindgen]
extern "C" {
    /// The global `Lenis` smooth-scroll class.
    pub type Lenis;

    #[wasm_bindgen(constructor, catch)]
    fn new() -> Result<Lenis, JsValue>;

    #[wasm_bindgen(method)]
    fn raf(this: &Lenis, time: f64);

    #[wasm_bindgen(method)]
    fn start(this: &Lenis);

    #[wasm_bindgen(method)]
    fn stop(this: &Lenis);

    #[wasm_bindgen(method, js_name = scrollTo)]
    fn scroll_to(this: &Lenis, target: f64, options: &JsValue);
}

#[derive(Serialize)]
struct ScrollToOptions {
    immediate: bool,
}

pub enum PageScroll {
    Smooth(Lenis),
    Native(Window),
}

impl ScrollEngine for PageScroll {
    fn tick(&self, time: f64) {
        if let PageScroll::Smooth(lenis) = self {
            lenis.raf(time);
        }
    }

    fn start(&self) {
        if let PageScroll::Smooth(lenis) = self {
            lenis.start();
        }
    }

    fn stop(&self) {
        if let PageScroll::Smooth(lenis) = self {
            lenis.stop();
        }
    }

    fn scroll_to(&self, offset: f64, immediate: bool) {
        match self {
            PageScroll::Smooth(lenis) => {
                let options = serde_wasm_bindgen::to_value(&ScrollToOptions { immediate })
                    .unwrap_or(JsValue::UNDEFINED);
                lenis.scroll_to(offset, &options);
            }
            PageScroll::Native(window) => window.scroll_to_with_x_and_y(0.0, offset),
        }
    }
}

pub type PageScroller = Rc<ScrollController<PageScroll>>;

/// Build the page scroller and start its frame loop.
///
/// Returns `None` only when there is no window at all.
pub fn init() -> Option<PageScroller> {
    let window = dom::window().ok()?;
    let engine = if dom::has_global("Lenis") {
        match Lenis::new() {
            Ok(lenis) => PageScroll::Smooth(lenis),
            Err(e) => {
                tracing::warn!("smooth scroll unavailable: {}", dom::js_error(e));
                PageScroll::Native(window)
            }
        }
    } else {
        tracing::debug!("no smooth scroll library on the page; using native scrolling");
        PageScroll::Native(window)
    };
    let smooth = matches!(engine, PageScroll::Smooth(_));
    let scroller = Rc::new(ScrollController::new(engine));
    if smooth {
        run_frames(scroller.clone());
    }
    Some(scroller)
}

/// Feed every animation frame to the scroller for the lifetime of the page.
fn run_frames(scroller: PageScroller) {
    let frame: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
    let next = frame.clone();
    *frame.borrow_mut() = Some(Closure::new(move |time: f64| {
        scroller.tick(time);
        if let Some(callback) = next.borrow().as_ref() {
            request_frame(callback);
        }
    }));
    if let Some(callback) = frame.borrow().as_ref() {
        request_frame(callback);
    };
}

fn request_frame(callback: &Closure<dyn FnMut(f64)>) {
    if let Ok(window) = dom::window() {
        if let Err(e) = window.request_animation_frame(callback.as_ref().unchecked_ref()) {
            tracing::warn!("animation frame rejected: {}", dom::js_error(e));
        }
    }
}

/// Run `f` on the next animation frame.
pub fn on_next_frame(f: impl FnOnce() + 'static) {
    let Ok(window) = dom::window() else {
        return;
    };
    let callback = Closure::once_into_js(f);
    if window
        .request_animation_frame(callback.unchecked_ref())
        .is_err()
    {
        tracing::debug!("animation frame unavailable");
    }
}

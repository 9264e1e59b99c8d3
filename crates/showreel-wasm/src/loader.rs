//! Player library injection and warm-up.

use std::rc::Rc;

use futures::future::{self, Either, FutureExt, LocalBoxFuture};
use gloo_events::EventListener;
use gloo_timers::callback::Timeout;
use js_sys::{Array, Reflect};
use showreel_core::{
    AssetFetcher, Latch, PlayerAssetLoader, PlayerConfig, ShowreelError, ShowreelResult,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, HtmlLinkElement, HtmlScriptElement, IntersectionObserver,
    IntersectionObserverEntry, IntersectionObserverInit};

use crate::dom;

/// Injects the player script (and optional stylesheet) into `<head>`.
pub struct ScriptFetcher {
    script_url: String,
    stylesheet_url: Option<String>,
    global: String,
}

impl ScriptFetcher {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            script_url: config.script_url.clone(),
            stylesheet_url: config.stylesheet_url.clone(),
            global: config.global.clone(),
        }
    }

    fn attach_stylesheet(&self, url: &str) -> ShowreelResult<()> {
        let document = dom::document()?;
        let head = document.head().ok_or_else(|| ShowreelError::missing("head"))?;
        let link: HtmlLinkElement = document
            .create_element("link")
            .map_err(dom::js_error)?
            .unchecked_into();
        link.set_rel("stylesheet");
        link.set_href(url);
        head.append_child(&link).map_err(dom::js_error)?;
        Ok(())
    }

    /// Append the script tag; the returned futures resolve on `load` and `error`.
    fn attach_script(
        &self,
    ) -> ShowreelResult<(LocalBoxFuture<'static, ()>, LocalBoxFuture<'static, ()>)> {
        let document = dom::document()?;
        let head = document.head().ok_or_else(|| ShowreelError::missing("head"))?;
        let script: HtmlScriptElement = document
            .create_element("script")
            .map_err(dom::js_error)?
            .unchecked_into();
        script.set_src(&self.script_url);
        script.set_async(true);
        let loaded = dom::once(&script, "load").boxed_local();
        let failed = dom::once(&script, "error").boxed_local();
        head.append_child(&script).map_err(dom::js_error)?;
        Ok((loaded, failed))
    }
}

impl AssetFetcher for ScriptFetcher {
    fn is_present(&self) -> bool {
        let Ok(window) = dom::window() else {
            return false;
        };
        let mut value: JsValue = window.into();
        for segment in self.global.split('.') {
            value = match Reflect::get(&value, &JsValue::from_str(segment)) {
                Ok(next) if !next.is_undefined() && !next.is_null() => next,
                _ => return false,
            };
        }
        value.is_function()
    }

    fn fetch(&self) -> LocalBoxFuture<'static, ShowreelResult<()>> {
        if let Some(url) = self.stylesheet_url.as_deref() {
            if let Err(e) = self.attach_stylesheet(url) {
                tracing::debug!("player stylesheet not attached: {}", e);
            }
        }
        let url = self.script_url.clone();
        match self.attach_script() {
            Ok((loaded, failed)) => async move {
                match future::select(loaded, failed).await {
                    Either::Left(_) => {
                        tracing::debug!(url = %url, "player library loaded");
                        Ok(())
                    }
                    Either::Right(_) => Err(ShowreelError::asset_load("script error", url)),
                }
            }
            .boxed_local(),
            Err(e) => future::ready(Err(e)).boxed_local(),
        }
    }
}

pub type PageLoader = Rc<PlayerAssetLoader<ScriptFetcher>>;

/// Fires the library load at most once, from whichever trigger comes first.
pub struct WarmUp {
    loader: PageLoader,
    latch: Latch,
}

impl WarmUp {
    pub fn new(loader: PageLoader) -> Rc<Self> {
        Rc::new(Self {
            loader,
            latch: Latch::new(),
        })
    }

    pub fn trigger(&self, reason: &'static str) {
        if self.loader.is_loaded() || !self.latch.fire() {
            return;
        }
        tracing::debug!(reason, "warming player library");
        let load = self.loader.load();
        spawn_local(async move {
            if let Err(e) = load.await {
                tracing::info!("player library warm-up failed: {}", e);
            }
        });
    }
}

/// Keeps warm-up listeners alive.
pub struct WarmUpBindings {
    _listeners: Vec<EventListener>,
    _observer: Option<IntersectionObserver>,
}

/// Hover or touch on a tile, a tile nearing the viewport, or browser idle
/// time all start loading the player library ahead of the first click.
pub fn bind_warm_up(
    warm: &Rc<WarmUp>,
    tile_links: &str,
    config: &PlayerConfig,
) -> WarmUpBindings {
    let mut listeners = Vec::new();
    if let Ok(document) = dom::document() {
        for kind in ["pointerover", "touchstart"] {
            let warm = warm.clone();
            let selector = tile_links.to_string();
            listeners.push(EventListener::new(&document, kind, move |event| {
                if dom::closest(event, &selector).is_some() {
                    warm.trigger("tile interaction");
                }
            }));
        }
    }

    schedule_idle(warm, config);

    WarmUpBindings {
        _listeners: listeners,
        _observer: observe_near_viewport(warm, tile_links, config.warm_margin),
    }
}

fn schedule_idle(warm: &Rc<WarmUp>, config: &PlayerConfig) {
    let Ok(window) = dom::window() else {
        return;
    };
    let idle = warm.clone();
    if dom::has_global("requestIdleCallback") {
        let callback = Closure::once_into_js(move || idle.trigger("idle"));
        if window
            .request_idle_callback(callback.unchecked_ref())
            .is_ok()
        {
            return;
        }
    }
    let idle = warm.clone();
    Timeout::new(config.idle_fallback.as_millis(), move || idle.trigger("idle timer")).forget();
}

fn observe_near_viewport(
    warm: &Rc<WarmUp>,
    tile_links: &str,
    margin: f64,
) -> Option<IntersectionObserver> {
    if !dom::has_global("IntersectionObserver") {
        return None;
    }
    let tiles: Vec<Element> = dom::query_all(tile_links);
    if tiles.is_empty() {
        return None;
    }

    let warm = warm.clone();
    let callback = Closure::<dyn FnMut(Array, IntersectionObserver)>::new(
        move |entries: Array, observer: IntersectionObserver| {
            let near = entries
                .iter()
                .map(|e| e.unchecked_into::<IntersectionObserverEntry>())
                .any(|e| e.is_intersecting());
            if near {
                observer.disconnect();
                warm.trigger("tile near viewport");
            }
        },
    );
    let init = IntersectionObserverInit::new();
    init.set_root_margin(&format!("{margin}px"));
    let observer =
        IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init).ok()?;
    for tile in &tiles {
        observer.observe(tile);
    }
    callback.forget();
    Some(observer)
}

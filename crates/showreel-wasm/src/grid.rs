//! Inline `<video>` elements, the first-paint milestone and the reveal gate.

use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture};
use gloo_events::EventListener;
use gloo_timers::callback::Timeout;
use js_sys::{Array, Promise};
use showreel_core::grid::{gate_reveal, VideoAttributes};
use showreel_core::race::first_of;
use showreel_core::{in_viewport, Rect, ShowreelConfig, VideoGrid, VideoSurface};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{
    Element, EventTarget, HtmlVideoElement, IntersectionObserver, IntersectionObserverEntry,
    IntersectionObserverInit,
};

use crate::dom;
use crate::progress::PageProgress;

/// `HAVE_CURRENT_DATA`: at least one frame can be painted.
const HAVE_CURRENT_DATA: u16 = 2;

pub struct HtmlVideo(HtmlVideoElement);

impl HtmlVideo {
    pub fn element(&self) -> &HtmlVideoElement {
        &self.0
    }

    fn has_frame(&self) -> bool {
        self.0.ready_state() >= HAVE_CURRENT_DATA
    }
}

impl VideoSurface for HtmlVideo {
    fn apply(&self, attrs: &VideoAttributes) {
        let video = &self.0;
        video.set_muted(attrs.muted);
        video.set_loop(attrs.looped);
        if attrs.plays_inline {
            let _ = video.set_attribute("playsinline", "");
            let _ = video.set_attribute("webkit-playsinline", "");
        }
        video.set_cross_origin(Some(attrs.cross_origin));
        video.set_preload(attrs.preload.as_str());
        let _ = if attrs.autoplay {
            video.set_attribute("autoplay", "")
        } else {
            video.remove_attribute("autoplay")
        };
    }

    fn request_play(&self) {
        match self.0.play() {
            Ok(promise) => settle_quietly(promise),
            Err(e) => tracing::debug!("play request failed: {}", dom::js_error(e)),
        }
    }

    fn pause(&self) {
        if let Err(e) = self.0.pause() {
            tracing::debug!("pause failed: {}", dom::js_error(e));
        }
    }

    fn bounds(&self) -> Rect {
        dom::bounds(&self.0)
    }
}

/// Autoplay policies reject play requests routinely; log and move on.
fn settle_quietly(promise: Promise) {
    spawn_local(async move {
        if let Err(e) = JsFuture::from(promise).await {
            tracing::debug!("play rejected: {}", dom::js_error(e));
        }
    });
}

pub type PageGrid = Rc<VideoGrid<HtmlVideo>>;

/// Keeps the observer and listeners of the grid alive.
pub struct GridBindings {
    pub grid: PageGrid,
    _observer: Option<IntersectionObserver>,
    _visibility: Option<EventListener>,
}

pub fn prefers_reduced_motion() -> bool {
    dom::window()
        .ok()
        .and_then(|w| w.match_media("(prefers-reduced-motion: reduce)").ok().flatten())
        .is_some_and(|query| query.matches())
}

/// Configure every grid video, report first paint, gate the reveal and
/// attach viewport-driven playback.
pub fn init(config: &Rc<ShowreelConfig>, progress: &Rc<PageProgress>) -> GridBindings {
    let markup = &config.markup;
    let as_video = |el: Element| el.dyn_into::<HtmlVideoElement>().ok().map(HtmlVideo);
    let hero = dom::query(&markup.hero_video).and_then(as_video);
    let tiles: Vec<HtmlVideo> = dom::query_all(&markup.tile_videos)
        .into_iter()
        .filter_map(as_video)
        .collect();

    progress.parsed();

    let reduced_motion = prefers_reduced_motion();
    let grid = Rc::new(VideoGrid::new(
        hero,
        tiles,
        config.grid.clone(),
        reduced_motion,
    ));
    grid.configure();

    report_first_frame(&grid, progress);
    spawn_local(reveal(config.clone(), progress.clone()));

    GridBindings {
        _observer: observe(&grid),
        _visibility: watch_visibility(&grid),
        grid,
    }
}

fn report_first_frame(grid: &PageGrid, progress: &Rc<PageProgress>) {
    match grid.first_renderable() {
        None => progress.first_frame(),
        Some(video) if video.has_frame() => progress.first_frame(),
        Some(video) => {
            let loaded = dom::once(video.element(), "loadeddata");
            let progress = progress.clone();
            spawn_local(async move {
                loaded.await;
                progress.first_frame();
            });
        }
    }
}

/// Wait for above-the-fold tiles, capped, then fade the content in.
async fn reveal(config: Rc<ShowreelConfig>, progress: Rc<PageProgress>) {
    let viewport = dom::viewport();
    let margin = config.grid.reveal_margin;
    let tiles: Vec<LocalBoxFuture<'static, ()>> = dom::query_all(&config.markup.projects)
        .into_iter()
        .filter(|project| in_viewport(&dom::bounds(project), &viewport, margin))
        .filter_map(|project| dom::query_in(&project, "video"))
        .filter_map(|el| el.dyn_into::<HtmlVideoElement>().ok())
        .map(tile_settled)
        .collect();
    tracing::debug!(
        tiles = tiles.len(),
        timeout = %config.grid.reveal_timeout,
        "gating reveal on visible tiles"
    );

    let outcome = gate_reveal(tiles, &progress, dom::sleep(config.grid.reveal_timeout)).await;
    tracing::debug!(?outcome, "content reveal");

    if let Some(content) = dom::query(&config.markup.content) {
        let _ = content.class_list().remove_1(&config.markup.fade_class);
    }
    schedule_finish(&config, &progress);
}

fn tile_settled(video: HtmlVideoElement) -> LocalBoxFuture<'static, ()> {
    if video.ready_state() >= HAVE_CURRENT_DATA {
        return future::ready(()).boxed_local();
    }
    let target: &EventTarget = video.as_ref();
    first_of(dom::once(target, "loadeddata"), dom::once(target, "playing")).boxed_local()
}

/// Window `load` finishes the bar; two timers cover pages whose load never fires.
fn schedule_finish(config: &ShowreelConfig, progress: &Rc<PageProgress>) {
    let Ok(window) = dom::window() else {
        return;
    };
    let loaded = window
        .document()
        .is_some_and(|d| d.ready_state() == "complete");
    if loaded {
        progress.finish();
    } else {
        let on_load = progress.clone();
        EventListener::once(&window, "load", move |_| on_load.finish()).forget();
    }

    let floor = progress.clone();
    Timeout::new(config.progress.floor_delay.as_millis(), move || {
        floor.settle_floor()
    })
    .forget();

    let last = progress.clone();
    Timeout::new(config.progress.finish_delay.as_millis(), move || {
        if last.value() < 1.0 {
            last.finish();
        }
    })
    .forget();
}

fn observe(grid: &PageGrid) -> Option<IntersectionObserver> {
    let options = grid.observer_options()?;
    if !dom::has_global("IntersectionObserver") {
        tracing::debug!("no intersection observer; playing the first video once");
        grid.play_fallback();
        return None;
    }

    let observed = grid.clone();
    let callback = Closure::<dyn FnMut(Array, IntersectionObserver)>::new(
        move |entries: Array, _observer: IntersectionObserver| {
            for entry in entries.iter() {
                let entry: IntersectionObserverEntry = entry.unchecked_into();
                let target = entry.target();
                let index = observed.videos().position(|v| {
                    let el: &Element = v.element().as_ref();
                    el == &target
                });
                if let Some(index) = index {
                    observed.on_intersection(index, entry.is_intersecting(), entry.intersection_ratio());
                }
            }
        },
    );

    let init = IntersectionObserverInit::new();
    init.set_root_margin(&options.root_margin);
    let thresholds: Array = options.thresholds.iter().map(|t| JsValue::from_f64(*t)).collect();
    init.set_threshold(&thresholds);

    let observer =
        match IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init) {
            Ok(observer) => observer,
            Err(e) => {
                tracing::warn!("intersection observer rejected: {}", dom::js_error(e));
                grid.play_fallback();
                return None;
            }
        };
    for video in grid.videos() {
        observer.observe(video.element());
    }
    callback.forget();
    Some(observer)
}

fn watch_visibility(grid: &PageGrid) -> Option<EventListener> {
    let document = dom::document().ok()?;
    let grid = grid.clone();
    let target = document.clone();
    Some(EventListener::new(&target, "visibilitychange", move |_| {
        grid.on_visibility_change(document.hidden(), &dom::viewport());
    }))
}

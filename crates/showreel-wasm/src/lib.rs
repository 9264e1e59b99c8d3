//! # showreel-wasm
//!
//! Browser bindings for the portfolio site's behaviour layer: smooth
//! scrolling, the loading bar, grid video playback and the overlay player.
//! Boots itself on module start and exposes a small global API.

mod dom;
mod grid;
mod loader;
mod logging;
mod overlay;
mod player;
mod progress;
mod scroll;

use std::cell::RefCell;
use std::rc::Rc;

use gloo_events::EventListener;
use showreel_core::{CloseCause, PlayerAssetLoader, ShowreelConfig, ShowreelResult, TileMarkup};
use wasm_bindgen::prelude::*;

use grid::GridBindings;
use loader::{ScriptFetcher, WarmUp, WarmUpBindings};
use overlay::OverlayBindings;
use progress::PageProgress;
use scroll::PageScroller;

/// Id of the optional `<script type="application/json">` carrying page config.
const CONFIG_ELEMENT: &str = "showreel-config";

/// Everything wired up for the current page.
struct App {
    overlay: Option<OverlayBindings>,
    _grid: GridBindings,
    _warm_up: WarmUpBindings,
    _progress: Rc<PageProgress>,
    _scroll: Option<PageScroller>,
}

thread_local! {
    static APP: RefCell<Option<App>> = const { RefCell::new(None) };
}

fn with_app<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&App) -> R,
{
    APP.with(|app| app.borrow().as_ref().map(f))
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    let (config, problem) = match page_config() {
        Ok(config) => (config, None),
        Err(e) => (ShowreelConfig::default(), Some(e)),
    };
    logging::init(&config.log.level);
    if let Some(e) = problem {
        tracing::warn!("ignoring page config: {}", e);
    }

    let config = Rc::new(config);
    let scroll = scroll::init();

    let Ok(document) = dom::document() else {
        return;
    };
    if document.ready_state() == "loading" {
        EventListener::once(&document, "DOMContentLoaded", move |_| boot(config, scroll))
            .forget();
    } else {
        boot(config, scroll);
    }
}

fn page_config() -> ShowreelResult<ShowreelConfig> {
    let source = dom::document()
        .ok()
        .and_then(|d| d.get_element_by_id(CONFIG_ELEMENT))
        .and_then(|el| el.text_content());
    match source {
        Some(json) if !json.trim().is_empty() => ShowreelConfig::from_json(&json),
        _ => Ok(ShowreelConfig::default()),
    }
}

fn boot(config: Rc<ShowreelConfig>, scroll: Option<PageScroller>) {
    let markup = &config.markup;
    let progress = Rc::new(progress::init(
        &markup.progress,
        &markup.done_class,
        config.progress.clone(),
    ));
    let grid = grid::init(&config, &progress);

    let loader = Rc::new(PlayerAssetLoader::new(ScriptFetcher::new(&config.player)));
    let warm = WarmUp::new(loader.clone());
    let warm_targets = format!("{}[{}]", markup.tile_links, markup.video_id_attribute);
    let warm_up = loader::bind_warm_up(&warm, &warm_targets, &config.player);

    let overlay = overlay::init(&config, scroll.clone(), Some(grid.grid.clone()), loader);

    tracing::info!(
        videos = grid.grid.len(),
        overlay = overlay.is_some(),
        "showreel ready"
    );
    APP.with(|app| {
        *app.borrow_mut() = Some(App {
            overlay,
            _grid: grid,
            _warm_up: warm_up,
            _progress: progress,
            _scroll: scroll,
        });
    });
}

/// Open the overlay for a video. Returns false when the page has no overlay,
/// the id is empty, or a session is mid-transition.
#[wasm_bindgen(js_name = openOverlay)]
pub fn open_overlay(
    url: String,
    video_id: String,
    title: Option<String>,
    poster: Option<String>,
) -> bool {
    let Some(request) = (TileMarkup {
        href: url,
        video_id: Some(video_id),
        title,
        poster_attribute: poster,
        video_poster: None,
    })
    .into_request() else {
        return false;
    };
    let context = with_app(|app| app.overlay.as_ref().map(|o| o.context.clone())).flatten();
    context.is_some_and(|ctx| ctx.open(request))
}

/// Close the overlay as if the user dismissed it.
#[wasm_bindgen(js_name = closeOverlay)]
pub fn close_overlay() -> bool {
    let context = with_app(|app| app.overlay.as_ref().map(|o| o.context.clone())).flatten();
    context.is_some_and(|ctx| ctx.close(CloseCause::User))
}

#[wasm_bindgen(js_name = isOverlayOpen)]
pub fn is_overlay_open() -> bool {
    with_app(|app| app.overlay.as_ref().is_some_and(|o| o.context.is_open())).unwrap_or(false)
}

#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

//! Browser side of the overlay player: the DOM host, the mount flow and the
//! event bindings that drive the controller.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_events::{EventListener, EventListenerOptions};
use js_sys::Reflect;
use serde::Serialize;
use showreel_core::race::first_of;
use showreel_core::{
    hold_veil, BodyLock, CloseCause, Delay, MountOutcome, MountPlan, MountTicket, OpenRequest,
    OverlayController, OverlayHost, ScrollRestoration, ShowreelConfig, ShowreelError,
    ShowreelResult, TileMarkup,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, HtmlAnchorElement, HtmlElement, KeyboardEvent, Window};

use crate::dom;
use crate::grid::PageGrid;
use crate::loader::PageLoader;
use crate::player::VimeoHandle;
use crate::scroll::{self, PageScroller};

const HISTORY_MARK: &str = "overlayOpen";
const VEIL_VISIBLE: &str = "is-visible";
/// Upper bound on the veil's fade-out before it is hidden outright.
const VEIL_FADE: Delay = Delay::from_millis(400);

#[derive(Serialize)]
struct HistoryState {
    #[serde(rename = "overlayOpen")]
    overlay_open: bool,
}

impl HistoryState {
    fn marked() -> ShowreelResult<JsValue> {
        serde_wasm_bindgen::to_value(&HistoryState { overlay_open: true })
            .map_err(|e| ShowreelError::Js(e.to_string()))
    }
}

/// The overlay's view of the page.
pub struct DomOverlayHost {
    window: Window,
    overlay: HtmlElement,
    veil: Option<HtmlElement>,
    scroll: Option<PageScroller>,
    grid: Option<PageGrid>,
    modal_class: String,
}

impl DomOverlayHost {
    fn history(&self) -> ShowreelResult<web_sys::History> {
        self.window.history().map_err(dom::js_error)
    }

    fn modal_targets(&self) -> Vec<Element> {
        let Some(document) = self.window.document() else {
            return Vec::new();
        };
        let mut targets: Vec<Element> = document.document_element().into_iter().collect();
        if let Some(body) = document.body() {
            targets.push(body.into());
        }
        targets
    }

    fn body(&self) -> Option<HtmlElement> {
        self.window.document()?.body()
    }
}

impl OverlayHost for DomOverlayHost {
    fn location(&self) -> String {
        self.window.location().href().unwrap_or_default()
    }

    fn push_history(&self, url: &str) -> ShowreelResult<()> {
        let state = HistoryState::marked()?;
        self.history()?
            .push_state_with_url(&state, "", Some(url))
            .map_err(dom::js_error)
    }

    fn replace_history(&self, url: &str, overlay_open: bool) -> ShowreelResult<()> {
        let state = if overlay_open {
            HistoryState::marked()?
        } else {
            JsValue::NULL
        };
        self.history()?
            .replace_state_with_url(&state, "", Some(url))
            .map_err(dom::js_error)
    }

    fn history_marks_overlay(&self) -> bool {
        self.history()
            .ok()
            .and_then(|h| h.state().ok())
            .filter(|state| state.is_object())
            .and_then(|state| Reflect::get(&state, &JsValue::from_str(HISTORY_MARK)).ok())
            .and_then(|mark| mark.as_bool())
            .unwrap_or(false)
    }

    fn stop_scroll(&self) {
        if let Some(scroll) = &self.scroll {
            scroll.stop();
        }
    }

    fn resume_scroll_at(&self, offset: f64) {
        if let Some(scroll) = self.scroll.clone() {
            scroll::on_next_frame(move || scroll.resume_at(offset));
        }
    }

    fn scroll_offset(&self) -> f64 {
        self.window.scroll_y().unwrap_or(0.0)
    }

    fn scrollbar_width(&self) -> f64 {
        let inner = self
            .window
            .inner_width()
            .ok()
            .and_then(|w| w.as_f64())
            .unwrap_or(0.0);
        let client = self
            .window
            .document()
            .and_then(|d| d.document_element())
            .map(|el| el.client_width() as f64)
            .unwrap_or(inner);
        (inner - client).max(0.0)
    }

    fn scroll_restoration(&self) -> ScrollRestoration {
        match self.history().ok().and_then(|h| h.scroll_restoration().ok()) {
            Some(web_sys::ScrollRestoration::Manual) => ScrollRestoration::Manual,
            _ => ScrollRestoration::Auto,
        }
    }

    fn set_scroll_restoration(&self, mode: ScrollRestoration) {
        let value = match mode {
            ScrollRestoration::Auto => web_sys::ScrollRestoration::Auto,
            ScrollRestoration::Manual => web_sys::ScrollRestoration::Manual,
        };
        if let Ok(history) = self.history() {
            if history.set_scroll_restoration(value).is_err() {
                tracing::debug!(mode = mode.as_str(), "scroll restoration not supported");
            }
        }
    }

    fn lock_body(&self, lock: &BodyLock) {
        if let Some(body) = self.body() {
            let style = body.style();
            for (property, value) in lock.styles() {
                let _ = style.set_property(property, &value);
            }
        }
        for target in self.modal_targets() {
            let _ = target.class_list().add_1(&self.modal_class);
        }
    }

    fn unlock_body(&self) {
        if let Some(body) = self.body() {
            let style = body.style();
            for property in BodyLock::PROPERTIES {
                let _ = style.remove_property(property);
            }
        }
        for target in self.modal_targets() {
            let _ = target.class_list().remove_1(&self.modal_class);
        }
    }

    fn scroll_window_to(&self, offset: f64) {
        self.window.scroll_to_with_x_and_y(0.0, offset);
    }

    fn set_visible(&self, visible: bool) {
        self.overlay.set_hidden(!visible);
        let _ = self
            .overlay
            .set_attribute("aria-hidden", if visible { "false" } else { "true" });
    }

    fn set_failed(&self, failed: bool) {
        let _ = if failed {
            self.overlay.set_attribute("data-state", "error")
        } else {
            self.overlay.remove_attribute("data-state")
        };
    }

    fn show_veil(&self, poster: &str) {
        if let Some(veil) = &self.veil {
            let _ = veil.set_attribute("src", poster);
            veil.set_hidden(false);
            let _ = veil.class_list().add_1(VEIL_VISIBLE);
        }
    }

    fn hide_veil(&self) {
        let Some(veil) = self.veil.clone() else {
            return;
        };
        let _ = veil.class_list().remove_1(VEIL_VISIBLE);
        let faded = dom::once(veil.as_ref(), "transitionend");
        spawn_local(async move {
            first_of(faded, dom::sleep(VEIL_FADE)).await;
            // A new session may have raised the veil again meanwhile.
            if !veil.class_list().contains(VEIL_VISIBLE) {
                veil.set_hidden(true);
            }
        });
    }

    fn resume_grid(&self) {
        if let Some(grid) = &self.grid {
            grid.resume_visible(&dom::viewport());
        }
    }
}

pub type PageOverlay = OverlayController<DomOverlayHost, VimeoHandle>;

/// Everything the mount flow and the event handlers share.
pub struct OverlayContext {
    pub controller: RefCell<PageOverlay>,
    loader: PageLoader,
    wrap: Element,
    config: Rc<ShowreelConfig>,
}

impl OverlayContext {
    pub fn is_open(&self) -> bool {
        self.controller.borrow().is_open()
    }

    /// Open (or switch to) `request`. Returns false when the request was rejected.
    pub fn open(self: &Rc<Self>, request: OpenRequest) -> bool {
        let plan = self.controller.borrow_mut().open(request);
        match plan {
            Ok(MountPlan::Build(ticket)) => {
                spawn_local(mount(self.clone(), ticket));
                true
            }
            Ok(MountPlan::Reused) | Ok(MountPlan::Awaiting(_)) => true,
            Err(e) => {
                tracing::debug!("open ignored: {}", e);
                false
            }
        }
    }

    pub fn close(&self, cause: CloseCause) -> bool {
        self.controller.borrow_mut().close(cause)
    }

    pub fn release(&self) {
        self.controller.borrow_mut().release();
    }
}

/// Load the library, build the player, then start playback behind the veil.
async fn mount(ctx: Rc<OverlayContext>, ticket: MountTicket) {
    let generation = ticket.generation;
    ctx.loader.retry();
    if let Err(e) = ctx.loader.load().await {
        tracing::debug!(attempts = ctx.loader.fetch_count(), "player library load failed");
        ctx.controller.borrow_mut().mount_failed(generation, &e);
        return;
    }

    let player = match VimeoHandle::create(&ctx.wrap, &ticket, &ctx.config.player.embed) {
        Ok(player) => player,
        Err(e) => {
            ctx.controller.borrow_mut().mount_failed(generation, &e);
            return;
        }
    };
    let ready = player.ready();
    let playing = player.event("playing");

    let outcome = ctx.controller.borrow_mut().complete_mount(generation, player);
    if outcome == MountOutcome::Discarded {
        return;
    }
    if let Err(e) = ready.await {
        tracing::warn!(video = %ticket.video_id, "player never became ready: {}", e);
        return;
    }

    let veil = ctx.controller.borrow_mut().player_ready(generation);
    if veil.is_none() {
        return;
    }
    let timeout = ctx.config.overlay.veil_timeout;
    tracing::debug!(video = %ticket.video_id, %timeout, "holding poster veil");
    hold_veil(&ctx.controller, generation, playing, dom::sleep(timeout)).await;
}

/// Read what a tile link contributes to an overlay session.
pub fn read_tile(link: &Element, config: &ShowreelConfig) -> TileMarkup {
    let markup = &config.markup;
    TileMarkup {
        href: link
            .dyn_ref::<HtmlAnchorElement>()
            .map(|a| a.href())
            .or_else(|| link.get_attribute("href"))
            .unwrap_or_default(),
        video_id: link.get_attribute(&markup.video_id_attribute),
        title: dom::query_in(link, &markup.tile_title).and_then(|t| t.text_content()),
        poster_attribute: link.get_attribute(&markup.poster_attribute),
        video_poster: dom::query_in(link, "video").and_then(|v| v.get_attribute("poster")),
    }
}

/// The overlay context plus the listeners that feed it.
pub struct OverlayBindings {
    pub context: Rc<OverlayContext>,
    _listeners: Vec<EventListener>,
}

/// Build the overlay for this page. `None` when the page has no overlay element.
pub fn init(
    config: &Rc<ShowreelConfig>,
    scroll: Option<PageScroller>,
    grid: Option<PageGrid>,
    loader: PageLoader,
) -> Option<OverlayBindings> {
    let markup = &config.markup;
    let window = dom::window().ok()?;
    let document = dom::document().ok()?;
    let Some(overlay) = dom::query(&markup.overlay).and_then(|el| el.dyn_into::<HtmlElement>().ok())
    else {
        tracing::warn!(selector = %markup.overlay, "no overlay element; overlay player disabled");
        return None;
    };
    let wrap = dom::query_in(&overlay, &markup.player_wrap).unwrap_or_else(|| overlay.clone().into());
    let veil = dom::query_in(&overlay, &markup.veil)
        .and_then(|el| el.dyn_into::<HtmlElement>().ok())
        .or_else(|| create_veil(&wrap));

    let host = DomOverlayHost {
        window: window.clone(),
        overlay: overlay.clone(),
        veil,
        scroll,
        grid,
        modal_class: config.overlay.modal_class.clone(),
    };
    let context = Rc::new(OverlayContext {
        controller: RefCell::new(OverlayController::new(host)),
        loader,
        wrap,
        config: config.clone(),
    });

    let mut listeners = Vec::new();

    let ctx = context.clone();
    listeners.push(EventListener::new_with_options(
        &document,
        "click",
        EventListenerOptions::enable_prevent_default(),
        move |event| {
            let Some(link) = dom::closest(event, &ctx.config.markup.tile_links) else {
                return;
            };
            let Some(request) = read_tile(&link, &ctx.config).into_request() else {
                return;
            };
            event.prevent_default();
            ctx.open(request);
        },
    ));

    if let Some(button) = dom::query_in(&overlay, &markup.close_button) {
        let ctx = context.clone();
        listeners.push(EventListener::new(&button, "click", move |_| {
            ctx.close(CloseCause::User);
        }));
    }

    let ctx = context.clone();
    let backdrop = overlay.clone();
    listeners.push(EventListener::new(&overlay, "click", move |event| {
        let on_backdrop = event
            .target()
            .and_then(|t| t.dyn_into::<Element>().ok())
            .is_some_and(|t| {
                let el: &Element = backdrop.as_ref();
                &t == el
            });
        if on_backdrop {
            ctx.close(CloseCause::User);
        }
    }));

    let ctx = context.clone();
    listeners.push(EventListener::new(&document, "keydown", move |event| {
        let escape = event
            .dyn_ref::<KeyboardEvent>()
            .is_some_and(|k| k.key() == "Escape");
        if escape && ctx.is_open() {
            ctx.close(CloseCause::User);
        }
    }));

    let ctx = context.clone();
    listeners.push(EventListener::new(&window, "popstate", move |_| {
        if ctx.is_open() {
            ctx.close(CloseCause::History);
        }
    }));

    let ctx = context.clone();
    let header_links = markup.header_links.clone();
    listeners.push(EventListener::new_with_options(
        &document,
        "click",
        EventListenerOptions::enable_prevent_default(),
        move |event| {
            if !ctx.is_open() {
                return;
            }
            let Some(link) = dom::closest(event, &header_links) else {
                return;
            };
            let Some(href) = link.dyn_ref::<HtmlAnchorElement>().map(|a| a.href()) else {
                return;
            };
            event.prevent_default();
            ctx.close(CloseCause::User);
            if let Ok(window) = dom::window() {
                if let Err(e) = window.location().set_href(&href) {
                    tracing::warn!("navigation failed: {}", dom::js_error(e));
                }
            }
        },
    ));

    let ctx = context.clone();
    listeners.push(EventListener::new(&window, "pagehide", move |_| {
        ctx.release();
    }));

    tracing::debug!("overlay bound");
    Some(OverlayBindings {
        context,
        _listeners: listeners,
    })
}

fn create_veil(wrap: &Element) -> Option<HtmlElement> {
    let document = dom::document().ok()?;
    let veil: HtmlElement = document.create_element("img").ok()?.dyn_into().ok()?;
    veil.set_class_name("player-veil");
    let _ = veil.set_attribute("alt", "");
    let _ = veil.set_attribute("aria-hidden", "true");
    veil.set_hidden(true);
    wrap.append_child(&veil).ok()?;
    Some(veil)
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn host_with_veil() -> (DomOverlayHost, HtmlElement) {
        let window = dom::window().unwrap();
        let document = window.document().unwrap();
        let overlay: HtmlElement = document.create_element("div").unwrap().unchecked_into();
        let veil = create_veil(&overlay).unwrap();
        let host = DomOverlayHost {
            window,
            overlay,
            veil: Some(veil.clone()),
            scroll: None,
            grid: None,
            modal_class: "modal-open".to_string(),
        };
        (host, veil)
    }

    fn past_fade() -> Delay {
        Delay::from_millis(VEIL_FADE.as_millis() + 100)
    }

    #[wasm_bindgen_test]
    async fn test_lifted_veil_is_hidden_after_fade() {
        let (host, veil) = host_with_veil();
        host.show_veil("/a.jpg");
        assert!(!veil.hidden());

        host.hide_veil();
        assert!(!veil.class_list().contains(VEIL_VISIBLE));
        dom::sleep(past_fade()).await;
        assert!(veil.hidden());
    }

    #[wasm_bindgen_test]
    async fn test_veil_raised_again_during_fade_stays_visible() {
        let (host, veil) = host_with_veil();
        host.show_veil("/a.jpg");
        host.hide_veil();
        host.show_veil("/b.jpg");

        dom::sleep(past_fade()).await;
        assert!(!veil.hidden());
        assert_eq!(veil.get_attribute("src").as_deref(), Some("/b.jpg"));
    }
}

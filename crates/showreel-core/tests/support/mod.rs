//! Recording fakes for the overlay's browser and player seams.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use showreel_core::grid::{VideoAttributes, VideoGrid, VideoSurface};
use showreel_core::{
    BodyLock, GridConfig, OverlayHost, Rect, RemotePlayer, ScrollRestoration, ShowreelError,
    ShowreelResult, VideoId, Viewport,
};

pub type Log = Rc<RefCell<Vec<String>>>;

pub fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

pub struct GridVideo {
    pub bounds: Rect,
    pub plays: Cell<u32>,
}

impl VideoSurface for GridVideo {
    fn apply(&self, _attrs: &VideoAttributes) {}
    fn request_play(&self) {
        self.plays.set(self.plays.get() + 1);
    }
    fn pause(&self) {}
    fn bounds(&self) -> Rect {
        self.bounds
    }
}

pub struct FakeHost {
    pub log: Log,
    /// (url, pushed by the overlay)
    pub history: RefCell<Vec<(String, bool)>>,
    pub index: Cell<usize>,
    pub pushes: Cell<u32>,
    pub replaces: Cell<u32>,
    pub offset: Cell<f64>,
    pub restoration: Cell<ScrollRestoration>,
    pub body_lock: RefCell<Option<BodyLock>>,
    pub visible: Cell<bool>,
    pub failed: Cell<bool>,
    pub veil: RefCell<Option<String>>,
    pub grid: VideoGrid<GridVideo>,
    pub viewport: Viewport,
}

impl FakeHost {
    pub fn new(log: Log) -> Self {
        let tile = |top: f64| GridVideo {
            bounds: Rect::new(0.0, top, 400.0, 300.0),
            plays: Cell::new(0),
        };
        Self {
            log,
            history: RefCell::new(vec![("/".to_string(), false)]),
            index: Cell::new(0),
            pushes: Cell::new(0),
            replaces: Cell::new(0),
            offset: Cell::new(1200.0),
            restoration: Cell::new(ScrollRestoration::Auto),
            body_lock: RefCell::new(None),
            visible: Cell::new(false),
            failed: Cell::new(false),
            veil: RefCell::new(None),
            grid: VideoGrid::new(
                None,
                vec![tile(100.0), tile(600.0), tile(2000.0)],
                GridConfig::default(),
                false,
            ),
            viewport: Viewport::new(1280.0, 800.0),
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.borrow().len()
    }

    pub fn current_url(&self) -> String {
        self.history.borrow()[self.index.get()].0.clone()
    }

    /// Browser back button: move one entry back without any push or replace.
    pub fn back(&self) {
        self.index.set(self.index.get().saturating_sub(1));
    }

    pub fn grid_plays(&self) -> Vec<u32> {
        self.grid.videos().map(|v| v.plays.get()).collect()
    }

    fn record(&self, entry: impl Into<String>) {
        self.log.borrow_mut().push(entry.into());
    }
}

impl OverlayHost for FakeHost {
    fn location(&self) -> String {
        self.current_url()
    }

    fn push_history(&self, url: &str) -> ShowreelResult<()> {
        let mut history = self.history.borrow_mut();
        let next = self.index.get() + 1;
        history.truncate(next);
        history.push((url.to_string(), true));
        self.index.set(next);
        self.pushes.set(self.pushes.get() + 1);
        drop(history);
        self.record(format!("push {url}"));
        Ok(())
    }

    fn replace_history(&self, url: &str, overlay_open: bool) -> ShowreelResult<()> {
        self.history.borrow_mut()[self.index.get()] = (url.to_string(), overlay_open);
        self.replaces.set(self.replaces.get() + 1);
        self.record(format!("replace {url}"));
        Ok(())
    }

    fn history_marks_overlay(&self) -> bool {
        self.history.borrow()[self.index.get()].1
    }

    fn stop_scroll(&self) {
        self.record("scroll stop");
    }

    fn resume_scroll_at(&self, offset: f64) {
        self.record(format!("scroll resume {offset}"));
    }

    fn scroll_offset(&self) -> f64 {
        self.record("scroll snapshot");
        self.offset.get()
    }

    fn scrollbar_width(&self) -> f64 {
        15.0
    }

    fn scroll_restoration(&self) -> ScrollRestoration {
        self.restoration.get()
    }

    fn set_scroll_restoration(&self, mode: ScrollRestoration) {
        self.restoration.set(mode);
    }

    fn lock_body(&self, lock: &BodyLock) {
        *self.body_lock.borrow_mut() = Some(*lock);
        self.record("body lock");
    }

    fn unlock_body(&self) {
        self.body_lock.borrow_mut().take();
        self.record("body unlock");
    }

    fn scroll_window_to(&self, offset: f64) {
        self.offset.set(offset);
        self.record(format!("window scroll {offset}"));
    }

    fn set_visible(&self, visible: bool) {
        self.visible.set(visible);
        self.record(if visible { "overlay shown" } else { "overlay hidden" });
    }

    fn set_failed(&self, failed: bool) {
        self.failed.set(failed);
    }

    fn show_veil(&self, poster: &str) {
        *self.veil.borrow_mut() = Some(poster.to_string());
    }

    fn hide_veil(&self) {
        self.veil.borrow_mut().take();
    }

    fn resume_grid(&self) {
        self.grid.resume_visible(&self.viewport);
    }
}

pub struct FakePlayer {
    pub id: VideoId,
    pub log: Log,
    pub attached: Cell<bool>,
    pub position: Cell<f64>,
    pub muted: Cell<bool>,
    pub volume: Cell<f64>,
    pub broken: bool,
}

impl FakePlayer {
    pub fn new(id: &str, log: Log) -> Self {
        log.borrow_mut().push(format!("player {id} construct"));
        Self {
            id: VideoId::new(id),
            log,
            attached: Cell::new(true),
            position: Cell::new(0.0),
            muted: Cell::new(true),
            volume: Cell::new(0.0),
            broken: false,
        }
    }

    fn record(&self, step: &str) {
        self.log
            .borrow_mut()
            .push(format!("player {} {step}", self.id));
    }

    fn check(&self) -> ShowreelResult<()> {
        if self.broken {
            Err(ShowreelError::Teardown("detached".to_string()))
        } else {
            Ok(())
        }
    }
}

impl RemotePlayer for FakePlayer {
    fn video_id(&self) -> &VideoId {
        &self.id
    }

    fn set_muted(&self, muted: bool) -> ShowreelResult<()> {
        self.muted.set(muted);
        self.record(if muted { "mute" } else { "unmute" });
        self.check()
    }

    fn set_volume(&self, volume: f64) -> ShowreelResult<()> {
        self.volume.set(volume);
        self.check()
    }

    fn rewind(&self) -> ShowreelResult<()> {
        self.position.set(0.0);
        self.record("rewind");
        Ok(())
    }

    fn play(&self) {
        self.record("play");
    }

    fn pause(&self) -> ShowreelResult<()> {
        self.record("pause");
        self.check()
    }

    fn destroy(&self) -> ShowreelResult<()> {
        self.attached.set(false);
        self.record("destroy");
        self.check()
    }

    fn is_attached(&self) -> bool {
        self.attached.get()
    }

    fn attach(&self) -> ShowreelResult<()> {
        self.attached.set(true);
        self.record("attach");
        Ok(())
    }
}

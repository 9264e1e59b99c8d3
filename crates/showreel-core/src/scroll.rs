use std::cell::Cell;

use serde::{Deserialize, Serialize};

/// A momentum/smooth-scroll engine driven by an animation-frame loop.
pub trait ScrollEngine {
    /// Advance the engine; called once per animation frame with the frame time.
    fn tick(&self, time: f64);
    fn start(&self);
    fn stop(&self);
    fn scroll_to(&self, offset: f64, immediate: bool);
}

/// Owns the page's scroll engine and tracks whether momentum scrolling is live.
pub struct ScrollController<E> {
    engine: E,
    running: Cell<bool>,
}

impl<E: ScrollEngine> ScrollController<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            running: Cell::new(true),
        }
    }

    pub fn tick(&self, time: f64) {
        self.engine.tick(time);
    }

    /// Suspend momentum scrolling.
    pub fn stop(&self) {
        if self.running.replace(false) {
            tracing::debug!("scroll engine stopped");
        }
        self.engine.stop();
    }

    /// Resume momentum scrolling.
    pub fn start(&self) {
        if !self.running.replace(true) {
            tracing::debug!("scroll engine started");
        }
        self.engine.start();
    }

    pub fn scroll_to(&self, offset: f64, immediate: bool) {
        self.engine.scroll_to(offset, immediate);
    }

    /// Jump to `offset` without easing, then resume.
    pub fn resume_at(&self, offset: f64) {
        self.scroll_to(offset, true);
        self.start();
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

/// Mirror of `history.scrollRestoration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollRestoration {
    #[default]
    Auto,
    Manual,
}

impl ScrollRestoration {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrollRestoration::Auto => "auto",
            ScrollRestoration::Manual => "manual",
        }
    }
}

/// Scroll state captured when the page is locked behind the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollSnapshot {
    pub offset: f64,
    pub restoration: ScrollRestoration,
}

/// Fixed-position body lock that keeps the page visually in place.
///
/// The body is pinned at `-offset` and padded by the scrollbar width that
/// disappears when the document stops scrolling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyLock {
    pub offset: f64,
    pub scrollbar_width: f64,
}

impl BodyLock {
    /// Every inline style property the lock touches.
    pub const PROPERTIES: [&'static str; 6] =
        ["position", "top", "left", "right", "width", "padding-right"];

    pub fn new(offset: f64, scrollbar_width: f64) -> Self {
        Self {
            offset,
            scrollbar_width,
        }
    }

    /// Inline styles to apply to `<body>` while locked.
    pub fn styles(&self) -> Vec<(&'static str, String)> {
        let padding = if self.scrollbar_width > 0.0 {
            format!("{}px", self.scrollbar_width)
        } else {
            String::new()
        };
        vec![
            ("position", "fixed".to_string()),
            ("top", format!("-{}px", self.offset)),
            ("left", "0".to_string()),
            ("right", "0".to_string()),
            ("width", "100%".to_string()),
            ("padding-right", padding),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Engine {
        calls: RefCell<Vec<String>>,
    }

    impl ScrollEngine for Engine {
        fn tick(&self, time: f64) {
            self.calls.borrow_mut().push(format!("tick {time}"));
        }
        fn start(&self) {
            self.calls.borrow_mut().push("start".into());
        }
        fn stop(&self) {
            self.calls.borrow_mut().push("stop".into());
        }
        fn scroll_to(&self, offset: f64, immediate: bool) {
            self.calls
                .borrow_mut()
                .push(format!("scroll_to {offset} {immediate}"));
        }
    }

    #[test]
    fn test_stop_and_start_track_running() {
        let scroll = ScrollController::new(Engine::default());
        assert!(scroll.is_running());
        scroll.stop();
        assert!(!scroll.is_running());
        scroll.start();
        assert!(scroll.is_running());
    }

    #[test]
    fn test_resume_at_syncs_before_start() {
        let scroll = ScrollController::new(Engine::default());
        scroll.stop();
        scroll.resume_at(840.0);
        assert_eq!(
            *scroll.engine().calls.borrow(),
            vec!["stop", "scroll_to 840 true", "start"]
        );
    }

    #[test]
    fn test_tick_forwards_frame_time() {
        let scroll = ScrollController::new(Engine::default());
        scroll.tick(16.5);
        assert_eq!(*scroll.engine().calls.borrow(), vec!["tick 16.5"]);
    }

    #[test]
    fn test_body_lock_styles_with_scrollbar() {
        let styles = BodyLock::new(1200.0, 15.0).styles();
        assert_eq!(styles[0], ("position", "fixed".to_string()));
        assert_eq!(styles[1], ("top", "-1200px".to_string()));
        assert_eq!(styles[5], ("padding-right", "15px".to_string()));
    }

    #[test]
    fn test_body_lock_without_scrollbar_clears_padding() {
        let styles = BodyLock::new(0.0, 0.0).styles();
        assert_eq!(styles[5], ("padding-right", String::new()));
        let names: Vec<_> = styles.iter().map(|(k, _)| *k).collect();
        assert_eq!(names, BodyLock::PROPERTIES);
    }

    #[test]
    fn test_scroll_restoration_serde() {
        assert_eq!(
            serde_json::to_string(&ScrollRestoration::Manual).unwrap(),
            "\"manual\""
        );
        assert_eq!(ScrollRestoration::default().as_str(), "auto");
    }
}

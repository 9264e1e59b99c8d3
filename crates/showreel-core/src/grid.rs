//! Hero and tile video playback.
//!
//! Every video is muted, looping and inline. The hero preloads eagerly and
//! carries the autoplay attribute; tiles preload metadata only and are played
//! and paused by viewport intersection instead.

use std::future::Future;

use futures::future::join_all;

use crate::config::GridConfig;
use crate::geometry::{in_viewport, Rect, Viewport};
use crate::progress::{ProgressSink, ProgressTracker};
use crate::race::{race_with_timeout, RaceOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoRole {
    Hero,
    Tile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preload {
    Auto,
    Metadata,
}

impl Preload {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preload::Auto => "auto",
            Preload::Metadata => "metadata",
        }
    }
}

/// Attributes applied once to each video at page-ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoAttributes {
    pub muted: bool,
    pub looped: bool,
    pub plays_inline: bool,
    pub cross_origin: &'static str,
    pub preload: Preload,
    pub autoplay: bool,
}

impl VideoAttributes {
    pub fn for_role(role: VideoRole, autoplay_enabled: bool) -> Self {
        let (preload, autoplay) = match role {
            VideoRole::Hero => (Preload::Auto, autoplay_enabled),
            VideoRole::Tile => (Preload::Metadata, false),
        };
        Self {
            muted: true,
            looped: true,
            plays_inline: true,
            cross_origin: "anonymous",
            preload,
            autoplay,
        }
    }
}

/// An inline `<video>` as the grid sees it.
pub trait VideoSurface {
    fn apply(&self, attrs: &VideoAttributes);
    /// Ask the element to play; a rejected play request is swallowed.
    fn request_play(&self);
    fn pause(&self);
    fn bounds(&self) -> Rect;
}

/// How the intersection observer driving playback should be configured.
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverOptions {
    pub root_margin: String,
    pub thresholds: Vec<f64>,
}

/// Whether the reveal waited for every tile or hit the safety cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    AllSettled,
    TimedOut,
}

pub struct VideoGrid<V> {
    videos: Vec<(VideoRole, V)>,
    autoplay: bool,
    config: GridConfig,
}

impl<V: VideoSurface> VideoGrid<V> {
    /// `reduced_motion` disables every autoplay path; videos are still configured.
    pub fn new(hero: Option<V>, tiles: Vec<V>, config: GridConfig, reduced_motion: bool) -> Self {
        let videos = hero
            .map(|h| (VideoRole::Hero, h))
            .into_iter()
            .chain(tiles.into_iter().map(|t| (VideoRole::Tile, t)))
            .collect();
        Self {
            videos,
            autoplay: !reduced_motion,
            config,
        }
    }

    pub fn configure(&self) {
        for (role, video) in &self.videos {
            video.apply(&VideoAttributes::for_role(*role, self.autoplay));
        }
        tracing::debug!(
            videos = self.videos.len(),
            autoplay = self.autoplay,
            "configured grid videos"
        );
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    pub fn video(&self, index: usize) -> Option<&V> {
        self.videos.get(index).map(|(_, v)| v)
    }

    pub fn videos(&self) -> impl Iterator<Item = &V> {
        self.videos.iter().map(|(_, v)| v)
    }

    /// The hero, or the first video when there is no hero.
    pub fn first_renderable(&self) -> Option<&V> {
        self.videos.first().map(|(_, v)| v)
    }

    /// `None` when autoplay is disabled and no observer should be attached.
    pub fn observer_options(&self) -> Option<ObserverOptions> {
        self.autoplay.then(|| ObserverOptions {
            root_margin: self.config.root_margin.to_css(),
            thresholds: vec![0.0, self.config.play_threshold],
        })
    }

    /// Apply one intersection observation for the video at `index`.
    pub fn on_intersection(&self, index: usize, intersecting: bool, ratio: f64) {
        if !self.autoplay {
            return;
        }
        let Some(video) = self.video(index) else {
            return;
        };
        if intersecting && ratio >= self.config.play_threshold {
            video.request_play();
        } else {
            video.pause();
        }
    }

    /// Degraded path without intersection observation: play the first video once.
    pub fn play_fallback(&self) {
        if !self.autoplay {
            return;
        }
        if let Some(video) = self.first_renderable() {
            video.request_play();
        }
    }

    pub fn on_visibility_change(&self, hidden: bool, viewport: &Viewport) {
        if hidden {
            self.videos().for_each(|v| v.pause());
            return;
        }
        self.resume_visible(viewport);
    }

    /// Play every video whose box overlaps the viewport; leave the rest alone.
    pub fn resume_visible(&self, viewport: &Viewport) {
        if !self.autoplay {
            return;
        }
        let mut resumed = 0usize;
        for video in self.videos() {
            if in_viewport(&video.bounds(), viewport, 0.0) {
                video.request_play();
                resumed += 1;
            }
        }
        tracing::debug!(resumed, "resumed visible videos");
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }
}

/// Gate the content reveal on every above-the-fold tile settling, or on `cap`.
///
/// Each tile future resolves when its video has a frame or starts playing;
/// each one that does advances `progress` by a tile step.
pub async fn gate_reveal<S, I, F, T>(
    tiles: I,
    progress: &ProgressTracker<S>,
    cap: T,
) -> RevealOutcome
where
    S: ProgressSink,
    I: IntoIterator<Item = F>,
    F: Future<Output = ()>,
    T: Future<Output = ()>,
{
    let settled = join_all(tiles.into_iter().map(|tile| async move {
        tile.await;
        progress.tile_ready();
    }));
    match race_with_timeout(settled, cap).await {
        RaceOutcome::Completed(_) => RevealOutcome::AllSettled,
        RaceOutcome::TimedOut => {
            tracing::debug!("reveal cap reached before every tile settled");
            RevealOutcome::TimedOut
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProgressConfig;
    use crate::time::Delay;
    use futures::executor::block_on;
    use futures::future::{self, BoxFuture, FutureExt};
    use std::cell::{Cell, RefCell};

    struct FakeVideo {
        bounds: Rect,
        attrs: Cell<Option<VideoAttributes>>,
        plays: Cell<u32>,
        pauses: Cell<u32>,
    }

    impl FakeVideo {
        fn at(top: f64) -> Self {
            Self {
                bounds: Rect::new(0.0, top, 400.0, 300.0),
                attrs: Cell::new(None),
                plays: Cell::new(0),
                pauses: Cell::new(0),
            }
        }
    }

    impl VideoSurface for FakeVideo {
        fn apply(&self, attrs: &VideoAttributes) {
            self.attrs.set(Some(*attrs));
        }
        fn request_play(&self) {
            self.plays.set(self.plays.get() + 1);
        }
        fn pause(&self) {
            self.pauses.set(self.pauses.get() + 1);
        }
        fn bounds(&self) -> Rect {
            self.bounds
        }
    }

    struct NullSink(RefCell<Vec<f64>>);

    impl ProgressSink for NullSink {
        fn render(&self, value: f64) {
            self.0.borrow_mut().push(value);
        }
        fn complete(&self, _removal_delay: Delay) {}
    }

    fn viewport() -> Viewport {
        Viewport::new(1280.0, 800.0)
    }

    fn grid(reduced_motion: bool) -> VideoGrid<FakeVideo> {
        VideoGrid::new(
            Some(FakeVideo::at(0.0)),
            vec![FakeVideo::at(500.0), FakeVideo::at(1400.0)],
            GridConfig::default(),
            reduced_motion,
        )
    }

    #[test]
    fn test_configure_roles() {
        let g = grid(false);
        g.configure();
        let hero = g.video(0).unwrap().attrs.get().unwrap();
        assert_eq!(hero.preload, Preload::Auto);
        assert!(hero.autoplay && hero.muted && hero.looped && hero.plays_inline);
        assert_eq!(hero.cross_origin, "anonymous");
        let tile = g.video(1).unwrap().attrs.get().unwrap();
        assert_eq!(tile.preload, Preload::Metadata);
        assert!(!tile.autoplay);
    }

    #[test]
    fn test_intersection_threshold() {
        let g = grid(false);
        g.on_intersection(1, true, 0.3);
        g.on_intersection(1, true, 0.1);
        g.on_intersection(1, false, 0.0);
        let tile = g.video(1).unwrap();
        assert_eq!(tile.plays.get(), 1);
        assert_eq!(tile.pauses.get(), 2);
    }

    #[test]
    fn test_intersection_out_of_range_index_ignored() {
        let g = grid(false);
        g.on_intersection(9, true, 1.0);
    }

    #[test]
    fn test_observer_options() {
        let opts = grid(false).observer_options().unwrap();
        assert_eq!(opts.root_margin, "200px 0px 300px 0px");
        assert_eq!(opts.thresholds, vec![0.0, 0.25]);
    }

    #[test]
    fn test_hidden_pauses_all_then_visible_resumes_in_view_only() {
        let g = grid(false);
        g.on_visibility_change(true, &viewport());
        assert!(g.videos().all(|v| v.pauses.get() == 1 && v.plays.get() == 0));
        g.on_visibility_change(false, &viewport());
        let plays: Vec<u32> = g.videos().map(|v| v.plays.get()).collect();
        assert_eq!(plays, vec![1, 1, 0]);
    }

    #[test]
    fn test_fallback_plays_first_only() {
        let g = VideoGrid::new(
            None,
            vec![FakeVideo::at(0.0), FakeVideo::at(10.0)],
            GridConfig::default(),
            false,
        );
        g.play_fallback();
        assert_eq!(g.video(0).unwrap().plays.get(), 1);
        assert_eq!(g.video(1).unwrap().plays.get(), 0);
    }

    #[test]
    fn test_reduced_motion_never_autoplays() {
        let g = grid(true);
        g.configure();
        assert!(!g.video(0).unwrap().attrs.get().unwrap().autoplay);
        assert!(g.observer_options().is_none());
        g.on_intersection(0, true, 1.0);
        g.play_fallback();
        g.resume_visible(&viewport());
        assert!(g.videos().all(|v| v.plays.get() == 0));
    }

    #[test]
    fn test_gate_reveal_all_settled_advances_per_tile() {
        let progress = ProgressTracker::new(Some(NullSink(RefCell::new(vec![]))), ProgressConfig::default());
        progress.first_frame();
        let tiles = vec![future::ready(()), future::ready(())];
        let out = block_on(gate_reveal(tiles, &progress, future::pending()));
        assert_eq!(out, RevealOutcome::AllSettled);
        assert!((progress.value() - 0.79).abs() < 1e-9);
    }

    #[test]
    fn test_gate_reveal_slow_tile_hits_cap() {
        let progress = ProgressTracker::new(Some(NullSink(RefCell::new(vec![]))), ProgressConfig::default());
        let tiles: Vec<BoxFuture<'static, ()>> =
            vec![future::ready(()).boxed(), future::pending().boxed()];
        let out = block_on(gate_reveal(tiles, &progress, future::ready(())));
        assert_eq!(out, RevealOutcome::TimedOut);
    }

    #[test]
    fn test_gate_reveal_with_no_tiles_settles() {
        let progress = ProgressTracker::new(Some(NullSink(RefCell::new(vec![]))), ProgressConfig::default());
        let tiles: Vec<future::Ready<()>> = Vec::new();
        assert_eq!(
            block_on(gate_reveal(tiles, &progress, future::pending())),
            RevealOutcome::AllSettled
        );
    }
}

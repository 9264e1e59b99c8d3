//! The "watch in overlay" player.
//!
//! One [`OverlayController`] owns the open session, the scroll-lock snapshot
//! and the cached remote player. Browser effects go through [`OverlayHost`];
//! the player library goes through [`RemotePlayer`].
//!
//! ```text
//! Closed --open--> Opening --mounted/reused--> Open --close--> Closing --> Closed
//!                     \--------------------close---------------^
//! ```
//!
//! Player construction is asynchronous. [`OverlayController::open`] hands out
//! a [`MountTicket`]; the caller loads the library, builds the player and
//! returns it through [`OverlayController::complete_mount`]. The player is
//! cached right there, before its ready signal, so a close that lands in
//! between still finds it.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::race::{race_with_timeout, RaceOutcome};
use crate::scroll::{BodyLock, ScrollRestoration, ScrollSnapshot};
use crate::{ShowreelError, ShowreelResult};

/// Opaque identifier of a hosted video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoId(pub String);

impl VideoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything a tile click contributes to an overlay session.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenRequest {
    /// The tile's own href; becomes the address bar URL while open.
    pub url: String,
    pub video_id: VideoId,
    pub title: String,
    pub poster: Option<String>,
}

/// What a tile link carries in its markup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileMarkup {
    pub href: String,
    pub video_id: Option<String>,
    pub title: Option<String>,
    pub poster_attribute: Option<String>,
    /// `poster` of a `<video>` nested in the tile.
    pub video_poster: Option<String>,
}

impl TileMarkup {
    /// `None` when the tile has no video identifier and should navigate normally.
    pub fn into_request(self) -> Option<OpenRequest> {
        let video_id = non_empty(self.video_id)?;
        Some(OpenRequest {
            url: self.href,
            video_id: VideoId::new(video_id),
            title: non_empty(self.title.map(|t| t.trim().to_string()))
                .unwrap_or_else(|| "Video".to_string()),
            poster: non_empty(self.poster_attribute).or_else(|| non_empty(self.video_poster)),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCause {
    /// Close button, backdrop, Escape, navigation link or the global API.
    User,
    /// Browser back/forward; history is already where it needs to be.
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Closed,
    Opening,
    Open,
    Closing,
}

/// One "overlay is open" period.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySession {
    pub source_url: String,
    pub opened_from_url: String,
    pub scroll: ScrollSnapshot,
    pub video_id: VideoId,
    pub title: String,
    pub poster: Option<String>,
}

/// A request to construct a player for `video_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct MountTicket {
    pub generation: u64,
    pub video_id: VideoId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MountPlan {
    /// The cached player already plays this video and was restarted.
    Reused,
    /// A construction for this video is already in flight.
    Awaiting(u64),
    /// The caller must build a player and pass it to `complete_mount`.
    Build(MountTicket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    /// Cached and mounted into the open overlay.
    Mounted,
    /// Cached, but the session closed first; the player was paused.
    Parked,
    /// Outdated construction; the player was released.
    Discarded,
}

/// A remote-hosted video player instance and its container.
pub trait RemotePlayer {
    fn video_id(&self) -> &VideoId;
    fn set_muted(&self, muted: bool) -> ShowreelResult<()>;
    fn set_volume(&self, volume: f64) -> ShowreelResult<()>;
    /// Seek back to position zero.
    fn rewind(&self) -> ShowreelResult<()>;
    /// Attempt playback; a rejection is swallowed by the implementation.
    fn play(&self);
    fn pause(&self) -> ShowreelResult<()>;
    /// Release the player's resources and discard its container.
    fn destroy(&self) -> ShowreelResult<()>;
    fn is_attached(&self) -> bool;
    fn attach(&self) -> ShowreelResult<()>;
}

/// Browser effects the overlay needs.
pub trait OverlayHost {
    fn location(&self) -> String;
    /// Push `url` with a state object marking the overlay open.
    fn push_history(&self, url: &str) -> ShowreelResult<()>;
    /// Rewrite the current entry to `url`, keeping the overlay mark when
    /// `overlay_open` is set and dropping it otherwise.
    fn replace_history(&self, url: &str, overlay_open: bool) -> ShowreelResult<()>;
    /// True when the current history entry was pushed by `push_history`.
    fn history_marks_overlay(&self) -> bool;

    fn stop_scroll(&self);
    fn resume_scroll_at(&self, offset: f64);
    fn scroll_offset(&self) -> f64;
    fn scrollbar_width(&self) -> f64;
    fn scroll_restoration(&self) -> ScrollRestoration;
    fn set_scroll_restoration(&self, mode: ScrollRestoration);
    fn lock_body(&self, lock: &BodyLock);
    fn unlock_body(&self);
    fn scroll_window_to(&self, offset: f64);

    fn set_visible(&self, visible: bool);
    /// Flag the degraded "open without a working player" state.
    fn set_failed(&self, failed: bool);
    fn show_veil(&self, poster: &str);
    fn hide_veil(&self);
    /// Resume autoplay on grid videos currently in the viewport.
    fn resume_grid(&self);
}

struct CachedPlayer<P> {
    generation: u64,
    player: P,
}

pub struct OverlayController<H, P> {
    host: H,
    state: OverlayState,
    session: Option<OverlaySession>,
    cache: Option<CachedPlayer<P>>,
    pending: Option<MountTicket>,
    generation: u64,
    veil: Option<u64>,
}

impl<H: OverlayHost, P: RemotePlayer> OverlayController<H, P> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            state: OverlayState::Closed,
            session: None,
            cache: None,
            pending: None,
            generation: 0,
            veil: None,
        }
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != OverlayState::Closed
    }

    pub fn session(&self) -> Option<&OverlaySession> {
        self.session.as_ref()
    }

    pub fn cached_player(&self) -> Option<&P> {
        self.cache.as_ref().map(|c| &c.player)
    }

    pub fn cached_video_id(&self) -> Option<&VideoId> {
        self.cached_player().map(|p| p.video_id())
    }

    pub fn pending(&self) -> Option<&MountTicket> {
        self.pending.as_ref()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Open the overlay for a tile. The triggering navigation must already be
    /// prevented by the caller.
    ///
    /// While a session is `Open` the request switches that session to the new
    /// video; while one is `Opening` or `Closing` it is rejected.
    pub fn open(&mut self, request: OpenRequest) -> ShowreelResult<MountPlan> {
        match self.state {
            OverlayState::Closed => {}
            OverlayState::Open => return Ok(self.switch(request)),
            OverlayState::Opening | OverlayState::Closing => {
                let active = self
                    .session
                    .as_ref()
                    .map(|s| s.video_id.to_string())
                    .unwrap_or_default();
                return Err(ShowreelError::SessionActive(active));
            }
        }

        let opened_from_url = self.host.location();
        if let Err(e) = self.host.push_history(&request.url) {
            tracing::warn!("could not push overlay history entry: {}", e);
        }
        self.transition(OverlayState::Opening);
        self.host.stop_scroll();
        let scroll = self.lock_scroll();
        self.host.set_failed(false);
        self.host.set_visible(true);

        let plan = self.mount(&request.video_id, &request.title);
        self.session = Some(OverlaySession {
            source_url: request.url,
            opened_from_url,
            scroll,
            video_id: request.video_id,
            title: request.title,
            poster: request.poster,
        });
        Ok(plan)
    }

    fn switch(&mut self, request: OpenRequest) -> MountPlan {
        if let Err(e) = self.host.replace_history(&request.url, true) {
            tracing::warn!("could not replace overlay history entry: {}", e);
        }
        self.lift_any_veil();
        self.host.set_failed(false);
        self.transition(OverlayState::Opening);

        let plan = self.mount(&request.video_id, &request.title);
        if let Some(session) = self.session.as_mut() {
            session.source_url = request.url;
            session.video_id = request.video_id;
            session.title = request.title;
            session.poster = request.poster;
        }
        plan
    }

    fn mount(&mut self, video_id: &VideoId, title: &str) -> MountPlan {
        if let Some(cached) = self.cache.as_ref() {
            if cached.player.video_id() == video_id {
                let player = &cached.player;
                quietly("rewind", player.rewind());
                if !player.is_attached() {
                    quietly("attach", player.attach());
                }
                quietly("unmute", player.set_muted(false));
                quietly("volume", player.set_volume(1.0));
                player.play();
                self.pending = None;
                self.transition(OverlayState::Open);
                tracing::debug!(video = %video_id, "reusing cached player");
                return MountPlan::Reused;
            }
        }

        if let Some(ticket) = self.pending.as_ref() {
            if &ticket.video_id == video_id {
                return MountPlan::Awaiting(ticket.generation);
            }
        }

        if let Some(old) = self.cache.take() {
            tracing::debug!(video = %old.player.video_id(), "releasing cached player");
            teardown(&old.player);
        }
        self.generation += 1;
        let ticket = MountTicket {
            generation: self.generation,
            video_id: video_id.clone(),
            title: title.to_string(),
        };
        self.pending = Some(ticket.clone());
        MountPlan::Build(ticket)
    }

    /// Hand over a freshly constructed player. It is cached immediately.
    pub fn complete_mount(&mut self, generation: u64, player: P) -> MountOutcome {
        let current = self
            .pending
            .as_ref()
            .is_some_and(|t| t.generation == generation);
        if !current {
            tracing::debug!(generation, "discarding outdated player");
            teardown(&player);
            return MountOutcome::Discarded;
        }
        self.pending = None;
        if let Some(old) = self.cache.take() {
            teardown(&old.player);
        }
        self.cache = Some(CachedPlayer { generation, player });

        if self.state == OverlayState::Opening {
            self.transition(OverlayState::Open);
            MountOutcome::Mounted
        } else {
            if let Some(cached) = self.cache.as_ref() {
                quietly("pause", cached.player.pause());
            }
            MountOutcome::Parked
        }
    }

    /// Construction failed, most likely because the library never loaded.
    /// The overlay stays open but inert.
    pub fn mount_failed(&mut self, generation: u64, error: &ShowreelError) {
        if !self
            .pending
            .as_ref()
            .is_some_and(|t| t.generation == generation)
        {
            return;
        }
        self.pending = None;
        tracing::warn!("overlay player unavailable: {}", error);
        if self.state == OverlayState::Opening {
            self.transition(OverlayState::Open);
            self.host.set_failed(true);
        }
    }

    /// The player built for `generation` signalled ready: start unmuted
    /// playback and raise the poster veil. Returns the veil poster, if any.
    pub fn player_ready(&mut self, generation: u64) -> Option<String> {
        if self.state != OverlayState::Open {
            return None;
        }
        let cached = self.cache.as_ref().filter(|c| c.generation == generation)?;
        quietly("unmute", cached.player.set_muted(false));
        quietly("volume", cached.player.set_volume(1.0));
        cached.player.play();

        let poster = self.session.as_ref()?.poster.clone()?;
        self.host.show_veil(&poster);
        self.veil = Some(generation);
        Some(poster)
    }

    /// Drop the veil raised for `generation`; a no-op for any other generation.
    pub fn lift_veil(&mut self, generation: u64) {
        if self.veil == Some(generation) {
            self.lift_any_veil();
        }
    }

    fn lift_any_veil(&mut self) {
        if self.veil.take().is_some() {
            self.host.hide_veil();
        }
    }

    /// Close the overlay. Returns false when nothing was open.
    pub fn close(&mut self, cause: CloseCause) -> bool {
        if matches!(self.state, OverlayState::Closed | OverlayState::Closing) {
            return false;
        }
        self.transition(OverlayState::Closing);

        if let Some(cached) = self.cache.as_ref() {
            quietly("pause", cached.player.pause());
        }
        self.lift_any_veil();
        self.host.set_visible(false);
        self.host.set_failed(false);

        let session = self.session.take();
        if let Some(session) = session.as_ref() {
            if cause == CloseCause::User && self.host.history_marks_overlay() {
                if let Err(e) = self.host.replace_history(&session.opened_from_url, false) {
                    tracing::warn!("could not restore pre-overlay url: {}", e);
                }
            }
            self.unlock_scroll(&session.scroll);
        }
        self.host.resume_grid();
        self.transition(OverlayState::Closed);
        true
    }

    /// Page unload: release the cached player and any construction in flight.
    pub fn release(&mut self) {
        self.pending = None;
        if let Some(cached) = self.cache.take() {
            teardown(&cached.player);
        }
    }

    fn lock_scroll(&self) -> ScrollSnapshot {
        let offset = self.host.scroll_offset();
        let restoration = self.host.scroll_restoration();
        self.host.set_scroll_restoration(ScrollRestoration::Manual);
        self.host
            .lock_body(&BodyLock::new(offset, self.host.scrollbar_width()));
        ScrollSnapshot {
            offset,
            restoration,
        }
    }

    fn unlock_scroll(&self, snapshot: &ScrollSnapshot) {
        self.host.unlock_body();
        self.host.scroll_window_to(snapshot.offset);
        self.host.resume_scroll_at(snapshot.offset);
        self.host.set_scroll_restoration(snapshot.restoration);
    }

    fn transition(&mut self, next: OverlayState) {
        tracing::debug!(from = ?self.state, to = ?next, "overlay transition");
        self.state = next;
    }
}

/// Keep the veil raised for `generation` until playback starts or `timeout`
/// fires, then lift it. A newer session's veil is left alone.
pub async fn hold_veil<H, P, E, T>(
    controller: &RefCell<OverlayController<H, P>>,
    generation: u64,
    playing: E,
    timeout: T,
) -> RaceOutcome<E::Output>
where
    H: OverlayHost,
    P: RemotePlayer,
    E: Future,
    T: Future<Output = ()>,
{
    let outcome = race_with_timeout(playing, timeout).await;
    tracing::debug!(generation, started = outcome.is_completed(), "lifting poster veil");
    controller.borrow_mut().lift_veil(generation);
    outcome
}

/// Mute, pause, then release. Each step may fail on a half torn-down player.
fn teardown<P: RemotePlayer>(player: &P) {
    quietly("mute", player.set_muted(true));
    quietly("pause", player.pause());
    quietly("destroy", player.destroy());
}

fn quietly(step: &str, result: ShowreelResult<()>) {
    if let Err(e) = result {
        tracing::debug!("player {} ignored: {}", step, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(id: Option<&str>) -> TileMarkup {
        TileMarkup {
            href: "/work/a".to_string(),
            video_id: id.map(str::to_string),
            ..TileMarkup::default()
        }
    }

    #[test]
    fn test_tile_without_id_is_not_intercepted() {
        assert!(tile(None).into_request().is_none());
        assert!(tile(Some("  ")).into_request().is_none());
    }

    #[test]
    fn test_tile_title_defaults_to_video() {
        let req = tile(Some("111")).into_request().unwrap();
        assert_eq!(req.title, "Video");
        assert_eq!(req.video_id, VideoId::new("111"));
        assert_eq!(req.url, "/work/a");
        assert_eq!(req.poster, None);
    }

    #[test]
    fn test_poster_attribute_wins_over_nested_video() {
        let mut markup = tile(Some("111"));
        markup.title = Some("  Night Swim \n".to_string());
        markup.poster_attribute = Some("/a.jpg".to_string());
        markup.video_poster = Some("/p1.jpg".to_string());
        let req = markup.into_request().unwrap();
        assert_eq!(req.title, "Night Swim");
        assert_eq!(req.poster.as_deref(), Some("/a.jpg"));
    }

    #[test]
    fn test_nested_video_poster_fallback() {
        let mut markup = tile(Some("111"));
        markup.poster_attribute = Some(String::new());
        markup.video_poster = Some("/p1.jpg".to_string());
        assert_eq!(
            markup.into_request().unwrap().poster.as_deref(),
            Some("/p1.jpg")
        );
    }
}

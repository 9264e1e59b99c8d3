//! # showreel-core
//!
//! Platform-independent behaviour for the showreel site layer.
//! This crate holds every decision the browser glue makes: viewport tests,
//! the loading progress tracker, the video grid's play/pause rules, the
//! memoized player asset loader and the overlay player state machine.
//! Browser capabilities are reached through small traits so the logic can be
//! exercised without a DOM.

pub mod config;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod loader;
pub mod overlay;
pub mod progress;
pub mod race;
pub mod scroll;
pub mod time;

pub use config::*;

pub use error::{ShowreelError, ShowreelResult};
pub use geometry::{in_viewport, Margin, Rect, Viewport};
pub use grid::{VideoGrid, VideoRole, VideoSurface};
pub use loader::{AssetFetcher, LoadFuture, PlayerAssetLoader};
pub use overlay::{
    hold_veil, CloseCause, MountOutcome, MountPlan, MountTicket, OpenRequest,
    OverlayController, OverlayHost, OverlayState, RemotePlayer, TileMarkup, VideoId,
};
pub use progress::{ProgressSink, ProgressTracker};
pub use race::{race_with_timeout, Latch, RaceOutcome};
pub use scroll::{BodyLock, ScrollController, ScrollEngine, ScrollRestoration, ScrollSnapshot};
pub use time::Delay;

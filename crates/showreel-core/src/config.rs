use serde::{Deserialize, Serialize};

use crate::geometry::Margin;
use crate::time::Delay;
use crate::{ShowreelError, ShowreelResult};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String, // any EnvFilter directive, e.g. "info" or "showreel_core=debug"
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Selectors, attribute names and class names the glue reads from the page.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MarkupConfig {
    pub content: String,
    pub hero_video: String,
    pub tile_videos: String,
    pub projects: String,
    pub tile_links: String,
    pub tile_title: String,
    pub overlay: String,
    pub player_wrap: String,
    pub close_button: String,
    pub veil: String,
    pub header_links: String,
    pub progress: String,
    pub video_id_attribute: String,
    pub poster_attribute: String,
    pub fade_class: String,
    pub done_class: String,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            content: "#content".to_string(),
            hero_video: ".project.hero-tile video".to_string(),
            tile_videos: ".projects .grid .project video".to_string(),
            projects: ".project".to_string(),
            tile_links: "a.project".to_string(),
            tile_title: ".title".to_string(),
            overlay: "#player".to_string(),
            player_wrap: ".player-wrap".to_string(),
            close_button: ".player-close".to_string(),
            veil: ".player-veil".to_string(),
            header_links: ".site-header a".to_string(),
            progress: "#progress".to_string(),
            video_id_attribute: "data-vimeo".to_string(),
            poster_attribute: "data-poster".to_string(),
            fade_class: "fade".to_string(),
            done_class: "done".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProgressConfig {
    pub parsed: f64,
    pub first_frame: f64,
    pub tile_step: f64,
    pub tile_cap: f64,
    pub removal_delay: Delay,
    pub floor_delay: Delay,
    pub finish_delay: Delay,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            parsed: 0.15,
            first_frame: 0.55,
            tile_step: 0.12,
            tile_cap: 0.9,
            removal_delay: Delay::from_millis(600),
            floor_delay: Delay::from_millis(600),
            finish_delay: Delay::from_millis(1800),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GridConfig {
    pub reveal_margin: f64,
    pub reveal_timeout: Delay,
    pub play_threshold: f64,
    pub root_margin: Margin,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            reveal_margin: 120.0,
            reveal_timeout: Delay::from_millis(1600),
            play_threshold: 0.25,
            root_margin: Margin::new(200.0, 0.0, 300.0, 0.0),
        }
    }
}

/// Options handed to the remote player constructor.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EmbedOptions {
    pub byline: bool,
    pub title: bool,
    pub portrait: bool,
    pub autoplay: bool,
    pub muted: bool,
    pub playsinline: bool,
    pub dnt: bool,
    pub pip: bool,
    #[serde(rename = "loop")]
    pub looped: bool,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            byline: false,
            title: false,
            portrait: false,
            autoplay: true,
            muted: false,
            playsinline: true,
            dnt: true,
            pip: true,
            looped: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub script_url: String,
    pub stylesheet_url: Option<String>,
    /// Dotted path of the constructor the script installs, e.g. `Vimeo.Player`.
    pub global: String,
    pub idle_fallback: Delay,
    pub warm_margin: f64,
    pub embed: EmbedOptions,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            script_url: "https://player.vimeo.com/api/player.js".to_string(),
            stylesheet_url: None,
            global: "Vimeo.Player".to_string(),
            idle_fallback: Delay::from_millis(1500),
            warm_margin: 400.0,
            embed: EmbedOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub veil_timeout: Delay,
    pub modal_class: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            veil_timeout: Delay::from_millis(3500),
            modal_class: "modal-open".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ShowreelConfig {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub markup: MarkupConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
}

impl ShowreelConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json(source: &str) -> ShowreelResult<Self> {
        let config: ShowreelConfig = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ShowreelResult<()> {
        let p = &self.progress;
        for (name, value) in [
            ("progress.parsed", p.parsed),
            ("progress.first_frame", p.first_frame),
            ("progress.tile_cap", p.tile_cap),
            ("grid.play_threshold", self.grid.play_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ShowreelError::Config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if p.tile_step <= 0.0 {
            return Err(ShowreelError::Config(format!(
                "progress.tile_step must be positive, got {}",
                p.tile_step
            )));
        }
        Ok(())
    }
}

/// Error types for the showreel behaviour layer.

/// A specialized Result type for showreel operations.
pub type ShowreelResult<T> = Result<T, ShowreelError>;

/// Top-level error type for every showreel component.
///
/// `Clone` so a single failed load can be handed to every caller waiting on
/// the same shared future.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShowreelError {
    #[error("asset load error: {message} ({url})")]
    AssetLoad { message: String, url: String },

    #[error("playback rejected: {0}")]
    PlaybackRejected(String),

    #[error("missing element: {0}")]
    MissingElement(String),

    #[error("teardown error: {0}")]
    Teardown(String),

    #[error("overlay session already active for video {0}")]
    SessionActive(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("javascript error: {0}")]
    Js(String),
}

impl ShowreelError {
    /// Create an asset load error for the given url.
    pub fn asset_load(message: impl Into<String>, url: impl Into<String>) -> Self {
        ShowreelError::AssetLoad {
            message: message.into(),
            url: url.into(),
        }
    }

    /// Create a missing element error from the selector that matched nothing.
    pub fn missing(selector: impl Into<String>) -> Self {
        ShowreelError::MissingElement(selector.into())
    }
}

impl From<serde_json::Error> for ShowreelError {
    fn from(err: serde_json::Error) -> Self {
        ShowreelError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_load_display() {
        let err = ShowreelError::asset_load(
            "script failed to load",
            "https://player.vimeo.com/api/player.js",
        );
        assert_eq!(
            err.to_string(),
            "asset load error: script failed to load (https://player.vimeo.com/api/player.js)"
        );
    }

    #[test]
    fn test_missing_element_display() {
        let err = ShowreelError::missing("#player");
        assert!(err.to_string().contains("#player"));
    }

    #[test]
    fn test_json_error_becomes_config_error() {
        let err: ShowreelError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, ShowreelError::Config(_)));
    }
}

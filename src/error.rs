//! Error types for compositing, filtering, and background loading

use thiserror::Error;

/// A surface could not be given the requested backing store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("surface dimension {width}x{height} exceeds the {max} pixel limit per side")]
    DimensionTooLarge { width: u32, height: u32, max: u32 },

    #[error("surface area {width}x{height} exceeds the {max} pixel limit")]
    AreaTooLarge { width: u32, height: u32, max: u64 },

    #[error("pixel buffer of {len} bytes does not match {width}x{height} RGBA")]
    BufferMismatch { width: u32, height: u32, len: usize },
}

/// Fatal compositing errors
///
/// Everything else that can go wrong during a frame (empty inputs, a missing
/// background image, a failing cosmetic stage) is absorbed by the compositor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositeError {
    /// The output (or a scratch) surface cannot be sized to the frame
    #[error("no drawing context available for {surface} surface: {source}")]
    ContextUnavailable {
        surface: &'static str,
        #[source]
        source: SurfaceError,
    },
}

/// Failure inside a single beauty filter stage
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("filter input is not finite: {0}")]
    NonFinite(&'static str),

    #[error("filter scratch surface unavailable: {0}")]
    Surface(#[from] SurfaceError),
}

/// Why one background entry failed to load
#[derive(Error, Debug)]
pub enum PreloadError {
    #[error("invalid background source {0:?}")]
    InvalidSource(String),

    #[error("HTTP error {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("failed to fetch {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image from {src}: {source}")]
    Decode {
        src: String,
        #[source]
        source: image::ImageError,
    },

    #[error("decoded image from {src} is unusable: {source}")]
    Surface {
        src: String,
        #[source]
        source: SurfaceError,
    },
}

/// Effects preset could not be loaded
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read effects config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid effects config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid effects config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        Self::Invalid(msg.into())
    }
}

//! Background choices and their preloading
//!
//! A [`BackgroundSpec`] is what a user picks; a [`Background`] is what the
//! compositor draws. Blur and pass-through need nothing loaded, while image
//! backgrounds are fetched and decoded ahead of time by a
//! [`BackgroundPreloader`] so the per-frame path never waits on I/O.

use crate::error::PreloadError;
use crate::surface::Surface;
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::Instrument;

/// Blur radius used when a blur background leaves it unset
pub const DEFAULT_BLUR_RADIUS: f32 = 10.0;

fn default_blur_radius() -> f32 {
    DEFAULT_BLUR_RADIUS
}

/// Declarative background choice
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BackgroundSpec {
    /// Pass the frame through untouched
    #[default]
    None,
    /// Blur the frame behind the subject
    Blur {
        #[serde(rename = "blurRadius", default = "default_blur_radius")]
        blur_radius: f32,
    },
    /// Replace everything behind the subject with an image
    Image { src: String },
}

impl BackgroundSpec {
    pub fn blur(blur_radius: f32) -> Self {
        BackgroundSpec::Blur { blur_radius }
    }

    pub fn image<S: Into<String>>(src: S) -> Self {
        BackgroundSpec::Image { src: src.into() }
    }
}

/// Background ready to be composited
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Background {
    #[default]
    None,
    Blur { radius: f32 },
    /// `None` when the image never loaded; drawn as opaque black
    Image(Option<Arc<Surface>>),
}

impl Background {
    pub fn blur(radius: f32) -> Self {
        Background::Blur { radius }
    }

    pub fn image(surface: Surface) -> Self {
        Background::Image(Some(Arc::new(surface)))
    }
}

/// Outcome of preloading one [`BackgroundSpec`]
#[derive(Debug)]
pub struct PreloadedBackground {
    pub spec: BackgroundSpec,
    pub ready: bool,
    pub drawable: Option<Arc<Surface>>,
    pub error: Option<PreloadError>,
}

impl PreloadedBackground {
    fn ready(spec: BackgroundSpec, drawable: Option<Arc<Surface>>) -> Self {
        Self {
            spec,
            ready: true,
            drawable,
            error: None,
        }
    }

    fn failed(spec: BackgroundSpec, error: PreloadError) -> Self {
        Self {
            spec,
            ready: false,
            drawable: None,
            error: Some(error),
        }
    }

    /// What the compositor should draw for this entry
    ///
    /// A failed image entry still resolves to an image background, which the
    /// compositor fills with black.
    pub fn background(&self) -> Background {
        match &self.spec {
            BackgroundSpec::None => Background::None,
            BackgroundSpec::Blur { blur_radius } => Background::blur(*blur_radius),
            BackgroundSpec::Image { .. } => Background::Image(self.drawable.clone()),
        }
    }
}

/// Fetches and decodes background images
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, src: &str) -> Result<Surface, PreloadError>;
}

/// Loads `http(s)://` URLs with reqwest and everything else from disk
///
/// `file://` URLs and bare paths are read with tokio; other schemes are
/// rejected as invalid sources.
#[derive(Debug, Clone, Default)]
pub struct DefaultImageLoader {
    client: Client,
}

impl DefaultImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PreloadError> {
        let network_error = |source| PreloadError::Network {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().await.map_err(network_error)?;
        if !response.status().is_success() {
            return Err(PreloadError::Http {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        let bytes = response.bytes().await.map_err(network_error)?;
        Ok(bytes.to_vec())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, PreloadError> {
        tokio::fs::read(path).await.map_err(|source| PreloadError::Io {
            path: path.to_string(),
            source,
        })
    }
}

#[async_trait]
impl ImageLoader for DefaultImageLoader {
    async fn load(&self, src: &str) -> Result<Surface, PreloadError> {
        let src = src.trim();
        if src.is_empty() {
            return Err(PreloadError::InvalidSource(src.to_string()));
        }

        let bytes = if src.starts_with("http://") || src.starts_with("https://") {
            self.fetch(src).await?
        } else if let Some(path) = src.strip_prefix("file://") {
            self.read(path).await?
        } else if src.contains("://") {
            return Err(PreloadError::InvalidSource(src.to_string()));
        } else {
            self.read(src).await?
        };

        let image = image::load_from_memory(&bytes).map_err(|source| PreloadError::Decode {
            src: src.to_string(),
            source,
        })?;
        Surface::from_image(image.to_rgba8()).map_err(|source| PreloadError::Surface {
            src: src.to_string(),
            source,
        })
    }
}

/// Resolves background specs into drawable backgrounds
#[derive(Debug, Clone, Default)]
pub struct BackgroundPreloader<L = DefaultImageLoader> {
    loader: L,
}

impl BackgroundPreloader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<L: ImageLoader> BackgroundPreloader<L> {
    pub fn with_loader(loader: L) -> Self {
        Self { loader }
    }

    /// Resolve every spec concurrently
    ///
    /// The result has one entry per spec, in input order. Image entries fail
    /// independently; a failure never affects its siblings.
    pub async fn preload_backgrounds(&self, specs: &[BackgroundSpec]) -> Vec<PreloadedBackground> {
        join_all(specs.iter().map(|spec| self.preload(spec))).await
    }

    pub async fn preload(&self, spec: &BackgroundSpec) -> PreloadedBackground {
        let src = match spec {
            BackgroundSpec::None | BackgroundSpec::Blur { .. } => {
                return PreloadedBackground::ready(spec.clone(), None);
            }
            BackgroundSpec::Image { src } => src,
        };

        let span = tracing::debug_span!("preload_background", src = %src);
        match self.loader.load(src).instrument(span).await {
            Ok(surface) => {
                let (width, height) = surface.dimensions();
                tracing::debug!("Loaded background {} ({}x{})", src, width, height);
                PreloadedBackground::ready(spec.clone(), Some(Arc::new(surface)))
            }
            Err(e) => {
                tracing::warn!("Background {} failed to load: {}", src, e);
                PreloadedBackground::failed(spec.clone(), e)
            }
        }
    }
}

/// Preload with the default loader
pub async fn preload_backgrounds(specs: &[BackgroundSpec]) -> Vec<PreloadedBackground> {
    BackgroundPreloader::new().preload_backgrounds(specs).await
}

//! Per-call compositing options and JSON effects presets

use crate::background::{Background, BackgroundSpec, PreloadedBackground};
use crate::beauty::{BeautyFilter, FacialFilter};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Resolved options for one compositing call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeOptions {
    pub background: Background,
    /// Flip the whole output horizontally
    pub mirror: bool,
    /// Frame-wide filter applied last
    pub beauty_filter: Option<BeautyFilter>,
}

impl CompositeOptions {
    pub fn new(background: Background) -> Self {
        Self {
            background,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn mirrored(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    #[must_use]
    pub fn with_beauty_filter(mut self, filter: BeautyFilter) -> Self {
        self.beauty_filter = Some(filter);
        self
    }
}

/// Effects preset, e.g.
///
/// ```json
/// {
///   "background": {"type": "blur", "blurRadius": 12},
///   "mirror": true,
///   "beautyFilter": {"kind": "soft-glow", "intensity": 0.4},
///   "faceFilters": [{"kind": "blush", "intensity": 0.6}]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EffectsConfig {
    pub background: BackgroundSpec,
    pub mirror: bool,
    pub beauty_filter: Option<BeautyFilter>,
    pub face_filters: Vec<FacialFilter>,
}

impl EffectsConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Reject values no filter can draw with
    ///
    /// Intensities outside [0, 1] pass; staying in range is up to the caller.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.background {
            BackgroundSpec::Blur { blur_radius }
                if !blur_radius.is_finite() || *blur_radius < 0.0 =>
            {
                return Err(ConfigError::invalid(format!(
                    "blur radius must be a non-negative number, got {blur_radius}"
                )));
            }
            BackgroundSpec::Image { src } if src.trim().is_empty() => {
                return Err(ConfigError::invalid("image background needs a src"));
            }
            _ => {}
        }

        if let Some(filter) = &self.beauty_filter {
            if !filter.intensity.is_finite() {
                return Err(ConfigError::invalid("beauty filter intensity must be finite"));
            }
        }

        for (i, filter) in self.face_filters.iter().enumerate() {
            if !filter.intensity.is_finite() {
                return Err(ConfigError::invalid(format!(
                    "face filter {i} intensity must be finite"
                )));
            }
            let params = &filter.params;
            let finite = [params.blur_radius, params.opacity, params.slim_factor]
                .iter()
                .flatten()
                .all(|v| v.is_finite());
            if !finite {
                return Err(ConfigError::invalid(format!(
                    "face filter {i} parameters must be finite"
                )));
            }
        }
        Ok(())
    }

    /// Options for the compositor, given the preloaded background if any
    ///
    /// Image backgrounds without a matching preload resolve to black fill.
    pub fn composite_options(&self, preloaded: Option<&PreloadedBackground>) -> CompositeOptions {
        let background = match preloaded {
            Some(entry) if entry.spec == self.background => entry.background(),
            _ => match &self.background {
                BackgroundSpec::None => Background::None,
                BackgroundSpec::Blur { blur_radius } => Background::blur(*blur_radius),
                BackgroundSpec::Image { .. } => Background::Image(None),
            },
        };
        CompositeOptions {
            background,
            mirror: self.mirror,
            beauty_filter: self.beauty_filter,
        }
    }
}

use crate::error::FilterError;
use crate::render::{
    apply_color_filters, draw_image, fill, BlendMode, ColorFilter, DrawOptions, GaussianBlur, Paint,
    RadialGradient,
};
use crate::surface::{Color, Surface};
use serde::{Deserialize, Serialize};

const SMOOTHING_MAX_RADIUS: f32 = 20.0;
const SMOOTHING_MAX_ALPHA: f32 = 0.7;
const SHARPEN_MAX_ALPHA: f32 = 0.3;
const GLOW_TINT: Color = Color::rgb(255, 220, 180);

/// Frame-wide cosmetic adjustments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BeautyFilterKind {
    #[default]
    None,
    SkinSmoothing,
    BrightnessContrast,
    Highlight,
    SoftGlow,
    Sharpen,
    ColorBoost,
}

/// A global beauty filter and its strength
///
/// `intensity` is meant to stay in [0, 1]; values outside are applied as-is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeautyFilter {
    pub kind: BeautyFilterKind,
    pub intensity: f32,
    #[serde(default = "enabled")]
    pub enabled: bool,
}

fn enabled() -> bool {
    true
}

impl BeautyFilter {
    pub fn new(kind: BeautyFilterKind, intensity: f32) -> Self {
        Self {
            kind,
            intensity,
            enabled: true,
        }
    }

    /// Would change pixels if applied
    pub fn is_active(&self) -> bool {
        self.enabled && self.kind != BeautyFilterKind::None && self.intensity > 0.0
    }
}

/// Applies [`BeautyFilter`]s to whole surfaces
///
/// Holds one scratch surface and the blur buffers; both are resized as frames
/// change size and otherwise reused from call to call.
#[derive(Debug, Default)]
pub struct BeautyFilterEngine {
    scratch: Surface,
    blur: GaussianBlur,
}

impl BeautyFilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_beauty_filter(
        &mut self,
        surface: &mut Surface,
        filter: &BeautyFilter,
    ) -> Result<(), FilterError> {
        if !filter.is_active() || surface.is_empty() {
            return Ok(());
        }
        if !filter.intensity.is_finite() {
            return Err(FilterError::NonFinite("intensity"));
        }

        let intensity = filter.intensity;
        let _span = tracing::debug_span!("beauty_filter", kind = ?filter.kind, intensity).entered();

        match filter.kind {
            BeautyFilterKind::None => {}
            BeautyFilterKind::SkinSmoothing => {
                let radius = (intensity * 20.0).min(SMOOTHING_MAX_RADIUS);
                self.blur.blur_into(surface, &mut self.scratch, radius)?;
                draw_image(
                    surface,
                    &self.scratch,
                    DrawOptions {
                        alpha: (intensity * SMOOTHING_MAX_ALPHA).min(SMOOTHING_MAX_ALPHA),
                        blend: BlendMode::SoftLight,
                        mirror: false,
                    },
                );
            }
            BeautyFilterKind::BrightnessContrast => {
                apply_color_filters(
                    surface,
                    &[
                        ColorFilter::Brightness(1.0 + intensity * 0.2),
                        ColorFilter::Contrast(1.0 + intensity * 0.3),
                    ],
                );
            }
            BeautyFilterKind::Highlight => {
                let width = surface.width() as f32;
                let gradient = RadialGradient {
                    cx: width / 2.0,
                    cy: surface.height() as f32 / 2.0,
                    inner_radius: width / 4.0,
                    outer_radius: width * 1.5,
                    inner: Color::WHITE.with_alpha(0.1 * intensity),
                    outer: Color::WHITE.with_alpha(0.0),
                };
                fill(surface, &Paint::Radial(gradient), None, 1.0, BlendMode::Lighter);
            }
            BeautyFilterKind::SoftGlow => {
                let (width, height) = (surface.width() as f32, surface.height() as f32);
                let gradient = RadialGradient {
                    cx: width / 2.0,
                    cy: height / 2.0,
                    inner_radius: 0.0,
                    outer_radius: width.max(height) * 0.75,
                    inner: GLOW_TINT.with_alpha(0.15 * intensity),
                    outer: GLOW_TINT.with_alpha(0.0),
                };
                fill(surface, &Paint::Radial(gradient), None, 1.0, BlendMode::Lighter);
            }
            BeautyFilterKind::Sharpen => {
                self.blur.blur_into(surface, &mut self.scratch, 0.5 + intensity * 1.5)?;
                draw_image(
                    surface,
                    &self.scratch,
                    DrawOptions {
                        alpha: (intensity * 0.3).min(SHARPEN_MAX_ALPHA),
                        blend: BlendMode::Overlay,
                        mirror: false,
                    },
                );
            }
            BeautyFilterKind::ColorBoost => {
                let chain = [
                    ColorFilter::Saturate(1.0 + intensity * 0.5),
                    ColorFilter::HueRotate(-(intensity - 0.6) * 10.0),
                ];
                let len = if intensity > 0.6 { 2 } else { 1 };
                apply_color_filters(surface, &chain[..len]);
            }
        }
        Ok(())
    }

    /// Release scratch memory; the next call reallocates as needed
    pub fn clear_cache(&mut self) {
        self.scratch.release();
        self.blur.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [BeautyFilterKind; 6] = [
        BeautyFilterKind::SkinSmoothing,
        BeautyFilterKind::BrightnessContrast,
        BeautyFilterKind::Highlight,
        BeautyFilterKind::SoftGlow,
        BeautyFilterKind::Sharpen,
        BeautyFilterKind::ColorBoost,
    ];

    fn portrait(width: u32, height: u32) -> Surface {
        let mut surface = Surface::new(width, height).unwrap();
        for y in 0..height {
            for x in 0..width {
                let checker = if (x / 3 + y / 3) % 2 == 0 { 60 } else { 0 };
                surface.put_pixel(x, y, [150 + checker, 110 + checker / 2, 90, 255]);
            }
        }
        surface
    }

    #[test]
    fn zero_intensity_leaves_surface_untouched() {
        let mut engine = BeautyFilterEngine::new();
        for kind in ALL_KINDS {
            let original = portrait(24, 16);
            let mut surface = original.clone();
            engine.apply_beauty_filter(&mut surface, &BeautyFilter::new(kind, 0.0)).unwrap();
            assert_eq!(surface, original, "{kind:?}");
        }
    }

    #[test]
    fn none_and_disabled_leave_surface_untouched() {
        let mut engine = BeautyFilterEngine::new();
        let original = portrait(24, 16);
        let mut surface = original.clone();
        engine
            .apply_beauty_filter(&mut surface, &BeautyFilter::new(BeautyFilterKind::None, 1.0))
            .unwrap();
        let disabled = BeautyFilter {
            enabled: false,
            ..BeautyFilter::new(BeautyFilterKind::Highlight, 1.0)
        };
        engine.apply_beauty_filter(&mut surface, &disabled).unwrap();
        assert_eq!(surface, original);
    }

    #[test]
    fn every_kind_changes_pixels_at_full_intensity() {
        let mut engine = BeautyFilterEngine::new();
        for kind in ALL_KINDS {
            let original = portrait(24, 16);
            let mut surface = original.clone();
            engine.apply_beauty_filter(&mut surface, &BeautyFilter::new(kind, 1.0)).unwrap();
            assert_eq!(surface.dimensions(), original.dimensions());
            assert_ne!(surface, original, "{kind:?}");
        }
    }

    #[test]
    fn brightness_contrast_lifts_bright_pixels() {
        let mut engine = BeautyFilterEngine::new();
        let mut surface = Surface::filled(4, 4, Color::rgb(180, 180, 180)).unwrap();
        let filter = BeautyFilter::new(BeautyFilterKind::BrightnessContrast, 0.5);
        engine.apply_beauty_filter(&mut surface, &filter).unwrap();
        assert!(surface.pixel(0, 0)[0] > 180);
    }

    #[test]
    fn highlight_is_strongest_in_the_centre() {
        let mut engine = BeautyFilterEngine::new();
        let mut surface = Surface::filled(100, 40, Color::rgb(50, 50, 50)).unwrap();
        engine
            .apply_beauty_filter(&mut surface, &BeautyFilter::new(BeautyFilterKind::Highlight, 1.0))
            .unwrap();
        assert!(surface.pixel(50, 20)[0] >= surface.pixel(0, 0)[0]);
        assert!(surface.pixel(50, 20)[0] > 50);
    }

    #[test]
    fn non_finite_intensity_is_an_error() {
        let mut engine = BeautyFilterEngine::new();
        let mut surface = portrait(8, 8);
        let result = engine.apply_beauty_filter(
            &mut surface,
            &BeautyFilter::new(BeautyFilterKind::Sharpen, f32::INFINITY),
        );
        assert_eq!(result, Err(FilterError::NonFinite("intensity")));
    }

    #[test]
    fn scratch_follows_surface_size_and_clears() {
        let mut engine = BeautyFilterEngine::new();
        let smoothing = BeautyFilter::new(BeautyFilterKind::SkinSmoothing, 0.5);
        engine.apply_beauty_filter(&mut portrait(32, 32), &smoothing).unwrap();
        engine.apply_beauty_filter(&mut portrait(16, 8), &smoothing).unwrap();
        assert_eq!(engine.scratch.dimensions(), (16, 8));

        engine.clear_cache();
        engine.clear_cache();
        assert!(engine.scratch.is_empty());
        engine.apply_beauty_filter(&mut portrait(16, 8), &smoothing).unwrap();
    }
}

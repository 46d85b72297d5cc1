//! Per-frame background substitution
//!
//! Each call draws the background for the chosen mode, cuts the subject out
//! of the frame with the segmentation mask, lays it on top, and finishes with
//! the cosmetic passes. The compositor owns every scratch buffer it needs and
//! reuses them from frame to frame; the caller owns the output surface.

use crate::background::Background;
use crate::beauty::{BeautyFilterEngine, FacialBeautyEngine, FacialFilter};
use crate::config::CompositeOptions;
use crate::error::CompositeError;
use crate::face::{FaceDetection, LandmarkLayout};
use crate::mask::Mask;
use crate::render::{blit, draw_image, BlendMode, DrawOptions, GaussianBlur};
use crate::surface::{Color, FrameSource, Surface};

/// Why a frame was not drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The frame reports a zero dimension or has no pixels yet
    EmptyFrame,
    /// The mask has a zero dimension
    EmptyMask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeOutcome {
    Composited,
    /// Nothing was drawn; the output keeps its previous content
    Skipped(SkipReason),
}

/// One-shot flag: the first call to `first` returns true, every later call false
#[derive(Debug, Default)]
struct LogOnce(bool);

impl LogOnce {
    fn first(&mut self) -> bool {
        !std::mem::replace(&mut self.0, true)
    }
}

macro_rules! debug_once {
    ($flag:expr, $($arg:tt)+) => {
        if $flag.first() {
            tracing::debug!($($arg)+);
        } else {
            tracing::trace!($($arg)+);
        }
    };
}

/// Composites frames onto a caller-owned output surface
///
/// One compositor serves one render loop. Drive several outputs from
/// separate compositors so they do not share scratch state.
#[derive(Debug, Default)]
pub struct FrameCompositor {
    foreground: Surface,
    blur: GaussianBlur,
    beauty: BeautyFilterEngine,
    facial: FacialBeautyEngine,
    empty_frame_logged: LogOnce,
    empty_mask_logged: LogOnce,
    missing_image_logged: LogOnce,
}

impl FrameCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compositor whose facial filters read landmarks at `layout`
    pub fn with_landmark_layout(layout: LandmarkLayout) -> Self {
        Self {
            facial: FacialBeautyEngine::with_layout(layout),
            ..Self::default()
        }
    }

    /// Draw `frame` over the chosen background into `output`
    ///
    /// `output` is resized to the frame's dimensions. Zero-sized frames or
    /// masks are skipped and leave `output` as it was.
    pub fn composite_frame<F: FrameSource + ?Sized>(
        &mut self,
        frame: &F,
        mask: &Mask,
        output: &mut Surface,
        options: &CompositeOptions,
    ) -> Result<CompositeOutcome, CompositeError> {
        self.composite(frame, mask, &[], &[], output, options)
    }

    /// [`composite_frame`](Self::composite_frame) with facial filters applied
    /// to the extracted subject before it is laid over the background
    pub fn composite_frame_with_beauty_filters<F: FrameSource + ?Sized>(
        &mut self,
        frame: &F,
        mask: &Mask,
        detections: &[FaceDetection],
        filters: &[FacialFilter],
        output: &mut Surface,
        options: &CompositeOptions,
    ) -> Result<CompositeOutcome, CompositeError> {
        self.composite(frame, mask, detections, filters, output, options)
    }

    /// Release every scratch buffer; the next frame reallocates
    pub fn clear_cache(&mut self) {
        self.foreground.release();
        self.blur.clear();
        self.beauty.clear_cache();
        self.facial.clear_cache();
    }

    fn composite<F: FrameSource + ?Sized>(
        &mut self,
        frame: &F,
        mask: &Mask,
        detections: &[FaceDetection],
        filters: &[FacialFilter],
        output: &mut Surface,
        options: &CompositeOptions,
    ) -> Result<CompositeOutcome, CompositeError> {
        let (width, height) = frame.frame_dimensions();
        let pixels = frame.pixels();
        if width == 0 || height == 0 || pixels.is_empty() {
            debug_once!(
                self.empty_frame_logged,
                "Skipping frame with no size yet ({}x{})",
                width,
                height
            );
            return Ok(CompositeOutcome::Skipped(SkipReason::EmptyFrame));
        }
        if mask.is_empty() {
            debug_once!(
                self.empty_mask_logged,
                "Skipping frame with empty mask ({}x{})",
                mask.width(),
                mask.height()
            );
            return Ok(CompositeOutcome::Skipped(SkipReason::EmptyMask));
        }

        let _span =
            tracing::debug_span!("composite_frame", width, height, mirror = options.mirror)
                .entered();

        output
            .resize(width, height)
            .map_err(|source| CompositeError::ContextUnavailable {
                surface: "output",
                source,
            })?;

        let mirror = options.mirror;
        match &options.background {
            Background::None => {
                blit(output, pixels, mirror);
                self.apply_global_beauty(output, options);
                return Ok(CompositeOutcome::Composited);
            }
            Background::Blur { radius } => {
                blit(output, pixels, mirror);
                self.blur.blur_in_place(output, *radius);
            }
            Background::Image(Some(image)) => blit(output, image, mirror),
            Background::Image(None) => {
                debug_once!(
                    self.missing_image_logged,
                    "Background image not loaded, filling black"
                );
                output.fill(Color::BLACK);
            }
        }

        self.foreground
            .resize(width, height)
            .map_err(|source| CompositeError::ContextUnavailable {
                surface: "foreground",
                source,
            })?;
        blit(&mut self.foreground, pixels, false);
        apply_mask(&mut self.foreground, mask);

        if !detections.is_empty() && !filters.is_empty() {
            let result = self
                .facial
                .apply_beauty_filters(&mut self.foreground, detections, filters);
            if let Err(e) = result {
                tracing::warn!("Facial filters failed, drawing subject without them: {}", e);
            }
        }

        draw_image(output, &self.foreground, DrawOptions::mirrored(mirror));
        self.apply_global_beauty(output, options);
        Ok(CompositeOutcome::Composited)
    }

    fn apply_global_beauty(&mut self, output: &mut Surface, options: &CompositeOptions) {
        let Some(filter) = &options.beauty_filter else {
            return;
        };
        if let Err(e) = self.beauty.apply_beauty_filter(output, filter) {
            tracing::warn!("Beauty filter {:?} failed, frame left unfiltered: {}", filter.kind, e);
        }
    }
}

/// Keep the surface only where the mask marks foreground (destination-in)
fn apply_mask(surface: &mut Surface, mask: &Mask) {
    let (width, height) = surface.dimensions();
    let opaque = [0, 0, 0, 255];
    for y in 0..height {
        for x in 0..width {
            let coverage = mask.coverage_at(x, y, width, height);
            if coverage >= 1.0 {
                continue;
            }
            let idx = surface.index(x, y);
            let raw = surface.as_raw_mut();
            let dst = [raw[idx], raw[idx + 1], raw[idx + 2], raw[idx + 3]];
            let masked = BlendMode::DestinationIn.composite(dst, opaque, coverage);
            raw[idx..idx + 4].copy_from_slice(&masked);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SurfaceError;
    use crate::surface::VideoFrame;

    #[test]
    fn log_once_fires_once() {
        let mut flag = LogOnce::default();
        assert!(flag.first());
        assert!(!flag.first());
        assert!(!flag.first());
    }

    #[test]
    fn mask_cuts_alpha_and_keeps_colour() {
        let mut surface = Surface::filled(2, 1, Color::rgb(10, 20, 30)).unwrap();
        let mut coverage = image::GrayImage::new(2, 1);
        coverage.put_pixel(0, 0, image::Luma([255]));
        coverage.put_pixel(1, 0, image::Luma([0]));
        apply_mask(&mut surface, &Mask::from_luma(coverage));
        assert_eq!(surface.pixel(0, 0), [10, 20, 30, 255]);
        assert_eq!(surface.pixel(1, 0)[3], 0);
    }

    #[test]
    fn video_frame_before_metadata_is_skipped() {
        let mut compositor = FrameCompositor::new();
        let frame = VideoFrame::new(0, 0, Surface::filled(4, 4, Color::WHITE).unwrap());
        let mut output = Surface::filled(3, 3, Color::rgb(1, 2, 3)).unwrap();
        let before = output.clone();
        let mask = Mask::uniform(4, 4, 255);
        let outcome = compositor
            .composite_frame(&frame, &mask, &mut output, &CompositeOptions::default())
            .unwrap();
        assert_eq!(outcome, CompositeOutcome::Skipped(SkipReason::EmptyFrame));
        assert_eq!(output, before);
    }

    #[test]
    fn unsizeable_output_is_context_unavailable() {
        let mut compositor = FrameCompositor::new();
        let frame = VideoFrame::new(40_000, 10, Surface::filled(4, 4, Color::WHITE).unwrap());
        let mut output = Surface::empty();
        let mask = Mask::uniform(4, 4, 255);
        let err = compositor
            .composite_frame(&frame, &mask, &mut output, &CompositeOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            CompositeError::ContextUnavailable {
                surface: "output",
                source: SurfaceError::DimensionTooLarge { .. }
            }
        ));
    }

    #[test]
    fn video_frame_is_stretched_to_native_size() {
        let mut compositor = FrameCompositor::new();
        let frame = VideoFrame::new(8, 6, Surface::filled(4, 3, Color::rgb(90, 80, 70)).unwrap());
        let mut output = Surface::empty();
        let mask = Mask::uniform(1, 1, 255);
        compositor
            .composite_frame(&frame, &mask, &mut output, &CompositeOptions::default())
            .unwrap();
        assert_eq!(output.dimensions(), (8, 6));
        assert!(output.as_raw().chunks_exact(4).all(|px| px == [90, 80, 70, 255]));
    }

    #[test]
    fn clear_cache_then_reuse() {
        let mut compositor = FrameCompositor::new();
        let frame = Surface::filled(10, 10, Color::rgb(200, 100, 50)).unwrap();
        let options = CompositeOptions::new(Background::blur(3.0));
        let mask = Mask::uniform(10, 10, 128);
        let mut first = Surface::empty();
        compositor
            .composite_frame(&frame, &mask, &mut first, &options)
            .unwrap();
        compositor.clear_cache();
        compositor.clear_cache();
        let mut second = Surface::empty();
        compositor
            .composite_frame(&frame, &mask, &mut second, &options)
            .unwrap();
        assert_eq!(first, second);
    }
}

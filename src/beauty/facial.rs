use crate::error::FilterError;
use crate::face::{BoundingBox, FaceDetection, LandmarkLayout, Point};
use crate::render::{
    apply_color_filters_clipped, fill, for_each_covered, mix, BlendMode, ColorFilter, GaussianBlur,
    Paint, Shape,
};
use crate::surface::{Color, Surface};
use serde::{Deserialize, Serialize};

const DEFAULT_SMOOTHING_RADIUS: f32 = 8.0;
const DEFAULT_LIP_COLOR: Color = Color::rgb(200, 60, 80);
const DEFAULT_BLUSH_COLOR: Color = Color::rgb(255, 140, 170);
const DEFAULT_BLUSH_OPACITY: f32 = 0.4;
const DEFAULT_SLIM_FACTOR: f32 = 1.0;

/// Cosmetic adjustments confined to a detected face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FacialFilterKind {
    SkinSmoothing,
    EyeEnhancement,
    LipEnhancement,
    FaceContouring,
    Blush,
    Brightening,
}

/// Optional per-kind overrides
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacialFilterParams {
    /// Smoothing blur radius at full intensity
    #[serde(default)]
    pub blur_radius: Option<f32>,
    /// Lip or blush tint
    #[serde(default)]
    pub color: Option<Color>,
    /// Blush opacity at full intensity
    #[serde(default)]
    pub opacity: Option<f32>,
    /// Width multiplier for the contour shadows
    #[serde(default)]
    pub slim_factor: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FacialFilter {
    pub kind: FacialFilterKind,
    pub intensity: f32,
    #[serde(default = "enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub params: FacialFilterParams,
}

fn enabled() -> bool {
    true
}

impl FacialFilter {
    pub fn new(kind: FacialFilterKind, intensity: f32) -> Self {
        Self {
            kind,
            intensity,
            enabled: true,
            params: FacialFilterParams::default(),
        }
    }

    pub fn with_params(self, params: FacialFilterParams) -> Self {
        Self { params, ..self }
    }

    /// Landmarks a detection must carry for this filter to run
    pub fn required_landmarks(&self, layout: &LandmarkLayout) -> usize {
        match self.kind {
            FacialFilterKind::SkinSmoothing
            | FacialFilterKind::FaceContouring
            | FacialFilterKind::Brightening => 0,
            FacialFilterKind::EyeEnhancement => layout.eyes_required(),
            FacialFilterKind::LipEnhancement => layout.mouth_required(),
            FacialFilterKind::Blush => layout.cheeks_required(),
        }
    }
}

/// What happened to one (detection, filter) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacialFilterOutcome {
    Applied,
    Disabled,
    NotDetected,
    /// Intensity is zero or below
    NoEffect,
    MissingLandmarks { required: usize, available: usize },
    /// Nothing of the region falls on the surface
    OffSurface,
    /// Landmarks coincide, so the region has no size
    Degenerate,
}

/// Applies [`FacialFilter`]s around detected faces
#[derive(Debug, Default)]
pub struct FacialBeautyEngine {
    layout: LandmarkLayout,
    region: Surface,
    blur: GaussianBlur,
}

impl FacialBeautyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(layout: LandmarkLayout) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    pub fn layout(&self) -> &LandmarkLayout {
        &self.layout
    }

    /// Apply every enabled filter, in order, to every detected face
    ///
    /// Returns how many (face, filter) pairs changed the surface. Pairs that
    /// cannot run, including ones with non-finite geometry, are logged and
    /// skipped without affecting the rest. Only a failure of the surface
    /// itself ends the pass early.
    pub fn apply_beauty_filters(
        &mut self,
        surface: &mut Surface,
        detections: &[FaceDetection],
        filters: &[FacialFilter],
    ) -> Result<usize, FilterError> {
        let _span = tracing::debug_span!(
            "facial_filters",
            faces = detections.len(),
            filters = filters.len()
        )
        .entered();

        let mut applied = 0;
        let detected = detections.iter().enumerate().filter(|(_, d)| d.is_detected());
        for (face, detection) in detected {
            for filter in filters.iter().filter(|f| f.enabled) {
                match self.apply_beauty_filter(surface, detection, filter) {
                    Ok(FacialFilterOutcome::Applied) => applied += 1,
                    Ok(outcome) => {
                        tracing::trace!("Skipped {:?} on face {face}: {outcome:?}", filter.kind)
                    }
                    Err(e @ FilterError::Surface(_)) => return Err(e),
                    Err(e) => {
                        tracing::warn!("{:?} failed on face {face}, skipping: {e}", filter.kind);
                    }
                }
            }
        }
        Ok(applied)
    }

    pub fn apply_beauty_filter(
        &mut self,
        surface: &mut Surface,
        detection: &FaceDetection,
        filter: &FacialFilter,
    ) -> Result<FacialFilterOutcome, FilterError> {
        if !filter.enabled {
            return Ok(FacialFilterOutcome::Disabled);
        }
        if !detection.is_detected() {
            return Ok(FacialFilterOutcome::NotDetected);
        }
        if !(filter.intensity > 0.0) {
            return Ok(FacialFilterOutcome::NoEffect);
        }
        if !filter.intensity.is_finite() {
            return Err(FilterError::NonFinite("intensity"));
        }
        let required = filter.required_landmarks(&self.layout);
        if detection.landmarks.len() < required {
            return Ok(FacialFilterOutcome::MissingLandmarks {
                required,
                available: detection.landmarks.len(),
            });
        }

        let intensity = filter.intensity;
        let params = &filter.params;
        let layout = self.layout;
        let bbox = detection.bounding_box;
        let landmark = |index: usize| detection.landmark(index).unwrap_or_default();

        match filter.kind {
            FacialFilterKind::SkinSmoothing => {
                let Some(face) = face_ellipse(&bbox) else {
                    return Ok(FacialFilterOutcome::OffSurface);
                };
                let radius = params.blur_radius.unwrap_or(DEFAULT_SMOOTHING_RADIUS) * intensity;
                self.smooth_within(surface, &face, radius)
            }
            FacialFilterKind::EyeEnhancement => {
                let (left, right) = (landmark(layout.left_eye), landmark(layout.right_eye));
                let radius = left.distance(right) * 0.25;
                if radius == 0.0 {
                    return Ok(FacialFilterOutcome::Degenerate);
                }
                let chain = [
                    ColorFilter::Brightness(1.0 + intensity * 0.15),
                    ColorFilter::Contrast(1.0 + intensity * 0.2),
                ];
                let eyes = [circle_at(left, radius)?, circle_at(right, radius)?];
                let (width, height) = surface.dimensions();
                if eyes.iter().all(|eye| eye.pixel_bounds(width, height).is_none()) {
                    return Ok(FacialFilterOutcome::OffSurface);
                }
                for eye in &eyes {
                    apply_color_filters_clipped(surface, &chain, eye);
                }
                Ok(FacialFilterOutcome::Applied)
            }
            FacialFilterKind::LipEnhancement => {
                let (left, right) = (landmark(layout.mouth_left), landmark(layout.mouth_right));
                let centre = left.midpoint(right);
                let width = left.distance(right);
                if width == 0.0 {
                    return Ok(FacialFilterOutcome::Degenerate);
                }
                let lips = Shape::ellipse(centre.x, centre.y, width * 0.6, width * 0.3)
                    .feathered(width * 0.15);
                let tint = params.color.unwrap_or(DEFAULT_LIP_COLOR);
                paint_shapes(surface, &[lips], tint, intensity * 0.3)
            }
            FacialFilterKind::FaceContouring => {
                if !bbox.is_usable() {
                    return Ok(FacialFilterOutcome::OffSurface);
                }
                let centre = bbox.center();
                let slim = params.slim_factor.unwrap_or(DEFAULT_SLIM_FACTOR);
                let (rx, ry) = (bbox.width * 0.12 * slim, bbox.height * 0.3);
                if rx <= 0.0 {
                    return Ok(FacialFilterOutcome::Degenerate);
                }
                let offset = bbox.width * 0.35;
                let cy = centre.y + bbox.height * 0.1;
                let shadows = [
                    Shape::ellipse(centre.x - offset, cy, rx, ry).feathered(rx * 0.5),
                    Shape::ellipse(centre.x + offset, cy, rx, ry).feathered(rx * 0.5),
                ];
                paint_shapes(surface, &shadows, Color::BLACK, intensity * 0.2)
            }
            FacialFilterKind::Blush => {
                let (left, right) = (landmark(layout.left_cheek), landmark(layout.right_cheek));
                let radius = left.distance(right) * 0.18;
                if radius == 0.0 {
                    return Ok(FacialFilterOutcome::Degenerate);
                }
                let cheeks = [
                    circle_at(left, radius)?.feathered(radius * 0.5),
                    circle_at(right, radius)?.feathered(radius * 0.5),
                ];
                let tint = params.color.unwrap_or(DEFAULT_BLUSH_COLOR);
                let opacity = params.opacity.unwrap_or(DEFAULT_BLUSH_OPACITY);
                paint_shapes(surface, &cheeks, tint, opacity * intensity)
            }
            FacialFilterKind::Brightening => {
                let Some(face) = face_ellipse(&bbox) else {
                    return Ok(FacialFilterOutcome::OffSurface);
                };
                if face.pixel_bounds(surface.width(), surface.height()).is_none() {
                    return Ok(FacialFilterOutcome::OffSurface);
                }
                let brighten = [ColorFilter::Brightness(1.0 + intensity * 0.3)];
                apply_color_filters_clipped(surface, &brighten, &face);
                Ok(FacialFilterOutcome::Applied)
            }
        }
    }

    /// Release the region scratch and blur buffers
    pub fn clear_cache(&mut self) {
        self.region.release();
        self.blur.clear();
    }

    /// Blur the part of `surface` under `clip`, feathered along its edge
    fn smooth_within(
        &mut self,
        surface: &mut Surface,
        clip: &Shape,
        radius: f32,
    ) -> Result<FacialFilterOutcome, FilterError> {
        if !radius.is_finite() {
            return Err(FilterError::NonFinite("blur radius"));
        }
        let Some(rect) = clip.pixel_bounds(surface.width(), surface.height()) else {
            return Ok(FacialFilterOutcome::OffSurface);
        };
        self.region.copy_region_from(surface, rect)?;
        self.blur.blur_in_place(&mut self.region, radius);

        let region = &self.region;
        for_each_covered(surface, rect, clip, |x, y, px, coverage| {
            mix(px, region.pixel(x - rect.x, y - rect.y), coverage)
        });
        Ok(FacialFilterOutcome::Applied)
    }
}

/// Elliptical clip inscribed in the face box
fn face_ellipse(bbox: &BoundingBox) -> Option<Shape> {
    if !bbox.is_usable() {
        return None;
    }
    let centre = bbox.center();
    let shape = Shape::ellipse(centre.x, centre.y, bbox.width / 2.0, bbox.height / 2.0);
    Some(shape.feathered(bbox.width.min(bbox.height) * 0.08))
}

fn circle_at(centre: Point, radius: f32) -> Result<Shape, FilterError> {
    if !centre.is_finite() || !radius.is_finite() {
        return Err(FilterError::NonFinite("landmark"));
    }
    Ok(Shape::circle(centre.x, centre.y, radius))
}

fn paint_shapes(
    surface: &mut Surface,
    shapes: &[Shape],
    color: Color,
    alpha: f32,
) -> Result<FacialFilterOutcome, FilterError> {
    if shapes.iter().any(|shape| !shape.is_finite()) {
        return Err(FilterError::NonFinite("landmark"));
    }
    let (width, height) = surface.dimensions();
    if shapes.iter().all(|shape| shape.pixel_bounds(width, height).is_none()) {
        return Ok(FacialFilterOutcome::OffSurface);
    }
    for shape in shapes {
        fill(surface, &Paint::Solid(color), Some(shape), alpha, BlendMode::SourceOver);
    }
    Ok(FacialFilterOutcome::Applied)
}

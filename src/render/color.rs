use super::blend::{mix, to_u8, unit};
use super::paint::Shape;
use crate::surface::{PixelRect, Surface};

/// CSS-style colour filter functions
///
/// Each is a fixed affine transform of the RGB channels (Filter Effects
/// Level 1). A chain is applied left to right with clamping after every step;
/// alpha is untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorFilter {
    /// `C * amount`
    Brightness(f32),
    /// `(C - 0.5) * amount + 0.5`
    Contrast(f32),
    /// Luminance-preserving saturation matrix
    Saturate(f32),
    /// Hue rotation in degrees
    HueRotate(f32),
}

impl ColorFilter {
    fn apply(self, rgb: [f32; 3]) -> [f32; 3] {
        let [r, g, b] = rgb;
        let out = match self {
            ColorFilter::Brightness(k) => [r * k, g * k, b * k],
            ColorFilter::Contrast(k) => {
                let f = |c: f32| (c - 0.5) * k + 0.5;
                [f(r), f(g), f(b)]
            }
            ColorFilter::Saturate(s) => [
                (0.213 + 0.787 * s) * r + (0.715 - 0.715 * s) * g + (0.072 - 0.072 * s) * b,
                (0.213 - 0.213 * s) * r + (0.715 + 0.285 * s) * g + (0.072 - 0.072 * s) * b,
                (0.213 - 0.213 * s) * r + (0.715 - 0.715 * s) * g + (0.072 + 0.928 * s) * b,
            ],
            ColorFilter::HueRotate(degrees) => {
                let (sin, cos) = degrees.to_radians().sin_cos();
                [
                    (0.213 + cos * 0.787 - sin * 0.213) * r
                        + (0.715 - cos * 0.715 - sin * 0.715) * g
                        + (0.072 - cos * 0.072 + sin * 0.928) * b,
                    (0.213 - cos * 0.213 + sin * 0.143) * r
                        + (0.715 + cos * 0.285 + sin * 0.140) * g
                        + (0.072 - cos * 0.072 - sin * 0.283) * b,
                    (0.213 - cos * 0.213 - sin * 0.787) * r
                        + (0.715 - cos * 0.715 + sin * 0.715) * g
                        + (0.072 + cos * 0.928 + sin * 0.072) * b,
                ]
            }
        };
        out.map(|c| c.clamp(0.0, 1.0))
    }
}

fn filter_pixel(px: [u8; 4], filters: &[ColorFilter]) -> [u8; 4] {
    let rgb = filters
        .iter()
        .fold([unit(px[0]), unit(px[1]), unit(px[2])], |rgb, f| f.apply(rgb));
    [to_u8(rgb[0]), to_u8(rgb[1]), to_u8(rgb[2]), px[3]]
}

/// Run a filter chain over the whole surface
pub fn apply_color_filters(surface: &mut Surface, filters: &[ColorFilter]) {
    if filters.is_empty() {
        return;
    }
    for px in surface.as_raw_mut().chunks_exact_mut(4) {
        let out = filter_pixel([px[0], px[1], px[2], px[3]], filters);
        px.copy_from_slice(&out);
    }
}

/// Run a filter chain inside `clip`, fading out along its anti-aliased edge
pub fn apply_color_filters_clipped(surface: &mut Surface, filters: &[ColorFilter], clip: &Shape) {
    if filters.is_empty() {
        return;
    }
    let Some(rect) = clip.pixel_bounds(surface.width(), surface.height()) else {
        return;
    };
    for_each_covered(surface, rect, clip, |_, _, px, coverage| {
        mix(px, filter_pixel(px, filters), coverage)
    });
}

pub(crate) fn for_each_covered(
    surface: &mut Surface,
    rect: PixelRect,
    clip: &Shape,
    mut f: impl FnMut(u32, u32, [u8; 4], f32) -> [u8; 4],
) {
    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            let coverage = clip.coverage(x as f32 + 0.5, y as f32 + 0.5);
            if coverage <= 0.0 {
                continue;
            }
            let idx = surface.index(x, y);
            let raw = surface.as_raw_mut();
            let px = [raw[idx], raw[idx + 1], raw[idx + 2], raw[idx + 3]];
            raw[idx..idx + 4].copy_from_slice(&f(x, y, px, coverage));
        }
    }
}

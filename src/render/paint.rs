use super::blend::{BlendMode, Rgba8};
use crate::mask::lerp;
use crate::surface::{Color, PixelRect, Surface};

/// Region used as a clip or fill area, in surface pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    /// Axis-aligned ellipse whose edge fades over `feather` pixels
    Ellipse {
        cx: f32,
        cy: f32,
        rx: f32,
        ry: f32,
        feather: f32,
    },
}

impl Shape {
    pub fn ellipse(cx: f32, cy: f32, rx: f32, ry: f32) -> Self {
        Shape::Ellipse {
            cx,
            cy,
            rx,
            ry,
            feather: 1.0,
        }
    }

    pub fn circle(cx: f32, cy: f32, radius: f32) -> Self {
        Self::ellipse(cx, cy, radius, radius)
    }

    /// Widen the soft edge; has no effect on rectangles
    pub fn feathered(self, feather: f32) -> Self {
        match self {
            Shape::Ellipse { cx, cy, rx, ry, .. } => Shape::Ellipse {
                cx,
                cy,
                rx,
                ry,
                feather: feather.max(1.0),
            },
            rect => rect,
        }
    }

    pub fn is_finite(&self) -> bool {
        match *self {
            Shape::Rect {
                x,
                y,
                width,
                height,
            } => [x, y, width, height].iter().all(|v| v.is_finite()),
            Shape::Ellipse { cx, cy, rx, ry, feather } => {
                [cx, cy, rx, ry, feather].iter().all(|v| v.is_finite())
            }
        }
    }

    /// Fraction of the point `(x, y)` inside the shape, in [0, 1]
    pub fn coverage(&self, x: f32, y: f32) -> f32 {
        match *self {
            Shape::Rect { x: rx, y: ry, width, height } => {
                if x >= rx && x < rx + width && y >= ry && y < ry + height {
                    1.0
                } else {
                    0.0
                }
            }
            Shape::Ellipse { cx, cy, rx, ry, feather } => {
                if rx <= 0.0 || ry <= 0.0 {
                    return 0.0;
                }
                let nx = (x - cx) / rx;
                let ny = (y - cy) / ry;
                let d = (nx * nx + ny * ny).sqrt();
                let edge_distance = (1.0 - d) * rx.min(ry);
                (edge_distance / feather.max(1.0) + 0.5).clamp(0.0, 1.0)
            }
        }
    }

    /// Float bounding box `(x0, y0, x1, y1)`
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        match *self {
            Shape::Rect { x, y, width, height } => (x, y, x + width, y + height),
            Shape::Ellipse { cx, cy, rx, ry, feather } => {
                let pad = feather.max(1.0);
                (cx - rx - pad, cy - ry - pad, cx + rx + pad, cy + ry + pad)
            }
        }
    }

    pub fn pixel_bounds(&self, width: u32, height: u32) -> Option<PixelRect> {
        let (x0, y0, x1, y1) = self.bounds();
        PixelRect::covering(x0, y0, x1, y1, width, height)
    }
}

/// Two-stop radial gradient sharing one centre, like a canvas gradient with
/// stops at 0 and 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadialGradient {
    pub cx: f32,
    pub cy: f32,
    pub inner_radius: f32,
    pub outer_radius: f32,
    pub inner: Color,
    pub outer: Color,
}

impl RadialGradient {
    fn color_at(&self, x: f32, y: f32) -> Rgba8 {
        let distance = ((x - self.cx).powi(2) + (y - self.cy).powi(2)).sqrt();
        let span = self.outer_radius - self.inner_radius;
        let t = if span <= 0.0 {
            if distance < self.inner_radius { 0.0 } else { 1.0 }
        } else {
            ((distance - self.inner_radius) / span).clamp(0.0, 1.0)
        };
        let (a, b) = (self.inner, self.outer);
        let channel =
            |p: u8, q: u8| lerp(f32::from(p), f32::from(q), t).round().clamp(0.0, 255.0) as u8;
        [
            channel(a.r, b.r),
            channel(a.g, b.g),
            channel(a.b, b.b),
            (lerp(a.a, b.a, t).clamp(0.0, 1.0) * 255.0).round() as u8,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Paint {
    Solid(Color),
    Radial(RadialGradient),
}

impl Paint {
    fn color_at(&self, x: f32, y: f32) -> Rgba8 {
        match self {
            Paint::Solid(color) => color.to_rgba8(),
            Paint::Radial(gradient) => gradient.color_at(x, y),
        }
    }
}

/// Paint `paint` through `blend` at `alpha`, restricted to `clip` if given
pub fn fill(
    surface: &mut Surface,
    paint: &Paint,
    clip: Option<&Shape>,
    alpha: f32,
    blend: BlendMode,
) {
    let (width, height) = surface.dimensions();
    let rect = match clip {
        Some(shape) => match shape.pixel_bounds(width, height) {
            Some(rect) => rect,
            None => return,
        },
        None if surface.is_empty() => return,
        None => PixelRect::full(width, height),
    };

    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
            let coverage = clip.map_or(1.0, |shape| shape.coverage(px, py));
            if coverage <= 0.0 {
                continue;
            }
            let src = paint.color_at(px, py);
            let idx = surface.index(x, y);
            let raw = surface.as_raw_mut();
            let dst = [raw[idx], raw[idx + 1], raw[idx + 2], raw[idx + 3]];
            raw[idx..idx + 4].copy_from_slice(&blend.composite(dst, src, alpha * coverage));
        }
    }
}

/// Placement of one image draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawOptions {
    pub alpha: f32,
    pub blend: BlendMode,
    /// Flip horizontally about the target's centre
    pub mirror: bool,
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            blend: BlendMode::SourceOver,
            mirror: false,
        }
    }
}

impl DrawOptions {
    pub fn mirrored(mirror: bool) -> Self {
        Self {
            mirror,
            ..Self::default()
        }
    }
}

/// Draw `src` stretched over all of `dst`
pub fn draw_image(dst: &mut Surface, src: &Surface, options: DrawOptions) {
    if src.is_empty() || dst.is_empty() {
        return;
    }
    let (width, height) = dst.dimensions();
    for y in 0..height {
        for x in 0..width {
            let sx = if options.mirror { width - 1 - x } else { x };
            let s = sample_stretched(src, sx, y, width, height);
            let idx = dst.index(x, y);
            let raw = dst.as_raw_mut();
            let d = [raw[idx], raw[idx + 1], raw[idx + 2], raw[idx + 3]];
            raw[idx..idx + 4].copy_from_slice(&options.blend.composite(d, s, options.alpha));
        }
    }
}

/// Replace all of `dst` with `src` stretched over it
///
/// Equal to `draw_image` onto a cleared surface, without the blending work.
pub fn blit(dst: &mut Surface, src: &Surface, mirror: bool) {
    if dst.is_empty() {
        return;
    }
    if src.is_empty() {
        dst.clear();
        return;
    }
    let (width, height) = dst.dimensions();
    if !mirror && src.dimensions() == (width, height) {
        dst.as_raw_mut().copy_from_slice(src.as_raw());
        return;
    }
    for y in 0..height {
        for x in 0..width {
            let sx = if mirror { width - 1 - x } else { x };
            let px = sample_stretched(src, sx, y, width, height);
            let idx = dst.index(x, y);
            dst.as_raw_mut()[idx..idx + 4].copy_from_slice(&px);
        }
    }
}

/// Bilinear sample of `src` as if stretched to `width × height`
fn sample_stretched(src: &Surface, x: u32, y: u32, width: u32, height: u32) -> Rgba8 {
    let (sw, sh) = src.dimensions();
    if (sw, sh) == (width, height) {
        return src.pixel(x, y);
    }
    let fx = ((x as f32 + 0.5) * sw as f32 / width as f32 - 0.5).max(0.0);
    let fy = ((y as f32 + 0.5) * sh as f32 / height as f32 - 0.5).max(0.0);
    let x0 = (fx.floor() as u32).min(sw - 1);
    let y0 = (fy.floor() as u32).min(sh - 1);
    let x1 = (x0 + 1).min(sw - 1);
    let y1 = (y0 + 1).min(sh - 1);
    let tx = if x1 == x0 { 0.0 } else { fx - x0 as f32 };
    let ty = if y1 == y0 { 0.0 } else { fy - y0 as f32 };

    let (p00, p10) = (src.pixel(x0, y0), src.pixel(x1, y0));
    let (p01, p11) = (src.pixel(x0, y1), src.pixel(x1, y1));
    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = lerp(f32::from(p00[c]), f32::from(p10[c]), tx);
        let bottom = lerp(f32::from(p01[c]), f32::from(p11[c]), tx);
        out[c] = lerp(top, bottom, ty).round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(width: u32, height: u32) -> Surface {
        let mut surface = Surface::new(width, height).unwrap();
        for y in 0..height {
            for x in 0..width {
                surface.put_pixel(x, y, [x as u8 * 10, y as u8 * 10, 7, 255]);
            }
        }
        surface
    }

    #[test]
    fn ellipse_coverage_inside_edge_outside() {
        let shape = Shape::ellipse(10.0, 10.0, 6.0, 3.0);
        assert_eq!(shape.coverage(10.0, 10.0), 1.0);
        assert_eq!(shape.coverage(30.0, 10.0), 0.0);
        let edge = shape.coverage(16.0, 10.0);
        assert!(edge > 0.0 && edge < 1.0);
    }

    #[test]
    fn degenerate_ellipse_covers_nothing() {
        assert_eq!(Shape::ellipse(5.0, 5.0, 0.0, 4.0).coverage(5.0, 5.0), 0.0);
    }

    #[test]
    fn mirrored_blit_flips_columns() {
        let src = numbered(5, 3);
        let mut dst = Surface::new(5, 3).unwrap();
        blit(&mut dst, &src, true);
        for y in 0..3 {
            for x in 0..5 {
                assert_eq!(dst.pixel(x, y), src.pixel(4 - x, y));
            }
        }
    }

    #[test]
    fn stretched_blit_of_uniform_source_is_uniform() {
        let src = Surface::filled(7, 3, Color::rgb(30, 60, 90)).unwrap();
        let mut dst = Surface::new(100, 100).unwrap();
        blit(&mut dst, &src, false);
        assert!(dst.as_raw().chunks_exact(4).all(|px| px == [30, 60, 90, 255]));
    }

    #[test]
    fn draw_image_with_transparent_source_keeps_dst() {
        let mut dst = numbered(4, 4);
        let before = dst.clone();
        let src = Surface::new(4, 4).unwrap();
        draw_image(&mut dst, &src, DrawOptions::default());
        assert_eq!(dst, before);
    }

    #[test]
    fn fill_with_gradient_fades_outwards() {
        let mut surface = Surface::filled(40, 40, Color::BLACK).unwrap();
        let gradient = RadialGradient {
            cx: 20.0,
            cy: 20.0,
            inner_radius: 0.0,
            outer_radius: 20.0,
            inner: Color::WHITE,
            outer: Color::WHITE.with_alpha(0.0),
        };
        fill(&mut surface, &Paint::Radial(gradient), None, 1.0, BlendMode::Lighter);
        let centre = surface.pixel(20, 20)[0];
        let rim = surface.pixel(37, 20)[0];
        assert!(centre > 200);
        assert!(rim < centre);
        assert_eq!(surface.pixel(0, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn fill_clipped_to_circle() {
        let mut surface = Surface::filled(20, 20, Color::WHITE).unwrap();
        fill(
            &mut surface,
            &Paint::Solid(Color::BLACK),
            Some(&Shape::circle(10.0, 10.0, 3.0)),
            1.0,
            BlendMode::SourceOver,
        );
        assert_eq!(surface.pixel(10, 10), [0, 0, 0, 255]);
        assert_eq!(surface.pixel(2, 2), [255, 255, 255, 255]);
    }
}

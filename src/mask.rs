use crate::surface::Surface;
use image::{GrayImage, Luma, RgbaImage};

/// Per-pixel foreground coverage
///
/// 0 is certain background, 255 certain foreground, with soft gradients along
/// the silhouette. The mask need not match the frame size; it is stretched
/// over whatever it is applied to.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    coverage: GrayImage,
}

impl Mask {
    pub fn from_luma(coverage: GrayImage) -> Self {
        Self { coverage }
    }

    /// Coverage taken from the alpha channel, like a canvas mask image
    pub fn from_alpha(image: &RgbaImage) -> Self {
        let coverage = GrayImage::from_fn(image.width(), image.height(), |x, y| {
            Luma([image.get_pixel(x, y)[3]])
        });
        Self { coverage }
    }

    /// Mask from a row-major float matte with values in [0, 1]
    ///
    /// A matte whose length does not match `width × height` yields an empty
    /// mask, which the compositor treats as not ready.
    pub fn from_matte(matte: &[f32], width: u32, height: u32) -> Self {
        if matte.len() != width as usize * height as usize {
            tracing::debug!(
                "Matte of {} values does not match {}x{}",
                matte.len(),
                width,
                height
            );
            return Self::from_luma(GrayImage::new(0, 0));
        }
        let raw = matte
            .iter()
            .map(|v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
            .collect();
        // length checked above
        let coverage =
            GrayImage::from_raw(width, height, raw).unwrap_or_else(|| GrayImage::new(0, 0));
        Self { coverage }
    }

    pub fn uniform(width: u32, height: u32, value: u8) -> Self {
        Self::from_luma(GrayImage::from_pixel(width, height, Luma([value])))
    }

    pub fn width(&self) -> u32 {
        self.coverage.width()
    }

    pub fn height(&self) -> u32 {
        self.coverage.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.coverage.dimensions()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn as_luma(&self) -> &GrayImage {
        &self.coverage
    }

    /// Coverage in [0, 1] at target pixel `(x, y)` with the mask stretched
    /// bilinearly over a `target_width × target_height` area
    pub fn coverage_at(&self, x: u32, y: u32, target_width: u32, target_height: u32) -> f32 {
        let (mw, mh) = self.dimensions();
        if mw == 0 || mh == 0 {
            return 0.0;
        }
        if (mw, mh) == (target_width, target_height) {
            return f32::from(self.coverage.get_pixel(x, y)[0]) / 255.0;
        }

        let fx = ((x as f32 + 0.5) * mw as f32 / target_width as f32 - 0.5).max(0.0);
        let fy = ((y as f32 + 0.5) * mh as f32 / target_height as f32 - 0.5).max(0.0);
        let x0 = (fx.floor() as u32).min(mw - 1);
        let y0 = (fy.floor() as u32).min(mh - 1);
        let x1 = (x0 + 1).min(mw - 1);
        let y1 = (y0 + 1).min(mh - 1);
        let tx = if x1 == x0 { 0.0 } else { fx - x0 as f32 };
        let ty = if y1 == y0 { 0.0 } else { fy - y0 as f32 };

        let sample = |sx: u32, sy: u32| f32::from(self.coverage.get_pixel(sx, sy)[0]);
        let top = lerp(sample(x0, y0), sample(x1, y0), tx);
        let bottom = lerp(sample(x0, y1), sample(x1, y1), tx);
        lerp(top, bottom, ty) / 255.0
    }

    /// Grey silhouette view of the mask
    pub fn to_surface(&self) -> Surface {
        let image = RgbaImage::from_fn(self.width(), self.height(), |x, y| {
            let v = self.coverage.get_pixel(x, y)[0];
            image::Rgba([v, v, v, 255])
        });
        Surface::from_image(image).unwrap_or_default()
    }
}

pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

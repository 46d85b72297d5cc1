use crate::error::SurfaceError;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Largest width or height a surface may take
pub const MAX_SURFACE_DIMENSION: u32 = 32_767;

/// Largest pixel count a surface may take
pub const MAX_SURFACE_AREA: u64 = 268_435_456;

/// Straight-alpha colour: 8-bit channels, alpha in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default = "opaque")]
    pub a: f32,
}

fn opaque() -> f32 {
    1.0
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 0.0,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    pub(crate) fn to_rgba8(self) -> [u8; 4] {
        [self.r, self.g, self.b, (self.a.clamp(0.0, 1.0) * 255.0).round() as u8]
    }
}

/// Integer pixel rectangle, always inside the surface it was clipped to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// Pixel-aligned cover of the float bounds `[x0, x1) × [y0, y1)`, clipped
    /// to a `width × height` surface. `None` if empty or not finite.
    pub fn covering(x0: f32, y0: f32, x1: f32, y1: f32, width: u32, height: u32) -> Option<Self> {
        if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
            return None;
        }
        let left = x0.floor().clamp(0.0, width as f32) as u32;
        let top = y0.floor().clamp(0.0, height as f32) as u32;
        let right = x1.ceil().clamp(0.0, width as f32) as u32;
        let bottom = y1.ceil().clamp(0.0, height as f32) as u32;
        if right <= left || bottom <= top {
            return None;
        }
        Some(Self {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        })
    }

    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

pub(crate) fn check_dimensions(width: u32, height: u32) -> Result<(), SurfaceError> {
    if width > MAX_SURFACE_DIMENSION || height > MAX_SURFACE_DIMENSION {
        return Err(SurfaceError::DimensionTooLarge {
            width,
            height,
            max: MAX_SURFACE_DIMENSION,
        });
    }
    if u64::from(width) * u64::from(height) > MAX_SURFACE_AREA {
        return Err(SurfaceError::AreaTooLarge {
            width,
            height,
            max: MAX_SURFACE_AREA,
        });
    }
    Ok(())
}

/// RGBA8 pixel buffer with straight (non-premultiplied) alpha
///
/// Frames, backgrounds, outputs, and every scratch buffer are surfaces.
/// Resizing keeps the existing allocation whenever it is large enough, so a
/// surface reused across frames stops allocating once it has seen the largest
/// resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    image: RgbaImage,
}

impl Default for Surface {
    fn default() -> Self {
        Self::empty()
    }
}

impl Surface {
    pub fn empty() -> Self {
        Self {
            image: RgbaImage::new(0, 0),
        }
    }

    /// Transparent surface of the given size
    pub fn new(width: u32, height: u32) -> Result<Self, SurfaceError> {
        check_dimensions(width, height)?;
        Ok(Self {
            image: RgbaImage::new(width, height),
        })
    }

    pub fn filled(width: u32, height: u32, color: Color) -> Result<Self, SurfaceError> {
        let mut surface = Self::new(width, height)?;
        surface.fill(color);
        Ok(surface)
    }

    pub fn from_image(image: RgbaImage) -> Result<Self, SurfaceError> {
        check_dimensions(image.width(), image.height())?;
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Change the surface size, reusing the backing buffer
    ///
    /// Pixel content is unspecified after a size change; callers repaint.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), SurfaceError> {
        if self.dimensions() == (width, height) {
            return Ok(());
        }
        check_dimensions(width, height)?;

        let len = width as usize * height as usize * 4;
        let mut buffer = std::mem::replace(&mut self.image, RgbaImage::new(0, 0)).into_raw();
        buffer.resize(len, 0);
        self.image = RgbaImage::from_raw(width, height, buffer)
            .ok_or(SurfaceError::BufferMismatch { width, height, len })?;
        Ok(())
    }

    /// Drop the backing allocation
    pub fn release(&mut self) {
        self.image = RgbaImage::new(0, 0);
    }

    pub fn clear(&mut self) {
        self.as_raw_mut().fill(0);
    }

    pub fn fill(&mut self, color: Color) {
        let px = color.to_rgba8();
        for chunk in self.as_raw_mut().chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
    }

    /// Become a pixel-exact copy of `src`
    pub fn copy_from(&mut self, src: &Surface) -> Result<(), SurfaceError> {
        self.resize(src.width(), src.height())?;
        self.as_raw_mut().copy_from_slice(src.as_raw());
        Ok(())
    }

    /// Become a copy of the `rect` region of `src`
    pub fn copy_region_from(&mut self, src: &Surface, rect: PixelRect) -> Result<(), SurfaceError> {
        self.resize(rect.width, rect.height)?;
        let row_len = rect.width as usize * 4;
        for row in 0..rect.height {
            let start = src.index(rect.x, rect.y + row);
            let dst_start = row as usize * row_len;
            self.as_raw_mut()[dst_start..dst_start + row_len]
                .copy_from_slice(&src.as_raw()[start..start + row_len]);
        }
        Ok(())
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, px: [u8; 4]) {
        self.image.put_pixel(x, y, image::Rgba(px));
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.image
    }

    pub fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.image
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub(crate) fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width() as usize + x as usize) * 4
    }
}

/// Anything the compositor can read a frame from
///
/// Dimensions come from whatever introspection the source offers; a source
/// reporting a zero dimension is not ready yet.
pub trait FrameSource {
    /// Width and height the frame should be drawn at
    fn frame_dimensions(&self) -> (u32, u32);

    /// Decoded pixels; stretched to `frame_dimensions` when they differ
    fn pixels(&self) -> &Surface;
}

/// Still images report their own size
impl FrameSource for Surface {
    fn frame_dimensions(&self) -> (u32, u32) {
        self.dimensions()
    }

    fn pixels(&self) -> &Surface {
        self
    }
}

/// A decoded frame from a live video device
///
/// The native size is what the device negotiated and stays zero until the
/// device has delivered its stream metadata.
#[derive(Debug, Clone, Default)]
pub struct VideoFrame {
    native_width: u32,
    native_height: u32,
    pixels: Surface,
}

impl VideoFrame {
    pub fn new(native_width: u32, native_height: u32, pixels: Surface) -> Self {
        Self {
            native_width,
            native_height,
            pixels,
        }
    }

    /// Frame whose native size is its decoded size
    pub fn from_surface(pixels: Surface) -> Self {
        let (native_width, native_height) = pixels.dimensions();
        Self::new(native_width, native_height, pixels)
    }

    pub fn native_size(&self) -> (u32, u32) {
        (self.native_width, self.native_height)
    }
}

impl FrameSource for VideoFrame {
    fn frame_dimensions(&self) -> (u32, u32) {
        (self.native_width, self.native_height)
    }

    fn pixels(&self) -> &Surface {
        &self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_keeps_allocation_when_shrinking() {
        let mut surface = Surface::new(64, 64).unwrap();
        let capacity = surface.image.as_raw().capacity();
        surface.resize(32, 16).unwrap();
        assert_eq!(surface.dimensions(), (32, 16));
        assert_eq!(surface.as_raw().len(), 32 * 16 * 4);
        assert_eq!(surface.image.as_raw().capacity(), capacity);
    }

    #[test]
    fn resize_rejects_oversized_surfaces() {
        let mut surface = Surface::empty();
        assert!(matches!(
            surface.resize(MAX_SURFACE_DIMENSION + 1, 1),
            Err(SurfaceError::DimensionTooLarge { .. })
        ));
        assert!(matches!(
            surface.resize(20_000, 20_000),
            Err(SurfaceError::AreaTooLarge { .. })
        ));
        assert!(surface.is_empty());
    }

    #[test]
    fn copy_region_extracts_rows() {
        let mut src = Surface::new(4, 4).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                src.put_pixel(x, y, [x as u8, y as u8, 0, 255]);
            }
        }
        let mut region = Surface::empty();
        region
            .copy_region_from(&src, PixelRect { x: 1, y: 2, width: 2, height: 2 })
            .unwrap();
        assert_eq!(region.dimensions(), (2, 2));
        assert_eq!(region.pixel(0, 0), [1, 2, 0, 255]);
        assert_eq!(region.pixel(1, 1), [2, 3, 0, 255]);
    }

    #[test]
    fn covering_clips_to_surface() {
        let rect = PixelRect::covering(-5.0, 2.5, 7.2, 40.0, 10, 10).unwrap();
        assert_eq!(rect, PixelRect { x: 0, y: 2, width: 8, height: 8 });
        assert!(PixelRect::covering(12.0, 0.0, 20.0, 5.0, 10, 10).is_none());
        assert!(PixelRect::covering(f32::NAN, 0.0, 5.0, 5.0, 10, 10).is_none());
    }

    #[test]
    fn video_frame_reports_native_size() {
        let frame = VideoFrame::new(0, 0, Surface::new(8, 8).unwrap());
        assert_eq!(frame.frame_dimensions(), (0, 0));
        assert_eq!(frame.pixels().dimensions(), (8, 8));
    }
}

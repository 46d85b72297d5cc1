use super::OutputSink;
use crate::surface::{check_dimensions, Surface};
use anyhow::{bail, Context, Result};
use image::{imageops, RgbaImage};
use std::borrow::Cow;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use v4l::video::Output;
use v4l::{Device, FourCC};

/// Writes YUYV frames to a v4l2loopback device
pub struct V4L2Output {
    file: File,
    width: u32,
    height: u32,
    yuyv: Vec<u8>,
}

impl V4L2Output {
    pub fn new<P: AsRef<Path>>(device_path: P, width: u32, height: u32) -> Result<Self> {
        let path = device_path.as_ref();
        check_output_size(width, height)?;
        tracing::info!(
            "Opening v4l2loopback device at {} ({}x{})",
            path.display(),
            width,
            height
        );

        // Announce the format so readers see YUYV at our resolution
        let device = Device::with_path(path).with_context(|| {
            format!("Failed to open v4l2loopback device at {}", path.display())
        })?;
        let mut format = Output::format(&device).context("Failed to query output format")?;
        format.width = width;
        format.height = height;
        format.fourcc = FourCC::new(b"YUYV");
        let format =
            Output::set_format(&device, &format).context("Failed to set YUYV output format")?;
        tracing::debug!(
            "Loopback format: {}x{} {}",
            format.width,
            format.height,
            format.fourcc
        );

        // v4l2loopback accepts raw frame data written to the device file
        let file = File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;

        tracing::info!("v4l2loopback device opened successfully");

        Ok(Self {
            file,
            width,
            height,
            yuyv: Vec::with_capacity(width as usize * height as usize * 2),
        })
    }
}

/// YUYV packs pixel pairs, so the width must be even
fn check_output_size(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        bail!("Output resolution {}x{} is empty", width, height);
    }
    if width % 2 != 0 {
        bail!("Output width {} must be even for YUYV", width);
    }
    check_dimensions(width, height).context("Output resolution is too large")?;
    Ok(())
}

/// Pack an RGBA frame as YUV 4:2:2 (Y0 U Y1 V), reusing `out`
fn rgba_to_yuyv(frame: &RgbaImage, out: &mut Vec<u8>) {
    out.clear();
    let stride = frame.width() as usize * 4;
    if stride == 0 {
        return;
    }

    for row in frame.as_raw().chunks_exact(stride) {
        for pair in row.chunks(8) {
            let p1 = &pair[..4];
            let p2 = if pair.len() == 8 { &pair[4..] } else { p1 };

            let (y1, u1, v1) = rgb_to_yuv(p1[0], p1[1], p1[2]);
            let (y2, u2, v2) = rgb_to_yuv(p2[0], p2[1], p2[2]);

            // chroma is shared by the pair
            let u = ((u16::from(u1) + u16::from(u2)) / 2) as u8;
            let v = ((u16::from(v1) + u16::from(v2)) / 2) as u8;

            out.extend_from_slice(&[y1, u, y2, v]);
        }
    }
}

/// Lanczos3 resample to the device resolution; borrows when already there
fn scale_to(frame: &Surface, width: u32, height: u32) -> Cow<'_, RgbaImage> {
    if frame.dimensions() == (width, height) {
        Cow::Borrowed(frame.as_image())
    } else {
        Cow::Owned(imageops::resize(
            frame.as_image(),
            width,
            height,
            imageops::FilterType::Lanczos3,
        ))
    }
}

/// Convert RGB to YUV color space
fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));

    let y = (0.299 * r + 0.587 * g + 0.114 * b).clamp(0.0, 255.0) as u8;
    let u = ((-0.147 * r - 0.289 * g + 0.436 * b) + 128.0).clamp(0.0, 255.0) as u8;
    let v = ((0.615 * r - 0.515 * g - 0.100 * b) + 128.0).clamp(0.0, 255.0) as u8;

    (y, u, v)
}

impl OutputSink for V4L2Output {
    fn write_frame(&mut self, frame: &Surface) -> Result<()> {
        let frame = scale_to(frame, self.width, self.height);
        rgba_to_yuyv(&frame, &mut self.yuyv);

        self.file
            .write_all(&self.yuyv)
            .context("Failed to write frame to v4l2loopback device")?;

        Ok(())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn grey_maps_to_neutral_chroma() {
        let (y, u, v) = rgb_to_yuv(128, 128, 128);
        assert!(y.abs_diff(128) <= 1);
        assert!(u.abs_diff(128) <= 1);
        assert!(v.abs_diff(128) <= 1);
    }

    #[test]
    fn packs_two_bytes_per_pixel() {
        let frame = RgbaImage::from_pixel(4, 2, Rgba([255, 255, 255, 255]));
        let mut out = vec![9; 100];
        rgba_to_yuyv(&frame, &mut out);
        assert_eq!(out.len(), 4 * 2 * 2);
        assert!(out.chunks_exact(4).all(|q| q[0] == q[2]));
    }

    #[test]
    fn frames_at_device_size_are_borrowed() {
        let frame = Surface::new(4, 2).unwrap();
        assert!(matches!(scale_to(&frame, 4, 2), Cow::Borrowed(_)));
        assert!(matches!(scale_to(&frame, 8, 4), Cow::Owned(_)));
    }

    #[test]
    fn odd_or_empty_widths_are_rejected() {
        assert!(check_output_size(1280, 720).is_ok());
        assert!(check_output_size(1279, 720).is_err());
        assert!(check_output_size(0, 720).is_err());
        assert!(check_output_size(1280, 0).is_err());
        assert!(check_output_size(40000, 2).is_err());
    }

    #[test]
    fn downscaled_stripes_do_not_alias() {
        let stripes = RgbaImage::from_fn(1920, 4, |x, _| {
            let v = if x % 2 == 0 { 0 } else { 255 };
            Rgba([v, v, v, 255])
        });
        let stripes = Surface::from_image(stripes).unwrap();
        let resized = scale_to(&stripes, 512, 4);
        assert_eq!(resized.dimensions(), (512, 4));
        let mut out = Vec::new();
        rgba_to_yuyv(&resized, &mut out);
        assert_eq!(out.len(), 512 * 4 * 2);
        // luma bytes sit at even offsets
        assert!(out.iter().step_by(2).all(|y| (97..=158).contains(y)));
    }
}

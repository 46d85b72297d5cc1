use crate::error::SurfaceError;
use crate::surface::Surface;

// Radii beyond this only cost time; the result is already a flat average.
const MAX_SIGMA: f32 = 250.0;

/// Gaussian blur approximated by three box blurs
///
/// Works on premultiplied pixels so transparent regions do not bleed dark
/// fringes, and clamps at the edges so borders keep their brightness. Both
/// working buffers are kept between calls.
#[derive(Debug, Default)]
pub struct GaussianBlur {
    premul: Vec<u8>,
    tmp: Vec<u8>,
}

impl GaussianBlur {
    pub fn new() -> Self {
        Self::default()
    }

    /// Release the working buffers
    pub fn clear(&mut self) {
        self.premul = Vec::new();
        self.tmp = Vec::new();
    }

    /// Blur `surface` with a standard deviation of `sigma` pixels
    pub fn blur_in_place(&mut self, surface: &mut Surface, sigma: f32) {
        if !(sigma > 0.0) || surface.is_empty() {
            return;
        }
        let sizes = box_sizes(sigma.min(MAX_SIGMA));
        if sizes.iter().all(|&size| size <= 1) {
            return;
        }

        let (width, height) = (surface.width() as usize, surface.height() as usize);
        let _span = tracing::trace_span!("gaussian_blur", width, height, sigma).entered();

        self.premul.clear();
        self.premul.extend_from_slice(surface.as_raw());
        premultiply(&mut self.premul);
        self.tmp.resize(self.premul.len(), 0);

        for size in sizes {
            let radius = (size - 1) / 2;
            if radius == 0 {
                continue;
            }
            box_blur_horizontal(&self.premul, &mut self.tmp, width, height, radius);
            box_blur_vertical(&self.tmp, &mut self.premul, width, height, radius);
        }

        unpremultiply_into(&self.premul, surface.as_raw_mut());
    }

    /// Write a blurred copy of `src` into `dst`
    pub fn blur_into(
        &mut self,
        src: &Surface,
        dst: &mut Surface,
        sigma: f32,
    ) -> Result<(), SurfaceError> {
        dst.copy_from(src)?;
        self.blur_in_place(dst, sigma);
        Ok(())
    }
}

/// Three odd box widths whose successive application matches `sigma`
fn box_sizes(sigma: f32) -> [usize; 3] {
    const PASSES: f32 = 3.0;
    let variance = 12.0 * sigma * sigma;
    let ideal = (variance / PASSES + 1.0).sqrt();
    let mut lower = ideal.floor() as i64;
    if lower % 2 == 0 {
        lower -= 1;
    }
    let lower = lower.max(1);
    let upper = lower + 2;
    let lf = lower as f32;
    let excess = variance - PASSES * lf * lf - 4.0 * PASSES * lf - 3.0 * PASSES;
    let m = (excess / (-4.0 * lf - 4.0)).round() as i64;

    let mut sizes = [0usize; 3];
    for (i, size) in sizes.iter_mut().enumerate() {
        *size = if (i as i64) < m { lower } else { upper } as usize;
    }
    sizes
}

fn premultiply(buf: &mut [u8]) {
    for px in buf.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        if a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u32::from(*c) * a + 127) / 255) as u8;
        }
    }
}

fn unpremultiply_into(src: &[u8], dst: &mut [u8]) {
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let a = u32::from(s[3]);
        d[3] = s[3];
        match a {
            0 => d[..3].fill(0),
            255 => d[..3].copy_from_slice(&s[..3]),
            _ => {
                for c in 0..3 {
                    d[c] = ((u32::from(s[c]) * 255 + a / 2) / a).min(255) as u8;
                }
            }
        }
    }
}

fn box_blur_horizontal(src: &[u8], dst: &mut [u8], width: usize, height: usize, radius: usize) {
    let size = (2 * radius + 1) as u32;
    let last = width as isize - 1;
    let r = radius as isize;
    for y in 0..height {
        let row = y * width * 4;
        for c in 0..4 {
            let at = |x: isize| u32::from(src[row + x.clamp(0, last) as usize * 4 + c]);
            let mut sum: u32 = (-r..=r).map(at).sum();
            for x in 0..width {
                dst[row + x * 4 + c] = ((sum + size / 2) / size) as u8;
                let xi = x as isize;
                sum = sum + at(xi + r + 1) - at(xi - r);
            }
        }
    }
}

fn box_blur_vertical(src: &[u8], dst: &mut [u8], width: usize, height: usize, radius: usize) {
    let size = (2 * radius + 1) as u32;
    let last = height as isize - 1;
    let r = radius as isize;
    let stride = width * 4;
    for x in 0..width {
        for c in 0..4 {
            let col = x * 4 + c;
            let at = |y: isize| u32::from(src[y.clamp(0, last) as usize * stride + col]);
            let mut sum: u32 = (-r..=r).map(at).sum();
            for y in 0..height {
                dst[y * stride + col] = ((sum + size / 2) / size) as u8;
                let yi = y as isize;
                sum = sum + at(yi + r + 1) - at(yi - r);
            }
        }
    }
}

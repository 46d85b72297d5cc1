use crate::mask::Mask;
use crate::surface::Surface;
use anyhow::{bail, Result};
use image::{imageops, RgbaImage};
use ndarray::{Array4, ArrayViewD};

/// Converts frames to model input tensors and model mattes to masks
pub struct Preprocessor {
    target_width: u32,
    target_height: u32,
}

impl Preprocessor {
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
        }
    }

    /// Preprocess a frame into a normalized NCHW tensor
    ///
    /// Steps:
    /// 1. Resize to target dimensions (Lanczos3)
    /// 2. Convert RGB to float and normalize to [0, 1]; alpha is dropped
    /// 3. Transpose from HWC to NCHW format
    ///
    /// Returns: Array4<f32> with shape [1, 3, height, width]
    pub fn preprocess(&mut self, frame: &Surface) -> Result<Array4<f32>> {
        let _span = tracing::debug_span!("preprocess").entered();

        let resized: RgbaImage;
        let source = if frame.dimensions() == (self.target_width, self.target_height) {
            frame.as_image()
        } else {
            resized = imageops::resize(
                frame.as_image(),
                self.target_width,
                self.target_height,
                imageops::FilterType::Lanczos3,
            );
            &resized
        };

        let (width, height) = source.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
        for (i, px) in source.as_raw().chunks_exact(4).enumerate() {
            let (y, x) = (i / width as usize, i % width as usize);
            for c in 0..3 {
                tensor[[0, c, y, x]] = f32::from(px[c]) / 255.0;
            }
        }
        Ok(tensor)
    }

    /// Turn a `[1, 1, H, W]` alpha tensor into a mask at model resolution
    pub fn matte_to_mask(matte: &ArrayViewD<f32>) -> Result<Mask> {
        let shape = matte.shape();
        if shape.len() != 4 || shape[0] != 1 || shape[1] != 1 {
            bail!("Unexpected matte shape {:?}", shape);
        }
        let (height, width) = (shape[2] as u32, shape[3] as u32);
        let values: Vec<f32> = matte.iter().copied().collect();
        Ok(Mask::from_matte(&values, width, height))
    }
}

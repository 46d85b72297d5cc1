use crate::mask::Mask;
use crate::surface::Surface;
use anyhow::Result;

/// Trait for segmentation models
/// Allows swapping between different backends (RVM, MODNet, MediaPipe, etc.)
pub trait SegmentationModel {
    /// Whether the model can serve `segment` yet
    fn is_ready(&self) -> bool {
        true
    }

    /// Foreground mask for a frame
    ///
    /// The mask may be at the model's own resolution; the compositor
    /// stretches it over the frame.
    fn segment(&mut self, frame: &Surface) -> Result<Mask>;

    /// Reset internal state (for models with temporal/recurrent components)
    ///
    /// Call this when:
    /// - Switching cameras
    /// - Scene cuts detected
    /// - Starting a new video session
    fn reset_state(&mut self) {}

    /// Get the model's preferred input dimensions
    ///
    /// Returns (width, height)
    fn input_size(&self) -> (u32, u32);
}

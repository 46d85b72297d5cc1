//! Virtual camera outputs

#[cfg(feature = "devices")]
mod loopback;

#[cfg(feature = "devices")]
pub use loopback::V4L2Output;

use crate::surface::Surface;
use anyhow::Result;

/// Trait for output destinations
pub trait OutputSink {
    /// Write a frame to the output, scaling it if needed
    fn write_frame(&mut self, frame: &Surface) -> Result<()>;

    /// Get the expected output resolution
    fn resolution(&self) -> (u32, u32);
}

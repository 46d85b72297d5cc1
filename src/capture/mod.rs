//! Camera sources

#[cfg(feature = "devices")]
mod v4l_capture;

#[cfg(feature = "devices")]
pub use v4l_capture::WebcamCapture;

use crate::surface::VideoFrame;
use anyhow::Result;

/// Trait for camera capture sources
pub trait CaptureSource {
    /// Capture a single frame, tagged with the device's native resolution
    fn capture_frame(&mut self) -> Result<VideoFrame>;

    /// Native resolution the device negotiated; zero until it is streaming
    fn resolution(&self) -> (u32, u32);
}

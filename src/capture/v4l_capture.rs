use super::CaptureSource;
use crate::surface::{Surface, VideoFrame};
use anyhow::{Context, Result};
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;

/// Webcam read through nokhwa's v4l backend
pub struct WebcamCapture {
    camera: Camera,
    width: u32,
    height: u32,
}

impl WebcamCapture {
    /// Open camera `device_index`, asking for `width × height`
    ///
    /// The device may settle on a different resolution; frames always carry
    /// whatever it actually streams.
    pub fn new(device_index: u32, width: u32, height: u32) -> Result<Self> {
        tracing::info!("Initializing webcam {} at {}x{}", device_index, width, height);

        let index = CameraIndex::Index(device_index);
        let highest = RequestedFormatType::HighestResolution(Resolution::new(width, height));
        let requested = RequestedFormat::new::<RgbAFormat>(highest);

        let mut camera = Camera::new(index, requested).context("Failed to open camera")?;
        camera.open_stream().context("Failed to open camera stream")?;

        let native = camera.resolution();
        if (native.width(), native.height()) != (width, height) {
            tracing::warn!(
                "Camera negotiated {}x{} instead of {}x{}",
                native.width(),
                native.height(),
                width,
                height
            );
        }
        tracing::info!("Webcam streaming at {}x{}", native.width(), native.height());

        Ok(Self {
            camera,
            width: native.width(),
            height: native.height(),
        })
    }
}

impl CaptureSource for WebcamCapture {
    fn capture_frame(&mut self) -> Result<VideoFrame> {
        let frame = self.camera.frame().context("Failed to capture frame")?;
        let decoded = frame.decode_image::<RgbAFormat>().context("Failed to decode frame")?;
        let pixels = Surface::from_image(decoded).context("Captured frame is too large")?;
        Ok(VideoFrame::new(self.width, self.height, pixels))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

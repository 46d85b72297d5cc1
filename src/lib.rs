//! Webcam background compositing and beauty filters
//!
//! [`FrameCompositor`] turns a camera frame and a segmentation [`Mask`] into
//! an output frame with the background passed through, blurred, or replaced
//! by an image, optionally mirrored and finished with cosmetic filters.
//! Everything runs on the CPU against reusable [`Surface`] buffers.
//!
//! ```no_run
//! use camola_fx::{Background, CompositeOptions, FrameCompositor, Mask, Surface};
//!
//! # fn main() -> anyhow::Result<()> {
//! let frame = Surface::new(640, 480)?;
//! let mask = Mask::uniform(640, 480, 255);
//! let mut output = Surface::empty();
//! let mut compositor = FrameCompositor::new();
//! let options = CompositeOptions::new(Background::blur(10.0)).mirrored(true);
//! compositor.composite_frame(&frame, &mask, &mut output, &options)?;
//! # Ok(())
//! # }
//! ```
//!
//! Camera capture, segmentation models, and virtual camera output live behind
//! the `devices` and `onnx` features.

pub mod background;
pub mod beauty;
pub mod capture;
pub mod compositor;
pub mod config;
pub mod error;
pub mod face;
pub mod mask;
pub mod output;
pub mod render;
pub mod segmentation;
pub mod surface;

pub use background::{
    preload_backgrounds, Background, BackgroundPreloader, BackgroundSpec, DefaultImageLoader,
    ImageLoader, PreloadedBackground,
};
pub use beauty::{
    BeautyFilter, BeautyFilterEngine, BeautyFilterKind, FacialBeautyEngine, FacialFilter,
    FacialFilterKind, FacialFilterOutcome, FacialFilterParams,
};
pub use compositor::{CompositeOutcome, FrameCompositor, SkipReason};
pub use config::{CompositeOptions, EffectsConfig};
pub use error::{CompositeError, ConfigError, FilterError, PreloadError, SurfaceError};
pub use face::{BoundingBox, FaceDetection, FaceDetector, LandmarkLayout, Point};
pub use mask::Mask;
pub use surface::{Color, FrameSource, Surface, VideoFrame};

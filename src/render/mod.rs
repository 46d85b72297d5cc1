//! CPU drawing primitives shared by the compositor and the filter engines

mod blend;
mod blur;
mod color;
mod paint;

pub use blend::{BlendMode, Rgba8};
pub use blur::GaussianBlur;
pub use color::{apply_color_filters, apply_color_filters_clipped, ColorFilter};
pub use paint::{blit, draw_image, fill, DrawOptions, Paint, RadialGradient, Shape};

pub(crate) use blend::mix;
pub(crate) use color::for_each_covered;

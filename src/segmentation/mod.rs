//! Foreground segmentation models

#[cfg(feature = "onnx")]
mod preprocess;
#[cfg(feature = "onnx")]
mod rvm;
pub mod types;

#[cfg(feature = "onnx")]
pub use preprocess::Preprocessor;
#[cfg(feature = "onnx")]
pub use rvm::RobustVideoMatting;
pub use types::SegmentationModel;

/// Create a default segmentation model (RVM)
#[cfg(feature = "onnx")]
pub fn create_default_model(model_path: &str) -> anyhow::Result<Box<dyn SegmentationModel>> {
    let model = RobustVideoMatting::new(model_path)?;
    Ok(Box::new(model))
}

use super::preprocess::Preprocessor;
use super::types::SegmentationModel;
use crate::mask::Mask;
use crate::surface::Surface;
use anyhow::{Context, Result};
use ndarray::{Array1, Array4, Ix4};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::path::Path;

/// RobustVideoMatting segmentation model
///
/// This model uses recurrent connections to maintain temporal consistency.
/// Hidden states (r1-r4) are carried between frames for smooth results.
pub struct RobustVideoMatting {
    session: Session,
    preprocessor: Preprocessor,
    width: u32,
    height: u32,

    // Recurrent hidden states, fed back in on the next frame.
    // `None` until the first frame or after a reset.
    state: Option<[Array4<f32>; 4]>,

    // Resolution of the internal encoder relative to the input
    downsample_ratio: f32,
}

impl RobustVideoMatting {
    /// Create a new RVM model from an ONNX file
    ///
    /// # Default Configuration
    /// - Input size: 512x512 (can be adjusted for performance/quality tradeoff)
    /// - Downsample ratio: 0.25
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        Self::with_input_size(model_path, 512, 512)
    }

    pub fn with_input_size<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let path = model_path.as_ref();

        tracing::info!("Loading RVM model from {}", path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        tracing::info!("RVM model loaded ({}x{} input)", width, height);

        Ok(Self {
            session,
            preprocessor: Preprocessor::new(width, height),
            width,
            height,
            state: None,
            downsample_ratio: 0.25,
        })
    }

    /// Zero recurrent state; the model broadcasts it to the right shape
    fn initial_state() -> [Array4<f32>; 4] {
        std::array::from_fn(|_| Array4::zeros((1, 1, 1, 1)))
    }
}

impl SegmentationModel for RobustVideoMatting {
    fn segment(&mut self, frame: &Surface) -> Result<Mask> {
        let _span = tracing::debug_span!("segment", model = "rvm").entered();

        let src = self.preprocessor.preprocess(frame)?;
        let [r1, r2, r3, r4] = self.state.take().unwrap_or_else(Self::initial_state);
        let ratio = Array1::from_elem(1, self.downsample_ratio);

        // RVM expects: src, r1i..r4i, downsample_ratio
        let inputs = vec![
            ("src", Value::from_array(src.into_dyn())?),
            ("r1i", Value::from_array(r1.into_dyn())?),
            ("r2i", Value::from_array(r2.into_dyn())?),
            ("r3i", Value::from_array(r3.into_dyn())?),
            ("r4i", Value::from_array(r4.into_dyn())?),
            ("downsample_ratio", Value::from_array(ratio.into_dyn())?),
        ];
        let outputs = {
            let _infer_span = tracing::debug_span!("inference").entered();
            self.session.run(inputs).context("Failed to run inference")?
        };

        // Outputs: fgr, pha, r1o..r4o; the foreground estimate is unused
        let mask = Preprocessor::matte_to_mask(&outputs["pha"].try_extract_array::<f32>()?)?;

        let recurrent = |name: &str| -> Result<Array4<f32>> {
            let state = outputs[name].try_extract_array::<f32>()?.to_owned();
            Ok(state.into_dimensionality::<Ix4>()?)
        };
        self.state = Some([
            recurrent("r1o")?,
            recurrent("r2o")?,
            recurrent("r3o")?,
            recurrent("r4o")?,
        ]);

        Ok(mask)
    }

    fn reset_state(&mut self) {
        tracing::info!("Resetting RVM hidden states");
        self.state = None;
    }

    fn input_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

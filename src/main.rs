use anyhow::{Context, Result};
use camola_fx::capture::{CaptureSource, WebcamCapture};
use camola_fx::output::{OutputSink, V4L2Output};
use camola_fx::segmentation::{self, SegmentationModel};
use camola_fx::{
    preload_backgrounds, BackgroundSpec, BeautyFilter, BeautyFilterKind, CompositeOptions,
    CompositeOutcome, EffectsConfig, FrameCompositor, Mask, Surface,
};
use clap::{Parser, ValueEnum};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackgroundMode {
    None,
    Blur,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BeautyMode {
    None,
    SkinSmoothing,
    BrightnessContrast,
    Highlight,
    SoftGlow,
    Sharpen,
    ColorBoost,
}

impl From<BeautyMode> for BeautyFilterKind {
    fn from(mode: BeautyMode) -> Self {
        match mode {
            BeautyMode::None => BeautyFilterKind::None,
            BeautyMode::SkinSmoothing => BeautyFilterKind::SkinSmoothing,
            BeautyMode::BrightnessContrast => BeautyFilterKind::BrightnessContrast,
            BeautyMode::Highlight => BeautyFilterKind::Highlight,
            BeautyMode::SoftGlow => BeautyFilterKind::SoftGlow,
            BeautyMode::Sharpen => BeautyFilterKind::Sharpen,
            BeautyMode::ColorBoost => BeautyFilterKind::ColorBoost,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Output v4l2loopback device path
    #[arg(short, long, default_value = "/dev/video10")]
    output_device: String,

    /// Capture resolution width
    #[arg(long, default_value_t = 1920)]
    capture_width: u32,

    /// Capture resolution height
    #[arg(long, default_value_t = 1080)]
    capture_height: u32,

    /// Output resolution width
    #[arg(long, default_value_t = 1280)]
    output_width: u32,

    /// Output resolution height
    #[arg(long, default_value_t = 720)]
    output_height: u32,

    /// Target frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Path to segmentation model (ONNX file)
    /// Without one the whole frame counts as foreground
    #[arg(long)]
    model: Option<String>,

    /// Show matte visualization (grayscale silhouette) instead of composited video
    #[arg(long)]
    show_matte: bool,

    /// What to draw behind the subject
    #[arg(long, value_enum, default_value_t = BackgroundMode::None)]
    background: BackgroundMode,

    /// Blur radius for the blur background
    #[arg(long, default_value_t = 10.0)]
    blur_radius: f32,

    /// Image file or http(s) URL for the image background
    #[arg(long)]
    background_image: Option<String>,

    /// Flip the output horizontally
    #[arg(long)]
    mirror: bool,

    /// Frame-wide beauty filter
    #[arg(long, value_enum, default_value_t = BeautyMode::None)]
    beauty: BeautyMode,

    /// Beauty filter strength in [0, 1]
    #[arg(long, default_value_t = 0.5)]
    beauty_intensity: f32,

    /// JSON effects preset; overrides the individual effect flags
    #[arg(long)]
    effects: Option<String>,
}

impl Args {
    fn effects_config(&self) -> Result<EffectsConfig> {
        if let Some(path) = &self.effects {
            tracing::info!("Loading effects preset from {}", path);
            return EffectsConfig::from_file(path).context("Failed to load effects preset");
        }

        let background = match self.background {
            BackgroundMode::None => BackgroundSpec::None,
            BackgroundMode::Blur => BackgroundSpec::blur(self.blur_radius),
            BackgroundMode::Image => {
                let src = self
                    .background_image
                    .clone()
                    .context("--background image needs --background-image")?;
                BackgroundSpec::image(src)
            }
        };
        let config = EffectsConfig {
            background,
            mirror: self.mirror,
            beauty_filter: Some(BeautyFilter::new(self.beauty.into(), self.beauty_intensity)),
            face_filters: Vec::new(),
        };
        config.validate().context("Invalid effect flags")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("Camola starting");
    tracing::info!("Capture: {}x{}", args.capture_width, args.capture_height);
    tracing::info!("Output: {}x{}", args.output_width, args.output_height);
    tracing::info!("Target FPS: {}", args.fps);

    let effects = args.effects_config()?;
    tracing::info!("Background: {:?}, mirror={}", effects.background, effects.mirror);
    let options = resolve_options(&effects)?;

    if !effects.face_filters.is_empty() {
        tracing::warn!(
            "{} face filter(s) configured but no face detector is available; they will be skipped",
            effects.face_filters.len()
        );
    }

    // Initialize capture
    let mut capture =
        WebcamCapture::new(args.input_device, args.capture_width, args.capture_height)
            .context("Failed to initialize webcam capture")?;

    // Initialize output
    let mut output =
        V4L2Output::new(&args.output_device, args.output_width, args.output_height)
            .context("Failed to initialize v4l2loopback output")?;

    // Initialize segmentation model if provided
    let model: Option<Box<dyn SegmentationModel>> = if let Some(model_path) = &args.model {
        let model = segmentation::create_default_model(model_path)
            .context("Failed to load segmentation model")?;
        Some(model)
    } else {
        tracing::info!("No segmentation model, treating the whole frame as foreground");
        None
    };

    let pipeline = Pipeline {
        model,
        options,
        show_matte: args.show_matte,
    };
    pipeline.run(&mut capture, &mut output, args.fps)
}

/// Preload the background image, if any, and resolve the compositor options
fn resolve_options(effects: &EffectsConfig) -> Result<CompositeOptions> {
    if !matches!(effects.background, BackgroundSpec::Image { .. }) {
        return Ok(effects.composite_options(None));
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start background loader runtime")?;
    let specs = std::slice::from_ref(&effects.background);
    let preloaded = runtime.block_on(preload_backgrounds(specs));

    let entry = preloaded.first();
    if let Some(error) = entry.and_then(|e| e.error.as_ref()) {
        tracing::error!("Background image unavailable, using black: {}", error);
    }
    Ok(effects.composite_options(entry))
}

struct Pipeline {
    model: Option<Box<dyn SegmentationModel>>,
    options: CompositeOptions,
    show_matte: bool,
}

impl Pipeline {
    fn run<C, O>(mut self, capture: &mut C, output: &mut O, target_fps: u32) -> Result<()>
    where
        C: CaptureSource,
        O: OutputSink,
    {
        let frame_duration = Duration::from_secs_f32(1.0 / target_fps.max(1) as f32);
        let mut frame_count = 0u64;
        let mut total_capture_time = Duration::ZERO;
        let mut total_segment_time = Duration::ZERO;
        let mut total_composite_time = Duration::ZERO;
        let mut total_output_time = Duration::ZERO;

        let mut compositor = FrameCompositor::new();
        let mut composed = Surface::empty();
        let full_foreground = Mask::uniform(1, 1, 255);

        tracing::info!("Starting main pipeline loop");
        if self.model.is_some() {
            tracing::info!("Segmentation enabled, show_matte={}", self.show_matte);
        }
        tracing::info!("Press Ctrl+C to stop");

        loop {
            let loop_start = Instant::now();

            // Capture frame
            let capture_start = Instant::now();
            let frame = capture.capture_frame().context("Failed to capture frame")?;
            total_capture_time += capture_start.elapsed();

            // Segmentation (if model is loaded and ready)
            let segment_start = Instant::now();
            let mask = match self.model.as_mut() {
                Some(model) if model.is_ready() => model
                    .segment(frame.pixels())
                    .context("Failed to segment frame")?,
                _ => full_foreground.clone(),
            };
            total_segment_time += segment_start.elapsed();

            // Composite
            let composite_start = Instant::now();
            let outcome = if self.show_matte {
                composed = mask.to_surface();
                CompositeOutcome::Composited
            } else {
                compositor.composite_frame(&frame, &mask, &mut composed, &self.options)?
            };
            total_composite_time += composite_start.elapsed();

            // Output frame; a skipped frame repeats the previous one
            let output_start = Instant::now();
            if let CompositeOutcome::Skipped(reason) = outcome {
                tracing::trace!("Frame {} not composited: {:?}", frame_count, reason);
            }
            if !composed.is_empty() {
                output.write_frame(&composed).context("Failed to write frame")?;
            }
            total_output_time += output_start.elapsed();

            frame_count += 1;

            // Log stats every 30 frames
            if frame_count % 30 == 0 {
                let avg = |total: Duration| total.as_secs_f64() * 1000.0 / frame_count as f64;
                let (capture_ms, segment_ms) = (avg(total_capture_time), avg(total_segment_time));
                let (composite_ms, output_ms) = (avg(total_composite_time), avg(total_output_time));
                let total_ms = capture_ms + segment_ms + composite_ms + output_ms;

                tracing::info!(
                    "Frame {}: capture={:.1}ms, segment={:.1}ms, composite={:.1}ms, \
                     output={:.1}ms, total={:.1}ms, fps={:.1}",
                    frame_count,
                    capture_ms,
                    segment_ms,
                    composite_ms,
                    output_ms,
                    total_ms,
                    1000.0 / total_ms
                );
            }

            // Frame rate limiting
            let elapsed = loop_start.elapsed();
            if elapsed < frame_duration {
                std::thread::sleep(frame_duration - elapsed);
            }
        }
    }
}

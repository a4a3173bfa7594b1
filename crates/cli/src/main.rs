use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use facemarks_core::capture::domain::capture_source::CaptureSource;
use facemarks_core::capture::infrastructure::nokhwa_camera::{
    list_cameras, CameraConfig, NokhwaCamera,
};
use facemarks_core::capture::infrastructure::still_image_source::StillImageSource;
use facemarks_core::detection::domain::landmark_detector::LandmarkDetector;
use facemarks_core::detection::infrastructure::onnx_face_mesh_detector::{
    MeshDetectorConfig, OnnxFaceMeshDetector,
};
use facemarks_core::imaging::domain::image_writer::ImageWriter;
use facemarks_core::imaging::infrastructure::image_file_reader::ImageFileReader;
use facemarks_core::imaging::infrastructure::image_file_writer::ImageFileWriter;
use facemarks_core::pipeline::annotate_image_use_case::AnnotateImageUseCase;
use facemarks_core::pipeline::frame_pipeline::{FramePipeline, PipelineConfig, PipelineOutput};
use facemarks_core::pipeline::live_session::LiveSession;
use facemarks_core::rendering::infrastructure::cpu_landmark_renderer::CpuLandmarkRenderer;
use facemarks_core::shared::constants::{
    DEFAULT_CAPTURE_FPS, DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH, DEFAULT_FRAME_BUFFER_SIZE,
    DEFAULT_MESH_CONFIDENCE, IMAGE_EXTENSIONS,
};

/// How long `live` waits for an annotated frame before giving up.
const OUTPUT_TIMEOUT: Duration = Duration::from_secs(10);

/// Facial landmark overlays for camera streams and images.
#[derive(Parser)]
#[command(name = "facemarks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Draw landmark contours onto a single image.
    Annotate {
        /// Input image file.
        input: PathBuf,

        /// Output image file.
        output: PathBuf,

        #[command(flatten)]
        models: ModelArgs,
    },

    /// Run a headless live session and save annotated frames.
    Live(LiveArgs),

    /// List available capture devices.
    Cameras,
}

#[derive(Args)]
struct ModelArgs {
    /// Face detector ONNX model (BlazeFace short range).
    #[arg(long)]
    detector_model: Option<PathBuf>,

    /// Face mesh ONNX model (468 or 478 landmarks).
    #[arg(long)]
    mesh_model: Option<PathBuf>,

    /// Face presence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_MESH_CONFIDENCE)]
    confidence: f64,
}

#[derive(Args)]
struct LiveArgs {
    /// Capture device index (default: first device).
    #[arg(long)]
    camera: Option<u32>,

    /// Requested capture width.
    #[arg(long, default_value_t = DEFAULT_CAPTURE_WIDTH)]
    width: u32,

    /// Requested capture height.
    #[arg(long, default_value_t = DEFAULT_CAPTURE_HEIGHT)]
    height: u32,

    /// Requested capture frame rate.
    #[arg(long, default_value_t = DEFAULT_CAPTURE_FPS)]
    fps: u32,

    /// Frames buffered while the detector is busy.
    #[arg(long, default_value_t = DEFAULT_FRAME_BUFFER_SIZE)]
    buffer_size: usize,

    /// Do not mirror frames horizontally.
    #[arg(long)]
    no_mirror: bool,

    /// Stop after this many annotated frames.
    #[arg(long, default_value = "30")]
    frames: usize,

    /// Save annotated frames as PNG into this directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Replay an image file instead of opening a camera.
    #[arg(long)]
    still: Option<PathBuf>,

    #[command(flatten)]
    models: ModelArgs,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli.command)?;

    match cli.command {
        Command::Annotate {
            input,
            output,
            models,
        } => run_annotate(&input, &output, &models),
        Command::Live(args) => run_live(&args),
        Command::Cameras => run_cameras(),
    }
}

fn run_annotate(
    input: &Path,
    output: &Path,
    models: &ModelArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let detector = build_detector(models)?;
    let mut use_case = AnnotateImageUseCase::new(
        Box::new(ImageFileReader::new()),
        Box::new(ImageFileWriter::new()),
        detector,
        Box::new(CpuLandmarkRenderer::default()),
    );
    let observation = use_case.execute(input, output)?;
    log::info!(
        "Face confidence {:.2}, {} regions",
        observation.confidence(),
        observation.region_count()
    );
    log::info!("Output written to {}", output.display());
    Ok(())
}

fn run_live(args: &LiveArgs) -> Result<(), Box<dyn std::error::Error>> {
    let detector = build_detector(&args.models)?;

    // Outputs beyond what the main thread keeps up with are skipped rather
    // than stalling the worker.
    let (output_tx, output_rx) = crossbeam_channel::bounded::<PipelineOutput>(2);
    let pipeline = FramePipeline::new(
        PipelineConfig {
            frame_buffer_size: args.buffer_size,
            mirror: !args.no_mirror,
        },
        detector,
        Box::new(CpuLandmarkRenderer::default()),
        Box::new(move |output| {
            let _ = output_tx.try_send(output);
        }),
    )?;

    let source: Box<dyn CaptureSource> = match &args.still {
        Some(path) => Box::new(StillImageSource::new(path, args.fps)),
        None => Box::new(NokhwaCamera::new(CameraConfig {
            device: args.camera,
            width: args.width,
            height: args.height,
            fps: args.fps,
        })),
    };
    let session = LiveSession::start(source, pipeline)?;

    let writer = ImageFileWriter::new();
    let mut received = 0;
    while received < args.frames {
        let output = match output_rx.recv_timeout(OUTPUT_TIMEOUT) {
            Ok(output) => output,
            Err(_) => {
                log::warn!(
                    "No annotated frame for {}s, stopping",
                    OUTPUT_TIMEOUT.as_secs()
                );
                break;
            }
        };
        received += 1;
        eprint!("\rAnnotated frame {received}/{}", args.frames);

        if let Some(dir) = &args.output_dir {
            let path = dir.join(format!("frame_{:06}.png", output.frame.sequence()));
            writer.write(&path, &output.frame)?;
        }
    }
    eprintln!();

    let stats = session.stop();
    eprintln!("Pipeline: {stats}");
    if let Some(dir) = &args.output_dir {
        log::info!("Frames written to {}", dir.display());
    }
    Ok(())
}

fn run_cameras() -> Result<(), Box<dyn std::error::Error>> {
    let cameras = list_cameras()?;
    if cameras.is_empty() {
        println!("No capture devices found");
    }
    for camera in cameras {
        println!("{}: {} ({})", camera.index, camera.name, camera.description);
    }
    Ok(())
}

fn build_detector(
    models: &ModelArgs,
) -> Result<Box<dyn LandmarkDetector>, Box<dyn std::error::Error>> {
    let config = MeshDetectorConfig {
        detector_model: models.detector_model.clone(),
        mesh_model: models.mesh_model.clone(),
        bundled_dir: bundled_model_dir(),
        confidence: models.confidence,
    };
    Ok(Box::new(OnnxFaceMeshDetector::new(&config)?))
}

/// `models/` next to the executable, for packaged installs.
fn bundled_model_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("models")))
}

fn validate(command: &Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Annotate {
            input,
            output,
            models,
        } => {
            if !input.exists() {
                return Err(format!("Input file not found: {}", input.display()).into());
            }
            if !is_image(output) {
                return Err(format!(
                    "Output must be an image file ({}), got {}",
                    IMAGE_EXTENSIONS.join(", "),
                    output.display()
                )
                .into());
            }
            validate_models(models)
        }
        Command::Live(args) => {
            if args.buffer_size == 0 {
                return Err("Buffer size must be at least 1".into());
            }
            if args.fps == 0 {
                return Err("Frame rate must be at least 1".into());
            }
            if args.width == 0 || args.height == 0 {
                return Err(format!(
                    "Capture size must be positive, got {}x{}",
                    args.width, args.height
                )
                .into());
            }
            if args.frames == 0 {
                return Err("Frame count must be at least 1".into());
            }
            if let Some(still) = &args.still {
                if !still.exists() {
                    return Err(format!("Still image not found: {}", still.display()).into());
                }
            }
            validate_models(&args.models)
        }
        Command::Cameras => Ok(()),
    }
}

fn validate_models(models: &ModelArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&models.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            models.confidence
        )
        .into());
    }
    for path in [&models.detector_model, &models.mesh_model].into_iter().flatten() {
        if !path.is_file() {
            return Err(format!("Model file not found: {}", path.display()).into());
        }
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

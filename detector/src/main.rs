mod camera;
mod delivery;
mod filter;
mod recorder;
mod storage;

use camera::RpiCamera;
use delivery::ftp::FtpUploader;
use delivery::teams::TeamsNotifier;
use delivery::Dispatcher;
use filter::diff::PixelDiffFilter;
use filter::scanner::MotionScanner;
use picam_motion_common::config::Config;
use recorder::counter::{recover_next_counter, ImageSequencer};
use recorder::keys::{CaptureNamer, NamingMode, IMAGE_EXTENSION};
use recorder::pipeline::PipelineController;
use recorder::scale::ScaleFactors;
use std::path::PathBuf;
use tracing::{error, info, warn};

const PROG_NAME: &str = env!("CARGO_BIN_NAME");
const PROG_VER: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.effective_level().parse().unwrap_or_default()),
        )
        .init();

    info!(
        version = PROG_VER,
        threshold = config.motion.threshold,
        sensitivity = config.motion.sensitivity,
        stream = format!("{}x{}", config.camera.stream_width, config.camera.stream_height),
        image = format!("{}x{}", config.camera.image_width, config.camera.image_height),
        "starting {PROG_NAME}"
    );

    if let Err(e) = storage::ensure_image_dir(&config.images.path) {
        error!(error = %e, "cannot prepare image storage");
        std::process::exit(1);
    }

    let mode = NamingMode::from_numbering(config.images.numbering);
    let namer = CaptureNamer::new(&config.images.path, &config.images.name_prefix, mode);
    let next = match mode {
        NamingMode::Numeric => recover_next_counter(
            &config.images.path,
            namer.prefix(),
            IMAGE_EXTENSION,
            config.images.num_start,
        ),
        NamingMode::Timestamp => config.images.num_start,
    };
    info!(?mode, next, path = config.images.path.display().to_string(), "capture naming ready");

    let uploader = config.ftp.clone().map(FtpUploader::new);
    let notifier = match config.teams.as_ref().map(TeamsNotifier::new).transpose() {
        Ok(n) => n,
        Err(e) => {
            error!(error = %e, "failed to build webhook client");
            std::process::exit(1);
        }
    };
    let image_base_url = config
        .teams
        .as_ref()
        .map(|t| t.image_base_url.clone())
        .unwrap_or_default();
    let dispatcher = Dispatcher::new(uploader, notifier, image_base_url);
    if dispatcher.is_empty() {
        warn!("no [ftp] or [teams] section configured, captures stay local");
    }

    let mut pipeline = PipelineController::new(
        RpiCamera::new(config.camera.clone()),
        MotionScanner::new(PixelDiffFilter::new(
            config.motion.threshold,
            config.motion.sensitivity,
        )),
        namer,
        ImageSequencer::new(next),
        ScaleFactors::from_camera(&config.camera),
        dispatcher,
    );

    info!("scanning for motion");
    let interrupted = tokio::select! {
        result = pipeline.run() => {
            if let Err(e) = result {
                error!(error = %e, "camera failure, exiting");
                std::process::exit(1);
            }
            false
        }
        _ = tokio::signal::ctrl_c() => true,
    };

    if interrupted {
        let abandoned = pipeline.pending_deliveries();
        if abandoned > 0 {
            warn!(abandoned, "interrupted with deliveries still running, they will not complete");
        }
        info!(
            state = ?pipeline.state(),
            next_sequence = pipeline.next_sequence(),
            "interrupt received, exiting {PROG_NAME} {PROG_VER}"
        );
    }
}

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use birdview::telemetry::FileSink;
use birdview::{
    DEFAULT_FPS, DEFAULT_LOG_FILE, FrameSize, InputSpec, PipelineConfig, QuitSignal, Telemetry,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "birdview",
    version,
    about = "Bird's-eye-view picture-in-picture video processor",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,

    /// Output frame width.
    #[arg(long, global = true, default_value_t = 1280)]
    width: u32,

    /// Output frame height.
    #[arg(long, global = true, default_value_t = 800)]
    height: u32,

    /// Append-only processing log.
    #[arg(long, global = true, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Do not watch stdin for `q` (non-interactive runs).
    #[arg(long, global = true, default_value_t = false)]
    no_quit_key: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process a video file (requires `ffmpeg` and `ffprobe` on PATH).
    Video {
        /// Input video.
        input: PathBuf,
        /// Output MP4 path.
        output: Option<PathBuf>,
    },
    /// Process a directory of JPEG/PNG stills in file-name order.
    Images {
        /// Directory of images.
        dir: PathBuf,
        /// Output MP4 path.
        output: Option<PathBuf>,
        /// Output frame rate.
        #[arg(value_parser = parse_fps, default_value_t = DEFAULT_FPS)]
        fps: f64,
    },
}

fn parse_fps(s: &str) -> Result<f64, String> {
    birdview::parse_positive_fps(s).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let telemetry = Arc::new(Telemetry::new(Arc::new(FileSink::open_or_console(
        &cli.log_file,
    ))));

    let frame_size = match FrameSize::new(cli.width, cli.height) {
        Ok(size) => size,
        Err(e) => {
            telemetry.error(format!("Invalid frame size: {e}"));
            return ExitCode::from(2);
        }
    };
    let config = PipelineConfig {
        frame_size,
        ..PipelineConfig::default()
    };

    let (input, output) = match cli.cmd {
        Command::Video { input, output } => (InputSpec::Video { path: input }, output),
        Command::Images { dir, output, fps } => (InputSpec::Images { dir, fps }, output),
    };
    let output = output.unwrap_or_else(|| input.default_output());

    let quit = QuitSignal::new();
    if !cli.no_quit_key {
        match quit.watch_stdin() {
            Ok(()) => telemetry.info("Type q + Enter to stop processing"),
            Err(e) => telemetry.warn(format!("Quit key unavailable: {e}")),
        }
    }

    let report = birdview::process_input(&input, &output, &config, telemetry, &quit);
    ExitCode::from(report.exit_code())
}

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use colored::Colorize;
use huegene_reel::{
    ExitPolicy, FfmpegLogLevel, OperationType, Orchestrator, ProgressCallback, ProgressInfo,
    ReelOptions, RunSummary, VideoCodec, VideoEncoderOptions,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  huegene-reel\n  huegene-reel --working-dir run1 --fps 30 --hold-ms 40\n  huegene-reel --skip-generator --keep-frames --progress\n  huegene-reel --completions zsh > _huegene-reel";

#[derive(Debug, Parser)]
#[command(
    name = "huegene-reel",
    version,
    about = "Run Huegene and assemble its frames into a video",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Directory containing the generator (default: directory of this binary).
    #[arg(long)]
    install_root: Option<PathBuf>,

    /// Generator executable name, relative to the install root.
    #[arg(long)]
    generator: Option<PathBuf>,

    /// Working directory for the generator, frames, and output (default: current directory).
    #[arg(long)]
    working_dir: Option<PathBuf>,

    /// Frame directory, relative to the working directory.
    #[arg(long, default_value = "Images")]
    images: PathBuf,

    /// Output video path, relative to the working directory.
    #[arg(long, default_value = "test.mp4")]
    output: PathBuf,

    /// How long each frame stays on screen, in milliseconds.
    #[arg(long, default_value_t = 30)]
    hold_ms: u64,

    /// Output frame rate.
    #[arg(long, default_value_t = 24)]
    fps: u32,

    /// Video codec (h264, h265, mpeg4).
    #[arg(long, default_value = "h264")]
    codec: String,

    /// Constant Rate Factor for h264/h265 (0-51, lower is better).
    #[arg(long, default_value_t = 23)]
    crf: u32,

    /// Stop before assembly if the generator exits unsuccessfully.
    #[arg(long)]
    abort_on_failure: bool,

    /// Do not launch the generator; assemble existing frames only.
    #[arg(long)]
    skip_generator: bool,

    /// Leave the frames on disk after a successful encode.
    #[arg(long)]
    keep_frames: bool,

    /// Show a progress bar while encoding.
    #[arg(long)]
    progress: bool,

    /// Print the run summary as JSON.
    #[arg(long)]
    json: bool,

    /// FFmpeg log level (quiet, fatal, error, warning, info, debug).
    #[arg(long)]
    ffmpeg_log_level: Option<String>,

    /// Show debug logging.
    #[arg(long)]
    verbose: bool,

    /// Print shell completions and exit.
    #[arg(long, value_enum)]
    completions: Option<Shell>,
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        bar.set_message("encoding");
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if info.operation != OperationType::Encoding {
            return;
        }
        if let Some(total) = info.total {
            self.bar.set_length(total);
            if info.current >= total {
                self.bar.finish_with_message("encoded");
                return;
            }
        }
        self.bar.set_position(info.current);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn build_options(cli: &Cli) -> Result<ReelOptions, Box<dyn std::error::Error>> {
    let codec = VideoCodec::from_name(&cli.codec).ok_or(format!("unsupported --codec: {}", cli.codec))?;
    if cli.hold_ms == 0 {
        return Err("--hold-ms must be greater than 0".into());
    }
    if cli.fps == 0 {
        return Err("--fps must be greater than 0".into());
    }

    let mut options = ReelOptions::new()
        .with_images_directory(&cli.images)
        .with_output(&cli.output)
        .with_hold(Duration::from_millis(cli.hold_ms))
        .with_frame_rate(cli.fps)
        .with_encoder(VideoEncoderOptions::default().codec(codec).crf(cli.crf));

    if let Some(root) = &cli.install_root {
        options = options.with_install_root(root);
    }
    if let Some(generator) = &cli.generator {
        options = options.with_generator(generator);
    }
    if let Some(directory) = &cli.working_dir {
        options = options.with_working_directory(directory);
    }
    if cli.abort_on_failure {
        options = options.with_exit_policy(ExitPolicy::Abort);
    }
    if cli.skip_generator {
        options = options.skip_generator();
    }
    if cli.keep_frames {
        options = options.keep_frames();
    }
    if cli.progress {
        options = options.with_progress(Arc::new(TerminalProgress::new()?));
    }

    Ok(options)
}

fn print_summary(summary: &RunSummary, as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if as_json {
        let payload = json!({
            "generator": summary.generator.as_ref().map(|report| json!({
                "exit_code": report.code(),
                "success": report.success(),
                "stdout_lines": report.stdout_lines,
                "stderr": report.stderr,
            })),
            "frames": summary.frames,
            "encoded_frames": summary.encoded_frames,
            "output": summary.output.display().to_string(),
            "removed": summary.removed,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!(
        "{} {}",
        "success:".green().bold(),
        format!(
            "Wrote {} ({} frame(s) -> {} encoded, {} removed)",
            summary.output.display(),
            summary.frames,
            summary.encoded_frames,
            summary.removed,
        )
        .green()
    );
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "huegene-reel", &mut std::io::stdout());
        return Ok(());
    }

    init_logging(cli.verbose);

    if let Some(level) = &cli.ffmpeg_log_level {
        huegene_reel::set_ffmpeg_log_level(level.parse::<FfmpegLogLevel>()?);
    }

    let options = build_options(&cli)?;

    let output = options.output_path()?;
    if output.exists() {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("overwriting {}", output.display()).yellow()
        );
    }

    let summary = Orchestrator::new(options).run()?;
    print_summary(&summary, cli.json)
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

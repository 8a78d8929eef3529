use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use live_visualiser_core::{AppConfig, SystemClock, Transition};
use tracing_subscriber::EnvFilter;

mod backend;
mod capture;
#[cfg(feature = "projectm")]
mod projectm;
mod window;

use backend::NativeBackend;

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let config = match cli.into_config() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "critical: could not load configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("starting live visualiser");
    tracing::info!("use the left/right arrow keys to change presets, escape to quit");

    let mut backend = NativeBackend;
    match live_visualiser_core::run(&mut backend, &config, &SystemClock::start()) {
        Ok(report) => {
            tracing::info!(
                frames = report.frames,
                audio_feeds = report.audio_feeds,
                silence_feeds = report.silence_feeds,
                "render loop finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(%err, "critical: initialisation failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Visualise live system audio with projectM", long_about = None)]
struct Cli {
    /// JSON configuration file; flags below override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory scanned recursively for presets.
    #[arg(long)]
    preset_dir: Option<PathBuf>,

    /// Preset file to load on startup, after the directory scan.
    #[arg(short, long)]
    preset: Option<PathBuf>,

    /// Font directory handed to the engine.
    #[arg(long)]
    font_dir: Option<PathBuf>,

    /// Open a regular window instead of going fullscreen.
    #[arg(long)]
    windowed: bool,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Switch presets instantly instead of blending.
    #[arg(long)]
    hard_cut: bool,

    /// Milliseconds without audio before silence is fed to the engine.
    #[arg(long)]
    silence_ms: Option<u64>,

    /// Delay after each presented frame, in milliseconds.
    #[arg(long)]
    frame_delay_ms: Option<u64>,
}

impl Cli {
    fn into_config(self) -> live_visualiser_core::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::default(),
        };

        if let Some(directory) = self.preset_dir {
            config.presets.directory = directory;
        }
        if let Some(preset) = self.preset {
            config.presets.preset_file = Some(preset);
        }
        if let Some(fonts) = self.font_dir {
            config.presets.font_directory = fonts;
        }
        if self.windowed {
            config.window.fullscreen = false;
        }
        if let Some(width) = self.width {
            config.window.width = width;
        }
        if let Some(height) = self.height {
            config.window.height = height;
        }
        if self.hard_cut {
            config.presets.navigation = Transition::HardCut;
        }
        if let Some(ms) = self.silence_ms {
            config.pump.silence_threshold_ms = ms;
        }
        if let Some(ms) = self.frame_delay_ms {
            config.pump.frame_delay_ms = ms;
        }

        Ok(config)
    }
}

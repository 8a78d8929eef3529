//! Ownership and lifetime of everything the visualiser talks to.
//!
//! A [`Visualiser`] is created by running the initialisation stages in a
//! fixed order (audio, surface, engine) against a [`Backend`]. Any stage
//! failing is fatal; the stages that already succeeded are released in
//! reverse order before the error is returned. On a clean exit
//! [`Visualiser::shutdown`] tears down playlist, engine, audio and surface,
//! in that order.

use crate::{
    audio::{capture_channel, AudioSource, CaptureReader, CaptureStats, CaptureWriter},
    engine::{load_presets, PresetPlaylist, PresetSummary, VisualizationEngine},
    pump::{FramePump, PumpReport},
    surface::{PresentationSurface, SurfaceSize},
    timeline::FrameClock,
    AppConfig, AudioConfig, Result, WindowConfig,
};

/// Factory for the native collaborators.
pub trait Backend {
    type Audio: AudioSource;
    type Surface: PresentationSurface;
    type Engine: VisualizationEngine;
    type Playlist: PresetPlaylist;

    /// Connects to the audio server and starts delivering captured periods
    /// into `writer`.
    fn connect_audio(&mut self, config: &AudioConfig, writer: CaptureWriter)
        -> Result<Self::Audio>;

    /// Creates the window and makes its GL context current on this thread.
    fn open_surface(&mut self, config: &WindowConfig) -> Result<Self::Surface>;

    /// Creates the engine and its playlist for a surface of `size`. Must run
    /// after [`Backend::open_surface`] because the engine compiles shaders
    /// against the current context.
    fn create_engine(
        &mut self,
        config: &AppConfig,
        size: SurfaceSize,
    ) -> Result<(Self::Engine, Self::Playlist)>;
}

/// Explicit context object owning every handle for the life of the program.
pub struct Visualiser<B: Backend> {
    // Declaration order is drop order: playlist before engine, both before
    // the audio stream, the window last.
    pub(crate) playlist: B::Playlist,
    pub(crate) engine: B::Engine,
    pub(crate) audio: B::Audio,
    pub(crate) surface: B::Surface,
    pub(crate) capture: CaptureReader,
    monitor: CaptureWriter,
    presets: PresetSummary,
}

impl<B: Backend> Visualiser<B> {
    /// Runs every initialisation stage, stopping at the first failure.
    pub fn initialise(backend: &mut B, config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let layout = config.audio.layout();
        let (writer, capture) = capture_channel(layout);

        tracing::info!(
            sample_rate = layout.sample_rate(),
            channels = layout.channels(),
            frames = layout.frames(),
            "connecting audio capture"
        );
        let audio = backend.connect_audio(&config.audio, writer.clone())?;

        tracing::info!("opening presentation surface");
        let surface = backend.open_surface(&config.window)?;
        let size = surface.size();
        tracing::info!(width = size.width, height = size.height, "surface ready");

        tracing::info!("creating visualisation engine");
        let (mut engine, mut playlist) = backend.create_engine(config, size)?;
        let presets = load_presets(&mut engine, &mut playlist, &config.presets);

        Ok(Self {
            playlist,
            engine,
            audio,
            surface,
            capture,
            monitor: writer,
            presets,
        })
    }

    pub fn presets(&self) -> &PresetSummary {
        &self.presets
    }

    pub fn capture_stats(&self) -> CaptureStats {
        self.monitor.stats()
    }

    /// Runs the frame pump until a quit event arrives.
    pub fn run<C: FrameClock>(&mut self, config: &AppConfig, clock: &C) -> PumpReport {
        FramePump::new(self, config, clock).run()
    }

    /// Releases every handle in teardown order.
    pub fn shutdown(self) {
        let stats = self.capture_stats();
        tracing::info!(
            stored = stats.stored,
            empty = stats.empty,
            truncated_frames = stats.truncated_frames,
            overwritten = stats.overwritten,
            "shutting down"
        );

        let Self {
            playlist,
            engine,
            audio,
            surface,
            ..
        } = self;
        drop(playlist);
        drop(engine);
        drop(audio);
        drop(surface);
        tracing::info!("cleanup complete");
    }
}

/// Initialises, runs until quit, and shuts down.
pub fn run<B: Backend, C: FrameClock>(
    backend: &mut B,
    config: &AppConfig,
    clock: &C,
) -> Result<PumpReport> {
    let mut visualiser = Visualiser::initialise(backend, config)?;
    tracing::info!("initialisation successful, starting render loop");
    let report = visualiser.run(config, clock);
    visualiser.shutdown();
    Ok(report)
}

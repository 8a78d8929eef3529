use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{PresetConfig, SampleFrame, SurfaceSize};

/// How the engine switches from one preset to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Blend using the engine's built-in transition effect.
    #[default]
    Smooth,
    /// Switch instantly.
    HardCut,
}

impl Transition {
    pub fn is_hard_cut(self) -> bool {
        matches!(self, Transition::HardCut)
    }
}

/// Preset-driven renderer that turns PCM into frames on the current GL
/// context.
///
/// Created once after the surface exists and destroyed once at shutdown,
/// always on the render thread.
pub trait VisualizationEngine {
    /// Hands one fixed-size interleaved period of audio to the engine.
    fn add_pcm(&mut self, frame: &SampleFrame);

    /// Renders one frame into the currently bound context.
    fn render(&mut self);

    fn resize(&mut self, size: SurfaceSize);

    fn load_preset_file(&mut self, path: &Path, transition: Transition);
}

/// Ordered preset list driving the engine. This program never inspects its
/// contents; it only fills it and steps through it.
pub trait PresetPlaylist {
    /// Adds every preset under `directory` and returns how many were added.
    /// With `allow_duplicates` a preset already in the list is added again.
    fn add_path(&mut self, directory: &Path, recursive: bool, allow_duplicates: bool) -> u32;

    fn play_next(&mut self, transition: Transition);

    fn play_previous(&mut self, transition: Transition);
}

/// Result of filling the playlist at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetSummary {
    pub directory: PathBuf,
    pub added: u32,
    pub explicit: Option<PathBuf>,
}

impl PresetSummary {
    /// Nothing was scanned and nothing was loaded explicitly, so the engine
    /// will show its idle preset.
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.explicit.is_none()
    }
}

/// Scans the preset directory into the playlist, then loads the explicit
/// preset file, if any, on top of it.
///
/// An empty directory is not an error: the engine still runs, it just has
/// nothing to switch between.
pub fn load_presets<E, P>(engine: &mut E, playlist: &mut P, config: &PresetConfig) -> PresetSummary
where
    E: VisualizationEngine + ?Sized,
    P: PresetPlaylist + ?Sized,
{
    let added = playlist.add_path(&config.directory, config.recursive, config.allow_duplicates);
    tracing::info!(added, directory = ?config.directory, "scanned preset directory");
    if added == 0 {
        tracing::warn!(directory = ?config.directory, "no presets found");
    }

    if let Some(path) = &config.preset_file {
        engine.load_preset_file(path, Transition::HardCut);
        tracing::info!(?path, "loaded preset file");
    } else if added > 0 {
        tracing::debug!("no preset file given, playlist starts at its first entry");
    }

    let summary = PresetSummary {
        directory: config.directory.clone(),
        added,
        explicit: config.preset_file.clone(),
    };
    if summary.is_empty() {
        tracing::warn!("no presets available, the engine will show its idle preset");
    }
    summary
}

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{FrameLayout, Result, Transition, VizError};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub presets: PresetConfig,
    pub window: WindowConfig,
    pub pump: PumpConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing fields fall back to their
    /// defaults so a file only needs to name what it changes.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would make a buffer, a window or the engine mesh
    /// degenerate.
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(VizError::config("audio.sample_rate must be positive"));
        }
        if self.audio.channels == 0 {
            return Err(VizError::config("audio.channels must be positive"));
        }
        if self.audio.frames_per_period == 0 {
            return Err(VizError::config("audio.frames_per_period must be positive"));
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(VizError::config(format!(
                "window size {}x{} is empty",
                self.window.width, self.window.height
            )));
        }
        if self.presets.mesh_cell == 0 {
            return Err(VizError::config("presets.mesh_cell must be positive"));
        }
        Ok(())
    }
}

/// Configuration specific to the audio subsystem.
///
/// The capture stream is negotiated with exactly this layout; samples are
/// always signed 16-bit little-endian.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub frames_per_period: usize,
}

impl AudioConfig {
    pub fn layout(&self) -> FrameLayout {
        FrameLayout::new(self.sample_rate, self.channels, self.frames_per_period)
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            frames_per_period: 512,
        }
    }
}

/// Where presets come from and how the playlist moves between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetConfig {
    pub directory: PathBuf,
    /// Loaded directly after the directory scan when present.
    pub preset_file: Option<PathBuf>,
    pub font_directory: PathBuf,
    pub recursive: bool,
    /// Lets the scan add a preset that is already in the playlist.
    pub allow_duplicates: bool,
    pub navigation: Transition,
    /// Engine mesh resolution is the window size divided by this cell size.
    pub mesh_cell: u32,
}

impl Default for PresetConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("/usr/share/projectM/presets/"),
            preset_file: None,
            font_directory: PathBuf::from("/usr/share/projectM/fonts/"),
            recursive: true,
            allow_duplicates: true,
            navigation: Transition::Smooth,
            mesh_cell: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Live Visualiser".to_string(),
            width: 800,
            height: 600,
            fullscreen: true,
            vsync: true,
        }
    }
}

/// Timing knobs for the frame pump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PumpConfig {
    /// How long the engine may go without real audio before it is fed a
    /// silent frame.
    pub silence_threshold_ms: u64,
    /// Coarse frame-rate cap applied after every present.
    pub frame_delay_ms: u64,
}

impl PumpConfig {
    pub fn silence_threshold(&self) -> Duration {
        Duration::from_millis(self.silence_threshold_ms)
    }

    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            silence_threshold_ms: 30,
            frame_delay_ms: 10,
        }
    }
}

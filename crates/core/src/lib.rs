//! Core library for the live visualiser.
//!
//! The crate owns everything that does not need a native library: the
//! single-slot handoff between the audio callback thread and the render
//! thread, the frame pump that drives the engine, configuration, and the
//! traits behind which the audio server, the visualisation engine and the
//! window live. The application crate supplies the native implementations.

pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod pump;
pub mod session;
pub mod surface;
pub mod timeline;

#[cfg(test)]
mod testing;

pub use audio::{
    capture_channel, AudioSource, CaptureChunk, CaptureOutcome, ChunkData, CaptureReader, CaptureStats,
    CaptureWriter, FrameLayout, SampleFrame,
};
pub use config::{AppConfig, AudioConfig, PresetConfig, PumpConfig, WindowConfig};
pub use engine::{load_presets, PresetPlaylist, PresetSummary, Transition, VisualizationEngine};
pub use error::{Result, VizError};
pub use pump::{FramePump, PumpReport, PumpState};
pub use session::{run, Backend, Visualiser};
pub use surface::{InputEvent, KeyCommand, PresentationSurface, SurfaceSize};
pub use timeline::{FrameClock, SilenceTimer, SystemClock};

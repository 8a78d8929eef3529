use live_visualiser_core::{
    AppConfig, AudioConfig, Backend, CaptureWriter, Result, SurfaceSize, WindowConfig,
};

use crate::{capture::CpalCapture, window::GlWindowSurface};

#[cfg(feature = "projectm")]
use crate::projectm::{ProjectM, ProjectMPlaylist};

/// cpal capture, a winit/glutin window and, when built with the `projectm`
/// feature, libprojectM.
#[derive(Debug, Default)]
pub struct NativeBackend;

impl Backend for NativeBackend {
    type Audio = CpalCapture;
    type Surface = GlWindowSurface;
    #[cfg(feature = "projectm")]
    type Engine = ProjectM;
    #[cfg(feature = "projectm")]
    type Playlist = ProjectMPlaylist;
    #[cfg(not(feature = "projectm"))]
    type Engine = unavailable::Unavailable;
    #[cfg(not(feature = "projectm"))]
    type Playlist = unavailable::Unavailable;

    fn connect_audio(&mut self, config: &AudioConfig, writer: CaptureWriter) -> Result<CpalCapture> {
        CpalCapture::connect(config, writer)
    }

    fn open_surface(&mut self, config: &WindowConfig) -> Result<GlWindowSurface> {
        GlWindowSurface::open(config)
    }

    #[cfg(feature = "projectm")]
    fn create_engine(
        &mut self,
        config: &AppConfig,
        size: SurfaceSize,
    ) -> Result<(ProjectM, ProjectMPlaylist)> {
        ProjectM::create(config, size)
    }

    #[cfg(not(feature = "projectm"))]
    fn create_engine(
        &mut self,
        _config: &AppConfig,
        _size: SurfaceSize,
    ) -> Result<(Self::Engine, Self::Playlist)> {
        Err(live_visualiser_core::VizError::engine(
            "built with `--no-default-features`; rebuild with the `projectm` feature",
        ))
    }
}

#[cfg(not(feature = "projectm"))]
mod unavailable {
    use std::path::Path;

    use live_visualiser_core::{
        PresetPlaylist, SampleFrame, SurfaceSize, Transition, VisualizationEngine,
    };

    /// Stand-in engine type for builds without libprojectM. It has no
    /// values, so engine creation can only fail.
    #[derive(Debug)]
    pub enum Unavailable {}

    impl VisualizationEngine for Unavailable {
        fn add_pcm(&mut self, _frame: &SampleFrame) {
            match *self {}
        }

        fn render(&mut self) {
            match *self {}
        }

        fn resize(&mut self, _size: SurfaceSize) {
            match *self {}
        }

        fn load_preset_file(&mut self, _path: &Path, _transition: Transition) {
            match *self {}
        }
    }

    impl PresetPlaylist for Unavailable {
        fn add_path(
            &mut self,
            _directory: &Path,
            _recursive: bool,
            _allow_duplicates: bool,
        ) -> u32 {
            match *self {}
        }

        fn play_next(&mut self, _transition: Transition) {
            match *self {}
        }

        fn play_previous(&mut self, _transition: Transition) {
            match *self {}
        }
    }
}

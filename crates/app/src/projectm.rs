//! libprojectM 4 engine and playlist over its C API.

use std::{
    ffi::{c_char, c_int, c_uint, c_void, CString},
    os::unix::ffi::OsStrExt,
    path::Path,
    ptr::NonNull,
    rc::Rc,
};

use live_visualiser_core::{
    AppConfig, PresetPlaylist, Result, SampleFrame, SurfaceSize, Transition, VisualizationEngine,
    VizError,
};

mod ffi {
    use super::*;

    #[link(name = "projectM-4")]
    extern "C" {
        pub fn projectm_create() -> *mut c_void;
        pub fn projectm_destroy(instance: *mut c_void);
        pub fn projectm_set_window_size(instance: *mut c_void, width: usize, height: usize);
        pub fn projectm_set_mesh_size(instance: *mut c_void, width: usize, height: usize);
        pub fn projectm_pcm_add_int16(
            instance: *mut c_void,
            samples: *const i16,
            count: c_uint,
            channels: c_int,
        );
        pub fn projectm_opengl_render_frame(instance: *mut c_void);
        pub fn projectm_load_preset_file(
            instance: *mut c_void,
            filename: *const c_char,
            smooth_transition: bool,
        );
    }

    #[link(name = "projectM-4-playlist")]
    extern "C" {
        pub fn projectm_playlist_create(instance: *mut c_void) -> *mut c_void;
        pub fn projectm_playlist_destroy(playlist: *mut c_void);
        pub fn projectm_playlist_add_path(
            playlist: *mut c_void,
            path: *const c_char,
            recurse_subdirs: bool,
            allow_duplicates: bool,
        ) -> u32;
        pub fn projectm_playlist_play_next(playlist: *mut c_void, hard_cut: bool) -> u32;
        pub fn projectm_playlist_play_previous(playlist: *mut c_void, hard_cut: bool) -> u32;
    }
}

/// Owned `projectm_handle`, shared by the engine and its playlist so the
/// instance outlives whichever of the two is dropped last.
struct Instance(NonNull<c_void>);

impl Instance {
    fn as_ptr(&self) -> *mut c_void {
        self.0.as_ptr()
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        // SAFETY: created by `projectm_create` and destroyed exactly once.
        unsafe { ffi::projectm_destroy(self.as_ptr()) }
        tracing::debug!("projectM instance destroyed");
    }
}

fn c_path(path: &Path) -> Option<CString> {
    CString::new(path.as_os_str().as_bytes()).ok()
}

pub struct ProjectM {
    instance: Rc<Instance>,
    mesh_cell: u32,
}

impl ProjectM {
    /// Creates the engine and its playlist. A GL context must be current.
    pub fn create(config: &AppConfig, size: SurfaceSize) -> Result<(Self, ProjectMPlaylist)> {
        // SAFETY: plain constructor; null signals failure.
        let raw = unsafe { ffi::projectm_create() };
        let instance = NonNull::new(raw)
            .map(|ptr| Rc::new(Instance(ptr)))
            .ok_or_else(|| VizError::engine("failed to create projectM instance"))?;
        tracing::info!("projectM instance created");

        let mut engine = Self {
            instance,
            mesh_cell: config.presets.mesh_cell,
        };
        engine.resize(size);

        // SAFETY: the instance pointer is live for the duration of the call.
        let raw = unsafe { ffi::projectm_playlist_create(engine.instance.as_ptr()) };
        let playlist = NonNull::new(raw)
            .map(|handle| ProjectMPlaylist {
                handle,
                _instance: engine.instance.clone(),
            })
            .ok_or_else(|| VizError::engine("failed to create projectM playlist"))?;
        tracing::info!("projectM playlist created");

        if !config.presets.font_directory.is_dir() {
            tracing::debug!(directory = ?config.presets.font_directory, "font directory missing");
        }

        Ok((engine, playlist))
    }
}

impl VisualizationEngine for ProjectM {
    fn add_pcm(&mut self, frame: &SampleFrame) {
        let layout = frame.layout();
        // SAFETY: the slice holds `frames * channels` samples as promised by
        // the count and channel arguments.
        unsafe {
            ffi::projectm_pcm_add_int16(
                self.instance.as_ptr(),
                frame.samples().as_ptr(),
                layout.frames() as c_uint,
                c_int::from(layout.channels()),
            )
        }
    }

    fn render(&mut self) {
        // SAFETY: called on the thread owning the current GL context.
        unsafe { ffi::projectm_opengl_render_frame(self.instance.as_ptr()) }
    }

    fn resize(&mut self, size: SurfaceSize) {
        let (mesh_x, mesh_y) = size.mesh(self.mesh_cell);
        // SAFETY: the instance pointer is live.
        unsafe {
            ffi::projectm_set_window_size(
                self.instance.as_ptr(),
                size.width as usize,
                size.height as usize,
            );
            ffi::projectm_set_mesh_size(self.instance.as_ptr(), mesh_x as usize, mesh_y as usize);
        }
    }

    fn load_preset_file(&mut self, path: &Path, transition: Transition) {
        let Some(filename) = c_path(path) else {
            tracing::warn!(?path, "preset path contains a NUL byte");
            return;
        };
        // SAFETY: `filename` is NUL-terminated and outlives the call.
        unsafe {
            ffi::projectm_load_preset_file(
                self.instance.as_ptr(),
                filename.as_ptr(),
                !transition.is_hard_cut(),
            )
        }
    }
}

pub struct ProjectMPlaylist {
    handle: NonNull<c_void>,
    _instance: Rc<Instance>,
}

impl PresetPlaylist for ProjectMPlaylist {
    fn add_path(&mut self, directory: &Path, recursive: bool, allow_duplicates: bool) -> u32 {
        let Some(path) = c_path(directory) else {
            tracing::warn!(?directory, "preset directory contains a NUL byte");
            return 0;
        };
        // SAFETY: `path` is NUL-terminated and outlives the call.
        unsafe {
            ffi::projectm_playlist_add_path(
                self.handle.as_ptr(),
                path.as_ptr(),
                recursive,
                allow_duplicates,
            )
        }
    }

    fn play_next(&mut self, transition: Transition) {
        // SAFETY: the playlist handle is live.
        unsafe { ffi::projectm_playlist_play_next(self.handle.as_ptr(), transition.is_hard_cut()) };
    }

    fn play_previous(&mut self, transition: Transition) {
        // SAFETY: the playlist handle is live.
        unsafe {
            ffi::projectm_playlist_play_previous(self.handle.as_ptr(), transition.is_hard_cut())
        };
    }
}

impl Drop for ProjectMPlaylist {
    fn drop(&mut self) {
        // SAFETY: created by `projectm_playlist_create`; the instance it
        // points at is kept alive by `_instance` until after this call.
        unsafe { ffi::projectm_playlist_destroy(self.handle.as_ptr()) }
        tracing::debug!("projectM playlist destroyed");
    }
}

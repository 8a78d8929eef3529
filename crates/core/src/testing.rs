//! In-memory stand-ins for the native collaborators.

use std::{
    cell::RefCell,
    collections::VecDeque,
    path::{Path, PathBuf},
    rc::Rc,
};

use crate::{
    audio::{AudioSource, CaptureWriter, SampleFrame},
    engine::{PresetPlaylist, Transition, VisualizationEngine},
    session::Backend,
    surface::{InputEvent, PresentationSurface, SurfaceSize},
    AppConfig, AudioConfig, Result, VizError, WindowConfig,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Created(&'static str),
    Dropped(&'static str),
    AddPcm(Vec<i16>),
    Render,
    Resize(SurfaceSize),
    LoadPreset(PathBuf, Transition),
    AddPath(PathBuf, bool, bool),
    Next(Transition),
    Previous(Transition),
    Pump,
    Clear,
    Present,
    SurfaceResize(SurfaceSize),
}

/// Shared call log.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    calls: Rc<RefCell<Vec<Call>>>,
}

impl Recorder {
    pub fn push(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn contains(&self, predicate: impl Fn(&Call) -> bool) -> bool {
        self.calls.borrow().iter().any(predicate)
    }
}

pub struct FakeEngine {
    recorder: Recorder,
}

impl FakeEngine {
    pub fn new(recorder: &Recorder) -> Self {
        Self {
            recorder: recorder.clone(),
        }
    }
}

impl VisualizationEngine for FakeEngine {
    fn add_pcm(&mut self, frame: &SampleFrame) {
        self.recorder.push(Call::AddPcm(frame.samples().to_vec()));
    }

    fn render(&mut self) {
        self.recorder.push(Call::Render);
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.recorder.push(Call::Resize(size));
    }

    fn load_preset_file(&mut self, path: &Path, transition: Transition) {
        self.recorder
            .push(Call::LoadPreset(path.to_path_buf(), transition));
    }
}

impl Drop for FakeEngine {
    fn drop(&mut self) {
        self.recorder.push(Call::Dropped("engine"));
    }
}

pub struct FakePlaylist {
    recorder: Recorder,
    presets: u32,
}

impl FakePlaylist {
    pub fn new(recorder: &Recorder, presets: u32) -> Self {
        Self {
            recorder: recorder.clone(),
            presets,
        }
    }
}

impl PresetPlaylist for FakePlaylist {
    fn add_path(&mut self, directory: &Path, recursive: bool, allow_duplicates: bool) -> u32 {
        self.recorder.push(Call::AddPath(
            directory.to_path_buf(),
            recursive,
            allow_duplicates,
        ));
        self.presets
    }

    fn play_next(&mut self, transition: Transition) {
        self.recorder.push(Call::Next(transition));
    }

    fn play_previous(&mut self, transition: Transition) {
        self.recorder.push(Call::Previous(transition));
    }
}

impl Drop for FakePlaylist {
    fn drop(&mut self) {
        self.recorder.push(Call::Dropped("playlist"));
    }
}

/// Audio source that plays the capture thread's part: each pump delivers the
/// next scripted chunk, if any, through the writer.
pub struct FakeAudio {
    recorder: Recorder,
    writer: CaptureWriter,
    script: VecDeque<Option<Vec<i16>>>,
}

impl AudioSource for FakeAudio {
    fn pump(&mut self) {
        self.recorder.push(Call::Pump);
        if let Some(Some(samples)) = self.script.pop_front() {
            self.writer.write_samples(&samples);
        }
    }
}

impl Drop for FakeAudio {
    fn drop(&mut self) {
        self.recorder.push(Call::Dropped("audio"));
    }
}

/// Surface that replays scripted event batches and reports quit once the
/// script runs out.
pub struct FakeSurface {
    recorder: Recorder,
    size: SurfaceSize,
    script: VecDeque<Vec<InputEvent>>,
}

impl PresentationSurface for FakeSurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn poll_events(&mut self, events: &mut Vec<InputEvent>) {
        match self.script.pop_front() {
            Some(batch) => events.extend(batch),
            None => events.push(InputEvent::Quit),
        }
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.size = size;
        self.recorder.push(Call::SurfaceResize(size));
    }

    fn clear(&mut self) {
        self.recorder.push(Call::Clear);
    }

    fn present(&mut self) {
        self.recorder.push(Call::Present);
    }
}

impl Drop for FakeSurface {
    fn drop(&mut self) {
        self.recorder.push(Call::Dropped("surface"));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Audio,
    Surface,
    Engine,
}

pub struct FakeBackend {
    recorder: Recorder,
    fail_at: Option<FailAt>,
    presets: u32,
    audio: Vec<Option<Vec<i16>>>,
    events: Vec<Vec<InputEvent>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            recorder: Recorder::default(),
            fail_at: None,
            presets: 3,
            audio: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn failing_at(mut self, stage: FailAt) -> Self {
        self.fail_at = Some(stage);
        self
    }

    pub fn with_presets(mut self, presets: u32) -> Self {
        self.presets = presets;
        self
    }

    pub fn with_audio(mut self, audio: Vec<Option<Vec<i16>>>) -> Self {
        self.audio = audio;
        self
    }

    pub fn with_events(mut self, events: Vec<Vec<InputEvent>>) -> Self {
        self.events = events;
        self
    }

    pub fn recorder(&self) -> Recorder {
        self.recorder.clone()
    }
}

impl Backend for FakeBackend {
    type Audio = FakeAudio;
    type Surface = FakeSurface;
    type Engine = FakeEngine;
    type Playlist = FakePlaylist;

    fn connect_audio(&mut self, _config: &AudioConfig, writer: CaptureWriter) -> Result<FakeAudio> {
        if self.fail_at == Some(FailAt::Audio) {
            return Err(VizError::audio("no audio server"));
        }
        self.recorder.push(Call::Created("audio"));
        Ok(FakeAudio {
            recorder: self.recorder.clone(),
            writer,
            script: self.audio.drain(..).collect(),
        })
    }

    fn open_surface(&mut self, config: &WindowConfig) -> Result<FakeSurface> {
        if self.fail_at == Some(FailAt::Surface) {
            return Err(VizError::surface("no display"));
        }
        self.recorder.push(Call::Created("surface"));
        Ok(FakeSurface {
            recorder: self.recorder.clone(),
            size: SurfaceSize::new(config.width, config.height),
            script: self.events.drain(..).collect(),
        })
    }

    fn create_engine(
        &mut self,
        _config: &AppConfig,
        _size: SurfaceSize,
    ) -> Result<(FakeEngine, FakePlaylist)> {
        if self.fail_at == Some(FailAt::Engine) {
            return Err(VizError::engine("no engine"));
        }
        self.recorder.push(Call::Created("engine"));
        Ok((
            FakeEngine::new(&self.recorder),
            FakePlaylist::new(&self.recorder, self.presets),
        ))
    }
}

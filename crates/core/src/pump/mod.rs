use std::{mem, time::Duration};

use crate::{
    audio::{AudioSource, SampleFrame},
    engine::{PresetPlaylist, Transition, VisualizationEngine},
    session::{Backend, Visualiser},
    surface::{InputEvent, KeyCommand, PresentationSurface},
    timeline::{FrameClock, SilenceTimer},
    AppConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    Running,
    Stopped,
}

/// Counters accumulated over one run of the pump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpReport {
    pub iterations: u64,
    pub frames: u64,
    pub audio_feeds: u64,
    pub silence_feeds: u64,
    pub preset_commands: u64,
}

/// Single-threaded render loop.
///
/// Each iteration drains input, gives the audio source one non-blocking pass,
/// feeds the engine either the freshest captured period or, after a quiet
/// spell, a silent one, then clears, renders, presents and sleeps.
pub struct FramePump<'a, B: Backend, C: FrameClock> {
    visualiser: &'a mut Visualiser<B>,
    clock: &'a C,
    navigation: Transition,
    frame_delay: Duration,
    silence: SilenceTimer,
    scratch: SampleFrame,
    silent_frame: SampleFrame,
    events: Vec<InputEvent>,
    state: PumpState,
    report: PumpReport,
}

impl<'a, B: Backend, C: FrameClock> FramePump<'a, B, C> {
    pub fn new(visualiser: &'a mut Visualiser<B>, config: &AppConfig, clock: &'a C) -> Self {
        let layout = visualiser.capture.layout();
        Self {
            visualiser,
            clock,
            navigation: config.presets.navigation,
            frame_delay: config.pump.frame_delay(),
            silence: SilenceTimer::new(clock.now(), config.pump.silence_threshold()),
            scratch: SampleFrame::silent(layout),
            silent_frame: SampleFrame::silent(layout),
            events: Vec::new(),
            state: PumpState::Running,
            report: PumpReport::default(),
        }
    }

    pub fn state(&self) -> PumpState {
        self.state
    }

    pub fn report(&self) -> PumpReport {
        self.report
    }

    /// Loops until a quit event stops the pump.
    pub fn run(mut self) -> PumpReport {
        while self.step() == PumpState::Running {}
        self.report
    }

    /// Executes one iteration and returns the state afterwards.
    pub fn step(&mut self) -> PumpState {
        if self.state == PumpState::Stopped {
            return self.state;
        }
        self.report.iterations += 1;

        let mut events = mem::take(&mut self.events);
        self.visualiser.surface.poll_events(&mut events);
        for event in events.drain(..) {
            self.handle_event(event);
            if self.state == PumpState::Stopped {
                break;
            }
        }
        self.events = events;
        if self.state == PumpState::Stopped {
            return self.state;
        }

        self.visualiser.audio.pump();
        self.feed_engine();

        self.visualiser.surface.clear();
        self.visualiser.engine.render();
        self.visualiser.surface.present();
        self.report.frames += 1;

        self.clock.sleep(self.frame_delay);
        self.state
    }

    fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::Quit => {
                tracing::info!("quit requested");
                self.state = PumpState::Stopped;
            }
            InputEvent::Key(KeyCommand::NextPreset) => {
                self.visualiser.playlist.play_next(self.navigation);
                self.report.preset_commands += 1;
                tracing::info!("playlist: next");
            }
            InputEvent::Key(KeyCommand::PreviousPreset) => {
                self.visualiser.playlist.play_previous(self.navigation);
                self.report.preset_commands += 1;
                tracing::info!("playlist: previous");
            }
            InputEvent::Resized(size) => {
                tracing::debug!(width = size.width, height = size.height, "surface resized");
                self.visualiser.surface.resize(size);
                self.visualiser.engine.resize(size);
            }
        }
    }

    fn feed_engine(&mut self) {
        let now = self.clock.now();
        if self.visualiser.capture.try_consume_into(&mut self.scratch) {
            self.visualiser.engine.add_pcm(&self.scratch);
            self.silence.record_feed(now);
            self.report.audio_feeds += 1;
        } else if self.silence.is_silent(now) {
            // Keeps the engine's audio-driven animation moving while the
            // input is quiet or paused.
            self.visualiser.engine.add_pcm(&self.silent_frame);
            self.report.silence_feeds += 1;
        }
    }
}

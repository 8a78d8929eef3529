//! Live capture of system audio through cpal.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use live_visualiser_core::{AudioConfig, AudioSource, CaptureWriter, Result, VizError};

/// Notifications raised on the audio thread, drained on the render thread.
#[derive(Debug)]
enum StreamEvent {
    Error(String),
}

/// Devices a capture stream may be opened on, in order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureTarget {
    /// Monitor of the default sink, i.e. whatever is currently playing.
    OutputMonitor,
    /// Default capture source, usually a microphone.
    DefaultInput,
}

impl CaptureTarget {
    const PREFERENCE: [CaptureTarget; 2] = [
        CaptureTarget::OutputMonitor,
        CaptureTarget::DefaultInput,
    ];

    fn device(self, host: &cpal::Host) -> Option<cpal::Device> {
        match self {
            CaptureTarget::OutputMonitor => host.default_output_device(),
            CaptureTarget::DefaultInput => host.default_input_device(),
        }
    }
}

/// Running capture stream plus the queue its callbacks report into.
pub struct CpalCapture {
    // Dropping the stream stops the callbacks.
    _stream: cpal::Stream,
    events: Receiver<StreamEvent>,
    writer: CaptureWriter,
    streaming: bool,
}

impl CpalCapture {
    /// Opens the monitor of the default output device, falling back to the
    /// default input device when the host cannot capture from the sink.
    pub fn connect(config: &AudioConfig, writer: CaptureWriter) -> Result<Self> {
        let host = cpal::default_host();
        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let (sender, events) = channel::unbounded();

        let mut last_error = VizError::audio("no capture device available");
        for target in CaptureTarget::PREFERENCE {
            let Some(device) = target.device(&host) else {
                tracing::debug!(?target, "no device for capture target");
                continue;
            };
            match open_stream(&device, &stream_config, &writer, sender.clone()) {
                Ok(stream) => {
                    tracing::info!(
                        ?target,
                        device = %device_name(&device),
                        sample_rate = config.sample_rate,
                        channels = config.channels,
                        "capture stream connected"
                    );
                    return Ok(Self {
                        _stream: stream,
                        events,
                        writer,
                        streaming: false,
                    });
                }
                Err(err) => {
                    tracing::warn!(?target, %err, "capture target unavailable");
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }
}

fn device_name(device: &cpal::Device) -> String {
    device.name().unwrap_or_else(|_| "unknown".to_string())
}

fn open_stream(
    device: &cpal::Device,
    stream_config: &cpal::StreamConfig,
    writer: &CaptureWriter,
    sender: Sender<StreamEvent>,
) -> Result<cpal::Stream> {
    let name = device_name(device);
    let callback_writer = writer.clone();
    let stream = device
        .build_input_stream(
            stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                callback_writer.on_capture(data);
            },
            move |err| {
                let _ = sender.send(StreamEvent::Error(err.to_string()));
            },
            None,
        )
        .map_err(|err| VizError::audio(format!("failed to open stream on `{name}`: {err}")))?;

    stream
        .play()
        .map_err(|err| VizError::audio(format!("failed to start stream on `{name}`: {err}")))?;
    Ok(stream)
}

impl AudioSource for CpalCapture {
    fn pump(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(StreamEvent::Error(message)) => {
                    tracing::warn!(%message, "capture stream error");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        if !self.streaming && self.writer.has_captured() {
            self.streaming = true;
            tracing::info!("capture stream is streaming");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_output_is_tried_before_the_microphone() {
        assert_eq!(
            CaptureTarget::PREFERENCE,
            [CaptureTarget::OutputMonitor, CaptureTarget::DefaultInput]
        );
    }
}

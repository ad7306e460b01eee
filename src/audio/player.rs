//! Track playback through the default output device.

use std::sync::Arc;

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};

use super::loader::{AudioData, AudioError};
use super::meter::{LevelMeter, PowerMeter};

/// Plays one decoded track and meters it at the sink's playback position.
pub struct TrackPlayer {
    _stream: OutputStream,
    _handle: OutputStreamHandle,
    sink: Sink,
    meter: LevelMeter,
}

impl TrackPlayer {
    /// Open the default output device and queue `audio`, paused.
    pub fn new(audio: Arc<AudioData>) -> Result<Self, AudioError> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| AudioError::Output(e.to_string()))?;
        let sink = Sink::try_new(&handle).map_err(|e| AudioError::Output(e.to_string()))?;

        let source = SamplesBuffer::new(
            audio.channels as u16,
            audio.sample_rate,
            audio.samples.clone(),
        );
        sink.pause();
        sink.append(source);

        log::info!(
            "Queued {:.1}s of audio ({} Hz, {} ch)",
            audio.duration(),
            audio.sample_rate,
            audio.channels
        );

        Ok(Self {
            _stream: stream,
            _handle: handle,
            sink,
            meter: LevelMeter::new(audio),
        })
    }

    pub fn play(&self) {
        self.sink.play();
    }

    pub fn is_finished(&self) -> bool {
        self.sink.empty()
    }

    /// Playback position in frames. Once the sink drains, the position is far
    /// enough past the end that the meters read silence.
    pub fn position(&self) -> usize {
        if self.sink.empty() {
            return self.meter.audio().num_frames() + self.meter.window_frames();
        }
        self.meter
            .audio()
            .frame_at(self.sink.get_pos().as_secs_f64())
    }
}

impl PowerMeter for TrackPlayer {
    fn set_metering_enabled(&mut self, enabled: bool) {
        self.meter.set_metering_enabled(enabled);
    }

    fn is_metering_enabled(&self) -> bool {
        self.meter.is_metering_enabled()
    }

    fn update_meters(&mut self) {
        let frame = self.position();
        self.meter.seek(frame);
        self.meter.update_meters();
    }

    fn average_power(&self, channel: usize) -> f32 {
        self.meter.average_power(channel)
    }

    fn peak_power(&self, channel: usize) -> f32 {
        self.meter.peak_power(channel)
    }
}

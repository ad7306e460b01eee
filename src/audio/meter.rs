//! Power metering over decoded PCM.
//!
//! Power is reported in dBFS on `[-160, 0]`, the range host playback meters
//! use: full-scale is 0 dB and digital silence floors at -160 dB.

use std::sync::Arc;

use super::loader::AudioData;

/// Lowest reportable power, in dBFS.
pub const SILENCE_DB: f32 = -160.0;

/// Length of the trailing window the meters integrate over.
pub const METER_WINDOW_SECS: f64 = 0.05;

/// Metering facility of a playing track.
///
/// Mirrors the usual host-player contract: metering must be enabled, then
/// `update_meters` latches fresh readings that the power getters return until
/// the next update.
pub trait PowerMeter {
    fn set_metering_enabled(&mut self, enabled: bool);

    fn is_metering_enabled(&self) -> bool;

    /// Latch readings for the current playback position.
    fn update_meters(&mut self);

    /// Average (RMS) power of `channel` in dBFS.
    fn average_power(&self, channel: usize) -> f32;

    /// Peak power of `channel` in dBFS.
    fn peak_power(&self, channel: usize) -> f32;
}

/// Convert a linear amplitude to dBFS, clamped to `[-160, 0]`.
pub fn power_to_db(amplitude: f32) -> f32 {
    if amplitude <= 0.0 || !amplitude.is_finite() {
        return SILENCE_DB;
    }
    (20.0 * amplitude.log10()).clamp(SILENCE_DB, 0.0)
}

#[derive(Debug, Clone, Copy)]
struct ChannelLevel {
    average_db: f32,
    peak_db: f32,
}

impl ChannelLevel {
    const SILENT: ChannelLevel = ChannelLevel {
        average_db: SILENCE_DB,
        peak_db: SILENCE_DB,
    };
}

/// Meter over an in-memory clip with an explicit playback cursor.
#[derive(Debug, Clone)]
pub struct LevelMeter {
    audio: Arc<AudioData>,
    cursor: usize,
    window_frames: usize,
    enabled: bool,
    levels: Vec<ChannelLevel>,
}

impl LevelMeter {
    pub fn new(audio: Arc<AudioData>) -> Self {
        let window_frames =
            ((audio.sample_rate as f64 * METER_WINDOW_SECS).round() as usize).max(1);
        let channels = audio.channels.max(1);
        Self {
            audio,
            cursor: 0,
            window_frames,
            enabled: false,
            levels: vec![ChannelLevel::SILENT; channels],
        }
    }

    /// Move the playback cursor to `frame`. Takes effect on the next update.
    pub fn seek(&mut self, frame: usize) {
        self.cursor = frame;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn window_frames(&self) -> usize {
        self.window_frames
    }

    pub fn audio(&self) -> &Arc<AudioData> {
        &self.audio
    }

    fn measure(&self, channel: usize) -> ChannelLevel {
        // The window trails the cursor and slides off the end of the track.
        let end = self.cursor.min(self.audio.num_frames());
        let start = self.cursor.saturating_sub(self.window_frames).min(end);
        if start == end {
            return ChannelLevel::SILENT;
        }

        let (sum_sq, peak) = self
            .audio
            .channel_samples(channel, start, end)
            .fold((0.0f64, 0.0f32), |(sum, peak), s| {
                (sum + (s as f64) * (s as f64), peak.max(s.abs()))
            });
        let rms = (sum_sq / (end - start) as f64).sqrt() as f32;

        ChannelLevel {
            average_db: power_to_db(rms),
            peak_db: power_to_db(peak),
        }
    }
}

impl PowerMeter for LevelMeter {
    fn set_metering_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.levels.fill(ChannelLevel::SILENT);
        }
    }

    fn is_metering_enabled(&self) -> bool {
        self.enabled
    }

    fn update_meters(&mut self) {
        if !self.enabled {
            return;
        }
        for channel in 0..self.levels.len() {
            self.levels[channel] = self.measure(channel);
        }
    }

    fn average_power(&self, channel: usize) -> f32 {
        self.levels
            .get(channel)
            .map_or(SILENCE_DB, |level| level.average_db)
    }

    fn peak_power(&self, channel: usize) -> f32 {
        self.levels
            .get(channel)
            .map_or(SILENCE_DB, |level| level.peak_db)
    }
}

//! Loudness readings shifted into the non-negative range the shaders expect.

use super::meter::{PowerMeter, SILENCE_DB};

/// Upper bound of a shifted loudness reading.
pub const LOUDNESS_RANGE_DB: f32 = -SILENCE_DB;

/// Channel the readings are taken from.
const METERED_CHANNEL: usize = 0;

/// Wraps a playing track and exposes average and peak loudness in `[0, 160]`.
pub struct AudioMetricsSource<M> {
    meter: M,
}

impl<M: PowerMeter> AudioMetricsSource<M> {
    pub fn new(meter: M) -> Self {
        Self { meter }
    }

    /// Average loudness of the recent window, `dBFS + 160`.
    pub fn average_loudness_db(&mut self) -> f32 {
        self.refresh();
        shift(self.meter.average_power(METERED_CHANNEL))
    }

    /// Peak loudness of the recent window, `dBFS + 160`.
    pub fn peak_loudness_db(&mut self) -> f32 {
        self.refresh();
        shift(self.meter.peak_power(METERED_CHANNEL))
    }

    pub fn meter(&self) -> &M {
        &self.meter
    }

    pub fn meter_mut(&mut self) -> &mut M {
        &mut self.meter
    }

    fn refresh(&mut self) {
        if !self.meter.is_metering_enabled() {
            self.meter.set_metering_enabled(true);
        }
        self.meter.update_meters();
    }
}

fn shift(power_db: f32) -> f32 {
    // clamp passes NaN through, so non-finite readings count as silence first.
    let power_db = if power_db.is_finite() { power_db } else { SILENCE_DB };
    (power_db + LOUDNESS_RANGE_DB).clamp(0.0, LOUDNESS_RANGE_DB)
}

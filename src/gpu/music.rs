//! The per-frame music record read by the particle shader.

use crate::audio::{AudioMetricsSource, PowerMeter};

/// Loudness sample plus session parameters.
///
/// WGSL: `struct Music { power: vec2<f32>, params: vec2<f32> }`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MusicMetrics {
    /// `[average, peak]` loudness, each in `[0, 160]`.
    pub power: [f32; 2],
    /// `[intensity flag, unused]`. The flag is 1.0 normally and 0.0 when the
    /// line effect is disabled.
    pub params: [f32; 2],
}

impl MusicMetrics {
    /// Take a fresh reading from `source`.
    pub fn sample<M: PowerMeter>(source: &mut AudioMetricsSource<M>, intensity_flag: f32) -> Self {
        let average = source.average_loudness_db();
        let peak = source.peak_loudness_db();
        Self {
            power: [average, peak],
            params: [intensity_flag, 0.0],
        }
    }

    pub fn average_db(&self) -> f32 {
        self.power[0]
    }

    pub fn peak_db(&self) -> f32 {
        self.power[1]
    }

    pub fn lines_enabled(&self) -> bool {
        self.params[0] != 0.0
    }
}

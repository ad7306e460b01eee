//! Synthetic signals for exercising the meters without a bundled track.

use std::f32::consts::PI;

use super::loader::AudioData;

/// Generate a sine wave.
///
/// # Arguments
/// * `frequency` - Frequency in Hz
/// * `sample_rate` - Sample rate in Hz
/// * `duration` - Duration in seconds
/// * `amplitude` - Amplitude (0.0 to 1.0)
pub fn generate_sine(frequency: f32, sample_rate: u32, duration: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (duration * sample_rate as f32) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            amplitude * (2.0 * PI * frequency * t).sin()
        })
        .collect()
}

/// Generate white noise from a fixed-seed LCG so runs are reproducible.
pub fn generate_white_noise(
    sample_rate: u32,
    duration: f32,
    amplitude: f32,
    seed: u64,
) -> Vec<f32> {
    let num_samples = (duration * sample_rate as f32) as usize;

    let mut state = seed;
    let a: u64 = 6364136223846793005;
    let c: u64 = 1442695040888963407;

    (0..num_samples)
        .map(|_| {
            state = state.wrapping_mul(a).wrapping_add(c);
            let normalized = (state as f32 / u64::MAX as f32) * 2.0 - 1.0;
            amplitude * normalized
        })
        .collect()
}

/// Generate a click track: 10 ms decaying sine bursts at `bpm`, silence between.
pub fn generate_click_track(
    bpm: f32,
    sample_rate: u32,
    duration: f32,
    click_freq: f32,
) -> Vec<f32> {
    let num_samples = (duration * sample_rate as f32) as usize;
    let samples_per_beat = (60.0 / bpm * sample_rate as f32) as usize;
    let click_samples = (sample_rate as f32 * 0.01) as usize;

    let mut samples = vec![0.0; num_samples];

    let mut pos = 0;
    while pos < num_samples {
        for i in 0..click_samples.min(num_samples - pos) {
            let t = i as f32 / sample_rate as f32;
            let envelope = (1.0 - i as f32 / click_samples as f32).powi(2);
            samples[pos + i] = envelope * (2.0 * PI * click_freq * t).sin();
        }
        pos += samples_per_beat.max(1);
    }

    samples
}

/// Wrap mono samples as a playable clip.
pub fn mono_clip(samples: Vec<f32>, sample_rate: u32) -> AudioData {
    AudioData {
        samples,
        sample_rate,
        channels: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_length_and_amplitude() {
        let samples = generate_sine(440.0, 44100, 0.5, 0.8);
        assert_eq!(samples.len(), 22050);
        let max = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
        assert!(max <= 0.8 + 1e-6);
        assert!(max > 0.79);
    }

    #[test]
    fn test_white_noise_reproducible() {
        let a = generate_white_noise(8000, 0.1, 0.5, 7);
        let b = generate_white_noise(8000, 0.1, 0.5, 7);
        assert_eq!(a, b);
        assert!(a.iter().all(|s| s.abs() <= 0.5));
    }

    #[test]
    fn test_click_track_has_gaps() {
        let samples = generate_click_track(120.0, 44100, 1.0, 1000.0);
        // Clicks last 10 ms; the middle of each beat is silent.
        assert_eq!(samples[11025], 0.0);
        assert!(samples[..441].iter().any(|s| s.abs() > 0.1));
    }

    #[test]
    fn test_mono_clip() {
        let clip = mono_clip(vec![0.0; 100], 1000);
        assert_eq!(clip.channels, 1);
        assert_eq!(clip.num_frames(), 100);
    }
}

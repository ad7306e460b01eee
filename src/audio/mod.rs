//! Track loading, playback, and loudness metering.
//!
//! This module provides:
//! - Track loading via Symphonia (AAC, WAV, MP3, FLAC)
//! - Playback through the default output device via rodio
//! - Average/peak power metering over a short trailing window
//! - Loudness readings shifted into `[0, 160]` for GPU consumption

pub mod loader;
pub mod meter;
pub mod metrics;
pub mod player;
pub mod synth;

pub use loader::{load_audio, load_track, AudioData, AudioError};
pub use meter::{power_to_db, LevelMeter, PowerMeter, SILENCE_DB};
pub use metrics::{AudioMetricsSource, LOUDNESS_RANGE_DB};
pub use player::TrackPlayer;
pub use synth::{generate_click_track, generate_sine, generate_white_noise, mono_clip};

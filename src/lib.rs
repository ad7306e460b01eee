//! Audio-reactive particle visualizer.
//!
//! A bundled track is decoded with Symphonia and played through rodio while a
//! level meter follows the playback position. Every frame the average and
//! peak loudness are shifted into `[0, 160]` and handed to two wgpu compute
//! programs: one repaints a background pattern, the other draws a 60 × 60
//! lattice of particles whose size and lines follow the music.
//!
//! # Layout
//!
//! - [`audio`]: decoding, playback, power metering, loudness readings
//! - [`gpu`]: programs, buffers, dispatch plan, and the per-frame driver
//! - [`config`]: tracks and session settings
//! - [`app`]: the winit window and event loop

pub mod app;
pub mod audio;
pub mod config;
pub mod gpu;

pub use app::{run, AppError, VisualizerApp};
pub use audio::{
    load_audio, load_track, AudioData, AudioError, AudioMetricsSource, LevelMeter, PowerMeter,
    TrackPlayer,
};
pub use config::{Track, UnknownTrack, VisualizerConfig, PIXEL_SCALE, VIEW_SIZE};
pub use gpu::{
    DriverError, FrameDriver, FrameReport, GpuContext, MusicMetrics, Particle, ParticleGrid,
    PresentTarget, RenderError,
};

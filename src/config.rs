//! Session configuration: track choice, intensity flag, view geometry.

use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Logical edge length of the live view, in points.
pub const VIEW_SIZE: u32 = 600;

/// Canvas pixels per logical point. The particle lattice is laid out in
/// canvas pixels, so `VIEW_SIZE * PIXEL_SCALE` must cover it.
pub const PIXEL_SCALE: u32 = 2;

/// Bundled tracks that can be played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Track {
    #[default]
    Reverse,
    Thunder,
    Jubilee,
}

impl Track {
    pub fn all() -> &'static [Track] {
        &[Track::Reverse, Track::Thunder, Track::Jubilee]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Track::Reverse => "Reverse",
            Track::Thunder => "Thunder",
            Track::Jubilee => "Jubilee",
        }
    }

    /// File name of the bundled asset.
    pub fn file_name(&self) -> &'static str {
        match self {
            Track::Reverse => "Reverse.aac",
            Track::Thunder => "Thunder.aac",
            Track::Jubilee => "Jubilee.aac",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Track::Reverse => {
                "Upbeat electronic piece with sudden pitch changes; the bass drop lands around 1:15"
            }
            Track::Thunder => {
                "Upbeat electronic piece with a steady melody; watch the rhythm build the choppiness"
            }
            Track::Jubilee => {
                "Older electronic piece with distinct beats; guitar slides move the diagonal bars"
            }
        }
    }
}

/// Returned when a track name matches none of the bundled tracks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown track `{name}` (expected one of Reverse, Thunder, Jubilee)")]
pub struct UnknownTrack {
    pub name: String,
}

impl FromStr for Track {
    type Err = UnknownTrack;

    /// Parse a track name, ignoring case and surrounding whitespace.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Track::all()
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| UnknownTrack {
                name: name.to_string(),
            })
    }
}

/// Immutable configuration handed to the frame driver and the app shell.
#[derive(Debug, Clone)]
pub struct VisualizerConfig {
    pub track: Track,
    /// Disables the music-driven line effect for the whole session.
    pub reduce_intensity: bool,
    pub view_size: u32,
    pub pixel_scale: u32,
    pub assets_dir: PathBuf,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            track: Track::default(),
            reduce_intensity: false,
            view_size: VIEW_SIZE,
            pixel_scale: PIXEL_SCALE,
            assets_dir: PathBuf::from("assets"),
        }
    }
}

impl VisualizerConfig {
    /// Edge length of the background dispatch grid and of the canvas.
    pub fn background_grid(&self) -> u32 {
        self.view_size * self.pixel_scale
    }

    /// Value written to `MusicMetrics::params[0]`.
    pub fn intensity_flag(&self) -> f32 {
        if self.reduce_intensity {
            0.0
        } else {
            1.0
        }
    }

    pub fn track_path(&self) -> PathBuf {
        Path::new(&self.assets_dir).join(self.track.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_from_str() {
        assert_eq!("reverse".parse::<Track>(), Ok(Track::Reverse));
        assert_eq!(" THUNDER ".parse::<Track>(), Ok(Track::Thunder));
        assert_eq!("Jubilee".parse::<Track>(), Ok(Track::Jubilee));
        assert_eq!(
            "silence".parse::<Track>(),
            Err(UnknownTrack {
                name: "silence".to_string()
            })
        );
    }

    #[test]
    fn test_every_track_name_round_trips() {
        for track in Track::all() {
            assert_eq!(Track::from_str(track.name()), Ok(*track));
        }
    }

    #[test]
    fn test_default_config() {
        let config = VisualizerConfig::default();
        assert_eq!(config.track, Track::Reverse);
        assert!(!config.reduce_intensity);
        assert_eq!(config.background_grid(), 1200);
        assert_eq!(config.intensity_flag(), 1.0);
    }

    #[test]
    fn test_reduce_intensity_flag() {
        let config = VisualizerConfig {
            reduce_intensity: true,
            ..Default::default()
        };
        assert_eq!(config.intensity_flag(), 0.0);
    }

    #[test]
    fn test_track_path() {
        let config = VisualizerConfig {
            track: Track::Jubilee,
            assets_dir: PathBuf::from("/srv/tracks"),
            ..Default::default()
        };
        assert_eq!(config.track_path(), PathBuf::from("/srv/tracks/Jubilee.aac"));
    }
}

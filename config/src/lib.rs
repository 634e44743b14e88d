// SPDX-License-Identifier: MPL-2.0

use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::{
    fmt, io,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

pub const NAME: &str = "gifpaper";
pub const CONFIG_FILE: &str = "config.ron";

/// Inclusive framerate bounds, in Hz.
pub const FRAMERATE_RANGE: std::ops::RangeInclusive<u32> = 1..=60;

/// Slideshow intervals at or below this many seconds tend to stutter.
pub const FAST_SLIDE_INTERVAL: u64 = 30;

/// Interval used when a directory is given without one, in seconds.
pub const DEFAULT_SLIDE_INTERVAL: u64 = 180;

/// Playback configuration, threaded once into the schedulers.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Setters)]
#[serde(deny_unknown_fields, default)]
#[setters(strip_option)]
#[must_use]
pub struct Config {
    /// frames displayed per second
    pub framerate: u32,
    /// seconds each animation stays on screen; `None` plays a single gif
    pub slide_interval: Option<u64>,
    /// sub-rectangle of the source frames to keep
    pub crop: Option<Crop>,
    /// only animate while the machine is on mains power
    pub power_save: bool,
    /// ratio of frames realized up front versus kept as raw buffers
    pub memory_load: Option<f32>,
    /// how frames are laid out across heads
    pub display_mode: DisplayMode,
    /// mode used to scale frames
    pub scaling_mode: ScalingMode,
    /// filter used to scale frames
    pub filter_method: FilterMethod,
    /// order in which slideshow entries are visited
    pub sampling_method: SamplingMethod,
    /// geometry of the connected heads
    pub outputs: Vec<Head>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            framerate: 12,
            slide_interval: None,
            crop: None,
            power_save: false,
            memory_load: None,
            display_mode: DisplayMode::default(),
            scaling_mode: ScalingMode::default(),
            filter_method: FilterMethod::default(),
            sampling_method: SamplingMethod::default(),
            outputs: vec![Head::default()],
        }
    }
}

impl Config {
    /// Default location of the config file, under the user's config directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(NAME).join(CONFIG_FILE))
    }

    /// Load a config from a RON file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or does not parse.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        ron::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Load the explicitly requested file, else the default file if present,
    /// else fall back to defaults.
    ///
    /// # Errors
    ///
    /// Fails if a file exists but cannot be read or parsed.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Check every value against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !FRAMERATE_RANGE.contains(&self.framerate) {
            return Err(ConfigError::Framerate(self.framerate));
        }

        if let Some(load) = self.memory_load {
            if !(0.0..=1.0).contains(&load) {
                return Err(ConfigError::MemoryLoad(load));
            }
        }

        match self.slide_interval {
            Some(0) => return Err(ConfigError::SlideInterval),
            Some(secs) if secs <= FAST_SLIDE_INTERVAL => {
                tracing::warn!(
                    interval = secs,
                    "fast slideshow rates may incur performance costs and choppiness"
                );
            }
            _ => {}
        }

        if let Some(crop) = self.crop {
            if crop.width == 0 || crop.height == 0 {
                return Err(ConfigError::EmptyCrop);
            }
        }

        if self.outputs.is_empty() || self.outputs.iter().any(|h| h.width == 0 || h.height == 0)
        {
            return Err(ConfigError::NoOutputs);
        }

        Ok(())
    }

    /// Time allotted to each displayed frame.
    #[must_use]
    pub fn frame_budget(&self) -> Duration {
        Duration::from_secs(1) / self.framerate.max(1)
    }

    /// Time each animation is displayed in slideshow mode.
    #[must_use]
    pub fn slide_duration(&self) -> Option<Duration> {
        self.slide_interval.map(Duration::from_secs)
    }
}

/// Sub-rectangle of a frame, in source pixels.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Crop {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FromStr for Crop {
    type Err = ConfigError;

    /// Parses `"x y width height"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::CropArgument(s.to_owned());

        let values = s
            .split_whitespace()
            .map(|v| v.parse::<u32>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;

        let [x, y, width, height] = values[..] else {
            return Err(invalid());
        };

        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }
}

/// Position and size of one physical head within the virtual screen.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Head {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for Head {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: 1920,
            height: 1080,
        }
    }
}

/// Multihead layout
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayMode {
    // draw on the first head only
    #[default]
    Single,
    // scale a copy of the animation onto every head
    Replicate,
    // scale the animation once across all heads
    Extend,
}

/// Image filtering method
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterMethod {
    // nearest neighbor filtering
    #[default]
    Nearest,
    // linear filtering
    Linear,
    // lanczos filtering with window 3
    Lanczos,
}

impl From<FilterMethod> for image::imageops::FilterType {
    fn from(method: FilterMethod) -> Self {
        match method {
            FilterMethod::Nearest => image::imageops::FilterType::Nearest,
            FilterMethod::Linear => image::imageops::FilterType::Triangle,
            FilterMethod::Lanczos => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// Slideshow ordering
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub enum SamplingMethod {
    // Rotate through animations in alphanumeric order
    #[default]
    Alphanumeric,
    // Rotate through animations in random order
    Random,
}

/// Frame scaling mode
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub enum ScalingMode {
    // Fit the frame and fill the rest of the area with the given RGB color
    Fit([f32; 3]),
    /// Stretch the frame ignoring any aspect ratio to fit the area
    Stretch,
    /// Zoom the frame so that it fills the whole area
    Zoom,
}

impl Default for ScalingMode {
    fn default() -> Self {
        Self::Fit([0.0, 0.0, 0.0])
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum ConfigError {
    Read { path: PathBuf, source: io::Error },
    Parse(ron::error::SpannedError),
    Framerate(u32),
    MemoryLoad(f32),
    SlideInterval,
    EmptyCrop,
    CropArgument(String),
    NoOutputs,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, .. } => write!(f, "cannot read config file {}", path.display()),
            Self::Parse(e) => write!(f, "config file is malformed: {e}"),
            Self::Framerate(fps) => write!(
                f,
                "framerate must be between {}Hz and {}Hz, got {fps}",
                FRAMERATE_RANGE.start(),
                FRAMERATE_RANGE.end()
            ),
            Self::MemoryLoad(load) => {
                write!(f, "memory load must be between 0.0 and 1.0, got {load}")
            }
            Self::SlideInterval => f.write_str("slideshow interval must be at least one second"),
            Self::EmptyCrop => f.write_str("crop width and height must be non-zero"),
            Self::CropArgument(arg) => {
                write!(f, "crop needs four integers 'x y width height', got '{arg}'")
            }
            Self::NoOutputs => f.write_str("at least one output with a non-zero size is required"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_example_matches_defaults() {
        let example: Config = ron::from_str(include_str!("../config.ron")).unwrap();
        assert_eq!(example, Config::default());
    }

    #[test]
    fn test_frame_budget_divides_one_second() {
        assert_eq!(Config::default().framerate(10).frame_budget(), Duration::from_millis(100));
        assert_eq!(Config::default().framerate(1).frame_budget(), Duration::from_secs(1));
    }

    #[test]
    fn test_framerate_bounds_are_inclusive() {
        assert!(Config::default().framerate(1).validate().is_ok());
        assert!(Config::default().framerate(60).validate().is_ok());
        assert!(matches!(
            Config::default().framerate(0).validate(),
            Err(ConfigError::Framerate(0))
        ));
        assert!(matches!(
            Config::default().framerate(61).validate(),
            Err(ConfigError::Framerate(61))
        ));
    }

    #[test]
    fn test_memory_load_must_be_a_ratio() {
        assert!(Config::default().memory_load(0.0).validate().is_ok());
        assert!(Config::default().memory_load(1.0).validate().is_ok());
        assert!(Config::default().memory_load(1.5).validate().is_err());
        assert!(Config::default().memory_load(-0.1).validate().is_err());
        assert!(Config::default().memory_load(f32::NAN).validate().is_err());
    }

    #[test]
    fn test_zero_slide_interval_is_rejected() {
        assert!(matches!(
            Config::default().slide_interval(0).validate(),
            Err(ConfigError::SlideInterval)
        ));
        assert!(Config::default().slide_interval(5).validate().is_ok());
    }

    #[test]
    fn test_outputs_must_not_be_empty() {
        assert!(matches!(
            Config::default().outputs(Vec::new()).validate(),
            Err(ConfigError::NoOutputs)
        ));
    }

    #[test]
    fn test_crop_parses_four_integers() {
        let crop: Crop = "10 20 300 400".parse().unwrap();
        assert_eq!(
            crop,
            Crop {
                x: 10,
                y: 20,
                width: 300,
                height: 400
            }
        );

        assert!("10 20 300".parse::<Crop>().is_err());
        assert!("10 20 300 400 5".parse::<Crop>().is_err());
        assert!("a b c d".parse::<Crop>().is_err());
        assert!("".parse::<Crop>().is_err());
    }

    #[test]
    fn test_empty_crop_is_rejected() {
        let crop = Crop {
            x: 0,
            y: 0,
            width: 0,
            height: 10,
        };
        assert!(matches!(
            Config::default().crop(crop).validate(),
            Err(ConfigError::EmptyCrop)
        ));
    }

    #[test]
    fn test_load_reads_partial_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            "(framerate: 24, slide_interval: Some(60), display_mode: Replicate)",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.framerate, 24);
        assert_eq!(config.slide_interval, Some(60));
        assert_eq!(config.display_mode, DisplayMode::Replicate);
        assert_eq!(config.outputs, vec![Head::default()]);
    }

    #[test]
    fn test_load_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "(frame_rate: 24)").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.ron");

        assert!(matches!(
            Config::load_or_default(Some(&missing)),
            Err(ConfigError::Read { .. })
        ));
    }
}

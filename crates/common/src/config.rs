//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Highest capture frame rate a config may ask for.
pub const MAX_FRAME_RATE: u32 = 1000;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Camera request made when the compositor starts.
    pub capture: CaptureDefaults,

    /// Options handed to the segmentation model.
    pub segmentation: SegmentationDefaults,

    /// Live frame-loop tuning.
    pub pipeline: PipelineDefaults,

    /// Segment editing defaults.
    pub timeline: TimelineDefaults,

    /// Performers available in the session.
    pub performers: Vec<PerformerEntry>,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Capture-device constraints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureDefaults {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

/// Segmentation model options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationDefaults {
    /// 0 = general model, 1 = landscape model.
    pub model_selection: u8,

    /// Mirror the output horizontally, as a front-facing camera preview.
    pub selfie_mode: bool,
}

/// Frame-loop tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefaults {
    /// Maximum number of segmentation requests outstanding at once.
    pub max_in_flight: usize,

    /// How often pipeline statistics are logged (Hz).
    pub stats_log_hz: u32,
}

/// Timeline editing defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineDefaults {
    /// Provisional length of a freshly marked segment (seconds).
    pub provisional_length_secs: f64,

    /// File name suggested for segment exports.
    pub export_file_name: String,
}

/// A performer as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformerEntry {
    pub id: String,
    pub name: String,
    pub color: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "incruste=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            capture: CaptureDefaults::default(),
            segmentation: SegmentationDefaults::default(),
            pipeline: PipelineDefaults::default(),
            timeline: TimelineDefaults::default(),
            performers: vec![PerformerEntry::default()],
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CaptureDefaults {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            frame_rate: 30,
        }
    }
}

impl Default for SegmentationDefaults {
    fn default() -> Self {
        Self {
            model_selection: 1,
            selfie_mode: true,
        }
    }
}

impl Default for PipelineDefaults {
    fn default() -> Self {
        Self {
            max_in_flight: 1,
            stats_log_hz: 1,
        }
    }
}

impl Default for TimelineDefaults {
    fn default() -> Self {
        Self {
            provisional_length_secs: 5.0,
            export_file_name: "cinema_scene_config.json".to_string(),
        }
    }
}

impl Default for PerformerEntry {
    fn default() -> Self {
        Self {
            id: "p1".to_string(),
            name: "Acteur Principal".to_string(),
            color: "#ef4444".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match Self::from_json(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Parse and sanity-check a config document.
    pub fn from_json(content: &str) -> crate::IncrusteResult<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> crate::IncrusteResult<()> {
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(crate::IncrusteError::config(
                "capture width and height must be non-zero",
            ));
        }
        if self.capture.frame_rate == 0 || self.capture.frame_rate > MAX_FRAME_RATE {
            return Err(crate::IncrusteError::config(format!(
                "capture frame_rate must be between 1 and {MAX_FRAME_RATE}"
            )));
        }
        if self.pipeline.max_in_flight == 0 {
            return Err(crate::IncrusteError::config(
                "pipeline max_in_flight must be at least 1",
            ));
        }
        if !self.timeline.provisional_length_secs.is_finite()
            || self.timeline.provisional_length_secs < 0.0
        {
            return Err(crate::IncrusteError::config(
                "timeline provisional_length_secs must be a non-negative number",
            ));
        }
        if self.performers.is_empty() {
            return Err(crate::IncrusteError::config(
                "at least one performer is required",
            ));
        }
        Ok(())
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("incruste").join("config.json")
}

use crate::capture::{FlashMode, PhotoFormat};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LenslyConfig {
    pub capture: CaptureConfig,
    pub controls: ControlsConfig,
    pub storage: StorageConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Countdown length in ticks before a capture (0 captures immediately)
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: i32,

    /// Initial photo format
    #[serde(default)]
    pub format: PhotoFormat,

    /// Initial flash mode
    #[serde(default)]
    pub flash: FlashMode,

    /// Countdown tick period in milliseconds
    #[serde(default = "default_countdown_tick_millis")]
    pub countdown_tick_millis: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ControlsConfig {
    #[serde(default = "default_exposure_bias_min")]
    pub exposure_bias_min: f32,

    #[serde(default = "default_exposure_bias_max")]
    pub exposure_bias_max: f32,

    /// Increment used by step controls such as the keyboard
    #[serde(default = "default_exposure_bias_step")]
    pub exposure_bias_step: f32,

    #[serde(default = "default_white_balance_min")]
    pub white_balance_min: f32,

    #[serde(default = "default_white_balance_max")]
    pub white_balance_max: f32,

    /// Fastest shutter offered, as N of 1/N seconds
    #[serde(default = "default_fastest_shutter_denominator")]
    pub fastest_shutter_denominator: i32,

    /// ISO range used before a device format is known
    #[serde(default = "default_fallback_iso")]
    pub fallback_iso: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StorageConfig {
    /// Directory photos are written to
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Pending coordinator commands before callers wait
    #[serde(default = "default_command_queue_capacity")]
    pub command_queue_capacity: usize,
}

impl CaptureConfig {
    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_millis)
    }
}

impl LenslyConfig {
    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("capture.delay_seconds", default_delay_seconds())?
            .set_default("capture.format", "Heif")?
            .set_default("capture.flash", "Auto")?
            .set_default(
                "capture.countdown_tick_millis",
                default_countdown_tick_millis(),
            )?
            .set_default(
                "controls.exposure_bias_min",
                default_exposure_bias_min() as f64,
            )?
            .set_default(
                "controls.exposure_bias_max",
                default_exposure_bias_max() as f64,
            )?
            .set_default(
                "controls.exposure_bias_step",
                default_exposure_bias_step() as f64,
            )?
            .set_default(
                "controls.white_balance_min",
                default_white_balance_min() as f64,
            )?
            .set_default(
                "controls.white_balance_max",
                default_white_balance_max() as f64,
            )?
            .set_default(
                "controls.fastest_shutter_denominator",
                default_fastest_shutter_denominator(),
            )?
            .set_default("controls.fallback_iso", default_fallback_iso() as f64)?
            .set_default(
                "storage.path",
                default_storage_path().to_string_lossy().to_string(),
            )?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .set_default(
                "system.command_queue_capacity",
                default_command_queue_capacity() as i64,
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // LENSLY_CAPTURE__DELAY_SECONDS=3 overrides capture.delay_seconds
            .add_source(
                Environment::with_prefix("LENSLY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: LenslyConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture.countdown_tick_millis == 0 {
            return Err(ConfigError::Message(
                "Countdown tick must be greater than 0".to_string(),
            ));
        }

        let controls = &self.controls;
        if controls.exposure_bias_min >= controls.exposure_bias_max {
            return Err(ConfigError::Message(
                "Exposure bias minimum must be below its maximum".to_string(),
            ));
        }

        if controls.exposure_bias_step <= 0.0 {
            return Err(ConfigError::Message(
                "Exposure bias step must be greater than 0".to_string(),
            ));
        }

        if controls.white_balance_min <= 0.0
            || controls.white_balance_min >= controls.white_balance_max
        {
            return Err(ConfigError::Message(
                "White balance range must be positive and non-empty".to_string(),
            ));
        }

        if controls.fastest_shutter_denominator <= 0 {
            return Err(ConfigError::Message(
                "Fastest shutter denominator must be greater than 0".to_string(),
            ));
        }

        if controls.fallback_iso <= 0.0 {
            return Err(ConfigError::Message(
                "Fallback ISO must be greater than 0".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        if self.system.command_queue_capacity == 0 {
            return Err(ConfigError::Message(
                "Command queue capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for LenslyConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig {
                delay_seconds: default_delay_seconds(),
                format: PhotoFormat::default(),
                flash: FlashMode::default(),
                countdown_tick_millis: default_countdown_tick_millis(),
            },
            controls: ControlsConfig {
                exposure_bias_min: default_exposure_bias_min(),
                exposure_bias_max: default_exposure_bias_max(),
                exposure_bias_step: default_exposure_bias_step(),
                white_balance_min: default_white_balance_min(),
                white_balance_max: default_white_balance_max(),
                fastest_shutter_denominator: default_fastest_shutter_denominator(),
                fallback_iso: default_fallback_iso(),
            },
            storage: StorageConfig {
                path: default_storage_path(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
                command_queue_capacity: default_command_queue_capacity(),
            },
        }
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        LenslyConfig::default().controls
    }
}

// Default value functions
fn default_delay_seconds() -> i32 {
    0
}
fn default_countdown_tick_millis() -> u64 {
    1000
}

fn default_exposure_bias_min() -> f32 {
    -8.0
}
fn default_exposure_bias_max() -> f32 {
    8.0
}
fn default_exposure_bias_step() -> f32 {
    0.5
}
fn default_white_balance_min() -> f32 {
    3000.0
}
fn default_white_balance_max() -> f32 {
    8000.0
}
fn default_fastest_shutter_denominator() -> i32 {
    1000
}
fn default_fallback_iso() -> f32 {
    50.0
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./photos")
}

fn default_event_bus_capacity() -> usize {
    100
}
fn default_command_queue_capacity() -> usize {
    32
}

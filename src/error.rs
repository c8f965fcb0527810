use crate::lens::LensPosition;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LenslyError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("Cannot {operation} while a capture is in progress")]
    CaptureInProgress { operation: &'static str },

    #[error("Camera coordinator has stopped")]
    CoordinatorStopped,
}

/// Failures while configuring the active capture device.
///
/// Any of these leaves the targeted parameter exactly as it was before the
/// attempt.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("Failed to lock {device} for configuration: {details}")]
    ConfigurationLock { device: String, details: String },

    #[error("Failed to write {property} on {device}: {details}")]
    PropertyWrite {
        device: String,
        property: &'static str,
        details: String,
    },

    #[error("Failed to construct input for {device}: {details}")]
    InputConstruction { device: String, details: String },

    #[error("{device} does not support {property}")]
    Unsupported {
        device: String,
        property: &'static str,
    },

    #[error("No active capture device")]
    NoActiveDevice,

    #[error("Configuration task failed: {details}")]
    Executor { details: String },
}

impl DeviceError {
    pub fn write<S: Into<String>, D: Into<String>>(
        device: S,
        property: &'static str,
        details: D,
    ) -> Self {
        Self::PropertyWrite {
            device: device.into(),
            property,
            details: details.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiscoveryError {
    #[error("No lens found at the {position} position")]
    NoMatchingLens { position: LensPosition },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("{format} capture is not available on lens {lens}")]
    NoRawFormatAvailable { format: String, lens: String },

    #[error("Capture delegate failed: {details}")]
    Delegate { details: String },

    #[error("Failed to persist photo: {details}")]
    Persistence { details: String },

    #[error("No active capture device")]
    NoActiveDevice,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event bus channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, LenslyError>;

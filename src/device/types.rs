use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExposureMode {
    ContinuousAuto,
    /// One-shot metering, used after a point of interest is set
    AutoExpose,
    Locked,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FocusMode {
    ContinuousAuto,
    /// One-shot focus, used after a point of interest is set
    AutoFocus,
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WhiteBalanceMode {
    ContinuousAuto,
    Locked,
}

/// A sub-system mode command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModeChange {
    Exposure(ExposureMode),
    Focus(FocusMode),
    WhiteBalance(WhiteBalanceMode),
}

/// Normalized frame coordinate, (0, 0) top-left to (1, 1) bottom-right
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusPoint {
    pub x: f32,
    pub y: f32,
}

impl FocusPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }

    pub fn center() -> Self {
        Self { x: 0.5, y: 0.5 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WhiteBalanceGains {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

/// Rational exposure time of `value / timescale` seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposureDuration {
    pub value: i64,
    pub timescale: i32,
}

impl ExposureDuration {
    pub fn new(value: i64, timescale: i32) -> Self {
        Self { value, timescale }
    }

    /// Duration of a `1/denominator` shutter speed
    pub fn from_shutter_denominator(denominator: i32) -> Self {
        Self {
            value: 1,
            timescale: denominator.max(1),
        }
    }

    /// Shutter speed denominator N of a 1/N second exposure
    pub fn shutter_denominator(&self) -> i32 {
        let value = self.value.max(1);
        (self.timescale as i64 / value).clamp(1, i32::MAX as i64) as i32
    }
}

/// Capabilities of the active device format
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceFormat {
    pub min_iso: f32,
    pub max_iso: f32,
    /// Longest exposure the format allows
    pub max_exposure_duration: ExposureDuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RawFormatKind {
    /// Plain sensor RAW
    Bayer,
    /// Extended dynamic range RAW
    ProRaw,
}

/// Pixel format token handed to the capture pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawPixelFormat {
    pub kind: RawFormatKind,
    pub code: u32,
}

/// A value pushed by the hardware for the active device
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HardwareReport {
    ExposureBias(f32),
    Iso(f32),
    ExposureDuration(ExposureDuration),
    /// Lens focus position, 0.0 (near) to 1.0 (far)
    LensPosition(f32),
    WhiteBalanceGains(WhiteBalanceGains),
}

/// A single configuration write against the active device
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DeviceCommand {
    ExposureBias(f32),
    IsoAndShutter { iso: f32, shutter_denominator: i32 },
    LensPosition(f32),
    FocusPoint(FocusPoint),
    WhiteBalanceTemperature(f32),
    ModeChange(ModeChange),
}

impl DeviceCommand {
    pub fn name(&self) -> &'static str {
        match self {
            DeviceCommand::ExposureBias(_) => "exposure_bias",
            DeviceCommand::IsoAndShutter { .. } => "iso_and_shutter",
            DeviceCommand::LensPosition(_) => "lens_position",
            DeviceCommand::FocusPoint(_) => "focus_point",
            DeviceCommand::WhiteBalanceTemperature(_) => "white_balance_temperature",
            DeviceCommand::ModeChange(_) => "mode_change",
        }
    }
}

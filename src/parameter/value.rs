use crate::device::{ExposureMode, FocusMode, ModeChange, WhiteBalanceMode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A user-controllable capture parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlParameter {
    ExposureBias,
    IsoAndShutter,
    FocusPosition,
    WhiteBalanceTemperature,
}

impl ControlParameter {
    pub const ALL: [ControlParameter; 4] = [
        ControlParameter::ExposureBias,
        ControlParameter::IsoAndShutter,
        ControlParameter::FocusPosition,
        ControlParameter::WhiteBalanceTemperature,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ControlParameter::ExposureBias => "EV",
            ControlParameter::IsoAndShutter => "ISO",
            ControlParameter::FocusPosition => "Focus",
            ControlParameter::WhiteBalanceTemperature => "WB",
        }
    }

    /// Mode command that hands the parameter back to the hardware
    pub fn auto_mode(&self) -> ModeChange {
        match self {
            ControlParameter::ExposureBias | ControlParameter::IsoAndShutter => {
                ModeChange::Exposure(ExposureMode::ContinuousAuto)
            }
            ControlParameter::FocusPosition => ModeChange::Focus(FocusMode::ContinuousAuto),
            ControlParameter::WhiteBalanceTemperature => {
                ModeChange::WhiteBalance(WhiteBalanceMode::ContinuousAuto)
            }
        }
    }
}

impl fmt::Display for ControlParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    ExposureValue,
    Iso,
    /// N of a 1/N second shutter speed
    ShutterDenominator,
    /// Normalized focus travel
    LensPosition,
    Kelvin,
}

/// Inclusive value range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy> Bounds<T> {
    pub fn new(min: T, max: T) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: T) -> T {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RealValue {
    pub value: f32,
    pub unit: Unit,
    pub bounds: Bounds<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegerValue {
    pub value: i32,
    pub unit: Unit,
    pub bounds: Bounds<i32>,
}

/// A parameter value with its unit and valid range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ControlValue {
    Integer(IntegerValue),
    Real(RealValue),
}

impl ControlValue {
    pub fn in_range(&self) -> bool {
        match self {
            ControlValue::Integer(v) => v.bounds.contains(v.value),
            ControlValue::Real(v) => v.bounds.contains(v.value),
        }
    }

    pub fn clamped(&self) -> Self {
        match *self {
            ControlValue::Integer(v) => ControlValue::Integer(IntegerValue {
                value: v.bounds.clamp(v.value),
                ..v
            }),
            ControlValue::Real(v) => ControlValue::Real(RealValue {
                value: v.bounds.clamp(v.value),
                ..v
            }),
        }
    }

    pub fn as_f32(&self) -> f32 {
        match self {
            ControlValue::Integer(v) => v.value as f32,
            ControlValue::Real(v) => v.value,
        }
    }

    /// Text shown next to the control
    pub fn display(&self) -> String {
        match self {
            ControlValue::Integer(v) => match v.unit {
                Unit::ShutterDenominator => format!("1/{}", v.value),
                _ => v.value.to_string(),
            },
            ControlValue::Real(v) => match v.unit {
                Unit::Iso => format!("{:.0}", v.value),
                Unit::Kelvin => format!("{:.0}K", v.value),
                _ => format!("{:.1}", v.value),
            },
        }
    }
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

use super::value::{Bounds, ControlParameter, ControlValue, IntegerValue, RealValue, Unit};
use crate::device::DeviceCommand;
use crate::error::DeviceError;
use crate::session::DeviceWriter;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Result of a manual edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManualOutcome {
    /// The parameter is in auto mode; nothing happened
    Ignored,
    /// Stored, but the hardware write waits for the rest of a compound value
    Pending,
    Applied,
}

/// Conduit between one scalar hardware value and its user-facing value.
///
/// While `auto` is set the value only follows hardware reports. Otherwise
/// the value is authoritative and every manual edit is written through.
/// Writes are committed to local state only after the hardware accepted
/// them.
#[derive(Debug, Clone)]
pub struct ParameterChannel {
    parameter: ControlParameter,
    auto: bool,
    value: RealValue,
    last_reported: Option<f32>,
    command: fn(f32) -> DeviceCommand,
}

impl ParameterChannel {
    pub fn exposure_bias(bounds: Bounds<f32>) -> Self {
        Self::new(
            ControlParameter::ExposureBias,
            Unit::ExposureValue,
            bounds,
            0.0,
            DeviceCommand::ExposureBias,
        )
    }

    pub fn focus() -> Self {
        Self::new(
            ControlParameter::FocusPosition,
            Unit::LensPosition,
            Bounds::new(0.0, 1.0),
            0.5,
            DeviceCommand::LensPosition,
        )
    }

    pub fn white_balance(bounds: Bounds<f32>) -> Self {
        Self::new(
            ControlParameter::WhiteBalanceTemperature,
            Unit::Kelvin,
            bounds,
            bounds.clamp(6500.0),
            DeviceCommand::WhiteBalanceTemperature,
        )
    }

    fn new(
        parameter: ControlParameter,
        unit: Unit,
        bounds: Bounds<f32>,
        initial: f32,
        command: fn(f32) -> DeviceCommand,
    ) -> Self {
        Self {
            parameter,
            auto: true,
            value: RealValue {
                value: initial,
                unit,
                bounds,
            },
            last_reported: None,
            command,
        }
    }

    pub fn parameter(&self) -> ControlParameter {
        self.parameter
    }

    pub fn is_auto(&self) -> bool {
        self.auto
    }

    pub fn value(&self) -> f32 {
        self.value.value
    }

    pub fn control_value(&self) -> ControlValue {
        ControlValue::Real(self.value)
    }

    pub fn bounds(&self) -> Bounds<f32> {
        self.value.bounds
    }

    pub fn last_reported(&self) -> Option<f32> {
        self.last_reported
    }

    /// Hand the parameter back to the hardware.
    ///
    /// Exposure bias is reset to neutral before the mode command.
    pub async fn set_auto(&mut self, writer: &dyn DeviceWriter) -> Result<(), DeviceError> {
        let neutral_bias = self.parameter == ControlParameter::ExposureBias;
        if neutral_bias {
            writer.write(DeviceCommand::ExposureBias(0.0)).await?;
        }
        writer
            .write(DeviceCommand::ModeChange(self.parameter.auto_mode()))
            .await?;

        self.auto = true;
        if neutral_bias {
            self.last_reported = Some(0.0);
        }
        if let Some(reported) = self.last_reported {
            self.value.value = reported;
        }
        Ok(())
    }

    /// Write a manual value; a no-op while in auto mode
    pub async fn set_manual_value(
        &mut self,
        value: f32,
        writer: &dyn DeviceWriter,
    ) -> Result<ManualOutcome, DeviceError> {
        if self.auto {
            debug!("Ignoring manual {} while in auto mode", self.parameter);
            return Ok(ManualOutcome::Ignored);
        }

        let value = self.value.bounds.clamp(value);
        writer.write((self.command)(value)).await?;
        self.value.value = value;
        Ok(ManualOutcome::Applied)
    }

    /// Mirror a reported value; returns false when it was discarded
    pub fn on_hardware_value_changed(&mut self, value: f32) -> bool {
        if !self.auto {
            trace!("Discarding {} report {} in manual mode", self.parameter, value);
            return false;
        }
        self.last_reported = Some(value);
        self.value.value = value;
        true
    }

    /// Make the user authoritative. No hardware write happens until the
    /// first manual value.
    pub fn release(&mut self) {
        self.auto = false;
    }

    /// Mark auto without a mode command, for when the hardware already
    /// runs automatically (fresh input, point-of-interest metering)
    pub fn mark_auto(&mut self) {
        self.auto = true;
    }

    pub fn set_bounds(&mut self, bounds: Bounds<f32>) {
        self.value.bounds = bounds;
        if !self.auto {
            self.value.value = bounds.clamp(self.value.value);
        }
    }
}

/// Coupled ISO and shutter channel.
///
/// A custom exposure needs both values, so a write is issued only once
/// both are known and the channel is manual.
#[derive(Debug, Clone)]
pub struct IsoShutterChannel {
    auto: bool,
    iso: Option<f32>,
    shutter: Option<i32>,
    iso_bounds: Bounds<f32>,
    shutter_bounds: Bounds<i32>,
    reported_iso: Option<f32>,
    reported_shutter: Option<i32>,
}

impl IsoShutterChannel {
    pub fn new(iso_bounds: Bounds<f32>, shutter_bounds: Bounds<i32>) -> Self {
        Self {
            auto: true,
            iso: None,
            shutter: None,
            iso_bounds,
            shutter_bounds,
            reported_iso: None,
            reported_shutter: None,
        }
    }

    pub fn is_auto(&self) -> bool {
        self.auto
    }

    pub fn iso(&self) -> Option<f32> {
        self.iso
    }

    pub fn shutter(&self) -> Option<i32> {
        self.shutter
    }

    pub fn iso_bounds(&self) -> Bounds<f32> {
        self.iso_bounds
    }

    pub fn shutter_bounds(&self) -> Bounds<i32> {
        self.shutter_bounds
    }

    pub fn iso_value(&self) -> Option<ControlValue> {
        self.iso.map(|value| {
            ControlValue::Real(RealValue {
                value,
                unit: Unit::Iso,
                bounds: self.iso_bounds,
            })
        })
    }

    pub fn shutter_value(&self) -> Option<ControlValue> {
        self.shutter.map(|value| {
            ControlValue::Integer(IntegerValue {
                value,
                unit: Unit::ShutterDenominator,
                bounds: self.shutter_bounds,
            })
        })
    }

    pub async fn set_auto(&mut self, writer: &dyn DeviceWriter) -> Result<(), DeviceError> {
        writer
            .write(DeviceCommand::ModeChange(
                ControlParameter::IsoAndShutter.auto_mode(),
            ))
            .await?;

        self.auto = true;
        if self.reported_iso.is_some() {
            self.iso = self.reported_iso;
        }
        if self.reported_shutter.is_some() {
            self.shutter = self.reported_shutter;
        }
        Ok(())
    }

    pub async fn set_manual_iso(
        &mut self,
        iso: f32,
        writer: &dyn DeviceWriter,
    ) -> Result<ManualOutcome, DeviceError> {
        if self.auto {
            debug!("Ignoring manual ISO while in auto mode");
            return Ok(ManualOutcome::Ignored);
        }
        let iso = self.iso_bounds.clamp(iso);
        self.commit(Some(iso), self.shutter, writer).await
    }

    pub async fn set_manual_shutter(
        &mut self,
        denominator: i32,
        writer: &dyn DeviceWriter,
    ) -> Result<ManualOutcome, DeviceError> {
        if self.auto {
            debug!("Ignoring manual shutter speed while in auto mode");
            return Ok(ManualOutcome::Ignored);
        }
        let denominator = self.shutter_bounds.clamp(denominator);
        self.commit(self.iso, Some(denominator), writer).await
    }

    async fn commit(
        &mut self,
        iso: Option<f32>,
        shutter: Option<i32>,
        writer: &dyn DeviceWriter,
    ) -> Result<ManualOutcome, DeviceError> {
        let (Some(iso_value), Some(shutter_value)) = (iso, shutter) else {
            self.iso = iso;
            self.shutter = shutter;
            return Ok(ManualOutcome::Pending);
        };

        writer
            .write(DeviceCommand::IsoAndShutter {
                iso: iso_value,
                shutter_denominator: shutter_value,
            })
            .await?;
        self.iso = iso;
        self.shutter = shutter;
        Ok(ManualOutcome::Applied)
    }

    pub fn on_hardware_iso(&mut self, iso: f32) -> bool {
        if !self.auto {
            trace!("Discarding ISO report {} in manual mode", iso);
            return false;
        }
        self.reported_iso = Some(iso);
        self.iso = Some(iso);
        true
    }

    pub fn on_hardware_shutter(&mut self, denominator: i32) -> bool {
        if !self.auto {
            trace!("Discarding shutter report 1/{} in manual mode", denominator);
            return false;
        }
        self.reported_shutter = Some(denominator);
        self.shutter = Some(denominator);
        true
    }

    pub fn release(&mut self) {
        self.auto = false;
    }

    pub fn mark_auto(&mut self) {
        self.auto = true;
    }

    pub fn set_bounds(&mut self, iso_bounds: Bounds<f32>, shutter_bounds: Bounds<i32>) {
        self.iso_bounds = iso_bounds;
        self.shutter_bounds = shutter_bounds;
        if !self.auto {
            self.iso = self.iso.map(|iso| iso_bounds.clamp(iso));
            self.shutter = self.shutter.map(|shutter| shutter_bounds.clamp(shutter));
        }
    }
}

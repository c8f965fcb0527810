//! Cross-parameter auto/manual rules.
//!
//! Every user action goes through [`ModeArbiter`] so that the other
//! auto-governed parameters stay consistent with it. The arbiter runs on the
//! coordinator task, the same place hardware reports are applied, so a rule
//! is never interleaved with a report.

use crate::config::ControlsConfig;
use crate::device::{DeviceCommand, DeviceFormat, FocusPoint, HardwareReport, WhiteBalanceGains};
use crate::error::DeviceError;
use crate::parameter::{
    Bounds, ControlParameter, ControlValue, IsoShutterChannel, ManualOutcome, ParameterChannel,
};
use crate::session::DeviceWriter;
use serde::Serialize;
use tracing::{debug, warn};

/// User-facing view of one parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterState {
    pub parameter: ControlParameter,
    pub auto: bool,
    pub values: Vec<ControlValue>,
    pub display: String,
}

pub struct ModeArbiter {
    exposure: ParameterChannel,
    iso_shutter: IsoShutterChannel,
    focus: ParameterChannel,
    white_balance: ParameterChannel,
    fastest_shutter: i32,
}

impl ModeArbiter {
    pub fn new(controls: &ControlsConfig) -> Self {
        let fastest_shutter = controls.fastest_shutter_denominator.max(1);
        Self {
            exposure: ParameterChannel::exposure_bias(Bounds::new(
                controls.exposure_bias_min,
                controls.exposure_bias_max,
            )),
            iso_shutter: IsoShutterChannel::new(
                Bounds::new(controls.fallback_iso, controls.fallback_iso),
                Bounds::new(1, fastest_shutter),
            ),
            focus: ParameterChannel::focus(),
            white_balance: ParameterChannel::white_balance(Bounds::new(
                controls.white_balance_min,
                controls.white_balance_max,
            )),
            fastest_shutter,
        }
    }

    pub fn is_auto(&self, parameter: ControlParameter) -> bool {
        match parameter {
            ControlParameter::ExposureBias => self.exposure.is_auto(),
            ControlParameter::IsoAndShutter => self.iso_shutter.is_auto(),
            ControlParameter::FocusPosition => self.focus.is_auto(),
            ControlParameter::WhiteBalanceTemperature => self.white_balance.is_auto(),
        }
    }

    /// True when every parameter is hardware-driven
    pub fn all_auto_active(&self) -> bool {
        ControlParameter::ALL.iter().all(|p| self.is_auto(*p))
    }

    /// Return one parameter to auto.
    ///
    /// Automatic ISO and shutter also restore automatic exposure with a
    /// neutral bias, since a bias left over from a custom exposure would
    /// skew the metered result.
    pub async fn set_auto(
        &mut self,
        parameter: ControlParameter,
        writer: &dyn DeviceWriter,
    ) -> Result<(), DeviceError> {
        self.channel_auto(parameter, writer).await?;
        if parameter == ControlParameter::IsoAndShutter {
            self.exposure.set_auto(writer).await?;
        }
        Ok(())
    }

    async fn channel_auto(
        &mut self,
        parameter: ControlParameter,
        writer: &dyn DeviceWriter,
    ) -> Result<(), DeviceError> {
        match parameter {
            ControlParameter::ExposureBias => self.exposure.set_auto(writer).await,
            ControlParameter::IsoAndShutter => self.iso_shutter.set_auto(writer).await,
            ControlParameter::FocusPosition => self.focus.set_auto(writer).await,
            ControlParameter::WhiteBalanceTemperature => self.white_balance.set_auto(writer).await,
        }
    }

    /// Hand every parameter back to the hardware.
    ///
    /// Each parameter is attempted even if an earlier one fails; the first
    /// failure is returned.
    pub async fn all_auto(&mut self, writer: &dyn DeviceWriter) -> Result<(), DeviceError> {
        let mut first_error = None;
        for parameter in ControlParameter::ALL {
            if let Err(e) = self.channel_auto(parameter, writer).await {
                warn!("Failed to return {} to auto: {}", parameter, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Manual exposure bias. ISO and shutter are returned to continuous
    /// auto first since a bias only applies to automatically metered
    /// exposure. The mode command is sent even when the flag is already
    /// auto: after a point of interest the device meters once and locks.
    pub async fn manual_exposure(
        &mut self,
        bias: f32,
        writer: &dyn DeviceWriter,
    ) -> Result<ManualOutcome, DeviceError> {
        self.iso_shutter.set_auto(writer).await?;

        let previous = self.exposure.clone();
        self.exposure.release();
        match self.exposure.set_manual_value(bias, writer).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.exposure = previous;
                Err(e)
            }
        }
    }

    pub async fn manual_iso(
        &mut self,
        iso: f32,
        writer: &dyn DeviceWriter,
    ) -> Result<ManualOutcome, DeviceError> {
        let previous = self.iso_shutter.clone();
        self.iso_shutter.release();
        match self.iso_shutter.set_manual_iso(iso, writer).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.iso_shutter = previous;
                Err(e)
            }
        }
    }

    pub async fn manual_shutter(
        &mut self,
        denominator: i32,
        writer: &dyn DeviceWriter,
    ) -> Result<ManualOutcome, DeviceError> {
        let previous = self.iso_shutter.clone();
        self.iso_shutter.release();
        match self.iso_shutter.set_manual_shutter(denominator, writer).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.iso_shutter = previous;
                Err(e)
            }
        }
    }

    pub async fn manual_focus(
        &mut self,
        lens_position: f32,
        writer: &dyn DeviceWriter,
    ) -> Result<ManualOutcome, DeviceError> {
        Self::manual_scalar(&mut self.focus, lens_position, writer).await
    }

    pub async fn manual_white_balance(
        &mut self,
        kelvin: f32,
        writer: &dyn DeviceWriter,
    ) -> Result<ManualOutcome, DeviceError> {
        Self::manual_scalar(&mut self.white_balance, kelvin, writer).await
    }

    async fn manual_scalar(
        channel: &mut ParameterChannel,
        value: f32,
        writer: &dyn DeviceWriter,
    ) -> Result<ManualOutcome, DeviceError> {
        let previous = channel.clone();
        channel.release();
        match channel.set_manual_value(value, writer).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                *channel = previous;
                Err(e)
            }
        }
    }

    /// Focus and meter at `point`.
    ///
    /// The device runs one-shot auto focus and exposure afterwards, which
    /// also drops any custom ISO and shutter, so all three exposure-side
    /// flags become auto along with focus.
    pub async fn focus_at_point(
        &mut self,
        point: FocusPoint,
        writer: &dyn DeviceWriter,
    ) -> Result<(), DeviceError> {
        writer.write(DeviceCommand::FocusPoint(point)).await?;
        self.focus.mark_auto();
        self.exposure.mark_auto();
        self.iso_shutter.mark_auto();
        Ok(())
    }

    /// A fresh input starts in continuous auto on every sub-system
    pub fn on_lens_switched(&mut self, format: DeviceFormat) {
        for parameter in ControlParameter::ALL {
            if !self.is_auto(parameter) {
                debug!("Forcing {} to auto after lens switch", parameter);
            }
        }
        self.exposure.mark_auto();
        self.iso_shutter.mark_auto();
        self.focus.mark_auto();
        self.white_balance.mark_auto();
        self.apply_format(format);
    }

    /// Refresh ISO and shutter ranges from the device format
    pub fn apply_format(&mut self, format: DeviceFormat) {
        let slowest = format.max_exposure_duration.shutter_denominator();
        self.iso_shutter.set_bounds(
            Bounds::new(format.min_iso, format.max_iso),
            Bounds::new(slowest.min(self.fastest_shutter), self.fastest_shutter),
        );
    }

    /// Apply one hardware report. Returns the parameter whose user-facing
    /// value changed, or `None` when the report was discarded.
    pub fn on_hardware_report<F>(
        &mut self,
        report: HardwareReport,
        temperature_for_gains: F,
    ) -> Option<ControlParameter>
    where
        F: FnOnce(WhiteBalanceGains) -> Option<f32>,
    {
        let changed = match report {
            HardwareReport::ExposureBias(bias) => self.exposure.on_hardware_value_changed(bias),
            HardwareReport::Iso(iso) => self.iso_shutter.on_hardware_iso(iso),
            HardwareReport::ExposureDuration(duration) => self
                .iso_shutter
                .on_hardware_shutter(duration.shutter_denominator()),
            HardwareReport::LensPosition(position) => {
                self.focus.on_hardware_value_changed(position)
            }
            HardwareReport::WhiteBalanceGains(gains) => {
                if !self.white_balance.is_auto() {
                    return None;
                }
                match temperature_for_gains(gains) {
                    Some(kelvin) => self.white_balance.on_hardware_value_changed(kelvin),
                    None => false,
                }
            }
        };

        changed.then(|| Self::parameter_for(&report))
    }

    pub fn state(&self, parameter: ControlParameter) -> ParameterState {
        let (auto, values) = match parameter {
            ControlParameter::ExposureBias => {
                (self.exposure.is_auto(), vec![self.exposure.control_value()])
            }
            ControlParameter::IsoAndShutter => (
                self.iso_shutter.is_auto(),
                self.iso_shutter
                    .iso_value()
                    .into_iter()
                    .chain(self.iso_shutter.shutter_value())
                    .collect(),
            ),
            ControlParameter::FocusPosition => {
                (self.focus.is_auto(), vec![self.focus.control_value()])
            }
            ControlParameter::WhiteBalanceTemperature => (
                self.white_balance.is_auto(),
                vec![self.white_balance.control_value()],
            ),
        };

        let display = if values.is_empty() {
            "--".to_string()
        } else {
            values
                .iter()
                .map(ControlValue::display)
                .collect::<Vec<_>>()
                .join(" ")
        };

        ParameterState {
            parameter,
            auto,
            values,
            display,
        }
    }

    pub fn snapshot(&self) -> Vec<ParameterState> {
        ControlParameter::ALL
            .iter()
            .map(|parameter| self.state(*parameter))
            .collect()
    }

    pub fn exposure(&self) -> &ParameterChannel {
        &self.exposure
    }

    pub fn iso_shutter(&self) -> &IsoShutterChannel {
        &self.iso_shutter
    }

    pub fn focus(&self) -> &ParameterChannel {
        &self.focus
    }

    pub fn white_balance(&self) -> &ParameterChannel {
        &self.white_balance
    }

    fn parameter_for(report: &HardwareReport) -> ControlParameter {
        match report {
            HardwareReport::ExposureBias(_) => ControlParameter::ExposureBias,
            HardwareReport::Iso(_) | HardwareReport::ExposureDuration(_) => {
                ControlParameter::IsoAndShutter
            }
            HardwareReport::LensPosition(_) => ControlParameter::FocusPosition,
            HardwareReport::WhiteBalanceGains(_) => ControlParameter::WhiteBalanceTemperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{ExposureDuration, ExposureMode, ModeChange};
    use crate::parameter::tests::RecordingWriter;

    fn create_test_arbiter() -> ModeArbiter {
        let mut arbiter = ModeArbiter::new(&ControlsConfig::default());
        arbiter.apply_format(DeviceFormat {
            min_iso: 32.0,
            max_iso: 3200.0,
            max_exposure_duration: ExposureDuration::new(1, 3),
        });
        arbiter
    }

    fn continuous_exposure() -> DeviceCommand {
        DeviceCommand::ModeChange(ModeChange::Exposure(ExposureMode::ContinuousAuto))
    }

    #[tokio::test]
    async fn test_manual_exposure_forces_iso_auto() {
        let writer = RecordingWriter::default();
        let mut arbiter = create_test_arbiter();
        arbiter.on_hardware_report(HardwareReport::Iso(100.0), |_| None);
        arbiter.on_hardware_report(
            HardwareReport::ExposureDuration(ExposureDuration::new(1, 60)),
            |_| None,
        );
        arbiter.manual_iso(400.0, &writer).await.unwrap();
        assert!(!arbiter.is_auto(ControlParameter::IsoAndShutter));
        writer.clear();

        let outcome = arbiter.manual_exposure(1.0, &writer).await.unwrap();

        assert_eq!(outcome, ManualOutcome::Applied);
        assert!(arbiter.is_auto(ControlParameter::IsoAndShutter));
        assert!(!arbiter.is_auto(ControlParameter::ExposureBias));
        assert_eq!(
            writer.commands(),
            vec![continuous_exposure(), DeviceCommand::ExposureBias(1.0)]
        );
    }

    #[tokio::test]
    async fn test_manual_exposure_always_restores_continuous_metering() {
        let writer = RecordingWriter::default();
        let mut arbiter = create_test_arbiter();
        arbiter
            .focus_at_point(FocusPoint::center(), &writer)
            .await
            .unwrap();
        writer.clear();

        arbiter.manual_exposure(-2.0, &writer).await.unwrap();

        assert_eq!(
            writer.commands(),
            vec![continuous_exposure(), DeviceCommand::ExposureBias(-2.0)]
        );
        assert!(arbiter.is_auto(ControlParameter::IsoAndShutter));
        assert_eq!(arbiter.exposure().value(), -2.0);
    }

    #[tokio::test]
    async fn test_iso_auto_also_resets_exposure_bias() {
        let writer = RecordingWriter::default();
        let mut arbiter = create_test_arbiter();
        arbiter.manual_exposure(1.5, &writer).await.unwrap();
        arbiter.manual_shutter(250, &writer).await.unwrap();
        writer.clear();

        arbiter
            .set_auto(ControlParameter::IsoAndShutter, &writer)
            .await
            .unwrap();

        assert!(arbiter.is_auto(ControlParameter::IsoAndShutter));
        assert!(arbiter.is_auto(ControlParameter::ExposureBias));
        assert_eq!(arbiter.exposure().value(), 0.0);
        assert_eq!(
            writer.commands(),
            vec![
                continuous_exposure(),
                DeviceCommand::ExposureBias(0.0),
                continuous_exposure(),
            ]
        );
    }

    #[tokio::test]
    async fn test_all_auto_writes_each_mode_once() {
        let writer = RecordingWriter::default();
        let mut arbiter = create_test_arbiter();

        arbiter.all_auto(&writer).await.unwrap();

        let bias_resets = writer
            .commands()
            .into_iter()
            .filter(|command| *command == DeviceCommand::ExposureBias(0.0))
            .count();
        assert_eq!(bias_resets, 1);
    }

    #[tokio::test]
    async fn test_failed_manual_exposure_leaves_flag_unchanged() {
        let writer = RecordingWriter::default();
        let mut arbiter = create_test_arbiter();
        writer.set_failing(true);

        assert!(arbiter.manual_exposure(3.0, &writer).await.is_err());

        assert!(arbiter.is_auto(ControlParameter::ExposureBias));
        assert_eq!(arbiter.exposure().value(), 0.0);
    }

    #[tokio::test]
    async fn test_failed_manual_focus_leaves_flag_unchanged() {
        let writer = RecordingWriter::default();
        let mut arbiter = create_test_arbiter();
        arbiter.on_hardware_report(HardwareReport::LensPosition(0.6), |_| None);
        writer.set_failing(true);

        assert!(arbiter.manual_focus(0.1, &writer).await.is_err());

        assert!(arbiter.is_auto(ControlParameter::FocusPosition));
        assert_eq!(arbiter.focus().value(), 0.6);
    }

    #[tokio::test]
    async fn test_focus_at_point_restores_auto_repeatedly() {
        let writer = RecordingWriter::default();
        let mut arbiter = create_test_arbiter();
        arbiter.manual_focus(0.2, &writer).await.unwrap();
        arbiter.manual_exposure(1.0, &writer).await.unwrap();

        for _ in 0..2 {
            arbiter
                .focus_at_point(FocusPoint::new(0.3, 0.3), &writer)
                .await
                .unwrap();
            assert!(arbiter.is_auto(ControlParameter::FocusPosition));
            assert!(arbiter.is_auto(ControlParameter::ExposureBias));
            assert!(arbiter.is_auto(ControlParameter::IsoAndShutter));
        }
    }

    #[tokio::test]
    async fn test_all_auto_resets_every_parameter() {
        let writer = RecordingWriter::default();
        let mut arbiter = create_test_arbiter();
        arbiter.manual_focus(0.2, &writer).await.unwrap();
        arbiter.manual_white_balance(4000.0, &writer).await.unwrap();
        arbiter.manual_shutter(250, &writer).await.unwrap();
        assert!(!arbiter.all_auto_active());

        arbiter.all_auto(&writer).await.unwrap();

        assert!(arbiter.all_auto_active());
    }

    #[tokio::test]
    async fn test_all_auto_reports_failure_without_flipping() {
        let writer = RecordingWriter::default();
        let mut arbiter = create_test_arbiter();
        arbiter.manual_white_balance(4000.0, &writer).await.unwrap();
        writer.set_failing(true);

        assert!(arbiter.all_auto(&writer).await.is_err());

        assert!(!arbiter.is_auto(ControlParameter::WhiteBalanceTemperature));
        assert_eq!(arbiter.white_balance().value(), 4000.0);
    }

    #[tokio::test]
    async fn test_lens_switch_forces_auto_and_refreshes_ranges() {
        let writer = RecordingWriter::default();
        let mut arbiter = create_test_arbiter();
        arbiter.manual_focus(0.9, &writer).await.unwrap();
        arbiter.manual_iso(800.0, &writer).await.unwrap();

        arbiter.on_lens_switched(DeviceFormat {
            min_iso: 25.0,
            max_iso: 2000.0,
            max_exposure_duration: ExposureDuration::new(1, 2),
        });

        assert!(arbiter.all_auto_active());
        assert_eq!(arbiter.iso_shutter().iso_bounds(), Bounds::new(25.0, 2000.0));
        assert_eq!(arbiter.iso_shutter().shutter_bounds(), Bounds::new(2, 1000));
    }

    #[tokio::test]
    async fn test_reports_discarded_while_manual() {
        let writer = RecordingWriter::default();
        let mut arbiter = create_test_arbiter();
        arbiter.manual_focus(0.3, &writer).await.unwrap();

        let changed = arbiter.on_hardware_report(HardwareReport::LensPosition(0.8), |_| None);

        assert_eq!(changed, None);
        assert_eq!(arbiter.focus().value(), 0.3);
    }

    #[test]
    fn test_auto_value_tracks_latest_report() {
        let mut arbiter = create_test_arbiter();

        for bias in [0.5, -1.0, 2.5] {
            let changed = arbiter.on_hardware_report(HardwareReport::ExposureBias(bias), |_| None);
            assert_eq!(changed, Some(ControlParameter::ExposureBias));
            assert_eq!(arbiter.exposure().value(), bias);
        }
    }

    #[test]
    fn test_white_balance_report_converted_to_kelvin() {
        let mut arbiter = create_test_arbiter();
        let gains = WhiteBalanceGains {
            red: 1.0,
            green: 1.0,
            blue: 1.0,
        };

        let changed = arbiter.on_hardware_report(HardwareReport::WhiteBalanceGains(gains), |_| {
            Some(5600.0)
        });

        assert_eq!(changed, Some(ControlParameter::WhiteBalanceTemperature));
        assert_eq!(arbiter.white_balance().value(), 5600.0);
        assert_eq!(
            arbiter.state(ControlParameter::WhiteBalanceTemperature).display,
            "5600K"
        );
    }

    #[test]
    fn test_state_display() {
        let mut arbiter = create_test_arbiter();
        assert_eq!(arbiter.state(ControlParameter::IsoAndShutter).display, "--");

        arbiter.on_hardware_report(HardwareReport::Iso(200.0), |_| None);
        arbiter.on_hardware_report(
            HardwareReport::ExposureDuration(ExposureDuration::new(1, 125)),
            |_| None,
        );

        let state = arbiter.state(ControlParameter::IsoAndShutter);
        assert!(state.auto);
        assert_eq!(state.display, "200 1/125");
        assert_eq!(arbiter.snapshot().len(), 4);
    }
}

use crate::device::{
    CaptureDevice, DeviceFormat, ExposureDuration, ExposureMode, FocusMode, FocusPoint,
    HardwareReport, ObservationSink, WhiteBalanceGains, WhiteBalanceMode,
};
use crate::error::DeviceError;
use crate::lens::Lens;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::trace;

/// Daylight temperature where all gains are neutral
const NEUTRAL_KELVIN: f32 = 6500.0;

/// Snapshot of the simulated sensor state
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeviceState {
    pub exposure_mode: ExposureMode,
    pub focus_mode: FocusMode,
    pub white_balance_mode: WhiteBalanceMode,
    pub exposure_bias: f32,
    pub iso: f32,
    pub exposure_duration: ExposureDuration,
    pub lens_position: f32,
    pub gains: WhiteBalanceGains,
    pub focus_point: Option<FocusPoint>,
    pub exposure_point: Option<FocusPoint>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            exposure_mode: ExposureMode::ContinuousAuto,
            focus_mode: FocusMode::ContinuousAuto,
            white_balance_mode: WhiteBalanceMode::ContinuousAuto,
            exposure_bias: 0.0,
            iso: 100.0,
            exposure_duration: ExposureDuration::new(1, 120),
            lens_position: 0.5,
            gains: WhiteBalanceGains {
                red: 1.0,
                green: 1.0,
                blue: 1.0,
            },
            focus_point: None,
            exposure_point: None,
        }
    }
}

/// In-memory capture device with write recording and failure injection
pub struct SimulatedDevice {
    lens: Lens,
    format: DeviceFormat,
    has_focus: bool,
    state: Mutex<DeviceState>,
    locked: AtomicBool,
    lock_count: AtomicUsize,
    unlock_count: AtomicUsize,
    writes: Mutex<Vec<&'static str>>,
    fail_lock: AtomicBool,
    fail_property: Mutex<Option<&'static str>>,
    sink: Mutex<Option<ObservationSink>>,
}

impl SimulatedDevice {
    pub fn new(lens: Lens, format: DeviceFormat) -> Self {
        // Front modules are fixed-focus
        let has_focus = !lens.is_front();
        Self {
            lens,
            format,
            has_focus,
            state: Mutex::new(DeviceState::default()),
            locked: AtomicBool::new(false),
            lock_count: AtomicUsize::new(0),
            unlock_count: AtomicUsize::new(0),
            writes: Mutex::new(Vec::new()),
            fail_lock: AtomicBool::new(false),
            fail_property: Mutex::new(None),
            sink: Mutex::new(None),
        }
    }

    pub fn state(&self) -> DeviceState {
        *self.state.lock()
    }

    /// Properties written so far, in order
    pub fn writes(&self) -> Vec<&'static str> {
        self.writes.lock().clone()
    }

    pub fn lock_count(&self) -> usize {
        self.lock_count.load(Ordering::SeqCst)
    }

    pub fn unlock_count(&self) -> usize {
        self.unlock_count.load(Ordering::SeqCst)
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    pub fn fail_lock(&self, fail: bool) {
        self.fail_lock.store(fail, Ordering::SeqCst);
    }

    /// Make writes of `property` fail until cleared with `None`
    pub fn fail_property(&self, property: Option<&'static str>) {
        *self.fail_property.lock() = property;
    }

    pub fn is_observed(&self) -> bool {
        self.sink
            .lock()
            .as_ref()
            .map(ObservationSink::is_active)
            .unwrap_or(false)
    }

    /// Push a value as if the hardware had measured it
    pub fn report(&self, report: HardwareReport) -> bool {
        let sink = self.sink.lock().clone();
        match sink {
            Some(sink) => sink.report(report),
            None => false,
        }
    }

    /// Nudge auto-governed values the way a live sensor would
    pub fn drift(&self, step: u32) {
        let reports = {
            let mut state = self.state.lock();
            let mut reports = Vec::new();
            let wave = (step % 8) as f32 - 4.0;

            if state.exposure_mode != ExposureMode::Custom {
                state.iso = (100.0 + wave * 10.0).clamp(self.format.min_iso, self.format.max_iso);
                state.exposure_duration = ExposureDuration::new(1, 120 + (wave * 10.0) as i32);
                reports.push(HardwareReport::Iso(state.iso));
                reports.push(HardwareReport::ExposureDuration(state.exposure_duration));
            }
            if self.has_focus && state.focus_mode == FocusMode::ContinuousAuto {
                state.lens_position = 0.5 + wave * 0.05;
                reports.push(HardwareReport::LensPosition(state.lens_position));
            }
            if state.white_balance_mode == WhiteBalanceMode::ContinuousAuto {
                state.gains = self.gains_for_temperature(5500.0 + wave * 100.0);
                reports.push(HardwareReport::WhiteBalanceGains(state.gains));
            }
            reports
        };

        for report in reports {
            self.report(report);
        }
    }

    fn write<F>(&self, property: &'static str, apply: F) -> Result<Vec<HardwareReport>, DeviceError>
    where
        F: FnOnce(&mut DeviceState) -> Vec<HardwareReport>,
    {
        if !self.is_locked() {
            return Err(DeviceError::write(
                self.lens.id.as_str(),
                property,
                "device is not locked for configuration",
            ));
        }
        if *self.fail_property.lock() == Some(property) {
            return Err(DeviceError::write(
                self.lens.id.as_str(),
                property,
                "injected failure",
            ));
        }

        let reports = {
            let mut state = self.state.lock();
            apply(&mut *state)
        };
        self.writes.lock().push(property);
        trace!("{} wrote {}", self.lens.id, property);
        Ok(reports)
    }

    fn write_and_report<F>(&self, property: &'static str, apply: F) -> Result<(), DeviceError>
    where
        F: FnOnce(&mut DeviceState) -> Vec<HardwareReport>,
    {
        let reports = self.write(property, apply)?;
        for report in reports {
            self.report(report);
        }
        Ok(())
    }
}

impl CaptureDevice for SimulatedDevice {
    fn lens(&self) -> &Lens {
        &self.lens
    }

    fn active_format(&self) -> DeviceFormat {
        self.format
    }

    fn lock_for_configuration(&self) -> Result<(), DeviceError> {
        if self.fail_lock.load(Ordering::SeqCst) {
            return Err(DeviceError::ConfigurationLock {
                device: self.lens.id.to_string(),
                details: "injected failure".to_string(),
            });
        }
        self.locked.store(true, Ordering::SeqCst);
        self.lock_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unlock_for_configuration(&self) {
        self.locked.store(false, Ordering::SeqCst);
        self.unlock_count.fetch_add(1, Ordering::SeqCst);
    }

    fn set_exposure_mode(&self, mode: ExposureMode) -> Result<(), DeviceError> {
        self.write_and_report("exposure_mode", |state| {
            state.exposure_mode = mode;
            Vec::new()
        })
    }

    fn set_exposure_target_bias(&self, bias: f32) -> Result<(), DeviceError> {
        self.write_and_report("exposure_bias", |state| {
            state.exposure_bias = bias;
            vec![HardwareReport::ExposureBias(bias)]
        })
    }

    fn set_custom_exposure(
        &self,
        duration: ExposureDuration,
        iso: f32,
    ) -> Result<(), DeviceError> {
        let iso = iso.clamp(self.format.min_iso, self.format.max_iso);
        self.write_and_report("custom_exposure", |state| {
            state.exposure_mode = ExposureMode::Custom;
            state.exposure_duration = duration;
            state.iso = iso;
            vec![
                HardwareReport::Iso(iso),
                HardwareReport::ExposureDuration(duration),
            ]
        })
    }

    fn supports_exposure_point_of_interest(&self) -> bool {
        true
    }

    fn set_exposure_point_of_interest(&self, point: FocusPoint) -> Result<(), DeviceError> {
        self.write_and_report("exposure_point", |state| {
            state.exposure_point = Some(point);
            Vec::new()
        })
    }

    fn supports_focus(&self) -> bool {
        self.has_focus
    }

    fn set_focus_mode(&self, mode: FocusMode) -> Result<(), DeviceError> {
        self.write_and_report("focus_mode", |state| {
            state.focus_mode = mode;
            Vec::new()
        })
    }

    fn set_focus_locked(&self, lens_position: f32) -> Result<(), DeviceError> {
        let position = lens_position.clamp(0.0, 1.0);
        self.write_and_report("lens_position", |state| {
            state.focus_mode = FocusMode::Locked;
            state.lens_position = position;
            vec![HardwareReport::LensPosition(position)]
        })
    }

    fn supports_focus_point_of_interest(&self) -> bool {
        self.has_focus
    }

    fn set_focus_point_of_interest(&self, point: FocusPoint) -> Result<(), DeviceError> {
        self.write_and_report("focus_point", |state| {
            state.focus_point = Some(point);
            Vec::new()
        })
    }

    fn set_white_balance_mode(&self, mode: WhiteBalanceMode) -> Result<(), DeviceError> {
        self.write_and_report("white_balance_mode", |state| {
            state.white_balance_mode = mode;
            Vec::new()
        })
    }

    fn gains_for_temperature(&self, kelvin: f32) -> WhiteBalanceGains {
        let kelvin = kelvin.max(1.0);
        WhiteBalanceGains {
            red: kelvin / NEUTRAL_KELVIN,
            green: 1.0,
            blue: NEUTRAL_KELVIN / kelvin,
        }
    }

    fn temperature_for_gains(&self, gains: WhiteBalanceGains) -> f32 {
        gains.red * NEUTRAL_KELVIN
    }

    fn set_white_balance_locked(&self, gains: WhiteBalanceGains) -> Result<(), DeviceError> {
        self.write_and_report("white_balance_gains", |state| {
            state.white_balance_mode = WhiteBalanceMode::Locked;
            state.gains = gains;
            vec![HardwareReport::WhiteBalanceGains(gains)]
        })
    }

    fn observe(&self, sink: ObservationSink) {
        let state = self.state();
        *self.sink.lock() = Some(sink.clone());

        sink.report(HardwareReport::ExposureBias(state.exposure_bias));
        sink.report(HardwareReport::Iso(state.iso));
        sink.report(HardwareReport::ExposureDuration(state.exposure_duration));
        if self.has_focus {
            sink.report(HardwareReport::LensPosition(state.lens_position));
        }
        sink.report(HardwareReport::WhiteBalanceGains(state.gains));
    }
}

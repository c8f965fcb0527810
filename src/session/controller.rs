use crate::capture::{CaptureRequest, PhotoCaptureDelegate, RawPhotoData};
use crate::device::{
    CaptureBackend, CaptureDevice, DeviceCommand, DeviceFormat, ExposureDuration, ExposureMode,
    FocusMode, FocusPoint, ModeChange, Observation, ObservationSink, Observed, RawPixelFormat,
    WhiteBalanceGains,
};
use crate::error::{CaptureError, DeviceError};
use crate::lens::{Lens, LensId};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

struct ActiveInput {
    device: Arc<dyn CaptureDevice>,
    _observation: Observation,
}

/// Unlocks the device when the configuration scope ends
struct ConfigurationGuard<'a> {
    device: &'a dyn CaptureDevice,
}

impl Drop for ConfigurationGuard<'_> {
    fn drop(&mut self) {
        self.device.unlock_for_configuration();
    }
}

/// Owns the active capture input and applies every hardware write.
///
/// All methods except `capture_photo` block on the device and belong on the
/// background configuration context. Writes are serialized through a single
/// transaction lock, and a lens switch holds the same lock until the new
/// input is committed.
pub struct CaptureSessionController {
    backend: Arc<dyn CaptureBackend>,
    delegate: Arc<dyn PhotoCaptureDelegate>,
    active: RwLock<Option<ActiveInput>>,
    transaction: Mutex<()>,
    observations: mpsc::UnboundedSender<Observed>,
}

impl CaptureSessionController {
    pub fn new(
        backend: Arc<dyn CaptureBackend>,
        delegate: Arc<dyn PhotoCaptureDelegate>,
        observations: mpsc::UnboundedSender<Observed>,
    ) -> Self {
        Self {
            backend,
            delegate,
            active: RwLock::new(None),
            transaction: Mutex::new(()),
            observations,
        }
    }

    /// Replace the session input with `target`.
    ///
    /// The new input is constructed before the old one is removed, so a
    /// construction failure leaves the session untouched.
    pub fn switch_lens(&self, target: &Lens) -> Result<DeviceFormat, DeviceError> {
        let _transaction = self.transaction.lock();

        let device = self.backend.open_input(target).map_err(|e| {
            warn!("Failed to open input for {}: {}", target, e);
            e
        })?;

        self.backend.begin_configuration();
        self.backend.remove_video_inputs();
        if let Err(e) = self.backend.add_video_input(Arc::clone(&device)) {
            warn!("Failed to add input for {}: {}", target, e);
            if let Some(previous) = self.active.read().as_ref() {
                if let Err(restore) = self.backend.add_video_input(Arc::clone(&previous.device)) {
                    warn!("Failed to restore previous input: {}", restore);
                }
            }
            self.backend.commit_configuration();
            return Err(e);
        }
        self.backend.commit_configuration();

        let format = device.active_format();
        let (sink, observation) =
            ObservationSink::register(target.id.clone(), self.observations.clone());

        // Dropping the previous input cancels its observation
        let previous = self.active.write().replace(ActiveInput {
            device: Arc::clone(&device),
            _observation: observation,
        });
        drop(previous);

        device.observe(sink);
        info!("Switched capture input to {}", target);
        Ok(format)
    }

    pub fn active_lens(&self) -> Option<Lens> {
        self.active
            .read()
            .as_ref()
            .map(|input| input.device.lens().clone())
    }

    pub fn active_lens_id(&self) -> Option<LensId> {
        self.active
            .read()
            .as_ref()
            .map(|input| input.device.lens().id.clone())
    }

    pub fn active_format(&self) -> Option<DeviceFormat> {
        self.active
            .read()
            .as_ref()
            .map(|input| input.device.active_format())
    }

    pub fn apply_exposure_bias(&self, bias: f32) -> Result<(), DeviceError> {
        self.configure("exposure bias", |device| {
            device.set_exposure_target_bias(bias)
        })
    }

    pub fn apply_iso_and_shutter(
        &self,
        iso: f32,
        shutter_denominator: i32,
    ) -> Result<(), DeviceError> {
        let duration = ExposureDuration::from_shutter_denominator(shutter_denominator);
        self.configure("custom exposure", |device| {
            device.set_custom_exposure(duration, iso)
        })
    }

    pub fn apply_focus(&self, lens_position: f32) -> Result<(), DeviceError> {
        self.configure("lens position", |device| {
            if !device.supports_focus() {
                return Err(DeviceError::Unsupported {
                    device: device.lens().id.to_string(),
                    property: "manual focus",
                });
            }
            device.set_focus_locked(lens_position)
        })
    }

    /// Point focus and exposure at `point`, then run one-shot auto modes
    /// on both sub-systems
    pub fn apply_focus_point(&self, point: FocusPoint) -> Result<(), DeviceError> {
        self.configure("point of interest", |device| {
            if device.supports_focus_point_of_interest() {
                device.set_focus_point_of_interest(point)?;
                device.set_focus_mode(FocusMode::AutoFocus)?;
            }
            if device.supports_exposure_point_of_interest() {
                device.set_exposure_point_of_interest(point)?;
                device.set_exposure_mode(ExposureMode::AutoExpose)?;
            }
            Ok(())
        })
    }

    pub fn apply_white_balance_temperature(&self, kelvin: f32) -> Result<(), DeviceError> {
        self.configure("white balance", |device| {
            let gains = device.gains_for_temperature(kelvin);
            device.set_white_balance_locked(gains)
        })
    }

    pub fn apply_mode_change(&self, change: ModeChange) -> Result<(), DeviceError> {
        self.configure("mode", |device| match change {
            ModeChange::Exposure(mode) => device.set_exposure_mode(mode),
            ModeChange::Focus(mode) => {
                if !device.supports_focus() {
                    debug!("{} has no focus control, skipping {:?}", device.lens().id, mode);
                    return Ok(());
                }
                device.set_focus_mode(mode)
            }
            ModeChange::WhiteBalance(mode) => device.set_white_balance_mode(mode),
        })
    }

    pub fn execute(&self, command: &DeviceCommand) -> Result<(), DeviceError> {
        match *command {
            DeviceCommand::ExposureBias(bias) => self.apply_exposure_bias(bias),
            DeviceCommand::IsoAndShutter {
                iso,
                shutter_denominator,
            } => self.apply_iso_and_shutter(iso, shutter_denominator),
            DeviceCommand::LensPosition(position) => self.apply_focus(position),
            DeviceCommand::FocusPoint(point) => self.apply_focus_point(point),
            DeviceCommand::WhiteBalanceTemperature(kelvin) => {
                self.apply_white_balance_temperature(kelvin)
            }
            DeviceCommand::ModeChange(change) => self.apply_mode_change(change),
        }
    }

    /// Convert reported gains to a color temperature on the active device
    pub fn temperature_for_gains(&self, gains: WhiteBalanceGains) -> Option<f32> {
        self.active
            .read()
            .as_ref()
            .map(|input| input.device.temperature_for_gains(gains))
    }

    pub fn available_raw_formats(&self) -> Vec<RawPixelFormat> {
        self.backend.available_raw_formats()
    }

    pub async fn capture_photo(
        &self,
        request: CaptureRequest,
    ) -> Result<RawPhotoData, CaptureError> {
        if self.active.read().is_none() {
            return Err(CaptureError::NoActiveDevice);
        }
        self.delegate.capture(request).await
    }

    fn device(&self) -> Result<Arc<dyn CaptureDevice>, DeviceError> {
        self.active
            .read()
            .as_ref()
            .map(|input| Arc::clone(&input.device))
            .ok_or(DeviceError::NoActiveDevice)
    }

    fn configure<F>(&self, property: &'static str, apply: F) -> Result<(), DeviceError>
    where
        F: FnOnce(&dyn CaptureDevice) -> Result<(), DeviceError>,
    {
        let _transaction = self.transaction.lock();
        let device = self.device()?;

        device.lock_for_configuration().map_err(|e| {
            warn!("Failed to lock {} for {}: {}", device.lens().id, property, e);
            e
        })?;
        let _guard = ConfigurationGuard {
            device: device.as_ref(),
        };

        apply(device.as_ref()).map_err(|e| {
            warn!("Failed to apply {} on {}: {}", property, device.lens().id, e);
            e
        })
    }
}

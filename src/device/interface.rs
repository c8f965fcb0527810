use super::types::{
    DeviceFormat, ExposureDuration, ExposureMode, FocusMode, FocusPoint, HardwareReport,
    RawPixelFormat, WhiteBalanceGains, WhiteBalanceMode,
};
use crate::error::DeviceError;
use crate::lens::{Lens, LensId, LensKind, LensPosition};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Blocking handle to one physical capture device.
///
/// Property setters are only valid between `lock_for_configuration` and
/// `unlock_for_configuration`. Implementations are called from the
/// background configuration context, never from the coordinator task.
pub trait CaptureDevice: Send + Sync {
    fn lens(&self) -> &Lens;

    fn active_format(&self) -> DeviceFormat;

    fn lock_for_configuration(&self) -> Result<(), DeviceError>;

    fn unlock_for_configuration(&self);

    fn set_exposure_mode(&self, mode: ExposureMode) -> Result<(), DeviceError>;

    fn set_exposure_target_bias(&self, bias: f32) -> Result<(), DeviceError>;

    /// Switch to custom exposure with a fixed duration and ISO
    fn set_custom_exposure(&self, duration: ExposureDuration, iso: f32)
        -> Result<(), DeviceError>;

    fn supports_exposure_point_of_interest(&self) -> bool;

    fn set_exposure_point_of_interest(&self, point: FocusPoint) -> Result<(), DeviceError>;

    /// Whether the lens has a movable focus group at all
    fn supports_focus(&self) -> bool;

    fn set_focus_mode(&self, mode: FocusMode) -> Result<(), DeviceError>;

    fn set_focus_locked(&self, lens_position: f32) -> Result<(), DeviceError>;

    fn supports_focus_point_of_interest(&self) -> bool;

    fn set_focus_point_of_interest(&self, point: FocusPoint) -> Result<(), DeviceError>;

    fn set_white_balance_mode(&self, mode: WhiteBalanceMode) -> Result<(), DeviceError>;

    fn gains_for_temperature(&self, kelvin: f32) -> WhiteBalanceGains;

    fn temperature_for_gains(&self, gains: WhiteBalanceGains) -> f32;

    fn set_white_balance_locked(&self, gains: WhiteBalanceGains) -> Result<(), DeviceError>;

    /// Start pushing reported values into `sink` until it goes stale
    fn observe(&self, sink: ObservationSink);
}

/// Enumerates the lenses present on the device
pub trait DeviceDiscovery: Send + Sync {
    fn list_lenses(&self) -> Vec<Lens>;

    /// The wide-angle lens at `position`, if there is one
    fn default_lens(&self, position: LensPosition) -> Option<Lens> {
        self.list_lenses()
            .into_iter()
            .find(|lens| lens.position == position && lens.kind == LensKind::Wide)
    }
}

/// The capture session's input graph
pub trait CaptureBackend: Send + Sync {
    fn open_input(&self, lens: &Lens) -> Result<Arc<dyn CaptureDevice>, DeviceError>;

    fn begin_configuration(&self);

    fn remove_video_inputs(&self);

    fn add_video_input(&self, device: Arc<dyn CaptureDevice>) -> Result<(), DeviceError>;

    fn commit_configuration(&self);

    /// RAW pixel formats the photo output offers for the current input
    fn available_raw_formats(&self) -> Vec<RawPixelFormat>;
}

/// A hardware report tagged with the lens that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Observed {
    pub lens: LensId,
    pub report: HardwareReport,
}

/// Registration handed to a device so it can push reported values.
///
/// The sink goes stale once its [`Observation`] is dropped, after which
/// reports are discarded rather than queued.
#[derive(Debug, Clone)]
pub struct ObservationSink {
    lens: LensId,
    tx: mpsc::UnboundedSender<Observed>,
    token: CancellationToken,
}

impl ObservationSink {
    pub fn register(lens: LensId, tx: mpsc::UnboundedSender<Observed>) -> (Self, Observation) {
        let token = CancellationToken::new();
        let sink = Self {
            lens,
            tx,
            token: token.clone(),
        };
        (sink, Observation { token })
    }

    /// Push a report; returns false when the subscription is gone
    pub fn report(&self, report: HardwareReport) -> bool {
        if self.token.is_cancelled() {
            trace!("Dropping report from stale device {}: {:?}", self.lens, report);
            return false;
        }

        self.tx
            .send(Observed {
                lens: self.lens.clone(),
                report,
            })
            .is_ok()
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled() && !self.tx.is_closed()
    }

    pub fn lens(&self) -> &LensId {
        &self.lens
    }
}

/// Keeps an [`ObservationSink`] live; dropping it unsubscribes
#[derive(Debug)]
pub struct Observation {
    token: CancellationToken,
}

impl Drop for Observation {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

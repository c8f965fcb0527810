use super::commands::Command;
use super::state::CoordinatorSnapshot;
use crate::capture::{FlashMode, PhotoFormat, SequencerStep};
use crate::device::FocusPoint;
use crate::error::{LenslyError, Result};
use crate::lens::{Lens, LensId};
use crate::parameter::{ControlParameter, ManualOutcome};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Cloneable entry point to a running [`CameraCoordinator`].
///
/// Every call is queued and answered by the coordinator task in order.
///
/// [`CameraCoordinator`]: super::CameraCoordinator
#[derive(Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::Sender<Command>,
    cancellation_token: CancellationToken,
}

impl CoordinatorHandle {
    pub(super) fn new(commands: mpsc::Sender<Command>, cancellation_token: CancellationToken) -> Self {
        Self {
            commands,
            cancellation_token,
        }
    }

    pub async fn set_auto(&self, parameter: ControlParameter) -> Result<()> {
        self.request(|reply| Command::SetAuto { parameter, reply })
            .await?
    }

    /// Return every parameter to hardware control
    pub async fn all_auto(&self) -> Result<()> {
        self.request(|reply| Command::AllAuto { reply }).await?
    }

    pub async fn set_exposure_bias(&self, bias: f32) -> Result<ManualOutcome> {
        self.request(|reply| Command::SetExposureBias { bias, reply })
            .await?
    }

    pub async fn set_iso(&self, iso: f32) -> Result<ManualOutcome> {
        self.request(|reply| Command::SetIso { iso, reply }).await?
    }

    /// Shutter speed as N of 1/N seconds
    pub async fn set_shutter_speed(&self, denominator: i32) -> Result<ManualOutcome> {
        self.request(|reply| Command::SetShutterSpeed { denominator, reply })
            .await?
    }

    pub async fn set_focus(&self, lens_position: f32) -> Result<ManualOutcome> {
        self.request(|reply| Command::SetFocus {
            lens_position,
            reply,
        })
        .await?
    }

    pub async fn set_white_balance(&self, kelvin: f32) -> Result<ManualOutcome> {
        self.request(|reply| Command::SetWhiteBalance { kelvin, reply })
            .await?
    }

    pub async fn focus_at_point(&self, point: FocusPoint) -> Result<()> {
        self.request(|reply| Command::FocusAtPoint { point, reply })
            .await?
    }

    /// Switch to `lens`. Returns the new active lens, or `None` when no
    /// such lens exists.
    pub async fn switch_lens(&self, lens: LensId) -> Result<Option<Lens>> {
        self.request(|reply| Command::SwitchLens { lens, reply })
            .await?
    }

    /// Switch to the default lens on the other side of the device
    pub async fn flip_position(&self) -> Result<Option<Lens>> {
        self.request(|reply| Command::FlipPosition { reply }).await?
    }

    pub async fn set_format(&self, format: PhotoFormat) -> Result<()> {
        self.request(|reply| Command::SetFormat { format, reply })
            .await
    }

    pub async fn set_flash(&self, flash: FlashMode) -> Result<()> {
        self.request(|reply| Command::SetFlash { flash, reply })
            .await
    }

    /// Start a capture, using the configured delay when `delay` is `None`
    pub async fn start_capture(&self, delay: Option<i32>) -> Result<SequencerStep> {
        self.request(|reply| Command::StartCapture { delay, reply })
            .await?
    }

    /// Abort the running countdown. Returns false when none was running.
    pub async fn cancel_countdown(&self) -> Result<bool> {
        self.request(|reply| Command::CancelCountdown { reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<CoordinatorSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Stop the coordinator and wait until it has acknowledged
    pub async fn shutdown<S: Into<String>>(&self, reason: S) -> Result<()> {
        let reason = reason.into();
        self.request(|reply| Command::Shutdown { reason, reply })
            .await
    }

    /// Token that stops the coordinator when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Resolves once the coordinator task has exited
    pub async fn stopped(&self) {
        self.commands.closed().await
    }

    async fn request<T, F>(&self, build: F) -> Result<T>
    where
        F: FnOnce(oneshot::Sender<T>) -> Command,
    {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| LenslyError::CoordinatorStopped)?;
        response.await.map_err(|_| LenslyError::CoordinatorStopped)
    }
}

use super::state::CoordinatorSnapshot;
use crate::capture::{FlashMode, PhotoFormat, SequencerStep};
use crate::device::FocusPoint;
use crate::error::Result;
use crate::lens::{Lens, LensId};
use crate::parameter::{ControlParameter, ManualOutcome};
use tokio::sync::oneshot;

pub(super) type Reply<T> = oneshot::Sender<Result<T>>;

/// Requests handled on the coordinator task
#[derive(Debug)]
pub(super) enum Command {
    SetAuto {
        parameter: ControlParameter,
        reply: Reply<()>,
    },
    AllAuto {
        reply: Reply<()>,
    },
    SetExposureBias {
        bias: f32,
        reply: Reply<ManualOutcome>,
    },
    SetIso {
        iso: f32,
        reply: Reply<ManualOutcome>,
    },
    SetShutterSpeed {
        denominator: i32,
        reply: Reply<ManualOutcome>,
    },
    SetFocus {
        lens_position: f32,
        reply: Reply<ManualOutcome>,
    },
    SetWhiteBalance {
        kelvin: f32,
        reply: Reply<ManualOutcome>,
    },
    FocusAtPoint {
        point: FocusPoint,
        reply: Reply<()>,
    },
    SwitchLens {
        lens: LensId,
        reply: Reply<Option<Lens>>,
    },
    FlipPosition {
        reply: Reply<Option<Lens>>,
    },
    SetFormat {
        format: PhotoFormat,
        reply: oneshot::Sender<()>,
    },
    SetFlash {
        flash: FlashMode,
        reply: oneshot::Sender<()>,
    },
    StartCapture {
        delay: Option<i32>,
        reply: Reply<SequencerStep>,
    },
    CancelCountdown {
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<CoordinatorSnapshot>,
    },
    Shutdown {
        reason: String,
        reply: oneshot::Sender<()>,
    },
}

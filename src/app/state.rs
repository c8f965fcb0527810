use crate::arbiter::ParameterState;
use crate::capture::{FlashMode, PhotoFormat, SequencerState};
use crate::lens::{Lens, LensZoomMap};
use crate::parameter::ControlParameter;
use serde::Serialize;
use std::path::PathBuf;

/// Point-in-time view of everything the coordinator owns
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorSnapshot {
    pub active_lens: Option<Lens>,
    pub lenses: Vec<Lens>,
    pub zoom: LensZoomMap,
    pub parameters: Vec<ParameterState>,
    /// True when no parameter is under manual control
    pub all_auto: bool,
    pub sequencer: SequencerState,
    pub format: PhotoFormat,
    pub flash: FlashMode,
    pub last_photo: Option<PathBuf>,
}

impl CoordinatorSnapshot {
    pub fn parameter(&self, parameter: ControlParameter) -> Option<&ParameterState> {
        self.parameters
            .iter()
            .find(|state| state.parameter == parameter)
    }

    /// Zoom label of the active lens, e.g. "2x"
    pub fn zoom_label(&self) -> Option<String> {
        let lens = self.active_lens.as_ref()?;
        self.zoom.get(&lens.id).map(|zoom| zoom.label())
    }
}

pub mod app;
pub mod arbiter;
pub mod capture;
pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod haptics;
pub mod keyboard_input;
pub mod lens;
pub mod parameter;
pub mod session;
pub mod simulated;
pub mod storage;

pub use app::{CameraCoordinator, CoordinatorHandle, CoordinatorServices, CoordinatorSnapshot};
pub use arbiter::{ModeArbiter, ParameterState};
pub use capture::{
    compose_request, CaptureRequest, CaptureSequencer, CaptureSettings, FlashMode,
    PhotoCaptureDelegate, PhotoFormat, RawPhotoData, SequencerState, SequencerStep,
};
pub use config::LenslyConfig;
pub use device::{
    CaptureBackend, CaptureDevice, DeviceDiscovery, DeviceFormat, FocusPoint, HardwareReport,
};
pub use error::{CaptureError, DeviceError, DiscoveryError, EventBusError, LenslyError, Result};
pub use events::{CoordinatorEvent, EventBus, EventFilter, EventReceiver};
pub use haptics::{HapticFeedback, HapticStyle, TracingHaptics};
pub use keyboard_input::{KeyAction, KeyboardInputHandler};
pub use lens::{normalize, Lens, LensId, LensKind, LensPosition, LensZoomMap, RelativeZoomFactor};
pub use parameter::{ControlParameter, ControlValue, ManualOutcome};
pub use session::{CaptureSessionController, DeviceWriter, SessionExecutor};
pub use simulated::SimulatedCamera;
pub use storage::{DirectoryPhotoStore, PhotoStore, StoredPhoto};

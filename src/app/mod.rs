mod commands;
mod coordinator;
mod handle;
mod state;


pub use coordinator::{CameraCoordinator, CoordinatorServices};
pub use handle::CoordinatorHandle;
pub use state::CoordinatorSnapshot;

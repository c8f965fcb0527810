//! In-memory camera hardware used by the demo binary and the test suite.

mod backend;
mod device;

pub use backend::{SimulatedCamera, BAYER_RAW_FORMAT, PRORAW_FORMAT};
pub use device::{DeviceState, SimulatedDevice};

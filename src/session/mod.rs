mod controller;
mod executor;

#[cfg(test)]
mod tests;

pub use controller::CaptureSessionController;
pub use executor::{DeviceWriter, SessionExecutor};

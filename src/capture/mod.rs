mod countdown;
mod delegate;
mod request;
mod sequencer;

#[cfg(test)]
mod tests;

pub use countdown::{CountdownTick, CountdownTimer};
pub use delegate::{PhotoCaptureDelegate, RawPhotoData};
pub use request::{compose_request, CaptureRequest, CaptureSettings, FlashMode, PhotoFormat};
pub use sequencer::{CaptureSequencer, SequencerState, SequencerStep};

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HapticStyle {
    /// Countdown tick
    Light,
    /// Shutter release
    Medium,
}

/// Fire-and-forget haptic pulses. Implementations must not block.
pub trait HapticFeedback: Send + Sync {
    fn pulse(&self, style: HapticStyle);
}

/// Logs pulses instead of playing them
#[derive(Debug, Default, Clone)]
pub struct TracingHaptics;

impl HapticFeedback for TracingHaptics {
    fn pulse(&self, style: HapticStyle) {
        debug!("Haptic pulse: {:?}", style);
    }
}

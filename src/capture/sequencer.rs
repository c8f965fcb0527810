use super::countdown::{CountdownTick, CountdownTimer};
use crate::error::{LenslyError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequencerState {
    Idle,
    CountdownActive { remaining: i32 },
    Capturing,
}

/// What the owner of the sequencer must do next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequencerStep {
    /// Show this countdown value
    Countdown(i32),
    /// Compose the request and trigger the capture now
    Capture,
}

/// Idle -> (CountdownActive)* -> Capturing -> Idle
///
/// Owns at most one countdown timer. Replacing or cancelling the timer bumps
/// the generation, so ticks already queued by an old timer are ignored.
pub struct CaptureSequencer {
    state: SequencerState,
    timer: Option<CountdownTimer>,
    generation: u64,
    tick_period: Duration,
    ticks: mpsc::UnboundedSender<CountdownTick>,
}

impl CaptureSequencer {
    pub fn new(tick_period: Duration, ticks: mpsc::UnboundedSender<CountdownTick>) -> Self {
        Self {
            state: SequencerState::Idle,
            timer: None,
            generation: 0,
            tick_period,
            ticks,
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn is_capturing(&self) -> bool {
        self.state == SequencerState::Capturing
    }

    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// Begin a capture after `delay` countdown steps.
    ///
    /// Any countdown already running is cancelled first. Fails while a
    /// capture is still in flight.
    pub fn start(&mut self, delay: i32) -> Result<SequencerStep> {
        if self.is_capturing() {
            return Err(LenslyError::CaptureInProgress {
                operation: "start a capture",
            });
        }

        if self.stop_timer() {
            debug!("Replacing active countdown");
        }

        if delay <= 0 {
            self.state = SequencerState::Capturing;
            return Ok(SequencerStep::Capture);
        }

        self.generation += 1;
        self.timer = Some(CountdownTimer::start(
            self.generation,
            self.tick_period,
            self.ticks.clone(),
        ));
        self.state = SequencerState::CountdownActive { remaining: delay };
        Ok(SequencerStep::Countdown(delay))
    }

    pub fn on_tick(&mut self, tick: CountdownTick) -> Option<SequencerStep> {
        let current = self.timer.as_ref().map(CountdownTimer::generation);
        if current != Some(tick.generation) {
            trace!("Ignoring tick from countdown {}", tick.generation);
            return None;
        }

        let SequencerState::CountdownActive { remaining } = self.state else {
            return None;
        };

        let remaining = remaining - 1;
        if remaining < 0 {
            self.stop_timer();
            self.state = SequencerState::Capturing;
            Some(SequencerStep::Capture)
        } else {
            self.state = SequencerState::CountdownActive { remaining };
            Some(SequencerStep::Countdown(remaining))
        }
    }

    /// Abort an active countdown; returns false when there was none
    pub fn cancel(&mut self) -> bool {
        if !matches!(self.state, SequencerState::CountdownActive { .. }) {
            return false;
        }
        self.stop_timer();
        self.state = SequencerState::Idle;
        true
    }

    /// The delegate reported back, successfully or not
    pub fn finish(&mut self) {
        if self.is_capturing() {
            self.state = SequencerState::Idle;
        }
    }

    fn stop_timer(&mut self) -> bool {
        match self.timer.take() {
            Some(timer) => {
                timer.cancel();
                true
            }
            None => false,
        }
    }
}

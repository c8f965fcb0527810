use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// One countdown period elapsed for the timer of `generation`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownTick {
    pub generation: u64,
}

/// Handle to a running countdown timer.
///
/// The timer stops when the handle is cancelled or dropped.
#[derive(Debug)]
pub struct CountdownTimer {
    generation: u64,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl CountdownTimer {
    /// Send a tick every `period`, starting one period from now
    pub fn start(
        generation: u64,
        period: Duration,
        ticks: mpsc::UnboundedSender<CountdownTick>,
    ) -> Self {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let task = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        if ticks.send(CountdownTick { generation }).is_err() {
                            break;
                        }
                    }
                }
            }
            trace!("Countdown timer {} stopped", generation);
        });

        Self {
            generation,
            token,
            task,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.token.cancel();
        self.task.abort();
    }
}

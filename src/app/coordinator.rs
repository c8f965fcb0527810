use super::commands::Command;
use super::handle::CoordinatorHandle;
use super::state::CoordinatorSnapshot;
use crate::arbiter::{ModeArbiter, ParameterState};
use crate::capture::{
    compose_request, CaptureSequencer, CaptureSettings, CountdownTick, PhotoCaptureDelegate,
    SequencerStep,
};
use crate::config::LenslyConfig;
use crate::device::{CaptureBackend, DeviceDiscovery, FocusPoint, Observed};
use crate::error::{CaptureError, DeviceError, DiscoveryError, LenslyError, Result};
use crate::events::{CoordinatorEvent, EventBus};
use crate::haptics::{HapticFeedback, HapticStyle};
use crate::lens::{normalize, Lens, LensId, LensPosition, LensZoomMap};
use crate::parameter::ControlParameter;
use crate::session::{CaptureSessionController, SessionExecutor};
use crate::storage::{PhotoStore, StoredPhoto};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Collaborators injected into the coordinator
#[derive(Clone)]
pub struct CoordinatorServices {
    pub discovery: Arc<dyn DeviceDiscovery>,
    pub backend: Arc<dyn CaptureBackend>,
    pub delegate: Arc<dyn PhotoCaptureDelegate>,
    pub store: Arc<dyn PhotoStore>,
    pub haptics: Arc<dyn HapticFeedback>,
}

/// Result of one capture task
struct CaptureOutcome {
    request_id: String,
    result: std::result::Result<StoredPhoto, CaptureError>,
}

/// Receivers drained by the run loop
struct Inbox {
    commands: mpsc::Receiver<Command>,
    observations: mpsc::UnboundedReceiver<Observed>,
    ticks: mpsc::UnboundedReceiver<CountdownTick>,
    outcomes: mpsc::UnboundedReceiver<CaptureOutcome>,
}

/// Owns all parameter and sequencer state on a single task.
///
/// Commands, hardware reports, countdown ticks and capture results are
/// applied one at a time in the order the run loop receives them.
pub struct CameraCoordinator {
    services: CoordinatorServices,
    event_bus: Arc<EventBus>,
    executor: SessionExecutor,
    arbiter: ModeArbiter,
    sequencer: CaptureSequencer,
    settings: CaptureSettings,
    default_delay: i32,
    lenses: Vec<Lens>,
    zoom: LensZoomMap,
    active: Option<Lens>,
    last_photo: Option<PathBuf>,
    outcomes: mpsc::UnboundedSender<CaptureOutcome>,
}

impl CameraCoordinator {
    /// Discover lenses, open the default input and start the run loop
    pub async fn spawn(
        config: LenslyConfig,
        services: CoordinatorServices,
        event_bus: Arc<EventBus>,
    ) -> Result<CoordinatorHandle> {
        config.validate()?;

        let (commands_tx, commands_rx) = mpsc::channel(config.system.command_queue_capacity);
        let (observations_tx, observations_rx) = mpsc::unbounded_channel();
        let (ticks_tx, ticks_rx) = mpsc::unbounded_channel();
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();

        let controller = Arc::new(CaptureSessionController::new(
            Arc::clone(&services.backend),
            Arc::clone(&services.delegate),
            observations_tx,
        ));

        let lenses = services.discovery.list_lenses();
        let zoom = normalize(&lenses);
        info!(
            "Discovered {} lenses ({} with zoom factors)",
            lenses.len(),
            zoom.len()
        );

        let last_photo = match services.store.latest().await {
            Ok(path) => path,
            Err(e) => {
                warn!("Failed to look up last photo: {}", e);
                None
            }
        };

        let mut coordinator = Self {
            services,
            event_bus,
            executor: SessionExecutor::new(controller),
            arbiter: ModeArbiter::new(&config.controls),
            sequencer: CaptureSequencer::new(config.capture.countdown_tick(), ticks_tx),
            settings: CaptureSettings {
                format: config.capture.format,
                flash: config.capture.flash,
            },
            // Any delay at or below zero captures immediately
            default_delay: config.capture.delay_seconds.max(0),
            lenses,
            zoom,
            active: None,
            last_photo,
            outcomes: outcomes_tx,
        };

        let count = coordinator.lenses.len();
        coordinator
            .publish(CoordinatorEvent::LensesDiscovered { count })
            .await;

        let initial = coordinator
            .services
            .discovery
            .default_lens(LensPosition::Back)
            .or_else(|| coordinator.lenses.first().cloned());
        match initial {
            Some(lens) => {
                if let Err(e) = coordinator.switch_to(lens).await {
                    warn!("Failed to open initial lens: {}", e);
                }
            }
            None => warn!("No lenses discovered, running without an active device"),
        }

        let cancellation_token = CancellationToken::new();
        let inbox = Inbox {
            commands: commands_rx,
            observations: observations_rx,
            ticks: ticks_rx,
            outcomes: outcomes_rx,
        };
        tokio::spawn(coordinator.run(inbox, cancellation_token.clone()));

        Ok(CoordinatorHandle::new(commands_tx, cancellation_token))
    }

    async fn run(mut self, mut inbox: Inbox, cancellation_token: CancellationToken) {
        info!("Camera coordinator running");

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    self.stop("cancelled").await;
                    break;
                }
                command = inbox.commands.recv() => match command {
                    Some(Command::Shutdown { reason, reply }) => {
                        self.stop(&reason).await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.stop("all handles dropped").await;
                        break;
                    }
                },
                Some(observed) = inbox.observations.recv() => self.on_observation(observed).await,
                Some(tick) = inbox.ticks.recv() => self.on_tick(tick).await,
                Some(outcome) = inbox.outcomes.recv() => self.on_capture_outcome(outcome).await,
            }
        }

        info!("Camera coordinator stopped");
    }

    async fn stop(&mut self, reason: &str) {
        if self.sequencer.cancel() {
            debug!("Countdown abandoned on shutdown");
        }
        self.publish(CoordinatorEvent::ShutdownRequested {
            reason: reason.to_string(),
        })
        .await;
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::SetAuto { parameter, reply } => {
                let before = self.arbiter.snapshot();
                let result = self.arbiter.set_auto(parameter, &self.executor).await;
                let _ = reply.send(self.settle(&before, result).await);
            }
            Command::AllAuto { reply } => {
                let before = self.arbiter.snapshot();
                let result = self.arbiter.all_auto(&self.executor).await;
                let _ = reply.send(self.settle(&before, result).await);
            }
            Command::SetExposureBias { bias, reply } => {
                let before = self.arbiter.snapshot();
                let result = self.arbiter.manual_exposure(bias, &self.executor).await;
                let _ = reply.send(self.settle(&before, result).await);
            }
            Command::SetIso { iso, reply } => {
                let before = self.arbiter.snapshot();
                let result = self.arbiter.manual_iso(iso, &self.executor).await;
                let _ = reply.send(self.settle(&before, result).await);
            }
            Command::SetShutterSpeed { denominator, reply } => {
                let before = self.arbiter.snapshot();
                let result = self
                    .arbiter
                    .manual_shutter(denominator, &self.executor)
                    .await;
                let _ = reply.send(self.settle(&before, result).await);
            }
            Command::SetFocus {
                lens_position,
                reply,
            } => {
                let before = self.arbiter.snapshot();
                let result = self
                    .arbiter
                    .manual_focus(lens_position, &self.executor)
                    .await;
                let _ = reply.send(self.settle(&before, result).await);
            }
            Command::SetWhiteBalance { kelvin, reply } => {
                let before = self.arbiter.snapshot();
                let result = self
                    .arbiter
                    .manual_white_balance(kelvin, &self.executor)
                    .await;
                let _ = reply.send(self.settle(&before, result).await);
            }
            Command::FocusAtPoint { point, reply } => {
                let _ = reply.send(self.focus_at_point(point).await);
            }
            Command::SwitchLens { lens, reply } => {
                let _ = reply.send(self.switch_lens(&lens).await);
            }
            Command::FlipPosition { reply } => {
                let _ = reply.send(self.flip_position().await);
            }
            Command::SetFormat { format, reply } => {
                debug!("Photo format set to {}", format);
                self.settings.format = format;
                let _ = reply.send(());
            }
            Command::SetFlash { flash, reply } => {
                debug!("Flash mode set to {}", flash);
                self.settings.flash = flash;
                let _ = reply.send(());
            }
            Command::StartCapture { delay, reply } => {
                let _ = reply.send(self.start_capture(delay).await);
            }
            Command::CancelCountdown { reply } => {
                let cancelled = self.sequencer.cancel();
                if cancelled {
                    info!("Countdown cancelled");
                    self.publish(CoordinatorEvent::CountdownCancelled).await;
                }
                let _ = reply.send(cancelled);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            // Handled by the run loop
            Command::Shutdown { .. } => {}
        }
    }

    /// Publish whatever an arbiter operation changed and surface its failure
    async fn settle<T>(
        &self,
        before: &[ParameterState],
        result: std::result::Result<T, DeviceError>,
    ) -> Result<T> {
        self.publish_changes(before).await;
        match result {
            Ok(value) => Ok(value),
            Err(e) => Err(self.device_failure(e).await),
        }
    }

    async fn focus_at_point(&mut self, point: FocusPoint) -> Result<()> {
        let before = self.arbiter.snapshot();
        let result = self.arbiter.focus_at_point(point, &self.executor).await;
        self.settle(&before, result).await
    }

    async fn switch_lens(&mut self, id: &LensId) -> Result<Option<Lens>> {
        let Some(lens) = self.lenses.iter().find(|lens| &lens.id == id).cloned() else {
            debug!("No lens with id {}, ignoring switch", id);
            return Ok(None);
        };
        self.switch_to(lens).await.map(Some)
    }

    async fn flip_position(&mut self) -> Result<Option<Lens>> {
        let position = self
            .active
            .as_ref()
            .map(|lens| lens.position.opposite())
            .unwrap_or(LensPosition::Back);

        match self.services.discovery.default_lens(position) {
            Some(lens) => self.switch_to(lens).await.map(Some),
            None => {
                debug!("{}, ignoring flip", DiscoveryError::NoMatchingLens { position });
                Ok(None)
            }
        }
    }

    /// Hand every parameter back to the hardware, then replace the input.
    ///
    /// The new device starts in continuous auto everywhere, so the flags are
    /// forced to auto and the ranges refreshed once the input is committed.
    async fn switch_to(&mut self, lens: Lens) -> Result<Lens> {
        if self.sequencer.is_capturing() {
            return Err(LenslyError::CaptureInProgress {
                operation: "switch lens",
            });
        }

        let before = self.arbiter.snapshot();
        if let Some(current) = &self.active {
            if let Err(e) = self.arbiter.all_auto(&self.executor).await {
                warn!("Could not return {} to auto before switching: {}", current, e);
            }
        }

        let format = match self.executor.switch_lens(lens.clone()).await {
            Ok(format) => format,
            Err(e) => {
                self.publish_changes(&before).await;
                return Err(self.device_failure(e).await);
            }
        };

        self.arbiter.on_lens_switched(format);
        self.active = Some(lens.clone());
        self.publish(CoordinatorEvent::LensSwitched {
            lens_id: lens.id.clone(),
            position: lens.position,
        })
        .await;
        self.publish_changes(&before).await;
        Ok(lens)
    }

    async fn start_capture(&mut self, delay: Option<i32>) -> Result<SequencerStep> {
        let delay = delay.unwrap_or(self.default_delay);
        let step = self.sequencer.start(delay)?;
        match step {
            SequencerStep::Countdown(remaining) => {
                info!("Capture in {}", remaining);
                self.publish(CoordinatorEvent::CountdownTick { remaining })
                    .await;
            }
            SequencerStep::Capture => self.begin_capture().await,
        }
        Ok(step)
    }

    async fn on_tick(&mut self, tick: CountdownTick) {
        match self.sequencer.on_tick(tick) {
            Some(SequencerStep::Countdown(remaining)) => {
                self.services.haptics.pulse(HapticStyle::Light);
                self.publish(CoordinatorEvent::CountdownTick { remaining })
                    .await;
            }
            Some(SequencerStep::Capture) => self.begin_capture().await,
            None => {}
        }
    }

    /// Compose the request for the active lens and hand it to the delegate.
    ///
    /// The sequencer stays in `Capturing` until the outcome comes back
    /// through the run loop.
    async fn begin_capture(&mut self) {
        self.services.haptics.pulse(HapticStyle::Medium);

        let Some(lens) = self.active.clone() else {
            self.sequencer.finish();
            let error = CaptureError::NoActiveDevice;
            warn!("Capture failed: {}", error);
            self.publish(CoordinatorEvent::CaptureFailed {
                request_id: String::new(),
                error: error.to_string(),
            })
            .await;
            return;
        };

        let raw_formats = if self.settings.format.is_raw() {
            self.executor.available_raw_formats().await
        } else {
            Vec::new()
        };

        let (request, fallback) = compose_request(&self.settings, &lens, &raw_formats);
        if let Some(e) = fallback {
            warn!("{}, capturing {} instead", e, request.format);
            self.publish(CoordinatorEvent::Warning {
                component: "capture".to_string(),
                message: e.to_string(),
            })
            .await;
        }

        let request_id = request.id.clone();
        let format = request.format;
        self.publish(CoordinatorEvent::CaptureStarted {
            request_id: request_id.clone(),
            format,
        })
        .await;

        let controller = Arc::clone(self.executor.controller());
        let store = Arc::clone(&self.services.store);
        let outcomes = self.outcomes.clone();
        tokio::spawn(async move {
            let result = match controller.capture_photo(request).await {
                Ok(photo) => store.store(&photo, format).await,
                Err(e) => Err(e),
            };
            if outcomes.send(CaptureOutcome { request_id, result }).is_err() {
                debug!("Coordinator gone before capture finished");
            }
        });
    }

    async fn on_capture_outcome(&mut self, outcome: CaptureOutcome) {
        self.sequencer.finish();
        match outcome.result {
            Ok(stored) => {
                self.last_photo = Some(stored.path.clone());
                self.publish(CoordinatorEvent::CaptureCompleted {
                    request_id: outcome.request_id,
                    path: stored.path,
                })
                .await;
            }
            Err(e) => {
                self.publish(CoordinatorEvent::CaptureFailed {
                    request_id: outcome.request_id,
                    error: e.to_string(),
                })
                .await;
            }
        }
    }

    async fn on_observation(&mut self, observed: Observed) {
        let is_active = self
            .active
            .as_ref()
            .is_some_and(|lens| lens.id == observed.lens);
        if !is_active {
            trace!("Dropping report from inactive lens {}", observed.lens);
            return;
        }

        let controller = Arc::clone(self.executor.controller());
        let changed = self
            .arbiter
            .on_hardware_report(observed.report, |gains| {
                controller.temperature_for_gains(gains)
            });

        match changed {
            Some(parameter) => self.publish_parameter(parameter).await,
            None => trace!("Report discarded: {:?}", observed.report),
        }
    }

    fn snapshot(&self) -> CoordinatorSnapshot {
        CoordinatorSnapshot {
            active_lens: self.active.clone(),
            lenses: self.lenses.clone(),
            zoom: self.zoom.clone(),
            parameters: self.arbiter.snapshot(),
            all_auto: self.arbiter.all_auto_active(),
            sequencer: self.sequencer.state(),
            format: self.settings.format,
            flash: self.settings.flash,
            last_photo: self.last_photo.clone(),
        }
    }

    async fn device_failure(&self, error: DeviceError) -> LenslyError {
        self.publish(CoordinatorEvent::Warning {
            component: "session".to_string(),
            message: error.to_string(),
        })
        .await;
        LenslyError::Device(error)
    }

    async fn publish_changes(&self, before: &[ParameterState]) {
        for state in self.arbiter.snapshot() {
            let unchanged = before.iter().any(|previous| previous == &state);
            if !unchanged {
                self.publish_state(state).await;
            }
        }
    }

    async fn publish_parameter(&self, parameter: ControlParameter) {
        self.publish_state(self.arbiter.state(parameter)).await;
    }

    async fn publish_state(&self, state: ParameterState) {
        self.publish(CoordinatorEvent::ParameterChanged {
            parameter: state.parameter,
            values: state.values,
            display: state.display,
            auto: state.auto,
        })
        .await;
    }

    async fn publish(&self, event: CoordinatorEvent) {
        if let Err(e) = self.event_bus.publish(event).await {
            trace!("Event not delivered: {}", e);
        }
    }
}

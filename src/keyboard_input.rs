use crate::app::{CoordinatorHandle, CoordinatorSnapshot};
use crate::error::Result;
use crate::lens::LensId;
use crate::parameter::ControlParameter;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Camera control bound to a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Capture,
    AllAuto,
    NextLens,
    FlipPosition,
    ExposureUp,
    ExposureDown,
    CycleFormat,
    CycleFlash,
    CancelCountdown,
    Quit,
}

impl KeyAction {
    pub fn from_key(code: KeyCode) -> Option<Self> {
        let action = match code {
            KeyCode::Char(' ') => KeyAction::Capture,
            KeyCode::Char('a') => KeyAction::AllAuto,
            KeyCode::Char('l') => KeyAction::NextLens,
            KeyCode::Char('f') => KeyAction::FlipPosition,
            KeyCode::Char('+') | KeyCode::Char('=') => KeyAction::ExposureUp,
            KeyCode::Char('-') => KeyAction::ExposureDown,
            KeyCode::Char('r') => KeyAction::CycleFormat,
            KeyCode::Char('h') => KeyAction::CycleFlash,
            KeyCode::Char('c') => KeyAction::CancelCountdown,
            KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
            _ => return None,
        };
        Some(action)
    }
}

/// Keyboard control of a running coordinator
pub struct KeyboardInputHandler {
    coordinator: CoordinatorHandle,
    exposure_step: f32,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    pub fn new(coordinator: CoordinatorHandle, exposure_step: f32) -> Self {
        Self {
            coordinator,
            exposure_step,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start listening for keyboard input
    pub async fn start(&self) -> Result<()> {
        info!("Starting keyboard input handler - press SPACE to capture, q to quit");

        let coordinator = self.coordinator.clone();
        let exposure_step = self.exposure_step;
        let cancellation_token = self.cancellation_token.clone();
        let runtime_handle = Handle::current();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            debug!("Raw mode enabled - keyboard handler active");

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Keyboard input handler stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let Ok(Event::Key(key_event)) = event::read() else {
                            continue;
                        };
                        // Only handle key press events (not release)
                        if key_event.kind != KeyEventKind::Press {
                            continue;
                        }

                        let Some(action) = KeyAction::from_key(key_event.code) else {
                            debug!("Key pressed: {:?}", key_event.code);
                            continue;
                        };

                        let coordinator = coordinator.clone();
                        runtime_handle.spawn(async move {
                            if let Err(e) = apply_action(&coordinator, action, exposure_step).await
                            {
                                warn!("Key action {:?} failed: {}", action, e);
                            }
                        });

                        if action == KeyAction::Quit {
                            break;
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }

            debug!("Keyboard input handler task exited");
        });

        Ok(())
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Give the task a moment to clean up and disable raw mode
        tokio::time::sleep(Duration::from_millis(200)).await;

        let _ = disable_raw_mode();

        Ok(())
    }
}

/// Run one key action against the coordinator
pub async fn apply_action(
    coordinator: &CoordinatorHandle,
    action: KeyAction,
    exposure_step: f32,
) -> Result<()> {
    match action {
        KeyAction::Capture => {
            coordinator.start_capture(None).await?;
        }
        KeyAction::AllAuto => coordinator.all_auto().await?,
        KeyAction::NextLens => {
            let snapshot = coordinator.snapshot().await?;
            if let Some(next) = next_lens(&snapshot) {
                coordinator.switch_lens(next).await?;
            }
        }
        KeyAction::FlipPosition => {
            coordinator.flip_position().await?;
        }
        KeyAction::ExposureUp | KeyAction::ExposureDown => {
            let snapshot = coordinator.snapshot().await?;
            let current = snapshot
                .parameter(ControlParameter::ExposureBias)
                .and_then(|state| state.values.first())
                .map(|value| value.as_f32())
                .unwrap_or(0.0);
            let step = if action == KeyAction::ExposureUp {
                exposure_step
            } else {
                -exposure_step
            };
            coordinator.set_exposure_bias(current + step).await?;
        }
        KeyAction::CycleFormat => {
            let snapshot = coordinator.snapshot().await?;
            let format = snapshot.format.next();
            info!("Photo format: {}", format);
            coordinator.set_format(format).await?;
        }
        KeyAction::CycleFlash => {
            let snapshot = coordinator.snapshot().await?;
            let flash = snapshot.flash.next();
            info!("Flash: {}", flash);
            coordinator.set_flash(flash).await?;
        }
        KeyAction::CancelCountdown => {
            coordinator.cancel_countdown().await?;
        }
        KeyAction::Quit => {
            info!("Quit key pressed - requesting shutdown");
            coordinator.shutdown("User requested via keyboard").await?;
        }
    }
    Ok(())
}

/// The next lens on the active side, widest first, wrapping around
pub fn next_lens(snapshot: &CoordinatorSnapshot) -> Option<LensId> {
    let active = snapshot.active_lens.as_ref()?;

    let mut candidates: Vec<LensId> = snapshot
        .zoom
        .selectable(active.position)
        .into_iter()
        .map(|entry| entry.lens.id.clone())
        .collect();
    if candidates.is_empty() {
        // No zoom factors without a reference lens; fall back to discovery order
        candidates = snapshot
            .lenses
            .iter()
            .filter(|lens| lens.position == active.position)
            .map(|lens| lens.id.clone())
            .collect();
    }

    let current = candidates.iter().position(|id| id == &active.id)?;
    let next = candidates[(current + 1) % candidates.len()].clone();
    (next != active.id).then_some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{CameraCoordinator, CoordinatorServices};
    use crate::capture::PhotoFormat;
    use crate::config::LenslyConfig;
    use crate::events::EventBus;
    use crate::haptics::TracingHaptics;
    use crate::simulated::SimulatedCamera;
    use crate::storage::DirectoryPhotoStore;
    use std::sync::Arc;

    async fn create_test_coordinator(dir: &std::path::Path) -> CoordinatorHandle {
        let mut config = LenslyConfig::default();
        config.storage.path = dir.to_path_buf();
        let camera = Arc::new(SimulatedCamera::default_rig());
        let services = CoordinatorServices {
            discovery: camera.clone(),
            backend: camera.clone(),
            delegate: camera,
            store: Arc::new(DirectoryPhotoStore::new(dir)),
            haptics: Arc::new(TracingHaptics),
        };
        CameraCoordinator::spawn(config, services, Arc::new(EventBus::new(100)))
            .await
            .unwrap()
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(
            KeyAction::from_key(KeyCode::Char(' ')),
            Some(KeyAction::Capture)
        );
        assert_eq!(KeyAction::from_key(KeyCode::Esc), Some(KeyAction::Quit));
        assert_eq!(
            KeyAction::from_key(KeyCode::Char('=')),
            Some(KeyAction::ExposureUp)
        );
        assert_eq!(KeyAction::from_key(KeyCode::Char('x')), None);
    }

    #[tokio::test]
    async fn test_keyboard_handler_stop() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = create_test_coordinator(dir.path()).await;
        let handler = KeyboardInputHandler::new(coordinator, 0.5);
        assert!(!handler.cancellation_token.is_cancelled());

        handler.stop().await.unwrap();
        assert!(handler.cancellation_token.is_cancelled());
    }

    #[tokio::test]
    async fn test_next_lens_cycles_by_zoom() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = create_test_coordinator(dir.path()).await;

        let mut visited = Vec::new();
        for _ in 0..3 {
            apply_action(&coordinator, KeyAction::NextLens, 0.5)
                .await
                .unwrap();
            let snapshot = coordinator.snapshot().await.unwrap();
            visited.push(snapshot.active_lens.unwrap().id);
        }

        assert_eq!(
            visited,
            vec![
                LensId::new("back-telephoto"),
                LensId::new("back-ultra-wide"),
                LensId::new("back-wide"),
            ]
        );
    }

    #[tokio::test]
    async fn test_exposure_steps_and_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = create_test_coordinator(dir.path()).await;

        apply_action(&coordinator, KeyAction::ExposureUp, 0.5)
            .await
            .unwrap();
        apply_action(&coordinator, KeyAction::ExposureUp, 0.5)
            .await
            .unwrap();
        apply_action(&coordinator, KeyAction::CycleFormat, 0.5)
            .await
            .unwrap();

        let snapshot = coordinator.snapshot().await.unwrap();
        let exposure = snapshot.parameter(ControlParameter::ExposureBias).unwrap();
        assert!(!exposure.auto);
        assert_eq!(exposure.values[0].as_f32(), 1.0);
        assert_eq!(snapshot.format, PhotoFormat::Jpeg);
    }
}

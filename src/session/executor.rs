use super::controller::CaptureSessionController;
use crate::device::{DeviceCommand, DeviceFormat, RawPixelFormat};
use crate::error::DeviceError;
use crate::lens::Lens;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task;
use tracing::warn;

/// Sink for device configuration writes
#[async_trait]
pub trait DeviceWriter: Send + Sync {
    async fn write(&self, command: DeviceCommand) -> Result<(), DeviceError>;
}

/// Runs controller calls on the blocking pool.
///
/// Each call resolves only after the hardware has accepted or rejected the
/// change, so awaiting it in sequence preserves command order.
#[derive(Clone)]
pub struct SessionExecutor {
    controller: Arc<CaptureSessionController>,
}

impl SessionExecutor {
    pub fn new(controller: Arc<CaptureSessionController>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &Arc<CaptureSessionController> {
        &self.controller
    }

    pub async fn switch_lens(&self, lens: Lens) -> Result<DeviceFormat, DeviceError> {
        let controller = Arc::clone(&self.controller);
        task::spawn_blocking(move || controller.switch_lens(&lens))
            .await
            .map_err(|e| DeviceError::Executor {
                details: e.to_string(),
            })?
    }

    pub async fn available_raw_formats(&self) -> Vec<RawPixelFormat> {
        let controller = Arc::clone(&self.controller);
        match task::spawn_blocking(move || controller.available_raw_formats()).await {
            Ok(formats) => formats,
            Err(e) => {
                warn!("RAW format query failed: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl DeviceWriter for SessionExecutor {
    async fn write(&self, command: DeviceCommand) -> Result<(), DeviceError> {
        let controller = Arc::clone(&self.controller);
        task::spawn_blocking(move || controller.execute(&command))
            .await
            .map_err(|e| DeviceError::Executor {
                details: e.to_string(),
            })?
    }
}

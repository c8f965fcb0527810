use super::device::SimulatedDevice;
use crate::capture::{CaptureRequest, PhotoCaptureDelegate, RawPhotoData};
use crate::device::{
    CaptureBackend, CaptureDevice, DeviceDiscovery, DeviceFormat, ExposureDuration,
    RawFormatKind, RawPixelFormat,
};
use crate::error::{CaptureError, DeviceError};
use crate::lens::{Lens, LensId, LensKind, LensPosition};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const BAYER_RAW_FORMAT: RawPixelFormat = RawPixelFormat {
    kind: RawFormatKind::Bayer,
    code: 0x6267_3130,
};

pub const PRORAW_FORMAT: RawPixelFormat = RawPixelFormat {
    kind: RawFormatKind::ProRaw,
    code: 0x6c36_3432,
};

fn default_format() -> DeviceFormat {
    DeviceFormat {
        min_iso: 32.0,
        max_iso: 3072.0,
        max_exposure_duration: ExposureDuration::new(1, 3),
    }
}

/// A whole camera rig in memory: discovery, session inputs and the photo
/// pipeline.
pub struct SimulatedCamera {
    lenses: Vec<Lens>,
    devices: Vec<Arc<SimulatedDevice>>,
    raw_formats: Mutex<HashMap<LensId, Vec<RawPixelFormat>>>,
    inputs: Mutex<Vec<LensId>>,
    configuring: AtomicBool,
    commits: AtomicUsize,
    failing_inputs: Mutex<HashSet<LensId>>,
    requests: Mutex<Vec<CaptureRequest>>,
    capture_failure: Mutex<Option<String>>,
    capture_latency: Mutex<Duration>,
}

impl SimulatedCamera {
    pub fn new(lenses: Vec<Lens>) -> Self {
        let devices = lenses
            .iter()
            .map(|lens| Arc::new(SimulatedDevice::new(lens.clone(), default_format())))
            .collect();

        Self {
            lenses,
            devices,
            raw_formats: Mutex::new(HashMap::new()),
            inputs: Mutex::new(Vec::new()),
            configuring: AtomicBool::new(false),
            commits: AtomicUsize::new(0),
            failing_inputs: Mutex::new(HashSet::new()),
            requests: Mutex::new(Vec::new()),
            capture_failure: Mutex::new(None),
            capture_latency: Mutex::new(Duration::ZERO),
        }
    }

    /// Triple back camera plus a fixed-focus front camera. Only the back
    /// lenses offer RAW, and only the wide one offers RAW+.
    pub fn default_rig() -> Self {
        let camera = Self::new(vec![
            Lens::new("back-wide", LensPosition::Back, LensKind::Wide, 65.0),
            Lens::new("back-ultra-wide", LensPosition::Back, LensKind::UltraWide, 108.0),
            Lens::new("back-telephoto", LensPosition::Back, LensKind::Telephoto, 30.0),
            Lens::new("front-wide", LensPosition::Front, LensKind::Wide, 70.0),
        ]);
        camera.set_raw_formats("back-wide", vec![BAYER_RAW_FORMAT, PRORAW_FORMAT]);
        camera.set_raw_formats("back-ultra-wide", vec![BAYER_RAW_FORMAT]);
        camera.set_raw_formats("back-telephoto", vec![BAYER_RAW_FORMAT]);
        camera
    }

    pub fn set_raw_formats(&self, lens: &str, formats: Vec<RawPixelFormat>) {
        self.raw_formats.lock().insert(LensId::new(lens), formats);
    }

    pub fn device(&self, lens: &str) -> Option<Arc<SimulatedDevice>> {
        self.devices
            .iter()
            .find(|device| device.lens().id.as_str() == lens)
            .cloned()
    }

    /// Lens ids of the inputs currently attached to the session
    pub fn input_ids(&self) -> Vec<LensId> {
        self.inputs.lock().clone()
    }

    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn is_configuring(&self) -> bool {
        self.configuring.load(Ordering::SeqCst)
    }

    pub fn fail_input(&self, lens: &str, fail: bool) {
        let mut failing = self.failing_inputs.lock();
        if fail {
            failing.insert(LensId::new(lens));
        } else {
            failing.remove(&LensId::new(lens));
        }
    }

    pub fn fail_capture(&self, details: Option<String>) {
        *self.capture_failure.lock() = details;
    }

    pub fn set_capture_latency(&self, latency: Duration) {
        *self.capture_latency.lock() = latency;
    }

    pub fn captured_requests(&self) -> Vec<CaptureRequest> {
        self.requests.lock().clone()
    }

    /// Periodically move auto-governed values on every observed device
    pub fn spawn_drift(
        self: &Arc<Self>,
        period: Duration,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let camera = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            let mut step = 0u32;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        step = step.wrapping_add(1);
                        for device in camera.devices.iter().filter(|d| d.is_observed()) {
                            device.drift(step);
                        }
                    }
                }
            }
            debug!("Simulated sensor drift stopped");
        })
    }
}

impl DeviceDiscovery for SimulatedCamera {
    fn list_lenses(&self) -> Vec<Lens> {
        self.lenses.clone()
    }
}

impl CaptureBackend for SimulatedCamera {
    fn open_input(&self, lens: &Lens) -> Result<Arc<dyn CaptureDevice>, DeviceError> {
        if self.failing_inputs.lock().contains(&lens.id) {
            return Err(DeviceError::InputConstruction {
                device: lens.id.to_string(),
                details: "injected failure".to_string(),
            });
        }

        let device = self.device(lens.id.as_str()).ok_or_else(|| {
            DeviceError::InputConstruction {
                device: lens.id.to_string(),
                details: "unknown lens".to_string(),
            }
        })?;
        Ok(device)
    }

    fn begin_configuration(&self) {
        self.configuring.store(true, Ordering::SeqCst);
    }

    fn remove_video_inputs(&self) {
        self.inputs.lock().clear();
    }

    fn add_video_input(&self, device: Arc<dyn CaptureDevice>) -> Result<(), DeviceError> {
        let mut inputs = self.inputs.lock();
        if !inputs.is_empty() {
            return Err(DeviceError::InputConstruction {
                device: device.lens().id.to_string(),
                details: "session already has a video input".to_string(),
            });
        }
        inputs.push(device.lens().id.clone());
        Ok(())
    }

    fn commit_configuration(&self) {
        self.configuring.store(false, Ordering::SeqCst);
        self.commits.fetch_add(1, Ordering::SeqCst);
    }

    fn available_raw_formats(&self) -> Vec<RawPixelFormat> {
        let inputs = self.inputs.lock();
        inputs
            .first()
            .and_then(|id| self.raw_formats.lock().get(id).cloned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PhotoCaptureDelegate for SimulatedCamera {
    async fn capture(&self, request: CaptureRequest) -> Result<RawPhotoData, CaptureError> {
        self.requests.lock().push(request.clone());

        let latency = *self.capture_latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let failure = self.capture_failure.lock().clone();
        if let Some(details) = failure {
            return Err(CaptureError::Delegate { details });
        }

        let bytes = serde_json::to_vec(&request).map_err(|e| CaptureError::Delegate {
            details: e.to_string(),
        })?;
        info!("Simulated capture {} on {}", request.id, request.lens);

        Ok(RawPhotoData {
            request_id: request.id,
            lens: request.lens,
            bytes,
            is_raw: request.raw_pixel_format.is_some(),
            captured_at: Utc::now(),
        })
    }
}

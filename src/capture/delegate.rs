use super::request::CaptureRequest;
use crate::error::CaptureError;
use crate::lens::LensId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Photo data returned by the capture pipeline, not yet persisted
#[derive(Debug, Clone)]
pub struct RawPhotoData {
    pub request_id: String,
    pub lens: LensId,
    pub bytes: Vec<u8>,
    /// True when `bytes` holds sensor RAW rather than processed image data
    pub is_raw: bool,
    pub captured_at: DateTime<Utc>,
}

/// The external pipeline that turns a request into photo data
#[async_trait]
pub trait PhotoCaptureDelegate: Send + Sync {
    async fn capture(&self, request: CaptureRequest) -> Result<RawPhotoData, CaptureError>;
}

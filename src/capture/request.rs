use crate::device::{RawFormatKind, RawPixelFormat};
use crate::error::CaptureError;
use crate::lens::{Lens, LensId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Output format selected by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhotoFormat {
    Heif,
    Jpeg,
    /// Plain sensor RAW
    Raw,
    /// Extended dynamic range RAW ("RAW+")
    ProRaw,
}

impl PhotoFormat {
    pub fn is_raw(&self) -> bool {
        matches!(self, PhotoFormat::Raw | PhotoFormat::ProRaw)
    }

    pub fn raw_kind(&self) -> Option<RawFormatKind> {
        match self {
            PhotoFormat::Raw => Some(RawFormatKind::Bayer),
            PhotoFormat::ProRaw => Some(RawFormatKind::ProRaw),
            PhotoFormat::Heif | PhotoFormat::Jpeg => None,
        }
    }

    /// File extension for processed (non-RAW) data in this format
    pub fn extension(&self) -> &'static str {
        match self {
            PhotoFormat::Heif => "heic",
            PhotoFormat::Jpeg => "jpg",
            PhotoFormat::Raw | PhotoFormat::ProRaw => "dng",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            PhotoFormat::Heif => PhotoFormat::Jpeg,
            PhotoFormat::Jpeg => PhotoFormat::Raw,
            PhotoFormat::Raw => PhotoFormat::ProRaw,
            PhotoFormat::ProRaw => PhotoFormat::Heif,
        }
    }
}

impl Default for PhotoFormat {
    fn default() -> Self {
        PhotoFormat::Heif
    }
}

impl fmt::Display for PhotoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhotoFormat::Heif => "HEIF",
            PhotoFormat::Jpeg => "JPEG",
            PhotoFormat::Raw => "RAW",
            PhotoFormat::ProRaw => "RAW+",
        };
        f.write_str(name)
    }
}

impl FromStr for PhotoFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "heif" | "heic" => Ok(PhotoFormat::Heif),
            "jpeg" | "jpg" => Ok(PhotoFormat::Jpeg),
            "raw" => Ok(PhotoFormat::Raw),
            "raw+" | "proraw" => Ok(PhotoFormat::ProRaw),
            other => Err(format!("unknown photo format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlashMode {
    Auto,
    Off,
    On,
    /// Continuous light rather than a one-shot flash
    Torch,
}

impl FlashMode {
    /// Flash policy for a single still; torch fires as a regular flash
    pub fn for_single_capture(&self) -> Self {
        match self {
            FlashMode::Torch => FlashMode::On,
            other => *other,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            FlashMode::Auto => FlashMode::Off,
            FlashMode::Off => FlashMode::On,
            FlashMode::On => FlashMode::Torch,
            FlashMode::Torch => FlashMode::Auto,
        }
    }
}

impl Default for FlashMode {
    fn default() -> Self {
        FlashMode::Auto
    }
}

impl fmt::Display for FlashMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlashMode::Auto => "auto",
            FlashMode::Off => "off",
            FlashMode::On => "on",
            FlashMode::Torch => "torch",
        };
        f.write_str(name)
    }
}

impl FromStr for FlashMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(FlashMode::Auto),
            "off" => Ok(FlashMode::Off),
            "on" => Ok(FlashMode::On),
            "torch" => Ok(FlashMode::Torch),
            other => Err(format!("unknown flash mode '{}'", other)),
        }
    }
}

/// User selections that feed every capture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSettings {
    pub format: PhotoFormat,
    pub flash: FlashMode,
}

/// Description of one still capture handed to the capture pipeline.
///
/// Built fresh for every shot and consumed by the delegate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub id: String,
    pub lens: LensId,
    pub format: PhotoFormat,
    pub flash: FlashMode,
    pub mirrored: bool,
    pub raw_pixel_format: Option<RawPixelFormat>,
}

/// Compose the request for the next shot on `lens`.
///
/// `raw_formats` must be queried right before the call since RAW support
/// depends on the active lens. When the requested RAW kind is missing the
/// request falls back to HEIF and the returned error is informational only.
pub fn compose_request(
    settings: &CaptureSettings,
    lens: &Lens,
    raw_formats: &[RawPixelFormat],
) -> (CaptureRequest, Option<CaptureError>) {
    let mut request = CaptureRequest {
        id: uuid::Uuid::new_v4().to_string(),
        lens: lens.id.clone(),
        format: settings.format,
        flash: settings.flash.for_single_capture(),
        mirrored: lens.is_front(),
        raw_pixel_format: None,
    };

    let Some(kind) = settings.format.raw_kind() else {
        return (request, None);
    };

    match raw_formats.iter().find(|format| format.kind == kind) {
        Some(format) => {
            debug!("Resolved {} pixel format {:#x}", settings.format, format.code);
            request.raw_pixel_format = Some(*format);
            (request, None)
        }
        None => {
            let error = CaptureError::NoRawFormatAvailable {
                format: settings.format.to_string(),
                lens: lens.id.to_string(),
            };
            request.format = PhotoFormat::default();
            (request, Some(error))
        }
    }
}

use super::types::{Lens, LensId, LensPosition};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Sensor width of the 35mm-equivalent convention
pub const REFERENCE_SENSOR_WIDTH_MM: f32 = 35.0;

/// 35mm-equivalent focal length for a horizontal field of view in degrees
pub fn equivalent_focal_length(field_of_view_degrees: f32) -> f32 {
    let fov = field_of_view_degrees.to_radians();
    REFERENCE_SENSOR_WIDTH_MM / (2.0 * (fov / 2.0).tan())
}

/// Focal length of a lens relative to the back wide-angle camera
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct RelativeZoomFactor(f32);

impl RelativeZoomFactor {
    pub fn new(value: f32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> f32 {
        self.0
    }

    /// Selector label such as "1x", "3x" or "0.5x"
    pub fn label(&self) -> String {
        if self.0.fract() == 0.0 {
            format!("{:.0}x", self.0)
        } else {
            format!("{:.1}x", self.0)
        }
    }
}

impl fmt::Display for RelativeZoomFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoomEntry {
    pub lens: Lens,
    pub zoom: RelativeZoomFactor,
}

/// Zoom factors of every discovered lens, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LensZoomMap {
    entries: Vec<ZoomEntry>,
}

impl LensZoomMap {
    pub fn get(&self, id: &LensId) -> Option<RelativeZoomFactor> {
        self.entries
            .iter()
            .find(|entry| &entry.lens.id == id)
            .map(|entry| entry.zoom)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ZoomEntry> {
        self.entries.iter()
    }

    /// Lenses at one position, ordered from widest to longest
    pub fn selectable(&self, position: LensPosition) -> Vec<&ZoomEntry> {
        let mut entries: Vec<&ZoomEntry> = self
            .entries
            .iter()
            .filter(|entry| entry.lens.position == position)
            .collect();
        entries.sort_by(|a, b| a.zoom.value().total_cmp(&b.zoom.value()));
        entries
    }
}

/// Map every lens to its zoom factor relative to the back wide-angle camera.
///
/// Returns an empty map when no back wide-angle lens was discovered. Front-only
/// or wide-less rigs are valid hardware, so this is not an error.
pub fn normalize(lenses: &[Lens]) -> LensZoomMap {
    let reference = match lenses.iter().find(|lens| lens.is_reference()) {
        Some(lens) => lens,
        None => {
            debug!("No back wide-angle lens among {} lenses", lenses.len());
            return LensZoomMap::default();
        }
    };

    let reference_focal_length = equivalent_focal_length(reference.field_of_view);
    if !reference_focal_length.is_finite() || reference_focal_length <= 0.0 {
        warn!(
            "Reference lens {} reports unusable field of view {}",
            reference.id, reference.field_of_view
        );
        return LensZoomMap::default();
    }

    let entries = lenses
        .iter()
        .filter_map(|lens| {
            let focal_length = equivalent_focal_length(lens.field_of_view);
            if !focal_length.is_finite() {
                warn!(
                    "Skipping lens {} with field of view {}",
                    lens.id, lens.field_of_view
                );
                return None;
            }
            // Only the ratio is rounded; the reference stays exact so a
            // lens wider than the reference can land on 0x
            let zoom = (focal_length / reference_focal_length).round();
            Some(ZoomEntry {
                lens: lens.clone(),
                zoom: RelativeZoomFactor(zoom),
            })
        })
        .collect();

    LensZoomMap { entries }
}

mod focal;
mod types;

#[cfg(test)]
mod tests;

pub use focal::{
    equivalent_focal_length, normalize, LensZoomMap, RelativeZoomFactor, ZoomEntry,
    REFERENCE_SENSOR_WIDTH_MM,
};
pub use types::{Lens, LensId, LensKind, LensPosition};

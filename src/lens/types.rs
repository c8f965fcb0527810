use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical side of the device a lens faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LensPosition {
    Front,
    Back,
}

impl LensPosition {
    pub fn opposite(self) -> Self {
        match self {
            LensPosition::Front => LensPosition::Back,
            LensPosition::Back => LensPosition::Front,
        }
    }
}

impl fmt::Display for LensPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LensPosition::Front => write!(f, "front"),
            LensPosition::Back => write!(f, "back"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LensKind {
    Wide,
    UltraWide,
    Telephoto,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LensId(String);

impl LensId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LensId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One physical camera unit as reported by device discovery.
///
/// Immutable once discovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lens {
    pub id: LensId,
    pub position: LensPosition,
    pub kind: LensKind,
    /// Horizontal angular field of view in degrees
    pub field_of_view: f32,
}

impl Lens {
    pub fn new<S: Into<String>>(
        id: S,
        position: LensPosition,
        kind: LensKind,
        field_of_view: f32,
    ) -> Self {
        Self {
            id: LensId::new(id),
            position,
            kind,
            field_of_view,
        }
    }

    pub fn is_front(&self) -> bool {
        self.position == LensPosition::Front
    }

    /// The back wide-angle camera every other lens is measured against
    pub fn is_reference(&self) -> bool {
        self.position == LensPosition::Back && self.kind == LensKind::Wide
    }
}

impl fmt::Display for Lens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {:?})", self.id, self.position, self.kind)
    }
}

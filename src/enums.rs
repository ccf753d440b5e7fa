use serde::{Deserialize, Serialize};

/// Volume axis. Arrays are indexed `[x, y, z]`, so the discriminant is the
/// ndarray axis number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewPlane {
    Axial,
    Sagittal,
    Coronal,
}

impl ViewPlane {
    pub const ALL: [ViewPlane; 3] = [ViewPlane::Axial, ViewPlane::Sagittal, ViewPlane::Coronal];

    pub fn name(self) -> &'static str {
        match self {
            ViewPlane::Axial => "axial",
            ViewPlane::Sagittal => "sagittal",
            ViewPlane::Coronal => "coronal",
        }
    }
}

/// What a loaded file is meant to become.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeKind {
    Raw,
    Annotation,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrushKind {
    /// Painting disabled, pointer input navigates instead.
    None,
    #[default]
    Circle,
    Rect,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// 6 face neighbours.
    Face,
    /// 18 face and edge neighbours.
    Edge,
    /// All 26 neighbours of the surrounding cube.
    #[default]
    Full,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}

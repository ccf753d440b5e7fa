use std::path::PathBuf;

use thiserror::Error;

use crate::targets::LabelingError;
use crate::volume_loader::StoreError;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0} does not exist")]
    FileNotFound(PathBuf),

    #[error("no raw volume loaded")]
    NoRawVolume,

    #[error("illegal size: annotation is {found:?}, raw volume is {expected:?}")]
    GeometryMismatch {
        expected: (usize, usize, usize),
        found: (usize, usize, usize),
    },

    #[error(
        "values range from {min} to {max}, which does not look like a label volume; try loading it as a raw volume"
    )]
    ImplausibleLabelRange { min: i64, max: i64 },

    #[error("target statistics are stale, recompute them before deleting")]
    StatsStale,

    #[error("no target with id {0}")]
    UnknownTarget(u16),

    #[error("window bottom {bottom} must be below top {top}")]
    InvalidWindow { bottom: i32, top: i32 },

    #[error("brush size must be at least 1")]
    InvalidBrushSize,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Labeling(#[from] LabelingError),
}

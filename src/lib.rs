//! # label-volume
//!
//! A volumetric annotation engine for medical images: it holds a raw
//! intensity volume together with a co-registered label volume, renders both
//! in the three medical planes and edits the labels with a brush.
//!
//! The engine covers:
//!  - Windowed grayscale slices and colour-coded label overlays for the
//!    Axial, Sagittal and Coronal planes around a shared focus point
//!  - Circle and rectangle brushes that paint or erase a single slice,
//!    clipped at the volume border
//!  - Undo/redo over the last five strokes
//!  - Targets: 26-connected components of labelled voxels with their
//!    dominant label and an approximate centroid, which can be deleted
//!
//! Raw volumes are read from DICOM series (sorted like a regular series
//! reader). Label volumes are stored as stacks of 8-bit PNG slices with a
//! geometry sidecar copied from the raw volume.
//!
//! Volumes are indexed `[x, y, z]`. Each plane maps two of those axes onto
//! raster columns (`u`) and rows (`v`):
//!
//! | Plane    | Slice axis | u | v |
//! |----------|------------|---|---|
//! | Axial    | z          | y | x |
//! | Sagittal | x          | z | y |
//! | Coronal  | y          | z | x |
//!
//! # Examples
//!
//! ## Painting on the axial plane
//!
//! ```no_run
//! # use label_volume::{AnnotationEngine, Axis, BrushKind, EngineConfig, ViewPlane, VolumeKind};
//! let mut engine = AnnotationEngine::new(EngineConfig::default());
//! engine
//!     .load("dicom", VolumeKind::Raw)
//!     .expect("should have loaded the series");
//! engine.set_brush(BrushKind::Circle, 6).expect("brush size is positive");
//! let focus = engine.focus();
//! engine.paint(focus, Axis::Z, 1, true);
//! let targets = engine.recompute_targets().expect("labels are loaded");
//! println!("{} target(s)", targets.len());
//! let overlay = engine
//!     .overlay_raster(ViewPlane::Axial)
//!     .expect("a volume is loaded");
//! overlay.save("axial_labels.png").expect("should have written the overlay");
//! ```

pub mod brush;
pub mod colorizer;
pub mod config;
pub mod engine;
pub mod enums;
pub mod error;
pub mod focus;
pub mod history;
pub mod plane;
pub mod targets;
pub mod volume;
pub mod volume_loader;

pub use brush::{BrushSpec, StrokeMode, StrokeOutcome};
pub use colorizer::{Palette, Window};
pub use config::{ConfigError, EngineConfig};
pub use engine::AnnotationEngine;
pub use enums::{Axis, BrushKind, Connectivity, SortBy, ViewPlane, VolumeKind};
pub use error::{EngineError, Result};
pub use focus::{DirtyPlanes, FocusPoint};
pub use history::HISTORY_DEPTH;
pub use targets::{ComponentLabeler, ComponentMap, FloodFillLabeler, LabelingError, Target};
pub use volume::{Geometry, LabelVolume, Volume, VolumePair, Voxel};
pub use volume_loader::{DicomStore, StoreError, VolumeStore};

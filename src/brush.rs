//! Voxel footprint of one paint/erase application and its composition into
//! the label volume.
//!
//! A brush acts on a single slice and one voxel along the collapsing axis.
//! In-plane, a rectangle covers `size` voxels starting `size / 2` before the
//! click, while a circle's box spans `size / 2` voxels on either side so the
//! whole disc fits. The box is clipped to the volume before anything is
//! written, and the circular mask is always measured from the clicked voxel,
//! so a disc near an edge is cut off rather than shifted.

use ndarray::{Array3, Zip, s};
use serde::{Deserialize, Serialize};

use crate::enums::{Axis, BrushKind};
use crate::error::{EngineError, Result};
use crate::volume::LabelVolume;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrushSpec {
    pub kind: BrushKind,
    pub size: u32,
}

impl Default for BrushSpec {
    fn default() -> Self {
        Self {
            kind: BrushKind::Circle,
            size: 5,
        }
    }
}

impl BrushSpec {
    pub fn new(kind: BrushKind, size: u32) -> Result<Self> {
        if size == 0 {
            return Err(EngineError::InvalidBrushSize);
        }
        Ok(Self { kind, size })
    }

    /// `false` in navigation mode.
    pub fn paints(&self) -> bool {
        self.kind != BrushKind::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeMode {
    Paint,
    Erase,
}

/// What a paint/erase call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeOutcome {
    /// Labels were composed (possibly without changing any voxel).
    Applied,
    /// Brush kind is `None`: the pointer navigates instead of painting.
    Navigation,
    /// The clicked voxel lies outside the volume.
    OutOfBounds,
    NoVolume,
}

/// Region touched by one brush application, clipped to the volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrushBox {
    pub center: [usize; 3],
    /// Inclusive lower corner.
    pub lo: [usize; 3],
    /// Exclusive upper corner.
    pub hi: [usize; 3],
}

impl BrushBox {
    pub fn new(
        center: [usize; 3],
        collapse: Axis,
        spec: &BrushSpec,
        dim: (usize, usize, usize),
    ) -> Self {
        let dim = [dim.0, dim.1, dim.2];
        let size = spec.size as usize;
        let half = size / 2;
        let mut lo = center;
        let mut hi = center.map(|c| c + 1);
        for axis in Axis::ALL {
            let a = axis.index();
            if axis == collapse {
                continue;
            }
            let end = match spec.kind {
                BrushKind::Rect => center[a] + size - half,
                BrushKind::Circle | BrushKind::None => center[a] + half + 1,
            };
            lo[a] = center[a].saturating_sub(half);
            hi[a] = end.min(dim[a]);
        }
        Self { center, lo, hi }
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (
            self.hi[0] - self.lo[0],
            self.hi[1] - self.lo[1],
            self.hi[2] - self.lo[2],
        )
    }

    /// Squared distance from the click to patch cell `(i, j, k)`.
    fn distance_sq(&self, (i, j, k): (usize, usize, usize)) -> u64 {
        [i, j, k]
            .iter()
            .enumerate()
            .map(|(a, &offset)| {
                let d = (self.lo[a] + offset).abs_diff(self.center[a]) as u64;
                d * d
            })
            .sum()
    }
}

/// Patch of the box's shape holding `label` where the brush reaches.
pub fn footprint(spec: &BrushSpec, bbox: &BrushBox, label: u8) -> Array3<u8> {
    let shape = bbox.shape();
    match spec.kind {
        BrushKind::None => Array3::zeros(shape),
        BrushKind::Rect => Array3::from_elem(shape, label),
        BrushKind::Circle => {
            let size = u64::from(spec.size);
            // 2 * d <= size, kept in integers
            Array3::from_shape_fn(shape, |cell| {
                if 4 * bbox.distance_sq(cell) <= size * size {
                    label
                } else {
                    0
                }
            })
        }
    }
}

/// Merge `patch` into `labels` over `bbox`. Painting only fills background
/// voxels; erasing only clears voxels holding exactly `label`. Returns the
/// number of voxels changed.
pub fn compose(
    labels: &mut LabelVolume,
    bbox: &BrushBox,
    patch: &Array3<u8>,
    mode: StrokeMode,
    label: u8,
) -> usize {
    let (lo, hi) = (bbox.lo, bbox.hi);
    let mut region = labels
        .data_mut()
        .slice_mut(s![lo[0]..hi[0], lo[1]..hi[1], lo[2]..hi[2]]);
    let mut changed = 0;
    Zip::from(&mut region).and(patch).for_each(|existing, &mark| {
        if mark == 0 {
            return;
        }
        match mode {
            StrokeMode::Paint if *existing == 0 => {
                *existing = mark;
                changed += 1;
            }
            StrokeMode::Erase if *existing == label => {
                *existing = 0;
                changed += 1;
            }
            _ => {}
        }
    });
    changed
}

/// One brush application at an in-bounds voxel.
pub fn apply(
    labels: &mut LabelVolume,
    spec: &BrushSpec,
    center: [usize; 3],
    collapse: Axis,
    label: u8,
    mode: StrokeMode,
) -> usize {
    let bbox = BrushBox::new(center, collapse, spec, labels.dim());
    let patch = footprint(spec, &bbox, label);
    compose(labels, &bbox, &patch, mode, label)
}

use ndarray::{Array3, ArrayView2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::enums::{Axis, ViewPlane};
use crate::error::{EngineError, Result};
use crate::plane;

/// Integer voxel coordinate. Signed so pointer positions outside the volume
/// can be represented and rejected.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Voxel {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Voxel {
    pub fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    pub fn get(&self, axis: Axis) -> i64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn set(&mut self, axis: Axis, value: i64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
    }

    /// Array index of this voxel, or `None` if it lies outside `dim`.
    pub fn index_in(&self, dim: (usize, usize, usize)) -> Option<[usize; 3]> {
        let inside = |value: i64, size: usize| value >= 0 && (value as u64) < size as u64;
        if inside(self.x, dim.0) && inside(self.y, dim.1) && inside(self.z, dim.2) {
            Some([self.x as usize, self.y as usize, self.z as usize])
        } else {
            None
        }
    }
}

/// Opaque placement metadata, carried from the raw volume onto saved labels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Voxel spacing along `(x, y, z)`.
    pub spacing: (f32, f32, f32),
    pub origin: (f32, f32, f32),
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            spacing: (1.0, 1.0, 1.0),
            origin: (0.0, 0.0, 0.0),
        }
    }
}

/// Intensity volume indexed `[x, y, z]`.
#[derive(Debug, Default, Clone)]
pub struct Volume {
    pub data: Array3<i16>,
    pub geometry: Geometry,
}

impl Volume {
    pub fn new(data: Array3<i16>, geometry: Geometry) -> Self {
        Self { data, geometry }
    }

    /// Get the dimensions of the volume (width, height, depth)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn data(&self) -> &Array3<i16> {
        &self.data
    }

    /// Smallest and largest voxel value, `None` for an empty volume.
    pub fn value_range(&self) -> Option<(i16, i16)> {
        let min = self.data.par_iter().copied().min()?;
        let max = self.data.par_iter().copied().max()?;
        Some((min, max))
    }

    pub fn get_slice_from_axis(
        &self,
        index: usize,
        plane: ViewPlane,
    ) -> Option<ArrayView2<'_, i16>> {
        self.is_valid_index(index, plane)
            .then(|| plane::plane_slice(&self.data, plane, index))
    }

    fn is_valid_index(&self, index: usize, plane: ViewPlane) -> bool {
        index < self.data.len_of(ndarray::Axis(plane.slice_axis().index()))
    }
}

/// Annotation volume; `0` is background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelVolume {
    data: Array3<u8>,
}

impl LabelVolume {
    pub fn zeros(dim: (usize, usize, usize)) -> Self {
        Self {
            data: Array3::zeros(dim),
        }
    }

    pub fn from_array(data: Array3<u8>) -> Self {
        Self { data }
    }

    /// Interpret a loaded volume as labels. Values outside `[0, max_label]`
    /// suggest the file holds intensities rather than labels.
    pub fn from_volume(volume: &Volume, max_label: u8) -> Result<Self> {
        let Some((min, max)) = volume.value_range() else {
            return Ok(Self::zeros(volume.dim()));
        };
        if min < 0 || max > i16::from(max_label) {
            return Err(EngineError::ImplausibleLabelRange {
                min: i64::from(min),
                max: i64::from(max),
            });
        }
        Ok(Self {
            data: volume.data.mapv(|value| value as u8),
        })
    }

    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn data(&self) -> &Array3<u8> {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut Array3<u8> {
        &mut self.data
    }

    pub fn get_slice_from_axis(
        &self,
        index: usize,
        plane: ViewPlane,
    ) -> Option<ArrayView2<'_, u8>> {
        (index < self.data.len_of(ndarray::Axis(plane.slice_axis().index())))
            .then(|| plane::plane_slice(&self.data, plane, index))
    }

    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|&label| label == 0)
    }
}

/// Raw volume and its co-registered labels. Both always share one extent.
#[derive(Debug, Clone)]
pub struct VolumePair {
    raw: Volume,
    labels: LabelVolume,
}

impl VolumePair {
    /// Pair a freshly loaded raw volume with all-zero labels.
    pub fn new(raw: Volume) -> Self {
        let labels = LabelVolume::zeros(raw.dim());
        Self { raw, labels }
    }

    pub fn dim(&self) -> (usize, usize, usize) {
        self.raw.dim()
    }

    pub fn raw(&self) -> &Volume {
        &self.raw
    }

    pub fn labels(&self) -> &LabelVolume {
        &self.labels
    }

    pub(crate) fn labels_mut(&mut self) -> &mut LabelVolume {
        &mut self.labels
    }

    pub fn check_extent(&self, labels: &LabelVolume) -> Result<()> {
        if labels.dim() != self.dim() {
            return Err(EngineError::GeometryMismatch {
                expected: self.dim(),
                found: labels.dim(),
            });
        }
        Ok(())
    }

    /// Swap in new labels, returning the previous ones.
    pub fn replace_labels(&mut self, labels: LabelVolume) -> Result<LabelVolume> {
        self.check_extent(&labels)?;
        Ok(std::mem::replace(&mut self.labels, labels))
    }
}

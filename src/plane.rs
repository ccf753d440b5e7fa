//! Coordinate bookkeeping between volume space and the three view planes.
//!
//! Every plane is described by one row of [`PLANE_AXES`]. Rasters are row
//! major: columns run along the plane's `u` axis and rows along its `v` axis.

use ndarray::{Array3, ArrayView2, Axis as NdAxis};

use crate::enums::{Axis, ViewPlane};
use crate::volume::Voxel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneAxes {
    /// Axis the plane cuts through; the focus coordinate on it picks the slice.
    pub slice: Axis,
    /// Raster column axis.
    pub u: Axis,
    /// Raster row axis.
    pub v: Axis,
}

/// Indexed by `ViewPlane as usize`.
pub const PLANE_AXES: [PlaneAxes; 3] = [
    // Axial
    PlaneAxes {
        slice: Axis::Z,
        u: Axis::Y,
        v: Axis::X,
    },
    // Sagittal
    PlaneAxes {
        slice: Axis::X,
        u: Axis::Z,
        v: Axis::Y,
    },
    // Coronal
    PlaneAxes {
        slice: Axis::Y,
        u: Axis::Z,
        v: Axis::X,
    },
];

impl ViewPlane {
    pub fn axes(self) -> PlaneAxes {
        PLANE_AXES[self as usize]
    }

    pub fn slice_axis(self) -> Axis {
        self.axes().slice
    }

    /// The plane whose slice index is driven by `axis`.
    pub fn from_slice_axis(axis: Axis) -> ViewPlane {
        match axis {
            Axis::Z => ViewPlane::Axial,
            Axis::X => ViewPlane::Sagittal,
            Axis::Y => ViewPlane::Coronal,
        }
    }
}

fn extent(dim: (usize, usize, usize), axis: Axis) -> usize {
    match axis {
        Axis::X => dim.0,
        Axis::Y => dim.1,
        Axis::Z => dim.2,
    }
}

/// Slice index shown by `plane` for the given focus, clamped to `[0, dim - 1]`.
pub fn slice_index(plane: ViewPlane, focus: &Voxel, dim: (usize, usize, usize)) -> usize {
    let axis = plane.slice_axis();
    let last = extent(dim, axis).saturating_sub(1) as i64;
    focus.get(axis).clamp(0, last) as usize
}

/// In-plane `(u, v)` coordinates of a volume voxel.
pub fn to_plane(plane: ViewPlane, voxel: &Voxel) -> (i64, i64) {
    let axes = plane.axes();
    (voxel.get(axes.u), voxel.get(axes.v))
}

/// Volume voxel shown at `(u, v)` of slice `index`.
pub fn from_plane(plane: ViewPlane, index: i64, u: i64, v: i64) -> Voxel {
    let axes = plane.axes();
    let mut voxel = Voxel::default();
    voxel.set(axes.slice, index);
    voxel.set(axes.u, u);
    voxel.set(axes.v, v);
    voxel
}

/// `(width, height)` of a raster for `plane`.
pub fn raster_size(plane: ViewPlane, dim: (usize, usize, usize)) -> (u32, u32) {
    let axes = plane.axes();
    (extent(dim, axes.u) as u32, extent(dim, axes.v) as u32)
}

/// Focus delta `(dx, dy, dz)` that scrolls `plane` by `steps` slices.
pub fn scroll_delta(plane: ViewPlane, steps: i64) -> (i64, i64, i64) {
    match plane.slice_axis() {
        Axis::X => (steps, 0, 0),
        Axis::Y => (0, steps, 0),
        Axis::Z => (0, 0, steps),
    }
}

/// View of one slice laid out as `[v, u]`. `index` must be in bounds.
pub(crate) fn plane_slice<T>(
    data: &Array3<T>,
    plane: ViewPlane,
    index: usize,
) -> ArrayView2<'_, T> {
    let axes = plane.axes();
    let slice = data.index_axis(NdAxis(axes.slice.index()), index);
    // index_axis keeps the remaining axes in ascending order
    if axes.v.index() < axes.u.index() {
        slice
    } else {
        slice.reversed_axes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voxel(x: i64, y: i64, z: i64) -> Voxel {
        Voxel { x, y, z }
    }

    #[test]
    fn table_matches_plane_layout() {
        assert_eq!(
            ViewPlane::Axial.axes(),
            PlaneAxes {
                slice: Axis::Z,
                u: Axis::Y,
                v: Axis::X,
            }
        );
        assert_eq!(
            ViewPlane::Sagittal.axes(),
            PlaneAxes {
                slice: Axis::X,
                u: Axis::Z,
                v: Axis::Y,
            }
        );
        assert_eq!(
            ViewPlane::Coronal.axes(),
            PlaneAxes {
                slice: Axis::Y,
                u: Axis::Z,
                v: Axis::X,
            }
        );
    }

    #[test]
    fn slice_axis_lookup_is_inverse() {
        for plane in ViewPlane::ALL {
            assert_eq!(ViewPlane::from_slice_axis(plane.slice_axis()), plane);
        }
    }

    #[test]
    fn plane_coordinates_round_trip() {
        let p = voxel(3, 5, 7);
        for plane in ViewPlane::ALL {
            let (u, v) = to_plane(plane, &p);
            let index = p.get(plane.slice_axis());
            assert_eq!(from_plane(plane, index, u, v), p);
        }
        assert_eq!(to_plane(ViewPlane::Axial, &p), (5, 3));
        assert_eq!(to_plane(ViewPlane::Sagittal, &p), (7, 5));
        assert_eq!(to_plane(ViewPlane::Coronal, &p), (7, 3));
    }

    #[test]
    fn slice_index_clamps_to_last_slice() {
        let dim = (4, 5, 6);
        assert_eq!(slice_index(ViewPlane::Axial, &voxel(0, 0, 6), dim), 5);
        assert_eq!(slice_index(ViewPlane::Sagittal, &voxel(-2, 0, 0), dim), 0);
        assert_eq!(slice_index(ViewPlane::Coronal, &voxel(0, 3, 0), dim), 3);
    }

    #[test]
    fn slices_are_laid_out_v_by_u() {
        let data = Array3::from_shape_fn((4, 5, 6), |(x, y, z)| (x * 100 + y * 10 + z) as u16);
        for plane in ViewPlane::ALL {
            let (width, height) = raster_size(plane, data.dim());
            let slice = plane_slice(&data, plane, 2);
            assert_eq!(slice.dim(), (height as usize, width as usize));
            for ((row, col), value) in slice.indexed_iter() {
                let p = from_plane(plane, 2, col as i64, row as i64);
                assert_eq!(*value, data[[p.x as usize, p.y as usize, p.z as usize]]);
            }
        }
    }

    #[test]
    fn scroll_moves_along_slice_axis() {
        assert_eq!(scroll_delta(ViewPlane::Axial, -1), (0, 0, -1));
        assert_eq!(scroll_delta(ViewPlane::Sagittal, 1), (1, 0, 0));
        assert_eq!(scroll_delta(ViewPlane::Coronal, 2), (0, 2, 0));
    }
}

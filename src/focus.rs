use crate::enums::{Axis, ViewPlane};
use crate::volume::Voxel;

/// Shared crosshair position of all three views.
pub type FocusPoint = Voxel;

/// Planes whose displayed slice changed and need to be redrawn.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DirtyPlanes([bool; 3]);

impl DirtyPlanes {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, plane: ViewPlane) {
        self.0[plane as usize] = true;
    }

    pub fn contains(&self, plane: ViewPlane) -> bool {
        self.0[plane as usize]
    }

    pub fn is_empty(&self) -> bool {
        !self.0.iter().any(|dirty| *dirty)
    }

    pub fn iter(&self) -> impl Iterator<Item = ViewPlane> + '_ {
        ViewPlane::ALL
            .into_iter()
            .filter(|plane| self.contains(*plane))
    }
}

impl FromIterator<ViewPlane> for DirtyPlanes {
    fn from_iter<I: IntoIterator<Item = ViewPlane>>(iter: I) -> Self {
        let mut planes = Self::none();
        for plane in iter {
            planes.insert(plane);
        }
        planes
    }
}

#[derive(Debug, Default, Clone)]
pub struct FocusController {
    point: FocusPoint,
}

impl FocusController {
    pub fn point(&self) -> FocusPoint {
        self.point
    }

    pub fn reset(&mut self) {
        self.point = FocusPoint::default();
    }

    /// Jump to the volume center without reporting dirty planes; callers
    /// redraw everything after a load anyway.
    pub fn center_on(&mut self, dim: (usize, usize, usize)) {
        self.point = Voxel::new((dim.0 / 2) as i64, (dim.1 / 2) as i64, (dim.2 / 2) as i64);
    }

    /// Move to `target`, clamped per axis into `[0, dim]`. Without a volume
    /// the focus stays at the origin.
    pub fn set(&mut self, target: FocusPoint, dim: Option<(usize, usize, usize)>) -> DirtyPlanes {
        let Some(dim) = dim else {
            self.point = FocusPoint::default();
            return DirtyPlanes::none();
        };
        let limits = [dim.0, dim.1, dim.2];
        let mut next = target;
        for axis in Axis::ALL {
            next.set(axis, target.get(axis).clamp(0, limits[axis.index()] as i64));
        }

        let dirty = Axis::ALL
            .into_iter()
            .filter(|axis| next.get(*axis) != self.point.get(*axis))
            .map(ViewPlane::from_slice_axis)
            .collect();
        self.point = next;
        dirty
    }

    pub fn move_by(
        &mut self,
        (dx, dy, dz): (i64, i64, i64),
        dim: Option<(usize, usize, usize)>,
    ) -> DirtyPlanes {
        let target = Voxel::new(
            self.point.x.saturating_add(dx),
            self.point.y.saturating_add(dy),
            self.point.z.saturating_add(dz),
        );
        self.set(target, dim)
    }
}

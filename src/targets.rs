//! Connected-component statistics over the label volume.
//!
//! A target is a connected set of non-zero voxels, whatever their label
//! values. Its label is the value at the component's first voxel in scan
//! order, and its centroid is the per-axis peak of the component's marginal
//! histograms. The centroid is not a mean and can fall outside a bent or
//! multi-lobed component.

use std::collections::{BTreeMap, VecDeque};

use ndarray::{Array3, ArrayView3, Zip};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use web_time::Instant;

use crate::enums::Connectivity;
use crate::error::{EngineError, Result};
use crate::volume::LabelVolume;

#[derive(Debug, Error)]
pub enum LabelingError {
    #[error("more than 65535 connected components")]
    TooManyComponents,
}

/// Output of a labeling pass: `0` is background, `1..=count` are components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentMap {
    pub ids: Array3<u16>,
    pub count: u16,
}

/// Connected-component labeling service.
pub trait ComponentLabeler {
    fn label(
        &self,
        labels: ArrayView3<'_, u8>,
        connectivity: Connectivity,
    ) -> std::result::Result<ComponentMap, LabelingError>;
}

/// Breadth-first flood fill. Components are numbered in scan order of their
/// first voxel.
#[derive(Debug, Default, Clone, Copy)]
pub struct FloodFillLabeler;

fn neighborhood_offsets(connectivity: Connectivity) -> Vec<[isize; 3]> {
    let max_nonzero = match connectivity {
        Connectivity::Face => 1,
        Connectivity::Edge => 2,
        Connectivity::Full => 3,
    };
    let mut offsets = Vec::with_capacity(26);
    for dx in -1..=1_isize {
        for dy in -1..=1_isize {
            for dz in -1..=1_isize {
                let nonzero = [dx, dy, dz].iter().filter(|d| **d != 0).count();
                if nonzero > 0 && nonzero <= max_nonzero {
                    offsets.push([dx, dy, dz]);
                }
            }
        }
    }
    offsets
}

fn neighbor(
    (x, y, z): (usize, usize, usize),
    [dx, dy, dz]: [isize; 3],
    dim: (usize, usize, usize),
) -> Option<(usize, usize, usize)> {
    let nx = x.checked_add_signed(dx).filter(|&v| v < dim.0)?;
    let ny = y.checked_add_signed(dy).filter(|&v| v < dim.1)?;
    let nz = z.checked_add_signed(dz).filter(|&v| v < dim.2)?;
    Some((nx, ny, nz))
}

impl ComponentLabeler for FloodFillLabeler {
    fn label(
        &self,
        labels: ArrayView3<'_, u8>,
        connectivity: Connectivity,
    ) -> std::result::Result<ComponentMap, LabelingError> {
        let dim = labels.dim();
        let offsets = neighborhood_offsets(connectivity);
        let mut ids = Array3::<u16>::zeros(dim);
        let mut count = 0_u16;
        let mut queue = VecDeque::new();

        for (index, &value) in labels.indexed_iter() {
            if value == 0 || ids[index] != 0 {
                continue;
            }
            count = count
                .checked_add(1)
                .ok_or(LabelingError::TooManyComponents)?;
            ids[index] = count;
            queue.push_back(index);

            while let Some(point) = queue.pop_front() {
                for offset in &offsets {
                    let Some(candidate) = neighbor(point, *offset, dim) else {
                        continue;
                    };
                    if labels[candidate] == 0 || ids[candidate] != 0 {
                        continue;
                    }
                    ids[candidate] = count;
                    queue.push_back(candidate);
                }
            }
        }

        Ok(ComponentMap { ids, count })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Target {
    pub id: u16,
    pub label: u8,
    /// Peak of the marginal histogram along each of `x`, `y`, `z`.
    pub centroid: [usize; 3],
    pub voxel_count: usize,
}

/// Voxel count per coordinate along one axis. Only coordinates the
/// component touches are stored.
type Marginal = BTreeMap<usize, usize>;

/// Lowest coordinate holding the largest count.
fn argmax(marginal: &Marginal) -> usize {
    marginal
        .iter()
        .fold((0, 0), |(best, best_count), (&coord, &count)| {
            if count > best_count {
                (coord, count)
            } else {
                (best, best_count)
            }
        })
        .0
}

#[derive(Debug, Default)]
struct Accumulator {
    label: Option<u8>,
    voxel_count: usize,
    marginals: [Marginal; 3],
}

impl Accumulator {
    fn add(&mut self, index: [usize; 3], label: u8) {
        if self.label.is_none() {
            self.label = Some(label);
        }
        self.voxel_count += 1;
        for (marginal, coord) in self.marginals.iter_mut().zip(index) {
            *marginal.entry(coord).or_insert(0) += 1;
        }
    }

    fn finish(&self, id: u16) -> Target {
        let [mx, my, mz] = &self.marginals;
        Target {
            id,
            label: self.label.unwrap_or(0),
            centroid: [argmax(mx), argmax(my), argmax(mz)],
            voxel_count: self.voxel_count,
        }
    }
}

fn summarize(map: &ComponentMap, labels: &LabelVolume) -> Vec<Target> {
    let mut accumulators: Vec<Accumulator> =
        (0..map.count).map(|_| Accumulator::default()).collect();

    for (((x, y, z), &id), &label) in map.ids.indexed_iter().zip(labels.data().iter()) {
        if id == 0 {
            continue;
        }
        accumulators[usize::from(id) - 1].add([x, y, z], label);
    }

    accumulators
        .iter()
        .zip(1..=map.count)
        .map(|(accumulator, id)| accumulator.finish(id))
        .collect()
}

/// Cached target list plus the component map it was derived from.
#[derive(Debug, Default)]
pub struct TargetAnalyzer {
    map: Option<ComponentMap>,
    targets: Vec<Target>,
    dirty: bool,
}

impl TargetAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recompute(
        &mut self,
        labeler: &impl ComponentLabeler,
        labels: &LabelVolume,
    ) -> Result<&[Target]> {
        let started = Instant::now();
        let map = labeler.label(labels.data().view(), Connectivity::Full)?;
        self.targets = summarize(&map, labels);
        self.map = Some(map);
        self.dirty = false;
        debug!(
            targets = self.targets.len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "recomputed target statistics"
        );
        Ok(&self.targets)
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Forget everything; a fresh all-zero label volume has no targets.
    pub fn clear(&mut self) {
        self.map = None;
        self.targets.clear();
        self.dirty = false;
    }

    /// Fails unless the statistics are current and `id` names a target.
    pub fn check_deletable(&self, id: u16) -> Result<()> {
        if self.dirty {
            return Err(EngineError::StatsStale);
        }
        match &self.map {
            Some(map) if id != 0 && id <= map.count => Ok(()),
            _ => Err(EngineError::UnknownTarget(id)),
        }
    }

    /// Zero every voxel of target `id`. Returns the number of voxels cleared.
    pub fn erase_target(&self, labels: &mut LabelVolume, id: u16) -> usize {
        let Some(map) = &self.map else {
            return 0;
        };
        let mut cleared = 0;
        Zip::from(labels.data_mut())
            .and(&map.ids)
            .for_each(|label, &component| {
                if component == id && *label != 0 {
                    *label = 0;
                    cleared += 1;
                }
            });
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels_with(dim: (usize, usize, usize), voxels: &[([usize; 3], u8)]) -> LabelVolume {
        let mut data = Array3::zeros(dim);
        for (index, value) in voxels {
            data[*index] = *value;
        }
        LabelVolume::from_array(data)
    }

    #[test]
    fn offsets_follow_connectivity() {
        assert_eq!(neighborhood_offsets(Connectivity::Face).len(), 6);
        assert_eq!(neighborhood_offsets(Connectivity::Edge).len(), 18);
        assert_eq!(neighborhood_offsets(Connectivity::Full).len(), 26);
    }

    #[test]
    fn corner_neighbours_join_only_with_full_connectivity() {
        let labels = labels_with((3, 3, 3), &[([0, 0, 0], 1), ([1, 1, 1], 1)]);
        let full = FloodFillLabeler
            .label(labels.data().view(), Connectivity::Full)
            .expect("labeling");
        assert_eq!(full.count, 1);
        let face = FloodFillLabeler
            .label(labels.data().view(), Connectivity::Face)
            .expect("labeling");
        assert_eq!(face.count, 2);
        assert_eq!(face.ids[[1, 1, 1]], 2);
    }

    #[test]
    fn isolated_voxels_are_their_own_targets() {
        let labels = labels_with((10, 10, 10), &[([1, 1, 1], 1), ([8, 8, 8], 2)]);
        let mut analyzer = TargetAnalyzer::new();
        let targets = analyzer
            .recompute(&FloodFillLabeler, &labels)
            .expect("recompute");
        assert_eq!(
            targets,
            &[
                Target { id: 1, label: 1, centroid: [1, 1, 1], voxel_count: 1 },
                Target { id: 2, label: 2, centroid: [8, 8, 8], voxel_count: 1 },
            ]
        );
    }

    #[test]
    fn centroid_is_marginal_peak() {
        // an L: three voxels along x at y = 0, then two more up y at x = 2
        let voxels: Vec<([usize; 3], u8)> = [[0, 0, 0], [1, 0, 0], [2, 0, 0], [2, 1, 0], [2, 2, 0]]
            .into_iter()
            .map(|index| (index, 3))
            .collect();
        let labels = labels_with((4, 4, 1), &voxels);
        let mut analyzer = TargetAnalyzer::new();
        let targets = analyzer
            .recompute(&FloodFillLabeler, &labels)
            .expect("recompute");
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].centroid, [2, 0, 0]);
        assert_eq!(targets[0].voxel_count, 5);
    }

    #[test]
    fn marginal_ties_take_lowest_coordinate() {
        let marginal: Marginal = [(7, 2), (3, 2), (5, 1)].into_iter().collect();
        assert_eq!(argmax(&marginal), 3);
        assert_eq!(argmax(&Marginal::new()), 0);
    }

    #[test]
    fn speckle_volume_yields_one_target_per_voxel() {
        let dim = (24, 24, 24);
        let voxels: Vec<([usize; 3], u8)> = (0..12)
            .flat_map(|x| (0..12).flat_map(move |y| (0..12).map(move |z| [2 * x, 2 * y, 2 * z])))
            .map(|index| (index, 1))
            .collect();
        let labels = labels_with(dim, &voxels);
        let mut analyzer = TargetAnalyzer::new();
        let targets = analyzer
            .recompute(&FloodFillLabeler, &labels)
            .expect("recompute");
        assert_eq!(targets.len(), voxels.len());
        for (target, (index, _)) in targets.iter().zip(&voxels) {
            assert_eq!(target.centroid, *index);
            assert_eq!(target.voxel_count, 1);
        }
    }

    #[test]
    fn mixed_component_takes_first_label() {
        let labels = labels_with((2, 2, 2), &[([0, 0, 1], 4), ([0, 1, 1], 2), ([1, 1, 1], 2)]);
        let mut analyzer = TargetAnalyzer::new();
        let targets = analyzer
            .recompute(&FloodFillLabeler, &labels)
            .expect("recompute");
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].label, 4);
    }

    #[test]
    fn deletion_requires_fresh_statistics() {
        let mut labels = labels_with((4, 4, 4), &[([0, 0, 0], 1), ([3, 3, 3], 1)]);
        let mut analyzer = TargetAnalyzer::new();
        assert!(matches!(analyzer.check_deletable(1), Err(EngineError::UnknownTarget(1))));

        analyzer
            .recompute(&FloodFillLabeler, &labels)
            .expect("recompute");
        assert!(matches!(analyzer.check_deletable(3), Err(EngineError::UnknownTarget(3))));
        assert!(analyzer.check_deletable(2).is_ok());

        analyzer.mark_dirty();
        assert!(matches!(analyzer.check_deletable(2), Err(EngineError::StatsStale)));

        analyzer
            .recompute(&FloodFillLabeler, &labels)
            .expect("recompute");
        assert_eq!(analyzer.erase_target(&mut labels, 2), 1);
        assert_eq!(labels.data()[[3, 3, 3]], 0);
        assert_eq!(labels.data()[[0, 0, 0]], 1);
    }
}

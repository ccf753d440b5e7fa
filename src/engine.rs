use std::path::{Path, PathBuf};

use image::{GrayImage, RgbaImage};
use tracing::{debug, info, warn};

use crate::brush::{self, BrushSpec, StrokeMode, StrokeOutcome};
use crate::colorizer::{Colorizer, Window};
use crate::config::EngineConfig;
use crate::enums::{Axis, BrushKind, ViewPlane, VolumeKind};
use crate::error::{EngineError, Result};
use crate::focus::{DirtyPlanes, FocusController, FocusPoint};
use crate::history::EditHistory;
use crate::plane;
use crate::targets::{ComponentLabeler, FloodFillLabeler, Target, TargetAnalyzer};
use crate::volume::{LabelVolume, Volume, VolumePair, Voxel};
use crate::volume_loader::{DicomStore, StoreError, VolumeStore};

/// Owns the raw/label volume pair and funnels every edit through one place.
///
/// Rasters and target lists handed out are copies; nothing returned aliases
/// the label volume.
pub struct AnnotationEngine<S = DicomStore, L = FloodFillLabeler> {
    store: S,
    labeler: L,
    config: EngineConfig,
    pair: Option<VolumePair>,
    focus: FocusController,
    window: Window,
    brush: BrushSpec,
    history: EditHistory,
    analyzer: TargetAnalyzer,
    last_directory: Option<PathBuf>,
}

impl AnnotationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_services(DicomStore::default(), FloodFillLabeler, config)
    }
}

impl Default for AnnotationEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<S: VolumeStore, L: ComponentLabeler> AnnotationEngine<S, L> {
    pub fn with_services(store: S, labeler: L, config: EngineConfig) -> Self {
        Self {
            store,
            labeler,
            window: config.window,
            brush: config.brush,
            config,
            pair: None,
            focus: FocusController::default(),
            history: EditHistory::new(),
            analyzer: TargetAnalyzer::new(),
            last_directory: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ---- volume pair ----

    /// Load `path` as the raw volume or as its annotation. On error the
    /// previous state is kept.
    pub fn load(&mut self, path: impl AsRef<Path>, kind: VolumeKind) -> Result<()> {
        let path = path.as_ref();
        let result = match kind {
            VolumeKind::Raw => self.load_raw(path),
            VolumeKind::Annotation => self.load_annotation(path),
        };
        match &result {
            Ok(()) => {
                self.last_directory = path.parent().map(Path::to_path_buf);
                info!(path = %path.display(), ?kind, dim = ?self.dim(), "loaded volume");
            }
            Err(err) => warn!(path = %path.display(), ?kind, %err, "load rejected"),
        }
        result
    }

    fn fetch(&self, path: &Path) -> Result<Volume> {
        self.store.load_volume(path).map_err(|err| match err {
            StoreError::NotFound(path) => EngineError::FileNotFound(path),
            other => other.into(),
        })
    }

    fn load_raw(&mut self, path: &Path) -> Result<()> {
        let volume = self.fetch(path)?;
        let pair = VolumePair::new(volume);
        self.focus.center_on(pair.dim());
        self.pair = Some(pair);
        self.history.clear();
        self.analyzer.clear();
        Ok(())
    }

    fn load_annotation(&mut self, path: &Path) -> Result<()> {
        let expected = self.pair.as_ref().ok_or(EngineError::NoRawVolume)?.dim();
        let candidate = self.fetch(path)?;
        if candidate.dim() != expected {
            return Err(EngineError::GeometryMismatch {
                expected,
                found: candidate.dim(),
            });
        }
        let labels = LabelVolume::from_volume(&candidate, self.config.max_label_value)?;
        self.analyzer.recompute(&self.labeler, &labels)?;

        let pair = self.pair.as_mut().ok_or(EngineError::NoRawVolume)?;
        pair.replace_labels(labels)?;
        self.history.clear();
        Ok(())
    }

    /// Write the labels using the raw volume's geometry.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let pair = self.pair.as_ref().ok_or(EngineError::NoRawVolume)?;
        self.store
            .save_label_volume(path.as_ref(), pair.labels(), &pair.raw().geometry)?;
        Ok(())
    }

    /// Drop both volumes and all derived state.
    pub fn clear(&mut self) {
        self.pair = None;
        self.focus.reset();
        self.history.clear();
        self.analyzer.clear();
        info!("cleared volumes");
    }

    pub fn is_loaded(&self) -> bool {
        self.pair.is_some()
    }

    pub fn dim(&self) -> Option<(usize, usize, usize)> {
        self.pair.as_ref().map(VolumePair::dim)
    }

    pub fn volume(&self) -> Option<&Volume> {
        self.pair.as_ref().map(VolumePair::raw)
    }

    pub fn labels(&self) -> Option<&LabelVolume> {
        self.pair.as_ref().map(VolumePair::labels)
    }

    /// Raw voxel value bounds, for sizing window controls.
    pub fn intensity_range(&self) -> Option<(i16, i16)> {
        self.volume()?.value_range()
    }

    /// Directory of the last successfully loaded file.
    pub fn last_directory(&self) -> Option<&Path> {
        self.last_directory.as_deref()
    }

    // ---- focus ----

    pub fn focus(&self) -> FocusPoint {
        self.focus.point()
    }

    pub fn set_focus(&mut self, point: FocusPoint) -> DirtyPlanes {
        let dirty = self.focus.set(point, self.dim());
        if !dirty.is_empty() {
            debug!(focus = ?self.focus.point(), "focus moved");
        }
        dirty
    }

    pub fn move_focus(&mut self, dx: i64, dy: i64, dz: i64) -> DirtyPlanes {
        self.focus.move_by((dx, dy, dz), self.dim())
    }

    /// Step `plane` through its slices, as a mouse wheel does.
    pub fn scroll(&mut self, plane: ViewPlane, steps: i64) -> DirtyPlanes {
        let (dx, dy, dz) = plane::scroll_delta(plane, steps);
        self.move_focus(dx, dy, dz)
    }

    pub fn slice_index(&self, plane: ViewPlane) -> Option<usize> {
        let dim = self.dim()?;
        Some(plane::slice_index(plane, &self.focus.point(), dim))
    }

    // ---- window ----

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn set_window_bottom(&mut self, bottom: i32) -> Result<()> {
        self.window.set_bottom(bottom)
    }

    pub fn set_window_top(&mut self, top: i32) -> Result<()> {
        self.window.set_top(top)
    }

    // ---- brush ----

    pub fn brush(&self) -> BrushSpec {
        self.brush
    }

    pub fn set_brush(&mut self, kind: BrushKind, size: u32) -> Result<()> {
        self.brush = BrushSpec::new(kind, size)?;
        Ok(())
    }

    /// Paint `label` at `voxel` on the slice orthogonal to `axis`. The first
    /// call of a stroke (`new_step`) opens a new undo step.
    pub fn paint(&mut self, voxel: Voxel, axis: Axis, label: u8, new_step: bool) -> StrokeOutcome {
        self.stroke(voxel, axis, label, StrokeMode::Paint, new_step)
    }

    /// Clear voxels holding exactly `label` under the brush.
    pub fn erase(&mut self, voxel: Voxel, axis: Axis, label: u8, new_step: bool) -> StrokeOutcome {
        self.stroke(voxel, axis, label, StrokeMode::Erase, new_step)
    }

    fn stroke(
        &mut self,
        voxel: Voxel,
        axis: Axis,
        label: u8,
        mode: StrokeMode,
        new_step: bool,
    ) -> StrokeOutcome {
        let Some(pair) = self.pair.as_mut() else {
            return StrokeOutcome::NoVolume;
        };
        if !self.brush.paints() {
            return StrokeOutcome::Navigation;
        }
        let Some(center) = voxel.index_in(pair.dim()) else {
            return StrokeOutcome::OutOfBounds;
        };

        if new_step {
            self.history.record(pair.labels().clone());
        } else {
            self.history.clear_redo();
        }
        let changed = brush::apply(pair.labels_mut(), &self.brush, center, axis, label, mode);
        self.analyzer.mark_dirty();
        debug!(?voxel, ?axis, label, ?mode, new_step, changed, "brush applied");
        StrokeOutcome::Applied
    }

    // ---- history ----

    pub fn undo(&mut self) -> bool {
        let Some(pair) = self.pair.as_mut() else {
            return false;
        };
        let undone = self.history.undo(pair.labels_mut());
        if undone {
            self.analyzer.mark_dirty();
        }
        debug!(undone, "undo");
        undone
    }

    pub fn redo(&mut self) -> bool {
        let Some(pair) = self.pair.as_mut() else {
            return false;
        };
        let redone = self.history.redo(pair.labels_mut());
        if redone {
            self.analyzer.mark_dirty();
        }
        debug!(redone, "redo");
        redone
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ---- targets ----

    pub fn recompute_targets(&mut self) -> Result<&[Target]> {
        let pair = self.pair.as_ref().ok_or(EngineError::NoRawVolume)?;
        self.analyzer.recompute(&self.labeler, pair.labels())
    }

    pub fn targets(&self) -> &[Target] {
        self.analyzer.targets()
    }

    pub fn stats_dirty(&self) -> bool {
        self.analyzer.is_dirty()
    }

    /// Remove target `id` as one undoable edit, then refresh the statistics.
    pub fn delete_target(&mut self, id: u16) -> Result<()> {
        let pair = self.pair.as_mut().ok_or(EngineError::NoRawVolume)?;
        if let Err(err) = self.analyzer.check_deletable(id) {
            warn!(id, %err, "target deletion rejected");
            return Err(err);
        }

        self.history.record(pair.labels().clone());
        let cleared = self.analyzer.erase_target(pair.labels_mut(), id);
        self.analyzer.recompute(&self.labeler, pair.labels())?;
        info!(id, cleared, remaining = self.analyzer.targets().len(), "deleted target");
        Ok(())
    }

    // ---- rasters ----

    /// Windowed grayscale slice shown by `plane`, `None` without a volume.
    pub fn intensity_raster(&self, plane: ViewPlane) -> Option<GrayImage> {
        let pair = self.pair.as_ref()?;
        let index = plane::slice_index(plane, &self.focus.point(), pair.dim());
        let slice = pair.raw().get_slice_from_axis(index, plane)?;
        Colorizer::intensity_to_image(&slice, &self.window)
    }

    /// Colour-coded label slice; labelled pixels get `alpha`, opaque if `None`.
    pub fn label_raster(&self, plane: ViewPlane, alpha: Option<u8>) -> Option<RgbaImage> {
        let pair = self.pair.as_ref()?;
        let index = plane::slice_index(plane, &self.focus.point(), pair.dim());
        let slice = pair.labels().get_slice_from_axis(index, plane)?;
        Colorizer::labels_to_image(&slice, &self.config.palette, self.config.label_count, alpha)
    }

    /// [`Self::label_raster`] with the configured overlay alpha.
    pub fn overlay_raster(&self, plane: ViewPlane) -> Option<RgbaImage> {
        self.label_raster(plane, self.config.overlay_alpha)
    }
}

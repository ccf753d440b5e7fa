use crate::{
    enums::SortBy,
    volume::{Geometry, LabelVolume, Volume},
};

use dicom::{
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use image::{GrayImage, Luma};
use ndarray::{Array2, Array3, s};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, info};

/// Sidecar written next to saved label slices.
pub const GEOMETRY_FILE: &str = "geometry.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} does not exist")]
    NotFound(PathBuf),

    #[error("No valid images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions")]
    InconsistentDimensions,

    #[error("Missing spacing information")]
    MissingSpacing,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("geometry error: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk volume format.
pub trait VolumeStore {
    /// Fails with [`StoreError::NotFound`] when `path` does not exist.
    fn load_volume(&self, path: &Path) -> Result<Volume, StoreError>;

    fn save_label_volume(
        &self,
        path: &Path,
        labels: &LabelVolume,
        geometry: &Geometry,
    ) -> Result<(), StoreError>;
}

/// Reads DICOM series (a directory of `.dcm` files or a single file) and label
/// stacks; writes label stacks.
///
/// A label stack is a directory of 8-bit grayscale `slice_NNNN.png` images,
/// one per z index with image x/y equal to volume x/y, plus `geometry.json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DicomStore {
    pub sort_by: SortBy,
}

impl VolumeStore for DicomStore {
    fn load_volume(&self, path: &Path) -> Result<Volume, StoreError> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        if path.is_dir() && path.join(GEOMETRY_FILE).is_file() {
            return Self::load_label_stack(path);
        }
        if path.is_dir() {
            return Self::load_from_directory(path, self.sort_by);
        }
        Self::load_from_file_paths(&[path], self.sort_by)
    }

    fn save_label_volume(
        &self,
        path: &Path,
        labels: &LabelVolume,
        geometry: &Geometry,
    ) -> Result<(), StoreError> {
        fs::create_dir_all(path)?;
        let (width, height, depth) = labels.dim();
        for z in 0..depth {
            let slice = labels.data().slice(s![.., .., z]);
            let image = GrayImage::from_fn(width as u32, height as u32, |x, y| {
                Luma([slice[[x as usize, y as usize]]])
            });
            image.save(slice_path(path, z))?;
        }
        fs::write(
            path.join(GEOMETRY_FILE),
            serde_json::to_string_pretty(geometry)?,
        )?;
        info!(path = %path.display(), slices = depth, "saved label stack");
        Ok(())
    }
}

fn slice_path(dir: &Path, z: usize) -> PathBuf {
    dir.join(format!("slice_{z:04}.png"))
}

impl DicomStore {
    pub fn new(sort_by: SortBy) -> Self {
        Self { sort_by }
    }

    /// Load a volume from DICOM objects
    ///
    /// # Arguments
    ///
    /// * `dicom_objects` - Slice of DICOM file objects
    /// * `sort_by` - Method to sort the slices
    ///
    /// # Errors
    ///
    /// Returns error if no valid images found or dimensions are inconsistent
    pub fn load_from_dicom_objects(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: SortBy,
    ) -> Result<Volume, StoreError> {
        let mut images_with_order: Vec<_> = dicom_objects
            .iter()
            .filter_map(|dicom_object| Self::extract_image_with_order(dicom_object, &sort_by))
            .collect();

        if images_with_order.is_empty() {
            return Err(StoreError::NoValidImages);
        }

        Self::sort_images(&mut images_with_order, sort_by);

        let images: Vec<_> = images_with_order
            .into_iter()
            .map(|(_, image)| image)
            .collect();

        Self::validate_dimensions(&images)?;

        let volume_array = Self::build_volume_array(&images);
        let spacing = Self::get_spacing(dicom_objects).ok_or(StoreError::MissingSpacing)?;
        let origin = Self::get_origin(dicom_objects).unwrap_or_default();
        debug!(dim = ?volume_array.dim(), "assembled DICOM series");

        Ok(Volume::new(volume_array, Geometry { spacing, origin }))
    }

    /// Load a volume from file paths
    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path>],
        sort_by: SortBy,
    ) -> Result<Volume, StoreError> {
        let objects: Result<Vec<_>, _> =
            paths.iter().map(|path| open_file(path.as_ref())).collect();

        Self::load_from_dicom_objects(&objects?, sort_by)
    }

    /// Load a volume from a directory containing .dcm files
    pub fn load_from_directory(
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<Volume, StoreError> {
        let paths = Self::files_with_extension(path.as_ref(), "dcm")?;
        if paths.is_empty() {
            return Err(StoreError::NoValidImages);
        }

        Self::load_from_file_paths(&paths, sort_by)
    }

    /// Load a label stack written by [`VolumeStore::save_label_volume`].
    pub fn load_label_stack(path: impl AsRef<Path>) -> Result<Volume, StoreError> {
        let path = path.as_ref();
        let geometry: Geometry =
            serde_json::from_str(&fs::read_to_string(path.join(GEOMETRY_FILE))?)?;
        let mut paths = Self::files_with_extension(path, "png")?;
        if paths.is_empty() {
            return Err(StoreError::NoValidImages);
        }
        paths.sort();

        let slices = paths
            .iter()
            .map(|slice| -> Result<GrayImage, StoreError> { Ok(image::open(slice)?.to_luma8()) })
            .collect::<Result<Vec<_>, _>>()?;
        let (width, height) = slices[0].dimensions();
        if slices.iter().any(|slice| slice.dimensions() != (width, height)) {
            return Err(StoreError::InconsistentDimensions);
        }

        let data = Array3::from_shape_fn(
            (width as usize, height as usize, slices.len()),
            |(x, y, z)| i16::from(slices[z].get_pixel(x as u32, y as u32).0[0]),
        );
        Ok(Volume::new(data, geometry))
    }

    fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, StoreError> {
        Ok(fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
            })
            .collect())
    }

    fn extract_image_with_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<(Option<f32>, Array2<i16>)> {
        let order = Self::get_sort_order(dicom_object, sort_by)?;
        let image_2d = Self::decode_image(dicom_object)?;
        Some((order, image_2d))
    }

    fn get_sort_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<Option<f32>> {
        match sort_by {
            SortBy::ImagePositionPatient => {
                let pos = dicom_object
                    .element(tags::IMAGE_POSITION_PATIENT)
                    .ok()?
                    .to_multi_float32()
                    .ok()?;
                Some(pos.get(2).copied())
            }
            SortBy::TablePosition => {
                let pos = dicom_object
                    .element(tags::TABLE_POSITION)
                    .ok()?
                    .to_float32()
                    .ok();
                Some(pos)
            }
            SortBy::InstanceNumber => {
                let num = dicom_object
                    .element(tags::INSTANCE_NUMBER)
                    .ok()?
                    .to_int::<i32>()
                    .ok()
                    .map(|n| n as f32);
                Some(num)
            }
            SortBy::None => Some(Some(0.0)),
        }
    }

    /// Decode the first frame as modality values (rows = y, columns = x).
    fn decode_image(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<Array2<i16>> {
        let pixel_data = dicom_object.decode_pixel_data().ok()?;
        let options = ConvertOptions::new().with_voi_lut(VoiLutOption::Identity);
        pixel_data
            .to_ndarray_with_options::<i16>(&options)
            .ok()
            .map(|arr| arr.slice_move(s![0, .., .., 0]))
    }

    fn sort_images(images_with_order: &mut [(Option<f32>, Array2<i16>)], sort_by: SortBy) {
        if !matches!(sort_by, SortBy::None) {
            images_with_order
                .sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        }

        if matches!(sort_by, SortBy::ImagePositionPatient) {
            images_with_order.reverse();
        }
    }

    fn validate_dimensions(images: &[Array2<i16>]) -> Result<(), StoreError> {
        let first_dim = images[0].dim();
        if images.iter().any(|img| img.dim() != first_dim) {
            return Err(StoreError::InconsistentDimensions);
        }
        Ok(())
    }

    /// Stack `[y, x]` images along z into an `[x, y, z]` array.
    fn build_volume_array(images: &[Array2<i16>]) -> Array3<i16> {
        let (height, width) = images[0].dim();
        let depth = images.len();
        let mut volume = Array3::<i16>::zeros((width, height, depth));

        for (z, image) in images.iter().enumerate() {
            volume.slice_mut(s![.., .., z]).assign(&image.t());
        }

        volume
    }

    /// Spacing along `(x, y, z)`. PixelSpacing stores row spacing (y) first.
    fn get_spacing(dicom_objects: &[FileDicomObject<InMemDicomObject>]) -> Option<(f32, f32, f32)> {
        dicom_objects.iter().find_map(|dicom_object| {
            let pixel_spacing = dicom_object
                .element(tags::PIXEL_SPACING)
                .ok()?
                .to_multi_float32()
                .ok()?;

            let slice_thickness = dicom_object
                .element(tags::SLICE_THICKNESS)
                .ok()?
                .to_float32()
                .ok()?;

            Some((*pixel_spacing.get(1)?, *pixel_spacing.first()?, slice_thickness))
        })
    }

    fn get_origin(dicom_objects: &[FileDicomObject<InMemDicomObject>]) -> Option<(f32, f32, f32)> {
        dicom_objects.iter().find_map(|dicom_object| {
            let position = dicom_object
                .element(tags::IMAGE_POSITION_PATIENT)
                .ok()?
                .to_multi_float32()
                .ok()?;
            Some((*position.first()?, *position.get(1)?, *position.get(2)?))
        })
    }
}

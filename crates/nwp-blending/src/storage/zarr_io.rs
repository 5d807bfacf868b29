//! Zarr V3 array I/O for artifacts.
//!
//! Every artifact is a single `float32` array at the root of a filesystem
//! store, with its metadata in the array attributes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::Array3;
use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use tracing::{error, warn};
use zarrs_filesystem::FilesystemStore;

use crate::config::{StoreConfig, ZarrCompression};
use crate::error::{BlendingError, Result};

/// An opened artifact array.
pub type ArtifactArray = Array<FilesystemStore>;

/// Write `data` (row-major, matching `shape`) as a new array in `dir`.
///
/// Returns the number of payload bytes written.
pub fn write_array(
    dir: &Path,
    shape: &[u64],
    chunk_shape: &[u64],
    data: &[f32],
    attributes: serde_json::Map<String, serde_json::Value>,
    config: &StoreConfig,
) -> Result<u64> {
    let expected: u64 = shape.iter().product();
    if expected != data.len() as u64 {
        return Err(BlendingError::shape_mismatch(format!(
            "array shape {:?} holds {} values but {} were supplied",
            shape,
            expected,
            data.len()
        )));
    }

    fs::create_dir_all(dir)?;
    let store = Arc::new(FilesystemStore::new(dir).map_err(|e| BlendingError::io(e.to_string()))?);

    let chunk_grid: zarrs::array::ChunkGrid = chunk_shape
        .to_vec()
        .try_into()
        .map_err(|e| BlendingError::Config(format!("{:?}", e)))?;

    let mut binding = ArrayBuilder::new(
        shape.to_vec(),
        DataType::Float32,
        chunk_grid,
        FillValue::from(f32::NAN),
    );
    let mut builder = binding.attributes(attributes);

    if config.compression != ZarrCompression::None {
        let codec = create_compression_codec(config)?;
        builder = builder.bytes_to_bytes_codecs(vec![codec]);
    }

    let array = builder
        .build(store, "/")
        .map_err(|e| BlendingError::io(e.to_string()))?;

    array
        .store_metadata()
        .map_err(|e| BlendingError::io(e.to_string()))?;

    let subset = ArraySubset::new_with_start_shape(vec![0; shape.len()], shape.to_vec())
        .map_err(|e| BlendingError::io(e.to_string()))?;

    array
        .store_array_subset_elements(&subset, data)
        .map_err(|e| BlendingError::io(e.to_string()))?;

    Ok((data.len() * std::mem::size_of::<f32>()) as u64)
}

/// Open the artifact array stored in `dir`.
pub fn open_array(dir: &Path) -> Result<ArtifactArray> {
    if !dir.is_dir() {
        return Err(BlendingError::io(format!(
            "artifact not found: {}",
            dir.display()
        )));
    }
    let store = FilesystemStore::new(dir).map_err(|e| BlendingError::io(e.to_string()))?;
    Array::open(Arc::new(store), "/").map_err(|e| BlendingError::io(e.to_string()))
}

/// Read the values of a hyper-rectangle, row-major.
pub fn read_subset(array: &ArtifactArray, start: Vec<u64>, shape: Vec<u64>) -> Result<Vec<f32>> {
    let subset = ArraySubset::new_with_start_shape(start, shape)
        .map_err(|e| BlendingError::io(e.to_string()))?;
    array
        .retrieve_array_subset_elements::<f32>(&subset)
        .map_err(|e| BlendingError::io(e.to_string()))
}

/// Create the compression codec based on configuration.
fn create_compression_codec(
    config: &StoreConfig,
) -> Result<Arc<dyn zarrs::array::codec::BytesToBytesCodecTraits>> {
    let level = BloscCompressionLevel::try_from(config.compression_level)
        .map_err(|_| BlendingError::Config("invalid compression level".to_string()))?;

    let shuffle = if config.shuffle {
        BloscShuffleMode::Shuffle
    } else {
        BloscShuffleMode::NoShuffle
    };

    // typesize is required when shuffle is enabled
    let typesize = if config.shuffle { Some(4) } else { None };

    let compressor = match config.compression {
        ZarrCompression::None => {
            return Err(BlendingError::Config(
                "no compression configured".to_string(),
            ))
        }
        ZarrCompression::Lz4 | ZarrCompression::BloscLz4 => BloscCompressor::LZ4,
        ZarrCompression::Zstd | ZarrCompression::BloscZstd => BloscCompressor::Zstd,
    };

    let codec = BloscCodec::new(compressor, level, None, shuffle, typesize)
        .map_err(|e| BlendingError::Config(e.to_string()))?;

    Ok(Arc::new(codec))
}

/// Stage an artifact in a hidden sibling directory and move it to
/// `output_dir/name` only after `write` succeeds.
///
/// An existing artifact with the same name is replaced. On failure the
/// staging directory is removed and any previous artifact is left in place.
pub fn write_atomically<F>(output_dir: &Path, name: &str, write: F) -> Result<PathBuf>
where
    F: FnOnce(&Path) -> Result<()>,
{
    fs::create_dir_all(output_dir)?;
    let target = output_dir.join(name);

    let staging = tempfile::Builder::new()
        .prefix(&format!(".{}.", name))
        .suffix(".partial")
        .tempdir_in(output_dir)?;
    write(staging.path())?;

    if target.exists() {
        let retired = tempfile::Builder::new()
            .prefix(&format!(".{}.", name))
            .suffix(".old")
            .tempdir_in(output_dir)?;
        replace_artifact(staging.path(), &target, retired)?;
    } else {
        fs::rename(staging.path(), &target)?;
    }

    Ok(target)
}

/// Move `target` into `retired`, then `staged` into `target`.
///
/// When the second rename fails the previous artifact is moved back. If even
/// that fails, the retired directory is kept on disk instead of being cleaned
/// up.
fn replace_artifact(staged: &Path, target: &Path, retired: tempfile::TempDir) -> Result<()> {
    let retired_path = retired.path().join("artifact");
    fs::rename(target, &retired_path)?;

    if let Err(e) = fs::rename(staged, target) {
        if let Err(restore) = fs::rename(&retired_path, target) {
            let kept = retired.into_path();
            error!(
                path = %target.display(),
                kept = %kept.join("artifact").display(),
                error = %restore,
                "Failed to restore previous artifact"
            );
        } else {
            warn!(
                path = %target.display(),
                error = %e,
                "Replacement failed, previous artifact restored"
            );
        }
        return Err(e.into());
    }
    Ok(())
}

/// Write a (T, H, W) field stack, one field per chunk.
pub fn write_field_stack(
    dir: &Path,
    fields: &Array3<f32>,
    attributes: serde_json::Map<String, serde_json::Value>,
    config: &StoreConfig,
) -> Result<u64> {
    let (t, h, w) = fields.dim();
    let data: Vec<f32> = fields.iter().copied().collect();
    write_array(
        dir,
        &[t as u64, h as u64, w as u64],
        &[1, h.max(1) as u64, w.max(1) as u64],
        &data,
        attributes,
        config,
    )
}

/// Read a (T, H, W) field stack and its attributes.
pub fn read_field_stack(
    dir: &Path,
) -> Result<(Array3<f32>, serde_json::Map<String, serde_json::Value>)> {
    let array = open_array(dir)?;
    let shape = array.shape().to_vec();
    if shape.len() != 3 {
        return Err(BlendingError::shape_mismatch(format!(
            "expected a (T, H, W) field stack, found shape {:?}",
            shape
        )));
    }
    let data = read_subset(&array, vec![0, 0, 0], shape.clone())?;
    let fields = Array3::from_shape_vec(
        (shape[0] as usize, shape[1] as usize, shape[2] as usize),
        data,
    )?;
    Ok((fields, array.attributes().clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn uncompressed() -> StoreConfig {
        StoreConfig {
            compression: ZarrCompression::None,
            ..Default::default()
        }
    }

    #[test]
    fn test_field_stack_roundtrip() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("fields.zarr");
        let fields = Array::from_shape_fn((3, 5, 7), |(t, r, c)| (t * 100 + r * 10 + c) as f32);

        let mut attrs = serde_json::Map::new();
        attrs.insert("model".to_string(), serde_json::json!("test"));
        write_field_stack(&path, &fields, attrs, &StoreConfig::default()).unwrap();

        let (restored, attrs) = read_field_stack(&path).unwrap();
        assert_eq!(restored, fields);
        assert_eq!(attrs.get("model").and_then(|v| v.as_str()), Some("test"));
    }

    #[test]
    fn test_partial_read() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("partial.zarr");
        let fields = Array::from_shape_fn((4, 2, 2), |(t, _, _)| t as f32);
        write_field_stack(&path, &fields, serde_json::Map::new(), &uncompressed()).unwrap();

        let array = open_array(&path).unwrap();
        let values = read_subset(&array, vec![2, 0, 0], vec![2, 2, 2]).unwrap();
        assert_eq!(values, vec![2.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_write_rejects_wrong_length() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let result = write_array(
            &temp_dir.path().join("bad.zarr"),
            &[2, 2],
            &[2, 2],
            &[1.0, 2.0, 3.0],
            serde_json::Map::new(),
            &uncompressed(),
        );
        assert!(matches!(result, Err(BlendingError::ShapeMismatch(_))));
    }

    #[test]
    fn test_open_missing_artifact() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let result = open_array(&temp_dir.path().join("missing.zarr"));
        assert!(matches!(result, Err(BlendingError::Io(_))));
    }

    #[test]
    fn test_failed_write_leaves_no_artifact() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let result = write_atomically(temp_dir.path(), "run.zarr", |_| {
            Err(BlendingError::decomposition("boom"))
        });
        assert!(result.is_err());
        assert!(!temp_dir.path().join("run.zarr").exists());
        let leftovers = std::fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_atomic_write_replaces_existing() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        for value in [1.0_f32, 2.0] {
            let fields = Array3::from_elem((1, 2, 2), value);
            write_atomically(temp_dir.path(), "run.zarr", |staging| {
                write_field_stack(staging, &fields, serde_json::Map::new(), &uncompressed())
                    .map(|_| ())
            })
            .unwrap();
        }

        let (restored, _) = read_field_stack(&temp_dir.path().join("run.zarr")).unwrap();
        assert!(restored.iter().all(|v| *v == 2.0));
        let entries = std::fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_failed_replacement_restores_previous() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let target = temp_dir.path().join("run.zarr");
        let fields = Array3::from_elem((1, 2, 2), 3.0_f32);
        write_field_stack(&target, &fields, serde_json::Map::new(), &uncompressed()).unwrap();

        let retired = tempfile::Builder::new()
            .prefix(".run.zarr.")
            .suffix(".old")
            .tempdir_in(temp_dir.path())
            .unwrap();
        let missing = temp_dir.path().join("never-staged");
        let result = replace_artifact(&missing, &target, retired);
        assert!(matches!(result, Err(BlendingError::Io(_))));

        let (restored, _) = read_field_stack(&target).unwrap();
        assert_eq!(restored, fields);
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }
}

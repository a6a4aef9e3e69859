//! Reader for the IDX binary format used by MNIST-style datasets.
//!
//! A file starts with a big-endian `u32` magic number followed by one
//! big-endian `u32` per dimension, then the raw unsigned bytes.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use trebuchet_core::tensor::utils::alloc_filled;
use trebuchet_core::{Tensor, TrebuchetError};

/// Magic number of an image file (unsigned bytes, 3 dimensions).
pub const IDX_IMAGES_MAGIC: u32 = 2051;
/// Magic number of a label file (unsigned bytes, 1 dimension).
pub const IDX_LABELS_MAGIC: u32 = 2049;

const STREAM: &str = "<stream>";

/// Decodes an image file into a `[count, rows * cols]` tensor with pixels
/// scaled from `0..=255` to `[0, 1]`.
pub fn read_idx_images<R: Read>(reader: &mut R) -> Result<Tensor, TrebuchetError> {
    read_images(reader, STREAM)
}

/// Decodes a label file into a one-hot `[count, classes]` tensor.
///
/// # Errors
/// `DatasetFormat` if a label is not below `classes`.
pub fn read_idx_labels<R: Read>(reader: &mut R, classes: usize) -> Result<Tensor, TrebuchetError> {
    read_labels(reader, classes, STREAM)
}

/// Opens `path` and decodes it with [`read_idx_images`].
pub fn load_idx_images(path: impl AsRef<Path>) -> Result<Tensor, TrebuchetError> {
    let path = path.as_ref();
    let mut reader = open(path)?;
    let images = read_images(&mut reader, &path.display().to_string())?;
    log::info!("idx: loaded images {:?} from {}", images.shape(), path.display());
    Ok(images)
}

/// Opens `path` and decodes it with [`read_idx_labels`].
pub fn load_idx_labels(path: impl AsRef<Path>, classes: usize) -> Result<Tensor, TrebuchetError> {
    let path = path.as_ref();
    let mut reader = open(path)?;
    let labels = read_labels(&mut reader, classes, &path.display().to_string())?;
    log::info!("idx: loaded labels {:?} from {}", labels.shape(), path.display());
    Ok(labels)
}

fn open(path: &Path) -> Result<BufReader<File>, TrebuchetError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| io_error(&path.display().to_string(), e))
}

fn io_error(path: &str, err: std::io::Error) -> TrebuchetError {
    TrebuchetError::Io {
        path: path.to_string(),
        message: err.to_string(),
    }
}

fn read_u32<R: Read>(reader: &mut R, source: &str) -> Result<u32, TrebuchetError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).map_err(|e| io_error(source, e))?;
    Ok(u32::from_be_bytes(buf))
}

fn check_magic(found: u32, expected: u32) -> Result<(), TrebuchetError> {
    if found != expected {
        return Err(TrebuchetError::DatasetFormat(format!(
            "bad magic number {}, expected {}",
            found, expected
        )));
    }
    Ok(())
}

/// `dims` multiplied together; an overflow means a corrupt header.
fn checked_len(dims: &[usize], source: &str) -> Result<usize, TrebuchetError> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| TrebuchetError::DatasetFormat(format!("{}: header sizes {:?} overflow", source, dims)))
}

/// Reads exactly `len` bytes. The buffer grows with the data actually read,
/// so a header announcing more than the stream holds fails without
/// reserving the announced size.
fn read_payload<R: Read>(reader: &mut R, len: usize, source: &str) -> Result<Vec<u8>, TrebuchetError> {
    let mut bytes = Vec::new();
    let limit = u64::try_from(len).unwrap_or(u64::MAX);
    reader
        .by_ref()
        .take(limit)
        .read_to_end(&mut bytes)
        .map_err(|e| io_error(source, e))?;
    if bytes.len() != len {
        return Err(TrebuchetError::DatasetFormat(format!(
            "{}: payload has {} bytes, header announces {}",
            source,
            bytes.len(),
            len
        )));
    }
    Ok(bytes)
}

fn read_images<R: Read>(reader: &mut R, source: &str) -> Result<Tensor, TrebuchetError> {
    check_magic(read_u32(reader, source)?, IDX_IMAGES_MAGIC)?;
    let count = read_u32(reader, source)? as usize;
    let rows = read_u32(reader, source)? as usize;
    let cols = read_u32(reader, source)? as usize;
    let features = checked_len(&[rows, cols], source)?;
    let total = checked_len(&[count, features], source)?;
    log::debug!("idx: {} images of {}x{} in {}", count, rows, cols, source);

    let bytes = read_payload(reader, total, source)?;
    let mut data = alloc_filled(total, 0.0)?;
    for (value, &byte) in data.iter_mut().zip(&bytes) {
        *value = f32::from(byte) / 255.0;
    }
    Tensor::new(data, vec![count, features])
}

fn read_labels<R: Read>(reader: &mut R, classes: usize, source: &str) -> Result<Tensor, TrebuchetError> {
    if classes == 0 {
        return Err(TrebuchetError::InvalidConfiguration(
            "label decoding needs at least one class".to_string(),
        ));
    }
    check_magic(read_u32(reader, source)?, IDX_LABELS_MAGIC)?;
    let count = read_u32(reader, source)? as usize;
    log::debug!("idx: {} labels in {}", count, source);

    let total = checked_len(&[count, classes], source)?;
    let bytes = read_payload(reader, count, source)?;
    let mut data = alloc_filled(total, 0.0)?;
    for (row, &label) in bytes.iter().enumerate() {
        let label = usize::from(label);
        if label >= classes {
            return Err(TrebuchetError::DatasetFormat(format!(
                "label {} at index {} is out of range for {} classes",
                label, row, classes
            )));
        }
        data[row * classes + label] = 1.0;
    }
    Tensor::new(data, vec![count, classes])
}

#[cfg(test)]
#[path = "idx_test.rs"]
mod tests;

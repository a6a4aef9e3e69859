use super::*;
use approx::assert_relative_eq;

fn header(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

#[test]
fn test_read_images() -> Result<(), TrebuchetError> {
    let mut bytes = header(&[IDX_IMAGES_MAGIC, 2, 2, 2]);
    bytes.extend_from_slice(&[0, 255, 51, 102, 255, 0, 0, 0]);
    let images = read_idx_images(&mut bytes.as_slice())?;
    assert_eq!(images.shape(), &[2, 4]);
    let expected = [0.0, 1.0, 0.2, 0.4, 1.0, 0.0, 0.0, 0.0];
    for (a, e) in images.data().iter().zip(expected) {
        assert_relative_eq!(*a, e, epsilon = 1e-6);
    }
    assert!(!images.requires_grad());
    Ok(())
}

#[test]
fn test_read_labels_one_hot() -> Result<(), TrebuchetError> {
    let mut bytes = header(&[IDX_LABELS_MAGIC, 3]);
    bytes.extend_from_slice(&[2, 0, 1]);
    let labels = read_idx_labels(&mut bytes.as_slice(), 3)?;
    assert_eq!(labels.shape(), &[3, 3]);
    assert_eq!(labels.data(), &[0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    Ok(())
}

#[test]
fn test_bad_magic_is_rejected() {
    let mut bytes = header(&[IDX_LABELS_MAGIC, 1, 1, 1]);
    bytes.push(0);
    assert!(matches!(
        read_idx_images(&mut bytes.as_slice()),
        Err(TrebuchetError::DatasetFormat(_))
    ));

    let mut bytes = header(&[IDX_IMAGES_MAGIC, 1]);
    bytes.push(0);
    assert!(matches!(
        read_idx_labels(&mut bytes.as_slice(), 10),
        Err(TrebuchetError::DatasetFormat(_))
    ));
}

#[test]
fn test_label_out_of_range() {
    let mut bytes = header(&[IDX_LABELS_MAGIC, 2]);
    bytes.extend_from_slice(&[1, 10]);
    assert!(matches!(
        read_idx_labels(&mut bytes.as_slice(), 10),
        Err(TrebuchetError::DatasetFormat(_))
    ));
}

#[test]
fn test_truncated_input() {
    let mut bytes = header(&[IDX_IMAGES_MAGIC, 2, 2, 2]);
    bytes.extend_from_slice(&[1, 2, 3]);
    assert!(matches!(
        read_idx_images(&mut bytes.as_slice()),
        Err(TrebuchetError::DatasetFormat(_))
    ));

    let short_header = header(&[IDX_IMAGES_MAGIC])[..3].to_vec();
    assert!(matches!(
        read_idx_images(&mut short_header.as_slice()),
        Err(TrebuchetError::Io { .. })
    ));
}

#[test]
fn test_missing_file() {
    let err = load_idx_images("/definitely/not/here-images.idx3-ubyte").unwrap_err();
    match err {
        TrebuchetError::Io { path, .. } => assert!(path.ends_with("here-images.idx3-ubyte")),
        other => panic!("expected Io error, got {:?}", other),
    }
}

#[test]
fn test_oversized_header_is_rejected() {
    let bytes = header(&[IDX_IMAGES_MAGIC, u32::MAX, u32::MAX, u32::MAX]);
    assert!(matches!(
        read_idx_images(&mut bytes.as_slice()),
        Err(TrebuchetError::DatasetFormat(_))
    ));
}

#[test]
fn test_announced_count_beyond_payload() {
    let mut bytes = header(&[IDX_LABELS_MAGIC, u32::MAX]);
    bytes.extend_from_slice(&[1, 2]);
    let err = read_idx_labels(&mut bytes.as_slice(), 10).unwrap_err();
    assert!(matches!(err, TrebuchetError::DatasetFormat(_)), "got {:?}", err);

    let mut bytes = header(&[IDX_IMAGES_MAGIC, u32::MAX, 28, 28]);
    bytes.extend_from_slice(&[0; 16]);
    assert!(matches!(
        read_idx_images(&mut bytes.as_slice()),
        Err(TrebuchetError::DatasetFormat(_))
    ));
}

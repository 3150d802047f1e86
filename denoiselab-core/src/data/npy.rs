//! Minimal NPY (v1.0) codec for square f64 matrices.
//!
//! Connectivity and distance matrices arrive from the imaging side in the
//! NumPy array exchange format: magic, version, an ASCII header dict, then
//! raw little-endian values. Only what the pipeline produces is supported:
//! two-dimensional C-order `<f8` arrays. Version 2.0 headers are accepted
//! on read; writes always emit 1.0.

use std::path::Path;

use thiserror::Error;

use crate::domain::matrix::{MatrixError, SquareMatrix};

const MAGIC: &[u8; 6] = b"\x93NUMPY";

#[derive(Debug, Error)]
pub enum NpyError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("not an NPY file (bad magic)")]
    BadMagic,

    #[error("unsupported NPY version {0}.{1}")]
    UnsupportedVersion(u8, u8),

    #[error("malformed NPY header: {0}")]
    BadHeader(String),

    #[error("unsupported dtype '{0}', expected '<f8'")]
    UnsupportedDtype(String),

    #[error("Fortran-order arrays are not supported")]
    FortranOrder,

    #[error("expected a 2-dimensional array, got shape {0}")]
    NotTwoDimensional(String),

    #[error("expected a square matrix, got {rows} x {cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("truncated data: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    #[error("invalid matrix: {0}")]
    Matrix(#[from] MatrixError),
}

/// Extract the value following `'key':` in the header dict.
fn header_field<'a>(header: &'a str, key: &str) -> Result<&'a str, NpyError> {
    let marker = format!("'{key}':");
    let start = header
        .find(&marker)
        .ok_or_else(|| NpyError::BadHeader(format!("missing '{key}'")))?
        + marker.len();
    Ok(header[start..].trim_start())
}

fn parse_descr(header: &str) -> Result<String, NpyError> {
    let rest = header_field(header, "descr")?;
    let rest = rest
        .strip_prefix('\'')
        .ok_or_else(|| NpyError::BadHeader("descr is not a string".to_string()))?;
    let end = rest
        .find('\'')
        .ok_or_else(|| NpyError::BadHeader("unterminated descr".to_string()))?;
    Ok(rest[..end].to_string())
}

fn parse_fortran_order(header: &str) -> Result<bool, NpyError> {
    let rest = header_field(header, "fortran_order")?;
    if rest.starts_with("False") {
        Ok(false)
    } else if rest.starts_with("True") {
        Ok(true)
    } else {
        Err(NpyError::BadHeader("fortran_order is not a bool".to_string()))
    }
}

fn parse_shape(header: &str) -> Result<Vec<usize>, NpyError> {
    let rest = header_field(header, "shape")?;
    let rest = rest
        .strip_prefix('(')
        .ok_or_else(|| NpyError::BadHeader("shape is not a tuple".to_string()))?;
    let end = rest
        .find(')')
        .ok_or_else(|| NpyError::BadHeader("unterminated shape".to_string()))?;
    rest[..end]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| NpyError::BadHeader(format!("bad shape entry '{s}'")))
        })
        .collect()
}

/// Read a square f64 matrix from an NPY file.
pub fn read_npy_matrix(path: &Path) -> Result<SquareMatrix, NpyError> {
    let bytes = std::fs::read(path)?;
    if bytes.len() < 10 || &bytes[..6] != MAGIC {
        return Err(NpyError::BadMagic);
    }

    let (major, minor) = (bytes[6], bytes[7]);
    let (header_len, header_start) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 => {
            if bytes.len() < 12 {
                return Err(NpyError::BadHeader("header length truncated".to_string()));
            }
            (
                u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize,
                12,
            )
        }
        _ => return Err(NpyError::UnsupportedVersion(major, minor)),
    };

    let header_end = header_start + header_len;
    if bytes.len() < header_end {
        return Err(NpyError::BadHeader("header truncated".to_string()));
    }
    let header = std::str::from_utf8(&bytes[header_start..header_end])
        .map_err(|_| NpyError::BadHeader("header is not ASCII".to_string()))?;

    let descr = parse_descr(header)?;
    if descr != "<f8" {
        return Err(NpyError::UnsupportedDtype(descr));
    }
    if parse_fortran_order(header)? {
        return Err(NpyError::FortranOrder);
    }
    let shape = parse_shape(header)?;
    if shape.len() != 2 {
        return Err(NpyError::NotTwoDimensional(format!("{shape:?}")));
    }
    let (rows, cols) = (shape[0], shape[1]);
    if rows != cols {
        return Err(NpyError::NotSquare { rows, cols });
    }

    let payload = &bytes[header_end..];
    let expected = rows * cols * 8;
    if payload.len() < expected {
        return Err(NpyError::Truncated {
            expected,
            got: payload.len(),
        });
    }

    let mut data = Vec::with_capacity(rows * cols);
    for chunk in payload[..expected].chunks_exact(8) {
        data.push(f64::from_le_bytes(chunk.try_into().expect("chunk of 8")));
    }

    Ok(SquareMatrix::from_vec(data)?)
}

/// Write a square f64 matrix as an NPY v1.0 file (C-order, `<f8`).
pub fn write_npy_matrix(path: &Path, matrix: &SquareMatrix) -> Result<(), NpyError> {
    let n = matrix.n();
    let mut header = format!("{{'descr': '<f8', 'fortran_order': False, 'shape': ({n}, {n}), }}");
    // Pad so magic + version + length + header is 64-byte aligned.
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    let pad = (64 - unpadded % 64) % 64;
    header.push_str(&" ".repeat(pad));
    header.push('\n');

    let mut out = Vec::with_capacity(unpadded + pad + matrix.data().len() * 8);
    out.extend_from_slice(MAGIC);
    out.push(1);
    out.push(0);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for value in matrix.data() {
        out.extend_from_slice(&value.to_le_bytes());
    }

    std::fs::write(path, out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SquareMatrix {
        SquareMatrix::from_rows(vec![
            vec![1.0, 0.25, -0.5],
            vec![0.25, 1.0, 0.75],
            vec![-0.5, 0.75, 1.0],
        ])
        .unwrap()
    }

    #[test]
    fn roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conn.npy");
        let original = sample();
        write_npy_matrix(&path, &original).unwrap();
        let loaded = read_npy_matrix(&path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn written_header_is_aligned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conn.npy");
        write_npy_matrix(&path, &sample()).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..6], MAGIC);
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % 64, 0);
        assert_eq!(bytes[10 + header_len - 1], b'\n');
    }

    #[test]
    fn bad_magic_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not.npy");
        std::fs::write(&path, b"PK\x03\x04 definitely a zip").unwrap();
        assert!(matches!(read_npy_matrix(&path), Err(NpyError::BadMagic)));
    }

    #[test]
    fn wrong_dtype_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f4.npy");
        let mut header =
            "{'descr': '<f4', 'fortran_order': False, 'shape': (2, 2), }".to_string();
        let unpadded = 10 + header.len() + 1;
        let pad = (64 - unpadded % 64) % 64;
        header.push_str(&" ".repeat(pad));
        header.push('\n');
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(&[0u8; 16]);
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(
            read_npy_matrix(&path),
            Err(NpyError::UnsupportedDtype(d)) if d == "<f4"
        ));
    }

    #[test]
    fn non_square_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rect.npy");
        let mut header =
            "{'descr': '<f8', 'fortran_order': False, 'shape': (2, 3), }".to_string();
        let unpadded = 10 + header.len() + 1;
        let pad = (64 - unpadded % 64) % 64;
        header.push_str(&" ".repeat(pad));
        header.push('\n');
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(&vec![0u8; 6 * 8]);
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(
            read_npy_matrix(&path),
            Err(NpyError::NotSquare { rows: 2, cols: 3 })
        ));
    }

    #[test]
    fn truncated_data_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trunc.npy");
        write_npy_matrix(&path, &sample()).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 8]).unwrap();
        assert!(matches!(
            read_npy_matrix(&path),
            Err(NpyError::Truncated { .. })
        ));
    }
}

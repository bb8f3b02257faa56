//! Octave-readable dumps of matrices and vectors.
//!
//! One value per whitespace-separated token at 12 significant digits,
//! row-major, one matrix row per line, so `load file.dat` in Octave
//! reconstructs the value. Vectors occupy a single line. The loader infers
//! the shape from the line/token structure.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use crate::lib_dispatch::{real, Scalar};
use crate::tensor::{Matrix, Vector};

#[derive(Debug, Error)]
pub enum OctaveError {
    #[error("octave I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("octave parse error: {0}")]
    Parse(String),
}

/// Write a matrix, one row per line.
pub fn dump_matrix<P: Scalar>(matrix: &Matrix<P>, path: &Path) -> Result<(), OctaveError> {
    let mut out = BufWriter::new(File::create(path)?);
    for i in 0..matrix.nrows() {
        for j in 0..matrix.ncols() {
            write!(out, "{:.12e} ", matrix[(i, j)])?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// Write a vector on a single line.
pub fn dump_vector<P: Scalar>(vector: &Vector<P>, path: &Path) -> Result<(), OctaveError> {
    let mut out = BufWriter::new(File::create(path)?);
    for i in 0..vector.len() {
        write!(out, "{:.12e} ", vector[i])?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Read a matrix back, inferring the shape from the file layout.
pub fn load_matrix<P: Scalar>(path: &Path) -> Result<Matrix<P>, OctaveError> {
    let rows = read_rows(path)?;
    if rows.is_empty() {
        return Err(OctaveError::Parse("empty matrix file".to_string()));
    }
    let ncols = rows[0].len();
    if rows.iter().any(|r| r.len() != ncols) {
        return Err(OctaveError::Parse("ragged matrix file".to_string()));
    }
    let mut m = Matrix::zeros(rows.len(), ncols);
    for (i, row) in rows.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            m[(i, j)] = real::<P>(v);
        }
    }
    Ok(m)
}

/// Read a vector back.
pub fn load_vector<P: Scalar>(path: &Path) -> Result<Vector<P>, OctaveError> {
    let rows = read_rows(path)?;
    let values: Vec<P> = rows.iter().flatten().map(|&v| real::<P>(v)).collect();
    Ok(Vector::from(values))
}

fn read_rows(path: &Path) -> Result<Vec<Vec<f64>>, OctaveError> {
    let reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row: Result<Vec<f64>, _> = line
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f64>()
                    .map_err(|e| OctaveError::Parse(format!("token '{tok}': {e}")))
            })
            .collect();
        rows.push(row?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("sparse_dg_io_{}_{name}", std::process::id()));
        p
    }

    #[test]
    fn matrix_round_trip() {
        let m = Matrix::from_fn(3, 4, |i, j| (i as f64 + 1.0) * 0.3 + (j as f64) * 1.7e-5);
        let path = temp_path("mat.dat");
        dump_matrix(&m, &path).unwrap();
        let back = load_matrix::<f64>(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(back.nrows(), 3);
        assert_eq!(back.ncols(), 4);
        assert!(back.approx_eq(&m, 1e-10));
    }

    #[test]
    fn vector_round_trip() {
        let v = Vector::from(vec![1.25_f64, -3.5e-7, 9.875e4]);
        let path = temp_path("vec.dat");
        dump_vector(&v, &path).unwrap();
        let back = load_vector::<f64>(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(back.len(), 3);
        for i in 0..3 {
            assert!((back[i] - v[i]).abs() < 1e-10 * v[i].abs().max(1.0));
        }
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_matrix::<f64>(Path::new("/nonexistent/x.dat"));
        assert!(matches!(err, Err(OctaveError::Io(_))));
    }
}

//! Matrix File Format and Fixture Generator
//!
//! Shared on-disk format read and written by the worker's matrix plugin:
//!
//! ```text
//! rows=3
//! cols=3
//!
//! 1 2 3
//! 4 5 6
//! 7 8 9
//! ```
//!
//! The generator produces golden triples `matrix<n>_<n>{A,B,C}.txt` where A
//! and B hold digits in `[0, 10)` and C is their exact integer product.

use rand::Rng;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::error::HarnessError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatrixError {
    #[error("missing or invalid `{0}=` header")]
    Header(&'static str),

    #[error("invalid element `{0}`")]
    Element(String),

    #[error("expected {expected} elements, found {found}")]
    ElementCount { expected: usize, found: usize },

    #[error("dimension mismatch: {left_rows}x{left_cols} * {right_rows}x{right_cols}")]
    Dimensions {
        left_rows: usize,
        left_cols: usize,
        right_rows: usize,
        right_cols: usize,
    },
}

/// Dense row-major integer matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    elements: Vec<i64>,
}

impl Matrix {
    pub fn from_elements(rows: usize, cols: usize, elements: Vec<i64>) -> Result<Self, MatrixError> {
        if rows.checked_mul(cols) != Some(elements.len()) {
            return Err(MatrixError::ElementCount {
                expected: rows.saturating_mul(cols),
                found: elements.len(),
            });
        }
        Ok(Self {
            rows,
            cols,
            elements,
        })
    }

    /// Elements drawn independently from `[0, 10)`.
    pub fn random_digits<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Self {
        let elements = (0..rows * cols).map(|_| rng.gen_range(0..10)).collect();
        Self {
            rows,
            cols,
            elements,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> i64 {
        self.elements[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[i64] {
        &self.elements[row * self.cols..(row + 1) * self.cols]
    }

    /// Exact integer product `self * rhs`.
    pub fn multiply(&self, rhs: &Matrix) -> Result<Matrix, MatrixError> {
        if self.cols != rhs.rows {
            return Err(MatrixError::Dimensions {
                left_rows: self.rows,
                left_cols: self.cols,
                right_rows: rhs.rows,
                right_cols: rhs.cols,
            });
        }

        let mut out = vec![0i64; self.rows * rhs.cols];
        // i-k-j order keeps both inner accesses sequential
        for i in 0..self.rows {
            let out_row = &mut out[i * rhs.cols..(i + 1) * rhs.cols];
            for k in 0..self.cols {
                let a = self.get(i, k);
                if a == 0 {
                    continue;
                }
                for (o, b) in out_row.iter_mut().zip(rhs.row(k)) {
                    *o += a * b;
                }
            }
        }

        Ok(Matrix {
            rows: self.rows,
            cols: rhs.cols,
            elements: out,
        })
    }

    /// Parse the matrix file format.
    ///
    /// Mirrors the worker's reader: the first two lines must be the `rows=`
    /// and `cols=` headers (either order); everything after is a stream of
    /// whitespace-separated values, so line breaks inside the body are free.
    pub fn parse(text: &str) -> Result<Self, MatrixError> {
        let mut lines = text.lines();
        let mut rows = None;
        let mut cols = None;
        for _ in 0..2 {
            let line = lines.next().unwrap_or("");
            if let Some(v) = line.strip_prefix("rows=") {
                rows = v.trim().parse::<usize>().ok();
            } else if let Some(v) = line.strip_prefix("cols=") {
                cols = v.trim().parse::<usize>().ok();
            }
        }
        let rows = rows.filter(|r| *r > 0).ok_or(MatrixError::Header("rows"))?;
        let cols = cols.filter(|c| *c > 0).ok_or(MatrixError::Header("cols"))?;
        rows.checked_mul(cols).ok_or(MatrixError::Header("rows"))?;

        // sized by the body, not the headers
        let elements = lines
            .flat_map(str::split_whitespace)
            .map(parse_element)
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_elements(rows, cols, elements)
    }

    /// Serialize in the shared file format.
    pub fn to_file_string(&self) -> String {
        let mut out = format!("rows={}\ncols={}\n\n", self.rows, self.cols);
        for r in 0..self.rows {
            let row: Vec<String> = self.row(r).iter().map(i64::to_string).collect();
            out.push_str(&row.join(" "));
            out.push('\n');
        }
        out
    }

    pub fn read_file(path: &Path) -> Result<Self, HarnessError> {
        let text = fs::read_to_string(path)?;
        Matrix::parse(&text).map_err(|e| HarnessError::Fixture {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// The worker writes floats; integral values like `42` or `42.0` are accepted.
fn parse_element(token: &str) -> Result<i64, MatrixError> {
    if let Ok(v) = token.parse::<i64>() {
        return Ok(v);
    }
    match token.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && f.is_finite() => Ok(f as i64),
        _ => Err(MatrixError::Element(token.to_string())),
    }
}

// ============================================================
// Fixture generation
// ============================================================

/// Paths of one golden triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixturePaths {
    pub name: String,
    pub a: PathBuf,
    pub b: PathBuf,
    pub c: PathBuf,
}

impl FixturePaths {
    /// `matrix<rows>_<cols>` naming shared with the matrix scenario.
    pub fn new(dir: &Path, rows: usize, cols: usize) -> Self {
        Self::from_name(dir, format!("matrix{}_{}", rows, cols))
    }

    pub fn from_name(dir: &Path, name: String) -> Self {
        Self {
            a: dir.join(format!("{}A.txt", name)),
            b: dir.join(format!("{}B.txt", name)),
            c: dir.join(format!("{}C.txt", name)),
            name,
        }
    }
}

/// Generate one `n x n` triple per size under `dir`.
///
/// Large sizes are slow (`O(n^3)`); this is meant to be run offline.
pub fn generate_fixtures<R: Rng + ?Sized>(
    dir: &Path,
    sizes: &[usize],
    rng: &mut R,
) -> Result<Vec<FixturePaths>, HarnessError> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(sizes.len());

    for &size in sizes {
        if size == 0 {
            return Err(HarnessError::Fixture {
                path: dir.to_path_buf(),
                reason: "matrix size must be positive".to_string(),
            });
        }
        info!(size, "generating matrices A and B");
        let a = Matrix::random_digits(size, size, rng);
        let b = Matrix::random_digits(size, size, rng);

        info!(size, "computing C = A * B");
        let c = a.multiply(&b).map_err(|e| HarnessError::Fixture {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        let paths = FixturePaths::new(dir, size, size);
        for (matrix, path) in [(&a, &paths.a), (&b, &paths.b), (&c, &paths.c)] {
            info!(path = %path.display(), "writing fixture");
            write_atomically(path, matrix.to_file_string().as_bytes())?;
        }
        written.push(paths);
    }

    Ok(written)
}

/// Write to `<path>.partial` then rename, so an interrupted run never leaves
/// a truncated file under the final name.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), HarnessError> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".partial");
    let partial = PathBuf::from(partial);

    let mut file = fs::File::create(&partial)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&partial, path)?;
    Ok(())
}

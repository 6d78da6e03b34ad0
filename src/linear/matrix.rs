//! Dense row-major matrices.

use std::ops::{Index, IndexMut};
use std::slice::ChunksExact;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}
impl<T: Default + Clone> Matrix<T> {
    pub fn allocate(rows: usize, cols: usize) -> Self {
        let (len, overflow) = rows.overflowing_mul(cols);
        assert!(!overflow, "allocation of a {rows}x{cols} matrix failed due to overflow");
        let data = vec![T::default(); len];
        Self { data, rows, cols }
    }
}

impl<T> Matrix<T> {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row_slice(&self, row: usize) -> &[T] {
        debug_assert!(self.validate_row_index(row));
        let row_start = row * self.cols;
        &self.data[row_start..(row_start + self.cols)]
    }

    pub fn row_slice_mut(&mut self, row: usize) -> &mut [T] {
        debug_assert!(self.validate_row_index(row));
        let row_start = row * self.cols;
        &mut self.data[row_start..(row_start + self.cols)]
    }

    pub fn flatten(&self) -> &[T] {
        &self.data
    }

    pub fn flatten_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    fn validate_row_index(&self, row: usize) -> bool {
        assert!(row < self.rows, "invalid row index {row} for a {}x{} matrix", self.rows, self.cols);
        true
    }

    fn validate_col_index(&self, col: usize) -> bool {
        assert!(col < self.cols, "invalid column index {col} for a {}x{} matrix", self.rows, self.cols);
        true
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("matrix is singular at pivot column {col}")]
pub struct SingularMatrix {
    pub col: usize,
}

/// Pivots smaller than this are treated as zero when inverting.
const PIVOT_EPSILON: f64 = 1e-12;

impl Matrix<f64> {
    pub fn identity(size: usize) -> Self {
        let mut matrix = Self::allocate(size, size);
        for i in 0..size {
            matrix[(i, i)] = 1.;
        }
        matrix
    }

    /// The Gram matrix `AᵀA`.
    pub fn gram(&self) -> Matrix<f64> {
        let mut gram = Matrix::allocate(self.cols, self.cols);
        for row in self {
            for i in 0..self.cols {
                for j in i..self.cols {
                    gram[(i, j)] += row[i] * row[j];
                }
            }
        }
        for i in 0..self.cols {
            for j in 0..i {
                gram[(i, j)] = gram[(j, i)];
            }
        }
        gram
    }

    /// `Aᵀv` for a vector `v` with one element per row.
    pub fn transpose_mul(&self, vector: &[f64]) -> Vec<f64> {
        assert_eq!(self.rows, vector.len(), "vector length must match the number of rows");
        let mut product = vec![0.; self.cols];
        for (row, &scalar) in self.into_iter().zip(vector) {
            for (col, &value) in row.iter().enumerate() {
                product[col] += value * scalar;
            }
        }
        product
    }

    /// `Av` for a vector `v` with one element per column.
    pub fn mul_vec(&self, vector: &[f64]) -> Vec<f64> {
        assert_eq!(self.cols, vector.len(), "vector length must match the number of columns");
        self.into_iter()
            .map(|row| row.iter().zip(vector).map(|(a, b)| a * b).sum())
            .collect()
    }

    /// `vᵀAv` for a square matrix.
    pub fn quadratic_form(&self, vector: &[f64]) -> f64 {
        debug_assert_eq!(self.rows, self.cols);
        self.mul_vec(vector)
            .iter()
            .zip(vector)
            .map(|(a, b)| a * b)
            .sum()
    }

    /// Gauss-Jordan elimination with partial pivoting.
    pub fn invert(&self) -> Result<Matrix<f64>, SingularMatrix> {
        assert_eq!(self.rows, self.cols, "only square matrices can be inverted");
        let size = self.rows;
        let mut work = self.clone();
        let mut inverse = Matrix::identity(size);
        for col in 0..size {
            let pivot_row = (col..size)
                .max_by(|&a, &b| work[(a, col)].abs().total_cmp(&work[(b, col)].abs()))
                .unwrap_or(col);
            if work[(pivot_row, col)].abs() < PIVOT_EPSILON {
                return Err(SingularMatrix { col });
            }
            if pivot_row != col {
                work.swap_rows(pivot_row, col);
                inverse.swap_rows(pivot_row, col);
            }

            let pivot = work[(col, col)];
            for j in 0..size {
                work[(col, j)] /= pivot;
                inverse[(col, j)] /= pivot;
            }

            for row in 0..size {
                if row != col {
                    let factor = work[(row, col)];
                    if factor != 0. {
                        for j in 0..size {
                            work[(row, j)] -= factor * work[(col, j)];
                            inverse[(row, j)] -= factor * inverse[(col, j)];
                        }
                    }
                }
            }
        }
        Ok(inverse)
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        for col in 0..self.cols {
            self.data.swap(a * self.cols + col, b * self.cols + col);
        }
    }
}

impl<T> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: (usize, usize)) -> &Self::Output {
        let (row, col) = index;
        debug_assert!(self.validate_row_index(row));
        debug_assert!(self.validate_col_index(col));
        &self.data[row * self.cols + col]
    }
}

impl<T> IndexMut<(usize, usize)> for Matrix<T> {
    #[inline]
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        let (row, col) = index;
        debug_assert!(self.validate_row_index(row));
        debug_assert!(self.validate_col_index(col));
        &mut self.data[row * self.cols + col]
    }
}

impl<'a, T> IntoIterator for &'a Matrix<T> {
    type Item = &'a [T];
    type IntoIter = ChunksExact<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.chunks_exact(self.cols.max(1))
    }
}

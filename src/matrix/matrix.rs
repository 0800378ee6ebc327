//! Row-major in-memory matrix

use std::fmt;

use super::dtype::{DType, Element};
use crate::errors::{StoreError, StoreResult};

/// Shape and element type of a matrix, used for schema checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub dtype: DType,
    pub width: usize,
}

impl Schema {
    pub fn new(dtype: DType, width: usize) -> Self {
        Self { dtype, width }
    }

    /// Byte size of one row.
    pub fn row_bytes(&self) -> usize {
        self.width * self.dtype.size()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {}", self.dtype, self.width)
    }
}

/// A two-dimensional, row-major array of one element type.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T: Element> {
    rows: usize,
    width: usize,
    data: Vec<T>,
}

impl<T: Element> Matrix<T> {
    /// Creates an empty matrix with the given row width.
    pub fn empty(width: usize) -> Self {
        Self {
            rows: 0,
            width,
            data: Vec::new(),
        }
    }

    /// Builds a matrix from a flat row-major buffer.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `data.len() != rows * width`.
    pub fn from_vec(rows: usize, width: usize, data: Vec<T>) -> StoreResult<Self> {
        if rows.checked_mul(width) != Some(data.len()) {
            return Err(StoreError::InvalidArgument(format!(
                "buffer of {} elements cannot form a {} x {} matrix",
                data.len(),
                rows,
                width
            )));
        }
        Ok(Self { rows, width, data })
    }

    /// Builds a matrix from nested rows.
    ///
    /// # Errors
    ///
    /// `SchemaMismatch` if the rows do not all share one width. An empty input
    /// yields a zero-width, zero-row matrix.
    pub fn from_rows<R: AsRef<[T]>>(rows: &[R]) -> StoreResult<Self> {
        let width = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * width);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != width {
                return Err(StoreError::schema_mismatch(
                    format!("row width {}", width),
                    format!("row {} of width {}", i, row.len()),
                ));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            width,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn schema(&self) -> Schema {
        Schema::new(T::DTYPE, self.width)
    }

    /// Flat row-major view of all elements.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Returns row `i`, or `None` past the end.
    pub fn row(&self, i: usize) -> Option<&[T]> {
        if i >= self.rows {
            return None;
        }
        let start = i * self.width;
        Some(&self.data[start..start + self.width])
    }

    /// Iterates rows front to back.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.rows).map(move |i| &self.data[i * self.width..(i + 1) * self.width])
    }

    /// Copies rows `start..end` into a new matrix. Bounds are clamped to the
    /// matrix.
    pub fn slice_rows(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.rows);
        let start = start.min(end);
        Self {
            rows: end - start,
            width: self.width,
            data: self.data[start * self.width..end * self.width].to_vec(),
        }
    }

    /// Appends the rows of `other` below this matrix.
    ///
    /// # Errors
    ///
    /// `SchemaMismatch` if widths differ. An empty zero-width matrix adopts the
    /// width of `other`.
    pub fn extend_rows(&mut self, other: &Matrix<T>) -> StoreResult<()> {
        if self.rows == 0 && self.data.is_empty() && self.width != other.width {
            self.width = other.width;
        }
        if other.width != self.width {
            return Err(StoreError::schema_mismatch(self.schema(), other.schema()));
        }
        self.data.extend_from_slice(&other.data);
        self.rows += other.rows;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Matrix<f64> {
        Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap()
    }

    #[test]
    fn test_from_rows_shape() {
        let m = sample();
        assert_eq!(m.rows(), 3);
        assert_eq!(m.width(), 2);
        assert_eq!(m.row(1), Some(&[3.0, 4.0][..]));
        assert_eq!(m.row(3), None);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = Matrix::<i32>::from_rows(&[vec![1, 2], vec![3]]);
        assert!(matches!(result, Err(StoreError::SchemaMismatch { .. })));
    }

    #[test]
    fn test_from_vec_checks_length() {
        assert!(Matrix::from_vec(2, 3, vec![0u8; 6]).is_ok());
        assert!(matches!(
            Matrix::from_vec(2, 3, vec![0u8; 5]),
            Err(StoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_slice_rows_clamps() {
        let m = sample();
        let s = m.slice_rows(1, 10);
        assert_eq!(s.rows(), 2);
        assert_eq!(s.as_slice(), &[3.0, 4.0, 5.0, 6.0]);
        assert!(m.slice_rows(5, 2).is_empty());
    }

    #[test]
    fn test_extend_rows() {
        let mut acc = Matrix::<f64>::empty(0);
        acc.extend_rows(&sample()).unwrap();
        acc.extend_rows(&sample().slice_rows(0, 1)).unwrap();
        assert_eq!(acc.rows(), 4);
        assert_eq!(acc.row(3), Some(&[1.0, 2.0][..]));

        let wide = Matrix::<f64>::from_rows(&[vec![0.0; 3]]).unwrap();
        assert!(matches!(
            acc.extend_rows(&wide),
            Err(StoreError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_iter_rows_order() {
        let m = sample();
        let firsts: Vec<f64> = m.iter_rows().map(|r| r[0]).collect();
        assert_eq!(firsts, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn test_schema_display() {
        assert_eq!(sample().schema().to_string(), "f64 x 2");
        assert_eq!(sample().schema().row_bytes(), 16);
    }
}

//! Dense matrix bridge
//!
//! The pipeline works on `ndarray`; the smartcore backends take their own
//! `DenseMatrix`. Conversions copy in row-major order.

use ndarray::{Array2, ArrayView2};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;

pub(crate) fn to_dense(x: ArrayView2<f64>) -> DenseMatrix<f64> {
    DenseMatrix::new(x.nrows(), x.ncols(), x.iter().copied().collect(), false)
}

pub(crate) fn from_dense(m: &DenseMatrix<f64>) -> Array2<f64> {
    let (rows, cols) = m.shape();
    Array2::from_shape_fn((rows, cols), |(i, j)| *m.get((i, j)))
}

/// `n` rows with a single zero column; lets the splitters size a dataset
pub(crate) fn placeholder_rows(n: usize) -> DenseMatrix<f64> {
    DenseMatrix::new(n, 1, vec![0.0; n], false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_round_trip_keeps_layout() {
        let x = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let dense = to_dense(x.view());
        assert_eq!(dense.shape(), (2, 3));
        assert_eq!(*dense.get((1, 0)), 4.0);
        assert_eq!(from_dense(&dense), x);
    }

    #[test]
    fn test_transposed_view() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let dense = to_dense(x.t());
        assert_eq!(*dense.get((0, 1)), 3.0);
    }
}

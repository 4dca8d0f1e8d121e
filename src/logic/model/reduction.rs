//! Feature Reduction - principal component analysis
//!
//! smartcore's PCA on the covariance matrix. The fitted projection and column
//! means are copied out so the reducer persists with the model file.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use smartcore::decomposition::pca::{PCAParameters, PCA};
use smartcore::linalg::basic::matrix::DenseMatrix;

use super::dense::{from_dense, to_dense};
use crate::logic::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pca {
    pub n_components: usize,
    mean: Array1<f64>,
    /// One component per column, `input_dim x output_dim`
    projection: Array2<f64>,
    fitted: bool,
}

impl Pca {
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components: n_components.max(1),
            mean: Array1::zeros(0),
            projection: Array2::zeros((0, 0)),
            fitted: false,
        }
    }

    /// Components actually extracted, at most `n_components`
    pub fn output_dim(&self) -> usize {
        self.projection.ncols()
    }

    pub fn input_dim(&self) -> usize {
        self.mean.len()
    }

    pub fn fit(&mut self, x: ArrayView2<f64>) -> Result<()> {
        let (n, d) = x.dim();
        if n == 0 || d == 0 {
            return Err(Error::Validation("cannot reduce an empty matrix".into()));
        }

        // smartcore refuses more components than input columns
        let wanted = self.n_components.min(d);
        let params = PCAParameters::default().with_n_components(wanted);
        let pca = PCA::<f64, DenseMatrix<f64>>::fit(&to_dense(x), params)?;

        let components = from_dense(pca.components());
        self.projection = match components.dim() {
            (rows, cols) if rows == d && cols == wanted => components,
            (rows, cols) if rows == wanted && cols == d => components.reversed_axes(),
            (rows, cols) => {
                return Err(Error::Backend(format!(
                    "PCA returned a {}x{} projection for {} features and {} components",
                    rows, cols, d, wanted
                )))
            }
        };
        self.mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(d));
        self.fitted = true;

        log::debug!(
            "PCA reduced {} features to {} components",
            d,
            self.output_dim()
        );
        Ok(())
    }

    pub fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        if !self.fitted {
            return Err(Error::Validation("reducer has not been fitted".into()));
        }
        if x.ncols() != self.input_dim() {
            return Err(Error::Validation(format!(
                "reducer expects {} features, got {}",
                self.input_dim(),
                x.ncols()
            )));
        }
        Ok((&x - &self.mean).dot(&self.projection))
    }

    pub fn fit_transform(&mut self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_first_component_follows_the_data() {
        let x = array![
            [1.0, 1.1],
            [2.0, 1.9],
            [3.0, 3.0],
            [4.0, 4.1],
            [5.0, 4.9],
        ];
        let mut pca = Pca::new(1);
        let reduced = pca.fit_transform(x.view()).unwrap();

        assert_eq!(reduced.dim(), (5, 1));
        let c = pca.projection.column(0);
        assert!((c[0].abs() - c[1].abs()).abs() < 0.05);
        assert!(c[0] * c[1] > 0.0);

        // projections are centred and keep the ordering along the diagonal
        assert!(reduced.column(0).sum().abs() < 1e-9);
        let first = reduced[[0, 0]];
        let last = reduced[[4, 0]];
        assert!(first * last < 0.0);
    }

    #[test]
    fn test_components_are_capped_by_width() {
        let x = array![
            [2.0, 0.0, 1.0],
            [-2.0, 0.1, 1.0],
            [4.0, -0.1, 1.0],
            [-4.0, 0.0, 1.0],
        ];
        let mut pca = Pca::new(5);
        let reduced = pca.fit_transform(x.view()).unwrap();

        assert_eq!(pca.output_dim(), 3);
        assert_eq!(pca.input_dim(), 3);
        assert_eq!(reduced.dim(), (4, 3));

        // the leading component carries the widest column
        let spread = |j: usize| reduced.column(j).mapv(|v| v * v).sum();
        assert!(spread(0) >= spread(1));
        assert!(spread(1) >= spread(2));
    }

    #[test]
    fn test_transform_checks_width() {
        let mut pca = Pca::new(1);
        assert!(pca.transform(array![[1.0]].view()).is_err());
        pca.fit(array![[1.0, 2.0], [2.0, 1.0]].view()).unwrap();
        assert!(pca.transform(array![[1.0, 2.0, 3.0]].view()).is_err());
    }
}

//! Linear epsilon-insensitive support vector regression
//!
//! smartcore's SMO solver with a linear kernel, run on standardised inputs.
//! A linear-kernel SVR is an affine map, so after fitting its weights and bias
//! are read back by evaluating the origin and each unit vector; only those are
//! persisted.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::svm::svr::{SVRParameters, SVR};
use smartcore::svm::Kernels;

use super::dense::to_dense;
use super::regressor::{check_input, check_training, Regressor, Standardizer};
use crate::logic::error::{Error, Result};

pub const DEFAULT_EPSILON: f64 = 0.1;
pub const DEFAULT_C: f64 = 1.0;
pub const DEFAULT_TOLERANCE: f64 = 1e-3;

/// Unit vectors evaluated per predict call while reading weights back
const UNIT_BATCH: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvrModel {
    pub epsilon: f64,
    pub c: f64,
    pub tolerance: f64,

    scaler: Standardizer,
    weights: Array1<f64>,
    bias: f64,
    fitted: bool,
}

impl Default for SvrModel {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            c: DEFAULT_C,
            tolerance: DEFAULT_TOLERANCE,
            scaler: Standardizer::default(),
            weights: Array1::zeros(0),
            bias: 0.0,
            fitted: false,
        }
    }
}

impl SvrModel {
    pub fn untrained(&self) -> Self {
        Self {
            epsilon: self.epsilon,
            c: self.c,
            tolerance: self.tolerance,
            ..Self::default()
        }
    }
}

type LinearSvr<'a> = SVR<'a, f64, DenseMatrix<f64>, Vec<f64>>;

impl Regressor for SvrModel {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<()> {
        check_training(&x, &y)?;

        let (n, d) = x.dim();
        let scaler = Standardizer::fit(x);
        let xs = to_dense(scaler.transform(x).view());
        let ys: Vec<f64> = y.to_vec();

        let params = SVRParameters::default()
            .with_eps(self.epsilon)
            .with_c(self.c)
            .with_tol(self.tolerance)
            .with_kernel(Kernels::linear());
        let svr = LinearSvr::fit(&xs, &ys, &params)?;

        let (weights, bias) = affine_form(&svr, d)?;
        self.scaler = scaler;
        self.weights = weights;
        self.bias = bias;
        self.fitted = true;

        log::debug!("SVR fitted on {} samples, {} features", n, d);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        check_input(&x, self.weights.len(), self.fitted)?;
        Ok(self.scaler.transform(x).dot(&self.weights) + self.bias)
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

/// Weights and bias of a fitted linear-kernel SVR over `d` inputs
fn affine_form(svr: &LinearSvr<'_>, d: usize) -> Result<(Array1<f64>, f64)> {
    let origin = svr.predict(&to_dense(Array2::<f64>::zeros((1, d)).view()))?;
    let bias = origin
        .first()
        .copied()
        .ok_or_else(|| Error::Backend("SVR returned no prediction".into()))?;

    let mut weights = Array1::<f64>::zeros(d);
    let mut start = 0;
    while start < d {
        let end = (start + UNIT_BATCH).min(d);
        let units = Array2::from_shape_fn((end - start, d), |(i, j)| {
            if start + i == j {
                1.0
            } else {
                0.0
            }
        });
        let values = svr.predict(&to_dense(units.view()))?;
        for (offset, value) in values.iter().enumerate() {
            weights[start + offset] = value - bias;
        }
        start = end;
    }
    Ok((weights, bias))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 1), |(i, _)| i as f64 / n as f64);
        let y = x.column(0).mapv(|v| 2.0 * v + 1.0);
        (x, y)
    }

    #[test]
    fn test_fits_a_line() {
        let (x, y) = line(50);
        let mut model = SvrModel {
            epsilon: 0.01,
            c: 10.0,
            ..SvrModel::default()
        };
        model.fit(x.view(), y.view()).unwrap();

        let p = model.predict(x.view()).unwrap();
        let mae = (&p - &y).mapv(f64::abs).mean().unwrap();
        assert!(mae < 0.3, "mae {}", mae);
        // slope survives the round trip through the scaler
        assert!(p[49] > p[0]);
    }

    #[test]
    fn test_training_is_deterministic() {
        let (x, y) = line(20);
        let mut a = SvrModel::default();
        let mut b = SvrModel::default();
        a.fit(x.view(), y.view()).unwrap();
        b.fit(x.view(), y.view()).unwrap();
        assert_eq!(a.predict(x.view()).unwrap(), b.predict(x.view()).unwrap());
    }

    #[test]
    fn test_weights_reproduce_backend_predictions() {
        let x = Array2::from_shape_fn((12, 3), |(i, j)| ((i * (j + 2)) % 5) as f64);
        let y = x.rows().into_iter().map(|r| r[0] - 0.5 * r[2] + 2.0).collect::<Array1<f64>>();

        let scaler = Standardizer::fit(x.view());
        let xs = to_dense(scaler.transform(x.view()).view());
        let params = SVRParameters::default().with_kernel(Kernels::linear());
        let y_vec = y.to_vec();
        let svr = LinearSvr::fit(&xs, &y_vec, &params).unwrap();
        let direct = svr.predict(&xs).unwrap();

        let (weights, bias) = affine_form(&svr, 3).unwrap();
        let rebuilt = scaler.transform(x.view()).dot(&weights) + bias;
        for (a, b) in rebuilt.iter().zip(direct.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_unfitted_predict_fails() {
        let model = SvrModel::default();
        assert!(!model.is_fitted());
        assert!(model.predict(Array2::zeros((1, 1)).view()).is_err());
    }
}

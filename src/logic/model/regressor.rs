//! Regressor - fit/predict seam and the linear backend
//!
//! Every backend consumes a dense `(n_samples, n_features)` matrix and a
//! target vector of the same length. Shape problems are `Validation` errors.
//! The linear backend is a near-zero-penalty smartcore ridge fit on centred
//! data, so rank-deficient designs still get a unique solution.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::ridge_regression::{
    RidgeRegression, RidgeRegressionParameters, RidgeRegressionSolverName,
};

use super::dense::to_dense;
use crate::logic::error::{Error, Result};

/// Ridge penalty; small enough to act only on collinear columns
const RIDGE: f64 = 1e-6;

/// Standard deviation below which a column counts as constant
const MIN_STD: f64 = 1e-12;

pub trait Regressor {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<()>;
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>>;
    fn is_fitted(&self) -> bool;
}

// ============================================================================
// SHAPE CHECKS
// ============================================================================

pub(crate) fn check_training(x: &ArrayView2<f64>, y: &ArrayView1<f64>) -> Result<()> {
    if x.nrows() == 0 {
        return Err(Error::Validation("cannot fit on an empty matrix".into()));
    }
    if x.ncols() == 0 {
        return Err(Error::Validation("cannot fit without features".into()));
    }
    if x.nrows() != y.len() {
        return Err(Error::Validation(format!(
            "{} rows but {} targets",
            x.nrows(),
            y.len()
        )));
    }
    Ok(())
}

pub(crate) fn check_input(x: &ArrayView2<f64>, expected: usize, fitted: bool) -> Result<()> {
    if !fitted {
        return Err(Error::Validation("model has not been fitted".into()));
    }
    if x.ncols() != expected {
        return Err(Error::Validation(format!(
            "expected {} features, got {}",
            expected,
            x.ncols()
        )));
    }
    Ok(())
}

// ============================================================================
// STANDARDIZER
// ============================================================================

/// Per-column mean/std scaling; constant columns keep std 1
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Standardizer {
    pub mean: Array1<f64>,
    pub std: Array1<f64>,
}

impl Standardizer {
    pub fn fit(x: ArrayView2<f64>) -> Self {
        let n = x.nrows().max(1) as f64;
        let mean = x.sum_axis(Axis(0)) / n;
        let mut std = Array1::<f64>::zeros(x.ncols());
        for (j, column) in x.axis_iter(Axis(1)).enumerate() {
            let var = column.iter().map(|v| (v - mean[j]).powi(2)).sum::<f64>() / n;
            std[j] = if var.sqrt() > MIN_STD { var.sqrt() } else { 1.0 };
        }
        Self { mean, std }
    }

    pub fn transform(&self, x: ArrayView2<f64>) -> Array2<f64> {
        (&x - &self.mean) / &self.std
    }
}

// ============================================================================
// LINEAR MODEL
// ============================================================================

/// Least squares with intercept, solved by smartcore's ridge regression.
/// Inputs and targets are centred first so the ridge term leaves the
/// intercept alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: Array1<f64>,
    pub intercept: f64,
    fitted: bool,
}

impl LinearModel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Regressor for LinearModel {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<()> {
        check_training(&x, &y)?;

        let (n, d) = x.dim();
        let x_mean = x.sum_axis(Axis(0)) / n as f64;
        let y_mean = y.sum() / n as f64;
        let centred = to_dense((&x - &x_mean).view());
        let targets: Vec<f64> = y.iter().map(|v| v - y_mean).collect();

        let solved = match ridge(&centred, &targets, RidgeRegressionSolverName::Cholesky) {
            Ok(model) => model,
            Err(e) => {
                log::debug!("Cholesky solve failed ({}), retrying with SVD", e);
                ridge(&centred, &targets, RidgeRegressionSolverName::SVD)?
            }
        };

        let coefficients = solved.coefficients();
        self.weights = Array1::from_shape_fn(d, |j| *coefficients.get((j, 0)));
        self.intercept = y_mean - x_mean.dot(&self.weights);
        self.fitted = true;

        log::debug!("Linear model fitted on {} samples, {} features", n, d);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        check_input(&x, self.weights.len(), self.fitted)?;
        Ok(x.dot(&self.weights) + self.intercept)
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

type Ridge = RidgeRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>;

#[allow(clippy::ptr_arg)] // smartcore's target type is Vec<f64>
fn ridge(x: &DenseMatrix<f64>, y: &Vec<f64>, solver: RidgeRegressionSolverName) -> Result<Ridge> {
    let params = RidgeRegressionParameters::default()
        .with_alpha(RIDGE)
        .with_normalize(false)
        .with_solver(solver);
    Ok(Ridge::fit(x, y, params)?)
}

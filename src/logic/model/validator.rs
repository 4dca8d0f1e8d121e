//! Performance Validator - cross-validated error estimates
//!
//! Targets are computed once over the whole dataset; splits only partition
//! rows. Each split trains an untrained copy of the template model. Splitters
//! and metrics come from smartcore's `model_selection` and `metrics`.

use std::fmt;
use std::str::FromStr;
use ndarray::{ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use smartcore::metrics;
use smartcore::model_selection::{train_test_split, BaseKFold, KFold};

use super::dense::placeholder_rows;
use super::exploitability::ExploitabilityModel;
use crate::logic::dataset::VulnerabilityEvent;
use crate::logic::error::{Error, Result};
use crate::logic::features::training_matrices;

/// Share of rows held out per shuffle split
const SHUFFLE_TEST_FRACTION: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMethod {
    KFold,
    ShuffleSplit,
}

impl fmt::Display for ValidationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationMethod::KFold => f.write_str("kfold"),
            ValidationMethod::ShuffleSplit => f.write_str("shuffle"),
        }
    }
}

impl FromStr for ValidationMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kfold" | "k-fold" => Ok(ValidationMethod::KFold),
            "shuffle" | "shufflesplit" | "shuffle-split" => Ok(ValidationMethod::ShuffleSplit),
            other => Err(Error::Validation(format!("unknown validation method '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitScore {
    pub train_size: usize,
    pub test_size: usize,
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub method: ValidationMethod,
    pub splits: Vec<SplitScore>,
    pub mean_mae: f64,
    pub mean_rmse: f64,
    pub mean_r2: f64,
}

impl ValidationReport {
    fn from_splits(method: ValidationMethod, splits: Vec<SplitScore>) -> Self {
        let n = splits.len().max(1) as f64;
        let mean = |f: fn(&SplitScore) -> f64| splits.iter().map(f).sum::<f64>() / n;
        Self {
            method,
            mean_mae: mean(|s| s.mae),
            mean_rmse: mean(|s| s.rmse),
            mean_r2: mean(|s| s.r2),
            splits,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PerformanceValidator {
    pub method: ValidationMethod,
    pub n_splits: usize,
    pub seed: u64,
}

impl PerformanceValidator {
    pub fn new(method: ValidationMethod, n_splits: usize) -> Self {
        Self {
            method,
            n_splits,
            seed: 42,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// `(train, test)` row indices for `n` samples
    pub fn splits(&self, n: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
        if self.n_splits == 0 {
            return Err(Error::Validation("n_splits must be positive".into()));
        }
        match self.method {
            ValidationMethod::KFold => self.kfold(n),
            ValidationMethod::ShuffleSplit => self.shuffle_split(n),
        }
    }

    fn kfold(&self, n: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
        let k = self.n_splits;
        if k < 2 || k > n {
            return Err(Error::Validation(format!(
                "k-fold needs 2 <= n_splits <= samples, got {} splits for {} samples",
                k, n
            )));
        }

        let folds = KFold::default()
            .with_n_splits(k)
            .with_shuffle(false)
            .split(&placeholder_rows(n))
            .collect();
        Ok(folds)
    }

    fn shuffle_split(&self, n: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
        let test_size = (n as f32 * SHUFFLE_TEST_FRACTION) as usize;
        if test_size == 0 || test_size >= n {
            return Err(Error::Validation(format!(
                "shuffle split needs at least {} samples, got {}",
                (1.0 / SHUFFLE_TEST_FRACTION).ceil() as usize,
                n
            )));
        }

        let rows = placeholder_rows(n);
        let indices: Vec<usize> = (0..n).collect();
        let splits = (0..self.n_splits as u64)
            .map(|i| {
                let (_, _, train, test) = train_test_split(
                    &rows,
                    &indices,
                    SHUFFLE_TEST_FRACTION,
                    true,
                    Some(self.seed.wrapping_add(i)),
                );
                (train, test)
            })
            .collect();
        Ok(splits)
    }

    /// Cross-validate on precomputed matrices
    pub fn evaluate(
        &self,
        template: &ExploitabilityModel,
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
    ) -> Result<ValidationReport> {
        if x.nrows() != y.len() {
            return Err(Error::Validation(format!(
                "{} rows but {} targets",
                x.nrows(),
                y.len()
            )));
        }

        let mut scores = Vec::new();
        for (i, (train, test)) in self.splits(x.nrows())?.into_iter().enumerate() {
            let mut model = template.untrained();
            model.learn(
                x.select(Axis(0), &train).view(),
                y.select(Axis(0), &train).view(),
            )?;

            let expected = y.select(Axis(0), &test);
            let predicted = model.predict(x.select(Axis(0), &test).view())?;
            let score = SplitScore {
                train_size: train.len(),
                test_size: test.len(),
                mae: mean_absolute_error(expected.view(), predicted.view()),
                rmse: root_mean_squared_error(expected.view(), predicted.view()),
                r2: r2_score(expected.view(), predicted.view()),
            };
            log::debug!(
                "split {}: mae {:.4} rmse {:.4} r2 {:.4}",
                i,
                score.mae,
                score.rmse,
                score.r2
            );
            scores.push(score);
        }

        let report = ValidationReport::from_splits(self.method, scores);
        log::info!(
            "{} validation over {} splits: mae {:.4} rmse {:.4} r2 {:.4}",
            self.method,
            report.splits.len(),
            report.mean_mae,
            report.mean_rmse,
            report.mean_r2
        );
        Ok(report)
    }

    /// Cross-validate on a loaded dataset using the template's schema
    pub fn evaluate_dataset(
        &self,
        template: &ExploitabilityModel,
        dataset: &[VulnerabilityEvent],
    ) -> Result<ValidationReport> {
        if dataset.is_empty() {
            return Err(Error::Validation("no data to evaluate on".into()));
        }
        if template.schema().is_empty() {
            return Err(Error::Validation("no feature schema to evaluate with".into()));
        }
        let (x, y) = training_matrices(dataset, template.schema(), template.target_window());
        self.evaluate(template, x.view(), y.view())
    }
}

// ============================================================================
// METRICS
// ============================================================================

pub fn mean_absolute_error(expected: ArrayView1<f64>, predicted: ArrayView1<f64>) -> f64 {
    metrics::mean_absolute_error(&expected.to_vec(), &predicted.to_vec())
}

pub fn root_mean_squared_error(expected: ArrayView1<f64>, predicted: ArrayView1<f64>) -> f64 {
    metrics::mean_squared_error(&expected.to_vec(), &predicted.to_vec()).sqrt()
}

/// Coefficient of determination; a constant target scores 1 when matched exactly, else 0
pub fn r2_score(expected: ArrayView1<f64>, predicted: ArrayView1<f64>) -> f64 {
    let mean = expected.mean().unwrap_or(0.0);
    let ss_tot: f64 = expected.mapv(|v| (v - mean).powi(2)).sum();
    if ss_tot <= f64::EPSILON {
        let ss_res: f64 = (&expected - &predicted).mapv(|e| e * e).sum();
        return if ss_res <= f64::EPSILON { 1.0 } else { 0.0 };
    }
    metrics::r2(&expected.to_vec(), &predicted.to_vec())
}

//! Exploitability Model - schema, optional reducer and regressor in one unit
//!
//! A model is only usable together with the exact schema it was trained on,
//! so the schema lives inside the model and every prediction goes through it.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use uuid::Uuid;

use super::estimator::{Estimator, ModelKind};
use super::reduction::Pca;
use super::regressor::Regressor;
use crate::constants::DEFAULT_TARGET_WINDOW_DAYS;
use crate::logic::dataset::{Vulnerability, VulnerabilityEvent};
use crate::logic::error::{Error, Result};
use crate::logic::features::{training_matrices, vectorize, FeatureSchema, FeatureVector};

#[derive(Debug, Clone)]
pub struct ExploitabilityModel {
    pub(super) id: Uuid,
    pub(super) created_at: DateTime<Utc>,
    pub(super) schema: FeatureSchema,
    pub(super) reducer: Option<Pca>,
    pub(super) estimator: Estimator,
    pub(super) target_window_days: i64,
}

impl ExploitabilityModel {
    pub fn new(schema: FeatureSchema, estimator: Estimator) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            schema,
            reducer: None,
            estimator,
            target_window_days: DEFAULT_TARGET_WINDOW_DAYS,
        }
    }

    /// Reduce inputs to `n_components` principal components; `None` disables
    pub fn with_components(mut self, n_components: Option<usize>) -> Self {
        self.reducer = n_components.map(Pca::new);
        self
    }

    pub fn with_target_window(mut self, window: Duration) -> Self {
        self.target_window_days = window.num_days();
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn reducer(&self) -> Option<&Pca> {
        self.reducer.as_ref()
    }

    pub fn kind(&self) -> ModelKind {
        self.estimator.kind()
    }

    pub fn target_window(&self) -> Duration {
        Duration::days(self.target_window_days)
    }

    pub fn is_fitted(&self) -> bool {
        self.estimator.is_fitted()
    }

    /// Fit on a loaded dataset using this model's schema
    pub fn learn_by_data(&mut self, dataset: &[VulnerabilityEvent]) -> Result<()> {
        if dataset.is_empty() {
            return Err(Error::Validation("no data to learn from".into()));
        }
        if self.schema.is_empty() {
            return Err(Error::Validation("no feature schema to learn with".into()));
        }

        let (x, y) = training_matrices(dataset, &self.schema, self.target_window());
        self.learn(x.view(), y.view())?;

        log::info!(
            "Fitted {} model on {} events with {} features",
            self.kind(),
            dataset.len(),
            self.schema.len()
        );
        if let Some(pca) = self.reducer() {
            log::info!("Inputs reduced to {} principal components", pca.output_dim());
        }
        Ok(())
    }

    pub fn learn(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<()> {
        self.check_width(&x)?;
        match self.reducer.as_mut() {
            Some(pca) => {
                let reduced = pca.fit_transform(x)?;
                self.estimator.fit(reduced.view(), y)
            }
            None => self.estimator.fit(x, y),
        }
    }

    pub fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        self.check_width(&x)?;
        match &self.reducer {
            Some(pca) => self.estimator.predict(pca.transform(x)?.view()),
            None => self.estimator.predict(x),
        }
    }

    /// Predicted exploitability of `vuln` as observed at `observed`
    pub fn predict_vulnerability(&self, vuln: &Vulnerability, observed: NaiveDateTime) -> Result<f64> {
        let vector = vectorize(&self.schema, vuln, observed);
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("{} features: {}", vuln.id, vector.to_log_entry(&self.schema));
        }
        self.predict_vector(vector)
    }

    /// Predict one vector; it must come from this model's schema
    pub fn predict_vector(&self, vector: FeatureVector) -> Result<f64> {
        vector.validate(&self.schema)?;
        let row = Array2::from_shape_vec((1, vector.len()), vector.values)
            .map_err(|e| Error::Validation(e.to_string()))?;
        let prediction = self.predict(row.view())?;
        prediction
            .first()
            .copied()
            .ok_or_else(|| Error::Validation("empty prediction".into()))
    }

    /// Fresh, unfitted copy with the same configuration
    pub fn untrained(&self) -> Self {
        let mut copy = self.clone();
        copy.reducer = self.reducer.as_ref().map(|pca| Pca::new(pca.n_components));
        copy.estimator = self.estimator.untrained();
        copy
    }

    fn check_width(&self, x: &ArrayView2<f64>) -> Result<()> {
        if x.ncols() != self.schema.len() {
            return Err(Error::Validation(format!(
                "schema has {} features, input has {}",
                self.schema.len(),
                x.ncols()
            )));
        }
        Ok(())
    }
}

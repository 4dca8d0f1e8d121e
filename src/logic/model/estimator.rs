//! Estimator - the regression backends behind one serialisable type

use std::fmt;
use std::str::FromStr;
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::neural::{self, NeuralModel};
use super::regressor::{LinearModel, Regressor};
use super::svr::SvrModel;
use crate::logic::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Linear,
    Svr,
    Neural,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelKind::Linear => "linear",
            ModelKind::Svr => "svr",
            ModelKind::Neural => "nn",
        };
        f.write_str(name)
    }
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" | "lr" => Ok(ModelKind::Linear),
            "svr" => Ok(ModelKind::Svr),
            "nn" | "neural" => Ok(ModelKind::Neural),
            other => Err(Error::Validation(format!("unknown model kind '{}'", other))),
        }
    }
}

/// Training hyper-parameters from the CLI.
///
/// Only the neural network is trained iteratively, so these are ignored by the
/// linear and SVR backends, whose solvers run to convergence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrainingParams {
    pub epochs: usize,
    pub batch_size: usize,
    pub hidden_units: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            epochs: neural::DEFAULT_EPOCHS,
            batch_size: neural::DEFAULT_BATCH_SIZE,
            hidden_units: neural::DEFAULT_HIDDEN_UNITS,
            learning_rate: neural::DEFAULT_LEARNING_RATE,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    Linear(LinearModel),
    Svr(SvrModel),
    Neural(NeuralModel),
}

impl Estimator {
    pub fn new(kind: ModelKind, params: &TrainingParams) -> Self {
        match kind {
            ModelKind::Linear => Estimator::Linear(LinearModel::new()),
            ModelKind::Svr => Estimator::Svr(SvrModel::default()),
            ModelKind::Neural => Estimator::Neural(
                NeuralModel::new(params.epochs, params.batch_size)
                    .with_hidden_units(params.hidden_units)
                    .with_learning_rate(params.learning_rate)
                    .with_seed(params.seed),
            ),
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Estimator::Linear(_) => ModelKind::Linear,
            Estimator::Svr(_) => ModelKind::Svr,
            Estimator::Neural(_) => ModelKind::Neural,
        }
    }

    /// Same hyper-parameters, no learned state
    pub fn untrained(&self) -> Self {
        match self {
            Estimator::Linear(_) => Estimator::Linear(LinearModel::new()),
            Estimator::Svr(m) => Estimator::Svr(m.untrained()),
            Estimator::Neural(m) => Estimator::Neural(m.untrained()),
        }
    }

    fn inner(&self) -> &dyn Regressor {
        match self {
            Estimator::Linear(m) => m,
            Estimator::Svr(m) => m,
            Estimator::Neural(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Regressor {
        match self {
            Estimator::Linear(m) => m,
            Estimator::Svr(m) => m,
            Estimator::Neural(m) => m,
        }
    }
}

impl Regressor for Estimator {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        self.inner().predict(x)
    }

    fn is_fitted(&self) -> bool {
        self.inner().is_fitted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("linear".parse::<ModelKind>().unwrap(), ModelKind::Linear);
        assert_eq!("SVR".parse::<ModelKind>().unwrap(), ModelKind::Svr);
        assert_eq!("nn".parse::<ModelKind>().unwrap(), ModelKind::Neural);
        assert!("forest".parse::<ModelKind>().is_err());
        assert_eq!(ModelKind::Neural.to_string(), "nn");
    }

    #[test]
    fn test_params_reach_the_network() {
        let params = TrainingParams {
            epochs: 7,
            batch_size: 3,
            hidden_units: 5,
            learning_rate: 0.2,
            seed: 9,
        };
        match Estimator::new(ModelKind::Neural, &params) {
            Estimator::Neural(nn) => {
                assert_eq!((nn.epochs, nn.batch_size, nn.hidden_units, nn.seed), (7, 3, 5, 9));
                assert_eq!(nn.learning_rate, 0.2);
            }
            other => panic!("expected a neural estimator, got {}", other.kind()),
        }
    }

    #[test]
    fn test_serde_keeps_backend() {
        let mut estimator = Estimator::new(ModelKind::Linear, &TrainingParams::default());
        estimator
            .fit(array![[0.0], [1.0], [2.0]].view(), array![1.0, 3.0, 5.0].view())
            .unwrap();

        let json = serde_json::to_string(&estimator).unwrap();
        assert!(json.contains(r#""kind":"linear""#));

        let back: Estimator = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind(), ModelKind::Linear);
        assert!(back.is_fitted());
        let p = back.predict(array![[3.0]].view()).unwrap();
        assert!((p[0] - 7.0).abs() < 1e-3);
    }
}

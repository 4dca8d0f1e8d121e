//! Neural Model - single hidden layer perceptron
//!
//! `tanh` hidden layer, linear output, mean squared error, mini-batch SGD.
//! Inputs and targets are standardised during training; the scaling is stored
//! with the weights so predictions come back in target units.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::regressor::{check_input, check_training, Regressor, Standardizer};
use crate::logic::error::Result;

pub const DEFAULT_EPOCHS: usize = 500;
pub const DEFAULT_BATCH_SIZE: usize = 1;
pub const DEFAULT_HIDDEN_UNITS: usize = 16;
pub const DEFAULT_LEARNING_RATE: f64 = 0.01;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuralModel {
    pub epochs: usize,
    pub batch_size: usize,
    pub hidden_units: usize,
    pub learning_rate: f64,
    pub seed: u64,

    scaler: Standardizer,
    y_mean: f64,
    y_std: f64,
    w1: Array2<f64>,
    b1: Array1<f64>,
    w2: Array1<f64>,
    b2: f64,
    fitted: bool,
}

impl Default for NeuralModel {
    fn default() -> Self {
        Self {
            epochs: DEFAULT_EPOCHS,
            batch_size: DEFAULT_BATCH_SIZE,
            hidden_units: DEFAULT_HIDDEN_UNITS,
            learning_rate: DEFAULT_LEARNING_RATE,
            seed: 42,
            scaler: Standardizer::default(),
            y_mean: 0.0,
            y_std: 1.0,
            w1: Array2::zeros((0, 0)),
            b1: Array1::zeros(0),
            w2: Array1::zeros(0),
            b2: 0.0,
            fitted: false,
        }
    }
}

impl NeuralModel {
    pub fn new(epochs: usize, batch_size: usize) -> Self {
        Self {
            epochs: epochs.max(1),
            batch_size: batch_size.max(1),
            ..Self::default()
        }
    }

    pub fn with_hidden_units(mut self, units: usize) -> Self {
        self.hidden_units = units.max(1);
        self
    }

    pub fn with_learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = rate;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn untrained(&self) -> Self {
        Self {
            epochs: self.epochs,
            batch_size: self.batch_size,
            hidden_units: self.hidden_units,
            learning_rate: self.learning_rate,
            seed: self.seed,
            ..Self::default()
        }
    }

    fn forward(&self, x: &Array2<f64>) -> (Array2<f64>, Array1<f64>) {
        let hidden = (x.dot(&self.w1) + &self.b1).mapv(f64::tanh);
        let out = hidden.dot(&self.w2) + self.b2;
        (hidden, out)
    }

    fn init_weights(&mut self, inputs: usize, rng: &mut StdRng) {
        let h = self.hidden_units;
        let limit = (6.0 / (inputs + h) as f64).sqrt();
        self.w1 = Array2::from_shape_fn((inputs, h), |_| rng.gen_range(-limit..limit));
        self.b1 = Array1::zeros(h);
        let limit = (6.0 / (h + 1) as f64).sqrt();
        self.w2 = Array1::from_shape_fn(h, |_| rng.gen_range(-limit..limit));
        self.b2 = 0.0;
    }
}

impl Regressor for NeuralModel {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<()> {
        check_training(&x, &y)?;

        let (n, d) = x.dim();
        self.scaler = Standardizer::fit(x);
        let xs = self.scaler.transform(x);

        self.y_mean = y.mean().unwrap_or(0.0);
        let y_var = y.mapv(|v| (v - self.y_mean).powi(2)).mean().unwrap_or(0.0);
        self.y_std = if y_var.sqrt() > 1e-12 { y_var.sqrt() } else { 1.0 };
        let ys = y.mapv(|v| (v - self.y_mean) / self.y_std);

        let mut rng = StdRng::seed_from_u64(self.seed);
        self.init_weights(d, &mut rng);

        let batch_size = self.batch_size.clamp(1, n);
        let mut order: Vec<usize> = (0..n).collect();
        let mut last_loss = f64::NAN;

        for epoch in 0..self.epochs {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for batch in order.chunks(batch_size) {
                let xb = xs.select(Axis(0), batch);
                let yb = ys.select(Axis(0), batch);
                let m = batch.len() as f64;

                let (hidden, out) = self.forward(&xb);
                let err = &out - &yb;
                epoch_loss += err.mapv(|e| e * e).sum();

                let d_out = err * (2.0 / m);
                let grad_w2 = hidden.t().dot(&d_out);
                let grad_b2 = d_out.sum();

                let d_pre = d_out
                    .insert_axis(Axis(1))
                    .dot(&self.w2.view().insert_axis(Axis(0)))
                    * hidden.mapv(|h| 1.0 - h * h);
                let grad_w1 = xb.t().dot(&d_pre);
                let grad_b1 = d_pre.sum_axis(Axis(0));

                let lr = self.learning_rate;
                self.w1.scaled_add(-lr, &grad_w1);
                self.b1.scaled_add(-lr, &grad_b1);
                self.w2.scaled_add(-lr, &grad_w2);
                self.b2 -= lr * grad_b2;
            }

            last_loss = epoch_loss / n as f64;
            if epoch % 100 == 0 {
                log::debug!("epoch {} mse {:.6}", epoch, last_loss);
            }
        }

        self.fitted = true;
        log::debug!(
            "Neural model fitted on {} samples, {} features, {} hidden units (final mse {:.6})",
            n,
            d,
            self.hidden_units,
            last_loss
        );
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        check_input(&x, self.w1.nrows(), self.fitted)?;
        let (_, out) = self.forward(&self.scaler.transform(x));
        Ok(out * self.y_std + self.y_mean)
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            if j == 0 {
                (i % 10) as f64 / 10.0
            } else {
                (i / 10) as f64 / 10.0
            }
        });
        let y = x.map_axis(Axis(1), |r| r[0] + 2.0 * r[1]);
        (x, y)
    }

    fn r2(p: &Array1<f64>, y: &Array1<f64>) -> f64 {
        let mean = y.mean().unwrap();
        let ss_res: f64 = p.iter().zip(y).map(|(a, b)| (a - b).powi(2)).sum();
        let ss_tot: f64 = y.iter().map(|b| (b - mean).powi(2)).sum();
        1.0 - ss_res / ss_tot
    }

    #[test]
    fn test_learns_linear_target() {
        let (x, y) = plane(100);
        let mut model = NeuralModel::new(300, 10).with_learning_rate(0.05);
        model.fit(x.view(), y.view()).unwrap();

        let p = model.predict(x.view()).unwrap();
        assert!(r2(&p, &y) > 0.8, "r2 {}", r2(&p, &y));
    }

    #[test]
    fn test_same_seed_same_weights() {
        let (x, y) = plane(30);
        let mut a = NeuralModel::new(20, 4).with_seed(3);
        let mut b = NeuralModel::new(20, 4).with_seed(3);
        a.fit(x.view(), y.view()).unwrap();
        b.fit(x.view(), y.view()).unwrap();
        assert_eq!(a.predict(x.view()).unwrap(), b.predict(x.view()).unwrap());
    }

    #[test]
    fn test_batch_larger_than_dataset() {
        let (x, y) = plane(5);
        let mut model = NeuralModel::new(5, 64);
        model.fit(x.view(), y.view()).unwrap();
        assert_eq!(model.predict(x.view()).unwrap().len(), 5);
    }

    #[test]
    fn test_constant_target() {
        let (x, _) = plane(10);
        let y = Array1::from_elem(10, 3.0);
        let mut model = NeuralModel::new(10, 2);
        model.fit(x.view(), y.view()).unwrap();
        let p = model.predict(x.view()).unwrap();
        assert!(p.iter().all(|v| v.is_finite()));
    }
}

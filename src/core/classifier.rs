//! The probabilistic-classifier seam used by the AUC screen, plus a
//! self-contained logistic regression so the crate works without an external
//! model.
//!
//! The contract mirrors the estimator interface the screen consumes:
//! `fit` on a feature matrix and binary labels, `predict_proba` returning one
//! probability row per sample with the positive class in column 1.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::core::errors::{Result, ScreenError};

/// A binary classifier that exposes per-class probabilities.
pub trait ProbabilisticClassifier {
    /// Fit on a feature matrix (one row per sample) and 0/1 labels.
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<()>;

    /// Predicted class probabilities, shape (samples, 2); column 1 is the
    /// positive class.
    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>>;
}

/// Logistic regression fitted by batch gradient descent.
///
/// Inputs are standardized internally (per-column mean/std remembered from
/// `fit`) so the fixed learning rate behaves across the very different value
/// scales radiomics features come in.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    learning_rate: f64,
    n_iterations: usize,
    fitted: Option<FittedState>,
}

#[derive(Debug, Clone)]
struct FittedState {
    weights: Array1<f64>,
    intercept: f64,
    feature_means: Array1<f64>,
    feature_stds: Array1<f64>,
}

impl LogisticRegression {
    /// Create a model with the given gradient-descent settings.
    pub fn new(learning_rate: f64, n_iterations: usize) -> Self {
        Self {
            learning_rate,
            n_iterations,
            fitted: None,
        }
    }

    fn standardize(state: &FittedState, x: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut out = x.to_owned();
        for ((_, j), value) in out.indexed_iter_mut() {
            *value = (*value - state.feature_means[j]) / state.feature_stds[j];
        }
        out
    }

    fn decision(state: &FittedState, x: &Array2<f64>) -> Array1<f64> {
        x.dot(&state.weights) + state.intercept
    }
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(0.1, 500)
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl ProbabilisticClassifier for LogisticRegression {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<()> {
        let (n_samples, n_features) = x.dim();
        if n_samples == 0 || n_features == 0 {
            return Err(ScreenError::validation(
                "cannot fit a classifier on an empty matrix",
            ));
        }
        if n_samples != y.len() {
            return Err(ScreenError::validation(format!(
                "feature matrix has {n_samples} rows but {} labels were given",
                y.len()
            )));
        }

        let feature_means = x
            .mean_axis(Axis(0))
            .expect("n_samples checked non-zero");
        let feature_stds = x.std_axis(Axis(0), 0.0).mapv(|s| if s > 0.0 { s } else { 1.0 });

        let state = FittedState {
            weights: Array1::zeros(n_features),
            intercept: 0.0,
            feature_means,
            feature_stds,
        };
        let standardized = Self::standardize(&state, x);

        let mut weights = state.weights;
        let mut intercept = state.intercept;
        let n = n_samples as f64;

        for _ in 0..self.n_iterations {
            let probabilities =
                (standardized.dot(&weights) + intercept).mapv(sigmoid);
            let residuals = &probabilities - &y;

            let weight_gradient = standardized.t().dot(&residuals) / n;
            let intercept_gradient = residuals.sum() / n;

            weights = weights - weight_gradient * self.learning_rate;
            intercept -= intercept_gradient * self.learning_rate;
        }

        self.fitted = Some(FittedState {
            weights,
            intercept,
            feature_means: state.feature_means,
            feature_stds: state.feature_stds,
        });
        Ok(())
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let state = self
            .fitted
            .as_ref()
            .ok_or_else(|| ScreenError::validation("predict_proba called before fit"))?;

        if x.ncols() != state.weights.len() {
            return Err(ScreenError::validation(format!(
                "matrix has {} columns but the model was fitted on {}",
                x.ncols(),
                state.weights.len()
            )));
        }

        let standardized = Self::standardize(state, x);
        let positive = Self::decision(state, &standardized).mapv(sigmoid);

        let mut probabilities = Array2::zeros((x.nrows(), 2));
        for (i, p) in positive.iter().enumerate() {
            probabilities[[i, 0]] = 1.0 - p;
            probabilities[[i, 1]] = *p;
        }
        Ok(probabilities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_fit_separable_single_feature() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut model = LogisticRegression::default();
        model.fit(x.view(), y.view()).unwrap();
        let probabilities = model.predict_proba(x.view()).unwrap();

        assert_eq!(probabilities.dim(), (6, 2));
        // negatives score low, positives high
        assert!(probabilities[[0, 1]] < 0.5);
        assert!(probabilities[[5, 1]] > 0.5);
        // monotone in the feature
        assert!(probabilities[[0, 1]] < probabilities[[1, 1]]);
        assert!(probabilities[[3, 1]] < probabilities[[5, 1]]);
    }

    #[test]
    fn test_probability_rows_sum_to_one() {
        let x = array![[0.0], [5.0], [9.0]];
        let y = array![0.0, 1.0, 1.0];

        let mut model = LogisticRegression::default();
        model.fit(x.view(), y.view()).unwrap();
        let probabilities = model.predict_proba(x.view()).unwrap();

        for row in probabilities.rows() {
            assert_abs_diff_eq!(row[0] + row[1], 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_fit_rejects_shape_mismatch() {
        let x = array![[1.0], [2.0]];
        let y = array![0.0, 1.0, 1.0];

        let mut model = LogisticRegression::default();
        assert!(model.fit(x.view(), y.view()).is_err());
    }

    #[test]
    fn test_predict_before_fit_is_an_error() {
        let model = LogisticRegression::default();
        let x = array![[1.0]];
        assert!(model.predict_proba(x.view()).is_err());
    }

    #[test]
    fn test_constant_feature_does_not_blow_up() {
        // zero variance column: standardization must not divide by zero
        let x = array![[3.0], [3.0], [3.0], [3.0]];
        let y = array![0.0, 1.0, 0.0, 1.0];

        let mut model = LogisticRegression::default();
        model.fit(x.view(), y.view()).unwrap();
        let probabilities = model.predict_proba(x.view()).unwrap();
        for row in probabilities.rows() {
            assert!(row[1].is_finite());
            assert_abs_diff_eq!(row[1], 0.5, epsilon = 1e-6);
        }
    }
}

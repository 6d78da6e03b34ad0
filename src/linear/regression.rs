//! Least-squares trend regression over a season time index.

use linregress::fit_low_level_regression_model;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;

use crate::linear::matrix::{Matrix, SingularMatrix};

/// A single column of the design matrix, resolved from the time index `t`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Display)]
pub enum Regressor {
    Intercept,
    Trend,
    /// `max(0, t - knot)`: a change in slope from the knot onwards.
    Hinge(f64),
}
impl Regressor {
    pub fn resolve(&self, t: f64) -> f64 {
        match self {
            Regressor::Intercept => 1.,
            Regressor::Trend => t,
            Regressor::Hinge(knot) => f64::max(0., t - knot),
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Regressor::Intercept)
    }
}

#[derive(Debug, Error)]
pub enum RegressionError {
    #[error("at least two regressors must be present")]
    TooFewRegressors,

    #[error("exactly one {} regressor must be present", Regressor::Intercept)]
    Intercept,

    #[error("{samples} sample(s) cannot determine {regressors} coefficients")]
    Underdetermined { samples: usize, regressors: usize },

    #[error("design is degenerate: {0}")]
    Singular(#[from] SingularMatrix),

    #[error("least-squares fit failed: {0}")]
    Fit(#[from] linregress::Error),

    #[error("fitted coefficient for {0} is not finite")]
    NonFinite(Regressor),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictor {
    pub regressors: Vec<Regressor>,
    pub coefficients: Vec<f64>,
}
impl Predictor {
    pub fn design_row(&self, t: f64) -> Vec<f64> {
        self.regressors.iter().map(|regressor| regressor.resolve(t)).collect()
    }

    pub fn predict(&self, t: f64) -> f64 {
        self.regressors
            .iter()
            .zip(&self.coefficients)
            .map(|(regressor, coefficient)| coefficient * regressor.resolve(t))
            .sum()
    }
}

pub(crate) fn validate_regressors(regressors: &[Regressor]) -> Result<(), RegressionError> {
    if regressors.len() < 2 {
        return Err(RegressionError::TooFewRegressors);
    }
    let constants = regressors
        .iter()
        .filter(|regressor| regressor.is_constant())
        .count();
    if constants != 1 {
        return Err(RegressionError::Intercept);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegressionModel {
    pub predictor: Predictor,
    /// Present only when the system is over-determined.
    pub std_errors: Option<Vec<f64>>,
    pub r_squared: Option<f64>,
    /// `√(SSR / df)`; absent when no residual degree of freedom remains.
    pub residual_std_error: Option<f64>,
    pub degrees_of_freedom: usize,
    pub samples: usize,
    /// `(XᵀX)⁻¹`, the unscaled coefficient covariance.
    pub unscaled_covariance: Matrix<f64>,
}
impl RegressionModel {
    /// Fits `y ~ Σ regressor(t)` over `(t, y)` samples.
    ///
    /// Over-determined systems go through linregress; an exactly determined system (as many
    /// samples as regressors) is solved from the normal equations, leaving no residual
    /// degrees of freedom.
    pub fn fit(samples: &[(f64, f64)], regressors: Vec<Regressor>) -> Result<Self, RegressionError> {
        validate_regressors(&regressors)?;
        let (rows, cols) = (samples.len(), regressors.len());
        if rows < cols {
            return Err(RegressionError::Underdetermined {
                samples: rows,
                regressors: cols,
            });
        }

        let mut design = Matrix::allocate(rows, cols);
        let mut response = Vec::with_capacity(rows);
        for (row, &(t, y)) in samples.iter().enumerate() {
            for (col, regressor) in regressors.iter().enumerate() {
                design[(row, col)] = regressor.resolve(t);
            }
            response.push(y);
        }
        let unscaled_covariance = design.gram().invert()?;

        let (coefficients, std_errors, r_squared) = if rows > cols {
            let mut subset = Matrix::allocate(rows, 1 + cols);
            for (row, design_row) in design.into_iter().enumerate() {
                let subset_row = subset.row_slice_mut(row);
                subset_row[0] = response[row];
                subset_row[1..].copy_from_slice(design_row);
            }
            let model = fit_low_level_regression_model(subset.flatten(), rows, 1 + cols)?;
            (
                model.parameters().to_vec(),
                Some(model.se().to_vec()),
                Some(model.rsquared()),
            )
        } else {
            let coefficients = unscaled_covariance.mul_vec(&design.transpose_mul(&response));
            (coefficients, None, None)
        };

        if let Some(index) = coefficients.iter().position(|coefficient| !coefficient.is_finite()) {
            return Err(RegressionError::NonFinite(regressors[index].clone()));
        }

        let predictor = Predictor {
            regressors,
            coefficients,
        };
        let sum_sq_residual: f64 = samples
            .iter()
            .map(|&(t, y)| (y - predictor.predict(t)).powi(2))
            .sum();
        let degrees_of_freedom = rows - cols;
        let residual_std_error = if degrees_of_freedom > 0 {
            Some((sum_sq_residual / degrees_of_freedom as f64).sqrt())
        } else {
            None
        };

        Ok(Self {
            predictor,
            std_errors,
            r_squared,
            residual_std_error,
            degrees_of_freedom,
            samples: rows,
            unscaled_covariance,
        })
    }

    /// `xᵀ(XᵀX)⁻¹x` at time index `t`; scales the variance of the fitted mean.
    pub fn leverage(&self, t: f64) -> f64 {
        self.unscaled_covariance
            .quadratic_form(&self.predictor.design_row(t))
    }
}

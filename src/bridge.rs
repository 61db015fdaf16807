//! Closed-form Gaussian bridge between the open and close return
//! distributions.
//!
//! Each endpoint distribution is summarised by a Gaussian. The path
//! interpolates the mean linearly and the variance linearly in normalized
//! time `t ∈ [0, 1]`, so `σ(t) = sqrt(σ₀² + (σ₁² − σ₀²)·t)`. There is no
//! solver: every quantity below is an explicit formula.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::returns::{ReturnSample, SampleWindow};
use crate::stats::{mean, pairwise_sum};

pub const MIN_OBSERVATIONS: usize = 2;
pub const MIN_TIME_STEPS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianFit {
    pub mean: f64,
    pub std_dev: f64,
    pub observations: usize,
}

impl GaussianFit {
    /// Sample mean and unbiased (N−1) standard deviation, both over pairwise sums.
    pub fn from_sample(sample: &ReturnSample) -> Result<Self, BridgeError> {
        let values = sample.values();
        if values.len() < MIN_OBSERVATIONS {
            return Err(BridgeError::InsufficientData {
                window: sample.window(),
                observations: values.len(),
            });
        }

        let n = values.len() as f64;
        let mean = pairwise_sum(values) / n;
        let squared: Vec<f64> = values
            .iter()
            .map(|v| {
                let d = mean - *v;
                d * d
            })
            .collect();
        let variance = pairwise_sum(&squared) / (n - 1.0);

        Ok(Self {
            mean,
            std_dev: variance.sqrt(),
            observations: values.len(),
        })
    }

    pub fn variance(&self) -> f64 {
        self.std_dev * self.std_dev
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BridgePoint {
    pub t: f64,
    pub mean: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgePath {
    pub points: Vec<BridgePoint>,
}

impl BridgePath {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.t).collect()
    }

    pub fn means(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.mean).collect()
    }

    pub fn std_devs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.std_dev).collect()
    }
}

/// `|drift| / volatility`, or `Undefined` when the volatility is zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReversionStrength {
    Value(f64),
    Undefined,
}

impl ReversionStrength {
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(v),
            Self::Undefined => None,
        }
    }
}

impl fmt::Display for ReversionStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v:.4}"),
            Self::Undefined => f.write_str("undefined"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BridgeSummary {
    pub drift: f64,
    pub volatility: f64,
    pub reversion_strength: ReversionStrength,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeFit {
    pub open: GaussianFit,
    pub close: GaussianFit,
    pub path: BridgePath,
    pub summary: BridgeSummary,
}

#[derive(Debug, Error, PartialEq)]
pub enum BridgeError {
    #[error("{window} sample has {observations} observations; at least 2 are required")]
    InsufficientData {
        window: SampleWindow,
        observations: usize,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub fn fit(
    open: &ReturnSample,
    close: &ReturnSample,
    steps: usize,
) -> Result<BridgeFit, BridgeError> {
    if steps < MIN_TIME_STEPS {
        return Err(BridgeError::InvalidConfiguration(format!(
            "time_steps must be >= {MIN_TIME_STEPS}, got {steps}"
        )));
    }

    let open_fit = GaussianFit::from_sample(open)?;
    let close_fit = GaussianFit::from_sample(close)?;
    let fit = fit_gaussians(open_fit, close_fit, steps)?;

    info!(
        component = "bridge",
        event = "bridge.fit.finish",
        steps,
        open_mean = fit.open.mean,
        open_std_dev = fit.open.std_dev,
        close_mean = fit.close.mean,
        close_std_dev = fit.close.std_dev,
        drift = fit.summary.drift,
        volatility = fit.summary.volatility,
        reversion_strength = %fit.summary.reversion_strength
    );

    Ok(fit)
}

pub fn fit_gaussians(
    open: GaussianFit,
    close: GaussianFit,
    steps: usize,
) -> Result<BridgeFit, BridgeError> {
    if steps < MIN_TIME_STEPS {
        return Err(BridgeError::InvalidConfiguration(format!(
            "time_steps must be >= {MIN_TIME_STEPS}, got {steps}"
        )));
    }

    let dt = 1.0 / (steps - 1) as f64;
    let last = steps - 1;
    let open_var = open.variance();
    let var_delta = close.variance() - open_var;
    let mean_delta = close.mean - open.mean;

    let points: Vec<BridgePoint> = (0..steps)
        .map(|i| {
            if i == 0 {
                return BridgePoint {
                    t: 0.0,
                    mean: open.mean,
                    std_dev: open.std_dev,
                };
            }
            if i == last {
                return BridgePoint {
                    t: 1.0,
                    mean: close.mean,
                    std_dev: close.std_dev,
                };
            }
            let t = i as f64 * dt;
            BridgePoint {
                t,
                mean: open.mean + mean_delta * t,
                // convex combination of two variances; clamp only absorbs rounding
                std_dev: (open_var + var_delta * t).max(0.0).sqrt(),
            }
        })
        .collect();

    let summary = summarize(&points, dt);

    Ok(BridgeFit {
        open,
        close,
        path: BridgePath { points },
        summary,
    })
}

fn summarize(points: &[BridgePoint], dt: f64) -> BridgeSummary {
    let diffs: Vec<f64> = points
        .windows(2)
        .map(|pair| (pair[1].mean - pair[0].mean) / dt)
        .collect();
    let std_devs: Vec<f64> = points.iter().map(|p| p.std_dev).collect();
    let drift = mean(&diffs).unwrap_or(0.0);
    let volatility = mean(&std_devs).unwrap_or(0.0);

    let reversion_strength = if volatility > 0.0 {
        let ratio = drift.abs() / volatility;
        if ratio.is_finite() {
            ReversionStrength::Value(ratio)
        } else {
            ReversionStrength::Undefined
        }
    } else {
        ReversionStrength::Undefined
    };

    BridgeSummary {
        drift,
        volatility,
        reversion_strength,
    }
}

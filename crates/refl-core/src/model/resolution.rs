use crate::domain::{ReflError, ReflResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_RESOLUTION_PERCENT: f64 = 5.0;

/// Instrumental smearing as a function of momentum transfer.
///
/// The percentage variant is written with the historical `PercentageFhwm`
/// tag; both spellings are accepted on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "smearing")]
pub enum ResolutionFunction {
    #[serde(rename = "PercentageFhwm", alias = "PercentageFwhm")]
    PercentageFwhm { constant: f64 },
    LinearSpline {
        q_data_points: Vec<f64>,
        fwhm_values: Vec<f64>,
    },
}

impl Default for ResolutionFunction {
    fn default() -> Self {
        Self::PercentageFwhm {
            constant: DEFAULT_RESOLUTION_PERCENT,
        }
    }
}

impl ResolutionFunction {
    pub fn percentage_fwhm(constant: f64) -> ReflResult<Self> {
        let resolution = Self::PercentageFwhm { constant };
        resolution.validate()?;
        Ok(resolution)
    }

    pub fn linear_spline(q_data_points: Vec<f64>, fwhm_values: Vec<f64>) -> ReflResult<Self> {
        let resolution = Self::LinearSpline {
            q_data_points,
            fwhm_values,
        };
        resolution.validate()?;
        Ok(resolution)
    }

    pub fn validate(&self) -> ReflResult<()> {
        match self {
            Self::PercentageFwhm { constant } => {
                if !constant.is_finite() || *constant < 0.0 {
                    return Err(ReflError::validation(
                        "VALIDATION.RESOLUTION",
                        format!("resolution percentage must be finite and non-negative, got {}", constant),
                    ));
                }
            }
            Self::LinearSpline {
                q_data_points,
                fwhm_values,
            } => {
                if q_data_points.is_empty() || q_data_points.len() != fwhm_values.len() {
                    return Err(ReflError::validation(
                        "VALIDATION.RESOLUTION",
                        format!(
                            "spline needs matching non-empty q and fwhm arrays, got {} and {}",
                            q_data_points.len(),
                            fwhm_values.len()
                        ),
                    ));
                }
                if q_data_points.windows(2).any(|pair| pair[1] <= pair[0])
                    || q_data_points.iter().chain(fwhm_values).any(|value| !value.is_finite())
                {
                    return Err(ReflError::validation(
                        "VALIDATION.RESOLUTION",
                        "spline q points must be finite and strictly increasing",
                    ));
                }
            }
        }
        Ok(())
    }

    /// FWHM at every requested `q`. The spline is clamped to its end values
    /// outside the tabulated range.
    pub fn smearing(&self, q: &[f64]) -> Vec<f64> {
        match self {
            Self::PercentageFwhm { constant } => vec![*constant; q.len()],
            Self::LinearSpline {
                q_data_points,
                fwhm_values,
            } => q
                .iter()
                .map(|point| interpolate(q_data_points, fwhm_values, *point))
                .collect(),
        }
    }
}

fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let (Some(first), Some(last)) = (xs.first(), xs.last()) else {
        return 0.0;
    };
    if x <= *first {
        return ys[0];
    }
    if x >= *last {
        return ys[ys.len() - 1];
    }
    let upper = xs.partition_point(|candidate| *candidate <= x);
    let lower = upper - 1;
    let span = xs[upper] - xs[lower];
    let weight = (x - xs[lower]) / span;
    ys[lower] * (1.0 - weight) + ys[upper] * weight
}

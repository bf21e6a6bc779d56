use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ValidationError, ValuationError};

/// Estimated growth rates are clamped into this band before projection.
/// Anything outside it says more about accounting noise than about the
/// business.
pub const GROWTH_RATE_FLOOR: f64 = -0.20;
pub const GROWTH_RATE_CAP: f64 = 0.50;

const MIN_HISTORY_YEARS: usize = 2;

/// How the FCF growth rate is derived from history (or supplied directly).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthMethod {
    /// Mean of year-over-year growth observations.
    Average,
    /// Compound annual growth rate across the window.
    Cagr,
    /// Latest year-over-year growth only.
    Recent,
    /// User-supplied rate as a fraction (0.05 = 5%).
    Manual(f64),
}

impl GrowthMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::Cagr => "cagr",
            Self::Recent => "recent",
            Self::Manual(_) => "manual",
        }
    }
}

impl Display for GrowthMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrowthMethod {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "average" => Ok(Self::Average),
            "cagr" => Ok(Self::Cagr),
            "recent" => Ok(Self::Recent),
            other => Err(ValidationError::InvalidGrowthMethod {
                value: other.to_owned(),
            }),
        }
    }
}

/// One year-over-year observation, kept for the breakdown view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthObservation {
    /// FCF of the more recent year.
    pub current: f64,
    /// FCF of the prior year.
    pub previous: f64,
    /// (current - previous) / |previous|
    pub rate: f64,
}

/// Growth estimate plus the observations it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthEstimate {
    pub method: GrowthMethod,
    /// Clamped rate actually used for projection.
    pub rate: f64,
    /// Rate before clamping.
    pub raw_rate: f64,
    pub observations: Vec<GrowthObservation>,
}

impl GrowthEstimate {
    pub fn was_clamped(&self) -> bool {
        (self.rate - self.raw_rate).abs() > f64::EPSILON
    }
}

/// Estimate the FCF growth rate from history, newest value first.
///
/// Manual rates skip the history entirely but still get clamped, matching
/// the bounds applied to estimated rates.
pub fn estimate_growth_rate(
    fcf_history: &[f64],
    method: GrowthMethod,
) -> Result<GrowthEstimate, ValuationError> {
    if let GrowthMethod::Manual(rate) = method {
        if !rate.is_finite() {
            return Err(ValuationError::Validation(
                ValidationError::NonFiniteValue { field: "growth_rate" },
            ));
        }
        return Ok(GrowthEstimate {
            method,
            rate: clamp_rate(rate),
            raw_rate: rate,
            observations: Vec::new(),
        });
    }

    if fcf_history.len() < MIN_HISTORY_YEARS {
        return Err(ValuationError::InsufficientHistory {
            needed: MIN_HISTORY_YEARS,
            found: fcf_history.len(),
        });
    }

    let observations = year_over_year(fcf_history);

    let raw_rate = match method {
        GrowthMethod::Average => {
            if observations.is_empty() {
                return Err(ValuationError::NoUsableObservation);
            }
            observations.iter().map(|obs| obs.rate).sum::<f64>() / observations.len() as f64
        }
        GrowthMethod::Cagr => {
            let newest = fcf_history[0];
            let oldest = fcf_history[fcf_history.len() - 1];
            if oldest == 0.0 {
                return Err(ValuationError::NoUsableObservation);
            }
            let periods = (fcf_history.len() - 1) as f64;
            (newest / oldest.abs()).powf(1.0 / periods) - 1.0
        }
        GrowthMethod::Recent => {
            let newest = fcf_history[0];
            let previous = fcf_history[1];
            if previous == 0.0 {
                return Err(ValuationError::NoUsableObservation);
            }
            (newest - previous) / previous.abs()
        }
        GrowthMethod::Manual(_) => unreachable!("manual handled above"),
    };

    if !raw_rate.is_finite() {
        return Err(ValuationError::NoUsableObservation);
    }

    Ok(GrowthEstimate {
        method,
        rate: clamp_rate(raw_rate),
        raw_rate,
        observations,
    })
}

fn year_over_year(fcf_history: &[f64]) -> Vec<GrowthObservation> {
    fcf_history
        .windows(2)
        .filter_map(|pair| {
            let (current, previous) = (pair[0], pair[1]);
            if previous == 0.0 {
                return None;
            }
            Some(GrowthObservation {
                current,
                previous,
                rate: (current - previous) / previous.abs(),
            })
        })
        .collect()
}

fn clamp_rate(rate: f64) -> f64 {
    rate.clamp(GROWTH_RATE_FLOOR, GROWTH_RATE_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Newest first: 133.1, 121, 110, 100 is a clean 10% grower.
    const STEADY: [f64; 4] = [133.1, 121.0, 110.0, 100.0];

    #[test]
    fn average_method_means_year_over_year_rates() {
        let estimate =
            estimate_growth_rate(&STEADY, GrowthMethod::Average).expect("must estimate");
        assert!((estimate.rate - 0.10).abs() < 1e-9);
        assert_eq!(estimate.observations.len(), 3);
    }

    #[test]
    fn cagr_method_compounds_over_the_window() {
        let estimate = estimate_growth_rate(&STEADY, GrowthMethod::Cagr).expect("must estimate");
        // (133.1 / 100)^(1/3) - 1 = 10%
        assert!((estimate.rate - 0.10).abs() < 1e-9);
    }

    #[test]
    fn recent_method_uses_latest_pair_only() {
        let history = [150.0, 100.0, 100.0];
        let estimate =
            estimate_growth_rate(&history, GrowthMethod::Recent).expect("must estimate");
        assert!((estimate.rate - 0.50).abs() < 1e-9);
    }

    #[test]
    fn estimates_are_clamped_to_the_band() {
        let history = [300.0, 100.0];
        let estimate =
            estimate_growth_rate(&history, GrowthMethod::Recent).expect("must estimate");
        assert_eq!(estimate.rate, GROWTH_RATE_CAP);
        assert!((estimate.raw_rate - 2.0).abs() < 1e-9);
        assert!(estimate.was_clamped());
    }

    #[test]
    fn manual_rates_are_clamped_too() {
        let estimate =
            estimate_growth_rate(&[], GrowthMethod::Manual(-0.9)).expect("must estimate");
        assert_eq!(estimate.rate, GROWTH_RATE_FLOOR);
    }

    #[test]
    fn one_year_of_history_is_rejected() {
        let err = estimate_growth_rate(&[100.0], GrowthMethod::Average).expect_err("must fail");
        assert!(matches!(
            err,
            ValuationError::InsufficientHistory { needed: 2, found: 1 }
        ));
    }

    #[test]
    fn zero_denominators_are_skipped() {
        // Middle year is zero; only one usable observation remains.
        let history = [120.0, 0.0, 100.0];
        let estimate =
            estimate_growth_rate(&history, GrowthMethod::Average).expect("must estimate");
        assert_eq!(estimate.observations.len(), 1);
    }

    #[test]
    fn recent_with_zero_previous_year_is_rejected() {
        let err =
            estimate_growth_rate(&[120.0, 0.0], GrowthMethod::Recent).expect_err("must fail");
        assert!(matches!(err, ValuationError::NoUsableObservation));
    }

    #[test]
    fn negative_previous_year_divides_by_magnitude() {
        // -100 -> 50 is an improvement; |previous| keeps the sign sensible.
        let history = [50.0, -100.0];
        let estimate =
            estimate_growth_rate(&history, GrowthMethod::Recent).expect("must estimate");
        assert!((estimate.raw_rate - 1.5).abs() < 1e-9);
    }

    #[test]
    fn parses_method_names() {
        assert_eq!(
            "CAGR".parse::<GrowthMethod>().expect("must parse"),
            GrowthMethod::Cagr
        );
        assert!("manual".parse::<GrowthMethod>().is_err());
    }
}

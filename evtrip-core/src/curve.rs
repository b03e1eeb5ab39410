//! Degradation-risk calibration curve
//!
//! Maps cumulative distance driven (km) to a degradation-risk probability by
//! piecewise-linear interpolation over a small table of control points.

use crate::units::{Kilometers, Probability};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One calibration point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub distance_km: f64,
    pub probability: f64,
}

impl CurvePoint {
    pub fn new(distance_km: f64, probability: f64) -> Self {
        Self {
            distance_km,
            probability,
        }
    }
}

/// Malformed calibration table
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CurveError {
    #[error("degradation curve has no control points")]
    Empty,

    #[error("control point {index} has a non-finite coordinate")]
    NonFinite { index: usize },

    #[error("control point {index} distance {distance_km} km is below the previous point's {previous_km} km")]
    NonMonotoneDistance {
        index: usize,
        distance_km: f64,
        previous_km: f64,
    },

    #[error("control point {index} probability {probability} is outside [0, 1]")]
    ProbabilityOutOfRange { index: usize, probability: f64 },
}

/// Validated, immutable calibration curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CurvePoint>", into = "Vec<CurvePoint>")]
pub struct DegradationCurve {
    points: Vec<CurvePoint>,
}

impl DegradationCurve {
    pub fn new(points: Vec<CurvePoint>) -> Result<Self, CurveError> {
        if points.is_empty() {
            return Err(CurveError::Empty);
        }

        for (index, point) in points.iter().enumerate() {
            if !point.distance_km.is_finite() || !point.probability.is_finite() {
                return Err(CurveError::NonFinite { index });
            }
            if !(0.0..=1.0).contains(&point.probability) {
                return Err(CurveError::ProbabilityOutOfRange {
                    index,
                    probability: point.probability,
                });
            }
            if index > 0 {
                let previous_km = points[index - 1].distance_km;
                if point.distance_km < previous_km {
                    return Err(CurveError::NonMonotoneDistance {
                        index,
                        distance_km: point.distance_km,
                        previous_km,
                    });
                }
            }
        }

        Ok(Self { points })
    }

    /// Build from `(distance_km, probability)` pairs
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, CurveError> {
        Self::new(
            pairs
                .iter()
                .map(|&(d, p)| CurvePoint::new(d, p))
                .collect(),
        )
    }

    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Risk probability at `distance`, clamped flat outside the table
    pub fn interpolate(&self, distance: Kilometers) -> Probability {
        let x = distance.0;
        // `new` guarantees at least one point
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];

        if x <= first.distance_km {
            return Probability::new(first.probability);
        }
        if x >= last.distance_km {
            return Probability::new(last.probability);
        }

        // First point strictly to the right of x; exists since x < last
        let upper = self.points.partition_point(|p| p.distance_km <= x);
        let hi = self.points[upper];
        let lo = self.points[upper - 1];

        let span = hi.distance_km - lo.distance_km;
        if span <= 0.0 {
            return Probability::new(hi.probability);
        }
        let t = (x - lo.distance_km) / span;
        Probability::new(lo.probability + (hi.probability - lo.probability) * t)
    }
}

impl Default for DegradationCurve {
    fn default() -> Self {
        Self {
            points: vec![
                CurvePoint::new(0.0, 0.0),
                CurvePoint::new(60.0, 0.0),
                CurvePoint::new(100.0, 1.0),
            ],
        }
    }
}

impl TryFrom<Vec<CurvePoint>> for DegradationCurve {
    type Error = CurveError;

    fn try_from(points: Vec<CurvePoint>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<DegradationCurve> for Vec<CurvePoint> {
    fn from(curve: DegradationCurve) -> Self {
        curve.points
    }
}

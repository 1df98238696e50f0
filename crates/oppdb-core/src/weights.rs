//! Weight set for the five opportunity scoring dimensions.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Maximum allowed distance between the weight sum and `1.0`.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Validated weights for market demand, pain intensity, monetization
/// potential, market gap and technical feasibility.
///
/// Construct through [`ScoringWeights::new`] or [`ScoringWeights::parse`];
/// both reject sets that do not sum to `1.0`. Serde goes through the same
/// check via a five-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 5]", into = "[f64; 5]")]
pub struct ScoringWeights {
    market_demand: f64,
    pain_intensity: f64,
    monetization_potential: f64,
    market_gap: f64,
    technical_feasibility: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self::CANONICAL
    }
}

impl TryFrom<[f64; 5]> for ScoringWeights {
    type Error = ConfigError;

    fn try_from([a, b, c, d, e]: [f64; 5]) -> Result<Self, Self::Error> {
        Self::new(a, b, c, d, e)
    }
}

impl From<ScoringWeights> for [f64; 5] {
    fn from(weights: ScoringWeights) -> Self {
        weights.as_array()
    }
}

impl ScoringWeights {
    pub const CANONICAL: Self = Self {
        market_demand: 0.20,
        pain_intensity: 0.25,
        monetization_potential: 0.30,
        market_gap: 0.15,
        technical_feasibility: 0.10,
    };

    /// Build a weight set, rejecting negative weights and sums away from `1.0`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidWeights`] when the set is not a valid
    /// convex combination.
    pub fn new(
        market_demand: f64,
        pain_intensity: f64,
        monetization_potential: f64,
        market_gap: f64,
        technical_feasibility: f64,
    ) -> Result<Self, ConfigError> {
        let weights = Self {
            market_demand,
            pain_intensity,
            monetization_potential,
            market_gap,
            technical_feasibility,
        };
        weights.validate()?;
        Ok(weights)
    }

    /// Parse a comma-separated list of exactly five weights.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnvVar`] for malformed input, or
    /// [`ConfigError::InvalidWeights`] if the parsed set does not sum to `1.0`.
    pub fn parse(var: &str, raw: &str) -> Result<Self, ConfigError> {
        let values = raw
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })?;

        let &[a, b, c, d, e] = values.as_slice() else {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("expected 5 weights, got {}", values.len()),
            });
        };

        Self::new(a, b, c, d, e)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let all = self.as_array();
        let sum: f64 = all.iter().sum();
        if all.iter().any(|w| !w.is_finite() || *w < 0.0)
            || (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE
        {
            return Err(ConfigError::InvalidWeights { sum });
        }
        Ok(())
    }

    /// Weights in dimension order.
    #[must_use]
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.market_demand,
            self.pain_intensity,
            self.monetization_potential,
            self.market_gap,
            self.technical_feasibility,
        ]
    }

    #[must_use]
    pub fn market_demand(&self) -> f64 {
        self.market_demand
    }

    #[must_use]
    pub fn pain_intensity(&self) -> f64 {
        self.pain_intensity
    }

    #[must_use]
    pub fn monetization_potential(&self) -> f64 {
        self.monetization_potential
    }

    #[must_use]
    pub fn market_gap(&self) -> f64 {
        self.market_gap
    }

    #[must_use]
    pub fn technical_feasibility(&self) -> f64 {
        self.technical_feasibility
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_weights_sum_to_one() {
        let sum: f64 = ScoringWeights::CANONICAL.as_array().iter().sum();
        assert!((sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE, "sum was {sum}");
        assert!(ScoringWeights::CANONICAL.validate().is_ok());
    }

    #[test]
    fn rejects_set_that_sums_below_one() {
        // 20/25/20/10/5 only reaches 0.80.
        let err = ScoringWeights::new(0.20, 0.25, 0.20, 0.10, 0.05).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWeights { sum } if (sum - 0.80).abs() < 1e-9));
    }

    #[test]
    fn rejects_negative_weight_even_if_sum_is_one() {
        assert!(ScoringWeights::new(0.5, 0.5, 0.3, -0.3, 0.0).is_err());
    }

    #[test]
    fn accepts_sum_within_tolerance() {
        assert!(ScoringWeights::new(0.2, 0.25, 0.3, 0.15, 0.100_000_000_5).is_ok());
    }

    #[test]
    fn parse_reads_five_values() {
        let w = ScoringWeights::parse("W", "0.2, 0.25,0.3,0.15 ,0.1").unwrap();
        assert_eq!(w, ScoringWeights::CANONICAL);
    }

    #[test]
    fn parse_rejects_wrong_arity() {
        let err = ScoringWeights::parse("W", "0.5,0.5").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "W"));
    }

    #[test]
    fn deserialize_rejects_set_that_sums_below_one() {
        let err = serde_json::from_str::<ScoringWeights>("[0.2, 0.25, 0.2, 0.1, 0.05]").unwrap_err();
        assert!(err.to_string().contains("0.8"), "unexpected error: {err}");
    }

    #[test]
    fn deserialize_accepts_canonical_set() {
        let json = serde_json::to_string(&ScoringWeights::CANONICAL).unwrap();
        assert_eq!(json, "[0.2,0.25,0.3,0.15,0.1]");
        let w: ScoringWeights = serde_json::from_str(&json).unwrap();
        assert_eq!(w, ScoringWeights::CANONICAL);
    }

    #[test]
    fn parse_rejects_non_numeric() {
        assert!(matches!(
            ScoringWeights::parse("W", "a,b,c,d,e"),
            Err(ConfigError::InvalidEnvVar { .. })
        ));
    }
}

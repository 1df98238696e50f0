//! Five-dimension opportunity scoring with the function-count simplicity gate.
//!
//! The simplicity gate runs after scoring. Disqualification overrides the
//! priority band no matter how high the weighted score is.

use oppdb_core::ScoringWeights;
use serde::Serialize;
use thiserror::Error;

/// Dimension scores, each expected in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DimensionScores {
    pub market_demand: f64,
    pub pain_intensity: f64,
    pub monetization_potential: f64,
    pub market_gap: f64,
    pub technical_feasibility: f64,
}

impl DimensionScores {
    /// Clamp every dimension into `[0, 100]`; non-finite values become `0`.
    #[must_use]
    pub fn normalized(self) -> Self {
        let clamp = |v: f64| if v.is_finite() { v.clamp(0.0, 100.0) } else { 0.0 };
        Self {
            market_demand: clamp(self.market_demand),
            pain_intensity: clamp(self.pain_intensity),
            monetization_potential: clamp(self.monetization_potential),
            market_gap: clamp(self.market_gap),
            technical_feasibility: clamp(self.technical_feasibility),
        }
    }

    fn as_array(self) -> [f64; 5] {
        [
            self.market_demand,
            self.pain_intensity,
            self.monetization_potential,
            self.market_gap,
            self.technical_feasibility,
        ]
    }
}

/// Priority band for a final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Priority {
    NotRecommended,
    Monitor,
    ViableWithRefinement,
    StrongCandidate,
    ImmediateDevelopment,
}

impl Priority {
    /// Band lower bounds are inclusive; only the top band is unbounded above.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            Priority::ImmediateDevelopment
        } else if score >= 70.0 {
            Priority::StrongCandidate
        } else if score >= 55.0 {
            Priority::ViableWithRefinement
        } else if score >= 40.0 {
            Priority::Monitor
        } else {
            Priority::NotRecommended
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Priority::ImmediateDevelopment => "Immediate development",
            Priority::StrongCandidate => "Strong candidate",
            Priority::ViableWithRefinement => "Viable with refinement",
            Priority::Monitor => "Monitor",
            Priority::NotRecommended => "Not recommended",
        }
    }
}

/// Simplicity score derived from a core-function count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Simplicity {
    pub score: f64,
    pub disqualified: bool,
}

/// Fixed table: 1 → 100, 2 → 85, 3 → 70, 4+ → 0 and disqualified.
///
/// Returns `None` for zero, i.e. no functions were proposed.
#[must_use]
pub fn simplicity_for_count(count: usize) -> Option<Simplicity> {
    let (score, disqualified) = match count {
        0 => return None,
        1 => (100.0, false),
        2 => (85.0, false),
        3 => (70.0, false),
        _ => (0.0, true),
    };
    Some(Simplicity {
        score,
        disqualified,
    })
}

/// Stored metadata disagrees with the stored data it describes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("declared function count {declared} does not match {listed} listed functions")]
    FunctionCountMismatch { declared: usize, listed: usize },
    #[error("opportunity scoring counted {scored} core functions but the profile proposes {profiled}")]
    ProfileFunctionMismatch { scored: usize, profiled: usize },
}

/// Compare a declared function count against the listed functions.
///
/// # Errors
///
/// Returns [`IntegrityError::FunctionCountMismatch`] when both sides are
/// present and disagree.
pub fn check_function_count(
    declared: Option<usize>,
    functions: &[String],
) -> Result<(), IntegrityError> {
    match declared {
        Some(declared) if declared != functions.len() => {
            Err(IntegrityError::FunctionCountMismatch {
                declared,
                listed: functions.len(),
            })
        }
        _ => Ok(()),
    }
}

/// Scored and gated opportunity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunityAssessment {
    pub dimensions: DimensionScores,
    pub final_score: f64,
    pub function_count: usize,
    pub simplicity: Option<Simplicity>,
    pub priority: Priority,
    #[serde(skip)]
    pub integrity: Option<IntegrityError>,
}

impl OpportunityAssessment {
    #[must_use]
    pub fn disqualified(&self) -> bool {
        self.simplicity.is_some_and(|s| s.disqualified)
    }

    /// Re-apply the simplicity gate with the function count of the concept's
    /// profile.
    ///
    /// The gate uses the larger of the two counts. Two non-zero counts that
    /// disagree are reported in `integrity` unless an issue is already
    /// recorded there. A zero count leaves the assessment unchanged.
    #[must_use]
    pub fn gate_with_profile(mut self, profiled: usize) -> Self {
        if profiled == 0 {
            return self;
        }
        if self.function_count != 0 && self.function_count != profiled && self.integrity.is_none() {
            self.integrity = Some(IntegrityError::ProfileFunctionMismatch {
                scored: self.function_count,
                profiled,
            });
        }
        self.function_count = self.function_count.max(profiled);
        self.simplicity = simplicity_for_count(self.function_count);
        self.priority = gated_priority(self.final_score, self.simplicity);
        self
    }
}

fn gated_priority(final_score: f64, simplicity: Option<Simplicity>) -> Priority {
    if simplicity.is_some_and(|s| s.disqualified) {
        Priority::NotRecommended
    } else {
        Priority::from_score(final_score)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OpportunityScorer {
    weights: ScoringWeights,
}

impl OpportunityScorer {
    #[must_use]
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    #[must_use]
    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    /// Weighted sum of normalized dimensions.
    #[must_use]
    pub fn weighted_score(&self, dimensions: DimensionScores) -> f64 {
        self.weights
            .as_array()
            .iter()
            .zip(dimensions.normalized().as_array())
            .map(|(w, d)| w * d)
            .sum()
    }

    /// Score `dimensions`, then apply the simplicity gate for `core_functions`.
    ///
    /// A declared count that disagrees with the list is reported in
    /// `integrity`; the gate then uses the larger of the two so a mismatch can
    /// never lift a concept out of disqualification.
    #[must_use]
    pub fn assess(
        &self,
        dimensions: DimensionScores,
        core_functions: &[String],
        declared_count: Option<usize>,
    ) -> OpportunityAssessment {
        let dimensions = dimensions.normalized();
        let final_score = self.weighted_score(dimensions);

        let integrity = check_function_count(declared_count, core_functions).err();
        let function_count = declared_count
            .unwrap_or(0)
            .max(core_functions.len());
        let simplicity = simplicity_for_count(function_count);
        let priority = gated_priority(final_score, simplicity);

        OpportunityAssessment {
            dimensions,
            final_score,
            function_count,
            simplicity,
            priority,
            integrity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn functions(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("function {i}")).collect()
    }

    fn dims(a: f64, b: f64, c: f64, d: f64, e: f64) -> DimensionScores {
        DimensionScores {
            market_demand: a,
            pain_intensity: b,
            monetization_potential: c,
            market_gap: d,
            technical_feasibility: e,
        }
    }

    #[test]
    fn worked_example_scores_strong_candidate() {
        let scorer = OpportunityScorer::default();
        let assessment = scorer.assess(dims(80.0, 85.0, 75.0, 70.0, 85.0), &functions(2), Some(2));
        assert!(
            (assessment.final_score - 78.75).abs() < 1e-9,
            "got {}",
            assessment.final_score
        );
        assert_eq!(assessment.priority, Priority::StrongCandidate);
        assert_eq!(assessment.priority.label(), "Strong candidate");
        assert!(!assessment.disqualified());
        assert!(assessment.integrity.is_none());
    }

    #[test]
    fn four_functions_disqualify_a_perfect_concept() {
        let scorer = OpportunityScorer::default();
        let assessment =
            scorer.assess(dims(100.0, 100.0, 100.0, 100.0, 100.0), &functions(4), None);
        let simplicity = assessment.simplicity.unwrap();
        assert!(simplicity.score.abs() < f64::EPSILON);
        assert!(assessment.disqualified());
        assert_eq!(assessment.priority, Priority::NotRecommended);
    }

    #[test]
    fn simplicity_table() {
        assert_eq!(simplicity_for_count(0), None);
        let expect = [(1, 100.0), (2, 85.0), (3, 70.0)];
        for (count, score) in expect {
            let s = simplicity_for_count(count).unwrap();
            assert!((s.score - score).abs() < f64::EPSILON, "count {count}");
            assert!(!s.disqualified);
        }
        for count in [4, 5, 12] {
            let s = simplicity_for_count(count).unwrap();
            assert!(s.score.abs() < f64::EPSILON);
            assert!(s.disqualified);
        }
    }

    #[test]
    fn band_edges_are_closed_below() {
        assert_eq!(Priority::from_score(85.0), Priority::ImmediateDevelopment);
        assert_eq!(Priority::from_score(84.999), Priority::StrongCandidate);
        assert_eq!(Priority::from_score(70.0), Priority::StrongCandidate);
        assert_eq!(Priority::from_score(55.0), Priority::ViableWithRefinement);
        assert_eq!(Priority::from_score(40.0), Priority::Monitor);
        assert_eq!(Priority::from_score(39.99), Priority::NotRecommended);
        assert_eq!(Priority::from_score(100.0), Priority::ImmediateDevelopment);
    }

    #[test]
    fn bands_are_monotonic() {
        let mut last = Priority::NotRecommended;
        for tenth in 0..=1000 {
            let p = Priority::from_score(f64::from(tenth) / 10.0);
            assert!(p >= last);
            last = p;
        }
    }

    #[test]
    fn out_of_range_dimensions_are_clamped() {
        let scorer = OpportunityScorer::default();
        let score = scorer.weighted_score(dims(250.0, -10.0, f64::NAN, 100.0, 100.0));
        // 0.20*100 + 0 + 0 + 0.15*100 + 0.10*100
        assert!((score - 45.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn count_mismatch_is_reported_and_gate_uses_larger_side() {
        let scorer = OpportunityScorer::default();
        let assessment = scorer.assess(dims(90.0, 90.0, 90.0, 90.0, 90.0), &functions(2), Some(5));
        assert_eq!(
            assessment.integrity,
            Some(IntegrityError::FunctionCountMismatch {
                declared: 5,
                listed: 2
            })
        );
        assert!(assessment.disqualified());
        assert_eq!(assessment.priority, Priority::NotRecommended);
    }

    #[test]
    fn no_functions_means_no_gate() {
        let scorer = OpportunityScorer::default();
        let assessment = scorer.assess(dims(90.0, 90.0, 90.0, 90.0, 90.0), &[], None);
        assert!(assessment.simplicity.is_none());
        assert_eq!(assessment.priority, Priority::ImmediateDevelopment);
    }

    #[test]
    fn profile_with_more_functions_disqualifies() {
        let scorer = OpportunityScorer::default();
        let assessment = scorer
            .assess(dims(100.0, 100.0, 100.0, 100.0, 100.0), &functions(2), None)
            .gate_with_profile(5);
        assert_eq!(assessment.function_count, 5);
        assert!(assessment.disqualified());
        assert_eq!(assessment.priority, Priority::NotRecommended);
        assert_eq!(
            assessment.integrity,
            Some(IntegrityError::ProfileFunctionMismatch {
                scored: 2,
                profiled: 5
            })
        );
    }

    #[test]
    fn agreeing_profile_changes_nothing() {
        let scorer = OpportunityScorer::default();
        let assessed = scorer.assess(dims(80.0, 85.0, 75.0, 70.0, 85.0), &functions(2), None);
        assert_eq!(assessed.clone().gate_with_profile(2), assessed);
        assert_eq!(assessed.clone().gate_with_profile(0), assessed);
    }

    #[test]
    fn profile_count_gates_unscored_functions() {
        let scorer = OpportunityScorer::default();
        let assessment = scorer
            .assess(dims(90.0, 90.0, 90.0, 90.0, 90.0), &[], None)
            .gate_with_profile(3);
        assert!((assessment.simplicity.unwrap().score - 70.0).abs() < f64::EPSILON);
        assert!(assessment.integrity.is_none());
        assert_eq!(assessment.priority, Priority::ImmediateDevelopment);
    }

    #[test]
    fn check_function_count_accepts_missing_declaration() {
        assert!(check_function_count(None, &functions(3)).is_ok());
        assert!(check_function_count(Some(3), &functions(3)).is_ok());
        assert!(check_function_count(Some(1), &functions(3)).is_err());
    }
}

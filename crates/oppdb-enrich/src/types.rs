//! Typed analysis outputs and the namespaced record they flatten into.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use oppdb_core::ServiceToggles;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::scorer::{IntegrityError, OpportunityAssessment};

/// The analysis kinds the pipeline knows how to run.
///
/// Variant order is the processing order within one submission: monetization
/// must finish before the profiler starts because the profiler consumes its
/// verdict as [`Evidence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Monetization,
    Profiler,
    OpportunityScoring,
    Trust,
    MarketValidation,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 5] = [
        AnalysisKind::Monetization,
        AnalysisKind::Profiler,
        AnalysisKind::OpportunityScoring,
        AnalysisKind::Trust,
        AnalysisKind::MarketValidation,
    ];

    /// Stable service name used in configuration and statistics.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            AnalysisKind::Monetization => "monetization",
            AnalysisKind::Profiler => "profiler",
            AnalysisKind::OpportunityScoring => "opportunity_scoring",
            AnalysisKind::Trust => "trust",
            AnalysisKind::MarketValidation => "market_validation",
        }
    }

    /// Field-family prefix this kind writes under in an [`EnrichmentResult`].
    #[must_use]
    pub fn family(self) -> &'static str {
        match self {
            AnalysisKind::Monetization => "monetization",
            AnalysisKind::Profiler => "profile",
            AnalysisKind::OpportunityScoring => "opportunity",
            AnalysisKind::Trust => "trust",
            AnalysisKind::MarketValidation => "market",
        }
    }

    #[must_use]
    pub fn is_enabled(self, toggles: &ServiceToggles) -> bool {
        match self {
            AnalysisKind::Monetization => toggles.monetization,
            AnalysisKind::Profiler => toggles.profiler,
            AnalysisKind::OpportunityScoring => toggles.opportunity_scoring,
            AnalysisKind::Trust => toggles.trust,
            AnalysisKind::MarketValidation => toggles.market_validation,
        }
    }

    /// Enabled kinds in processing order.
    #[must_use]
    pub fn enabled(toggles: &ServiceToggles) -> Vec<AnalysisKind> {
        Self::ALL
            .into_iter()
            .filter(|kind| kind.is_enabled(toggles))
            .collect()
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnalysisKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown analysis kind '{s}'"))
    }
}

/// Field map produced by one or more analyses for a single submission.
///
/// Keys are `"{family}.{field}"`. [`EnrichmentResult::merge`] is additive: it
/// never replaces a key that is already present. The only sanctioned
/// overwrite is [`EnrichmentResult::set_override`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnrichmentResult(BTreeMap<String, Value>);

impl EnrichmentResult {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(kind: AnalysisKind, field: &str) -> String {
        format!("{}.{field}", kind.family())
    }

    /// Set a field if it is not already present. Returns `false` if the key
    /// was taken.
    pub fn set(&mut self, kind: AnalysisKind, field: &str, value: impl Into<Value>) -> bool {
        let key = Self::key(kind, field);
        if self.0.contains_key(&key) {
            return false;
        }
        self.0.insert(key, value.into());
        true
    }

    /// Set a field unconditionally.
    pub fn set_override(&mut self, kind: AnalysisKind, field: &str, value: impl Into<Value>) {
        self.0.insert(Self::key(kind, field), value.into());
    }

    /// Merge `other` into `self` without overwriting existing keys.
    ///
    /// Returns the keys from `other` that were refused.
    pub fn merge(&mut self, other: EnrichmentResult) -> Vec<String> {
        let mut refused = Vec::new();
        for (key, value) in other.0 {
            if self.0.contains_key(&key) {
                refused.push(key);
            } else {
                self.0.insert(key, value);
            }
        }
        refused
    }

    #[must_use]
    pub fn get(&self, kind: AnalysisKind, field: &str) -> Option<&Value> {
        self.0.get(&Self::key(kind, field))
    }

    /// Whether any field of `kind`'s family is present.
    #[must_use]
    pub fn has_family(&self, kind: AnalysisKind) -> bool {
        let prefix = format!("{}.", kind.family());
        self.0.keys().any(|key| key.starts_with(&prefix))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0.into_iter().collect())
    }
}

/// Monetization verdict for one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonetizationAnalysis {
    /// Willingness-to-pay score in `[0, 100]`.
    pub willingness_to_pay_score: f64,
    pub customer_segment: String,
    pub payment_sentiment: String,
    pub urgency_level: String,
    pub mentioned_price_points: Vec<String>,
    pub existing_payment_behavior: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Where a piece of [`Evidence`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvidenceSource {
    Copied(AnalysisKind),
    Analyzed(AnalysisKind),
}

impl EvidenceSource {
    #[must_use]
    pub fn tag(self) -> String {
        match self {
            EvidenceSource::Copied(kind) => format!("copied_{kind}"),
            EvidenceSource::Analyzed(kind) => format!("analyzed_{kind}"),
        }
    }
}

/// Tag recorded when a profile was produced without upstream evidence.
pub const NO_EVIDENCE: &str = "none";

/// Monetization verdict handed to the profiler so both analyses agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub source: EvidenceSource,
    pub willingness_to_pay_score: f64,
    pub customer_segment: String,
    pub payment_sentiment: String,
    pub urgency_level: String,
    pub mentioned_price_points: Vec<String>,
    pub existing_payment_behavior: String,
    pub confidence: f64,
}

impl Evidence {
    #[must_use]
    pub fn from_monetization(analysis: &MonetizationAnalysis, source: EvidenceSource) -> Self {
        Self {
            source,
            willingness_to_pay_score: analysis.willingness_to_pay_score,
            customer_segment: analysis.customer_segment.clone(),
            payment_sentiment: analysis.payment_sentiment.clone(),
            urgency_level: analysis.urgency_level.clone(),
            mentioned_price_points: analysis.mentioned_price_points.clone(),
            existing_payment_behavior: analysis.existing_payment_behavior.clone(),
            confidence: analysis.confidence,
        }
    }

    /// Compact text block for inclusion in a prompt.
    #[must_use]
    pub fn to_prompt_context(&self) -> String {
        let prices = if self.mentioned_price_points.is_empty() {
            "none mentioned".to_string()
        } else {
            self.mentioned_price_points.join(", ")
        };
        format!(
            "Monetization evidence ({}):\n\
             - willingness to pay: {:.0}/100\n\
             - customer segment: {}\n\
             - payment sentiment: {}\n\
             - urgency: {}\n\
             - price points: {prices}\n\
             - existing payment behavior: {}\n\
             - confidence: {:.2}",
            self.source.tag(),
            self.willingness_to_pay_score,
            self.customer_segment,
            self.payment_sentiment,
            self.urgency_level,
            self.existing_payment_behavior,
            self.confidence,
        )
    }
}

/// App-concept profile for one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileAnalysis {
    pub problem_description: String,
    pub app_concept: String,
    pub core_functions: Vec<String>,
    /// Function count as declared by the upstream payload.
    pub declared_function_count: Option<usize>,
    pub target_user: String,
    pub monetization_model: String,
    pub evidence: Option<Evidence>,
    pub integrity: Option<IntegrityError>,
}

impl ProfileAnalysis {
    #[must_use]
    pub fn with_evidence(mut self, evidence: Option<&Evidence>) -> Self {
        self.evidence = evidence.cloned();
        self
    }

    #[must_use]
    pub fn evidence_tag(&self) -> String {
        self.evidence
            .as_ref()
            .map_or_else(|| NO_EVIDENCE.to_string(), |e| e.source.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustBadge {
    High,
    Medium,
    Low,
    Unverified,
}

impl TrustBadge {
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            TrustBadge::High
        } else if score >= 50.0 {
            TrustBadge::Medium
        } else if score >= 25.0 {
            TrustBadge::Low
        } else {
            TrustBadge::Unverified
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TrustBadge::High => "high",
            TrustBadge::Medium => "medium",
            TrustBadge::Low => "low",
            TrustBadge::Unverified => "unverified",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrustValidation {
    pub trust_score: f64,
    pub badge: TrustBadge,
    pub engagement_score: f64,
    pub text_quality_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketValidation {
    /// Validation score in `[0, 100]`.
    pub validation_score: f64,
    pub competitors: Vec<String>,
    pub market_size_estimate: Option<String>,
    pub reasoning: String,
}

/// Typed output of one analysis service.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Monetization(MonetizationAnalysis),
    Profile(ProfileAnalysis),
    Opportunity(OpportunityAssessment),
    Trust(TrustValidation),
    Market(MarketValidation),
    /// Produced by the inert stand-in for a service that could not be built.
    Inert(AnalysisKind),
}

impl AnalysisOutcome {
    #[must_use]
    pub fn kind(&self) -> AnalysisKind {
        match self {
            AnalysisOutcome::Monetization(_) => AnalysisKind::Monetization,
            AnalysisOutcome::Profile(_) => AnalysisKind::Profiler,
            AnalysisOutcome::Opportunity(_) => AnalysisKind::OpportunityScoring,
            AnalysisOutcome::Trust(_) => AnalysisKind::Trust,
            AnalysisOutcome::Market(_) => AnalysisKind::MarketValidation,
            AnalysisOutcome::Inert(kind) => *kind,
        }
    }

    /// Integrity problem carried by this outcome, if any.
    #[must_use]
    pub fn integrity(&self) -> Option<&IntegrityError> {
        match self {
            AnalysisOutcome::Profile(p) => p.integrity.as_ref(),
            AnalysisOutcome::Opportunity(o) => o.integrity.as_ref(),
            _ => None,
        }
    }

    /// Flatten into namespaced fields.
    #[must_use]
    pub fn into_result(self) -> EnrichmentResult {
        let mut out = EnrichmentResult::new();
        let kind = self.kind();
        match self {
            AnalysisOutcome::Monetization(m) => {
                out.set(kind, "willingness_to_pay_score", m.willingness_to_pay_score);
                out.set(kind, "customer_segment", m.customer_segment);
                out.set(kind, "payment_sentiment", m.payment_sentiment);
                out.set(kind, "urgency_level", m.urgency_level);
                out.set(kind, "mentioned_price_points", m.mentioned_price_points);
                out.set(kind, "existing_payment_behavior", m.existing_payment_behavior);
                out.set(kind, "confidence", m.confidence);
            }
            AnalysisOutcome::Profile(p) => {
                out.set(kind, "evidence_source", p.evidence_tag());
                if let Some(evidence) = &p.evidence {
                    out.set(kind, "evidence_willingness_to_pay_score", evidence.willingness_to_pay_score);
                    out.set(kind, "evidence_customer_segment", evidence.customer_segment.clone());
                    out.set(kind, "evidence_confidence", evidence.confidence);
                }
                out.set(kind, "needs_review", p.integrity.is_some());
                out.set(kind, "problem_description", p.problem_description);
                out.set(kind, "app_concept", p.app_concept);
                out.set(kind, "function_count", p.core_functions.len());
                out.set(kind, "core_functions", p.core_functions);
                out.set(kind, "target_user", p.target_user);
                out.set(kind, "monetization_model", p.monetization_model);
            }
            AnalysisOutcome::Opportunity(o) => {
                let d = o.dimensions;
                out.set(kind, "market_demand", d.market_demand);
                out.set(kind, "pain_intensity", d.pain_intensity);
                out.set(kind, "monetization_potential", d.monetization_potential);
                out.set(kind, "market_gap", d.market_gap);
                out.set(kind, "technical_feasibility", d.technical_feasibility);
                out.set(kind, "final_score", o.final_score);
                out.set(kind, "priority", o.priority.label());
                out.set(kind, "simplicity_score", o.simplicity.map(|s| s.score));
                out.set(kind, "function_count", o.function_count);
                out.set(kind, "disqualified", o.disqualified());
                out.set(kind, "needs_review", o.integrity.is_some());
            }
            AnalysisOutcome::Trust(t) => {
                out.set(kind, "trust_score", t.trust_score);
                out.set(kind, "badge", t.badge.as_str());
                out.set(kind, "engagement_score", t.engagement_score);
                out.set(kind, "text_quality_score", t.text_quality_score);
            }
            AnalysisOutcome::Market(m) => {
                out.set(kind, "validation_score", m.validation_score);
                out.set(kind, "competitors", m.competitors);
                out.set(kind, "market_size_estimate", m.market_size_estimate);
                out.set(kind, "reasoning", m.reasoning);
            }
            AnalysisOutcome::Inert(_) => {
                out.set(kind, "status", json!("unavailable"));
            }
        }
        out
    }
}

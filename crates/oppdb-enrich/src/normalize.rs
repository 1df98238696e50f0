//! Map raw upstream payloads onto typed analysis schemas.
//!
//! LLM replies and stored prior analyses name the same fields differently
//! depending on prompt version. Every alias is resolved here, once, so
//! consumers only ever see the typed structs.

use serde_json::{Map, Value};

use crate::error::EnrichmentError;
use crate::scorer::{check_function_count, DimensionScores};
use crate::types::{AnalysisKind, MarketValidation, MonetizationAnalysis, ProfileAnalysis};

type Object = Map<String, Value>;

/// Dimension scores plus the function list an opportunity reply proposes.
#[derive(Debug, Clone, PartialEq)]
pub struct OpportunityInputs {
    pub dimensions: DimensionScores,
    pub core_functions: Vec<String>,
    pub declared_count: Option<usize>,
}

/// Strip a surrounding markdown code fence (```` ```json ... ``` ````), if any.
#[must_use]
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // Drop the info string (e.g. `json`) on the opening fence line.
    match rest.find('\n') {
        Some(idx) => rest[idx + 1..].trim(),
        None => rest.trim(),
    }
}

/// Parse an LLM reply into a JSON object.
///
/// # Errors
///
/// Returns [`EnrichmentError::Normalization`] if the reply is not a JSON object.
pub fn parse_reply(kind: AnalysisKind, content: &str) -> Result<Value, EnrichmentError> {
    let body = strip_code_fence(content);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| EnrichmentError::normalization(kind, format!("reply is not JSON: {e}")))?;
    if !value.is_object() {
        return Err(EnrichmentError::normalization(kind, "reply is not a JSON object"));
    }
    Ok(value)
}

/// # Errors
///
/// Returns [`EnrichmentError::Normalization`] if no willingness-to-pay score is present.
pub fn monetization(raw: &Value) -> Result<MonetizationAnalysis, EnrichmentError> {
    let kind = AnalysisKind::Monetization;
    let obj = object(kind, raw, &["monetization", "analysis"])?;

    let willingness_to_pay_score = number(
        obj,
        &["willingness_to_pay_score", "wtp_score", "willingness_to_pay"],
    )
    .ok_or_else(|| EnrichmentError::normalization(kind, "missing willingness_to_pay_score"))?;

    Ok(MonetizationAnalysis {
        willingness_to_pay_score: clamp_score(willingness_to_pay_score),
        customer_segment: text(obj, &["customer_segment", "segment"])
            .unwrap_or_else(unknown),
        payment_sentiment: text(obj, &["payment_sentiment", "sentiment"])
            .unwrap_or_else(unknown),
        urgency_level: text(obj, &["urgency_level", "urgency"]).unwrap_or_else(unknown),
        mentioned_price_points: list(obj, &["mentioned_price_points", "price_points", "prices"]),
        existing_payment_behavior: text(
            obj,
            &["existing_payment_behavior", "payment_behavior", "current_spend"],
        )
        .unwrap_or_else(unknown),
        confidence: confidence(obj),
    })
}

/// # Errors
///
/// Returns [`EnrichmentError::Normalization`] if neither an app concept nor a
/// problem description is present.
pub fn profile(raw: &Value) -> Result<ProfileAnalysis, EnrichmentError> {
    let kind = AnalysisKind::Profiler;
    let obj = object(kind, raw, &["profile", "analysis"])?;

    let app_concept = text(obj, &["app_concept", "concept", "app_name"]);
    let problem_description = text(obj, &["problem_description", "problem", "pain_point"]);
    if app_concept.is_none() && problem_description.is_none() {
        return Err(EnrichmentError::normalization(
            kind,
            "missing both app_concept and problem_description",
        ));
    }

    let core_functions = list(obj, &["core_functions", "functions", "core_features"]);
    let declared_function_count = count(obj, &["function_count", "core_function_count", "num_functions"]);
    let integrity = check_function_count(declared_function_count, &core_functions).err();

    Ok(ProfileAnalysis {
        problem_description: problem_description.unwrap_or_default(),
        app_concept: app_concept.unwrap_or_default(),
        core_functions,
        declared_function_count,
        target_user: text(obj, &["target_user", "target_audience", "user_persona"])
            .unwrap_or_else(unknown),
        monetization_model: text(obj, &["monetization_model", "business_model", "pricing_model"])
            .unwrap_or_else(unknown),
        evidence: None,
        integrity,
    })
}

/// # Errors
///
/// Returns [`EnrichmentError::Normalization`] if any of the five dimensions is missing.
pub fn opportunity(raw: &Value) -> Result<OpportunityInputs, EnrichmentError> {
    let kind = AnalysisKind::OpportunityScoring;
    let obj = object(kind, raw, &["opportunity", "analysis"])?;
    let scores = match obj.get("dimension_scores").or_else(|| obj.get("scores")) {
        Some(Value::Object(inner)) => inner,
        _ => obj,
    };

    let dim = |names: &[&str]| -> Result<f64, EnrichmentError> {
        number(scores, names)
            .ok_or_else(|| EnrichmentError::normalization(kind, format!("missing {}", names[0])))
    };

    let dimensions = DimensionScores {
        market_demand: dim(&["market_demand", "demand"])?,
        pain_intensity: dim(&["pain_intensity", "pain"])?,
        monetization_potential: dim(&["monetization_potential", "monetization"])?,
        market_gap: dim(&["market_gap", "competition_gap", "gap"])?,
        technical_feasibility: dim(&["technical_feasibility", "feasibility"])?,
    }
    .normalized();

    Ok(OpportunityInputs {
        dimensions,
        core_functions: list(obj, &["core_functions", "functions", "core_features"]),
        declared_count: count(obj, &["function_count", "core_function_count", "num_functions"]),
    })
}

/// # Errors
///
/// Returns [`EnrichmentError::Normalization`] if no validation score is present.
pub fn market(raw: &Value) -> Result<MarketValidation, EnrichmentError> {
    let kind = AnalysisKind::MarketValidation;
    let obj = object(kind, raw, &["market_validation", "analysis"])?;

    let validation_score = number(obj, &["validation_score", "market_validation_score", "score"])
        .ok_or_else(|| EnrichmentError::normalization(kind, "missing validation_score"))?;

    Ok(MarketValidation {
        validation_score: clamp_score(validation_score),
        competitors: list(obj, &["competitors", "competitor_names", "existing_solutions"]),
        market_size_estimate: text(obj, &["market_size_estimate", "market_size", "tam"]),
        reasoning: text(obj, &["reasoning", "rationale", "summary"]).unwrap_or_default(),
    })
}

fn unknown() -> String {
    "unknown".to_string()
}

fn clamp_score(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Confidence in `[0, 1]`; percentages are scaled down.
fn confidence(obj: &Object) -> f64 {
    match number(obj, &["confidence", "confidence_score"]) {
        Some(v) if v.is_finite() && v > 1.0 => (v / 100.0).clamp(0.0, 1.0),
        Some(v) if v.is_finite() => v.clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// Resolve the payload object, descending into one known envelope key.
fn object<'a>(
    kind: AnalysisKind,
    raw: &'a Value,
    envelopes: &[&str],
) -> Result<&'a Object, EnrichmentError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| EnrichmentError::normalization(kind, "payload is not a JSON object"))?;
    for key in envelopes {
        if let Some(Value::Object(inner)) = obj.get(*key) {
            return Ok(inner);
        }
    }
    Ok(obj)
}

fn first<'a>(obj: &'a Object, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| obj.get(*name))
        .find(|v| !v.is_null())
}

fn number(obj: &Object, names: &[&str]) -> Option<f64> {
    match first(obj, names)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn count(obj: &Object, names: &[&str]) -> Option<usize> {
    match first(obj, names)? {
        Value::Number(n) => n.as_u64().and_then(|v| usize::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    }
}

fn text(obj: &Object, names: &[&str]) -> Option<String> {
    match first(obj, names)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn list(obj: &Object, names: &[&str]) -> Vec<String> {
    let Some(value) = first(obj, names) else {
        return Vec::new();
    };
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .split([',', '\n'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

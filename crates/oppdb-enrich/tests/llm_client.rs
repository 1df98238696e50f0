//! Integration tests for `LlmClient` and the LLM-backed services using
//! wiremock HTTP mocks.

use std::sync::Arc;

use oppdb_core::Submission;
use oppdb_enrich::{
    AnalysisKind, AnalysisOutcome, AnalysisService, EnrichmentError, Evidence, EvidenceSource,
    LlmClient, MonetizationAnalysis, MonetizationAnalyzer, OpportunityAnalyzer, OpportunityScorer,
    Priority, Profiler,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str, max_retries: u32) -> LlmClient {
    LlmClient::new(base_url, "test-key", "test-model", 5, max_retries)
        .expect("client construction should not fail")
        .with_backoff_base_ms(1)
}

fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content } }
        ]
    })
}

fn submission() -> Submission {
    Submission {
        id: "t3_llm".to_string(),
        title: "How do you all handle shift swaps?".to_string(),
        body: "Our cafe has twelve part-timers and the group chat is chaos.".to_string(),
        subreddit: "smallbusiness".to_string(),
        score: Some(42),
        num_comments: Some(17),
        author: None,
        url: None,
        created_utc: None,
    }
}

#[tokio::test]
async fn complete_json_sends_model_and_parses_reply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "response_format": { "type": "json_object" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(r#"{"ok": true}"#)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 0);
    let value = client
        .complete_json(AnalysisKind::Trust, "system", "user")
        .await
        .expect("should parse reply");

    assert_eq!(value, json!({ "ok": true }));
}

#[tokio::test]
async fn fenced_reply_is_unwrapped() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("```json\n{\"validation_score\": 64}\n```")),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 0);
    let value = client
        .complete_json(AnalysisKind::MarketValidation, "system", "user")
        .await
        .expect("should parse fenced reply");

    assert_eq!(value["validation_score"], json!(64));
}

#[tokio::test]
async fn transient_status_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(r#"{"ok": 1}"#)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 2);
    let value = client
        .complete_json(AnalysisKind::Profiler, "system", "user")
        .await
        .expect("second attempt should succeed");

    assert_eq!(value, json!({ "ok": 1 }));
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 3);
    let err = client
        .complete_json(AnalysisKind::Profiler, "system", "user")
        .await
        .expect_err("401 should fail");

    match err {
        EnrichmentError::LlmStatus { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "bad key");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn non_object_reply_is_a_normalization_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("I cannot help with that")))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 0);
    let err = client
        .complete_json(AnalysisKind::Monetization, "system", "user")
        .await
        .expect_err("prose should be rejected");

    assert!(matches!(
        err,
        EnrichmentError::Normalization {
            kind: AnalysisKind::Monetization,
            ..
        }
    ));
}

#[tokio::test]
async fn empty_choices_is_an_llm_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 0);
    let err = client
        .complete_json(AnalysisKind::Trust, "system", "user")
        .await
        .expect_err("no content");

    assert!(matches!(err, EnrichmentError::Llm(_)));
}

#[tokio::test]
async fn monetization_analyzer_normalizes_aliases() {
    let server = MockServer::start().await;

    let reply = json!({
        "wtp_score": "72%",
        "segment": "b2b",
        "sentiment": "positive",
        "urgency": "high",
        "price_points": "$10/mo, $99/yr",
        "confidence": 85
    });
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(&reply.to_string())))
        .mount(&server)
        .await;

    let analyzer = MonetizationAnalyzer::new(Arc::new(test_client(&server.uri(), 0)));
    let outcome = analyzer.enrich(&submission(), None).await.expect("should analyze");

    let AnalysisOutcome::Monetization(m) = outcome else {
        panic!("expected monetization outcome");
    };
    assert!((m.willingness_to_pay_score - 72.0).abs() < 1e-9);
    assert_eq!(m.customer_segment, "b2b");
    assert_eq!(m.mentioned_price_points, vec!["$10/mo", "$99/yr"]);
    assert!((m.confidence - 0.85).abs() < 1e-9);
    assert_eq!(m.existing_payment_behavior, "unknown");
    assert_eq!(analyzer.statistics().succeeded, 1);
}

#[tokio::test]
async fn profiler_includes_evidence_in_prompt_and_result() {
    let server = MockServer::start().await;

    let reply = json!({
        "problem_description": "Shift swaps happen in a noisy group chat",
        "app_concept": "Shift swap board",
        "core_functions": ["post shift", "claim shift"],
        "function_count": 2,
        "target_user": "cafe managers",
        "monetization_model": "per-location subscription"
    });
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(&reply.to_string())))
        .expect(1)
        .mount(&server)
        .await;

    let evidence = Evidence::from_monetization(
        &MonetizationAnalysis {
            willingness_to_pay_score: 64.0,
            customer_segment: "b2b".to_string(),
            payment_sentiment: "positive".to_string(),
            urgency_level: "medium".to_string(),
            mentioned_price_points: Vec::new(),
            existing_payment_behavior: "pays for When I Work".to_string(),
            confidence: 0.7,
        },
        EvidenceSource::Copied(AnalysisKind::Monetization),
    );

    let profiler = Profiler::new(Arc::new(test_client(&server.uri(), 0)));
    let outcome = profiler
        .enrich(&submission(), Some(&evidence))
        .await
        .expect("should profile");

    let requests = server.received_requests().await.expect("recording enabled");
    let sent: Value = serde_json::from_slice(&requests[0].body).expect("json body");
    let user_prompt = sent["messages"][1]["content"].as_str().unwrap_or_default();
    assert!(user_prompt.contains("copied_monetization"));
    assert!(user_prompt.contains("pays for When I Work"));

    let AnalysisOutcome::Profile(profile) = outcome else {
        panic!("expected profile outcome");
    };
    assert_eq!(profile.evidence_tag(), "copied_monetization");
    assert!(profile.integrity.is_none());
}

#[tokio::test]
async fn opportunity_analyzer_applies_the_simplicity_gate() {
    let server = MockServer::start().await;

    let reply = json!({
        "dimension_scores": {
            "market_demand": 100,
            "pain_intensity": 100,
            "monetization_potential": 100,
            "market_gap": 100,
            "technical_feasibility": 100
        },
        "core_functions": ["a", "b", "c", "d"]
    });
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(&reply.to_string())))
        .mount(&server)
        .await;

    let analyzer = OpportunityAnalyzer::new(
        Arc::new(test_client(&server.uri(), 0)),
        OpportunityScorer::default(),
    );
    let outcome = analyzer.enrich(&submission(), None).await.expect("should score");

    let AnalysisOutcome::Opportunity(assessment) = outcome else {
        panic!("expected opportunity outcome");
    };
    assert!((assessment.final_score - 100.0).abs() < 1e-9);
    assert!(assessment.disqualified());
    assert_eq!(assessment.priority, Priority::NotRecommended);
}

#[tokio::test]
async fn failed_call_is_counted_by_the_service() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .mount(&server)
        .await;

    let analyzer = MonetizationAnalyzer::new(Arc::new(test_client(&server.uri(), 0)));
    assert!(analyzer.enrich(&submission(), None).await.is_err());

    let stats = analyzer.statistics();
    assert_eq!(stats.calls, 1);
    assert_eq!(stats.failed, 1);
    assert!(!analyzer.is_inert());
}

//! Integration tests for the Reddit source using wiremock HTTP mocks.

use oppdb_enrich::{EnrichmentError, Source, SourceQuery};
use oppdb_reddit::{RedditClient, RedditCredentials, RedditError, RedditSource};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials() -> RedditCredentials {
    RedditCredentials {
        client_id: "id".to_string(),
        client_secret: "secret".to_string(),
        user_agent: "oppdb-test/0.1".to_string(),
    }
}

fn post(id: &str, subreddit: &str, stickied: bool) -> Value {
    json!({
        "kind": "t3",
        "data": {
            "id": id,
            "name": format!("t3_{id}"),
            "title": format!("Post {id}: how do you track client hours?"),
            "selftext": "We bill hourly and lose about 10% to forgotten time.",
            "subreddit": subreddit,
            "score": 15,
            "num_comments": 6,
            "author": "owner",
            "permalink": format!("/r/{subreddit}/comments/{id}/post/"),
            "created_utc": 1_700_000_000.0,
            "stickied": stickied
        }
    })
}

fn listing(children: Vec<Value>, after: Option<&str>) -> Value {
    json!({ "kind": "Listing", "data": { "children": children, "after": after } })
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "tok", "token_type": "bearer" })),
        )
        .mount(server)
        .await;
}

fn source(server: &MockServer, subreddits: &[&str]) -> RedditSource {
    RedditSource::new(
        credentials(),
        subreddits.iter().map(ToString::to_string).collect(),
    )
    .with_base_url(&format!("{}/api/v1/access_token", server.uri()), &server.uri())
}

#[tokio::test]
async fn listing_follows_after_cursor_and_skips_stickied() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/r/SaaS/new"))
        .and(query_param("after", "t3_b"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(listing(vec![post("c", "SaaS", false)], None)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/SaaS/new"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(
            vec![post("rules", "SaaS", true), post("a", "SaaS", false), post("b", "SaaS", false)],
            Some("t3_b"),
        )))
        .mount(&server)
        .await;

    let client = RedditClient::connect_with_base_url(
        &credentials(),
        &format!("{}/api/v1/access_token", server.uri()),
        &server.uri(),
    )
    .await
    .expect("token exchange should succeed");
    let posts = client.listing("SaaS", "new", 10).await.expect("listing");

    let ids: Vec<&str> = posts.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["t3_a", "t3_b", "t3_c"]);
    assert_eq!(posts[0].score, Some(15));
    assert_eq!(posts[0].subreddit, "SaaS");
}

#[tokio::test]
async fn source_respects_limit_across_subreddits() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    for sub in ["SaaS", "smallbusiness"] {
        Mock::given(method("GET"))
            .and(path(format!("/r/{sub}/new")))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing(
                vec![post(&format!("{sub}1"), sub, false), post(&format!("{sub}2"), sub, false)],
                None,
            )))
            .mount(&server)
            .await;
    }

    let batch = source(&server, &["SaaS", "smallbusiness"])
        .fetch(&SourceQuery::new(3, Vec::new()))
        .await
        .expect("fetch");

    assert_eq!(batch.len(), 3);
    assert!(batch.iter().any(|s| s.subreddit == "smallbusiness"));
}

#[tokio::test]
async fn empty_listing_is_not_an_error() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/r/SaaS/new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(Vec::new(), None)))
        .mount(&server)
        .await;

    let batch = source(&server, &["SaaS"])
        .fetch(&SourceQuery::new(25, Vec::new()))
        .await
        .expect("fetch");
    assert!(batch.is_empty());
}

#[tokio::test]
async fn refused_token_is_a_source_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = RedditClient::connect_with_base_url(
        &credentials(),
        &format!("{}/api/v1/access_token", server.uri()),
        &server.uri(),
    )
    .await
    .err()
    .expect("401 should fail");
    assert!(matches!(err, RedditError::Auth(_)));

    let err = source(&server, &["SaaS"])
        .fetch(&SourceQuery::new(5, Vec::new()))
        .await
        .expect_err("source should fail");
    assert!(matches!(err, EnrichmentError::Source(_)));
}

#[tokio::test]
async fn listing_failure_is_a_source_error() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/r/SaaS/new"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = source(&server, &["SaaS"])
        .fetch(&SourceQuery::new(5, Vec::new()))
        .await
        .expect_err("503 should fail");
    match err {
        EnrichmentError::Source(message) => assert!(message.contains("503")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn query_subreddits_override_configured_ones() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/r/Entrepreneur/new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(
            vec![post("e1", "Entrepreneur", false)],
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let batch = source(&server, &["SaaS"])
        .fetch(&SourceQuery::new(5, vec!["Entrepreneur".to_string()]))
        .await
        .expect("fetch");
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].id, "t3_e1");
}

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use gigachat_async::prelude::*;
use gigachat_async::CacheStatus;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server: &MockServer) -> Client {
    let cfg = GigaChatConfig::new()
        .with_api_base(format!("{}/api/v1", server.uri()))
        .with_auth_url(format!("{}/api/v2/oauth", server.uri()))
        .with_credentials("dGVzdDpzZWNyZXQ=");
    Client::with_config(cfg).unwrap()
}

fn chat_ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": "fresh" }, "index": 0 }],
        "created": 1,
        "model": "GigaChat"
    }))
}

/// Issues `token-1`, `token-2`, ... on successive calls
async fn mount_counting_auth(server: &MockServer, expected: u64) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = Arc::clone(&count);
    Mock::given(method("POST"))
        .and(path("/api/v2/oauth"))
        .respond_with(move |_req: &wiremock::Request| {
            let n = count_clone.fetch_add(1, Ordering::SeqCst) + 1;
            let expires_at =
                (chrono::Utc::now() + chrono::TimeDelta::minutes(30)).timestamp_millis();
            ResponseTemplate::new(200).set_body_json(json!({
                "access_token": format!("token-{n}"),
                "expires_at": expires_at
            }))
        })
        .expect(expected)
        .mount(server)
        .await;
    count
}

#[tokio::test]
async fn unauthorized_once_refreshes_and_retries() {
    let server = MockServer::start().await;
    let auth_calls = mount_counting_auth(&server, 2).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(header("authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(header("authorization", "Bearer token-2"))
        .respond_with(chat_ok())
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let resp = client
        .send_message(vec![ChatMessage::user("hi")], None)
        .await
        .unwrap();

    assert_eq!(resp.first_content(), Some("fresh"));
    assert_eq!(auth_calls.load(Ordering::SeqCst), 2);
    assert_eq!(client.tokens().status(), CacheStatus::Valid);
}

#[tokio::test]
async fn unauthorized_twice_surfaces_auth_error_without_third_attempt() {
    let server = MockServer::start().await;
    mount_counting_auth(&server, 2).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("nope"))
        .expect(2)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .send_message(vec![ChatMessage::user("hi")], None)
        .await
        .unwrap_err();

    match err {
        GigaChatError::Auth { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "nope");
        }
        other => panic!("Expected Auth error, got {other:?}"),
    }
    assert_eq!(client.tokens().status(), CacheStatus::Empty);
}

#[tokio::test]
async fn rejected_token_exchange_never_contacts_chat() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/oauth"))
        .respond_with(ResponseTemplate::new(403).set_body_string("bad credentials"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .respond_with(chat_ok())
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .send_message(vec![ChatMessage::user("hi")], None)
        .await
        .unwrap_err();

    assert!(err.is_auth());
    assert_eq!(err.status(), Some(403));
    assert_eq!(client.tokens().status(), CacheStatus::Empty);
}

#[tokio::test]
async fn failed_token_exchange_is_retried_by_next_call() {
    let server = MockServer::start().await;
    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = Arc::clone(&count);

    Mock::given(method("POST"))
        .and(path("/api/v2/oauth"))
        .respond_with(move |_req: &wiremock::Request| {
            if count_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(503).set_body_string("auth down")
            } else {
                let expires_at =
                    (chrono::Utc::now() + chrono::TimeDelta::minutes(30)).timestamp_millis();
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": "abc", "expires_at": expires_at }))
            }
        })
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(chat_ok())
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let first = client
        .send_message(vec![ChatMessage::user("hi")], None)
        .await
        .unwrap_err();
    assert_eq!(first.status(), Some(503));
    assert!(first.is_auth());

    client
        .send_message(vec![ChatMessage::user("hi")], None)
        .await
        .unwrap();
}

#[tokio::test]
async fn malformed_token_body_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/oauth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tok": "abc" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .send_message(vec![ChatMessage::user("hi")], None)
        .await
        .unwrap_err();

    assert!(matches!(err, GigaChatError::Parse(_)), "got {err:?}");
}

#[tokio::test]
async fn camel_case_token_body_is_accepted() {
    let server = MockServer::start().await;
    let expires_at = (chrono::Utc::now() + chrono::TimeDelta::minutes(30)).timestamp_millis();

    Mock::given(method("POST"))
        .and(path("/api/v2/oauth"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "accessToken": "camel", "expiresAt": expires_at })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(header("authorization", "Bearer camel"))
        .respond_with(chat_ok())
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    client
        .send_message(vec![ChatMessage::user("hi")], None)
        .await
        .unwrap();
}

#[tokio::test]
async fn short_lived_token_is_refreshed_per_call() {
    let server = MockServer::start().await;

    // Expires within the default 5s safety margin
    Mock::given(method("POST"))
        .and(path("/api/v2/oauth"))
        .respond_with(move |_req: &wiremock::Request| {
            let expires_at = (chrono::Utc::now() + chrono::TimeDelta::seconds(2)).timestamp_millis();
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "short", "expires_at": expires_at }))
        })
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .respond_with(chat_ok())
        .expect(2)
        .mount(&server)
        .await;

    let client = test_client(&server);
    for _ in 0..2 {
        client
            .send_message(vec![ChatMessage::user("hi")], None)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn already_expired_token_is_parse_error_and_not_used() {
    let server = MockServer::start().await;
    let expires_at = (chrono::Utc::now() - chrono::TimeDelta::hours(1)).timestamp_millis();

    Mock::given(method("POST"))
        .and(path("/api/v2/oauth"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "stale", "expires_at": expires_at })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .respond_with(chat_ok())
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client.tokens().get_valid_token().await.unwrap_err();

    assert!(matches!(err, GigaChatError::Parse(_)), "got {err:?}");
    assert_eq!(client.tokens().status(), CacheStatus::Empty);
}

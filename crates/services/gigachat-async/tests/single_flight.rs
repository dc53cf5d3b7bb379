use std::time::Duration;

use gigachat_async::prelude::*;
use gigachat_async::CacheStatus;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CALLERS: usize = 10;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_calls_share_one_token_exchange() {
    let server = MockServer::start().await;
    let expires_at = (chrono::Utc::now() + chrono::TimeDelta::minutes(30)).timestamp_millis();

    // Slow enough that every caller arrives while the exchange is in flight
    Mock::given(method("POST"))
        .and(path("/api/v2/oauth"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "shared", "expires_at": expires_at }))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(header("authorization", "Bearer shared"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "ok" }, "index": 0 }],
            "created": 1,
            "model": "GigaChat"
        })))
        .expect(CALLERS as u64)
        .mount(&server)
        .await;

    let cfg = GigaChatConfig::new()
        .with_api_base(format!("{}/api/v1", server.uri()))
        .with_auth_url(format!("{}/api/v2/oauth", server.uri()))
        .with_credentials("dGVzdDpzZWNyZXQ=");
    let client = Client::with_config(cfg).unwrap();

    let handles: Vec<_> = (0..CALLERS)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .send_message(vec![ChatMessage::user(format!("caller {i}"))], None)
                    .await
            })
        })
        .collect();

    for h in handles {
        let resp = h.await.unwrap().unwrap();
        assert_eq!(resp.first_content(), Some("ok"));
    }
    assert_eq!(client.tokens().status(), CacheStatus::Valid);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_one_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/oauth"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_string("unknown client")
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cfg = GigaChatConfig::new()
        .with_api_base(format!("{}/api/v1", server.uri()))
        .with_auth_url(format!("{}/api/v2/oauth", server.uri()))
        .with_credentials("dGVzdDpzZWNyZXQ=");
    let client = Client::with_config(cfg).unwrap();

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .send_message(vec![ChatMessage::user("hi")], None)
                    .await
            })
        })
        .collect();

    for h in handles {
        let err = h.await.unwrap().unwrap_err();
        assert!(err.is_auth());
        assert_eq!(err.status(), Some(401));
    }
    assert_eq!(client.tokens().status(), CacheStatus::Empty);
}

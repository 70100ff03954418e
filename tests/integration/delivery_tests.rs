//! Webhook delivery retry semantics against a mock endpoint

use esim_relay::records::{parse_crawl_result, CrawlResult};
use esim_relay::webhook::{AttemptOutcome, Backoff, DeliveryError, WebhookClient};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a client with no backoff delay so retries run instantly
fn create_test_client(server: &MockServer, retries: u32) -> WebhookClient {
    WebhookClient::new(
        format!("{}/webhook/eSIM_compatible", server.uri()),
        Duration::from_secs(5),
        "eSIM-Crawler/1.0",
    )
    .expect("Failed to build webhook client")
    .with_retries(retries)
    .with_backoff(Backoff::none())
}

fn sample_result() -> CrawlResult {
    parse_crawl_result(r#"[{"device":"iPhone 14","esim":true},{"device":"Pixel 7","esim":true}]"#)
        .expect("Failed to parse sample records")
}

/// Mounts a mock answering `status` for the first `times` matching requests
async fn mount_failures(server: &MockServer, status: u16, times: u64) {
    if times == 0 {
        return;
    }
    Mock::given(method("POST"))
        .and(path("/webhook/eSIM_compatible"))
        .respond_with(ResponseTemplate::new(status).set_body_string("upstream unavailable"))
        .up_to_n_times(times)
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fails_r_times_then_succeeds() {
    for retries in 0..=3u32 {
        let server = MockServer::start().await;

        mount_failures(&server, 503, retries as u64).await;
        Mock::given(method("POST"))
            .and(path("/webhook/eSIM_compatible"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = create_test_client(&server, retries);
        let report = client
            .deliver(&sample_result())
            .await
            .unwrap_or_else(|e| panic!("delivery with {} retries failed: {}", retries, e));

        assert_eq!(report.attempts.len(), retries as usize + 1);
        assert_eq!(report.status, 200);
        assert_eq!(report.response_body, "ok");
        assert!(report.attempts.last().unwrap().outcome.is_success());
        assert!(report.attempts[..retries as usize]
            .iter()
            .all(|a| a.outcome.status() == Some(503)));
    }
}

#[tokio::test]
async fn test_always_failing_endpoint_exhausts_retries() {
    for retries in 0..=3u32 {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(retries as u64 + 1)
            .mount(&server)
            .await;

        let client = create_test_client(&server, retries);
        let err = client.deliver(&sample_result()).await.unwrap_err();

        match err {
            DeliveryError::Exhausted { ref attempts } => {
                assert_eq!(attempts.len(), retries as usize + 1);
                assert_eq!(
                    attempts.last().unwrap().outcome,
                    AttemptOutcome::Rejected {
                        status: 500,
                        body: String::new()
                    }
                );
            }
            other => panic!("expected Exhausted, got {:?}", other),
        }
        assert!(err.to_string().contains("HTTP 500"));
    }
}

#[tokio::test]
async fn test_empty_payload_has_same_retry_semantics() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string("[]"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string("[]"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server, 3);
    let report = client.deliver(&CrawlResult::default()).await.unwrap();

    assert_eq!(report.attempts.len(), 3);
}

#[tokio::test]
async fn test_any_2xx_is_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server, 3);
    let report = client.deliver(&sample_result()).await.unwrap();

    assert_eq!(report.status, 204);
    assert_eq!(report.attempts.len(), 1);
}

#[tokio::test]
async fn test_request_carries_json_body_and_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/webhook/eSIM_compatible"))
        .and(header("content-type", "application/json"))
        .and(header("user-agent", "eSIM-Crawler/1.0"))
        .and(body_json(json!([
            {"device": "iPhone 14", "esim": true},
            {"device": "Pixel 7", "esim": true}
        ])))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server, 0);
    let report = client.deliver(&sample_result()).await.unwrap();

    assert_eq!(report.payload_digest.len(), 64);
}

#[tokio::test]
async fn test_slow_endpoint_times_out_per_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let client = WebhookClient::new(
        format!("{}/hook", server.uri()),
        Duration::from_millis(200),
        "eSIM-Crawler/1.0",
    )
    .unwrap()
    .with_retries(1)
    .with_backoff(Backoff::none());

    let err = client.deliver(&sample_result()).await.unwrap_err();
    let attempts = err.attempts();

    assert_eq!(attempts.len(), 2);
    assert!(attempts.iter().all(|a| a.outcome
        == AttemptOutcome::Failed {
            error: "request timed out".to_string()
        }));
}

#[tokio::test]
async fn test_backoff_delays_between_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let client = create_test_client(&server, 2).with_backoff(Backoff::new(
        Duration::from_millis(100),
        Duration::from_millis(150),
    ));

    let started = std::time::Instant::now();
    assert!(client.deliver(&sample_result()).await.is_err());

    // 100ms after the first failure, 150ms (capped) after the second
    assert!(started.elapsed() >= Duration::from_millis(250));
}

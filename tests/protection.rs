//! End-to-end protection behaviour over real sockets.

use std::time::Instant;

use reqwest::StatusCode;
use serde_json::{json, Value};

use request_shield::config::ShieldConfig;
use request_shield::security::{ClientKey, Clock};

mod common;

use common::{start_app_backend, start_shield, GOOD_PASSWORD};

fn login_body(email: &str, password: &str) -> Value {
    json!({ "email": email, "password": password })
}

fn retry_after(response: &reqwest::Response) -> u64 {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .expect("Retry-After header")
}

#[tokio::test]
async fn test_general_limit_rejects_the_101st_request() {
    let backend = start_app_backend().await;
    let shield = start_shield(ShieldConfig::default(), backend).await;
    let client = reqwest::Client::new();

    for i in 0..100 {
        let res = client.get(shield.url("/api/products")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK, "request {} should pass", i + 1);
    }

    let res = client.get(shield.url("/api/products")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let wait = retry_after(&res);
    assert!((1..=60).contains(&wait));

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Too many requests. Please try again later.");
    let timestamp = body["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
}

#[tokio::test]
async fn test_login_lockout_is_per_client_and_account() {
    let backend = start_app_backend().await;
    let shield = start_shield(ShieldConfig::default(), backend).await;
    let client = reqwest::Client::new();
    let url = shield.url("/auth/login");

    let started = Instant::now();
    for _ in 0..5 {
        let res = client
            .post(&url)
            .header("x-forwarded-for", "10.0.0.5")
            .json(&login_body("bob@example.com", "wrong"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    // Locked even with the right password
    let res = client
        .post(&url)
        .header("x-forwarded-for", "10.0.0.5")
        .json(&login_body("Bob@Example.com", GOOD_PASSWORD))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let wait = retry_after(&res);
    let elapsed = started.elapsed().as_secs();
    assert!(wait <= 900 && wait + elapsed + 1 >= 900, "retry after {}", wait);
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body["message"],
        format!("Too many failed login attempts. Please try again in {} seconds.", wait)
    );

    // Another account from the same client is unaffected
    let res = client
        .post(&url)
        .header("x-forwarded-for", "10.0.0.5")
        .json(&login_body("alice@example.com", GOOD_PASSWORD))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // The same account from another client is unaffected
    let res = client
        .post(&url)
        .header("x-forwarded-for", "10.0.0.6")
        .json(&login_body("bob@example.com", GOOD_PASSWORD))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_successful_login_clears_failures() {
    let backend = start_app_backend().await;
    let shield = start_shield(ShieldConfig::default(), backend).await;
    let client = reqwest::Client::new();
    let url = shield.url("/auth/login");
    let key = ClientKey::from("10.0.0.7");

    for _ in 0..4 {
        let res = client
            .post(&url)
            .header("x-forwarded-for", "10.0.0.7")
            .json(&login_body("carol@example.com", "wrong"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
    let now = shield.shield.clock().now();
    assert_eq!(shield.shield.brute_force_guard().failures(&key, "carol@example.com", now), 4);

    let res = client
        .post(&url)
        .header("x-forwarded-for", "10.0.0.7")
        .json(&login_body("carol@example.com", GOOD_PASSWORD))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let now = shield.shield.clock().now();
    assert_eq!(shield.shield.brute_force_guard().failures(&key, "carol@example.com", now), 0);
}

#[tokio::test]
async fn test_auth_routes_have_their_own_budget() {
    let backend = start_app_backend().await;
    let shield = start_shield(ShieldConfig::default(), backend).await;
    let client = reqwest::Client::new();

    for _ in 0..10 {
        let res = client
            .post(shield.url("/auth/register"))
            .json(&json!({ "email": "new@example.com" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = client
        .post(shield.url("/auth/register"))
        .json(&json!({ "email": "new@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Too many authentication requests. Please try again later.");

    // Non-auth routes still pass
    let res = client.get(shield.url("/api/products")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unreadable_login_body_fails_open() {
    let backend = start_app_backend().await;
    let shield = start_shield(ShieldConfig::default(), backend).await;
    let client = reqwest::Client::new();

    for _ in 0..8 {
        let res = client
            .post(shield.url("/auth/login"))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
    assert_eq!(shield.shield.brute_force_guard().tracked_pairs(), 0);
}

#[tokio::test]
async fn test_hardening_headers_on_every_response() {
    let backend = start_app_backend().await;
    let mut config = ShieldConfig::default();
    config.security.max_requests_per_window = 1;
    let shield = start_shield(config, backend).await;
    let client = reqwest::Client::new();

    let forwarded = client.get(shield.url("/api/products")).send().await.unwrap();
    let rejected = client.get(shield.url("/api/products")).send().await.unwrap();
    assert_eq!(forwarded.status(), StatusCode::OK);
    assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);

    for res in [&forwarded, &rejected] {
        let headers = res.headers();
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-xss-protection"], "1; mode=block");
        assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
        assert!(headers.contains_key(request_shield::http::X_REQUEST_ID));
    }
}

#[tokio::test]
async fn test_suspicious_query_rejected() {
    let backend = start_app_backend().await;
    let shield = start_shield(ShieldConfig::default(), backend).await;
    let client = reqwest::Client::new();

    let res = client
        .get(shield.url("/download?file=..%2fetc%2fpasswd"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Malformed request.");
}

#[tokio::test]
async fn test_unreachable_application_is_not_a_failed_login() {
    let backend = common::dead_backend().await;
    let shield = start_shield(ShieldConfig::default(), backend).await;
    let client = reqwest::Client::new();

    for _ in 0..6 {
        let res = client
            .post(shield.url("/auth/login"))
            .json(&login_body("dave@example.com", "wrong"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
    assert_eq!(shield.shield.brute_force_guard().tracked_pairs(), 0);
}

#[tokio::test]
async fn test_slow_application_times_out_without_recording() {
    let backend = common::start_programmable_backend(|_seen| async {
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        (401, String::new())
    })
    .await;
    let mut config = ShieldConfig::default();
    config.upstream.timeout_secs = 1;
    let shield = start_shield(config, backend).await;
    let client = reqwest::Client::new();

    let res = client
        .post(shield.url("/auth/login"))
        .json(&login_body("erin@example.com", "wrong"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(shield.shield.brute_force_guard().tracked_pairs(), 0);
}

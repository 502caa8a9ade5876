// SPDX-License-Identifier: MIT

//! Integration tests for the OAuth provider endpoints consumed by the
//! identity broker.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ─── Authorization Redirector ────────────────────────────────

#[tokio::test]
async fn test_authorize_redirects_with_passthrough_params() {
    let (app, _state) = common::create_test_app("https://log.concept2.com");

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/protocol/openid-connect/auth?state=abc123&redirect_uri=https%3A%2F%2Fbroker.example%2Fcb")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);

    let location = response
        .headers()
        .get("location")
        .unwrap()
        .to_str()
        .unwrap();

    assert!(location.starts_with("https://log.concept2.com/oauth/authorize?"));
    assert!(location.contains("client_id=test_client_id"));
    assert!(location.contains("response_type=code"));
    assert!(location.contains("state=abc123"));
    assert!(location.contains("redirect_uri=https%3A%2F%2Fbroker.example%2Fcb"));
    assert!(location.contains("scope=user%3Aread%2Cresults%3Aread"));
}

#[tokio::test]
async fn test_authorize_tolerates_missing_params() {
    let (app, _state) = common::create_test_app("https://log.concept2.com");

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/protocol/openid-connect/auth")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Passed through as empty values; the broker owns validation
    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response
        .headers()
        .get("location")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(location.contains("state=&"));
}

// ─── Token Exchanger ─────────────────────────────────────────

#[tokio::test]
async fn test_token_exchange_normalizes_response() {
    let server = MockServer::start().await;

    // Upstream omits token_type; the bridge must default it to Bearer
    Mock::given(method("POST"))
        .and(path("/oauth/access_token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth_code_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at_1",
            "expires_in": 3600,
            "refresh_token": "rt_1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (app, _state) = common::create_test_app(&server.uri());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/protocol/openid-connect/token")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from(
                    "code=auth_code_1&redirect_uri=https%3A%2F%2Fbroker.example%2Fcb",
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["access_token"], "at_1");
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 3600);
    assert_eq!(body["refresh_token"], "rt_1");
}

#[tokio::test]
async fn test_token_exchange_falls_back_to_query_params() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/access_token"))
        .and(body_string_contains("code=query_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at_2",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "rt_2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (app, _state) = common::create_test_app(&server.uri());

    // Empty body: parameters arrive in the query string instead
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/protocol/openid-connect/token?code=query_code&redirect_uri=https%3A%2F%2Fbroker.example%2Fcb")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_token_exchange_missing_code_makes_no_upstream_call() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (app, _state) = common::create_test_app(&server.uri());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/protocol/openid-connect/token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_token_exchange_surfaces_upstream_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/access_token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
        )
        .mount(&server)
        .await;

    let (app, _state) = common::create_test_app(&server.uri());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/protocol/openid-connect/token")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from("code=bad&redirect_uri=https%3A%2F%2Fb%2Fcb"))
                .unwrap(),
        )
        .await
        .unwrap();

    // Upstream failures become 500 with the diagnostic body included
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["error"], "concept2_error");
    assert!(body["details"].as_str().unwrap().contains("invalid_grant"));
}

// ─── User-Info Resolver ──────────────────────────────────────

#[tokio::test]
async fn test_userinfo_maps_profile_to_claims() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .and(header("authorization", "Bearer tok123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "id": 424242,
                "username": "rower42",
                "email": "rower@example.com",
                "name": "A. Rower"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (app, _state) = common::create_test_app(&server.uri());

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/protocol/openid-connect/userinfo")
                .header("authorization", "Bearer tok123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["sub"], "424242");
    assert_eq!(body["email"], "rower@example.com");
    assert_eq!(body["email_verified"], true);
    assert_eq!(body["name"], "A. Rower");
    assert_eq!(body["preferred_username"], "rower42");
}

#[tokio::test]
async fn test_userinfo_synthesizes_missing_email_and_name() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "id": 7,
                "username": "anonymous_erg"
            }
        })))
        .mount(&server)
        .await;

    let (app, _state) = common::create_test_app(&server.uri());

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/protocol/openid-connect/userinfo")
                .header("authorization", "Bearer tok")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["email"], "anonymous_erg@concept2.user");
    assert_eq!(body["email_verified"], true);
    assert_eq!(body["name"], "anonymous_erg");
}

#[tokio::test]
async fn test_userinfo_requires_authorization_header() {
    let (app, _state) = common::create_test_app("https://log.concept2.com");

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/protocol/openid-connect/userinfo")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// SPDX-License-Identifier: MIT

//! OAuth provider endpoints consumed by the identity broker.
//!
//! Supabase treats these three Keycloak-shaped routes as a standards
//! compliant OpenID Connect provider; each translates into the Concept2
//! OAuth dialect.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::AppState;

/// Concept2 does not expose a verification flag; asserting verified trusts
/// the provider's identity without a separate round-trip. Policy decision,
/// kept as a constant so it is auditable.
const TRUST_PROVIDER_EMAIL_VERIFICATION: bool = true;

/// Domain for synthesized placeholder addresses when the provider has no
/// email on file.
const PLACEHOLDER_EMAIL_DOMAIN: &str = "concept2.user";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/protocol/openid-connect/auth", get(authorize))
        .route("/protocol/openid-connect/token", post(token))
        .route("/protocol/openid-connect/userinfo", get(userinfo))
}

// ─── Authorization Redirector ────────────────────────────────

/// Broker-supplied authorization parameters, passed through verbatim.
#[derive(Deserialize, Default)]
struct AuthorizeParams {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    redirect_uri: Option<String>,
}

/// Redirect the broker's login flow to the Concept2 authorization endpoint.
///
/// `state` and `redirect_uri` are opaque to us; no validation is performed
/// so the broker's CSRF-state round-trip survives intact.
async fn authorize(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthorizeParams>,
) -> impl IntoResponse {
    let auth_url = state.concept2.authorize_url(
        params.state.as_deref().unwrap_or(""),
        params.redirect_uri.as_deref().unwrap_or(""),
    );

    tracing::info!("Redirecting broker login to Concept2 authorization");

    // Literal 302 Found, matching what the broker's OAuth client expects
    (StatusCode::FOUND, [(header::LOCATION, auth_url)])
}

// ─── Token Exchanger ─────────────────────────────────────────

/// Token request parameters; brokers deliver them form-encoded or as query
/// parameters.
#[derive(Deserialize, Default, Clone)]
struct TokenParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    redirect_uri: Option<String>,
}

/// Merge body and query parameter sources: body takes precedence, query is
/// the fallback. Empty strings count as absent.
fn resolve_token_params(body: &str, query: TokenParams) -> TokenParams {
    let from_body: TokenParams = serde_urlencoded::from_str(body).unwrap_or_default();

    let pick = |primary: Option<String>, fallback: Option<String>| {
        primary.filter(|v| !v.is_empty()).or(fallback)
    };

    TokenParams {
        code: pick(from_body.code, query.code),
        redirect_uri: pick(from_body.redirect_uri, query.redirect_uri),
    }
}

/// Exchange an authorization code for tokens on the broker's behalf.
async fn token(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenParams>,
    body: String,
) -> Result<Json<crate::services::concept2::TokenResponse>> {
    let params = resolve_token_params(&body, query);

    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("No code provided".to_string()))?;
    let redirect_uri = params
        .redirect_uri
        .ok_or_else(|| AppError::BadRequest("No redirect_uri provided".to_string()))?;

    let tokens = state.concept2.exchange_code(&code, &redirect_uri).await?;

    tracing::info!("Authorization code exchanged");

    Ok(Json(tokens))
}

// ─── User-Info Resolver ──────────────────────────────────────

/// Identity claims in the shape the broker expects.
#[derive(Debug, Serialize)]
pub struct IdentityClaims {
    pub sub: String,
    pub email: String,
    pub email_verified: bool,
    pub name: String,
    pub preferred_username: String,
}

/// Resolve the bearer token to identity claims via the Concept2 profile.
async fn userinfo(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<IdentityClaims>> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let user = state.concept2.get_current_user(authorization).await?;
    let profile = user.data;

    // The provider does not guarantee an email on file; synthesize a stable
    // placeholder so the broker always receives one.
    let email = profile
        .email
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| format!("{}@{}", profile.username, PLACEHOLDER_EMAIL_DOMAIN));

    let name = profile
        .name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| profile.username.clone());

    Ok(Json(IdentityClaims {
        sub: profile.id.to_string(),
        email,
        email_verified: TRUST_PROVIDER_EMAIL_VERIFICATION,
        name,
        preferred_username: profile.username,
    }))
}

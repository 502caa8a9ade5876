// SPDX-License-Identifier: MIT

//! Concept2 Logbook API client.
//!
//! Handles:
//! - Authorization URL construction (broker state passed through verbatim)
//! - Authorization-code and refresh-token grants
//! - Current-user profile lookup
//! - Paginated results listing

use crate::error::AppError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed scope: read access to profile and results.
pub const OAUTH_SCOPE: &str = "user:read,results:read";

/// Upstream calls are bounded so a hung Concept2 endpoint cannot hang the
/// handler.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Concept2 API client.
#[derive(Clone)]
pub struct Concept2Client {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl Concept2Client {
    /// Create a new Concept2 client with OAuth credentials.
    ///
    /// `base_url` is the Logbook root (`https://log.concept2.com` in
    /// production; tests point it at a local mock).
    pub fn new(client_id: String, client_secret: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
        }
    }

    /// Build the authorization URL the broker's login flow is redirected to.
    ///
    /// `state` and `redirect_uri` are opaque broker-supplied values forwarded
    /// unmodified; the broker owns the CSRF-state round-trip.
    pub fn authorize_url(&self, state: &str, redirect_uri: &str) -> String {
        format!(
            "{}/oauth/authorize?client_id={}&response_type=code&state={}&redirect_uri={}&scope={}",
            self.base_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(state),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(OAUTH_SCOPE),
        )
    }

    /// Exchange an authorization code for an access/refresh token pair.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(format!("{}/oauth/access_token", self.base_url))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await
            .map_err(|e| AppError::Concept2Api(format!("Token exchange request failed: {e}")))?;

        check_response_json(response).await
    }

    /// Exchange a stored refresh token for a fresh access token.
    ///
    /// This is the single point where an invalid, expired, or rotated
    /// refresh token surfaces.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(format!("{}/oauth/access_token", self.base_url))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
                ("scope", OAUTH_SCOPE),
            ])
            .send()
            .await
            .map_err(|e| AppError::Concept2Api(format!("Token refresh request failed: {e}")))?;

        check_response_json(response).await
    }

    /// Fetch the current user's profile with a raw `Authorization` header
    /// value (forwarded verbatim from the broker).
    pub async fn get_current_user(&self, authorization: &str) -> Result<Concept2User, AppError> {
        let response = self
            .http
            .get(format!("{}/api/users/me", self.base_url))
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| AppError::Concept2Api(e.to_string()))?;

        check_response_json(response).await
    }

    /// Fetch one page of rower results on or after `from`.
    pub async fn list_results(
        &self,
        access_token: &str,
        from: NaiveDate,
        page: u32,
    ) -> Result<ResultsPage, AppError> {
        let response = self
            .http
            .get(format!("{}/api/users/me/results", self.base_url))
            .bearer_auth(access_token)
            .query(&[
                ("type", "rower".to_string()),
                ("from", from.to_string()),
                ("page", page.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Concept2Api(e.to_string()))?;

        check_response_json(response).await
    }
}

/// Check response and parse JSON body, surfacing the upstream diagnostic on
/// failure.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Concept2Api(format!("HTTP {status}: {body}")));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Concept2Api(format!("JSON parse error: {e}")))
}

/// Token endpoint response, normalized to the shape the identity broker
/// expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Defaults to `Bearer` when the upstream omits it.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: u64,
    pub refresh_token: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Current-user endpoint response wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct Concept2User {
    pub data: Concept2Profile,
}

/// Concept2 profile. Email presence is not guaranteed by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct Concept2Profile {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// One page of the paginated results listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultsPage {
    pub data: Vec<Concept2Result>,
    pub meta: ResultsMeta,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultsMeta {
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
    pub total_pages: u32,
}

/// A single rowing result.
///
/// The provider reports active and rest distance separately; both may be
/// absent.
#[derive(Debug, Clone, Deserialize)]
pub struct Concept2Result {
    pub id: u64,
    pub date: String,
    #[serde(default)]
    pub distance: Option<u64>,
    #[serde(default)]
    pub rest_distance: Option<u64>,
}

impl Concept2Result {
    /// Cumulative meters: primary workout distance plus rest-interval
    /// distance, missing values treated as zero. This reconciles the
    /// provider's split reporting into the single figure goal progress
    /// consumes.
    pub fn total_meters(&self) -> u64 {
        self.distance.unwrap_or(0) + self.rest_distance.unwrap_or(0)
    }
}

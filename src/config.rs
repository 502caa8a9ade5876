// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.
//!
//! All values are read once at startup; secrets arrive as environment
//! variables injected by the hosting platform.

use std::env;

/// Default Concept2 Logbook base URL (authorize, token, and API endpoints).
pub const DEFAULT_CONCEPT2_BASE_URL: &str = "https://log.concept2.com";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Concept2 OAuth client ID (public)
    pub concept2_client_id: String,
    /// Concept2 OAuth client secret
    pub concept2_client_secret: String,
    /// Concept2 Logbook base URL (overridable for testing)
    pub concept2_base_url: String,
    /// Supabase project URL (PostgREST lives under `/rest/v1`)
    pub supabase_url: String,
    /// Supabase service-role key (bypasses row-level security)
    pub supabase_service_role_key: String,
    /// Supabase JWT secret for verifying session tokens (raw bytes)
    pub supabase_jwt_secret: Vec<u8>,
    /// Server port
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            concept2_client_id: env::var("CONCEPT2_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("CONCEPT2_CLIENT_ID"))?,
            concept2_client_secret: env::var("CONCEPT2_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("CONCEPT2_CLIENT_SECRET"))?,
            concept2_base_url: env::var("CONCEPT2_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_CONCEPT2_BASE_URL.to_string()),
            supabase_url: env::var("SUPABASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("SUPABASE_URL"))?,
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY"))?,
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .map_err(|_| ConfigError::Missing("SUPABASE_JWT_SECRET"))?
                .into_bytes(),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            concept2_client_id: "test_client_id".to_string(),
            concept2_client_secret: "test_secret".to_string(),
            concept2_base_url: DEFAULT_CONCEPT2_BASE_URL.to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_role_key: "test_service_role_key".to_string(),
            supabase_jwt_secret: b"test_jwt_secret_32_bytes_minimum!".to_vec(),
            port: 8080,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("CONCEPT2_CLIENT_ID", "test_id");
        env::set_var("CONCEPT2_CLIENT_SECRET", "test_secret");
        env::set_var("SUPABASE_URL", "http://localhost:54321/");
        env::set_var("SUPABASE_SERVICE_ROLE_KEY", "service_key");
        env::set_var("SUPABASE_JWT_SECRET", "test_jwt_secret_32_bytes_minimum!");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.concept2_client_id, "test_id");
        assert_eq!(config.concept2_client_secret, "test_secret");
        // Trailing slash is trimmed so PostgREST paths join cleanly
        assert_eq!(config.supabase_url, "http://localhost:54321");
        assert_eq!(config.concept2_base_url, DEFAULT_CONCEPT2_BASE_URL);
        assert_eq!(config.port, 8080);
    }
}

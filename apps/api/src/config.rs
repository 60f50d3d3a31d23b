use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup aborts if the identity provider or database settings are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub supabase_anon_key: String,
    /// AI calls fail (and degrade where allowed) when unset.
    pub anthropic_api_key: Option<String>,
    /// Audience expected in Google ID tokens; Google sign-in is refused when unset.
    pub google_client_id: Option<String>,
    /// Image lookups return placeholders when unset.
    pub unsplash_access_key: Option<String>,
    pub allowed_origins: Vec<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let supabase_service_key = require_env("SUPABASE_SERVICE_ROLE_KEY")?;

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            supabase_url: require_env("SUPABASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            supabase_anon_key: optional_env("SUPABASE_ANON_KEY")
                .unwrap_or_else(|| supabase_service_key.clone()),
            supabase_service_key,
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            google_client_id: optional_env("GOOGLE_CLIENT_ID"),
            unsplash_access_key: optional_env("UNSPLASH_ACCESS_KEY"),
            allowed_origins: parse_origins(
                &std::env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            ),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/postcraft_test".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "service-key".to_string(),
            supabase_anon_key: "anon-key".to_string(),
            anthropic_api_key: None,
            google_client_id: None,
            unsplash_access_key: None,
            allowed_origins: vec!["http://localhost:5173".to_string()],
            port: 0,
            rust_log: "debug".to_string(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

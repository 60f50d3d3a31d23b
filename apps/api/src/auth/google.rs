//! Google ID token verification through the `tokeninfo` endpoint.
//!
//! Google checks the signature and expiry; we check the audience, issuer and
//! that the email is verified before trusting any claim.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

const TOKENINFO_BASE_URL: &str = "https://oauth2.googleapis.com";
const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

#[derive(Debug, Error)]
pub enum GoogleTokenError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token verification is not configured (GOOGLE_CLIENT_ID unset)")]
    NotConfigured,

    #[error("invalid Google credential: {0}")]
    Invalid(String),
}

/// Identity asserted by a verified Google ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleClaims {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[async_trait]
pub trait GoogleVerifier: Send + Sync {
    async fn verify_id_token(&self, id_token: &str) -> Result<GoogleClaims, GoogleTokenError>;
}

/// `tokeninfo` reports booleans as strings.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    iss: String,
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

impl TokenInfo {
    fn into_claims(self, client_id: &str) -> Result<GoogleClaims, GoogleTokenError> {
        if self.aud != client_id {
            return Err(GoogleTokenError::Invalid("audience mismatch".to_string()));
        }
        if !GOOGLE_ISSUERS.contains(&self.iss.as_str()) {
            return Err(GoogleTokenError::Invalid(format!("unexpected issuer {}", self.iss)));
        }
        if self.email_verified.as_deref() != Some("true") {
            return Err(GoogleTokenError::Invalid("email not verified".to_string()));
        }
        let email = self
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| GoogleTokenError::Invalid("token carries no email".to_string()))?;

        Ok(GoogleClaims {
            subject: self.sub,
            email,
            name: self.name,
            picture: self.picture,
        })
    }
}

#[derive(Clone)]
pub struct GoogleTokenInfo {
    client: Client,
    base_url: String,
    client_id: Option<String>,
}

impl GoogleTokenInfo {
    pub fn new(client_id: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: TOKENINFO_BASE_URL.to_string(),
            client_id,
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl GoogleVerifier for GoogleTokenInfo {
    async fn verify_id_token(&self, id_token: &str) -> Result<GoogleClaims, GoogleTokenError> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or(GoogleTokenError::NotConfigured)?;

        let response = self
            .client
            .get(format!("{}/tokeninfo", self.base_url))
            .query(&[("id_token", id_token)])
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            debug!("tokeninfo rejected credential (status {status})");
            return Err(GoogleTokenError::Invalid(format!("rejected with status {status}")));
        }
        let info: TokenInfo = response.error_for_status()?.json().await?;
        info.into_claims(client_id)
    }
}

//! Stock-photo search against the Unsplash API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::images::ImageRecord;

const UNSPLASH_API_URL: &str = "https://api.unsplash.com";

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// Looks up one photo for a search term.
#[async_trait]
pub trait PhotoSearch: Send + Sync {
    /// First landscape result for `query`, if any.
    async fn search_first(&self, query: &str) -> Result<Option<ImageRecord>, PhotoError>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<UnsplashPhoto>,
}

#[derive(Debug, Deserialize)]
struct UnsplashPhoto {
    id: String,
    alt_description: Option<String>,
    description: Option<String>,
    urls: PhotoUrls,
    user: PhotoUser,
    links: PhotoLinks,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: String,
}

#[derive(Debug, Deserialize)]
struct PhotoUser {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PhotoLinks {
    download: String,
}

impl UnsplashPhoto {
    fn into_record(self, query: &str) -> ImageRecord {
        let alt = self
            .alt_description
            .or(self.description)
            .unwrap_or_else(|| query.to_string());
        ImageRecord {
            id: self.id,
            url: self.urls.regular,
            alt,
            photographer: self.user.name,
            download_url: self.links.download,
        }
    }
}

#[derive(Clone)]
pub struct UnsplashClient {
    client: Client,
    access_key: String,
    base_url: String,
}

impl UnsplashClient {
    pub fn new(access_key: String) -> Self {
        Self {
            client: Client::new(),
            access_key,
            base_url: UNSPLASH_API_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl PhotoSearch for UnsplashClient {
    async fn search_first(&self, query: &str) -> Result<Option<ImageRecord>, PhotoError> {
        let response = self
            .client
            .get(format!("{}/search/photos", self.base_url))
            .header("Authorization", format!("Client-ID {}", self.access_key))
            .header("Accept-Version", "v1")
            .query(&[
                ("query", query),
                ("per_page", "1"),
                ("orientation", "landscape"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PhotoError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: SearchResponse = response.json().await?;
        Ok(body
            .results
            .into_iter()
            .next()
            .map(|photo| photo.into_record(query)))
    }
}

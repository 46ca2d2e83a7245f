//! News relay client.
//!
//! Fetches recent articles for a city from the GNews search API and passes
//! them through untouched. A response without an `articles` field is treated
//! as an empty result rather than an error.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{LensError, Result};

const NEWS_ENDPOINT: &str = "https://gnews.io/api/v4/search";

/// Publisher attribution as delivered by the news provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsSource {
    pub name: String,
}

/// One article as delivered by the news provider; not persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub published_at: Option<String>,
    pub source: NewsSource,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    articles: Vec<NewsArticle>,
}

pub struct NewsClient {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl NewsClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }

    /// Fetches recent articles mentioning `city`, capped at ten results.
    pub async fn search_news(&self, city: &str) -> Result<Vec<NewsArticle>> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| LensError::Unconfigured {
                message: "No news API key configured (set GNEWS_KEY)".to_string(),
            })?;

        debug!("Searching news for: {}", city);

        let response: NewsResponse = self
            .http
            .get(NEWS_ENDPOINT)
            .query(&[("q", city), ("token", key), ("lang", "en"), ("max", "10")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        info!(
            "News search for {} returned {} articles",
            city,
            response.articles.len()
        );
        Ok(response.articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_articles() {
        let response: NewsResponse = serde_json::from_str(
            r#"{
                "totalArticles": 1,
                "articles": [{
                    "title": "Local story",
                    "description": "Something happened nearby",
                    "url": "https://news.example.com/story",
                    "publishedAt": "2025-06-01T12:00:00Z",
                    "source": {"name": "Example Press", "url": "https://news.example.com"}
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(response.articles.len(), 1);
        assert_eq!(response.articles[0].title, "Local story");
        assert_eq!(response.articles[0].source.name, "Example Press");
        assert_eq!(
            response.articles[0].published_at.as_deref(),
            Some("2025-06-01T12:00:00Z")
        );
    }

    #[test]
    fn missing_articles_field_is_an_empty_list() {
        let response: NewsResponse = serde_json::from_str(r#"{"totalArticles": 0}"#).unwrap();
        assert!(response.articles.is_empty());
    }
}

//! Saved-article record for the locallens application.
//!
//! A SavedArticle is the persisted form of a news article the user chose to
//! keep: the upstream fields are copied verbatim at save time and the record
//! is scoped to the opaque user token that saved it.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::GeoPoint;

/// Represents a single saved article in our system
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedArticle {
    /// Unique identifier for the record, assigned at creation
    pub id: String,
    /// Opaque token identifying the owning browser session
    pub user_id: String,
    /// Article title, copied from the upstream article
    pub title: String,
    /// Article URL, copied from the upstream article
    pub url: String,
    /// Publisher name, copied from the upstream article
    pub source: String,
    /// Where the article was saved from, when the caller supplied it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    /// When the record was created, stamped server-side
    pub saved_at: DateTime<Utc>,
}

impl SavedArticle {
    /// Creates a new record owned by `user_id` with a fresh id and the
    /// current time as its save timestamp.
    pub fn new(
        user_id: String,
        title: String,
        url: String,
        source: String,
        location: Option<GeoPoint>,
    ) -> Self {
        SavedArticle {
            // Ids must stay unique for the lifetime of the store, so a
            // random UUID rather than anything derived from the content.
            id: Uuid::new_v4().to_string(),
            user_id,
            title,
            url,
            source,
            location,
            saved_at: Utc::now(),
        }
    }
}

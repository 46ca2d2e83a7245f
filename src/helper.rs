use std::{fs, path::Path};

use log::{debug, error, trace};

use crate::{LensError, Result, SavedArticle};

/// Helper method to load a single article document from file
pub fn load_article_from_file(path: &Path) -> Result<SavedArticle> {
    debug!("Loading article from file: {}", path.display());
    let content = fs::read_to_string(path).map_err(|e| {
        error!("Failed to open article file {}: {}", path.display(), e);
        LensError::Io(e)
    })?;

    let article: SavedArticle = serde_json::from_str(&content)?;

    // Validate article
    if article.id.is_empty() || article.user_id.is_empty() {
        let error_mgs = format!(
            "Article from {} has an empty id or owner",
            path.display()
        );
        error!("{}", error_mgs);
        return Err(LensError::ApplicationError { message: error_mgs });
    }

    trace!("Successfully loaded article: {}", article.id);
    Ok(article)
}

// Helper for required-field presence checks at the API boundary
pub fn required(field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(LensError::MissingField { field });
    }
    Ok(())
}

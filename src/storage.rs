use std::{
    cmp::{Ordering, Reverse},
    collections::{BinaryHeap, HashMap},
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::SystemTime,
};

use chrono::Utc;
use log::{debug, error, info, trace, warn};
use tempfile::NamedTempFile;
use walkdir::WalkDir;
use zip::{write::FileOptions, ZipWriter};

use crate::{load_article_from_file, Config, LensError, Result, SavedArticle};

/// Manages the storage and retrieval of saved articles.
///
/// Articles live on disk as one JSON document per record, sharded by id
/// prefix, with an in-memory cache serving the read path. Every mutation is
/// written through to disk before the cache is touched.
pub struct ArticleStore {
    /// Application configuration
    config: Config,

    /// In-memory cache of articles, indexed by record id
    articles_cache: Arc<Mutex<HashMap<String, SavedArticle>>>,

    /// Flag indicating if the storage system is ready
    initialized: bool,
}

impl ArticleStore {
    /// Creates a new ArticleStore instance with the provided configuration.
    ///
    /// The store starts empty; call [`initialize`](Self::initialize) to
    /// create the directories and load existing documents from disk.
    pub fn new(config: Config) -> Self {
        let articles_cache = Arc::new(Mutex::new(HashMap::new()));

        Self {
            config,
            articles_cache,
            initialized: false,
        }
    }

    /// Initializes the storage system, creating directories and loading
    /// existing articles into the cache.
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        info!(
            "Initializing ArticleStore with config: data_dir={}, snapshot_dir={}",
            self.config.data_dir.display(),
            self.config.snapshot_dir.display()
        );

        // Ensure data directory exists
        if !self.config.data_dir.exists() {
            debug!(
                "Data directory does not exist, creating: {}",
                self.config.data_dir.display()
            );
            fs::create_dir_all(&self.config.data_dir).map_err(|e| {
                error!("Failed to create data directory: {}", e);
                LensError::DirectoryError {
                    path: self.config.data_dir.clone(),
                }
            })?;
        }

        // Ensure snapshot directory exists
        if !self.config.snapshot_dir.exists() {
            debug!(
                "Snapshot directory does not exist, creating: {}",
                self.config.snapshot_dir.display()
            );
            fs::create_dir_all(&self.config.snapshot_dir).map_err(|e| {
                error!("Failed to create snapshot directory: {}", e);
                LensError::DirectoryError {
                    path: self.config.snapshot_dir.clone(),
                }
            })?;
        }

        let count = self.load_articles()?;
        info!("ArticleStore initialization complete ({} articles)", count);

        self.initialized = true;

        Ok(())
    }

    /// Loads all article documents from disk into the in-memory cache
    ///
    /// # Returns
    ///
    /// The number of articles loaded in case of success or an error
    pub fn load_articles(&mut self) -> Result<usize> {
        // Ensure data directory exists
        if !self.config.data_dir.exists() {
            fs::create_dir_all(&self.config.data_dir).map_err(LensError::Io)?;
            info!("Created data directory: {}", self.config.data_dir.display());
            return Ok(0); // Nothing to load from an empty directory
        }

        // Collect documents into a buffer before acquiring the lock
        let mut articles_buffer = HashMap::new();
        let mut load_errors = 0;

        for entry in WalkDir::new(&self.config.data_dir)
            .min_depth(1) // Skip the root directory
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            // Only process JSON files
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                match load_article_from_file(path) {
                    Ok(article) => {
                        articles_buffer.insert(article.id.clone(), article);
                    }
                    Err(e) => {
                        // Collect errors but continue processing
                        warn!("Failed to load article from {}: {}", path.display(), e);
                        load_errors += 1;
                    }
                }
            }
        }

        let articles_count = articles_buffer.len();

        // Acquire the lock only once to swap in all loaded articles
        match self.articles_cache.lock() {
            Ok(mut cache) => {
                cache.clear();
                cache.extend(articles_buffer);
                info!("Loaded {} articles into cache", articles_count);
            }
            Err(_) => {
                return Err(LensError::LockAcquisitionFailed {
                    message: "Failed to acquire lock on article cache during load operation"
                        .to_string(),
                });
            }
        }

        if load_errors > 0 {
            error!("Encountered {} errors while loading articles", load_errors);
        }

        self.initialized = true;
        Ok(articles_count)
    }

    /// Saves an article to storage using atomic operations to prevent data
    /// corruption
    pub fn save_article(&self, article: &SavedArticle) -> Result<()> {
        info!("Saving article: {}", article.id);

        // Generate the file path based on the record id
        let file_path = self.article_path(&article.id);
        debug!("File path for article: {}", file_path.display());

        // Ensure the parent directory exists
        if let Some(parent) = file_path.parent() {
            if !parent.exists() {
                debug!("Creating parent directory: {}", parent.display());
                fs::create_dir_all(parent).map_err(|e| {
                    error!("Failed to create directory {}: {}", parent.display(), e);
                    LensError::Io(e)
                })?;
            }
        }

        // Create a temporary file in the same directory (for atomic operation)
        let dir = file_path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| {
            error!("Failed to create temporary file: {}", e);
            LensError::Io(e)
        })?;

        // Serialize the article to JSON
        trace!("Serializing article to JSON");
        let json = serde_json::to_string_pretty(article).map_err(|e| {
            error!("Failed to serialize article: {}", e);
            LensError::Serialization(e)
        })?;

        // Write to the temporary file
        temp_file.write_all(json.as_bytes()).map_err(|e| {
            error!("Failed to write to temporary file: {}", e);
            LensError::Io(e)
        })?;

        temp_file.flush().map_err(|e| {
            error!("Failed to flush temporary file: {}", e);
            LensError::Io(e)
        })?;

        // Atomically move the temporary file to the target location
        debug!("Performing atomic move of temporary file to final location");
        temp_file.persist(&file_path).map_err(|e| {
            error!(
                "Failed to persist file {}: {}",
                file_path.display(),
                e.error
            );
            LensError::Io(e.error)
        })?;

        // If we're initialized, update the cache as well
        if self.initialized {
            match self.articles_cache.lock() {
                Ok(mut cache) => {
                    cache.insert(article.id.clone(), article.clone());
                    trace!("Cache updated successfully");
                }
                Err(e) => {
                    // Continue since the file is saved already
                    warn!("Failed to acquire lock for cache update: {}", e);
                }
            }
        }

        info!("Article saved successfully: {}", article.id);
        Ok(())
    }

    /// Helper method to get the file path for an article
    fn article_path(&self, article_id: &str) -> PathBuf {
        // Create path with structure: data_dir/first_2_chars_of_id/id.json
        let id_prefix = if article_id.len() >= 2 {
            &article_id[0..2]
        } else {
            article_id
        };

        self.config
            .data_dir
            .join(id_prefix)
            .join(format!("{}.json", article_id))
    }

    /// Retrieves an article by its record id from the storage
    /// Returns Some(SavedArticle) if found, or None if not found
    pub fn get_article(&self, article_id: &str) -> Option<SavedArticle> {
        debug!("Retrieving article by id: {}", article_id);

        // First, try to get from cache
        match self.articles_cache.lock() {
            Ok(cache) => {
                if let Some(article) = cache.get(article_id) {
                    trace!("Article found in cache: {}", article_id);
                    return Some(article.clone());
                }
            }
            Err(e) => {
                error!("Failed to acquire lock on cache: {}", e);
                // Fall through to file system check
            }
        }

        // Not found in cache or couldn't access cache, try to load from disk
        let file_path = self.article_path(article_id);

        if file_path.exists() {
            debug!("Article file exists at: {}", file_path.display());
            match load_article_from_file(&file_path) {
                Ok(article) => {
                    // Update cache with the found article
                    if let Ok(mut cache) = self.articles_cache.lock() {
                        cache.insert(article_id.to_string(), article.clone());
                    } else {
                        warn!("Failed to acquire lock to update cache");
                    }
                    return Some(article);
                }
                Err(e) => {
                    error!("Error loading article from file: {}", e);
                    return None;
                }
            }
        }

        debug!("Article not found: {}", article_id);
        None
    }

    /// Retrieves all articles saved by a specific user, most recent first
    ///
    /// # Arguments
    ///
    /// * `user_id` - The owning user token
    ///
    /// # Returns
    ///
    /// A vector of that user's articles ordered by save time descending.
    /// An empty vector is a valid result for a user with no saved articles.
    pub fn articles_for_user(&self, user_id: &str) -> Result<Vec<SavedArticle>> {
        debug!("Retrieving articles for user: {}", user_id);

        // Acquire the lock only to clone the required data
        let articles_snapshot = {
            let cache =
                self.articles_cache
                    .lock()
                    .map_err(|_| LensError::LockAcquisitionFailed {
                        message: "Failed to acquire lock on article cache".to_string(),
                    })?;

            trace!("Scanning {} articles in cache", cache.len());

            cache
                .values()
                .filter(|article| article.user_id == user_id)
                .cloned()
                .collect::<Vec<SavedArticle>>()
        }; // Lock is released here

        // Sort outside the lock: newest saves first
        let mut articles = articles_snapshot;
        articles.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));

        info!(
            "Found {} saved articles for user {}",
            articles.len(),
            user_id
        );
        Ok(articles)
    }

    /// Deletes an article from both the file system and the in-memory cache
    ///
    /// The record must be owned by `user_id`: a missing record and a record
    /// owned by someone else produce the same error, so callers learn
    /// nothing about other users' data.
    ///
    /// # Arguments
    ///
    /// * `article_id` - The record id to delete
    /// * `user_id` - The token that must own the record
    pub fn delete_article(&self, article_id: &str, user_id: &str) -> Result<()> {
        info!("Deleting article {} for user {}", article_id, user_id);

        let article = match self.get_article(article_id) {
            Some(article) => article,
            None => {
                debug!("Cannot delete article {}: not found", article_id);
                return Err(LensError::ArticleNotFound {
                    id: article_id.to_string(),
                });
            }
        };

        if article.user_id != user_id {
            warn!(
                "Refusing to delete article {}: owner mismatch for user {}",
                article_id, user_id
            );
            return Err(LensError::ArticleNotFound {
                id: article_id.to_string(),
            });
        }

        // Delete from filesystem
        let file_path = self.article_path(article_id);

        if file_path.exists() {
            debug!("Deleting article file: {}", file_path.display());
            fs::remove_file(&file_path).map_err(|e| {
                error!(
                    "Failed to delete article file {}: {}",
                    file_path.display(),
                    e
                );
                LensError::Io(e)
            })?;

            // Prune the shard directory if this was its last document
            if let Some(parent) = file_path.parent() {
                if parent != self.config.data_dir {
                    self.cleanup_empty_directory(parent);
                }
            }
        } else {
            debug!("Article file doesn't exist on disk, only removing from cache");
        }

        // Remove from cache
        match self.articles_cache.lock() {
            Ok(mut cache) => {
                cache.remove(article_id);
                trace!("Article removed from cache");
            }
            Err(e) => {
                // Since we've already deleted the file, just log this error
                warn!(
                    "Failed to acquire lock to update cache after deletion: {}",
                    e
                );
            }
        }

        info!("Article {} successfully deleted", article_id);
        Ok(())
    }

    /// Helper method to clean up empty shard directories
    fn cleanup_empty_directory(&self, dir_path: &Path) {
        if !dir_path.exists() || dir_path == self.config.data_dir {
            return;
        }

        match fs::read_dir(dir_path) {
            Ok(entries) => {
                if entries.count() == 0 {
                    debug!("Removing empty directory: {}", dir_path.display());
                    if let Err(e) = fs::remove_dir(dir_path) {
                        warn!(
                            "Failed to remove empty directory {}: {}",
                            dir_path.display(),
                            e
                        );
                    }
                }
            }
            Err(e) => warn!("Failed to read directory {}: {}", dir_path.display(), e),
        }
    }

    /// Creates a snapshot of all saved articles in a ZIP archive
    ///
    /// # Returns
    ///
    /// The path to the created snapshot file in case of success or an error
    pub fn create_snapshot(&self) -> Result<PathBuf> {
        // Ensure snapshot directory exists
        if !self.config.snapshot_dir.exists() {
            fs::create_dir_all(&self.config.snapshot_dir).map_err(|e| {
                LensError::SnapshotFailed {
                    message: e.to_string(),
                }
            })?;
        }

        // Generate timestamped filename for the snapshot
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S%3f");
        let snapshot_filename = format!("locallens_snapshot_{}.zip", timestamp);
        let snapshot_path = self.config.snapshot_dir.join(snapshot_filename);

        let file = File::create(&snapshot_path).map_err(|e| LensError::SnapshotFailed {
            message: e.to_string(),
        })?;

        let mut zip = ZipWriter::new(file);

        // Lock the article cache for reading
        let articles_cache =
            self.articles_cache
                .lock()
                .map_err(|_| LensError::LockAcquisitionFailed {
                    message: "Failed to acquire lock on article cache".to_string(),
                })?;

        let articles_count = articles_cache.len();

        // Add each article to the ZIP, mirroring the on-disk shard layout
        for (id, article) in articles_cache.iter() {
            let options = FileOptions::<zip::write::ExtendedFileOptions>::default()
                .compression_method(zip::CompressionMethod::Deflated)
                .unix_permissions(0o644);

            let article_json = serde_json::to_string_pretty(&article)?;

            let folder_name = if id.len() >= 2 { &id[..2] } else { id };
            let entry_path = format!("{}/{}.json", folder_name, id);

            zip.start_file(entry_path, options)?;

            zip.write_all(article_json.as_bytes())
                .map_err(|e| LensError::SnapshotFailed {
                    message: format!("Failed to write article {} to snapshot: {}", id, e),
                })?;
        }

        zip.finish()?;

        // Clean up old snapshots if exceeding max_snapshots
        self.cleanup_old_snapshots()?;

        info!(
            "Snapshot created successfully with {} articles at {}",
            articles_count,
            snapshot_path.display()
        );

        Ok(snapshot_path)
    }

    /// Removes old snapshot files if the number of snapshots exceeds the
    /// configured limit. Uses a BinaryHeap for efficient identification of
    /// the oldest files.
    fn cleanup_old_snapshots(&self) -> Result<()> {
        // If max_snapshots is 0, keep all snapshots
        if self.config.max_snapshots == 0 {
            return Ok(());
        }

        // Custom wrapper to compare snapshot files by modification time
        #[derive(Debug, Eq)]
        struct SnapshotFile {
            path: PathBuf,
            modified_time: SystemTime,
        }

        impl PartialEq for SnapshotFile {
            fn eq(&self, other: &Self) -> bool {
                self.modified_time.eq(&other.modified_time)
            }
        }

        impl PartialOrd for SnapshotFile {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for SnapshotFile {
            // Compare by modified time (newer files are "greater")
            fn cmp(&self, other: &Self) -> Ordering {
                self.modified_time.cmp(&other.modified_time)
            }
        }

        // Min-heap via Reverse: the oldest file sits at the top
        let mut newest_snapshots: BinaryHeap<Reverse<SnapshotFile>> =
            BinaryHeap::with_capacity((self.config.max_snapshots + 1) as usize);

        let mut total_snapshots = 0;

        for entry in WalkDir::new(&self.config.snapshot_dir)
            .max_depth(1) // Only look in the immediate snapshot directory
            .into_iter()
            .filter_map(|entry| entry.ok())
        {
            let path = entry.path();

            // Only consider zip files that match our snapshot naming pattern
            if path.is_file()
                && path.extension().is_some_and(|ext| ext == "zip")
                && path
                    .file_name()
                    .is_some_and(|name| name.to_string_lossy().starts_with("locallens_snapshot_"))
            {
                if let Ok(metadata) = entry.metadata() {
                    if let Ok(modified_time) = metadata.modified() {
                        total_snapshots += 1;

                        newest_snapshots.push(Reverse(SnapshotFile {
                            path: path.to_path_buf(),
                            modified_time,
                        }));

                        // Over the limit: remove the oldest (top of min-heap)
                        if newest_snapshots.len() > self.config.max_snapshots as usize {
                            if let Some(Reverse(oldest)) = newest_snapshots.pop() {
                                match fs::remove_file(&oldest.path) {
                                    Ok(_) => {
                                        debug!("Removed old snapshot: {}", oldest.path.display());
                                    }
                                    Err(e) => {
                                        warn!(
                                            "Failed to remove old snapshot {}: {}",
                                            oldest.path.display(),
                                            e
                                        );
                                        // Continue processing even if we couldn't delete
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        let kept = newest_snapshots.len();
        let removed = total_snapshots - kept;

        if removed > 0 {
            debug!(
                "Cleanup complete: kept {} snapshots, removed {} old snapshots",
                kept, removed
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn test_config(dir: &TempDir) -> Config {
        Config {
            data_dir: dir.path().join("articles"),
            snapshot_dir: dir.path().join("snapshots"),
            auto_snapshot: false,
            max_snapshots: 2,
            ..Config::default()
        }
    }

    fn test_store() -> (ArticleStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let mut store = ArticleStore::new(test_config(&dir));
        store.initialize().unwrap();
        (store, dir)
    }

    fn sample_article(user_id: &str, title: &str) -> SavedArticle {
        SavedArticle::new(
            user_id.to_string(),
            title.to_string(),
            "http://example.com/story".to_string(),
            "Example Press".to_string(),
            None,
        )
    }

    #[test]
    fn save_then_list_contains_the_record() {
        let (store, _dir) = test_store();

        let before = store.articles_for_user("u1").unwrap();
        assert!(before.is_empty());

        let article = sample_article("u1", "A");
        store.save_article(&article).unwrap();

        let after = store.articles_for_user("u1").unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, article.id);
        assert_eq!(after[0].title, "A");
        assert_eq!(after[0].url, "http://example.com/story");
        assert_eq!(after[0].source, "Example Press");
        assert!(after[0].saved_at <= Utc::now());
    }

    #[test]
    fn list_is_scoped_to_the_requesting_user() {
        let (store, _dir) = test_store();

        store.save_article(&sample_article("u1", "Mine")).unwrap();
        store.save_article(&sample_article("u2", "Theirs")).unwrap();

        let mine = store.articles_for_user("u1").unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].title, "Mine");

        // A user with no records gets an empty list, not an error
        assert!(store.articles_for_user("nobody").unwrap().is_empty());
    }

    #[test]
    fn list_orders_newest_first() {
        let (store, _dir) = test_store();

        let now = Utc::now();
        for (title, age_secs) in [("t1", 30), ("t3", 10), ("t2", 20)] {
            let mut article = sample_article("u1", title);
            article.saved_at = now - Duration::seconds(age_secs);
            store.save_article(&article).unwrap();
        }

        let titles: Vec<String> = store
            .articles_for_user("u1")
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["t3", "t2", "t1"]);
    }

    #[test]
    fn saving_twice_creates_two_distinct_records() {
        let (store, _dir) = test_store();

        store.save_article(&sample_article("u1", "A")).unwrap();
        store.save_article(&sample_article("u1", "A")).unwrap();

        let articles = store.articles_for_user("u1").unwrap();
        assert_eq!(articles.len(), 2);
        assert_ne!(articles[0].id, articles[1].id);
    }

    #[test]
    fn delete_removes_the_record_and_repeats_as_not_found() {
        let (store, _dir) = test_store();

        let article = sample_article("u1", "A");
        store.save_article(&article).unwrap();

        store.delete_article(&article.id, "u1").unwrap();
        assert!(store.articles_for_user("u1").unwrap().is_empty());

        let err = store.delete_article(&article.id, "u1").unwrap_err();
        assert!(matches!(err, LensError::ArticleNotFound { .. }));
    }

    #[test]
    fn delete_with_mismatched_owner_leaves_the_record() {
        let (store, _dir) = test_store();

        let article = sample_article("u1", "A");
        store.save_article(&article).unwrap();

        let err = store.delete_article(&article.id, "u2").unwrap_err();
        assert!(matches!(err, LensError::ArticleNotFound { .. }));

        let remaining = store.articles_for_user("u1").unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, article.id);
    }

    #[test]
    fn articles_survive_a_restart() {
        let dir = TempDir::new().unwrap();
        let first_id;

        {
            let mut store = ArticleStore::new(test_config(&dir));
            store.initialize().unwrap();
            let article = sample_article("u1", "Persistent");
            store.save_article(&article).unwrap();
            first_id = article.id;
        }

        let mut reopened = ArticleStore::new(test_config(&dir));
        let loaded = reopened.load_articles().unwrap();
        assert_eq!(loaded, 1);

        let article = reopened.get_article(&first_id).unwrap();
        assert_eq!(article.title, "Persistent");
        assert_eq!(article.user_id, "u1");
    }

    #[test]
    fn snapshot_archives_every_article_and_prunes_old_files() {
        let (store, dir) = test_store();

        for title in ["A", "B", "C"] {
            store.save_article(&sample_article("u1", title)).unwrap();
        }

        let mut last_path = PathBuf::new();
        for _ in 0..3 {
            last_path = store.create_snapshot().unwrap();
            std::thread::sleep(std::time::Duration::from_millis(20));
        }

        let archive_file = File::open(&last_path).unwrap();
        let archive = ZipArchive::new(archive_file).unwrap();
        assert_eq!(archive.len(), 3);

        // max_snapshots is 2, so the first snapshot must be gone
        let snapshots = fs::read_dir(dir.path().join("snapshots"))
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "zip"))
            .count();
        assert_eq!(snapshots, 2);
    }
}

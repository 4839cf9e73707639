//! File-backed article store
//!
//! One Markdown file per article plus a `metadata.json` index mapping ids to
//! everything except the body. Index rewrites are serialized through one
//! lock per store, so concurrent saves never drop each other's records.

use crate::error::StoreError;
use crate::types::{Article, ArticleId, ArticleType, SourceSnippet, Tone};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const INDEX_FILE: &str = "metadata.json";

type StoreResult<T> = std::result::Result<T, StoreError>;

/// Index entry for one article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: ArticleId,
    pub title: String,
    pub filename: String,
    pub article_type: ArticleType,
    pub tone: Tone,
    pub target_length: usize,
    pub char_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub generated_by: Option<String>,
    #[serde(default)]
    pub sources: Vec<SourceSnippet>,
}

impl ArticleRecord {
    fn from_article(article: &Article) -> Self {
        Self {
            id: article.id,
            title: article.title.clone(),
            filename: format!("{}.md", article.id),
            article_type: article.article_type,
            tone: article.tone,
            target_length: article.target_length,
            char_count: article.char_count(),
            created_at: article.created_at,
            updated_at: article.updated_at,
            generated_by: article.generated_by.clone(),
            sources: article.sources.clone(),
        }
    }

    fn into_article(self, body: String) -> Article {
        Article {
            id: self.id,
            title: self.title,
            body,
            article_type: self.article_type,
            tone: self.tone,
            target_length: self.target_length,
            created_at: self.created_at,
            updated_at: self.updated_at,
            generated_by: self.generated_by,
            sources: self.sources,
        }
    }
}

/// User edit to a saved article
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// Aggregate numbers over all saved articles
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStatistics {
    pub total_articles: usize,
    pub total_chars: usize,
    pub average_chars: usize,
    pub by_type: BTreeMap<ArticleType, usize>,
    /// Keyed by creation month, `YYYY-MM`
    pub by_month: BTreeMap<String, usize>,
}

pub struct ArticleStore {
    root: PathBuf,
    /// Held across every read-modify-write of the index
    index_lock: Mutex<()>,
}

impl ArticleStore {
    /// Open (and create if needed) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
        tracing::debug!("Article store at {}", root.display());
        Ok(Self {
            root,
            index_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn save(&self, article: &Article) -> StoreResult<ArticleId> {
        let _guard = self.index_lock.lock();
        self.save_locked(article)
    }

    fn save_locked(&self, article: &Article) -> StoreResult<ArticleId> {
        let record = ArticleRecord::from_article(article);
        let path = self.root.join(&record.filename);
        fs::write(&path, &article.body).map_err(|e| StoreError::io(&path, e))?;

        let mut index = self.read_index()?;
        index.insert(record.id, record);
        self.write_index(&index)?;

        tracing::info!("Saved article {} to {}", article.id, path.display());
        Ok(article.id)
    }

    pub fn load(&self, id: ArticleId) -> StoreResult<Article> {
        let record = self
            .read_index()?
            .remove(&id)
            .ok_or(StoreError::NotFound(id))?;
        let path = self.root.join(&record.filename);
        let body = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        Ok(record.into_article(body))
    }

    pub fn update(&self, id: ArticleId, update: ArticleUpdate) -> StoreResult<Article> {
        let _guard = self.index_lock.lock();
        let mut article = self.load(id)?;
        if let Some(title) = update.title {
            article.title = title;
        }
        if let Some(body) = update.body {
            article.body = body;
        }
        article.updated_at = Utc::now();
        self.save_locked(&article)?;
        Ok(article)
    }

    /// Remove an article. Unknown ids are an error, not a no-op.
    pub fn delete(&self, id: ArticleId) -> StoreResult<()> {
        let _guard = self.index_lock.lock();
        let mut index = self.read_index()?;
        let record = index.remove(&id).ok_or(StoreError::NotFound(id))?;

        let path = self.root.join(&record.filename);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Article file {} was already gone", path.display());
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        }
        self.write_index(&index)?;

        tracing::info!("Deleted article {}", id);
        Ok(())
    }

    /// Index records, newest first
    pub fn list(&self, limit: usize) -> StoreResult<Vec<ArticleRecord>> {
        let mut records: Vec<ArticleRecord> = self.read_index()?.into_values().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }

    /// Case-insensitive keyword match over title and body.
    ///
    /// Every whitespace-separated term must appear. Newest first.
    pub fn search(&self, query: &str) -> StoreResult<Vec<ArticleRecord>> {
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        let mut hits = Vec::new();

        for record in self.list(usize::MAX)? {
            let path = self.root.join(&record.filename);
            let body = match fs::read_to_string(&path) {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!("Skipping unreadable article {}: {}", path.display(), e);
                    continue;
                }
            };
            let haystack = format!("{}\n{}", record.title, body).to_lowercase();
            if terms.iter().all(|t| haystack.contains(t.as_str())) {
                hits.push(record);
            }
        }
        Ok(hits)
    }

    pub fn statistics(&self) -> StoreResult<StoreStatistics> {
        let records = self.list(usize::MAX)?;
        let mut stats = StoreStatistics {
            total_articles: records.len(),
            ..Default::default()
        };

        for record in &records {
            stats.total_chars += record.char_count;
            *stats.by_type.entry(record.article_type).or_default() += 1;
            *stats
                .by_month
                .entry(record.created_at.format("%Y-%m").to_string())
                .or_default() += 1;
        }
        if stats.total_articles > 0 {
            stats.average_chars = stats.total_chars / stats.total_articles;
        }
        Ok(stats)
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    fn read_index(&self) -> StoreResult<HashMap<ArticleId, ArticleRecord>> {
        let path = self.index_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        serde_json::from_str(&raw).map_err(|source| StoreError::Index { path, source })
    }

    fn write_index(&self, index: &HashMap<ArticleId, ArticleRecord>) -> StoreResult<()> {
        let path = self.index_path();
        let json = serde_json::to_string_pretty(index).map_err(|source| StoreError::Index {
            path: path.clone(),
            source,
        })?;

        let tmp = self
            .root
            .join(format!("{}.{}.tmp", INDEX_FILE, Uuid::new_v4().simple()));
        fs::write(&tmp, json).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| StoreError::io(&path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn store() -> (TempDir, ArticleStore) {
        let dir = TempDir::new().unwrap();
        let store = ArticleStore::open(dir.path().join("saved_articles")).unwrap();
        (dir, store)
    }

    fn article(title: &str, body: &str) -> Article {
        Article::new(title, body, ArticleType::News, Tone::Formal, 800)
    }

    #[test]
    fn test_open_creates_directory() {
        let (dir, _store) = store();
        assert!(dir.path().join("saved_articles").is_dir());
    }

    #[test]
    fn test_save_load_round_trip() {
        let (_dir, store) = store();
        let mut original = article("Rates held", "# Rates held\n\nThe bank kept rates at 5%.");
        original.sources.push(SourceSnippet {
            url: "https://example.com/rates".to_string(),
            title: "Rates".to_string(),
            snippet: "Held at 5%".to_string(),
        });

        let id = store.save(&original).unwrap();
        let loaded = store.load(id).unwrap();

        assert_eq!(loaded.title, original.title);
        assert_eq!(loaded.body, original.body);
        assert_eq!(loaded.article_type, original.article_type);
        assert_eq!(loaded.tone, original.tone);
        assert_eq!(loaded.sources, original.sources);
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let (_dir, store) = store();
        let id = ArticleId::new();
        assert!(matches!(store.load(id), Err(StoreError::NotFound(missing)) if missing == id));
    }

    #[test]
    fn test_delete_missing_fails() {
        let (_dir, store) = store();
        assert!(matches!(
            store.delete(ArticleId::new()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_removes_file_and_record() {
        let (_dir, store) = store();
        let id = store.save(&article("Gone", "soon")).unwrap();
        let file = store.root().join(format!("{}.md", id));
        assert!(file.exists());

        store.delete(id).unwrap();

        assert!(!file.exists());
        assert!(store.list(10).unwrap().is_empty());
        assert!(matches!(store.delete(id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_update_changes_body_and_timestamp() {
        let (_dir, store) = store();
        let original = article("Draft", "first");
        let id = store.save(&original).unwrap();

        let updated = store
            .update(
                id,
                ArticleUpdate {
                    title: None,
                    body: Some("second draft".to_string()),
                },
            )
            .unwrap();

        assert_eq!(updated.title, "Draft");
        assert_eq!(store.load(id).unwrap().body, "second draft");
        assert!(updated.updated_at >= original.updated_at);
        assert_eq!(store.list(10).unwrap()[0].char_count, 12);
    }

    #[test]
    fn test_list_newest_first_with_limit() {
        let (_dir, store) = store();
        let mut older = article("Older", "a");
        older.created_at = Utc::now() - Duration::days(1);
        store.save(&older).unwrap();
        store.save(&article("Newer", "b")).unwrap();

        let listed = store.list(10).unwrap();
        assert_eq!(listed[0].title, "Newer");
        assert_eq!(listed[1].title, "Older");
        assert_eq!(store.list(1).unwrap().len(), 1);
    }

    #[test]
    fn test_search_matches_title_and_body() {
        let (_dir, store) = store();
        store.save(&article("Election night", "Turnout was high.")).unwrap();
        store.save(&article("Harvest report", "Wheat prices and turnout of workers.")).unwrap();

        assert_eq!(store.search("ELECTION").unwrap().len(), 1);
        assert_eq!(store.search("turnout").unwrap().len(), 2);
        assert_eq!(store.search("turnout wheat").unwrap().len(), 1);
        assert!(store.search("volcano").unwrap().is_empty());
    }

    #[test]
    fn test_statistics() {
        let (_dir, store) = store();
        store.save(&article("One", "1234")).unwrap();
        store
            .save(&Article::new("Two", "12", ArticleType::Blog, Tone::Casual, 300))
            .unwrap();

        let stats = store.statistics().unwrap();
        assert_eq!(stats.total_articles, 2);
        assert_eq!(stats.total_chars, 6);
        assert_eq!(stats.average_chars, 3);
        assert_eq!(stats.by_type[&ArticleType::News], 1);
        assert_eq!(stats.by_month.values().sum::<usize>(), 2);
    }

    #[test]
    fn test_concurrent_saves_keep_every_record() {
        let (_dir, store) = store();
        let store = std::sync::Arc::new(store);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store
                        .save(&article(&format!("Story {}", i), "body"))
                        .unwrap()
                })
            })
            .collect();
        let ids: Vec<ArticleId> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(store.list(usize::MAX).unwrap().len(), 16);
        for id in ids {
            assert!(store.load(id).is_ok(), "article {} was lost", id);
        }
        let leftovers = fs::read_dir(store.root())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_corrupt_index_is_reported() {
        let (_dir, store) = store();
        fs::write(store.root().join(INDEX_FILE), "{not json").unwrap();
        assert!(matches!(store.list(10), Err(StoreError::Index { .. })));
    }
}

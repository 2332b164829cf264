use crate::models::{
    AggregatedGroup, ComparisonRequest, StoredComparison, StoredTranslation, TranslationRequest,
};
use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const COMPARISONS: &str = "comparisons";
const TRANSLATIONS: &str = "translations";

/// One line of the store file
#[derive(Debug, Serialize, Deserialize)]
struct StoredLine {
    collection: String,
    document: serde_json::Value,
}

/// Append-only JSON-lines document store.
///
/// Each line holds one document tagged with its collection name.
pub struct DocumentStore {
    path: PathBuf,
}

impl DocumentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a ranked comparison along with the request that produced it
    pub fn insert_comparison(
        &self,
        request: &ComparisonRequest,
        comparison: &[AggregatedGroup],
    ) -> Result<StoredComparison> {
        let stored = StoredComparison {
            request: request.clone(),
            comparison: comparison.to_vec(),
            timestamp: Utc::now(),
        };
        self.append(COMPARISONS, &stored)?;
        Ok(stored)
    }

    /// Persist a single-model translation
    pub fn insert_translation(
        &self,
        request: &TranslationRequest,
        translation: &str,
    ) -> Result<StoredTranslation> {
        let stored = StoredTranslation {
            request: request.clone(),
            translation: translation.to_string(),
            timestamp: Utc::now(),
        };
        self.append(TRANSLATIONS, &stored)?;
        Ok(stored)
    }

    /// All stored comparisons whose message matches exactly, oldest first
    pub fn find_comparisons(&self, message: &str) -> Result<Vec<StoredComparison>> {
        let mut found = Vec::new();
        for line in self.read_collection(COMPARISONS)? {
            let stored: StoredComparison = serde_json::from_value(line)
                .with_context(|| format!("Malformed comparison in {}", self.path.display()))?;
            if stored.request.message == message {
                found.push(stored);
            }
        }
        Ok(found)
    }

    /// All stored translations, oldest first
    pub fn translations(&self) -> Result<Vec<StoredTranslation>> {
        self.read_collection(TRANSLATIONS)?
            .into_iter()
            .map(|line| {
                serde_json::from_value(line)
                    .with_context(|| format!("Malformed translation in {}", self.path.display()))
            })
            .collect()
    }

    fn append<T: Serialize>(&self, collection: &str, document: &T) -> Result<()> {
        let line = StoredLine {
            collection: collection.to_string(),
            document: serde_json::to_value(document)
                .context("Failed to serialize document to JSON")?,
        };
        let json = serde_json::to_string(&line).context("Failed to serialize document to JSON")?;

        self.ensure_directory_exists()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open store: {}", self.path.display()))?;
        writeln!(file, "{}", json)
            .with_context(|| format!("Failed to write to store: {}", self.path.display()))?;

        debug!(collection, path = %self.path.display(), "document stored");
        Ok(())
    }

    fn read_collection(&self, collection: &str) -> Result<Vec<serde_json::Value>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read store: {}", self.path.display()));
            }
        };

        let mut documents = Vec::new();
        for (number, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let parsed: StoredLine = serde_json::from_str(line).with_context(|| {
                format!("Corrupt line {} in store: {}", number + 1, self.path.display())
            })?;
            if parsed.collection == collection {
                documents.push(parsed.document);
            }
        }
        Ok(documents)
    }

    /// Ensure the directory for the store file exists
    fn ensure_directory_exists(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        Ok(())
    }
}

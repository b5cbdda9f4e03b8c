//! Corpus data model
//!
//! Records and vectors are produced offline and loaded read-only. A record's
//! identity is its position in the corpus; the same position addresses its
//! embedding and its row in the similarity index.

use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A single news article as produced by the ingestion pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Publication date, `YYYY-MM-DD`
    #[serde(default)]
    pub published: String,

    #[serde(default)]
    pub categories: Vec<String>,

    /// Persons, organisations and locations mentioned in the article
    #[serde(default)]
    pub entities: Vec<String>,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub content: String,
}

impl DocumentRecord {
    /// Text that is embedded for this record during the offline build
    pub fn embedding_text(&self) -> String {
        format!(
            "Categories: {}.\nEntities: {}.\nTitle: {}.\nContent: {}",
            self.categories.join(", "),
            self.entities.join(", "),
            self.title.trim(),
            self.content.trim()
        )
    }
}

/// A corpus record scored against one specific query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Cosine similarity in [-1, 1]
    pub score: f32,
    pub published: String,
    pub categories: Vec<String>,
    pub entities: Vec<String>,
    pub title: String,
    pub content: String,
}

impl EvidenceItem {
    pub fn from_record(record: &DocumentRecord, score: f32) -> Self {
        Self {
            score,
            published: record.published.clone(),
            categories: record.categories.clone(),
            entities: record.entities.clone(),
            title: record.title.clone(),
            content: record.content.clone(),
        }
    }
}

/// Read the records collection (a JSON array of records)
pub fn read_records(path: &Path) -> Result<Vec<DocumentRecord>> {
    let bytes = fs::read(path).map_err(|e| AppError::Internal {
        message: format!("Failed to read records from {}: {}", path.display(), e),
    })?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Read the vectors collection (a JSON array of float arrays)
pub fn read_vectors(path: &Path) -> Result<Vec<Vec<f32>>> {
    let bytes = fs::read(path).map_err(|e| AppError::Internal {
        message: format!("Failed to read vectors from {}: {}", path.display(), e),
    })?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Write the vectors collection produced by the offline build
pub fn write_vectors(path: &Path, vectors: &[Vec<f32>]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let bytes = serde_json::to_vec(vectors)?;
    fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default_to_empty() {
        let record: DocumentRecord =
            serde_json::from_str(r#"{"title": "Storm hits coast"}"#).unwrap();
        assert_eq!(record.title, "Storm hits coast");
        assert!(record.categories.is_empty());
        assert!(record.entities.is_empty());
        assert_eq!(record.published, "");
    }

    #[test]
    fn test_embedding_text_layout() {
        let record = DocumentRecord {
            published: "2024-05-01".into(),
            categories: vec!["Politics".into(), "Elections".into()],
            entities: vec!["Senate".into()],
            title: " Vote delayed ".into(),
            content: "The vote was postponed.".into(),
        };
        assert_eq!(
            record.embedding_text(),
            "Categories: Politics, Elections.\nEntities: Senate.\nTitle: Vote delayed.\nContent: The vote was postponed."
        );
    }

    #[test]
    fn test_evidence_from_record() {
        let record = DocumentRecord {
            published: "2024-01-02".into(),
            categories: vec![],
            entities: vec!["NASA".into()],
            title: "Launch".into(),
            content: "Rocket launched.".into(),
        };
        let item = EvidenceItem::from_record(&record, 0.75);
        assert_eq!(item.score, 0.75);
        assert_eq!(item.entities, vec!["NASA".to_string()]);
        assert_eq!(item.title, "Launch");
    }
}

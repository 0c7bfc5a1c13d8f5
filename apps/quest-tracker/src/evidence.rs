//! Evidence files and the title/keyword match used to auto-complete quests.

use crate::models::Quest;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extensions accepted as evidence.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Evidence errors.
#[derive(Debug, Error)]
pub enum EvidenceError {
    #[error("File not found: {0}")]
    Missing(PathBuf),
    #[error("Unsupported file type: {0} (expected jpg or png)")]
    UnsupportedType(PathBuf),
}

/// Check that `path` is an existing image file. Expands a leading `~`.
pub fn validate_evidence(path: &str) -> Result<PathBuf, EvidenceError> {
    let path = expand_home(path.trim());

    let supported = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)));
    if !supported {
        return Err(EvidenceError::UnsupportedType(path));
    }
    if !path.is_file() {
        return Err(EvidenceError::Missing(path));
    }
    Ok(path)
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => directories::BaseDirs::new()
            .map(|d| d.home_dir().join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

/// Source of words describing an evidence file.
///
/// A text-recognition or object-detection backend plugs in here.
pub trait Recognizer {
    fn labels(&self, path: &Path) -> Result<Vec<String>, EvidenceError>;
}

/// Uses the words of the file name, e.g. `run-5k_done.png` gives
/// `run`, `5k`, `done`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileNameRecognizer;

impl Recognizer for FileNameRecognizer {
    fn labels(&self, path: &Path) -> Result<Vec<String>, EvidenceError> {
        if !path.is_file() {
            return Err(EvidenceError::Missing(path.to_path_buf()));
        }
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(words(&stem).into_iter().collect())
    }
}

/// Result of analysing a quest's evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Analysis {
    /// Title words found in the evidence.
    Matched(Vec<String>),
    NoMatch,
    NoEvidence,
}

fn words(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Title words shared with `labels`, if they cover at least half the title.
pub fn title_matches(title: &str, labels: &[String]) -> Option<Vec<String>> {
    let title_words = words(title);
    let label_words: BTreeSet<String> = labels.iter().flat_map(|l| words(l)).collect();

    let common: Vec<String> = title_words.intersection(&label_words).cloned().collect();
    if common.is_empty() || common.len() < title_words.len() / 2 {
        return None;
    }
    Some(common)
}

/// Analyse the quest's attached evidence.
pub fn analyze(quest: &Quest, recognizer: &dyn Recognizer) -> Result<Analysis, EvidenceError> {
    let Some(path) = &quest.document else {
        return Ok(Analysis::NoEvidence);
    };

    let labels = recognizer.labels(path)?;
    tracing::debug!(quest = %quest.id, ?labels, "evidence labels");

    Ok(match title_matches(&quest.title, &labels) {
        Some(common) => Analysis::Matched(common),
        None => Analysis::NoMatch,
    })
}

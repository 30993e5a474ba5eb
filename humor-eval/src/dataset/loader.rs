//! JSONL split loading
//!
//! A split named `test` lives at `<dir>/test.jsonl`, one entry per line:
//!
//! ```text
//! {"contest_number": 512, "problem": "...", "answer": "C", "task": "ranking", "image": "images/512.png"}
//! ```
//!
//! `image` is resolved relative to the JSONL file. `image_base64` (with an
//! optional `image_media_type`) may be used instead for self-contained files.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::{Choice, DatasetEntry, EntrySource, ImagePayload, TaskKind, KNOWN_SPLITS};

/// Error type for dataset loading
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Split '{split}' not found at {}{}", .path.display(), split_hint(.split))]
    SplitNotFound { split: String, path: PathBuf },

    #[error("Line {line}: invalid JSON: {message}")]
    Parse { line: usize, message: String },

    #[error("Line {line}: missing field '{field}'")]
    MissingField { line: usize, field: &'static str },

    #[error("Line {line}: invalid value for '{field}': {message}")]
    InvalidValue {
        line: usize,
        field: &'static str,
        message: String,
    },

    #[error("Line {line}: failed to read image {}: {source}", .path.display())]
    Image {
        line: usize,
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Raw line shape; every field optional so absences get a precise error
#[derive(Debug, Deserialize)]
struct EntryLine {
    contest_number: Option<u32>,
    problem: Option<String>,
    answer: Option<String>,
    task: Option<String>,
    image: Option<String>,
    image_base64: Option<String>,
    image_media_type: Option<String>,
}

impl EntryLine {
    fn into_entry(self, line: usize, base_dir: &Path) -> Result<DatasetEntry, LoadError> {
        let contest_number = self
            .contest_number
            .ok_or(LoadError::MissingField { line, field: "contest_number" })?;
        let problem = self
            .problem
            .ok_or(LoadError::MissingField { line, field: "problem" })?;
        let answer: Choice = self
            .answer
            .ok_or(LoadError::MissingField { line, field: "answer" })?
            .trim()
            .parse()
            .map_err(|message| LoadError::InvalidValue { line, field: "answer", message })?;
        let task: TaskKind = self
            .task
            .ok_or(LoadError::MissingField { line, field: "task" })?
            .parse()
            .map_err(|message| LoadError::InvalidValue { line, field: "task", message })?;

        let image = match (self.image, self.image_base64) {
            (_, Some(data)) => {
                let media_type = self.image_media_type.unwrap_or_else(|| "image/png".to_string());
                ImagePayload::from_base64(&data, media_type).map_err(|e| LoadError::InvalidValue {
                    line,
                    field: "image_base64",
                    message: e.to_string(),
                })?
            }
            (Some(relative), None) => {
                let path = base_dir.join(relative);
                ImagePayload::from_file(&path)
                    .map_err(|source| LoadError::Image { line, path, source })?
            }
            (None, None) => return Err(LoadError::MissingField { line, field: "image" }),
        };

        Ok(DatasetEntry {
            image,
            contest_number,
            problem,
            answer,
            task,
        })
    }
}

/// Parse JSONL content; ranking entries come first, then matching, each in
/// file order.
pub fn load_entries_from_str(content: &str, base_dir: &Path) -> Result<Vec<DatasetEntry>, LoadError> {
    let mut ranking = Vec::new();
    let mut matching = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = idx + 1;
        if raw.trim().is_empty() {
            continue;
        }

        let parsed: EntryLine = serde_json::from_str(raw).map_err(|e| LoadError::Parse {
            line,
            message: e.to_string(),
        })?;
        let entry = parsed.into_entry(line, base_dir)?;

        match entry.task {
            TaskKind::Ranking => ranking.push(entry),
            TaskKind::Matching => matching.push(entry),
        }
    }

    ranking.extend(matching);
    Ok(ranking)
}

/// Names the published splits when `split` is not one of them
fn split_hint(split: &str) -> String {
    if KNOWN_SPLITS.contains(&split) {
        String::new()
    } else {
        format!(" (known splits: {})", KNOWN_SPLITS.join(", "))
    }
}

/// Load a split from `<dir>/<split>.jsonl`
pub fn load_entries(dir: impl AsRef<Path>, split: &str) -> Result<Vec<DatasetEntry>, LoadError> {
    let path = dir.as_ref().join(format!("{}.jsonl", split));
    if !path.is_file() {
        return Err(LoadError::SplitNotFound {
            split: split.to_string(),
            path,
        });
    }

    let content = std::fs::read_to_string(&path)?;
    let base_dir = path.parent().unwrap_or(Path::new("."));
    let entries = load_entries_from_str(&content, base_dir)?;
    tracing::info!("Loaded {} entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// Directory of JSONL split files
#[derive(Debug, Clone)]
pub struct JsonlDataset {
    dir: PathBuf,
}

impl JsonlDataset {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl EntrySource for JsonlDataset {
    fn entries(&self, split: &str) -> Result<Vec<DatasetEntry>, LoadError> {
        load_entries(&self.dir, split)
    }
}

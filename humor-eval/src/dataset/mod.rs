//! Dataset entries and split loading

pub mod loader;

pub use loader::{load_entries, load_entries_from_str, JsonlDataset, LoadError};

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use crate::interpreter::Choice;

/// Default split when none is given
pub const DEFAULT_SPLIT: &str = "test";

/// Splits published with the caption dataset
pub const KNOWN_SPLITS: [&str; 3] = ["test", "test_hard", "test_very_hard"];

/// The two task kinds in the caption dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Ranking,
    Matching,
}

impl TaskKind {
    pub fn all() -> [TaskKind; 2] {
        [TaskKind::Ranking, TaskKind::Matching]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Ranking => "ranking",
            TaskKind::Matching => "matching",
        }
    }
}

impl std::str::FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ranking" => Ok(TaskKind::Ranking),
            "matching" => Ok(TaskKind::Matching),
            _ => Err(format!("Unknown task: {}", s)),
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoded image bytes plus their media type
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            bytes,
            media_type: media_type.into(),
        }
    }

    /// Read an image file, inferring the media type from its extension
    pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        Ok(Self::new(bytes, media_type_for(path)))
    }

    pub fn from_base64(data: &str, media_type: impl Into<String>) -> Result<Self, base64::DecodeError> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(data.trim())?;
        Ok(Self::new(bytes, media_type))
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    /// `data:` URL accepted by OpenAI-style `image_url` content parts
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.to_base64())
    }
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Media type from a file extension; unknown extensions are treated as PNG
pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/png",
    }
}

/// One labeled question from the dataset
#[derive(Debug, Clone)]
pub struct DatasetEntry {
    pub image: ImagePayload,
    pub contest_number: u32,
    pub problem: String,
    pub answer: Choice,
    pub task: TaskKind,
}

/// Anything that can produce the ordered entries of a split
pub trait EntrySource: Send + Sync {
    fn entries(&self, split: &str) -> Result<Vec<DatasetEntry>, LoadError>;
}

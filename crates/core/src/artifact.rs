//! Artifacts produced by a cycle: the prompt bundle and the generated image.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The composed scene input together with the refined prompt returned by the
/// text-generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptBundle {
    pub composed_input: String,
    pub generated_prompt: String,
    pub created_at: DateTime<Utc>,
}

/// An image persisted by the acquirer. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Remote URL the bytes were downloaded from
    pub source_url: String,
    pub byte_len: usize,
    /// `<prefix>_<YYYYMMDDHHMMSS>.png`
    pub file_name: String,
    pub stored_path: PathBuf,
    /// Host-relative path, `/local/<file_name>`
    pub local_path: String,
    /// Fully-qualified URL built from the public base URL
    pub full_url: String,
    pub created_at: DateTime<Utc>,
}

impl GeneratedImage {
    /// The subset published to consumers.
    pub fn reference(&self) -> ImageReference {
        ImageReference {
            file_name: self.file_name.clone(),
            local_path: self.local_path.clone(),
            full_url: self.full_url.clone(),
            created_at: self.created_at,
        }
    }
}

/// Published pointer to the latest image.
///
/// The referenced file may be evicted at any time; readers treat a missing
/// file as "not found".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    pub file_name: String,
    pub local_path: String,
    pub full_url: String,
    pub created_at: DateTime<Utc>,
}

//! Print Copy - the duplicate surface, ready to hand to a printer
//!
//! A print copy is only issued when the duplicate matches the preview.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::engine::JCard;
use crate::hashing::record_hash;
use crate::populate::FieldRecord;
use crate::sync::SurfaceRole;
use crate::ENGINE_VERSION;

#[derive(Debug, Error)]
pub enum PrintError {
    #[error("Print duplicate diverged from preview ({preview} != {duplicate})")]
    Diverged { preview: String, duplicate: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintCopy {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub engine_version: String,
    pub record_hash: String,
    pub fingerprint: String,
    pub html: String,
}

impl PrintCopy {
    /// Render the duplicate of `jcard`, started from `record`.
    pub fn prepare(jcard: &JCard, record: &FieldRecord) -> Result<Self, PrintError> {
        let preview = jcard.fingerprint(SurfaceRole::Preview)?;
        let duplicate = jcard.fingerprint(SurfaceRole::Duplicate)?;
        if preview != duplicate {
            return Err(PrintError::Diverged { preview, duplicate });
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            engine_version: ENGINE_VERSION.to_string(),
            record_hash: record_hash(record)?,
            fingerprint: duplicate,
            html: jcard.to_html(SurfaceRole::Duplicate),
        })
    }
}

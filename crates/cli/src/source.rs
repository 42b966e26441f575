//! Answers stored as one `<search>.json` file per document.

use std::path::{Path, PathBuf};

use inactives_recon::model::DocumentAnswers;
use inactives_recon::{AnswerSource, ReconError};

/// Parse an answer file.
///
/// A JSON object with a `group1` key is a full answer record. Anything else
/// is taken to be the raw group-1 answer text on its own.
pub fn parse_answers(text: &str) -> Result<DocumentAnswers, ReconError> {
    let is_record = serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| v.as_object().map(|o| o.contains_key("group1")))
        .unwrap_or(false);

    if is_record {
        serde_json::from_str(text).map_err(|e| ReconError::AnswerParse(e.to_string()))
    } else {
        Ok(DocumentAnswers {
            group1: text.to_string(),
            ..Default::default()
        })
    }
}

pub fn read_answers(path: &Path) -> Result<DocumentAnswers, ReconError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))?;
    parse_answers(&text)
}

pub struct DirAnswerSource {
    dir: PathBuf,
}

impl DirAnswerSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl AnswerSource for DirAnswerSource {
    fn answers(&self, search: &str) -> Result<Option<DocumentAnswers>, ReconError> {
        let path = self.dir.join(format!("{search}.json"));
        if !path.is_file() {
            return Ok(None);
        }
        read_answers(&path).map(Some)
    }
}

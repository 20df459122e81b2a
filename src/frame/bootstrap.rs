use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::document::{attribute, CardDocument};

/// Element id of the embedded bootstrap script.
pub const BOOTSTRAP_ELEMENT_ID: &str = "FB";
pub const TYPED_ANSWER_PREFIX: &str = "type:";

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("invalid bootstrap json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which side of the card is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Face {
    Question,
    Answer,
}

impl TryFrom<u8> for Face {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Face::Question),
            1 => Ok(Face::Answer),
            other => Err(format!("face must be 0 or 1, got {other}")),
        }
    }
}

impl From<Face> for u8 {
    fn from(face: Face) -> Self {
        match face {
            Face::Question => 0,
            Face::Answer => 1,
        }
    }
}

/// The page-local `FB` binding injected by the host. Read, never written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameBootstrap {
    pub card_id: String,
    pub face: Face,
    #[serde(default)]
    pub typed_answers: BTreeMap<String, String>,
}

impl FrameBootstrap {
    pub fn new(card_id: impl Into<String>, face: Face) -> Self {
        Self {
            card_id: card_id.into(),
            face,
            typed_answers: BTreeMap::new(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, BootstrapError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Read `<script type="application/json" id="FB">` if the card carries one.
    pub fn from_document(document: &CardDocument) -> Result<Option<Self>, BootstrapError> {
        let Some(script) = document.element_by_id(BOOTSTRAP_ELEMENT_ID) else {
            return Ok(None);
        };
        let is_json = attribute(&script, "type")
            .map(|kind| kind.trim().eq_ignore_ascii_case("application/json"))
            .unwrap_or(false);
        if !is_json {
            return Ok(None);
        }
        Self::from_json(&script.text_contents()).map(Some)
    }

    /// Typed answers whose field names carry the `type:` prefix.
    pub fn typed_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.typed_answers
            .iter()
            .filter(|(name, _)| name.starts_with(TYPED_ANSWER_PREFIX))
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

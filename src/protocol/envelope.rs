use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::key::ResourceKey;

pub const RESOURCE_REQUEST: &str = "resource-request";
pub const RESOURCE_RESPONSE: &str = "resource-response";
pub const ANSWER_SUBMIT: &str = "answer-submit";
pub const SUBMIT: &str = "submit";

/// Kinds with a fixed payload shape; extensions may not use them.
pub fn is_reserved_kind(kind: &str) -> bool {
    matches!(kind, RESOURCE_REQUEST | RESOURCE_RESPONSE | ANSWER_SUBMIT | SUBMIT)
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid base64 resource data: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("extension kind '{0}' is reserved by the protocol")]
    ReservedKind(String),
    #[error("'{kind}' envelope is missing '{field}'")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
}

/// A submitted form control value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Single(String),
    Multiple(Vec<String>),
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Single(value.to_string())
    }
}

impl From<Vec<&str>> for AnswerValue {
    fn from(values: Vec<&str>) -> Self {
        AnswerValue::Multiple(values.into_iter().map(str::to_string).collect())
    }
}

pub type AnswerFields = BTreeMap<String, AnswerValue>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceResponse {
    pub key: ResourceKey,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    ResourceRequest(ResourceKey),
    ResourceResponse(ResourceResponse),
    AnswerSubmit(AnswerFields),
    /// Host asks the frame to submit its form on behalf of an answer button.
    Submit {
        button: String,
    },
    Extension {
        kind: String,
        payload: JsonValue,
    },
}

impl Message {
    pub fn kind(&self) -> &str {
        match self {
            Message::ResourceRequest(_) => RESOURCE_REQUEST,
            Message::ResourceResponse(_) => RESOURCE_RESPONSE,
            Message::AnswerSubmit(_) => ANSWER_SUBMIT,
            Message::Submit { .. } => SUBMIT,
            Message::Extension { kind, .. } => kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub context_id: String,
    pub message: Message,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelope {
    kind: String,
    #[serde(default)]
    context_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<ResourceKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fields: Option<AnswerFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    button: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<JsonValue>,
}

impl Envelope {
    pub fn new(context_id: impl Into<String>, message: Message) -> Self {
        Self {
            context_id: context_id.into(),
            message,
        }
    }

    pub fn kind(&self) -> &str {
        self.message.kind()
    }

    pub fn encode(&self) -> Result<String, EnvelopeError> {
        let mut wire = WireEnvelope {
            kind: self.kind().to_string(),
            context_id: self.context_id.clone(),
            ..WireEnvelope::default()
        };
        match &self.message {
            Message::ResourceRequest(key) => {
                wire.key = Some(key.clone());
            }
            Message::ResourceResponse(response) => {
                wire.key = Some(response.key.clone());
                wire.content_type = Some(response.content_type.clone());
                wire.data = Some(BASE64.encode(&response.data));
            }
            Message::AnswerSubmit(fields) => {
                wire.fields = Some(fields.clone());
            }
            Message::Submit { button } => {
                wire.button = Some(button.clone());
            }
            Message::Extension { kind, payload } => {
                if is_reserved_kind(kind) {
                    return Err(EnvelopeError::ReservedKind(kind.clone()));
                }
                wire.payload = Some(payload.clone());
            }
        }
        Ok(serde_json::to_string(&wire)?)
    }

    pub fn decode(raw: &str) -> Result<Self, EnvelopeError> {
        let wire: WireEnvelope = serde_json::from_str(raw)?;
        let message = match wire.kind.as_str() {
            RESOURCE_REQUEST => {
                Message::ResourceRequest(require(wire.key, RESOURCE_REQUEST, "key")?)
            }
            RESOURCE_RESPONSE => {
                let key = require(wire.key, RESOURCE_RESPONSE, "key")?;
                let data = require(wire.data, RESOURCE_RESPONSE, "data")?;
                Message::ResourceResponse(ResourceResponse {
                    key,
                    content_type: wire.content_type.unwrap_or_default(),
                    data: BASE64.decode(data)?,
                })
            }
            ANSWER_SUBMIT => {
                Message::AnswerSubmit(require(wire.fields, ANSWER_SUBMIT, "fields")?)
            }
            SUBMIT => Message::Submit {
                button: require(wire.button, SUBMIT, "button")?,
            },
            _ => Message::Extension {
                kind: wire.kind.clone(),
                payload: wire.payload.unwrap_or(JsonValue::Null),
            },
        };
        Ok(Self {
            context_id: wire.context_id,
            message,
        })
    }
}

fn require<T>(value: Option<T>, kind: &'static str, field: &'static str) -> Result<T, EnvelopeError> {
    value.ok_or(EnvelopeError::MissingField { kind, field })
}

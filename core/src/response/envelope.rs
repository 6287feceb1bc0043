use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::response::card::Card;
use crate::response::speech::OutputSpeech;

/// Session working memory, keyed by attribute name.
pub type Attributes = serde_json::Map<String, Value>;

pub const ENVELOPE_VERSION: &str = "1.0";
/// Attribute key holding the workflow state.
pub const STATE_KEY: &str = "STATE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reprompt {
    pub output_speech: OutputSpeech,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    pub output_speech: OutputSpeech,
    pub should_end_session: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reprompt: Option<Reprompt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
}

/// Response returned to the voice platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub version: String,
    pub response: ResponseBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_attributes: Option<Attributes>,
}

impl ResponseEnvelope {
    pub fn new(response: ResponseBody) -> Self {
        Self {
            version: ENVELOPE_VERSION.to_string(),
            response,
            session_attributes: None,
        }
    }

    pub fn should_end_session(&self) -> bool {
        self.response.should_end_session
    }

    /// Writes the workflow state into the attribute snapshot carried by this
    /// envelope, creating the snapshot when the envelope has none.
    pub fn stamp_state(&mut self, state: &str) {
        self.session_attributes
            .get_or_insert_with(Attributes::new)
            .insert(STATE_KEY.to_string(), Value::String(state.to_string()));
    }

    pub fn state(&self) -> Option<&str> {
        self.session_attributes
            .as_ref()
            .and_then(|attributes| attributes.get(STATE_KEY))
            .and_then(Value::as_str)
    }
}

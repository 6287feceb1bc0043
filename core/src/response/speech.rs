//! Output speech normalization.
//!
//! Skill code hands speech either as plain text or as finished SSML. The
//! envelope only knows the two tagged shapes in [`OutputSpeech`].

use serde::{Deserialize, Serialize};

pub const SSML_TYPE: &str = "SSML";

/// Speech as it appears in the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutputSpeech {
    PlainText {
        text: String,
    },
    #[serde(rename = "SSML")]
    Ssml {
        ssml: String,
    },
}

impl OutputSpeech {
    pub fn as_str(&self) -> &str {
        match self {
            OutputSpeech::PlainText { text } => text,
            OutputSpeech::Ssml { ssml } => ssml,
        }
    }

    pub fn is_ssml(&self) -> bool {
        matches!(self, OutputSpeech::Ssml { .. })
    }
}

/// Speech handed to the formatter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawSpeech")]
pub enum SpeechInput {
    /// Plain content, spoken as text.
    Plain(String),
    /// Final markup, passed through untouched.
    Ssml(String),
}

impl From<&str> for SpeechInput {
    fn from(value: &str) -> Self {
        SpeechInput::Plain(value.to_string())
    }
}

impl From<String> for SpeechInput {
    fn from(value: String) -> Self {
        SpeechInput::Plain(value)
    }
}

/// Accepts a bare string or a `{ "type": ..., "speech": ... }` object.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSpeech {
    Bare(String),
    Typed {
        #[serde(rename = "type", default)]
        kind: Option<String>,
        speech: String,
    },
}

impl From<RawSpeech> for SpeechInput {
    fn from(raw: RawSpeech) -> Self {
        match raw {
            RawSpeech::Bare(text) => SpeechInput::Plain(text),
            RawSpeech::Typed { kind, speech } if kind.as_deref() == Some(SSML_TYPE) => {
                SpeechInput::Ssml(speech)
            }
            RawSpeech::Typed { speech, .. } => SpeechInput::Plain(speech),
        }
    }
}

/// Maps formatter input onto the envelope speech shape.
pub fn create_speech_object(input: SpeechInput) -> OutputSpeech {
    match input {
        SpeechInput::Ssml(ssml) => OutputSpeech::Ssml { ssml },
        SpeechInput::Plain(text) => OutputSpeech::PlainText { text },
    }
}

/// Wraps `message` in a single `<speak>` root.
///
/// Existing markup is not detected, so wrapping an already wrapped message
/// nests the roots.
pub fn wrap_ssml(message: &str) -> String {
    format!("<speak> {message} </speak>")
}

/// Speech helper used by every finalization entry point.
pub fn ssml_response(message: &str) -> SpeechInput {
    SpeechInput::Ssml(wrap_ssml(message))
}

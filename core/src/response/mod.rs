//! Response envelope construction.

pub mod builder;
pub mod card;
pub mod directive;
pub mod envelope;
pub mod speech;

pub use builder::{build_response, ResponseOptions};
pub use card::{Card, CardContent, CardImage, CardRequest};
pub use directive::ResponseDirective;
pub use envelope::{
    Attributes, Reprompt, ResponseBody, ResponseEnvelope, ENVELOPE_VERSION, STATE_KEY,
};
pub use speech::{create_speech_object, ssml_response, wrap_ssml, OutputSpeech, SpeechInput};

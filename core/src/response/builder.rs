use crate::response::card::CardRequest;
use crate::response::envelope::{Attributes, Reprompt, ResponseBody, ResponseEnvelope};
use crate::response::speech::{create_speech_object, SpeechInput};

/// Everything the builder needs to produce an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseOptions {
    pub output: SpeechInput,
    pub reprompt: Option<SpeechInput>,
    pub card: CardRequest,
    pub should_end_session: bool,
    pub session_attributes: Option<Attributes>,
}

impl ResponseOptions {
    pub fn new<S: Into<SpeechInput>>(output: S, should_end_session: bool) -> Self {
        Self {
            output: output.into(),
            reprompt: None,
            card: CardRequest::None,
            should_end_session,
            session_attributes: None,
        }
    }
}

/// Builds the envelope. Content lengths and markup are not checked.
pub fn build_response(options: ResponseOptions) -> ResponseEnvelope {
    let card = options.card.resolve();
    let body = ResponseBody {
        output_speech: create_speech_object(options.output),
        should_end_session: options.should_end_session,
        reprompt: options.reprompt.map(|speech| Reprompt {
            output_speech: create_speech_object(speech),
        }),
        card,
    };

    let mut envelope = ResponseEnvelope::new(body);
    envelope.session_attributes = options
        .session_attributes
        .filter(|attributes| !attributes.is_empty());
    envelope
}

use crate::response::builder::ResponseOptions;
use crate::response::card::{CardContent, CardRequest};
use crate::response::envelope::Attributes;
use crate::response::speech::ssml_response;

/// One of the six ways a skill can finish a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseDirective {
    Tell {
        speech: String,
    },
    Ask {
        speech: String,
        reprompt: String,
    },
    AskWithCard {
        speech: String,
        reprompt: String,
        card: CardContent,
    },
    TellWithCard {
        speech: String,
        card: CardContent,
    },
    TellWithLinkAccountCard {
        speech: String,
    },
    AskWithLinkAccountCard {
        speech: String,
        reprompt: String,
    },
}

impl ResponseDirective {
    pub fn tell<S: Into<String>>(speech: S) -> Self {
        Self::Tell {
            speech: speech.into(),
        }
    }

    pub fn ask<S: Into<String>, R: Into<String>>(speech: S, reprompt: R) -> Self {
        Self::Ask {
            speech: speech.into(),
            reprompt: reprompt.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ResponseDirective::Tell { .. } => "tell",
            ResponseDirective::Ask { .. } => "ask",
            ResponseDirective::AskWithCard { .. } => "ask_with_card",
            ResponseDirective::TellWithCard { .. } => "tell_with_card",
            ResponseDirective::TellWithLinkAccountCard { .. } => "tell_with_link_account_card",
            ResponseDirective::AskWithLinkAccountCard { .. } => "ask_with_link_account_card",
        }
    }

    /// `tell` variants close the session, `ask` variants keep it open.
    pub fn should_end_session(&self) -> bool {
        matches!(
            self,
            ResponseDirective::Tell { .. }
                | ResponseDirective::TellWithCard { .. }
                | ResponseDirective::TellWithLinkAccountCard { .. }
        )
    }

    /// Lowers the directive to builder options. Speech and reprompt are both
    /// wrapped as SSML.
    pub fn into_options(self, attributes: &Attributes) -> ResponseOptions {
        let should_end_session = self.should_end_session();
        let (speech, reprompt, card) = match self {
            ResponseDirective::Tell { speech } => (speech, None, CardRequest::None),
            ResponseDirective::Ask { speech, reprompt } => {
                (speech, Some(reprompt), CardRequest::None)
            }
            ResponseDirective::AskWithCard {
                speech,
                reprompt,
                card,
            } => (speech, Some(reprompt), CardRequest::Content(card)),
            ResponseDirective::TellWithCard { speech, card } => {
                (speech, None, CardRequest::Content(card))
            }
            ResponseDirective::TellWithLinkAccountCard { speech } => {
                (speech, None, CardRequest::LinkAccount)
            }
            ResponseDirective::AskWithLinkAccountCard { speech, reprompt } => {
                (speech, Some(reprompt), CardRequest::LinkAccount)
            }
        };

        ResponseOptions {
            output: ssml_response(&speech),
            reprompt: reprompt.as_deref().map(ssml_response),
            card,
            should_end_session,
            session_attributes: Some(attributes.clone()),
        }
    }
}

use serde::{Deserialize, Serialize};

/// Image urls attached to a Standard card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub small_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large_image_url: Option<String>,
}

impl CardImage {
    pub fn small<S: Into<String>>(url: S) -> Self {
        Self {
            small_image_url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn large<S: Into<String>>(url: S) -> Self {
        Self {
            large_image_url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Copy keeping only the urls that carry a value, `None` when neither does.
    pub fn supplied(&self) -> Option<CardImage> {
        let keep = |url: &Option<String>| url.as_ref().filter(|value| !value.is_empty()).cloned();
        let image = CardImage {
            small_image_url: keep(&self.small_image_url),
            large_image_url: keep(&self.large_image_url),
        };

        if image.small_image_url.is_none() && image.large_image_url.is_none() {
            None
        } else {
            Some(image)
        }
    }
}

/// Visual companion to a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Card {
    Simple {
        title: String,
        content: String,
    },
    Standard {
        title: String,
        text: String,
        image: CardImage,
    },
    LinkAccount,
}

impl Card {
    pub fn as_str(&self) -> &'static str {
        match self {
            Card::Simple { .. } => "Simple",
            Card::Standard { .. } => "Standard",
            Card::LinkAccount => "LinkAccount",
        }
    }
}

/// Title, body and optional image for the card-carrying responses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardContent {
    pub title: String,
    pub content: String,
    pub image: Option<CardImage>,
}

impl CardContent {
    pub fn new<T: Into<String>, C: Into<String>>(title: T, content: C) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: CardImage) -> Self {
        self.image = Some(image);
        self
    }

    /// Simple card, upgraded to Standard when the image has a usable url.
    /// Blank title or content yields no card at all.
    pub fn to_card(&self) -> Option<Card> {
        if self.title.is_empty() || self.content.is_empty() {
            return None;
        }

        match self.image.as_ref().and_then(CardImage::supplied) {
            Some(image) => Some(Card::Standard {
                title: self.title.clone(),
                text: self.content.clone(),
                image,
            }),
            None => Some(Card::Simple {
                title: self.title.clone(),
                content: self.content.clone(),
            }),
        }
    }
}

/// Card choice carried by [`super::ResponseOptions`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CardRequest {
    #[default]
    None,
    Content(CardContent),
    LinkAccount,
}

impl CardRequest {
    pub fn resolve(&self) -> Option<Card> {
        match self {
            CardRequest::None => None,
            CardRequest::Content(content) => content.to_card(),
            CardRequest::LinkAccount => Some(Card::LinkAccount),
        }
    }
}

//! Page and site content published through the CMS.
//!
//! Content is stored as JSON and parsed into these types when it is read, so
//! handlers never pass untyped maps around.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::product::SystemType;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("malformed content: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("'{0}' is not a #rrggbb colour")]
    InvalidColour(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub label: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ContentBlock {
    Hero {
        heading: String,
        #[serde(default)]
        subheading: Option<String>,
        #[serde(default)]
        image_url: Option<String>,
        #[serde(default)]
        cta: Option<Link>,
    },
    RichText {
        body: String,
    },
    FeatureGrid {
        #[serde(default)]
        heading: Option<String>,
        features: Vec<Feature>,
    },
    CallToAction {
        heading: String,
        #[serde(default)]
        body: Option<String>,
        link: Link,
    },
    Faq {
        items: Vec<FaqItem>,
    },
    ProductShowcase {
        system: SystemType,
        #[serde(default)]
        heading: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub blocks: Vec<ContentBlock>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Page {
    pub fn parse_blocks(raw: serde_json::Value) -> Result<Vec<ContentBlock>, ContentError> {
        Ok(serde_json::from_value(raw)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteHeader {
    pub logo_url: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub nav: Vec<Link>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub primary_color: String,
    pub secondary_color: String,
    pub font_family: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteSettings {
    pub header: SiteHeader,
    pub theme: Theme,
}

impl SiteSettings {
    pub fn parse(header: serde_json::Value, theme: serde_json::Value) -> Result<Self, ContentError> {
        let header: SiteHeader = serde_json::from_value(header)?;
        let theme: Theme = serde_json::from_value(theme)?;
        for colour in [&theme.primary_color, &theme.secondary_color] {
            if !is_hex_colour(colour) {
                return Err(ContentError::InvalidColour(colour.clone()));
            }
        }
        Ok(Self { header, theme })
    }
}

fn is_hex_colour(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

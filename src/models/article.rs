use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{deserialize_id, deserialize_optional_text};

/// An article as pushed by the server in a `new-item` frame.
///
/// `id`, `title` and `content` are required; a payload missing any of them
/// is rejected by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Server identifier (document stores send it as `_id`)
    #[serde(alias = "_id", deserialize_with = "deserialize_id")]
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default, deserialize_with = "deserialize_optional_text")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_text")]
    pub summary: Option<String>,
    /// Cover image URL
    #[serde(
        default,
        deserialize_with = "deserialize_optional_text",
        alias = "image"
    )]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_text")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Article {
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            category: None,
            summary: None,
            image_url: None,
            author: None,
            created_at: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Text suitable for a one-line listing: the summary if present,
    /// otherwise the first line of the content.
    pub fn teaser(&self) -> &str {
        match self.summary.as_deref() {
            Some(summary) => summary,
            None => self.content.lines().next().unwrap_or_default(),
        }
    }
}

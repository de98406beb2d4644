//! Dataset (Bible version) metadata

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Metadata describing one dataset, as returned by `GET /{dataset}`
///
/// Only the fields the importer writes are modelled; the crawler stores the
/// raw document untouched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetMeta {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub abbreviation: String,
    pub title: String,
    pub localized_title: String,
    #[serde(default)]
    pub localized_abbreviation: Option<String>,
    pub language_tag: String,
    #[serde(default)]
    pub copyright: Option<String>,
    #[serde(default)]
    pub promotional_content: Option<String>,
    #[serde(default)]
    pub publisher_url: Option<String>,
    #[serde(default, alias = "youversion_deep_link")]
    pub deep_link: Option<String>,
    #[serde(default)]
    pub organization_id: Option<String>,
}

impl DatasetMeta {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Title used in progress messages
    pub fn display_title(&self) -> &str {
        if self.localized_title.is_empty() {
            &self.title
        } else {
            &self.localized_title
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A status feed (`{ stations: [{ name, status }] }`) or a detail feed
/// (`{ stations: [{ name, display, status }] }`). Both share this shape;
/// the detail feed simply carries a display label as well.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct StationFeed {
    #[serde(default)]
    pub stations: Vec<FeedEntry>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct FeedEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    /// 1 = active, 0 = inactive. Kept loose so unexpected encodings fall
    /// through to "inactive" instead of failing the feed.
    #[serde(default)]
    pub status: Option<Value>,
}

impl FeedEntry {
    pub fn is_active(&self) -> bool {
        self.status.as_ref().and_then(Value::as_f64) == Some(1.0)
    }

    /// Display label, if the feed provides a non-blank one.
    pub fn display_label(&self) -> Option<&str> {
        self.display
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
    }
}

impl StationFeed {
    pub fn parse_feed_json(json: &str) -> serde_json::Result<StationFeed> {
        serde_json::from_str(json)
    }

    /// Name-keyed view of the feed. Later entries replace earlier ones with
    /// the same name.
    pub fn by_name(&self) -> HashMap<&str, &FeedEntry> {
        self.stations
            .iter()
            .map(|entry| (entry.name.as_str(), entry))
            .collect()
    }
}

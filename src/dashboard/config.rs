use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Options accepted when creating a widget. Every field is optional; missing
/// values fall back to the variant defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetConfig {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Variant seed data in its persisted shape.
    #[serde(default)]
    pub data: Value,
}

impl WidgetConfig {
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// Persisted form of one widget.
///
/// The kind stays a plain string here so a snapshot written by a build with
/// more variants still parses; unknown kinds are rejected when restoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetSnapshot {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub data: Value,
}

impl WidgetSnapshot {
    pub fn to_config(&self) -> WidgetConfig {
        WidgetConfig {
            id: Some(self.id.clone()),
            title: Some(self.title.clone()),
            data: self.data.clone(),
        }
    }
}

pub fn parse_snapshots(content: &str) -> anyhow::Result<Vec<WidgetSnapshot>> {
    Ok(serde_json::from_str(content)?)
}

pub fn snapshots_to_json(snapshots: &[WidgetSnapshot]) -> anyhow::Result<String> {
    Ok(serde_json::to_string(snapshots)?)
}

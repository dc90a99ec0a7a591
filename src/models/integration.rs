use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Key under which the widget stores its entry in the parent's params.
pub const HUBSPOT_KEY: &str = "hubspot";
/// Display label stored alongside the credentials.
pub const HUBSPOT_TYPE: &str = "HubSpot";

/// JavaScript-style truthiness of a JSON value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Opaque credentials issued by the backend. Never inspected here, only
/// carried around and serialized back when loading items.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(Value);

impl Credentials {
    /// Returns `None` for values that do not count as credentials
    /// (`null`, `false`, `0`, `""`).
    pub fn from_value(value: Value) -> Option<Self> {
        if is_truthy(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }
}

/// One integration's slot in the parent-owned params.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntegrationEntry {
    #[serde(default)]
    pub credentials: Value,
    #[serde(rename = "type")]
    pub integration_type: String,
}

impl IntegrationEntry {
    pub fn hubspot(credentials: Credentials) -> Self {
        Self {
            credentials: credentials.into_value(),
            integration_type: HUBSPOT_TYPE.to_string(),
        }
    }

    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::from_value(self.credentials.clone())
    }
}

/// Integration name -> entry. Owned by whatever embeds the widget; the widget
/// reads it and asks its owner to merge new entries in.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntegrationParams(BTreeMap<String, IntegrationEntry>);

impl IntegrationParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&IntegrationEntry> {
        self.0.get(key)
    }

    pub fn credentials(&self, key: &str) -> Option<Credentials> {
        self.get(key).and_then(IntegrationEntry::credentials)
    }

    pub fn has_credentials(&self, key: &str) -> bool {
        self.get(key).map_or(false, |entry| is_truthy(&entry.credentials))
    }

    /// Returns a copy with `entry` stored under `key`, keeping every other
    /// integration untouched.
    pub fn merged(&self, key: &str, entry: IntegrationEntry) -> Self {
        let mut next = self.clone();
        next.0.insert(key.to_string(), entry);
        next
    }

    pub fn merge(&mut self, key: &str, entry: IntegrationEntry) {
        self.0.insert(key.to_string(), entry);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Item shape produced by the integrations backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntegrationItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub directory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_path_or_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_id: Option<String>,
    #[serde(default = "default_visibility", skip_serializing_if = "Option::is_none")]
    pub visibility: Option<bool>,
}

fn default_visibility() -> Option<bool> {
    Some(true)
}

/// Decodes the items in a load payload. Anything that is not an array, and
/// any element that does not look like an item, is skipped.
pub fn decode_items(payload: &Value) -> Vec<IntegrationItem> {
    payload
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| IntegrationItem::deserialize(item).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// What the widget shows after a load: the payload pretty-printed, plus item
/// counts per type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadedItems {
    pub text: String,
    pub counts: BTreeMap<String, usize>,
}

impl LoadedItems {
    pub fn from_payload(payload: &Value) -> Result<Self, serde_json::Error> {
        let text = serde_json::to_string_pretty(payload)?;
        let mut counts = BTreeMap::new();
        for item in decode_items(payload) {
            let kind = item.item_type.unwrap_or_else(|| "other".to_string());
            *counts.entry(kind).or_insert(0) += 1;
        }
        Ok(Self { text, counts })
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// e.g. `2 companies, 5 contacts`
    pub fn summary(&self) -> String {
        self.counts
            .iter()
            .map(|(kind, count)| format!("{} {}", count, kind))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

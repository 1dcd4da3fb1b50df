//! Backend entities.
//!
//! Field names follow the backend's camelCase. Fields the backend sends
//! that are not modelled here are kept in `extra` so nothing is lost when
//! an entity is passed through to a consumer.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A last-modified stamp as the backend reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    /// Milliseconds since the Unix epoch.
    Millis(i64),
    /// RFC 3339 text, e.g. `2024-05-01T12:00:00Z`.
    Text(String),
}

impl Timestamp {
    /// Milliseconds since the Unix epoch, if the value can be interpreted.
    pub fn as_millis(&self) -> Option<i64> {
        match self {
            Timestamp::Millis(ms) => Some(*ms),
            Timestamp::Text(text) => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.timestamp_millis()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunicationChannel {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl CommunicationChannel {
    pub fn email(address: impl Into<String>) -> Self {
        Self {
            kind: "email".into(),
            value: address.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<CommunicationChannel>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teamspace_id: Option<String>,
    #[serde(default)]
    pub project_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Anything with a last-modified stamp; used for ordering and triggers.
pub trait Modified {
    fn modified_millis(&self) -> Option<i64>;
}

impl Modified for Issue {
    fn modified_millis(&self) -> Option<i64> {
        self.last_modified.as_ref().and_then(Timestamp::as_millis)
    }
}

impl Modified for Document {
    fn modified_millis(&self) -> Option<i64> {
        self.last_modified.as_ref().and_then(Timestamp::as_millis)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    #[test]
    fn test_timestamp_forms() {
        // ---
        assert_eq!(Timestamp::Millis(1_000).as_millis(), Some(1_000));
        assert_eq!(
            Timestamp::Text("1970-01-01T00:00:01Z".into()).as_millis(),
            Some(1_000)
        );
        assert_eq!(Timestamp::Text("yesterday".into()).as_millis(), None);
    }

    #[test]
    fn test_issue_keeps_unknown_fields() {
        // ---
        let issue: Issue = serde_json::from_value(json!({
            "id": "i1",
            "title": "Crash on save",
            "priority": "high",
            "lastModified": 1700000000000i64,
            "assignee": "p1"
        }))
        .unwrap();

        assert_eq!(issue.priority, Some(Priority::High));
        assert_eq!(issue.modified_millis(), Some(1_700_000_000_000));
        assert_eq!(issue.extra.get("assignee"), Some(&json!("p1")));

        let back = serde_json::to_value(&issue).unwrap();
        assert_eq!(back["assignee"], json!("p1"));
        assert_eq!(back["lastModified"], json!(1700000000000i64));
    }

    #[test]
    fn test_channel_wire_name() {
        // ---
        let channel = CommunicationChannel::email("ada@example.com");
        assert_eq!(
            serde_json::to_value(channel).unwrap(),
            json!({ "type": "email", "value": "ada@example.com" })
        );
    }
}

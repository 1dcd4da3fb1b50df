use serde::Serialize;

use super::props::{PropKind, PropSpec};
use super::{Action, Trigger};

/// Plugin manifest served at `/manifest`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub version: &'static str,
    pub auth: AuthSpec,
    pub actions: Vec<ActionSpec>,
    pub triggers: Vec<TriggerSpec>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSpec {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub props: Vec<PropSpec>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSpec {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub props: Vec<PropSpec>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerSpec {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub props: Vec<PropSpec>,
}

impl Manifest {
    /// Manifest for the full catalog.
    pub fn build() -> Self {
        // ---
        Self {
            name: "huly",
            display_name: "Huly",
            description: "People, projects, issues, documents and milestones in Huly",
            version: env!("CARGO_PKG_VERSION"),
            auth: AuthSpec {
                kind: "custom",
                props: vec![PropSpec::required("wsUrl", "WebSocket URL", PropKind::ShortText)],
            },
            actions: Action::ALL
                .into_iter()
                .map(|action| ActionSpec {
                    name: action.name(),
                    display_name: action.display_name(),
                    description: action.description(),
                    props: action.props(),
                })
                .collect(),
            triggers: Trigger::ALL
                .into_iter()
                .map(|trigger| TriggerSpec {
                    name: trigger.name(),
                    display_name: trigger.display_name(),
                    description: trigger.description(),
                    kind: "POLLING",
                    props: trigger.props(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    #[test]
    fn test_manifest_lists_whole_catalog() {
        // ---
        let manifest = serde_json::to_value(Manifest::build()).unwrap();

        assert_eq!(manifest["name"], json!("huly"));
        assert_eq!(manifest["actions"].as_array().unwrap().len(), 8);
        assert_eq!(manifest["triggers"].as_array().unwrap().len(), 2);
        assert_eq!(manifest["triggers"][0]["type"], json!("POLLING"));
    }

    #[test]
    fn test_prop_kind_is_flattened() {
        // ---
        let manifest = serde_json::to_value(Manifest::build()).unwrap();
        let priority = manifest["actions"]
            .as_array()
            .unwrap()
            .iter()
            .find(|a| a["name"] == json!("create_issue"))
            .unwrap()["props"]
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["name"] == json!("priority"))
            .cloned()
            .unwrap();

        assert_eq!(
            priority,
            json!({
                "name": "priority",
                "displayName": "Priority",
                "type": "STATIC_DROPDOWN",
                "options": ["low", "medium", "high"],
                "required": false
            })
        );
    }
}

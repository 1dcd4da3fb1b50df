//! Polling triggers.
//!
//! A poll carries the cursor returned by the previous poll (epoch millis of
//! the newest item seen). The first poll has no cursor and only establishes
//! the baseline, so enabling a trigger does not replay history. Items
//! without a usable `lastModified` are never reported.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::props::{PropKind, PropSpec};
use super::{decode_props, encode_result, require_text, CatalogResult};
use crate::huly::{HulyApi, Modified};

/// One polling trigger the plugin offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    NewIssue,
    NewDocument,
}

/// Outcome of one poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollResult {
    /// New items, oldest first.
    pub items: Vec<Value>,
    /// Cursor to send with the next poll.
    pub cursor: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewIssueInput {
    project_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewDocumentInput {
    teamspace_id: String,
}

impl Trigger {
    pub const ALL: [Trigger; 2] = [Trigger::NewIssue, Trigger::NewDocument];

    pub fn name(self) -> &'static str {
        match self {
            Trigger::NewIssue => "new_issue",
            Trigger::NewDocument => "new_document",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|trigger| trigger.name() == name)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Trigger::NewIssue => "New Issue",
            Trigger::NewDocument => "New Document",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Trigger::NewIssue => "Fires when an issue is created or updated in a project",
            Trigger::NewDocument => "Fires when a document is created or updated in a teamspace",
        }
    }

    pub fn props(self) -> Vec<PropSpec> {
        match self {
            Trigger::NewIssue => vec![PropSpec::required(
                "projectId",
                "Project ID",
                PropKind::ShortText,
            )],
            Trigger::NewDocument => vec![PropSpec::required(
                "teamspaceId",
                "Teamspace ID",
                PropKind::ShortText,
            )],
        }
    }

    /// Fetch and return what changed since `cursor`.
    pub async fn poll(
        self,
        api: &HulyApi,
        props: Value,
        cursor: Option<i64>,
    ) -> CatalogResult<PollResult> {
        // ---
        match self {
            Trigger::NewIssue => {
                let input: NewIssueInput = decode_props(props)?;
                require_text("projectId", &input.project_id)?;
                let issues = api.find_issues(&input.project_id).await?;
                select_newer(issues, cursor)
            }
            Trigger::NewDocument => {
                let input: NewDocumentInput = decode_props(props)?;
                require_text("teamspaceId", &input.teamspace_id)?;
                let documents = api.find_documents(&input.teamspace_id, None).await?;
                select_newer(documents, cursor)
            }
        }
    }
}

fn select_newer<T>(items: Vec<T>, cursor: Option<i64>) -> CatalogResult<PollResult>
where
    T: Modified + Serialize,
{
    // ---
    let newest = items.iter().filter_map(Modified::modified_millis).max();

    let Some(cursor) = cursor else {
        return Ok(PollResult {
            items: Vec::new(),
            cursor: newest,
        });
    };

    let mut fresh: Vec<(i64, T)> = items
        .into_iter()
        .filter_map(|item| item.modified_millis().map(|ms| (ms, item)))
        .filter(|(ms, _)| *ms > cursor)
        .collect();
    fresh.sort_by_key(|(ms, _)| *ms);

    let items = fresh
        .into_iter()
        .map(|(_, item)| encode_result(item))
        .collect::<CatalogResult<Vec<_>>>()?;

    Ok(PollResult {
        items,
        cursor: Some(newest.map_or(cursor, |newest| newest.max(cursor))),
    })
}

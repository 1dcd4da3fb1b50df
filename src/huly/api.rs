//! Typed operations over the backend.
//!
//! Each operation builds a request payload, sends it through the shared
//! [`RpcClient`] and decodes the result. Multi-step creations (person +
//! email channel, milestone + issue assignments, document + project links)
//! run their steps sequentially on the same client.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::huly::types::{
    //
    CommunicationChannel,
    Document,
    Issue,
    Milestone,
    Modified,
    Person,
    Priority,
    Project,
};
use crate::{RpcClient, RpcError};

/// Failure of a domain operation.
#[derive(thiserror::Error, Debug)]
pub enum HulyError {
    /// The RPC call for `action` failed.
    #[error("error {action}: {source}")]
    Request {
        action: &'static str,
        #[source]
        source: RpcError,
    },

    /// The backend answered `action` with a result of the wrong shape.
    #[error("error {action}: unexpected result: {source}")]
    Decode {
        action: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl HulyError {
    /// The underlying RPC error, when there is one.
    pub fn rpc_error(&self) -> Option<&RpcError> {
        match self {
            HulyError::Request { source, .. } => Some(source),
            HulyError::Decode { .. } => None,
        }
    }
}

pub type HulyResult<T> = std::result::Result<T, HulyError>;

/// Fields for a new issue.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIssue {
    pub project_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

/// Fields for a new milestone.
#[derive(Debug, Clone, Default)]
pub struct NewMilestone {
    pub project_id: String,
    pub name: String,
    pub due_date: Option<String>,
    pub issue_ids: Vec<String>,
}

/// Fields for a new document.
#[derive(Debug, Clone, Default)]
pub struct NewDocument {
    pub teamspace_id: String,
    pub name: String,
    pub content: String,
    pub project_ids: Vec<String>,
}

#[derive(Serialize)]
struct PersonQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<&'a str>,
}

#[derive(Serialize)]
struct ProjectQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentQuery<'a> {
    teamspace_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MilestoneParams<'a> {
    project_id: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_date: Option<&'a str>,
}

/// Domain API over one client.
#[derive(Clone)]
pub struct HulyApi {
    client: RpcClient,
}

impl HulyApi {
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }

    /// The client requests go through.
    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    async fn request<P, R>(&self, action: &'static str, method: &str, params: P) -> HulyResult<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        // ---
        let value = self.client.send(method, params).await.map_err(|source| {
            log_warn!("{method} failed: {source}");
            HulyError::Request { action, source }
        })?;

        serde_json::from_value(value).map_err(|source| HulyError::Decode { action, source })
    }

    /// Search people by free-text query (all people when `None`).
    pub async fn find_person(&self, query: Option<&str>) -> HulyResult<Vec<Person>> {
        self.request("finding person", "person.find", PersonQuery { query }).await
    }

    /// Look up projects by id and/or name.
    pub async fn find_project(
        &self,
        id: Option<&str>,
        name: Option<&str>,
    ) -> HulyResult<Vec<Project>> {
        self.request("finding project", "project.find", ProjectQuery { id, name }).await
    }

    /// Issues of a project, most recently modified first.
    ///
    /// Issues without a usable `lastModified` sort after all others.
    pub async fn find_issues(&self, project_id: &str) -> HulyResult<Vec<Issue>> {
        // ---
        let mut issues: Vec<Issue> = self
            .request("finding issues", "issue.find", json!({ "projectId": project_id }))
            .await?;

        issues.sort_by(|a, b| b.modified_millis().cmp(&a.modified_millis()));
        Ok(issues)
    }

    /// Documents of a teamspace, optionally filtered by name.
    pub async fn find_documents(
        &self,
        teamspace_id: &str,
        name: Option<&str>,
    ) -> HulyResult<Vec<Document>> {
        self.request(
            "finding documents",
            "document.find",
            DocumentQuery { teamspace_id, name },
        )
        .await
    }

    /// Create a person and attach `email` as their email channel.
    ///
    /// Both steps must succeed.
    pub async fn create_person(&self, name: &str, email: &str) -> HulyResult<Person> {
        // ---
        let mut person: Person = self
            .request("creating person", "person.create", json!({ "name": name }))
            .await?;

        let channel = CommunicationChannel::email(email);

        let _: serde_json::Value = self
            .request(
                "adding channel",
                "person.addChannel",
                json!({ "personId": person.id, "channel": channel }),
            )
            .await?;

        person.channels = vec![channel];
        Ok(person)
    }

    /// Create an issue.
    pub async fn create_issue(&self, issue: &NewIssue) -> HulyResult<Issue> {
        self.request("creating issue", "issue.create", issue).await
    }

    /// Create a milestone, then assign each issue to it.
    ///
    /// An assignment the backend rejects is logged and skipped; a transport
    /// failure or timeout aborts the operation.
    pub async fn create_milestone(&self, milestone: &NewMilestone) -> HulyResult<Milestone> {
        // ---
        let params = MilestoneParams {
            project_id: &milestone.project_id,
            name: &milestone.name,
            due_date: milestone.due_date.as_deref(),
        };

        let mut created: Milestone = self
            .request("creating milestone", "milestone.create", params)
            .await?;

        for issue_id in &milestone.issue_ids {
            let assigned = self
                .client
                .send(
                    "milestone.assignIssue",
                    json!({ "milestoneId": created.id, "issueId": issue_id }),
                )
                .await;

            let what = format!("assigning issue {issue_id} to milestone");
            tolerate_backend_error(assigned, &what).map_err(|source| HulyError::Request {
                action: "assigning issue",
                source,
            })?;
        }

        created.issues = milestone.issue_ids.clone();
        Ok(created)
    }

    /// Create a document, then link it to each project.
    ///
    /// Same failure policy as [`create_milestone`](Self::create_milestone).
    pub async fn create_document(&self, document: &NewDocument) -> HulyResult<Document> {
        // ---
        let mut created: Document = self
            .request(
                "creating document",
                "document.create",
                json!({
                    "teamspaceId": document.teamspace_id,
                    "name": document.name,
                    "content": document.content,
                }),
            )
            .await?;

        for project_id in &document.project_ids {
            let linked = self
                .client
                .send(
                    "document.linkProject",
                    json!({ "documentId": created.id, "projectId": project_id }),
                )
                .await;

            let what = format!("linking document to project {project_id}");
            tolerate_backend_error(linked, &what).map_err(|source| HulyError::Request {
                action: "linking document",
                source,
            })?;
        }

        created.project_ids = document.project_ids.clone();
        Ok(created)
    }
}

/// Follow-up steps: a backend error is a warning, anything else propagates.
fn tolerate_backend_error<T>(outcome: crate::Result<T>, _what: &str) -> crate::Result<()> {
    // ---
    match outcome {
        Ok(_) => Ok(()),
        Err(RpcError::Backend { message: _message }) => {
            log_warn!("error {_what}: {_message}");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

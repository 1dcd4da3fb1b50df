//! Plugin actions.

use serde::Deserialize;
use serde_json::Value;

use super::props::{PropKind, PropSpec};
use super::{decode_props, encode_result, require_text, CatalogResult};
use crate::huly::{HulyApi, NewDocument, NewIssue, NewMilestone, Priority};

/// One action the plugin offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    FindPerson,
    FindProject,
    FindIssues,
    FindDocuments,
    CreatePerson,
    CreateIssue,
    CreateMilestone,
    CreateDocument,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct FindPersonInput {
    #[serde(default)]
    query: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct FindProjectInput {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct FindIssuesInput {
    project_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct FindDocumentsInput {
    teamspace_id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CreatePersonInput {
    name: String,
    email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CreateIssueInput {
    project_id: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<Priority>,
    #[serde(default)]
    due_date: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CreateMilestoneInput {
    project_id: String,
    name: String,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    issue_ids: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CreateDocumentInput {
    teamspace_id: String,
    name: String,
    content: String,
    #[serde(default)]
    project_ids: Vec<String>,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::FindPerson,
        Action::FindProject,
        Action::FindIssues,
        Action::FindDocuments,
        Action::CreatePerson,
        Action::CreateIssue,
        Action::CreateMilestone,
        Action::CreateDocument,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Action::FindPerson => "find_person",
            Action::FindProject => "find_project",
            Action::FindIssues => "find_issues",
            Action::FindDocuments => "find_documents",
            Action::CreatePerson => "create_person",
            Action::CreateIssue => "create_issue",
            Action::CreateMilestone => "create_milestone",
            Action::CreateDocument => "create_document",
        }
    }

    /// Look an action up by its manifest name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.name() == name)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Action::FindPerson => "Find Person",
            Action::FindProject => "Find Project",
            Action::FindIssues => "Find Issues",
            Action::FindDocuments => "Find Documents",
            Action::CreatePerson => "Create Person",
            Action::CreateIssue => "Create Issue",
            Action::CreateMilestone => "Create Milestone",
            Action::CreateDocument => "Create Document",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Action::FindPerson => "Search for people by name or email",
            Action::FindProject => "Find a project by id or name",
            Action::FindIssues => "List the issues of a project, most recently modified first",
            Action::FindDocuments => "Find documents in a teamspace",
            Action::CreatePerson => "Create a person with an email channel",
            Action::CreateIssue => "Create an issue in a project",
            Action::CreateMilestone => "Create a milestone and assign issues to it",
            Action::CreateDocument => "Create a document and link it to projects",
        }
    }

    pub fn props(self) -> Vec<PropSpec> {
        // ---
        use PropKind::*;

        match self {
            Action::FindPerson => vec![PropSpec::optional("query", "Search Query", ShortText)],
            Action::FindProject => vec![
                PropSpec::optional("id", "Project ID", ShortText),
                PropSpec::optional("name", "Project Name", ShortText),
            ],
            Action::FindIssues => vec![PropSpec::required("projectId", "Project ID", ShortText)],
            Action::FindDocuments => vec![
                PropSpec::required("teamspaceId", "Teamspace ID", ShortText),
                PropSpec::optional("name", "Document Name", ShortText),
            ],
            Action::CreatePerson => vec![
                PropSpec::required("name", "Name", ShortText),
                PropSpec::required("email", "Email", ShortText),
            ],
            Action::CreateIssue => vec![
                PropSpec::required("projectId", "Project ID", ShortText),
                PropSpec::required("title", "Title", ShortText),
                PropSpec::optional("description", "Description", LongText),
                PropSpec::optional(
                    "priority",
                    "Priority",
                    StaticDropdown {
                        options: vec!["low", "medium", "high"],
                    },
                ),
                PropSpec::optional("dueDate", "Due Date", DateTime),
            ],
            Action::CreateMilestone => vec![
                PropSpec::required("projectId", "Project ID", ShortText),
                PropSpec::required("name", "Name", ShortText),
                PropSpec::optional("dueDate", "Due Date", DateTime),
                PropSpec::optional("issueIds", "Issue IDs", Array),
            ],
            Action::CreateDocument => vec![
                PropSpec::required("teamspaceId", "Teamspace ID", ShortText),
                PropSpec::required("name", "Name", ShortText),
                PropSpec::required("content", "Content", LongText),
                PropSpec::optional("projectIds", "Project IDs", Array),
            ],
        }
    }

    /// Validate `props` and run the action, returning its JSON result.
    pub async fn invoke(self, api: &HulyApi, props: Value) -> CatalogResult<Value> {
        // ---
        log_debug!("invoking action {}", self.name());

        let result = match self {
            Action::FindPerson => {
                let input: FindPersonInput = decode_props(props)?;
                encode_result(api.find_person(input.query.as_deref()).await?)?
            }
            Action::FindProject => {
                let input: FindProjectInput = decode_props(props)?;
                encode_result(
                    api.find_project(input.id.as_deref(), input.name.as_deref())
                        .await?,
                )?
            }
            Action::FindIssues => {
                let input: FindIssuesInput = decode_props(props)?;
                require_text("projectId", &input.project_id)?;
                encode_result(api.find_issues(&input.project_id).await?)?
            }
            Action::FindDocuments => {
                let input: FindDocumentsInput = decode_props(props)?;
                require_text("teamspaceId", &input.teamspace_id)?;
                encode_result(
                    api.find_documents(&input.teamspace_id, input.name.as_deref())
                        .await?,
                )?
            }
            Action::CreatePerson => {
                let input: CreatePersonInput = decode_props(props)?;
                require_text("name", &input.name)?;
                require_text("email", &input.email)?;
                encode_result(api.create_person(&input.name, &input.email).await?)?
            }
            Action::CreateIssue => {
                let input: CreateIssueInput = decode_props(props)?;
                require_text("projectId", &input.project_id)?;
                require_text("title", &input.title)?;
                let issue = NewIssue {
                    project_id: input.project_id,
                    title: input.title,
                    description: input.description,
                    priority: input.priority,
                    due_date: input.due_date,
                };
                encode_result(api.create_issue(&issue).await?)?
            }
            Action::CreateMilestone => {
                let input: CreateMilestoneInput = decode_props(props)?;
                require_text("projectId", &input.project_id)?;
                require_text("name", &input.name)?;
                let milestone = NewMilestone {
                    project_id: input.project_id,
                    name: input.name,
                    due_date: input.due_date,
                    issue_ids: input.issue_ids,
                };
                encode_result(api.create_milestone(&milestone).await?)?
            }
            Action::CreateDocument => {
                let input: CreateDocumentInput = decode_props(props)?;
                require_text("teamspaceId", &input.teamspace_id)?;
                require_text("name", &input.name)?;
                let document = NewDocument {
                    teamspace_id: input.teamspace_id,
                    name: input.name,
                    content: input.content,
                    project_ids: input.project_ids,
                };
                encode_result(api.create_document(&document).await?)?
            }
        };

        Ok(result)
    }
}

//! Jira Cloud REST API (v3) implementation

use super::{IssueDraft, TicketService, TrackerError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for a Jira site
#[derive(Debug, Clone)]
pub struct JiraConfig {
    /// Site root, e.g. `https://acme.atlassian.net`
    pub base_url: String,
    pub email: String,
    pub api_token: String,
}

/// Jira service implementation
pub struct JiraService {
    client: Client,
    config: JiraConfig,
}

impl JiraService {
    pub fn new(config: JiraConfig) -> Result<Self, TrackerError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TrackerError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/rest/api/3/{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<(StatusCode, String), TrackerError> {
        let response = request
            .basic_auth(&self.config.email, Some(&self.config.api_token))
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TrackerError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    TrackerError::network(format!("Connection failed: {e}"))
                } else {
                    TrackerError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TrackerError::network(format!("Failed to read response: {e}")))?;
        Ok((status, body))
    }
}

#[async_trait]
impl TicketService for JiraService {
    async fn validate_project_key(&self, key: &str) -> Result<bool, TrackerError> {
        if !is_well_formed_key(key) {
            tracing::debug!(project_key = %key, "Rejecting malformed project key");
            return Ok(false);
        }

        let (status, body) = self.send(self.client.get(self.url(&format!("project/{key}")))).await?;

        match status {
            s if s.is_success() => Ok(true),
            // Jira also answers 404 for projects the account cannot browse
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(TrackerError::from_status(s.as_u16(), &body)),
        }
    }

    async fn create_issue(&self, draft: &IssueDraft) -> Result<String, TrackerError> {
        let payload = CreateIssueRequest::from_draft(draft);
        let (status, body) = self
            .send(self.client.post(self.url("issue")).json(&payload))
            .await?;

        if !status.is_success() {
            return Err(TrackerError::from_status(status.as_u16(), &body));
        }

        let created: CreatedIssue = serde_json::from_str(&body).map_err(|e| {
            TrackerError::rejected(format!("Tracker response did not include an issue key: {e}"))
        })?;

        tracing::info!(
            issue_key = %created.key,
            issue_type = %draft.issue_type,
            project_key = %draft.project_key,
            "Issue created"
        );
        Ok(created.key)
    }
}

/// Project keys are an uppercase letter followed by uppercase letters, digits or underscores
fn is_well_formed_key(key: &str) -> bool {
    let mut chars = key.chars();
    chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Render plain text as an Atlassian Document Format document.
///
/// Blank lines separate paragraphs; single newlines become hard breaks.
fn to_adf(text: &str) -> Value {
    let paragraphs: Vec<Value> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|paragraph| {
            let mut content = Vec::new();
            for (i, line) in paragraph.lines().enumerate() {
                if i > 0 {
                    content.push(json!({ "type": "hardBreak" }));
                }
                if !line.is_empty() {
                    content.push(json!({ "type": "text", "text": line }));
                }
            }
            json!({ "type": "paragraph", "content": content })
        })
        .collect();

    json!({ "type": "doc", "version": 1, "content": paragraphs })
}

// Jira API types

#[derive(Debug, Serialize)]
struct CreateIssueRequest {
    fields: IssueFields,
}

#[derive(Debug, Serialize)]
struct IssueFields {
    project: KeyRef,
    summary: String,
    description: Value,
    issuetype: NameRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<KeyRef>,
}

#[derive(Debug, Serialize)]
struct KeyRef {
    key: String,
}

#[derive(Debug, Serialize)]
struct NameRef {
    name: String,
}

impl CreateIssueRequest {
    fn from_draft(draft: &IssueDraft) -> Self {
        Self {
            fields: IssueFields {
                project: KeyRef {
                    key: draft.project_key.clone(),
                },
                summary: draft.summary.clone(),
                description: to_adf(&draft.description),
                issuetype: NameRef {
                    name: draft.issue_type.as_str().to_string(),
                },
                parent: draft.parent_key.clone().map(|key| KeyRef { key }),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    key: String,
}

//! Issue-tracker abstraction
//!
//! The driver only needs two calls from the tracker: checking that a
//! project exists and creating an issue in it.

mod error;
mod jira;

pub use error::{TrackerError, TrackerErrorKind};
pub use jira::{JiraConfig, JiraService};

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Issue types the planner creates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueType {
    Epic,
    Story,
}

impl IssueType {
    /// Name of the issue type as the tracker knows it
    pub fn as_str(self) -> &'static str {
        match self {
            IssueType::Epic => "Epic",
            IssueType::Story => "Story",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to create one issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDraft {
    pub project_key: String,
    pub summary: String,
    pub description: String,
    pub issue_type: IssueType,
    /// Key of the parent epic (stories only)
    pub parent_key: Option<String>,
}

/// Client for the issue tracker
#[async_trait]
pub trait TicketService: Send + Sync {
    /// True if the key names an existing project the credentials can see
    async fn validate_project_key(&self, key: &str) -> Result<bool, TrackerError>;

    /// Create an issue and return its key (e.g. `PROJ-123`)
    async fn create_issue(&self, draft: &IssueDraft) -> Result<String, TrackerError>;
}

#[async_trait]
impl<T: TicketService + ?Sized> TicketService for Arc<T> {
    async fn validate_project_key(&self, key: &str) -> Result<bool, TrackerError> {
        (**self).validate_project_key(key).await
    }

    async fn create_issue(&self, draft: &IssueDraft) -> Result<String, TrackerError> {
        (**self).create_issue(draft).await
    }
}

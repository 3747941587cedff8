//! Mock collaborators for driver tests
//!
//! These mocks enable driving whole conversations without real I/O.

use crate::decompose::{DecomposeError, DecompositionService};
use crate::llm::LlmError;
use crate::state_machine::{Epic, Story};
use crate::tracker::{IssueDraft, TicketService, TrackerError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

// ============================================================================
// Mock Ticket Service
// ============================================================================

/// Tracker that knows a fixed set of projects and numbers issues `PROJ-1`, `PROJ-2`, ...
pub struct MockTicketService {
    valid_keys: HashSet<String>,
    validation_failures: Mutex<VecDeque<TrackerError>>,
    creation_failures: Mutex<VecDeque<TrackerError>>,
    /// Every key passed to `validate_project_key`
    validations: Mutex<Vec<String>>,
    /// Every successfully created draft
    created: Mutex<Vec<IssueDraft>>,
}

impl MockTicketService {
    pub fn new<const N: usize>(valid_keys: [&str; N]) -> Self {
        Self {
            valid_keys: valid_keys.iter().map(|k| (*k).to_string()).collect(),
            validation_failures: Mutex::new(VecDeque::new()),
            creation_failures: Mutex::new(VecDeque::new()),
            validations: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
        }
    }

    /// Make the next `validate_project_key` call fail
    pub fn fail_next_validation(&self, error: TrackerError) {
        self.validation_failures.lock().unwrap().push_back(error);
    }

    /// Make the next `create_issue` call fail
    pub fn fail_next_creation(&self, error: TrackerError) {
        self.creation_failures.lock().unwrap().push_back(error);
    }

    pub fn validations(&self) -> Vec<String> {
        self.validations.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<IssueDraft> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl TicketService for MockTicketService {
    async fn validate_project_key(&self, key: &str) -> Result<bool, TrackerError> {
        self.validations.lock().unwrap().push(key.to_string());
        if let Some(error) = self.validation_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(self.valid_keys.contains(key))
    }

    async fn create_issue(&self, draft: &IssueDraft) -> Result<String, TrackerError> {
        if let Some(error) = self.creation_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        let mut created = self.created.lock().unwrap();
        created.push(draft.clone());
        Ok(format!("{}-{}", draft.project_key, created.len()))
    }
}

// ============================================================================
// Mock Decomposer
// ============================================================================

/// Decomposer with queued epic lists and per-epic story lists
pub struct MockDecomposer {
    epic_results: Mutex<VecDeque<Result<Vec<Epic>, DecomposeError>>>,
    /// Stories keyed by epic summary; unknown epics have none
    stories: Mutex<HashMap<String, Vec<Story>>>,
    failing_epics: Mutex<HashSet<String>>,
    requirement_calls: Mutex<usize>,
    /// Summaries of every epic passed to `decompose_epic`
    epic_calls: Mutex<Vec<String>>,
}

impl MockDecomposer {
    pub fn new() -> Self {
        Self {
            epic_results: Mutex::new(VecDeque::new()),
            stories: Mutex::new(HashMap::new()),
            failing_epics: Mutex::new(HashSet::new()),
            requirement_calls: Mutex::new(0),
            epic_calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue the answer to the next `decompose_requirements` call
    pub fn queue_epics(&self, epics: Vec<Epic>) {
        self.epic_results.lock().unwrap().push_back(Ok(epics));
    }

    pub fn queue_epics_error(&self, error: DecomposeError) {
        self.epic_results.lock().unwrap().push_back(Err(error));
    }

    pub fn set_stories(&self, epic_summary: &str, stories: Vec<Story>) {
        self.stories
            .lock()
            .unwrap()
            .insert(epic_summary.to_string(), stories);
    }

    pub fn fail_stories(&self, epic_summary: &str) {
        self.failing_epics
            .lock()
            .unwrap()
            .insert(epic_summary.to_string());
    }

    pub fn requirement_calls(&self) -> usize {
        *self.requirement_calls.lock().unwrap()
    }

    pub fn epic_calls(&self) -> Vec<String> {
        self.epic_calls.lock().unwrap().clone()
    }
}

impl Default for MockDecomposer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DecompositionService for MockDecomposer {
    async fn decompose_requirements(&self, _text: &str) -> Result<Vec<Epic>, DecomposeError> {
        *self.requirement_calls.lock().unwrap() += 1;
        self.epic_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn decompose_epic(&self, epic: &Epic) -> Result<Vec<Story>, DecomposeError> {
        self.epic_calls.lock().unwrap().push(epic.summary.clone());
        if self.failing_epics.lock().unwrap().contains(&epic.summary) {
            return Err(DecomposeError::Llm(LlmError::network("Connection failed")));
        }
        Ok(self
            .stories
            .lock()
            .unwrap()
            .get(&epic.summary)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::IssueType;

    fn draft(summary: &str) -> IssueDraft {
        IssueDraft {
            project_key: "PROJ".to_string(),
            summary: summary.to_string(),
            description: String::new(),
            issue_type: IssueType::Epic,
            parent_key: None,
        }
    }

    #[tokio::test]
    async fn test_mock_ticket_service_numbers_issues() {
        let tickets = MockTicketService::new(["PROJ"]);
        assert!(tickets.validate_project_key("PROJ").await.unwrap());
        assert!(!tickets.validate_project_key("OTHER").await.unwrap());

        assert_eq!(tickets.create_issue(&draft("a")).await.unwrap(), "PROJ-1");
        tickets.fail_next_creation(TrackerError::unknown("nope"));
        assert!(tickets.create_issue(&draft("b")).await.is_err());
        assert_eq!(tickets.create_issue(&draft("c")).await.unwrap(), "PROJ-2");
        assert_eq!(tickets.created().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_decomposer_defaults_to_empty() {
        let decomposer = MockDecomposer::new();
        assert!(decomposer.decompose_requirements("x").await.unwrap().is_empty());
        assert!(decomposer
            .decompose_epic(&Epic::new("unknown", ""))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(decomposer.requirement_calls(), 1);
        assert_eq!(decomposer.epic_calls(), vec!["unknown"]);
    }
}

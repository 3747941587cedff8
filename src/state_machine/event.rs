//! Events that can occur in a planning session

use super::state::{Epic, Story};

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Chat opened; greet the user
    SessionStarted,

    // User events
    UserMessage {
        text: String,
    },

    // Tracker events
    ProjectKeyChecked {
        key: String,
        valid: bool,
    },
    ProjectKeyCheckFailed {
        key: String,
        message: String,
    },
    IssueCreated {
        key: String,
    },
    IssueCreationFailed {
        message: String,
    },

    // Decomposition events
    EpicsExtracted {
        epics: Vec<Epic>,
    },
    RequirementsDecompositionFailed {
        message: String,
    },
    /// Stories fetched for an epic popped off the queue
    EpicPrepared {
        epic: Epic,
        stories: Vec<Story>,
    },
    StoryDecompositionFailed {
        epic: Epic,
        message: String,
    },

    /// Internal: move on to the next queued epic
    AdvanceEpic,
}

impl Event {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Event::SessionStarted => "session_started",
            Event::UserMessage { .. } => "user_message",
            Event::ProjectKeyChecked { .. } => "project_key_checked",
            Event::ProjectKeyCheckFailed { .. } => "project_key_check_failed",
            Event::IssueCreated { .. } => "issue_created",
            Event::IssueCreationFailed { .. } => "issue_creation_failed",
            Event::EpicsExtracted { .. } => "epics_extracted",
            Event::RequirementsDecompositionFailed { .. } => "requirements_decomposition_failed",
            Event::EpicPrepared { .. } => "epic_prepared",
            Event::StoryDecompositionFailed { .. } => "story_decomposition_failed",
            Event::AdvanceEpic => "advance_epic",
        }
    }
}

//! Effects produced by state transitions

use super::state::Epic;
use crate::tracker::IssueDraft;
use crate::transcript::Role;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append a message to the transcript
    AppendMessage { role: Role, content: String },

    /// Ask the tracker whether the project exists
    ValidateProjectKey { key: String },

    /// Split free-text requirements into epics
    DecomposeRequirements { text: String },

    /// Fetch the stories of an epic that is about to be offered
    DecomposeEpic { epic: Epic },

    /// Create a tracker issue
    CreateIssue { draft: IssueDraft },

    /// Queue `Event::AdvanceEpic` to run once the current event chain is done
    ScheduleAdvance,
}

impl Effect {
    pub fn user_message(content: impl Into<String>) -> Self {
        Effect::AppendMessage {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn say(content: impl Into<String>) -> Self {
        Effect::AppendMessage {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

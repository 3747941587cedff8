//! Planning session state types

use std::collections::VecDeque;

// ============================================================================
// Work items
// ============================================================================

/// Top-level requirement grouping, created as an Epic issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Epic {
    pub summary: String,
    pub description: String,
    /// Tracker key, set once the epic has been created
    pub key: Option<String>,
}

impl Epic {
    pub fn new(summary: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            description: description.into(),
            key: None,
        }
    }
}

/// Child requirement under an epic, created as a Story issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    pub summary: String,
    pub description: String,
}

impl Story {
    pub fn new(summary: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            description: description.into(),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// What the session expects the next user message to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// No project key accepted yet
    #[default]
    AwaitingProjectKey,
    /// Ready for new requirements
    Idle,
    /// Waiting for yes/no on `current_epic`
    EpicConfirm,
    /// Waiting for yes/no on `story_queue[current_story_index]`
    StoryConfirm,
}

impl Mode {
    /// Placeholder shown in the input box
    pub fn input_hint(self) -> &'static str {
        match self {
            Mode::AwaitingProjectKey => "Enter your JIRA Project Key",
            Mode::Idle => "Paste your product requirements here...",
            Mode::EpicConfirm | Mode::StoryConfirm => {
                "Type YES or NO to proceed with the current item..."
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::AwaitingProjectKey => "awaiting_project_key",
            Mode::Idle => "idle",
            Mode::EpicConfirm => "epic_confirm",
            Mode::StoryConfirm => "story_confirm",
        }
    }
}

/// Per-chat state. Owned by one driver for the lifetime of the chat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub project_key: Option<String>,
    /// Epics not yet offered, consumed front-to-back
    pub epic_queue: VecDeque<Epic>,
    /// Stories of `current_epic`
    pub story_queue: Vec<Story>,
    pub current_epic: Option<Epic>,
    pub current_story_index: usize,
    pub mode: Mode,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// The story awaiting confirmation, if any
    pub fn current_story(&self) -> Option<&Story> {
        self.story_queue.get(self.current_story_index)
    }

    /// Check the structural invariants that must hold between events
    #[cfg(test)]
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.current_story_index > self.story_queue.len() {
            return Err(format!(
                "story cursor {} beyond queue of {}",
                self.current_story_index,
                self.story_queue.len()
            ));
        }
        match self.mode {
            Mode::AwaitingProjectKey => {
                if self.project_key.is_some() {
                    return Err("project key set while awaiting one".to_string());
                }
            }
            Mode::Idle => {
                if self.current_epic.is_some() {
                    return Err("current epic set while idle".to_string());
                }
            }
            Mode::EpicConfirm | Mode::StoryConfirm => {
                if self.current_epic.is_none() {
                    return Err(format!("no current epic in {}", self.mode.as_str()));
                }
                if self.project_key.is_none() {
                    return Err("confirming without a project key".to_string());
                }
            }
        }
        Ok(())
    }
}

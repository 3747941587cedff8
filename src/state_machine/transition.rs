//! Pure state transition function
//!
//! Given the same session and event this always produces the same next
//! session and effects. All I/O happens in the driver.

use super::state::{Epic, Mode, Session, Story};
use super::{Effect, Event};
use crate::tracker::{IssueDraft, IssueType};
use thiserror::Error;

pub(crate) const GREETING: &str = "Please enter your JIRA project key to get started.";
pub(crate) const INVALID_PROJECT_KEY: &str = "Invalid project key. Please try again.";
pub(crate) const NO_EPICS_EXTRACTED: &str = "Couldn't extract any epics from those requirements.";
pub(crate) const EMPTY_REQUIREMENTS: &str = "Please paste the product requirements you want turned into tickets.";
pub(crate) const SKIPPED_EPIC: &str = "Skipped epic.";
pub(crate) const SKIPPED_STORY: &str = "Skipped story.";
pub(crate) const ALL_REVIEWED: &str = "All epics and stories reviewed.";
const RETRY_OR_SKIP: &str = "Reply yes to retry, anything else to skip.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_session: Session,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(session: Session) -> Self {
        Self {
            new_session: session,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
#[allow(clippy::too_many_lines)] // One arm per (mode, event) pair
pub fn transition(session: &Session, event: Event) -> Result<TransitionResult, TransitionError> {
    let mut next = session.clone();

    match (session.mode, event) {
        // ============================================================
        // Project key
        // ============================================================
        (Mode::AwaitingProjectKey, Event::SessionStarted) => {
            Ok(TransitionResult::new(next).with_effect(Effect::say(GREETING)))
        }

        (Mode::AwaitingProjectKey, Event::UserMessage { text }) => {
            let key = normalize_project_key(&text);
            let result = TransitionResult::new(next).with_effect(Effect::user_message(text));
            if key.is_empty() {
                Ok(result.with_effect(Effect::say(INVALID_PROJECT_KEY)))
            } else {
                Ok(result.with_effect(Effect::ValidateProjectKey { key }))
            }
        }

        (Mode::AwaitingProjectKey, Event::ProjectKeyChecked { key, valid: true }) => {
            let message = format!(
                "Project key **{key}** validated. Now send me your product requirements."
            );
            next.project_key = Some(key);
            next.mode = Mode::Idle;
            Ok(TransitionResult::new(next).with_effect(Effect::say(message)))
        }

        (Mode::AwaitingProjectKey, Event::ProjectKeyChecked { valid: false, .. }) => {
            Ok(TransitionResult::new(next).with_effect(Effect::say(INVALID_PROJECT_KEY)))
        }

        (Mode::AwaitingProjectKey, Event::ProjectKeyCheckFailed { key, message }) => {
            Ok(TransitionResult::new(next).with_effect(Effect::say(format!(
                "Could not check project key **{key}**: {message}. Please try again."
            ))))
        }

        // ============================================================
        // Requirements
        // ============================================================
        (Mode::Idle, Event::UserMessage { text }) => {
            let requirements = text.trim().to_string();
            let result = TransitionResult::new(next).with_effect(Effect::user_message(text));
            if requirements.is_empty() {
                Ok(result.with_effect(Effect::say(EMPTY_REQUIREMENTS)))
            } else {
                Ok(result.with_effect(Effect::DecomposeRequirements { text: requirements }))
            }
        }

        (Mode::Idle, Event::EpicsExtracted { epics }) => {
            if epics.is_empty() {
                return Ok(TransitionResult::new(next).with_effect(Effect::say(NO_EPICS_EXTRACTED)));
            }
            let found = format!(
                "Found **{}** epics. Starting with the first one...",
                epics.len()
            );
            next.epic_queue.extend(epics);
            let result = TransitionResult::new(next).with_effect(Effect::say(found));
            Ok(pop_next_epic(result))
        }

        (Mode::Idle, Event::RequirementsDecompositionFailed { message }) => {
            Ok(TransitionResult::new(next).with_effect(Effect::say(format!(
                "Couldn't break those requirements into epics: {message}"
            ))))
        }

        (Mode::Idle, Event::EpicPrepared { epic, stories }) => Ok(offer_epic(next, epic, stories)),

        (Mode::Idle, Event::StoryDecompositionFailed { epic, message }) => {
            let warning = format!(
                "Couldn't extract stories for epic **{}**: {message}",
                epic.summary
            );
            let mut result = offer_epic(next, epic, vec![]);
            result.effects.insert(0, Effect::say(warning));
            Ok(result)
        }

        // ============================================================
        // Epic confirmation
        // ============================================================
        (Mode::EpicConfirm, Event::UserMessage { text }) => {
            let confirmed = is_confirmation(&text);
            let result = TransitionResult::new(next).with_effect(Effect::user_message(text));
            if confirmed {
                let draft = epic_draft(session)?;
                Ok(result.with_effect(Effect::CreateIssue { draft }))
            } else {
                Ok(result
                    .with_effect(Effect::say(SKIPPED_EPIC))
                    .with_effect(Effect::ScheduleAdvance))
            }
        }

        (Mode::EpicConfirm, Event::IssueCreated { key }) => {
            let epic = next
                .current_epic
                .as_mut()
                .ok_or_else(|| invalid("epic created with no current epic"))?;
            epic.key = Some(key.clone());

            let first_story = next.current_story().map(story_prompt);
            let result = TransitionResult::new(next).with_effect(Effect::say(format!("Epic created: {key}")));
            match first_story {
                Some(prompt) => {
                    let mut result = result.with_effect(Effect::say(prompt));
                    result.new_session.mode = Mode::StoryConfirm;
                    Ok(result)
                }
                None => Ok(result.with_effect(Effect::ScheduleAdvance)),
            }
        }

        (Mode::EpicConfirm, Event::IssueCreationFailed { message }) => {
            Ok(TransitionResult::new(next).with_effect(Effect::say(format!(
                "Failed to create epic: {message}\n\n{RETRY_OR_SKIP}"
            ))))
        }

        // ============================================================
        // Story confirmation
        // ============================================================
        (Mode::StoryConfirm, Event::UserMessage { text }) => {
            let confirmed = is_confirmation(&text);
            let result = TransitionResult::new(next).with_effect(Effect::user_message(text));
            if confirmed {
                let draft = story_draft(session)?;
                Ok(result.with_effect(Effect::CreateIssue { draft }))
            } else {
                Ok(advance_story_cursor(result.with_effect(Effect::say(SKIPPED_STORY))))
            }
        }

        (Mode::StoryConfirm, Event::IssueCreated { key }) => {
            let result = TransitionResult::new(next).with_effect(Effect::say(format!("Story created: {key}")));
            Ok(advance_story_cursor(result))
        }

        (Mode::StoryConfirm, Event::IssueCreationFailed { message }) => {
            Ok(TransitionResult::new(next).with_effect(Effect::say(format!(
                "Failed to create story: {message}\n\n{RETRY_OR_SKIP}"
            ))))
        }

        // ============================================================
        // Advance to next epic
        // ============================================================
        (Mode::EpicConfirm | Mode::StoryConfirm, Event::AdvanceEpic) => {
            next.story_queue.clear();
            next.current_story_index = 0;
            next.current_epic = None;
            next.mode = Mode::Idle;

            if next.epic_queue.is_empty() {
                Ok(TransitionResult::new(next).with_effect(Effect::say(ALL_REVIEWED)))
            } else {
                Ok(pop_next_epic(TransitionResult::new(next)))
            }
        }

        (mode, event) => Err(invalid(format!(
            "{} cannot handle {}",
            mode.as_str(),
            event.name()
        ))),
    }
}

fn invalid(message: impl Into<String>) -> TransitionError {
    TransitionError::InvalidTransition(message.into())
}

/// Only a literal "yes" confirms; every other answer is a skip
fn is_confirmation(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("yes")
}

fn normalize_project_key(text: &str) -> String {
    text.trim().to_uppercase()
}

/// Take the front of the epic queue and request its stories
fn pop_next_epic(mut result: TransitionResult) -> TransitionResult {
    match result.new_session.epic_queue.pop_front() {
        Some(epic) => result.with_effect(Effect::DecomposeEpic { epic }),
        None => result,
    }
}

fn offer_epic(mut session: Session, epic: Epic, stories: Vec<Story>) -> TransitionResult {
    let prompt = epic_prompt(&epic);
    session.current_epic = Some(epic);
    session.story_queue = stories;
    session.current_story_index = 0;
    session.mode = Mode::EpicConfirm;
    TransitionResult::new(session).with_effect(Effect::say(prompt))
}

fn advance_story_cursor(mut result: TransitionResult) -> TransitionResult {
    result.new_session.current_story_index += 1;
    let next_story = result.new_session.current_story().map(story_prompt);
    match next_story {
        Some(prompt) => result.with_effect(Effect::say(prompt)),
        None => result.with_effect(Effect::ScheduleAdvance),
    }
}

fn epic_prompt(epic: &Epic) -> String {
    format!(
        "### Epic: {}\n{}\n\nShall I proceed?",
        epic.summary, epic.description
    )
}

fn story_prompt(story: &Story) -> String {
    format!(
        "#### Story: {}\n{}\n\nShall I proceed?",
        story.summary, story.description
    )
}

fn project_key(session: &Session) -> Result<String, TransitionError> {
    session
        .project_key
        .clone()
        .ok_or_else(|| invalid("no project key accepted"))
}

fn epic_draft(session: &Session) -> Result<IssueDraft, TransitionError> {
    let epic = session
        .current_epic
        .as_ref()
        .ok_or_else(|| invalid("confirming with no current epic"))?;
    Ok(IssueDraft {
        project_key: project_key(session)?,
        summary: epic.summary.clone(),
        description: epic.description.clone(),
        issue_type: IssueType::Epic,
        parent_key: None,
    })
}

fn story_draft(session: &Session) -> Result<IssueDraft, TransitionError> {
    let story = session
        .current_story()
        .ok_or_else(|| invalid("confirming with no current story"))?;
    let parent_key = session
        .current_epic
        .as_ref()
        .and_then(|epic| epic.key.clone())
        .ok_or_else(|| invalid("story confirmed before its epic was created"))?;
    Ok(IssueDraft {
        project_key: project_key(session)?,
        summary: story.summary.clone(),
        description: story.description.clone(),
        issue_type: IssueType::Story,
        parent_key: Some(parent_key),
    })
}

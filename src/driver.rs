//! Conversation driver
//!
//! Owns one planning session and runs the state machine against the
//! ticket and decomposition services, one user message at a time.

#[cfg(test)]
pub(crate) mod testing;

use crate::decompose::DecompositionService;
use crate::state_machine::{transition, Effect, Event, Session};
use crate::tracker::TicketService;
use crate::transcript::{Message, Role, Transcript};
use std::collections::VecDeque;

/// Drives a single chat session to completion of each user message
pub struct ConversationDriver<T, D>
where
    T: TicketService,
    D: DecompositionService,
{
    session_id: String,
    session: Session,
    transcript: Transcript,
    tickets: T,
    decomposer: D,
    /// Internal events requested by `Effect::ScheduleAdvance`, run before the next input
    pending: VecDeque<Event>,
}

impl<T, D> ConversationDriver<T, D>
where
    T: TicketService,
    D: DecompositionService,
{
    pub fn new(tickets: T, decomposer: D) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            session: Session::new(),
            transcript: Transcript::new(),
            tickets,
            decomposer,
            pending: VecDeque::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Placeholder for the next input
    pub fn input_hint(&self) -> &'static str {
        self.session.mode.input_hint()
    }

    /// Open the chat. Returns the messages it produced; nothing once the
    /// chat is already open.
    pub async fn start(&mut self) -> &[Message] {
        if !self.transcript.is_empty() {
            return &[];
        }
        tracing::info!(session_id = %self.session_id, "Starting planning session");
        let mark = self.transcript.len();
        self.process(Event::SessionStarted).await;
        self.transcript.since(mark)
    }

    /// Handle one line of user input. Returns every message appended while
    /// handling it, starting with the user's own.
    pub async fn submit(&mut self, text: &str) -> &[Message] {
        let mark = self.transcript.len();
        self.process(Event::UserMessage {
            text: text.to_string(),
        })
        .await;
        self.transcript.since(mark)
    }

    async fn process(&mut self, event: Event) {
        // A queued advance always runs before new input is looked at
        self.drain_pending().await;
        self.run_chain(event).await;
        self.drain_pending().await;
    }

    async fn drain_pending(&mut self) {
        while let Some(event) = self.pending.pop_front() {
            self.run_chain(event).await;
        }
    }

    /// Apply an event and every event its effects produce, in order
    async fn run_chain(&mut self, event: Event) {
        let mut events = VecDeque::from([event]);

        while let Some(current) = events.pop_front() {
            let event_name = current.name();
            let result = match transition(&self.session, current) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(
                        session_id = %self.session_id,
                        mode = self.session.mode.as_str(),
                        event = event_name,
                        error = %e,
                        "Transition rejected"
                    );
                    self.transcript
                        .append(Role::Assistant, format!("Something went wrong: {e}"));
                    return;
                }
            };

            let old_mode = self.session.mode;
            self.session = result.new_session;
            if old_mode != self.session.mode {
                tracing::debug!(
                    session_id = %self.session_id,
                    from = old_mode.as_str(),
                    to = self.session.mode.as_str(),
                    event = event_name,
                    "Mode changed"
                );
            }

            for effect in result.effects {
                if let Some(generated) = self.execute_effect(effect).await {
                    events.push_back(generated);
                }
            }
        }
    }

    /// Execute an effect and optionally return a generated event
    async fn execute_effect(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::AppendMessage { role, content } => {
                let message = self.transcript.append(role, content);
                tracing::debug!(
                    session_id = %self.session_id,
                    message_id = %message.message_id,
                    role = %message.role,
                    created_at = %message.created_at,
                    "Message appended"
                );
                None
            }

            Effect::ValidateProjectKey { key } => {
                let event = match self.tickets.validate_project_key(&key).await {
                    Ok(valid) => {
                        tracing::info!(session_id = %self.session_id, project_key = %key, valid, "Project key checked");
                        Event::ProjectKeyChecked { key, valid }
                    }
                    Err(e) => {
                        tracing::warn!(session_id = %self.session_id, project_key = %key, error = %e, "Project key check failed");
                        Event::ProjectKeyCheckFailed {
                            key,
                            message: e.to_string(),
                        }
                    }
                };
                Some(event)
            }

            Effect::DecomposeRequirements { text } => {
                let event = match self.decomposer.decompose_requirements(&text).await {
                    Ok(epics) => Event::EpicsExtracted { epics },
                    Err(e) => {
                        tracing::warn!(session_id = %self.session_id, error = %e, "Requirements decomposition failed");
                        Event::RequirementsDecompositionFailed {
                            message: e.to_string(),
                        }
                    }
                };
                Some(event)
            }

            Effect::DecomposeEpic { epic } => {
                let event = match self.decomposer.decompose_epic(&epic).await {
                    Ok(stories) => Event::EpicPrepared { epic, stories },
                    Err(e) => {
                        tracing::warn!(session_id = %self.session_id, epic = %epic.summary, error = %e, "Epic decomposition failed");
                        Event::StoryDecompositionFailed {
                            epic,
                            message: e.to_string(),
                        }
                    }
                };
                Some(event)
            }

            Effect::CreateIssue { draft } => {
                let event = match self.tickets.create_issue(&draft).await {
                    Ok(key) => Event::IssueCreated { key },
                    Err(e) => {
                        tracing::error!(
                            session_id = %self.session_id,
                            issue_type = %draft.issue_type,
                            summary = %draft.summary,
                            kind = ?e.kind,
                            error = %e,
                            "Issue creation failed"
                        );
                        Event::IssueCreationFailed {
                            message: e.to_string(),
                        }
                    }
                };
                Some(event)
            }

            Effect::ScheduleAdvance => {
                self.pending.push_back(Event::AdvanceEpic);
                None
            }
        }
    }
}

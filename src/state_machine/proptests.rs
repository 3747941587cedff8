//! Property-based tests for the state machine
//!
//! A synchronous effect interpreter stands in for the driver so whole
//! conversations can be replayed against the pure transition function.

use super::*;
use crate::tracker::{IssueDraft, IssueType};
use crate::transcript::Role;
use proptest::prelude::*;
use std::collections::{HashMap, VecDeque};

// ============================================================================
// Simulator
// ============================================================================

struct Simulation {
    session: Session,
    stories: HashMap<String, Vec<Story>>,
    epics: Vec<Epic>,
    pending: VecDeque<Event>,
    created: Vec<IssueDraft>,
    said: Vec<String>,
    advances_scheduled: usize,
}

impl Simulation {
    fn new(plan: &[(Epic, Vec<Story>)]) -> Self {
        Self {
            session: Session {
                project_key: Some("PROJ".to_string()),
                mode: Mode::Idle,
                ..Session::default()
            },
            stories: plan
                .iter()
                .map(|(epic, stories)| (epic.summary.clone(), stories.clone()))
                .collect(),
            epics: plan.iter().map(|(epic, _)| epic.clone()).collect(),
            pending: VecDeque::new(),
            created: Vec::new(),
            said: Vec::new(),
            advances_scheduled: 0,
        }
    }

    fn send(&mut self, text: &str) {
        while let Some(event) = self.pending.pop_front() {
            self.chain(event);
        }
        self.chain(Event::UserMessage {
            text: text.to_string(),
        });
        while let Some(event) = self.pending.pop_front() {
            self.chain(event);
        }
    }

    fn chain(&mut self, event: Event) {
        let mut events = VecDeque::from([event]);
        while let Some(current) = events.pop_front() {
            let result = transition(&self.session, current).expect("transition accepted");
            self.session = result.new_session;
            self.session
                .check_invariants()
                .unwrap_or_else(|e| panic!("invariant broken: {e}"));

            let scheduled = result
                .effects
                .iter()
                .filter(|e| matches!(e, Effect::ScheduleAdvance))
                .count();
            assert!(scheduled <= 1, "advance scheduled {scheduled} times at once");
            if self.session.mode == Mode::StoryConfirm
                && self.session.current_story_index == self.session.story_queue.len()
            {
                assert_eq!(scheduled, 1, "exhausted story cursor must schedule one advance");
            }

            for effect in result.effects {
                if let Some(next) = self.execute(effect) {
                    events.push_back(next);
                }
            }
        }
    }

    fn execute(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::AppendMessage { role, content } => {
                if role == Role::Assistant {
                    self.said.push(content);
                }
                None
            }
            Effect::ValidateProjectKey { key } => Some(Event::ProjectKeyChecked { key, valid: true }),
            Effect::DecomposeRequirements { .. } => Some(Event::EpicsExtracted {
                epics: self.epics.clone(),
            }),
            Effect::DecomposeEpic { epic } => {
                let stories = self.stories.get(&epic.summary).cloned().unwrap_or_default();
                Some(Event::EpicPrepared { epic, stories })
            }
            Effect::CreateIssue { draft } => {
                self.created.push(draft);
                Some(Event::IssueCreated {
                    key: format!("PROJ-{}", self.created.len()),
                })
            }
            Effect::ScheduleAdvance => {
                self.advances_scheduled += 1;
                self.pending.push_back(Event::AdvanceEpic);
                None
            }
        }
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

/// Epics with unique summaries `E0`, `E1`, ... and up to four stories each
fn arb_plan() -> impl Strategy<Value = Vec<(Epic, Vec<Story>)>> {
    proptest::collection::vec(0usize..5, 1..5).prop_map(|story_counts| {
        story_counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| {
                let epic = Epic::new(format!("E{i}"), format!("epic {i}"));
                let stories = (0..count)
                    .map(|j| Story::new(format!("E{i}-S{j}"), format!("story {j}")))
                    .collect();
                (epic, stories)
            })
            .collect()
    })
}

fn arb_answer() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("yes".to_string()),
        Just("YES ".to_string()),
        Just("no".to_string()),
        Just(String::new()),
        "[a-z]{1,6}",
    ]
}

/// Plan plus enough answers to walk every item it contains
fn arb_conversation() -> impl Strategy<Value = (Vec<(Epic, Vec<Story>)>, Vec<String>)> {
    arb_plan().prop_flat_map(|plan| {
        let prompts: usize = plan.iter().map(|(_, stories)| 1 + stories.len()).sum();
        (
            Just(plan),
            proptest::collection::vec(arb_answer(), prompts..=prompts),
        )
    })
}

fn is_yes(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("yes")
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn story_tickets_match_story_confirmations((plan, answers) in arb_conversation()) {
        let mut sim = Simulation::new(&plan);
        sim.send("requirements");

        let mut story_yes: HashMap<String, usize> = HashMap::new();
        for answer in &answers {
            if sim.session.mode == Mode::Idle {
                break;
            }
            if sim.session.mode == Mode::StoryConfirm && is_yes(answer) {
                let epic = sim.session.current_epic.as_ref().unwrap().summary.clone();
                *story_yes.entry(epic).or_default() += 1;
            }
            sim.send(answer);
        }

        for (epic, stories) in &plan {
            let created = sim
                .created
                .iter()
                .filter(|d| d.issue_type == IssueType::Story)
                .filter(|d| d.summary.starts_with(&format!("{}-", epic.summary)))
                .count();
            prop_assert!(created <= stories.len());
            prop_assert_eq!(created, story_yes.get(&epic.summary).copied().unwrap_or(0));
        }
    }

    #[test]
    fn every_conversation_ends_idle_with_completion((plan, answers) in arb_conversation()) {
        let mut sim = Simulation::new(&plan);
        sim.send("requirements");

        for answer in &answers {
            if sim.session.mode == Mode::Idle {
                break;
            }
            sim.send(answer);
        }

        prop_assert_eq!(sim.session.mode, Mode::Idle);
        prop_assert!(sim.session.epic_queue.is_empty());
        prop_assert!(sim.session.current_epic.is_none());
        prop_assert_eq!(sim.said.last().map(String::as_str), Some(ALL_REVIEWED));
        // One advance per epic offered, no more
        prop_assert_eq!(sim.advances_scheduled, plan.len());
    }

    #[test]
    fn stories_only_follow_their_created_epic((plan, answers) in arb_conversation()) {
        let mut sim = Simulation::new(&plan);
        sim.send("requirements");
        for answer in &answers {
            if sim.session.mode == Mode::Idle {
                break;
            }
            sim.send(answer);
        }

        let mut epic_keys: HashMap<String, String> = HashMap::new();
        for (i, draft) in sim.created.iter().enumerate() {
            match draft.issue_type {
                IssueType::Epic => {
                    prop_assert!(draft.parent_key.is_none());
                    epic_keys.insert(draft.summary.clone(), format!("PROJ-{}", i + 1));
                }
                IssueType::Story => {
                    let epic = draft.summary.split('-').next().unwrap();
                    prop_assert_eq!(draft.parent_key.as_ref(), epic_keys.get(epic));
                }
            }
        }
    }

    #[test]
    fn non_yes_never_creates_tickets(plan in arb_plan(), answer in "[a-z]{0,8}") {
        prop_assume!(!is_yes(&answer));
        let mut sim = Simulation::new(&plan);
        sim.send("requirements");
        for _ in 0..plan.len() {
            sim.send(&answer);
        }
        prop_assert!(sim.created.is_empty());
        prop_assert_eq!(sim.session.mode, Mode::Idle);
    }
}

//! Requirement decomposition
//!
//! Turns free-text requirements into epics, and an epic into stories, by
//! asking an LLM for a JSON array of `{summary, description}` objects.

use crate::llm::{LlmError, LlmRequest, LlmService};
use crate::state_machine::{Epic, Story};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

const EPICS_PROMPT: &str = r#"You are a senior product manager breaking product requirements into Jira epics.

Guidelines:
- Each epic is a coherent, independently deliverable slice of the product
- Create as many epics as the requirements need, usually 2-6
- Keep summaries short (under 80 characters) and descriptive
- Descriptions state the goal and scope of the epic in 1-3 sentences

Respond with ONLY a JSON array, no commentary:
[{"summary": "...", "description": "..."}]"#;

const STORIES_PROMPT: &str = r#"You are a senior product manager writing Jira user stories for an epic.

Guidelines:
- Each story is small enough to finish in one sprint
- Summaries follow "As a <user>, I want <goal>" or a short imperative title
- Descriptions include the intent and brief acceptance criteria

Respond with ONLY a JSON array, no commentary:
[{"summary": "...", "description": "..."}]"#;

const MAX_TOKENS: u32 = 4096;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("fenced block pattern is valid")
});

/// Decomposition failure
#[derive(Debug, Error)]
pub enum DecomposeError {
    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),
    #[error("Could not read the model's answer: {0}")]
    Parse(String),
}

/// Breaks requirements into epics and epics into stories
#[async_trait]
pub trait DecompositionService: Send + Sync {
    /// Ordered epics for free-text requirements; may be empty
    async fn decompose_requirements(&self, text: &str) -> Result<Vec<Epic>, DecomposeError>;

    /// Ordered stories for one epic
    async fn decompose_epic(&self, epic: &Epic) -> Result<Vec<Story>, DecomposeError>;
}

#[async_trait]
impl<T: DecompositionService + ?Sized> DecompositionService for Arc<T> {
    async fn decompose_requirements(&self, text: &str) -> Result<Vec<Epic>, DecomposeError> {
        (**self).decompose_requirements(text).await
    }

    async fn decompose_epic(&self, epic: &Epic) -> Result<Vec<Story>, DecomposeError> {
        (**self).decompose_epic(epic).await
    }
}

/// LLM-backed decomposer
pub struct LlmDecomposer {
    llm: Arc<dyn LlmService>,
}

impl LlmDecomposer {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self { llm }
    }

    async fn ask(&self, system: &str, prompt: String) -> Result<Vec<WorkItem>, DecomposeError> {
        let request = LlmRequest::single_turn(system, prompt).with_max_tokens(MAX_TOKENS);
        let response = self.llm.complete(&request).await?;
        parse_work_items(&response.text())
    }
}

#[async_trait]
impl DecompositionService for LlmDecomposer {
    async fn decompose_requirements(&self, text: &str) -> Result<Vec<Epic>, DecomposeError> {
        let items = self
            .ask(EPICS_PROMPT, format!("Product requirements:\n\n{text}"))
            .await?;
        tracing::info!(epic_count = items.len(), "Requirements decomposed");
        Ok(items
            .into_iter()
            .map(|item| Epic::new(item.summary, item.description))
            .collect())
    }

    async fn decompose_epic(&self, epic: &Epic) -> Result<Vec<Story>, DecomposeError> {
        let prompt = format!(
            "Epic: {}\n\n{}\n\nWrite the user stories for this epic.",
            epic.summary, epic.description
        );
        let items = self.ask(STORIES_PROMPT, prompt).await?;
        tracing::info!(epic = %epic.summary, story_count = items.len(), "Epic decomposed");
        Ok(items
            .into_iter()
            .map(|item| Story::new(item.summary, item.description))
            .collect())
    }
}

/// One element of the model's JSON answer
#[derive(Debug, Deserialize)]
struct WorkItem {
    #[serde(alias = "title")]
    summary: String,
    #[serde(default)]
    description: String,
}

/// Extract the work items from a model reply.
///
/// Accepts a bare array, an array inside a fenced code block or surrounded
/// by prose, and an object wrapping the array (`{"epics": [...]}`).
/// Items with a blank summary are dropped.
fn parse_work_items(reply: &str) -> Result<Vec<WorkItem>, DecomposeError> {
    let candidate = FENCED_BLOCK
        .captures(reply)
        .and_then(|c| c.get(1))
        .map_or(reply, |m| m.as_str())
        .trim();

    let value: Value = match serde_json::from_str(candidate) {
        Ok(value) => value,
        Err(_) => first_json_array(candidate)
            .ok_or_else(|| DecomposeError::Parse("no JSON array in reply".to_string()))?,
    };

    let array = match value {
        Value::Array(items) => items,
        Value::Object(map) => map
            .into_iter()
            .find_map(|(_, v)| match v {
                Value::Array(items) => Some(items),
                _ => None,
            })
            .ok_or_else(|| DecomposeError::Parse("object without an array field".to_string()))?,
        other => {
            return Err(DecomposeError::Parse(format!(
                "expected a JSON array, got {other}"
            )))
        }
    };

    let items: Vec<WorkItem> = serde_json::from_value(Value::Array(array))
        .map_err(|e| DecomposeError::Parse(e.to_string()))?;

    Ok(items
        .into_iter()
        .filter(|item| !item.summary.trim().is_empty())
        .map(|item| WorkItem {
            summary: item.summary.trim().to_string(),
            description: item.description.trim().to_string(),
        })
        .collect())
}

/// First `[` in the text that starts a complete JSON array of objects
fn first_json_array(text: &str) -> Option<Value> {
    text.match_indices('[').find_map(|(start, _)| {
        let rest = text.get(start..)?;
        match serde_json::Deserializer::from_str(rest).into_iter::<Value>().next() {
            Some(Ok(Value::Array(items))) if items.iter().all(Value::is_object) => {
                Some(Value::Array(items))
            }
            _ => None,
        }
    })
}

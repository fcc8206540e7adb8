//! Planner contract - the reasoning step that proposes actions

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ProposedAction;

use super::IterationRecord;

/// What the reasoning step decided for one iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "kebab-case")]
pub enum PlannerDecision {
    /// Execute these actions, then ask again
    Actions {
        rationale: String,
        actions: Vec<ProposedAction>,
    },
    /// Stop with an answer
    FinalAnswer { rationale: String, answer: String },
}

impl PlannerDecision {
    /// Parse a model's structured reply
    ///
    /// Accepts `{"rationale", "actions": [...]}` or `{"rationale",
    /// "final_answer"}`; an empty action list is a final answer. Anything
    /// else, including an object with neither field, is `Unparseable` and
    /// carries the raw text.
    pub fn parse(raw: &str) -> Result<Self, PlannerError> {
        #[derive(Deserialize)]
        struct Reply {
            #[serde(default, alias = "thought", alias = "reasoning")]
            rationale: String,
            #[serde(default, alias = "tool_calls")]
            actions: Option<Vec<ProposedAction>>,
            #[serde(default, alias = "answer")]
            final_answer: Option<String>,
        }

        let unparseable = || PlannerError::Unparseable { raw: raw.to_string() };
        let reply: Reply = serde_json::from_str(raw.trim()).map_err(|_| unparseable())?;

        match (reply.actions, reply.final_answer) {
            (Some(actions), _) if !actions.is_empty() => Ok(Self::Actions {
                rationale: reply.rationale,
                actions,
            }),
            (None, None) => Err(unparseable()),
            (_, answer) => Ok(Self::FinalAnswer {
                rationale: reply.rationale,
                answer: answer.unwrap_or_default(),
            }),
        }
    }

    pub fn rationale(&self) -> &str {
        match self {
            Self::Actions { rationale, .. } | Self::FinalAnswer { rationale, .. } => rationale,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlannerError {
    /// Reply was not a structured decision; the driver treats `raw` as the
    /// final answer
    #[error("planner reply was not a structured decision")]
    Unparseable { raw: String },

    /// The reasoning model could not be reached at all
    #[error("planner unavailable: {0}")]
    Unavailable(String),
}

/// Produces the next decision from the task and everything observed so far
#[async_trait]
pub trait Planner: Send + Sync {
    async fn propose(&self, task: &str, history: &[IterationRecord]) -> Result<PlannerDecision, PlannerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_actions() {
        let raw = r#"{"rationale": "look first", "actions": [{"tool": "read_file", "input": {"path": "a.rs"}}]}"#;
        let decision = PlannerDecision::parse(raw).unwrap();
        assert_eq!(decision, PlannerDecision::Actions {
            rationale: "look first".into(),
            actions: vec![ProposedAction::new("read_file", json!({"path": "a.rs"}))],
        });
    }

    #[test]
    fn test_parse_final_answer() {
        let decision = PlannerDecision::parse(r#"{"thought": "done", "answer": "42"}"#).unwrap();
        assert_eq!(decision, PlannerDecision::FinalAnswer {
            rationale: "done".into(),
            answer: "42".into(),
        });
    }

    #[test]
    fn test_empty_action_list_is_final() {
        let decision = PlannerDecision::parse(r#"{"rationale": "nothing to do", "actions": []}"#).unwrap();
        assert!(matches!(decision, PlannerDecision::FinalAnswer { .. }));
    }

    #[test]
    fn test_unparseable_keeps_raw_text() {
        let err = PlannerDecision::parse("I think the answer is 42").unwrap_err();
        assert_eq!(err, PlannerError::Unparseable {
            raw: "I think the answer is 42".into()
        });
    }

    #[test]
    fn test_object_without_decision_is_unparseable() {
        let raw = r#"{"status": "ok"}"#;
        let err = PlannerDecision::parse(raw).unwrap_err();
        assert_eq!(err, PlannerError::Unparseable { raw: raw.into() });
    }
}

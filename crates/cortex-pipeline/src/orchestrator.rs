//! State Orchestrator.
//!
//! If a session is active, routes the turn to its continuation instead of
//! the normal Decision output. Runs after Decision in the fixed pipeline
//! order — it inspects the `UnderstandingResult`/`DecisionResult` Understanding
//! and Decision already produced for this turn rather than recomputing them.

use std::collections::HashMap;

use cortex_core::types::OrganizationId;
use cortex_state::{ClearReason, ConversationState, StateManager, StateType};
use serde_json::Value;
use tracing::info;

use crate::types::DecisionResult;
use crate::understanding::is_short_continuation;
use crate::types::UnderstandingResult;

const STOP_WORDS: &[&str] = &["やめる", "キャンセル", "中断", "cancel", "stop", "nevermind"];
const POSITIVE_TOKENS: &[&str] = &["yes", "y", "ok", "okay", "sure", "お願い", "はい"];
const NEGATIVE_TOKENS: &[&str] = &["no", "n", "nope", "やめる"];
const GOAL_KEYWORDS: &[&str] = &["goal", "目標"];
const MAX_CONFIRMATION_RETRIES: u32 = 2;
const TASK_PENDING_FIELDS: &[&str] = &["task_body", "assigned_to", "limit_date"];

/// What the caller should do next after the orchestrator has inspected (and
/// possibly mutated) the active state.
pub enum Route {
    /// No active session — proceed with the Decision output as-is.
    Normal,
    /// An active session accepted this turn as its continuation. Proceed to
    /// Execution with the synthesized decision.
    Continue(DecisionResult),
    /// The orchestrator fully answered this turn itself (confirmation retry
    /// prompt, task-pending field prompt, etc). No further execution needed.
    Respond {
        message: String,
        awaiting_confirmation: bool,
        awaiting_input: bool,
    },
    /// The active session was interrupted by an unrelated new intent. The
    /// caller should persist `partial` as an interrupted-session episode,
    /// then proceed with the already-computed Decision output, appending
    /// `reminder_suffix` to the eventual response.
    Interrupted {
        partial: ConversationState,
        reminder_suffix: String,
    },
}

pub struct Orchestrator<'a> {
    state: &'a StateManager,
}

impl<'a> Orchestrator<'a> {
    pub fn new(state: &'a StateManager) -> Self {
        Self { state }
    }

    pub fn route(
        &self,
        organization_id: &OrganizationId,
        room_id: &str,
        user_id: &str,
        message: &str,
        understanding: &UnderstandingResult,
        decision: &DecisionResult,
    ) -> Result<Route, cortex_state::StateError> {
        if is_stop_word(message) {
            if self.state.get_current(organization_id, room_id, user_id)?.is_some() {
                self.state.clear(organization_id, room_id, user_id, ClearReason::UserCancel)?;
            }
            return Ok(Route::Normal);
        }

        let Some(current) = self.state.get_current(organization_id, room_id, user_id)? else {
            return Ok(Route::Normal);
        };

        match current.state_type {
            StateType::Normal => Ok(Route::Normal),
            StateType::GoalSetting => self.route_goal_setting(organization_id, room_id, user_id, message, understanding, current),
            StateType::Announcement => Ok(Route::Continue(decision.clone())),
            StateType::Confirmation => self.route_confirmation(organization_id, room_id, user_id, message, current),
            StateType::TaskPending => self.route_task_pending(organization_id, room_id, user_id, message, current),
            StateType::ListContext => self.route_list_context(organization_id, room_id, user_id, message, decision, current),
            StateType::MultiAction => Ok(Route::Continue(decision.clone())),
        }
    }

    fn route_goal_setting(
        &self,
        organization_id: &OrganizationId,
        room_id: &str,
        user_id: &str,
        message: &str,
        understanding: &UnderstandingResult,
        current: ConversationState,
    ) -> Result<Route, cortex_state::StateError> {
        if is_continuation_intent(message, understanding) {
            let mut delta = HashMap::new();
            delta.insert("last_answer".to_string(), Value::String(message.to_string()));
            self.state.update_step(organization_id, room_id, user_id, &current.step, delta)?;
            return Ok(Route::Respond {
                    message: "Got it — continuing where we left off.".to_string(),
                    awaiting_confirmation: false,
                    awaiting_input: true,
            });
        }

        info!(
            organization_id = organization_id.as_str(),
            room_id, user_id, step = %current.step, "interrupting GOAL_SETTING session for new intent"
        );
        self.state.clear(organization_id, room_id, user_id, ClearReason::Interrupted)?;
        Ok(Route::Interrupted {
                partial: current,
                reminder_suffix: "(you can pick the goal-setting conversation back up any time)".to_string(),
        })
    }

    fn route_confirmation(
        &self,
        organization_id: &OrganizationId,
        room_id: &str,
        user_id: &str,
        message: &str,
        current: ConversationState,
    ) -> Result<Route, cortex_state::StateError> {
        let options: Vec<String> = current
            .data
            .get("confirmation_options")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(|s| s.to_string())).collect())
            .unwrap_or_default();

        match parse_confirmation(message, &options) {
            ConfirmationAnswer::Yes => {
                let action = current.data.get("pending_action").and_then(|v| v.as_str()).unwrap_or("general_conversation").to_string();
                let params = current.data.get("pending_params").cloned().unwrap_or(Value::Null);
                self.state.clear(organization_id, room_id, user_id, ClearReason::Completed)?;
                Ok(Route::Continue(DecisionResult {
                            action,
                            params,
                            confidence: 1.0,
                            needs_confirmation: false,
                            confirmation_options: None,
                            risk_level: cortex_core::types::RiskLevel::Low,
                            reasoning: "user confirmed pending action".to_string(),
                            enforcement_action: None,
                            multi_action_plan: None,
                }))
            }
            ConfirmationAnswer::No => {
                self.state.clear(organization_id, room_id, user_id, ClearReason::UserCancel)?;
                Ok(Route::Respond {
                        message: "Okay, I won't do that.".to_string(),
                        awaiting_confirmation: false,
                        awaiting_input: false,
                })
            }
            ConfirmationAnswer::Unparsed => {
                let retry_count = current.data.get("confirmation_retry_count").and_then(|v| v.as_i64()).unwrap_or(0) + 1;
                if retry_count as u32 >= MAX_CONFIRMATION_RETRIES {
                    self.state.clear(organization_id, room_id, user_id, ClearReason::Error)?;
                    return Ok(Route::Respond {
                            message: "I couldn't tell if that was a yes or a no, so I've cancelled it — just ask again if you'd like.".to_string(),
                            awaiting_confirmation: false,
                            awaiting_input: false,
                    });
                }
                let mut delta = HashMap::new();
                delta.insert("confirmation_retry_count".to_string(), Value::from(retry_count));
                self.state.update_step(organization_id, room_id, user_id, &current.step, delta)?;
                Ok(Route::Respond {
                        message: "Sorry, I didn't catch that — yes or no?".to_string(),
                        awaiting_confirmation: true,
                        awaiting_input: false,
                })
            }
        }
    }

    fn route_task_pending(
        &self,
        organization_id: &OrganizationId,
        room_id: &str,
        user_id: &str,
        message: &str,
        current: ConversationState,
    ) -> Result<Route, cortex_state::StateError> {
        let mut delta = HashMap::new();
        delta.insert(current.step.clone(), Value::String(message.to_string()));
        let updated = self.state.update_step(organization_id, room_id, user_id, &current.step, delta)?;

        let next_missing = TASK_PENDING_FIELDS.iter().copied().find(|f| !updated.data.contains_key(*f));
        match next_missing {
            Some(field) => {
                self.state.update_step(organization_id, room_id, user_id, field, HashMap::new())?;
                Ok(Route::Respond {
                        message: format!("What's the {}?", field.replace('_', " ")),
                        awaiting_confirmation: false,
                        awaiting_input: true,
                })
            }
            None => {
                let params = Value::Object(updated.data.clone().into_iter().collect());
                self.state.clear(organization_id, room_id, user_id, ClearReason::Completed)?;
                Ok(Route::Continue(DecisionResult {
                            action: "create_task".to_string(),
                            params,
                            confidence: 1.0,
                            needs_confirmation: false,
                            confirmation_options: None,
                            risk_level: cortex_core::types::RiskLevel::Low,
                            reasoning: "all task fields collected".to_string(),
                            enforcement_action: None,
                            multi_action_plan: None,
                }))
            }
        }
    }

    fn route_list_context(
        &self,
        organization_id: &OrganizationId,
        room_id: &str,
        user_id: &str,
        message: &str,
        decision: &DecisionResult,
        current: ConversationState,
    ) -> Result<Route, cortex_state::StateError> {
        let items: Vec<Value> = current.data.get("items").and_then(|v| v.as_array()).cloned().unwrap_or_default();
        let resolved = resolve_list_reference(message, &items);
        match resolved {
            Some(item) => {
                let mut result = decision.clone();
                result.params = item;
                Ok(Route::Continue(result))
            }
            None => Ok(Route::Normal),
        }
    }
}

fn is_stop_word(message: &str) -> bool {
    let lower = message.to_lowercase();
    STOP_WORDS.iter().any(|w| lower.contains(w))
}

fn is_continuation_intent(message: &str, understanding: &UnderstandingResult) -> bool {
    if is_short_continuation(message) {
        return true;
    }
    let lower = message.to_lowercase();
    if GOAL_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return true;
    }
    matches!(understanding.intent.as_str(), "doubt" | "reflection" | "feedback")
}

enum ConfirmationAnswer {
    Yes,
    No,
    Unparsed,
}

fn parse_confirmation(message: &str, options: &[String]) -> ConfirmationAnswer {
    let trimmed = message.trim().to_lowercase();

    if let Ok(index) = trimmed.parse::<usize>() {
        if index >= 1 && index <= options.len() {
            let chosen = options[index - 1].to_lowercase();
            if NEGATIVE_TOKENS.iter().any(|t| chosen == *t) {
                return ConfirmationAnswer::No;
            }
            return ConfirmationAnswer::Yes;
        }
    }

    if POSITIVE_TOKENS.iter().any(|t| trimmed == *t) {
        return ConfirmationAnswer::Yes;
    }
    if NEGATIVE_TOKENS.iter().any(|t| trimmed == *t) {
        return ConfirmationAnswer::No;
    }
    ConfirmationAnswer::Unparsed
}

const LIST_ORDINALS: &[&str] = &["最初の", "first", "1st"];

fn resolve_list_reference(message: &str, items: &[Value]) -> Option<Value> {
    let trimmed = message.trim();
    if let Ok(index) = trimmed.parse::<usize>() {
        return items.get(index.checked_sub(1)?).cloned();
    }
    let lower = trimmed.to_lowercase();
    if LIST_ORDINALS.iter().any(|o| lower.contains(o)) || lower.contains("これ") || lower.contains("this") {
        return items.first().cloned();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_word_detected_across_languages() {
        assert!(is_stop_word("キャンセルして"));
        assert!(is_stop_word("please cancel that"));
        assert!(!is_stop_word("continue please"));
    }

    #[test]
    fn confirmation_parses_numeric_and_tokens() {
        let options = vec!["yes".to_string(), "no".to_string()];
        assert!(matches!(parse_confirmation("1", &options), ConfirmationAnswer::Yes));
        assert!(matches!(parse_confirmation("2", &options), ConfirmationAnswer::No));
        assert!(matches!(parse_confirmation("yes", &options), ConfirmationAnswer::Yes));
        assert!(matches!(parse_confirmation("huh?", &options), ConfirmationAnswer::Unparsed));
    }

    #[test]
    fn list_reference_resolves_numeric_and_ordinal() {
        let items = vec![Value::String("task a".to_string()), Value::String("task b".to_string())];
        assert_eq!(resolve_list_reference("1", &items), Some(Value::String("task a".to_string())));
        assert_eq!(resolve_list_reference("最初のやつ", &items), Some(Value::String("task a".to_string())));
        assert_eq!(resolve_list_reference("something else", &items), None);
    }

    fn test_decision() -> DecisionResult {
        DecisionResult {
            action: "general_conversation".to_string(),
            params: Value::Null,
            confidence: 0.9,
            needs_confirmation: false,
            confirmation_options: None,
            risk_level: cortex_core::types::RiskLevel::Low,
            reasoning: "n/a".to_string(),
            enforcement_action: None,
            multi_action_plan: None,
        }
    }

    fn test_understanding() -> UnderstandingResult {
        UnderstandingResult {
            intent: "general_conversation".to_string(),
            intent_confidence: 0.9,
            entities: HashMap::new(),
            resolved_pronouns: vec![],
            urgency: crate::types::Urgency::Low,
            emotion: crate::types::Emotion::Neutral,
            raw_message: "maybe".to_string(),
            needs_clarification: false,
        }
    }

    /// S3: a second unparsed confirmation reply clears the state and emits
    /// the fallback on turn 2 — it must not take a third failure.
    #[test]
    fn confirmation_clears_on_second_unparsed_reply() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        cortex_state::db::init_db(&conn).unwrap();
        let state = StateManager::new(conn);
        let org = OrganizationId::new("org-1");

        let mut data = HashMap::new();
        data.insert(
            "confirmation_options".to_string(),
            Value::Array(vec![Value::String("send now".to_string()), Value::String("cancel".to_string())]),
        );
        data.insert("pending_action".to_string(), Value::String("announcement_create".to_string()));
        state
            .transition_to(&org, "room-1", "user-1", None, StateType::Confirmation, "awaiting_response", data, None, None, 1800)
            .unwrap();

        let orchestrator = Orchestrator::new(&state);
        let decision = test_decision();
        let understanding = test_understanding();

        let route1 = orchestrator.route(&org, "room-1", "user-1", "maybe", &understanding, &decision).unwrap();
        assert!(matches!(route1, Route::Respond { awaiting_confirmation: true, .. }));
        assert!(state.get_current(&org, "room-1", "user-1").unwrap().is_some());

        let route2 = orchestrator.route(&org, "room-1", "user-1", "idk", &understanding, &decision).unwrap();
        match route2 {
            Route::Respond { awaiting_confirmation, awaiting_input, .. } => {
                assert!(!awaiting_confirmation);
                assert!(!awaiting_input);
            }
            _ => panic!("expected a fallback Respond route"),
        }
        assert!(state.get_current(&org, "room-1", "user-1").unwrap().is_none());
    }
}

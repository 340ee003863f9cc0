//! Understanding.
//!
//! Turns raw message text plus [`Context`] into an [`UnderstandingResult`]:
//! intent, entities, resolved pronouns, urgency, emotion, and a confidence
//! score. Follows a seven-step algorithm exactly — keyword scoring first,
//! optional LLM refinement only when keyword confidence is weak and never
//! as the sole source of truth.

use std::collections::HashMap;
use std::sync::Arc;

use cortex_capabilities::CapabilityRegistry;
use cortex_memory::types::ConversationTurn;
use tracing::{debug, warn};

use crate::provider::{ChatRequest, LlmProvider, Message, Role};
use crate::thinking::ThinkingLevel;
use crate::types::{Context, Emotion, ResolvedPronoun, UnderstandingResult, Urgency};

/// Pronoun match below this confidence doesn't get resolved — it just flags
/// the turn for clarification instead of guessing.
const PRONOUN_CONFIDENCE_FLOOR: f32 = 0.7;
/// Keyword-only confidence below this triggers the optional LLM refinement.
const LLM_REFINEMENT_THRESHOLD: f32 = 0.7;
/// Combined confidence below this always falls back to general_conversation.
const GENERAL_FALLBACK_THRESHOLD: f32 = 0.5;
const SHORT_ACK_MAX_CHARS: usize = 20;

const PRONOUNS: &[&str] = &["it", "that", "this", "them", "he", "she", "they"];
const CONTEXT_EXPRESSIONS: &[&str] = &["the usual", "that one", "same as before", "いつもの", "あれ"];
const HONORIFICS: &[&str] = &["-san", "-sama", "-kun", "-chan", "mr.", "mrs.", "ms.", "dr."];

const URGENT_KEYWORDS: &[&str] = &["urgent", "asap", "immediately", "emergency", "急いで", "至急"];
const HIGH_URGENCY_KEYWORDS: &[&str] = &["soon", "today", "important"];
const POSITIVE_KEYWORDS: &[&str] = &["thanks", "great", "awesome", "love", "happy", "嬉しい", "ありがとう"];
const NEGATIVE_KEYWORDS: &[&str] = &["angry", "upset", "frustrated", "hate", "sad", "悲しい", "困る"];

/// Resolves intent/entities/pronouns/urgency/emotion for one turn. Holds an
/// optional LLM provider for step 7's confidence-gated refinement pass —
/// when absent, refinement is skipped and the keyword result stands as-is.
pub struct Understanding {
    registry: CapabilityRegistry,
    llm: Option<Arc<dyn LlmProvider>>,
    llm_model: String,
}

impl Understanding {
    pub fn new(registry: CapabilityRegistry, llm: Option<Arc<dyn LlmProvider>>, llm_model: impl Into<String>) -> Self {
        Self {
            registry,
            llm,
            llm_model: llm_model.into(),
        }
    }

    pub async fn understand(&self, message: &str, ctx: &Context) -> UnderstandingResult {
        if message.trim().is_empty() {
            return UnderstandingResult::fallback(message);
        }

        // Step 1: keyword scoring per capability.
        let candidates = self.registry.score_candidates(None, message);
        let (intent, keyword_confidence) = match candidates.first() {
            Some((cap, score)) => (cap.name.clone(), *score),
            None => ("general_conversation".to_string(), 0.0),
        };

        let mut entities = HashMap::new();
        let mut needs_clarification = false;

        // Step 2: pronoun resolution with distance weighting.
        let resolved_pronouns = resolve_pronouns(message, &ctx.all.recent_conversation);
        for p in &resolved_pronouns {
            if p.confidence < PRONOUN_CONFIDENCE_FLOOR {
                needs_clarification = true;
            } else {
                entities.insert(p.pronoun.clone(), p.resolved_to.clone());
            }
        }

        // Step 3: person-alias resolution.
        match resolve_person(message, &ctx.all.persons) {
            PersonMatch::Single(name) => {
                entities.insert("person".to_string(), name);
            }
            PersonMatch::Multiple => needs_clarification = true,
            PersonMatch::None => {}
        }

        // Step 4: context-expression resolution against recent topics.
        if let Some(expr) = find_context_expression(message) {
            if let Some(resolved) = resolve_context_expression(expr, &ctx.all) {
                entities.insert("reference".to_string(), resolved);
            } else {
                needs_clarification = true;
            }
        }

        // Steps 5/6: urgency and emotion lexicons.
        let urgency = classify_urgency(message);
        let emotion = classify_emotion(message);

        let mut confidence = keyword_confidence;

        // Step 7: optional LLM refinement, only when keyword confidence is weak.
        if keyword_confidence < LLM_REFINEMENT_THRESHOLD {
            if let Some(llm) = &self.llm {
                match self.refine_with_llm(llm.as_ref(), message, &intent).await {
                    Ok(agreement) => {
                        confidence = (keyword_confidence + agreement) / 2.0;
                    }
                    Err(err) => {
                        warn!(error = %err, "LLM refinement failed, keeping keyword result");
                    }
                }
            }
        }

        if confidence < GENERAL_FALLBACK_THRESHOLD {
            let mut result = UnderstandingResult::fallback(message);
            result.urgency = urgency;
            result.emotion = emotion;
            return result;
        }

        UnderstandingResult {
            intent,
            intent_confidence: confidence,
            entities,
            resolved_pronouns,
            urgency,
            emotion,
            raw_message: message.to_string(),
            needs_clarification,
        }
    }

    /// Sends a bounded-context one-shot request asking the LLM to agree or
    /// disagree with the keyword-derived intent. Returns an agreement score
    /// in `[0,1]` derived from its reply; never raises the confidence above
    /// what the model actually states.
    async fn refine_with_llm(&self, llm: &dyn LlmProvider, message: &str, candidate_intent: &str) -> Result<f32, crate::provider::ProviderError> {
        let req = ChatRequest {
            model: self.llm_model.clone(),
            system: "You classify short chat messages against a single candidate intent. \
            Reply with only a number from 0.0 to 1.0: how confident you are that the \
            candidate intent correctly describes the message."
                .to_string(),
            messages: vec![Message {
                    role: Role::User,
                    content: format!("Message: {message:?}\nCandidate intent: {candidate_intent}"),
            }],
            max_tokens: 16,
            thinking: Some(ThinkingLevel::Off),
        };
        let resp = llm.send(&req).await?;
        let agreement = resp.content.trim().parse::<f32>().unwrap_or(0.5).clamp(0.0, 1.0);
        debug!(candidate_intent, agreement, "LLM refinement agreement");
        Ok(agreement)
    }
}

/// Is this a short acknowledgement-style continuation (the goal-setting
/// elicitation's "yes keep it"-style reply rule)?
pub fn is_short_continuation(message: &str) -> bool {
    message.chars().count() <= SHORT_ACK_MAX_CHARS
}

fn resolve_pronouns(message: &str, recent: &[ConversationTurn]) -> Vec<ResolvedPronoun> {
    let lower = message.to_lowercase();
    let mut out = Vec::new();
    for pronoun in PRONOUNS {
        if !lower.split_whitespace().any(|w| w.trim_matches(|c: char| !c.is_alphanumeric()) == *pronoun) {
            continue;
        }
        // Distance weighting: the most recent turn referencing a concrete
        // noun wins, with confidence decaying the further back we look.
        let mut best: Option<(String, f32)> = None;
        for (distance, turn) in recent.iter().rev().enumerate() {
            if turn.role != "user" && turn.role != "assistant" {
                continue;
            }
            if let Some(noun) = extract_candidate_noun(&turn.content) {
                let weight = match distance {
                    0 => 0.95,
                    1 => 0.8,
                    2 => 0.6,
                    _ => 0.4,
                };
                best = Some((noun, weight));
                break;
            }
        }
        if let Some((resolved_to, confidence)) = best {
            out.push(ResolvedPronoun {
                    pronoun: pronoun.to_string(),
                    resolved_to,
                    confidence,
            });
        }
    }
    out
}

/// Extremely small heuristic: the longest capitalized or quoted token in a
/// turn stands in for "the noun that turn was about". Good enough to give
/// pronoun resolution something to chain off without a full parser.
fn extract_candidate_noun(content: &str) -> Option<String> {
    content
        .split_whitespace()
        .filter(|w| w.chars().next().map(|c| c.is_uppercase()).unwrap_or(false))
        .max_by_key(|w| w.len())
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty())
}

enum PersonMatch {
    Single(String),
    Multiple,
    None,
}

fn resolve_person(message: &str, persons: &[cortex_memory::types::PersonInfo]) -> PersonMatch {
    let lower = strip_honorifics(&message.to_lowercase());
    let mut matches = Vec::new();
    for person in persons {
        let mut aliases: Vec<String> = person.aliases.iter().map(|a| strip_honorifics(&a.to_lowercase())).collect();
        aliases.push(strip_honorifics(&person.display_name.to_lowercase()));
        if aliases.iter().any(|a| !a.is_empty() && lower.contains(a.as_str())) {
            matches.push(person.display_name.clone());
        }
    }
    matches.dedup();
    match matches.len() {
        0 => PersonMatch::None,
        1 => PersonMatch::Single(matches.remove(0)),
        _ => PersonMatch::Multiple,
    }
}

fn strip_honorifics(s: &str) -> String {
    let mut out = s.to_string();
    for h in HONORIFICS {
        out = out.replace(h, "");
    }
    out.trim().to_string()
}

fn find_context_expression(message: &str) -> Option<&'static str> {
    let lower = message.to_lowercase();
    CONTEXT_EXPRESSIONS.iter().find(|expr| lower.contains(**expr)).copied()
}

/// Resolves a context expression like "the usual" against the most recent
/// topic in memory (latest task, latest goal, latest insight, in that
/// order). Returns `None` — signalling ambiguity — when nothing recent
/// exists to anchor it to.
fn resolve_context_expression(_expr: &str, all: &cortex_memory::AllContext) -> Option<String> {
    if let Some(task) = all.recent_tasks.first() {
        return Some(task.body.clone());
    }
    if let Some(goal) = all.active_goals.first() {
        return Some(goal.title.clone());
    }
    None
}

fn classify_urgency(message: &str) -> Urgency {
    let lower = message.to_lowercase();
    if URGENT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return Urgency::Critical;
    }
    if HIGH_URGENCY_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return Urgency::High;
    }
    Urgency::Low
}

fn classify_emotion(message: &str) -> Emotion {
    let lower = message.to_lowercase();
    let positive = POSITIVE_KEYWORDS.iter().filter(|k| lower.contains(**k)).count();
    let negative = NEGATIVE_KEYWORDS.iter().filter(|k| lower.contains(**k)).count();
    if negative > positive {
        Emotion::Negative
    } else if positive > 0 {
        Emotion::Positive
    } else {
        Emotion::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_continuation_detects_length() {
        assert!(is_short_continuation("ok thanks"));
        assert!(!is_short_continuation("this message is definitely longer than twenty characters"));
    }

    #[test]
    fn urgency_escalates_on_emergency_keywords() {
        assert_eq!(classify_urgency("this is urgent, please help"), Urgency::Critical);
        assert_eq!(classify_urgency("let's do this today"), Urgency::High);
        assert_eq!(classify_urgency("just checking in"), Urgency::Low);
    }

    #[test]
    fn emotion_picks_dominant_lexicon() {
        assert_eq!(classify_emotion("thanks, this is awesome"), Emotion::Positive);
        assert_eq!(classify_emotion("I'm so frustrated and angry"), Emotion::Negative);
        assert_eq!(classify_emotion("the weather is mild"), Emotion::Neutral);
    }

    #[test]
    fn person_resolution_flags_ambiguous_multi_match() {
        let persons = vec![
            cortex_memory::types::PersonInfo {
                person_id: "p1".to_string(),
                organization_id: cortex_core::types::OrganizationId::new("org-1"),
                display_name: "Alice".to_string(),
                aliases: vec![],
                relation: None,
            },
            cortex_memory::types::PersonInfo {
                person_id: "p2".to_string(),
                organization_id: cortex_core::types::OrganizationId::new("org-1"),
                display_name: "Alicia".to_string(),
                aliases: vec!["alice".to_string()],
                relation: None,
            },
        ];
        match resolve_person("tell alice I'm running late", &persons) {
            PersonMatch::Multiple => {}
            _ => panic!("expected ambiguous multi-match"),
        }
    }
}

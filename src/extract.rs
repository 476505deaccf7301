//! Extraction response parsing.
//!
//! The AI collaborator is asked to return one JSON object describing the
//! insights it found in free text. In practice the object arrives wrapped in
//! markdown fences, surrounded by prose, or with list fields that already
//! round-tripped through the lossy storage layer. Parsing is accordingly
//! defensive: locate the JSON, deserialize leniently, and force every
//! list-typed field through the canonicalizer regardless of how structured it
//! looks.

use serde::Deserialize;
use serde_json::Value;

use crate::canonical::canonicalize;
use crate::error::ExtractError;
use crate::suggestion::{
    BeliefSuggestion, GoalSuggestion, IdentitySuggestion, PersonInsightSuggestion, Suggestion,
    SuggestionPayload, TriggerSuggestion,
};

/// Cap on items per canonical list — bounds oversized model output.
const MAX_LIST_ITEMS: usize = 20;

// =============================================================================
// Raw wire shapes
// =============================================================================
//
// Every list field is a raw `Value`, never `Vec<String>`: the collaborator
// itself round-trips through the same storage layer, so "already structured"
// is not trusted.

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExtraction {
    #[serde(default)]
    goals: Vec<RawGoal>,
    #[serde(default)]
    beliefs: Vec<RawBelief>,
    #[serde(default)]
    triggers: Vec<RawTrigger>,
    #[serde(default)]
    identity: Option<RawIdentity>,
    #[serde(default)]
    people: Vec<RawPersonInsight>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGoal {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    vision: Option<String>,
    #[serde(default)]
    timeframe: Option<String>,
    #[serde(default)]
    milestones: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBelief {
    #[serde(default)]
    statement: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    evidence: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrigger {
    #[serde(default)]
    name: Option<String>,
    /// Arrives as a number or a numeric string, depending on the model's mood.
    #[serde(default)]
    intensity: Option<Value>,
    #[serde(default)]
    coping_strategies: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIdentity {
    #[serde(default)]
    values: Value,
    #[serde(default)]
    strengths: Value,
    #[serde(default)]
    aspirations: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPersonInsight {
    #[serde(default)]
    person_id: Option<String>,
    #[serde(default)]
    interests: Value,
    #[serde(default)]
    personality_traits: Value,
    #[serde(default)]
    goals: Value,
    #[serde(default)]
    communication_style: Option<String>,
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse the collaborator's free-text response into suggestions.
///
/// Entries missing their required scalar (goal title, belief statement,
/// trigger name, person id) are dropped with a warning, not errored — one
/// malformed entry must not sink the batch.
pub fn parse_extraction_response(response: &str) -> Result<Vec<Suggestion>, ExtractError> {
    let json = extract_json_from_response(response).ok_or(ExtractError::NoJsonFound)?;
    let raw: RawExtraction =
        serde_json::from_str(json).map_err(|e| ExtractError::InvalidJson(e.to_string()))?;

    let mut suggestions = Vec::new();

    for goal in raw.goals {
        let Some(title) = clean_scalar(goal.title) else {
            log::warn!("extract: dropping goal with empty title");
            continue;
        };
        suggestions.push(Suggestion::new(
            None,
            SuggestionPayload::Goal(GoalSuggestion {
                title,
                vision: clean_scalar(goal.vision),
                timeframe: clean_scalar(goal.timeframe),
                milestones: list_field(&goal.milestones),
            }),
        ));
    }

    for belief in raw.beliefs {
        let Some(statement) = clean_scalar(belief.statement) else {
            log::warn!("extract: dropping belief with empty statement");
            continue;
        };
        suggestions.push(Suggestion::new(
            None,
            SuggestionPayload::Belief(BeliefSuggestion {
                statement,
                category: clean_scalar(belief.category),
                evidence: list_field(&belief.evidence),
            }),
        ));
    }

    for trigger in raw.triggers {
        let Some(name) = clean_scalar(trigger.name) else {
            log::warn!("extract: dropping trigger with empty name");
            continue;
        };
        suggestions.push(Suggestion::new(
            None,
            SuggestionPayload::Trigger(TriggerSuggestion {
                name,
                intensity: trigger.intensity.as_ref().and_then(parse_intensity),
                coping_strategies: list_field(&trigger.coping_strategies),
            }),
        ));
    }

    if let Some(identity) = raw.identity {
        let payload = IdentitySuggestion {
            values: list_field(&identity.values),
            strengths: list_field(&identity.strengths),
            aspirations: list_field(&identity.aspirations),
        };
        if !payload.is_empty() {
            suggestions.push(Suggestion::new(None, SuggestionPayload::Identity(payload)));
        }
    }

    for person in raw.people {
        let Some(person_id) = clean_scalar(person.person_id) else {
            log::warn!("extract: dropping person insight without person id");
            continue;
        };
        let payload = PersonInsightSuggestion {
            interests: list_field(&person.interests),
            personality_traits: list_field(&person.personality_traits),
            goals: list_field(&person.goals),
            communication_style: clean_scalar(person.communication_style),
        };
        if !payload.is_empty() {
            suggestions.push(Suggestion::new(
                Some(person_id),
                SuggestionPayload::Person(payload),
            ));
        }
    }

    log::debug!("extract: parsed {} suggestions", suggestions.len());
    Ok(suggestions)
}

/// Canonical list from a raw wire field, capped.
fn list_field(value: &Value) -> Vec<String> {
    let mut items = canonicalize(value);
    items.truncate(MAX_LIST_ITEMS);
    items
}

/// Trim a scalar, coalescing blank to `None`.
fn clean_scalar(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_intensity(value: &Value) -> Option<u8> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| u8::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Extract a JSON object from the response text.
/// Handles responses with markdown fences or surrounding prose.
fn extract_json_from_response(response: &str) -> Option<&str> {
    // ```json fence
    if let Some(start) = response.find("```json") {
        let json_start = start + 7;
        if let Some(end) = response[json_start..].find("```") {
            return Some(response[json_start..json_start + end].trim());
        }
    }
    // Generic ``` fence whose body starts with an object
    if let Some(start) = response.find("```") {
        let after_fence = start + 3;
        if let Some(nl) = response[after_fence..].find('\n') {
            let json_start = after_fence + nl + 1;
            if let Some(end) = response[json_start..].find("```") {
                let candidate = response[json_start..json_start + end].trim();
                if candidate.starts_with('{') {
                    return Some(candidate);
                }
            }
        }
    }

    // Raw object
    let trimmed = response.trim();
    if trimmed.starts_with('{') {
        return Some(trimmed);
    }

    // Object embedded in prose — balanced-brace scan, string/escape aware
    let start = response.find('{')?;
    let candidate = &response[start..];
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;
    for (i, ch) in candidate.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&candidate[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

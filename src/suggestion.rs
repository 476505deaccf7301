//! Suggestion model.
//!
//! A suggestion is a proposed set of field updates for one target entity,
//! produced by the AI extraction collaborator. Suggestions are read-only once
//! created — only their *application state* (tracked by the apply coordinator)
//! ever changes. List-typed fields are already canonical here: the extraction
//! layer forces everything through the canonicalizer before a `Suggestion` is
//! constructed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The entity kinds a suggestion can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Goal,
    Belief,
    Trigger,
    Identity,
    Person,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Goal => "goal",
            EntityKind::Belief => "belief",
            EntityKind::Trigger => "trigger",
            EntityKind::Identity => "identity",
            EntityKind::Person => "person",
        }
    }
}

/// A proposed new goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSuggestion {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub milestones: Vec<String>,
}

/// A proposed belief (empowering or limiting).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeliefSuggestion {
    pub statement: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,
}

/// A proposed emotional trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerSuggestion {
    pub name: String,
    /// 1–10 self-reported intensity, when the source material names one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coping_strategies: Vec<String>,
}

/// Proposed additions to the user's identity record. All fields are lists
/// that merge into what is already saved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySuggestion {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strengths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aspirations: Vec<String>,
}

impl IdentitySuggestion {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.strengths.is_empty() && self.aspirations.is_empty()
    }
}

/// Proposed insights about a person in the user's life.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonInsightSuggestion {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub personality_traits: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub goals: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub communication_style: Option<String>,
}

impl PersonInsightSuggestion {
    pub fn is_empty(&self) -> bool {
        self.interests.is_empty()
            && self.personality_traits.is_empty()
            && self.goals.is_empty()
            && self.communication_style.is_none()
    }
}

/// Kind-specific suggestion payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SuggestionPayload {
    Goal(GoalSuggestion),
    Belief(BeliefSuggestion),
    Trigger(TriggerSuggestion),
    Identity(IdentitySuggestion),
    Person(PersonInsightSuggestion),
}

impl SuggestionPayload {
    pub fn kind(&self) -> EntityKind {
        match self {
            SuggestionPayload::Goal(_) => EntityKind::Goal,
            SuggestionPayload::Belief(_) => EntityKind::Belief,
            SuggestionPayload::Trigger(_) => EntityKind::Trigger,
            SuggestionPayload::Identity(_) => EntityKind::Identity,
            SuggestionPayload::Person(_) => EntityKind::Person,
        }
    }
}

/// One proposed update set for one target entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: Uuid,
    /// Present when the suggestion targets an existing entity; `None` means
    /// "create new".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    pub payload: SuggestionPayload,
    pub extracted_at: DateTime<Utc>,
}

impl Suggestion {
    pub fn new(target_id: Option<String>, payload: SuggestionPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            target_id,
            payload,
            extracted_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.payload.kind()
    }

    /// Stable apply key for this suggestion at position `index` in its batch.
    ///
    /// Merges into an existing entity key on the target id; creates key on the
    /// batch index, since no entity id exists yet.
    pub fn key_at(&self, index: usize) -> SuggestionKey {
        match self.target_id {
            Some(ref id) => SuggestionKey::for_target(self.kind(), id),
            None => SuggestionKey::for_index(self.kind(), index),
        }
    }
}

/// Where a key points within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeySlot {
    /// Position in the reviewed batch (create-new suggestions).
    Index(usize),
    /// Target entity id (merge-into-existing suggestions).
    Target(String),
}

/// Stable identifier for one suggestion's application state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SuggestionKey {
    pub kind: EntityKind,
    pub slot: KeySlot,
}

impl SuggestionKey {
    pub fn for_index(kind: EntityKind, index: usize) -> Self {
        Self {
            kind,
            slot: KeySlot::Index(index),
        }
    }

    pub fn for_target(kind: EntityKind, target_id: &str) -> Self {
        Self {
            kind,
            slot: KeySlot::Target(target_id.to_string()),
        }
    }
}

impl std::fmt::Display for SuggestionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.slot {
            KeySlot::Index(i) => write!(f, "{}#{}", self.kind.as_str(), i),
            KeySlot::Target(id) => write!(f, "{}:{}", self.kind.as_str(), id),
        }
    }
}

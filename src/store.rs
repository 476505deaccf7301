//! Persistence API seam.
//!
//! The storage engine behind this trait is out of scope — it may be a local
//! database, an HTTP API, anything. Two things matter to this core:
//!
//! 1. The store performs no merging. Callers fetch current state, merge, and
//!    submit the merged result.
//! 2. List fields on *fetched* records are `serde_json::Value`, not
//!    `Vec<String>`: the layer has been observed re-encoding arrays as
//!    strings, so everything read back goes through the canonicalizer again.
//!    Write payloads carry clean lists.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;

/// Payload for creating a goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGoal {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub milestones: Vec<String>,
}

/// Payload for creating a belief.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBelief {
    pub statement: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,
}

/// Payload for creating a trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrigger {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coping_strategies: Vec<String>,
}

/// The user's identity record as the store returns it.
///
/// List fields are whatever the storage layer handed back — decode with
/// `canonicalize` before use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    #[serde(default)]
    pub values: Value,
    #[serde(default)]
    pub strengths: Value,
    #[serde(default)]
    pub aspirations: Value,
}

/// Merged identity fields to persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityFields {
    pub values: Vec<String>,
    pub strengths: Vec<String>,
    pub aspirations: Vec<String>,
}

/// A person profile as the store returns it. Same caveat as
/// [`IdentityRecord`]: list fields are still-encoded `Value`s.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub interests: Value,
    #[serde(default)]
    pub personality_traits: Value,
    #[serde(default)]
    pub goals: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication_style: Option<String>,
}

/// Merged person insight fields to persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonInsightFields {
    pub interests: Vec<String>,
    pub personality_traits: Vec<String>,
    pub goals: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub communication_style: Option<String>,
}

/// Kind-specific persistence operations consumed by the apply flows.
#[async_trait]
pub trait InsightStore: Send + Sync {
    async fn create_goal(&self, goal: NewGoal) -> Result<(), StoreError>;
    async fn create_belief(&self, belief: NewBelief) -> Result<(), StoreError>;
    async fn create_trigger(&self, trigger: NewTrigger) -> Result<(), StoreError>;

    async fn get_identity(&self) -> Result<IdentityRecord, StoreError>;
    async fn save_identity(&self, fields: IdentityFields) -> Result<(), StoreError>;

    async fn get_person(&self, id: &str) -> Result<Option<PersonRecord>, StoreError>;
    async fn update_person(&self, id: &str, fields: PersonInsightFields)
        -> Result<(), StoreError>;
}

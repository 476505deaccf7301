//! Insight apply flows.
//!
//! Ties the pieces together for one reviewed batch: derives apply keys, runs
//! the kind-specific persistence writes through the coordinator, and reports
//! per-key and batch-level outcomes through the notification sink.
//!
//! Merge discipline for existing entities (identity, person): fetch current
//! state, canonicalize every stored list (the layer may have re-encoded it),
//! merge the suggestion's lists in, and submit the merged result. The store
//! itself never merges.

use std::sync::Arc;

use serde_json::Value;

use crate::apply::{ApplyCoordinator, ApplyOutcome};
use crate::canonical::canonicalize;
use crate::error::StoreError;
use crate::merge::merge_lists;
use crate::notify::{notify_applied, notify_apply_failed, notify_batch_complete, NotificationSink};
use crate::store::{
    IdentityFields, InsightStore, NewBelief, NewGoal, NewTrigger, PersonInsightFields,
};
use crate::suggestion::{Suggestion, SuggestionKey, SuggestionPayload};

/// Decode a suggestion's list field before it reaches a writer.
///
/// Suggestions from the extraction parser are already canonical, but the
/// type is publicly constructible — a hand-built suggestion may still carry
/// an encoded list string. Same defensive contract as stored fields.
fn canonical_items(items: &[String]) -> Vec<String> {
    canonicalize(&Value::from(items.to_vec()))
}

/// Trim a scalar field, coalescing blank to `None`.
fn trimmed_opt(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Coordinates applying a reviewed suggestion batch against the store.
pub struct InsightService {
    store: Arc<dyn InsightStore>,
    sink: Arc<dyn NotificationSink>,
    coordinator: ApplyCoordinator,
}

impl InsightService {
    pub fn new(store: Arc<dyn InsightStore>, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            store,
            sink,
            coordinator: ApplyCoordinator::new(),
        }
    }

    /// Open a batch for review. Discards any prior batch's apply state.
    pub fn open_batch(&self, batch: &[Suggestion]) {
        let keys: Vec<SuggestionKey> = batch
            .iter()
            .enumerate()
            .map(|(i, s)| s.key_at(i))
            .collect();
        log::info!("InsightService: opened batch of {} suggestions", keys.len());
        self.coordinator.open(keys);
    }

    /// Apply one accepted suggestion. `index` is the suggestion's position in
    /// the batch passed to [`open_batch`].
    ///
    /// Safe to call repeatedly: double-submits and already-applied keys are
    /// silent no-ops; a failed key retries.
    pub async fn apply_suggestion(&self, index: usize, suggestion: &Suggestion) -> ApplyOutcome {
        let key = suggestion.key_at(index);
        let outcome = match &suggestion.payload {
            SuggestionPayload::Goal(goal) => {
                let payload = NewGoal {
                    title: goal.title.trim().to_string(),
                    vision: trimmed_opt(&goal.vision),
                    timeframe: trimmed_opt(&goal.timeframe),
                    milestones: canonical_items(&goal.milestones),
                };
                let store = self.store.clone();
                self.coordinator
                    .apply(&key, || async move { store.create_goal(payload).await })
                    .await
            }
            SuggestionPayload::Belief(belief) => {
                let payload = NewBelief {
                    statement: belief.statement.trim().to_string(),
                    category: trimmed_opt(&belief.category),
                    evidence: canonical_items(&belief.evidence),
                };
                let store = self.store.clone();
                self.coordinator
                    .apply(&key, || async move { store.create_belief(payload).await })
                    .await
            }
            SuggestionPayload::Trigger(trigger) => {
                let payload = NewTrigger {
                    name: trigger.name.trim().to_string(),
                    intensity: trigger.intensity,
                    coping_strategies: canonical_items(&trigger.coping_strategies),
                };
                let store = self.store.clone();
                self.coordinator
                    .apply(&key, || async move { store.create_trigger(payload).await })
                    .await
            }
            SuggestionPayload::Identity(identity) => {
                let incoming = identity.clone();
                let store = self.store.clone();
                self.coordinator
                    .apply(&key, || async move {
                        let current = store.get_identity().await?;
                        let fields = IdentityFields {
                            values: merge_lists(
                                &canonicalize(&current.values),
                                &canonical_items(&incoming.values),
                            ),
                            strengths: merge_lists(
                                &canonicalize(&current.strengths),
                                &canonical_items(&incoming.strengths),
                            ),
                            aspirations: merge_lists(
                                &canonicalize(&current.aspirations),
                                &canonical_items(&incoming.aspirations),
                            ),
                        };
                        store.save_identity(fields).await
                    })
                    .await
            }
            SuggestionPayload::Person(insight) => {
                let target = suggestion.target_id.clone();
                let incoming = insight.clone();
                let store = self.store.clone();
                self.coordinator
                    .apply(&key, || async move {
                        // Person insights only merge into existing profiles
                        let person_id = target.ok_or_else(|| {
                            StoreError::Validation("person insight has no target person".into())
                        })?;
                        let person = store
                            .get_person(&person_id)
                            .await?
                            .ok_or_else(|| StoreError::NotFound(person_id.clone()))?;
                        let fields = PersonInsightFields {
                            interests: merge_lists(
                                &canonicalize(&person.interests),
                                &canonical_items(&incoming.interests),
                            ),
                            personality_traits: merge_lists(
                                &canonicalize(&person.personality_traits),
                                &canonical_items(&incoming.personality_traits),
                            ),
                            goals: merge_lists(
                                &canonicalize(&person.goals),
                                &canonical_items(&incoming.goals),
                            ),
                            communication_style: trimmed_opt(&incoming.communication_style)
                                .or(person.communication_style),
                        };
                        store.update_person(&person_id, fields).await
                    })
                    .await
            }
        };

        match &outcome {
            ApplyOutcome::Applied => notify_applied(self.sink.as_ref(), &key),
            ApplyOutcome::Failed(reason) => {
                notify_apply_failed(self.sink.as_ref(), &key, reason)
            }
            // Guard no-ops and stale resolutions are not operator-visible
            _ => {}
        }

        outcome
    }

    /// Close the batch. Reports "N insights applied" once if anything landed.
    pub fn close_batch(&self) {
        let applied = self.coordinator.applied_count();
        if applied > 0 {
            notify_batch_complete(self.sink.as_ref(), applied);
        }
        self.coordinator.close();
    }

    pub fn is_applied(&self, key: &SuggestionKey) -> bool {
        self.coordinator.is_applied(key)
    }

    pub fn is_applying(&self, key: &SuggestionKey) -> bool {
        self.coordinator.is_applying(key)
    }

    pub fn applied_count(&self) -> usize {
        self.coordinator.applied_count()
    }
}

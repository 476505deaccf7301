//! Insight core: canonical list repair, duplicate-free merging, and
//! per-suggestion apply tracking.
//!
//! The AI extraction collaborator proposes insights (goals, beliefs,
//! triggers, identity attributes, person profiles) from free text; the
//! persistence layer stores them — and sometimes mangles list fields on the
//! way through. This crate owns the three pieces with real algorithmic
//! content in that loop:
//!
//! - [`canonical::canonicalize`] — total decoder from any stored list
//!   representation to one canonical form
//! - [`merge::merge_lists`] — case-insensitive, order-preserving merge of
//!   suggested items into existing lists
//! - [`apply::ApplyCoordinator`] — per-suggestion apply state across
//!   concurrent, independently-failable persistence writes
//!
//! [`services::insights::InsightService`] wires them to the persistence and
//! notification seams. Everything UI-facing lives in the embedding app.

pub mod apply;
pub mod canonical;
pub mod error;
pub mod extract;
pub mod merge;
pub mod notify;
pub mod services;
pub mod store;
pub mod suggestion;

pub use apply::{ApplyCoordinator, ApplyOutcome, ApplyState};
pub use canonical::{canonicalize, dedup_key};
pub use error::{ExtractError, StoreError};
pub use extract::parse_extraction_response;
pub use merge::merge_lists;
pub use notify::{LogSink, NotificationSink};
pub use services::insights::InsightService;
pub use store::InsightStore;
pub use suggestion::{EntityKind, Suggestion, SuggestionKey, SuggestionPayload};

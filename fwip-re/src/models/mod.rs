//! Typed entities for the routing engine
//!
//! Factor sets, version snapshots, and status fields are explicit structs and
//! enums rather than untyped JSON maps, so scoring and rollback contracts are
//! checked at compile time.

mod confidence;
mod corrections;
mod patterns;
mod routing;
mod rules;

pub use confidence::{
    ConfidenceBand, DocumentConfidence, FieldConfidence, FieldFactors, ResolvedFactors,
};
pub use corrections::{Correction, CorrectionType};
pub use patterns::{CorrectionPattern, PatternStatus};
pub use routing::{FieldScore, QueueEntry, QueueStatus, RoutePath, RoutingDecision};
pub use rules::{
    AccuracyDropResult, ExtractionMethod, MappingRule, RollbackLog, RollbackTrigger,
    RuleApplication, RuleStatus, RuleVersion,
};

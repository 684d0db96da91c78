//! Engine services
//!
//! Scoring and routing are pure computations with a thin transactional
//! commit; the analyzer and rollback monitor are periodic background jobs
//! driven by the scheduler.

pub mod confidence_scorer;
pub mod correction_recorder;
pub mod path_router;
pub mod pattern_analyzer;
pub mod rollback_monitor;
pub mod rule_manager;

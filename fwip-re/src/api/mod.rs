//! HTTP API for fwip-re
//!
//! JSON REST endpoints plus an SSE event stream. Errors use the shared
//! `{"error": {"code", "message"}}` envelope from [`crate::error`].

pub mod corrections;
pub mod health;
pub mod patterns;
pub mod queue;
pub mod routing;
pub mod rules;
pub mod settings;
pub mod sse;

pub use corrections::correction_routes;
pub use health::health_routes;
pub use patterns::pattern_routes;
pub use queue::queue_routes;
pub use routing::routing_routes;
pub use rules::rule_routes;
pub use settings::settings_routes;
pub use sse::event_stream;

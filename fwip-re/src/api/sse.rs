//! Server-Sent Events stream for engine notifications

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info, warn};

use fwip_common::events::EngineEvent;

fn event_name(event: &EngineEvent) -> &'static str {
    match event {
        EngineEvent::DocumentRouted { .. } => "DocumentRouted",
        EngineEvent::PatternPromoted { .. } => "PatternPromoted",
        EngineEvent::RuleActivated { .. } => "RuleActivated",
        EngineEvent::RollbackExecuted { .. } => "RollbackExecuted",
        EngineEvent::RollbackFailed { .. } => "RollbackFailed",
    }
}

/// GET /events - SSE stream of engine events
///
/// Streams routing decisions, pattern promotions, rule activations, and
/// rollback outcomes as they happen. Subscribers only see events emitted
/// after they connect.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected");

    let mut rx = state.event_bus.subscribe();

    let stream = async_stream::stream! {
        loop {
            tokio::select! {
                // Heartbeat every 15 seconds
                _ = tokio::time::sleep(Duration::from_secs(15)) => {
                    debug!("SSE: Sending heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }

                Ok(event) = rx.recv() => {
                    let event_type = event_name(&event);
                    match serde_json::to_string(&event) {
                        Ok(event_json) => {
                            yield Ok(Event::default()
                                .event(event_type)
                                .data(event_json));
                        }
                        Err(e) => {
                            warn!("SSE: Failed to serialize event {}: {}", event_type, e);
                        }
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}

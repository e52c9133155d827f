//! `GET /events` streams change events as Server-Sent Events.
//!
//! Query parameters narrow the stream:
//!   tables         comma-separated subset of confessions,votes,comments,reports
//!   confession_id  only changes scoped to this confession
//!
//! Frames carry `event: <table>.<action>`, `id: <event id>` and the JSON
//! event as `data`. The stream ends when the client disconnects.

use axum::extract::{Query, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use uuid::Uuid;

use spill_shared::errors::{AppError, AppResult};
use spill_shared::types::{ChangeEvent, Collection};

use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub tables: Option<String>,
    pub confession_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    tables: Option<Vec<Collection>>,
    confession_id: Option<Uuid>,
}

impl Subscription {
    pub fn from_query(query: &EventsQuery) -> AppResult<Self> {
        let tables = match query.tables.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(list) => Some(
                list.split(',')
                    .filter(|t| !t.trim().is_empty())
                    .map(|t| t.parse::<Collection>().map_err(AppError::Validation))
                    .collect::<AppResult<Vec<_>>>()?,
            ),
        };
        Ok(Self { tables, confession_id: query.confession_id })
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if let Some(ref tables) = self.tables {
            if !tables.contains(&event.table) {
                return false;
            }
        }
        if let Some(id) = self.confession_id {
            // A confession's own row changes have no parent, match on record id.
            let scoped = event.confession_id.unwrap_or(event.record_id);
            if scoped != id {
                return false;
            }
        }
        true
    }
}

pub async fn stream_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> AppResult<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>> {
    let subscription = Subscription::from_query(&query)?;
    let mut rx = state.bus.subscribe();

    info!(
        tables = query.tables.as_deref().unwrap_or("*"),
        confession_id = ?query.confession_id,
        "realtime subscriber connected"
    );

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if !subscription.matches(&event) {
                        continue;
                    }
                    let json = match serde_json::to_string(&event) {
                        Ok(j) => j,
                        Err(e) => {
                            warn!(error = %e, "failed to serialize change event");
                            continue;
                        }
                    };
                    yield Ok(SseEvent::default()
                        .event(event.event_name())
                        .id(event.id.to_string())
                        .data(json));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "realtime subscriber lagged");
                }
                Err(RecvError::Closed) => {
                    info!("event bus closed, ending stream");
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(state.config.sse_keepalive_secs))
            .text("keep-alive"),
    ))
}

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tracing::{error, warn};

use shared_database::StoreError;

pub const SNAPSHOT_EVENT: &str = "snapshot";
pub const ERROR_EVENT: &str = "error";

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Serves a stream of store snapshots as server-sent events. Each snapshot
/// becomes a `snapshot` event carrying the JSON document; a failed load
/// becomes an `error` event and the feed stays open.
pub fn snapshot_events<S, T>(snapshots: S) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: Stream<Item = Result<T, StoreError>> + Send + 'static,
    T: Serialize,
{
    let events = snapshots.map(|snapshot| {
        let event = match snapshot {
            Ok(data) => Event::default().event(SNAPSHOT_EVENT).json_data(data).unwrap_or_else(|e| {
                error!("Failed to encode live snapshot: {}", e);
                Event::default().event(ERROR_EVENT).data("encoding failed")
            }),
            Err(e) => {
                warn!("Live snapshot load failed: {}", e);
                Event::default().event(ERROR_EVENT).data(e.to_string())
            }
        };
        Ok(event)
    });

    Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{self, Stream};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use super::{ActingUser, AppState};
use crate::constants::FEED_KEEP_ALIVE_SECS;
use crate::engine::FeedDedup;

/// Streams the caller's own feed as server-sent events. Each frame carries
/// one `FeedEvent` as JSON with its `event_id` as the SSE id; repeats of an
/// id already sent on this connection are skipped.
pub async fn stream_feed(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.engine.feed().subscribe(user);
    info!("📡 Feed subscriber attached for {}", user);

    let stream = stream::unfold((rx, FeedDedup::default()), |(mut rx, mut seen)| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if !seen.first_sighting(event.event_id) {
                        continue;
                    }
                    let frame = Event::default()
                        .id(event.event_id.to_string())
                        .json_data(&event)
                        .unwrap_or_else(|e| Event::default().comment(format!("unencodable event: {}", e)));
                    return Some((Ok(frame), (rx, seen)));
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Feed subscriber lagged by {} events", skipped);
                    let frame = Event::default().comment(format!("lagged {}", skipped));
                    return Some((Ok(frame), (rx, seen)));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(FEED_KEEP_ALIVE_SECS))
            .text("ping"),
    )
}

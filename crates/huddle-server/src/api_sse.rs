//! SSE stream of call state changes.

use crate::AppState;
use axum::{
    extract::Extension,
    response::{sse::Event, Sse},
};
use futures_util::Stream;
use std::{convert::Infallible, sync::Arc};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Handler for `GET /events/calls`.
///
/// Streams every call state transition as it happens.
pub async fn get_call_stream_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.bot.subscribe_transitions());

    let mapped_stream = stream.filter_map(|result| match result {
        Ok(transition) => match serde_json::to_string(&transition) {
            Ok(data) => Some(Ok(Event::default().event("transition").data(data))),
            Err(e) => {
                tracing::error!("failed to serialize call transition: {}", e);
                None
            }
        },
        Err(broadcast_error) => {
            tracing::warn!(
                error = %broadcast_error,
                "call SSE stream lagged; transitions were dropped for this subscriber"
            );
            None
        }
    });

    Sse::new(mapped_stream).keep_alive(axum::response::sse::KeepAlive::default())
}

//! `GET /reports/events`: a Server-Sent Events feed of report changes.
//!
//! Each event is named `created` or `updated` and carries the
//! [`ReportEvent`] as JSON, with the private NGO notes removed since the feed
//! is open to anyone. A subscriber that falls behind the channel
//! capacity skips the missed events and keeps going.

use std::convert::Infallible;

use axum::{
  extract::State,
  response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, stream};
use pawguard_core::{
  report::{ReportEvent, ReportEventKind},
  store::ReportStore,
};
use tokio::sync::broadcast::{Receiver, error::RecvError};
use tracing::{error, warn};

use crate::AppState;

fn to_sse(event: &ReportEvent) -> Option<Event> {
  let name = match event.kind {
    ReportEventKind::Created => "created",
    ReportEventKind::Updated => "updated",
  };
  match Event::default().event(name).json_data(event) {
    Ok(sse) => Some(sse),
    Err(e) => {
      error!(error = %e, "failed to encode report event");
      None
    }
  }
}

/// Turn a broadcast receiver into an SSE stream that ends when the desk is
/// dropped.
pub fn event_stream(rx: Receiver<ReportEvent>) -> impl Stream<Item = Result<Event, Infallible>> {
  stream::unfold(rx, |mut rx| async move {
    loop {
      match rx.recv().await {
        Ok(event) => {
          if let Some(sse) = to_sse(&event.redacted()) {
            return Some((Ok(sse), rx));
          }
        }
        Err(RecvError::Lagged(skipped)) => warn!(skipped, "event subscriber lagged"),
        Err(RecvError::Closed) => return None,
      }
    }
  })
}

/// `GET /reports/events`
pub async fn stream<S>(
  State(state): State<AppState<S>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
  S: ReportStore + 'static,
{
  Sse::new(event_stream(state.desk.subscribe())).keep_alive(KeepAlive::default())
}

use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use uuid::Uuid;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::dto::sse::{Handshake, ServerEvent};

/// Identifies the target SSE stream so teardown can be logged per screen.
#[derive(Clone, Copy)]
pub enum StreamKind {
    /// Lobby stream of one room.
    Lobby {
        /// Room being watched.
        room_id: Uuid,
    },
    /// Live leaderboard stream of one session.
    Scores {
        /// Session being watched.
        session_id: Uuid,
    },
}

/// Convert an event stream into an SSE response, forwarding events and
/// cleaning up once the client disconnects.
///
/// Dropping the forwarded stream is what tears down the reducer and its
/// change subscriptions, so nothing keeps mutating state for a gone screen.
pub fn to_sse_stream<S>(
    events: S,
    kind: StreamKind,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: Stream<Item = ServerEvent> + Send + 'static,
{
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from the reducer and pushes into mpsc
    tokio::spawn(async move {
        futures::pin_mut!(events);
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                next = events.next() => {
                    match next {
                        Some(payload) => {
                            let mut event = Event::default().data(payload.data);
                            if let Some(name) = payload.event {
                                event = event.event(name);
                            }

                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        match kind {
            StreamKind::Lobby { room_id } => {
                tracing::info!(%room_id, "lobby SSE stream disconnected")
            }
            StreamKind::Scores { session_id } => {
                tracing::info!(%session_id, "scores SSE stream disconnected")
            }
        }
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Build the handshake event sent first on every SSE connection.
pub fn handshake_event(stream: &str, message: &str) -> ServerEvent {
    match ServerEvent::json(
        Some("handshake".to_string()),
        &Handshake {
            stream: stream.to_string(),
            message: message.to_string(),
        },
    ) {
        Ok(event) => event,
        Err(_) => ServerEvent::new(Some("handshake".to_string()), "{}".to_string()),
    }
}

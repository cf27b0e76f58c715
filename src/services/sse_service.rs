use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

use crate::{
    dto::{
        events::DrawEvent,
        sse::{Handshake, ServerEvent},
    },
    state::SharedState,
};

/// Subscribe to the session's lifecycle events.
pub fn subscribe(state: &SharedState) -> broadcast::Receiver<DrawEvent> {
    state.events().subscribe()
}

/// First event sent to a new client, carrying the current state.
pub fn handshake(state: &SharedState) -> Option<ServerEvent> {
    let payload = Handshake {
        message: "draw stream connected".into(),
        state: state.state().into(),
    };
    ServerEvent::json(Some("handshake".to_string()), &payload)
        .inspect_err(|err| warn!(error = %err, "failed to encode SSE handshake"))
        .ok()
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

/// Convert a broadcast receiver into an SSE response, forwarding events until the client
/// disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<DrawEvent>,
    greeting: Option<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if let Some(greeting) = greeting {
            if tx.send(Ok(to_event(greeting))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(draw_event) => {
                            let payload = match ServerEvent::try_from(&draw_event) {
                                Ok(payload) => payload,
                                Err(err) => {
                                    warn!(event = draw_event.name(), error = %err, "failed to encode SSE event");
                                    continue;
                                }
                            };
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            // Skip lagged messages but keep the stream alive.
                            warn!(skipped, "SSE client lagging; events dropped");
                            continue;
                        }
                    }
                }
            }
        }

        tracing::info!("draw SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

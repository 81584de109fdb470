//! Server-Sent Events (SSE) client for receiving bridge events.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::Stream;
use reqwest_eventsource::{Event as SseEvent, EventSource, RequestBuilderExt};
use tracing::{debug, error, info, warn};

use crate::error::BridgeError;
use crate::types::Event;
use crate::BridgeClient;

/// A stream of events pushed by the bridge daemon.
///
/// The underlying event source reconnects on its own after transient
/// failures; errors are still surfaced so callers can log them.
pub struct EventStream {
    event_source: EventSource,
}

impl EventStream {
    /// Open the SSE connection for a client.
    pub fn new(client: &BridgeClient) -> Result<Self, BridgeError> {
        let url = client.config().events_url();
        info!("Creating SSE connection to {}", url);

        // SSE connections are long-lived; use a client without the RPC timeout
        let sse_client = reqwest::Client::builder().build()?;

        let event_source = sse_client
            .get(&url)
            .eventsource()
            .map_err(|e| BridgeError::Sse(e.to_string()))?;

        Ok(Self { event_source })
    }
}

impl Stream for EventStream {
    type Item = Result<Event, BridgeError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.event_source).poll_next(cx) {
                Poll::Ready(Some(Ok(SseEvent::Open))) => {
                    debug!("SSE connection opened");
                    continue;
                }
                Poll::Ready(Some(Ok(SseEvent::Message(msg)))) => {
                    match Event::parse(&msg.event, &msg.data) {
                        Ok(Some(event)) => {
                            debug!("Received SSE event: {}", msg.event);
                            return Poll::Ready(Some(Ok(event)));
                        }
                        Ok(None) => {
                            debug!("Ignoring SSE event type: {}", msg.event);
                            continue;
                        }
                        Err(e) => {
                            warn!("Failed to parse {} event data: {}", msg.event, e);
                            debug!("Raw data: {}", msg.data);
                            continue;
                        }
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    error!("SSE error: {}", e);
                    return Poll::Ready(Some(Err(BridgeError::Sse(e.to_string()))));
                }
                Poll::Ready(None) => {
                    info!("SSE stream ended");
                    return Poll::Ready(None);
                }
                Poll::Pending => {
                    return Poll::Pending;
                }
            }
        }
    }
}

/// Subscribe to the daemon's event stream.
pub fn subscribe(client: &BridgeClient) -> Result<EventStream, BridgeError> {
    EventStream::new(client)
}

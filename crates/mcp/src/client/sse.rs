//! Server-Sent Events (SSE) push-stream transport.
//!
//! The server announces a POST endpoint with an `endpoint` event on the GET
//! stream, then pushes JSON-RPC messages as `message` events. Outbound
//! messages are POSTed to the announced endpoint. The pair is handed to rmcp
//! as a `(Sink, Stream)` transport.
//!
//! The GET stream is read by a background task owned by the inbound half:
//! dropping the stream (client close, failed handshake) aborts the task and
//! releases the connection.

use futures_util::{Sink, Stream, StreamExt, sink, stream};
use rmcp::model::{ClientJsonRpcMessage, ServerJsonRpcMessage};
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;
use url::Url;

use crate::client::protocol::TransportEvents;
use crate::types::ClientError;

pub(crate) type SseSink = Pin<Box<dyn Sink<ClientJsonRpcMessage, Error = SseError> + Send>>;
pub(crate) type SseStream = Pin<Box<dyn Stream<Item = ServerJsonRpcMessage> + Send>>;

/// Failure while posting an outbound message.
#[derive(Debug, Error)]
pub(crate) enum SseError {
    #[error("POST to {endpoint} failed: {source}")]
    Post {
        endpoint: Url,
        #[source]
        source: reqwest::Error,
    },
}

/// Aborts the event pump when dropped.
#[derive(Debug)]
struct PumpGuard(AbortHandle);

impl Drop for PumpGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Open the event stream and wait for the server to announce its POST endpoint.
pub(crate) async fn connect_sse(
    http: reqwest::Client,
    url: Url,
    events: TransportEvents,
) -> Result<(SseSink, SseStream), ClientError> {
    let response = http
        .get(url.clone())
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|error| ClientError::transport(format!("SSE connect to {url} failed: {error}")))?;

    let (endpoint_tx, endpoint_rx) = oneshot::channel();
    let (message_tx, message_rx) = mpsc::unbounded_channel();
    let pump = PumpGuard(tokio::spawn(pump_events(response, url, endpoint_tx, message_tx, events)).abort_handle());

    let endpoint = endpoint_rx
        .await
        .map_err(|_| ClientError::transport("SSE stream ended before the server announced an endpoint"))?;

    let outbound = sink::unfold((http, endpoint), |(http, endpoint), message: ClientJsonRpcMessage| async move {
        http.post(endpoint.clone())
            .json(&message)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|source| SseError::Post {
                endpoint: endpoint.clone(),
                source,
            })?;
        Ok::<_, SseError>((http, endpoint))
    });
    let inbound = stream::unfold((message_rx, pump), |(mut receiver, pump)| async move {
        receiver.recv().await.map(|message| (message, (receiver, pump)))
    });

    Ok((Box::pin(outbound), Box::pin(inbound)))
}

/// Reads the GET stream until it ends, routing frames by event name.
///
/// Ending drops `message_tx`, which ends the inbound stream; closure is
/// reported by whoever consumes that stream.
async fn pump_events(
    response: reqwest::Response,
    base: Url,
    endpoint_tx: oneshot::Sender<Url>,
    message_tx: mpsc::UnboundedSender<ServerJsonRpcMessage>,
    events: TransportEvents,
) {
    let mut endpoint_tx = Some(endpoint_tx);
    let mut body = response.bytes_stream();
    let mut buf = Vec::<u8>::new();

    while let Some(chunk) = body.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(error) => {
                events.report_error(ClientError::transport(format!("SSE stream error: {error}")));
                break;
            }
        };
        buf.extend_from_slice(&bytes);

        // Process all complete frames in the buffer
        while let Some(end) = find_frame_end(&buf) {
            let frame = std::str::from_utf8(&buf[..end]).ok().and_then(parse_sse_frame);
            buf.drain(..end + find_separator_len(&buf[end..]));

            let Some(frame) = frame else { continue };
            let Some(data) = frame.data else { continue };
            match frame.event.as_deref() {
                Some("endpoint") => match base.join(data.trim()) {
                    Ok(endpoint) => {
                        if let Some(tx) = endpoint_tx.take() {
                            let _ = tx.send(endpoint);
                        }
                    }
                    Err(error) => {
                        events.report_error(ClientError::transport(format!("invalid SSE endpoint '{data}': {error}")));
                    }
                },
                None | Some("message") => match serde_json::from_str::<ServerJsonRpcMessage>(&data) {
                    Ok(message) => {
                        if message_tx.send(message).is_err() {
                            return;
                        }
                    }
                    Err(error) => {
                        events.report_error(ClientError::transport(format!("malformed SSE message: {error}")));
                    }
                },
                Some(other) => tracing::debug!(target: "mcp_sse", "Ignoring SSE event '{}'", other),
            }
        }
    }
}

/// Finds the end of the first SSE frame in the buffer.
fn find_frame_end(buf: &[u8]) -> Option<usize> {
    (0..buf.len()).find(|&i| buf[i..].starts_with(b"\n\n") || buf[i..].starts_with(b"\r\n\r\n"))
}

/// Finds the length of the SSE frame separator.
fn find_separator_len(slice: &[u8]) -> usize {
    if slice.starts_with(b"\n\n") {
        2
    } else if slice.starts_with(b"\r\n\r\n") {
        4
    } else {
        0
    }
}

/// Represents a single parsed SSE frame.
#[derive(Debug, PartialEq, Eq)]
struct SseFrame {
    event: Option<String>,
    data: Option<String>,
    id: Option<String>,
}

/// Parses a string slice into an `SseFrame`.
fn parse_sse_frame(frame_text: &str) -> Option<SseFrame> {
    let mut data_lines = Vec::new();
    let mut id: Option<String> = None;
    let mut event: Option<String> = None;

    for line in frame_text.lines() {
        if line.starts_with(':') {
            continue; // Ignore comments
        }
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        } else if let Some(rest) = line.strip_prefix("id:") {
            id = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("event:") {
            event = Some(rest.trim().to_string());
        }
    }

    if data_lines.is_empty() && id.is_none() && event.is_none() {
        None
    } else {
        Some(SseFrame {
            event,
            data: (!data_lines.is_empty()).then(|| data_lines.join("\n")),
            id,
        })
    }
}

//! Control channel listener.
//!
//! Waits a settling delay so the registry's session record has propagated,
//! opens the control socket, and reports every termination sentinel to the
//! owning viewer actor. The actor deduplicates; the listener does not.
//!
//! If the socket cannot be opened the session continues without push
//! termination (degraded mode). Nothing is retried.

use crate::transport::SocketConnector;
use common::{Credential, StreamKey, STREAM_ENDED_SENTINEL};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// What the listener reports upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlSignal {
    /// The socket is open.
    Connected,
    /// The socket never opened; push termination is unavailable.
    Unavailable(String),
    /// Termination sentinel received.
    StreamEnded,
}

/// Run the listener until cancelled or the socket closes.
///
/// Signals are converted into the receiver's event type, so the listener can
/// feed an actor mailbox shared with other tasks.
#[instrument(skip_all, name = "live.task.control_listener", fields(stream_key = %stream_key))]
pub async fn run_control_listener<T>(
    connector: Arc<dyn SocketConnector>,
    stream_key: StreamKey,
    credential: Credential,
    settle_delay: Duration,
    signals: mpsc::Sender<T>,
    cancel_token: CancellationToken,
) where
    T: From<ControlSignal> + Send + 'static,
{
    tokio::select! {
        () = cancel_token.cancelled() => return,
        () = tokio::time::sleep(settle_delay) => {}
    }

    let connect = connector.connect_control(&stream_key, &credential);
    let mut channel = tokio::select! {
        () = cancel_token.cancelled() => return,
        result = connect => match result {
            Ok(channel) => channel,
            Err(e) => {
                warn!(
                    target: "live.task.control_listener",
                    error = %e,
                    "Control socket unavailable, continuing without end notifications"
                );
                let _ = signals.send(ControlSignal::Unavailable(e.to_string()).into()).await;
                return;
            }
        },
    };

    debug!(target: "live.task.control_listener", "Control socket open");
    if signals.send(ControlSignal::Connected.into()).await.is_err() {
        channel.close().await;
        return;
    }

    loop {
        let text = tokio::select! {
            () = cancel_token.cancelled() => break,
            text = channel.next_text() => text,
        };

        match text {
            Some(text) if text == STREAM_ENDED_SENTINEL => {
                info!(target: "live.task.control_listener", "Stream termination received");
                if signals.send(ControlSignal::StreamEnded.into()).await.is_err() {
                    break;
                }
            }
            Some(other) => {
                debug!(
                    target: "live.task.control_listener",
                    len = other.len(),
                    "Ignoring control message"
                );
            }
            None => {
                debug!(target: "live.task.control_listener", "Control socket closed by server");
                break;
            }
        }
    }

    channel.close().await;
}

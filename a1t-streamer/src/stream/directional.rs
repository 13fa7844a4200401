/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Single-writer, single-queue logical channel owned by the broker.

use crate::message::StreamMessage;
use crate::observability::events;
use crate::stream::StreamId;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

const COMPONENT: &str = "directional_stream";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StreamError {
    /// The stream was closed before or during the send.
    Closed,
    /// Nobody drained the queue within the send timeout.
    SendTimeout(Duration),
    /// The stream was closed and nothing is left to receive.
    EndOfStream,
    /// The caller's cancellation token fired while receiving.
    Canceled,
}

impl Display for StreamError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamError::Closed => write!(f, "stream is closed"),
            StreamError::SendTimeout(timeout) => {
                write!(f, "stream send timed out after {timeout:?}")
            }
            StreamError::EndOfStream => write!(f, "end of stream"),
            StreamError::Canceled => write!(f, "stream receive canceled"),
        }
    }
}

impl Error for StreamError {}

/// A message paired with the hand-off signal its sender is waiting on.
type Delivery = (StreamMessage, oneshot::Sender<()>);

/// A directional stream hands each message straight to its receiver: `send`
/// completes only once `receive` has taken the message, and fails with
/// [`StreamError::SendTimeout`] when nobody takes it in time.
pub struct DirectionalStream {
    id: StreamId,
    sender: Mutex<Option<mpsc::Sender<Delivery>>>,
    receiver: tokio::sync::Mutex<mpsc::Receiver<Delivery>>,
    closed: CancellationToken,
    send_timeout: Duration,
}

impl DirectionalStream {
    pub fn new(id: StreamId, send_timeout: Duration) -> Self {
        let (sender, receiver) = mpsc::channel(1);
        Self {
            id,
            sender: Mutex::new(Some(sender)),
            receiver: tokio::sync::Mutex::new(receiver),
            closed: CancellationToken::new(),
            send_timeout,
        }
    }

    pub fn id(&self) -> &StreamId {
        &self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    pub async fn send(&self, message: StreamMessage) -> Result<(), StreamError> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(sender) = sender else {
            return Err(StreamError::Closed);
        };

        let (delivered_tx, delivered) = oneshot::channel();
        let handoff = async move {
            sender
                .send((message, delivered_tx))
                .await
                .map_err(|_| StreamError::Closed)?;
            delivered.await.map_err(|_| StreamError::Closed)
        };

        tokio::select! {
            biased;
            sent = tokio::time::timeout(self.send_timeout, handoff) => match sent {
                Ok(result) => result,
                Err(_) => {
                    debug!(
                        event = events::STREAM_SEND_TIMEOUT,
                        component = COMPONENT,
                        stream = %self.id,
                        timeout_ms = self.send_timeout.as_millis() as u64,
                        "stream send timed out"
                    );
                    Err(StreamError::SendTimeout(self.send_timeout))
                }
            },
            _ = self.closed.cancelled() => Err(StreamError::Closed),
        }
    }

    /// Waits for the next message and releases its sender.
    ///
    /// Messages whose sender already gave up (timed out or saw the stream close)
    /// are dropped here, never handed out. Once the stream is closed and nothing
    /// is queued the result is [`StreamError::EndOfStream`].
    pub async fn receive(&self, cancel: &CancellationToken) -> Result<StreamMessage, StreamError> {
        let mut receiver = tokio::select! {
            receiver = self.receiver.lock() => receiver,
            _ = cancel.cancelled() => return Err(StreamError::Canceled),
        };

        loop {
            let delivery = tokio::select! {
                biased;
                delivery = receiver.recv() => delivery,
                _ = cancel.cancelled() => return Err(StreamError::Canceled),
            };
            let Some((message, delivered)) = delivery else {
                return Err(StreamError::EndOfStream);
            };
            if delivered.send(()).is_ok() {
                return Ok(message);
            }
            debug!(
                event = events::STREAM_ABANDONED,
                component = COMPONENT,
                stream = %self.id,
                "dropping message its sender gave up on"
            );
        }
    }

    /// Idempotent.
    pub fn close(&self) {
        if self.closed.is_cancelled() {
            return;
        }
        self.closed.cancel();
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        debug!(
            event = events::STREAM_CLOSED,
            component = COMPONENT,
            stream = %self.id,
            "stream closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{DirectionalStream, StreamError};
    use crate::message::{Header, MessageBody, PayloadType, RequestMessage, RpcKind, StreamMessage};
    use crate::stream::StreamId;
    use std::sync::Arc;
    use std::time::Duration;
    use target_registry::A1Service;
    use tokio::time::timeout;
    use tokio_util::sync::CancellationToken;

    fn message(request_id: &str) -> StreamMessage {
        StreamMessage::new(
            "ric-1",
            RpcKind::PolicyQuery,
            MessageBody::Request(RequestMessage {
                header: Header::new(request_id, "xapp", PayloadType::Policy),
                type_id: "T".to_string(),
                ..Default::default()
            }),
        )
    }

    fn stream(timeout: Duration) -> DirectionalStream {
        let (southbound, _) = StreamId::for_target("ric-1", A1Service::PolicyManagement);
        DirectionalStream::new(southbound, timeout)
    }

    #[tokio::test]
    async fn send_completes_when_the_receiver_takes_the_message() {
        let stream = stream(Duration::from_secs(1));
        let cancel = CancellationToken::new();

        let (sent, received) = tokio::join!(stream.send(message("a")), stream.receive(&cancel));

        assert_eq!(sent, Ok(()));
        assert_eq!(received.expect("message received").request_id(), "a");
    }

    #[tokio::test(start_paused = true)]
    async fn send_without_receiver_times_out() {
        let stream = stream(Duration::from_millis(100));

        let sent = stream.send(message("a")).await;

        assert_eq!(sent, Err(StreamError::SendTimeout(Duration::from_millis(100))));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_message_is_never_received() {
        let stream = stream(Duration::from_millis(100));
        let cancel = CancellationToken::new();

        assert!(stream.send(message("a")).await.is_err());
        let late = timeout(Duration::from_millis(50), stream.receive(&cancel)).await;
        assert!(late.is_err(), "abandoned message must not be handed out");

        let (sent, received) = tokio::join!(stream.send(message("b")), stream.receive(&cancel));
        assert_eq!(sent, Ok(()));
        assert_eq!(received.expect("message received").request_id(), "b");
    }

    #[tokio::test]
    async fn close_unblocks_pending_sender_and_ends_the_stream() {
        let stream = Arc::new(stream(Duration::from_secs(30)));
        let cancel = CancellationToken::new();

        let blocked = {
            let stream = stream.clone();
            tokio::spawn(async move { stream.send(message("a")).await })
        };
        tokio::task::yield_now().await;
        stream.close();
        stream.close();

        assert_eq!(blocked.await.expect("task joins"), Err(StreamError::Closed));
        assert_eq!(stream.send(message("b")).await, Err(StreamError::Closed));
        assert_eq!(stream.receive(&cancel).await, Err(StreamError::EndOfStream));
    }

    #[tokio::test]
    async fn receive_honours_cancellation() {
        let stream = stream(Duration::from_secs(1));
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(stream.receive(&cancel).await, Err(StreamError::Canceled));
    }
}

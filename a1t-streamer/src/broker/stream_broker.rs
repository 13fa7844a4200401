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

//! Registry of directional streams and their watchers, plus the per-stream
//! fan-out loops.

use crate::broker::{WatcherId, WatcherQueue};
use crate::config::StreamerConfig;
use crate::error::A1Error;
use crate::message::StreamMessage;
use crate::observability::events;
use crate::observability::fields::{self, MessageFields};
use crate::stream::{DirectionalStream, StreamError, StreamId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Level};

const COMPONENT: &str = "stream_broker";

struct StreamEntry {
    stream: Arc<DirectionalStream>,
    watchers: HashMap<WatcherId, WatcherQueue>,
    cancel: CancellationToken,
}

/// Owns every directional stream and the watcher set of each.
///
/// A single lock guards the whole registry. It is held only for map lookups and
/// mutations, never across a stream send or receive.
pub struct StreamBroker {
    streams: Mutex<HashMap<StreamId, StreamEntry>>,
    send_timeout: Duration,
}

impl StreamBroker {
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
            send_timeout,
        }
    }

    pub fn from_config(config: &StreamerConfig) -> Self {
        Self::new(config.stream_send_timeout())
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<StreamId, StreamEntry>> {
        self.streams.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates the stream for `id` and starts its fan-out loop.
    ///
    /// Calling it again for an existing stream only logs. The fan-out loop runs
    /// under a child of `cancel` and stops when either is cancelled or the stream
    /// is closed.
    pub fn add_stream(self: &Arc<Self>, cancel: &CancellationToken, id: StreamId) {
        let (stream, stream_cancel) = {
            let mut registry = self.registry();
            if registry.contains_key(&id) {
                warn!(
                    event = events::BROKER_STREAM_DUPLICATE,
                    component = COMPONENT,
                    stream = %id,
                    "stream already exists"
                );
                return;
            }

            let stream = Arc::new(DirectionalStream::new(id.clone(), self.send_timeout));
            let stream_cancel = cancel.child_token();
            registry.insert(
                id.clone(),
                StreamEntry {
                    stream: stream.clone(),
                    watchers: HashMap::new(),
                    cancel: stream_cancel.clone(),
                },
            );
            (stream, stream_cancel)
        };

        info!(
            event = events::BROKER_STREAM_ADD,
            component = COMPONENT,
            stream = %id,
            "stream added"
        );

        tokio::spawn(Self::fan_out_loop(
            Arc::downgrade(self),
            id,
            stream,
            stream_cancel,
        ));
    }

    /// Hands `message` to the stream for `id`, waiting at most the send timeout.
    pub async fn send(&self, id: &StreamId, message: StreamMessage) -> Result<(), A1Error> {
        let stream = self
            .registry()
            .get(id)
            .map(|entry| entry.stream.clone());

        let Some(stream) = stream else {
            debug!(
                event = events::BROKER_STREAM_NOT_FOUND,
                component = COMPONENT,
                stream = %id,
                "send on unknown stream"
            );
            return Err(A1Error::not_found(format!("stream {id} does not exist")));
        };

        stream.send(message).await.map_err(A1Error::from)
    }

    /// Registers `queue` under `watcher_id`. The stream must already exist.
    pub fn watch(
        &self,
        id: &StreamId,
        watcher_id: WatcherId,
        queue: WatcherQueue,
    ) -> Result<(), A1Error> {
        let mut registry = self.registry();
        let Some(entry) = registry.get_mut(id) else {
            return Err(A1Error::not_found(format!("stream {id} does not exist")));
        };
        entry.watchers.insert(watcher_id, queue);
        drop(registry);

        debug!(
            event = events::BROKER_WATCHER_ADD,
            component = COMPONENT,
            stream = %id,
            watcher_id = %watcher_id,
            "watcher registered"
        );
        Ok(())
    }

    /// Removes the watcher and drops its queue. Unknown watchers are ignored.
    pub fn delete_watcher(&self, id: &StreamId, watcher_id: WatcherId) {
        let removed = self
            .registry()
            .get_mut(id)
            .and_then(|entry| entry.watchers.remove(&watcher_id));

        if removed.is_some() {
            debug!(
                event = events::BROKER_WATCHER_DELETE,
                component = COMPONENT,
                stream = %id,
                watcher_id = %watcher_id,
                "watcher deleted"
            );
        }
    }

    /// Closes and forgets the stream for `id` and every watcher under it.
    /// Returns `true` only when the stream existed.
    pub fn close(&self, id: &StreamId) -> bool {
        let Some(entry) = self.registry().remove(id) else {
            return false;
        };

        entry.cancel.cancel();
        entry.stream.close();

        info!(
            event = events::BROKER_STREAM_CLOSE,
            component = COMPONENT,
            stream = %id,
            watchers = entry.watchers.len(),
            "stream closed"
        );
        true
    }

    pub fn contains_stream(&self, id: &StreamId) -> bool {
        self.registry().contains_key(id)
    }

    /// Number of watchers on `id`; zero for an unknown stream.
    pub fn watcher_count(&self, id: &StreamId) -> usize {
        self.registry()
            .get(id)
            .map_or(0, |entry| entry.watchers.len())
    }

    /// Sorted identifiers of every registered stream.
    pub fn stream_ids(&self) -> Vec<StreamId> {
        let mut ids: Vec<StreamId> = self.registry().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn snapshot_watchers(&self, id: &StreamId) -> Option<Vec<(WatcherId, WatcherQueue)>> {
        self.registry().get(id).map(|entry| {
            entry
                .watchers
                .iter()
                .map(|(watcher_id, queue)| (*watcher_id, queue.clone()))
                .collect()
        })
    }

    async fn fan_out_loop(
        broker: Weak<StreamBroker>,
        id: StreamId,
        stream: Arc<DirectionalStream>,
        cancel: CancellationToken,
    ) {
        loop {
            let message = match stream.receive(&cancel).await {
                Ok(message) => Arc::new(message),
                Err(err) => {
                    let reason = match err {
                        StreamError::Canceled => fields::REASON_CANCELED,
                        _ => fields::REASON_STREAM_CLOSED,
                    };
                    debug!(
                        event = events::BROKER_FANOUT_STOP,
                        component = COMPONENT,
                        stream = %id,
                        reason,
                        "fan-out loop stopped"
                    );
                    break;
                }
            };

            let Some(watchers) = broker
                .upgrade()
                .and_then(|broker| broker.snapshot_watchers(&id))
            else {
                break;
            };

            let message_fields = tracing::enabled!(Level::DEBUG)
                .then(|| MessageFields::from_message(&message));

            for (watcher_id, queue) in watchers {
                let skipped = match queue.try_send(message.clone()) {
                    Ok(()) => None,
                    Err(TrySendError::Full(_)) => Some(fields::REASON_QUEUE_FULL),
                    Err(TrySendError::Closed(_)) => Some(fields::REASON_QUEUE_CLOSED),
                };

                let Some(fields) = message_fields.as_ref() else {
                    continue;
                };
                match skipped {
                    None => debug!(
                        event = events::BROKER_FANOUT_DELIVER,
                        component = COMPONENT,
                        stream = %id,
                        watcher_id = %watcher_id,
                        request_id = fields.request_id.as_str(),
                        msg_kind = fields.msg_kind.as_str(),
                        "delivered to watcher"
                    ),
                    Some(reason) => debug!(
                        event = events::BROKER_FANOUT_SKIPPED,
                        component = COMPONENT,
                        stream = %id,
                        watcher_id = %watcher_id,
                        request_id = fields.request_id.as_str(),
                        reason,
                        "watcher missed message"
                    ),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StreamBroker;
    use crate::broker::{watcher_queue, WatcherId};
    use crate::message::{Header, MessageBody, PayloadType, ResultMessage, RpcKind, StreamMessage};
    use crate::stream::StreamId;
    use std::sync::Arc;
    use std::time::Duration;
    use target_registry::A1Service;
    use tokio::time::timeout;
    use tokio_util::sync::CancellationToken;

    fn reply(request_id: &str) -> StreamMessage {
        StreamMessage::new(
            "ric-1",
            RpcKind::PolicyQuery,
            MessageBody::Result(ResultMessage {
                header: Header::new(request_id, "ric-1", PayloadType::Policy),
                ..Default::default()
            }),
        )
    }

    fn northbound() -> StreamId {
        StreamId::for_target("ric-1", A1Service::PolicyManagement).1
    }

    #[tokio::test]
    async fn send_on_unknown_stream_is_not_found() {
        let broker = StreamBroker::new(Duration::from_secs(1));

        let err = broker.send(&northbound(), reply("a")).await.unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn watch_requires_existing_stream() {
        let broker = StreamBroker::new(Duration::from_secs(1));
        let (queue, _rx) = watcher_queue(1);

        let err = broker.watch(&northbound(), WatcherId::new(), queue).unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn duplicate_add_keeps_single_stream() {
        let broker = Arc::new(StreamBroker::new(Duration::from_secs(1)));
        let cancel = CancellationToken::new();

        broker.add_stream(&cancel, northbound());
        let watcher_id = WatcherId::new();
        let (queue, _rx) = watcher_queue(1);
        broker.watch(&northbound(), watcher_id, queue).unwrap();
        broker.add_stream(&cancel, northbound());

        assert_eq!(broker.stream_ids(), vec![northbound()]);
        assert_eq!(broker.watcher_count(&northbound()), 1);
    }

    #[tokio::test]
    async fn delete_watcher_is_idempotent() {
        let broker = Arc::new(StreamBroker::new(Duration::from_secs(1)));
        let cancel = CancellationToken::new();
        broker.add_stream(&cancel, northbound());

        let watcher_id = WatcherId::new();
        let (queue, mut rx) = watcher_queue(1);
        broker.watch(&northbound(), watcher_id, queue).unwrap();

        broker.delete_watcher(&northbound(), watcher_id);
        broker.delete_watcher(&northbound(), watcher_id);
        broker.delete_watcher(&StreamId::for_target("gone", A1Service::PolicyManagement).0, watcher_id);

        assert_eq!(broker.watcher_count(&northbound()), 0);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn close_removes_stream_and_watchers() {
        let broker = Arc::new(StreamBroker::new(Duration::from_secs(1)));
        let cancel = CancellationToken::new();
        broker.add_stream(&cancel, northbound());
        let (queue, mut rx) = watcher_queue(1);
        broker.watch(&northbound(), WatcherId::new(), queue).unwrap();

        assert!(broker.close(&northbound()));
        assert!(!broker.close(&northbound()));

        assert!(!broker.contains_stream(&northbound()));
        assert!(broker.send(&northbound(), reply("a")).await.unwrap_err().is_not_found());
        let closed = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert!(closed.is_none());
    }

    #[tokio::test]
    async fn fan_out_reaches_every_watcher() {
        let broker = Arc::new(StreamBroker::new(Duration::from_secs(1)));
        let cancel = CancellationToken::new();
        broker.add_stream(&cancel, northbound());

        let (first_queue, mut first) = watcher_queue(4);
        let (second_queue, mut second) = watcher_queue(4);
        broker.watch(&northbound(), WatcherId::new(), first_queue).unwrap();
        broker.watch(&northbound(), WatcherId::new(), second_queue).unwrap();

        broker.send(&northbound(), reply("x")).await.unwrap();

        for rx in [&mut first, &mut second] {
            let message = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
            assert_eq!(message.request_id(), "x");
        }
    }
}

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

use crate::broker::StreamBroker;
use crate::error::A1Error;
use crate::message::StreamMessage;
use crate::stream::StreamId;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Sending half of a watcher's output queue.
pub type WatcherQueue = mpsc::Sender<Arc<StreamMessage>>;

/// Receiving half of a watcher's output queue.
pub type WatcherReceiver = mpsc::Receiver<Arc<StreamMessage>>;

/// Bounded output queue for one watcher. `capacity` is clamped to at least one.
pub fn watcher_queue(capacity: usize) -> (WatcherQueue, WatcherReceiver) {
    mpsc::channel(capacity.max(1))
}

/// Token identifying one watcher registration on a stream.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct WatcherId(Uuid);

impl WatcherId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WatcherId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for WatcherId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Watcher registration that deletes itself from the broker when dropped.
///
/// Every way out of a scope holding one of these (reply, timeout, error, the
/// enclosing future being dropped) runs the same single cleanup.
pub struct WatcherRegistration {
    broker: Arc<StreamBroker>,
    stream_id: StreamId,
    watcher_id: WatcherId,
}

impl WatcherRegistration {
    /// Registers a fresh watcher on `stream_id` with a queue of `capacity` slots.
    pub fn register(
        broker: &Arc<StreamBroker>,
        stream_id: &StreamId,
        capacity: usize,
    ) -> Result<(Self, WatcherReceiver), A1Error> {
        let watcher_id = WatcherId::new();
        let (queue, receiver) = watcher_queue(capacity);
        broker.watch(stream_id, watcher_id, queue)?;

        Ok((
            Self {
                broker: broker.clone(),
                stream_id: stream_id.clone(),
                watcher_id,
            },
            receiver,
        ))
    }

    pub fn watcher_id(&self) -> WatcherId {
        self.watcher_id
    }

    pub fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }
}

impl Drop for WatcherRegistration {
    fn drop(&mut self) {
        self.broker.delete_watcher(&self.stream_id, self.watcher_id);
    }
}

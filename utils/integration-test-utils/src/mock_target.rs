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

use a1t_streamer::message::{MessageBody, RequestMessage, ResultMessage, RpcKind, StatusMessage};
use a1t_streamer::southbound::{RemoteSession, TargetConnector, TargetTransport};
use a1t_streamer::{A1Error, TargetRegistration};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How a mock target answers one-shot calls of a given kind.
#[derive(Clone, Debug)]
pub enum TargetBehavior {
    /// Success with this JSON value as payload.
    Reply(Value),
    /// Success echoing the request payload back.
    Echo,
    /// `success = false` with this reason.
    Fail(String),
    /// The call itself errors, as a broken connection would.
    CallError(String),
    /// Never answers.
    Silent,
}

/// In-memory remote target; doubles as its own transport.
pub struct MockTarget {
    target_id: String,
    behaviors: Mutex<HashMap<RpcKind, TargetBehavior>>,
    calls: Mutex<Vec<(RpcKind, RequestMessage)>>,
    sessions: Mutex<HashMap<RpcKind, Arc<MockSession>>>,
    refuse_sessions: AtomicBool,
    closed: AtomicBool,
}

impl MockTarget {
    /// Answers every call with `null` until told otherwise.
    pub fn new(target_id: &str) -> Arc<Self> {
        Arc::new(Self {
            target_id: target_id.to_string(),
            behaviors: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            sessions: Mutex::new(HashMap::new()),
            refuse_sessions: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn respond(&self, rpc: RpcKind, behavior: TargetBehavior) {
        self.behaviors.lock().unwrap().insert(rpc, behavior);
    }

    pub fn refuse_sessions(&self) {
        self.refuse_sessions.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(RpcKind, RequestMessage)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn session(&self, rpc: RpcKind) -> Option<Arc<MockSession>> {
        self.sessions.lock().unwrap().get(&rpc).cloned()
    }

    /// Pushes a status on the long-lived session of `rpc`, as the target would.
    pub fn push_status(&self, rpc: RpcKind, status: StatusMessage) -> bool {
        self.session(rpc)
            .map(|session| session.push(MessageBody::Status(status)))
            .unwrap_or(false)
    }

    /// Ends the long-lived session of `rpc` from the target's side.
    pub fn end_session(&self, rpc: RpcKind) {
        if let Some(session) = self.session(rpc) {
            session.end();
        }
    }

    fn behavior(&self, rpc: RpcKind) -> TargetBehavior {
        self.behaviors
            .lock()
            .unwrap()
            .get(&rpc)
            .cloned()
            .unwrap_or(TargetBehavior::Reply(Value::Null))
    }
}

#[async_trait]
impl TargetTransport for MockTarget {
    async fn call(&self, rpc: RpcKind, request: RequestMessage) -> Result<ResultMessage, A1Error> {
        debug!("{}: {rpc} call {}", self.target_id, request.header.request_id);
        self.calls.lock().unwrap().push((rpc, request.clone()));

        match self.behavior(rpc) {
            TargetBehavior::Reply(value) => Ok(ResultMessage::success_for(
                &request,
                serde_json::to_vec(&value)?,
            )),
            TargetBehavior::Echo => {
                let payload = request.payload.clone();
                Ok(ResultMessage::success_for(&request, payload))
            }
            TargetBehavior::Fail(reason) => Ok(ResultMessage::failure_for(&request, reason)),
            TargetBehavior::CallError(message) => Err(A1Error::transport(message)),
            TargetBehavior::Silent => std::future::pending().await,
        }
    }

    async fn open_session(&self, rpc: RpcKind) -> Result<Arc<dyn RemoteSession>, A1Error> {
        if self.refuse_sessions.load(Ordering::SeqCst) {
            return Err(A1Error::transport(format!(
                "{} refused {rpc} session",
                self.target_id
            )));
        }
        let session = Arc::new(MockSession::new());
        self.sessions.lock().unwrap().insert(rpc, session.clone());
        Ok(session)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Long-lived session whose target side is driven by the test.
pub struct MockSession {
    inbound_tx: UnboundedSender<MessageBody>,
    inbound_rx: tokio::sync::Mutex<UnboundedReceiver<MessageBody>>,
    outbound_tx: UnboundedSender<MessageBody>,
    outbound_rx: tokio::sync::Mutex<UnboundedReceiver<MessageBody>>,
    ended: CancellationToken,
}

impl MockSession {
    fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        Self {
            inbound_tx,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            outbound_tx,
            outbound_rx: tokio::sync::Mutex::new(outbound_rx),
            ended: CancellationToken::new(),
        }
    }

    fn push(&self, body: MessageBody) -> bool {
        !self.ended.is_cancelled() && self.inbound_tx.send(body).is_ok()
    }

    fn end(&self) {
        self.ended.cancel();
    }

    pub fn is_ended(&self) -> bool {
        self.ended.is_cancelled()
    }

    /// Next message the streamer sent on this session, if one arrives in time.
    pub async fn next_sent(&self, wait: Duration) -> Option<MessageBody> {
        let mut outbound = self.outbound_rx.lock().await;
        tokio::time::timeout(wait, outbound.recv()).await.ok().flatten()
    }
}

#[async_trait]
impl RemoteSession for MockSession {
    async fn recv(&self) -> Option<MessageBody> {
        let mut inbound = self.inbound_rx.lock().await;
        tokio::select! {
            _ = self.ended.cancelled() => None,
            body = inbound.recv() => body,
        }
    }

    async fn send(&self, body: MessageBody) -> Result<(), A1Error> {
        if self.ended.is_cancelled() {
            return Err(A1Error::transport("session ended"));
        }
        self.outbound_tx
            .send(body)
            .map_err(|_| A1Error::transport("session ended"))
    }

    async fn close(&self) {
        self.ended.cancel();
    }
}

/// Connects registrations to the mock target of the same id.
#[derive(Default)]
pub struct MockConnector {
    targets: Mutex<HashMap<String, Arc<MockTarget>>>,
    connects: AtomicUsize,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add(&self, target: Arc<MockTarget>) {
        self.targets
            .lock()
            .unwrap()
            .insert(target.target_id().to_string(), target);
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TargetConnector for MockConnector {
    async fn connect(
        &self,
        registration: &TargetRegistration,
    ) -> Result<Arc<dyn TargetTransport>, A1Error> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let target = self
            .targets
            .lock()
            .unwrap()
            .get(&registration.target_id)
            .cloned();

        match target {
            Some(target) => Ok(target),
            None => Err(A1Error::transport(format!(
                "no route to {} at {}",
                registration.target_id, registration.address
            ))),
        }
    }
}

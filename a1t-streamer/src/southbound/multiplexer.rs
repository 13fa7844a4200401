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

//! Per-target bridge between the broker's streams and the target's remote sessions.
//!
//! For each declared service the multiplexer owns both directional streams, one
//! inbound forwarder per long-lived session and one outbound dispatcher watching
//! the southbound stream. Any long-lived session ending tears the whole
//! multiplexer down; in-flight correlations for the target then time out.

use crate::broker::{StreamBroker, WatcherReceiver, WatcherRegistration};
use crate::config::StreamerConfig;
use crate::error::A1Error;
use crate::message::{MessageBody, ResultMessage, RpcKind, SessionMode, StreamMessage};
use crate::observability::events;
use crate::observability::fields::{self, MessageFields};
use crate::southbound::{RemoteSession, TargetConnector, TargetTransport};
use crate::stream::StreamId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use target_registry::{A1Service, TargetRegistration};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Level};

const COMPONENT: &str = "session_multiplexer";

pub struct SessionMultiplexer {
    target_id: String,
    services: Vec<A1Service>,
    broker: Arc<StreamBroker>,
    transport: Arc<dyn TargetTransport>,
    sessions: HashMap<RpcKind, Arc<dyn RemoteSession>>,
    cancel: CancellationToken,
    closed: AtomicBool,
    remote_call_timeout: Duration,
    watcher_queue_size: usize,
}

impl SessionMultiplexer {
    /// Connects to the target, creates its streams and opens every long-lived session.
    ///
    /// Nothing is forwarded until [`run`](Self::run) is called. On failure every
    /// stream created here is closed again.
    pub async fn connect(
        registration: &TargetRegistration,
        connector: &dyn TargetConnector,
        broker: Arc<StreamBroker>,
        config: &StreamerConfig,
        parent: &CancellationToken,
    ) -> Result<Arc<Self>, A1Error> {
        let target_id = registration.target_id.as_str();
        let transport = connector.connect(registration).await.map_err(|err| {
            warn!(
                event = events::MUX_CONNECT_FAILED,
                component = COMPONENT,
                target_id,
                address = registration.address.as_str(),
                err = %err,
                "connecting to target failed"
            );
            err
        })?;

        let services = registration.services();
        let cancel = parent.child_token();
        for service in &services {
            let (southbound, northbound) = StreamId::for_target(target_id, *service);
            broker.add_stream(&cancel, southbound);
            broker.add_stream(&cancel, northbound);
        }

        let mut sessions: HashMap<RpcKind, Arc<dyn RemoteSession>> = HashMap::new();
        for rpc in services.iter().flat_map(|service| RpcKind::long_lived_for(*service)) {
            match transport.open_session(rpc).await {
                Ok(session) => {
                    sessions.insert(rpc, session);
                }
                Err(err) => {
                    warn!(
                        event = events::MUX_SESSION_OPEN_FAILED,
                        component = COMPONENT,
                        target_id,
                        rpc = %rpc,
                        err = %err,
                        "opening long-lived session failed"
                    );
                    cancel.cancel();
                    for session in sessions.values() {
                        session.close().await;
                    }
                    transport.close().await;
                    close_streams(&broker, target_id, &services);
                    return Err(err);
                }
            }
        }

        Ok(Arc::new(Self {
            target_id: target_id.to_string(),
            services,
            broker,
            transport,
            sessions,
            cancel,
            closed: AtomicBool::new(false),
            remote_call_timeout: config.remote_call_timeout(),
            watcher_queue_size: config.watcher_queue_size(),
        }))
    }

    /// Starts the inbound forwarders and outbound dispatchers.
    pub fn run(self: &Arc<Self>) -> Result<(), A1Error> {
        let mut dispatchers = Vec::with_capacity(self.services.len());
        for service in &self.services {
            let (southbound, _) = StreamId::for_target(&self.target_id, *service);
            dispatchers.push(WatcherRegistration::register(
                &self.broker,
                &southbound,
                self.watcher_queue_size,
            )?);
        }

        for (registration, outbound) in dispatchers {
            tokio::spawn(self.clone().outbound_dispatcher(registration, outbound));
        }
        for (rpc, session) in &self.sessions {
            tokio::spawn(self.clone().inbound_forwarder(*rpc, session.clone()));
        }

        info!(
            event = events::MUX_START,
            component = COMPONENT,
            target_id = self.target_id.as_str(),
            services = self.services.len(),
            sessions = self.sessions.len(),
            "multiplexer started"
        );
        Ok(())
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn services(&self) -> &[A1Service] {
        &self.services
    }

    /// Cancellation scope of every task bound to this multiplexer.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Closes every session and removes this target's streams and watchers. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.cancel.cancel();
        close_streams(&self.broker, &self.target_id, &self.services);
        for session in self.sessions.values() {
            session.close().await;
        }
        self.transport.close().await;

        info!(
            event = events::MUX_CLOSE,
            component = COMPONENT,
            target_id = self.target_id.as_str(),
            "multiplexer closed"
        );
    }

    async fn inbound_forwarder(self: Arc<Self>, rpc: RpcKind, session: Arc<dyn RemoteSession>) {
        loop {
            let body = tokio::select! {
                _ = self.cancel.cancelled() => return,
                body = session.recv() => body,
            };

            let Some(body) = body else {
                info!(
                    event = events::MUX_SESSION_ENDED,
                    component = COMPONENT,
                    target_id = self.target_id.as_str(),
                    rpc = %rpc,
                    reason = fields::REASON_SESSION_ENDED,
                    "long-lived session ended; closing multiplexer"
                );
                self.close().await;
                return;
            };

            self.forward_northbound(rpc, body).await;
        }
    }

    async fn forward_northbound(&self, rpc: RpcKind, body: MessageBody) {
        let (_, northbound) = StreamId::for_target(&self.target_id, rpc.service());
        let message = StreamMessage::new(self.target_id.as_str(), rpc, body);
        let request_id = fields::format_request_id(&message);

        if let Err(err) = self.broker.send(&northbound, message).await {
            warn!(
                event = events::MUX_INBOUND_FORWARD_FAILED,
                component = COMPONENT,
                target_id = self.target_id.as_str(),
                rpc = %rpc,
                request_id = request_id.as_str(),
                err = %err,
                "forwarding inbound message failed"
            );
        }
    }

    async fn outbound_dispatcher(
        self: Arc<Self>,
        registration: WatcherRegistration,
        mut outbound: WatcherReceiver,
    ) {
        let _registration = registration;
        loop {
            let message = tokio::select! {
                _ = self.cancel.cancelled() => return,
                message = outbound.recv() => message,
            };
            let Some(message) = message else {
                return;
            };

            let mux = self.clone();
            tokio::spawn(async move {
                let cancel = mux.cancel.clone();
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = mux.dispatch(message) => {}
                }
            });
        }
    }

    async fn dispatch(&self, message: Arc<StreamMessage>) {
        if tracing::enabled!(Level::DEBUG) {
            let fields = MessageFields::from_message(&message);
            debug!(
                event = events::MUX_DISPATCH,
                component = COMPONENT,
                target_id = self.target_id.as_str(),
                rpc = fields.rpc.as_str(),
                request_id = fields.request_id.as_str(),
                msg_kind = fields.msg_kind.as_str(),
                "dispatching outbound message"
            );
        }

        if let Err(err) = self.dispatch_by_kind(&message).await {
            let event = match err {
                A1Error::NotSupported(_) => events::MUX_DISPATCH_UNSUPPORTED,
                _ => events::MUX_DISPATCH_FAILED,
            };
            warn!(
                event,
                component = COMPONENT,
                target_id = self.target_id.as_str(),
                rpc = %message.rpc,
                request_id = message.request_id(),
                err = %err,
                "outbound dispatch failed"
            );
        }
    }

    async fn dispatch_by_kind(&self, message: &StreamMessage) -> Result<(), A1Error> {
        let rpc = message.rpc;
        match (rpc.session_mode(), &message.body) {
            (SessionMode::OneShot, MessageBody::Request(request)) => {
                let result = match timeout(
                    self.remote_call_timeout,
                    self.transport.call(rpc, request.clone()),
                )
                .await
                {
                    Ok(Ok(result)) => result,
                    Ok(Err(err)) => ResultMessage::failure_for(request, err.to_string()),
                    Err(_) => ResultMessage::failure_for(
                        request,
                        format!("remote call timed out after {:?}", self.remote_call_timeout),
                    ),
                };
                self.forward_northbound(rpc, MessageBody::Result(result))
                    .await;
                Ok(())
            }
            (SessionMode::LongLived, body @ (MessageBody::Request(_) | MessageBody::Ack(_))) => {
                let session = self.sessions.get(&rpc).ok_or_else(|| {
                    A1Error::not_supported(format!("no {rpc} session to {}", self.target_id))
                })?;
                session.send(body.clone()).await
            }
            (_, body) => Err(A1Error::not_supported(format!(
                "{} message cannot be dispatched as {rpc}",
                body.kind()
            ))),
        }
    }
}

fn close_streams(broker: &StreamBroker, target_id: &str, services: &[A1Service]) {
    for service in services {
        let (southbound, northbound) = StreamId::for_target(target_id, *service);
        broker.close(&southbound);
        broker.close(&northbound);
    }
}

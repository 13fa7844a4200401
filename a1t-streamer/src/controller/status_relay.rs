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

//! Relays status pushes from targets to their notification destination and
//! acknowledges them back to the target.

use crate::broker::{StreamBroker, WatcherReceiver, WatcherRegistration};
use crate::config::StreamerConfig;
use crate::error::A1Error;
use crate::message::{
    AckMessage, MessageBody, Outcome, RpcKind, SessionMode, StatusMessage, StreamMessage,
};
use crate::observability::events;
use crate::stream::StreamId;
use async_trait::async_trait;
use std::sync::Arc;
use target_registry::A1Service;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const COMPONENT: &str = "status_relay";

const NO_DESTINATION: &str = "status carries no notification destination";

/// Delivers a status payload to its notification destination.
#[async_trait]
pub trait StatusNotifier: Send + Sync {
    async fn notify(&self, destination: &str, status: &StatusMessage) -> Result<(), A1Error>;
}

pub struct StatusRelay {
    broker: Arc<StreamBroker>,
    notifier: Arc<dyn StatusNotifier>,
    watcher_queue_size: usize,
}

impl StatusRelay {
    pub fn new(
        broker: Arc<StreamBroker>,
        notifier: Arc<dyn StatusNotifier>,
        config: &StreamerConfig,
    ) -> Self {
        Self {
            broker,
            notifier,
            watcher_queue_size: config.watcher_queue_size(),
        }
    }

    /// Watches the northbound stream of `target_id`/`service` until `cancel` fires.
    pub fn attach(
        self: &Arc<Self>,
        target_id: &str,
        service: A1Service,
        cancel: &CancellationToken,
    ) -> Result<(), A1Error> {
        let (southbound, northbound) = StreamId::for_target(target_id, service);
        let (registration, inbound) =
            WatcherRegistration::register(&self.broker, &northbound, self.watcher_queue_size)?;

        tokio::spawn(self.clone().relay_loop(
            southbound,
            registration,
            inbound,
            cancel.clone(),
        ));
        Ok(())
    }

    async fn relay_loop(
        self: Arc<Self>,
        southbound: StreamId,
        registration: WatcherRegistration,
        mut inbound: WatcherReceiver,
        cancel: CancellationToken,
    ) {
        let _registration = registration;
        loop {
            let message = tokio::select! {
                _ = cancel.cancelled() => return,
                message = inbound.recv() => message,
            };
            let Some(message) = message else {
                return;
            };

            if let MessageBody::Status(status) = &message.body {
                if message.rpc.session_mode() == SessionMode::LongLived {
                    self.relay(&southbound, &message.target_id, message.rpc, status)
                        .await;
                }
            }
        }
    }

    async fn relay(
        &self,
        southbound: &StreamId,
        target_id: &str,
        rpc: RpcKind,
        status: &StatusMessage,
    ) {
        debug!(
            event = events::RELAY_STATUS_RECEIVED,
            component = COMPONENT,
            target_id,
            rpc = %rpc,
            request_id = status.header.request_id.as_str(),
            "status received"
        );

        let outcome = match status.notification_destination.as_deref() {
            Some(destination) if !destination.is_empty() => {
                match self.notifier.notify(destination, status).await {
                    Ok(()) => Outcome::ok(),
                    Err(err) => {
                        warn!(
                            event = events::RELAY_NOTIFY_FAILED,
                            component = COMPONENT,
                            target_id,
                            rpc = %rpc,
                            destination,
                            err = %err,
                            "status notification failed"
                        );
                        Outcome::failed(err.to_string())
                    }
                }
            }
            _ => Outcome::failed(NO_DESTINATION),
        };

        let ack = StreamMessage::new(
            target_id,
            rpc,
            MessageBody::Ack(AckMessage::for_status(status, outcome)),
        );
        if let Err(err) = self.broker.send(southbound, ack).await {
            warn!(
                event = events::RELAY_ACK_FAILED,
                component = COMPONENT,
                target_id,
                rpc = %rpc,
                err = %err,
                "sending status acknowledgement failed"
            );
        }
    }
}

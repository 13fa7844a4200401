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

//! Keeps one session multiplexer per registered target.

use crate::broker::StreamBroker;
use crate::config::StreamerConfig;
use crate::controller::StatusRelay;
use crate::error::A1Error;
use crate::observability::events;
use crate::observability::fields;
use crate::southbound::{SessionMultiplexer, TargetConnector};
use std::collections::HashMap;
use std::sync::Arc;
use target_registry::{RegistrationEvent, TargetRegistration};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const COMPONENT: &str = "southbound_manager";

pub struct SouthboundManager {
    broker: Arc<StreamBroker>,
    connector: Arc<dyn TargetConnector>,
    config: StreamerConfig,
    relay: Option<Arc<StatusRelay>>,
    multiplexers: Mutex<HashMap<String, Arc<SessionMultiplexer>>>,
    cancel: CancellationToken,
}

impl SouthboundManager {
    pub fn new(
        broker: Arc<StreamBroker>,
        connector: Arc<dyn TargetConnector>,
        config: StreamerConfig,
    ) -> Self {
        Self {
            broker,
            connector,
            config,
            relay: None,
            multiplexers: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Attaches `relay` to every multiplexer started from now on.
    pub fn with_status_relay(mut self, relay: Arc<StatusRelay>) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Applies one registration change.
    pub async fn handle_event(&self, event: RegistrationEvent) -> Result<(), A1Error> {
        match event {
            RegistrationEvent::Added(registration) | RegistrationEvent::Updated(registration) => {
                self.ensure_running(registration).await
            }
            RegistrationEvent::Removed(target_id) => {
                self.remove(&target_id).await;
                Ok(())
            }
        }
    }

    /// Consumes the registration feed until it closes or the manager is shut down.
    pub async fn run(&self, mut feed: UnboundedReceiver<RegistrationEvent>) {
        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => return,
                event = feed.recv() => event,
            };
            let Some(event) = event else {
                info!(
                    event = events::MANAGER_FEED_CLOSED,
                    component = COMPONENT,
                    "registration feed closed"
                );
                return;
            };

            let target_id = event.target_id().to_string();
            if let Err(err) = self.handle_event(event).await {
                warn!(
                    event = events::MANAGER_TARGET_FAILED,
                    component = COMPONENT,
                    target_id = target_id.as_str(),
                    err = %err,
                    "target could not be brought up"
                );
            }
        }
    }

    pub fn spawn(self: &Arc<Self>, feed: UnboundedReceiver<RegistrationEvent>) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move { manager.run(feed).await })
    }

    pub async fn multiplexer(&self, target_id: &str) -> Option<Arc<SessionMultiplexer>> {
        self.multiplexers
            .lock()
            .await
            .get(target_id)
            .filter(|mux| !mux.is_closed())
            .cloned()
    }

    /// Sorted ids of targets with a live multiplexer.
    pub async fn target_ids(&self) -> Vec<String> {
        let multiplexers = self.multiplexers.lock().await;
        let mut ids: Vec<String> = multiplexers
            .iter()
            .filter(|(_, mux)| !mux.is_closed())
            .map(|(target_id, _)| target_id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Stops consuming the feed and closes every multiplexer.
    pub async fn close_all(&self) {
        self.cancel.cancel();
        let drained: Vec<Arc<SessionMultiplexer>> = {
            let mut multiplexers = self.multiplexers.lock().await;
            multiplexers.drain().map(|(_, mux)| mux).collect()
        };
        for mux in drained {
            mux.close().await;
        }
    }

    async fn ensure_running(&self, registration: TargetRegistration) -> Result<(), A1Error> {
        let mut multiplexers = self.multiplexers.lock().await;
        let target_id = registration.target_id.clone();

        if let Some(existing) = multiplexers.get(&target_id) {
            if !existing.is_closed() && existing.services() == registration.services() {
                debug!(
                    event = events::MANAGER_TARGET_RUNNING,
                    component = COMPONENT,
                    target_id = target_id.as_str(),
                    "multiplexer already running"
                );
                return Ok(());
            }
            existing.close().await;
            multiplexers.remove(&target_id);
        }

        let mux = SessionMultiplexer::connect(
            &registration,
            self.connector.as_ref(),
            self.broker.clone(),
            &self.config,
            &self.cancel,
        )
        .await?;

        if let Some(relay) = &self.relay {
            for service in mux.services() {
                if let Err(err) = relay.attach(&target_id, *service, mux.cancellation()) {
                    mux.close().await;
                    return Err(err);
                }
            }
        }
        if let Err(err) = mux.run() {
            mux.close().await;
            return Err(err);
        }

        info!(
            event = events::MANAGER_TARGET_ADDED,
            component = COMPONENT,
            target_id = target_id.as_str(),
            address = registration.address.as_str(),
            "target multiplexer running"
        );
        multiplexers.insert(target_id, mux);
        Ok(())
    }

    async fn remove(&self, target_id: &str) {
        let removed = self.multiplexers.lock().await.remove(target_id);
        if let Some(mux) = removed {
            mux.close().await;
            info!(
                event = events::MANAGER_TARGET_REMOVED,
                component = COMPONENT,
                target_id,
                reason = fields::REASON_DEREGISTERED,
                "target multiplexer removed"
            );
        }
    }
}

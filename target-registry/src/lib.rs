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

//! # target-registry
//!
//! Registration data for the remote application instances ("targets") an A1
//! termination talks to, plus the lookup seam the controllers use to resolve
//! which targets support a given type.
//!
//! [`TargetRegistry`] is an in-memory registry: every mutation is published to
//! subscribers as a [`RegistrationEvent`], which is the feed that drives
//! southbound session lifecycle.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tracing::{debug, info};

const TARGET_REGISTRY_TAG: &str = "TargetRegistry:";

/// A1 service a target may expose.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum A1Service {
    PolicyManagement,
    EnrichmentInformation,
}

impl A1Service {
    pub const ALL: [A1Service; 2] = [A1Service::PolicyManagement, A1Service::EnrichmentInformation];
}

impl Display for A1Service {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            A1Service::PolicyManagement => write!(f, "PolicyManagement"),
            A1Service::EnrichmentInformation => write!(f, "EnrichmentInformation"),
        }
    }
}

/// One declared capability: a service and a type identifier within it.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceCapability {
    pub service: A1Service,
    pub type_id: String,
}

impl ServiceCapability {
    pub fn new(service: A1Service, type_id: &str) -> Self {
        Self {
            service,
            type_id: type_id.to_string(),
        }
    }
}

/// Registration of one target: identity, network address and capabilities.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TargetRegistration {
    pub target_id: String,
    pub address: String,
    #[serde(default)]
    pub capabilities: Vec<ServiceCapability>,
}

impl TargetRegistration {
    pub fn new(target_id: &str, address: &str, capabilities: Vec<ServiceCapability>) -> Self {
        Self {
            target_id: target_id.to_string(),
            address: address.to_string(),
            capabilities,
        }
    }

    /// Returns `true` when the target declares `type_id` under `service`.
    pub fn supports(&self, service: A1Service, type_id: &str) -> bool {
        self.capabilities
            .iter()
            .any(|capability| capability.service == service && capability.type_id == type_id)
    }

    /// Distinct services declared by the target, in stable order.
    pub fn services(&self) -> Vec<A1Service> {
        A1Service::ALL
            .into_iter()
            .filter(|service| {
                self.capabilities
                    .iter()
                    .any(|capability| capability.service == *service)
            })
            .collect()
    }
}

/// Change notification emitted by the registry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RegistrationEvent {
    Added(TargetRegistration),
    Updated(TargetRegistration),
    Removed(String),
}

impl RegistrationEvent {
    pub fn target_id(&self) -> &str {
        match self {
            RegistrationEvent::Added(registration) | RegistrationEvent::Updated(registration) => {
                &registration.target_id
            }
            RegistrationEvent::Removed(target_id) => target_id,
        }
    }
}

/// Lookup seam used by the northbound controllers.
#[async_trait]
pub trait TargetDirectory: Send + Sync {
    /// Targets currently declaring support for `type_id` under `service`, sorted.
    async fn targets_for_type(&self, service: A1Service, type_id: &str) -> Vec<String>;

    /// All type identifiers declared under `service` by any target, sorted and deduplicated.
    async fn type_ids(&self, service: A1Service) -> Vec<String>;

    async fn registration(&self, target_id: &str) -> Option<TargetRegistration>;
}

#[derive(Default)]
struct RegistryState {
    registrations: HashMap<String, TargetRegistration>,
    subscribers: Vec<UnboundedSender<RegistrationEvent>>,
}

impl RegistryState {
    fn publish(&mut self, event: RegistrationEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}

/// In-memory target registry publishing a registration feed.
#[derive(Default)]
pub struct TargetRegistry {
    state: Mutex<RegistryState>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a registration. Returns `true` when the target was new.
    pub async fn put(&self, registration: TargetRegistration) -> bool {
        let mut state = self.state.lock().await;
        let previous = state
            .registrations
            .insert(registration.target_id.clone(), registration.clone());

        match previous {
            None => {
                info!(
                    "{TARGET_REGISTRY_TAG} added target {} at {}",
                    registration.target_id, registration.address
                );
                state.publish(RegistrationEvent::Added(registration));
                true
            }
            Some(previous) if previous == registration => {
                debug!(
                    "{TARGET_REGISTRY_TAG} registration for {} unchanged",
                    registration.target_id
                );
                false
            }
            Some(_) => {
                info!(
                    "{TARGET_REGISTRY_TAG} updated target {}",
                    registration.target_id
                );
                state.publish(RegistrationEvent::Updated(registration));
                false
            }
        }
    }

    /// Removes a registration. Returns `true` only when the target existed.
    pub async fn remove(&self, target_id: &str) -> bool {
        let mut state = self.state.lock().await;
        if state.registrations.remove(target_id).is_none() {
            return false;
        }
        info!("{TARGET_REGISTRY_TAG} removed target {target_id}");
        state.publish(RegistrationEvent::Removed(target_id.to_string()));
        true
    }

    /// Subscribes to the registration feed.
    ///
    /// Existing registrations are replayed as [`RegistrationEvent::Added`] before any
    /// later change, so a late subscriber converges on the same view.
    pub async fn subscribe(&self) -> UnboundedReceiver<RegistrationEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock().await;

        let mut current: Vec<&TargetRegistration> = state.registrations.values().collect();
        current.sort_by(|a, b| a.target_id.cmp(&b.target_id));
        for registration in current {
            // receiver is held locally, send cannot fail here
            let _ = tx.send(RegistrationEvent::Added(registration.clone()));
        }

        state.subscribers.push(tx);
        rx
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.registrations.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TargetDirectory for TargetRegistry {
    async fn targets_for_type(&self, service: A1Service, type_id: &str) -> Vec<String> {
        let state = self.state.lock().await;
        let mut targets: Vec<String> = state
            .registrations
            .values()
            .filter(|registration| registration.supports(service, type_id))
            .map(|registration| registration.target_id.clone())
            .collect();
        targets.sort();
        targets
    }

    async fn type_ids(&self, service: A1Service) -> Vec<String> {
        let state = self.state.lock().await;
        let mut type_ids: Vec<String> = state
            .registrations
            .values()
            .flat_map(|registration| registration.capabilities.iter())
            .filter(|capability| capability.service == service)
            .map(|capability| capability.type_id.clone())
            .collect();
        type_ids.sort();
        type_ids.dedup();
        type_ids
    }

    async fn registration(&self, target_id: &str) -> Option<TargetRegistration> {
        self.state.lock().await.registrations.get(target_id).cloned()
    }
}

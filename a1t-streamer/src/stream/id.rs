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

use std::fmt::{Display, Formatter};
use target_registry::A1Service;

const POLICY_CONTROLLER_ENDPOINT: &str = "a1p-controller";
const EI_CONTROLLER_ENDPOINT: &str = "a1ei-controller";

/// Opaque name of a participant on the bus: a controller, or a target+service pair.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EndpointId(String);

impl EndpointId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn for_target(target_id: &str, service: A1Service) -> Self {
        Self(format!("{target_id}-{service}"))
    }

    pub fn controller(service: A1Service) -> Self {
        match service {
            A1Service::PolicyManagement => Self::new(POLICY_CONTROLLER_ENDPOINT),
            A1Service::EnrichmentInformation => Self::new(EI_CONTROLLER_ENDPOINT),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EndpointId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered (source, destination) pair. Swapping the two names a different stream.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StreamId {
    pub source: EndpointId,
    pub destination: EndpointId,
}

impl StreamId {
    pub fn new(source: EndpointId, destination: EndpointId) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Returns `(southbound, northbound)`: `controller -> target` and `target -> controller`.
    pub fn pair(controller: &EndpointId, target: &EndpointId) -> (StreamId, StreamId) {
        let southbound = StreamId::new(controller.clone(), target.clone());
        let northbound = southbound.reversed();
        (southbound, northbound)
    }

    /// Both streams connecting `target_id` with the controller of `service`.
    pub fn for_target(target_id: &str, service: A1Service) -> (StreamId, StreamId) {
        Self::pair(
            &EndpointId::controller(service),
            &EndpointId::for_target(target_id, service),
        )
    }

    pub fn reversed(&self) -> StreamId {
        StreamId::new(self.destination.clone(), self.source.clone())
    }
}

impl Display for StreamId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}", self.source, self.destination)
    }
}

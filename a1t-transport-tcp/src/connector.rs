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

use crate::connection::TcpTransport;
use a1t_streamer::observability::events;
use a1t_streamer::southbound::{TargetConnector, TargetTransport};
use a1t_streamer::{A1Error, TargetRegistration};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const COMPONENT: &str = "tcp_connector";

pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct TcpTransportConfig {
    pub connect_timeout_ms: u64,
}

impl Default for TcpTransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

impl TcpTransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Connects to a target at the address it registered with.
#[derive(Clone, Debug, Default)]
pub struct TcpConnector {
    config: TcpTransportConfig,
}

impl TcpConnector {
    pub fn new(config: TcpTransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TargetConnector for TcpConnector {
    async fn connect(
        &self,
        registration: &TargetRegistration,
    ) -> Result<Arc<dyn TargetTransport>, A1Error> {
        let target_id = registration.target_id.as_str();
        let address = registration.address.as_str();

        match TcpTransport::connect(target_id, address, self.config.connect_timeout()).await {
            Ok(transport) => {
                info!(
                    event = events::TRANSPORT_CONNECTED,
                    component = COMPONENT,
                    target_id,
                    address,
                    "connected to target"
                );
                Ok(Arc::new(transport))
            }
            Err(err) => {
                warn!(
                    event = events::TRANSPORT_CONNECT_FAILED,
                    component = COMPONENT,
                    target_id,
                    address,
                    err = %err,
                    "connecting to target failed"
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TcpTransportConfig;
    use std::time::Duration;

    #[test]
    fn connect_timeout_defaults_to_five_seconds() {
        let config: TcpTransportConfig = serde_json::from_str("{}").unwrap();

        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
    }
}

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


//! [`StatusNotifier`] that POSTs status payloads to their notification
//! destination over HTTP.
//!
//! A destination that cannot be reached, or that answers with anything other
//! than a 2xx status, makes the notification fail, so the target receives a
//! negative acknowledgement carrying the reason.

use a1t_streamer::controller::StatusNotifier;
use a1t_streamer::message::StatusMessage;
use a1t_streamer::observability::events;
use a1t_streamer::A1Error;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const COMPONENT: &str = "http_status_notifier";

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct HttpNotifierConfig {
    pub request_timeout_ms: u64,
}

impl Default for HttpNotifierConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl HttpNotifierConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

pub struct HttpStatusNotifier {
    client: Client,
}

impl HttpStatusNotifier {
    pub fn new(config: &HttpNotifierConfig) -> Result<Self, A1Error> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| A1Error::transport(format!("building HTTP client failed: {err}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl StatusNotifier for HttpStatusNotifier {
    async fn notify(&self, destination: &str, status: &StatusMessage) -> Result<(), A1Error> {
        let response = self
            .client
            .post(destination)
            .header(CONTENT_TYPE, "application/json")
            .body(status.payload.clone())
            .send()
            .await
            .map_err(|err| {
                A1Error::transport(format!("posting status to {destination} failed: {err}"))
            })?;

        let code = response.status();
        if !code.is_success() {
            return Err(A1Error::transport(format!(
                "{destination} rejected status with {code}"
            )));
        }

        debug!(
            event = events::NOTIFIER_DELIVERED,
            component = COMPONENT,
            destination,
            request_id = status.header.request_id.as_str(),
            status_code = code.as_u16(),
            "status delivered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{HttpNotifierConfig, HttpStatusNotifier};
    use std::time::Duration;

    #[test]
    fn config_defaults_to_five_seconds() {
        let config: HttpNotifierConfig = serde_json::from_str("{}").unwrap();

        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert!(HttpStatusNotifier::new(&config).is_ok());
    }
}

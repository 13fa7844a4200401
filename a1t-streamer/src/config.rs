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

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CORRELATION_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_STREAM_SEND_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_REMOTE_CALL_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_WATCHER_QUEUE_SIZE: usize = 64;

/// Timing and queueing knobs for the broker, correlator and multiplexers.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct StreamerConfig {
    pub correlation_timeout_ms: u64,
    pub stream_send_timeout_ms: u64,
    pub remote_call_timeout_ms: u64,
    pub watcher_queue_size: usize,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            correlation_timeout_ms: DEFAULT_CORRELATION_TIMEOUT_MS,
            stream_send_timeout_ms: DEFAULT_STREAM_SEND_TIMEOUT_MS,
            remote_call_timeout_ms: DEFAULT_REMOTE_CALL_TIMEOUT_MS,
            watcher_queue_size: DEFAULT_WATCHER_QUEUE_SIZE,
        }
    }
}

impl StreamerConfig {
    pub fn correlation_timeout(&self) -> Duration {
        Duration::from_millis(self.correlation_timeout_ms)
    }

    pub fn stream_send_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_send_timeout_ms)
    }

    pub fn remote_call_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_call_timeout_ms)
    }

    /// Watcher queues need room for at least one message.
    pub fn watcher_queue_size(&self) -> usize {
        self.watcher_queue_size.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::StreamerConfig;
    use std::time::Duration;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: StreamerConfig =
            serde_json::from_str(r#"{ "correlation_timeout_ms": 250 }"#).expect("config parses");

        assert_eq!(config.correlation_timeout(), Duration::from_millis(250));
        assert_eq!(config.stream_send_timeout(), Duration::from_secs(5));
        assert_eq!(config.remote_call_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<StreamerConfig>(r#"{ "retries": 3 }"#).is_err());
    }

    #[test]
    fn zero_watcher_queue_is_clamped() {
        let config = StreamerConfig {
            watcher_queue_size: 0,
            ..Default::default()
        };

        assert_eq!(config.watcher_queue_size(), 1);
    }
}

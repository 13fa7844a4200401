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

//! Request-reply correlation over the broker.
//!
//! One call to [`Correlator::request`] walks `Pending -> Matched(success) |
//! Matched(failure) | TimedOut` and never retries. The reply watcher is held by a
//! [`WatcherRegistration`] so it is deleted exactly once whichever branch wins.

use crate::broker::{StreamBroker, WatcherReceiver, WatcherRegistration};
use crate::config::StreamerConfig;
use crate::error::A1Error;
use crate::message::{MessageBody, RequestMessage, ResultMessage, RpcKind, StreamMessage};
use crate::observability::events;
use crate::stream::StreamId;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

const COMPONENT: &str = "correlator";

pub struct Correlator {
    broker: Arc<StreamBroker>,
    timeout: Duration,
    watcher_queue_size: usize,
}

impl Correlator {
    pub fn new(broker: Arc<StreamBroker>, config: &StreamerConfig) -> Self {
        Self {
            broker,
            timeout: config.correlation_timeout(),
            watcher_queue_size: config.watcher_queue_size(),
        }
    }

    pub fn broker(&self) -> &Arc<StreamBroker> {
        &self.broker
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends `request` to `target_id` and waits for the result carrying the same
    /// correlation id.
    ///
    /// The request id in `request.header` is overwritten with a fresh one. A
    /// result flagged as failed comes back as [`A1Error::Failure`]; no matching
    /// result before the deadline is [`A1Error::Timeout`].
    pub async fn request(
        &self,
        target_id: &str,
        rpc: RpcKind,
        mut request: RequestMessage,
    ) -> Result<ResultMessage, A1Error> {
        let request_id = Uuid::new_v4().to_string();
        request.header.request_id = request_id.clone();

        let (southbound, northbound) = StreamId::for_target(target_id, rpc.service());
        let deadline = Instant::now() + self.timeout;
        let (registration, mut replies) =
            WatcherRegistration::register(&self.broker, &northbound, self.watcher_queue_size)?;

        debug!(
            event = events::CORRELATION_START,
            component = COMPONENT,
            target_id,
            request_id = request_id.as_str(),
            rpc = %rpc,
            watcher_id = %registration.watcher_id(),
            "correlated request started"
        );

        let message = StreamMessage::new(target_id, rpc, MessageBody::Request(request));
        let outcome = tokio::select! {
            reply = async {
                match self.broker.send(&southbound, message).await {
                    // streams torn down mid-send; only the deadline can end this now
                    Err(A1Error::Canceled(_)) => std::future::pending().await,
                    sent => sent?,
                }
                Self::await_reply(&mut replies, &request_id).await
            } => reply,
            _ = sleep_until(deadline) => {
                warn!(
                    event = events::CORRELATION_TIMEOUT,
                    component = COMPONENT,
                    target_id,
                    request_id = request_id.as_str(),
                    rpc = %rpc,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "no reply before deadline"
                );
                Err(A1Error::timeout(format!(
                    "no reply from {target_id} for {rpc} within {:?}",
                    self.timeout
                )))
            }
        };
        drop(registration);

        let result = outcome?;
        if result.outcome.success {
            debug!(
                event = events::CORRELATION_MATCHED,
                component = COMPONENT,
                target_id,
                request_id = request_id.as_str(),
                rpc = %rpc,
                "reply matched"
            );
            Ok(result)
        } else {
            debug!(
                event = events::CORRELATION_FAILED,
                component = COMPONENT,
                target_id,
                request_id = request_id.as_str(),
                rpc = %rpc,
                reason = result.outcome.reason.as_str(),
                "target reported failure"
            );
            Err(A1Error::failure(result.outcome.reason))
        }
    }

    async fn await_reply(
        replies: &mut WatcherReceiver,
        request_id: &str,
    ) -> Result<ResultMessage, A1Error> {
        loop {
            let Some(message) = replies.recv().await else {
                // queue dropped with the stream; only the deadline can end this now
                return std::future::pending().await;
            };

            match &message.body {
                MessageBody::Result(result) if result.header.request_id == request_id => {
                    return Ok(result.clone());
                }
                other => {
                    debug!(
                        event = events::CORRELATION_IGNORED,
                        component = COMPONENT,
                        request_id,
                        other_request_id = other.request_id(),
                        msg_kind = %other.kind(),
                        "ignoring uncorrelated message"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Correlator;
    use crate::broker::{StreamBroker, WatcherRegistration};
    use crate::config::StreamerConfig;
    use crate::message::{
        Header, MessageBody, PayloadType, RequestMessage, ResultMessage, RpcKind, StreamMessage,
    };
    use crate::stream::StreamId;
    use std::sync::Arc;
    use std::time::Duration;
    use target_registry::A1Service;
    use tokio_util::sync::CancellationToken;

    const TARGET: &str = "ric-1";

    fn setup(timeout_ms: u64) -> (Arc<StreamBroker>, Correlator, StreamId, StreamId) {
        let config = StreamerConfig {
            correlation_timeout_ms: timeout_ms,
            ..Default::default()
        };
        let broker = Arc::new(StreamBroker::from_config(&config));
        let cancel = CancellationToken::new();
        let (southbound, northbound) = StreamId::for_target(TARGET, A1Service::PolicyManagement);
        broker.add_stream(&cancel, southbound.clone());
        broker.add_stream(&cancel, northbound.clone());
        let correlator = Correlator::new(broker.clone(), &config);
        (broker, correlator, southbound, northbound)
    }

    fn request() -> RequestMessage {
        RequestMessage {
            header: Header::new("", "xapp", PayloadType::Policy),
            type_id: "T".to_string(),
            ..Default::default()
        }
    }

    /// Answers every request seen on `southbound` with `respond`.
    fn spawn_responder(
        broker: Arc<StreamBroker>,
        southbound: StreamId,
        northbound: StreamId,
        respond: impl Fn(&RequestMessage) -> Vec<ResultMessage> + Send + 'static,
    ) {
        let (registration, mut requests) =
            WatcherRegistration::register(&broker, &southbound, 8).unwrap();
        tokio::spawn(async move {
            let _registration = registration;
            while let Some(message) = requests.recv().await {
                let MessageBody::Request(request) = &message.body else {
                    continue;
                };
                for reply in respond(request) {
                    let reply = StreamMessage::new(TARGET, message.rpc, MessageBody::Result(reply));
                    broker.send(&northbound, reply).await.unwrap();
                }
            }
        });
    }

    #[tokio::test]
    async fn matching_success_reply_is_returned() {
        let (broker, correlator, southbound, northbound) = setup(1_000);
        spawn_responder(broker.clone(), southbound, northbound.clone(), |request| {
            vec![ResultMessage::success_for(request, br#"{"a":1}"#.to_vec())]
        });

        let result = correlator
            .request(TARGET, RpcKind::PolicyQuery, request())
            .await
            .unwrap();

        assert_eq!(result.payload, br#"{"a":1}"#.to_vec());
        assert_eq!(broker.watcher_count(&northbound), 0);
    }

    #[tokio::test]
    async fn failure_reply_surfaces_reason() {
        let (broker, correlator, southbound, northbound) = setup(1_000);
        spawn_responder(broker, southbound, northbound, |request| {
            vec![ResultMessage::failure_for(request, "unknown policy type")]
        });

        let err = correlator
            .request(TARGET, RpcKind::PolicySetup, request())
            .await
            .unwrap_err();

        assert_eq!(err, crate::A1Error::failure("unknown policy type"));
    }

    #[tokio::test]
    async fn uncorrelated_reply_is_ignored() {
        let (broker, correlator, southbound, northbound) = setup(1_000);
        spawn_responder(broker, southbound, northbound, |request| {
            let mut stray = ResultMessage::failure_for(request, "not mine");
            stray.header.request_id = "someone-else".to_string();
            vec![stray, ResultMessage::success_for(request, b"[]".to_vec())]
        });

        let result = correlator
            .request(TARGET, RpcKind::PolicyQuery, request())
            .await
            .unwrap();

        assert!(result.outcome.success);
        assert_eq!(result.payload, b"[]".to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn silence_times_out_and_cleans_up() {
        let (broker, correlator, southbound, northbound) = setup(5_000);
        spawn_responder(broker.clone(), southbound, northbound.clone(), |_| Vec::new());

        let err = correlator
            .request(TARGET, RpcKind::PolicyQuery, request())
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(broker.watcher_count(&northbound), 0);
    }

    #[tokio::test]
    async fn unknown_target_is_not_found() {
        let (_broker, correlator, _, _) = setup(1_000);

        let err = correlator
            .request("ric-unknown", RpcKind::PolicyQuery, request())
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn dropped_request_releases_watcher() {
        let (broker, correlator, _, northbound) = setup(60_000);

        let pending = correlator.request(TARGET, RpcKind::PolicyQuery, request());
        let _ = tokio::time::timeout(Duration::from_millis(20), pending).await;

        assert_eq!(broker.watcher_count(&northbound), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn target_torn_down_mid_send_times_out() {
        let config = StreamerConfig {
            correlation_timeout_ms: 5_000,
            stream_send_timeout_ms: 60_000,
            ..Default::default()
        };
        let broker = Arc::new(StreamBroker::from_config(&config));
        let stopped = CancellationToken::new();
        stopped.cancel();
        let (southbound, northbound) = StreamId::for_target(TARGET, A1Service::PolicyManagement);
        // nothing drains the southbound stream, so the request send stays blocked
        broker.add_stream(&stopped, southbound.clone());
        broker.add_stream(&CancellationToken::new(), northbound.clone());
        let correlator = Correlator::new(broker.clone(), &config);

        let pending = tokio::spawn(async move {
            correlator
                .request(TARGET, RpcKind::PolicyQuery, request())
                .await
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(broker.close(&southbound));
        assert!(broker.close(&northbound));

        let err = pending.await.unwrap().unwrap_err();
        assert!(err.is_timeout(), "{err}");
    }
}

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

#![allow(dead_code)]

use a1t_streamer::broker::StreamBroker;
use a1t_streamer::controller::{EiController, PolicyController, StatusRelay};
use a1t_streamer::correlation::{Correlator, FanOut};
use a1t_streamer::southbound::SouthboundManager;
use a1t_streamer::{RegistrationEvent, StreamerConfig, TargetRegistration, TargetRegistry};
use integration_test_utils::{init_tracing, MockConnector, MockTarget, RecordingNotifier};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct Harness {
    pub(crate) config: StreamerConfig,
    pub(crate) broker: Arc<StreamBroker>,
    pub(crate) registry: Arc<TargetRegistry>,
    pub(crate) connector: Arc<MockConnector>,
    pub(crate) notifier: Arc<RecordingNotifier>,
    pub(crate) manager: Arc<SouthboundManager>,
    pub(crate) correlator: Arc<Correlator>,
    pub(crate) fan_out: Arc<FanOut>,
    pub(crate) policies: PolicyController,
    pub(crate) jobs: EiController,
}

pub(crate) fn config(correlation_timeout_ms: u64, remote_call_timeout_ms: u64) -> StreamerConfig {
    StreamerConfig {
        correlation_timeout_ms,
        remote_call_timeout_ms,
        ..Default::default()
    }
}

pub(crate) fn make_harness(config: StreamerConfig) -> Harness {
    init_tracing();

    let broker = Arc::new(StreamBroker::from_config(&config));
    let registry = Arc::new(TargetRegistry::new());
    let connector = MockConnector::new();
    let notifier = Arc::new(RecordingNotifier::new());
    let relay = Arc::new(StatusRelay::new(broker.clone(), notifier.clone(), &config));
    let manager = Arc::new(
        SouthboundManager::new(broker.clone(), connector.clone(), config.clone())
            .with_status_relay(relay),
    );
    let correlator = Arc::new(Correlator::new(broker.clone(), &config));
    let fan_out = Arc::new(FanOut::new(correlator.clone()));
    let policies = PolicyController::new(registry.clone(), fan_out.clone());
    let jobs = EiController::new(registry.clone(), fan_out.clone());

    Harness {
        config,
        broker,
        registry,
        connector,
        notifier,
        manager,
        correlator,
        fan_out,
        policies,
        jobs,
    }
}

impl Harness {
    /// Registers `registration` backed by a fresh mock target and brings its
    /// multiplexer up.
    pub(crate) async fn add_target(&self, registration: TargetRegistration) -> Arc<MockTarget> {
        let target = MockTarget::new(&registration.target_id);
        self.connector.add(target.clone());
        self.registry.put(registration.clone()).await;
        self.manager
            .handle_event(RegistrationEvent::Added(registration))
            .await
            .expect("multiplexer should start");
        target
    }
}

/// Polls `condition` until it holds, failing the test after a generous bound.
pub(crate) async fn eventually<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..500 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

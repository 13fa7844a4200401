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

mod support;

use a1t_streamer::message::{Header, PayloadType, RequestMessage, RpcKind};
use a1t_streamer::stream::StreamId;
use a1t_streamer::{A1Error, A1Service, StreamerConfig};
use integration_test_utils::{policy_target, TargetBehavior, POLICY_TYPE};
use serde_json::{json, Value};
use std::time::Duration;
use support::{config, make_harness};
use tokio::time::Instant;

fn policy_query(target_id: &str, payload: &[u8]) -> RequestMessage {
    RequestMessage {
        header: Header::new("", target_id, PayloadType::Policy),
        type_id: POLICY_TYPE.to_string(),
        object_id: Some("policy-1".to_string()),
        payload: payload.to_vec(),
        notification_destination: None,
    }
}

fn decode(payload: &[u8]) -> Value {
    serde_json::from_slice(payload).expect("payload is json")
}

#[tokio::test(flavor = "multi_thread")]
async fn single_target_reply_is_returned() {
    let harness = make_harness(StreamerConfig::default());
    let target = harness.add_target(policy_target("ric-1", &[POLICY_TYPE])).await;
    target.respond(RpcKind::PolicyQuery, TargetBehavior::Reply(json!({"a": 1})));

    let result = harness
        .correlator
        .request("ric-1", RpcKind::PolicyQuery, policy_query("ric-1", b""))
        .await
        .expect("target replies");

    assert!(result.outcome.success);
    assert_eq!(decode(&result.payload), json!({"a": 1}));
    assert_eq!(target.call_count(), 1);

    // only the status relay keeps watching once the correlation is done
    let (_, northbound) = StreamId::for_target("ric-1", A1Service::PolicyManagement);
    assert_eq!(harness.broker.watcher_count(&northbound), 1);

    let value = harness
        .policies
        .get_policy(POLICY_TYPE, "policy-1")
        .await
        .expect("single target is consistent with itself");
    assert_eq!(value, json!({"a": 1}));
}

#[tokio::test(start_paused = true)]
async fn silent_target_times_out_and_releases_watcher() {
    // the remote call bound is far away so only the correlation deadline can fire
    let harness = make_harness(config(5_000, 60_000));
    let target = harness.add_target(policy_target("ric-1", &[POLICY_TYPE])).await;
    target.respond(RpcKind::PolicyQuery, TargetBehavior::Silent);

    let started = Instant::now();
    let err = harness
        .correlator
        .request("ric-1", RpcKind::PolicyQuery, policy_query("ric-1", b""))
        .await
        .unwrap_err();

    assert!(err.is_timeout(), "unexpected error: {err}");
    assert!(started.elapsed() >= Duration::from_millis(5_000));

    let (_, northbound) = StreamId::for_target("ric-1", A1Service::PolicyManagement);
    assert_eq!(harness.broker.watcher_count(&northbound), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn target_failure_carries_reason() {
    let harness = make_harness(StreamerConfig::default());
    let target = harness.add_target(policy_target("ric-1", &[POLICY_TYPE])).await;
    target.respond(
        RpcKind::PolicySetup,
        TargetBehavior::Fail("policy type not loaded".to_string()),
    );

    let err = harness
        .correlator
        .request("ric-1", RpcKind::PolicySetup, policy_query("ric-1", b"{}"))
        .await
        .unwrap_err();

    assert_eq!(err, A1Error::failure("policy type not loaded"));
}

#[tokio::test(flavor = "multi_thread")]
async fn remote_call_error_becomes_failure_not_timeout() {
    let harness = make_harness(StreamerConfig::default());
    let target = harness.add_target(policy_target("ric-1", &[POLICY_TYPE])).await;
    target.respond(
        RpcKind::PolicyQuery,
        TargetBehavior::CallError("connection reset".to_string()),
    );

    let err = harness
        .correlator
        .request("ric-1", RpcKind::PolicyQuery, policy_query("ric-1", b""))
        .await
        .unwrap_err();

    match err {
        A1Error::Failure { reason } => assert!(reason.contains("connection reset"), "{reason}"),
        other => panic!("expected failure, got {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn remote_call_bound_fails_before_correlation_deadline() {
    let harness = make_harness(config(60_000, 1_000));
    let target = harness.add_target(policy_target("ric-1", &[POLICY_TYPE])).await;
    target.respond(RpcKind::PolicyQuery, TargetBehavior::Silent);

    let started = Instant::now();
    let err = harness
        .correlator
        .request("ric-1", RpcKind::PolicyQuery, policy_query("ric-1", b""))
        .await
        .unwrap_err();

    match err {
        A1Error::Failure { reason } => assert!(reason.contains("timed out"), "{reason}"),
        other => panic!("expected failure, got {other}"),
    }
    assert!(started.elapsed() < Duration::from_millis(60_000));
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_requests_each_get_their_own_reply() {
    let harness = make_harness(StreamerConfig::default());
    let target = harness.add_target(policy_target("ric-1", &[POLICY_TYPE])).await;
    target.respond(RpcKind::PolicyQuery, TargetBehavior::Echo);

    let requests = (0..8).map(|index| {
        let correlator = harness.correlator.clone();
        async move {
            let payload = json!({ "index": index }).to_string();
            let result = correlator
                .request(
                    "ric-1",
                    RpcKind::PolicyQuery,
                    policy_query("ric-1", payload.as_bytes()),
                )
                .await
                .expect("echo reply");
            (index, decode(&result.payload))
        }
    });

    for (index, value) in futures::future::join_all(requests).await {
        assert_eq!(value, json!({ "index": index }));
    }

    let request_ids: std::collections::HashSet<String> = target
        .calls()
        .into_iter()
        .map(|(_, request)| request.header.request_id)
        .collect();
    assert_eq!(request_ids.len(), 8);
}

#[tokio::test]
async fn unknown_target_is_not_found() {
    let harness = make_harness(StreamerConfig::default());

    let err = harness
        .correlator
        .request("ric-9", RpcKind::PolicyQuery, policy_query("ric-9", b""))
        .await
        .unwrap_err();

    assert!(err.is_not_found(), "unexpected error: {err}");
}

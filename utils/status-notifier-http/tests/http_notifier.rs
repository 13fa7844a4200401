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


use a1t_streamer::broker::{watcher_queue, StreamBroker, WatcherId};
use a1t_streamer::controller::{StatusNotifier, StatusRelay};
use a1t_streamer::message::{AckMessage, MessageBody, RpcKind, StreamMessage};
use a1t_streamer::stream::StreamId;
use a1t_streamer::{A1Error, A1Service, StreamerConfig};
use integration_test_utils::{init_tracing, policy_status};
use status_notifier_http::{HttpNotifierConfig, HttpStatusNotifier};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);
const PAYLOAD: &str = r#"{"enforceStatus":"ENFORCED"}"#;

/// What the endpoint saw of the one request it served.
#[derive(Debug)]
struct ReceivedPost {
    request_line: String,
    headers: Vec<String>,
    body: Vec<u8>,
}

/// Serves a single HTTP request on a local port, answering with `status_line`.
async fn endpoint(status_line: &'static str) -> (String, JoinHandle<ReceivedPost>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/a1-policy/status", listener.local_addr().unwrap());

    let served = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut reader = BufReader::new(stream);

        let mut request_line = String::new();
        reader.read_line(&mut request_line).await.unwrap();
        let mut headers = Vec::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            let line = line.trim_end().to_string();
            if line.is_empty() {
                break;
            }
            headers.push(line.to_ascii_lowercase());
        }
        let length = headers
            .iter()
            .find_map(|header| header.strip_prefix("content-length:"))
            .map_or(0, |value| value.trim().parse().unwrap());
        let mut body = vec![0; length];
        reader.read_exact(&mut body).await.unwrap();

        let mut stream = reader.into_inner();
        let response = format!("HTTP/1.1 {status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();

        ReceivedPost {
            request_line: request_line.trim_end().to_string(),
            headers,
            body,
        }
    });
    (url, served)
}

fn notifier() -> HttpStatusNotifier {
    init_tracing();
    HttpStatusNotifier::new(&HttpNotifierConfig::default()).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn status_payload_is_posted_as_json() {
    let (url, served) = endpoint("204 No Content").await;
    let status = policy_status("policy-1", Some(url.as_str()), PAYLOAD);

    notifier().notify(&url, &status).await.expect("delivered");

    let received = timeout(WAIT, served).await.unwrap().unwrap();
    assert_eq!(received.request_line, "POST /a1-policy/status HTTP/1.1");
    assert!(received
        .headers
        .contains(&"content-type: application/json".to_string()));
    assert_eq!(received.body, PAYLOAD.as_bytes());
}

#[tokio::test(flavor = "multi_thread")]
async fn error_status_fails_the_notification() {
    let (url, served) = endpoint("500 Internal Server Error").await;
    let status = policy_status("policy-1", Some(url.as_str()), PAYLOAD);

    let err = notifier().notify(&url, &status).await.unwrap_err();

    assert!(matches!(err, A1Error::Transport(_)), "{err}");
    assert!(err.to_string().contains("500"));
    timeout(WAIT, served).await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_destination_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/status", listener.local_addr().unwrap());
    drop(listener);
    let status = policy_status("policy-1", Some(url.as_str()), PAYLOAD);

    let err = notifier().notify(&url, &status).await.unwrap_err();

    assert!(matches!(err, A1Error::Transport(_)), "{err}");
}

async fn relayed_ack(destination: &str) -> AckMessage {
    let broker = Arc::new(StreamBroker::new(WAIT));
    let cancel = CancellationToken::new();
    let (southbound, northbound) = StreamId::for_target("ric-1", A1Service::PolicyManagement);
    broker.add_stream(&cancel, southbound.clone());
    broker.add_stream(&cancel, northbound.clone());

    let relay = Arc::new(StatusRelay::new(
        broker.clone(),
        Arc::new(notifier()),
        &StreamerConfig::default(),
    ));
    relay
        .attach("ric-1", A1Service::PolicyManagement, &cancel)
        .unwrap();
    let (queue, mut acks) = watcher_queue(8);
    broker.watch(&southbound, WatcherId::new(), queue).unwrap();

    let status = policy_status("policy-1", Some(destination), PAYLOAD);
    broker
        .send(
            &northbound,
            StreamMessage::new("ric-1", RpcKind::PolicyStatus, MessageBody::Status(status)),
        )
        .await
        .unwrap();

    let message = timeout(WAIT, acks.recv()).await.unwrap().unwrap();
    cancel.cancel();
    match &message.body {
        MessageBody::Ack(ack) => ack.clone(),
        other => panic!("expected acknowledgement, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn relay_acknowledges_delivered_status() {
    let (url, served) = endpoint("200 OK").await;

    let ack = relayed_ack(&url).await;

    assert!(ack.outcome.success, "{}", ack.outcome.reason);
    assert_eq!(ack.object_id.as_deref(), Some("policy-1"));
    assert_eq!(timeout(WAIT, served).await.unwrap().unwrap().body, PAYLOAD.as_bytes());
}

#[tokio::test(flavor = "multi_thread")]
async fn relay_acknowledges_rejected_status_as_failure() {
    let (url, served) = endpoint("503 Service Unavailable").await;

    let ack = relayed_ack(&url).await;

    assert!(!ack.outcome.success);
    assert!(ack.outcome.reason.contains("503"), "{}", ack.outcome.reason);
    timeout(WAIT, served).await.unwrap().unwrap();
}

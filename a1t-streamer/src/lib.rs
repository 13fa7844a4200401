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

//! # a1t-streamer
//!
//! `a1t-streamer` terminates A1 policy and enrichment-information traffic. Northbound
//! calls are correlated with asynchronous replies from remote targets over an
//! internal bus of directional streams.
//!
//! ## Streams and watchers
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use a1t_streamer::broker::{watcher_queue, StreamBroker, WatcherId};
//! use a1t_streamer::message::{Header, MessageBody, PayloadType, ResultMessage, RpcKind, StreamMessage};
//! use a1t_streamer::stream::StreamId;
//! use a1t_streamer::A1Service;
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let broker = Arc::new(StreamBroker::new(Duration::from_secs(5)));
//! let cancel = CancellationToken::new();
//! let (_, northbound) = StreamId::for_target("ric-1", A1Service::PolicyManagement);
//!
//! broker.add_stream(&cancel, northbound.clone());
//! let (queue, mut replies) = watcher_queue(8);
//! let watcher_id = WatcherId::new();
//! broker.watch(&northbound, watcher_id, queue).unwrap();
//!
//! let reply = ResultMessage {
//!     header: Header::new("req-1", "ric-1", PayloadType::Policy),
//!     ..Default::default()
//! };
//! broker
//!     .send(&northbound, StreamMessage::new("ric-1", RpcKind::PolicyQuery, MessageBody::Result(reply)))
//!     .await
//!     .unwrap();
//!
//! assert_eq!(replies.recv().await.unwrap().request_id(), "req-1");
//! broker.delete_watcher(&northbound, watcher_id);
//! broker.delete_watcher(&northbound, watcher_id);
//! assert!(broker.close(&northbound));
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - Stream: single-slot directional channel with a bounded send
//! - Broker: stream registry, watcher sets and per-stream best-effort fan-out
//! - Correlation: request-reply matching by correlation id, multi-target fan-out
//!   and consistency validation
//! - Southbound: one session multiplexer per registered target, driven by the
//!   registration feed through the southbound manager
//! - Controller: policy and enrichment-information operations plus the status relay
//!
//! ## Observability model
//!
//! Library code emits `tracing` events with canonical names from
//! [`observability::events`] and never installs a subscriber. Binaries and tests
//! initialise `tracing_subscriber` themselves.

pub mod broker;
pub mod config;
pub mod controller;
pub mod correlation;
mod error;
pub mod message;
#[doc(hidden)]
pub mod observability;
pub mod southbound;
pub mod stream;

pub use config::StreamerConfig;
pub use error::A1Error;
pub use target_registry::{
    A1Service, RegistrationEvent, ServiceCapability, TargetDirectory, TargetRegistration,
    TargetRegistry,
};

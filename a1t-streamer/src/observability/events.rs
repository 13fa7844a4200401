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

//! Canonical structured event names used across `a1t-streamer`.

// Directional stream events.
pub const STREAM_SEND_TIMEOUT: &str = "stream_send_timeout";
pub const STREAM_CLOSED: &str = "stream_closed";
pub const STREAM_ABANDONED: &str = "stream_abandoned";

// Broker registry and fan-out events.
pub const BROKER_STREAM_ADD: &str = "broker_stream_add";
pub const BROKER_STREAM_DUPLICATE: &str = "broker_stream_duplicate";
pub const BROKER_STREAM_CLOSE: &str = "broker_stream_close";
pub const BROKER_STREAM_NOT_FOUND: &str = "broker_stream_not_found";
pub const BROKER_WATCHER_ADD: &str = "broker_watcher_add";
pub const BROKER_WATCHER_DELETE: &str = "broker_watcher_delete";
pub const BROKER_FANOUT_DELIVER: &str = "broker_fanout_deliver";
pub const BROKER_FANOUT_SKIPPED: &str = "broker_fanout_skipped";
pub const BROKER_FANOUT_STOP: &str = "broker_fanout_stop";

// Request-reply correlation events.
pub const CORRELATION_START: &str = "correlation_start";
pub const CORRELATION_MATCHED: &str = "correlation_matched";
pub const CORRELATION_IGNORED: &str = "correlation_ignored";
pub const CORRELATION_FAILED: &str = "correlation_failed";
pub const CORRELATION_TIMEOUT: &str = "correlation_timeout";

// Multi-target fan-out events.
pub const FANOUT_NO_TARGETS: &str = "fanout_no_targets";
pub const FANOUT_TARGET_FAILED: &str = "fanout_target_failed";
pub const FANOUT_CONFLICT: &str = "fanout_conflict";

// Session multiplexer events.
pub const MUX_START: &str = "mux_start";
pub const MUX_CONNECT_FAILED: &str = "mux_connect_failed";
pub const MUX_SESSION_OPEN_FAILED: &str = "mux_session_open_failed";
pub const MUX_SESSION_ENDED: &str = "mux_session_ended";
pub const MUX_INBOUND_FORWARD_FAILED: &str = "mux_inbound_forward_failed";
pub const MUX_DISPATCH: &str = "mux_dispatch";
pub const MUX_DISPATCH_FAILED: &str = "mux_dispatch_failed";
pub const MUX_DISPATCH_UNSUPPORTED: &str = "mux_dispatch_unsupported";
pub const MUX_CLOSE: &str = "mux_close";

// Southbound manager events.
pub const MANAGER_TARGET_ADDED: &str = "manager_target_added";
pub const MANAGER_TARGET_RUNNING: &str = "manager_target_running";
pub const MANAGER_TARGET_FAILED: &str = "manager_target_failed";
pub const MANAGER_TARGET_REMOVED: &str = "manager_target_removed";
pub const MANAGER_FEED_CLOSED: &str = "manager_feed_closed";

// Northbound controller and status relay events.
pub const CONTROLLER_OPERATION_FAILED: &str = "controller_operation_failed";
pub const RELAY_STATUS_RECEIVED: &str = "relay_status_received";
pub const RELAY_NOTIFY_FAILED: &str = "relay_notify_failed";
pub const RELAY_ACK_FAILED: &str = "relay_ack_failed";
pub const NOTIFIER_DELIVERED: &str = "notifier_delivered";

// Southbound transport events.
pub const TRANSPORT_CONNECTED: &str = "transport_connected";
pub const TRANSPORT_CONNECT_FAILED: &str = "transport_connect_failed";
pub const TRANSPORT_FRAME_INVALID: &str = "transport_frame_invalid";
pub const TRANSPORT_FRAME_UNROUTED: &str = "transport_frame_unrouted";
pub const TRANSPORT_DISCONNECTED: &str = "transport_disconnected";

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

//! Southbound transport carrying newline-delimited JSON [`Frame`]s over TCP.
//!
//! Every frame names its operation kind. One-shot calls are answered by a
//! `Result` frame with the same request id; long-lived kinds share the same
//! connection and are routed by kind.

mod connection;
mod connector;
mod frame;

pub use connection::TcpTransport;
pub use connector::{TcpConnector, TcpTransportConfig, DEFAULT_CONNECT_TIMEOUT_MS};
pub use frame::{Frame, MAX_FRAME_LENGTH};

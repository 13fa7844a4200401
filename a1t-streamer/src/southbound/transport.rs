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

//! Seams between the multiplexer and a concrete network transport.

use crate::error::A1Error;
use crate::message::{MessageBody, RequestMessage, ResultMessage, RpcKind};
use async_trait::async_trait;
use std::sync::Arc;
use target_registry::TargetRegistration;

/// Opens the connection to one target.
#[async_trait]
pub trait TargetConnector: Send + Sync {
    async fn connect(
        &self,
        registration: &TargetRegistration,
    ) -> Result<Arc<dyn TargetTransport>, A1Error>;
}

/// An open connection to one target.
#[async_trait]
pub trait TargetTransport: Send + Sync {
    /// One-shot call: a single request answered by a single result.
    async fn call(&self, rpc: RpcKind, request: RequestMessage) -> Result<ResultMessage, A1Error>;

    /// Opens the long-lived bidirectional session for `rpc`.
    async fn open_session(&self, rpc: RpcKind) -> Result<Arc<dyn RemoteSession>, A1Error>;

    async fn close(&self);
}

/// Long-lived bidirectional session for one operation kind.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// Next message pushed by the target, or `None` once the session has ended.
    async fn recv(&self) -> Option<MessageBody>;

    async fn send(&self, body: MessageBody) -> Result<(), A1Error>;

    /// Idempotent. A pending `recv` returns `None` afterwards.
    async fn close(&self);
}

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

use crate::message::{MessageBody, MessageKind, RpcKind};
use serde::{Deserialize, Serialize};
use target_registry::A1Service;

/// Unit carried on a directional stream: which target, which operation, what body.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct StreamMessage {
    pub target_id: String,
    pub rpc: RpcKind,
    pub body: MessageBody,
}

impl StreamMessage {
    pub fn new(target_id: impl Into<String>, rpc: RpcKind, body: MessageBody) -> Self {
        Self {
            target_id: target_id.into(),
            rpc,
            body,
        }
    }

    pub fn service(&self) -> A1Service {
        self.rpc.service()
    }

    pub fn kind(&self) -> MessageKind {
        self.body.kind()
    }

    pub fn request_id(&self) -> &str {
        self.body.request_id()
    }
}

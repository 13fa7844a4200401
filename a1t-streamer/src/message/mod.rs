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

//! Message model shared by streams, correlation and the southbound side.

mod envelope;
mod rpc;
mod wire;

pub use envelope::StreamMessage;
pub use rpc::{RpcKind, SessionMode};
pub use wire::{
    AckMessage, Encoding, Header, MessageBody, MessageKind, Outcome, PayloadType, RequestMessage,
    ResultMessage, StatusMessage,
};

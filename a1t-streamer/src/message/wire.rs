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

//! Southbound message shapes: request, result, status and acknowledgement.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    #[default]
    Json,
    Protobuf,
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadType {
    #[default]
    Policy,
    Status,
    EiJob,
    EiType,
}

/// Header carried by every message. `request_id` is the correlation id.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct Header {
    pub request_id: String,
    pub app_id: String,
    #[serde(default)]
    pub encoding: Encoding,
    #[serde(default)]
    pub payload_type: PayloadType,
}

impl Header {
    pub fn new(request_id: &str, app_id: &str, payload_type: PayloadType) -> Self {
        Self {
            request_id: request_id.to_string(),
            app_id: app_id.to_string(),
            encoding: Encoding::Json,
            payload_type,
        }
    }
}

/// Success flag plus the target-provided reason on failure.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct Outcome {
    pub success: bool,
    #[serde(default)]
    pub reason: String,
}

impl Outcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            reason: String::new(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: reason.into(),
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct RequestMessage {
    pub header: Header,
    pub type_id: String,
    #[serde(default)]
    pub object_id: Option<String>,
    #[serde(default)]
    pub payload: Vec<u8>,
    #[serde(default)]
    pub notification_destination: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct ResultMessage {
    pub header: Header,
    pub type_id: String,
    #[serde(default)]
    pub object_id: Option<String>,
    pub outcome: Outcome,
    #[serde(default)]
    pub payload: Vec<u8>,
}

impl ResultMessage {
    /// Successful reply to `request` carrying `payload`.
    pub fn success_for(request: &RequestMessage, payload: Vec<u8>) -> Self {
        Self {
            header: request.header.clone(),
            type_id: request.type_id.clone(),
            object_id: request.object_id.clone(),
            outcome: Outcome::ok(),
            payload,
        }
    }

    /// Failure-flagged reply to `request`; the request id is preserved so the
    /// waiting correlator still matches it.
    pub fn failure_for(request: &RequestMessage, reason: impl Into<String>) -> Self {
        Self {
            header: request.header.clone(),
            type_id: request.type_id.clone(),
            object_id: request.object_id.clone(),
            outcome: Outcome::failed(reason),
            payload: Vec::new(),
        }
    }
}

/// Asynchronous push from a target (policy status, job status, job result).
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct StatusMessage {
    pub header: Header,
    pub type_id: String,
    #[serde(default)]
    pub object_id: Option<String>,
    #[serde(default)]
    pub payload: Vec<u8>,
    #[serde(default)]
    pub notification_destination: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct AckMessage {
    pub header: Header,
    pub type_id: String,
    #[serde(default)]
    pub object_id: Option<String>,
    pub outcome: Outcome,
    #[serde(default)]
    pub notification_destination: Option<String>,
}

impl AckMessage {
    /// Acknowledges `status`, echoing its header.
    pub fn for_status(status: &StatusMessage, outcome: Outcome) -> Self {
        Self {
            header: status.header.clone(),
            type_id: status.type_id.clone(),
            object_id: status.object_id.clone(),
            outcome,
            notification_destination: status.notification_destination.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MessageKind {
    Request,
    Result,
    Status,
    Acknowledgement,
}

impl Display for MessageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageKind::Request => write!(f, "Request"),
            MessageKind::Result => write!(f, "Result"),
            MessageKind::Status => write!(f, "Status"),
            MessageKind::Acknowledgement => write!(f, "Acknowledgement"),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum MessageBody {
    Request(RequestMessage),
    Result(ResultMessage),
    Status(StatusMessage),
    Ack(AckMessage),
}

impl MessageBody {
    pub fn kind(&self) -> MessageKind {
        match self {
            MessageBody::Request(_) => MessageKind::Request,
            MessageBody::Result(_) => MessageKind::Result,
            MessageBody::Status(_) => MessageKind::Status,
            MessageBody::Ack(_) => MessageKind::Acknowledgement,
        }
    }

    pub fn header(&self) -> &Header {
        match self {
            MessageBody::Request(message) => &message.header,
            MessageBody::Result(message) => &message.header,
            MessageBody::Status(message) => &message.header,
            MessageBody::Ack(message) => &message.header,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.header().request_id
    }
}

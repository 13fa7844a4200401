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

//! Canonical structured field keys and value-format helpers.

use crate::message::StreamMessage;

pub const COMPONENT: &str = "component";

pub const NONE: &str = "none";
pub const REASON_STREAM_CLOSED: &str = "stream_closed";
pub const REASON_CANCELED: &str = "canceled";
pub const REASON_QUEUE_FULL: &str = "queue_full";
pub const REASON_QUEUE_CLOSED: &str = "queue_closed";
pub const REASON_SESSION_ENDED: &str = "session_ended";
pub const REASON_DEREGISTERED: &str = "deregistered";

/// Pre-formatted message fields, built only when the event level is enabled.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MessageFields {
    pub target_id: String,
    pub request_id: String,
    pub rpc: String,
    pub msg_kind: String,
}

impl MessageFields {
    pub fn from_message(message: &StreamMessage) -> Self {
        Self {
            target_id: message.target_id.clone(),
            request_id: format_request_id(message),
            rpc: message.rpc.to_string(),
            msg_kind: message.kind().to_string(),
        }
    }
}

pub fn format_request_id(message: &StreamMessage) -> String {
    let request_id = message.request_id();
    if request_id.is_empty() {
        NONE.to_string()
    } else {
        request_id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{format_request_id, MessageFields, NONE};
    use crate::message::{
        Header, MessageBody, PayloadType, RpcKind, StatusMessage, StreamMessage,
    };

    #[test]
    fn empty_request_id_formats_as_none() {
        let message = StreamMessage::new(
            "ric-1",
            RpcKind::PolicyStatus,
            MessageBody::Status(StatusMessage::default()),
        );

        assert_eq!(format_request_id(&message), NONE);
    }

    #[test]
    fn message_fields_use_display_names() {
        let message = StreamMessage::new(
            "ric-1",
            RpcKind::EiJobStatusNotify,
            MessageBody::Status(StatusMessage {
                header: Header::new("r-9", "xapp", PayloadType::Status),
                ..Default::default()
            }),
        );

        let fields = MessageFields::from_message(&message);

        assert_eq!(fields.rpc, "EIJobStatusNotify");
        assert_eq!(fields.msg_kind, "Status");
        assert_eq!(fields.request_id, "r-9");
    }
}

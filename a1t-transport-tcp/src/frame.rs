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

use a1t_streamer::message::{MessageBody, RpcKind};
use a1t_streamer::A1Error;
use serde::{Deserialize, Serialize};

/// Upper bound for one encoded frame, newline excluded.
pub const MAX_FRAME_LENGTH: usize = 1024 * 1024;

/// One line on the wire: the operation kind plus the message it carries.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct Frame {
    pub rpc: RpcKind,
    pub body: MessageBody,
}

impl Frame {
    pub fn new(rpc: RpcKind, body: MessageBody) -> Self {
        Self { rpc, body }
    }

    /// JSON text without a trailing newline; the line codec appends it.
    pub fn encode(&self) -> Result<String, A1Error> {
        serde_json::to_string(self).map_err(A1Error::from)
    }

    pub fn decode(line: &str) -> Result<Self, A1Error> {
        serde_json::from_str(line).map_err(A1Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::Frame;
    use a1t_streamer::message::{
        Header, MessageBody, PayloadType, RpcKind, StatusMessage,
    };

    #[test]
    fn encoded_frame_is_a_single_line() {
        let status = StatusMessage {
            header: Header::new("status-1", "ric-1", PayloadType::Status),
            type_id: "ORAN_QoETarget_1.0.0".to_string(),
            payload: b"{\n  \"enforceStatus\": \"ENFORCED\"\n}".to_vec(),
            notification_destination: Some("http://nonrtric/status\n".to_string()),
            ..Default::default()
        };
        let frame = Frame::new(RpcKind::PolicyStatus, MessageBody::Status(status));

        let line = frame.encode().unwrap();

        assert!(!line.contains('\n'));
        assert_eq!(Frame::decode(&line).unwrap(), frame);
    }

    #[test]
    fn unknown_rpc_is_rejected() {
        let err = Frame::decode(
            r#"{"rpc":"policy_rollback","body":{"kind":"request","message":{}}}"#,
        )
        .unwrap_err();

        assert!(matches!(err, a1t_streamer::A1Error::InvalidPayload(_)));
    }
}

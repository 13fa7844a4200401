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

use crate::error::A1Error;
use serde_json::Value;

/// Turns opaque payload bytes into a value that can be compared structurally.
pub trait PayloadCodec: Send + Sync {
    fn decode(&self, payload: &[u8]) -> Result<Value, A1Error>;

    fn encode(&self, value: &Value) -> Result<Vec<u8>, A1Error>;
}

/// JSON payloads. Object keys compare independently of order, arrays positionally.
/// An empty payload decodes to `null`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonPayloadCodec;

impl PayloadCodec for JsonPayloadCodec {
    fn decode(&self, payload: &[u8]) -> Result<Value, A1Error> {
        if payload.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(payload).map_err(A1Error::from)
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, A1Error> {
        serde_json::to_vec(value).map_err(A1Error::from)
    }
}

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

use crate::correlation::{validate_consistent, FanOut};
use crate::error::A1Error;
use crate::message::{Header, PayloadType, RequestMessage, RpcKind};
use crate::observability::{events, fields};
use serde_json::Value;
use std::sync::Arc;
use target_registry::{A1Service, TargetDirectory};
use tracing::warn;

const COMPONENT: &str = "controller";

/// Template for the per-target request of one northbound operation.
#[derive(Clone, Debug, Default)]
pub(crate) struct Operation {
    type_id: String,
    payload_type: PayloadType,
    object_id: Option<String>,
    payload: Vec<u8>,
    notification_destination: Option<String>,
}

impl Operation {
    pub(crate) fn new(type_id: &str, payload_type: PayloadType) -> Self {
        Self {
            type_id: type_id.to_string(),
            payload_type,
            ..Default::default()
        }
    }

    pub(crate) fn object(mut self, object_id: &str) -> Self {
        self.object_id = Some(object_id.to_string());
        self
    }

    pub(crate) fn body(mut self, value: &Value) -> Result<Self, A1Error> {
        self.payload = serde_json::to_vec(value)?;
        Ok(self)
    }

    pub(crate) fn notify(mut self, destination: Option<&str>) -> Self {
        self.notification_destination = destination.map(str::to_string);
        self
    }

    /// The request id is left empty; the correlator assigns it.
    pub(crate) fn request_for(&self, target_id: &str) -> RequestMessage {
        RequestMessage {
            header: Header::new("", target_id, self.payload_type),
            type_id: self.type_id.clone(),
            object_id: self.object_id.clone(),
            payload: self.payload.clone(),
            notification_destination: self.notification_destination.clone(),
        }
    }
}

/// Resolves the targets of an operation and runs it through the fan-out.
pub(crate) struct OperationRunner {
    service: A1Service,
    directory: Arc<dyn TargetDirectory>,
    fan_out: Arc<FanOut>,
}

impl OperationRunner {
    pub(crate) fn new(
        service: A1Service,
        directory: Arc<dyn TargetDirectory>,
        fan_out: Arc<FanOut>,
    ) -> Self {
        Self {
            service,
            directory,
            fan_out,
        }
    }

    /// Every supporting target must accept the write.
    pub(crate) async fn write(&self, rpc: RpcKind, operation: Operation) -> Result<(), A1Error> {
        let targets = self.targets(&operation).await;
        self.fan_out
            .execute_all(&targets, rpc, |target_id| operation.request_for(target_id))
            .await
            .map_err(|err| self.failed(rpc, &operation, err))
    }

    /// The value every supporting target agrees on.
    pub(crate) async fn read(&self, rpc: RpcKind, operation: Operation) -> Result<Value, A1Error> {
        let targets = self.targets(&operation).await;
        self.fan_out
            .query_all(&targets, rpc, |target_id| operation.request_for(target_id))
            .await
            .map_err(|err| self.failed(rpc, &operation, err))
    }

    /// The id list every supporting target agrees on, compared after sorting.
    pub(crate) async fn read_ids(
        &self,
        rpc: RpcKind,
        operation: Operation,
    ) -> Result<Vec<String>, A1Error> {
        let targets = self.targets(&operation).await;
        let ids = async {
            let lists = self
                .fan_out
                .collect_all(&targets, rpc, |target_id| operation.request_for(target_id))
                .await?
                .into_iter()
                .map(sorted_id_list)
                .collect::<Result<Vec<Value>, A1Error>>()?;
            into_id_list(validate_consistent(lists)?)
        };
        ids.await.map_err(|err| self.failed(rpc, &operation, err))
    }

    pub(crate) async fn type_ids(&self) -> Vec<String> {
        self.directory.type_ids(self.service).await
    }

    async fn targets(&self, operation: &Operation) -> Vec<String> {
        self.directory
            .targets_for_type(self.service, &operation.type_id)
            .await
    }

    fn failed(&self, rpc: RpcKind, operation: &Operation, err: A1Error) -> A1Error {
        warn!(
            event = events::CONTROLLER_OPERATION_FAILED,
            component = COMPONENT,
            rpc = %rpc,
            type_id = operation.type_id.as_str(),
            object_id = operation.object_id.as_deref().unwrap_or(fields::NONE),
            err = %err,
            "northbound operation failed"
        );
        err
    }
}

/// Normalises a target's id list so lists from different targets compare
/// independently of order. An empty reply counts as an empty list.
pub(crate) fn sorted_id_list(value: Value) -> Result<Value, A1Error> {
    let mut ids = match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(id) => Ok(id),
                other => Err(A1Error::invalid_payload(format!(
                    "expected id string, got {other}"
                ))),
            })
            .collect::<Result<Vec<String>, A1Error>>()?,
        other => {
            return Err(A1Error::invalid_payload(format!(
                "expected id list, got {other}"
            )))
        }
    };
    ids.sort();
    ids.dedup();
    Ok(Value::from(ids))
}

pub(crate) fn into_id_list(value: Value) -> Result<Vec<String>, A1Error> {
    serde_json::from_value(value).map_err(A1Error::from)
}

#[cfg(test)]
mod tests {
    use super::{sorted_id_list, Operation};
    use crate::message::PayloadType;
    use serde_json::json;

    #[test]
    fn request_carries_operation_fields() {
        let operation = Operation::new("ORAN_QoETarget_1.0.0", PayloadType::Policy)
            .object("policy-1")
            .body(&json!({"scope": {"ueId": "1"}}))
            .unwrap()
            .notify(Some("http://nonrtric/status"));

        let request = operation.request_for("ric-7");

        assert_eq!(request.header.app_id, "ric-7");
        assert!(request.header.request_id.is_empty());
        assert_eq!(request.object_id.as_deref(), Some("policy-1"));
        assert_eq!(request.payload, br#"{"scope":{"ueId":"1"}}"#.to_vec());
        assert_eq!(
            request.notification_destination.as_deref(),
            Some("http://nonrtric/status")
        );
    }

    #[test]
    fn id_lists_are_sorted_and_null_is_empty() {
        assert_eq!(sorted_id_list(json!(["b", "a", "b"])).unwrap(), json!(["a", "b"]));
        assert_eq!(sorted_id_list(json!(null)).unwrap(), json!([]));
        assert!(sorted_id_list(json!({"a": 1})).is_err());
        assert!(sorted_id_list(json!([1])).is_err());
    }
}

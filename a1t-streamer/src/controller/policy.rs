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

//! Policy management operations.
//!
//! Writes go to every target that declares the policy type and succeed only if all
//! of them accept. Reads query the same set and return the one value they agree on.

use crate::controller::operation::{Operation, OperationRunner};
use crate::correlation::FanOut;
use crate::error::A1Error;
use crate::message::{PayloadType, RpcKind};
use serde_json::Value;
use std::sync::Arc;
use target_registry::{A1Service, TargetDirectory};

pub struct PolicyController {
    runner: OperationRunner,
}

impl PolicyController {
    pub fn new(directory: Arc<dyn TargetDirectory>, fan_out: Arc<FanOut>) -> Self {
        Self {
            runner: OperationRunner::new(A1Service::PolicyManagement, directory, fan_out),
        }
    }

    pub async fn create_policy(
        &self,
        type_id: &str,
        policy_id: &str,
        policy: &Value,
        notification_destination: Option<&str>,
    ) -> Result<(), A1Error> {
        let operation = Operation::new(type_id, PayloadType::Policy)
            .object(policy_id)
            .body(policy)?
            .notify(notification_destination);
        self.runner.write(RpcKind::PolicySetup, operation).await
    }

    pub async fn update_policy(
        &self,
        type_id: &str,
        policy_id: &str,
        policy: &Value,
        notification_destination: Option<&str>,
    ) -> Result<(), A1Error> {
        let operation = Operation::new(type_id, PayloadType::Policy)
            .object(policy_id)
            .body(policy)?
            .notify(notification_destination);
        self.runner.write(RpcKind::PolicyUpdate, operation).await
    }

    pub async fn delete_policy(&self, type_id: &str, policy_id: &str) -> Result<(), A1Error> {
        let operation = Operation::new(type_id, PayloadType::Policy).object(policy_id);
        self.runner.write(RpcKind::PolicyDelete, operation).await
    }

    pub async fn get_policy(&self, type_id: &str, policy_id: &str) -> Result<Value, A1Error> {
        let operation = Operation::new(type_id, PayloadType::Policy).object(policy_id);
        self.runner.read(RpcKind::PolicyQuery, operation).await
    }

    pub async fn get_policy_status(
        &self,
        type_id: &str,
        policy_id: &str,
    ) -> Result<Value, A1Error> {
        let operation = Operation::new(type_id, PayloadType::Status).object(policy_id);
        self.runner.read(RpcKind::PolicyQuery, operation).await
    }

    /// Policy ids of `type_id`, sorted.
    pub async fn list_policies(&self, type_id: &str) -> Result<Vec<String>, A1Error> {
        let operation = Operation::new(type_id, PayloadType::Policy);
        self.runner.read_ids(RpcKind::PolicyQuery, operation).await
    }

    /// Policy types declared by any registered target, sorted.
    pub async fn policy_types(&self) -> Vec<String> {
        self.runner.type_ids().await
    }
}

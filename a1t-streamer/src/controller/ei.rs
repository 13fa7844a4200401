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

use crate::controller::operation::{Operation, OperationRunner};
use crate::correlation::FanOut;
use crate::error::A1Error;
use crate::message::{PayloadType, RpcKind};
use serde_json::Value;
use std::sync::Arc;
use target_registry::{A1Service, TargetDirectory};

/// Enrichment-information job operations, addressed by EI type.
pub struct EiController {
    runner: OperationRunner,
}

impl EiController {
    pub fn new(directory: Arc<dyn TargetDirectory>, fan_out: Arc<FanOut>) -> Self {
        Self {
            runner: OperationRunner::new(A1Service::EnrichmentInformation, directory, fan_out),
        }
    }

    /// `status_destination` receives the job's status pushes.
    pub async fn create_job(
        &self,
        type_id: &str,
        job_id: &str,
        job: &Value,
        status_destination: Option<&str>,
    ) -> Result<(), A1Error> {
        let operation = Operation::new(type_id, PayloadType::EiJob)
            .object(job_id)
            .body(job)?
            .notify(status_destination);
        self.runner.write(RpcKind::EiJobSetup, operation).await
    }

    pub async fn update_job(
        &self,
        type_id: &str,
        job_id: &str,
        job: &Value,
        status_destination: Option<&str>,
    ) -> Result<(), A1Error> {
        let operation = Operation::new(type_id, PayloadType::EiJob)
            .object(job_id)
            .body(job)?
            .notify(status_destination);
        self.runner.write(RpcKind::EiJobUpdate, operation).await
    }

    pub async fn delete_job(&self, type_id: &str, job_id: &str) -> Result<(), A1Error> {
        let operation = Operation::new(type_id, PayloadType::EiJob).object(job_id);
        self.runner.write(RpcKind::EiJobDelete, operation).await
    }

    pub async fn get_job(&self, type_id: &str, job_id: &str) -> Result<Value, A1Error> {
        let operation = Operation::new(type_id, PayloadType::EiJob).object(job_id);
        self.runner.read(RpcKind::EiQuery, operation).await
    }

    pub async fn get_job_status(&self, type_id: &str, job_id: &str) -> Result<Value, A1Error> {
        let operation = Operation::new(type_id, PayloadType::Status).object(job_id);
        self.runner.read(RpcKind::EiJobStatusQuery, operation).await
    }

    pub async fn list_jobs(&self, type_id: &str) -> Result<Vec<String>, A1Error> {
        let operation = Operation::new(type_id, PayloadType::EiJob);
        self.runner.read_ids(RpcKind::EiQuery, operation).await
    }

    pub async fn ei_types(&self) -> Vec<String> {
        self.runner.type_ids().await
    }
}

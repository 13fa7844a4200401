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

use a1t_streamer::controller::StatusNotifier;
use a1t_streamer::message::{Header, PayloadType, StatusMessage};
use a1t_streamer::{A1Error, A1Service, ServiceCapability, TargetRegistration};
use async_trait::async_trait;
use std::sync::Mutex;

pub const POLICY_TYPE: &str = "ORAN_QoETarget_1.0.0";
pub const EI_TYPE: &str = "ORAN_EiJob_1.0.0";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn policy_target(target_id: &str, type_ids: &[&str]) -> TargetRegistration {
    registration(target_id, A1Service::PolicyManagement, type_ids)
}

pub fn ei_target(target_id: &str, type_ids: &[&str]) -> TargetRegistration {
    registration(target_id, A1Service::EnrichmentInformation, type_ids)
}

pub fn registration(target_id: &str, service: A1Service, type_ids: &[&str]) -> TargetRegistration {
    TargetRegistration::new(
        target_id,
        &format!("{target_id}.local:5150"),
        type_ids
            .iter()
            .map(|type_id| ServiceCapability::new(service, type_id))
            .collect(),
    )
}

pub fn policy_status(policy_id: &str, destination: Option<&str>, payload: &str) -> StatusMessage {
    StatusMessage {
        header: Header::new(&format!("status-{policy_id}"), "xapp", PayloadType::Status),
        type_id: POLICY_TYPE.to_string(),
        object_id: Some(policy_id.to_string()),
        payload: payload.as_bytes().to_vec(),
        notification_destination: destination.map(str::to_string),
    }
}

/// Status notifier that records deliveries and can be told to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<(String, StatusMessage)>>,
    failure: Mutex<Option<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, reason: &str) {
        *self.failure.lock().unwrap() = Some(reason.to_string());
    }

    pub fn delivered(&self) -> Vec<(String, StatusMessage)> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusNotifier for RecordingNotifier {
    async fn notify(&self, destination: &str, status: &StatusMessage) -> Result<(), A1Error> {
        if let Some(reason) = self.failure.lock().unwrap().clone() {
            return Err(A1Error::transport(reason));
        }
        self.delivered
            .lock()
            .unwrap()
            .push((destination.to_string(), status.clone()));
        Ok(())
    }
}

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

//! Runs one correlation per supporting target and requires the targets to agree.

use crate::correlation::{Correlator, JsonPayloadCodec, PayloadCodec};
use crate::error::A1Error;
use crate::message::{RequestMessage, ResultMessage, RpcKind};
use crate::observability::events;
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

const COMPONENT: &str = "fan_out";

const NO_ENTRIES: &str = "no entries";

/// Returns the shared value when every entry is structurally equal.
///
/// An empty set is [`A1Error::NotFound`]; any divergence is [`A1Error::Conflict`].
pub fn validate_consistent(values: Vec<Value>) -> Result<Value, A1Error> {
    let mut values = values.into_iter();
    let Some(first) = values.next() else {
        return Err(A1Error::not_found(NO_ENTRIES));
    };

    for (index, other) in values.enumerate() {
        if other != first {
            return Err(A1Error::conflict(format!(
                "target {} disagrees with target 0: {first} != {other}",
                index + 1
            )));
        }
    }
    Ok(first)
}

pub struct FanOut {
    correlator: Arc<Correlator>,
    codec: Arc<dyn PayloadCodec>,
}

impl FanOut {
    pub fn new(correlator: Arc<Correlator>) -> Self {
        Self::with_codec(correlator, Arc::new(JsonPayloadCodec))
    }

    pub fn with_codec(correlator: Arc<Correlator>, codec: Arc<dyn PayloadCodec>) -> Self {
        Self { correlator, codec }
    }

    pub fn codec(&self) -> &Arc<dyn PayloadCodec> {
        &self.codec
    }

    /// Queries every target and returns the single value they all agree on.
    pub async fn query_all<F>(
        &self,
        targets: &[String],
        rpc: RpcKind,
        build_request: F,
    ) -> Result<Value, A1Error>
    where
        F: Fn(&str) -> RequestMessage,
    {
        let values = self.collect_all(targets, rpc, build_request).await?;
        validate_consistent(values).map_err(|err| {
            if err.is_conflict() {
                warn!(
                    event = events::FANOUT_CONFLICT,
                    component = COMPONENT,
                    rpc = %rpc,
                    targets = targets.len(),
                    err = %err,
                    "targets returned inconsistent payloads"
                );
            }
            err
        })
    }

    /// Queries every target and returns each decoded payload, in target order,
    /// without comparing them.
    pub async fn collect_all<F>(
        &self,
        targets: &[String],
        rpc: RpcKind,
        build_request: F,
    ) -> Result<Vec<Value>, A1Error>
    where
        F: Fn(&str) -> RequestMessage,
    {
        self.correlate_all(targets, rpc, build_request)
            .await?
            .iter()
            .map(|result| self.codec.decode(&result.payload))
            .collect()
    }

    /// Sends the same operation to every target; all of them must succeed.
    pub async fn execute_all<F>(
        &self,
        targets: &[String],
        rpc: RpcKind,
        build_request: F,
    ) -> Result<(), A1Error>
    where
        F: Fn(&str) -> RequestMessage,
    {
        self.correlate_all(targets, rpc, build_request)
            .await
            .map(|_| ())
    }

    async fn correlate_all<F>(
        &self,
        targets: &[String],
        rpc: RpcKind,
        build_request: F,
    ) -> Result<Vec<ResultMessage>, A1Error>
    where
        F: Fn(&str) -> RequestMessage,
    {
        if targets.is_empty() {
            info!(
                event = events::FANOUT_NO_TARGETS,
                component = COMPONENT,
                rpc = %rpc,
                "no target supports the requested type"
            );
            return Err(A1Error::not_found(NO_ENTRIES));
        }

        // every correlation runs to its own completion; the first failure in
        // target order decides the result
        let outcomes = join_all(targets.iter().map(|target_id| {
            let request = build_request(target_id);
            self.correlator.request(target_id, rpc, request)
        }))
        .await;

        let mut results = Vec::with_capacity(outcomes.len());
        for (target_id, outcome) in targets.iter().zip(outcomes) {
            match outcome {
                Ok(result) => results.push(result),
                Err(err) => {
                    warn!(
                        event = events::FANOUT_TARGET_FAILED,
                        component = COMPONENT,
                        target_id = target_id.as_str(),
                        rpc = %rpc,
                        err = %err,
                        "target failed during fan-out"
                    );
                    return Err(err);
                }
            }
        }
        Ok(results)
    }
}

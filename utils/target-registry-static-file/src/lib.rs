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

use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::{self, canonicalize};
use std::path::PathBuf;
use target_registry::{TargetRegistration, TargetRegistry};
use tracing::{debug, info, warn};

const STATIC_REGISTRY_TAG: &str = "TargetRegistryStaticFile:";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StaticRegistryError {
    NotFound(String),
    Unreadable(String),
    Malformed(String),
    DuplicateTarget(String),
    InvalidTarget(String),
}

impl Display for StaticRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StaticRegistryError::NotFound(message) => {
                write!(f, "Static target file not found: {message}")
            }
            StaticRegistryError::Unreadable(message) => write!(f, "Unable to read file: {message}"),
            StaticRegistryError::Malformed(message) => write!(f, "Unable to parse JSON: {message}"),
            StaticRegistryError::DuplicateTarget(target_id) => {
                write!(f, "Duplicate target found: {target_id}")
            }
            StaticRegistryError::InvalidTarget(message) => {
                write!(f, "Invalid target registration: {message}")
            }
        }
    }
}

impl Error for StaticRegistryError {}

/// Target registrations read from a JSON array in a file.
pub struct TargetRegistryStaticFile {
    static_file: PathBuf,
}

impl TargetRegistryStaticFile {
    pub fn new(static_file: impl Into<PathBuf>) -> Self {
        Self {
            static_file: static_file.into(),
        }
    }

    pub fn read(&self) -> Result<Vec<TargetRegistration>, StaticRegistryError> {
        debug!("{STATIC_REGISTRY_TAG} reading {:?}", self.static_file);
        let path = canonicalize(&self.static_file)
            .map_err(|e| StaticRegistryError::NotFound(format!("{:?}: {e}", self.static_file)))?;
        let data =
            fs::read_to_string(&path).map_err(|e| StaticRegistryError::Unreadable(e.to_string()))?;
        parse_registrations(&data)
    }

    /// Puts every registration of the file into `registry`, returning how many were read.
    pub async fn load_into(&self, registry: &TargetRegistry) -> Result<usize, StaticRegistryError> {
        let registrations = self.read()?;
        let count = registrations.len();
        for registration in registrations {
            registry.put(registration).await;
        }
        info!(
            "{STATIC_REGISTRY_TAG} loaded {count} targets from {:?}",
            self.static_file
        );
        Ok(count)
    }
}

/// Parses and validates a JSON array of registrations.
pub fn parse_registrations(data: &str) -> Result<Vec<TargetRegistration>, StaticRegistryError> {
    let registrations: Vec<TargetRegistration> =
        serde_json::from_str(data).map_err(|e| StaticRegistryError::Malformed(e.to_string()))?;

    let mut seen = HashSet::new();
    for registration in &registrations {
        if registration.target_id.is_empty() {
            return Err(StaticRegistryError::InvalidTarget(
                "target_id must not be empty".to_string(),
            ));
        }
        if registration.address.is_empty() {
            return Err(StaticRegistryError::InvalidTarget(format!(
                "{} has no address",
                registration.target_id
            )));
        }
        if !seen.insert(registration.target_id.as_str()) {
            return Err(StaticRegistryError::DuplicateTarget(
                registration.target_id.clone(),
            ));
        }
        if registration.capabilities.is_empty() {
            warn!(
                "{STATIC_REGISTRY_TAG} {} declares no capabilities and will never be selected",
                registration.target_id
            );
        }
    }
    Ok(registrations)
}

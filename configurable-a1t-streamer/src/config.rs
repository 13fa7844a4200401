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

use a1t_streamer::StreamerConfig;
use a1t_transport_tcp::TcpTransportConfig;
use serde::{Deserialize, Serialize};
use status_notifier_http::HttpNotifierConfig;
use std::error::Error;
use std::fs;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub(crate) streamer: StreamerConfig,
    pub(crate) registry: RegistryConfig,
    #[serde(default)]
    pub(crate) transport: TcpTransportConfig,
    #[serde(default)]
    pub(crate) notifier: HttpNotifierConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    pub(crate) file_path: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self, Box<dyn Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Unable to read config file {path}: {e}"))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, Box<dyn Error>> {
        json5::from_str(contents).map_err(|e| format!("Unable to parse config file: {e}").into())
    }
}

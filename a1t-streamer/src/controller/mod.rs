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

//! Northbound operations built on correlation and fan-out.

mod ei;
mod operation;
mod policy;
mod status_relay;

pub use ei::EiController;
pub use policy::PolicyController;
pub use status_relay::{StatusNotifier, StatusRelay};

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

mod mock_target;
pub use mock_target::{MockConnector, MockSession, MockTarget, TargetBehavior};

mod fixtures;
pub use fixtures::{
    ei_target, init_tracing, policy_status, policy_target, registration, RecordingNotifier,
    EI_TYPE, POLICY_TYPE,
};

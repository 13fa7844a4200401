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

//! Operation-kind tags and the session shape each kind uses southbound.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use target_registry::A1Service;

/// How a kind of operation is carried to a target.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SessionMode {
    /// An independent call per invocation.
    OneShot,
    /// A bidirectional session opened once per target and kept for its lifetime.
    LongLived,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcKind {
    PolicySetup,
    PolicyUpdate,
    PolicyDelete,
    PolicyQuery,
    PolicyStatus,
    EiQuery,
    EiJobSetup,
    EiJobUpdate,
    EiJobDelete,
    EiJobStatusQuery,
    EiJobStatusNotify,
    EiJobResultDelivery,
}

impl RpcKind {
    pub const ALL: [RpcKind; 12] = [
        RpcKind::PolicySetup,
        RpcKind::PolicyUpdate,
        RpcKind::PolicyDelete,
        RpcKind::PolicyQuery,
        RpcKind::PolicyStatus,
        RpcKind::EiQuery,
        RpcKind::EiJobSetup,
        RpcKind::EiJobUpdate,
        RpcKind::EiJobDelete,
        RpcKind::EiJobStatusQuery,
        RpcKind::EiJobStatusNotify,
        RpcKind::EiJobResultDelivery,
    ];

    pub fn service(&self) -> A1Service {
        match self {
            RpcKind::PolicySetup
            | RpcKind::PolicyUpdate
            | RpcKind::PolicyDelete
            | RpcKind::PolicyQuery
            | RpcKind::PolicyStatus => A1Service::PolicyManagement,
            RpcKind::EiQuery
            | RpcKind::EiJobSetup
            | RpcKind::EiJobUpdate
            | RpcKind::EiJobDelete
            | RpcKind::EiJobStatusQuery
            | RpcKind::EiJobStatusNotify
            | RpcKind::EiJobResultDelivery => A1Service::EnrichmentInformation,
        }
    }

    pub fn session_mode(&self) -> SessionMode {
        match self {
            RpcKind::PolicyStatus | RpcKind::EiJobStatusNotify | RpcKind::EiJobResultDelivery => {
                SessionMode::LongLived
            }
            _ => SessionMode::OneShot,
        }
    }

    /// Long-lived kinds of `service`, i.e. the sessions a multiplexer keeps open.
    pub fn long_lived_for(service: A1Service) -> impl Iterator<Item = RpcKind> {
        Self::ALL.into_iter().filter(move |rpc| {
            rpc.service() == service && rpc.session_mode() == SessionMode::LongLived
        })
    }
}

impl Display for RpcKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RpcKind::PolicySetup => "PolicySetup",
            RpcKind::PolicyUpdate => "PolicyUpdate",
            RpcKind::PolicyDelete => "PolicyDelete",
            RpcKind::PolicyQuery => "PolicyQuery",
            RpcKind::PolicyStatus => "PolicyStatus",
            RpcKind::EiQuery => "EIQuery",
            RpcKind::EiJobSetup => "EIJobSetup",
            RpcKind::EiJobUpdate => "EIJobUpdate",
            RpcKind::EiJobDelete => "EIJobDelete",
            RpcKind::EiJobStatusQuery => "EIJobStatusQuery",
            RpcKind::EiJobStatusNotify => "EIJobStatusNotify",
            RpcKind::EiJobResultDelivery => "EIJobResultDelivery",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::{RpcKind, SessionMode};
    use target_registry::A1Service;

    #[test]
    fn every_kind_belongs_to_one_service() {
        let policy = RpcKind::ALL
            .iter()
            .filter(|rpc| rpc.service() == A1Service::PolicyManagement)
            .count();

        assert_eq!(policy, 5);
        assert_eq!(RpcKind::ALL.len() - policy, 7);
    }

    #[test]
    fn long_lived_sessions_per_service() {
        assert_eq!(
            RpcKind::long_lived_for(A1Service::PolicyManagement).collect::<Vec<_>>(),
            vec![RpcKind::PolicyStatus]
        );
        assert_eq!(
            RpcKind::long_lived_for(A1Service::EnrichmentInformation).collect::<Vec<_>>(),
            vec![RpcKind::EiJobStatusNotify, RpcKind::EiJobResultDelivery]
        );
        assert_eq!(RpcKind::PolicyQuery.session_mode(), SessionMode::OneShot);
    }
}

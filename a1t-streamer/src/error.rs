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

//! Error taxonomy shared by every layer of the streamer.

use crate::stream::StreamError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Outcome of a failed broker, correlation or controller operation.
///
/// Boundary layers match on the variant instead of parsing messages: a target
/// that said no ([`A1Error::Failure`]) is distinct from one that never answered
/// ([`A1Error::Timeout`]) and from targets that disagree ([`A1Error::Conflict`]).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum A1Error {
    NotFound(String),
    Timeout(String),
    Conflict(String),
    Canceled(String),
    NotSupported(String),
    /// Explicit `success = false` reported by a target.
    Failure { reason: String },
    Transport(String),
    InvalidPayload(String),
}

impl A1Error {
    pub fn not_found(message: impl Into<String>) -> Self {
        A1Error::NotFound(message.into())
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        A1Error::Timeout(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        A1Error::Conflict(message.into())
    }

    pub fn canceled(message: impl Into<String>) -> Self {
        A1Error::Canceled(message.into())
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        A1Error::NotSupported(message.into())
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        A1Error::Failure {
            reason: reason.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        A1Error::Transport(message.into())
    }

    pub fn invalid_payload(message: impl Into<String>) -> Self {
        A1Error::InvalidPayload(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, A1Error::NotFound(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, A1Error::Timeout(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, A1Error::Conflict(_))
    }
}

impl Display for A1Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            A1Error::NotFound(message) => write!(f, "not found: {message}"),
            A1Error::Timeout(message) => write!(f, "timeout: {message}"),
            A1Error::Conflict(message) => write!(f, "conflict: {message}"),
            A1Error::Canceled(message) => write!(f, "canceled: {message}"),
            A1Error::NotSupported(message) => write!(f, "not supported: {message}"),
            A1Error::Failure { reason } => write!(f, "target reported failure: {reason}"),
            A1Error::Transport(message) => write!(f, "transport error: {message}"),
            A1Error::InvalidPayload(message) => write!(f, "invalid payload: {message}"),
        }
    }
}

impl Error for A1Error {}

impl From<StreamError> for A1Error {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::SendTimeout(_) => A1Error::Timeout(err.to_string()),
            StreamError::Closed | StreamError::EndOfStream | StreamError::Canceled => {
                A1Error::Canceled(err.to_string())
            }
        }
    }
}

impl From<serde_json::Error> for A1Error {
    fn from(err: serde_json::Error) -> Self {
        A1Error::InvalidPayload(err.to_string())
    }
}

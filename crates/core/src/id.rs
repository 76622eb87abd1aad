// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed identifiers.
//!
//! All ids are UUIDs under the hood. Log ids use UUIDv7 so that their
//! string form sorts in creation order, which the log stream cursor
//! relies on; everything else is v4.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, OnceLock};
use uuid::timestamp::context::ContextV7;
use uuid::{Timestamp, Uuid};

/// Shared v7 context: adds a monotonic counter to ids generated within
/// the same millisecond, so append order and id order never disagree
/// inside one process.
fn next_v7() -> Uuid {
    static CONTEXT: OnceLock<Mutex<ContextV7>> = OnceLock::new();
    let context = CONTEXT.get_or_init(|| Mutex::new(ContextV7::new()));
    Uuid::new_v7(Timestamp::now(context))
}

macro_rules! uuid_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident => $ctor:expr;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh id.
            pub fn new() -> Self {
                Self($ctor)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(u: Uuid) -> Self {
                Self(u)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id! {
    /// Identifier of a deployment.
    pub struct DeploymentId => Uuid::new_v4();
}

uuid_id! {
    /// Identifier of a queue job envelope.
    pub struct JobId => Uuid::new_v4();
}

uuid_id! {
    /// Identifier of a deployment step row.
    pub struct StepId => Uuid::new_v4();
}

uuid_id! {
    /// Identifier of a log row. Time-ordered (UUIDv7): within one
    /// deployment, lexicographic id order matches append order.
    pub struct LogId => next_v7();
}

uuid_id! {
    /// Identifier of the user owning a deployment.
    pub struct UserId => Uuid::new_v4();
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline step names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::status::ParseStatusError;

/// Name of a deployment pipeline step.
///
/// `ValidateCredentials` is reserved: it is part of the wire domain but
/// never instantiated as a row; credential validation completes
/// implicitly when the SSH connection is established. The executed
/// pipeline is [`StepName::PIPELINE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    ValidateCredentials,
    GitClone,
    DockerBuild,
    DockerRun,
    HealthCheck,
}

impl StepName {
    /// The executed pipeline, in order. Step orders are 1-based indexes
    /// into this array.
    pub const PIPELINE: [StepName; 4] = [
        StepName::GitClone,
        StepName::DockerBuild,
        StepName::DockerRun,
        StepName::HealthCheck,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidateCredentials => "validate_credentials",
            Self::GitClone => "git_clone",
            Self::DockerBuild => "docker_build",
            Self::DockerRun => "docker_run",
            Self::HealthCheck => "health_check",
        }
    }

    /// 1-based position in the executed pipeline; `None` for the
    /// reserved step.
    pub fn order(&self) -> Option<i32> {
        Self::PIPELINE
            .iter()
            .position(|s| s == self)
            .map(|i| i as i32 + 1)
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepName {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "validate_credentials" => Ok(Self::ValidateCredentials),
            "git_clone" => Ok(Self::GitClone),
            "docker_build" => Ok(Self::DockerBuild),
            "docker_run" => Ok(Self::DockerRun),
            "health_check" => Ok(Self::HealthCheck),
            other => Err(ParseStatusError {
                kind: "step name",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;

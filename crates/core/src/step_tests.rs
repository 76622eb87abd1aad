// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn pipeline_orders_are_one_through_four() {
    let orders: Vec<i32> = StepName::PIPELINE
        .iter()
        .map(|s| s.order().unwrap())
        .collect();
    assert_eq!(orders, vec![1, 2, 3, 4]);
}

#[test]
fn reserved_step_has_no_order() {
    assert_eq!(StepName::ValidateCredentials.order(), None);
}

#[test]
fn names_round_trip() {
    for name in [
        StepName::ValidateCredentials,
        StepName::GitClone,
        StepName::DockerBuild,
        StepName::DockerRun,
        StepName::HealthCheck,
    ] {
        let parsed: StepName = name.as_str().parse().unwrap();
        assert_eq!(parsed, name);
    }
}

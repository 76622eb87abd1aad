// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;
use dk_core::{
    Deployment, DeploymentLog, DeploymentStatus, DeploymentStep, LogLevel, StepName, StepStatus,
};
use uuid::Uuid;

use crate::error::StoreError;

fn step_row() -> StepRow {
    StepRow {
        id: Uuid::new_v4(),
        deployment_id: Uuid::new_v4(),
        step_name: "docker_build".into(),
        status: "running".into(),
        started_at: Some(Utc::now()),
        completed_at: None,
        duration_ms: None,
        error_message: None,
        step_order: 2,
    }
}

#[test]
fn step_row_converts() {
    let step = DeploymentStep::try_from(step_row()).unwrap();
    assert_eq!(step.step_name, StepName::DockerBuild);
    assert_eq!(step.status, StepStatus::Running);
    assert_eq!(step.step_order, 2);
}

#[test]
fn corrupt_step_status_is_an_error() {
    let mut row = step_row();
    row.status = "melted".into();
    assert!(matches!(
        DeploymentStep::try_from(row),
        Err(StoreError::Corrupt(_))
    ));
}

#[test]
fn deployment_row_converts_with_vars() {
    let row = DeploymentRow {
        id: Uuid::new_v4(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        status: "pending".into(),
        target_ip: "10.0.0.5".into(),
        ssh_username: "root".into(),
        ssh_password_encrypted: Some("pw".into()),
        github_repo_url: "https://github.com/x/y.git".into(),
        github_pat_encrypted: Some("ghp_t".into()),
        github_branch: "main".into(),
        additional_vars: Some(serde_json::json!({"REGION": "eu-west-1"})),
        port: 3000,
        container_name: Some("deployknot-p-d".into()),
        started_at: None,
        completed_at: None,
        error_message: None,
        created_by: None,
        project_name: Some("p".into()),
        deployment_name: Some("d".into()),
        user_id: None,
    };
    let d = Deployment::try_from(row).unwrap();
    assert_eq!(d.status, DeploymentStatus::Pending);
    assert_eq!(d.port, 3000);
    assert_eq!(
        d.additional_vars.unwrap().get("REGION").map(String::as_str),
        Some("eu-west-1")
    );
}

#[test]
fn log_row_converts() {
    let row = LogRow {
        id: Uuid::now_v7(),
        deployment_id: Uuid::new_v4(),
        created_at: Utc::now(),
        log_level: "warn".into(),
        message: "cleanup warning".into(),
        task_name: Some("git_cleanup".into()),
        step_order: Some(1),
    };
    let log = DeploymentLog::try_from(row).unwrap();
    assert_eq!(log.log_level, LogLevel::Warn);
    assert_eq!(log.step_order, Some(1));
}

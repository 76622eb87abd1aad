// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::id::DeploymentId;
use chrono::Utc;

fn data() -> JobData {
    JobData {
        target_ip: "10.0.0.5".into(),
        ssh_username: "root".into(),
        ssh_password: "pw".into(),
        github_repo_url: "https://github.com/x/y.git".into(),
        github_pat: "ghp_token".into(),
        github_branch: "main".into(),
        port: 3000,
        container_name: "deployknot-p-d".into(),
        project_name: Some("p".into()),
        deployment_name: Some("d".into()),
        additional_vars: None,
        env_file_path: None,
        environment_vars: None,
    }
}

#[test]
fn envelope_round_trips_through_json() {
    let job = Job::deployment(DeploymentId::new(), data(), Utc::now());
    let json = serde_json::to_string(&job).unwrap();
    let parsed: Job = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.id, job.id);
    assert_eq!(parsed.deployment_id, job.deployment_id);
    assert_eq!(parsed.status, JobStatus::Pending);
    assert_eq!(parsed.data.container_name, "deployknot-p-d");
}

#[test]
fn wire_format_uses_expected_keys() {
    let job = Job::deployment(DeploymentId::new(), data(), Utc::now());
    let value: serde_json::Value = serde_json::to_value(&job).unwrap();

    assert_eq!(value["type"], "deployment");
    assert_eq!(value["status"], "pending");
    assert_eq!(value["data"]["target_ip"], "10.0.0.5");
    assert_eq!(value["data"]["github_branch"], "main");
    // Absent optionals are omitted, not serialized as null.
    assert!(value["data"].get("env_file_path").is_none());
    assert!(value.get("started_at").is_none());
}

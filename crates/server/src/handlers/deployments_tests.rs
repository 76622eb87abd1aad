// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dk_engine::CreateRequest;

#[test]
fn json_body_accepts_string_or_number_port() {
    let body: CreateDeploymentBody = serde_json::from_value(serde_json::json!({
        "target_ip": "10.0.0.5",
        "ssh_username": "root",
        "ssh_password": "pw",
        "github_repo_url": "https://github.com/x/y.git",
        "github_pat": "ghp_t",
        "github_branch": "main",
        "port": 3000,
    }))
    .unwrap();
    let create = CreateRequest::from(body);
    assert_eq!(create.port, "3000");

    let body: CreateDeploymentBody = serde_json::from_value(serde_json::json!({
        "target_ip": "10.0.0.5",
        "ssh_username": "root",
        "ssh_password": "pw",
        "github_repo_url": "https://github.com/x/y.git",
        "github_pat": "ghp_t",
        "github_branch": "main",
        "port": "8080",
        "environment_vars": "A=1\nB=2",
    }))
    .unwrap();
    let create = CreateRequest::from(body);
    assert_eq!(create.port, "8080");
    assert_eq!(create.environment_vars.as_deref(), Some("A=1\nB=2"));
}

#[test]
fn missing_required_json_field_fails_to_parse() {
    let result: Result<CreateDeploymentBody, _> = serde_json::from_value(serde_json::json!({
        "target_ip": "10.0.0.5",
        "port": 3000,
    }));
    assert!(result.is_err());
}

#[test]
fn pagination_defaults() {
    let page: Pagination = serde_json::from_str("{}").unwrap();
    assert_eq!(page.limit, 50);
    assert_eq!(page.offset, 0);

    let query: LogsQuery = serde_json::from_str("{}").unwrap();
    assert_eq!(query.limit, 100);
}

#[test]
fn empty_optional_form_values_become_none() {
    assert_eq!(some_nonempty(String::new()), None);
    assert_eq!(some_nonempty("x".into()), Some("x".into()));
}

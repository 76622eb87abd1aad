// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

fn config() -> Config {
    Config {
        server: ServerConfig {
            port: 8080,
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(60),
        },
        database: DatabaseConfig {
            host: "db.internal".into(),
            port: 5432,
            user: "deploy".into(),
            password: "pw".into(),
            name: "deployknot".into(),
            sslmode: "disable".into(),
            schema: "deploy_knot".into(),
        },
        redis: RedisConfig {
            host: "cache.internal".into(),
            port: 6379,
            password: String::new(),
            db: 0,
        },
        logging: LoggingConfig {
            level: "info".into(),
        },
        auth: AuthConfig {
            jwt_secret: "s3cret".into(),
        },
    }
}

#[test]
fn database_url_includes_schema_search_path() {
    let url = config().database_url();
    assert_eq!(
        url,
        "postgres://deploy:pw@db.internal:5432/deployknot?sslmode=disable&options=-csearch_path%3Ddeploy_knot"
    );
}

#[test]
fn redis_url_with_and_without_password() {
    let mut cfg = config();
    assert_eq!(cfg.redis_url(), "redis://cache.internal:6379/0");
    cfg.redis.password = "hush".into();
    assert_eq!(cfg.redis_url(), "redis://:hush@cache.internal:6379/0");
}

#[test]
fn durations_parse_with_units() {
    assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
    assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
    assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
    assert_eq!(parse_duration("2h"), Some(Duration::from_secs(7200)));
    assert_eq!(parse_duration("45"), Some(Duration::from_secs(45)));
    assert_eq!(parse_duration("soon"), None);
    assert_eq!(parse_duration(""), None);
}

#[test]
fn auth_config_debug_hides_secret() {
    let cfg = config();
    assert!(!format!("{:?}", cfg.auth).contains("s3cret"));
}

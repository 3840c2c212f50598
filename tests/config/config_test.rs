//! Coverage for config parsing, env overrides and path resolution.

use std::collections::HashMap;
use std::path::PathBuf;

use inquirydesk::config::{data_dir, Config};
use inquirydesk::inquiry::service::TerminalPolicy;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn data_dir_resolves() {
    let dir = data_dir();
    assert!(dir.is_ok());
    let path = match dir {
        Ok(path) => path,
        Err(err) => panic!("data dir should resolve: {err}"),
    };
    assert!(path.ends_with(".inquirydesk"));
}

#[test]
fn default_paths_live_under_data_dir() {
    let config = Config::default();
    let db = match config.database_path() {
        Ok(path) => path,
        Err(err) => panic!("database path should resolve: {err}"),
    };
    assert!(db.ends_with(PathBuf::from(".inquirydesk").join("inquirydesk.db")));
    let logs = match config.logs_dir() {
        Ok(path) => path,
        Err(err) => panic!("logs dir should resolve: {err}"),
    };
    assert!(logs.ends_with(PathBuf::from(".inquirydesk").join("logs")));
}

#[test]
fn parse_partial_config_keeps_defaults() {
    let toml_str = r#"
[auth]
admin_tokens = ["adm"]
"#;
    let parsed = Config::from_toml(toml_str);
    assert!(parsed.is_ok());
    let config = match parsed {
        Ok(config) => config,
        Err(err) => panic!("partial config should parse: {err}"),
    };
    assert_eq!(config.auth.admin_tokens, vec!["adm"]);
    assert!(config.auth.customer_tokens.is_empty());
    assert_eq!(config.server.bind, "127.0.0.1:3000");
    assert_eq!(config.server.page_size, 10);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.inquiries.terminal_policy, TerminalPolicy::Open);
}

#[test]
fn unknown_terminal_policy_is_rejected() {
    let toml_str = r#"
[inquiries]
terminal_policy = "frozen"
"#;
    assert!(Config::from_toml(toml_str).is_err());
}

#[test]
fn load_reads_file_then_env() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("desk.toml");
    std::fs::write(
        &path,
        r#"
[server]
bind = "127.0.0.1:4000"
page_size = 20

[inquiries]
terminal_policy = "locked"
"#,
    )
    .expect("should write config");
    let path_str = path.to_string_lossy().into_owned();

    let loaded = Config::load_with(env_from(&[
        ("INQUIRYDESK_CONFIG", path_str.as_str()),
        ("INQUIRYDESK_PAGE_SIZE", "50"),
        ("INQUIRYDESK_DATABASE", "/tmp/other.db"),
    ]));
    let config = match loaded {
        Ok(config) => config,
        Err(err) => panic!("config should load: {err}"),
    };
    assert_eq!(config.server.bind, "127.0.0.1:4000");
    assert_eq!(config.server.page_size, 50);
    assert_eq!(config.inquiries.terminal_policy, TerminalPolicy::Locked);
    assert_eq!(
        config.database_path().ok(),
        Some(PathBuf::from("/tmp/other.db"))
    );
}

#[test]
fn load_rejects_invalid_merged_config() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("desk.toml");
    std::fs::write(&path, "[server]\nbind = \"not an address\"\n").expect("should write config");
    let path_str = path.to_string_lossy().into_owned();

    assert!(Config::load_with(env_from(&[("INQUIRYDESK_CONFIG", path_str.as_str())])).is_err());
}

#[test]
fn malformed_file_is_an_error() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("desk.toml");
    std::fs::write(&path, "[server\nbind = ").expect("should write config");
    let path_str = path.to_string_lossy().into_owned();

    assert!(Config::load_with(env_from(&[("INQUIRYDESK_CONFIG", path_str.as_str())])).is_err());
}

#[test]
fn auth_debug_hides_tokens() {
    let mut config = Config::default();
    config.auth.admin_tokens = vec!["super-secret".to_owned()];
    let rendered = format!("{:?}", config.auth);
    assert!(!rendered.contains("super-secret"));
}

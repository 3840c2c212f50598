//! CLI contract tests.

use std::fs;
use std::path::PathBuf;

fn main_source() -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/main.rs");
    let source_result = fs::read_to_string(&path);
    assert!(source_result.is_ok());
    match source_result {
        Ok(source) => source,
        Err(err) => panic!("main source should load from {}: {err}", path.display()),
    }
}

#[test]
fn main_defines_primary_subcommands() {
    let source = main_source();
    assert!(source.contains("Serve"));
    assert!(source.contains("Product"));
    assert!(source.contains("Stats"));
    assert!(source.contains("CheckConfig"));
}

#[test]
fn main_loads_dotenv_before_config() {
    let source = main_source();
    let dotenv = source.find("dotenvy::dotenv");
    let config = source.find("Config::load");
    assert!(dotenv.is_some() && config.is_some());
    assert!(dotenv < config);
}

fn write_config(dir: &std::path::Path, body: &str) -> PathBuf {
    let path = dir.join("desk.toml");
    let written = fs::write(&path, body);
    assert!(written.is_ok(), "config should be written");
    path
}

fn inquirydesk() -> assert_cmd::Command {
    match assert_cmd::Command::cargo_bin("inquirydesk") {
        Ok(cmd) => cmd,
        Err(err) => panic!("binary should be built: {err}"),
    }
}

#[test]
fn check_config_prints_effective_settings() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = write_config(
        tmp.path(),
        r#"
[server]
page_size = 25

[database]
path = "/tmp/inquirydesk-cli-test.db"

[auth]
admin_tokens = ["adm"]

[inquiries]
terminal_policy = "locked"
"#,
    );

    let output = inquirydesk()
        .arg("check-config")
        .env("INQUIRYDESK_CONFIG", &path)
        .env_remove("INQUIRYDESK_PAGE_SIZE")
        .env_remove("INQUIRYDESK_TERMINAL_POLICY")
        .output()
        .expect("command should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("page_size: 25"));
    assert!(stdout.contains("terminal_policy: Locked"));
    assert!(stdout.contains("tokens: 1 admin, 0 customer"));
    assert!(!stdout.contains("adm\n"), "tokens must not be printed");
}

#[test]
fn check_config_fails_on_invalid_file() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = write_config(tmp.path(), "[server]\npage_size = 0\n");

    inquirydesk()
        .arg("check-config")
        .env("INQUIRYDESK_CONFIG", &path)
        .env_remove("INQUIRYDESK_PAGE_SIZE")
        .assert()
        .failure();
}

use std::fs;
use std::process::{Command, Output};

/// Demo binary with a clean environment: text output, default settings,
/// warnings-only logging.
fn cmdkit() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_cmdkit-demo"));
    command
        .env("CMDKIT_FORMAT", "text")
        .env_remove("CMDKIT_CONFIG")
        .env_remove("RUST_LOG");
    command
}

fn run(args: &[&str]) -> Output {
    cmdkit().args(args).output().expect("failed to run cmdkit-demo")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ---------------------------------------------------------------------------
// Successful commands
// ---------------------------------------------------------------------------

#[test]
fn user_list_prints_table() {
    let output = run(&["user", "list"]);

    assert_eq!(output.status.code(), Some(0));
    let out = stdout(&output);
    assert!(out.starts_with("Id | Login | Email"));
    assert!(out.contains("admin"));
    assert!(out.contains("jdoe"));
}

#[test]
fn alias_and_search_filter() {
    let output = run(&["users", "list", "--search", "jd"]);

    assert_eq!(output.status.code(), Some(0));
    let out = stdout(&output);
    assert!(out.contains("jdoe"));
    assert!(!out.contains("admin"));
}

#[test]
fn organization_option_reaches_subcommand_through_context() {
    let output = run(&["--organization-id", "1", "user", "list"]);

    assert_eq!(output.status.code(), Some(0));
    let out = stdout(&output);
    assert!(out.contains("admin"));
    assert!(!out.contains("jdoe"));
}

#[test]
fn user_info_prints_inherited_and_nested_fields() {
    let output = run(&["user", "info", "--id", "2"]);

    assert_eq!(output.status.code(), Some(0));
    let out = stdout(&output);
    assert!(out.contains("Login: jdoe"));
    assert!(out.contains("Email: jdoe@example.com"));
    assert!(out.contains(" 1) Name: Viewer"));
    assert!(out.contains(" 2) Name: Reporter"));
}

#[test]
fn user_info_json_output() {
    let output = cmdkit()
        .env("CMDKIT_FORMAT", "json")
        .args(["user", "info", "--login", "admin"])
        .output()
        .expect("failed to run cmdkit-demo");

    assert_eq!(output.status.code(), Some(0));
    let record: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(record["id"], 1);
    assert_eq!(record["roles"][0]["name"], "Administrator");
    assert!(record.get("organization_id").is_none());
}

#[test]
fn create_masks_password_in_audit_log() {
    let output = cmdkit()
        .env("RUST_LOG", "info")
        .args(["user", "create", "--login", "newbie", "--password", "secret123"])
        .output()
        .expect("failed to run cmdkit-demo");

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output).trim(), "User newbie created.");
    let logs = stderr(&output);
    assert!(logs.contains("Called with options:"));
    assert!(logs.contains("password => ***"));
    assert!(!logs.contains("secret123"));
}

#[test]
fn help_exits_successfully() {
    let output = run(&["user", "create", "--help"]);

    assert_eq!(output.status.code(), Some(0));
    let out = stdout(&output);
    assert!(out.contains("--login"));
    assert!(out.contains("Grant administrator role (default: no)"));
}

// ---------------------------------------------------------------------------
// Usage errors
// ---------------------------------------------------------------------------

#[test]
fn validation_failure_exits_with_usage_code() {
    let output = run(&["user", "info"]);

    assert_eq!(output.status.code(), Some(64));
    let err = stderr(&output);
    assert!(err.contains("Error: One of options --id, --login is required."));
    assert!(err.contains("See: 'cmdkit user info --help'"));
}

#[test]
fn missing_required_option_exits_with_usage_code() {
    let output = run(&["user", "create", "--password", "x"]);

    assert_eq!(output.status.code(), Some(64));
    assert!(stderr(&output).contains("Missing arguments for --login."));
}

#[test]
fn bad_number_exits_with_usage_code() {
    let output = run(&["user", "info", "--id", "two"]);

    assert_eq!(output.status.code(), Some(64));
    assert!(stderr(&output).contains("option --id: numeric value is required"));
}

#[test]
fn group_without_subcommand_exits_with_usage_code() {
    let output = run(&["user"]);

    assert_eq!(output.status.code(), Some(64));
    assert!(stderr(&output).contains("See: 'cmdkit user --help'"));
}

// ---------------------------------------------------------------------------
// Execution faults
// ---------------------------------------------------------------------------

#[test]
fn missing_user_uses_plugin_exit_code() {
    let output = run(&["user", "info", "--id", "99"]);

    assert_eq!(output.status.code(), Some(67));
    assert_eq!(stderr(&output).trim(), "Error: user 99 not found");
}

#[test]
fn other_faults_fall_back_to_default_handler() {
    let output = run(&["user", "create", "--login", "admin"]);

    assert_eq!(output.status.code(), Some(70));
    assert!(stderr(&output).contains("Error: login admin is already taken"));
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[test]
fn settings_file_changes_program_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cmdkit.yml");
    fs::write(&path, "program_name: hammer\n").unwrap();

    let output = cmdkit()
        .env("CMDKIT_CONFIG", &path)
        .args(["user", "info"])
        .output()
        .expect("failed to run cmdkit-demo");

    assert_eq!(output.status.code(), Some(64));
    assert!(stderr(&output).contains("See: 'hammer user info --help'"));
}

#[test]
fn settings_can_disable_audit_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cmdkit.yml");
    fs::write(&path, "audit_options: false\nlog_filter: info\n").unwrap();

    let output = cmdkit()
        .env("CMDKIT_CONFIG", &path)
        .args(["user", "list"])
        .output()
        .expect("failed to run cmdkit-demo");

    assert_eq!(output.status.code(), Some(0));
    assert!(!stderr(&output).contains("Called with options"));
}

#[test]
fn unreadable_settings_file_fails_fast() {
    let dir = tempfile::tempdir().unwrap();

    let output = cmdkit()
        .env("CMDKIT_CONFIG", dir.path().join("absent.yml"))
        .args(["user", "list"])
        .output()
        .expect("failed to run cmdkit-demo");

    assert_eq!(output.status.code(), Some(70));
    assert!(stderr(&output).contains("failed to load settings"));
}

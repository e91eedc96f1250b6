//! Integration tests for the alembic-provider CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get the alembic-provider binary
#[allow(deprecated)]
fn provider_cmd() -> Command {
    let mut cmd = Command::cargo_bin("alembic-provider").unwrap();
    cmd.env_remove("ALEMBIC_PROVIDER_CONFIG")
        .env_remove("ALEMBIC_PROVIDER_STATE")
        .env_remove("ALEMBIC_PROVIDER_DEBUG")
        .env_remove("ALEMBIC_PROVIDER_LOG_LEVEL");
    cmd
}

/// Stand-in for alembic: keeps the applied revision in `revision`, the
/// newest revision in `head`, and logs every invocation to `calls.log`.
const STUB: &str = r#"
echo "$@" >> calls.log
case "$1" in
  current)
    if [ -s revision ]; then echo "$(cat revision) (head)"; fi
    ;;
  upgrade|stamp)
    if [ -f fail ]; then echo "migration exploded" >&2; exit 1; fi
    shift
    if [ "$1" = "--tag" ]; then shift 2; fi
    target="$1"
    if [ "$target" = "head" ]; then target="$(cat head)"; fi
    echo "$target" > revision
    ;;
  show)
    echo "Rev: $(cat head) (head)"
    echo "Parent: <base>"
    ;;
esac
"#;

/// A project directory with the stub tool and a one-resource config.
fn project(resource: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("alembic.ini"), "[alembic]\n").unwrap();
    fs::write(dir.path().join("stub.sh"), STUB).unwrap();
    fs::write(dir.path().join("head"), "abc123\n").unwrap();

    let config = format!(
        "[provider]\nproject_root = \".\"\ncommand = [\"sh\", {:?}]\n\n{}",
        dir.path().join("stub.sh").display().to_string(),
        resource
    );
    fs::write(dir.path().join("alembic-provider.toml"), config).unwrap();
    dir
}

fn run_in(dir: &Path, args: &[&str]) -> assert_cmd::assert::Assert {
    provider_cmd()
        .current_dir(dir)
        .args(["-c", "alembic-provider.toml"])
        .args(args)
        .assert()
}

fn stored_revision(dir: &Path, name: &str) -> String {
    let content = fs::read_to_string(dir.join("alembic-provider.state.json")).unwrap();
    let state: serde_json::Value = serde_json::from_str(&content).unwrap();
    state["resources"][name]["revision"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

const SCHEMA: &str = "[resources.schema]\ntarget = \"head\"\n";

#[test]
fn test_help_command() {
    provider_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: alembic-provider"))
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("refresh"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("import"));
}

#[test]
fn test_version_command() {
    provider_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("Version"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_config_fails() {
    let dir = TempDir::new().unwrap();
    run_in(dir.path(), &["plan"])
        .failure()
        .stderr(predicate::str::contains("alembic-provider.toml"));
}

#[test]
fn test_invalid_project_root_fails() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("alembic-provider.toml"),
        "[provider]\nproject_root = \"missing\"\n",
    )
    .unwrap();

    run_in(dir.path(), &["plan"])
        .failure()
        .stderr(predicate::str::contains("project_root"));
}

#[test]
fn test_state_without_file_is_empty() {
    let dir = TempDir::new().unwrap();
    run_in(dir.path(), &["state", "--json"])
        .success()
        .stdout(predicate::str::contains("{}"));
}

#[cfg(unix)]
#[test]
fn test_apply_plan_drift_cycle() {
    let dir = project(SCHEMA);

    run_in(dir.path(), &["apply"]).success();
    assert_eq!(stored_revision(dir.path(), "schema"), "abc123");

    run_in(dir.path(), &["plan", "--detailed-exitcode"])
        .code(0)
        .stdout(predicate::str::contains("No changes"));

    // A new migration lands; head now resolves past the applied revision.
    fs::write(dir.path().join("head"), "def456\n").unwrap();
    run_in(dir.path(), &["plan", "--detailed-exitcode"])
        .code(2)
        .stdout(predicate::str::contains("def456 -> head"));

    // Plan refreshes in memory only.
    assert_eq!(stored_revision(dir.path(), "schema"), "abc123");

    run_in(dir.path(), &["apply"]).success();
    assert_eq!(stored_revision(dir.path(), "schema"), "def456");

    let calls = fs::read_to_string(dir.path().join("calls.log")).unwrap();
    assert_eq!(calls.lines().filter(|l| l.starts_with("upgrade")).count(), 2);
}

#[cfg(unix)]
#[test]
fn test_apply_is_noop_when_in_sync() {
    let dir = project(SCHEMA);

    run_in(dir.path(), &["apply"]).success();
    run_in(dir.path(), &["apply"])
        .success()
        .stdout(predicate::str::contains("up to date"));

    let calls = fs::read_to_string(dir.path().join("calls.log")).unwrap();
    assert_eq!(calls.lines().filter(|l| l.starts_with("upgrade")).count(), 1);
}

#[cfg(unix)]
#[test]
fn test_apply_passes_tag_and_extras() {
    let dir = project(
        "[resources.schema]\ntarget = \"abc123\"\ntag = \"t1\"\n\n[resources.schema.extra]\na = \"1\"\nb = \"2\"\n",
    );

    run_in(dir.path(), &["apply", "schema"]).success();

    let calls = fs::read_to_string(dir.path().join("calls.log")).unwrap();
    assert!(calls.lines().any(|l| l == "-x a=1 -x b=2 upgrade --tag t1 abc123"));
}

#[cfg(unix)]
#[test]
fn test_stamp_resource() {
    let dir = project("[resources.baseline]\nkind = \"stamp\"\ntarget = \"0f0f0f\"\n");

    run_in(dir.path(), &["apply"]).success();
    assert_eq!(stored_revision(dir.path(), "baseline"), "0f0f0f");

    let calls = fs::read_to_string(dir.path().join("calls.log")).unwrap();
    assert!(calls.lines().any(|l| l == "stamp 0f0f0f"));
}

#[cfg(unix)]
#[test]
fn test_failed_upgrade_reports_tool_output() {
    let dir = project(SCHEMA);
    fs::write(dir.path().join("fail"), "").unwrap();

    run_in(dir.path(), &["apply"])
        .failure()
        .stderr(predicate::str::contains("alembic upgrade failed"))
        .stderr(predicate::str::contains("migration exploded"));

    assert!(!dir.path().join("alembic-provider.state.json").exists());
}

#[cfg(unix)]
#[test]
fn test_unknown_resource_fails() {
    let dir = project(SCHEMA);
    run_in(dir.path(), &["apply", "nope"])
        .failure()
        .stderr(predicate::str::contains("not declared"));
}

#[cfg(unix)]
#[test]
fn test_import_then_refresh() {
    let dir = project(SCHEMA);
    fs::write(dir.path().join("revision"), "abc123\n").unwrap();

    run_in(dir.path(), &["import", "schema", "existing-id"]).success();
    assert_eq!(stored_revision(dir.path(), "schema"), "");

    run_in(dir.path(), &["refresh"]).success();
    assert_eq!(stored_revision(dir.path(), "schema"), "abc123");

    run_in(dir.path(), &["state", "schema", "--json"])
        .success()
        .stdout(predicate::str::contains("existing-id"));

    run_in(dir.path(), &["import", "schema", "other-id"])
        .failure()
        .stderr(predicate::str::contains("already managed"));
}

#[cfg(unix)]
#[test]
fn test_delete_forgets_without_touching_database() {
    let dir = project(SCHEMA);
    run_in(dir.path(), &["apply"]).success();
    let before = fs::read_to_string(dir.path().join("calls.log")).unwrap();

    run_in(dir.path(), &["delete", "schema"])
        .success()
        .stdout(predicate::str::contains("does not roll back"));

    // Idempotent
    run_in(dir.path(), &["delete", "schema"]).success();

    let after = fs::read_to_string(dir.path().join("calls.log")).unwrap();
    assert_eq!(before, after);
    assert!(dir.path().join("revision").exists());

    run_in(dir.path(), &["state", "--json"])
        .success()
        .stdout(predicate::str::contains("schema").not());
}

#[cfg(unix)]
#[test]
fn test_state_json_redacts_environment() {
    let dir = project(
        "[resources.schema]\ntarget = \"head\"\n\n[resources.schema.environment]\nDATABASE_URL = \"postgresql://user:hunter2@db/app\"\n",
    );
    run_in(dir.path(), &["apply"]).success();

    run_in(dir.path(), &["state", "--json"])
        .success()
        .stdout(predicate::str::contains("DATABASE_URL"))
        .stdout(predicate::str::contains("hunter2").not());
}

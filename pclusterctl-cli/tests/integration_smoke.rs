//! Smoke tests to verify command wiring against stub pcluster executables

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command with an isolated config path and PATH
fn pclusterctl(path_dir: &Path, home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pclusterctl").unwrap();
    cmd.env_clear()
        .env("PATH", path_dir)
        .env("HOME", home.path())
        .env("PCLUSTERCTL_CONFIG", home.path().join("config.toml"));
    cmd
}

#[cfg(unix)]
fn write_stub(dir: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("pcluster");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

fn cluster_config(dir: &Path) -> String {
    let path = dir.join("cluster.yaml");
    std::fs::write(&path, "Region: us-west-2\n").unwrap();
    path.display().to_string()
}

// === Help Tests ===

#[test]
fn test_cluster_validate_help() {
    let mut cmd = Command::cargo_bin("pclusterctl").unwrap();
    cmd.arg("cluster").arg("validate").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Path to the cluster configuration YAML"));
}

#[test]
fn test_cluster_create_help() {
    let mut cmd = Command::cargo_bin("pclusterctl").unwrap();
    cmd.arg("cluster").arg("create").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Stop after a successful dry run"));
}

#[test]
fn test_doctor_help() {
    let mut cmd = Command::cargo_bin("pclusterctl").unwrap();
    cmd.arg("doctor").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Skip running `pcluster version`"));
}

// === Config Tests ===

#[test]
fn test_config_path_honours_override() {
    let home = TempDir::new().unwrap();
    let expected = home.path().join("config.toml").display().to_string();

    pclusterctl(home.path(), &home)
        .arg("config")
        .arg("path")
        .assert()
        .success()
        .stdout(predicate::str::contains(expected));
}

#[test]
fn test_config_init_then_get() {
    let home = TempDir::new().unwrap();

    pclusterctl(home.path(), &home)
        .args(["config", "init"])
        .assert()
        .success();

    pclusterctl(home.path(), &home)
        .args(["config", "get", "pcluster.binary"])
        .assert()
        .success()
        .stdout("pcluster\n");

    // second init without --force refuses
    pclusterctl(home.path(), &home)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

// === Cluster Tests ===

#[test]
fn test_missing_region_fails() {
    let home = TempDir::new().unwrap();
    let config = cluster_config(home.path());

    pclusterctl(home.path(), &home)
        .args(["cluster", "validate", "-n", "my-cluster", "-c", &config])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No region given"));
}

#[test]
fn test_missing_tool_reports_not_found() {
    let home = TempDir::new().unwrap();
    let config = cluster_config(home.path());

    pclusterctl(home.path(), &home)
        .args([
            "--json", "cluster", "validate", "-n", "my-cluster", "-c", &config, "--region",
            "us-west-2",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"exit_code\": 4"))
        .stderr(predicate::str::contains("not found on PATH"));
}

#[cfg(unix)]
#[test]
fn test_validate_succeeds_against_stub() {
    let home = TempDir::new().unwrap();
    let bin = TempDir::new().unwrap();
    let config = cluster_config(home.path());
    write_stub(
        bin.path(),
        r#"echo '{"message": "Request would have succeeded, but DryRun flag is set."}'"#,
    );

    pclusterctl(bin.path(), &home)
        .args([
            "cluster", "validate", "-n", "my-cluster", "-c", &config, "--region", "us-west-2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ dry run"))
        .stdout(predicate::str::contains("--dryrun true --region us-west-2"));
}

#[cfg(unix)]
#[test]
fn test_validate_fails_on_other_message() {
    let home = TempDir::new().unwrap();
    let bin = TempDir::new().unwrap();
    let config = cluster_config(home.path());
    write_stub(
        bin.path(),
        r#"echo '{"message": "Some validation error"}'
exit 1"#,
    );

    pclusterctl(bin.path(), &home)
        .args([
            "cluster", "validate", "-n", "my-cluster", "-c", &config, "--region", "us-west-2",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Some validation error"));
}

#[cfg(unix)]
#[test]
fn test_create_stops_after_validation_flag() {
    let home = TempDir::new().unwrap();
    let bin = TempDir::new().unwrap();
    let config = cluster_config(home.path());
    write_stub(
        bin.path(),
        r#"case "$*" in
  *--dryrun*) echo '{"message": "Request would have succeeded, but DryRun flag is set."}' ;;
  *) echo '{"message": "real create ran"}'; exit 3 ;;
esac"#,
    );

    pclusterctl(bin.path(), &home)
        .env("PCLUSTER_STOP_AFTER_VALIDATION", "1")
        .args([
            "--json", "cluster", "create", "-n", "my-cluster", "-c", &config, "--region",
            "us-west-2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("stopped_after_validation"))
        .stdout(predicate::str::contains("real create ran").not());
}

#[cfg(unix)]
#[test]
fn test_profile_flag_reaches_pcluster() {
    let home = TempDir::new().unwrap();
    let bin = TempDir::new().unwrap();
    write_stub(
        bin.path(),
        r#"printf '{"clusterName": "my-cluster", "clusterStatus": "CREATE_COMPLETE", "profile": "%s"}' "$AWS_PROFILE""#,
    );

    pclusterctl(bin.path(), &home)
        .args([
            "cluster", "describe", "-n", "my-cluster", "--region", "us-west-2", "--profile",
            "bio",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("my-cluster (us-west-2): CREATE_COMPLETE"))
        .stdout(predicate::str::contains("profile: bio"));
}

#[cfg(unix)]
#[test]
fn test_doctor_uses_configured_profile_and_env() {
    let home = TempDir::new().unwrap();
    let bin = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("config.toml"),
        "[pcluster]\nprofile = \"bio\"\n\n[env]\nAWS_RETRY_MODE = \"standard\"\n",
    )
    .unwrap();
    write_stub(
        bin.path(),
        r#"if [ "$AWS_PROFILE" = bio ] && [ "$AWS_RETRY_MODE" = standard ]; then
  echo '{"version": "3.9.1"}'
else
  echo '{"message": "wrong environment"}'; exit 1
fi"#,
    );

    pclusterctl(bin.path(), &home)
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("pcluster version 3.9.1"))
        .stdout(predicate::str::contains("written for pcluster").not());
}

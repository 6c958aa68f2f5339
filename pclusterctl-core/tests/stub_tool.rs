//! End-to-end checks against stub `pcluster` executables on a private PATH
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pclusterctl_core::env::{PROFILE_VAR, STOP_AFTER_VALIDATION_VAR};
use pclusterctl_core::invoker::EXIT_TOOL_MISSING;
use pclusterctl_core::{
    CallEnv, ClusterRequest, ParsedBody, Pcluster, ProvisionOptions, Provisioned, Termination,
    ToolEnv, ToolInvoker, DRY_RUN_SUCCESS_MESSAGE,
};
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

// Writing an executable while another test forks can leave it "text file busy"
static SERIAL: Mutex<()> = Mutex::const_new(());

fn write_stub(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("pcluster");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn env_with_path(dir: &Path) -> ToolEnv {
    ToolEnv::from_iter([("PATH", dir.display().to_string())])
}

fn request() -> ClusterRequest {
    ClusterRequest {
        name: "my-cluster".into(),
        config_path: PathBuf::from("/tmp/c.yaml"),
        region: "us-west-2".into(),
        profile: None,
    }
}

#[tokio::test]
async fn dry_run_against_accepting_stub() {
    let _guard = SERIAL.lock().await;
    let dir = TempDir::new().unwrap();
    write_stub(
        dir.path(),
        r#"echo "$*" >&2
echo '{"message": "Request would have succeeded, but DryRun flag is set."}'
exit 0"#,
    );

    let pcluster = Pcluster::new(ToolInvoker::new("pcluster", env_with_path(dir.path())));
    let result = pcluster
        .validate_dry_run(&request(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.status_message, DRY_RUN_SUCCESS_MESSAGE);
    assert_eq!(
        result.args(),
        [
            "create-cluster",
            "-n",
            "my-cluster",
            "-c",
            "/tmp/c.yaml",
            "--dryrun",
            "true",
            "--region",
            "us-west-2"
        ]
        .map(String::from)
        .as_slice()
    );
    // the child received the same vector
    assert_eq!(
        result.stderr,
        "create-cluster -n my-cluster -c /tmp/c.yaml --dryrun true --region us-west-2"
    );
}

#[tokio::test]
async fn dry_run_against_rejecting_stub() {
    let _guard = SERIAL.lock().await;
    let dir = TempDir::new().unwrap();
    write_stub(
        dir.path(),
        r#"echo '{"message": "Some validation error"}'
exit 1"#,
    );

    let pcluster = Pcluster::new(ToolInvoker::new("pcluster", env_with_path(dir.path())));
    let result = pcluster
        .validate_dry_run(&request(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.exit_code, 1);
    assert_eq!(result.status_message, "Some validation error");
}

#[tokio::test]
async fn missing_tool_is_reported_not_raised() {
    let dir = TempDir::new().unwrap();
    let invoker = ToolInvoker::new("pcluster", env_with_path(dir.path()));

    let result = invoker
        .invoke(
            vec!["version".into()],
            CallEnv::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.exit_code, EXIT_TOOL_MISSING);
    assert_eq!(result.termination, Termination::ToolMissing);
    assert!(result.stderr.contains("not found"));
    assert!(!result.success);
}

#[tokio::test]
async fn unparseable_stdout_is_tolerated() {
    let _guard = SERIAL.lock().await;
    let dir = TempDir::new().unwrap();
    write_stub(dir.path(), "echo 'Cluster creation started'\nexit 0");

    let pcluster = Pcluster::new(ToolInvoker::new("pcluster", env_with_path(dir.path())));
    let result = pcluster
        .create_real(&request(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(result.success);
    assert!(matches!(result.body, ParsedBody::Unparseable { .. }));
    assert!(result.body.to_map().is_empty());
    assert_eq!(result.stdout, "Cluster creation started");
}

#[tokio::test]
async fn structured_stdout_is_decoded_exactly() {
    let _guard = SERIAL.lock().await;
    let dir = TempDir::new().unwrap();
    write_stub(
        dir.path(),
        r#"echo '{"clusters": [{"clusterName": "a", "clusterStatus": "CREATE_COMPLETE"}]}'"#,
    );

    let pcluster = Pcluster::new(ToolInvoker::new("pcluster", env_with_path(dir.path())));
    let result = pcluster
        .list("us-west-2", None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        result.body,
        ParsedBody::Parsed(json!({"clusters": [{"clusterName": "a", "clusterStatus": "CREATE_COMPLETE"}]}))
    );
    assert_eq!(result.status_message, "");
}

#[tokio::test]
async fn profile_is_visible_to_child() {
    let _guard = SERIAL.lock().await;
    let dir = TempDir::new().unwrap();
    write_stub(dir.path(), r#"printf '{"message": "%s"}' "$AWS_PROFILE""#);

    let base = env_with_path(dir.path()).with_var(PROFILE_VAR, "parent");
    let invoker = ToolInvoker::new("pcluster", base);

    let with_profile = invoker
        .invoke(vec![], CallEnv::profile(Some("bio")), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(with_profile.status_message, "bio");

    let inherited = invoker
        .invoke(vec![], CallEnv::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(inherited.status_message, "parent");
}

#[tokio::test]
async fn hung_tool_times_out() {
    let _guard = SERIAL.lock().await;
    let dir = TempDir::new().unwrap();
    // exec so the kill reaches the sleeping process itself
    write_stub(dir.path(), "exec sleep 10");

    let mut path = dir.path().display().to_string();
    if let Some(system) = std::env::var_os("PATH") {
        path = format!("{}:{}", path, system.to_string_lossy());
    }
    let invoker = ToolInvoker::new("pcluster", ToolEnv::from_iter([("PATH", path)]))
        .with_deadline(Some(Duration::from_millis(200)));

    let result = invoker
        .invoke(vec![], CallEnv::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.termination, Termination::TimedOut { after_ms: 200 });
    assert!(!result.success);
}

#[tokio::test]
async fn provision_stops_after_validation_when_flagged() {
    let _guard = SERIAL.lock().await;
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("created");
    write_stub(
        dir.path(),
        &format!(
            r#"case "$*" in
  *--dryrun*) echo '{{"message": "Request would have succeeded, but DryRun flag is set."}}' ;;
  *) : > "{}" ;;
esac"#,
            marker.display()
        ),
    );

    let env = env_with_path(dir.path()).with_var(STOP_AFTER_VALIDATION_VAR, "1");
    let pcluster = Pcluster::new(ToolInvoker::new("pcluster", env));
    let outcome = pcluster
        .provision(&request(), ProvisionOptions::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(matches!(outcome, Provisioned::StoppedAfterValidation { .. }));
    assert!(!marker.exists(), "real create must not run");
}

/// Integration tests for the create/poll/exec/delete workflow
/// The cluster tests run against a real kind cluster
///
/// Run with: cargo test --test integration_workflow -- --ignored --test-threads=1
use pod_exec::kube::{KubeClient, PodOperations};
use pod_exec::{WorkflowConfig, WorkflowError};
use std::process::Command;
use std::time::Duration;
use test_utils::{KindCluster, POD_NAMESPACE};

/// Setup function that runs before each test
fn setup() -> KindCluster {
    // This is idempotent - safe to call for every test
    KindCluster::setup().expect("Failed to setup kind cluster")
}

fn test_config(pod_name: &str) -> WorkflowConfig {
    WorkflowConfig {
        pod_name: pod_name.to_string(),
        namespace: POD_NAMESPACE.to_string(),
        image: "nginx:alpine".to_string(),
        poll_interval: Duration::from_millis(500),
        poll_timeout: Some(Duration::from_secs(120)),
        ..WorkflowConfig::default()
    }
}

/// Deleted pods linger while terminating, so either outcome counts as gone
async fn assert_deleted(client: &KubeClient, name: &str) {
    match client.get_pod(POD_NAMESPACE, name).await {
        Ok(pod) => assert!(
            pod.metadata.deletion_timestamp.is_some(),
            "pod {} was not deleted",
            name
        ),
        Err(WorkflowError::Kubernetes(_)) => {}
        Err(other) => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_binary_rejects_missing_kubeconfig() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("fake-kubeconfig");

    let output = Command::new(env!("CARGO_BIN_EXE_pod-exec"))
        .arg("--kubeconfig")
        .arg(&missing)
        .env_remove("POLL_INTERVAL_MS")
        .output()
        .expect("Failed to run pod-exec");

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Configuration error"));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_binary_rejects_invalid_setting() {
    let output = Command::new(env!("CARGO_BIN_EXE_pod-exec"))
        .arg("--kubeconfig")
        .arg("./fake-kubeconfig")
        .env("POLL_INTERVAL_MS", "often")
        .output()
        .expect("Failed to run pod-exec");

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("POLL_INTERVAL_MS"));
}

#[tokio::test]
#[ignore] // Run explicitly with --ignored flag
async fn test_workflow_against_kind() -> anyhow::Result<()> {
    let cluster = setup();
    cluster.delete_pod(POD_NAMESPACE, "exec-it")?;
    println!("✓ Cluster ready: {}", cluster.context_name());

    let client = KubeClient::from_kubeconfig(cluster.kubeconfig_path()).await?;
    let config = WorkflowConfig {
        command: "ls -l /".to_string(),
        ..test_config("exec-it")
    };

    let mut out: Vec<u8> = Vec::new();
    let summary = pod_exec::run(&client, &config, None, &mut out).await?;

    assert_eq!(summary.pod, "exec-it");
    assert!(summary.polls >= 1);
    assert_eq!(summary.matches.len(), 1);
    assert!(summary.matches[0].ends_with("media"));

    let printed = String::from_utf8(out)?;
    assert!(printed.starts_with("Creating pod\nexec-it\nWaiting for pod readiness\n"));
    assert!(printed.contains("Pod phase Running\n"));
    assert!(printed.ends_with("Deleting pod\n"));

    assert_deleted(&client, "exec-it").await;
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_failed_command_still_deletes_pod() -> anyhow::Result<()> {
    let cluster = setup();
    cluster.delete_pod(POD_NAMESPACE, "exec-fail-it")?;

    let client = KubeClient::from_kubeconfig(cluster.kubeconfig_path()).await?;
    let config = WorkflowConfig {
        command: "exit 3".to_string(),
        ..test_config("exec-fail-it")
    };

    let mut out: Vec<u8> = Vec::new();
    let result = pod_exec::run(&client, &config, None, &mut out).await;

    assert!(matches!(result, Err(WorkflowError::Exec(_))));
    assert_deleted(&client, "exec-fail-it").await;
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_existing_pod_is_left_alone() -> anyhow::Result<()> {
    let cluster = setup();
    cluster.delete_pod(POD_NAMESPACE, "exec-conflict-it")?;

    let client = KubeClient::from_kubeconfig(cluster.kubeconfig_path()).await?;
    let config = test_config("exec-conflict-it");

    // Occupy the name before the workflow runs
    let mut out: Vec<u8> = Vec::new();
    client
        .create_pod(
            POD_NAMESPACE,
            &pod_exec::workflow::pod_descriptor(&config),
        )
        .await?;

    let result = pod_exec::run(&client, &config, None, &mut out).await;

    // Create failed, so the workflow never owned the pod and must not delete it
    assert!(matches!(result, Err(WorkflowError::Kubernetes(_))));
    assert!(cluster.pod_exists(POD_NAMESPACE, "exec-conflict-it")?);

    cluster.delete_pod(POD_NAMESPACE, "exec-conflict-it")?;
    Ok(())
}

#[test]
fn test_binary_rejects_zero_attempt_budget() {
    let output = Command::new(env!("CARGO_BIN_EXE_pod-exec"))
        .arg("--kubeconfig")
        .arg("./fake-kubeconfig")
        .env_remove("POLL_INTERVAL_MS")
        .env("POLL_MAX_ATTEMPTS", "0")
        .output()
        .expect("Failed to run pod-exec");

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("greater than zero"));
}

use anyhow::{Context, Result};
/// Test utilities for integration tests
/// Manages the kind cluster the exec workflow runs against
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::NamedTempFile;

pub const CLUSTER_NAME: &str = "pod-exec";
pub const POD_NAMESPACE: &str = "nginx";

/// Test fixture that manages kind cluster lifecycle
pub struct KindCluster {
    cluster_name: String,
    kubeconfig: NamedTempFile,
}

impl KindCluster {
    /// Get or create the test cluster
    /// Idempotent - safe to call multiple times
    pub fn setup() -> Result<Self> {
        if !cluster_exists(CLUSTER_NAME)? {
            println!("Creating kind cluster: {}", CLUSTER_NAME);
            run_kind(&["create", "cluster", "--name", CLUSTER_NAME, "--wait", "60s"])?;
        } else {
            println!("Using existing kind cluster: {}", CLUSTER_NAME);
        }

        let kubeconfig = export_kubeconfig(CLUSTER_NAME)?;
        let cluster = Self {
            cluster_name: CLUSTER_NAME.to_string(),
            kubeconfig,
        };
        cluster.ensure_namespace(POD_NAMESPACE)?;

        Ok(cluster)
    }

    /// Kubeconfig file scoped to this cluster, suitable for --kubeconfig
    pub fn kubeconfig_path(&self) -> &Path {
        self.kubeconfig.path()
    }

    /// Get cluster name for kubectl context
    pub fn context_name(&self) -> String {
        format!("kind-{}", self.cluster_name)
    }

    /// Create the namespace unless it is already there
    pub fn ensure_namespace(&self, name: &str) -> Result<()> {
        let exists = self
            .kubectl(&["get", "namespace", name])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .context("Failed to query namespace")?
            .success();

        if exists {
            return Ok(());
        }

        println!("Creating namespace: {}", name);
        let status = self
            .kubectl(&["create", "namespace", name])
            .stdout(Stdio::null())
            .status()
            .context("Failed to create namespace")?;

        if !status.success() {
            anyhow::bail!("Failed to create namespace: {}", name);
        }

        Ok(())
    }

    /// Whether a pod with this name currently exists
    pub fn pod_exists(&self, namespace: &str, name: &str) -> Result<bool> {
        let output = self
            .kubectl(&[
                "get",
                "pod",
                name,
                "-n",
                namespace,
                "--ignore-not-found",
                "-o",
                "name",
            ])
            .output()
            .context("Failed to query pod")?;

        if !output.status.success() {
            anyhow::bail!("kubectl get pod failed for {}/{}", namespace, name);
        }

        Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
    }

    /// Remove a pod left over from an earlier run and wait until it is gone
    pub fn delete_pod(&self, namespace: &str, name: &str) -> Result<()> {
        let status = self
            .kubectl(&[
                "delete",
                "pod",
                name,
                "-n",
                namespace,
                "--ignore-not-found=true",
                "--wait=true",
            ])
            .stdout(Stdio::null())
            .status()
            .context("Failed to delete pod")?;

        if !status.success() {
            anyhow::bail!("Failed to delete pod {}/{}", namespace, name);
        }

        Ok(())
    }

    fn kubectl(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("kubectl");
        cmd.arg("--kubeconfig").arg(self.kubeconfig.path()).args(args);
        cmd
    }
}

/// Check if cluster exists
fn cluster_exists(name: &str) -> Result<bool> {
    let output = Command::new("kind")
        .args(["get", "clusters"])
        .output()
        .context("Failed to execute 'kind get clusters'")?;

    if !output.status.success() {
        return Ok(false);
    }

    let clusters = String::from_utf8_lossy(&output.stdout);
    Ok(clusters.lines().any(|line| line.trim() == name))
}

/// Write the cluster's kubeconfig to a temp file
fn export_kubeconfig(name: &str) -> Result<NamedTempFile> {
    let output = Command::new("kind")
        .args(["get", "kubeconfig", "--name", name])
        .output()
        .context("Failed to execute 'kind get kubeconfig'")?;

    if !output.status.success() {
        anyhow::bail!("kind get kubeconfig failed for cluster {}", name);
    }

    let mut file = NamedTempFile::new().context("Failed to create kubeconfig file")?;
    file.write_all(&output.stdout)
        .context("Failed to write kubeconfig file")?;
    file.flush()?;

    Ok(file)
}

fn run_kind(args: &[&str]) -> Result<()> {
    let status = Command::new("kind")
        .args(args)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .with_context(|| format!("Failed to execute 'kind {}'", args.join(" ")))?;

    if !status.success() {
        anyhow::bail!("kind {} failed", args.join(" "));
    }

    Ok(())
}

use crate::error::{WorkflowError, WorkflowResult};
use crate::kube::exec::{exec_params, relay, shell_command};
use crate::kube::traits::{ExecInput, PodOperations};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::{DeleteParams, PostParams},
    config::{KubeConfigOptions, Kubeconfig},
    Api, Client, Config,
};
use std::path::Path;
use tokio::io::AsyncWrite;

/// Real Kubernetes client implementation using kube-rs
pub struct KubeClient {
    client: Client,
}

impl KubeClient {
    /// Build a client from the current context of a kubeconfig file
    pub async fn from_kubeconfig(path: &Path) -> WorkflowResult<Self> {
        let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
            WorkflowError::Config(format!(
                "Failed to read kubeconfig file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| {
                WorkflowError::Config(format!(
                    "Failed to load config from kubeconfig {}: {}",
                    path.display(),
                    e
                ))
            })?;

        let client = Client::try_from(config)
            .map_err(|e| WorkflowError::Client(format!("Failed to create K8s client: {}", e)))?;

        Ok(Self { client })
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl PodOperations for KubeClient {
    async fn create_pod(&self, namespace: &str, pod: &Pod) -> WorkflowResult<Pod> {
        let created = self
            .pods(namespace)
            .create(&PostParams::default(), pod)
            .await?;
        Ok(created)
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> WorkflowResult<Pod> {
        let pod = self.pods(namespace).get(name).await?;
        Ok(pod)
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> WorkflowResult<()> {
        // Deletion is asynchronous on the server; either the pod or a
        // Status comes back and neither carries anything we need.
        self.pods(namespace)
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }

    async fn exec_in_pod(
        &self,
        namespace: &str,
        name: &str,
        command: &str,
        stdin: Option<ExecInput>,
        stdout: &mut (dyn AsyncWrite + Send + Unpin),
        stderr: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> WorkflowResult<()> {
        let params = exec_params(stdin.is_some());
        let attached = self
            .pods(namespace)
            .exec(name, shell_command(command), &params)
            .await
            .map_err(|e| WorkflowError::Exec(format!("Failed to open exec stream: {}", e)))?;

        relay(attached, stdin, stdout, stderr).await
    }
}

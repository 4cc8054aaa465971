use crate::error::WorkflowResult;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use tokio::io::{AsyncRead, AsyncWrite};

/// Local source forwarded to the remote command's stdin
pub type ExecInput = Box<dyn AsyncRead + Send + Unpin>;

/// Abstraction for pod operations to enable testing with mocks
#[async_trait]
pub trait PodOperations: Send + Sync {
    /// Create a pod in a namespace, returning the server's copy
    async fn create_pod(&self, namespace: &str, pod: &Pod) -> WorkflowResult<Pod>;

    /// Get a specific pod by name in a namespace
    async fn get_pod(&self, namespace: &str, name: &str) -> WorkflowResult<Pod>;

    /// Delete a pod by name
    async fn delete_pod(&self, namespace: &str, name: &str) -> WorkflowResult<()>;

    /// Run `sh -c <command>` inside the pod with a TTY and block until it exits.
    ///
    /// When `stdin` is None the remote side is told not to expect input.
    async fn exec_in_pod(
        &self,
        namespace: &str,
        name: &str,
        command: &str,
        stdin: Option<ExecInput>,
        stdout: &mut (dyn AsyncWrite + Send + Unpin),
        stderr: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> WorkflowResult<()>;
}

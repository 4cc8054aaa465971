use crate::error::{WorkflowError, WorkflowResult};
use crate::kube::exec::{exec_params, shell_command};
use crate::kube::traits::{ExecInput, PodOperations};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, PodStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// One call made against the mock, in the order it was received
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodCall {
    Create {
        namespace: String,
        name: String,
    },
    Get {
        namespace: String,
        name: String,
    },
    Delete {
        namespace: String,
        name: String,
    },
    Exec {
        namespace: String,
        name: String,
        command: Vec<String>,
        stdin: bool,
        tty: bool,
    },
}

#[derive(Default)]
struct Failures {
    create: Option<String>,
    /// Fail every get after this many have succeeded
    get_after: Option<usize>,
    delete: Option<String>,
    exec: Option<String>,
}

#[derive(Default)]
struct MockState {
    pods: HashMap<String, Pod>,
    phases: HashMap<String, VecDeque<String>>,
    calls: Vec<PodCall>,
    gets: usize,
    exec_output: Vec<u8>,
    failures: Failures,
}

/// Mock implementation of PodOperations for unit testing
#[derive(Clone)]
pub struct MockPodOperations {
    state: Arc<Mutex<MockState>>,
}

impl MockPodOperations {
    /// Create a new mock with no pods
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Add a pod to the mock store
    pub fn add_pod(&self, namespace: &str, pod: Pod) {
        let name = pod.metadata.name.clone().unwrap_or_default();
        let key = Self::make_key(namespace, &name);
        self.state.lock().unwrap().pods.insert(key, pod);
    }

    /// Helper to create a test pod, optionally with a status phase
    pub fn create_test_pod(name: &str, namespace: &str, phase: Option<&str>) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                resource_version: Some("1".to_string()),
                ..Default::default()
            },
            status: phase.map(|phase| PodStatus {
                phase: Some(phase.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Phases returned by successive gets; the last one repeats forever
    pub fn script_phases(&self, namespace: &str, name: &str, phases: &[&str]) {
        let key = Self::make_key(namespace, name);
        self.state
            .lock()
            .unwrap()
            .phases
            .insert(key, phases.iter().map(|p| p.to_string()).collect());
    }

    /// Bytes the remote command writes to stdout
    pub fn set_exec_output(&self, output: &str) {
        self.state.lock().unwrap().exec_output = output.as_bytes().to_vec();
    }

    pub fn fail_create(&self, message: &str) {
        self.state.lock().unwrap().failures.create = Some(message.to_string());
    }

    /// Let `successes` gets through, then fail every later one
    pub fn fail_get_after(&self, successes: usize) {
        self.state.lock().unwrap().failures.get_after = Some(successes);
    }

    pub fn fail_delete(&self, message: &str) {
        self.state.lock().unwrap().failures.delete = Some(message.to_string());
    }

    pub fn fail_exec(&self, message: &str) {
        self.state.lock().unwrap().failures.exec = Some(message.to_string());
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<PodCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn contains_pod(&self, namespace: &str, name: &str) -> bool {
        let key = Self::make_key(namespace, name);
        self.state.lock().unwrap().pods.contains_key(&key)
    }

    fn make_key(namespace: &str, name: &str) -> String {
        format!("{}/{}", namespace, name)
    }
}

impl Default for MockPodOperations {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PodOperations for MockPodOperations {
    async fn create_pod(&self, namespace: &str, pod: &Pod) -> WorkflowResult<Pod> {
        let name = pod
            .metadata
            .name
            .clone()
            .ok_or_else(|| WorkflowError::Kubernetes("Pod is missing a name".to_string()))?;
        let key = Self::make_key(namespace, &name);
        let mut state = self.state.lock().unwrap();

        state.calls.push(PodCall::Create {
            namespace: namespace.to_string(),
            name: name.clone(),
        });

        if let Some(message) = &state.failures.create {
            return Err(WorkflowError::Kubernetes(message.clone()));
        }

        if state.pods.contains_key(&key) {
            return Err(WorkflowError::Kubernetes(format!(
                "pods \"{}\" already exists",
                name
            )));
        }

        // Server-assigned fields
        let mut created = pod.clone();
        created.metadata.namespace = Some(namespace.to_string());
        created.metadata.resource_version = Some("1".to_string());
        created.status = Some(PodStatus {
            phase: Some("Pending".to_string()),
            ..Default::default()
        });

        state.pods.insert(key, created.clone());
        Ok(created)
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> WorkflowResult<Pod> {
        let key = Self::make_key(namespace, name);
        let mut state = self.state.lock().unwrap();

        state.calls.push(PodCall::Get {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });

        if state.failures.get_after.is_some_and(|n| state.gets >= n) {
            return Err(WorkflowError::Kubernetes(
                "the server is currently unable to handle the request".to_string(),
            ));
        }
        state.gets += 1;

        let next_phase = state.phases.get_mut(&key).and_then(|queue| {
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        });

        let pod = state
            .pods
            .get_mut(&key)
            .ok_or_else(|| WorkflowError::Kubernetes(format!("Pod not found: {}", key)))?;

        if let Some(phase) = next_phase {
            pod.status.get_or_insert_with(PodStatus::default).phase = Some(phase);
        }

        Ok(pod.clone())
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> WorkflowResult<()> {
        let key = Self::make_key(namespace, name);
        let mut state = self.state.lock().unwrap();

        state.calls.push(PodCall::Delete {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });

        if let Some(message) = &state.failures.delete {
            return Err(WorkflowError::Kubernetes(message.clone()));
        }

        state
            .pods
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| WorkflowError::Kubernetes(format!("Pod not found: {}", key)))
    }

    async fn exec_in_pod(
        &self,
        namespace: &str,
        name: &str,
        command: &str,
        stdin: Option<ExecInput>,
        stdout: &mut (dyn AsyncWrite + Send + Unpin),
        _stderr: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> WorkflowResult<()> {
        let key = Self::make_key(namespace, name);
        let params = exec_params(stdin.is_some());

        // The lock is released before writing to the caller's sink
        let output = {
            let mut state = self.state.lock().unwrap();

            state.calls.push(PodCall::Exec {
                namespace: namespace.to_string(),
                name: name.to_string(),
                command: shell_command(command),
                stdin: params.stdin,
                tty: params.tty,
            });

            if let Some(message) = &state.failures.exec {
                return Err(WorkflowError::Exec(message.clone()));
            }

            if !state.pods.contains_key(&key) {
                return Err(WorkflowError::Exec(format!("Pod not found: {}", key)));
            }

            state.exec_output.clone()
        };

        stdout.write_all(&output).await?;
        stdout.flush().await?;
        Ok(())
    }
}

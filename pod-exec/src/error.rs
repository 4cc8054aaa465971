use std::process::ExitCode;
use thiserror::Error;

pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Kubernetes error: {0}")]
    Kubernetes(String),

    #[error("Exec error: {0}")]
    Exec(String),

    #[error("Pod {pod} did not become ready after {attempts} checks")]
    ReadinessTimeout { pod: String, attempts: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkflowError {
    /// Process exit code reported by the binary for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            WorkflowError::Config(_) => 2,
            WorkflowError::Client(_) => 3,
            WorkflowError::Kubernetes(_) => 4,
            WorkflowError::Exec(_) => 5,
            WorkflowError::ReadinessTimeout { .. } => 6,
            WorkflowError::Io(_) => 7,
        }
    }
}

impl From<WorkflowError> for ExitCode {
    fn from(err: WorkflowError) -> Self {
        ExitCode::from(err.exit_code())
    }
}

impl From<kube::Error> for WorkflowError {
    fn from(err: kube::Error) -> Self {
        WorkflowError::Kubernetes(err.to_string())
    }
}

use crate::error::{WorkflowError, WorkflowResult};
use crate::readiness::PollPolicy;
use clap::Parser;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Create a pod, run a command in it, scan the output, then delete the pod
#[derive(Parser, Debug)]
#[command(version)]
pub struct Cli {
    #[arg(
        long,
        value_hint = clap::ValueHint::FilePath,
        help = "(optional) absolute path to the kubeconfig file, defaults to ~/.kube/config"
    )]
    pub kubeconfig: Option<PathBuf>,
}

/// Outcome of kubeconfig path resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KubeconfigPath {
    /// Path given explicitly with --kubeconfig
    Explicit(PathBuf),
    /// Fallback under the user's home directory
    Default(PathBuf),
    /// No flag and no home directory to fall back on
    NoDefault,
}

impl KubeconfigPath {
    pub fn into_path(self) -> WorkflowResult<PathBuf> {
        match self {
            KubeconfigPath::Explicit(path) | KubeconfigPath::Default(path) => Ok(path),
            KubeconfigPath::NoDefault => Err(WorkflowError::Config(
                "no home directory found, pass --kubeconfig explicitly".to_string(),
            )),
        }
    }
}

/// Resolve which kubeconfig file to load.
///
/// The home directory is passed in rather than read from the process so the
/// resolution stays a pure function of its inputs.
pub fn resolve_kubeconfig(flag: Option<PathBuf>, home: Option<&Path>) -> KubeconfigPath {
    match (flag, home) {
        (Some(path), _) if !path.as_os_str().is_empty() => KubeconfigPath::Explicit(path),
        (_, Some(home)) if !home.as_os_str().is_empty() => {
            KubeconfigPath::Default(home.join(".kube").join("config"))
        }
        _ => KubeconfigPath::NoDefault,
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub pod_name: String,
    pub namespace: String,
    pub container_name: String,
    pub image: String,
    pub command: String,
    pub marker: String,
    pub poll_interval: Duration,
    pub poll_timeout: Option<Duration>,
    pub poll_max_attempts: Option<u32>,
    pub forward_stdin: bool,
    pub log_level: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            pod_name: "new-pod".to_string(),
            namespace: "nginx".to_string(),
            container_name: "nginx".to_string(),
            image: "nginx".to_string(),
            command: "ls -l".to_string(),
            marker: "media".to_string(),
            poll_interval: Duration::from_secs(1),
            poll_timeout: None,
            poll_max_attempts: None,
            forward_stdin: false,
            log_level: "info".to_string(),
        }
    }
}

impl WorkflowConfig {
    pub fn from_env() -> WorkflowResult<Self> {
        let defaults = Self::default();

        Ok(Self {
            pod_name: env::var("POD_NAME").unwrap_or(defaults.pod_name),
            namespace: env::var("POD_NAMESPACE").unwrap_or(defaults.namespace),
            container_name: env::var("CONTAINER_NAME").unwrap_or(defaults.container_name),
            image: env::var("CONTAINER_IMAGE").unwrap_or(defaults.image),
            command: env::var("EXEC_COMMAND").unwrap_or(defaults.command),
            marker: env::var("OUTPUT_MARKER").unwrap_or(defaults.marker),
            poll_interval: parse_positive::<u64>("POLL_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            poll_timeout: parse_positive::<u64>("POLL_TIMEOUT_SECS")?.map(Duration::from_secs),
            poll_max_attempts: parse_positive("POLL_MAX_ATTEMPTS")?,
            forward_stdin: parse_var("EXEC_STDIN")?.unwrap_or(defaults.forward_stdin),
            log_level: env::var("RUST_LOG").unwrap_or(defaults.log_level),
        })
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: self.poll_interval,
            max_attempts: self.poll_max_attempts,
            timeout: self.poll_timeout,
        }
    }
}

fn parse_var<T>(key: &str) -> WorkflowResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| WorkflowError::Config(format!("invalid {}={:?}: {}", key, raw, e))),
        Err(_) => Ok(None),
    }
}

/// Like `parse_var`, but zero is rejected
fn parse_positive<T>(key: &str) -> WorkflowResult<Option<T>>
where
    T: FromStr + Default + PartialEq,
    T::Err: std::fmt::Display,
{
    match parse_var::<T>(key)? {
        Some(value) if value == T::default() => Err(WorkflowError::Config(format!(
            "{} must be greater than zero",
            key
        ))),
        parsed => Ok(parsed),
    }
}

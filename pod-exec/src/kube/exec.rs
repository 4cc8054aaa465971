use crate::error::{WorkflowError, WorkflowResult};
use crate::kube::traits::ExecInput;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use kube::api::{AttachParams, AttachedProcess};
use tokio::io::{AsyncRead, AsyncWrite};

/// Wrap a command line so the remote shell parses it
pub fn shell_command(command: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), command.to_string()]
}

/// Exec parameters for a TTY session.
///
/// stdin is only requested when there is a local source to forward. A TTY
/// merges stderr into stdout and kube-rs refuses to build a request with both
/// tty and stderr set, so stderr is left off.
pub fn exec_params(stdin_supplied: bool) -> AttachParams {
    AttachParams {
        stdin: stdin_supplied,
        stdout: true,
        stderr: false,
        tty: true,
        ..Default::default()
    }
}

/// Pump the attached process's streams until the remote command exits.
pub async fn relay(
    mut attached: AttachedProcess,
    stdin: Option<ExecInput>,
    stdout: &mut (dyn AsyncWrite + Send + Unpin),
    stderr: &mut (dyn AsyncWrite + Send + Unpin),
) -> WorkflowResult<()> {
    // Input may never reach EOF (an interactive terminal), so it is pumped on
    // its own task and dropped once the command has finished.
    let stdin_task = match (stdin, attached.stdin()) {
        (Some(mut input), Some(mut remote)) => Some(tokio::spawn(async move {
            tokio::io::copy(&mut input, &mut remote).await
        })),
        _ => None,
    };

    let status = attached.take_status();
    let out_copy = pump(attached.stdout(), stdout);
    let err_copy = pump(attached.stderr(), stderr);
    let copied = tokio::try_join!(out_copy, err_copy);

    if let Some(task) = stdin_task {
        task.abort();
    }
    copied.map_err(|e| WorkflowError::Exec(format!("stream relay failed: {}", e)))?;

    let status = match status {
        Some(status) => status.await,
        None => None,
    };

    attached
        .join()
        .await
        .map_err(|e| WorkflowError::Exec(format!("exec session did not shut down: {}", e)))?;

    match failure_message(status.as_ref()) {
        Some(message) => Err(WorkflowError::Exec(message)),
        None => Ok(()),
    }
}

async fn pump<R>(
    source: Option<R>,
    sink: &mut (dyn AsyncWrite + Send + Unpin),
) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    match source {
        Some(mut reader) => tokio::io::copy(&mut reader, sink).await,
        None => Ok(0),
    }
}

/// Error text for a completion status that reports failure
pub fn failure_message(status: Option<&Status>) -> Option<String> {
    let status = status?;
    if status.status.as_deref() == Some("Success") {
        return None;
    }

    Some(
        status
            .message
            .clone()
            .or_else(|| status.reason.clone())
            .unwrap_or_else(|| "remote command failed".to_string()),
    )
}

use crate::config::WorkflowConfig;
use crate::error::WorkflowResult;
use crate::filter::matching_lines;
use crate::kube::{ExecInput, PodOperations};
use crate::readiness::{wait_for_phase, POD_RUNNING};
use crate::report::Reporter;
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::io::Write;

/// What a completed run observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub pod: String,
    /// Number of status fetches until the pod was running
    pub polls: u32,
    /// Output lines that contained the marker
    pub matches: Vec<String>,
}

/// Single-container pod described by the configuration
pub fn pod_descriptor(config: &WorkflowConfig) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(config.pod_name.clone()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: config.container_name.clone(),
                image: Some(config.image.clone()),
                ..Default::default()
            }],
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Create the pod, wait for it to run, exec the command, report matching
/// output lines, then delete the pod.
///
/// Steps run strictly in order and the first error stops the sequence. Once
/// the pod has been created it is deleted on every exit path. If an earlier
/// step failed, that error is returned and a failed delete is only logged.
pub async fn run<T: PodOperations + ?Sized>(
    pod_ops: &T,
    config: &WorkflowConfig,
    stdin: Option<ExecInput>,
    out: &mut (dyn Write + Send),
) -> WorkflowResult<RunSummary> {
    let mut reporter = Reporter::new(out);
    let namespace = config.namespace.as_str();

    reporter.creating_pod()?;
    tracing::info!(pod = %config.pod_name, namespace, image = %config.image, "Creating pod");
    let created = pod_ops
        .create_pod(namespace, &pod_descriptor(config))
        .await?;
    let name = created
        .metadata
        .name
        .unwrap_or_else(|| config.pod_name.clone());

    let outcome = exercise(pod_ops, config, &name, stdin, &mut reporter).await;

    let announced = reporter.deleting_pod();
    tracing::info!(pod = %name, namespace, "Deleting pod");
    let deleted = pod_ops.delete_pod(namespace, &name).await;

    match (outcome, deleted) {
        (Ok((polls, matches)), Ok(())) => {
            announced?;
            tracing::info!(pod = %name, polls, matches = matches.len(), "Run complete");
            Ok(RunSummary {
                pod: name,
                polls,
                matches,
            })
        }
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup)) => {
            tracing::warn!(
                pod = %name,
                namespace,
                "Cleanup after failed run also failed: {}",
                cleanup
            );
            Err(e)
        }
    }
}

/// Everything between create and delete
async fn exercise<T: PodOperations + ?Sized>(
    pod_ops: &T,
    config: &WorkflowConfig,
    name: &str,
    stdin: Option<ExecInput>,
    reporter: &mut Reporter<'_>,
) -> WorkflowResult<(u32, Vec<String>)> {
    let namespace = config.namespace.as_str();
    reporter.pod_created(name)?;

    reporter.waiting_for_readiness()?;
    let polls = wait_for_phase(
        pod_ops,
        namespace,
        name,
        POD_RUNNING,
        &config.poll_policy(),
        reporter,
    )
    .await?;
    tracing::info!(pod = name, namespace, polls, "Pod is running");

    let mut buffer: Vec<u8> = Vec::new();
    let mut stderr = tokio::io::stderr();
    tracing::debug!(
        pod = name,
        command = %config.command,
        stdin = stdin.is_some(),
        "Executing command"
    );
    pod_ops
        .exec_in_pod(
            namespace,
            name,
            &config.command,
            stdin,
            &mut buffer,
            &mut stderr,
        )
        .await?;
    tracing::debug!(pod = name, bytes = buffer.len(), "Command finished");

    let output = String::from_utf8_lossy(&buffer);
    let mut matches = Vec::new();
    for line in matching_lines(&output, &config.marker) {
        reporter.matched_line(line)?;
        matches.push(line.to_string());
    }

    Ok((polls, matches))
}

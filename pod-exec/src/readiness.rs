use crate::error::{WorkflowError, WorkflowResult};
use crate::kube::PodOperations;
use crate::report::Reporter;
use k8s_openapi::api::core::v1::Pod;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Phase value reported by a pod whose containers have started
pub const POD_RUNNING: &str = "Running";

/// Phase shown for a pod the API server has not assigned a status to yet
pub const PHASE_UNKNOWN: &str = "Unknown";

/// How long and how often to poll a pod's phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Give up after this many fetches (None = no limit)
    pub max_attempts: Option<u32>,
    /// Give up once this much time has passed since the first fetch (None = no limit)
    pub timeout: Option<Duration>,
}

impl PollPolicy {
    /// Poll forever at a fixed interval
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
            timeout: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::unbounded(Duration::from_secs(1))
    }
}

/// Current phase of a pod, or `Unknown` when the status is not populated
pub fn pod_phase(pod: &Pod) -> &str {
    pod.status
        .as_ref()
        .and_then(|status| status.phase.as_deref())
        .unwrap_or(PHASE_UNKNOWN)
}

/// Fetch the pod until its phase equals `target`.
///
/// Every fetch hits the API server; nothing is cached between attempts. A
/// failed fetch aborts immediately. Exhausting the policy's attempt or time
/// budget yields [`WorkflowError::ReadinessTimeout`].
///
/// Returns the number of fetches performed, including the one that observed
/// the target phase.
pub async fn wait_for_phase<T: PodOperations + ?Sized>(
    pod_ops: &T,
    namespace: &str,
    name: &str,
    target: &str,
    policy: &PollPolicy,
    reporter: &mut Reporter<'_>,
) -> WorkflowResult<u32> {
    let deadline = policy.timeout.map(|timeout| Instant::now() + timeout);
    let mut attempts: u32 = 0;

    if policy.max_attempts == Some(0) {
        return Err(WorkflowError::ReadinessTimeout {
            pod: name.to_string(),
            attempts,
        });
    }

    loop {
        let pod = pod_ops.get_pod(namespace, name).await?;
        attempts += 1;

        let phase = pod_phase(&pod);
        reporter.phase(phase)?;
        tracing::debug!(pod = name, namespace, phase, attempt = attempts, "Polled pod phase");

        if phase == target {
            return Ok(attempts);
        }

        if policy.max_attempts.is_some_and(|max| attempts >= max) {
            tracing::warn!(pod = name, attempts, "Pod never reached phase {}", target);
            return Err(WorkflowError::ReadinessTimeout {
                pod: name.to_string(),
                attempts,
            });
        }

        let pause = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    tracing::warn!(pod = name, attempts, "Timed out waiting for phase {}", target);
                    return Err(WorkflowError::ReadinessTimeout {
                        pod: name.to_string(),
                        attempts,
                    });
                }
                policy.interval.min(remaining)
            }
            None => policy.interval,
        };

        sleep(pause).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kube::mock::{MockPodOperations, PodCall};

    const NS: &str = "nginx";
    const POD: &str = "new-pod";

    fn mock_with_phases(phases: &[&str]) -> MockPodOperations {
        let mock = MockPodOperations::new();
        mock.add_pod(NS, MockPodOperations::create_test_pod(POD, NS, None));
        mock.script_phases(NS, POD, phases);
        mock
    }

    fn get_calls(mock: &MockPodOperations) -> usize {
        mock.calls()
            .iter()
            .filter(|call| matches!(call, PodCall::Get { .. }))
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_stops_at_first_running() {
        let mock = mock_with_phases(&["Pending", "Pending", "Running", "Pending"]);
        let mut out: Vec<u8> = Vec::new();
        let mut reporter = Reporter::new(&mut out);

        let attempts = wait_for_phase(
            &mock,
            NS,
            POD,
            POD_RUNNING,
            &PollPolicy::default(),
            &mut reporter,
        )
        .await
        .unwrap();

        assert_eq!(attempts, 3);
        assert_eq!(get_calls(&mock), 3);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Pod phase Pending\nPod phase Pending\nPod phase Running\n"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_already_running() {
        let mock = mock_with_phases(&["Running"]);
        let mut out: Vec<u8> = Vec::new();
        let mut reporter = Reporter::new(&mut out);

        let attempts = wait_for_phase(
            &mock,
            NS,
            POD,
            POD_RUNNING,
            &PollPolicy::default(),
            &mut reporter,
        )
        .await
        .unwrap();

        assert_eq!(attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_sleeps_interval_between_fetches() {
        let mock = mock_with_phases(&["Pending", "Pending", "Running"]);
        let mut out: Vec<u8> = Vec::new();
        let mut reporter = Reporter::new(&mut out);
        let started = Instant::now();

        wait_for_phase(
            &mock,
            NS,
            POD,
            POD_RUNNING,
            &PollPolicy::unbounded(Duration::from_secs(1)),
            &mut reporter,
        )
        .await
        .unwrap();

        // Two sleeps between three fetches
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_never_running_hits_attempt_cap() {
        let mock = mock_with_phases(&["Pending"]);
        let mut out: Vec<u8> = Vec::new();
        let mut reporter = Reporter::new(&mut out);

        let result = wait_for_phase(
            &mock,
            NS,
            POD,
            POD_RUNNING,
            &PollPolicy::default().with_max_attempts(25),
            &mut reporter,
        )
        .await;

        match result {
            Err(WorkflowError::ReadinessTimeout { pod, attempts }) => {
                assert_eq!(pod, POD);
                assert_eq!(attempts, 25);
            }
            other => panic!("expected readiness timeout, got {:?}", other),
        }
        assert_eq!(get_calls(&mock), 25);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_never_running_hits_deadline() {
        let mock = mock_with_phases(&["Pending"]);
        let mut out: Vec<u8> = Vec::new();
        let mut reporter = Reporter::new(&mut out);

        let result = wait_for_phase(
            &mock,
            NS,
            POD,
            POD_RUNNING,
            &PollPolicy::unbounded(Duration::from_secs(1))
                .with_timeout(Duration::from_millis(4500)),
            &mut reporter,
        )
        .await;

        // Fetches at t=0,1,2,3,4 and a final one at the 4.5s deadline
        assert!(matches!(
            result,
            Err(WorkflowError::ReadinessTimeout { attempts: 6, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_zero_attempt_budget_never_fetches() {
        let mock = mock_with_phases(&["Running"]);
        let mut out: Vec<u8> = Vec::new();
        let mut reporter = Reporter::new(&mut out);

        let result = wait_for_phase(
            &mock,
            NS,
            POD,
            POD_RUNNING,
            &PollPolicy::default().with_max_attempts(0),
            &mut reporter,
        )
        .await;

        assert!(matches!(
            result,
            Err(WorkflowError::ReadinessTimeout { attempts: 0, .. })
        ));
        assert_eq!(get_calls(&mock), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_fetch_error_aborts() {
        let mock = mock_with_phases(&["Pending"]);
        mock.fail_get_after(1);
        let mut out: Vec<u8> = Vec::new();
        let mut reporter = Reporter::new(&mut out);

        let result = wait_for_phase(
            &mock,
            NS,
            POD,
            POD_RUNNING,
            &PollPolicy::default(),
            &mut reporter,
        )
        .await;

        assert!(matches!(result, Err(WorkflowError::Kubernetes(_))));
        assert_eq!(get_calls(&mock), 2);
    }

    #[test]
    fn test_pod_phase_unknown_without_status() {
        let pod = MockPodOperations::create_test_pod(POD, NS, None);
        assert_eq!(pod_phase(&pod), PHASE_UNKNOWN);

        let pod = MockPodOperations::create_test_pod(POD, NS, Some("Succeeded"));
        assert_eq!(pod_phase(&pod), "Succeeded");
    }
}

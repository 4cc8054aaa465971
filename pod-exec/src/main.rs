use clap::Parser;
use pod_exec::config::resolve_kubeconfig;
use pod_exec::kube::{ExecInput, KubeClient};
use pod_exec::{Cli, WorkflowConfig, WorkflowResult};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to start async runtime: {}", err);
            return ExitCode::FAILURE;
        }
    };
    let result = runtime.block_on(execute(cli));
    // A forwarded terminal stdin can still be parked in a blocking read
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            err.into()
        }
    }
}

async fn execute(cli: Cli) -> WorkflowResult<()> {
    // Load configuration
    let config = WorkflowConfig::from_env()?;

    // Initialize logging; stdout is reserved for progress lines
    tracing_subscriber::fmt()
        .with_env_filter(config.log_level.clone())
        .with_writer(std::io::stderr)
        .init();

    let kubeconfig = resolve_kubeconfig(cli.kubeconfig, dirs::home_dir().as_deref()).into_path()?;
    tracing::info!("Kubeconfig: {}", kubeconfig.display());
    tracing::info!("Pod: {}/{}", config.namespace, config.pod_name);

    // Initialize Kubernetes client
    let kube_client = KubeClient::from_kubeconfig(&kubeconfig).await?;
    tracing::debug!("Kubernetes client ready");

    let stdin = config
        .forward_stdin
        .then(|| Box::new(tokio::io::stdin()) as ExecInput);

    let mut stdout = std::io::stdout();
    let summary = pod_exec::run(&kube_client, &config, stdin, &mut stdout).await?;
    tracing::info!(
        "Finished with {} matching line(s) after {} status check(s)",
        summary.matches.len(),
        summary.polls
    );

    Ok(())
}

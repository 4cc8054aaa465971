pub mod config;
pub mod error;
pub mod filter;
pub mod kube;
pub mod readiness;
pub mod report;
pub mod workflow;

// Re-exports for convenience
pub use config::{Cli, WorkflowConfig};
pub use error::{WorkflowError, WorkflowResult};
pub use workflow::{run, RunSummary};

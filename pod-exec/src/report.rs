use std::io::{self, Write};

/// Label printed in front of every output line that contains the marker
pub const MATCH_LABEL: &str = "Read line:";

/// Milestone lines printed to the user while the workflow runs.
///
/// Diagnostics go through `tracing`; this is only the human-facing progress
/// output, kept separate so tests can capture it.
pub struct Reporter<'a> {
    out: &'a mut (dyn Write + Send),
}

impl<'a> Reporter<'a> {
    pub fn new(out: &'a mut (dyn Write + Send)) -> Self {
        Self { out }
    }

    pub fn creating_pod(&mut self) -> io::Result<()> {
        writeln!(self.out, "Creating pod")
    }

    pub fn pod_created(&mut self, name: &str) -> io::Result<()> {
        writeln!(self.out, "{}", name)
    }

    pub fn waiting_for_readiness(&mut self) -> io::Result<()> {
        writeln!(self.out, "Waiting for pod readiness")
    }

    pub fn phase(&mut self, phase: &str) -> io::Result<()> {
        writeln!(self.out, "Pod phase {}", phase)
    }

    pub fn matched_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.out, "{} {}", MATCH_LABEL, line)
    }

    pub fn deleting_pod(&mut self) -> io::Result<()> {
        writeln!(self.out, "Deleting pod")
    }
}

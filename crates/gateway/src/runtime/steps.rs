//! Step-scoped logging and error wrapping for workflow pipelines.
//!
//! Every pipeline step is numbered; failures wrap the cause with the
//! workflow name, step name, step number, and operation so one log line is
//! enough to locate the failure.

use fh_domain::Error;

pub struct WorkflowLog {
    workflow: &'static str,
}

impl WorkflowLog {
    pub fn start(workflow: &'static str, summary: &str) -> Self {
        tracing::info!(workflow, %summary, "workflow started");
        Self { workflow }
    }

    pub fn step(&self, number: u32, name: &'static str) -> Step {
        tracing::info!(workflow = self.workflow, step = number, name, "step");
        Step {
            workflow: self.workflow,
            number,
            name,
        }
    }

    pub fn finish(&self, result: &Result<(), Error>) {
        match result {
            Ok(()) => tracing::info!(workflow = self.workflow, "workflow completed"),
            Err(e) => {
                tracing::error!(workflow = self.workflow, error = %e, "workflow failed")
            }
        }
    }
}

pub struct Step {
    workflow: &'static str,
    number: u32,
    name: &'static str,
}

impl Step {
    /// Wrap a step failure with its metadata.
    pub fn fail(&self, op: &str, source: Error) -> Error {
        tracing::error!(
            workflow = self.workflow,
            step = self.number,
            name = self.name,
            op,
            error = %source,
            "step failed"
        );
        Error::Workflow {
            workflow: self.workflow.to_string(),
            step: self.name.to_string(),
            step_number: self.number,
            op: op.to_string(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_wraps_with_metadata() {
        let log = WorkflowLog::start("issue-label", "test");
        let step = log.step(7, "checkout-branch");
        let err = step.fail("checkout_branch", Error::Git("boom".into()));
        match err {
            Error::Workflow {
                workflow,
                step,
                step_number,
                op,
                ..
            } => {
                assert_eq!(workflow, "issue-label");
                assert_eq!(step, "checkout-branch");
                assert_eq!(step_number, 7);
                assert_eq!(op, "checkout_branch");
            }
            other => panic!("expected workflow error, got {other}"),
        }
    }
}

/// Shared error type used across all Forgehand crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("{provider} API error: {message}")]
    Provider { provider: String, message: String },

    #[error("git: {0}")]
    Git(String),

    #[error("github: {0}")]
    GitHost(String),

    #[error("agent: {0}")]
    Agent(String),

    #[error("config: {0}")]
    Config(String),

    /// A workflow step failure, wrapped with enough metadata to correlate
    /// the log line, the step number, and the underlying operation.
    #[error("workflow {workflow} step {step_number} ({step}): {op}: {source}")]
    Workflow {
        workflow: String,
        step: String,
        step_number: u32,
        op: String,
        #[source]
        source: Box<Error>,
    },

    #[error("cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Render the full cause chain as one `caused by`-joined string. Used by
    /// the worker's failure logging and by `run.log` artifacts.
    pub fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str("\n  caused by: ");
            out.push_str(&cause.to_string());
            source = cause.source();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_error_displays_step_metadata() {
        let err = Error::Workflow {
            workflow: "issue-label".into(),
            step: "checkout-branch".into(),
            step_number: 7,
            op: "checkout_branch".into(),
            source: Box::new(Error::Git("exit status 128".into())),
        };
        let msg = err.to_string();
        assert!(msg.contains("issue-label"));
        assert!(msg.contains("step 7"));
        assert!(msg.contains("checkout-branch"));
        assert!(msg.contains("exit status 128"));
    }

    #[test]
    fn chain_includes_nested_causes() {
        let err = Error::Workflow {
            workflow: "pr-optimize".into(),
            step: "run-llm".into(),
            step_number: 7,
            op: "run".into(),
            source: Box::new(Error::Provider {
                provider: "claude".into(),
                message: "401 unauthorized".into(),
            }),
        };
        let chain = err.chain();
        assert!(chain.contains("caused by: claude API error"));
    }
}

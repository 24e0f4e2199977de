//! Runtime faults raised while executing commands
//!
//! Faults only travel as far as the nearest `TryCatch` or the top-level
//! handler invocation. Malformed expressions and missing references never
//! become faults.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Fault {
    /// Raised explicitly by a `Throw` command
    #[error("{0}")]
    Raised(String),

    /// A HostBridge operation reported an error
    #[error("host operation `{operation}` failed: {message}")]
    Host {
        operation: &'static str,
        message: String,
    },

    /// The host's plugin command resolver reported an error
    #[error("plugin command `{tag}` failed: {message}")]
    Plugin { tag: String, message: String },
}

impl Fault {
    /// Wrap a host error, keeping its whole context chain in the message
    pub fn host(operation: &'static str, err: anyhow::Error) -> Self {
        Fault::Host {
            operation,
            message: format!("{:#}", err),
        }
    }

    /// Bare message, as stored into a `TryCatch` error variable
    pub fn message(&self) -> &str {
        match self {
            Fault::Raised(msg) => msg,
            Fault::Host { message, .. } => message,
            Fault::Plugin { message, .. } => message,
        }
    }
}

/// Result of executing one command node
pub type ExecResult = Result<(), Fault>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_host_fault_keeps_context_chain() {
        let err = Err::<(), _>(anyhow::anyhow!("disk full"))
            .context("saving draft")
            .unwrap_err();
        let fault = Fault::host("set_property", err);
        assert_eq!(fault.message(), "saving draft: disk full");
        assert_eq!(
            fault.to_string(),
            "host operation `set_property` failed: saving draft: disk full"
        );
    }

    #[test]
    fn test_raised_message_is_bare() {
        let fault = Fault::Raised("boom".to_string());
        assert_eq!(fault.message(), "boom");
        assert_eq!(fault.to_string(), "boom");
    }
}

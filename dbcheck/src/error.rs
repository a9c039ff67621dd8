use crate::target::TargetId;

/// Failure of one probe attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// Transport or authentication failure while reaching the target.
    #[error("error connect: {0}")]
    Connect(String),
    /// Trust material could not be parsed or registered. Never retried.
    #[error("cannot register TLS config: {0}")]
    SecurityConfig(String),
    /// The introspection request failed or its deadline elapsed.
    #[error("error getting tables: {0}")]
    Query(String),
    #[error("cannot read introspection result: {0}")]
    QueryDecode(String),
}

impl ProbeError {
    /// Configuration faults abort the retry loop instead of sleeping.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProbeError::SecurityConfig(_))
    }
}

/// Terminal failure of one target in one-shot mode.
#[derive(Debug, thiserror::Error)]
pub enum TargetFailure {
    #[error("{target} connection attempts have failed after {attempts} tries: {source}")]
    RetriesExhausted {
        target: TargetId,
        attempts: u32,
        #[source]
        source: ProbeError,
    },
    #[error("{target} aborted: {source}")]
    Aborted {
        target: TargetId,
        #[source]
        source: ProbeError,
    },
    #[error("{target} check task failed: {reason}")]
    TaskFailed { target: TargetId, reason: String },
}

impl TargetFailure {
    pub fn target(&self) -> &TargetId {
        match self {
            TargetFailure::RetriesExhausted { target, .. }
            | TargetFailure::Aborted { target, .. }
            | TargetFailure::TaskFailed { target, .. } => target,
        }
    }

    /// True when the failure comes from configuration rather than reachability.
    pub fn is_config_error(&self) -> bool {
        matches!(self, TargetFailure::Aborted { .. })
    }
}

/// Errors raised while resolving settings and target descriptors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("error converting env {key} value {value} to number")]
    InvalidNumber { key: String, value: String },
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
    #[error("{0} not set")]
    Missing(String),
    #[error("error reading CA file {path}: {source}")]
    CaFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Security(#[from] ProbeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_security_errors_are_fatal() {
        assert!(ProbeError::SecurityConfig("bad pem".into()).is_fatal());
        assert!(!ProbeError::Connect("refused".into()).is_fatal());
        assert!(!ProbeError::Query("deadline".into()).is_fatal());
        assert!(!ProbeError::QueryDecode("utf8".into()).is_fatal());
    }

    #[test]
    fn test_failure_message_names_target() {
        let failure = TargetFailure::RetriesExhausted {
            target: TargetId { host: "db".into(), port: 3306, name: "app".into() },
            attempts: 3,
            source: ProbeError::Connect("connection refused".into()),
        };
        let msg = failure.to_string();
        assert!(msg.starts_with("[db:3306/app]"));
        assert!(msg.contains("connection refused"));
        assert!(!failure.is_config_error());
    }
}

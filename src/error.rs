use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving or driving a detection backend.
///
/// `detect` itself never fails on "no face found" (it returns an empty
/// sequence); these variants cover construction-time preconditions and
/// capability misuse only.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The requested method's runtime dependency or model file is missing.
    /// Recovered locally by the fallback chain; only fatal when the final
    /// cascade rung is itself unavailable.
    #[error("backend '{method}' unavailable: {reason}")]
    BackendUnavailable { method: String, reason: String },

    /// A landmark operation was invoked on a backend that reports
    /// `supports_landmarks() == false`.
    #[error("backend '{method}' does not support operation '{operation}'")]
    UnsupportedOperation {
        method: String,
        operation: &'static str,
    },

    /// No rung of the fallback chain could be constructed. Treated as a
    /// configuration/build error, not a runtime condition.
    #[error("no detection backend could be constructed (model dir: {model_dir})")]
    NoBackend { model_dir: PathBuf },
}

/// Failure taxonomy shared by every layer of the client core.
///
/// `Validation` blocks a submission locally and never reaches the remote.
/// `RemoteRejection` carries the remote's message verbatim. `NetworkFailure`
/// means the call did not complete. `StateConflict` is suppressed by callers
/// and never shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    #[error("validation - {field}: {message}")]
    Validation { field: String, message: String },
    #[error("remote_rejection - {0}")]
    RemoteRejection(String),
    #[error("network_failure - {0}")]
    NetworkFailure(String),
    #[error("state_conflict - {0}")]
    StateConflict(String),
    #[error("invalid_data - {0}")]
    InvalidData(String),
    #[error("io_error - {0}")]
    Io(String),
}

impl AppError {
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn remote_rejection<M: Into<String>>(message: M) -> Self {
        Self::RemoteRejection(message.into())
    }

    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::NetworkFailure(message.into())
    }

    pub fn state_conflict<M: Into<String>>(message: M) -> Self {
        Self::StateConflict(message.into())
    }

    pub fn invalid_data<M: Into<String>>(message: M) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn io<M: Into<String>>(message: M) -> Self {
        Self::Io(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::RemoteRejection(_) => "remote_rejection",
            Self::NetworkFailure(_) => "network_failure",
            Self::StateConflict(_) => "state_conflict",
            Self::InvalidData(_) => "invalid_data",
            Self::Io(_) => "io_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Validation { message, .. } => message,
            Self::RemoteRejection(message) => message,
            Self::NetworkFailure(message) => message,
            Self::StateConflict(message) => message,
            Self::InvalidData(message) => message,
            Self::Io(message) => message,
        }
    }

    /// Remote failures are reported through a notice instead of being
    /// propagated into rendering.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteRejection(_) | Self::NetworkFailure(_))
    }
}

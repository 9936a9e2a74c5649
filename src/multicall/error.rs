use thiserror::Error;

use crate::utils::truncate_message;

/// Failure of a whole aggregation.
///
/// Per-call reverts never show up here; they are recorded in the
/// [`MulticallResult`](super::MulticallResult) instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MulticallError {
    /// The primary attempt did not settle before the deadline
    #[error("multicall timeout")]
    Timeout,

    /// The primary attempt failed before the deadline
    #[error("{0}")]
    Transport(String),

    /// The fallback attempt failed
    #[error("{0}")]
    Fallback(String),

    /// Invalid chain or transport configuration
    #[error("{0}")]
    Config(String),

    /// The background worker went away or answered with an error
    #[error("{0}")]
    Worker(String),
}

impl MulticallError {
    /// Same error with its message cut to the propagation limit.
    pub fn truncated(self) -> Self {
        match self {
            MulticallError::Timeout => MulticallError::Timeout,
            MulticallError::Transport(msg) => MulticallError::Transport(truncate_message(&msg)),
            MulticallError::Fallback(msg) => MulticallError::Fallback(truncate_message(&msg)),
            MulticallError::Config(msg) => MulticallError::Config(truncate_message(&msg)),
            MulticallError::Worker(msg) => MulticallError::Worker(truncate_message(&msg)),
        }
    }
}

/// Why a single call could not be encoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("function \"{0}\" not found on contract ABI")]
    MethodNotFound(String),

    #[error("no overload of \"{method}\" takes {given} arguments")]
    ArgumentCount { method: String, given: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid hashed parameter: {0}")]
    InvalidHashParam(String),

    #[error("abi encoding failed: {0}")]
    Abi(String),
}

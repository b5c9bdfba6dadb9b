use thiserror::Error;

/// Errors that abort a whole emulation run.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Setup failed: {0}")]
    Setup(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single formula evaluation produced no result.
///
/// Never propagated out of the invoker: each one becomes the `-1` sentinel
/// in the progress output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationFailure {
    #[error("Execution reverted: {0}")]
    Revert(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Cannot decode result: {0}")]
    Decode(String),

    #[error("Input out of domain: {0}")]
    Domain(String),

    #[error("Formula panicked: {0}")]
    Panicked(String),
}

//! Error types for the avatar shell core.

/// Top-level error type for the window orchestration layer.
///
/// Variants follow the recovery taxonomy: only [`Platform`](ShellError::Platform)
/// aborts the requested operation; the others are recovered close to where
/// they arise and rarely escape their component.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// No display available, or the windowing platform refused a request.
    #[error("platform error: {0}")]
    Platform(String),

    /// Settings or asset file could not be read or written.
    #[error("filesystem error: {0}")]
    Filesystem(String),

    /// Status or reload request to the inference backend failed.
    #[error("network error: {0}")]
    Network(String),

    /// A computed window bound was not finite.
    #[error("geometry error: {0}")]
    Geometry(String),

    /// Operation does not apply in the current state.
    #[error("invalid state: {0}")]
    State(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// Malformed host command payload.
    #[error("host command error: {0}")]
    Command(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ShellError>;

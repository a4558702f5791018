/// Result alias that carries the custom [`GvmError`] type.
pub type Result<T> = std::result::Result<T, GvmError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum GvmError {
    /// A call-site argument violated a precondition (BPM out of range, bad
    /// cycle parameters, malformed noise seed, ...). These are programmer
    /// errors and are raised before any state is touched.
    #[error("validation failed: {0}")]
    Validation(String),
    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl GvmError {
    /// Creates a validation error carrying the provided message.
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        Self::Validation(msg.into())
    }

    /// Returns `true` when the error stems from a rejected argument.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

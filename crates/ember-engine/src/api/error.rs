use thiserror::Error;

/// Errors raised synchronously at the call that violates a contract.
///
/// Nothing here is deferred into a later tick and nothing is fatal: every
/// variant is recoverable by the caller fixing its input. The engine never
/// catches or retries internally.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An argument is the wrong kind of value (non-finite float, expired
    /// handle, unparseable config).
    #[error("validation: {0}")]
    Validation(String),

    /// An argument is the right kind but outside its allowed range or sign
    /// (negative size, non-positive mass).
    #[error("value: {0}")]
    Value(String),

    /// An operation that needs prior setup ran before that setup happened
    /// (scene attachment before a presentation root is mounted).
    #[error("initialization: {0}")]
    Initialization(String),
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn value(message: impl Into<String>) -> Self {
        Self::Value(message.into())
    }

    pub fn initialization(message: impl Into<String>) -> Self {
        Self::Initialization(message.into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Reject NaN/infinite components before they poison positions or velocities.
pub(crate) fn ensure_finite(value: glam::Vec2, name: &str) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EngineError::validation(format!(
            "{name} must have finite components, got {value}"
        )))
    }
}

pub(crate) fn ensure_finite_scalar(value: f32, name: &str) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EngineError::validation(format!("{name} must be finite, got {value}")))
    }
}

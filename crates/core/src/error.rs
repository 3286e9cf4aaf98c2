/// Result alias that carries the custom [`TrickTreatError`] type.
pub type Result<T> = std::result::Result<T, TrickTreatError>;

/// Common error type for the core crate.
///
/// Every variant is a startup-time failure. Ticking a running session never
/// produces an error.
#[derive(Debug, thiserror::Error)]
pub enum TrickTreatError {
    /// A difficulty tier breaks one of its invariants. `tier` is the ordered
    /// index, or `"endless"` for the terminal tier.
    #[error("difficulty tier {tier}: {reason}")]
    InvalidTier { tier: String, reason: String },
    /// A global setting is out of range.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    /// Free-form message, mostly used by the command line driver.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Settings files that are not valid JSON.
    #[error("malformed settings: {0}")]
    Json(#[from] serde_json::Error),
}

impl TrickTreatError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub(crate) fn tier(tier: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidTier {
            tier: tier.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn settings(reason: impl Into<String>) -> Self {
        Self::InvalidSettings(reason.into())
    }
}

impl From<&str> for TrickTreatError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for TrickTreatError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

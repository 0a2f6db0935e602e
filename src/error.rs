pub type HudResult<T> = Result<T, HudError>;

#[derive(thiserror::Error, Debug)]
pub enum HudError {
    /// Bad event index or unknown player id: a caller bug, surfaced rather
    /// than silently corrected.
    #[error("out of range: {0}")]
    OutOfRange(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A font or image could not be loaded. The renderer treats this as a
    /// visual degradation, never a render failure.
    #[error("asset unavailable: {0}")]
    Asset(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HudError {
    pub fn out_of_range(msg: impl Into<String>) -> Self {
        Self::OutOfRange(msg.into())
    }

    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

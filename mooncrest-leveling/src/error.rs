use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LevelingError {
    /// Input rejected before any state was touched.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl LevelingError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

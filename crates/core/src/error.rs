use crate::scene::EntityId;

/// Result alias that carries the custom [`AssemblyError`] type.
pub type Result<T> = std::result::Result<T, AssemblyError>;

/// Common error type for the core crate.
///
/// Only construction-time problems are reported through this type. Runtime
/// input that does not fit the current state is logged and ignored instead.
#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    /// Free-form message for conditions without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A configured entity is not known to the host scene.
    #[error("entity {0} is not present in the scene")]
    UnknownEntity(EntityId),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration or script JSON could not be parsed.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl AssemblyError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn invalid_config<T: Into<String>>(msg: T) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

impl From<&str> for AssemblyError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for AssemblyError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

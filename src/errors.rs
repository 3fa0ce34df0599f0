use thiserror::Error;

/// Everything that can go wrong while defining or evaluating features.
#[derive(Debug, Error)]
pub enum ToggleError {
    // A definition failed structural validation (processor or params shape)
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),

    #[error("feature '{0}' already exists")]
    DuplicateName(String),

    #[error("feature '{0}' is not found")]
    NotFound(String),

    // A processor yielded something other than a boolean
    #[error("processor of feature '{name}' returned {found}, expected a boolean")]
    InvalidResult { name: String, found: String },

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ToggleError>;

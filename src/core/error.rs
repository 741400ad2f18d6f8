use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Statement error: {0}")]
    Statement(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unregistered model type: {0}")]
    UnregisteredType(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Model has no persistable attributes")]
    EmptyModel,

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Unknown attribute '{0}'")]
    UnknownAttribute(String),

    #[error("Attribute '{0}' is already declared")]
    DuplicateAttribute(String),

    #[error("Lock error: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}

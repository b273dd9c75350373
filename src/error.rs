use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("key does not exist: {0}")]
    NotFound(String),
}

impl StoreError {
    /// The key that caused the error.
    pub fn key(&self) -> &str {
        match self {
            StoreError::NotFound(key) => key,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

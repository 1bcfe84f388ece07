//! Error types for petrel

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Index corruption: {0}")]
    Corruption(String),
}

impl Error {
    /// Truncated on-disk structure: a read ended inside a record.
    pub(crate) fn truncated(what: &str) -> Self {
        Error::Corruption(format!("truncated {what}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

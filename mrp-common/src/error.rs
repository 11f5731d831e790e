//! Error type shared by the MRP crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file unreadable, unparsable or unwritable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Well registry backend returned something unusable
    #[error("Registry error: {0}")]
    Registry(String),
}

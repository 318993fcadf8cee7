use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Index {index} out of range for stack of {len}")]
    OutOfRange { index: usize, len: usize },

    #[error("Refusing to store empty content")]
    EmptyContent,

    #[error("Migration conflict: both {legacy} and {new} contain files")]
    MigrationConflict { legacy: String, new: String },

    #[error("Seek not supported: {0}")]
    SeekUnsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RemError>;

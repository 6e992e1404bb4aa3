use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Protocol errors
    #[error("Invalid message format: {message}")]
    InvalidMessageFormat { message: String },

    #[error("Unknown message class: {class}")]
    UnknownMessageClass { class: String },

    #[error("Unknown command code: {code}")]
    UnknownCommandCode { code: String },

    #[error("Unknown message identifier: {identifier}")]
    UnknownMessageIdentifier { identifier: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    // Card errors
    #[error("Invalid card format: {0}")]
    InvalidCardFormat(String),

    // Buffer errors
    #[error("Buffer index out of range: {index} (max {max})")]
    BufferIndexOutOfRange { index: usize, max: usize },

    #[error("Invalid FDK mask: {mask}")]
    InvalidFdkMask { mask: String },
}

pub type Result<T> = std::result::Result<T, Error>;

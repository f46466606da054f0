use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O errors from the local terminal or mirrored files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Server URL that cannot be turned into a terminal endpoint.
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// Websocket handshake or stream failures.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Outbound frame could not be handed to the socket writer.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration or persisted state that cannot be read or written.
    #[error("Config error: {0}")]
    Config(String),

    /// Frame (de)serialization failures.
    #[error("Protocol error: {0}")]
    Protocol(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for AppError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        AppError::Connection(err.to_string())
    }
}

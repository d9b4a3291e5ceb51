use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection closed during handshake")]
    HandshakeClosed,

    #[error("cancelled before the connection was ready")]
    Cancelled,

    #[error("could not reach dispatcher at {addr} after {attempts} attempts")]
    ConnectFailed { addr: String, attempts: u32 },
}

use std::time::Duration;
use thiserror::Error;

/// Error type for serial Modbus transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Read failed: {0}")]
    Read(String),

    #[error("Modbus exception: {0}")]
    Exception(String),

    #[error("Read timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unsupported function code {0}")]
    UnsupportedFunction(u8),
}

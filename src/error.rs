//! Error types for plc-link

use opcua::types::StatusCode;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// plc-link error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Session could not be established
    #[error("Failed to connect to {endpoint}. Status code: {}", describe_status(.status))]
    Connection {
        /// Endpoint URL that was tried
        endpoint: String,
        /// Status returned by the handshake
        status: StatusCode,
    },

    /// Reading a variable failed in transport or on the server
    #[error("Error reading {variable}: {}", describe_status(.status))]
    Read {
        /// Configured variable name
        variable: String,
        /// Status returned for the read
        status: StatusCode,
    },

    /// Variable returned a value of the wrong runtime type
    #[error(
        "Error reading {variable}: expected {expected}, got {actual}. Status code: {}",
        describe_status(.status)
    )]
    TypeMismatch {
        /// Configured variable name
        variable: String,
        /// Declared type
        expected: &'static str,
        /// Type tag of the value that came back
        actual: &'static str,
        /// Status of the read that returned the value
        status: StatusCode,
    },

    /// Writing a variable failed
    #[error("Error writing {variable}: {}", describe_status(.status))]
    Write {
        /// Configured variable name
        variable: String,
        /// Status returned for the write
        status: StatusCode,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parse error (order files)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

/// Render a status code as `Name (0xXXXXXXXX)` for diagnostics.
pub fn describe_status(status: &StatusCode) -> String {
    format!("{} (0x{:08X})", status, status.bits())
}

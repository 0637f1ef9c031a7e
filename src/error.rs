//! Error handling for servoscope
//!
//! This module defines the crate error type and a Result alias used
//! throughout the library.

use thiserror::Error;

/// Main error type for servoscope operations
#[derive(Error, Debug)]
pub enum ServoScopeError {
    /// Opening the serial port failed before any protocol exchange
    #[error("Failed to open port {port}: {reason}")]
    PortUnavailable { port: String, reason: String },

    /// The port opened but the device did not answer the liveness probe
    #[error("Device does not respond on {port}: {reason}")]
    DeviceUnresponsive { port: String, reason: String },

    /// A read or write failed during an established session (timeout,
    /// CRC, framing, short response). The session stays usable.
    #[error("Transient I/O error: {0}")]
    Transient(String),

    /// User-supplied parameter text is not a valid value for the register
    #[error("Invalid parameter value: {0}")]
    Validation(String),

    /// Catalog lookup for an unknown model or register
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Session lifecycle misuse (e.g. starting the monitor without an
    /// open session)
    #[error("Session error: {0}")]
    Session(String),

    /// Errors loading or saving preferences
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServoScopeError {
    /// Whether the error is absorbed by the poll loop (the affected
    /// channels skip one sample, the next tick retries) rather than
    /// changing session state.
    pub fn is_transient(&self) -> bool {
        matches!(self, ServoScopeError::Transient(_))
    }
}

/// Result type alias for servoscope operations
pub type Result<T> = std::result::Result<T, ServoScopeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ServoScopeError::Validation("not a number".to_string());
        assert_eq!(err.to_string(), "Invalid parameter value: not a number");
    }

    #[test]
    fn test_transient_classification() {
        assert!(ServoScopeError::Transient("timeout".into()).is_transient());
        assert!(!ServoScopeError::DeviceUnresponsive {
            port: "/dev/ttyUSB0".into(),
            reason: "probe timed out".into(),
        }
        .is_transient());
    }

    #[test]
    fn test_port_unavailable_message() {
        let err = ServoScopeError::PortUnavailable {
            port: "COM7".into(),
            reason: "access denied".into(),
        };
        assert!(err.to_string().contains("COM7"));
        assert!(err.to_string().contains("access denied"));
    }
}

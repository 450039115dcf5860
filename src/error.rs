//! Error types for the EtherCAT daemon protocol.

use std::io;
use thiserror::Error;

/// Result type alias for daemon operations.
pub type Result<T> = std::result::Result<T, EcdError>;

/// Errors that can occur while talking to the EtherCAT daemon.
#[derive(Debug, Error)]
pub enum EcdError {
    /// The transport to the daemon could not be established.
    #[error("could not connect to {address}: {source}")]
    Connect {
        /// The `host:port` the client tried to reach.
        address: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// The daemon's initial banner frame could not be read or parsed.
    #[error("handshake failed: {source}")]
    Handshake {
        /// The error raised while consuming the banner.
        #[source]
        source: Box<EcdError>,
    },

    /// The daemon answered the request with an `err` line.
    #[error("daemon rejected request: {message}")]
    Protocol {
        /// The raw error line as sent by the daemon.
        message: String,
    },

    /// The response broke the framing rules; the stream can no longer be trusted.
    #[error("format violation: {reason}")]
    FormatViolation {
        /// Description of the violated rule.
        reason: String,
    },

    /// A data line carried a type tag the decoder does not know.
    #[error("unrecognized type tag '{tag}' in line '{line}'")]
    DecodeAmbiguity {
        /// The trailing type tag.
        tag: String,
        /// The full data line.
        line: String,
    },

    /// A value token could not be converted to the type its tag announces.
    #[error("invalid value '{token}': {reason}")]
    InvalidValue {
        /// The offending token.
        token: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Invalid parameter provided.
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter.
        parameter: String,
        /// Description of why the parameter is invalid.
        reason: String,
    },

    /// Communication timeout.
    #[error("Communication timeout")]
    Timeout,

    /// The daemon closed the stream before a frame was complete.
    #[error("connection closed by daemon")]
    ConnectionClosed,

    /// A previous fatal error left the stream misaligned.
    #[error("connection is desynchronized; close and reopen it")]
    Desynced,

    /// I/O error during communication.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl EcdError {
    /// Creates a new `Protocol` error from the daemon's error line.
    ///
    /// # Example
    ///
    /// ```
    /// use ecd_client::EcdError;
    ///
    /// let err = EcdError::protocol("err: get got bad args");
    /// assert!(!err.is_fatal());
    /// ```
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a new `FormatViolation` error.
    ///
    /// # Example
    ///
    /// ```
    /// use ecd_client::EcdError;
    ///
    /// let err = EcdError::format_violation("line is not indented");
    /// assert!(err.is_fatal());
    /// ```
    pub fn format_violation(reason: impl Into<String>) -> Self {
        Self::FormatViolation {
            reason: reason.into(),
        }
    }

    /// Creates a new `DecodeAmbiguity` error.
    pub fn decode_ambiguity(tag: impl Into<String>, line: impl Into<String>) -> Self {
        Self::DecodeAmbiguity {
            tag: tag.into(),
            line: line.into(),
        }
    }

    /// Creates a new `InvalidValue` error.
    pub fn invalid_value(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            token: token.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `InvalidParameter` error.
    ///
    /// # Example
    ///
    /// ```
    /// use ecd_client::EcdError;
    ///
    /// let err = EcdError::invalid_parameter("index", "expected 0xIIII");
    /// ```
    pub fn invalid_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Wraps an error raised while consuming the handshake banner.
    pub fn handshake(source: EcdError) -> Self {
        Self::Handshake {
            source: Box::new(source),
        }
    }

    /// Returns `true` if the error leaves the connection unusable.
    ///
    /// Per-request failures (`Protocol`, `DecodeAmbiguity`, `InvalidValue`,
    /// `InvalidParameter`) keep the connection ready; everything else means
    /// the caller has to close and reopen.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Protocol { .. }
                | Self::DecodeAmbiguity { .. }
                | Self::InvalidValue { .. }
                | Self::InvalidParameter { .. }
        )
    }

    /// Returns `true` if the connection never reached the ready state.
    pub fn is_connect_error(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Handshake { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_display() {
        let err = EcdError::protocol("err cable disconnected");
        assert_eq!(
            err.to_string(),
            "daemon rejected request: err cable disconnected"
        );
    }

    #[test]
    fn test_decode_ambiguity_display() {
        let err = EcdError::decode_ambiguity("BOOLEAN", "1 BOOLEAN");
        assert_eq!(
            err.to_string(),
            "unrecognized type tag 'BOOLEAN' in line '1 BOOLEAN'"
        );
    }

    #[test]
    fn test_timeout_display() {
        let err = EcdError::Timeout;
        assert_eq!(err.to_string(), "Communication timeout");
    }

    #[test]
    fn test_handshake_wraps_source() {
        let err = EcdError::handshake(EcdError::format_violation("bad banner"));
        assert_eq!(
            err.to_string(),
            "handshake failed: format violation: bad banner"
        );
        assert!(err.is_connect_error());
        assert!(err.is_fatal());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(!EcdError::protocol("err").is_fatal());
        assert!(!EcdError::decode_ambiguity("X", "1 X").is_fatal());
        assert!(!EcdError::invalid_value("abc", "not a number").is_fatal());
        assert!(EcdError::format_violation("x").is_fatal());
        assert!(EcdError::Timeout.is_fatal());
        assert!(EcdError::ConnectionClosed.is_fatal());
        assert!(EcdError::Desynced.is_fatal());
        assert!(!EcdError::Timeout.is_connect_error());
    }

    #[test]
    fn test_io_from() {
        let err: EcdError = io::Error::new(io::ErrorKind::BrokenPipe, "pipe").into();
        assert!(matches!(err, EcdError::Io(_)));
        assert!(err.is_fatal());
    }
}

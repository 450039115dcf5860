//! Response parsing and validation.
//!
//! This module turns a complete [`Frame`](crate::Frame) into the logical lines
//! the caller cares about.
//!
//! # Response Structure
//!
//! | Line | Meaning |
//! |------|---------|
//! | `` (empty) | framing artifact, dropped |
//! | `ok` | end-of-response marker, dropped |
//! | `err...` | request failed, whole response rejected |
//! | `  <data>` | data line, indentation removed |
//!
//! Anything else breaks the wire format and is reported as a
//! [`FormatViolation`](crate::EcdError::FormatViolation).
//!
//! # Example
//!
//! ```
//! use ecd_client::Response;
//!
//! let response = Response::parse(b"  0x00c8 200 INTEGER16\nok\n").unwrap();
//! assert_eq!(response.lines(), ["0x00c8 200 INTEGER16"]);
//!
//! // An error line fails the whole response
//! assert!(Response::parse(b"err: get got bad args\nok\n").is_err());
//! ```

use crate::error::{EcdError, Result};

/// Indentation carried by every data line.
pub const DATA_INDENT: &str = "  ";

/// Prefix of an error line.
pub const ERROR_PREFIX: &str = "err";

/// Bare end-of-response line.
pub const OK_LINE: &str = "ok";

/// Parsed daemon response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    lines: Vec<String>,
}

impl Response {
    /// Parses a complete frame into data lines.
    ///
    /// # Errors
    ///
    /// - `EcdError::Protocol` if a line starts with `err`
    /// - `EcdError::FormatViolation` if a data line is not indented by two
    ///   spaces or the frame is not valid UTF-8
    ///
    /// Lines are checked in frame order, so whichever offence comes first
    /// decides the error.
    pub fn parse(frame: impl AsRef<[u8]>) -> Result<Self> {
        let text = std::str::from_utf8(frame.as_ref()).map_err(|e| {
            EcdError::format_violation(format!("frame is not valid UTF-8: {}", e))
        })?;

        let mut lines = Vec::new();
        for line in text.split('\n') {
            if line.is_empty() || line == OK_LINE {
                continue;
            }
            if line.starts_with(ERROR_PREFIX) {
                return Err(EcdError::protocol(line.trim_end()));
            }
            let Some(data) = line.strip_prefix(DATA_INDENT) else {
                return Err(EcdError::format_violation(format!(
                    "expected two-space indentation, got '{}'",
                    line
                )));
            };
            lines.push(data.trim().to_string());
        }

        Ok(Self { lines })
    }

    /// Returns the data lines in frame order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Consumes the response and returns its data lines.
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// Returns the number of data lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if the response carried no data lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the only data line.
    ///
    /// # Errors
    ///
    /// Returns `EcdError::FormatViolation` unless there is exactly one line.
    ///
    /// # Example
    ///
    /// ```
    /// use ecd_client::Response;
    ///
    /// let response = Response::parse(b"  12.5 REAL32\nok\n").unwrap();
    /// assert_eq!(response.single_line().unwrap(), "12.5 REAL32");
    ///
    /// let empty = Response::parse(b"ok\n").unwrap();
    /// assert!(empty.single_line().is_err());
    /// ```
    pub fn single_line(&self) -> Result<&str> {
        match self.lines.as_slice() {
            [line] => Ok(line),
            lines => Err(EcdError::format_violation(format!(
                "expected exactly one data line, got {}",
                lines.len()
            ))),
        }
    }
}

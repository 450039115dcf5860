//! Daemon commands and their wire encoding.
//!
//! Every request the client sends is a single ASCII line without a trailing
//! newline; the daemon dispatches on the command prefix. Addresses are purely
//! numeric, so no escaping is ever needed.
//!
//! # Command Types
//!
//! - [`Command::Get`] - Read the current value of a register
//! - [`Command::Meta`] - Mapping metadata of one register
//! - [`Command::MetaAll`] - Mapping metadata of every register
//! - [`Command::Dump`] - Raw process image of every slave
//! - [`Command::Help`] - List of accepted commands
//! - [`Command::Bye`] - End the session
//!
//! # Example
//!
//! ```
//! use ecd_client::{Command, RegisterAddress};
//!
//! let cmd = Command::Get(RegisterAddress::new(2, 0x6000, 0x11));
//! assert_eq!(cmd.encode(), b"get 2:0x6000:0x11");
//!
//! // The wire form parses back into the same command
//! let parsed: Command = "get 2:0x6000:0x11".parse().unwrap();
//! assert_eq!(parsed, cmd);
//! ```

use std::str::FromStr;

use crate::address::RegisterAddress;
use crate::error::{EcdError, Result};

/// A request understood by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `get <addr>`: current value of an input register.
    Get(RegisterAddress),
    /// `meta <addr>`: mapping metadata of one register.
    Meta(RegisterAddress),
    /// `meta all`: mapping metadata of all outputs and inputs.
    MetaAll,
    /// `dump`: raw process image.
    Dump,
    /// `help`: accepted commands.
    Help,
    /// `bye`: terminate the session.
    Bye,
}

impl Command {
    /// Renders the command into its wire bytes.
    ///
    /// # Example
    ///
    /// ```
    /// use ecd_client::Command;
    ///
    /// assert_eq!(Command::MetaAll.encode(), b"meta all");
    /// assert_eq!(Command::Bye.encode(), b"bye");
    /// ```
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Returns `true` if the daemon answers with a regular `ok\n` frame.
    ///
    /// `bye` is acknowledged with a bare `bye\n` instead.
    pub fn expects_frame(&self) -> bool {
        !matches!(self, Command::Bye)
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Get(addr) => write!(f, "get {}", addr),
            Command::Meta(addr) => write!(f, "meta {}", addr),
            Command::MetaAll => write!(f, "meta all"),
            Command::Dump => write!(f, "dump"),
            Command::Help => write!(f, "help"),
            Command::Bye => write!(f, "bye"),
        }
    }
}

impl FromStr for Command {
    type Err = EcdError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (verb, arg) = match s.split_once(' ') {
            Some((verb, arg)) => (verb, Some(arg.trim())),
            None => (s, None),
        };

        match (verb, arg) {
            ("get", Some(addr)) => Ok(Command::Get(addr.parse()?)),
            ("meta", Some("all")) => Ok(Command::MetaAll),
            ("meta", Some(addr)) => Ok(Command::Meta(addr.parse()?)),
            ("dump", None) => Ok(Command::Dump),
            ("help", None) => Ok(Command::Help),
            ("bye", None) => Ok(Command::Bye),
            _ => Err(EcdError::invalid_parameter(
                "command",
                format!("unknown command '{}'", s),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_get() {
        let cmd = Command::Get(RegisterAddress::new(2, 0x6000, 0x11));
        assert_eq!(cmd.encode(), b"get 2:0x6000:0x11".to_vec());

        let cmd = Command::Get(RegisterAddress::new(12, 0x1a, 0x0));
        assert_eq!(cmd.encode(), b"get 12:0x001a:0x00".to_vec());
    }

    #[test]
    fn test_encode_literals() {
        assert_eq!(Command::MetaAll.encode(), b"meta all".to_vec());
        assert_eq!(Command::Bye.encode(), b"bye".to_vec());
        assert_eq!(Command::Dump.encode(), b"dump".to_vec());
        assert_eq!(Command::Help.encode(), b"help".to_vec());
        assert_eq!(
            Command::Meta(RegisterAddress::new(1, 0x7000, 0x01)).encode(),
            b"meta 1:0x7000:0x01".to_vec()
        );
    }

    #[test]
    fn test_encoding_is_ascii_without_newline() {
        let cmd = Command::Get(RegisterAddress::new(u16::MAX, u16::MAX, u8::MAX));
        let bytes = cmd.encode();
        assert!(bytes.is_ascii());
        assert!(!bytes.contains(&b'\n'));
    }

    #[test]
    fn test_get_address_roundtrip() {
        for slave in [0u16, 1, 2, 255, 1000, u16::MAX] {
            for index in [0u16, 0x1a00, 0x6000, 0xffff] {
                for sub_index in [0u8, 0x11, 0xff] {
                    let addr = RegisterAddress::new(slave, index, sub_index);
                    let wire = String::from_utf8(Command::Get(addr).encode()).unwrap();
                    let addr_text = wire.strip_prefix("get ").unwrap();
                    assert_eq!(addr_text.parse::<RegisterAddress>().unwrap(), addr);
                }
            }
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("meta all".parse::<Command>().unwrap(), Command::MetaAll);
        assert_eq!("bye".parse::<Command>().unwrap(), Command::Bye);
        assert_eq!("dump".parse::<Command>().unwrap(), Command::Dump);
        assert_eq!(
            "meta 2:0x6000:0x11".parse::<Command>().unwrap(),
            Command::Meta(RegisterAddress::new(2, 0x6000, 0x11))
        );
        assert!("quit".parse::<Command>().is_err());
        assert!("get".parse::<Command>().is_err());
        assert!("get 2:0x6000".parse::<Command>().is_err());
    }

    #[test]
    fn test_expects_frame() {
        assert!(Command::MetaAll.expects_frame());
        assert!(!Command::Bye.expects_frame());
    }
}

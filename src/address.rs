//! Register addressing for the EtherCAT daemon protocol.
//!
//! Every process data object the daemon exposes is identified by three
//! components, following the CoE object dictionary convention:
//!
//! - **Slave** (decimal): position of the device on the bus
//! - **Index** (16 bit): object index within the slave
//! - **Subindex** (8 bit): entry within the object
//!
//! On the wire an address is written `slave:0xIIII:0xSS`, with the index
//! zero-padded to 4 hex digits and the subindex to 2.
//!
//! # Example
//!
//! ```
//! use ecd_client::RegisterAddress;
//!
//! let addr = RegisterAddress::new(2, 0x6000, 0x11);
//! assert_eq!(addr.to_string(), "2:0x6000:0x11");
//!
//! let parsed: RegisterAddress = "2:0x6000:0x11".parse().unwrap();
//! assert_eq!(parsed, addr);
//! ```

use std::str::FromStr;

use crate::error::{EcdError, Result};

/// Address of a single register (PDO entry) on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegisterAddress {
    /// Slave position on the bus.
    pub slave: u16,
    /// Object index.
    pub index: u16,
    /// Object subindex.
    pub sub_index: u8,
}

impl RegisterAddress {
    /// Creates a new register address.
    ///
    /// # Example
    ///
    /// ```
    /// use ecd_client::RegisterAddress;
    ///
    /// // Temperature value of the thermocouple terminal in slot 2
    /// let addr = RegisterAddress::new(2, 0x6000, 0x11);
    /// assert_eq!(addr.slave, 2);
    /// assert_eq!(addr.index, 0x6000);
    /// assert_eq!(addr.sub_index, 0x11);
    /// ```
    pub fn new(slave: u16, index: u16, sub_index: u8) -> Self {
        Self {
            slave,
            index,
            sub_index,
        }
    }
}

impl std::fmt::Display for RegisterAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:0x{:04x}:0x{:02x}",
            self.slave, self.index, self.sub_index
        )
    }
}

impl FromStr for RegisterAddress {
    type Err = EcdError;

    /// Parses `slave:index:subindex`.
    ///
    /// The slave is decimal unless prefixed with `0x`; index and subindex are
    /// always hexadecimal, with or without the `0x` prefix.
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().split(':');
        let (Some(slave), Some(index), Some(sub_index), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(EcdError::invalid_parameter(
                "address",
                format!("expected slave:0xIIII:0xSS, got '{}'", s),
            ));
        };

        let slave = match strip_hex_prefix(slave) {
            Some(hex) => u16::from_str_radix(hex, 16),
            None => slave.parse(),
        }
        .map_err(|e| EcdError::invalid_parameter("slave", format!("'{}': {}", slave, e)))?;

        let index = u16::from_str_radix(strip_hex_prefix(index).unwrap_or(index), 16)
            .map_err(|e| EcdError::invalid_parameter("index", format!("'{}': {}", index, e)))?;

        let sub_index = u8::from_str_radix(strip_hex_prefix(sub_index).unwrap_or(sub_index), 16)
            .map_err(|e| {
                EcdError::invalid_parameter("sub_index", format!("'{}': {}", sub_index, e))
            })?;

        Ok(Self::new(slave, index, sub_index))
    }
}

impl From<(u16, u16, u8)> for RegisterAddress {
    fn from((slave, index, sub_index): (u16, u16, u8)) -> Self {
        Self::new(slave, index, sub_index)
    }
}

fn strip_hex_prefix(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_pads_hex() {
        assert_eq!(RegisterAddress::new(2, 0x6000, 0x11).to_string(), "2:0x6000:0x11");
        assert_eq!(RegisterAddress::new(1, 0x1a, 0x1).to_string(), "1:0x001a:0x01");
        assert_eq!(RegisterAddress::new(65535, 0xffff, 0xff).to_string(), "65535:0xffff:0xff");
    }

    #[test]
    fn test_parse_roundtrip_edges() {
        for addr in [
            RegisterAddress::new(0, 0, 0),
            RegisterAddress::new(2, 0x6000, 0x11),
            RegisterAddress::new(u16::MAX, u16::MAX, u8::MAX),
        ] {
            assert_eq!(addr.to_string().parse::<RegisterAddress>().unwrap(), addr);
        }
    }

    #[test]
    fn test_parse_without_prefix_and_uppercase() {
        let addr: RegisterAddress = "3:7000:0A".parse().unwrap();
        assert_eq!(addr, RegisterAddress::new(3, 0x7000, 0x0a));

        let addr: RegisterAddress = "0x10:0X6000:0x01".parse().unwrap();
        assert_eq!(addr, RegisterAddress::new(16, 0x6000, 0x01));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("2:0x6000".parse::<RegisterAddress>().is_err());
        assert!("2:0x6000:0x11:0x1".parse::<RegisterAddress>().is_err());
        assert!("x:0x6000:0x11".parse::<RegisterAddress>().is_err());
        assert!("2:0x10000:0x11".parse::<RegisterAddress>().is_err());
        assert!("2:0x6000:0x100".parse::<RegisterAddress>().is_err());
    }

    #[test]
    fn test_parse_error_names_parameter() {
        let err = "2:0xzz:0x11".parse::<RegisterAddress>().unwrap_err();
        match err {
            EcdError::InvalidParameter { parameter, .. } => assert_eq!(parameter, "index"),
            other => panic!("Expected InvalidParameter, got {:?}", other),
        }
    }

    #[test]
    fn test_from_tuple() {
        let addr: RegisterAddress = (2, 0x6000, 0x11).into();
        assert_eq!(addr, RegisterAddress::new(2, 0x6000, 0x11));
    }
}

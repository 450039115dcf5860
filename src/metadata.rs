//! Decoders for metadata and process image listings.
//!
//! `meta` and `dump` responses are plain data lines; this module gives them
//! structure. Both decoders work on lines that already went through
//! [`Response::parse`](crate::Response::parse).
//!
//! # Mapping lines
//!
//! ```text
//! [0x0010.0] 2:0x6000:0x11 0x10 INTEGER16    Value
//!  offset.bit  address     bits type         name
//! ```
//!
//! # Dump lines
//!
//! ```text
//! T:629414161012;
//! slave[1]: O: I:
//! slave[2]: O: I: 00 00 c8 00
//! ```

use std::str::FromStr;

use crate::address::RegisterAddress;
use crate::error::{EcdError, Result};

/// CoE data type of a mapped register, as named by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    /// `BOOLEAN`
    Boolean,
    /// `INTEGER8`, `INTEGER16`, `INTEGER24`, `INTEGER32`, `INTEGER64`
    Integer(u8),
    /// `UNSIGNED8`, `UNSIGNED16`, `UNSIGNED24`, `UNSIGNED32`, `UNSIGNED64`
    Unsigned(u8),
    /// `REAL32`, `REAL64`
    Real(u8),
    /// `BIT1` to `BIT8`
    Bit(u8),
    /// `VISIBLE_STRING`
    VisibleString,
    /// `OCTET_STRING`
    OctetString,
    /// Any other type, reported by its numeric code (`Type 0xNNNN`).
    Other(u16),
}

impl DataType {
    /// Returns `true` if `get` on a register of this type decodes as an integer.
    pub fn is_integer(self) -> bool {
        matches!(self, DataType::Integer(_) | DataType::Unsigned(_))
    }

    /// Returns `true` if `get` on a register of this type decodes as a real.
    pub fn is_real(self) -> bool {
        matches!(self, DataType::Real(_))
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::Integer(bits) => write!(f, "INTEGER{}", bits),
            DataType::Unsigned(bits) => write!(f, "UNSIGNED{}", bits),
            DataType::Real(bits) => write!(f, "REAL{}", bits),
            DataType::Bit(bits) => write!(f, "BIT{}", bits),
            DataType::VisibleString => write!(f, "VISIBLE_STRING"),
            DataType::OctetString => write!(f, "OCTET_STRING"),
            DataType::Other(code) => write!(f, "Type 0x{:04X}", code),
        }
    }
}

impl FromStr for DataType {
    type Err = EcdError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || EcdError::invalid_parameter("data_type", format!("unknown type '{}'", s));
        let width = |digits: &str, allowed: &[u8]| -> Result<u8> {
            digits
                .parse::<u8>()
                .ok()
                .filter(|bits| allowed.contains(bits))
                .ok_or_else(invalid)
        };

        match s {
            "BOOLEAN" => Ok(DataType::Boolean),
            "VISIBLE_STRING" => Ok(DataType::VisibleString),
            "OCTET_STRING" => Ok(DataType::OctetString),
            _ => {
                if let Some(bits) = s.strip_prefix("INTEGER") {
                    Ok(DataType::Integer(width(bits, &[8, 16, 24, 32, 64])?))
                } else if let Some(bits) = s.strip_prefix("UNSIGNED") {
                    Ok(DataType::Unsigned(width(bits, &[8, 16, 24, 32, 64])?))
                } else if let Some(bits) = s.strip_prefix("REAL") {
                    Ok(DataType::Real(width(bits, &[32, 64])?))
                } else if let Some(bits) = s.strip_prefix("BIT") {
                    Ok(DataType::Bit(width(bits, &[1, 2, 3, 4, 5, 6, 7, 8])?))
                } else if let Some(code) = s.strip_prefix("Type ") {
                    let code = code.trim();
                    let code = code.strip_prefix("0x").unwrap_or(code);
                    u16::from_str_radix(code, 16)
                        .map(DataType::Other)
                        .map_err(|_| invalid())
                } else {
                    Err(invalid())
                }
            }
        }
    }
}

/// Where a register lives in the daemon's process image.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PdoMapping {
    /// Byte offset into the process image.
    pub offset: u32,
    /// Bit offset within that byte.
    pub bit_offset: u8,
    /// Register address.
    pub address: RegisterAddress,
    /// Size of the register in bits.
    pub bit_length: u8,
    /// Data type.
    pub data_type: DataType,
    /// Object name from the slave's dictionary (may be empty).
    pub name: String,
}

impl FromStr for PdoMapping {
    type Err = EcdError;

    /// Parses one mapping line as printed by `meta all`.
    ///
    /// # Example
    ///
    /// ```
    /// use ecd_client::{DataType, PdoMapping, RegisterAddress};
    ///
    /// let mapping: PdoMapping = "[0x0010.0] 2:0x6000:0x11 0x10 INTEGER16    Value"
    ///     .parse()
    ///     .unwrap();
    /// assert_eq!(mapping.address, RegisterAddress::new(2, 0x6000, 0x11));
    /// assert_eq!(mapping.data_type, DataType::Integer(16));
    /// assert_eq!(mapping.name, "Value");
    /// ```
    fn from_str(line: &str) -> Result<Self> {
        let bad = |what: &str| {
            EcdError::invalid_parameter("mapping", format!("{} in '{}'", what, line))
        };
        let mut tokens = line.split_whitespace();

        let location = tokens
            .next()
            .and_then(|t| t.strip_prefix('['))
            .and_then(|t| t.strip_suffix(']'))
            .ok_or_else(|| bad("missing [offset.bit]"))?;
        let (offset, bit_offset) = location
            .split_once('.')
            .ok_or_else(|| bad("missing bit offset"))?;
        let offset = u32::from_str_radix(offset.trim_start_matches("0x"), 16)
            .map_err(|_| bad("invalid offset"))?;
        let bit_offset = bit_offset
            .parse::<u8>()
            .map_err(|_| bad("invalid bit offset"))?;

        let address = tokens
            .next()
            .ok_or_else(|| bad("missing address"))?
            .parse::<RegisterAddress>()?;

        let bit_length = tokens
            .next()
            .map(|t| t.trim_start_matches("0x"))
            .and_then(|t| u8::from_str_radix(t, 16).ok())
            .ok_or_else(|| bad("invalid bit length"))?;

        let data_type = match tokens.next() {
            Some("Type") => {
                let code = tokens.next().ok_or_else(|| bad("missing type code"))?;
                format!("Type {}", code).parse::<DataType>()?
            }
            Some(name) => name.parse::<DataType>()?,
            None => return Err(bad("missing data type")),
        };

        let name = tokens.collect::<Vec<_>>().join(" ");

        Ok(Self {
            offset,
            bit_offset,
            address,
            bit_length,
            data_type,
            name,
        })
    }
}

/// Decodes every line that is a mapping, skipping section headers.
pub fn parse_mappings<S: AsRef<str>>(lines: &[S]) -> Vec<PdoMapping> {
    lines
        .iter()
        .filter_map(|line| line.as_ref().parse().ok())
        .collect()
}

/// Raw process data of one slave.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlaveImage {
    /// Slave position on the bus.
    pub slave: u16,
    /// Output bytes (master to slave).
    pub outputs: Vec<u8>,
    /// Input bytes (slave to master).
    pub inputs: Vec<u8>,
}

/// Snapshot of the daemon's process image, as returned by `dump`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessImage {
    /// Distributed clock time of the snapshot, in nanoseconds.
    pub dc_time: Option<i64>,
    /// Per-slave data in bus order.
    pub slaves: Vec<SlaveImage>,
}

impl ProcessImage {
    /// Decodes the data lines of a `dump` response.
    ///
    /// # Errors
    ///
    /// Returns `EcdError::InvalidValue` for a line that is neither a time
    /// stamp nor a slave record.
    ///
    /// # Example
    ///
    /// ```
    /// use ecd_client::ProcessImage;
    ///
    /// let image = ProcessImage::from_lines(&["T:1000;", "slave[2]: O: I: c8 00"]).unwrap();
    /// assert_eq!(image.dc_time, Some(1000));
    /// assert_eq!(image.slave(2).unwrap().inputs, vec![0xc8, 0x00]);
    /// ```
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Result<Self> {
        let mut image = ProcessImage::default();

        for line in lines {
            let line = line.as_ref();
            if let Some(time) = line.strip_prefix("T:") {
                let time = time.trim_end_matches(';');
                image.dc_time = Some(
                    time.parse::<i64>()
                        .map_err(|e| EcdError::invalid_value(time, format!("dc time: {}", e)))?,
                );
            } else if let Some(rest) = line.strip_prefix("slave[") {
                image.slaves.push(parse_slave(line, rest)?);
            } else {
                return Err(EcdError::invalid_value(line, "unexpected dump line"));
            }
        }

        Ok(image)
    }

    /// Returns the record of the given slave.
    pub fn slave(&self, slave: u16) -> Option<&SlaveImage> {
        self.slaves.iter().find(|s| s.slave == slave)
    }
}

fn parse_slave(line: &str, rest: &str) -> Result<SlaveImage> {
    let (slave, data) = rest
        .split_once("]:")
        .ok_or_else(|| EcdError::invalid_value(line, "missing ']:'"))?;
    let slave = slave
        .parse::<u16>()
        .map_err(|e| EcdError::invalid_value(slave, format!("slave number: {}", e)))?;

    let mut image = SlaveImage {
        slave,
        ..SlaveImage::default()
    };
    let mut target: Option<&mut Vec<u8>> = None;
    for token in data.split_whitespace() {
        match token {
            "O:" => target = Some(&mut image.outputs),
            "I:" => target = Some(&mut image.inputs),
            byte => {
                let value = u8::from_str_radix(byte, 16)
                    .map_err(|e| EcdError::invalid_value(byte, format!("process byte: {}", e)))?;
                target
                    .as_mut()
                    .ok_or_else(|| EcdError::invalid_value(line, "byte before O:/I: marker"))?
                    .push(value);
            }
        }
    }

    Ok(image)
}

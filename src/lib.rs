//! # EtherCAT Daemon Client
//!
//! A Rust library for talking to an EtherCAT master daemon over its
//! line-oriented text protocol.
//!
//! This is a **protocol-only** library: no polling loops, caching or
//! reconnection. Each call produces exactly 1 request and reads exactly 1
//! response frame.
//!
//! ## Features
//!
//! - **Framing** of the daemon's NUL-padded blocks into complete responses
//! - **Strict parsing**: malformed responses are reported, never guessed at
//! - **Typed values**: integer and real registers decoded by type tag
//! - **Metadata**: PDO mapping lines and process image dumps as structs
//! - **No panics**: all errors returned as `Result<T, EcdError>`
//!
//! ## Quick Start
//!
//! ```no_run
//! use ecd_client::{Connection, ConnectionConfig, RegisterAddress};
//!
//! fn main() -> ecd_client::Result<()> {
//!     // Daemon on the local machine, port 4200
//!     let conn = Connection::open(ConnectionConfig::default())?;
//!
//!     // Channel 1 of an EL3202 on slave 2
//!     let value = conn.get_register(RegisterAddress::new(2, 0x6000, 0x11))?;
//!     println!("temperature: {} degC", value.as_f64() / 10.0);
//!
//!     conn.close()
//! }
//! ```
//!
//! ## Addresses
//!
//! Registers are named `slave:index:subindex`, with index and subindex in
//! hex:
//!
//! ```
//! use ecd_client::RegisterAddress;
//!
//! let addr: RegisterAddress = "2:0x6000:0x11".parse().unwrap();
//! assert_eq!(addr, RegisterAddress::new(2, 0x6000, 0x11));
//! assert_eq!(addr.to_string(), "2:0x6000:0x11");
//! ```
//!
//! ## Metadata and Process Image
//!
//! ```no_run
//! # use ecd_client::{Connection, ConnectionConfig};
//! # let conn = Connection::open(ConnectionConfig::default()).unwrap();
//! use ecd_client::parse_mappings;
//!
//! let lines = conn.query_metadata()?;
//! for mapping in parse_mappings(&lines[..]) {
//!     println!("{} {} {}", mapping.address, mapping.data_type, mapping.name);
//! }
//!
//! let image = conn.dump()?;
//! for slave in &image.slaves {
//!     println!("slave {}: {} input bytes", slave.slave, slave.inputs.len());
//! }
//! # Ok::<(), ecd_client::EcdError>(())
//! ```
//!
//! ## Error Handling
//!
//! ```no_run
//! use ecd_client::{Connection, ConnectionConfig, EcdError, RegisterAddress};
//!
//! let conn = Connection::open(ConnectionConfig::default())?;
//!
//! match conn.get_register(RegisterAddress::new(2, 0x6000, 0x11)) {
//!     Ok(value) => println!("value: {}", value),
//!     Err(EcdError::Protocol { message }) => println!("daemon refused: {}", message),
//!     Err(EcdError::DecodeAmbiguity { tag, .. }) => println!("cannot decode {}", tag),
//!     Err(e) if e.is_fatal() => {
//!         println!("connection lost: {}", e);
//!         // conn is now desynced; open a new one
//!     }
//!     Err(e) => println!("error: {}", e),
//! }
//! # Ok::<(), EcdError>(())
//! ```
//!
//! ## Configuration
//!
//! ```
//! use ecd_client::ConnectionConfig;
//! use std::time::Duration;
//!
//! let config = ConnectionConfig::new("192.168.1.20", 4200)
//!     .with_timeout(Duration::from_secs(2))   // connect, read and write
//!     .with_read_timeout(None);               // wait forever for replies
//! ```
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events: `info` on connect and close, `debug`
//! per request, `trace` per transport read and `warn` on desynchronization
//! or an unexpected close acknowledgment. Install any subscriber to see them.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod address;
mod command;
mod connection;
mod error;
mod framer;
mod metadata;
mod response;
mod transport;
mod value;

// Public re-exports
pub use address::RegisterAddress;
pub use command::Command;
pub use connection::{Connection, ConnectionConfig, ConnectionState, BYE_ACK};
pub use error::{EcdError, Result};
pub use framer::{Frame, Framer, DEFAULT_BUFFER_SIZE, FRAME_TERMINATOR, MAX_FRAME_SIZE};
pub use metadata::{parse_mappings, DataType, PdoMapping, ProcessImage, SlaveImage};
pub use response::{Response, DATA_INDENT, ERROR_PREFIX, OK_LINE};
pub use transport::{TcpTransport, Transport, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TIMEOUT};
pub use value::TypedValue;

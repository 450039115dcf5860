//! Connection to the EtherCAT daemon.
//!
//! This module provides the [`Connection`] struct, which is the primary
//! interface for talking to the daemon.
//!
//! # Overview
//!
//! The connection handles:
//! - Transport setup and the initial handshake banner
//! - The half-duplex request/response cycle (one request in flight)
//! - Response parsing and typed decoding
//! - Orderly teardown with `bye`
//!
//! # Example
//!
//! ```no_run
//! use ecd_client::{Connection, ConnectionConfig, RegisterAddress};
//!
//! let conn = Connection::open(ConnectionConfig::default())?;
//!
//! let value = conn.get_register(RegisterAddress::new(2, 0x6000, 0x11))?;
//! println!("temperature: {} degC", value.as_f64() / 10.0);
//!
//! conn.close()?;
//! # Ok::<(), ecd_client::EcdError>(())
//! ```
//!
//! # Connection States
//!
//! | State | Meaning |
//! |-------|---------|
//! | `Handshaking` | waiting for the banner frame |
//! | `Ready` | idle, a request may be sent |
//! | `AwaitingResponse` | a request is in flight |
//! | `Desynced` | a fatal error left the stream misaligned |
//! | `Closing` / `Closed` | `bye` sent / transport closed |
//!
//! An `err` reply only fails the request at hand; the connection returns to
//! `Ready`. Format violations, timeouts and I/O errors move it to `Desynced`,
//! after which every request fails with [`EcdError::Desynced`] until the
//! caller closes it and opens a new one.
//!
//! # Thread Safety
//!
//! All request methods take `&self`. The request/response cycle runs under a
//! mutex, so a connection can be shared between threads and requests are
//! serialized; the protocol has no request identifiers to multiplex on.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::address::RegisterAddress;
use crate::command::Command;
use crate::error::{EcdError, Result};
use crate::framer::{Framer, DEFAULT_BUFFER_SIZE};
use crate::metadata::ProcessImage;
use crate::response::Response;
use crate::transport::{TcpTransport, Transport, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TIMEOUT};
use crate::value::TypedValue;

/// Literal acknowledgment of `bye`.
pub const BYE_ACK: &[u8] = b"bye\n";

/// Configuration for opening a daemon connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Daemon host name or IP address.
    pub host: String,
    /// Daemon TCP port.
    pub port: u16,
    /// Timeout for establishing the TCP connection (`None` blocks).
    pub connect_timeout: Option<Duration>,
    /// Timeout for each read (`None` blocks).
    pub read_timeout: Option<Duration>,
    /// Timeout for each write (`None` blocks).
    pub write_timeout: Option<Duration>,
    /// Bytes requested per transport read.
    pub buffer_size: usize,
}

impl ConnectionConfig {
    /// Creates a configuration for the given host and port with default timeouts.
    ///
    /// # Example
    ///
    /// ```
    /// use ecd_client::ConnectionConfig;
    ///
    /// let config = ConnectionConfig::new("192.168.1.20", 4200);
    /// assert_eq!(config.address(), "192.168.1.20:4200");
    /// ```
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: Some(DEFAULT_TIMEOUT),
            read_timeout: Some(DEFAULT_TIMEOUT),
            write_timeout: Some(DEFAULT_TIMEOUT),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Sets a custom daemon port (default is 4200).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the connect, read and write timeouts at once.
    ///
    /// # Example
    ///
    /// ```
    /// use ecd_client::ConnectionConfig;
    /// use std::time::Duration;
    ///
    /// let config = ConnectionConfig::default().with_timeout(Duration::from_secs(1));
    /// assert_eq!(config.read_timeout, Some(Duration::from_secs(1)));
    /// ```
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self.read_timeout = Some(timeout);
        self.write_timeout = Some(timeout);
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the read timeout. `None` waits forever for a terminator.
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the write timeout.
    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Sets the per-read buffer size (default 1024, the daemon's block size).
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Returns the `host:port` label of the daemon.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

/// Lifecycle state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for the daemon's banner frame.
    Handshaking,
    /// Idle; the next request may be sent.
    Ready,
    /// A request is in flight.
    AwaitingResponse,
    /// A fatal error occurred; close and reopen.
    Desynced,
    /// `bye` has been sent.
    Closing,
    /// The transport is closed.
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Handshaking => "handshaking",
            ConnectionState::Ready => "ready",
            ConnectionState::AwaitingResponse => "awaiting response",
            ConnectionState::Desynced => "desynced",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

struct Session<T> {
    transport: T,
    framer: Framer,
    state: ConnectionState,
}

impl<T: Transport> Session<T> {
    fn handshake(&mut self) -> Result<()> {
        self.state = ConnectionState::Handshaking;
        let frame = self.framer.accumulate(&mut self.transport)?;
        let banner = Response::parse(&frame)?;
        for line in banner.lines() {
            debug!(%line, "handshake banner");
        }
        self.state = ConnectionState::Ready;
        Ok(())
    }

    fn request<R>(
        &mut self,
        command: Command,
        decode: impl FnOnce(Response) -> Result<R>,
    ) -> Result<R> {
        match self.state {
            ConnectionState::Ready => {}
            ConnectionState::Desynced => return Err(EcdError::Desynced),
            state => {
                return Err(EcdError::format_violation(format!(
                    "request issued while connection is {}",
                    state
                )))
            }
        }

        self.state = ConnectionState::AwaitingResponse;
        debug!(%command, "sending request");
        let result = self.exchange(command).and_then(decode);

        self.state = match &result {
            Err(e) if e.is_fatal() => {
                warn!(%command, error = %e, "connection desynchronized");
                ConnectionState::Desynced
            }
            Err(e) => {
                debug!(%command, error = %e, "request failed");
                ConnectionState::Ready
            }
            Ok(_) => ConnectionState::Ready,
        };
        result
    }

    fn exchange(&mut self, command: Command) -> Result<Response> {
        self.transport.send(&command.encode())?;
        let frame = self.framer.accumulate(&mut self.transport)?;
        debug!(bytes = frame.len(), "received frame");
        Response::parse(&frame)
    }

    fn close(&mut self) -> Result<()> {
        if self.state == ConnectionState::Closed {
            return Ok(());
        }

        self.state = ConnectionState::Closing;
        let farewell = self.say_bye();
        let shutdown = self.transport.shutdown();
        self.state = ConnectionState::Closed;
        info!("connection closed");

        farewell.and(shutdown)
    }

    // A single raw read: `bye\n` is not framed like other replies.
    fn say_bye(&mut self) -> Result<()> {
        self.transport.send(&Command::Bye.encode())?;

        let mut buf = vec![0u8; self.framer.buffer_size()];
        let n = self.transport.recv(&mut buf)?;
        let reply = &buf[..n];
        if reply != BYE_ACK {
            warn!(
                reply = ?String::from_utf8_lossy(reply),
                "unexpected close acknowledgment"
            );
        }
        Ok(())
    }
}

/// Connection to an EtherCAT daemon.
///
/// Each request method produces exactly one request and reads exactly one
/// response frame. No automatic retries or reconnection.
///
/// Dropping a connection that was not closed sends `bye` and closes the
/// transport, so teardown happens on every exit path. Call [`close`] to
/// observe teardown errors.
///
/// [`close`]: Connection::close
pub struct Connection<T: Transport = TcpTransport> {
    session: Mutex<Session<T>>,
    address: String,
}

impl Connection<TcpTransport> {
    /// Connects to the daemon and consumes its handshake banner.
    ///
    /// # Errors
    ///
    /// - `EcdError::Connect` if the TCP connection cannot be established
    /// - `EcdError::Handshake` if the banner cannot be read or parsed
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ecd_client::{Connection, ConnectionConfig};
    /// use std::time::Duration;
    ///
    /// let config = ConnectionConfig::new("localhost", 4200)
    ///     .with_timeout(Duration::from_secs(2));
    /// let conn = Connection::open(config).unwrap();
    /// assert!(conn.is_ready());
    /// ```
    pub fn open(config: ConnectionConfig) -> Result<Self> {
        let address = config.address();
        let transport = TcpTransport::connect(
            &config.host,
            config.port,
            config.connect_timeout,
            config.read_timeout,
            config.write_timeout,
        )?;
        Self::establish(transport, address, config.buffer_size)
    }

    /// Opens a connection, runs `f` with it and closes it on every exit path.
    ///
    /// Teardown problems are logged rather than returned, so the result of
    /// `f` is never lost.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ecd_client::{Connection, ConnectionConfig, RegisterAddress};
    ///
    /// let value = Connection::scoped(ConnectionConfig::default(), |conn| {
    ///     conn.get_register(RegisterAddress::new(2, 0x6000, 0x11))
    /// })?;
    /// # Ok::<(), ecd_client::EcdError>(())
    /// ```
    pub fn scoped<R>(
        config: ConnectionConfig,
        f: impl FnOnce(&Connection) -> Result<R>,
    ) -> Result<R> {
        let conn = Self::open(config)?;
        let result = f(&conn);
        if let Err(e) = conn.close() {
            warn!(error = %e, "closing scoped connection failed");
        }
        result
    }
}

impl<T: Transport> Connection<T> {
    /// Runs the handshake over an already established transport.
    ///
    /// `address` is only used for logging and `Debug` output.
    pub fn with_transport(transport: T, address: impl Into<String>) -> Result<Self> {
        Self::establish(transport, address.into(), DEFAULT_BUFFER_SIZE)
    }

    fn establish(transport: T, address: String, buffer_size: usize) -> Result<Self> {
        let mut session = Session {
            transport,
            framer: Framer::new(buffer_size),
            state: ConnectionState::Handshaking,
        };

        if let Err(e) = session.handshake() {
            if let Err(shutdown) = session.transport.shutdown() {
                debug!(error = %shutdown, "shutdown after failed handshake");
            }
            return Err(EcdError::handshake(e));
        }
        info!(%address, "connected to daemon");

        Ok(Self {
            session: Mutex::new(session),
            address,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Session<T>>> {
        // A panic mid-request leaves the stream position unknown.
        self.session.lock().map_err(|_| EcdError::Desynced)
    }

    /// Reads the current value of an input register.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The daemon answers with `err` (`Protocol`, connection stays ready)
    /// - The reply does not hold exactly one line (`FormatViolation`)
    /// - The type tag is unknown (`DecodeAmbiguity`)
    /// - Communication fails
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ecd_client::{Connection, ConnectionConfig, EcdError, RegisterAddress};
    ///
    /// let conn = Connection::open(ConnectionConfig::default()).unwrap();
    ///
    /// match conn.get_register(RegisterAddress::new(2, 0x6000, 0x11)) {
    ///     Ok(value) => println!("value = {}", value),
    ///     Err(EcdError::Protocol { message }) => println!("no data: {}", message),
    ///     Err(e) => println!("error: {}", e),
    /// }
    /// ```
    pub fn get_register(&self, address: RegisterAddress) -> Result<TypedValue> {
        self.lock()?.request(Command::Get(address), |response| {
            TypedValue::decode(response.single_line()?)
        })
    }

    /// Reads an integer register.
    ///
    /// # Errors
    ///
    /// Same as [`get_register`](Self::get_register), plus `InvalidValue` if
    /// the register decodes as a real.
    pub fn get_integer(&self, address: RegisterAddress) -> Result<i64> {
        match self.get_register(address)? {
            TypedValue::Integer(v) => Ok(v),
            TypedValue::Real(v) => Err(EcdError::invalid_value(
                v.to_string(),
                format!("register {} is not an integer", address),
            )),
        }
    }

    /// Reads a real register.
    ///
    /// # Errors
    ///
    /// Same as [`get_register`](Self::get_register), plus `InvalidValue` if
    /// the register decodes as an integer.
    pub fn get_real(&self, address: RegisterAddress) -> Result<f64> {
        match self.get_register(address)? {
            TypedValue::Real(v) => Ok(v),
            TypedValue::Integer(v) => Err(EcdError::invalid_value(
                v.to_string(),
                format!("register {} is not a real", address),
            )),
        }
    }

    /// Sends `meta all` and returns the data lines unprocessed.
    ///
    /// Use [`parse_mappings`](crate::parse_mappings) to decode them.
    pub fn query_metadata(&self) -> Result<Vec<String>> {
        self.lock()?
            .request(Command::MetaAll, |response| Ok(response.into_lines()))
    }

    /// Sends `meta <addr>` and returns the data lines unprocessed.
    pub fn query_register_metadata(&self, address: RegisterAddress) -> Result<Vec<String>> {
        self.lock()?
            .request(Command::Meta(address), |response| Ok(response.into_lines()))
    }

    /// Reads the raw process image of every slave.
    pub fn dump(&self) -> Result<ProcessImage> {
        self.lock()?.request(Command::Dump, |response| {
            ProcessImage::from_lines(response.lines())
        })
    }

    /// Returns the daemon's list of accepted commands.
    pub fn help(&self) -> Result<Vec<String>> {
        self.lock()?
            .request(Command::Help, |response| Ok(response.into_lines()))
    }

    /// Sends `bye`, checks the acknowledgment and closes the transport.
    ///
    /// A reply other than `bye\n` is logged as a warning, not an error. The
    /// transport is closed even if the exchange fails; transport errors are
    /// returned afterwards.
    pub fn close(mut self) -> Result<()> {
        self.session
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .close()
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        match self.session.lock() {
            Ok(session) => session.state,
            Err(_) => ConnectionState::Desynced,
        }
    }

    /// Returns `true` if the next request can be sent.
    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    /// Returns the daemon address label.
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl<T: Transport> Drop for Connection<T> {
    fn drop(&mut self) {
        let session = self
            .session
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if session.state != ConnectionState::Closed {
            if let Err(e) = session.close() {
                warn!(error = %e, "closing connection on drop failed");
            }
        }
    }
}

impl<T: Transport> std::fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.address)
            .field("state", &self.state())
            .finish()
    }
}

//! TCP transport layer for daemon communication.
//!
//! This module provides the [`Transport`] trait and the [`TcpTransport`]
//! implementation which handles low-level stream communication with the
//! EtherCAT daemon. The transport layer is completely separated from the
//! protocol layer: it only knows about sockets and bytes.
//!
//! # Design
//!
//! - **Protocol agnostic** - Handles only byte transmission, no framing
//! - **Synchronous** - Blocking send/receive with configurable timeouts
//! - **Simple** - One stream, one remote address, no connection pooling
//!
//! # Constants
//!
//! - [`DEFAULT_HOST`] - Default daemon host (`localhost`)
//! - [`DEFAULT_PORT`] - Default daemon TCP port (4200)
//! - [`DEFAULT_TIMEOUT`] - Default connect/read/write timeout (5 seconds)

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{EcdError, Result};

/// Default daemon host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default daemon TCP port.
pub const DEFAULT_PORT: u16 = 4200;

/// Default timeout for connect, read and write operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A bidirectional byte stream to the daemon.
///
/// [`Connection`](crate::Connection) drives the protocol over any
/// implementation, which keeps the engine testable without a socket.
pub trait Transport {
    /// Writes the whole buffer to the daemon.
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Performs one blocking read. `Ok(0)` means the daemon closed the stream.
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Closes the stream in both directions.
    fn shutdown(&mut self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        (**self).send(data)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).recv(buf)
    }

    fn shutdown(&mut self) -> Result<()> {
        (**self).shutdown()
    }
}

/// TCP transport for daemon communication.
pub struct TcpTransport {
    stream: TcpStream,
    remote_addr: SocketAddr,
}

impl TcpTransport {
    /// Connects to the daemon at `host:port`.
    ///
    /// Every resolved address is tried in turn. `None` timeouts block
    /// indefinitely.
    ///
    /// # Errors
    ///
    /// Returns `EcdError::Connect` if no address accepts the connection or
    /// the stream cannot be configured.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ecd_client::{TcpTransport, DEFAULT_TIMEOUT};
    ///
    /// let transport = TcpTransport::connect(
    ///     "localhost",
    ///     4200,
    ///     Some(DEFAULT_TIMEOUT),
    ///     Some(DEFAULT_TIMEOUT),
    ///     Some(DEFAULT_TIMEOUT),
    /// ).unwrap();
    /// ```
    pub fn connect(
        host: &str,
        port: u16,
        connect_timeout: Option<Duration>,
        read_timeout: Option<Duration>,
        write_timeout: Option<Duration>,
    ) -> Result<Self> {
        let address = format!("{}:{}", host, port);
        let connect_error = |source: io::Error| EcdError::Connect {
            address: address.clone(),
            source,
        };

        let candidates: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(connect_error)?
            .collect();

        let mut last_error = io::Error::new(
            io::ErrorKind::NotFound,
            "host did not resolve to any address",
        );
        for candidate in candidates {
            trace!(%candidate, "trying daemon address");
            let attempt = match connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&candidate, timeout),
                None => TcpStream::connect(candidate),
            };
            match attempt {
                Ok(stream) => {
                    stream.set_read_timeout(read_timeout).map_err(connect_error)?;
                    stream.set_write_timeout(write_timeout).map_err(connect_error)?;
                    stream.set_nodelay(true).map_err(connect_error)?;
                    debug!(remote = %candidate, "transport connected");
                    return Ok(Self {
                        stream,
                        remote_addr: candidate,
                    });
                }
                Err(e) => last_error = e,
            }
        }

        Err(connect_error(last_error))
    }

    /// Returns the remote daemon address.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Returns a reference to the underlying stream.
    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data).map_err(map_io_error)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.stream.read(buf).map_err(map_io_error)
    }

    fn shutdown(&mut self) -> Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // The daemon closes its end right after `bye\n`.
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(EcdError::Io(e)),
        }
    }
}

fn map_io_error(e: io::Error) -> EcdError {
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => EcdError::Timeout,
        _ => EcdError::Io(e),
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("remote_addr", &self.remote_addr)
            .field("local_addr", &self.stream.local_addr().ok())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_HOST, "localhost");
        assert_eq!(DEFAULT_PORT, 4200);
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(5));
    }

    #[test]
    fn test_connect_send_recv() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; 16];
            let n = conn.read(&mut buf).unwrap();
            conn.write_all(&buf[..n]).unwrap();
        });

        let timeout = Some(Duration::from_secs(2));
        let mut transport =
            TcpTransport::connect("127.0.0.1", port, timeout, timeout, timeout).unwrap();
        assert_eq!(transport.remote_addr().port(), port);

        transport.send(b"dump").unwrap();
        let mut buf = [0u8; 16];
        let n = transport.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"dump");

        server.join().unwrap();
        transport.shutdown().unwrap();
    }

    #[test]
    fn test_recv_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut transport = TcpTransport::connect(
            "127.0.0.1",
            port,
            Some(Duration::from_secs(2)),
            Some(Duration::from_millis(50)),
            None,
        )
        .unwrap();
        let _held = listener.accept().unwrap();

        let mut buf = [0u8; 16];
        assert!(matches!(transport.recv(&mut buf), Err(EcdError::Timeout)));
    }

    #[test]
    fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = TcpTransport::connect(
            "127.0.0.1",
            port,
            Some(Duration::from_millis(200)),
            None,
            None,
        )
        .unwrap_err();
        assert!(err.is_connect_error());
        assert!(err.to_string().contains(&format!("127.0.0.1:{}", port)));
    }

    #[test]
    fn test_transport_debug() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let transport = TcpTransport::connect("127.0.0.1", port, None, None, None).unwrap();
        let debug_str = format!("{:?}", transport);
        assert!(debug_str.contains("TcpTransport"));
        assert!(debug_str.contains(&format!("127.0.0.1:{}", port)));
    }
}

//! Response framing.
//!
//! The daemon writes every response as one or more fixed-size, NUL-padded
//! blocks and finishes it with a block containing `ok\n`. The [`Framer`]
//! reads from a [`Transport`] until the accumulated, NUL-stripped bytes end
//! with that terminator and hands back the whole thing as a [`Frame`].
//!
//! The terminator is searched for at the tail of the cumulative buffer, not
//! of the last chunk, so a terminator split across two reads still ends the
//! frame.

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::error::{EcdError, Result};
use crate::transport::Transport;

/// Literal that ends every response frame.
pub const FRAME_TERMINATOR: &[u8] = b"ok\n";

/// Default size of a single transport read, matching the daemon's block size.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Upper bound on an accumulated frame.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// One complete response, NUL padding removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Bytes);

impl Frame {
    /// Wraps already-assembled frame bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Returns the raw bytes of the frame.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the frame length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the frame holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Accumulates transport reads into frames.
#[derive(Debug)]
pub struct Framer {
    buffer: BytesMut,
    chunk: Vec<u8>,
}

impl Framer {
    /// Creates a framer that reads up to `buffer_size` bytes per call.
    pub fn new(buffer_size: usize) -> Self {
        let buffer_size = buffer_size.max(FRAME_TERMINATOR.len());
        Self {
            buffer: BytesMut::with_capacity(buffer_size * 2),
            chunk: vec![0u8; buffer_size],
        }
    }

    /// Reads from `transport` until a complete frame is available.
    ///
    /// # Errors
    ///
    /// - `EcdError::ConnectionClosed` if the stream ends mid-frame
    /// - `EcdError::FormatViolation` if the frame exceeds [`MAX_FRAME_SIZE`]
    /// - transport errors (`Timeout`, `Io`) as reported by the transport
    ///
    /// On error the partial frame is discarded.
    pub fn accumulate<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<Frame> {
        self.buffer.clear();

        loop {
            let n = match transport.recv(&mut self.chunk) {
                Ok(0) => {
                    self.buffer.clear();
                    return Err(EcdError::ConnectionClosed);
                }
                Ok(n) => n,
                Err(e) => {
                    self.buffer.clear();
                    return Err(e);
                }
            };
            trace!(bytes = n, "received chunk");

            self.buffer
                .extend(self.chunk[..n].iter().copied().filter(|&b| b != 0));

            if self.buffer.len() > MAX_FRAME_SIZE {
                let size = self.buffer.len();
                self.buffer.clear();
                return Err(EcdError::format_violation(format!(
                    "frame exceeds {} bytes without terminator (got {})",
                    MAX_FRAME_SIZE, size
                )));
            }

            if self.buffer.ends_with(FRAME_TERMINATOR) {
                return Ok(Frame(self.buffer.split().freeze()));
            }
        }
    }

    /// Returns the number of bytes read per transport call.
    pub fn buffer_size(&self) -> usize {
        self.chunk.len()
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Transport that replays scripted chunks and records what was sent.
    #[derive(Debug, Default)]
    pub(crate) struct MockTransport {
        pub(crate) chunks: VecDeque<Result<Vec<u8>>>,
        pub(crate) sent: Vec<Vec<u8>>,
        pub(crate) shutdown_called: bool,
    }

    impl MockTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn queue(&mut self, chunk: &[u8]) -> &mut Self {
            self.chunks.push_back(Ok(chunk.to_vec()));
            self
        }

        /// Queues a daemon-style block: `data` padded with NULs to 1024 bytes.
        pub(crate) fn queue_block(&mut self, data: &[u8]) -> &mut Self {
            let mut block = data.to_vec();
            block.resize(DEFAULT_BUFFER_SIZE.max(data.len()), 0);
            self.queue(&block)
        }

        pub(crate) fn queue_error(&mut self, err: EcdError) -> &mut Self {
            self.chunks.push_back(Err(err));
            self
        }
    }

    impl Transport for MockTransport {
        fn send(&mut self, data: &[u8]) -> Result<()> {
            self.sent.push(data.to_vec());
            Ok(())
        }

        fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
            match self.chunks.pop_front() {
                Some(Ok(chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.chunks.push_front(Ok(chunk[n..].to_vec()));
                    }
                    Ok(n)
                }
                Some(Err(e)) => Err(e),
                None => Ok(0),
            }
        }

        fn shutdown(&mut self) -> Result<()> {
            self.shutdown_called = true;
            Ok(())
        }
    }

    #[test]
    fn test_single_chunk_frame() {
        let mut transport = MockTransport::new();
        transport.queue(b"  200 INTEGER16\nok\n");

        let frame = Framer::default().accumulate(&mut transport).unwrap();
        assert_eq!(frame.as_bytes(), b"  200 INTEGER16\nok\n");
    }

    #[test]
    fn test_strips_nul_padding() {
        let mut transport = MockTransport::new();
        transport.queue_block(b"  0x00c8 200 INTEGER16\n").queue_block(b"ok\n");

        let frame = Framer::default().accumulate(&mut transport).unwrap();
        assert_eq!(frame.as_bytes(), b"  0x00c8 200 INTEGER16\nok\n");
        assert!(!frame.as_bytes().contains(&0));
    }

    #[test]
    fn test_multiple_blocks_in_one_read() {
        // Two padded blocks coalesced by TCP into one 2048-byte read
        let mut data = b"  line\n".to_vec();
        data.resize(1024, 0);
        data.extend_from_slice(b"ok\n");
        data.resize(2048, 0);

        let mut transport = MockTransport::new();
        transport.queue(&data);

        let mut framer = Framer::new(4096);
        let frame = framer.accumulate(&mut transport).unwrap();
        assert_eq!(frame.as_bytes(), b"  line\nok\n");
    }

    #[test]
    fn test_terminator_split_across_reads() {
        let mut transport = MockTransport::new();
        transport.queue(b"  1.5 REAL32\no").queue(b"k\n");

        let frame = Framer::default().accumulate(&mut transport).unwrap();
        assert_eq!(frame.as_bytes(), b"  1.5 REAL32\nok\n");
    }

    #[test]
    fn test_small_buffer_reads_until_terminator() {
        let mut transport = MockTransport::new();
        transport.queue(b"  a\n  b\n  c\nok\n");

        let mut framer = Framer::new(4);
        let frame = framer.accumulate(&mut transport).unwrap();
        assert_eq!(frame.as_bytes(), b"  a\n  b\n  c\nok\n");
        assert_eq!(framer.buffer_size(), 4);
    }

    #[test]
    fn test_framer_is_reusable() {
        let mut transport = MockTransport::new();
        transport.queue(b"ok\n").queue(b"  x\nok\n");

        let mut framer = Framer::default();
        assert_eq!(framer.accumulate(&mut transport).unwrap().as_bytes(), b"ok\n");
        assert_eq!(
            framer.accumulate(&mut transport).unwrap().as_bytes(),
            b"  x\nok\n"
        );
    }

    #[test]
    fn test_eof_mid_frame() {
        let mut transport = MockTransport::new();
        transport.queue(b"  partial\n");

        let err = Framer::default().accumulate(&mut transport).unwrap_err();
        assert!(matches!(err, EcdError::ConnectionClosed));
    }

    #[test]
    fn test_transport_error_propagates() {
        let mut transport = MockTransport::new();
        transport.queue(b"  partial\n").queue_error(EcdError::Timeout);

        let err = Framer::default().accumulate(&mut transport).unwrap_err();
        assert!(matches!(err, EcdError::Timeout));
    }

    #[test]
    fn test_oversized_frame() {
        let mut transport = MockTransport::new();
        let junk = vec![b'x'; MAX_FRAME_SIZE + 1];
        transport.queue(&junk);

        let mut framer = Framer::new(MAX_FRAME_SIZE + 1);
        let err = framer.accumulate(&mut transport).unwrap_err();
        assert!(matches!(err, EcdError::FormatViolation { .. }));
    }
}

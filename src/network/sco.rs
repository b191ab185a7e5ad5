//! SCO link I/O
//!
//! SCO sockets are sequenced-packet sockets: every read returns one
//! packet and every write sends one packet of at most the link MTU.

use std::io::{self, Read};
use std::os::fd::OwnedFd;
use std::time::Duration;

use socket2::{Domain, Socket, Type};

use crate::config::ScoConfig;

/// Blocking link input
pub trait LinkReader: Send {
    /// Wait for a packet and read it into `buf`
    ///
    /// `Ok(0)` means the peer closed the link.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Blocking link output
pub trait LinkWriter: Send {
    /// Send one packet, returning the number of bytes written
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;
}

/// SCO socket handle
///
/// One handle per direction is obtained with [`try_clone`](Self::try_clone).
#[derive(Debug)]
pub struct ScoSocket {
    inner: Socket,
}

impl ScoSocket {
    /// Wrap an already connected socket
    pub fn new(socket: Socket) -> Self {
        Self { inner: socket }
    }

    /// Connected pair of local sequenced-packet sockets
    ///
    /// Behaves like a SCO link without a controller, which makes it
    /// suitable for loopback setups.
    pub fn pair() -> io::Result<(Self, Self)> {
        let (a, b) = Socket::pair(Domain::UNIX, Type::SEQPACKET, None)?;
        Ok((Self::new(a), Self::new(b)))
    }

    /// Duplicate the handle
    pub fn try_clone(&self) -> io::Result<Self> {
        Ok(Self::new(self.inner.try_clone()?))
    }

    /// Bound the time a read blocks, so a worker can notice cancellation
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.inner.set_read_timeout(timeout)
    }

    /// Apply link settings from configuration
    pub fn configure(&self, config: &ScoConfig) -> io::Result<()> {
        self.set_read_timeout(config.read_timeout())
    }

    pub fn socket(&self) -> &Socket {
        &self.inner
    }
}

impl From<OwnedFd> for ScoSocket {
    fn from(fd: OwnedFd) -> Self {
        Self::new(Socket::from(fd))
    }
}

impl LinkReader for ScoSocket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.inner).read(buf)
    }
}

impl LinkWriter for ScoSocket {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.inner.send(data)
    }
}

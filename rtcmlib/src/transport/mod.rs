//! Byte sources for the I/O thread (§6): a blocking `Reader` trait with an
//! NTRIP and a serial implementation.

pub mod ntrip;
pub mod serial;

use crate::error::TransportError;

/// Blocking byte source. `read` mirrors `std::io::Read::read` (returns 0 on
/// EOF rather than blocking forever); `close` unblocks a concurrent read
/// where the underlying transport supports it.
pub trait Reader: Send {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;
    fn close(&mut self);
}

impl Reader for Box<dyn Reader> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        (**self).read(buf)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

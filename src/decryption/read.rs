//! src/decryption/read.rs
//! Page-at-a-time reading of an encrypted container

use crate::aliases::PageBuffer;
use crate::consts::PAGE_SIZE;
use crate::error::DecryptError;
use std::io::{ErrorKind, Read};

/// Fill `buf` from `reader` until it is full or the input ends.
///
/// Returns the number of bytes actually read; the rest of `buf` is zeroed so
/// a short trailing page is processed as a full, zero-padded one.
#[inline]
pub fn read_page<R>(reader: &mut R, buf: &mut [u8; PAGE_SIZE]) -> Result<usize, DecryptError>
where
    R: Read,
{
    let mut filled = 0;
    while filled < PAGE_SIZE {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(DecryptError::Io(e)),
        }
    }
    buf[filled..].fill(0);
    Ok(filled)
}

/// Sequential reader handing out one page per call.
pub struct PageReader<R> {
    inner: R,
    next_index: u32,
    buffer: PageBuffer,
}

impl<R: Read> PageReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            next_index: 0,
            buffer: PageBuffer::new([0u8; PAGE_SIZE]),
        }
    }

    /// Index the next call to [`next_page`](Self::next_page) will return.
    pub const fn next_index(&self) -> u32 {
        self.next_index
    }

    /// Read the next page.
    ///
    /// `Ok(None)` at end of input. A short final page comes back zero-padded.
    pub fn next_page(&mut self) -> Result<Option<(u32, &[u8; PAGE_SIZE])>, DecryptError> {
        let n = read_page(&mut self.inner, self.buffer.expose_secret_mut())?;
        if n == 0 {
            return Ok(None);
        }
        if n < PAGE_SIZE {
            tracing::debug!(page = self.next_index, bytes = n, "short trailing page zero-padded");
        }
        let index = self.next_index;
        self.next_index = self.next_index.wrapping_add(1);
        Ok(Some((index, self.buffer.expose_secret())))
    }
}

//! Line buffer for console input

/// Bytes per console line.  Reaching it is an overflow.
pub const LINE_SIZE: usize = 128;

/// Returned by [`LineBuffer::push`] when the line hit capacity; the buffer
/// has already been cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow;

/// Line input buffer
pub struct LineBuffer {
    buf: [u8; LINE_SIZE],
    len: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuffer {
    /// Create empty buffer
    pub const fn new() -> Self {
        Self {
            buf: [0u8; LINE_SIZE],
            len: 0,
        }
    }

    /// Append a byte.  The byte that fills the last slot overflows the
    /// line: the buffer is reset and `Overflow` returned.
    pub fn push(&mut self, c: u8) -> Result<(), Overflow> {
        self.buf[self.len] = c;
        self.len += 1;
        if self.len == LINE_SIZE {
            self.clear();
            return Err(Overflow);
        }
        Ok(())
    }

    /// Clear buffer
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Get buffer as string slice (empty if not UTF-8)
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

//! Byte stream buffer
//!
//! An append/consume queue sitting between the PTY reader and the tokenizer.
//! Bytes are appended at the tail and consumed from the head; the tokenizer
//! inspects the unconsumed window without copying it.

/// Capacity the buffer starts with and shrinks back to once fully drained
pub const DEFAULT_CAPACITY: usize = 4096;

/// Growable byte queue with a read cursor
#[derive(Debug, Clone)]
pub struct ByteStream {
    buf: Vec<u8>,
    consumed: usize,
}

impl Default for ByteStream {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteStream {
    /// Create an empty stream with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty stream with a specific initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            consumed: 0,
        }
    }

    /// Append bytes at the tail
    pub fn append(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }

        // Reclaim the consumed prefix before growing.
        if self.consumed > 0 && self.buf.len() + bytes.len() > self.buf.capacity() {
            self.compact();
        }

        let needed = self.buf.len() + bytes.len();
        if needed > self.buf.capacity() {
            let target = needed.max(self.buf.capacity() * 2);
            self.buf.reserve_exact(target - self.buf.len());
        }
        self.buf.extend_from_slice(bytes);
    }

    /// The bytes that have not been consumed yet
    pub fn unconsumed(&self) -> &[u8] {
        &self.buf[self.consumed..]
    }

    /// Advance the read cursor by `n` bytes (clamped to what is available)
    pub fn consume(&mut self, n: usize) {
        self.consumed = (self.consumed + n).min(self.buf.len());
        if self.consumed == self.buf.len() {
            self.drain_all();
        }
    }

    /// Number of unconsumed bytes
    pub fn len(&self) -> usize {
        self.buf.len() - self.consumed
    }

    /// True when every appended byte has been consumed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current allocation size
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Drop all pending bytes
    pub fn clear(&mut self) {
        self.drain_all();
    }

    fn compact(&mut self) {
        self.buf.drain(..self.consumed);
        self.consumed = 0;
    }

    fn drain_all(&mut self) {
        self.buf.clear();
        self.consumed = 0;
        if self.buf.capacity() > DEFAULT_CAPACITY {
            self.buf.shrink_to(DEFAULT_CAPACITY);
        }
    }
}

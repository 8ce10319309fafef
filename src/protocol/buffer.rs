//! Per-session peek buffer

/// Fixed-capacity buffer that receives repeated non-destructive peeks
///
/// Because a peek always returns the socket's queued bytes from the start,
/// every successful peek into this buffer overwrites a prefix that already
/// contains everything seen before. `read_count` only records how far that
/// prefix has grown.
#[derive(Debug)]
pub struct PeekBuffer {
    data: Box<[u8]>,
    read_count: usize,
}

impl PeekBuffer {
    /// Allocate a zeroed buffer of `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            read_count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Bytes examined so far
    pub fn read_count(&self) -> usize {
        self.read_count
    }

    /// Writable view for the next peek
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Record the result of a peek that returned `n` bytes
    ///
    /// Returns `true` when genuinely new bytes arrived. A stale peek
    /// (`n <= read_count`) leaves the count untouched.
    pub fn record(&mut self, n: usize) -> bool {
        let n = n.min(self.capacity());
        if n <= self.read_count {
            return false;
        }
        self.read_count = n;
        true
    }

    /// The received prefix `[0, read_count)`
    pub fn filled(&self) -> &[u8] {
        &self.data[..self.read_count]
    }

    pub fn is_full(&self) -> bool {
        self.read_count == self.capacity()
    }
}

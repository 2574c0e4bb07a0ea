//! Circular byte buffer: the engine's only I/O primitive.
//!
//! Every component that crosses the "bytes in / bytes out" boundary — the
//! range coder's compressed stream, the decoder's dictionary, the match
//! finder's lookahead window — is built on top of one of these. There is no
//! blocking I/O anywhere in this crate: callers push bytes in with
//! [`CircularBuffer::write_data`] and pull bytes out with
//! [`CircularBuffer::read_data`], and the buffer itself never touches a file
//! descriptor or socket.
//!
//! The layout keeps one byte of slack between `put` and `get` so that "full"
//! and "empty" are never the same state.

/// A fixed-capacity ring of bytes with independent read (`get`) and write
/// (`put`) cursors.
#[derive(Debug, Clone)]
pub struct CircularBuffer {
    buffer: Vec<u8>,
    get: usize,
    put: usize,
}

impl CircularBuffer {
    /// Allocate a buffer able to hold `size` bytes of useful data.
    ///
    /// The backing storage is `size + 1` bytes so that `get == put` is
    /// unambiguous (always "empty").
    pub fn new(size: usize) -> Self {
        Self {
            buffer: vec![0u8; size + 1],
            get: 0,
            put: 0,
        }
    }

    /// Total capacity in bytes (excludes the one-byte disambiguation slot).
    pub fn capacity(&self) -> usize {
        self.buffer.len() - 1
    }

    /// Discard all buffered data.
    pub fn reset(&mut self) {
        self.get = 0;
        self.put = 0;
    }

    /// `true` if no bytes are currently buffered.
    pub fn is_empty(&self) -> bool {
        self.get == self.put
    }

    /// Number of bytes currently available to read.
    pub fn used_bytes(&self) -> usize {
        let buffer_size = self.buffer.len();
        (if self.get <= self.put { 0 } else { buffer_size }) + self.put - self.get
    }

    /// Number of bytes that can still be written before the buffer is full.
    pub fn free_bytes(&self) -> usize {
        let buffer_size = self.buffer.len();
        (if self.get <= self.put { buffer_size } else { 0 }) - self.put + self.get - 1
    }

    /// Read a single byte, advancing `get`. Caller must ensure the buffer is
    /// non-empty.
    #[inline]
    pub fn get_byte(&mut self) -> u8 {
        let byte = self.buffer[self.get];
        self.get += 1;
        if self.get >= self.buffer.len() {
            self.get = 0;
        }
        byte
    }

    /// Write a single byte, advancing `put`. Caller must ensure the buffer
    /// has free space.
    #[inline]
    pub fn put_byte(&mut self, byte: u8) {
        self.buffer[self.put] = byte;
        self.put += 1;
        if self.put >= self.buffer.len() {
            self.put = 0;
        }
    }

    /// Roll `get` backward by `size` bytes, "un-consuming" data that was
    /// already read. Used when a member header turns out to belong to a new
    /// member and the peeked bytes must be put back.
    ///
    /// Returns `false` if there isn't `size` bytes of free space to roll
    /// back into (i.e. the data to unread was already overwritten).
    pub fn unread_data(&mut self, size: usize) -> bool {
        if size > self.free_bytes() {
            return false;
        }
        let buffer_size = self.buffer.len();
        self.get = (self.get + buffer_size - size) % buffer_size;
        true
    }

    /// Read up to `out.len()` bytes into `out`, returning the number of
    /// bytes actually copied (bounded by `used_bytes`).
    pub fn read_data(&mut self, out: &mut [u8]) -> usize {
        let size = out.len().min(self.used_bytes());
        if size == 0 {
            return 0;
        }
        let buffer_size = self.buffer.len();
        let rest = buffer_size - self.get;
        if rest >= size {
            out[..size].copy_from_slice(&self.buffer[self.get..self.get + size]);
            self.get += size;
            if self.get >= buffer_size {
                self.get = 0;
            }
        } else {
            out[..rest].copy_from_slice(&self.buffer[self.get..buffer_size]);
            let remaining = size - rest;
            out[rest..size].copy_from_slice(&self.buffer[0..remaining]);
            self.get = remaining;
        }
        size
    }

    /// Write up to `data.len()` bytes, returning the number of bytes
    /// actually copied (bounded by `free_bytes`).
    pub fn write_data(&mut self, data: &[u8]) -> usize {
        let size = data.len().min(self.free_bytes());
        if size == 0 {
            return 0;
        }
        let buffer_size = self.buffer.len();
        let rest = buffer_size - self.put;
        if rest >= size {
            self.buffer[self.put..self.put + size].copy_from_slice(&data[..size]);
            self.put += size;
            if self.put >= buffer_size {
                self.put = 0;
            }
        } else {
            self.buffer[self.put..buffer_size].copy_from_slice(&data[..rest]);
            let remaining = size - rest;
            self.buffer[0..remaining].copy_from_slice(&data[rest..size]);
            self.put = remaining;
        }
        size
    }

    /// Peek at the next byte to be read, without consuming it. Caller must
    /// ensure the buffer is non-empty.
    #[inline]
    pub fn peek_front(&self) -> u8 {
        self.buffer[self.get]
    }

    /// Peek at the next `N` bytes to be read without consuming them.
    /// Returns `None` if fewer than `N` bytes are currently buffered.
    pub fn peek_front_n<const N: usize>(&self) -> Option<[u8; N]> {
        if self.used_bytes() < N {
            return None;
        }
        let mut out = [0u8; N];
        let buffer_size = self.buffer.len();
        let mut idx = self.get;
        for slot in out.iter_mut() {
            *slot = self.buffer[idx];
            idx += 1;
            if idx >= buffer_size {
                idx = 0;
            }
        }
        Some(out)
    }

    /// Overwrite the first `data.len()` bytes still waiting to be read,
    /// without touching `get`/`put`. Used to patch a member header already
    /// pushed into the output ring before any of it has been drained.
    /// Returns `false` if fewer than `data.len()` bytes are buffered.
    pub fn overwrite_front(&mut self, data: &[u8]) -> bool {
        if self.used_bytes() < data.len() {
            return false;
        }
        let buffer_size = self.buffer.len();
        let mut idx = self.get;
        for &byte in data {
            self.buffer[idx] = byte;
            idx += 1;
            if idx >= buffer_size {
                idx = 0;
            }
        }
        true
    }

    /// Peek at a byte `distance + 1` positions behind the write cursor,
    /// without consuming anything. Used by the LZ decoder to read back
    /// through the dictionary (`distance == 0` is the most recently written
    /// byte).
    #[inline]
    pub fn peek(&self, distance: usize) -> u8 {
        let buffer_size = self.buffer.len();
        let idx = (self.put + buffer_size - distance - 1) % buffer_size;
        self.buffer[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_reports_correctly() {
        let cb = CircularBuffer::new(16);
        assert!(cb.is_empty());
        assert_eq!(cb.used_bytes(), 0);
        assert_eq!(cb.free_bytes(), 16);
    }

    #[test]
    fn write_then_read_roundtrips() {
        let mut cb = CircularBuffer::new(16);
        let written = cb.write_data(b"hello");
        assert_eq!(written, 5);
        assert_eq!(cb.used_bytes(), 5);

        let mut out = [0u8; 5];
        let read = cb.read_data(&mut out);
        assert_eq!(read, 5);
        assert_eq!(&out, b"hello");
        assert!(cb.is_empty());
    }

    #[test]
    fn wraps_around_the_end() {
        let mut cb = CircularBuffer::new(8);
        assert_eq!(cb.write_data(b"abcdefg"), 7);
        let mut out = [0u8; 5];
        assert_eq!(cb.read_data(&mut out), 5);
        assert_eq!(&out, b"abcde");
        // put is now at 7, get at 5; writing 4 more bytes wraps.
        assert_eq!(cb.write_data(b"WXYZ"), 4);
        let mut out2 = [0u8; 6];
        assert_eq!(cb.read_data(&mut out2), 6);
        assert_eq!(&out2, b"fgWXYZ");
    }

    #[test]
    fn free_bytes_caps_writes() {
        let mut cb = CircularBuffer::new(4);
        assert_eq!(cb.write_data(b"abcdef"), 4);
        assert_eq!(cb.free_bytes(), 0);
        assert_eq!(cb.write_data(b"x"), 0);
    }

    #[test]
    fn unread_data_rolls_get_back() {
        let mut cb = CircularBuffer::new(8);
        cb.write_data(b"abcd");
        let mut out = [0u8; 2];
        cb.read_data(&mut out);
        assert_eq!(&out, b"ab");
        assert!(cb.unread_data(2));
        let mut out2 = [0u8; 4];
        assert_eq!(cb.read_data(&mut out2), 4);
        assert_eq!(&out2, b"abcd");
    }

    #[test]
    fn peek_reads_behind_put() {
        let mut cb = CircularBuffer::new(8);
        cb.write_data(b"abc");
        assert_eq!(cb.peek(0), b'c');
        assert_eq!(cb.peek(1), b'b');
        assert_eq!(cb.peek(2), b'a');
    }
}

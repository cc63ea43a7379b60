//! Bounded byte streams shared between a producer and a consumer.
//!
//! A [`ByteStream`] is a FIFO of bytes with a fixed capacity, a one-way
//! `closed` flag sealed by the writer, and a sticky `error` flag visible
//! from both ends. The two halves of the API are exposed as the [`Writer`]
//! and [`Reader`] views so that distinct collaborators (say, a reassembler
//! holding the writing end and an application holding the reading end) each
//! see only the operations that belong to them.

use std::collections::VecDeque;

/// A bounded FIFO of bytes with close/error flags and lifetime counters.
#[derive(Debug)]
pub struct ByteStream {
    capacity: usize,
    buffer: VecDeque<u8>,
    closed: bool,
    error: bool,
    bytes_pushed: u64,
    bytes_popped: u64,
}

impl ByteStream {
    /// Creates a stream that buffers at most `capacity` bytes at a time.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buffer: VecDeque::with_capacity(capacity),
            closed: false,
            error: false,
            bytes_pushed: 0,
            bytes_popped: 0,
        }
    }

    /// The producer's view of the stream.
    pub fn writer(&mut self) -> Writer<'_> {
        Writer { stream: self }
    }

    /// The consumer's view of the stream.
    pub fn reader(&mut self) -> Reader<'_> {
        Reader { stream: self }
    }

    /// How many more bytes can be pushed right now.
    pub fn available_capacity(&self) -> usize {
        self.capacity - self.buffer.len()
    }

    /// Number of bytes currently buffered (pushed and not yet popped).
    pub fn bytes_buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Total number of bytes cumulatively pushed to the stream.
    pub fn bytes_pushed(&self) -> u64 {
        self.bytes_pushed
    }

    /// Total number of bytes cumulatively popped from the stream.
    pub fn bytes_popped(&self) -> u64 {
        self.bytes_popped
    }

    /// Has the writing side been sealed?
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Closed and fully drained.
    pub fn is_finished(&self) -> bool {
        self.closed && self.buffer.is_empty()
    }

    /// Has the stream been marked unrecoverable?
    pub fn has_error(&self) -> bool {
        self.error
    }
}

/// The producing half of a [`ByteStream`].
#[derive(Debug)]
pub struct Writer<'a> {
    stream: &'a mut ByteStream,
}

impl Writer<'_> {
    /// Pushes as much of `data` as the remaining capacity allows. Excess
    /// bytes are dropped; callers that care must check
    /// [`available_capacity`](Self::available_capacity) first. A push to a
    /// closed stream is a no-op.
    pub fn push(&mut self, data: &[u8]) {
        if self.stream.closed {
            return;
        }
        let admitted = data.len().min(self.stream.available_capacity());
        self.stream.buffer.extend(&data[..admitted]);
        self.stream.bytes_pushed += admitted as u64;
    }

    /// Signals that the stream has reached its ending. Idempotent.
    pub fn close(&mut self) {
        self.stream.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_closed()
    }

    pub fn available_capacity(&self) -> usize {
        self.stream.available_capacity()
    }

    pub fn bytes_pushed(&self) -> u64 {
        self.stream.bytes_pushed()
    }

    /// Marks the stream unrecoverable. The flag is shared with the reader.
    pub fn set_error(&mut self) {
        self.stream.error = true;
    }

    pub fn has_error(&self) -> bool {
        self.stream.has_error()
    }
}

/// The consuming half of a [`ByteStream`].
#[derive(Debug)]
pub struct Reader<'a> {
    stream: &'a mut ByteStream,
}

impl Reader<'_> {
    /// A contiguous slice of buffered bytes, nonempty whenever anything is
    /// buffered. Not guaranteed to cover the whole buffer in one call.
    pub fn peek(&self) -> &[u8] {
        self.stream.buffer.as_slices().0
    }

    /// Discards up to `len` bytes from the front of the buffer.
    pub fn pop(&mut self, len: usize) {
        let popped = len.min(self.stream.buffer.len());
        self.stream.buffer.drain(..popped);
        self.stream.bytes_popped += popped as u64;
    }

    /// Closed and fully popped.
    pub fn is_finished(&self) -> bool {
        self.stream.is_finished()
    }

    pub fn bytes_buffered(&self) -> usize {
        self.stream.bytes_buffered()
    }

    pub fn bytes_popped(&self) -> u64 {
        self.stream.bytes_popped()
    }

    /// Marks the stream unrecoverable. The flag is shared with the writer.
    pub fn set_error(&mut self) {
        self.stream.error = true;
    }

    pub fn has_error(&self) -> bool {
        self.stream.has_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_pop() {
        let mut stream = ByteStream::new(8);
        stream.writer().push(b"hello");
        assert_eq!(stream.bytes_buffered(), 5);
        assert_eq!(stream.bytes_pushed(), 5);
        assert_eq!(stream.available_capacity(), 3);

        assert_eq!(stream.reader().peek(), &b"hello"[..]);
        stream.reader().pop(2);
        assert_eq!(stream.reader().peek(), &b"llo"[..]);
        assert_eq!(stream.bytes_popped(), 2);
        assert_eq!(stream.bytes_buffered(), 3);
        assert_eq!(stream.available_capacity(), 5);
    }

    #[test]
    fn push_respects_capacity() {
        let mut stream = ByteStream::new(4);
        stream.writer().push(b"abcdef");
        assert_eq!(stream.bytes_pushed(), 4);
        assert_eq!(stream.reader().peek(), &b"abcd"[..]);

        stream.reader().pop(2);
        stream.writer().push(b"xyz");
        assert_eq!(stream.bytes_pushed(), 6);
        assert_eq!(stream.bytes_buffered(), 4);
    }

    #[test]
    fn pop_clamps_to_buffered() {
        let mut stream = ByteStream::new(4);
        stream.writer().push(b"ab");
        stream.reader().pop(100);
        assert_eq!(stream.bytes_popped(), 2);
        assert_eq!(stream.bytes_buffered(), 0);
    }

    #[test]
    fn close_is_one_way() {
        let mut stream = ByteStream::new(4);
        stream.writer().push(b"ab");
        stream.writer().close();
        assert!(stream.is_closed());
        assert!(!stream.reader().is_finished());

        stream.writer().push(b"cd");
        assert_eq!(stream.bytes_pushed(), 2);

        stream.reader().pop(2);
        assert!(stream.reader().is_finished());
    }

    #[test]
    fn error_is_shared_and_orthogonal_to_close() {
        let mut stream = ByteStream::new(4);
        stream.reader().set_error();
        assert!(stream.writer().has_error());
        assert!(!stream.is_closed());

        let mut other = ByteStream::new(4);
        other.writer().set_error();
        assert!(other.reader().has_error());
    }

    #[test]
    fn counters_stay_consistent() {
        let mut stream = ByteStream::new(3);
        for chunk in [&b"ab"[..], b"cde", b"f"] {
            stream.writer().push(chunk);
            let buffered = stream.bytes_buffered() as u64;
            assert_eq!(stream.bytes_pushed() - stream.bytes_popped(), buffered);
            assert!(buffered <= 3);
            stream.reader().pop(1);
        }
        assert!(stream.bytes_popped() <= stream.bytes_pushed());
    }

    #[test]
    fn peek_nonempty_while_buffered() {
        let mut stream = ByteStream::new(4);
        stream.writer().push(b"abcd");
        stream.reader().pop(3);
        stream.writer().push(b"ef");
        // The ring may wrap internally, but peek must still yield bytes.
        let mut drained = Vec::new();
        while stream.bytes_buffered() > 0 {
            let chunk = stream.reader().peek().to_vec();
            assert!(!chunk.is_empty());
            stream.reader().pop(chunk.len());
            drained.extend(chunk);
        }
        assert_eq!(drained, b"def");
    }
}

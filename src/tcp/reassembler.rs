//! Splices out-of-order, possibly overlapping substrings into an in-order
//! byte stream.

use crate::byte_stream::{ByteStream, Reader, Writer};
use std::collections::BTreeMap;

/// Accepts substrings of a byte stream at arbitrary offsets, in any order
/// and with arbitrary overlap, and pushes them into the output
/// [`ByteStream`] as soon as the prefix is contiguous.
///
/// Only bytes that fall inside the output's current window
/// (`[first_unassembled, first_unassembled + available_capacity)`) are
/// stored; everything else is dropped and must be retransmitted by the
/// peer. Stored segments never overlap or abut one another.
#[derive(Debug)]
pub struct Reassembler {
    output: ByteStream,
    /// Pending segments keyed by their first stream index.
    segments: BTreeMap<u64, Vec<u8>>,
    /// Index of the next byte to be pushed to the output.
    first_unassembled: u64,
    /// One past the stream's final byte, once the last substring is seen.
    last_index: u64,
    has_last_substring: bool,
}

impl Reassembler {
    /// Creates a reassembler whose output stream buffers `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            output: ByteStream::new(capacity),
            segments: BTreeMap::new(),
            first_unassembled: 0,
            last_index: 0,
            has_last_substring: false,
        }
    }

    /// Inserts `data` at stream index `first_index`. `is_last_substring`
    /// marks the substring that ends the stream; once every byte before
    /// that ending has been assembled, the output is closed.
    pub fn insert(&mut self, first_index: u64, data: &[u8], is_last_substring: bool) {
        if is_last_substring {
            self.has_last_substring = true;
            self.last_index = first_index.saturating_add(data.len() as u64);
        }

        // Clip the substring to the output's window.
        let window_left = self.first_unassembled;
        let window_right = window_left.saturating_add(self.output.available_capacity() as u64);
        let left = window_left.max(first_index);
        let right = window_right.min(first_index.saturating_add(data.len() as u64));
        if right > left {
            let slice = &data[(left - first_index) as usize..(right - first_index) as usize];
            self.store(left, slice.to_vec());
        }

        // Push the contiguous prefix, if any, to the output.
        while let Some(payload) = self.segments.remove(&self.first_unassembled) {
            self.first_unassembled += payload.len() as u64;
            self.output.writer().push(&payload);
        }

        if self.has_last_substring && self.first_unassembled == self.last_index {
            self.output.writer().close();
        }
    }

    /// Stores a segment, keeping the no-overlap-no-abut invariant by
    /// merging with the neighbors on either side.
    fn store(&mut self, first_index: u64, data: Vec<u8>) {
        match self.segments.get_mut(&first_index) {
            // Two segments with the same start: the longer one wins.
            Some(existing) => {
                if existing.len() < data.len() {
                    *existing = data;
                }
            }
            None => {
                self.segments.insert(first_index, data);
            }
        }

        // If the left neighbor reaches or abuts the new segment, the merge
        // run starts there instead.
        let mut run_start = first_index;
        if let Some((&prev_index, prev)) = self.segments.range(..first_index).next_back() {
            if prev_index + prev.len() as u64 >= first_index {
                run_start = prev_index;
            }
        }
        self.merge_from(run_start);
    }

    /// Absorbs successive right neighbors into the segment at `index` while
    /// they overlap or abut it.
    fn merge_from(&mut self, index: u64) {
        let Some(mut run) = self.segments.remove(&index) else {
            return;
        };
        loop {
            let end = index + run.len() as u64;
            let next_index = match self.segments.range(index + 1..).next() {
                Some((&next_index, _)) if next_index <= end => next_index,
                _ => break,
            };
            if let Some(next) = self.segments.remove(&next_index) {
                let next_end = next_index + next.len() as u64;
                if next_end > end {
                    run.extend_from_slice(&next[(end - next_index) as usize..]);
                }
            }
        }
        self.segments.insert(index, run);
    }

    /// The stream index of the next byte the output is waiting for.
    pub fn next_byte(&self) -> u64 {
        self.first_unassembled
    }

    /// How many bytes are stored in the reassembler itself, awaiting their
    /// predecessors. Computed by summation; for testing.
    pub fn count_bytes_pending(&self) -> u64 {
        self.segments.values().map(|data| data.len() as u64).sum()
    }

    /// Read-only access to the output stream.
    pub fn output(&self) -> &ByteStream {
        &self.output
    }

    /// The output stream's writing end.
    pub fn writer(&mut self) -> Writer<'_> {
        self.output.writer()
    }

    /// The output stream's reading end.
    pub fn reader(&mut self) -> Reader<'_> {
        self.output.reader()
    }
}

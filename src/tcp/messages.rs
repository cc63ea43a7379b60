//! The two message types exchanged between the ends of a connection.
//!
//! Byte-exact parse/serialize of these onto the wire is the business of the
//! framing layer; inside the stack they travel as plain structs.

use super::Wrap32;

/// A message from the sending side of a connection: the segment's sequence
/// number, control flags, and payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TcpSenderMessage {
    /// Sequence number of the first sequence-occupying item in the segment.
    pub seqno: Wrap32,
    /// Synchronize: this segment begins the stream. Occupies one seqno.
    pub syn: bool,
    pub payload: Vec<u8>,
    /// Finish: this segment ends the stream. Occupies one seqno.
    pub fin: bool,
    /// Reset: the connection is unrecoverable.
    pub rst: bool,
}

impl TcpSenderMessage {
    /// How many sequence numbers the segment occupies: SYN and FIN count
    /// one each, plus one per payload byte.
    pub fn sequence_length(&self) -> u64 {
        self.syn as u64 + self.payload.len() as u64 + self.fin as u64
    }
}

/// A message from the receiving side of a connection: the acknowledgment
/// and the advertised window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcpReceiverMessage {
    /// The next sequence number the receiver expects. Absent until the
    /// stream's SYN has been seen.
    pub ackno: Option<Wrap32>,
    /// How many more bytes the receiver is willing to buffer.
    pub window_size: u16,
    /// Reset: the connection is unrecoverable.
    pub rst: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_length_counts_flags() {
        let mut message = TcpSenderMessage {
            seqno: Wrap32::new(0),
            syn: true,
            payload: b"cat".to_vec(),
            fin: true,
            rst: false,
        };
        assert_eq!(message.sequence_length(), 5);
        message.syn = false;
        message.fin = false;
        assert_eq!(message.sequence_length(), 3);
        message.payload.clear();
        assert_eq!(message.sequence_length(), 0);
    }
}

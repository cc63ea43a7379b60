//! The ingest side of a connection.

use super::{Reassembler, TcpReceiverMessage, TcpSenderMessage, Wrap32};
use crate::byte_stream::Reader;

/// Turns peer [`TcpSenderMessage`]s into [`Reassembler`] inserts and
/// produces the acknowledgments and window advertisements flowing back.
///
/// The SYN pins the connection's initial sequence number; until one
/// arrives, segments are ignored and no ackno is produced. SYN and FIN
/// each occupy one sequence number but no stream byte, so the stream
/// index of a payload is its absolute sequence number minus one (or the
/// absolute sequence number itself on the SYN segment).
#[derive(Debug)]
pub struct TcpReceiver {
    isn: Option<Wrap32>,
    reassembler: Reassembler,
}

impl TcpReceiver {
    pub fn new(reassembler: Reassembler) -> Self {
        Self {
            isn: None,
            reassembler,
        }
    }

    /// Processes one segment from the peer.
    pub fn receive(&mut self, message: TcpSenderMessage) {
        if message.rst {
            self.reassembler.reader().set_error();
            return;
        }

        if message.syn {
            self.isn = Some(message.seqno);
        }
        let Some(isn) = self.isn else {
            return;
        };

        let abs_seqno = message.seqno.unwrap(isn, self.reassembler.next_byte());
        // The SYN sits at absolute seqno 0 and its payload (if any) at
        // stream index 0; every later segment's payload sits one below its
        // absolute seqno. A bogus segment claiming the SYN's slot wraps to
        // a huge index and falls outside the window.
        let stream_index = abs_seqno.wrapping_sub(!message.syn as u64);
        self.reassembler
            .insert(stream_index, &message.payload, message.fin);
    }

    /// The acknowledgment and window advertisement to send back.
    pub fn send(&self) -> TcpReceiverMessage {
        let ackno = self.isn.map(|isn| {
            // SYN counts one seqno, and FIN counts one more once the
            // stream has closed.
            let next = self.reassembler.next_byte() + 1 + self.reassembler.output().is_closed() as u64;
            Wrap32::wrap(next, isn)
        });

        TcpReceiverMessage {
            ackno,
            window_size: self.reassembler.output().available_capacity().min(65535) as u16,
            rst: self.reassembler.output().has_error(),
        }
    }

    pub fn reassembler(&self) -> &Reassembler {
        &self.reassembler
    }

    /// The inbound stream's reading end, for the application.
    pub fn reader(&mut self) -> Reader<'_> {
        self.reassembler.reader()
    }
}

//! The egress side of a connection, with the retransmission timer.

use super::{TcpReceiverMessage, TcpSenderMessage, Wrap32, MAX_PAYLOAD_SIZE};
use crate::byte_stream::{ByteStream, Writer};
use std::collections::VecDeque;

/// A transmitted segment awaiting acknowledgment. Everything needed to
/// rebuild the [`TcpSenderMessage`] on retransmission is recorded here.
#[derive(Debug)]
struct OutstandingSegment {
    /// Absolute seqno of the segment's first sequence-occupying item.
    first_index: u64,
    syn: bool,
    fin: bool,
    payload: Vec<u8>,
}

impl OutstandingSegment {
    fn sequence_length(&self) -> u64 {
        self.syn as u64 + self.payload.len() as u64 + self.fin as u64
    }
}

/// Reads from its outbound [`ByteStream`] and produces
/// [`TcpSenderMessage`]s as the peer's advertised window allows, keeping
/// each segment on an outstanding queue until it is acknowledged.
///
/// A single retransmission timer covers the oldest outstanding segment.
/// The timeout doubles on each expiry while the peer advertises a nonzero
/// window; a zero window is probed with single-seqno segments at the
/// initial timeout, since the peer is asking us to wait, not signalling
/// congestion.
#[derive(Debug)]
pub struct TcpSender {
    input: ByteStream,
    isn: Wrap32,
    initial_rto_ms: u64,

    /// Next absolute seqno to emit. Counts SYN, payload bytes, and FIN.
    abs_seqno: u64,
    /// Highest acknowledged absolute seqno.
    abs_ackno: u64,
    /// Latest advertised receiver window. Treated as 1 when 0.
    rwnd: u16,
    sequence_numbers_in_flight: u64,
    consecutive_retransmissions: u64,

    rto_ms: u64,
    rto_timer: u64,
    timer_running: bool,

    first_message: bool,
    finished: bool,

    outstanding: VecDeque<OutstandingSegment>,
}

impl TcpSender {
    /// Creates a sender over a fresh outbound stream of the given capacity.
    /// When `fixed_isn` is absent, a random initial sequence number is
    /// chosen.
    pub fn new(capacity: usize, initial_rto_ms: u64, fixed_isn: Option<Wrap32>) -> Self {
        Self {
            input: ByteStream::new(capacity),
            isn: fixed_isn.unwrap_or_else(Wrap32::random),
            initial_rto_ms,
            abs_seqno: 0,
            abs_ackno: 0,
            rwnd: 1,
            sequence_numbers_in_flight: 0,
            consecutive_retransmissions: 0,
            rto_ms: initial_rto_ms,
            rto_timer: 0,
            timer_running: false,
            first_message: true,
            finished: false,
            outstanding: VecDeque::new(),
        }
    }

    /// How many sequence numbers are outstanding?
    pub fn sequence_numbers_in_flight(&self) -> u64 {
        self.sequence_numbers_in_flight
    }

    /// How many consecutive retransmissions have happened?
    pub fn consecutive_retransmissions(&self) -> u64 {
        self.consecutive_retransmissions
    }

    /// The outbound stream's writing end, for the application.
    pub fn writer(&mut self) -> Writer<'_> {
        self.input.writer()
    }

    /// Emits as many new segments as the window allows, handing each to
    /// `transmit`.
    pub fn push(&mut self, mut transmit: impl FnMut(&TcpSenderMessage)) {
        while !self.finished {
            // rwnd constrains sequence numbers, MAX_PAYLOAD_SIZE constrains
            // payload bytes; +2 widens the budget for SYN and FIN, which
            // occupy seqnos but no payload space.
            let window = u64::from(self.rwnd.max(1));
            if self.sequence_numbers_in_flight >= window {
                return;
            }
            let mut budget =
                (window - self.sequence_numbers_in_flight).min(MAX_PAYLOAD_SIZE as u64 + 2);

            let mut message = self.make_empty_message();
            if self.first_message {
                self.first_message = false;
                message.syn = true;
                budget -= 1;
            }

            let take = MAX_PAYLOAD_SIZE
                .min(budget as usize)
                .min(self.input.bytes_buffered());
            let mut payload = Vec::with_capacity(take);
            {
                let mut reader = self.input.reader();
                while payload.len() < take {
                    let chunk = reader.peek();
                    let n = chunk.len().min(take - payload.len());
                    payload.extend_from_slice(&chunk[..n]);
                    reader.pop(n);
                }
            }
            budget -= payload.len() as u64;

            if self.input.is_finished() && budget > 0 {
                message.fin = true;
                self.finished = true;
            }
            message.payload = payload;

            let sequence_length = message.sequence_length();
            if sequence_length == 0 {
                return;
            }
            transmit(&message);

            self.outstanding.push_back(OutstandingSegment {
                first_index: self.abs_seqno,
                syn: message.syn,
                fin: message.fin,
                payload: message.payload,
            });
            self.abs_seqno += sequence_length;
            self.sequence_numbers_in_flight += sequence_length;

            if !self.timer_running {
                self.timer_running = true;
                self.rto_timer = 0;
                self.rto_ms = self.initial_rto_ms;
            }
        }
    }

    /// A flagless, payloadless segment at the current seqno. This is how
    /// caller code surfaces a local RST while otherwise idle.
    pub fn make_empty_message(&self) -> TcpSenderMessage {
        TcpSenderMessage {
            seqno: Wrap32::wrap(self.abs_seqno, self.isn),
            syn: false,
            payload: Vec::new(),
            fin: false,
            rst: self.input.has_error(),
        }
    }

    /// Processes an acknowledgment and window advertisement from the peer.
    pub fn receive(&mut self, message: &TcpReceiverMessage) {
        let Some(ackno) = message.ackno else {
            if message.window_size == 0 {
                // No ack and no window: the peer has declared our stream
                // unrecoverable.
                self.input.writer().set_error();
                return;
            }
            if self.abs_ackno == 0 {
                self.rwnd = message.window_size;
            }
            return;
        };

        let abs_ackno = ackno.unwrap(self.isn, self.abs_ackno);
        // Stale acks and acks for unsent data are dropped.
        if abs_ackno < self.abs_ackno || abs_ackno > self.abs_seqno {
            return;
        }
        self.abs_ackno = abs_ackno;
        self.rwnd = message.window_size;

        while let Some(front) = self.outstanding.front() {
            let sequence_length = front.sequence_length().max(1);
            if self.abs_ackno < front.first_index + sequence_length {
                break;
            }
            self.sequence_numbers_in_flight -= sequence_length;
            self.outstanding.pop_front();

            self.rto_ms = self.initial_rto_ms;
            self.rto_timer = 0;
            self.consecutive_retransmissions = 0;
        }

        if self.outstanding.is_empty() {
            self.timer_running = false;
            self.rto_timer = 0;
            self.rto_ms = self.initial_rto_ms;
        }
    }

    /// Advances the retransmission timer, resending the oldest outstanding
    /// segment on expiry.
    pub fn tick(&mut self, ms_since_last_tick: u64, mut transmit: impl FnMut(&TcpSenderMessage)) {
        if !self.timer_running {
            return;
        }
        self.rto_timer += ms_since_last_tick;
        if self.rto_timer < self.rto_ms || self.outstanding.is_empty() {
            return;
        }
        self.rto_timer = 0;

        let rst = self.input.has_error();
        if let Some(front) = self.outstanding.front() {
            let message = TcpSenderMessage {
                seqno: Wrap32::wrap(front.first_index, self.isn),
                syn: front.syn,
                payload: front.payload.clone(),
                fin: front.fin,
                rst,
            };
            transmit(&message);
        }
        self.consecutive_retransmissions += 1;
        if self.rwnd > 0 {
            self.rto_ms *= 2;
        }
    }
}

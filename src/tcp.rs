//! The transport half of the stack: wrapping sequence numbers, stream
//! reassembly, and the sender/receiver state machines.
//!
//! A connection wires these together as follows: the application writes into
//! the [`TcpSender`]'s outbound [`ByteStream`](crate::ByteStream); `push`
//! turns buffered bytes into [`TcpSenderMessage`]s as the peer's advertised
//! window allows; the peer's [`TcpReceiver`] feeds each message through its
//! [`Reassembler`] into the inbound stream and answers with a
//! [`TcpReceiverMessage`] carrying the ackno and window. Retransmission is
//! driven by `tick` on the sender.

/// The MSS-equivalent cap on a single segment's payload. SYN and FIN occupy
/// sequence numbers but no payload space.
pub const MAX_PAYLOAD_SIZE: usize = 1000;

mod wrap32;
pub use wrap32::Wrap32;

mod messages;
pub use messages::{TcpReceiverMessage, TcpSenderMessage};

mod reassembler;
pub use reassembler::Reassembler;

mod receiver;
pub use receiver::TcpReceiver;

mod sender;
pub use sender::TcpSender;

#[cfg(test)]
mod tests;

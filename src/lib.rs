//! A user-space TCP/IP stack core: reliable byte-oriented transport over an
//! unreliable datagram service, plus the link-layer adaptation that carries
//! IP datagrams over Ethernet with dynamic address resolution.
//!
//! # Uses
//!
//! - Given a lossy, reordering datagram channel beneath it and a byte-stream
//!   producer/consumer above it, the transport half delivers the classic
//!   end-to-end reliability and flow-control guarantees of TCP.
//! - The link half encapsulates IP datagrams in Ethernet frames, resolving
//!   next-hop hardware addresses with ARP, and composes into a
//!   longest-prefix-match IPv4 router.
//!
//! # Organization
//!
//! - [`ByteStream`](byte_stream::ByteStream) is the bounded FIFO shared
//!   between the application and the transport machinery.
//! - [`tcp`] holds the transport state machines: sequence-number wrapping,
//!   stream reassembly, and the sender/receiver pair.
//! - [`ipv4`] and [`link`] hold the wire codecs and the
//!   [`NetworkInterface`](link::NetworkInterface).
//! - [`Router`](router::Router) forwards datagrams between interfaces.
//!
//! # Driving the stack
//!
//! Everything here is single-threaded and cooperative. No call blocks; the
//! host application drives progress with ingress calls (`receive`,
//! `recv_frame`, `insert`), egress pulls (`push`, `send`, `route`), and a
//! monotonic clock expressed as `tick(ms_since_last_tick)` on the
//! time-driven components.

pub mod byte_stream;
pub use byte_stream::ByteStream;

pub mod utility;

pub mod tcp;

pub mod ipv4;

pub mod link;

pub mod router;
pub use router::Router;

//! The IPv4 address type and the datagram wire codec.

mod address;
pub use address::Ipv4Address;

pub mod datagram;
pub use datagram::{Ipv4Datagram, Ipv4Header};

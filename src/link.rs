//! The link layer: Ethernet framing, ARP, and the network interface that
//! carries IP datagrams over both.

pub mod ethernet;
pub use ethernet::{EthernetAddress, EthernetFrame, EthernetHeader, ETHERTYPE_ARP, ETHERTYPE_IPV4};

pub mod arp;
pub use arp::{ArpPacket, Operation};

mod interface;
pub use interface::{NetworkInterface, OutputPort, ARP_RESEND_TIMEOUT_MS, MAPPING_CACHE_DURATION_MS};

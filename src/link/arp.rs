//! The ARP packet codec, modelled on IPv4-over-Ethernet ARP packets.
//!
//! <https://en.wikipedia.org/wiki/Address_Resolution_Protocol#Packet_structure>

use super::ethernet::{EthernetAddress, ETHERTYPE_IPV4};
use crate::ipv4::Ipv4Address;
use thiserror::Error as ThisError;

const HTYPE: u16 = 1;
const PTYPE: u16 = ETHERTYPE_IPV4;
const HLEN: u8 = 6;
const PLEN: u8 = 4;

/// The ARP opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Request = 1,
    Reply = 2,
}

/// An ARP packet for IPv4 over Ethernet.
#[derive(Debug, PartialEq, Eq, Copy, Hash, Clone)]
pub struct ArpPacket {
    pub operation: Operation,
    pub sender_ethernet_address: EthernetAddress,
    pub sender_ip_address: Ipv4Address,
    pub target_ethernet_address: EthernetAddress,
    pub target_ip_address: Ipv4Address,
}

impl ArpPacket {
    /// A request asking who holds `target_ip`. The unknown target hardware
    /// address is zeroed.
    pub fn new_request(
        sender_ethernet_address: EthernetAddress,
        sender_ip_address: Ipv4Address,
        target_ip_address: Ipv4Address,
    ) -> Self {
        Self {
            operation: Operation::Request,
            sender_ethernet_address,
            sender_ip_address,
            target_ethernet_address: EthernetAddress::ZERO,
            target_ip_address,
        }
    }

    /// A reply telling `target` that `sender_ip` is held by `sender_eth`.
    pub fn new_reply(
        sender_ethernet_address: EthernetAddress,
        sender_ip_address: Ipv4Address,
        target_ethernet_address: EthernetAddress,
        target_ip_address: Ipv4Address,
    ) -> Self {
        Self {
            operation: Operation::Reply,
            sender_ethernet_address,
            sender_ip_address,
            target_ethernet_address,
            target_ip_address,
        }
    }

    /// Creates the serialized ARP packet.
    pub fn build(&self) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::with_capacity(28);
        out.extend_from_slice(&HTYPE.to_be_bytes());
        out.extend_from_slice(&PTYPE.to_be_bytes());
        out.push(HLEN);
        out.push(PLEN);
        out.extend_from_slice(&(self.operation as u16).to_be_bytes());
        out.extend_from_slice(&self.sender_ethernet_address.to_bytes());
        out.extend_from_slice(&self.sender_ip_address.to_bytes());
        out.extend_from_slice(&self.target_ethernet_address.to_bytes());
        out.extend_from_slice(&self.target_ip_address.to_bytes());
        out
    }

    /// Parses an ARP packet from a byte iterator.
    pub fn from_bytes(mut bytes: impl Iterator<Item = u8>) -> Result<Self, ParseError> {
        let mut next =
            || -> Result<u8, ParseError> { bytes.next().ok_or(ParseError::HeaderTooShort) };

        let htype = u16::from_be_bytes([next()?, next()?]);
        let ptype = u16::from_be_bytes([next()?, next()?]);
        let hlen = next()?;
        let plen = next()?;
        if htype != HTYPE || ptype != PTYPE || hlen != HLEN || plen != PLEN {
            return Err(ParseError::UnsupportedFormat);
        }

        let operation = match u16::from_be_bytes([next()?, next()?]) {
            1 => Operation::Request,
            2 => Operation::Reply,
            _ => return Err(ParseError::InvalidOperation),
        };
        let sender_ethernet_address =
            EthernetAddress::new([next()?, next()?, next()?, next()?, next()?, next()?]);
        let sender_ip_address = Ipv4Address::new([next()?, next()?, next()?, next()?]);
        let target_ethernet_address =
            EthernetAddress::new([next()?, next()?, next()?, next()?, next()?, next()?]);
        let target_ip_address = Ipv4Address::new([next()?, next()?, next()?, next()?]);

        Ok(Self {
            operation,
            sender_ethernet_address,
            sender_ip_address,
            target_ethernet_address,
            target_ip_address,
        })
    }
}

#[derive(Debug, ThisError, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("The ARP header is incomplete")]
    HeaderTooShort,
    #[error("Invalid operation: should be 1 for request, 2 for reply")]
    InvalidOperation,
    #[error("Only Ethernet/IPv4 ARP packets are supported")]
    UnsupportedFormat,
}

use std::fmt::{self, Display};
use thiserror::Error as ThisError;

/// The ethertype marking an IPv4 payload.
pub const ETHERTYPE_IPV4: u16 = 0x0800;
/// The ethertype marking an ARP payload.
pub const ETHERTYPE_ARP: u16 = 0x0806;

/// An Ethernet (what ARP calls "hardware") address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EthernetAddress([u8; 6]);

impl EthernetAddress {
    /// The address `ff:ff:ff:ff:ff:ff`, received by every station.
    pub const BROADCAST: Self = Self([0xff; 6]);

    /// The all-zero address, used as the unknown target in ARP requests.
    pub const ZERO: Self = Self([0; 6]);

    /// Creates a new address from its six octets.
    pub const fn new(address: [u8; 6]) -> Self {
        Self(address)
    }

    /// Gets the address as a `[u8; 6]`.
    pub fn to_bytes(self) -> [u8; 6] {
        self.0
    }
}

impl Display for EthernetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl From<[u8; 6]> for EthernetAddress {
    fn from(address: [u8; 6]) -> Self {
        Self(address)
    }
}

impl From<EthernetAddress> for [u8; 6] {
    fn from(address: EthernetAddress) -> Self {
        address.0
    }
}

/// The fixed 14-byte Ethernet frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    pub dst: EthernetAddress,
    pub src: EthernetAddress,
    pub ethertype: u16,
}

/// An Ethernet frame: header plus payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthernetFrame {
    pub header: EthernetHeader,
    pub payload: Vec<u8>,
}

impl EthernetFrame {
    /// Parses a frame from its on-wire form.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        let mut bytes = bytes.iter().cloned();
        let mut next =
            || -> Result<u8, ParseError> { bytes.next().ok_or(ParseError::HeaderTooShort) };

        let dst = EthernetAddress::new([next()?, next()?, next()?, next()?, next()?, next()?]);
        let src = EthernetAddress::new([next()?, next()?, next()?, next()?, next()?, next()?]);
        let ethertype = u16::from_be_bytes([next()?, next()?]);
        let payload = bytes.collect();

        Ok(Self {
            header: EthernetHeader { dst, src, ethertype },
            payload,
        })
    }

    /// The on-wire form of the frame.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(14 + self.payload.len());
        out.extend_from_slice(&self.header.dst.to_bytes());
        out.extend_from_slice(&self.header.src.to_bytes());
        out.extend_from_slice(&self.header.ethertype.to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }
}

#[derive(Debug, ThisError, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("The Ethernet header is incomplete")]
    HeaderTooShort,
}

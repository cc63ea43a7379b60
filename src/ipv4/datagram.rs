use super::Ipv4Address;
use crate::utility::Checksum;
use thiserror::Error as ThisError;

/// The number of `u32` words in a basic IPv4 header
const BASE_WORDS: u8 = 5;
/// The number of `u8` bytes in a basic IPv4 header
const BASE_OCTETS: u16 = BASE_WORDS as u16 * 4;
/// This is bitwise anded with the `u16` containing flags and fragment offset
/// to extract the fragment offset part.
const FRAGMENT_OFFSET_MASK: u16 = 0x1fff;

/// Default time-to-live for locally originated datagrams.
pub const DEFAULT_TTL: u8 = 64;

/// An IPv4 header, as described in RFC 791 p11 s3.1. Only the fixed 20-byte
/// form is supported; datagrams carrying options fail to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Header {
    /// Internet Header Length, the number of `u32` words in the header
    pub ihl: u8,
    /// The quality of service desired, kept as the raw byte
    pub type_of_service: u8,
    /// The length of the datagram in bytes, header included
    pub total_length: u16,
    /// Assigned by the sender to aid in assembling fragments
    pub identification: u16,
    /// Fragmentation control bits, kept raw
    pub flags: u8,
    /// Where in the datagram this fragment belongs, in units of 8 bytes
    pub fragment_offset: u16,
    /// The number of remaining hops this datagram can take
    pub time_to_live: u8,
    /// The next level protocol in the data portion of the datagram
    pub protocol: u8,
    /// The header checksum as found on the wire. Recorded on parse but not
    /// verified; recomputed on serialize.
    pub checksum: u16,
    pub source: Ipv4Address,
    pub destination: Ipv4Address,
}

impl Ipv4Header {
    /// Parses a header from a byte iterator.
    pub fn from_bytes(mut bytes: impl Iterator<Item = u8>) -> Result<Self, ParseError> {
        let mut next =
            || -> Result<u8, ParseError> { bytes.next().ok_or(ParseError::HeaderTooShort) };

        let version_and_ihl = next()?;
        let version = version_and_ihl >> 4;
        if version != 4 {
            Err(ParseError::IncorrectIpv4Version)?
        }
        let ihl = version_and_ihl & 0b1111;
        if ihl != BASE_WORDS {
            Err(ParseError::InvalidHeaderLength)?
        }

        let type_of_service = next()?;
        let total_length = u16::from_be_bytes([next()?, next()?]);
        let identification = u16::from_be_bytes([next()?, next()?]);

        let flags_and_fragment_offset = u16::from_be_bytes([next()?, next()?]);
        let fragment_offset = flags_and_fragment_offset & FRAGMENT_OFFSET_MASK;
        let flags = (flags_and_fragment_offset >> 13) as u8;

        let time_to_live = next()?;
        let protocol = next()?;
        let checksum = u16::from_be_bytes([next()?, next()?]);
        let source = Ipv4Address::new([next()?, next()?, next()?, next()?]);
        let destination = Ipv4Address::new([next()?, next()?, next()?, next()?]);

        Ok(Self {
            ihl,
            type_of_service,
            total_length,
            identification,
            flags,
            fragment_offset,
            time_to_live,
            protocol,
            checksum,
            source,
            destination,
        })
    }

    /// Creates the serialized header, checksum included.
    pub fn serialize(&self) -> Vec<u8> {
        let version_and_ihl = (4u8 << 4) | BASE_WORDS;
        let flags_and_fragment_offset =
            ((self.flags as u16) << 13) | (self.fragment_offset & FRAGMENT_OFFSET_MASK);
        let checksum = self.compute_checksum();

        let mut out = Vec::with_capacity(BASE_OCTETS as usize);
        out.push(version_and_ihl);
        out.push(self.type_of_service);
        out.extend_from_slice(&self.total_length.to_be_bytes());
        out.extend_from_slice(&self.identification.to_be_bytes());
        out.extend_from_slice(&flags_and_fragment_offset.to_be_bytes());
        out.push(self.time_to_live);
        out.push(self.protocol);
        out.extend_from_slice(&checksum.to_be_bytes());
        out.extend_from_slice(&self.source.to_bytes());
        out.extend_from_slice(&self.destination.to_bytes());
        out
    }

    /// The checksum the header should carry, given its current fields.
    pub fn compute_checksum(&self) -> u16 {
        let mut checksum = Checksum::new();
        checksum.add_u8((4u8 << 4) | BASE_WORDS, self.type_of_service);
        checksum.add_u16(self.total_length);
        checksum.add_u16(self.identification);
        checksum.add_u16(((self.flags as u16) << 13) | (self.fragment_offset & FRAGMENT_OFFSET_MASK));
        checksum.add_u8(self.time_to_live, self.protocol);
        checksum.add_u32(self.source.to_bytes());
        checksum.add_u32(self.destination.to_bytes());
        checksum.as_u16()
    }

    /// The number of payload bytes the datagram carries.
    pub fn payload_length(&self) -> usize {
        usize::from(self.total_length.saturating_sub(BASE_OCTETS))
    }
}

/// An IPv4 datagram: a header and its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Datagram {
    pub header: Ipv4Header,
    pub payload: Vec<u8>,
}

impl Ipv4Datagram {
    /// Creates a datagram around the given payload with a fresh,
    /// unfragmented header.
    pub fn new(
        source: Ipv4Address,
        destination: Ipv4Address,
        protocol: u8,
        payload: Vec<u8>,
    ) -> Result<Self, BuildError> {
        let payload_length =
            u16::try_from(payload.len()).or(Err(BuildError::OverlyLongPayload))?;
        let total_length = payload_length
            .checked_add(BASE_OCTETS)
            .ok_or(BuildError::OverlyLongPayload)?;

        let mut header = Ipv4Header {
            ihl: BASE_WORDS,
            type_of_service: 0,
            total_length,
            identification: 0,
            flags: 0,
            fragment_offset: 0,
            time_to_live: DEFAULT_TTL,
            protocol,
            checksum: 0,
            source,
            destination,
        };
        header.checksum = header.compute_checksum();
        Ok(Self { header, payload })
    }

    /// Parses a datagram from its on-wire form.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        let header = Ipv4Header::from_bytes(bytes.iter().cloned())?;
        let total_length = usize::from(header.total_length);
        if total_length < usize::from(BASE_OCTETS) || total_length > bytes.len() {
            Err(ParseError::InvalidTotalLength)?
        }
        let payload = bytes[usize::from(BASE_OCTETS)..total_length].to_vec();
        Ok(Self { header, payload })
    }

    /// The on-wire form of the datagram.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = self.header.serialize();
        out.extend_from_slice(&self.payload);
        out
    }
}

#[derive(Debug, ThisError, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("The IPv4 header is incomplete")]
    HeaderTooShort,
    #[error("Expected version 4 in IPv4 header")]
    IncorrectIpv4Version,
    #[error("Expected a 20-byte IPv4 header without options")]
    InvalidHeaderLength,
    #[error("The total length field disagrees with the bytes on the wire")]
    InvalidTotalLength,
}

#[derive(Debug, ThisError, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
    #[error("The payload is longer than a datagram can carry")]
    OverlyLongPayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_known_bytes() -> anyhow::Result<()> {
        let datagram = Ipv4Datagram::new(
            Ipv4Address::new([10, 0, 0, 1]),
            Ipv4Address::new([10, 0, 0, 2]),
            17,
            b"hi".to_vec(),
        )?;
        let expected = [
            0x45, 0x00, // version 4, ihl 5, tos 0
            0x00, 0x16, // total length 22
            0x00, 0x00, // identification
            0x00, 0x00, // flags, fragment offset
            0x40, 0x11, // ttl 64, protocol 17
            0x66, 0xd5, // checksum
            10, 0, 0, 1, // source
            10, 0, 0, 2, // destination
            b'h', b'i',
        ];
        assert_eq!(datagram.serialize(), expected);
        Ok(())
    }

    #[test]
    fn parse_round_trip() -> anyhow::Result<()> {
        let datagram = Ipv4Datagram::new(
            Ipv4Address::new([192, 168, 0, 1]),
            Ipv4Address::new([172, 16, 254, 3]),
            6,
            b"Hello, world!".to_vec(),
        )?;
        let parsed = Ipv4Datagram::parse(&datagram.serialize())?;
        assert_eq!(parsed, datagram);
        assert_eq!(parsed.header.payload_length(), 13);
        Ok(())
    }

    #[test]
    fn rejects_wrong_version() {
        let datagram = Ipv4Datagram::new(
            Ipv4Address::LOCALHOST,
            Ipv4Address::LOCALHOST,
            6,
            Vec::new(),
        )
        .unwrap();
        let mut bytes = datagram.serialize();
        bytes[0] = (6 << 4) | 5;
        assert_eq!(
            Ipv4Datagram::parse(&bytes),
            Err(ParseError::IncorrectIpv4Version)
        );
    }

    #[test]
    fn rejects_options() {
        let datagram = Ipv4Datagram::new(
            Ipv4Address::LOCALHOST,
            Ipv4Address::LOCALHOST,
            6,
            Vec::new(),
        )
        .unwrap();
        let mut bytes = datagram.serialize();
        bytes[0] = (4 << 4) | 6;
        assert_eq!(
            Ipv4Datagram::parse(&bytes),
            Err(ParseError::InvalidHeaderLength)
        );
    }

    #[test]
    fn rejects_truncated_datagram() {
        let datagram = Ipv4Datagram::new(
            Ipv4Address::LOCALHOST,
            Ipv4Address::LOCALHOST,
            6,
            b"payload".to_vec(),
        )
        .unwrap();
        let bytes = datagram.serialize();
        assert_eq!(
            Ipv4Datagram::parse(&bytes[..bytes.len() - 1]),
            Err(ParseError::InvalidTotalLength)
        );
        assert_eq!(
            Ipv4Datagram::parse(&bytes[..10]),
            Err(ParseError::HeaderTooShort)
        );
    }

    #[test]
    fn unverified_checksum_still_parses() -> anyhow::Result<()> {
        // Checksum policy belongs to the framing layer; a bad checksum is
        // recorded as-is.
        let datagram = Ipv4Datagram::new(
            Ipv4Address::LOCALHOST,
            Ipv4Address::LOCALHOST,
            6,
            Vec::new(),
        )?;
        let mut bytes = datagram.serialize();
        bytes[10] ^= 0xff;
        let parsed = Ipv4Datagram::parse(&bytes)?;
        assert_eq!(parsed.header.checksum, datagram.header.checksum ^ 0xff00);
        Ok(())
    }
}

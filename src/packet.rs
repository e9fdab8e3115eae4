use std::fmt;

use byteorder::{BigEndian, ByteOrder};

use crate::error::{QueryError, Result};
use crate::parse::StringCursor;
use crate::status::StatusResponse;

/// Every request starts with these two bytes.
pub const MAGIC: [u8; 2] = [0xFE, 0xFD];

/// Session ID sent with every request. Servers echo it back but it is never negotiated.
pub const SESSION_ID: [u8; 4] = [0x01, 0x01, 0x02, 0x03];

/// Response header: type byte followed by the echoed session ID.
pub const RESPONSE_HEADER_LEN: usize = 5;

/// Largest datagram we are prepared to receive.
pub const MAX_PACKET_SIZE: usize = 10240;

/// Appended to the challenge token to ask for the full stat instead of the basic one.
const FULL_STAT_PADDING: [u8; 4] = [0x00; 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// Handshake -- obtains a challenge token for the session.
    Handshake,
    /// Stat -- key/value server status and the player list.
    Stat,
}

impl PacketType {
    pub fn to_byte(&self) -> u8 {
        match self {
            PacketType::Handshake => 0x09,
            PacketType::Stat => 0x00,
        }
    }

    pub fn from_byte(byte: u8) -> Option<PacketType> {
        match byte {
            0x09 => Some(PacketType::Handshake),
            0x00 => Some(PacketType::Stat),
            _ => None,
        }
    }
}

/// Challenge token handed out by the server during the handshake.
///
/// Stored as the raw big-endian bytes that get echoed back in stat requests.
/// Servers invalidate tokens after roughly 30 seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeToken([u8; 4]);

impl ChallengeToken {
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        ChallengeToken(bytes)
    }

    /// Parse the decimal text a server sends in its handshake response.
    ///
    /// Accepts anything that fits in 32 bits, signed or not, and keeps the low 32 bits.
    pub fn parse(text: &str) -> Result<Self> {
        let value: i64 = text.parse().map_err(|source| QueryError::InvalidChallenge {
            text: text.to_owned(),
            source,
        })?;
        if value < i64::from(i32::MIN) || value > i64::from(u32::MAX) {
            return Err(QueryError::ChallengeOutOfRange(value));
        }

        let mut bytes = [0u8; 4];
        BigEndian::write_i32(&mut bytes, value as i32);
        Ok(ChallengeToken(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for ChallengeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", BigEndian::read_i32(&self.0))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct RequestPacket {
    packet_type: PacketType,
    payload: Vec<u8>,
}

impl RequestPacket {
    pub fn handshake() -> Self {
        RequestPacket {
            packet_type: PacketType::Handshake,
            payload: Vec::new(),
        }
    }

    pub fn full_stat(token: &ChallengeToken) -> Self {
        let mut payload: Vec<u8> = Vec::with_capacity(8);
        payload.extend_from_slice(token.as_bytes());
        payload.extend_from_slice(&FULL_STAT_PADDING);

        RequestPacket {
            packet_type: PacketType::Stat,
            payload,
        }
    }

    /// Serializes a request packet into an array of bytes.
    pub fn pack(&self) -> Vec<u8> {
        // magic, type, session id, payload
        let mut packet: Vec<u8> = Vec::with_capacity(7 + self.payload.len());
        packet.extend_from_slice(&MAGIC);
        packet.push(self.packet_type.to_byte());
        packet.extend_from_slice(&SESSION_ID);
        packet.extend_from_slice(&self.payload);

        packet
    }

    pub fn packet_type(&self) -> &PacketType {
        &self.packet_type
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// A decoded response, tagged by its packet type.
#[derive(Debug, PartialEq, Eq)]
pub enum ResponsePacket {
    Handshake(ChallengeToken),
    Stat(StatusResponse),
}

impl ResponsePacket {
    /// Decode a received datagram that answers a request of type `expected`.
    ///
    /// The header is checked before anything else: a datagram shorter than the
    /// header, or one carrying any other type byte, is rejected whatever its body.
    pub fn unpack(incoming: &[u8], expected: PacketType) -> Result<Self> {
        if incoming.len() < RESPONSE_HEADER_LEN {
            return Err(QueryError::ShortResponse(incoming.len()));
        }

        let packet_type = match PacketType::from_byte(incoming[0]) {
            Some(packet_type) if packet_type == expected => packet_type,
            _ => {
                return Err(QueryError::UnexpectedPacketType {
                    expected: expected.to_byte(),
                    got: incoming[0],
                })
            }
        };

        let body: &[u8] = &incoming[RESPONSE_HEADER_LEN..];
        match packet_type {
            PacketType::Handshake => {
                let text: String = StringCursor::new(body).read_string();
                Ok(ResponsePacket::Handshake(ChallengeToken::parse(&text)?))
            }
            PacketType::Stat => Ok(ResponsePacket::Stat(StatusResponse::parse(body))),
        }
    }

    pub fn packet_type(&self) -> PacketType {
        match self {
            ResponsePacket::Handshake(_) => PacketType::Handshake,
            ResponsePacket::Stat(_) => PacketType::Stat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn packs_handshake_request() {
        assert_eq!(
            RequestPacket::handshake().pack(),
            vec![0xFE, 0xFD, 0x09, 0x01, 0x01, 0x02, 0x03]
        );
    }

    #[test]
    fn packs_full_stat_request() {
        let token = ChallengeToken::from_bytes([0x00, 0x00, 0x30, 0x39]);
        assert_eq!(
            RequestPacket::full_stat(&token).pack(),
            vec![
                0xFE, 0xFD, 0x00, 0x01, 0x01, 0x02, 0x03, 0x00, 0x00, 0x30, 0x39, 0x00, 0x00,
                0x00, 0x00
            ]
        );
    }

    #[test]
    fn challenge_is_big_endian() {
        let token = ChallengeToken::parse("12345").unwrap();
        assert_eq!(token.as_bytes(), &[0x00, 0x00, 0x30, 0x39]);
        assert_eq!(token.to_string(), "12345");

        let token = ChallengeToken::parse("9513307").unwrap();
        assert_eq!(token.as_bytes(), &[0x00, 0x91, 0x29, 0x5B]);
    }

    #[test]
    fn challenge_keeps_low_32_bits() {
        for n in [0u32, 1, 255, 65_536, i32::MAX as u32, 3_000_000_000, u32::MAX] {
            let token = ChallengeToken::parse(&n.to_string()).unwrap();
            assert_eq!(token.as_bytes(), &n.to_be_bytes(), "challenge {n}");
        }

        let token = ChallengeToken::parse("-1").unwrap();
        assert_eq!(token.as_bytes(), &[0xFF; 4]);
    }

    #[test]
    fn rejects_bad_challenge_text() {
        for text in ["", "abc", "12a", " 12", "99999999999999999999"] {
            let err = ChallengeToken::parse(text).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Format, "challenge {text:?}");
        }

        let err = ChallengeToken::parse("4294967296").unwrap_err();
        assert!(matches!(err, QueryError::ChallengeOutOfRange(4_294_967_296)));
        let err = ChallengeToken::parse("-2147483649").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn unpacks_handshake_response() {
        let packet = ResponsePacket::unpack(b"\x09\x01\x01\x02\x0312345\0", PacketType::Handshake)
            .unwrap();
        assert_eq!(
            packet,
            ResponsePacket::Handshake(ChallengeToken::from_bytes([0x00, 0x00, 0x30, 0x39]))
        );
        assert_eq!(packet.packet_type(), PacketType::Handshake);
    }

    #[test]
    fn handshake_challenge_may_end_at_buffer_end() {
        let packet =
            ResponsePacket::unpack(b"\x09\x01\x01\x02\x03777", PacketType::Handshake).unwrap();
        assert_eq!(
            packet,
            ResponsePacket::Handshake(ChallengeToken::parse("777").unwrap())
        );
    }

    #[test]
    fn short_response_is_a_protocol_error() {
        for len in 0..RESPONSE_HEADER_LEN {
            let data = vec![0x09; len];
            let err = ResponsePacket::unpack(&data, PacketType::Handshake).unwrap_err();
            assert!(matches!(err, QueryError::ShortResponse(n) if n == len));
            assert_eq!(err.kind(), ErrorKind::Protocol);
        }
    }

    #[test]
    fn mismatched_type_is_a_protocol_error() {
        // a perfectly good stat body does not help when a handshake was expected
        let err = ResponsePacket::unpack(
            b"\x00\x01\x01\x02\x03splitnum\0\x80\0hostname\0x\0\0",
            PacketType::Handshake,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            QueryError::UnexpectedPacketType {
                expected: 0x09,
                got: 0x00
            }
        ));

        let err = ResponsePacket::unpack(b"\x09\x01\x01\x02\x0312345\0", PacketType::Stat)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        let err = ResponsePacket::unpack(b"\x41\x01\x01\x02\x03", PacketType::Stat).unwrap_err();
        assert!(matches!(
            err,
            QueryError::UnexpectedPacketType {
                expected: 0x00,
                got: 0x41
            }
        ));
    }

    #[test]
    fn handshake_with_empty_body_is_a_format_error() {
        let err = ResponsePacket::unpack(b"\x09\x01\x01\x02\x03", PacketType::Handshake)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }
}

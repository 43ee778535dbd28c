use crate::error::RconError;

/// Largest frame the protocol allows on the wire, size prefix included.
pub const PACKET_SIZE_LIMIT: usize = 4096;

#[derive(Debug, Clone, Copy)]
pub enum PacketType {
    // SERVERDATA_AUTH
    Auth,
    // SERVERDATA_EXECCOMMAND
    Exec,
    // SERVERDATA_AUTH_RESPONSE (same wire value as Exec)
    AuthResponse,
    // SERVERDATA_RESPONSE_VALUE
    Response,
}

impl PacketType {
    /// Wire value of the type field. `Exec` and `AuthResponse` share the
    /// value 2, and an incoming 2 can only be told apart by what was just
    /// sent; that call belongs to the client, not the codec.
    pub fn value(&self) -> i32 {
        match self {
            PacketType::Auth => 3,
            PacketType::Exec => 2,
            PacketType::AuthResponse => 2,
            PacketType::Response => 0,
        }
    }

    pub fn to_le_bytes(&self) -> [u8; 4] {
        self.value().to_le_bytes()
    }
}

// Equality on the wire value, so Exec == AuthResponse.
impl PartialEq for PacketType {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
    }
}

impl Eq for PacketType {}

impl TryFrom<i32> for PacketType {
    type Error = RconError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            3 => Ok(PacketType::Auth),
            2 => Ok(PacketType::AuthResponse),
            0 => Ok(PacketType::Response),
            _ => Err(RconError::MalformedPacket),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Packet {
    id: i32,
    packet_type: PacketType,
    body: String,
}

impl Packet {
    /// Bytes a frame occupies past the size prefix before any body: id,
    /// type, and the two null terminators.
    pub const BASE_PACKET_SIZE: i32 = 10;

    /// Builds a packet, refusing bodies that would not fit in a single
    /// frame. The limit is checked here so that an oversized packet can
    /// never make it halfway onto the wire.
    pub fn new(id: i32, packet_type: PacketType, body: impl Into<String>) -> Result<Self, RconError> {
        let body = body.into();
        let frame_len = body.len() + Self::BASE_PACKET_SIZE as usize + 4;
        if frame_len > PACKET_SIZE_LIMIT {
            return Err(RconError::PacketTooLarge(frame_len));
        }

        Ok(Packet {
            id,
            packet_type,
            body,
        })
    }

    /// Parses one complete frame, leading size prefix included.
    pub fn unpack(incoming: &[u8]) -> Result<Self, RconError> {
        let size = int_field(incoming, 0)?;
        let id = int_field(incoming, 4)?;
        let type_value = int_field(incoming, 8)?;

        // The declared size must cover everything after the size prefix,
        // the frame must end with the packet terminator, and a size below
        // the fixed fields cannot describe a real packet.
        if size < Self::BASE_PACKET_SIZE
            || incoming.len() - 4 != size as usize
            || incoming[incoming.len() - 1] != 0x00
        {
            return Err(RconError::MalformedPacket);
        }

        let packet_type = PacketType::try_from(type_value)?;
        // everything between the header and the final terminator; the last
        // byte in that range is the body's own terminator, trimmed off
        let body = std::str::from_utf8(&incoming[12..incoming.len() - 1])
            .map_err(|_| RconError::MalformedPacket)?
            .trim_end_matches('\0')
            .to_string();

        Ok(Packet {
            id,
            packet_type,
            body,
        })
    }

    // The only value that can change in length is the body, so the size of
    // a packet is the byte-length of the body plus 10.
    pub fn size(&self) -> i32 {
        self.body.len() as i32 + Self::BASE_PACKET_SIZE
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn packet_type(&self) -> &PacketType {
        &self.packet_type
    }

    pub fn body(&self) -> &str {
        self.body.as_ref()
    }

    pub fn pack(&self) -> Vec<u8> {
        // Size, ID, Type, Body, Terminator
        let mut payload = Vec::with_capacity(self.size() as usize + 4);
        payload.extend_from_slice(&self.size().to_le_bytes());
        payload.extend_from_slice(&self.id.to_le_bytes());
        payload.extend_from_slice(&self.packet_type.to_le_bytes());
        payload.extend_from_slice(self.body.as_bytes());
        // null terminate the body (C++ interop 🤢), then null terminate the
        // entire frame
        payload.extend_from_slice(&[0, 0]);
        payload
    }
}

fn int_field(frame: &[u8], offset: usize) -> Result<i32, RconError> {
    frame
        .get(offset..offset + 4)
        .and_then(|bytes| bytes.try_into().ok())
        .map(i32::from_le_bytes)
        .ok_or(RconError::MalformedPacket)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_the_documented_wire_layout() {
        let packet = Packet::new(1, PacketType::Exec, "hello world").unwrap();

        let mut expected = vec![0x15, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0];
        expected.extend_from_slice(b"hello world");
        expected.extend_from_slice(&[0, 0]);

        assert_eq!(packet.pack(), expected);
        assert_eq!(packet.size(), 21);
    }

    #[test]
    fn round_trips_through_pack_and_unpack() {
        let original = Packet::new(42, PacketType::Response, "map de_dust2").unwrap();
        let parsed = Packet::unpack(&original.pack()).unwrap();

        assert_eq!(parsed, original);
    }

    #[test]
    fn round_trips_an_empty_body() {
        let original = Packet::new(7, PacketType::Auth, "").unwrap();
        let parsed = Packet::unpack(&original.pack()).unwrap();

        assert_eq!(parsed.id(), 7);
        assert_eq!(parsed.packet_type(), &PacketType::Auth);
        assert_eq!(parsed.body(), "");
    }

    #[test]
    fn exec_and_auth_response_share_a_wire_value() {
        assert_eq!(PacketType::Exec, PacketType::AuthResponse);

        let frame = Packet::new(3, PacketType::Exec, "status").unwrap().pack();
        let parsed = Packet::unpack(&frame).unwrap();
        assert_eq!(parsed.packet_type(), &PacketType::Exec);
    }

    #[test]
    fn accepts_a_body_at_the_frame_limit() {
        let body = "a".repeat(4082);
        assert!(Packet::new(1, PacketType::Exec, body).is_ok());
    }

    #[test]
    fn refuses_a_body_past_the_frame_limit() {
        let body = "a".repeat(4083);
        let err = Packet::new(1, PacketType::Exec, body).unwrap_err();
        assert!(matches!(err, RconError::PacketTooLarge(4097)));
    }

    #[test]
    fn rejects_a_size_field_that_disagrees_with_the_frame() {
        let mut frame = Packet::new(1, PacketType::Exec, "hi").unwrap().pack();
        frame[0] += 1;

        assert!(matches!(
            Packet::unpack(&frame),
            Err(RconError::MalformedPacket)
        ));
    }

    #[test]
    fn rejects_a_missing_packet_terminator() {
        let mut frame = Packet::new(1, PacketType::Exec, "hi").unwrap().pack();
        let last = frame.len() - 1;
        frame[last] = b'!';

        assert!(matches!(
            Packet::unpack(&frame),
            Err(RconError::MalformedPacket)
        ));
    }

    #[test]
    fn rejects_a_truncated_header() {
        assert!(matches!(
            Packet::unpack(&[0x0a, 0, 0]),
            Err(RconError::MalformedPacket)
        ));
    }

    #[test]
    fn rejects_a_declared_size_too_small_to_hold_a_packet() {
        // a 12 byte frame claiming size 8: the length check passes but
        // nothing past the header could exist
        let frame = vec![8, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            Packet::unpack(&frame),
            Err(RconError::MalformedPacket)
        ));
    }

    #[test]
    fn rejects_an_unknown_type_code() {
        let mut frame = Packet::new(1, PacketType::Exec, "hi").unwrap().pack();
        frame[8] = 9;

        assert!(matches!(
            Packet::unpack(&frame),
            Err(RconError::MalformedPacket)
        ));
    }

    #[test]
    fn rejects_a_body_that_is_not_utf8() {
        let mut frame = Packet::new(1, PacketType::Exec, "hi").unwrap().pack();
        frame[12] = 0xff;
        frame[13] = 0xfe;

        assert!(matches!(
            Packet::unpack(&frame),
            Err(RconError::MalformedPacket)
        ));
    }
}

//! Relay wire framing
//!
//! Every message on the relay link is `(magic, type, length)` as three
//! big-endian u32s followed by `length` payload bytes. BLOCK frames re-use
//! the length field for the block's transaction count; their payload is
//! parsed incrementally by the block codec.

use bytes::BufMut;

use super::error::ProtocolViolation;

/// Fixed magic prefix on every relay frame.
pub const MAGIC: u32 = 0xF2BE_EF42;

/// Default TCP port relay network nodes listen on.
pub const DEFAULT_PORT: u16 = 8336;

/// Version tag both sides must present on connect.
pub const VERSION_STRING: &[u8] = b"prioritized panther";

/// Upper bound on the length field of any frame.
pub const MAX_MESSAGE_LENGTH: u32 = 1_000_000;

/// Upper bound on the transaction count of a BLOCK frame.
pub const MAX_BLOCK_TRANSACTIONS: u32 = 10_000;

/// Largest transaction relayed freely, without oversize accounting.
pub const MAX_RELAY_TRANSACTION_BYTES: usize = 10_000;

/// Largest transaction relayed at all.
pub const MAX_RELAY_OVERSIZE_TRANSACTION_BYTES: usize = 250_000;

/// How many oversize transactions a cache may hold at once.
pub const MAX_EXTRA_OVERSIZE_TRANSACTIONS: usize = 20;

/// Directive index announcing an inline transaction instead of a cache hit.
pub const INLINE_TX_INDEX: u16 = 0xFFFF;

/// Capacity of each synchronized transaction cache.
pub const RELAY_CACHE_CAPACITY: usize = 1000;

/// Wire size of a frame header: three big-endian u32s.
pub const FRAME_HEADER_LEN: usize = 12;

/// Relay protocol message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageType {
    Version = 0,
    Block = 1,
    Transaction = 2,
    EndBlock = 3,
    MaxVersion = 4,
}

impl TryFrom<u32> for MessageType {
    type Error = ProtocolViolation;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::Version),
            1 => Ok(Self::Block),
            2 => Ok(Self::Transaction),
            3 => Ok(Self::EndBlock),
            4 => Ok(Self::MaxVersion),
            other => Err(ProtocolViolation::UnknownMessageType(other)),
        }
    }
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub msg_type: MessageType,
    /// Payload byte length, except for [`MessageType::Block`] where this
    /// carries the transaction count.
    pub length: u32,
}

impl FrameHeader {
    pub fn new(msg_type: MessageType, length: u32) -> Self {
        Self { msg_type, length }
    }

    /// Append the 12 header bytes to an outgoing buffer.
    pub fn put(&self, buf: &mut impl BufMut) {
        buf.put_u32(MAGIC);
        buf.put_u32(self.msg_type as u32);
        buf.put_u32(self.length);
    }

    /// Encode to the fixed 12-byte wire form.
    pub fn encode(&self) -> [u8; FRAME_HEADER_LEN] {
        let mut raw = [0u8; FRAME_HEADER_LEN];
        raw[0..4].copy_from_slice(&MAGIC.to_be_bytes());
        raw[4..8].copy_from_slice(&(self.msg_type as u32).to_be_bytes());
        raw[8..12].copy_from_slice(&self.length.to_be_bytes());
        raw
    }

    /// Decode and validate a received 12-byte header.
    ///
    /// The magic and the general length cap are checked here for every frame;
    /// the tighter BLOCK transaction-count cap is the dispatcher's job since
    /// only it knows the field is a count.
    pub fn decode(raw: &[u8; FRAME_HEADER_LEN]) -> Result<Self, ProtocolViolation> {
        let magic = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
        if magic != MAGIC {
            return Err(ProtocolViolation::BadMagic(magic));
        }
        let length = u32::from_be_bytes([raw[8], raw[9], raw[10], raw[11]]);
        if length > MAX_MESSAGE_LENGTH {
            return Err(ProtocolViolation::OversizedMessage(length));
        }
        let msg_type = MessageType::try_from(u32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]))?;
        Ok(Self { msg_type, length })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip() {
        for (msg_type, length) in [
            (MessageType::Version, VERSION_STRING.len() as u32),
            (MessageType::Block, 42),
            (MessageType::Transaction, 250_000),
            (MessageType::EndBlock, 0),
            (MessageType::MaxVersion, 19),
        ] {
            let header = FrameHeader::new(msg_type, length);
            let decoded = FrameHeader::decode(&header.encode()).unwrap();
            assert_eq!(decoded, header);
        }
    }

    #[test]
    fn test_encode_layout_is_big_endian() {
        let raw = FrameHeader::new(MessageType::Transaction, 5).encode();
        assert_eq!(&raw[0..4], &[0xF2, 0xBE, 0xEF, 0x42]);
        assert_eq!(&raw[4..8], &[0, 0, 0, 2]);
        assert_eq!(&raw[8..12], &[0, 0, 0, 5]);
    }

    #[test]
    fn test_decode_rejects_bad_magic() {
        let mut raw = FrameHeader::new(MessageType::Version, 0).encode();
        raw[0..4].copy_from_slice(&0xDEAD_BEEFu32.to_be_bytes());
        assert!(matches!(
            FrameHeader::decode(&raw),
            Err(ProtocolViolation::BadMagic(0xDEAD_BEEF))
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let mut raw = FrameHeader::new(MessageType::Version, 0).encode();
        raw[4..8].copy_from_slice(&7u32.to_be_bytes());
        assert!(matches!(
            FrameHeader::decode(&raw),
            Err(ProtocolViolation::UnknownMessageType(7))
        ));
    }

    #[test]
    fn test_decode_rejects_oversized_length() {
        let mut raw = FrameHeader::new(MessageType::Transaction, 0).encode();
        raw[8..12].copy_from_slice(&(MAX_MESSAGE_LENGTH + 1).to_be_bytes());
        assert!(matches!(
            FrameHeader::decode(&raw),
            Err(ProtocolViolation::OversizedMessage(_))
        ));
    }

    #[test]
    fn test_length_cap_is_inclusive() {
        let header = FrameHeader::new(MessageType::Transaction, MAX_MESSAGE_LENGTH);
        assert!(FrameHeader::decode(&header.encode()).is_ok());
    }
}

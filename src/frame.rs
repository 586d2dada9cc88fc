//! Maple-style frame encode/decode and checksum.
//!
//! A frame is a header word (length, sender, recipient, command) followed
//! by up to 255 payload words and a trailing one-byte XOR checksum. On the
//! wire each 32-bit quantity is byte-reversed relative to its big-endian
//! in-memory representation — equivalently, the wire bytes of a word are
//! its little-endian bytes.

use crate::error::BusError;

/// Maximum payload length in 32-bit words (the length field is one byte).
pub const MAX_PAYLOAD_WORDS: usize = 255;

/// Maximum size in bytes of an encoded frame: header + payload + CRC byte.
pub const MAX_WIRE_BYTES: usize = 4 * (1 + MAX_PAYLOAD_WORDS) + 1;

/// A decoded Maple-style frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: u8,
    pub recipient: u8,
    pub sender: u8,
    pub payload: heapless::Vec<u32, MAX_PAYLOAD_WORDS>,
}

impl Frame {
    pub fn new(command: u8, recipient: u8, sender: u8, payload: &[u32]) -> Result<Self, BusError> {
        let mut buf = heapless::Vec::new();
        buf.extend_from_slice(payload)
            .map_err(|()| BusError::MalformedFrame)?;
        Ok(Self {
            command,
            recipient,
            sender,
            payload: buf,
        })
    }

    /// Number of payload words, also the on-wire length field.
    pub fn length_words(&self) -> u8 {
        self.payload.len() as u8
    }

    /// In-memory big-endian header word: `command << 24 | recipient << 16 | sender << 8 | length`.
    pub fn header_word(&self) -> u32 {
        (u32::from(self.command) << 24)
            | (u32::from(self.recipient) << 16)
            | (u32::from(self.sender) << 8)
            | u32::from(self.length_words())
    }

    /// Total number of bits clocked onto the wire for this frame.
    pub fn bit_count(&self) -> u32 {
        (u32::from(self.length_words()) * 4 + 5) * 8
    }

    /// XOR-accumulated checksum over the header and payload bytes.
    pub fn crc(&self) -> u8 {
        let mut crc = 0u8;
        for b in self.header_word().to_be_bytes() {
            crc ^= b;
        }
        for word in &self.payload {
            for b in word.to_be_bytes() {
                crc ^= b;
            }
        }
        crc
    }

    /// Encode to the exact bytes clocked onto the wire.
    pub fn to_wire_bytes(&self) -> heapless::Vec<u8, MAX_WIRE_BYTES> {
        let mut out = heapless::Vec::new();
        let _ = out.extend_from_slice(&self.header_word().to_le_bytes());
        for word in &self.payload {
            let _ = out.extend_from_slice(&word.to_le_bytes());
        }
        let _ = out.push(self.crc());
        out
    }
}

/// Decodes and validates a captured receive buffer.
///
/// Mirrors the line engine's receive-validation step: the length comes
/// from the first wire byte, the checksum covers every header and payload
/// byte, and a zero command byte is always rejected (matching a capture
/// buffer that was zeroed before the transaction and never overwritten).
pub fn validate_received(raw: &[u8]) -> Result<Frame, BusError> {
    if raw.len() < 4 {
        return Err(BusError::MalformedFrame);
    }
    let length = raw[0] as usize;
    let header_bytes = 4;
    let payload_bytes = 4 * length;
    let total = header_bytes + payload_bytes + 1;
    if raw.len() < total {
        return Err(BusError::MalformedFrame);
    }

    let sender = raw[1];
    let recipient = raw[2];
    let command = raw[3];
    if command == 0 {
        return Err(BusError::MalformedFrame);
    }

    let mut payload = heapless::Vec::<u32, MAX_PAYLOAD_WORDS>::new();
    for i in 0..length {
        let start = header_bytes + 4 * i;
        let word = u32::from_le_bytes([raw[start], raw[start + 1], raw[start + 2], raw[start + 3]]);
        payload
            .push(word)
            .map_err(|_| BusError::MalformedFrame)?;
    }

    let computed_crc = raw[..header_bytes + payload_bytes]
        .iter()
        .fold(0u8, |crc, b| crc ^ b);
    let received_crc = raw[header_bytes + payload_bytes];
    if computed_crc != received_crc {
        return Err(BusError::CrcMismatch);
    }

    Ok(Frame {
        command,
        recipient,
        sender,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc_matches_xor_of_every_byte() {
        let frame = Frame::new(0x11, 0xAA, 0x20, &[0xDEAD_BEEF]).unwrap();
        let expected = 0x01 ^ 0x20 ^ 0xAA ^ 0x11 ^ 0xDE ^ 0xAD ^ 0xBE ^ 0xEF;
        assert_eq!(frame.crc(), expected);
    }

    #[test]
    fn round_trip_through_wire_bytes() {
        let frame = Frame::new(0x05, 0x02, 0x00, &[1, 2, 3]).unwrap();
        let wire = frame.to_wire_bytes();
        let decoded = validate_received(&wire).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn zero_command_is_rejected() {
        let frame = Frame::new(0x00, 0x02, 0x00, &[]).unwrap();
        let wire = frame.to_wire_bytes();
        assert_eq!(validate_received(&wire), Err(BusError::MalformedFrame));
    }

    #[test]
    fn single_mutated_byte_is_rejected() {
        let frame = Frame::new(0x05, 0x02, 0x00, &[1, 2, 3]).unwrap();
        let mut wire = frame.to_wire_bytes();
        let last = wire.len() - 1;
        wire[last] ^= 0xFF;
        assert_eq!(validate_received(&wire), Err(BusError::CrcMismatch));
    }

    #[test]
    fn truncated_buffer_is_malformed() {
        let frame = Frame::new(0x05, 0x02, 0x00, &[1, 2, 3]).unwrap();
        let wire = frame.to_wire_bytes();
        assert_eq!(
            validate_received(&wire[..wire.len() - 2]),
            Err(BusError::MalformedFrame)
        );
    }

    #[test]
    fn bit_count_matches_formula() {
        let frame = Frame::new(0x01, 0x00, 0x00, &[1, 2]).unwrap();
        assert_eq!(frame.bit_count(), (2 * 4 + 5) * 8);
    }
}

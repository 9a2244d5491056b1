//! Journal frame layout
//!
//! ```text
//! ┌──────────────┬──────────────┬─────────────┬──────────────┐
//! │ length u32LE │ sequence u64 │ body (JSON) │ crc32 u32LE  │
//! └──────────────┴──────────────┴─────────────┴──────────────┘
//! ```
//!
//! `length` counts the whole frame including itself and the checksum. The
//! checksum covers everything before it.

use super::checksum::compute_checksum;

/// Smallest well-formed frame: header, empty body, checksum.
pub const MIN_FRAME_SIZE: usize = 4 + 8 + 4;

/// One journal frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalFrame {
    /// Starts at 1, strictly contiguous.
    pub sequence: u64,
    pub body: Vec<u8>,
}

impl JournalFrame {
    pub fn new(sequence: u64, body: Vec<u8>) -> Self {
        Self { sequence, body }
    }

    /// Serializes the frame, computing its checksum.
    pub fn serialize(&self) -> Vec<u8> {
        let frame_length = (MIN_FRAME_SIZE + self.body.len()) as u32;
        let mut buf = Vec::with_capacity(frame_length as usize);
        buf.extend_from_slice(&frame_length.to_le_bytes());
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf.extend_from_slice(&self.body);
        let checksum = compute_checksum(&buf);
        buf.extend_from_slice(&checksum.to_le_bytes());
        buf
    }

    /// Parses one complete frame. `data` must be exactly one frame long.
    pub fn deserialize(data: &[u8]) -> Result<Self, String> {
        if data.len() < MIN_FRAME_SIZE {
            return Err(format!("frame too short: {} bytes", data.len()));
        }
        let frame_length = read_u32(&data[0..4]) as usize;
        if frame_length != data.len() {
            return Err(format!(
                "frame length {} does not match {} bytes read",
                frame_length,
                data.len()
            ));
        }

        let checksum_offset = frame_length - 4;
        let stored = read_u32(&data[checksum_offset..]);
        let computed = compute_checksum(&data[..checksum_offset]);
        if stored != computed {
            return Err(format!(
                "checksum mismatch: computed {:08x}, stored {:08x}",
                computed, stored
            ));
        }

        let mut sequence = [0u8; 8];
        sequence.copy_from_slice(&data[4..12]);
        Ok(Self {
            sequence: u64::from_le_bytes(sequence),
            body: data[12..checksum_offset].to_vec(),
        })
    }
}

pub(crate) fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let frame = JournalFrame::new(7, b"{}".to_vec());
        let bytes = frame.serialize();
        assert_eq!(bytes.len(), MIN_FRAME_SIZE + 2);
        assert_eq!(read_u32(&bytes[0..4]) as usize, bytes.len());
        assert_eq!(JournalFrame::deserialize(&bytes).unwrap(), frame);
    }

    #[test]
    fn test_corrupted_body_is_rejected() {
        let mut bytes = JournalFrame::new(1, b"{\"uid\":\"a\"}".to_vec()).serialize();
        bytes[14] ^= 0xff;
        let err = JournalFrame::deserialize(&bytes).unwrap_err();
        assert!(err.contains("checksum mismatch"));
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let bytes = JournalFrame::new(1, b"{}".to_vec()).serialize();
        assert!(JournalFrame::deserialize(&bytes[..bytes.len() - 1]).is_err());
    }
}

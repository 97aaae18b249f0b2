//! Single-frame validation and decoding.

use super::schema::{FieldSpec, SchemaSet};
use super::{END_FRAME, START_FRAME};

/// Shortest possible frame: START, ID, NUM_BYTES, checksum MSB/LSB, END.
const MIN_FRAME_LEN: usize = 6;

/// Reasons a frame is rejected. Rejection is never fatal to a parse run;
/// the frame is counted and skipped.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Frame too short: {0} bytes")]
    TooShort(usize),

    #[error("Invalid frame delimiters")]
    BadDelimiters,

    #[error("No schema for packet id 0x{0:02X}")]
    UnknownId(u8),

    #[error("Length mismatch for packet id 0x{id:02X}: expected {expected}, got {got}")]
    LengthMismatch { id: u8, expected: usize, got: usize },

    #[error("NUM_BYTES mismatch for packet id 0x{id:02X}: expected {expected}, got {got}")]
    NumBytesMismatch { id: u8, expected: u8, got: u8 },

    #[error("Checksum mismatch for packet id 0x{id:02X}: expected {expected:#06X}, got {got:#06X}")]
    ChecksumMismatch { id: u8, expected: u16, got: u16 },

    #[error("Payload too short for field '{0}'")]
    PayloadTooShort(String),
}

impl FrameError {
    /// The packet id the frame claimed, when it got far enough to carry one.
    pub fn packet_id(&self) -> Option<u8> {
        match self {
            FrameError::TooShort(_) | FrameError::BadDelimiters => None,
            FrameError::UnknownId(id)
            | FrameError::LengthMismatch { id, .. }
            | FrameError::NumBytesMismatch { id, .. }
            | FrameError::ChecksumMismatch { id, .. } => Some(*id),
            FrameError::PayloadTooShort(_) => None,
        }
    }
}

/// A validated, decoded frame.
///
/// `values` pairs column indices (into [`SchemaSet::columns`]) with the
/// decoded field/bit values, in wire order. `PacketNum` is not included;
/// it is a property of the stream position, assigned by the caller.
#[derive(Debug)]
pub struct DecodedFrame {
    pub packet_id: u8,
    pub values: Vec<(usize, u64)>,
}

/// Validate a `[START .. END]` frame against the schema set and decode its
/// payload fields.
///
/// Validation checks, in order: minimum length, delimiter bytes, known
/// packet id, total length, NUM_BYTES byte, and the 16-bit additive
/// checksum over NUM_BYTES + payload (sum modulo 65536, stored big-endian
/// before the END byte).
pub fn decode_frame(set: &SchemaSet, frame: &[u8]) -> Result<DecodedFrame, FrameError> {
    if frame.len() < MIN_FRAME_LEN {
        return Err(FrameError::TooShort(frame.len()));
    }
    if frame[0] != START_FRAME || frame[frame.len() - 1] != END_FRAME {
        return Err(FrameError::BadDelimiters);
    }

    let packet_id = frame[1];
    let num_bytes = frame[2];

    let schema = set
        .schema_for(packet_id)
        .ok_or(FrameError::UnknownId(packet_id))?;

    if frame.len() != schema.length {
        return Err(FrameError::LengthMismatch {
            id: packet_id,
            expected: schema.length,
            got: frame.len(),
        });
    }
    if num_bytes != schema.num_bytes {
        return Err(FrameError::NumBytesMismatch {
            id: packet_id,
            expected: schema.num_bytes,
            got: num_bytes,
        });
    }

    // Checksummed region: NUM_BYTES byte through end of payload.
    let payload = &frame[3..frame.len() - 3];
    let sum: u32 = frame[2..frame.len() - 3].iter().map(|&b| b as u32).sum();
    let expected = (sum % 65536) as u16;
    let got = u16::from_be_bytes([frame[frame.len() - 3], frame[frame.len() - 2]]);
    if expected != got {
        return Err(FrameError::ChecksumMismatch {
            id: packet_id,
            expected,
            got,
        });
    }

    let values = decode_payload(set, &schema.fields, payload)?;

    Ok(DecodedFrame { packet_id, values })
}

/// Decode sequential payload fields per the schema's wire order.
///
/// 1-byte fields may expand into named bit columns (LSB-first). Multi-byte
/// fields are big-endian unsigned integers.
fn decode_payload(
    set: &SchemaSet,
    fields: &[FieldSpec],
    payload: &[u8],
) -> Result<Vec<(usize, u64)>, FrameError> {
    let mut values = Vec::new();
    let mut offset = 0usize;

    for field in fields {
        let size = field.size as usize;
        if offset + size > payload.len() {
            return Err(FrameError::PayloadTooShort(field.name.clone()));
        }
        let chunk = &payload[offset..offset + size];
        offset += size;

        let value = chunk.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64);
        if let Some(idx) = set.column_index(&field.name) {
            values.push((idx, value));
        }

        if size == 1 {
            for (bit, name) in field.bits.iter().enumerate() {
                if let Some(idx) = set.column_index(name) {
                    values.push((idx, (value >> bit) & 1));
                }
            }
        }
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::schema::PacketSchema;

    /// Frame with id 0x14: Altitude (3 bytes) + Flags (1 byte, 2 bits).
    fn test_set() -> SchemaSet {
        let schemas: Vec<PacketSchema> = serde_json::from_str(
            r#"[{
                "id": 20,
                "num_bytes": 5,
                "length": 10,
                "fields": [
                    {"name": "Altitude", "size": 3},
                    {"name": "Flags", "size": 1, "bits": ["GearDown", "FlapsOut"]}
                ]
            }]"#,
        )
        .unwrap();
        SchemaSet::from_schemas(schemas).unwrap()
    }

    /// Build a valid frame for the test schema with the given payload.
    fn build_frame(id: u8, num_bytes: u8, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![0x01, id, num_bytes];
        frame.extend_from_slice(payload);
        let sum: u32 = frame[2..].iter().map(|&b| b as u32).sum();
        let chk = (sum % 65536) as u16;
        frame.extend_from_slice(&chk.to_be_bytes());
        frame.push(0x05);
        frame
    }

    #[test]
    fn valid_frame_decodes_fields_and_bits() {
        let set = test_set();
        // Altitude = 0x0102_03, Flags = 0b0000_0011.
        let frame = build_frame(20, 5, &[0x01, 0x02, 0x03, 0x03]);
        let decoded = decode_frame(&set, &frame).expect("frame should decode");

        assert_eq!(decoded.packet_id, 20);

        let altitude_idx = set.column_index("Altitude").unwrap();
        let gear_idx = set.column_index("GearDown").unwrap();
        let flaps_idx = set.column_index("FlapsOut").unwrap();

        let get = |idx| {
            decoded
                .values
                .iter()
                .find(|(i, _)| *i == idx)
                .map(|(_, v)| *v)
        };
        assert_eq!(get(altitude_idx), Some(0x010203));
        assert_eq!(get(gear_idx), Some(1));
        assert_eq!(get(flaps_idx), Some(1));
    }

    #[test]
    fn unknown_id_is_rejected() {
        let set = test_set();
        let frame = build_frame(99, 5, &[0, 0, 0, 0]);
        assert!(matches!(
            decode_frame(&set, &frame),
            Err(FrameError::UnknownId(99))
        ));
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let set = test_set();
        let mut frame = build_frame(20, 5, &[0x01, 0x02, 0x03, 0x00]);
        let chk_lsb = frame.len() - 2;
        frame[chk_lsb] ^= 0xFF;
        assert!(matches!(
            decode_frame(&set, &frame),
            Err(FrameError::ChecksumMismatch { id: 20, .. })
        ));
    }

    #[test]
    fn wrong_length_is_rejected() {
        let set = test_set();
        // One payload byte short of the declared frame length.
        let frame = build_frame(20, 5, &[0x01, 0x02, 0x03]);
        assert!(matches!(
            decode_frame(&set, &frame),
            Err(FrameError::LengthMismatch { id: 20, .. })
        ));
    }

    #[test]
    fn wrong_num_bytes_is_rejected() {
        let set = test_set();
        let frame = build_frame(20, 7, &[0x01, 0x02, 0x03, 0x00]);
        assert!(matches!(
            decode_frame(&set, &frame),
            Err(FrameError::NumBytesMismatch {
                id: 20,
                expected: 5,
                got: 7
            })
        ));
    }

    #[test]
    fn short_frame_is_rejected() {
        let set = test_set();
        assert!(matches!(
            decode_frame(&set, &[0x01, 20, 0x05]),
            Err(FrameError::TooShort(3))
        ));
    }
}

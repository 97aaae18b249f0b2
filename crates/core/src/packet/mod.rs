//! Schema-driven codec for framed flight-data captures.
//!
//! A capture is a stream of frames, each delimited by [`START_FRAME`] and
//! [`END_FRAME`] bytes:
//!
//! ```text
//! START | ID | NUM_BYTES | payload... | CHK_MSB | CHK_LSB | END
//! ```
//!
//! Payload layout is not fixed; it is described per packet id by a
//! [`PacketSchema`] loaded from a JSON schema file. Captures arrive either
//! as raw binary or as whitespace-separated hex text dumps; the two are
//! auto-detected from the first few KiB.
//!
//! Module layout mirrors the decode pipeline: [`scanner`] extracts frames
//! from a chunked byte stream, [`frame`] validates and decodes a single
//! frame, [`schema`] owns the schema set and the resulting column superset.

pub mod frame;
pub mod scanner;
pub mod schema;

pub use frame::{decode_frame, DecodedFrame, FrameError};
pub use scanner::FrameScanner;
pub use schema::{FieldSpec, PacketSchema, SchemaError, SchemaSet};

/// Byte that opens every frame.
pub const START_FRAME: u8 = 0x01;

/// Byte that closes every frame.
pub const END_FRAME: u8 = 0x05;

/// Heuristic: does this sample look like a hex text dump rather than raw
/// binary? True when the first 4 KiB contain only hex digits and
/// whitespace and no NUL bytes.
pub fn looks_like_hex_text(sample: &[u8]) -> bool {
    if sample.is_empty() {
        return false;
    }
    sample
        .iter()
        .take(4096)
        .all(|b| b.is_ascii_hexdigit() || matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
}

/// Decode one line of a hex text dump into raw bytes.
///
/// Tokens are whitespace-separated hex byte values (`"01 14 08 ..."`).
/// Returns `None` for malformed lines so callers can skip them.
pub fn decode_hex_line(line: &str) -> Option<Vec<u8>> {
    let mut bytes = Vec::new();
    for token in line.split_whitespace() {
        bytes.push(u8::from_str_radix(token, 16).ok()?);
    }
    Some(bytes)
}

//! Stateful frame extraction from a chunked byte stream.

use super::{END_FRAME, START_FRAME};

/// Extracts complete `[START .. END]` frames from arbitrarily-chunked
/// input.
///
/// The scanner keeps its partial-frame buffer across [`feed`](Self::feed)
/// calls, so a frame split across two file chunks is still recovered. A
/// START byte seen mid-frame resynchronizes the scanner: the partial frame
/// is discarded and a new one begins at that byte.
#[derive(Debug, Default)]
pub struct FrameScanner {
    buf: Vec<u8>,
    inside: bool,
}

impl FrameScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning every complete frame it closed.
    ///
    /// Bytes outside any frame (noise between END and the next START) are
    /// dropped silently.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        for &b in chunk {
            if !self.inside {
                if b == START_FRAME {
                    self.buf.clear();
                    self.buf.push(b);
                    self.inside = true;
                }
                continue;
            }

            self.buf.push(b);
            if b == END_FRAME {
                frames.push(std::mem::take(&mut self.buf));
                self.inside = false;
            } else if b == START_FRAME {
                // Resync: treat this byte as the start of a new frame.
                self.buf.clear();
                self.buf.push(b);
            }
        }
        frames
    }

    /// Discard any partial frame, e.g. at end of input.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.inside = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_frame() {
        let mut scanner = FrameScanner::new();
        let frames = scanner.feed(&[0x01, 0x14, 0x08, 0x2A, 0x05]);
        assert_eq!(frames, vec![vec![0x01, 0x14, 0x08, 0x2A, 0x05]]);
    }

    #[test]
    fn frame_split_across_chunks_is_recovered() {
        let mut scanner = FrameScanner::new();
        assert!(scanner.feed(&[0x01, 0x14, 0x08]).is_empty());
        let frames = scanner.feed(&[0x2A, 0x05]);
        assert_eq!(frames, vec![vec![0x01, 0x14, 0x08, 0x2A, 0x05]]);
    }

    #[test]
    fn noise_between_frames_is_dropped() {
        let mut scanner = FrameScanner::new();
        let frames = scanner.feed(&[0xFF, 0xFF, 0x01, 0x14, 0x05, 0xAA, 0x01, 0x15, 0x05]);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], vec![0x01, 0x14, 0x05]);
        assert_eq!(frames[1], vec![0x01, 0x15, 0x05]);
    }

    #[test]
    fn nested_start_resynchronizes() {
        let mut scanner = FrameScanner::new();
        // Truncated frame followed by a complete one.
        let frames = scanner.feed(&[0x01, 0x14, 0x08, 0x01, 0x15, 0x02, 0x05]);
        assert_eq!(frames, vec![vec![0x01, 0x15, 0x02, 0x05]]);
    }

    #[test]
    fn reset_discards_partial_frame() {
        let mut scanner = FrameScanner::new();
        assert!(scanner.feed(&[0x01, 0x14]).is_empty());
        scanner.reset();
        // The old partial frame must not leak into the next frame.
        let frames = scanner.feed(&[0x01, 0x16, 0x05]);
        assert_eq!(frames, vec![vec![0x01, 0x16, 0x05]]);
    }
}

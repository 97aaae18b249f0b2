//! Streaming parse of a serial capture into a CSV table.
//!
//! Input is either a binary capture or a hex-text capture (one
//! hex-encoded chunk per line); the mode is sniffed from the first few
//! kilobytes. Frames are recovered with [`FrameScanner`], decoded
//! against the packet schema, and appended to a temporary CSV file
//! that is renamed into place only after the whole capture decodes.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use flightdeck_core::packet::schema::SchemaSet;
use flightdeck_core::packet::scanner::FrameScanner;
use flightdeck_core::packet::{decode_frame, decode_hex_line, looks_like_hex_text};

/// Packets per progress report and writer flush.
pub const CSV_BATCH_SIZE: u64 = 5000;

/// Byte-based progress never exceeds this; the remainder is reserved
/// for finalization (database writes and the file rename).
pub const PARSE_PROGRESS_CAP: f64 = 90.0;

/// Bytes sniffed to decide between hex-text and binary input.
const SNIFF_LEN: usize = 4096;

/// Read chunk size in binary mode.
const BIN_CHUNK: usize = 8192;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv write error: {0}")]
    Csv(#[from] csv::Error),
}

/// What a completed parse produced.
#[derive(Debug)]
pub struct ParseSummary {
    pub packet_count: u64,
    /// Frames dropped for checksum or framing errors.
    pub skipped_frames: u64,
}

/// Decode `input` into a CSV file at `output`.
///
/// `on_progress` is invoked roughly every [`CSV_BATCH_SIZE`] packets
/// with a percentage in `[0, PARSE_PROGRESS_CAP]` and the packet count
/// so far. Corrupt frames are skipped, not fatal; an unreadable file
/// or a failed write is.
pub fn parse_file_to_csv(
    set: &SchemaSet,
    input: &Path,
    output: &Path,
    on_progress: &mut dyn FnMut(f64, u64),
) -> Result<ParseSummary, ParseError> {
    let mut file = File::open(input)?;
    let total_bytes = file.metadata()?.len();

    let mut head = vec![0u8; SNIFF_LEN];
    let head_len = read_up_to(&mut file, &mut head)?;
    head.truncate(head_len);
    let hex_mode = looks_like_hex_text(&head);
    file.seek(SeekFrom::Start(0))?;

    let tmp_path = output.with_extension("csv.tmp");
    let writer = csv::Writer::from_path(&tmp_path)?;
    let mut sink = RowSink::new(set, writer);
    sink.write_header()?;

    let mut scanner = FrameScanner::new();
    let mut bytes_read: u64 = 0;

    if hex_mode {
        let reader = BufReader::new(file);
        for line in reader.lines() {
            let line = line?;
            bytes_read += line.len() as u64 + 1;
            if let Some(bytes) = decode_hex_line(&line) {
                for frame in scanner.feed(&bytes) {
                    sink.push(&frame)?;
                }
            }
            if sink.batch_boundary()? {
                on_progress(byte_progress(bytes_read, total_bytes), sink.packet_count());
            }
        }
    } else {
        let mut reader = BufReader::new(file);
        let mut chunk = [0u8; BIN_CHUNK];
        loop {
            let n = reader.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            bytes_read += n as u64;
            for frame in scanner.feed(&chunk[..n]) {
                sink.push(&frame)?;
            }
            if sink.batch_boundary()? {
                on_progress(byte_progress(bytes_read, total_bytes), sink.packet_count());
            }
        }
    }

    let summary = sink.finish()?;
    fs::rename(&tmp_path, output)?;
    Ok(summary)
}

fn byte_progress(bytes_read: u64, total_bytes: u64) -> f64 {
    if total_bytes == 0 {
        return PARSE_PROGRESS_CAP;
    }
    ((bytes_read as f64 / total_bytes as f64) * 100.0).min(PARSE_PROGRESS_CAP)
}

fn read_up_to(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Accumulates decoded frames into CSV rows.
struct RowSink<'a, W: std::io::Write> {
    set: &'a SchemaSet,
    writer: csv::Writer<W>,
    packet_count: u64,
    skipped_frames: u64,
    since_flush: u64,
}

impl<'a, W: std::io::Write> RowSink<'a, W> {
    fn new(set: &'a SchemaSet, writer: csv::Writer<W>) -> Self {
        Self {
            set,
            writer,
            packet_count: 0,
            skipped_frames: 0,
            since_flush: 0,
        }
    }

    fn write_header(&mut self) -> Result<(), ParseError> {
        self.writer.write_record(self.set.columns())?;
        Ok(())
    }

    fn packet_count(&self) -> u64 {
        self.packet_count
    }

    /// Decode a raw frame and append one row. Corrupt frames are
    /// counted and dropped.
    fn push(&mut self, frame: &[u8]) -> Result<(), ParseError> {
        let decoded = match decode_frame(self.set, frame) {
            Ok(decoded) => decoded,
            Err(err) => {
                self.skipped_frames += 1;
                tracing::debug!(error = %err, frame_len = frame.len(), "Dropping bad frame");
                return Ok(());
            }
        };

        let columns = self.set.columns();
        let mut row = vec![String::new(); columns.len()];
        // Column 0 is PacketNum (1-based), column 1 is the packet ID.
        row[0] = (self.packet_count + 1).to_string();
        row[1] = decoded.packet_id.to_string();
        for (index, value) in &decoded.values {
            row[*index] = value.to_string();
        }
        self.writer.write_record(&row)?;

        self.packet_count += 1;
        self.since_flush += 1;
        Ok(())
    }

    /// Flush and report once per batch of [`CSV_BATCH_SIZE`] packets.
    fn batch_boundary(&mut self) -> Result<bool, ParseError> {
        if self.since_flush < CSV_BATCH_SIZE {
            return Ok(false);
        }
        self.writer.flush().map_err(ParseError::Io)?;
        self.since_flush = 0;
        Ok(true)
    }

    fn finish(mut self) -> Result<ParseSummary, ParseError> {
        self.writer.flush().map_err(ParseError::Io)?;
        Ok(ParseSummary {
            packet_count: self.packet_count,
            skipped_frames: self.skipped_frames,
        })
    }
}

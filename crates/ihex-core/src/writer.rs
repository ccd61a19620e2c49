//! Intel HEX serialization of a sparse memory image.
//!
//! The writer walks the image's occupied ranges in ascending order, splits
//! each run into fixed-size chunks that never straddle a 64 KiB bank, emits
//! an extended linear address record whenever the upper 16 address bits
//! change, and closes the stream with an end-of-file record. Feeding the
//! output back through the parser reproduces the input image byte for byte.

use crate::image::MemoryImage;
use crate::record::{Record, RecordError};

/// Data bytes per emitted data record.
pub const DATA_RECORD_BYTES: u32 = 16;

/// Serializes an image to record lines without terminators.
///
/// The tracked extended base starts at zero, so images confined to the low
/// 64 KiB produce no extended address records. Entry-point metadata on the
/// image is not emitted.
///
/// # Errors
///
/// Propagates [`RecordError`] from record encoding.
pub fn write_lines(image: &MemoryImage) -> Result<Vec<String>, RecordError> {
    let mut lines = Vec::new();
    let mut upper_base: u16 = 0;

    for range in image.occupied_ranges() {
        let mut chunk_start = range.start;
        loop {
            // Stop a chunk at the record size limit, the end of the run, and
            // the end of the current 64 KiB bank, whichever comes first.
            let bank_last = chunk_start | 0xFFFF;
            let chunk_last = range
                .end
                .min(bank_last)
                .min(chunk_start.saturating_add(DATA_RECORD_BYTES - 1));

            let [upper_high, upper_low, offset_high, offset_low] = chunk_start.to_be_bytes();
            let upper = u16::from_be_bytes([upper_high, upper_low]);
            if upper != upper_base {
                lines.push(Record::ExtendedLinearAddress(upper).encode()?);
                upper_base = upper;
            }

            let bytes: Vec<u8> = image
                .iter_range(chunk_start..=chunk_last)
                .map(|(_, value)| value)
                .collect();
            lines.push(
                Record::Data {
                    offset: u16::from_be_bytes([offset_high, offset_low]),
                    bytes,
                }
                .encode()?,
            );

            if chunk_last == range.end {
                break;
            }
            chunk_start = chunk_last + 1;
        }
    }

    lines.push(Record::EndOfFile.encode()?);
    Ok(lines)
}

/// Serializes an image to one LF-terminated hex text.
///
/// # Errors
///
/// Propagates [`RecordError`] from record encoding.
pub fn write_string(image: &MemoryImage) -> Result<String, RecordError> {
    let lines = write_lines(image)?;
    let mut text = String::with_capacity(lines.iter().map(|line| line.len() + 1).sum());
    for line in lines {
        text.push_str(&line);
        text.push('\n');
    }
    Ok(text)
}

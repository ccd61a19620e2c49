//! Streaming Intel HEX parser: record lines in, sparse memory image out.
//!
//! The parser keeps one piece of ephemeral state while walking a stream: the
//! extended address base accumulated from extended segment/linear records.
//! Each data record's 16-bit offset is added to that base to produce absolute
//! addresses. The base starts at zero and is replaced, never accumulated,
//! when a new extended record arrives.

use thiserror::Error;

use crate::image::{ImageError, MemoryImage, StartAddress};
use crate::record::{Record, RecordError};

/// A failure while parsing a record stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ParseError {
    /// A line failed record-level decoding.
    #[error("line {line}: {source}")]
    Record {
        /// 1-indexed line number of the malformed record.
        line: usize,
        /// The codec failure.
        source: RecordError,
    },
    /// A data record reached beyond the 32-bit address space.
    #[error("line {line}: {source}")]
    Address {
        /// 1-indexed line number of the offending data record.
        line: usize,
        /// The image failure.
        source: ImageError,
    },
    /// The stream ended without an end-of-file record.
    #[error("stream ended without an end-of-file record")]
    MissingEndOfFile,
}

/// Parses a sequence of record lines into a memory image.
///
/// Blank lines (after stripping CR/LF) are skipped. An end-of-file record
/// terminates parsing immediately; anything after it is ignored. Start
/// segment/linear records are recorded as entry-point metadata and never
/// affect the byte contents.
///
/// # Errors
///
/// Returns [`ParseError::Record`] for the first malformed record before the
/// end-of-file record, [`ParseError::Address`] when a data record crosses the
/// top of the 32-bit address space, and [`ParseError::MissingEndOfFile`] when
/// the stream is exhausted without an end-of-file record.
pub fn parse_lines<I, S>(lines: I) -> Result<MemoryImage, ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut image = MemoryImage::new();
    let mut base: u32 = 0;

    for (index, raw) in lines.into_iter().enumerate() {
        let line = index + 1;
        let text = raw.as_ref().trim_end_matches(|c| c == '\r' || c == '\n');
        if text.is_empty() {
            continue;
        }

        let record = Record::decode(text).map_err(|source| ParseError::Record { line, source })?;
        match record {
            Record::Data { offset, bytes } => {
                let start = u64::from(base) + u64::from(offset);
                for (index_in_record, &value) in (0_u64..).zip(bytes.iter()) {
                    image
                        .try_set(start + index_in_record, value)
                        .map_err(|source| ParseError::Address { line, source })?;
                }
            }
            Record::EndOfFile => return Ok(image),
            Record::ExtendedSegmentAddress(segment) => base = u32::from(segment) << 4,
            Record::ExtendedLinearAddress(upper) => base = u32::from(upper) << 16,
            Record::StartSegmentAddress { cs, ip } => {
                image.set_start_address(StartAddress::Segment { cs, ip });
            }
            Record::StartLinearAddress(address) => {
                image.set_start_address(StartAddress::Linear(address));
            }
        }
    }

    Err(ParseError::MissingEndOfFile)
}

/// Parses a whole hex text into a memory image.
///
/// # Errors
///
/// Same conditions as [`parse_lines`].
pub fn parse_str(text: &str) -> Result<MemoryImage, ParseError> {
    parse_lines(text.lines())
}

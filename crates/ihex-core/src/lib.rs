//! Intel HEX codec and sparse-memory merge core for the hexmerge tool.
//!
//! The crate is split along the data flow: [`record`] decodes and encodes
//! single lines, [`reader`] folds a line stream into a [`MemoryImage`],
//! images merge with last-writer-wins override semantics, and [`writer`]
//! serializes a merged image back to hex text. The core performs no I/O and
//! never logs; all failures surface as typed errors.

/// Intel HEX record codec: decode and encode one line.
pub mod record;
pub use record::{checksum, Record, RecordError, RecordKind, MAX_DATA_BYTES};

/// Sparse byte-addressed memory image and merge semantics.
pub mod image;
pub use image::{AddressRange, ImageError, MemoryImage, StartAddress};

/// Streaming parser from hex text to a memory image.
pub mod reader;
pub use reader::{parse_lines, parse_str, ParseError};

/// Serializer from a memory image back to hex text.
pub mod writer;
pub use writer::{write_lines, write_string, DATA_RECORD_BYTES};

#[cfg(test)]
use proptest as _;

//! Intel HEX record codec: one line of text to one structured record and back.
//!
//! A record line has the shape `:BBAAAATTDD..DDCC` where `BB` is the data byte
//! count, `AAAA` the 16-bit offset, `TT` the record type, `DD..DD` the data
//! bytes and `CC` the checksum. All fields are fixed-width big-endian hex.
//! Decoding accepts either hex case and an optional trailing CR/LF; encoding
//! always renders uppercase with no line terminator (stream-level code owns
//! terminators).

use thiserror::Error;

/// Maximum number of data bytes a single record can carry.
pub const MAX_DATA_BYTES: usize = 255;

/// Stable record type codes for the six Intel HEX record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum RecordKind {
    /// Data bytes at a 16-bit offset from the current extended base.
    Data = 0x00,
    /// Terminates the stream.
    EndOfFile = 0x01,
    /// Sets the extended base to a 16-bit segment value shifted left 4 bits.
    ExtendedSegmentAddress = 0x02,
    /// Entry-point metadata as a CS:IP register pair.
    StartSegmentAddress = 0x03,
    /// Sets the extended base to a 16-bit value shifted left 16 bits.
    ExtendedLinearAddress = 0x04,
    /// Entry-point metadata as a 32-bit linear address.
    StartLinearAddress = 0x05,
}

impl RecordKind {
    /// Converts a record kind to its stable type-code byte.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a type-code byte back into a record kind.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::Data),
            0x01 => Some(Self::EndOfFile),
            0x02 => Some(Self::ExtendedSegmentAddress),
            0x03 => Some(Self::StartSegmentAddress),
            0x04 => Some(Self::ExtendedLinearAddress),
            0x05 => Some(Self::StartLinearAddress),
            _ => None,
        }
    }
}

/// A malformed record line rejected by the codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RecordError {
    /// The line does not begin with the `:` start code.
    #[error("record does not start with ':'")]
    MissingStartCode,
    /// The hex body has an odd number of characters.
    #[error("record body has an odd character count ({count})")]
    OddCharacterCount {
        /// Number of characters after the start code.
        count: usize,
    },
    /// A character in the hex body is not a hex digit.
    #[error("invalid hex digit at column {column}")]
    InvalidHexDigit {
        /// 1-indexed column of the offending character.
        column: usize,
    },
    /// The line is shorter than the fixed fields require.
    #[error("record holds {bytes} bytes, fewer than the 5 fixed-field bytes")]
    TooShort {
        /// Number of bytes actually decoded from the line.
        bytes: usize,
    },
    /// The declared byte count disagrees with the actual payload length.
    #[error("declared byte count {declared} does not match {actual} payload bytes")]
    LengthMismatch {
        /// Byte count field as declared in the record.
        declared: u8,
        /// Payload bytes actually present.
        actual: usize,
    },
    /// The stored checksum disagrees with the computed one.
    #[error("checksum mismatch: stored {stored:#04X}, computed {computed:#04X}")]
    ChecksumMismatch {
        /// Checksum byte stored in the record.
        stored: u8,
        /// Checksum computed from the preceding bytes.
        computed: u8,
    },
    /// The record type code is not one of the six defined kinds.
    #[error("unknown record type {code:#04X}")]
    UnknownRecordType {
        /// Type-code byte found in the record.
        code: u8,
    },
    /// The payload length is invalid for the record kind.
    #[error("record type {code:#04X} requires a {expected}-byte payload, got {actual}")]
    InvalidPayloadLength {
        /// Type-code byte of the offending record.
        code: u8,
        /// Payload length the kind requires.
        expected: usize,
        /// Payload length actually present.
        actual: usize,
    },
    /// A data payload exceeds the 255-byte record capacity (encode only).
    #[error("data payload of {bytes} bytes exceeds the {MAX_DATA_BYTES}-byte record capacity")]
    OversizedPayload {
        /// Payload length requested.
        bytes: usize,
    },
}

/// One decoded Intel HEX record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Record {
    /// Data bytes at a 16-bit offset.
    Data {
        /// 16-bit offset field, relative to the current extended base.
        offset: u16,
        /// Raw data bytes (at most [`MAX_DATA_BYTES`]).
        bytes: Vec<u8>,
    },
    /// End-of-file marker.
    EndOfFile,
    /// Extended segment base (value is shifted left 4 bits when applied).
    ExtendedSegmentAddress(u16),
    /// Entry-point metadata: CS and IP register values.
    StartSegmentAddress {
        /// Code segment register value.
        cs: u16,
        /// Instruction pointer register value.
        ip: u16,
    },
    /// Extended linear base (value is shifted left 16 bits when applied).
    ExtendedLinearAddress(u16),
    /// Entry-point metadata: 32-bit linear address.
    StartLinearAddress(u32),
}

impl Record {
    /// Returns the record kind for this record.
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::Data { .. } => RecordKind::Data,
            Self::EndOfFile => RecordKind::EndOfFile,
            Self::ExtendedSegmentAddress(_) => RecordKind::ExtendedSegmentAddress,
            Self::StartSegmentAddress { .. } => RecordKind::StartSegmentAddress,
            Self::ExtendedLinearAddress(_) => RecordKind::ExtendedLinearAddress,
            Self::StartLinearAddress(_) => RecordKind::StartLinearAddress,
        }
    }

    /// Decodes one record line.
    ///
    /// Accepts an optional trailing CR and/or LF and either hex case.
    ///
    /// # Errors
    ///
    /// Returns a [`RecordError`] when the start code is missing, a character
    /// is not a hex digit, the declared length disagrees with the line, the
    /// checksum does not verify, the record type is unknown, or the payload
    /// shape is invalid for the record kind.
    pub fn decode(line: &str) -> Result<Self, RecordError> {
        let line = line.trim_end_matches(|c| c == '\r' || c == '\n');
        let body = line.strip_prefix(':').ok_or(RecordError::MissingStartCode)?;
        let bytes = decode_hex_body(body)?;

        if bytes.len() < 5 {
            return Err(RecordError::TooShort { bytes: bytes.len() });
        }

        let declared = bytes[0];
        let actual = bytes.len() - 5;
        if usize::from(declared) != actual {
            return Err(RecordError::LengthMismatch { declared, actual });
        }

        let stored = bytes[bytes.len() - 1];
        let offset = u16::from_be_bytes([bytes[1], bytes[2]]);
        let code = bytes[3];
        let payload = &bytes[4..bytes.len() - 1];
        let computed = checksum(declared, offset, code, payload);
        if stored != computed {
            return Err(RecordError::ChecksumMismatch { stored, computed });
        }

        let kind = RecordKind::from_u8(code).ok_or(RecordError::UnknownRecordType { code })?;
        Self::from_fields(kind, offset, payload)
    }

    /// Builds a record from verified wire fields.
    fn from_fields(kind: RecordKind, offset: u16, payload: &[u8]) -> Result<Self, RecordError> {
        let expect_payload = |expected: usize| {
            if payload.len() == expected {
                Ok(())
            } else {
                Err(RecordError::InvalidPayloadLength {
                    code: kind.as_u8(),
                    expected,
                    actual: payload.len(),
                })
            }
        };

        match kind {
            RecordKind::Data => Ok(Self::Data {
                offset,
                bytes: payload.to_vec(),
            }),
            RecordKind::EndOfFile => {
                expect_payload(0)?;
                Ok(Self::EndOfFile)
            }
            RecordKind::ExtendedSegmentAddress => {
                expect_payload(2)?;
                Ok(Self::ExtendedSegmentAddress(u16::from_be_bytes([
                    payload[0], payload[1],
                ])))
            }
            RecordKind::StartSegmentAddress => {
                expect_payload(4)?;
                Ok(Self::StartSegmentAddress {
                    cs: u16::from_be_bytes([payload[0], payload[1]]),
                    ip: u16::from_be_bytes([payload[2], payload[3]]),
                })
            }
            RecordKind::ExtendedLinearAddress => {
                expect_payload(2)?;
                Ok(Self::ExtendedLinearAddress(u16::from_be_bytes([
                    payload[0], payload[1],
                ])))
            }
            RecordKind::StartLinearAddress => {
                expect_payload(4)?;
                Ok(Self::StartLinearAddress(u32::from_be_bytes([
                    payload[0], payload[1], payload[2], payload[3],
                ])))
            }
        }
    }

    /// Encodes this record as one uppercase hex line without a terminator.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::OversizedPayload`] when a data record holds
    /// more than [`MAX_DATA_BYTES`] bytes.
    pub fn encode(&self) -> Result<String, RecordError> {
        let mut buffer = [0_u8; 4];
        let (offset, payload): (u16, &[u8]) = match self {
            Self::Data { offset, bytes } => (*offset, bytes.as_slice()),
            Self::EndOfFile => (0, &[]),
            Self::ExtendedSegmentAddress(base) => {
                buffer[..2].copy_from_slice(&base.to_be_bytes());
                (0, &buffer[..2])
            }
            Self::StartSegmentAddress { cs, ip } => {
                buffer[..2].copy_from_slice(&cs.to_be_bytes());
                buffer[2..].copy_from_slice(&ip.to_be_bytes());
                (0, &buffer)
            }
            Self::ExtendedLinearAddress(base) => {
                buffer[..2].copy_from_slice(&base.to_be_bytes());
                (0, &buffer[..2])
            }
            Self::StartLinearAddress(address) => {
                buffer.copy_from_slice(&address.to_be_bytes());
                (0, &buffer)
            }
        };

        let count = u8::try_from(payload.len()).map_err(|_| RecordError::OversizedPayload {
            bytes: payload.len(),
        })?;

        let code = self.kind().as_u8();
        let [offset_high, offset_low] = offset.to_be_bytes();
        let mut line = String::with_capacity(11 + 2 * payload.len());
        line.push(':');
        push_hex_byte(&mut line, count);
        push_hex_byte(&mut line, offset_high);
        push_hex_byte(&mut line, offset_low);
        push_hex_byte(&mut line, code);
        for &byte in payload {
            push_hex_byte(&mut line, byte);
        }
        push_hex_byte(&mut line, checksum(count, offset, code, payload));
        Ok(line)
    }
}

/// Computes the record checksum: two's complement of the byte sum of the
/// count, offset, type and data fields, modulo 256.
#[must_use]
pub const fn checksum(count: u8, offset: u16, code: u8, payload: &[u8]) -> u8 {
    let [offset_high, offset_low] = offset.to_be_bytes();
    let mut sum = count
        .wrapping_add(offset_high)
        .wrapping_add(offset_low)
        .wrapping_add(code);
    let mut index = 0;
    while index < payload.len() {
        sum = sum.wrapping_add(payload[index]);
        index += 1;
    }
    sum.wrapping_neg()
}

fn decode_hex_body(body: &str) -> Result<Vec<u8>, RecordError> {
    if body.len() % 2 != 0 {
        return Err(RecordError::OddCharacterCount { count: body.len() });
    }

    let mut bytes = Vec::with_capacity(body.len() / 2);
    for (index, chunk) in body.as_bytes().chunks_exact(2).enumerate() {
        let high = hex_digit_value(chunk[0]);
        let low = hex_digit_value(chunk[1]);
        match (high, low) {
            (Some(high), Some(low)) => bytes.push(high << 4 | low),
            (None, _) => {
                return Err(RecordError::InvalidHexDigit {
                    column: 2 + index * 2,
                })
            }
            (_, None) => {
                return Err(RecordError::InvalidHexDigit {
                    column: 3 + index * 2,
                })
            }
        }
    }
    Ok(bytes)
}

const fn hex_digit_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        _ => None,
    }
}

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

fn push_hex_byte(line: &mut String, byte: u8) {
    line.push(HEX_DIGITS[usize::from(byte >> 4)] as char);
    line.push(HEX_DIGITS[usize::from(byte & 0x0F)] as char);
}

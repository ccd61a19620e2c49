//! Sparse byte-addressed memory image with override-on-overlap merge.
//!
//! An image records only the addresses that were explicitly written. Storage
//! is a `BTreeMap` keyed by 32-bit absolute address, so every iteration
//! surface is naturally ascending, which the writer relies on for record
//! ordering. Images never shrink; no delete operation is exposed.

use std::collections::BTreeMap;
use std::ops::RangeBounds;

use thiserror::Error;

/// An address that cannot be represented in the 32-bit image space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ImageError {
    /// An absolute address exceeds `u32::MAX`.
    #[error("absolute address {address:#X} exceeds the 32-bit address space")]
    AddressOutOfRange {
        /// The offending absolute address.
        address: u64,
    },
}

/// Entry-point metadata carried by start-address records.
///
/// Recorded during parsing and propagated by [`MemoryImage::merge`]; the
/// writer does not emit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StartAddress {
    /// CS:IP register pair from a start segment address record.
    Segment {
        /// Code segment register value.
        cs: u16,
        /// Instruction pointer register value.
        ip: u16,
    },
    /// 32-bit entry point from a start linear address record.
    Linear(u32),
}

/// A maximal run of contiguous occupied addresses, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AddressRange {
    /// Inclusive start address.
    pub start: u32,
    /// Inclusive end address.
    pub end: u32,
}

impl AddressRange {
    /// Number of addresses covered by this range.
    #[must_use]
    pub fn byte_len(&self) -> u64 {
        u64::from(self.end - self.start) + 1
    }
}

/// A sparse mapping from 32-bit absolute addresses to byte values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MemoryImage {
    bytes: BTreeMap<u32, u8>,
    start_address: Option<StartAddress>,
}

impl MemoryImage {
    /// Creates an empty image.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: BTreeMap::new(),
            start_address: None,
        }
    }

    /// Sets or overwrites the byte at `address`.
    pub fn set(&mut self, address: u32, value: u8) {
        self.bytes.insert(address, value);
    }

    /// Sets the byte at a 64-bit absolute address, rejecting addresses that
    /// fall outside the 32-bit image space.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::AddressOutOfRange`] when `address > u32::MAX`.
    pub fn try_set(&mut self, address: u64, value: u8) -> Result<(), ImageError> {
        let address =
            u32::try_from(address).map_err(|_| ImageError::AddressOutOfRange { address })?;
        self.set(address, value);
        Ok(())
    }

    /// Returns the byte at `address`, if one was written.
    #[must_use]
    pub fn get(&self, address: u32) -> Option<u8> {
        self.bytes.get(&address).copied()
    }

    /// Number of occupied addresses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` when no address is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Entry-point metadata recorded for this image, if any.
    #[must_use]
    pub const fn start_address(&self) -> Option<StartAddress> {
        self.start_address
    }

    /// Records entry-point metadata for this image.
    pub fn set_start_address(&mut self, start: StartAddress) {
        self.start_address = Some(start);
    }

    /// Iterates all occupied addresses in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u8)> + '_ {
        self.bytes.iter().map(|(&address, &value)| (address, value))
    }

    /// Iterates occupied addresses within `range` in ascending order.
    ///
    /// Re-querying the same range yields the same sequence unless the image
    /// is mutated in between.
    ///
    /// # Panics
    ///
    /// Panics if the range's start exceeds its end, as `BTreeMap::range` does.
    pub fn iter_range<R>(&self, range: R) -> impl Iterator<Item = (u32, u8)> + '_
    where
        R: RangeBounds<u32>,
    {
        self.bytes
            .range(range)
            .map(|(&address, &value)| (address, value))
    }

    /// Groups occupied addresses into maximal contiguous runs, ascending by
    /// start address. Two addresses are contiguous iff they differ by one.
    #[must_use]
    pub fn occupied_ranges(&self) -> Vec<AddressRange> {
        let mut ranges: Vec<AddressRange> = Vec::new();
        for &address in self.bytes.keys() {
            match ranges.last_mut() {
                Some(last) if last.end.checked_add(1) == Some(address) => last.end = address,
                _ => ranges.push(AddressRange {
                    start: address,
                    end: address,
                }),
            }
        }
        ranges
    }

    /// Merges `overlay` into this image with replace semantics: every byte
    /// present in the overlay overrides this image's byte at that address,
    /// and addresses present only in the overlay are added. Overlay
    /// entry-point metadata, when present, replaces this image's.
    pub fn merge(&mut self, overlay: &Self) {
        for (address, value) in overlay.iter() {
            self.set(address, value);
        }
        if let Some(start) = overlay.start_address {
            self.start_address = Some(start);
        }
    }
}

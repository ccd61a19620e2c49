//! End-to-end merge scenarios: parse N inputs, fold left to right, write one
//! output. Later inputs override earlier ones wherever they overlap.

use proptest as _;
use rstest as _;
use thiserror as _;

use ihex_core::{parse_str, write_string, MemoryImage, ParseError, RecordError};

fn parse(text: &str) -> MemoryImage {
    parse_str(text).expect("test input parses")
}

fn merge_texts(texts: &[&str]) -> Result<MemoryImage, ParseError> {
    let mut merged = MemoryImage::new();
    for text in texts {
        merged.merge(&parse_str(text)?);
    }
    Ok(merged)
}

fn image_with_run(start: u32, values: &[u8]) -> MemoryImage {
    let mut image = MemoryImage::new();
    for (index, &value) in values.iter().enumerate() {
        image.set(start + u32::try_from(index).expect("test run fits u32"), value);
    }
    image
}

const INPUT_A: &str = ":10000000FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF00\n:00000001FF\n";
const INPUT_B: &str = ":10000800AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA48\n:00000001FF\n";

#[test]
fn overlay_overrides_overlap_and_keeps_non_overlapping_bytes() {
    // A covers 0x0000..=0x000F with 0xFF, B covers 0x0008..=0x0017 with 0xAA.
    let mut merged = parse(INPUT_A);
    merged.merge(&parse(INPUT_B));

    for address in 0x0000..=0x0007_u32 {
        assert_eq!(merged.get(address), Some(0xFF), "address {address:#06X}");
    }
    for address in 0x0008..=0x0017_u32 {
        assert_eq!(merged.get(address), Some(0xAA), "address {address:#06X}");
    }
    assert_eq!(merged.len(), 0x18);
}

#[test]
fn three_way_merge_respects_last_writer_at_each_address() {
    let first = write_string(&image_with_run(0x0000, &[0x11, 0x11, 0x11, 0x11])).unwrap();
    let second = write_string(&image_with_run(0x0100, &[0x22])).unwrap();
    let third = write_string(&image_with_run(0x0002, &[0x33])).unwrap();

    let merged = merge_texts(&[&first, &second, &third]).expect("all inputs parse");

    assert_eq!(merged.get(0x0000), Some(0x11));
    assert_eq!(merged.get(0x0001), Some(0x11));
    assert_eq!(merged.get(0x0002), Some(0x33));
    assert_eq!(merged.get(0x0003), Some(0x11));
    assert_eq!(merged.get(0x0100), Some(0x22));
}

#[test]
fn malformed_input_anywhere_fails_the_whole_merge() {
    // Second input has a corrupted checksum on its data record.
    let bad = ":0100000042BC\n:00000001FF\n";
    let result = merge_texts(&[INPUT_A, bad]);
    assert_eq!(
        result,
        Err(ParseError::Record {
            line: 1,
            source: RecordError::ChecksumMismatch {
                stored: 0xBC,
                computed: 0xBD,
            },
        })
    );
}

#[test]
fn merging_empty_input_changes_nothing() {
    let mut merged = parse(INPUT_A);
    let snapshot = merged.clone();
    merged.merge(&parse(":00000001FF\n"));
    assert_eq!(merged, snapshot);
}

#[test]
fn empty_image_round_trips_to_the_single_eof_line() {
    let image = parse(":00000001FF\n");
    assert!(image.is_empty());
    assert_eq!(write_string(&image).unwrap(), ":00000001FF\n");
}

#[test]
fn merged_image_round_trips_through_text() {
    let mut merged = parse(INPUT_A);
    merged.merge(&parse(INPUT_B));

    let text = write_string(&merged).unwrap();
    assert_eq!(parse(&text), merged);
}

#[test]
fn merge_spanning_banks_keeps_both_contributions() {
    let low = write_string(&image_with_run(0x0000_FFF0, &[0x01; 32])).unwrap();
    let high = write_string(&image_with_run(0x0001_0000, &[0x02; 4])).unwrap();

    let merged = merge_texts(&[&low, &high]).expect("both inputs parse");

    assert_eq!(merged.get(0x0000_FFF0), Some(0x01));
    assert_eq!(merged.get(0x0001_0000), Some(0x02));
    assert_eq!(merged.get(0x0001_0003), Some(0x02));
    assert_eq!(merged.get(0x0001_0004), Some(0x01));
    assert_eq!(merged.get(0x0001_000F), Some(0x01));
}

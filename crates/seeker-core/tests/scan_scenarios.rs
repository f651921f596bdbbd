//! End-to-end scan scenarios driven through the public API

use seeker_common::{CompareFlags, ScalarType};
use seeker_core::{ScanVariant, ScannerTargetDolphin, VariantType};

fn prepared(variant: ScanVariant) -> ScanVariant {
    // an unattached target supplies the search context; byte order is
    // passed explicitly to each scan
    let target = ScannerTargetDolphin::new();
    variant.prepare_for_search(&target).unwrap();
    variant
}

fn scan(
    variant: &ScanVariant,
    chunk: &[u8],
    wanted: CompareFlags,
    little_endian: bool,
) -> Vec<usize> {
    let mut locations = Vec::new();
    variant.search_for_matches_in_chunk(chunk, wanted, 0x8000_0000, little_endian, &mut locations);
    locations
}

#[test]
fn integer_equality() {
    let v = prepared(ScanVariant::from_number_typed(0x1234, ScalarType::U16));
    let chunk = [
        0x00, 0x00, 0x34, 0x12, 0x00, 0x00, 0x34, 0x12, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00,
    ];
    assert_eq!(scan(&v, &chunk, CompareFlags::EQUALS, true), vec![2, 6]);
}

#[test]
fn endianness_flip() {
    let v = prepared(ScanVariant::from_number_typed(0x1234, ScalarType::U16));
    let le_chunk = [
        0x00, 0x00, 0x34, 0x12, 0x00, 0x00, 0x34, 0x12, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00,
    ];
    // the little-endian encodings are invisible to a big-endian scan
    assert_eq!(
        scan(&v, &le_chunk, CompareFlags::EQUALS, false),
        Vec::<usize>::new()
    );

    let be_chunk = [
        0x00, 0x00, 0x12, 0x34, 0x00, 0x00, 0x12, 0x34, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00,
    ];
    assert_eq!(scan(&v, &be_chunk, CompareFlags::EQUALS, false), vec![2, 6]);
}

#[test]
fn range_containment() {
    let v = prepared(ScanVariant::from_variant_range(
        &ScanVariant::from_number_typed(10, ScalarType::U8),
        &ScanVariant::from_number_typed(20, ScalarType::U8),
    ));
    let chunk = [0x05, 0x0A, 0x0F, 0x14, 0x15, 0x00];
    assert_eq!(scan(&v, &chunk, CompareFlags::EQUALS, true), vec![1, 2, 3]);
}

#[test]
fn placeholder_matches_everywhere() {
    let v = prepared(ScanVariant::placeholder(ScalarType::U32));
    let chunk = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];
    for wanted in [
        CompareFlags::EQUALS,
        CompareFlags::GREATER_THAN,
        CompareFlags::NOT_EQUAL,
        CompareFlags::ALL,
    ] {
        assert_eq!(scan(&v, &chunk, wanted, false), vec![0, 1, 2, 3, 4]);
        assert_eq!(scan(&v, &chunk, wanted, true), vec![0, 1, 2, 3, 4]);
    }
}

#[test]
fn structure_fields_match_together() {
    let v = prepared(ScanVariant::from_struct(vec![
        ScanVariant::from_number_typed(1, ScalarType::U8),
        ScanVariant::from_number_typed(0x0200, ScalarType::U16),
    ]));
    let chunk = [0x01, 0x00, 0x02, 0x01, 0x00, 0x03, 0x01, 0x00, 0x02];
    assert_eq!(scan(&v, &chunk, CompareFlags::EQUALS, true), vec![0, 6]);
}

#[test]
fn ascii_string_windows() {
    let v = prepared(ScanVariant::from_string_typed(
        "Hi",
        VariantType::AsciiString,
    ));
    let chunk = [0x48, 0x69, 0x48, 0x69, 0x48];
    assert_eq!(scan(&v, &chunk, CompareFlags::EQUALS, true), vec![0, 2]);
    assert_eq!(scan(&v, &chunk, CompareFlags::NOT_EQUAL, true), vec![1, 3]);
}

#[test]
fn every_mask_bit_is_honored() {
    let v = prepared(ScanVariant::from_number_typed(100, ScalarType::U8));
    let chunk = [50, 100, 150];

    assert_eq!(scan(&v, &chunk, CompareFlags::EQUALS, false), vec![1]);
    assert_eq!(scan(&v, &chunk, CompareFlags::GREATER_THAN, false), vec![2]);
    assert_eq!(scan(&v, &chunk, CompareFlags::LESS_THAN, false), vec![0]);
    assert_eq!(
        scan(&v, &chunk, CompareFlags::GREATER_THAN_OR_EQUAL, false),
        vec![1, 2]
    );
    assert_eq!(
        scan(&v, &chunk, CompareFlags::LESS_THAN_OR_EQUAL, false),
        vec![0, 1]
    );
    assert_eq!(scan(&v, &chunk, CompareFlags::NOT_EQUAL, false), vec![0, 2]);
}

#[test]
fn materialized_placeholder_round_trip() {
    // a placeholder widens a structure layout; once a scan pass reads the
    // live bytes the placeholder materializes into a scalar of its type
    let reference = ScanVariant::placeholder(ScalarType::U32);
    let live = [0x00, 0x00, 0x01, 0x00];
    let materialized = ScanVariant::from_raw_buffer(&live, false, &reference);
    assert_eq!(
        materialized.scalar().and_then(seeker_core::Scalar::as_u32),
        Some(0x100)
    );
    assert!(materialized.is_compatible_with(&reference, false));
}

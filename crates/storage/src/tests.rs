use super::*;
use common::{PageId, Row};
use proptest::prelude::*;
use types::Value;

#[test]
fn fresh_page_is_empty_and_dirty() {
    let page = Page::new(PageId(3), PageType::Data);
    assert_eq!(page.id(), PageId(3));
    assert_eq!(page.page_type(), PageType::Data);
    assert_eq!(page.num_slots(), 0);
    assert_eq!(page.free_offset(), 0);
    assert_eq!(page.free_space(), PAGE_PAYLOAD_SIZE);
    assert!(page.is_dirty());
}

#[test]
fn page_image_is_exactly_page_size() {
    let page = Page::new(PageId(0), PageType::BTreeLeaf);
    assert_eq!(page.to_bytes().len(), PAGE_SIZE);
}

#[test]
fn page_codec_round_trip() {
    let mut page = Page::new(PageId(9), PageType::Data);
    page.append_record(b"hello").unwrap();
    page.append_record(b"").unwrap();
    page.append_record(&[0xFFu8; 100]).unwrap();

    let image = page.to_bytes();
    let back = Page::from_bytes(PageId(9), &image).unwrap();

    assert_eq!(back.page_type(), PageType::Data);
    assert_eq!(back.num_slots(), 3);
    assert_eq!(back.free_offset(), page.free_offset());
    assert!(!back.is_dirty());
    assert_eq!(back.to_bytes(), image);
}

#[test]
fn header_id_mismatch_is_corrupt() {
    let page = Page::new(PageId(5), PageType::Free);
    let image = page.to_bytes();
    let err = Page::from_bytes(PageId(6), &image).unwrap_err();
    assert!(matches!(err, common::DbError::CorruptPage { page: 6, .. }));
}

#[test]
fn bad_page_type_is_corrupt() {
    let page = Page::new(PageId(0), PageType::Free);
    let mut image = page.to_bytes();
    image[4] = 99;
    assert!(Page::from_bytes(PageId(0), &image).is_err());
}

#[test]
fn append_and_read_back_records() {
    let mut page = Page::new(PageId(1), PageType::Data);
    let off_a = page.append_record(b"first").unwrap();
    let off_b = page.append_record(b"second").unwrap();

    assert_eq!(off_a, 0);
    assert_eq!(off_b, 7); // 2-byte prefix + "first"
    assert_eq!(page.record_at(off_a as u32).unwrap(), b"first");
    assert_eq!(page.record_at(off_b as u32).unwrap(), b"second");

    let collected: Vec<_> = page
        .records()
        .map(|r| r.unwrap().1.to_vec())
        .collect();
    assert_eq!(collected, vec![b"first".to_vec(), b"second".to_vec()]);
}

#[test]
fn append_respects_capacity() {
    let mut page = Page::new(PageId(1), PageType::Data);
    let big = vec![0u8; PAGE_PAYLOAD_SIZE - 2];
    page.append_record(&big).unwrap();
    assert_eq!(page.free_space(), 0);
    assert!(page.append_record(b"x").is_err());
}

#[test]
fn record_at_rejects_stale_offsets() {
    let mut page = Page::new(PageId(1), PageType::Data);
    page.append_record(b"abc").unwrap();
    assert!(page.record_at(100).is_err());
}

#[test]
fn row_codec_round_trip() {
    let row = Row::new(
        42,
        vec![
            Value::Integer(-7),
            Value::Real(3.5),
            Value::Text("Ada Lovelace".into()),
            Value::Boolean(false),
            Value::Null,
        ],
    );

    let bytes = encode_row(&row).unwrap();
    assert_eq!(decode_row(&bytes).unwrap(), row);
}

#[test]
fn row_codec_layout_is_little_endian() {
    let row = Row::new(1, vec![Value::Integer(2)]);
    let bytes = encode_row(&row).unwrap();
    // row_id, n_values, tag, null flag, payload
    assert_eq!(&bytes[..8], &1u64.to_le_bytes());
    assert_eq!(&bytes[8..10], &1u16.to_le_bytes());
    assert_eq!(bytes[10], 1);
    assert_eq!(bytes[11], 0);
    assert_eq!(&bytes[12..], &2i64.to_le_bytes());
}

#[test]
fn null_encodes_without_payload() {
    let row = Row::new(1, vec![Value::Null]);
    let bytes = encode_row(&row).unwrap();
    assert_eq!(bytes.len(), 12);
    assert_eq!(bytes[11], 1);
}

#[test]
fn decode_rejects_unknown_tag_and_truncation() {
    let row = Row::new(1, vec![Value::Integer(2)]);
    let mut bytes = encode_row(&row).unwrap();
    bytes[10] = 9;
    assert!(decode_row(&bytes).is_err());

    let bytes = encode_row(&row).unwrap();
    assert!(decode_row(&bytes[..bytes.len() - 1]).is_err());
}

#[test]
fn pk_key_matches_value_codec() {
    let key = value_key(&Value::Text("k".into())).unwrap();
    assert_eq!(key, vec![3, 0, 1, 0, b'k']);
    assert_eq!(row_id_key(6), 6u64.to_le_bytes().to_vec());
}

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::Integer),
        any::<f64>().prop_map(Value::Real),
        ".{0,40}".prop_map(Value::Text),
        any::<bool>().prop_map(Value::Boolean),
        Just(Value::Null),
    ]
}

proptest! {
    #[test]
    fn row_round_trip_any_values(id in any::<u64>(), values in prop::collection::vec(arb_value(), 0..12)) {
        let row = Row::new(id, values);
        let bytes = encode_row(&row).unwrap();
        let back = decode_row(&bytes).unwrap();
        prop_assert_eq!(back.id, row.id);
        prop_assert_eq!(back.values.len(), row.values.len());
        for (a, b) in back.values.iter().zip(row.values.iter()) {
            match (a, b) {
                (Value::Real(x), Value::Real(y)) => prop_assert_eq!(x.to_bits(), y.to_bits()),
                _ => prop_assert_eq!(a, b),
            }
        }
    }

    #[test]
    fn page_round_trip_any_records(records in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..20)) {
        let mut page = Page::new(PageId(2), PageType::Data);
        for record in &records {
            page.append_record(record).unwrap();
        }
        let image = page.to_bytes();
        let back = Page::from_bytes(PageId(2), &image).unwrap();
        prop_assert_eq!(back.to_bytes(), image);
        let walked: Vec<Vec<u8>> = back.records().map(|r| r.unwrap().1.to_vec()).collect();
        prop_assert_eq!(walked, records);
    }
}

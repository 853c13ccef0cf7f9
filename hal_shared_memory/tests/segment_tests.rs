//! Segment level tests: seqlock reads, atomic cells, malformed tables

use hal_shared_memory::pin_table::{PIN_TABLE_MAGIC, PIN_TABLE_SIZE};
use hal_shared_memory::{PinTable, SHM_MIN_SIZE, SegmentReader, SegmentWriter, ShmError, ShmResult};
use proptest::prelude::*;
use std::sync::atomic::Ordering;

fn unique(name: &str) -> String {
    format!("{}_{}", name, std::process::id())
}

#[test]
fn test_reader_follows_writer() -> ShmResult<()> {
    let name = unique("it_follow");
    let mut writer = SegmentWriter::create(&name, SHM_MIN_SIZE)?;
    let mut reader = SegmentReader::attach(&name)?;

    for i in 0..10u8 {
        writer.write_at(16, &[i; 8])?;
        assert!(reader.has_changed());
        assert_eq!(reader.read_range(16, 8)?, &[i; 8]);
        assert!(!reader.has_changed());
    }
    Ok(())
}

#[test]
fn test_cells_are_shared_across_threads() -> ShmResult<()> {
    let name = unique("it_cells");
    let writer = SegmentWriter::create(&name, SHM_MIN_SIZE)?;

    let handle = {
        let name = name.clone();
        std::thread::spawn(move || -> ShmResult<()> {
            let reader = SegmentReader::attach(&name)?;
            reader.cell(64)?.store(0xDEAD_BEEF, Ordering::Release);
            Ok(())
        })
    };
    handle.join().expect("reader thread panicked")?;

    assert_eq!(writer.cell(64)?.load(Ordering::Acquire), 0xDEAD_BEEF);
    Ok(())
}

#[test]
fn test_misaligned_cell_is_rejected() -> ShmResult<()> {
    let name = unique("it_align");
    let writer = SegmentWriter::create(&name, SHM_MIN_SIZE)?;
    assert!(writer.cell(2).is_err());
    assert!(writer.cell(SHM_MIN_SIZE).is_err());
    Ok(())
}

#[test]
fn test_invalid_segment_size() {
    match SegmentWriter::create(&unique("it_size"), 0) {
        Err(ShmError::InvalidSize { .. }) => {}
        other => panic!("Expected InvalidSize error, got: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_zeroed_segment_has_no_pin_table() -> ShmResult<()> {
    let name = unique("it_zeroed");
    let _writer = SegmentWriter::create(&name, SHM_MIN_SIZE)?;
    let mut reader = SegmentReader::attach(&name)?;

    let bytes = reader.read_range(0, PIN_TABLE_SIZE)?.to_vec();
    assert!(matches!(
        PinTable::decode(&name, &bytes),
        Err(ShmError::Corrupt { .. })
    ));
    Ok(())
}

proptest! {
    #[test]
    fn garbage_tables_never_panic(mut bytes in proptest::collection::vec(any::<u8>(), 0..PIN_TABLE_SIZE)) {
        if bytes.len() >= 8 {
            bytes[..8].copy_from_slice(&PIN_TABLE_MAGIC);
        }
        if let Ok(table) = PinTable::decode("fuzz", &bytes) {
            prop_assert!(table.slots.len() == table.header.pin_count);
        }
    }
}

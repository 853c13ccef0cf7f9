//! Pin table layout inside a component segment.
//!
//! ```text
//! data section
//! ┌────────────────────────── 128 B table header ──────────────────────────┐
//! │ magic "HALPINS\0" │ pin_count │ ready │ owner_pid │ rsvd │ name │ prefix │
//! ├──────────────────────────── 64 B slot × 32 ────────────────────────────┤
//! │ full pin name [48] │ type │ dir │ reserved [10] │ value cell (u32)      │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Header and slot metadata are written by the owner under the segment
//! seqlock. Value cells are plain atomics that any process may touch.
//! Integers are little-endian.

use crate::consts::SHM_MIN_SIZE;
use crate::error::{ShmError, ShmResult};
use hal::consts::{HAL_NAME_LEN, MAX_PINS_PER_COMPONENT};
use hal::pin::{PinDirection, PinType};
use static_assertions::const_assert;

/// Magic bytes at the start of the table
pub const PIN_TABLE_MAGIC: [u8; 8] = *b"HALPINS\0";

/// Size of the table header
pub const TABLE_HEADER_SIZE: usize = 128;

/// Size of one pin slot
pub const SLOT_SIZE: usize = 64;

/// Width of a NUL-padded name field
pub const NAME_FIELD_LEN: usize = HAL_NAME_LEN + 1;

/// Bytes of a slot written as metadata (name, type, direction)
pub const SLOT_META_LEN: usize = NAME_FIELD_LEN + 2;

/// Offset of the value cell inside a slot
pub const SLOT_VALUE_OFFSET: usize = 60;

/// Total bytes used by the table
pub const PIN_TABLE_SIZE: usize = TABLE_HEADER_SIZE + MAX_PINS_PER_COMPONENT * SLOT_SIZE;

const PIN_COUNT_OFFSET: usize = 8;
const READY_OFFSET: usize = 12;
const OWNER_PID_OFFSET: usize = 16;
const COMPONENT_OFFSET: usize = 32;
const PREFIX_OFFSET: usize = COMPONENT_OFFSET + NAME_FIELD_LEN;

const_assert!(PREFIX_OFFSET + NAME_FIELD_LEN <= TABLE_HEADER_SIZE);
const_assert!(SLOT_META_LEN <= SLOT_VALUE_OFFSET);
const_assert!(SLOT_VALUE_OFFSET + 4 <= SLOT_SIZE);
const_assert!(PIN_TABLE_SIZE <= SHM_MIN_SIZE);

/// Offset of slot `index` in the data section
pub const fn slot_offset(index: usize) -> usize {
    TABLE_HEADER_SIZE + index * SLOT_SIZE
}

/// Offset of the value cell of slot `index` in the data section
pub const fn value_offset(index: usize) -> usize {
    slot_offset(index) + SLOT_VALUE_OFFSET
}

/// Decoded table header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHeader {
    /// Component name
    pub component: String,
    /// Pin name prefix
    pub prefix: String,
    /// Number of slots in use
    pub pin_count: usize,
    /// Component has been marked ready
    pub ready: bool,
    /// Owning process
    pub owner_pid: u32,
}

impl TableHeader {
    /// Encode into the on-segment representation
    pub fn encode(&self) -> [u8; TABLE_HEADER_SIZE] {
        let mut buf = [0u8; TABLE_HEADER_SIZE];
        buf[..8].copy_from_slice(&PIN_TABLE_MAGIC);
        put_u32(&mut buf, PIN_COUNT_OFFSET, self.pin_count as u32);
        put_u32(&mut buf, READY_OFFSET, self.ready as u32);
        put_u32(&mut buf, OWNER_PID_OFFSET, self.owner_pid);
        put_name(&mut buf[COMPONENT_OFFSET..PREFIX_OFFSET], &self.component);
        put_name(&mut buf[PREFIX_OFFSET..PREFIX_OFFSET + NAME_FIELD_LEN], &self.prefix);
        buf
    }

    /// Decode and validate a table header
    pub fn decode(segment: &str, bytes: &[u8]) -> ShmResult<Self> {
        if bytes.len() < TABLE_HEADER_SIZE {
            return Err(corrupt(segment, "table header truncated"));
        }
        if bytes[..8] != PIN_TABLE_MAGIC {
            return Err(corrupt(segment, "bad pin table magic"));
        }

        let pin_count = get_u32(bytes, PIN_COUNT_OFFSET) as usize;
        if pin_count > MAX_PINS_PER_COMPONENT {
            return Err(corrupt(segment, "pin count out of range"));
        }

        Ok(Self {
            component: get_name(segment, &bytes[COMPONENT_OFFSET..PREFIX_OFFSET])?,
            prefix: get_name(segment, &bytes[PREFIX_OFFSET..PREFIX_OFFSET + NAME_FIELD_LEN])?,
            pin_count,
            ready: get_u32(bytes, READY_OFFSET) != 0,
            owner_pid: get_u32(bytes, OWNER_PID_OFFSET),
        })
    }
}

/// Decoded slot metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotMeta {
    /// Full pin name
    pub name: String,
    /// Value type
    pub pin_type: PinType,
    /// Direction seen from the owner
    pub direction: PinDirection,
}

impl SlotMeta {
    /// Encode the metadata part of a slot (the value cell is left untouched)
    pub fn encode(&self) -> [u8; SLOT_META_LEN] {
        let mut buf = [0u8; SLOT_META_LEN];
        put_name(&mut buf[..NAME_FIELD_LEN], &self.name);
        buf[NAME_FIELD_LEN] = self.pin_type as u8;
        buf[NAME_FIELD_LEN + 1] = self.direction as u8;
        buf
    }

    /// Decode slot metadata
    pub fn decode(segment: &str, bytes: &[u8]) -> ShmResult<Self> {
        if bytes.len() < SLOT_META_LEN {
            return Err(corrupt(segment, "pin slot truncated"));
        }
        Ok(Self {
            name: get_name(segment, &bytes[..NAME_FIELD_LEN])?,
            pin_type: PinType::from_u8(bytes[NAME_FIELD_LEN])
                .ok_or_else(|| corrupt(segment, "unknown pin type"))?,
            direction: PinDirection::from_u8(bytes[NAME_FIELD_LEN + 1])
                .ok_or_else(|| corrupt(segment, "unknown pin direction"))?,
        })
    }
}

/// Snapshot of a whole pin table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinTable {
    /// Table header
    pub header: TableHeader,
    /// Slots in creation order
    pub slots: Vec<SlotMeta>,
}

impl PinTable {
    /// Decode from a copy of the first [`PIN_TABLE_SIZE`] bytes of the data section
    pub fn decode(segment: &str, bytes: &[u8]) -> ShmResult<Self> {
        let header = TableHeader::decode(segment, bytes)?;
        if bytes.len() < slot_offset(header.pin_count) {
            return Err(corrupt(segment, "pin table truncated"));
        }

        let slots = (0..header.pin_count)
            .map(|i| SlotMeta::decode(segment, &bytes[slot_offset(i)..]))
            .collect::<ShmResult<Vec<_>>>()?;

        Ok(Self { header, slots })
    }

    /// Slot index of a full pin name
    pub fn find(&self, full_name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == full_name)
    }
}

fn corrupt(segment: &str, reason: &'static str) -> ShmError {
    ShmError::Corrupt {
        name: segment.to_string(),
        reason,
    }
}

fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn get_u32(buf: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

/// Names are validated by the caller; longer input is cut to keep the NUL
fn put_name(field: &mut [u8], name: &str) {
    let len = name.len().min(field.len() - 1);
    field[..len].copy_from_slice(&name.as_bytes()[..len]);
    field[len..].fill(0);
}

fn get_name(segment: &str, field: &[u8]) -> ShmResult<String> {
    let end = field
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| corrupt(segment, "name field not terminated"))?;
    std::str::from_utf8(&field[..end])
        .map(str::to_string)
        .map_err(|_| corrupt(segment, "name field not UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> TableHeader {
        TableHeader {
            component: "hal-example".to_string(),
            prefix: "hal-example".to_string(),
            pin_count: 2,
            ready: true,
            owner_pid: 4242,
        }
    }

    #[test]
    fn value_cells_are_word_aligned() {
        for i in 0..MAX_PINS_PER_COMPONENT {
            assert_eq!(value_offset(i) % 4, 0);
            assert!(value_offset(i) + 4 <= PIN_TABLE_SIZE);
        }
    }

    #[test]
    fn table_decodes_what_the_owner_wrote() {
        let mut data = vec![0u8; PIN_TABLE_SIZE];
        data[..TABLE_HEADER_SIZE].copy_from_slice(&sample_header().encode());

        let slots = [
            SlotMeta {
                name: "hal-example.increment".to_string(),
                pin_type: PinType::Bit,
                direction: PinDirection::In,
            },
            SlotMeta {
                name: "hal-example.count".to_string(),
                pin_type: PinType::S32,
                direction: PinDirection::Out,
            },
        ];
        for (i, slot) in slots.iter().enumerate() {
            data[slot_offset(i)..slot_offset(i) + SLOT_META_LEN].copy_from_slice(&slot.encode());
        }

        let table = PinTable::decode("comp_hal-example", &data).unwrap();
        assert_eq!(table.header, sample_header());
        assert_eq!(table.slots, slots);
        assert_eq!(table.find("hal-example.count"), Some(1));
        assert_eq!(table.find("hal-example.button"), None);
    }

    #[test]
    fn zeroed_memory_is_rejected() {
        let data = vec![0u8; PIN_TABLE_SIZE];
        assert!(matches!(
            PinTable::decode("seg", &data),
            Err(ShmError::Corrupt { reason: "bad pin table magic", .. })
        ));
    }

    #[test]
    fn bad_slot_tags_are_rejected() {
        let mut data = vec![0u8; PIN_TABLE_SIZE];
        let mut header = sample_header();
        header.pin_count = 1;
        data[..TABLE_HEADER_SIZE].copy_from_slice(&header.encode());
        data[slot_offset(0)] = b'x';
        data[slot_offset(0) + NAME_FIELD_LEN] = 9;
        data[slot_offset(0) + NAME_FIELD_LEN + 1] = PinDirection::In as u8;

        assert!(matches!(
            PinTable::decode("seg", &data),
            Err(ShmError::Corrupt { reason: "unknown pin type", .. })
        ));
    }

    #[test]
    fn pin_count_is_bounded() {
        let mut header = sample_header();
        header.pin_count = MAX_PINS_PER_COMPONENT + 1;
        let bytes = header.encode();
        assert!(TableHeader::decode("seg", &bytes).is_err());
    }
}

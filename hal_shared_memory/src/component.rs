//! Components on the shared memory bus.
//!
//! [`ShmComponent`] is the owner's handle: it creates the component segment,
//! writes the pin table and implements [`PinBus`]. [`ShmPeer`] is the view
//! another process gets by attaching to that segment (used by `halcmd`).

use crate::consts::SHM_MIN_SIZE;
use crate::discovery::SegmentDiscovery;
use crate::error::{ShmError, ShmResult};
use crate::pin_table::{
    PIN_TABLE_SIZE, PinTable, SlotMeta, TableHeader, slot_offset, value_offset,
};
use crate::reader::SegmentReader;
use crate::writer::SegmentWriter;
use hal::bus::{BusError, PinBus, check_owner_write, check_peer_write};
use hal::consts::MAX_PINS_PER_COMPONENT;
use hal::pin::{PinDirection, PinInfo, PinType, PinValue, full_pin_name, validate_name};
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use tracing::{debug, info};

/// Segment name prefix of component segments
pub const COMPONENT_SEGMENT_PREFIX: &str = "comp_";

/// Segment name holding the pin table of `component`
pub fn component_segment_name(component: &str) -> String {
    format!("{COMPONENT_SEGMENT_PREFIX}{component}")
}

/// Owner-side handle of a component living in shared memory
#[derive(Debug)]
pub struct ShmComponent {
    writer: SegmentWriter,
    header: TableHeader,
    slots: Vec<SlotMeta>,
    by_short_name: HashMap<String, usize>,
}

impl ShmComponent {
    /// Register a component: create its segment and an empty pin table.
    ///
    /// Fails if a live process already owns a component with this name.
    pub fn register(name: &str) -> Result<Self, BusError> {
        validate_name(name)?;

        let segment_name = component_segment_name(name);
        if let Some(existing) = SegmentDiscovery::new().find_live_segment(&segment_name)? {
            return Err(ShmError::AlreadyExists {
                name: format!("{} (owned by pid {})", name, existing.writer_pid),
            }
            .into());
        }

        let mut writer = SegmentWriter::create(&segment_name, SHM_MIN_SIZE)?;
        let header = TableHeader {
            component: name.to_string(),
            prefix: name.to_string(),
            pin_count: 0,
            ready: false,
            owner_pid: writer.writer_pid(),
        };
        writer.write_at(0, &header.encode())?;

        info!("Registered component '{}' in segment {}", name, segment_name);

        Ok(Self {
            writer,
            header,
            slots: Vec::new(),
            by_short_name: HashMap::new(),
        })
    }

    /// Factory used by the bus backend registry
    pub fn create(name: &str) -> Result<Box<dyn PinBus>, BusError> {
        Ok(Box::new(Self::register(name)?))
    }

    /// Name of the backing segment
    pub fn segment_name(&self) -> &str {
        self.writer.name()
    }

    fn write_header(&mut self) -> ShmResult<()> {
        self.writer.write_at(0, &self.header.encode())
    }

    fn slot(&self, name: &str) -> Result<(usize, &SlotMeta), BusError> {
        let index = *self
            .by_short_name
            .get(name)
            .ok_or_else(|| BusError::PinNotFound(name.to_string()))?;
        Ok((index, &self.slots[index]))
    }
}

impl PinBus for ShmComponent {
    fn backend(&self) -> &'static str {
        "shm"
    }

    fn component_name(&self) -> &str {
        &self.header.component
    }

    fn prefix(&self) -> &str {
        &self.header.prefix
    }

    fn set_prefix(&mut self, prefix: &str) -> Result<(), BusError> {
        if self.header.ready {
            return Err(BusError::AlreadyReady(self.header.component.clone()));
        }
        if !self.slots.is_empty() {
            return Err(BusError::PrefixLocked(self.header.component.clone()));
        }
        validate_name(prefix)?;

        self.header.prefix = prefix.to_string();
        self.write_header()?;
        Ok(())
    }

    fn new_pin(
        &mut self,
        name: &str,
        pin_type: PinType,
        direction: PinDirection,
    ) -> Result<(), BusError> {
        if self.header.ready {
            return Err(BusError::AlreadyReady(self.header.component.clone()));
        }
        let full_name = full_pin_name(&self.header.prefix, name)?;
        if self.by_short_name.contains_key(name) {
            return Err(BusError::DuplicatePin(full_name));
        }
        if self.slots.len() >= MAX_PINS_PER_COMPONENT {
            return Err(BusError::TableFull(self.header.component.clone()));
        }

        let index = self.slots.len();
        let slot = SlotMeta {
            name: full_name,
            pin_type,
            direction,
        };

        // Slot first, then the count that makes it visible
        self.writer.write_at(slot_offset(index), &slot.encode())?;
        self.writer
            .cell(value_offset(index))?
            .store(pin_type.zero().to_raw(), Ordering::Release);
        self.header.pin_count = index + 1;
        self.write_header()?;

        debug!("Created pin {} ({}, {})", slot.name, pin_type, direction);
        self.by_short_name.insert(name.to_string(), index);
        self.slots.push(slot);
        Ok(())
    }

    fn ready(&mut self) -> Result<(), BusError> {
        if self.header.ready {
            return Err(BusError::AlreadyReady(self.header.component.clone()));
        }
        self.header.ready = true;
        self.write_header()?;
        info!(
            "Component '{}' ready with {} pins",
            self.header.component,
            self.slots.len()
        );
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.header.ready
    }

    fn get(&self, name: &str) -> Result<PinValue, BusError> {
        let (index, slot) = self.slot(name)?;
        let raw = self.writer.cell(value_offset(index))?.load(Ordering::Acquire);
        Ok(PinValue::from_raw(slot.pin_type, raw))
    }

    fn set(&mut self, name: &str, value: PinValue) -> Result<(), BusError> {
        let (index, slot) = self.slot(name)?;
        check_owner_write(&slot.name, slot.pin_type, slot.direction, value)?;
        self.writer
            .cell(value_offset(index))?
            .store(value.to_raw(), Ordering::Release);
        Ok(())
    }

    fn pins(&self) -> Vec<PinInfo> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let raw = self.writer.cell(value_offset(index)).ok()?.load(Ordering::Acquire);
                Some(PinInfo {
                    name: slot.name.clone(),
                    pin_type: slot.pin_type,
                    direction: slot.direction,
                    value: PinValue::from_raw(slot.pin_type, raw),
                })
            })
            .collect()
    }
}

/// View of another process's component
pub struct ShmPeer {
    reader: SegmentReader,
    table: PinTable,
}

impl ShmPeer {
    /// Attach to the segment of `component` and read its pin table
    pub fn attach(component: &str) -> ShmResult<Self> {
        let mut reader = SegmentReader::attach(&component_segment_name(component))?;
        let table = Self::read_table(&mut reader)?;
        Ok(Self { reader, table })
    }

    /// Attach to every component with a live owner
    pub fn attach_all() -> ShmResult<Vec<Self>> {
        let mut peers = Vec::new();
        for info in SegmentDiscovery::new().list_with_prefix(COMPONENT_SEGMENT_PREFIX)? {
            if !info.writer_alive() {
                continue;
            }
            let component = &info.name[COMPONENT_SEGMENT_PREFIX.len()..];
            match Self::attach(component) {
                Ok(peer) => peers.push(peer),
                Err(e) => debug!("Skipping component {}: {}", component, e),
            }
        }
        peers.sort_by(|a, b| a.component().cmp(b.component()));
        Ok(peers)
    }

    fn read_table(reader: &mut SegmentReader) -> ShmResult<PinTable> {
        let name = reader.name().to_string();
        let bytes = reader.read_range(0, PIN_TABLE_SIZE)?;
        PinTable::decode(&name, bytes)
    }

    /// Re-read the pin table if the owner changed it
    pub fn refresh(&mut self) -> ShmResult<()> {
        if self.reader.has_changed() {
            self.table = Self::read_table(&mut self.reader)?;
        }
        Ok(())
    }

    /// Component name
    pub fn component(&self) -> &str {
        &self.table.header.component
    }

    /// Pin prefix
    pub fn prefix(&self) -> &str {
        &self.table.header.prefix
    }

    /// Owner has called `ready()`
    pub fn is_ready(&self) -> bool {
        self.table.header.ready
    }

    /// Owning process
    pub fn owner_pid(&self) -> u32 {
        self.table.header.owner_pid
    }

    /// Whether this component owns a pin with this full name
    pub fn has_pin(&self, full_name: &str) -> bool {
        self.table.find(full_name).is_some()
    }

    /// Snapshot of every pin
    pub fn pins(&self) -> Vec<PinInfo> {
        self.table
            .slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                Some(PinInfo {
                    name: slot.name.clone(),
                    pin_type: slot.pin_type,
                    direction: slot.direction,
                    value: self.load(index, slot.pin_type).ok()?,
                })
            })
            .collect()
    }

    /// Read a pin by full name
    pub fn get(&self, full_name: &str) -> Result<PinValue, BusError> {
        let index = self.index(full_name)?;
        Ok(self.load(index, self.table.slots[index].pin_type)?)
    }

    /// Write an input pin by full name
    pub fn set(&self, full_name: &str, value: PinValue) -> Result<(), BusError> {
        if !self.is_ready() {
            return Err(BusError::NotReady(self.component().to_string()));
        }
        let index = self.index(full_name)?;
        let slot = &self.table.slots[index];
        check_peer_write(&slot.name, slot.pin_type, slot.direction, value)?;
        self.reader
            .cell(value_offset(index))?
            .store(value.to_raw(), Ordering::Release);
        Ok(())
    }

    /// Type of a pin by full name
    pub fn pin_type(&self, full_name: &str) -> Result<PinType, BusError> {
        let index = self.index(full_name)?;
        Ok(self.table.slots[index].pin_type)
    }

    fn index(&self, full_name: &str) -> Result<usize, BusError> {
        self.table
            .find(full_name)
            .ok_or_else(|| BusError::PinNotFound(full_name.to_string()))
    }

    fn load(&self, index: usize, pin_type: PinType) -> ShmResult<PinValue> {
        let raw = self.reader.cell(value_offset(index))?.load(Ordering::Acquire);
        Ok(PinValue::from_raw(pin_type, raw))
    }
}

impl std::fmt::Debug for ShmPeer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShmPeer")
            .field("component", &self.table.header.component)
            .field("owner_pid", &self.table.header.owner_pid)
            .field("pins", &self.table.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin_table::TABLE_HEADER_SIZE;

    #[test]
    fn segment_names_are_prefixed() {
        assert_eq!(component_segment_name("hal-example"), "comp_hal-example");
        assert!(TABLE_HEADER_SIZE < PIN_TABLE_SIZE);
    }
}

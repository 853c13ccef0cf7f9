//! # HAL Shared Memory Pin Registry
//!
//! Single-writer, multi-reader shared memory segments under `/dev/shm`, and
//! the pin registry built on top of them: every component owns one segment
//! holding its pin table.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────────┐    ┌─────────────────┐
//! │ ShmComponent    │    │ hal_comp_<name>_<pid>│    │ ShmPeer         │
//! │ (owner process) ├───►│ [Header|Pin table]   │◄───┤ (halcmd, ...)   │
//! │ SegmentWriter   │    │ Version counter      │    │ SegmentReader   │
//! └─────────────────┘    │ Atomic value cells   │    └─────────────────┘
//!                        └──────────────────────┘
//! ```
//!
//! - Segment header and pin table structure are versioned with a seqlock
//!   ([`VersionCounter`]): the counter is odd while the owner writes.
//! - Pin values are 32-bit atomic cells. The owner writes `out` pins, peers
//!   write `in` pins; neither side can tear a value.
//! - [`SegmentDiscovery`] lists segments and removes those whose writer died.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hal::prelude::*;
//! use hal_shared_memory::{ShmComponent, ShmPeer};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut comp = ShmComponent::register("demo")?;
//! comp.new_pin("in", PinType::Bit, PinDirection::In)?;
//! comp.ready()?;
//!
//! let peer = ShmPeer::attach("demo")?;
//! peer.set("demo.in", PinValue::Bit(true))?;
//! assert_eq!(comp.get_bit("in")?, true);
//! # Ok(())
//! # }
//! ```
//!
//! ## Thread Safety
//!
//! - **SegmentWriter** / **ShmComponent**: single owner, `Send` but not shared
//! - **SegmentReader** / **ShmPeer**: one per attaching thread
//! - **SegmentDiscovery**: stateless, safe to use anywhere

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod component;
pub mod consts;
pub mod discovery;
pub mod error;
pub mod pin_table;
pub mod platform;
pub mod reader;
pub mod segment;
pub mod version;
pub mod writer;

pub use component::{COMPONENT_SEGMENT_PREFIX, ShmComponent, ShmPeer, component_segment_name};
pub use consts::{SHM_MAX_SIZE, SHM_MIN_SIZE};
pub use discovery::{SegmentDiscovery, SegmentInfo};
pub use error::{ShmError, ShmResult};
pub use pin_table::PinTable;
pub use reader::SegmentReader;
pub use segment::{SegmentHeader, SharedMemorySegment};
pub use version::VersionCounter;
pub use writer::SegmentWriter;


//! Pin registry tests on real /dev/shm segments

use hal::prelude::*;
use hal_shared_memory::platform::{get_current_pid, segment_path};
use hal_shared_memory::{SegmentDiscovery, ShmComponent, ShmError, ShmPeer, component_segment_name};

/// Component names are made unique per process so parallel test runs do not collide
fn unique(name: &str) -> String {
    format!("t{}-{}", std::process::id(), name)
}

fn example_component(name: &str) -> Result<ShmComponent, BusError> {
    let mut comp = ShmComponent::register(name)?;
    comp.new_pin(PIN_INCREMENT, PinType::Bit, PinDirection::In)?;
    comp.new_pin(PIN_COUNT, PinType::S32, PinDirection::Out)?;
    comp.new_pin(PIN_BUTTON, PinType::Bit, PinDirection::Out)?;
    Ok(comp)
}

#[test]
fn test_register_and_create_pins() -> Result<(), BusError> {
    let name = unique("register");
    let mut comp = example_component(&name)?;
    assert!(!comp.is_ready());
    comp.ready()?;
    assert!(comp.is_ready());

    let pins = comp.pins();
    assert_eq!(pins.len(), 3);
    assert_eq!(pins[0].name, format!("{name}.increment"));
    assert_eq!(pins[1].value, PinValue::S32(0));
    assert_eq!(pins[2].direction, PinDirection::Out);
    Ok(())
}

#[test]
fn test_duplicate_registration_is_rejected() -> Result<(), BusError> {
    let name = unique("dup-comp");
    let _first = ShmComponent::register(&name)?;
    assert!(ShmComponent::register(&name).is_err());
    Ok(())
}

#[test]
fn test_table_is_frozen_after_ready() -> Result<(), BusError> {
    let name = unique("frozen");
    let mut comp = example_component(&name)?;
    comp.ready()?;

    assert!(matches!(
        comp.new_pin("late", PinType::Bit, PinDirection::In),
        Err(BusError::AlreadyReady(_))
    ));
    assert!(matches!(comp.ready(), Err(BusError::AlreadyReady(_))));
    Ok(())
}

#[test]
fn test_duplicate_pin_and_prefix_lock() -> Result<(), BusError> {
    let name = unique("pins");
    let mut comp = ShmComponent::register(&name)?;
    comp.set_prefix("demo")?;
    comp.new_pin("a", PinType::Bit, PinDirection::In)?;

    assert!(matches!(
        comp.new_pin("a", PinType::S32, PinDirection::Out),
        Err(BusError::DuplicatePin(_))
    ));
    assert!(matches!(comp.set_prefix("other"), Err(BusError::PrefixLocked(_))));
    assert_eq!(comp.pins()[0].name, "demo.a");
    Ok(())
}

#[test]
fn test_table_full() -> Result<(), BusError> {
    let name = unique("full");
    let mut comp = ShmComponent::register(&name)?;
    for i in 0..hal::consts::MAX_PINS_PER_COMPONENT {
        comp.new_pin(&format!("p{i}"), PinType::S32, PinDirection::Out)?;
    }
    assert!(matches!(
        comp.new_pin("overflow", PinType::S32, PinDirection::Out),
        Err(BusError::TableFull(_))
    ));
    Ok(())
}

#[test]
fn test_owner_access_rules() -> Result<(), BusError> {
    let name = unique("owner");
    let mut comp = example_component(&name)?;
    comp.ready()?;

    comp.set(PIN_COUNT, PinValue::S32(42))?;
    comp.set(PIN_BUTTON, PinValue::Bit(true))?;
    assert_eq!(comp.get_s32(PIN_COUNT)?, 42);
    assert!(comp.get_bit(PIN_BUTTON)?);

    assert!(matches!(
        comp.set(PIN_INCREMENT, PinValue::Bit(true)),
        Err(BusError::NotWritable { .. })
    ));
    assert!(matches!(
        comp.set(PIN_COUNT, PinValue::Bit(true)),
        Err(BusError::TypeMismatch { .. })
    ));
    assert!(matches!(comp.get("missing"), Err(BusError::PinNotFound(_))));
    Ok(())
}

#[test]
fn test_peer_sees_owner_pins() -> Result<(), Box<dyn std::error::Error>> {
    let name = unique("peer-view");
    let mut comp = example_component(&name)?;
    comp.ready()?;
    comp.set(PIN_COUNT, PinValue::S32(-7))?;

    let peer = ShmPeer::attach(&name)?;
    assert_eq!(peer.component(), name);
    assert_eq!(peer.owner_pid(), std::process::id());
    assert!(peer.is_ready());
    assert_eq!(peer.pins().len(), 3);
    assert_eq!(peer.get(&format!("{name}.count"))?, PinValue::S32(-7));
    Ok(())
}

#[test]
fn test_peer_drives_input_pin() -> Result<(), Box<dyn std::error::Error>> {
    let name = unique("peer-drive");
    let mut comp = example_component(&name)?;
    comp.ready()?;

    let peer = ShmPeer::attach(&name)?;
    peer.set(&format!("{name}.increment"), PinValue::Bit(true))?;
    assert!(comp.get_bit(PIN_INCREMENT)?);

    // Outputs belong to the owner
    assert!(matches!(
        peer.set(&format!("{name}.count"), PinValue::S32(3)),
        Err(BusError::NotWritable { .. })
    ));
    assert_eq!(comp.get_s32(PIN_COUNT)?, 0);
    Ok(())
}

#[test]
fn test_peer_refresh_tracks_readiness() -> Result<(), Box<dyn std::error::Error>> {
    let name = unique("refresh");
    let mut comp = example_component(&name)?;

    let mut peer = ShmPeer::attach(&name)?;
    assert!(!peer.is_ready());
    assert!(matches!(
        peer.set(&format!("{name}.increment"), PinValue::Bit(true)),
        Err(BusError::NotReady(_))
    ));

    comp.ready()?;
    peer.refresh()?;
    assert!(peer.is_ready());
    Ok(())
}

#[test]
fn test_segment_removed_on_drop() -> Result<(), Box<dyn std::error::Error>> {
    let name = unique("dropped");
    {
        let mut comp = example_component(&name)?;
        comp.ready()?;
        assert!(
            SegmentDiscovery::new()
                .find_segment(&component_segment_name(&name))?
                .is_some()
        );
    }

    assert!(matches!(
        ShmPeer::attach(&name),
        Err(ShmError::NotFound { .. })
    ));
    Ok(())
}

#[test]
fn test_stale_segment_of_dead_owner() -> Result<(), Box<dyn std::error::Error>> {
    let name = unique("stale");
    let segment = component_segment_name(&name);
    // Above any pid_max, so never a running process
    let dead_pid = i32::MAX as u32;
    let stale_path = segment_path(&segment, dead_pid);

    {
        let mut comp = example_component(&name)?;
        comp.ready()?;
        std::fs::copy(segment_path(&segment, get_current_pid()), &stale_path)?;
    }
    assert!(stale_path.exists());

    // The leftover does not block a new owner; the copy is ready, the new table is not
    let _comp = example_component(&name)?;

    let peer = ShmPeer::attach(&name)?;
    assert_eq!(peer.owner_pid(), get_current_pid());
    assert!(!peer.is_ready());
    drop(peer);

    SegmentDiscovery::new().cleanup_orphaned_segments()?;
    assert!(!stale_path.exists());
    assert!(
        SegmentDiscovery::new()
            .find_live_segment(&segment)?
            .is_some()
    );
    Ok(())
}

#[test]
fn test_invalid_component_name() {
    assert!(matches!(
        ShmComponent::register("has space"),
        Err(BusError::InvalidName { .. })
    ));
}

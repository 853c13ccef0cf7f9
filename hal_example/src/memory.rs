//! In-process pin bus.
//!
//! `MemoryBus` keeps the pin table in the process. It backs `--simulate`
//! runs and tests; a [`MemoryProbe`] plays the part of another process
//! (it reads every pin and may only write inputs).

use hal_common::bus::{BusError, PinBus, check_owner_write, check_peer_write};
use hal_common::consts::{MAX_PINS_PER_COMPONENT, PIN_INCREMENT};
use hal_common::pin::{PinDirection, PinInfo, PinType, PinValue, full_pin_name, validate_name};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug)]
struct MemoryPin {
    short_name: String,
    info: PinInfo,
}

#[derive(Debug)]
struct MemoryState {
    component: String,
    prefix: String,
    ready: bool,
    pins: Vec<MemoryPin>,
}

impl MemoryState {
    fn by_short(&self, name: &str) -> Result<&MemoryPin, BusError> {
        self.pins
            .iter()
            .find(|p| p.short_name == name)
            .ok_or_else(|| BusError::PinNotFound(name.to_string()))
    }

    fn by_short_mut(&mut self, name: &str) -> Result<&mut MemoryPin, BusError> {
        self.pins
            .iter_mut()
            .find(|p| p.short_name == name)
            .ok_or_else(|| BusError::PinNotFound(name.to_string()))
    }
}

/// Component registered on the in-process bus.
#[derive(Debug)]
pub struct MemoryBus {
    state: Arc<Mutex<MemoryState>>,
    // Cached for the `&str` accessors of `PinBus`
    component: String,
    prefix: String,
}

impl MemoryBus {
    /// Register a component.
    pub fn register(name: &str) -> Result<Self, BusError> {
        validate_name(name)?;
        info!("Registered component '{}' on the in-process bus", name);
        Ok(Self {
            state: Arc::new(Mutex::new(MemoryState {
                component: name.to_string(),
                prefix: name.to_string(),
                ready: false,
                pins: Vec::new(),
            })),
            component: name.to_string(),
            prefix: name.to_string(),
        })
    }

    /// Factory used by the bus backend registry.
    pub fn create(name: &str) -> Result<Box<dyn PinBus>, BusError> {
        Ok(Box::new(Self::register(name)?))
    }

    /// Handle acting as another process on this component.
    pub fn probe(&self) -> MemoryProbe {
        MemoryProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl PinBus for MemoryBus {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn component_name(&self) -> &str {
        &self.component
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn set_prefix(&mut self, prefix: &str) -> Result<(), BusError> {
        let mut state = self.state.lock();
        if state.ready {
            return Err(BusError::AlreadyReady(state.component.clone()));
        }
        if !state.pins.is_empty() {
            return Err(BusError::PrefixLocked(state.component.clone()));
        }
        validate_name(prefix)?;
        state.prefix = prefix.to_string();
        self.prefix = prefix.to_string();
        Ok(())
    }

    fn new_pin(
        &mut self,
        name: &str,
        pin_type: PinType,
        direction: PinDirection,
    ) -> Result<(), BusError> {
        let mut state = self.state.lock();
        if state.ready {
            return Err(BusError::AlreadyReady(state.component.clone()));
        }
        let full_name = full_pin_name(&state.prefix, name)?;
        if state.pins.iter().any(|p| p.short_name == name) {
            return Err(BusError::DuplicatePin(full_name));
        }
        if state.pins.len() >= MAX_PINS_PER_COMPONENT {
            return Err(BusError::TableFull(state.component.clone()));
        }

        debug!("Created pin {} ({}, {})", full_name, pin_type, direction);
        state.pins.push(MemoryPin {
            short_name: name.to_string(),
            info: PinInfo {
                name: full_name,
                pin_type,
                direction,
                value: pin_type.zero(),
            },
        });
        Ok(())
    }

    fn ready(&mut self) -> Result<(), BusError> {
        let mut state = self.state.lock();
        if state.ready {
            return Err(BusError::AlreadyReady(state.component.clone()));
        }
        state.ready = true;
        info!(
            "Component '{}' ready with {} pins",
            state.component,
            state.pins.len()
        );
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.state.lock().ready
    }

    fn get(&self, name: &str) -> Result<PinValue, BusError> {
        Ok(self.state.lock().by_short(name)?.info.value)
    }

    fn set(&mut self, name: &str, value: PinValue) -> Result<(), BusError> {
        let mut state = self.state.lock();
        let pin = state.by_short_mut(name)?;
        check_owner_write(&pin.info.name, pin.info.pin_type, pin.info.direction, value)?;
        pin.info.value = value;
        Ok(())
    }

    fn pins(&self) -> Vec<PinInfo> {
        self.state.lock().pins.iter().map(|p| p.info.clone()).collect()
    }
}

/// Foreign-process view of a [`MemoryBus`] component.
#[derive(Debug, Clone)]
pub struct MemoryProbe {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryProbe {
    /// Read a pin by full name.
    pub fn get(&self, full_name: &str) -> Result<PinValue, BusError> {
        let state = self.state.lock();
        state
            .pins
            .iter()
            .find(|p| p.info.name == full_name)
            .map(|p| p.info.value)
            .ok_or_else(|| BusError::PinNotFound(full_name.to_string()))
    }

    /// Write an input pin by full name.
    pub fn set(&self, full_name: &str, value: PinValue) -> Result<(), BusError> {
        let mut state = self.state.lock();
        if !state.ready {
            return Err(BusError::NotReady(state.component.clone()));
        }
        let pin = state
            .pins
            .iter_mut()
            .find(|p| p.info.name == full_name)
            .ok_or_else(|| BusError::PinNotFound(full_name.to_string()))?;
        check_peer_write(&pin.info.name, pin.info.pin_type, pin.info.direction, value)?;
        pin.info.value = value;
        Ok(())
    }

    /// Full name of a pin of this component.
    pub fn full_name(&self, short_name: &str) -> Result<String, BusError> {
        Ok(self.state.lock().by_short(short_name)?.info.name.clone())
    }
}

/// External input applied before every synchronizer pass.
pub trait Stimulus: Send {
    /// Advance by one tick.
    fn step(&mut self) -> Result<(), BusError>;
}

/// Square wave on `increment`: `half_period` ticks low, then as many high.
#[derive(Debug)]
pub struct SquareWave {
    probe: MemoryProbe,
    pin: String,
    half_period: u32,
    ticks: u32,
    level: bool,
}

impl SquareWave {
    /// Drive the `increment` pin of the probed component.
    pub fn new(probe: MemoryProbe, half_period: u32) -> Result<Self, BusError> {
        let pin = probe.full_name(PIN_INCREMENT)?;
        Ok(Self {
            probe,
            pin,
            half_period: half_period.max(1),
            ticks: 0,
            level: false,
        })
    }
}

impl Stimulus for SquareWave {
    fn step(&mut self) -> Result<(), BusError> {
        self.ticks += 1;
        if self.ticks >= self.half_period {
            self.ticks = 0;
            self.level = !self.level;
            self.probe.set(&self.pin, PinValue::Bit(self.level))?;
        }
        Ok(())
    }
}

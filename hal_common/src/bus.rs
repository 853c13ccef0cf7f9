//! Pin bus trait and error types.
//!
//! This module defines:
//! - `PinBus` trait - Interface of a pin registry backend, seen from the component that owns the pins
//! - `BusError` enum - Error types for pin registry operations
//! - `BusFactory` type alias - Factory function that registers a component
//! - Access checks shared by every backend

use crate::pin::{PinDirection, PinInfo, PinType, PinValue};
use thiserror::Error;

/// Error types for pin registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// Component, prefix or pin name breaks the naming rules
    #[error("Invalid name '{name}': {reason}")]
    InvalidName {
        /// Offending name
        name: String,
        /// Rule that was broken
        reason: &'static str,
    },

    /// A pin with this name already exists in the component
    #[error("Duplicate pin: {0}")]
    DuplicatePin(String),

    /// No pin with this name in the component
    #[error("Pin not found: {0}")]
    PinNotFound(String),

    /// Component no longer accepts structural changes
    #[error("Component '{0}' is already ready; pins can no longer be added")]
    AlreadyReady(String),

    /// Component has not been marked ready yet
    #[error("Component '{0}' is not ready")]
    NotReady(String),

    /// Prefix changed after pins were created
    #[error("Prefix of component '{0}' cannot change once pins exist")]
    PrefixLocked(String),

    /// Value type does not match the pin type
    #[error("Type mismatch on pin {pin}: pin is {expected}, value is {actual}")]
    TypeMismatch {
        /// Pin name
        pin: String,
        /// Pin type
        expected: PinType,
        /// Type of the rejected value
        actual: PinType,
    },

    /// Pin direction forbids writing from this side
    #[error("Pin {pin} is {direction} and cannot be written from here")]
    NotWritable {
        /// Pin name
        pin: String,
        /// Pin direction
        direction: PinDirection,
    },

    /// Text could not be parsed as a pin value
    #[error("Invalid {expected} value: '{value}'")]
    InvalidValue {
        /// Text that was rejected
        value: String,
        /// Expected pin type
        expected: PinType,
    },

    /// Component pin table is full
    #[error("Component '{0}' has no free pin slots")]
    TableFull(String),

    /// No backend registered under this name
    #[error("Bus backend not found: {0}")]
    BackendNotFound(String),

    /// Shared memory error
    #[error("Shared memory error: {0}")]
    Shm(String),
}

/// Factory function registering a component on a backend.
pub type BusFactory = fn(component: &str) -> Result<Box<dyn PinBus>, BusError>;

/// A component's handle on the pin registry.
///
/// Every backend (shared memory, in-process) implements this trait. Pin
/// names passed to `new_pin`, `get` and `set` are short names; the backend
/// prepends the component prefix.
///
/// # Lifecycle
///
/// 1. Backend factory registers the component
/// 2. `set_prefix()` (optional) and `new_pin()` declare the pin table
/// 3. `ready()` publishes the component; the table is frozen from here on
/// 4. `get()` / `set()` while the process runs
/// 5. Dropping the handle unregisters the component
pub trait PinBus: Send {
    /// Backend identifier (e.g. "shm", "memory").
    fn backend(&self) -> &'static str;

    /// Registered component name.
    fn component_name(&self) -> &str;

    /// Prefix prepended to pin names.
    fn prefix(&self) -> &str;

    /// Change the pin prefix. Only allowed before the first pin is created.
    fn set_prefix(&mut self, prefix: &str) -> Result<(), BusError>;

    /// Declare a new pin. Fails once the component is ready.
    fn new_pin(
        &mut self,
        name: &str,
        pin_type: PinType,
        direction: PinDirection,
    ) -> Result<(), BusError>;

    /// Mark the component ready, making its pins visible to other processes.
    fn ready(&mut self) -> Result<(), BusError>;

    /// Whether `ready()` has been called.
    fn is_ready(&self) -> bool;

    /// Read a pin.
    fn get(&self, name: &str) -> Result<PinValue, BusError>;

    /// Write an output pin.
    fn set(&mut self, name: &str, value: PinValue) -> Result<(), BusError>;

    /// Snapshot of every pin in creation order.
    fn pins(&self) -> Vec<PinInfo>;

    /// Read a `bit` pin.
    fn get_bit(&self, name: &str) -> Result<bool, BusError> {
        let value = self.get(name)?;
        value.as_bit().ok_or_else(|| BusError::TypeMismatch {
            pin: name.to_string(),
            expected: value.pin_type(),
            actual: PinType::Bit,
        })
    }

    /// Read an `s32` pin.
    fn get_s32(&self, name: &str) -> Result<i32, BusError> {
        let value = self.get(name)?;
        value.as_s32().ok_or_else(|| BusError::TypeMismatch {
            pin: name.to_string(),
            expected: value.pin_type(),
            actual: PinType::S32,
        })
    }
}

/// Check a write issued by the component that owns the pin.
pub fn check_owner_write(
    pin: &str,
    pin_type: PinType,
    direction: PinDirection,
    value: PinValue,
) -> Result<(), BusError> {
    if direction != PinDirection::Out {
        return Err(BusError::NotWritable {
            pin: pin.to_string(),
            direction,
        });
    }
    check_type(pin, pin_type, value)
}

/// Check a write issued by another process (e.g. `halcmd setp`).
pub fn check_peer_write(
    pin: &str,
    pin_type: PinType,
    direction: PinDirection,
    value: PinValue,
) -> Result<(), BusError> {
    if direction != PinDirection::In {
        return Err(BusError::NotWritable {
            pin: pin.to_string(),
            direction,
        });
    }
    check_type(pin, pin_type, value)
}

fn check_type(pin: &str, pin_type: PinType, value: PinValue) -> Result<(), BusError> {
    if value.pin_type() != pin_type {
        return Err(BusError::TypeMismatch {
            pin: pin.to_string(),
            expected: pin_type,
            actual: value.pin_type(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_error_display() {
        let err = BusError::AlreadyReady("hal-example".to_string());
        assert!(err.to_string().contains("hal-example"));

        let err = BusError::BackendNotFound("canbus".to_string());
        assert!(err.to_string().contains("canbus"));
    }

    #[test]
    fn owner_may_only_write_outputs() {
        assert!(check_owner_write("count", PinType::S32, PinDirection::Out, PinValue::S32(1)).is_ok());
        assert!(matches!(
            check_owner_write("increment", PinType::Bit, PinDirection::In, PinValue::Bit(true)),
            Err(BusError::NotWritable { .. })
        ));
    }

    #[test]
    fn peer_may_only_write_inputs() {
        assert!(check_peer_write("increment", PinType::Bit, PinDirection::In, PinValue::Bit(true)).is_ok());
        assert!(matches!(
            check_peer_write("count", PinType::S32, PinDirection::Out, PinValue::S32(3)),
            Err(BusError::NotWritable { .. })
        ));
    }

    #[test]
    fn type_is_checked_after_direction() {
        let err = check_owner_write("count", PinType::S32, PinDirection::Out, PinValue::Bit(true))
            .unwrap_err();
        assert_eq!(
            err,
            BusError::TypeMismatch {
                pin: "count".to_string(),
                expected: PinType::S32,
                actual: PinType::Bit,
            }
        );
    }
}

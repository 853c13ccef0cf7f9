//! Limits and defaults for the hal-example workspace.
//!
//! Single source of truth for name lengths, table sizes and the example's
//! pin names. Imported by all crates.

/// Maximum length in bytes of a component name or a full pin name.
pub const HAL_NAME_LEN: usize = 47;

/// Maximum number of pins a single component may own.
pub const MAX_PINS_PER_COMPONENT: usize = 32;

/// Default component name (also the default pin prefix).
pub const DEFAULT_COMPONENT_NAME: &str = "hal-example";

/// Default synchronizer period in milliseconds.
pub const DEFAULT_TICK_MS: u64 = 100;

/// Upper bound accepted for the synchronizer period.
pub const MAX_TICK_MS: u64 = 10_000;

/// Default bus backend.
pub const DEFAULT_BACKEND: &str = "shm";

/// Names of the bus backends built into the workspace.
pub const KNOWN_BACKENDS: &[&str] = &["shm", "memory"];

/// Bit input: a rising edge increments `count`.
pub const PIN_INCREMENT: &str = "increment";

/// S32 output: number of rising edges seen on `increment`.
pub const PIN_COUNT: &str = "count";

/// Bit output: mirrors the toggle button.
pub const PIN_BUTTON: &str = "button";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_consistent() {
        assert!(DEFAULT_COMPONENT_NAME.len() <= HAL_NAME_LEN);
        assert!(DEFAULT_TICK_MS > 0 && DEFAULT_TICK_MS <= MAX_TICK_MS);
        assert!(MAX_PINS_PER_COMPONENT >= 3);
        assert!(KNOWN_BACKENDS.contains(&DEFAULT_BACKEND));
    }

    #[test]
    fn full_pin_names_fit() {
        for pin in [PIN_INCREMENT, PIN_COUNT, PIN_BUTTON] {
            assert!(DEFAULT_COMPONENT_NAME.len() + 1 + pin.len() <= HAL_NAME_LEN);
        }
    }
}

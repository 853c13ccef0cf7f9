//! Display surface: the window the synchronizer reports to.
//!
//! The surface has a toggle button and two labels. Label texts are built
//! by [`state_label`] and [`count_label`]; how they reach the user is up to
//! the [`DisplaySurface`] implementation.

use std::io::{self, Write};

/// Window title shown once when the console surface starts.
pub const WINDOW_TITLE: &str = "HAL is awesome";

/// Text of the input state label.
pub fn state_label(active: bool) -> &'static str {
    if active { "TRUE" } else { "FALSE" }
}

/// Text of the counter label (value right-aligned to four columns).
pub fn count_label(count: i32) -> String {
    format!("Count: {count:4}")
}

/// Something that can show the example's labels and button.
pub trait DisplaySurface {
    /// Replace the input state label.
    fn set_state_label(&mut self, text: &str);

    /// Replace the counter label.
    fn set_count_label(&mut self, text: &str);

    /// Reflect the toggle button state.
    fn set_button(&mut self, active: bool);

    /// Push pending changes to the user.
    fn present(&mut self) -> io::Result<()>;
}

/// Terminal rendition of the window: one line per visible change.
pub struct ConsoleDisplay<W: Write> {
    out: W,
    state: String,
    count: String,
    button: bool,
    dirty: bool,
    title_shown: bool,
}

impl ConsoleDisplay<io::Stdout> {
    /// Console display on standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleDisplay<W> {
    /// Console display writing to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            state: String::new(),
            count: String::new(),
            button: false,
            dirty: false,
            title_shown: false,
        }
    }

    /// Consume the display and return the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn update(field: &mut String, text: &str, dirty: &mut bool) {
        if field != text {
            field.clear();
            field.push_str(text);
            *dirty = true;
        }
    }
}

impl<W: Write> DisplaySurface for ConsoleDisplay<W> {
    fn set_state_label(&mut self, text: &str) {
        Self::update(&mut self.state, text, &mut self.dirty);
    }

    fn set_count_label(&mut self, text: &str) {
        Self::update(&mut self.count, text, &mut self.dirty);
    }

    fn set_button(&mut self, active: bool) {
        if self.button != active {
            self.button = active;
            self.dirty = true;
        }
    }

    fn present(&mut self) -> io::Result<()> {
        if !self.title_shown {
            writeln!(self.out, "== {WINDOW_TITLE} ==  (t: toggle button, q: quit)")?;
            self.title_shown = true;
        }
        if !self.dirty {
            return Ok(());
        }
        let button = if self.button { "[Button: ON ]" } else { "[Button: OFF]" };
        writeln!(self.out, "{button}  {:<5}  {}", self.state, self.count)?;
        self.out.flush()?;
        self.dirty = false;
        Ok(())
    }
}

/// Display that keeps the last labels in memory.
///
/// Used for headless runs and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingDisplay {
    /// Input state label
    pub state: String,
    /// Counter label
    pub count: String,
    /// Button state
    pub button: bool,
    /// Number of `present()` calls
    pub frames: u64,
}

impl DisplaySurface for RecordingDisplay {
    fn set_state_label(&mut self, text: &str) {
        self.state = text.to_string();
    }

    fn set_count_label(&mut self, text: &str) {
        self.count = text.to_string();
    }

    fn set_button(&mut self, active: bool) {
        self.button = active;
    }

    fn present(&mut self) -> io::Result<()> {
        self.frames += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels() {
        assert_eq!(state_label(true), "TRUE");
        assert_eq!(state_label(false), "FALSE");
        assert_eq!(count_label(0), "Count:    0");
        assert_eq!(count_label(12345), "Count: 12345");
        assert_eq!(count_label(-3), "Count:   -3");
    }

    #[test]
    fn console_renders_only_changes() {
        let mut display = ConsoleDisplay::new(Vec::new());
        display.set_state_label("FALSE");
        display.set_count_label(&count_label(0));
        display.present().unwrap();

        // Same labels again: nothing new is written
        display.set_state_label("FALSE");
        display.set_count_label(&count_label(0));
        display.present().unwrap();

        display.set_button(true);
        display.present().unwrap();

        let text = String::from_utf8(display.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains(WINDOW_TITLE));
        assert_eq!(lines[1], "[Button: OFF]  FALSE  Count:    0");
        assert_eq!(lines[2], "[Button: ON ]  FALSE  Count:    0");
    }
}

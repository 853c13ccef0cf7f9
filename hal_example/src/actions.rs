//! User actions and the toggle button.

use crate::error::ExampleError;
use std::io::BufRead;
use std::sync::mpsc::Sender;
use tracing::{debug, warn};

/// Something the user did to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    /// Click the toggle button
    Toggle,
    /// Force the button to a state
    SetButton(bool),
    /// Close the window
    Quit,
}

impl UserAction {
    /// Parse one input line. Blank lines carry no action.
    pub fn parse(line: &str) -> Result<Option<Self>, ExampleError> {
        let word = line.trim().to_ascii_lowercase();
        let action = match word.as_str() {
            "" => return Ok(None),
            "t" | "toggle" | "b" | "button" => Self::Toggle,
            "on" | "1" | "true" => Self::SetButton(true),
            "off" | "0" | "false" => Self::SetButton(false),
            "q" | "quit" | "exit" => Self::Quit,
            _ => return Err(ExampleError::UnknownAction(word)),
        };
        Ok(Some(action))
    }
}

/// Toggle button state, initially released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToggleButton {
    active: bool,
}

impl ToggleButton {
    /// Current state.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Apply a button action and return the new state.
    ///
    /// `Quit` leaves the state untouched.
    pub fn apply(&mut self, action: UserAction) -> bool {
        match action {
            UserAction::Toggle => self.active = !self.active,
            UserAction::SetButton(active) => self.active = active,
            UserAction::Quit => {}
        }
        self.active
    }
}

/// Forward actions read from `input` until it ends or the receiver is gone.
///
/// End of input closes the window.
pub fn forward_actions<R: BufRead>(input: R, tx: &Sender<UserAction>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read input: {}", e);
                break;
            }
        };
        match UserAction::parse(&line) {
            Ok(Some(action)) => {
                debug!("User action: {:?}", action);
                if tx.send(action).is_err() || action == UserAction::Quit {
                    return;
                }
            }
            Ok(None) => {}
            Err(e) => warn!("{}", e),
        }
    }
    let _ = tx.send(UserAction::Quit);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn parse_actions() {
        assert_eq!(UserAction::parse("t").unwrap(), Some(UserAction::Toggle));
        assert_eq!(UserAction::parse(" Toggle \n").unwrap(), Some(UserAction::Toggle));
        assert_eq!(UserAction::parse("on").unwrap(), Some(UserAction::SetButton(true)));
        assert_eq!(UserAction::parse("OFF").unwrap(), Some(UserAction::SetButton(false)));
        assert_eq!(UserAction::parse("q").unwrap(), Some(UserAction::Quit));
        assert_eq!(UserAction::parse("   ").unwrap(), None);
        assert!(matches!(
            UserAction::parse("jump"),
            Err(ExampleError::UnknownAction(w)) if w == "jump"
        ));
    }

    #[test]
    fn button_follows_actions() {
        let mut button = ToggleButton::default();
        assert!(!button.is_active());
        assert!(button.apply(UserAction::Toggle));
        assert!(!button.apply(UserAction::Toggle));
        assert!(button.apply(UserAction::SetButton(true)));
        assert!(button.apply(UserAction::SetButton(true)));
        assert!(button.apply(UserAction::Quit));
    }

    #[test]
    fn end_of_input_closes_window() {
        let (tx, rx) = channel();
        forward_actions("t\nbogus\n\non\n".as_bytes(), &tx);
        let actions: Vec<UserAction> = rx.try_iter().collect();
        assert_eq!(
            actions,
            vec![UserAction::Toggle, UserAction::SetButton(true), UserAction::Quit]
        );
    }

    #[test]
    fn quit_stops_forwarding() {
        let (tx, rx) = channel();
        forward_actions("q\nt\n".as_bytes(), &tx);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![UserAction::Quit]);
    }
}

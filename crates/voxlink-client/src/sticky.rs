//! Sticky configuration: values the companion must hold for as long as the
//! game wants them, resent in full after every reconnect.

use voxlink_wire::{sanitize_line, Command, ConfigToggle};

/// What a producer asked for and what the companion was last sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StickySlot<T> {
    desired: Option<T>,
    last_sent: Option<T>,
}

impl<T> Default for StickySlot<T> {
    fn default() -> Self {
        Self {
            desired: None,
            last_sent: None,
        }
    }
}

impl<T: Clone + PartialEq> StickySlot<T> {
    pub fn set(&mut self, value: T) {
        self.desired = Some(value);
    }

    pub fn desired(&self) -> Option<&T> {
        self.desired.as_ref()
    }

    /// The desired value, if the companion does not have it yet.
    pub fn due(&self) -> Option<&T> {
        match &self.desired {
            Some(desired) if self.last_sent.as_ref() != Some(desired) => Some(desired),
            _ => None,
        }
    }

    /// Record a successful transmission of `value`.
    pub fn mark_sent(&mut self, value: T) {
        self.last_sent = Some(value);
    }

    /// Forget what was sent; a set slot becomes due again.
    pub fn reset(&mut self) {
        self.last_sent = None;
    }
}

/// The game language plus every [`ConfigToggle`].
#[derive(Debug, Clone, Default)]
pub struct StickyStore {
    language: StickySlot<String>,
    toggles: [StickySlot<bool>; ConfigToggle::COUNT],
}

impl StickyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the desired game language; returns whether the value was taken.
    ///
    /// Codes that are blank once made newline-safe are ignored, including
    /// whitespace-only ones such as `"\r\n"`: `LANG|  ` names no language.
    pub fn set_language(&mut self, code: &str) -> bool {
        let code = sanitize_line(code);
        if code.trim().is_empty() {
            return false;
        }
        self.language.set(code);
        true
    }

    pub fn set_toggle(&mut self, toggle: ConfigToggle, enabled: bool) {
        self.toggles[toggle.index()].set(enabled);
    }

    pub fn language(&self) -> Option<&str> {
        self.language.desired().map(String::as_str)
    }

    pub fn toggle(&self, toggle: ConfigToggle) -> Option<bool> {
        self.toggles[toggle.index()].desired().copied()
    }

    pub fn due_language(&self) -> Option<Command> {
        self.language.due().cloned().map(Command::Language)
    }

    /// Due toggles, in transmission order.
    pub fn due_toggles(&self) -> impl Iterator<Item = Command> + '_ {
        ConfigToggle::ALL.into_iter().filter_map(|toggle| {
            self.toggles[toggle.index()]
                .due()
                .map(|&enabled| Command::Config(toggle, enabled))
        })
    }

    /// Language first, then toggles.
    pub fn due_commands(&self) -> Vec<Command> {
        self.due_language().into_iter().chain(self.due_toggles()).collect()
    }

    /// Record that `command` reached the companion. Non-sticky commands
    /// are ignored.
    pub fn mark_sent(&mut self, command: &Command) {
        match command {
            Command::Language(code) => self.language.mark_sent(code.clone()),
            Command::Config(toggle, enabled) => self.toggles[toggle.index()].mark_sent(*enabled),
            _ => {}
        }
    }

    /// Forget every acknowledgement so everything set is due again.
    pub fn reset_acknowledgement(&mut self) {
        self.language.reset();
        for slot in &mut self.toggles {
            slot.reset();
        }
    }
}

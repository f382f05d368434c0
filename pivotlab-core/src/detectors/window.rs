//! Rolling validity windows for "recently happened" flags.

use serde::{Deserialize, Serialize};

use crate::domain::Direction;

/// A flag that stays set for `length` bars after the bar that opened it.
///
/// `length = 0` means the flag is only set on the opening bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWindow {
    length: usize,
    expires_after: Option<usize>,
}

impl EventWindow {
    pub fn new(length: usize) -> Self {
        Self {
            length,
            expires_after: None,
        }
    }

    pub fn open(&mut self, bar_index: usize) {
        self.expires_after = Some(bar_index.saturating_add(self.length));
    }

    pub fn is_active(&self, bar_index: usize) -> bool {
        self.expires_after.is_some_and(|last| bar_index <= last)
    }

    /// Last bar index on which the flag is set.
    pub fn expires_after(&self) -> Option<usize> {
        self.expires_after
    }
}

/// One window per direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionalWindow {
    bullish: EventWindow,
    bearish: EventWindow,
}

impl DirectionalWindow {
    pub fn new(length: usize) -> Self {
        Self {
            bullish: EventWindow::new(length),
            bearish: EventWindow::new(length),
        }
    }

    pub fn open(&mut self, direction: Direction, bar_index: usize) {
        match direction {
            Direction::Bullish => self.bullish.open(bar_index),
            Direction::Bearish => self.bearish.open(bar_index),
        }
    }

    pub fn is_active(&self, direction: Direction, bar_index: usize) -> bool {
        match direction {
            Direction::Bullish => self.bullish.is_active(bar_index),
            Direction::Bearish => self.bearish.is_active(bar_index),
        }
    }
}

/// Recent sweeps and structure breaks, as consumed by the entry setups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentEvents {
    pub sweeps: DirectionalWindow,
    pub breaks: DirectionalWindow,
}

impl RecentEvents {
    pub fn new(length: usize) -> Self {
        Self {
            sweeps: DirectionalWindow::new(length),
            breaks: DirectionalWindow::new(length),
        }
    }
}

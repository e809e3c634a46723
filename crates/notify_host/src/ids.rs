//! Display-level notification identifiers and their wrapping allocator.

use std::cell::Cell;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
/// Positive 31-bit identifier for one shown local notification.
pub struct NotificationId(i32);

impl NotificationId {
    /// Returns an identifier when `raw` is strictly positive.
    pub const fn new(raw: i32) -> Option<Self> {
        if raw > 0 {
            Some(Self(raw))
        } else {
            None
        }
    }

    /// Returns the raw integer value.
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
/// Wrapping counter handing out [`NotificationId`] values.
///
/// Starts at zero, so the first id is `1`. After `i32::MAX` the counter wraps back to `1`;
/// zero and negative values are never produced.
pub struct NotificationIdAllocator {
    last: Cell<i32>,
}

impl NotificationIdAllocator {
    /// Creates an allocator whose first id is `1`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an allocator that resumes after `last`.
    ///
    /// Non-positive values behave like a fresh allocator.
    pub fn resuming_after(last: i32) -> Self {
        Self {
            last: Cell::new(last.max(0)),
        }
    }

    /// Allocates the next identifier.
    pub fn next_id(&self) -> NotificationId {
        let next = match self.last.get().checked_add(1) {
            Some(value) if value > 0 => value,
            _ => 1,
        };
        self.last.set(next);
        NotificationId(next)
    }

    /// Returns the counter to its initial state.
    pub fn reset(&self) {
        self.last.set(0);
    }
}

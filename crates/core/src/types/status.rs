//! Order status and the forward-only transition rule.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Order lifecycle status.
///
/// Transitions are monotonic-forward: an order may keep its current status
/// (status updates are idempotent) or advance to a later one, but never move
/// backwards. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

/// Rejected status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid status transition: {from} -> {to}")]
pub struct StatusTransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl OrderStatus {
    /// Position of the status on the forward timeline.
    const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Preparing => 1,
            Self::Ready => 2,
            Self::Completed => 3,
            Self::Cancelled => 4,
        }
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Check that advancing from `self` to `to` is allowed.
    ///
    /// Re-asserting the current status is always allowed so that repeated
    /// updates are idempotent. Cancellation is allowed from any non-terminal
    /// status.
    ///
    /// # Errors
    ///
    /// Returns [`StatusTransitionError`] for backward transitions and for any
    /// transition out of a terminal status.
    pub const fn check_transition(self, to: Self) -> Result<(), StatusTransitionError> {
        if (self as u8) == (to as u8) {
            return Ok(());
        }
        if self.is_terminal() {
            return Err(StatusTransitionError { from: self, to });
        }
        if matches!(to, Self::Cancelled) || to.rank() > self.rank() {
            return Ok(());
        }
        Err(StatusTransitionError { from: self, to })
    }

    /// The wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Buffer and handle lifecycle states.

/// Sizing state of a [`crate::SafeBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// `initialize` has not been called; no typed access is legal.
    Uninitialized,
    /// Capacity is fixed for the rest of the buffer's life.
    Sized,
}

/// Lifetime state of the native allocation behind a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Accepting new pins.
    Open,
    /// Closed by its owner; waiting for outstanding pins to drain.
    Closed,
    /// Native memory has been returned to its owner.
    Released,
}

//! Session lifecycle events
//!
//! Published on a broadcast channel so the rest of an application can react
//! to a forced logout (e.g. return to the login screen) without polling the
//! credential store.

/// A change in session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Login stored a fresh token pair
    SignedIn,
    /// A renewal replaced the token pair
    Renewed,
    /// Renewal failed and the stored credentials were wiped
    Expired { reason: String },
    /// Explicit logout
    SignedOut,
}

/// Capacity of the event channel. Slow subscribers lag, they don't block renewal.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 16;

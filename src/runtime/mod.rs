//! Single-writer resource client runtime and subscription APIs.

/// Event stream types emitted by the client loop.
pub mod events;
/// Handle, subscription, and command loop implementation.
pub mod handle;

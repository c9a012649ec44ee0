//! Pure, synchronous cache state owned by the resource client.

/// Cache entries, tag index, and invalidation planning.
pub mod cache;

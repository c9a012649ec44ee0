//! Client event stream payloads.

use crate::{endpoint::CacheKey, types::FetchGen};

/// Events emitted from the resource client loop. Observability only;
/// subscription handles carry the authoritative state.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A request was issued for an entry.
    FetchStarted {
        /// Entry key.
        key: CacheKey,
        /// Generation of the issued request.
        generation: FetchGen,
    },
    /// A response was applied to an entry.
    FetchApplied {
        /// Entry key.
        key: CacheKey,
        /// Generation of the applied response.
        generation: FetchGen,
    },
    /// A superseded-generation response was discarded.
    StaleResponseDropped {
        /// Entry key.
        key: CacheKey,
        /// Generation of the discarded response.
        generation: FetchGen,
    },
    /// A mutation resolved successfully.
    MutationApplied {
        /// Endpoint name from the registry table.
        endpoint: &'static str,
    },
    /// A mutation resolved with an error payload.
    MutationFailed {
        /// Endpoint name from the registry table.
        endpoint: &'static str,
        /// HTTP status, or 0 for transport failures.
        status: u16,
    },
    /// Tag invalidation fan-out after a successful mutation.
    Invalidated {
        /// Subscribed entries refetched now.
        refetched: usize,
        /// Unobserved entries marked stale for lazy refetch.
        marked_stale: usize,
    },
}

//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor and
//! handed by reference to the sharing router. It holds the read-only profile
//! store (whose dashboards carry their own live pin state) and the session
//! registry of live app and hardware connections.

use std::sync::Arc;

use crate::profiles::ProfileStore;
use crate::session::SessionRegistry;

/// Default depth of each connection's outbound queue.
pub const DEFAULT_QUEUE_DEPTH: usize = 256;

/// Shared application state. Clone is required by Axum; all inner fields
/// are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    pub profiles: Arc<ProfileStore>,
    pub sessions: Arc<SessionRegistry>,
    /// Capacity of each connection's outbound queue.
    pub queue_depth: usize,
}

impl AppState {
    #[must_use]
    pub fn new(profiles: ProfileStore, queue_depth: usize) -> Self {
        Self { profiles: Arc::new(profiles), sessions: Arc::new(SessionRegistry::new()), queue_depth }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
#[path = "state_helpers_test.rs"]
pub mod test_helpers;

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;

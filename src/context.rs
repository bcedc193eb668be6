// src/context.rs
use crate::db::Store;
use crate::identity::IdentityVerifier;
use std::sync::Arc;

/// Everything the handlers need, built once at start-up and shared through
/// `web::Data`.
pub struct AppContext {
    pub store: Store,
    /// `None` when Google Sign-In is not configured.
    pub google_client_id: Option<String>,
    pub verifier: Option<Arc<dyn IdentityVerifier>>,
}

impl AppContext {
    pub fn new(
        store: Store,
        google_client_id: Option<String>,
        verifier: Option<Arc<dyn IdentityVerifier>>,
    ) -> Self {
        Self {
            store,
            google_client_id,
            verifier,
        }
    }
}

use crate::{auth::TokenManager, session::SessionStore};

/// Shared state assembled by the composition root and cloned into handlers
/// and the verification middleware.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub tokens: TokenManager,
}

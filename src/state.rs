use std::sync::Arc;

use crate::{store::Store, utils::TokenKeys};

/// Shared by every handler: the entity store and the token signing keys.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: TokenKeys,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, tokens: TokenKeys) -> Self {
        Self { store, tokens }
    }
}

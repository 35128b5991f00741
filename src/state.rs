use crate::store::Store;

/// Shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub quiz_size: usize,
}

impl AppState {
    pub fn new(store: Store, quiz_size: usize) -> Self {
        Self { store, quiz_size }
    }
}

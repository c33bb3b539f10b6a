//! Shared application state.
//!
//! Holds the one counter store handle for the process lifetime. It is built
//! explicitly in `main` and handed to the router; there is no global.

use std::sync::Arc;

use pageviews_core::counter::CounterStore;

#[derive(Clone)]
pub struct AppState {
    counter: Arc<dyn CounterStore>,
}

impl AppState {
    pub fn new(counter: Arc<dyn CounterStore>) -> Self {
        Self { counter }
    }

    pub fn counter(&self) -> &dyn CounterStore {
        self.counter.as_ref()
    }
}

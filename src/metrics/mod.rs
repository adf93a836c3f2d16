use std::sync::{Arc, Mutex};

use crate::metrics::metric_store::MetricStore;

pub mod metric_store;
pub mod metric_types;
pub mod payload;

/// One writer (the consume loop) and one reader (the reporter) share the store.
pub type SharedStore = Arc<Mutex<MetricStore>>;

pub fn shared_store(store: MetricStore) -> SharedStore {
    Arc::new(Mutex::new(store))
}

pub mod agent;
pub mod config;
pub mod error;
pub mod logger;
pub mod metrics;
pub mod queue;
pub mod sync;
pub mod util;

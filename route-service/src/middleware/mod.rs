pub mod context;
pub mod metrics;

pub use context::credential;
pub use metrics::metrics_middleware;

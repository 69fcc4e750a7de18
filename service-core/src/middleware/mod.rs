//! HTTP middleware shared by the services.

pub mod client_ip;
pub mod problem;
pub mod rate_limit;
pub mod security_headers;
pub mod tracing;

pub mod audit;
pub mod auth;
pub mod metrics;
pub mod rate_limits;
pub mod routes;
pub mod users;

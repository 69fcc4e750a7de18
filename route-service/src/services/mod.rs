pub mod audit;
pub mod credentials;
pub mod database;
pub mod error;
pub mod guard;
pub mod lifecycle;
pub mod memory;
pub mod metrics;
pub mod notifier;
pub mod rate_limits;
pub mod repository;
pub mod routes;
pub mod users;
pub mod validation;

pub use audit::{AuditMode, AuditRecorder};
pub use credentials::{CredentialOutcome, CredentialValidator};
pub use database::Database;
pub use error::GatewayError;
pub use memory::InMemoryRepository;
pub use notifier::{CacheInvalidationNotifier, NoopNotifier, RecordingNotifier, RedisNotifier};
pub use rate_limits::RateLimitService;
pub use repository::Repository;
pub use routes::RouteService;
pub use users::UserService;

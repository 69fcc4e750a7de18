//! PostgreSQL repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prometheus::HistogramTimer;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use super::error::GatewayError;
use super::metrics::DB_QUERY_DURATION;
use super::repository::Repository;
use crate::models::{
    AuditEntry, AuditFilter, EntityType, HttpMethod, Page, PageRequest, RateLimitPolicy,
    RateLimitPolicyUsage, Role, Route, RouteFilter, RouteStatus, User,
};

const ROUTE_COLUMNS: &str = "id, path, upstream_url, methods, description, status, rate_limit_id, \
     created_by, created_at, updated_at, submitted_at, approved_by, approved_at, \
     rejected_by, rejected_at, rejection_reason";

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, active, created_at, updated_at";

const AUDIT_COLUMNS: &str = "id, entity_type, entity_id, action, actor_id, actor_username, \
     changes, ip_address, correlation_id, occurred_at";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "route-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

fn timer(operation: &str) -> HistogramTimer {
    DB_QUERY_DURATION
        .with_label_values(&[operation])
        .start_timer()
}

/// Escape `%`, `_` and `\` so user input matches literally inside LIKE.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn contains_pattern(term: &Option<String>) -> Option<String> {
    term.as_deref().map(|t| format!("%{}%", escape_like(t)))
}

fn constraint_of(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint(),
        _ => None,
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

/// Translate route write failures into the domain taxonomy.
fn route_write_error(err: sqlx::Error, route: &Route) -> GatewayError {
    if is_unique_violation(&err) && constraint_of(&err) == Some("routes_path_key") {
        return GatewayError::DuplicatePath(route.path.clone());
    }
    if is_foreign_key_violation(&err) {
        if let Some(policy_id) = route.rate_limit_id {
            return GatewayError::PolicyNotFound(policy_id);
        }
    }
    GatewayError::Internal(anyhow::anyhow!("Failed to write route: {}", err))
}

fn policy_write_error(err: sqlx::Error, policy: &RateLimitPolicy) -> GatewayError {
    if is_unique_violation(&err) {
        return GatewayError::DuplicatePolicyName(policy.name.clone());
    }
    GatewayError::Internal(anyhow::anyhow!("Failed to write rate limit policy: {}", err))
}

#[derive(FromRow)]
struct RouteRow {
    id: Uuid,
    path: String,
    upstream_url: String,
    methods: Vec<String>,
    description: Option<String>,
    status: String,
    rate_limit_id: Option<Uuid>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
    approved_by: Option<Uuid>,
    approved_at: Option<DateTime<Utc>>,
    rejected_by: Option<Uuid>,
    rejected_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
}

impl TryFrom<RouteRow> for Route {
    type Error = GatewayError;

    fn try_from(row: RouteRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<RouteStatus>()
            .map_err(|e| GatewayError::Internal(anyhow::anyhow!(e)))?;
        let methods = row
            .methods
            .iter()
            .map(|m| m.parse::<HttpMethod>())
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(|e| GatewayError::Internal(anyhow::anyhow!(e)))?;

        Ok(Route {
            id: row.id,
            path: row.path,
            upstream_url: row.upstream_url,
            methods,
            description: row.description,
            status,
            rate_limit_id: row.rate_limit_id,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            submitted_at: row.submitted_at,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            rejected_by: row.rejected_by,
            rejected_at: row.rejected_at,
            rejection_reason: row.rejection_reason,
        })
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: Option<String>,
    password_hash: String,
    role: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = GatewayError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| GatewayError::Internal(anyhow::anyhow!(e)))?;
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct AuditRow {
    id: Uuid,
    entity_type: String,
    entity_id: Uuid,
    action: String,
    actor_id: Uuid,
    actor_username: String,
    changes: Option<serde_json::Value>,
    ip_address: Option<String>,
    correlation_id: String,
    occurred_at: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = GatewayError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        let entity_type = row
            .entity_type
            .parse::<EntityType>()
            .map_err(|e| GatewayError::Internal(anyhow::anyhow!(e)))?;
        Ok(AuditEntry {
            id: row.id,
            entity_type,
            entity_id: row.entity_id,
            action: row.action,
            actor_id: row.actor_id,
            actor_username: row.actor_username,
            changes: row.changes,
            ip_address: row.ip_address,
            correlation_id: row.correlation_id,
            timestamp: row.occurred_at,
        })
    }
}

fn method_names(route: &Route) -> Vec<String> {
    route.methods.iter().map(|m| m.as_str().to_string()).collect()
}

#[async_trait]
impl Repository for Database {
    #[instrument(skip(self, route), fields(route_id = %route.id, path = %route.path))]
    async fn insert_route(&self, route: &Route) -> Result<(), GatewayError> {
        let _timer = timer("insert_route");

        sqlx::query(
            r#"
            INSERT INTO routes (id, path, upstream_url, methods, description, status, rate_limit_id,
                                created_by, created_at, updated_at, submitted_at, approved_by,
                                approved_at, rejected_by, rejected_at, rejection_reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(route.id)
        .bind(&route.path)
        .bind(&route.upstream_url)
        .bind(method_names(route))
        .bind(&route.description)
        .bind(route.status.as_str())
        .bind(route.rate_limit_id)
        .bind(route.created_by)
        .bind(route.created_at)
        .bind(route.updated_at)
        .bind(route.submitted_at)
        .bind(route.approved_by)
        .bind(route.approved_at)
        .bind(route.rejected_by)
        .bind(route.rejected_at)
        .bind(&route.rejection_reason)
        .execute(&self.pool)
        .await
        .map_err(|e| route_write_error(e, route))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_route(&self, id: Uuid) -> Result<Option<Route>, GatewayError> {
        let _timer = timer("find_route");

        let row = sqlx::query_as::<_, RouteRow>(&format!(
            "SELECT {} FROM routes WHERE id = $1",
            ROUTE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Route::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn route_path_exists(
        &self,
        path: &str,
        excluding: Option<Uuid>,
    ) -> Result<bool, GatewayError> {
        let _timer = timer("route_path_exists");

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM routes WHERE path = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(path)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn find_paths_with_prefix(&self, prefix: &str) -> Result<Vec<String>, GatewayError> {
        let _timer = timer("find_paths_with_prefix");

        let paths = sqlx::query_scalar::<_, String>(
            r#"SELECT path FROM routes WHERE path LIKE $1 ESCAPE '\'"#,
        )
        .bind(format!("{}%", escape_like(prefix)))
        .fetch_all(&self.pool)
        .await?;

        Ok(paths)
    }

    #[instrument(skip(self, route), fields(route_id = %route.id, next = %route.status))]
    async fn update_route_if_status(
        &self,
        route: &Route,
        expected: RouteStatus,
    ) -> Result<bool, GatewayError> {
        let _timer = timer("update_route_if_status");

        let result = sqlx::query(
            r#"
            UPDATE routes
            SET path = $3, upstream_url = $4, methods = $5, description = $6, status = $7,
                rate_limit_id = $8, updated_at = $9, submitted_at = $10, approved_by = $11,
                approved_at = $12, rejected_by = $13, rejected_at = $14, rejection_reason = $15
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(route.id)
        .bind(expected.as_str())
        .bind(&route.path)
        .bind(&route.upstream_url)
        .bind(method_names(route))
        .bind(&route.description)
        .bind(route.status.as_str())
        .bind(route.rate_limit_id)
        .bind(route.updated_at)
        .bind(route.submitted_at)
        .bind(route.approved_by)
        .bind(route.approved_at)
        .bind(route.rejected_by)
        .bind(route.rejected_at)
        .bind(&route.rejection_reason)
        .execute(&self.pool)
        .await
        .map_err(|e| route_write_error(e, route))?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn delete_route_if_status(
        &self,
        id: Uuid,
        expected: RouteStatus,
    ) -> Result<bool, GatewayError> {
        let _timer = timer("delete_route_if_status");

        let result = sqlx::query("DELETE FROM routes WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(expected.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self, filter))]
    async fn list_routes(
        &self,
        filter: &RouteFilter,
        page: PageRequest,
    ) -> Result<Page<Route>, GatewayError> {
        let _timer = timer("list_routes");

        let conditions = r#"
            WHERE ($1::varchar IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR created_by = $2)
              AND ($3::text IS NULL OR path ILIKE $3 ESCAPE '\' OR description ILIKE $3 ESCAPE '\')
              AND ($4::text IS NULL OR upstream_url ILIKE $4 ESCAPE '\')
              AND ($5::text IS NULL OR upstream_url = $5)
        "#;

        let status = filter.status.map(|s| s.as_str());
        let search = contains_pattern(&filter.search);
        let upstream = contains_pattern(&filter.upstream);

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM routes {}",
            conditions
        ))
        .bind(status)
        .bind(filter.created_by)
        .bind(&search)
        .bind(&upstream)
        .bind(&filter.upstream_exact)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, RouteRow>(&format!(
            "SELECT {} FROM routes {} ORDER BY created_at DESC, path ASC LIMIT $6 OFFSET $7",
            ROUTE_COLUMNS, conditions
        ))
        .bind(status)
        .bind(filter.created_by)
        .bind(&search)
        .bind(&upstream)
        .bind(&filter.upstream_exact)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Route::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, total, page))
    }

    #[instrument(skip(self))]
    async fn count_routes_using_policy(&self, policy_id: Uuid) -> Result<i64, GatewayError> {
        let _timer = timer("count_routes_using_policy");

        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM routes WHERE rate_limit_id = $1")
                .bind(policy_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    #[instrument(skip(self, policy), fields(policy_id = %policy.id, name = %policy.name))]
    async fn insert_policy(&self, policy: &RateLimitPolicy) -> Result<(), GatewayError> {
        let _timer = timer("insert_policy");

        sqlx::query(
            r#"
            INSERT INTO rate_limit_policies (id, name, requests_per_second, burst_size, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(policy.id)
        .bind(&policy.name)
        .bind(policy.requests_per_second)
        .bind(policy.burst_size)
        .bind(policy.created_by)
        .bind(policy.created_at)
        .bind(policy.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| policy_write_error(e, policy))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_policy(&self, id: Uuid) -> Result<Option<RateLimitPolicy>, GatewayError> {
        let _timer = timer("find_policy");

        let policy = sqlx::query_as::<_, RateLimitPolicy>(
            r#"
            SELECT id, name, requests_per_second, burst_size, created_by, created_at, updated_at
            FROM rate_limit_policies
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(policy)
    }

    #[instrument(skip(self, policy), fields(policy_id = %policy.id))]
    async fn update_policy(&self, policy: &RateLimitPolicy) -> Result<bool, GatewayError> {
        let _timer = timer("update_policy");

        let result = sqlx::query(
            r#"
            UPDATE rate_limit_policies
            SET name = $2, requests_per_second = $3, burst_size = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(policy.id)
        .bind(&policy.name)
        .bind(policy.requests_per_second)
        .bind(policy.burst_size)
        .bind(policy.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| policy_write_error(e, policy))?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn delete_policy(&self, id: Uuid) -> Result<bool, GatewayError> {
        let _timer = timer("delete_policy");

        match sqlx::query("DELETE FROM rate_limit_policies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(result) => Ok(result.rows_affected() == 1),
            Err(e) if is_foreign_key_violation(&e) => {
                let usage = self.count_routes_using_policy(id).await?;
                Err(GatewayError::PolicyInUse(usage.max(1)))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn list_policies(
        &self,
        page: PageRequest,
    ) -> Result<Page<RateLimitPolicyUsage>, GatewayError> {
        let _timer = timer("list_policies");

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM rate_limit_policies")
            .fetch_one(&self.pool)
            .await?;

        let items = sqlx::query_as::<_, RateLimitPolicyUsage>(
            r#"
            SELECT p.id, p.name, p.requests_per_second, p.burst_size, p.created_by,
                   p.created_at, p.updated_at,
                   (SELECT COUNT(*) FROM routes r WHERE r.rate_limit_id = p.id) AS usage_count
            FROM rate_limit_policies p
            ORDER BY p.name ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(items, total, page))
    }

    #[instrument(skip(self, entry), fields(entity_id = %entry.entity_id, action = %entry.action))]
    async fn append_audit(&self, entry: &AuditEntry) -> Result<(), GatewayError> {
        let _timer = timer("append_audit");

        sqlx::query(
            r#"
            INSERT INTO audit_entries (id, entity_type, entity_id, action, actor_id, actor_username,
                                       changes, ip_address, correlation_id, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(entry.id)
        .bind(entry.entity_type.as_str())
        .bind(entry.entity_id)
        .bind(&entry.action)
        .bind(entry.actor_id)
        .bind(&entry.actor_username)
        .bind(&entry.changes)
        .bind(&entry.ip_address)
        .bind(&entry.correlation_id)
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self, filter))]
    async fn list_audit(
        &self,
        filter: &AuditFilter,
        page: PageRequest,
    ) -> Result<Page<AuditEntry>, GatewayError> {
        let _timer = timer("list_audit");

        let conditions = r#"
            WHERE ($1::varchar IS NULL OR entity_type = $1)
              AND ($2::uuid IS NULL OR entity_id = $2)
              AND ($3::uuid IS NULL OR actor_id = $3)
              AND (cardinality($4::text[]) = 0 OR action = ANY($4))
              AND ($5::timestamptz IS NULL OR occurred_at >= $5)
              AND ($6::timestamptz IS NULL OR occurred_at <= $6)
        "#;
        let order = if filter.oldest_first {
            "ORDER BY occurred_at ASC, seq ASC"
        } else {
            "ORDER BY occurred_at DESC, seq DESC"
        };
        let entity_type = filter.entity_type.map(|t| t.as_str());

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM audit_entries {}",
            conditions
        ))
        .bind(entity_type)
        .bind(filter.entity_id)
        .bind(filter.actor_id)
        .bind(&filter.actions)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, AuditRow>(&format!(
            "SELECT {} FROM audit_entries {} {} LIMIT $7 OFFSET $8",
            AUDIT_COLUMNS, conditions, order
        ))
        .bind(entity_type)
        .bind(filter.entity_id)
        .bind(filter.actor_id)
        .bind(&filter.actions)
        .bind(filter.from)
        .bind(filter.to)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(AuditEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, total, page))
    }

    #[instrument(skip(self, user), fields(user_id = %user.id, username = %user.username))]
    async fn insert_user(&self, user: &User) -> Result<(), GatewayError> {
        let _timer = timer("insert_user");

        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, role, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                GatewayError::DuplicateUsername(user.username.clone())
            } else {
                GatewayError::Internal(anyhow::anyhow!("Failed to create user: {}", e))
            }
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, GatewayError> {
        let _timer = timer("find_user");

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, GatewayError> {
        let _timer = timer("find_user_by_username");

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE LOWER(username) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn update_user(&self, user: &User) -> Result<bool, GatewayError> {
        let _timer = timer("update_user");

        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $2, password_hash = $3, role = $4, active = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.active)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn list_users(&self, page: PageRequest) -> Result<Page<User>, GatewayError> {
        let _timer = timer("list_users");

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY username ASC LIMIT $1 OFFSET $2",
            USER_COLUMNS
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, total, page))
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), GatewayError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| GatewayError::Internal(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }
}

//! Shared test infrastructure for database-backed tests.
//!
//! Tests run against the Postgres server named by `TEST_DATABASE_URL`. Each
//! test gets its own schema with the full migration set applied, so tests
//! can run in parallel without seeing each other's rows. When the variable
//! is unset the database tests return early.

#![allow(dead_code)]

use actix_web::dev::ServiceRequest;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::str::FromStr;
use uuid::Uuid;

use political_ledger::auth::session::{AccessScope, AuthUser};
use political_ledger::db::MIGRATOR;

pub struct TestDb {
    pool: PgPool,
    admin: PgPool,
    schema: String,
}

impl TestDb {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Drop the schema. Call at the end of a test; a panicking test leaves
    /// its schema behind for inspection.
    pub async fn cleanup(self) {
        self.pool.close().await;
        let _ = sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema))
            .execute(&self.admin)
            .await;
        self.admin.close().await;
    }
}

/// Fresh schema with migrations applied, or `None` when no test database is configured.
pub async fn setup_test_db() -> Option<TestDb> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            eprintln!("TEST_DATABASE_URL not set; skipping database test");
            return None;
        }
    };

    let schema = format!("test_{}", Uuid::new_v4().simple());
    let admin = PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .expect("Failed to connect to TEST_DATABASE_URL");
    sqlx::query(&format!("CREATE SCHEMA {schema}"))
        .execute(&admin)
        .await
        .expect("Failed to create test schema");

    let options = PgConnectOptions::from_str(&url)
        .expect("Invalid TEST_DATABASE_URL")
        .options([("search_path", schema.as_str())]);
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .expect("Failed to connect to test schema");
    MIGRATOR.run(&pool).await.expect("Failed to run migrations");

    Some(TestDb { pool, admin, schema })
}

// ============================================================================
// HTTP
// ============================================================================

/// Header naming the user a test request runs as.
pub const TEST_USER_HEADER: &str = "x-test-user";

/// Caller identity for a request, standing in for the session gate.
pub fn request_user(req: &ServiceRequest) -> Option<AuthUser> {
    req.headers()
        .get(TEST_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .map(auth_user)
}

/// The full `/api` route table over `pool`, with the caller taken from
/// the `x-test-user` header instead of session cookies.
#[allow(unused_macros)]
macro_rules! api_app {
    ($pool:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($pool.clone()))
                .wrap_fn(|req, srv| {
                    if let Some(user) = crate::common::request_user(&req) {
                        actix_web::HttpMessage::extensions_mut(&req).insert(user);
                    }
                    actix_web::dev::Service::call(srv, req)
                })
                .configure(political_ledger::handlers::configure),
        )
        .await
    };
}

/// Audit actions recorded against `target_id`, oldest first.
pub async fn audit_actions(pool: &PgPool, target_id: Uuid) -> Vec<String> {
    sqlx::query_scalar("SELECT action FROM audit_log WHERE target_id = $1 ORDER BY id")
        .bind(target_id)
        .fetch_all(pool)
        .await
        .expect("Failed to read audit log")
}

// ============================================================================
// FIXTURES
// ============================================================================

pub fn auth_user(id: Uuid) -> AuthUser {
    AuthUser {
        id,
        email: Some(format!("{}@example.com", id.simple())),
        display_name: "Test User".to_string(),
        access_token: "token".to_string(),
        scope: AccessScope::Owner(id),
    }
}

pub async fn insert_organization(pool: &PgPool, owner: Uuid, name: &str) -> Uuid {
    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO political_organizations (owner_user_id, name) VALUES ($1, $2) RETURNING id",
    )
    .bind(owner)
    .bind(name)
    .fetch_one(pool)
    .await
    .expect("Failed to insert organization");
    id
}

pub async fn insert_election(pool: &PgPool, owner: Uuid, name: &str) -> Uuid {
    let (politician_id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO politicians (owner_user_id, hub_politician_id, name) \
         VALUES ($1, $2, 'Candidate') RETURNING id",
    )
    .bind(owner)
    .bind(format!("hub-{}", Uuid::new_v4().simple()))
    .fetch_one(pool)
    .await
    .expect("Failed to insert politician");

    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO elections (owner_user_id, politician_id, hub_politician_id, election_name, election_date) \
         SELECT $1, id, hub_politician_id, $2, DATE '2025-07-20' FROM politicians WHERE id = $3 \
         RETURNING id",
    )
    .bind(owner)
    .bind(name)
    .bind(politician_id)
    .fetch_one(pool)
    .await
    .expect("Failed to insert election");
    id
}

pub async fn insert_closure(pool: &PgPool, organization_id: Uuid, year: i32, status: &str) {
    sqlx::query(
        "INSERT INTO ledger_year_closures (organization_id, fiscal_year, status) VALUES ($1, $2, $3)",
    )
    .bind(organization_id)
    .bind(year)
    .bind(status)
    .execute(pool)
    .await
    .expect("Failed to insert closure");
}

pub async fn closure_status(pool: &PgPool, organization_id: Uuid, year: i32) -> Option<String> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT status FROM ledger_year_closures WHERE organization_id = $1 AND fiscal_year = $2",
    )
    .bind(organization_id)
    .bind(year)
    .fetch_optional(pool)
    .await
    .expect("Failed to read closure");
    row.map(|r| r.0)
}

pub async fn organization_owner(pool: &PgPool, id: Uuid) -> Uuid {
    let (owner,): (Uuid,) =
        sqlx::query_as("SELECT owner_user_id FROM political_organizations WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .expect("Failed to read organization owner");
    owner
}

pub async fn membership_count(pool: &PgPool, user_id: Uuid, organization_id: Uuid) -> i64 {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM ledger_members WHERE user_id = $1 AND organization_id = $2",
    )
    .bind(user_id)
    .bind(organization_id)
    .fetch_one(pool)
    .await
    .expect("Failed to count memberships");
    count
}

//! Direct database verification counts
//!
//! Read-only queries against the PostgreSQL database behind the backend.
//! A missing table or column is reported as an absent section instead of
//! failing the whole run.

use routehub_common::geocoding::{COORDINATE_TOLERANCE, DEFAULT_CITY_CENTER};
use routehub_common::Result;
use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, warn};

/// User ids reserved for the inspector import
pub const RESERVED_USER_IDS: (i64, i64) = (100, 136);

const SAMPLE_LIMIT: i64 = 10;

const UNDEFINED_TABLE: &str = "42P01";
const UNDEFINED_COLUMN: &str = "42703";
/// Raised when `users.id` is not numeric and the range check cannot apply
const UNDEFINED_FUNCTION: &str = "42883";

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub total: i64,
    pub by_role: Vec<(String, i64)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanySummary {
    pub total: i64,
    pub at_default_coordinates: i64,
    pub with_real_coordinates: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceSummary {
    pub total: i64,
    pub sample_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelationSummary {
    pub total: i64,
    /// Inspector name and assignment count, busiest first
    pub top_inspectors: Vec<(String, i64)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictSummary {
    /// Existing users inside [`RESERVED_USER_IDS`]
    pub reserved_user_ids_taken: Option<i64>,
    /// Tax numbers shared by more than one company
    pub duplicate_tax_numbers: Option<i64>,
}

/// Sections are `None` when their table is missing
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub users: Option<UserSummary>,
    pub companies: Option<CompanySummary>,
    pub services: Option<ServiceSummary>,
    pub relations: Option<RelationSummary>,
    pub conflicts: ConflictSummary,
}

/// Connect with a small pool; verification never writes
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect(url)
        .await?;
    info!("Connected to database");
    Ok(pool)
}

impl VerificationReport {
    pub async fn collect(pool: &PgPool) -> Result<Self> {
        Ok(Self {
            users: tolerate_missing("users", user_summary(pool).await)?,
            companies: tolerate_missing("companies", company_summary(pool).await)?,
            services: tolerate_missing("services", service_summary(pool).await)?,
            relations: tolerate_missing("company_services", relation_summary(pool).await)?,
            conflicts: ConflictSummary {
                reserved_user_ids_taken: tolerate_missing(
                    "users",
                    reserved_ids_taken(pool).await,
                )?,
                duplicate_tax_numbers: tolerate_missing(
                    "companies",
                    duplicate_tax_numbers(pool).await,
                )?,
            },
        })
    }
}

fn is_missing_schema(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => matches!(
            db_err.code().as_deref(),
            Some(UNDEFINED_TABLE) | Some(UNDEFINED_COLUMN) | Some(UNDEFINED_FUNCTION)
        ),
        _ => false,
    }
}

fn tolerate_missing<T>(
    section: &str,
    result: std::result::Result<T, sqlx::Error>,
) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if is_missing_schema(&e) => {
            warn!(section, error = %e, "Skipping section, schema missing");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

async fn user_summary(pool: &PgPool) -> std::result::Result<UserSummary, sqlx::Error> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    let by_role = sqlx::query_as::<_, (String, i64)>(
        "SELECT COALESCE(role::text, '(none)'), COUNT(*) FROM users GROUP BY role ORDER BY 1",
    )
    .fetch_all(pool)
    .await?;

    Ok(UserSummary { total, by_role })
}

async fn company_summary(pool: &PgPool) -> std::result::Result<CompanySummary, sqlx::Error> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM companies")
        .fetch_one(pool)
        .await?;

    let at_default_coordinates: i64 = if total > 0 {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM companies
            WHERE ABS(latitude - $1) < $3 AND ABS(longitude - $2) < $3
            "#,
        )
        .bind(DEFAULT_CITY_CENTER.lat)
        .bind(DEFAULT_CITY_CENTER.lng)
        .bind(COORDINATE_TOLERANCE)
        .fetch_one(pool)
        .await?
    } else {
        0
    };

    Ok(CompanySummary {
        total,
        at_default_coordinates,
        with_real_coordinates: total - at_default_coordinates,
    })
}

async fn service_summary(pool: &PgPool) -> std::result::Result<ServiceSummary, sqlx::Error> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM services")
        .fetch_one(pool)
        .await?;

    let sample_names = sqlx::query_scalar::<_, String>(
        "SELECT name FROM services WHERE name IS NOT NULL ORDER BY name LIMIT $1",
    )
    .bind(SAMPLE_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(ServiceSummary {
        total,
        sample_names,
    })
}

async fn relation_summary(pool: &PgPool) -> std::result::Result<RelationSummary, sqlx::Error> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM company_services")
        .fetch_one(pool)
        .await?;

    let top_inspectors = if total > 0 {
        sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT COALESCE(u.name, u.id::text), COUNT(*) AS assigned_count
            FROM company_services cs
            JOIN users u ON cs.inspector_id = u.id
            WHERE u.role = 'inspector'
            GROUP BY u.id, u.name
            ORDER BY assigned_count DESC
            LIMIT $1
            "#,
        )
        .bind(SAMPLE_LIMIT)
        .fetch_all(pool)
        .await?
    } else {
        Vec::new()
    };

    Ok(RelationSummary {
        total,
        top_inspectors,
    })
}

async fn reserved_ids_taken(pool: &PgPool) -> std::result::Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id BETWEEN $1 AND $2")
        .bind(RESERVED_USER_IDS.0)
        .bind(RESERVED_USER_IDS.1)
        .fetch_one(pool)
        .await
}

async fn duplicate_tax_numbers(pool: &PgPool) -> std::result::Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM (
            SELECT tax_number
            FROM companies
            WHERE tax_number IS NOT NULL
            GROUP BY tax_number
            HAVING COUNT(*) > 1
        ) AS duplicates
        "#,
    )
    .fetch_one(pool)
    .await
}

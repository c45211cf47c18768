use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::{BookingSettings, Config};
use crate::state::{AppState, Repositories};
use crate::infra::email::http_email_service::HttpEmailService;
use crate::infra::gateway::stripe_gateway::StripeGateway;
use crate::infra::repositories::{
    postgres_blocked_period_repo::PostgresBlockedPeriodRepo, postgres_booking_repo::PostgresBookingRepo,
    postgres_catalog_repo::PostgresCatalogRepo, postgres_draft_repo::PostgresDraftRepo,
    postgres_job_repo::PostgresJobRepo, postgres_payment_repo::PostgresPaymentRepo,
    postgres_profile_repo::PostgresProfileRepo, postgres_refund_repo::PostgresRefundRepo,
    sqlite_blocked_period_repo::SqliteBlockedPeriodRepo, sqlite_booking_repo::SqliteBookingRepo,
    sqlite_catalog_repo::SqliteCatalogRepo, sqlite_draft_repo::SqliteDraftRepo,
    sqlite_job_repo::SqliteJobRepo, sqlite_payment_repo::SqlitePaymentRepo,
    sqlite_profile_repo::SqliteProfileRepo, sqlite_refund_repo::SqliteRefundRepo,
};

pub fn is_postgres_url(database_url: &str) -> bool {
    database_url.starts_with("postgres://") || database_url.starts_with("postgresql://")
}

pub async fn bootstrap_state(config: &Config, settings: BookingSettings) -> AppState {
    let database_url = &config.database_url;

    let repos = if is_postgres_url(database_url) {
        info!("Initializing PostgreSQL connection...");

        let mut opts: PgConnectOptions = database_url.parse().expect("Invalid Postgres URL");
        opts = opts.log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await
            .expect("Failed to connect to Postgres");

        run_postgres_migrations(&pool).await;
        postgres_repositories(pool)
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let pool = connect_sqlite(database_url).await;
        run_sqlite_migrations(&pool).await;
        sqlite_repositories(pool)
    };

    let email_service = Arc::new(HttpEmailService::new(
        config.mail_service_url.clone(),
        config.mail_service_token.clone(),
    ));
    let gateway = Arc::new(StripeGateway::new(
        config.gateway_api_url.clone(),
        config.gateway_secret_key.clone(),
    ));

    AppState::new(config.clone(), settings, repos, gateway, email_service)
        .expect("Failed to assemble application state")
}

pub async fn connect_sqlite(database_url: &str) -> SqlitePool {
    let opts = SqliteConnectOptions::from_str(database_url)
        .expect("Invalid SQLite connection string")
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .log_statements(LevelFilter::Debug)
        .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await
        .expect("Failed to connect to SQLite")
}

pub fn sqlite_repositories(pool: SqlitePool) -> Repositories {
    Repositories {
        catalog: Arc::new(SqliteCatalogRepo::new(pool.clone())),
        profiles: Arc::new(SqliteProfileRepo::new(pool.clone())),
        blocked_periods: Arc::new(SqliteBlockedPeriodRepo::new(pool.clone())),
        drafts: Arc::new(SqliteDraftRepo::new(pool.clone())),
        payments: Arc::new(SqlitePaymentRepo::new(pool.clone())),
        bookings: Arc::new(SqliteBookingRepo::new(pool.clone())),
        refunds: Arc::new(SqliteRefundRepo::new(pool.clone())),
        jobs: Arc::new(SqliteJobRepo::new(pool)),
    }
}

pub fn postgres_repositories(pool: PgPool) -> Repositories {
    Repositories {
        catalog: Arc::new(PostgresCatalogRepo::new(pool.clone())),
        profiles: Arc::new(PostgresProfileRepo::new(pool.clone())),
        blocked_periods: Arc::new(PostgresBlockedPeriodRepo::new(pool.clone())),
        drafts: Arc::new(PostgresDraftRepo::new(pool.clone())),
        payments: Arc::new(PostgresPaymentRepo::new(pool.clone())),
        bookings: Arc::new(PostgresBookingRepo::new(pool.clone())),
        refunds: Arc::new(PostgresRefundRepo::new(pool.clone())),
        jobs: Arc::new(PostgresJobRepo::new(pool)),
    }
}

pub async fn run_postgres_migrations(pool: &PgPool) {
    sqlx::migrate!("./migrations/postgres")
        .run(pool)
        .await
        .expect("Failed to run Postgres migrations");
}

pub async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}

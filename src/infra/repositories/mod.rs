pub mod sqlite_catalog_repo;
pub mod sqlite_profile_repo;
pub mod sqlite_blocked_period_repo;
pub mod sqlite_draft_repo;
pub mod sqlite_payment_repo;
pub mod sqlite_booking_repo;
pub mod sqlite_refund_repo;
pub mod sqlite_job_repo;

pub mod postgres_catalog_repo;
pub mod postgres_profile_repo;
pub mod postgres_blocked_period_repo;
pub mod postgres_draft_repo;
pub mod postgres_payment_repo;
pub mod postgres_booking_repo;
pub mod postgres_refund_repo;
pub mod postgres_job_repo;

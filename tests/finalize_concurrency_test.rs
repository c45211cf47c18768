mod common;

use chrono::{Duration, Utc};
use common::test_settings;
use reservation_backend::{
    domain::models::{
        catalog::ServiceType,
        draft::{DraftReservation, NewDraftParams, ResolvedPayment},
        job::{Job, JobPayload},
        profile::{CustomerItem, CustomerProfile},
    },
    domain::services::finalizer::{BookingFinalizer, FinalizeOutcome, FinalizeRequest},
    error::AppError,
    infra::factory::{postgres_repositories, run_postgres_migrations},
};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinSet;
use uuid::Uuid;

async fn postgres_pool() -> Option<PgPool> {
    let db_url = std::env::var("DATABASE_URL").ok()?;
    if !db_url.starts_with("postgres") {
        println!("Skipping concurrency test (not targeting Postgres)");
        return None;
    }

    let opts = PgConnectOptions::from_str(&db_url)
        .unwrap()
        .log_statements(tracing::log::LevelFilter::Debug);

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect_with(opts)
        .await
        .expect("Failed to connect to DB");
    run_postgres_migrations(&pool).await;
    Some(pool)
}

#[tokio::test]
async fn test_concurrent_finalizations_respect_capacity() {
    let Some(pool) = postgres_pool().await else { return };
    let repos = postgres_repositories(pool.clone());

    let mut settings = test_settings();
    if let Some(rule) = settings.availability.as_mut() {
        rule.daily_capacity = Some(1);
    }
    let settings = Arc::new(settings);
    let finalizer = Arc::new(BookingFinalizer::new(
        settings.clone(),
        repos.drafts.clone(),
        repos.payments.clone(),
        repos.bookings.clone(),
        repos.jobs.clone(),
    ));

    let service = repos.catalog
        .create(&ServiceType::new(format!("Race {}", Uuid::new_v4()), None, 10_000))
        .await
        .unwrap();
    // A date far enough out that no other test touches it.
    let date = Utc::now().date_naive() + Duration::days(300 + (Uuid::new_v4().as_u128() % 3000) as i64);

    let contenders = 8;
    let mut tokens = Vec::new();
    for i in 0..contenders {
        let profile = repos.profiles
            .create_profile(&CustomerProfile::new(None, format!("Racer {}", i), format!("racer{}@example.com", i), None))
            .await
            .unwrap();
        let item = repos.profiles
            .create_item(&CustomerItem::new(Some(profile.id.clone()), "Mazda".into(), "BT-50".into(), 2020, None))
            .await
            .unwrap();

        let mut draft = DraftReservation::new(NewDraftParams {
            service_type_id: service.id.clone(),
            service_name: service.name.clone(),
            booking_date: date,
            total_amount: service.base_price,
            customer_notes: None,
            ttl: settings.draft_ttl(),
        });
        draft.item_id = Some(item.id);
        draft.profile_id = Some(profile.id);
        draft.set_payment(Some(ResolvedPayment::InStore));
        tokens.push(repos.drafts.create(&draft).await.unwrap().token);
    }

    let mut set = JoinSet::new();
    for token in tokens {
        let finalizer = finalizer.clone();
        set.spawn(async move { finalizer.finalize(FinalizeRequest::InStore(token)).await });
    }

    let mut created = 0;
    let mut rejected = 0;
    while let Some(res) = set.join_next().await {
        match res.unwrap() {
            Ok(FinalizeOutcome::Created(_)) => created += 1,
            Err(AppError::StaleSelection(_)) => rejected += 1,
            other => panic!("unexpected finalize outcome: {:?}", other),
        }
    }

    assert_eq!(created, 1, "Capacity of one admitted {} bookings", created);
    assert_eq!(rejected, contenders - 1);

    let booked: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE booking_date = $1")
        .bind(date)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(booked, 1);
}

#[tokio::test]
async fn test_job_queue_claims_each_job_once() {
    let Some(pool) = postgres_pool().await else { return };
    let repos = postgres_repositories(pool.clone());

    let batch_tag = Uuid::new_v4().to_string();
    let total_jobs = 60;
    let now = Utc::now();
    for i in 0..total_jobs {
        let job = Job::new(
            "TEST_NOTIFICATION",
            format!("{}:{}", batch_tag, i),
            JobPayload { detail: Some(batch_tag.clone()), ..Default::default() },
            now - Duration::minutes(1) + Duration::milliseconds(i as i64),
        );
        assert!(repos.jobs.create(&job).await.unwrap());
    }

    let worker_count = 8;
    let mut set = JoinSet::new();
    for _ in 0..worker_count {
        let jobs = repos.jobs.clone();
        let tag = batch_tag.clone();
        set.spawn(async move {
            let mut claimed = Vec::new();
            let mut empty_streaks = 0;
            while empty_streaks < 5 {
                let batch = jobs.find_pending(5).await.expect("Failed to fetch jobs");
                if batch.is_empty() {
                    empty_streaks += 1;
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    continue;
                }
                empty_streaks = 0;
                claimed.extend(
                    batch.into_iter()
                        .filter(|job| job.payload.detail.as_deref() == Some(tag.as_str()))
                        .map(|job| job.id),
                );
            }
            claimed
        });
    }

    let mut all_claimed = Vec::new();
    while let Some(res) = set.join_next().await {
        all_claimed.extend(res.unwrap());
    }
    let unique: HashSet<&String> = all_claimed.iter().collect();

    assert_eq!(unique.len(), all_claimed.len(), "A job was claimed by two workers");
    assert_eq!(all_claimed.len(), total_jobs);

    // Redelivering the same logical event never queues it twice.
    let duplicate = Job::new("TEST_NOTIFICATION", format!("{}:0", batch_tag), JobPayload::default(), now);
    assert!(!repos.jobs.create(&duplicate).await.unwrap());
}

use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use tokio::time::sleep;
use tracing::{error, info, info_span, Instrument};
use crate::state::AppState;

pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
const JOB_BATCH_SIZE: i32 = 10;
/// Draft sweeps run once every this many polls.
const REAP_EVERY_POLLS: u32 = 60;

pub async fn start_background_worker(state: Arc<AppState>) {
    info!("Starting background job worker...");

    let mut polls: u32 = 0;
    loop {
        run_pending_jobs(&state).await;

        if polls % REAP_EVERY_POLLS == 0 {
            reap_expired_drafts(&state).await;
        }
        polls = polls.wrapping_add(1);

        sleep(POLL_INTERVAL).await;
    }
}

/// Claims a batch of pending jobs and delivers each one. Returns how many were claimed.
pub async fn run_pending_jobs(state: &Arc<AppState>) -> usize {
    let jobs = match state.repos.jobs.find_pending(JOB_BATCH_SIZE).await {
        Ok(jobs) => jobs,
        Err(e) => {
            error!("Failed to fetch pending jobs: {:?}", e);
            return 0;
        }
    };
    let claimed = jobs.len();

    for job in jobs {
        let span = info_span!(
            "background_job",
            job_id = %job.id,
            job_type = %job.job_type,
        );

        async {
            info!("Processing job: {}", job.job_type);
            match state.notifications.process(&job).await {
                Ok(_) => {
                    info!("Job completed successfully");
                    if let Err(e) = state.repos.jobs.update_status(&job.id, "COMPLETED", None).await {
                        error!("Failed to mark job as completed: {:?}", e);
                    }
                }
                Err(e) => {
                    let err_msg = format!("{}", e);
                    error!("Job failed with error: {}", err_msg);
                    if let Err(up_err) = state.repos.jobs.update_status(&job.id, "FAILED", Some(err_msg)).await {
                        error!("Failed to mark job as failed: {:?}", up_err);
                    }
                }
            }
        }
            .instrument(span)
            .await;
    }

    claimed
}

/// Deletes expired drafts that never reached the gateway.
pub async fn reap_expired_drafts(state: &Arc<AppState>) -> u64 {
    match state.repos.drafts.delete_expired(Utc::now()).await {
        Ok(0) => 0,
        Ok(removed) => {
            info!(removed, "Reaped expired draft reservations");
            removed
        }
        Err(e) => {
            error!("Failed to reap expired drafts: {:?}", e);
            0
        }
    }
}

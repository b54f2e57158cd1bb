//! Document job worker.
//!
//! Workers poll the `document_processing_jobs` table, take an at-most-once
//! lease on the oldest queued job, and run the document processor. The
//! lease is a conditional update (`status = 'queued'` guard): whoever flips
//! the row to `processing` owns it, so jobs for the same document never run
//! twice concurrently. Failed attempts re-queue until the attempts budget
//! runs out, then the job goes terminal and the document is marked failed.
//!
//! The same loop runs in-process (spawned by the server binary) or inside
//! the standalone `worker` binary; the table is the contract.

use log::{error, info, warn};
use sqlx::mysql::MySqlPool;
use sqlx::Row;
use std::sync::Arc;
use std::time::Duration;

use crate::models::ProcessingJobRow;
use crate::services::processor::ProcessorContext;

/// Poll-lease-process loop. Runs until the process exits.
pub async fn run_worker(context: Arc<ProcessorContext>, poll_interval: Duration, worker_id: usize) {
    info!("Worker {} started (poll interval {:?})", worker_id, poll_interval);

    loop {
        match lease_next_job(&context.pool).await {
            Ok(Some(job)) => {
                info!(
                    "Worker {} leased job {} (document {}, attempt {}/{})",
                    worker_id, job.id, job.document_id, job.attempts, job.max_attempts
                );

                match context.process_document(&job.document_id).await {
                    Ok(()) => {
                        if let Err(e) = complete_job(&context.pool, &job).await {
                            error!("Worker {}: failed to complete job {}: {}", worker_id, job.id, e);
                        }
                    }
                    Err(e) => {
                        warn!(
                            "Worker {}: job {} attempt {} failed: {}",
                            worker_id, job.id, job.attempts, e
                        );
                        if let Err(record_err) =
                            record_failure(&context.pool, &job, &e.to_string()).await
                        {
                            error!(
                                "Worker {}: failed to record failure for job {}: {}",
                                worker_id, job.id, record_err
                            );
                        }
                    }
                }
            }
            Ok(None) => {
                tokio::time::sleep(poll_interval).await;
            }
            Err(e) => {
                error!("Worker {}: queue poll failed: {}", worker_id, e);
                tokio::time::sleep(poll_interval).await;
            }
        }
    }
}

/// Take an at-most-once lease on the oldest queued job.
///
/// The two-step select-then-conditional-update means a losing racer simply
/// sees zero affected rows and tries again on the next poll.
pub async fn lease_next_job(pool: &MySqlPool) -> Result<Option<ProcessingJobRow>, sqlx::Error> {
    let candidate = sqlx::query(
        "SELECT id FROM document_processing_jobs WHERE status = 'queued' ORDER BY created_at LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    let Some(candidate) = candidate else {
        return Ok(None);
    };
    let job_id: String = candidate.get("id");

    let leased = sqlx::query(
        "UPDATE document_processing_jobs
         SET status = 'processing', attempts = attempts + 1
         WHERE id = ? AND status = 'queued'",
    )
    .bind(&job_id)
    .execute(pool)
    .await?;

    if leased.rows_affected() != 1 {
        // Another worker won the race.
        return Ok(None);
    }

    let row = sqlx::query("SELECT * FROM document_processing_jobs WHERE id = ?")
        .bind(&job_id)
        .fetch_one(pool)
        .await?;
    Ok(Some(ProcessingJobRow::from_row(&row)?))
}

async fn complete_job(pool: &MySqlPool, job: &ProcessingJobRow) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE document_processing_jobs SET status = 'done', last_error = NULL WHERE id = ?")
        .bind(job.id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

/// Requeue within the attempts budget, otherwise mark the job terminal and
/// fail the document. The case itself is never failed by a document job.
async fn record_failure(
    pool: &MySqlPool,
    job: &ProcessingJobRow,
    message: &str,
) -> Result<(), sqlx::Error> {
    if job.attempts < job.max_attempts {
        sqlx::query(
            "UPDATE document_processing_jobs SET status = 'queued', last_error = ? WHERE id = ?",
        )
        .bind(message)
        .bind(job.id.to_string())
        .execute(pool)
        .await?;
        return Ok(());
    }

    sqlx::query(
        "UPDATE document_processing_jobs SET status = 'failed', last_error = ? WHERE id = ?",
    )
    .bind(message)
    .bind(job.id.to_string())
    .execute(pool)
    .await?;

    sqlx::query("UPDATE documents SET status = 'failed' WHERE id = ?")
        .bind(job.document_id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

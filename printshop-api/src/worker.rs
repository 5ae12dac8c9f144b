use printshop_order::ReconcileOutcome;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::state::AppState;

/// Counters for one pass of the retry worker
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RetrySummary {
    pub candidates: usize,
    pub submitted: usize,
    pub failed: usize,
    pub locked: usize,
    pub errors: usize,
}

pub async fn start_retry_worker(state: AppState) {
    let mut ticker = tokio::time::interval(state.retry.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        interval_seconds = state.retry.interval.as_secs(),
        max_attempts = state.retry.max_attempts,
        "Reconciliation retry worker started"
    );

    loop {
        ticker.tick().await;
        match run_retry_pass(&state).await {
            Ok(summary) if summary.candidates > 0 => info!(?summary, "Retry pass finished"),
            Ok(_) => {}
            Err(e) => error!("Retry pass failed: {:#}", e),
        }
    }
}

/// Reconcile every paid or failed order that was never dispatched and still
/// has attempts left.
pub async fn run_retry_pass(state: &AppState) -> anyhow::Result<RetrySummary> {
    let orders = state
        .orders
        .list_retry_candidates(state.retry.max_attempts, state.retry.batch_size)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    let mut summary = RetrySummary::default();
    for order in orders {
        summary.candidates += 1;

        let token = match state.locks.acquire(order.id).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                summary.locked += 1;
                continue;
            }
            Err(e) => {
                summary.errors += 1;
                error!(order_id = order.id, error = %e, "Could not take order lock");
                continue;
            }
        };

        match tokio::time::timeout(state.lock_deadline, state.reconciler.reconcile(order.id)).await {
            Ok(Ok(ReconcileOutcome::Submitted { .. } | ReconcileOutcome::AlreadyReconciled { .. })) => {
                summary.submitted += 1
            }
            Ok(Ok(ReconcileOutcome::Failed { failure, .. })) => {
                summary.failed += 1;
                if order.reconcile_attempts + 1 >= state.retry.max_attempts {
                    warn!(order_id = order.id, %failure, "Order exhausted automatic retries");
                }
            }
            Ok(Err(e)) => {
                summary.errors += 1;
                error!(order_id = order.id, error = %e, "Retry reconcile errored");
            }
            Err(_) => {
                summary.errors += 1;
                error!(
                    order_id = order.id,
                    deadline_ms = state.lock_deadline.as_millis() as u64,
                    "Retry reconcile abandoned at lock deadline"
                );
            }
        }

        if let Err(e) = state.locks.release(token).await {
            warn!(order_id = order.id, error = %e, "Failed to release order lock");
        }
    }
    Ok(summary)
}

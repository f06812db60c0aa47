//! Bounded concurrent candidate lookups
//!
//! Candidate lookups have no data dependency on each other, so they run
//! concurrently, at most `max_in_flight` at a time. The first fatal error
//! cancels the remaining lookups and fails the request: no partial result.

use futures::stream::{self, StreamExt, TryStreamExt};
use recommender_core::{AdapterError, AdapterResult, EntityId, RecommendResult, StoreKind};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-request limits taken from configuration
#[derive(Debug, Clone, Copy)]
pub struct FanOutLimits {
    pub max_in_flight: usize,
    pub timeout: Option<Duration>,
}

impl Default for FanOutLimits {
    fn default() -> Self {
        Self {
            max_in_flight: 16,
            timeout: None,
        }
    }
}

/// Result of scoring one candidate
#[derive(Debug)]
pub enum CandidateOutcome<T> {
    Scored(T),
    /// Lookup failed without taking the store down; candidate is dropped
    Skipped { reason: String },
}

/// Run one adapter call under the optional per-call timeout
pub async fn with_timeout<T, F>(
    timeout: Option<Duration>,
    store: StoreKind,
    operation: &str,
    call: F,
) -> AdapterResult<T>
where
    F: Future<Output = AdapterResult<T>>,
{
    match timeout {
        None => call.await,
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(AdapterError::Timeout {
                store,
                operation: operation.to_string(),
                timeout_ms: limit.as_millis() as u64,
            }),
        },
    }
}

/// Store unreachable is fatal; anything else excludes only this candidate
pub fn triage_candidate_failure<T>(
    candidate: &EntityId,
    error: AdapterError,
) -> RecommendResult<CandidateOutcome<T>> {
    if error.is_unavailable() {
        return Err(error.into());
    }

    warn!(candidate = %candidate, error = %error, "Candidate lookup failed, excluding");
    Ok(CandidateOutcome::Skipped {
        reason: error.to_string(),
    })
}

/// Score every candidate concurrently; skipped candidates are left out
pub async fn fan_out<T, F, Fut>(
    candidates: Vec<EntityId>,
    limits: FanOutLimits,
    lookup: F,
) -> RecommendResult<Vec<(EntityId, T)>>
where
    F: Fn(EntityId) -> Fut,
    Fut: Future<Output = RecommendResult<CandidateOutcome<T>>>,
{
    let total = candidates.len();

    let outcomes: Vec<(EntityId, CandidateOutcome<T>)> = stream::iter(candidates)
        .map(|candidate| {
            let pending = lookup(candidate.clone());
            async move { pending.await.map(|outcome| (candidate, outcome)) }
        })
        .buffer_unordered(limits.max_in_flight.max(1))
        .try_collect()
        .await?;

    let mut scored = Vec::with_capacity(outcomes.len());
    let mut skipped = 0usize;
    for (candidate, outcome) in outcomes {
        match outcome {
            CandidateOutcome::Scored(value) => scored.push((candidate, value)),
            CandidateOutcome::Skipped { .. } => skipped += 1,
        }
    }

    debug!(
        items_count = total as u64,
        scored = scored.len() as u64,
        skipped = skipped as u64,
        "Candidate fan-out finished"
    );

    Ok(scored)
}

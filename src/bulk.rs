//! Bounded-concurrency bulk issuance.
//!
//! One coordinator owns the task set. It submits work until `workers`
//! tasks are outstanding and submits one replacement per completion.

use crate::error::Error;
use crate::utils::Validatable;
use crate::CredxResult;
use log::{debug, error, info, trace};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

const PROGRESS_INTERVAL: usize = 100;

/// How much to issue and how many tasks may run at once
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PoolConfig {
    /// The number of results to produce
    pub target: usize,
    /// The maximum number of tasks in flight
    pub workers: usize,
}

impl Validatable for PoolConfig {
    fn validate(&self) -> CredxResult<()> {
        if self.workers == 0 {
            return Err(Error::InvalidInput(
                "pool needs at least one worker".to_string(),
            ));
        }
        Ok(())
    }
}

/// What a bulk run produced
#[derive(Clone, Debug)]
pub struct BulkReport<T> {
    /// One result per submission, in submission order
    pub results: Vec<T>,
    /// Wall clock time of the run
    pub elapsed: Duration,
    /// `elapsed` divided by the number of results
    pub average: Duration,
    /// The most tasks that were outstanding at once
    pub peak_in_flight: usize,
}

/// Run `issue` for every index in `0..config.target` with at most
/// `config.workers` calls outstanding.
///
/// The first failure stops submissions and is returned.
pub async fn issue_many<T, F>(config: PoolConfig, issue: F) -> CredxResult<BulkReport<T>>
where
    T: Send + 'static,
    F: Fn(usize) -> CredxResult<T> + Send + Sync + 'static,
{
    config.validate()?;
    trace!("issue_many >>> config: {:?}", config);
    let issue = Arc::new(issue);
    let started = Instant::now();
    let mut tasks = JoinSet::new();
    let mut results: Vec<Option<T>> = Vec::with_capacity(config.target);
    results.resize_with(config.target, || None);
    let mut submitted = 0usize;
    let mut completed = 0usize;
    let mut peak_in_flight = 0usize;

    loop {
        while submitted < config.target && tasks.len() < config.workers {
            let issue = issue.clone();
            let index = submitted;
            tasks.spawn_blocking(move || (index, issue(index)));
            submitted += 1;
            peak_in_flight = peak_in_flight.max(tasks.len());
            if submitted % PROGRESS_INTERVAL == 0 {
                info!("submitted {} of {}", submitted, config.target);
            }
        }

        let joined = match tasks.join_next().await {
            Some(joined) => joined,
            None => break,
        };
        let (index, result) = match joined {
            Ok(done) => done,
            Err(e) => {
                error!("issuance task did not finish: {}", e);
                tasks.abort_all();
                return Err(Error::General("issuance task failed"));
            }
        };
        match result {
            Ok(value) => {
                results[index] = Some(value);
                completed += 1;
                debug!("task {} done, {} in flight", index, tasks.len());
            }
            Err(e) => {
                tasks.abort_all();
                return Err(e);
            }
        }
    }

    let results = results.into_iter().flatten().collect::<Vec<T>>();
    if results.len() != config.target || completed != config.target {
        return Err(Error::General("bulk issuance lost results"));
    }
    let elapsed = started.elapsed();
    let average = if results.is_empty() {
        Duration::ZERO
    } else {
        elapsed / results.len() as u32
    };
    info!(
        "issued {} in {:?} ({:?} each, peak {} in flight)",
        results.len(),
        elapsed,
        average,
        peak_in_flight
    );
    Ok(BulkReport {
        results,
        elapsed,
        average,
        peak_in_flight,
    })
}

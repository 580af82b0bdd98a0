use crate::history::{RecentHistory, RoundRecord, SavedRound};
use crate::store::{HistoryStore, StoreError};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

struct SaveJob {
    local_id: u64,
    record: RoundRecord,
}

/// Result of handing one round to the store
#[derive(Debug)]
pub struct SaveOutcome {
    pub local_id: u64,
    pub result: Result<SavedRound, StoreError>,
}

/// Saves finished rounds on a worker thread so the UI never waits on the store
pub struct HistorySaver {
    jobs: Option<Sender<SaveJob>>,
    outcomes: Receiver<SaveOutcome>,
    worker: Option<JoinHandle<()>>,
}

impl HistorySaver {
    pub fn spawn<S: HistoryStore + Send + 'static>(mut store: S) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<SaveJob>();
        let (outcome_tx, outcome_rx) = mpsc::channel();

        let worker = thread::spawn(move || {
            for job in job_rx {
                let result = store.save(&job.record);
                let outcome = SaveOutcome {
                    local_id: job.local_id,
                    result,
                };
                if outcome_tx.send(outcome).is_err() {
                    break;
                }
            }
        });

        Self {
            jobs: Some(job_tx),
            outcomes: outcome_rx,
            worker: Some(worker),
        }
    }

    /// Queue a save. Returns false if the worker is gone.
    pub fn submit(&self, local_id: u64, record: RoundRecord) -> bool {
        match &self.jobs {
            Some(tx) => tx.send(SaveJob { local_id, record }).is_ok(),
            None => false,
        }
    }

    /// Completed saves, without blocking
    pub fn poll(&self) -> Vec<SaveOutcome> {
        self.outcomes.try_iter().collect()
    }

    /// Let queued saves finish, then stop the worker
    pub fn shutdown(mut self) -> Vec<SaveOutcome> {
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.poll()
    }
}

impl Drop for HistorySaver {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Apply a save outcome to the recent-history list. Failures keep the local copy.
pub fn reconcile(history: &mut RecentHistory, outcome: SaveOutcome) {
    match outcome.result {
        Ok(saved) => {
            let id = saved.id;
            if !history.confirm(outcome.local_id, saved) {
                tracing::debug!(id, "saved round no longer in recent history");
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not save round, keeping local copy");
            history.mark_local_only(outcome.local_id);
        }
    }
}

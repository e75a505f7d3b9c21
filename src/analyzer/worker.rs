use std::collections::{HashSet, VecDeque};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};

use rand::Rng;
use tracing::debug;

use super::{Analysis, Analyzer, TextGenerator, Ticket};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisJob {
    pub ticket: Ticket,
    pub spoken: String,
    pub reference: String,
}

#[derive(Debug)]
pub struct AnalysisOutcome {
    pub ticket: Ticket,
    pub analysis: Analysis,
}

/// Where the controller sends analysis requests and collects results.
pub trait AnalysisPort {
    fn submit(&mut self, job: AnalysisJob);
    /// Best effort: a cancelled job is skipped if it has not started yet.
    fn cancel(&mut self, ticket: Ticket);
    fn poll(&mut self) -> Option<AnalysisOutcome>;
}

/// Runs analyses one at a time on a background thread.
pub struct AnalysisWorker {
    jobs: Sender<AnalysisJob>,
    results: Receiver<AnalysisOutcome>,
    cancelled: Arc<Mutex<HashSet<Ticket>>>,
}

impl AnalysisWorker {
    pub fn spawn<G, R>(mut analyzer: Analyzer<G, R>) -> Self
    where
        G: TextGenerator + 'static,
        R: Rng + Send + 'static,
    {
        let (job_tx, job_rx) = mpsc::channel::<AnalysisJob>();
        let (result_tx, result_rx) = mpsc::channel();
        let cancelled = Arc::new(Mutex::new(HashSet::new()));
        let skip = Arc::clone(&cancelled);

        std::thread::spawn(move || {
            for job in job_rx {
                let was_cancelled = skip
                    .lock()
                    .map(|mut set| set.remove(&job.ticket))
                    .unwrap_or(false);
                if was_cancelled {
                    debug!(ticket = %job.ticket, "skipping cancelled analysis");
                    continue;
                }

                let analysis = analyzer.analyze(&job.spoken, &job.reference);
                let outcome = AnalysisOutcome {
                    ticket: job.ticket,
                    analysis,
                };
                if result_tx.send(outcome).is_err() {
                    break;
                }
            }
        });

        Self {
            jobs: job_tx,
            results: result_rx,
            cancelled,
        }
    }
}

impl AnalysisPort for AnalysisWorker {
    fn submit(&mut self, job: AnalysisJob) {
        if self.jobs.send(job).is_err() {
            debug!("analysis worker has stopped");
        }
    }

    fn cancel(&mut self, ticket: Ticket) {
        if let Ok(mut set) = self.cancelled.lock() {
            set.insert(ticket);
        }
    }

    fn poll(&mut self) -> Option<AnalysisOutcome> {
        match self.results.try_recv() {
            Ok(outcome) => {
                if let Ok(mut set) = self.cancelled.lock() {
                    set.remove(&outcome.ticket);
                }
                Some(outcome)
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

/// Analyzes on submit, on the calling thread. Results are handed out by
/// `poll` in submission order.
pub struct InlineAnalysis<G, R> {
    analyzer: Analyzer<G, R>,
    ready: VecDeque<AnalysisOutcome>,
}

impl<G: TextGenerator, R: Rng> InlineAnalysis<G, R> {
    pub fn new(analyzer: Analyzer<G, R>) -> Self {
        Self {
            analyzer,
            ready: VecDeque::new(),
        }
    }

    pub fn pending(&self) -> usize {
        self.ready.len()
    }
}

impl<G: TextGenerator, R: Rng> AnalysisPort for InlineAnalysis<G, R> {
    fn submit(&mut self, job: AnalysisJob) {
        let analysis = self.analyzer.analyze(&job.spoken, &job.reference);
        self.ready.push_back(AnalysisOutcome {
            ticket: job.ticket,
            analysis,
        });
    }

    fn cancel(&mut self, ticket: Ticket) {
        self.ready.retain(|o| o.ticket != ticket);
    }

    fn poll(&mut self) -> Option<AnalysisOutcome> {
        self.ready.pop_front()
    }
}

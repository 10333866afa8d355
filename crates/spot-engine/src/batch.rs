//! Concurrent batch price analysis
//!
//! A fixed pool of workers pulls instance types from a shared job channel.
//! Each worker performs one timed price lookup per job and sends the outcome
//! to a single aggregator, which is the only place the result map is built.
//! Failures are collected, not retried.

use crate::error::ProviderError;
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::providers::{PriceAnalysis, PriceHistoryProvider};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Default number of concurrent workers
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Configuration for batch price analysis
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Number of workers
    pub concurrency: usize,
    /// Deadline for one price lookup
    pub timeout: Duration,
    pub lookback_days: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: Duration::from_secs(5),
            lookback_days: 7,
        }
    }
}

/// An instance type whose lookup failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub instance_type: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    pub analyses: HashMap<String, PriceAnalysis>,
    /// Sorted by instance type
    pub failed: Vec<BatchFailure>,
    #[serde(skip)]
    pub elapsed: Duration,
}

type JobOutcome = (String, Result<PriceAnalysis, ProviderError>);

/// Runs price lookups for many instance types with bounded concurrency
pub struct BatchPriceAnalyzer {
    provider: Arc<dyn PriceHistoryProvider>,
    config: BatchConfig,
    metrics: Option<EngineMetrics>,
    logger: StructuredLogger,
}

impl BatchPriceAnalyzer {
    pub fn new(provider: Arc<dyn PriceHistoryProvider>, config: BatchConfig) -> Self {
        Self {
            provider,
            config,
            metrics: None,
            logger: StructuredLogger::default(),
        }
    }

    pub fn with_metrics(mut self, metrics: EngineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Analyze every distinct instance type; never fails as a whole
    pub async fn run(&self, instance_types: &[String]) -> BatchResult {
        let started = Instant::now();
        let jobs: BTreeSet<String> = instance_types.iter().cloned().collect();
        let mut result = BatchResult::default();

        if jobs.is_empty() {
            return result;
        }

        if !self.provider.is_available() {
            warn!(count = jobs.len(), "Price history provider unavailable, batch skipped");
            result.failed = jobs
                .into_iter()
                .map(|instance_type| BatchFailure {
                    instance_type,
                    error: "price history provider unavailable".to_string(),
                })
                .collect();
            result.elapsed = started.elapsed();
            return result;
        }

        let requested = jobs.len();
        let (job_tx, job_rx) = mpsc::channel::<String>(requested);
        for job in jobs {
            // capacity equals the job count, so this never waits
            if job_tx.send(job).await.is_err() {
                break;
            }
        }
        drop(job_tx);

        let job_rx = Arc::new(Mutex::new(job_rx));
        let workers = self.config.concurrency.clamp(1, requested);
        let (result_tx, mut result_rx) = mpsc::channel::<JobOutcome>(workers * 2);

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            handles.push(tokio::spawn(worker(
                worker_id,
                self.provider.clone(),
                job_rx.clone(),
                result_tx.clone(),
                self.config.timeout,
                self.config.lookback_days,
            )));
        }
        drop(result_tx);

        while let Some((instance_type, outcome)) = result_rx.recv().await {
            match outcome {
                Ok(analysis) => {
                    result.analyses.insert(instance_type, analysis);
                }
                Err(e) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.inc_provider_failures("get_price_analysis");
                    }
                    result.failed.push(BatchFailure {
                        instance_type,
                        error: e.to_string(),
                    });
                }
            }
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Batch worker terminated abnormally");
            }
        }

        result.failed.sort_by(|a, b| a.instance_type.cmp(&b.instance_type));
        result.elapsed = started.elapsed();
        self.logger.log_batch_completed(
            requested,
            result.analyses.len(),
            result.failed.len(),
            result.elapsed.as_millis(),
        );
        result
    }
}

async fn worker(
    worker_id: usize,
    provider: Arc<dyn PriceHistoryProvider>,
    jobs: Arc<Mutex<mpsc::Receiver<String>>>,
    results: mpsc::Sender<JobOutcome>,
    timeout: Duration,
    lookback_days: u32,
) {
    loop {
        // The guard is held across `recv`. The channel is filled and closed
        // before any worker starts, so `recv` never waits on a sender.
        let next = {
            let mut rx = jobs.lock().await;
            rx.recv().await
        };
        let Some(instance_type) = next else {
            break;
        };

        let outcome =
            match tokio::time::timeout(timeout, provider.get_price_analysis(&instance_type, lookback_days)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ProviderError::Timeout {
                    operation: "get_price_analysis",
                    elapsed: timeout,
                }),
            };
        debug!(worker_id, instance_type = %instance_type, ok = outcome.is_ok(), "Batch job done");

        if results.send((instance_type, outcome)).await.is_err() {
            break;
        }
    }
}

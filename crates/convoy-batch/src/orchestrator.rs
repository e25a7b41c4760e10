//! Batch Orchestrator (§4.9) — composes the Client Adapter, Aggregator,
//! and Cost Optimizer into a managed job lifecycle.

use std::future::Future;
use std::io::BufReader;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};

use crate::aggregator::aggregate;
use crate::client::ClientAdapter;
use crate::cost::{estimate_cost, PriceTable};
use crate::error::BatchError;
use crate::model::{AggregatedResult, BatchJob, BatchRequest, CostEstimate, JobStatus, SubmitOptions};

/// Default poll interval honored to within ±20% (§4.9).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

pub struct BatchOrchestrator {
    client: Arc<dyn ClientAdapter>,
    poll_interval: Duration,
    prices: PriceTable,
    cost_optimize: bool,
}

impl BatchOrchestrator {
    pub fn new(client: Arc<dyn ClientAdapter>) -> Self {
        Self { client, poll_interval: DEFAULT_POLL_INTERVAL, prices: PriceTable::default(), cost_optimize: true }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_price_table(mut self, prices: PriceTable) -> Self {
        self.prices = prices;
        self
    }

    pub fn with_cost_optimize(mut self, enabled: bool) -> Self {
        self.cost_optimize = enabled;
        self
    }

    pub fn estimate(&self, requests: &[BatchRequest]) -> Option<CostEstimate> {
        self.cost_optimize.then(|| estimate_cost(requests, &self.prices))
    }

    /// Submits `requests`. When `wait` is false, returns the accepted job
    /// immediately; when true, polls until a terminal status is reached
    /// and returns that terminal job (§4.9).
    pub async fn submit(
        &self,
        requests: &[BatchRequest],
        options: &SubmitOptions,
        wait: bool,
    ) -> Result<BatchJob, BatchError> {
        if requests.is_empty() {
            return Err(BatchError::Validation("batch submission requires at least one request".to_string()));
        }

        if let Some(estimate) = self.estimate(requests) {
            info!(
                estimated_cost = estimate.estimated_cost,
                tokens_in = estimate.tokens_in,
                tokens_out = estimate.tokens_out,
                "submitting batch"
            );
        }

        let job = self.client.submit(requests, options).await?;
        if !wait {
            return Ok(job);
        }
        self.wait(&job.id, std::future::pending()).await
    }

    /// Polls `Status(id)` at `poll_interval` until a terminal status is
    /// observed. Returns `Ok` for `completed`, `Err` for
    /// `failed`/`expired`/`cancelled`. Never returns before the tick on
    /// which the terminal state is first seen, unless `cancel` resolves
    /// first, in which case `WaitCancelled` is returned immediately
    /// without waiting for the in-flight poll to finish (§4.9/§5).
    ///
    /// Pass `std::future::pending()` for `cancel` to wait unconditionally.
    pub async fn wait(&self, id: &str, cancel: impl Future<Output = ()>) -> Result<BatchJob, BatchError> {
        tokio::pin!(cancel);
        loop {
            tokio::select! {
                biased;
                _ = &mut cancel => {
                    return Err(BatchError::WaitCancelled(id.to_string()));
                }
                status = self.client.status(id) => {
                    let job = status?;
                    debug!(job_id = id, status = ?job.status, "polled batch job");

                    if job.status.is_terminal() {
                        return match job.status {
                            JobStatus::Completed => Ok(job),
                            JobStatus::Failed => Err(BatchError::JobFailed {
                                id: id.to_string(),
                                detail: "batch job failed".to_string(),
                            }),
                            JobStatus::Expired => Err(BatchError::JobExpired(id.to_string())),
                            JobStatus::Cancelled => Err(BatchError::JobCancelled(id.to_string())),
                            _ => unreachable!("is_terminal() guarantees one of the above"),
                        };
                    }
                }
            }

            tokio::select! {
                biased;
                _ = &mut cancel => return Err(BatchError::WaitCancelled(id.to_string())),
                _ = sleep(self.poll_interval) => {}
            }
        }
    }

    /// Fetches and aggregates the results of a completed job. Errors if
    /// the job has not reached `completed` (§4.9).
    pub async fn results(&self, id: &str) -> Result<AggregatedResult, BatchError> {
        let job = self.client.status(id).await?;
        if job.status != JobStatus::Completed {
            return Err(BatchError::JobNotReady(id.to_string()));
        }

        let results = self.client.results(id).await?;
        let errors = self.client.errors(id).await?.unwrap_or_default();
        Ok(aggregate(BufReader::new(results.as_slice()), BufReader::new(errors.as_slice())))
    }

    /// Returns the parsed error map for a completed job: empty when there
    /// were no errors, an error when the job's status makes errors
    /// unavailable (§4.9).
    pub async fn errors(&self, id: &str) -> Result<std::collections::HashMap<String, String>, BatchError> {
        let job = self.client.status(id).await?;
        match job.status {
            JobStatus::Completed => match self.client.errors(id).await? {
                Some(bytes) => Ok(aggregate(BufReader::new(&[][..]), BufReader::new(bytes.as_slice())).errors),
                None => Ok(std::collections::HashMap::new()),
            },
            JobStatus::Cancelled => Err(BatchError::JobCancelled(id.to_string())),
            _ => Err(BatchError::JobNotReady(id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ListFilter, RequestCounts};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedClient {
        statuses: Mutex<Vec<BatchJob>>,
        results_bytes: Vec<u8>,
        errors_bytes: Option<Vec<u8>>,
    }

    fn job(id: &str, status: JobStatus) -> BatchJob {
        BatchJob {
            id: id.to_string(),
            status,
            input_file_id: "file_in".to_string(),
            output_file_id: None,
            error_file_id: None,
            created_at: chrono::Utc::now(),
            completed_at: None,
            request_counts: RequestCounts::default(),
            metadata: Default::default(),
        }
    }

    #[async_trait]
    impl ClientAdapter for ScriptedClient {
        async fn submit(&self, _requests: &[BatchRequest], _options: &SubmitOptions) -> Result<BatchJob, BatchError> {
            Ok(self.statuses.lock().unwrap().first().cloned().unwrap())
        }
        async fn status(&self, _id: &str) -> Result<BatchJob, BatchError> {
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                Ok(statuses.remove(0))
            } else {
                Ok(statuses[0].clone())
            }
        }
        async fn results(&self, _id: &str) -> Result<Vec<u8>, BatchError> {
            Ok(self.results_bytes.clone())
        }
        async fn errors(&self, _id: &str) -> Result<Option<Vec<u8>>, BatchError> {
            Ok(self.errors_bytes.clone())
        }
        async fn cancel(&self, _id: &str) -> Result<(), BatchError> {
            Ok(())
        }
        async fn list(&self, _filter: &ListFilter) -> Result<Vec<BatchJob>, BatchError> {
            Ok(self.statuses.lock().unwrap().clone())
        }
    }

    #[tokio::test]
    async fn wait_returns_on_the_tick_the_terminal_state_is_observed() {
        let client = Arc::new(ScriptedClient {
            statuses: Mutex::new(vec![
                job("b1", JobStatus::InProgress),
                job("b1", JobStatus::InProgress),
                job("b1", JobStatus::Completed),
            ]),
            results_bytes: Vec::new(),
            errors_bytes: None,
        });
        let orchestrator = BatchOrchestrator::new(client).with_poll_interval(Duration::from_millis(1));
        let job = orchestrator.wait("b1", std::future::pending()).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn wait_surfaces_terminal_failure() {
        let client = Arc::new(ScriptedClient {
            statuses: Mutex::new(vec![job("b1", JobStatus::Failed)]),
            results_bytes: Vec::new(),
            errors_bytes: None,
        });
        let orchestrator = BatchOrchestrator::new(client);
        let err = orchestrator.wait("b1", std::future::pending()).await.unwrap_err();
        assert!(matches!(err, BatchError::JobFailed { .. }));
    }

    #[tokio::test]
    async fn wait_returns_cancelled_immediately_without_waiting_for_terminal_state() {
        let client = Arc::new(ScriptedClient {
            statuses: Mutex::new(vec![job("b1", JobStatus::InProgress)]),
            results_bytes: Vec::new(),
            errors_bytes: None,
        });
        let orchestrator = BatchOrchestrator::new(client).with_poll_interval(Duration::from_secs(3600));
        let err = orchestrator.wait("b1", async {}).await.unwrap_err();
        assert!(matches!(err, BatchError::WaitCancelled(id) if id == "b1"));
    }

    #[tokio::test]
    async fn results_errors_when_job_not_completed() {
        let client = Arc::new(ScriptedClient {
            statuses: Mutex::new(vec![job("b1", JobStatus::InProgress)]),
            results_bytes: Vec::new(),
            errors_bytes: None,
        });
        let orchestrator = BatchOrchestrator::new(client);
        let err = orchestrator.results("b1").await.unwrap_err();
        assert!(matches!(err, BatchError::JobNotReady(_)));
    }

    #[tokio::test]
    async fn errors_returns_empty_map_when_completed_with_no_error_file() {
        let client = Arc::new(ScriptedClient {
            statuses: Mutex::new(vec![job("b1", JobStatus::Completed)]),
            results_bytes: Vec::new(),
            errors_bytes: None,
        });
        let orchestrator = BatchOrchestrator::new(client);
        let errors = orchestrator.errors("b1").await.unwrap();
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn results_aggregates_from_client_artifacts() {
        let result_line = json!({
            "id": "r1", "custom_id": "ok1",
            "response": {"status_code": 200, "request_id": "req_1", "body": {
                "id": "resp_1", "object": "chat.completion", "created": 0, "model": "gpt-5.1",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "hi"}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
            }}
        });
        let client = Arc::new(ScriptedClient {
            statuses: Mutex::new(vec![job("b1", JobStatus::Completed)]),
            results_bytes: format!("{result_line}\n").into_bytes(),
            errors_bytes: None,
        });
        let orchestrator = BatchOrchestrator::new(client);
        let aggregated = orchestrator.results("b1").await.unwrap();
        assert_eq!(aggregated.successes(), 1);
        assert_eq!(aggregated.content["ok1"], "hi");
    }

    #[test]
    fn estimate_is_none_when_cost_optimize_disabled() {
        let client: Arc<dyn ClientAdapter> = Arc::new(ScriptedClient {
            statuses: Mutex::new(vec![job("b1", JobStatus::Completed)]),
            results_bytes: Vec::new(),
            errors_bytes: None,
        });
        let orchestrator = BatchOrchestrator::new(client).with_cost_optimize(false);
        assert!(orchestrator.estimate(&[]).is_none());
    }
}

pub mod aggregator;
pub mod client;
pub mod cost;
pub mod encoder;
pub mod error;
pub mod model;
pub mod orchestrator;

pub use aggregator::aggregate;
pub use client::{ClientAdapter, HttpClientAdapter};
pub use cost::{estimate_cost, PriceTable, BATCH_DISCOUNT};
pub use encoder::{encode, encode_to};
pub use error::BatchError;
pub use model::{
    AggregatedResult, BatchJob, BatchRequest, BatchToolCall, CostEstimate, ItemUsage, JobStatus,
    ListFilter, RequestCounts, SubmitOptions,
};
pub use orchestrator::{BatchOrchestrator, DEFAULT_POLL_INTERVAL};

//! Batch Client Adapter (§4.6) — thin wrapper around the provider's
//! file-upload and batch-creation endpoints. The Orchestrator depends only
//! on this trait, never on a concrete HTTP client (design §9).

use async_trait::async_trait;

use crate::encoder::encode;
use crate::error::BatchError;
use crate::model::{BatchJob, BatchRequest, ListFilter, SubmitOptions};

#[async_trait]
pub trait ClientAdapter: Send + Sync {
    async fn submit(&self, requests: &[BatchRequest], options: &SubmitOptions) -> Result<BatchJob, BatchError>;
    async fn status(&self, id: &str) -> Result<BatchJob, BatchError>;
    async fn results(&self, id: &str) -> Result<Vec<u8>, BatchError>;
    async fn errors(&self, id: &str) -> Result<Option<Vec<u8>>, BatchError>;
    async fn cancel(&self, id: &str) -> Result<(), BatchError>;
    async fn list(&self, filter: &ListFilter) -> Result<Vec<BatchJob>, BatchError>;
}

/// Reference HTTP implementation. Picks the batch endpoint tag by
/// scanning every request's URL path: the `"responses"` endpoint if any
/// request targets it, otherwise `"chat"` (§4.6).
pub struct HttpClientAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpClientAdapter {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into(), api_key: api_key.into() }
    }

    fn endpoint_tag(requests: &[BatchRequest]) -> &'static str {
        if requests.iter().any(|req| req.url.contains("responses")) {
            "responses"
        } else {
            "chat"
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(&self.api_key)
    }
}

#[async_trait]
impl ClientAdapter for HttpClientAdapter {
    async fn submit(&self, requests: &[BatchRequest], options: &SubmitOptions) -> Result<BatchJob, BatchError> {
        if requests.is_empty() {
            return Err(BatchError::Validation("batch submission requires at least one request".to_string()));
        }

        let encoded = encode(requests)?;
        let form = reqwest::multipart::Form::new()
            .text("purpose", "batch")
            .part("file", reqwest::multipart::Part::bytes(encoded).file_name("batch_input.jsonl"));

        let upload = self
            .authed(self.client.post(self.url("files")))
            .multipart(form)
            .send()
            .await?;
        if !upload.status().is_success() {
            return Err(BatchError::Protocol(format!("file upload failed: {}", upload.status())));
        }
        let uploaded: serde_json::Value = upload.json().await?;
        let input_file_id = uploaded
            .get("id")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| BatchError::Protocol("file upload response missing id".to_string()))?;

        let body = serde_json::json!({
            "input_file_id": input_file_id,
            "endpoint": format!("/v1/{}", Self::endpoint_tag(requests)),
            "completion_window": options.completion_window.clone().unwrap_or_else(|| "24h".to_string()),
            "metadata": options.metadata,
        });

        let created = self
            .authed(self.client.post(self.url("batches")))
            .json(&body)
            .send()
            .await?;
        if !created.status().is_success() {
            return Err(BatchError::Protocol(format!("batch creation failed: {}", created.status())));
        }
        created.json::<BatchJob>().await.map_err(BatchError::from)
    }

    async fn status(&self, id: &str) -> Result<BatchJob, BatchError> {
        let response = self.authed(self.client.get(self.url(&format!("batches/{id}")))).send().await?;
        if !response.status().is_success() {
            return Err(BatchError::Protocol(format!("status fetch failed: {}", response.status())));
        }
        response.json::<BatchJob>().await.map_err(BatchError::from)
    }

    async fn results(&self, id: &str) -> Result<Vec<u8>, BatchError> {
        let job = self.status(id).await?;
        match (&job.output_file_id, &job.error_file_id) {
            (Some(file_id), _) => self.fetch_file(file_id).await,
            (None, Some(error_file_id)) => Err(BatchError::Protocol(format!(
                "job {id} has no output file; {} of {} requests failed (error file {error_file_id})",
                job.request_counts.failed, job.request_counts.total
            ))),
            (None, None) => Err(BatchError::JobNotReady(id.to_string())),
        }
    }

    async fn errors(&self, id: &str) -> Result<Option<Vec<u8>>, BatchError> {
        let job = self.status(id).await?;
        match &job.error_file_id {
            Some(file_id) => Ok(Some(self.fetch_file(file_id).await?)),
            None => Ok(None),
        }
    }

    async fn cancel(&self, id: &str) -> Result<(), BatchError> {
        let response = self.authed(self.client.post(self.url(&format!("batches/{id}/cancel")))).send().await?;
        if !response.status().is_success() && response.status().as_u16() != 404 {
            return Err(BatchError::Protocol(format!("cancel failed: {}", response.status())));
        }
        Ok(())
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<BatchJob>, BatchError> {
        let mut request = self.authed(self.client.get(self.url("batches")));
        if let Some(after) = &filter.after {
            request = request.query(&[("after", after.as_str())]);
        }
        if let Some(limit) = filter.limit {
            request = request.query(&[("limit", limit.to_string())]);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(BatchError::Protocol(format!("list failed: {}", response.status())));
        }
        let page: serde_json::Value = response.json().await?;
        let jobs = page
            .get("data")
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| BatchError::Protocol("list response missing data array".to_string()))?;
        jobs.iter()
            .map(|v| serde_json::from_value(v.clone()).map_err(|e| BatchError::Protocol(e.to_string())))
            .collect()
    }
}

impl HttpClientAdapter {
    async fn fetch_file(&self, file_id: &str) -> Result<Vec<u8>, BatchError> {
        let response = self
            .authed(self.client.get(self.url(&format!("files/{file_id}/content"))))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(BatchError::Protocol(format!("file fetch failed: {}", response.status())));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BatchRequest;
    use serde_json::json;

    #[test]
    fn endpoint_tag_is_responses_if_any_request_targets_it() {
        let requests = vec![
            BatchRequest::new("a", "/v1/chat/completions", json!({})),
            BatchRequest::new("b", "/v1/responses", json!({})),
        ];
        assert_eq!(HttpClientAdapter::endpoint_tag(&requests), "responses");

        let requests = vec![BatchRequest::new("a", "/v1/responses", json!({}))];
        assert_eq!(HttpClientAdapter::endpoint_tag(&requests), "responses");
    }

    #[test]
    fn endpoint_tag_is_chat_when_no_request_targets_responses() {
        let requests = vec![
            BatchRequest::new("a", "/v1/chat/completions", json!({})),
            BatchRequest::new("b", "/v1/chat/completions", json!({})),
        ];
        assert_eq!(HttpClientAdapter::endpoint_tag(&requests), "chat");
    }
}

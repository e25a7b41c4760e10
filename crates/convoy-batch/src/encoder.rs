//! Batch Encoder (§4.5) — serializes `BatchRequest`s into newline-delimited
//! JSON for upload. Grounded on the append-only JSONL writer pattern used
//! elsewhere in this codebase for transcript persistence: write one line at
//! a time, never buffer the whole corpus.

use std::io::Write;

use crate::error::BatchError;
use crate::model::BatchRequest;

/// Writes `requests` as JSON Lines to `sink`, one object per line in the
/// nominal field order `{custom_id, method, url, body}`, each line
/// newline-terminated including the last. Deterministic: an equal input
/// slice always produces byte-identical output.
pub fn encode_to<W: Write>(requests: &[BatchRequest], mut sink: W) -> Result<(), BatchError> {
    for request in requests {
        let line = serde_json::to_string(request)
            .map_err(|e| BatchError::Protocol(format!("encode batch request: {e}")))?;
        writeln!(sink, "{line}").map_err(|e| BatchError::Protocol(format!("write batch line: {e}")))?;
    }
    Ok(())
}

/// Convenience wrapper returning the encoded bytes directly, for callers
/// that hold the whole file in memory before uploading.
pub fn encode(requests: &[BatchRequest]) -> Result<Vec<u8>, BatchError> {
    let mut buf = Vec::new();
    encode_to(requests, &mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(id: &str) -> BatchRequest {
        BatchRequest::new(id, "/v1/responses", json!({"model": "gpt-5.1"}))
    }

    #[test]
    fn three_requests_produce_three_newline_terminated_lines() {
        let requests = vec![sample("a"), sample("b"), sample("c")];
        let bytes = encode(&requests).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.ends_with('\n'));
        let lines: Vec<&str> = text.trim_end_matches('\n').split('\n').collect();
        assert_eq!(lines.len(), 3);
        for line in &lines {
            let decoded: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(decoded.get("custom_id").is_some());
            assert!(decoded.get("method").is_some());
            assert!(decoded.get("url").is_some());
            assert!(decoded.get("body").is_some());
        }
    }

    #[test]
    fn roundtrip_preserves_requests_field_wise() {
        let requests = vec![sample("a"), sample("b")];
        let bytes = encode(&requests).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        let decoded: Vec<BatchRequest> = text
            .trim_end_matches('\n')
            .split('\n')
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(decoded, requests);
    }

    #[test]
    fn encoding_is_deterministic() {
        let requests = vec![sample("a"), sample("b")];
        assert_eq!(encode(&requests).unwrap(), encode(&requests).unwrap());
    }

    #[test]
    fn empty_input_produces_empty_output() {
        assert!(encode(&[]).unwrap().is_empty());
    }
}

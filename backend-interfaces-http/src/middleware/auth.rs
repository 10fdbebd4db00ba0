use std::io::Read;

use anyhow::{anyhow, Result};
use axum::http::HeaderMap;
use flate2::read::GzDecoder;
use serde::Deserialize;
use serde_json::Value;

use backend_domain::RuntimeConfig;

#[derive(Debug, Deserialize)]
struct IngestEnvelope {
    #[serde(default)]
    schema_version: String,
    #[serde(default)]
    killmails: Vec<Value>,
}

pub fn authorize(config: &RuntimeConfig, headers: &HeaderMap) -> bool {
    if let Some(api_token) = &config.api_token {
        return extract_bearer(headers)
            .map(|v| v == *api_token)
            .unwrap_or(false);
    }
    true
}

pub fn parse_killmails(headers: &HeaderMap, body: &[u8]) -> Result<Vec<Value>> {
    let content = maybe_gunzip(headers, body)?;
    let envelope: IngestEnvelope = serde_json::from_str(&content)?;
    if envelope.schema_version.trim() != "v1" {
        return Err(anyhow!(
            "unsupported schema_version '{}', expected 'v1'",
            envelope.schema_version
        ));
    }
    Ok(envelope.killmails)
}

fn maybe_gunzip(headers: &HeaderMap, body: &[u8]) -> Result<String> {
    if let Some(encoding) = headers.get("Content-Encoding") {
        if encoding.to_str().unwrap_or("") == "gzip" {
            let mut decoder = GzDecoder::new(body);
            let mut out = String::new();
            decoder.read_to_string(&mut out)?;
            return Ok(out);
        }
    }
    Ok(String::from_utf8(body.to_vec())?)
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("Authorization")?.to_str().ok()?.trim();
    let prefix = "Bearer ";
    if !value.starts_with(prefix) {
        return None;
    }
    let token = value[prefix.len()..].trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_requires_schema_version() {
        let headers = HeaderMap::new();
        let body = br#"{"schema_version":"v1","killmails":[{"killmail_id":1}]}"#;
        let killmails = parse_killmails(&headers, body).expect("killmails");
        assert_eq!(killmails.len(), 1);

        let stale = br#"{"schema_version":"v0","killmails":[]}"#;
        assert!(parse_killmails(&headers, stale).is_err());
    }
}

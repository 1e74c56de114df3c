// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use crate::error::{Result, SourceError};
use crate::frame::{frame_from_records, DataFrame};
use crate::source::{HttpMethod, SourceAdapter, SourceConfig, SourceKind};
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;
/// JSON HTTP endpoints. Responses may be a bare array of records or an
/// object wrapping one; the first array value found is used.
pub struct ApiAdapter {
    config: SourceConfig,
}
impl ApiAdapter {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }
    fn api_error(&self, url: &str, source: reqwest::Error) -> SourceError {
        SourceError::Api {
            url: url.to_string(),
            source,
        }
    }
    fn request(
        &self,
        url: &str,
        method: &HttpMethod,
        params: &HashMap<String, String>,
        headers: &HashMap<String, String>,
        timeout_secs: u64,
        json_body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| self.api_error(url, e))?;
        let mut request = match method {
            HttpMethod::Get => client.get(url),
            HttpMethod::Post => client.post(url),
        };
        if !params.is_empty() {
            request = request.query(params);
        }
        for (key, value) in headers {
            request = request.header(key, value);
        }
        if let Some(body) = json_body {
            request = request.json(body);
        }
        let response = request
            .send()
            .map_err(|e| self.api_error(url, e))?
            .error_for_status()
            .map_err(|e| self.api_error(url, e))?;
        let value = response.json().map_err(|e| self.api_error(url, e))?;
        Ok(value)
    }
    fn extract_records(&self, value: serde_json::Value) -> Result<Vec<serde_json::Value>> {
        match value {
            serde_json::Value::Array(records) => Ok(records),
            serde_json::Value::Object(map) => map
                .into_iter()
                .find_map(|(_, v)| match v {
                    serde_json::Value::Array(records) => Some(records),
                    _ => None,
                })
                .ok_or_else(|| {
                    SourceError::Decode {
                        source_id: self.config.id.clone(),
                        reason: "response contains no record array".to_string(),
                    }
                    .into()
                }),
            _ => Err(SourceError::Decode {
                source_id: self.config.id.clone(),
                reason: "response is neither an array nor an object".to_string(),
            }
            .into()),
        }
    }
}
impl SourceAdapter for ApiAdapter {
    fn fetch(&self) -> Result<DataFrame> {
        let SourceKind::Api {
            url,
            method,
            params,
            headers,
            timeout_secs,
            json_body,
        } = &self.config.kind
        else {
            return Err(SourceError::NotConfigured {
                source_id: self.config.id.clone(),
            }
            .into());
        };
        let value = self.request(url, method, params, headers, *timeout_secs, json_body.as_ref())?;
        let records = self.extract_records(value)?;
        let frame = frame_from_records(&records, self.config.name.clone())?;
        info!(
            source = self.config.id.as_str(),
            rows = frame.row_count(),
            "loaded api source"
        );
        Ok(frame)
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    fn adapter() -> ApiAdapter {
        ApiAdapter::new(SourceConfig {
            id: "api".to_string(),
            name: "Api".to_string(),
            kind: SourceKind::Api {
                url: "https://example.test".to_string(),
                method: HttpMethod::Get,
                params: HashMap::new(),
                headers: HashMap::new(),
                timeout_secs: 5,
                json_body: None,
            },
        })
    }
    #[test]
    fn bare_array_is_accepted() {
        let records = adapter()
            .extract_records(json!([{"a": 1}, {"a": 2}]))
            .expect("records");
        assert_eq!(records.len(), 2);
    }
    #[test]
    fn wrapped_array_is_unwrapped() {
        let records = adapter()
            .extract_records(json!({"count": 1, "items": [{"a": 1}]}))
            .expect("records");
        assert_eq!(records.len(), 1);
    }
    #[test]
    fn scalar_response_is_rejected() {
        assert!(adapter().extract_records(json!(42)).is_err());
        assert!(adapter().extract_records(json!({"total": 7})).is_err());
    }
}

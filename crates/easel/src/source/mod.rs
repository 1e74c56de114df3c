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

pub mod api;
pub mod cache;
pub mod database;
pub mod file;
use crate::error::Result;
use crate::frame::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
pub use api::ApiAdapter;
pub use cache::{CachedSource, SourceCache};
pub use database::DatabaseAdapter;
pub use file::FileAdapter;
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
}
impl Default for HttpMethod {
    fn default() -> Self {
        HttpMethod::Get
    }
}
fn default_timeout() -> u64 {
    30
}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceKind {
    File {
        path: PathBuf,
    },
    Database {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sql: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        table: Option<String>,
    },
    Api {
        url: String,
        #[serde(default)]
        method: HttpMethod,
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        params: HashMap<String, String>,
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        headers: HashMap<String, String>,
        #[serde(default = "default_timeout")]
        timeout_secs: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        json_body: Option<serde_json::Value>,
    },
}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub kind: SourceKind,
}
impl SourceConfig {
    pub fn file(id: &str, name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: SourceKind::File { path: path.into() },
        }
    }
}
/// Loads a list of source definitions from a YAML file.
pub fn load_source_configs(path: &Path) -> Result<Vec<SourceConfig>> {
    let content = std::fs::read_to_string(path)?;
    let configs: Vec<SourceConfig> = serde_yaml::from_str(&content)?;
    Ok(configs)
}
pub trait SourceAdapter: Send + Sync {
    /// Pulls the full dataset from the underlying source.
    fn fetch(&self) -> Result<DataFrame>;
    /// Cheap reachability probe; failures are reported, never raised.
    fn connect_test(&self) -> bool {
        self.fetch().is_ok()
    }
}
pub fn adapter_for(config: &SourceConfig) -> Box<dyn SourceAdapter> {
    match &config.kind {
        SourceKind::File { .. } => Box::new(FileAdapter::new(config.clone())),
        SourceKind::Database { .. } => Box::new(DatabaseAdapter::new(config.clone())),
        SourceKind::Api { .. } => Box::new(ApiAdapter::new(config.clone())),
    }
}

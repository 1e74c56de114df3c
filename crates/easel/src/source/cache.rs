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

use crate::error::Result;
use crate::frame::DataFrame;
use crate::schema::{FieldDescriptor, SchemaInferrer};
use crate::source::{adapter_for, SourceConfig};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};
#[derive(Debug, Clone)]
pub struct CachedSource {
    pub frame: Arc<DataFrame>,
    pub schema: Arc<Vec<FieldDescriptor>>,
    pub fetched_at: DateTime<Utc>,
}
/// Shared fetch-and-schema cache over the configured sources. Constructed
/// explicitly and passed to whoever needs source data; entries are replaced
/// atomically, readers holding an `Arc` keep the snapshot they resolved.
/// Concurrent fetches of one id are coalesced through a per-id guard so a
/// fetch storm hits the backing source once.
pub struct SourceCache {
    entries: RwLock<HashMap<String, Arc<CachedSource>>>,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    inferrer: SchemaInferrer,
}
impl SourceCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            inferrer: SchemaInferrer::new(),
        }
    }
    pub fn get(&self, source_id: &str) -> Option<Arc<CachedSource>> {
        self.read_entry(source_id)
    }
    /// Cached snapshot for the source, fetching on a miss.
    pub fn get_or_fetch(&self, config: &SourceConfig) -> Result<Arc<CachedSource>> {
        if let Some(entry) = self.read_entry(&config.id) {
            debug!(source = config.id.as_str(), "cache hit");
            return Ok(entry);
        }
        let guard = self.fetch_guard(&config.id);
        let _held = guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // a coalesced fetch may have landed while waiting for the guard
        if let Some(entry) = self.read_entry(&config.id) {
            debug!(source = config.id.as_str(), "cache hit after coalesced fetch");
            return Ok(entry);
        }
        self.fetch_and_store(config)
    }
    /// Unconditional refetch; the old entry stays readable until the new
    /// one replaces it.
    pub fn refresh(&self, config: &SourceConfig) -> Result<Arc<CachedSource>> {
        let guard = self.fetch_guard(&config.id);
        let _held = guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.fetch_and_store(config)
    }
    pub fn invalidate(&self, source_id: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(source_id);
        }
        debug!(source = source_id, "cache entry invalidated");
    }
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn read_entry(&self, source_id: &str) -> Option<Arc<CachedSource>> {
        self.entries.read().ok()?.get(source_id).cloned()
    }
    fn fetch_guard(&self, source_id: &str) -> Arc<Mutex<()>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        in_flight
            .entry(source_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
    fn fetch_and_store(&self, config: &SourceConfig) -> Result<Arc<CachedSource>> {
        let adapter = adapter_for(config);
        let frame = adapter.fetch()?;
        let schema = self.inferrer.infer(&frame)?;
        let entry = Arc::new(CachedSource {
            frame: Arc::new(frame),
            schema: Arc::new(schema),
            fetched_at: Utc::now(),
        });
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(config.id.clone(), entry.clone());
        }
        info!(
            source = config.id.as_str(),
            rows = entry.frame.row_count(),
            "source fetched and cached"
        );
        Ok(entry)
    }
}
impl Default for SourceCache {
    fn default() -> Self {
        Self::new()
    }
}

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
use crate::frame::{frame_from_records, CsvReader, DataFrame};
use crate::source::{SourceAdapter, SourceConfig, SourceKind};
use std::path::Path;
use tracing::info;
/// CSV and JSON files; the format is picked by extension.
pub struct FileAdapter {
    config: SourceConfig,
}
impl FileAdapter {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }
    fn path(&self) -> Option<&Path> {
        match &self.config.kind {
            SourceKind::File { path } => Some(path),
            _ => None,
        }
    }
    fn read_json(&self, path: &Path) -> Result<DataFrame> {
        let content = std::fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        let records = value.as_array().ok_or_else(|| SourceError::Decode {
            source_id: self.config.id.clone(),
            reason: "expected a top-level JSON array of objects".to_string(),
        })?;
        let mut frame = frame_from_records(records, self.config.name.clone())?;
        frame.metadata.source_path = Some(path.to_path_buf());
        Ok(frame)
    }
}
impl SourceAdapter for FileAdapter {
    fn fetch(&self) -> Result<DataFrame> {
        let path = self.path().ok_or_else(|| SourceError::NotConfigured {
            source_id: self.config.id.clone(),
        })?;
        if !path.exists() {
            return Err(SourceError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let frame = match extension.as_str() {
            "csv" => CsvReader::new().read_file(path, self.config.name.clone())?,
            "json" => self.read_json(path)?,
            other => {
                return Err(SourceError::UnsupportedFormat {
                    format: other.to_string(),
                }
                .into())
            }
        };
        info!(
            source = self.config.id.as_str(),
            rows = frame.row_count(),
            "loaded file source"
        );
        Ok(frame)
    }
    fn connect_test(&self) -> bool {
        self.path().is_some_and(Path::exists)
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ColumnData;
    use std::io::Write;
    #[test]
    fn csv_file_loads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("orders.csv");
        let mut file = std::fs::File::create(&path).expect("create");
        writeln!(file, "region,amount\nNorth,100\nSouth,250").expect("write");
        let adapter = FileAdapter::new(SourceConfig::file("orders", "Orders", &path));
        assert!(adapter.connect_test());
        let frame = adapter.fetch().expect("fetch");
        assert_eq!(frame.row_count(), 2);
        assert_eq!(
            frame.column("amount").expect("col").to_f64(1),
            Some(250.0)
        );
    }
    #[test]
    fn json_file_loads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("orders.json");
        std::fs::write(&path, r#"[{"region":"North","amount":100}]"#).expect("write");
        let adapter = FileAdapter::new(SourceConfig::file("orders", "Orders", &path));
        let frame = adapter.fetch().expect("fetch");
        assert_eq!(frame.row_count(), 1);
    }
    #[test]
    fn missing_file_reports_path() {
        let adapter = FileAdapter::new(SourceConfig::file("x", "X", "/no/such/file.csv"));
        assert!(!adapter.connect_test());
        let err = adapter.fetch().unwrap_err();
        assert!(err.to_string().contains("/no/such/file.csv"));
    }
    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.parquet");
        std::fs::write(&path, b"x").expect("write");
        let adapter = FileAdapter::new(SourceConfig::file("x", "X", &path));
        assert!(adapter.fetch().is_err());
    }
}

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

use serde::{Deserialize, Serialize};
use serde_json::Value;
/// Plot description in the plotly wire shape: a list of traces plus a
/// layout object. The exported page hands both straight to the plotly
/// runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Figure {
    pub data: Vec<Value>,
    pub layout: Value,
}
impl Figure {
    pub fn new(data: Vec<Value>, layout: Value) -> Self {
        Self { data, layout }
    }
    pub fn trace_count(&self) -> usize {
        self.data.len()
    }
}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartArtifact {
    pub figure: Figure,
    pub title: String,
    pub height: u32,
}
impl ChartArtifact {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.figure)
    }
}

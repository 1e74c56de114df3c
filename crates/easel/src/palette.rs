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
use std::collections::{HashMap, HashSet};
pub const DEFAULT_PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];
pub const BUSINESS_PALETTE: [&str; 5] = ["#2c3e50", "#3498db", "#e74c3c", "#f39c12", "#27ae60"];
pub const OCEAN_PALETTE: [&str; 5] = ["#0077be", "#00a8cc", "#40e0d0", "#7fffd4", "#b0e0e6"];
pub const EARTH_PALETTE: [&str; 5] = ["#8b4513", "#cd853f", "#daa520", "#b8860b", "#d2691e"];
pub const SUNSET_PALETTE: [&str; 5] = ["#ff6b6b", "#ffa07a", "#ffb347", "#ffd700", "#ff69b4"];
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Theme {
    pub name: String,
    pub colors: Vec<String>,
}
impl Theme {
    /// Unknown names fall back to the default theme.
    pub fn named(name: &str) -> Self {
        let colors: &[&str] = match name {
            "business" => &BUSINESS_PALETTE,
            "ocean" => &OCEAN_PALETTE,
            "earth" => &EARTH_PALETTE,
            "sunset" => &SUNSET_PALETTE,
            _ => &DEFAULT_PALETTE,
        };
        Self {
            name: if matches!(name, "business" | "ocean" | "earth" | "sunset") {
                name.to_string()
            } else {
                "default".to_string()
            },
            colors: colors.iter().map(|c| (*c).to_string()).collect(),
        }
    }
    pub fn theme_names() -> &'static [&'static str] {
        &["default", "business", "ocean", "earth", "sunset"]
    }
    /// Colour for single-series charts.
    pub fn primary(&self) -> &str {
        self.colors.first().map(String::as_str).unwrap_or("#1f77b4")
    }
}
impl Default for Theme {
    fn default() -> Self {
        Self::named("default")
    }
}
/// Deterministic colour assignment for a chart's series values.
///
/// Overrides are reserved up front so a non-override value never steals a
/// colour an override claims; where two values claim the same override
/// colour, the earlier value keeps it. Theme colours are handed out in
/// order skipping anything already taken, and only once every theme colour
/// is in use does assignment cycle from the start, allowing repeats.
pub fn assign_colors(
    values: &[String],
    theme: &Theme,
    overrides: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut reserved: HashMap<&str, &str> = HashMap::new();
    for value in values {
        if let Some(color) = overrides.get(value) {
            reserved.entry(color.as_str()).or_insert(value.as_str());
        }
    }
    let mut used: HashSet<String> = HashSet::new();
    let mut assigned: HashMap<String, String> = HashMap::new();
    let mut cycle = 0usize;
    for value in values {
        let override_color = overrides
            .get(value)
            .filter(|c| reserved.get(c.as_str()) == Some(&value.as_str()))
            .filter(|c| !used.contains(c.as_str()));
        let color = match override_color {
            Some(c) => c.clone(),
            None => {
                let claimed_elsewhere = |c: &str| {
                    reserved.get(c).is_some_and(|owner| *owner != value.as_str())
                };
                let next = theme
                    .colors
                    .iter()
                    .find(|c| !used.contains(c.as_str()) && !claimed_elsewhere(c));
                match next {
                    Some(c) => c.clone(),
                    None => {
                        // palette exhausted; wrap around and repeat
                        let c = theme.colors[cycle % theme.colors.len()].clone();
                        cycle += 1;
                        c
                    }
                }
            }
        };
        used.insert(color.clone());
        assigned.insert(value.clone(), color);
    }
    assigned
}
#[cfg(test)]
mod tests {
    use super::*;
    fn values(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }
    #[test]
    fn three_groups_get_first_three_theme_colors() {
        let theme = Theme::named("business");
        let assigned = assign_colors(&values(&["a", "b", "c"]), &theme, &HashMap::new());
        assert_eq!(assigned["a"], BUSINESS_PALETTE[0]);
        assert_eq!(assigned["b"], BUSINESS_PALETTE[1]);
        assert_eq!(assigned["c"], BUSINESS_PALETTE[2]);
    }
    #[test]
    fn assignment_is_deterministic() {
        let theme = Theme::named("ocean");
        let vals = values(&["x", "y", "z"]);
        let first = assign_colors(&vals, &theme, &HashMap::new());
        let second = assign_colors(&vals, &theme, &HashMap::new());
        assert_eq!(first, second);
    }
    #[test]
    fn seven_groups_on_five_colors_repeat_only_after_exhaustion() {
        let theme = Theme::named("sunset");
        let vals = values(&["g1", "g2", "g3", "g4", "g5", "g6", "g7"]);
        let assigned = assign_colors(&vals, &theme, &HashMap::new());
        let first_five: HashSet<&String> =
            vals[..5].iter().map(|v| &assigned[v]).collect();
        assert_eq!(first_five.len(), 5, "first five assignments are distinct");
        assert_eq!(assigned["g6"], SUNSET_PALETTE[0]);
        assert_eq!(assigned["g7"], SUNSET_PALETTE[1]);
    }
    #[test]
    fn override_is_honoured() {
        let theme = Theme::named("default");
        let mut overrides = HashMap::new();
        overrides.insert("b".to_string(), "#123456".to_string());
        let assigned = assign_colors(&values(&["a", "b"]), &theme, &overrides);
        assert_eq!(assigned["b"], "#123456");
        assert_eq!(assigned["a"], DEFAULT_PALETTE[0]);
    }
    #[test]
    fn override_claim_beats_earlier_theme_pick() {
        // B's override claims the theme's first colour; A, assigned first,
        // must skip it and take the next one.
        let theme = Theme {
            name: "test".to_string(),
            colors: vec!["#ff0000".to_string(), "#00ff00".to_string()],
        };
        let mut overrides = HashMap::new();
        overrides.insert("B".to_string(), "#ff0000".to_string());
        let assigned = assign_colors(&values(&["A", "B"]), &theme, &overrides);
        assert_eq!(assigned["A"], "#00ff00");
        assert_eq!(assigned["B"], "#ff0000");
    }
    #[test]
    fn duplicate_overrides_resolve_to_first_declared() {
        let theme = Theme::named("default");
        let mut overrides = HashMap::new();
        overrides.insert("a".to_string(), "#abcdef".to_string());
        overrides.insert("b".to_string(), "#abcdef".to_string());
        let assigned = assign_colors(&values(&["a", "b"]), &theme, &overrides);
        assert_eq!(assigned["a"], "#abcdef");
        assert_ne!(assigned["b"], "#abcdef");
        assert_eq!(assigned["b"], DEFAULT_PALETTE[0]);
    }
    #[test]
    fn unknown_theme_falls_back_to_default() {
        let theme = Theme::named("nonexistent");
        assert_eq!(theme.name, "default");
        assert_eq!(theme.colors.len(), 10);
        assert_eq!(theme.primary(), DEFAULT_PALETTE[0]);
    }
}

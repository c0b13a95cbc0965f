//! Provider placeholder codes meaning "unknown"

use serde::{Deserialize, Serialize};

/// Values that providers use in place of a missing attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelCodes {
    /// Numeric codes in `established_year`
    pub year: Vec<i64>,
    /// Numeric codes in `reported_area_km2`
    pub area: Vec<f64>,
    /// Text codes in any textual field, matched case-insensitively
    pub text: Vec<String>,
}

impl Default for SentinelCodes {
    fn default() -> Self {
        Self {
            year: vec![0],
            area: Vec::new(),
            text: vec!["Not Reported".to_string(), String::new()],
        }
    }
}

impl SentinelCodes {
    pub fn is_year(&self, year: i64) -> bool {
        self.year.contains(&year)
    }

    pub fn is_area(&self, area: f64) -> bool {
        self.area.iter().any(|&a| a == area)
    }

    pub fn is_text(&self, text: &str) -> bool {
        let text = text.trim();
        self.text.iter().any(|s| s.trim().eq_ignore_ascii_case(text))
    }
}

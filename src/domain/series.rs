// Normalized time-series shape shared by every source
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Shown wherever optional metadata is missing.
pub const PLACEHOLDER: &str = "—";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub key: String,
    pub label: String,
}

impl Field {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

/// A value exactly as the upstream delivered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(serde_json::Number),
    Text(String),
}

impl RawValue {
    /// Coerce to a chartable number. Anything that is not a finite number is a gap.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            RawValue::Number(n) => n.as_f64()?,
            RawValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok()?
            }
        };
        n.is_finite().then_some(n)
    }

    /// Text used in the table and the row copy payload; `None` when there is nothing to show.
    pub fn display(&self) -> Option<String> {
        match self {
            RawValue::Number(n) => Some(n.to_string()),
            RawValue::Text(s) if s.is_empty() => None,
            RawValue::Text(s) => Some(s.clone()),
        }
    }

    /// Convert a loosely typed JSON value; null and structured values are treated as absent.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => Some(RawValue::Number(n.clone())),
            serde_json::Value::String(s) => Some(RawValue::Text(s.clone())),
            serde_json::Value::Bool(b) => Some(RawValue::Text(b.to_string())),
            _ => None,
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(RawValue::Number)
            .unwrap_or_else(|| RawValue::Text(value.to_string()))
    }
}

/// One record: field key to raw value. Keys may be missing.
pub type Point = BTreeMap<String, RawValue>;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NormalizedSeries {
    pub name: String,
    pub description: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub fields: Vec<Field>,
    pub labels: Vec<String>,
    pub points: Vec<Point>,
}

impl NormalizedSeries {
    /// Build a series, keeping `labels` and `points` in correspondence.
    pub fn new(
        name: impl Into<String>,
        fields: Vec<Field>,
        mut labels: Vec<String>,
        mut points: Vec<Point>,
    ) -> Self {
        let name = name.into();
        if labels.len() != points.len() {
            tracing::warn!(
                series = %name,
                labels = labels.len(),
                points = points.len(),
                "label/point count mismatch, truncating to the shorter"
            );
            let len = labels.len().min(points.len());
            labels.truncate(len);
            points.truncate(len);
        }

        Self {
            name,
            description: None,
            created_at: None,
            updated_at: None,
            fields,
            labels,
            points,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.is_empty());
        self
    }

    pub fn with_created_at(mut self, created_at: Option<String>) -> Self {
        self.created_at = created_at.filter(|c| !c.is_empty());
        self
    }

    pub fn with_updated_at(mut self, updated_at: Option<String>) -> Self {
        self.updated_at = updated_at.filter(|u| !u.is_empty());
        self
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

const DEFAULT_LABEL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid label format '{0}'")]
pub struct InvalidLabelFormat(String);

/// Turns upstream timestamps into display labels.
#[derive(Debug, Clone)]
pub struct LabelFormat {
    pattern: String,
}

impl LabelFormat {
    /// Accepts chrono strftime patterns; unknown specifiers are rejected here
    /// rather than when a label is formatted.
    pub fn new(pattern: impl Into<String>) -> Result<Self, InvalidLabelFormat> {
        let pattern = pattern.into();
        if StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error)) {
            return Err(InvalidLabelFormat(pattern));
        }
        Ok(Self { pattern })
    }

    /// Format an RFC 3339 stamp. Unparseable input is shown as-is.
    pub fn rfc3339(&self, raw: &str) -> String {
        match DateTime::parse_from_rfc3339(raw) {
            Ok(time) => self.datetime(time.with_timezone(&Utc)),
            Err(_) => raw.to_string(),
        }
    }

    pub fn epoch_millis(&self, millis: i64) -> String {
        match Utc.timestamp_millis_opt(millis).single() {
            Some(time) => self.datetime(time),
            None => millis.to_string(),
        }
    }

    pub fn datetime(&self, time: DateTime<Utc>) -> String {
        time.format(&self.pattern).to_string()
    }
}

impl Default for LabelFormat {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_LABEL_FORMAT.to_string(),
        }
    }
}

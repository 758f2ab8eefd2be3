use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::{value_text, Paper, QueryResult};

pub const PREVIEW_CHARS: usize = 140;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub query: Option<String>,
    pub answer: Option<Value>,
    pub summary: Option<String>,
    pub validation: Option<Value>,
    pub papers: Option<Vec<Paper>>,
}

impl HistoryEntry {
    /// Lenient parse of one backend history record. `index` is the record's
    /// position in the backend list and stands in for a missing id.
    pub fn from_value(index: usize, value: &Value) -> Self {
        let field = |key: &str| value.get(key).filter(|v| !v.is_null());

        let id = ["_id", "id"]
            .iter()
            .find_map(|k| field(*k).and_then(value_text))
            .unwrap_or_else(|| index.to_string());

        Self {
            id,
            created_at: field("createdAt").and_then(parse_timestamp),
            query: field("query").and_then(Value::as_str).map(String::from),
            answer: field("answer").cloned(),
            summary: field("summary").and_then(Value::as_str).map(String::from),
            validation: field("validation").cloned(),
            papers: field("papers")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(Paper::from_value).collect()),
        }
    }

    pub fn title(&self) -> &str {
        self.query.as_deref().unwrap_or("Untitled query")
    }

    pub fn preview(&self) -> String {
        preview_text(self.answer.as_ref(), PREVIEW_CHARS)
    }

    /// The result panel content when an entry is opened from history.
    pub fn to_result(&self) -> QueryResult {
        QueryResult {
            answer: self.answer.as_ref().and_then(value_text).unwrap_or_default(),
            summary: self.summary.clone().unwrap_or_default(),
            validation: self.validation.clone(),
            papers: self.papers.clone().unwrap_or_default(),
            extra: Default::default(),
        }
    }
}

/// Parse the history list, newest first.
///
/// Accepts a bare array or `{ "result": [...] }`; any other shape is empty.
/// The backend list is reversed, and when every entry has a timestamp the
/// list is also sorted by it so the order never depends on the backend.
pub fn parse_history(data: &Value) -> Vec<HistoryEntry> {
    let items = match data {
        Value::Array(items) => items,
        Value::Object(obj) => match obj.get("result") {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    let mut entries: Vec<HistoryEntry> = items
        .iter()
        .enumerate()
        .map(|(idx, v)| HistoryEntry::from_value(idx, v))
        .collect();
    entries.reverse();

    if entries.iter().all(|e| e.created_at.is_some()) {
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
    entries
}

pub fn preview_text(value: Option<&Value>, max: usize) -> String {
    let Some(text) = value.and_then(value_text).filter(|s| !s.is_empty()) else {
        return "—".to_string();
    };
    if text.chars().count() > max {
        let head: String = text.chars().take(max).collect();
        format!("{head}...")
    } else {
        text
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

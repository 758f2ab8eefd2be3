use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ResearchError;

pub const MIN_QUERY_CHARS: usize = 5;

const ANSWER_FIELDS: &[&str] = &["answer", "text", "content"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitQuery {
    pub query: String,
}

/// Trim the raw input and reject anything too short to send.
pub fn validate_query(raw: &str) -> Result<SubmitQuery, ResearchError> {
    let query = raw.trim();
    if query.chars().count() < MIN_QUERY_CHARS {
        return Err(ResearchError::InvalidInput(format!(
            "Query must be at least {MIN_QUERY_CHARS} characters"
        )));
    }
    Ok(SubmitQuery {
        query: query.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: Option<String>,
    pub title: String,
    pub url: Option<String>,
    pub authors: Vec<String>,
}

impl Paper {
    /// Lenient parse of one backend paper record.
    pub fn from_value(value: &Value) -> Self {
        let Value::Object(fields) = value else {
            return Self {
                id: None,
                title: value.as_str().unwrap_or("Untitled").to_string(),
                url: None,
                authors: Vec::new(),
            };
        };

        let id = ["paperId", "id"]
            .iter()
            .find_map(|k| fields.get(*k).and_then(non_empty_text));
        let title = ["title", "name"]
            .iter()
            .find_map(|k| fields.get(*k).and_then(Value::as_str))
            .unwrap_or("Untitled")
            .to_string();
        let url = fields.get("url").and_then(Value::as_str).map(String::from);
        let authors = match fields.get("authors") {
            Some(Value::Array(items)) => items.iter().filter_map(non_empty_text).collect(),
            Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        };

        Self {
            id,
            title,
            url,
            authors,
        }
    }

    pub fn authors_line(&self) -> String {
        self.authors.join(", ")
    }
}

/// Display model for one answered query.
///
/// `extra` keeps every payload field that was not lifted into a typed field,
/// so nothing the backend sends is lost even though its shape is not fixed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub answer: String,
    pub summary: String,
    pub validation: Option<Value>,
    pub papers: Vec<Paper>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QueryResult {
    fn from_answer(answer: String) -> Self {
        Self {
            answer,
            ..Default::default()
        }
    }

    fn from_fields(mut fields: Map<String, Value>) -> Self {
        let answer = ANSWER_FIELDS
            .iter()
            .find_map(|k| fields.get(*k).and_then(non_empty_text))
            .unwrap_or_default();
        fields.remove("answer");

        let summary = match fields.remove("summary") {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => String::new(),
            Some(other) => {
                fields.insert("summary".into(), other);
                String::new()
            }
        };

        let validation = fields.remove("validation").filter(|v| !v.is_null());

        let papers = match fields.remove("papers") {
            Some(Value::Array(items)) => items.iter().map(Paper::from_value).collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                fields.insert("papers".into(), other);
                Vec::new()
            }
        };

        Self {
            answer,
            summary,
            validation,
            papers,
            extra: fields,
        }
    }
}

/// Turn whatever the backend answered into a renderable result.
///
/// A `message` envelope is unwrapped first. Strings become the answer,
/// objects are mapped field by field, anything else is stringified.
pub fn normalize_query_response(data: Value) -> QueryResult {
    let payload = match data {
        Value::Object(mut envelope) if envelope.contains_key("message") => {
            envelope.remove("message").unwrap_or(Value::Null)
        }
        other => other,
    };

    match payload {
        Value::String(answer) => QueryResult::from_answer(answer),
        Value::Object(fields) => QueryResult::from_fields(fields),
        other => QueryResult::from_answer(other.to_string()),
    }
}

/// Text for a value: strings as-is, other non-null values as compact JSON.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn non_empty_text(value: &Value) -> Option<String> {
    value_text(value).filter(|s| !s.is_empty())
}

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ModelError;
use super::field::Field;

pub type TodoId = u64;

const NAIVE_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Todo is a single tracked item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: TodoId,
    pub name: String,
    pub due_date: Option<String>,
    pub completion_date: Option<String>,
    pub completed: bool,
}

impl Todo {
    pub fn new(id: TodoId, input: ValidTodo) -> Todo {
        let completed = input.completed.unwrap_or(false);
        let completion_date = if completed {
            Some(input.completion_date.unwrap_or_else(timestamp_now))
        } else {
            None
        };

        Self {
            id,
            name: input.name,
            due_date: input.due_date,
            completion_date,
            completed,
        }
    }

    /// Applies an update. Name and due date are only overwritten by non-empty values,
    /// `completed` only when the client sent it, and the completion date is always
    /// recomputed from the resulting `completed` flag.
    pub fn apply(&mut self, changes: ValidTodo) {
        if !changes.name.is_empty() {
            self.name = changes.name;
        }
        if let Some(due_date) = changes.due_date {
            self.due_date = Some(due_date);
        }
        if let Some(completed) = changes.completed {
            self.completed = completed;
        }
        self.completion_date = if self.completed {
            Some(changes.completion_date.unwrap_or_else(timestamp_now))
        } else {
            None
        };
    }

    pub fn complete(&mut self) {
        self.completed = true;
        self.completion_date = Some(timestamp_now());
    }
}

/// Raw create/update body, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoInput {
    #[serde(default)]
    pub name: Field<Value>,
    #[serde(default)]
    pub due_date: Field<Value>,
    #[serde(default)]
    pub completion_date: Field<Value>,
    #[serde(default)]
    pub completed: Field<Value>,
}

/// Create/update body that passed validation.
///
/// `completed` is `None` when the client did not send the field at all; empty date
/// strings are folded into `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidTodo {
    pub name: String,
    pub due_date: Option<String>,
    pub completion_date: Option<String>,
    pub completed: Option<bool>,
}

impl TodoInput {
    pub fn validate(self) -> Result<ValidTodo, ModelError> {
        let name = match self.name {
            Field::Present(Value::String(name)) if !name.is_empty() => name,
            _ => return Err(ModelError::NameRequired),
        };
        let due_date = date_field(self.due_date).ok_or(ModelError::InvalidDueDate)?;
        let completion_date =
            date_field(self.completion_date).ok_or(ModelError::InvalidCompletionDate)?;
        let completed = match self.completed {
            Field::Absent => None,
            Field::Null => Some(false),
            Field::Present(value) => Some(coerce_bool(&value)),
        };

        Ok(ValidTodo {
            name,
            due_date,
            completion_date,
            completed,
        })
    }
}

/// `Some(None)` when nothing usable was sent, `Some(Some(date))` for a valid date
/// string and `None` when the value is not a date.
///
/// Falsy values (`""`, `false`, `0`) count as not sent.
fn date_field(field: Field<Value>) -> Option<Option<String>> {
    match field.into_option() {
        None => Some(None),
        Some(Value::String(s)) if s.is_empty() => Some(None),
        Some(Value::Bool(false)) => Some(None),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Some(None),
        Some(Value::String(s)) if is_valid_date(&s) => Some(Some(s)),
        Some(_) => None,
    }
}

pub fn is_valid_date(input: &str) -> bool {
    let s = input.trim();
    DateTime::parse_from_rfc3339(s).is_ok()
        || DateTime::parse_from_rfc2822(s).is_ok()
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || NAIVE_DATE_TIME_FORMATS
            .iter()
            .any(|format| NaiveDateTime::parse_from_str(s, format).is_ok())
}

pub fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => {
            let s = s.trim();
            s.eq_ignore_ascii_case("true") || s == "1"
        }
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Current UTC time, e.g. `2024-05-01T10:00:00.000Z`.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

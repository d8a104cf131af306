//! The todo item resource and its request payloads.
//!
//! # Design
//! `Todo` is both the row type read back from SQLite and the JSON shape sent
//! to clients. Incoming bodies deserialize into `TodoPayload`, where every
//! field is optional, and are then validated into either a `NewTodo` (create)
//! or a `TodoChanges` (update). Serde catches type errors; field rules such as
//! "title is required" are checked here so they can be reported per field.
//! Payload fields are `Option<Option<T>>`: the outer layer is "present in the
//! body", the inner one is "not null", so an update can clear `order`.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Longest title accepted, in characters.
pub const MAX_TITLE_LEN: usize = 256;

/// A single todo item as stored and as returned by the API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub completed: bool,
    pub order: Option<i64>,
    pub url: String,
}

/// Request body for create and update. `id` and `url` are read-only and are
/// dropped by serde if a client sends them.
#[derive(Debug, Default, Deserialize)]
pub struct TodoPayload {
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub completed: Option<Option<bool>>,
    #[serde(default, deserialize_with = "present")]
    pub order: Option<Option<i64>>,
}

/// Marks a field that appeared in the body, even as `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A validated create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub completed: bool,
    pub order: Option<i64>,
}

/// A validated update request. `None` fields keep their stored value;
/// `order: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoChanges {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub order: Option<Option<i64>>,
}

/// Field-keyed validation messages, serialized as
/// `{"title": ["This field is required."]}`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl TodoPayload {
    /// Validate a create body. `title` must be present.
    pub fn into_new(self) -> Result<NewTodo, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let title = match self.title {
            Some(Some(title)) => check_title(&title, &mut errors),
            Some(None) => {
                errors.add("title", NOT_NULL);
                String::new()
            }
            None => {
                errors.add("title", "This field is required.");
                String::new()
            }
        };
        let completed = not_null("completed", self.completed, &mut errors);
        errors.into_result(NewTodo {
            title,
            completed: completed.unwrap_or(false),
            order: self.order.flatten(),
        })
    }

    /// Validate an update body. Every field is optional, but a title that is
    /// present must still be valid.
    pub fn into_changes(self) -> Result<TodoChanges, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let title = not_null("title", self.title, &mut errors)
            .map(|title| check_title(&title, &mut errors));
        let completed = not_null("completed", self.completed, &mut errors);
        errors.into_result(TodoChanges {
            title,
            completed,
            order: self.order,
        })
    }
}

const NOT_NULL: &str = "This field may not be null.";

/// Collapse a present-but-null value into a field error.
fn not_null<T>(field: &str, value: Option<Option<T>>, errors: &mut ValidationErrors) -> Option<T> {
    match value {
        Some(None) => {
            errors.add(field, NOT_NULL);
            None
        }
        other => other.flatten(),
    }
}

fn check_title(raw: &str, errors: &mut ValidationErrors) -> String {
    let title = raw.trim();
    if title.is_empty() {
        errors.add("title", "This field may not be blank.");
    } else if title.chars().count() > MAX_TITLE_LEN {
        errors.add(
            "title",
            format!("Ensure this field has no more than {MAX_TITLE_LEN} characters."),
        );
    }
    title.to_string()
}

/// Absolute detail-endpoint address of the item with `id` under `base`
/// (scheme and authority, optionally with a path prefix).
pub fn detail_url(base: &str, id: i64) -> String {
    format!("{}/todos/{id}", base.trim_end_matches('/'))
}

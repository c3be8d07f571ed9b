//! Todo record model and store operations.
//!
//! Mirrors the data layer of the deployed application so list handling can
//! be exercised natively: the whole todo list is serialized as one JSON
//! array under a single key of a key-value property store. Every operation
//! is read-modify-write over the full list.

#![allow(dead_code)]

use anyhow::{Result, bail};
use chrono::Utc;
use serde::{Deserialize, Serialize};

const TODOS_KEY: &str = "todos";

/// Key-value property store, the only persistence the application has.
pub trait PropertyStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

/// In-memory store for tests and local experimentation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: std::collections::HashMap<String, String>,
}

impl PropertyStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }
}

/// One todo record as stored (camelCase on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub created_at: String,
}

/// Load the full todo list. An absent or unparseable value is an empty
/// list, never an error: the store starts empty.
pub fn get_todos(store: &dyn PropertyStore) -> Vec<Todo> {
    store
        .get(TODOS_KEY)
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default()
}

fn save_todos(store: &mut dyn PropertyStore, todos: &[Todo]) -> Result<()> {
    let raw = serde_json::to_string(todos)?;
    store.set(TODOS_KEY, &raw);
    Ok(())
}

/// Append a new todo and return it. The identifier hashes the text together
/// with the creation timestamp, so identical texts added at different times
/// stay distinct.
pub fn add_todo(store: &mut dyn PropertyStore, text: &str) -> Result<Todo> {
    let text = text.trim();
    if text.is_empty() {
        bail!("todo text must not be empty");
    }

    let created_at = Utc::now().to_rfc3339();
    let mut hasher = blake3::Hasher::new();
    hasher.update(text.as_bytes());
    hasher.update(created_at.as_bytes());
    let id = hex::encode(&hasher.finalize().as_bytes()[..8]);

    let todo = Todo {
        id,
        text: text.to_string(),
        completed: false,
        created_at,
    };
    let mut todos = get_todos(store);
    todos.push(todo.clone());
    save_todos(store, &todos)?;
    Ok(todo)
}

/// Flip the completion state of one todo.
pub fn toggle_todo(store: &mut dyn PropertyStore, id: &str) -> Result<Todo> {
    let mut todos = get_todos(store);
    let Some(todo) = todos.iter_mut().find(|t| t.id == id) else {
        bail!("no todo with id '{id}'");
    };
    todo.completed = !todo.completed;
    let updated = todo.clone();
    save_todos(store, &todos)?;
    Ok(updated)
}

/// Remove one todo.
pub fn delete_todo(store: &mut dyn PropertyStore, id: &str) -> Result<()> {
    let mut todos = get_todos(store);
    let before = todos.len();
    todos.retain(|t| t.id != id);
    if todos.len() == before {
        bail!("no todo with id '{id}'");
    }
    save_todos(store, &todos)
}

//! Todo event payloads.

use serde::{Deserialize, Serialize};

/// One todo item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    /// Stable item id.
    pub id: String,
    /// What needs doing.
    pub content: String,
    /// `pending`, `in_progress`, or `completed`.
    pub status: String,
}

/// Payload for `todos.updated` events — the full replacement list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodosUpdatedPayload {
    /// Current todo list (total replacement).
    pub todos: Vec<TodoItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn todos_roundtrip() {
        let raw = json!({"todos": [{"id": "t1", "content": "write tests", "status": "pending"}]});
        let p: TodosUpdatedPayload = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(p.todos.len(), 1);
        assert_eq!(serde_json::to_value(&p).unwrap(), raw);
    }
}

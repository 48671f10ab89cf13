use tracing::debug;

use super::error::DataStoreError;
use crate::model::{Todo, TodoId, ValidTodo};

pub trait TodoDataStore {
    fn add(&mut self, todo: ValidTodo) -> Todo;
    fn update(&mut self, id: TodoId, changes: ValidTodo) -> Result<Todo, DataStoreError>;
    fn complete(&mut self, id: TodoId) -> Result<Todo, DataStoreError>;
    /// Removes the todo if present; returns it when something was removed.
    fn remove(&mut self, id: TodoId) -> Option<Todo>;
    fn items(&self, filter: &Filter) -> Vec<Todo>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Filter {
    pub show_completed: bool,
}

impl Filter {
    pub fn pending_todos() -> Self {
        Self {
            show_completed: false,
        }
    }

    pub fn all_todos() -> Self {
        Self {
            show_completed: true,
        }
    }

    fn matches(&self, todo: &Todo) -> bool {
        self.show_completed || !todo.completed
    }
}

/// Process-local store, kept in insertion order.
pub struct MemoryTodoStore {
    todos: Vec<Todo>,
    last_id: TodoId,
}

impl MemoryTodoStore {
    pub fn new() -> Self {
        Self {
            todos: Vec::new(),
            last_id: 0,
        }
    }

    fn find_mut(&mut self, id: TodoId) -> Result<&mut Todo, DataStoreError> {
        self.todos
            .iter_mut()
            .find(|todo| todo.id == id)
            .ok_or(DataStoreError::NotFound(id))
    }
}

impl Default for MemoryTodoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TodoDataStore for MemoryTodoStore {
    fn add(&mut self, todo: ValidTodo) -> Todo {
        // ids are never reused, even after deletes
        self.last_id += 1;
        let item = Todo::new(self.last_id, todo);
        debug!(id = item.id, "todo added");
        self.todos.push(item.clone());
        item
    }

    fn update(&mut self, id: TodoId, changes: ValidTodo) -> Result<Todo, DataStoreError> {
        let todo = self.find_mut(id)?;
        todo.apply(changes);
        Ok(todo.clone())
    }

    fn complete(&mut self, id: TodoId) -> Result<Todo, DataStoreError> {
        let todo = self.find_mut(id)?;
        todo.complete();
        Ok(todo.clone())
    }

    fn remove(&mut self, id: TodoId) -> Option<Todo> {
        let position = self.todos.iter().position(|todo| todo.id == id)?;
        debug!(id, "todo removed");
        Some(self.todos.remove(position))
    }

    fn items(&self, filter: &Filter) -> Vec<Todo> {
        self.todos
            .iter()
            .filter(|todo| filter.matches(todo))
            .cloned()
            .collect()
    }
}

//! Task list storage
//!
//! An ordered list of to-dos kept next to the timer, persisted at
//! ~/.local/share/pomobar/tasks.json. Every mutation is written straight
//! back to disk.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A single to-do item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

impl Task {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            done: false,
        }
    }
}

/// Persistent, ordered task list
#[derive(Debug)]
pub struct TaskStore {
    path: PathBuf,
    tasks: Vec<Task>,
}

impl TaskStore {
    /// Open the task list at `path`, creating its directory if needed
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create task directory: {}", parent.display()))?;
        }

        let tasks = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read tasks: {}", path.display()))?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse tasks: {}", path.display()))?
            }
        } else {
            Vec::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            tasks,
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.done).count()
    }

    /// Append a task; blank text is ignored
    ///
    /// Returns whether a task was added.
    pub fn add(&mut self, text: &str) -> Result<bool> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(false);
        }

        self.tasks.push(Task::new(text));
        debug!(task = text, "task added");
        self.save()?;
        Ok(true)
    }

    /// Flip the done flag of the task at `index`; out of range is a no-op
    pub fn toggle(&mut self, index: usize) -> Result<bool> {
        let Some(task) = self.tasks.get_mut(index) else {
            return Ok(false);
        };

        task.done = !task.done;
        self.save()?;
        Ok(true)
    }

    /// Remove the task at `index`; out of range is a no-op
    pub fn delete(&mut self, index: usize) -> Result<bool> {
        if index >= self.tasks.len() {
            return Ok(false);
        }

        self.tasks.remove(index);
        self.save()?;
        Ok(true)
    }

    /// Drop every finished task, returning how many were removed
    pub fn clear_completed(&mut self) -> Result<usize> {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.done);
        let removed = before - self.tasks.len();

        if removed > 0 {
            self.save()?;
        }
        Ok(removed)
    }

    fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.tasks)
            .context("Failed to serialize tasks")?;

        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write tasks: {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TaskStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::open(&dir.path().join("data").join("tasks.json")).unwrap();
        (store, dir)
    }

    #[test]
    fn test_empty_store() {
        let (store, _dir) = temp_store();
        assert!(store.is_empty());
        assert_eq!(store.pending_count(), 0);
    }

    #[test]
    fn test_add_trims_and_ignores_blank() {
        let (mut store, _dir) = temp_store();

        assert!(store.add("  write report ").unwrap());
        assert!(!store.add("   ").unwrap());

        assert_eq!(store.tasks(), &[Task::new("write report")]);
    }

    #[test]
    fn test_toggle_and_guarded_indices() {
        let (mut store, _dir) = temp_store();
        store.add("a").unwrap();
        store.add("b").unwrap();

        assert!(store.toggle(1).unwrap());
        assert!(store.tasks()[1].done);
        assert_eq!(store.pending_count(), 1);

        assert!(store.toggle(1).unwrap());
        assert!(!store.tasks()[1].done);

        assert!(!store.toggle(2).unwrap());
        assert!(!store.delete(5).unwrap());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_delete_keeps_order() {
        let (mut store, _dir) = temp_store();
        for text in ["one", "two", "three"] {
            store.add(text).unwrap();
        }

        assert!(store.delete(1).unwrap());
        let texts: Vec<_> = store.tasks().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "three"]);
    }

    #[test]
    fn test_clear_completed() {
        let (mut store, _dir) = temp_store();
        for text in ["one", "two", "three"] {
            store.add(text).unwrap();
        }
        store.toggle(0).unwrap();
        store.toggle(2).unwrap();

        assert_eq!(store.clear_completed().unwrap(), 2);
        assert_eq!(store.tasks(), &[Task::new("two")]);
        assert_eq!(store.clear_completed().unwrap(), 0);
    }

    #[test]
    fn test_persists_across_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");

        {
            let mut store = TaskStore::open(&path).unwrap();
            store.add("persisted").unwrap();
            store.toggle(0).unwrap();
        }

        let store = TaskStore::open(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.tasks()[0].text, "persisted");
        assert!(store.tasks()[0].done);
    }

    #[test]
    fn test_missing_done_field_defaults_false() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, r#"[{"text": "legacy"}]"#).unwrap();

        let store = TaskStore::open(&path).unwrap();
        assert_eq!(store.tasks(), &[Task::new("legacy")]);
    }
}

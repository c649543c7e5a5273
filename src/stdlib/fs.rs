use crate::runtime::error::{RuntimeError, RuntimeResult};
use std::collections::HashMap;

/// In-memory file store backing the file builtins. Nothing ever touches the
/// real filesystem; each store instance is fully isolated.
#[derive(Clone, Debug, Default)]
pub struct FileStore {
    files: HashMap<String, String>,
}

impl FileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_text(&mut self, path: &str, content: &str) {
        self.files.insert(path.to_string(), content.to_string());
    }

    pub fn append_text(&mut self, path: &str, content: &str) {
        self.files.entry(path.to_string()).or_default().push_str(content);
    }

    pub fn read_text(&self, path: &str) -> RuntimeResult<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| RuntimeError::DomainError {
                message: format!("file not found: {}", path),
            })
    }

    pub fn read_lines(&self, path: &str) -> RuntimeResult<Vec<String>> {
        let content = self.read_text(path)?;
        Ok(content.split('\n').map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_reads_back() {
        let mut store = FileStore::new();
        store.write_text("notes.txt", "hello");
        assert_eq!(store.read_text("notes.txt").unwrap(), "hello");
    }

    #[test]
    fn write_overwrites_existing_content() {
        let mut store = FileStore::new();
        store.write_text("notes.txt", "old");
        store.write_text("notes.txt", "new");
        assert_eq!(store.read_text("notes.txt").unwrap(), "new");
    }

    #[test]
    fn append_creates_missing_files() {
        let mut store = FileStore::new();
        store.append_text("log.txt", "a");
        store.append_text("log.txt", "b");
        assert_eq!(store.read_text("log.txt").unwrap(), "ab");
    }

    #[test]
    fn read_lines_splits_on_newlines() {
        let mut store = FileStore::new();
        store.write_text("data.txt", "1\n2\n3");
        assert_eq!(store.read_lines("data.txt").unwrap(), vec!["1", "2", "3"]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let store = FileStore::new();
        assert!(matches!(
            store.read_text("absent.txt"),
            Err(RuntimeError::DomainError { .. })
        ));
    }
}

use crate::error::RulebookError;
use anyhow::{anyhow, Result};
use indexmap::IndexMap;
use serde_json::Value;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

/// Storage abstraction for produced record sets
pub trait RecordStorage {
    /// Previously stored record set, if any.
    fn load(&self, name: &str) -> Result<Option<Value>>;

    fn store(&self, name: &str, records: &Value) -> Result<()>;

    /// Names of every stored record set, sorted.
    fn list(&self) -> Result<Vec<String>>;

    /// Store a non-JSON companion file (the data README).
    fn store_text(&self, file_name: &str, contents: &str) -> Result<()>;
}

/// Render a record set as two-space indented UTF-8 JSON with a trailing newline.
pub fn render_json(name: &str, records: &Value) -> Result<String> {
    let mut rendered =
        serde_json::to_string_pretty(records).map_err(|source| RulebookError::Serialization {
            name: name.to_string(),
            source,
        })?;
    rendered.push('\n');
    Ok(rendered)
}

/// File-based storage: one `<name>.json` per record set in the data directory
pub struct FileStorage {
    data_dir: PathBuf,
}

impl FileStorage {
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{name}.json"))
    }

    fn wrap(name: &str, source: anyhow::Error) -> anyhow::Error {
        RulebookError::Storage {
            name: name.to_string(),
            source,
        }
        .into()
    }
}

impl RecordStorage for FileStorage {
    fn load(&self, name: &str) -> Result<Option<Value>> {
        let path = self.record_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let json_str = fs::read_to_string(&path).map_err(|e| Self::wrap(name, e.into()))?;
        let value = serde_json::from_str(&json_str).map_err(|e| {
            Self::wrap(name, anyhow!("Failed to deserialize {}: {}", path.display(), e))
        })?;
        Ok(Some(value))
    }

    fn store(&self, name: &str, records: &Value) -> Result<()> {
        let rendered = render_json(name, records)?;
        fs::write(self.record_path(name), rendered).map_err(|e| Self::wrap(name, e.into()))
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.data_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn store_text(&self, file_name: &str, contents: &str) -> Result<()> {
        fs::write(self.data_dir.join(file_name), contents)
            .map_err(|e| Self::wrap(file_name, e.into()))
    }
}

/// In-memory storage, used when nothing should touch the filesystem
#[derive(Default)]
pub struct MemoryStorage {
    record_sets: RefCell<IndexMap<String, Value>>,
    texts: RefCell<IndexMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self, file_name: &str) -> Option<String> {
        self.texts.borrow().get(file_name).cloned()
    }
}

impl RecordStorage for MemoryStorage {
    fn load(&self, name: &str) -> Result<Option<Value>> {
        Ok(self.record_sets.borrow().get(name).cloned())
    }

    fn store(&self, name: &str, records: &Value) -> Result<()> {
        self.record_sets
            .borrow_mut()
            .insert(name.to_string(), records.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.record_sets.borrow().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn store_text(&self, file_name: &str, contents: &str) -> Result<()> {
        self.texts
            .borrow_mut()
            .insert(file_name.to_string(), contents.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rendered_json_keeps_non_ascii_and_trailing_newline() {
        let rendered = render_json("weapons", &json!([{"weapon": "Épée", "price": 10}])).unwrap();
        assert!(rendered.ends_with("]\n"));
        assert!(rendered.contains("Épée"));
        assert!(rendered.contains("\n  {\n    \"weapon\""));
    }

    #[test]
    fn file_storage_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(temp_dir.path().join("data")).unwrap();

        assert_eq!(storage.load("monsters").unwrap(), None);

        let records = json!([{"name": "Orc"}]);
        storage.store("monsters", &records).unwrap();
        storage.store("spells", &json!([])).unwrap();
        storage.store_text("README.md", "# Data Outputs\n").unwrap();

        assert_eq!(storage.load("monsters").unwrap(), Some(records));
        assert_eq!(storage.list().unwrap(), vec!["monsters", "spells"]);
        assert!(storage.data_dir().join("README.md").exists());
    }

    #[test]
    fn corrupt_file_names_the_record_set() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(temp_dir.path()).unwrap();
        fs::write(temp_dir.path().join("spells.json"), "{ not json").unwrap();

        let err = storage.load("spells").unwrap_err();
        assert!(err.to_string().contains("'spells'"));
    }

    #[test]
    fn memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        storage.store("b", &json!(1)).unwrap();
        storage.store("a", &json!(2)).unwrap();
        storage.store_text("README.md", "hi").unwrap();

        assert_eq!(storage.list().unwrap(), vec!["a", "b"]);
        assert_eq!(storage.load("a").unwrap(), Some(json!(2)));
        assert_eq!(storage.text("README.md").as_deref(), Some("hi"));
    }
}

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::{KeyValueError, KeyValueStore};

/// Durable key-value store for native embeddings: one file per key
/// under a root directory. Writes go through a temp file and rename so
/// a crash never leaves a half-written record behind.
#[derive(Debug)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, KeyValueError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| KeyValueError::Storage(format!("create {}: {e}", root.display())))?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys carry ':' separators that are not filename-safe everywhere.
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.root.join(format!("{safe}.json"))
    }

    fn write_and_rename(path: &Path, value: &str) -> std::io::Result<()> {
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, KeyValueError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KeyValueError::Storage(format!("read {key}: {e}"))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KeyValueError> {
        Self::write_and_rename(&self.path_for(key), value)
            .map_err(|e| KeyValueError::Storage(format!("write {key}: {e}")))
    }

    fn remove(&self, key: &str) -> Result<(), KeyValueError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(KeyValueError::Storage(format!("remove {key}: {e}"))),
        }
    }
}

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::fs;

/// String-keyed storage the engine writes through. Durable or volatile is the
/// implementation's business; the engine only sees get/set/clear.
pub(crate) trait Store {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

/// Durable store: a flat JSON object on disk, rewritten atomically on every set.
pub(crate) struct FileStore {
    path: PathBuf,
    map: BTreeMap<String, String>,
}

impl FileStore {
    pub(crate) fn open(path: &Path) -> Self {
        let mut map = BTreeMap::new();
        if let Ok(s) = fs::read_to_string(path) {
            if let Ok(m) = serde_json::from_str::<BTreeMap<String, String>>(&s) {
                map = m;
            }
        }
        Self {
            path: path.to_path_buf(),
            map,
        }
    }

    fn persist(&self) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(&self.map)?;
        fs::write(&tmp, data)?;
        atomic_rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.map.insert(key.to_string(), value.to_string());
        self.persist()
    }

    fn clear(&mut self) -> Result<()> {
        self.map.clear();
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// Volatile store: lives for the process only. Backs the session counter and
/// stands in for the durable store in tests.
#[derive(Default)]
pub(crate) struct MemStore {
    map: BTreeMap<String, String>,
}

impl MemStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl Store for MemStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.map.clear();
        Ok(())
    }
}

pub(crate) fn atomic_rename(from: &Path, to: &Path) -> Result<()> {
    // Best-effort atomic replace on same filesystem.
    if to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to)?;
    Ok(())
}

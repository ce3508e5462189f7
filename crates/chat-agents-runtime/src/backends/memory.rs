use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use super::{normalize_virtual_path, Backend, BackendError, FileInfo};

/// Backend that keeps files in memory, keyed by normalized `/a/b` paths.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    files: RwLock<BTreeMap<String, String>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<I, P, C>(files: I) -> Result<Self, BackendError>
    where
        I: IntoIterator<Item = (P, C)>,
        P: AsRef<str>,
        C: Into<String>,
    {
        let backend = Self::new();
        for (path, content) in files {
            backend.put(path.as_ref(), &content.into())?;
        }
        Ok(backend)
    }

    fn lock_error() -> BackendError {
        BackendError::Io(std::io::Error::other("in-memory backend lock poisoned"))
    }
}

impl Backend for InMemoryBackend {
    fn ls(&self, path: &str) -> Result<Vec<FileInfo>, BackendError> {
        let dir = normalize_virtual_path(path)?;
        let is_root = dir == "/";
        let prefix = if is_root { dir } else { format!("{dir}/") };
        let files = self.files.read().map_err(|_| Self::lock_error())?;

        let mut dirs = BTreeSet::new();
        let mut infos = Vec::new();
        for (file_path, content) in files.iter() {
            let Some(rest) = file_path.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((sub, _)) => {
                    dirs.insert(format!("{prefix}{sub}"));
                }
                None => infos.push(FileInfo {
                    path: file_path.clone(),
                    is_dir: false,
                    size: Some(content.len() as u64),
                }),
            }
        }
        if infos.is_empty() && dirs.is_empty() && !is_root {
            return Err(BackendError::NotFound(path.to_string()));
        }
        infos.extend(dirs.into_iter().map(|path| FileInfo {
            path,
            is_dir: true,
            size: None,
        }));
        infos.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(infos)
    }

    fn read_to_string(&self, path: &str) -> Result<String, BackendError> {
        let key = normalize_virtual_path(path)?;
        let files = self.files.read().map_err(|_| Self::lock_error())?;
        files
            .get(&key)
            .cloned()
            .ok_or(BackendError::NotFound(path.to_string()))
    }

    fn exists(&self, path: &str) -> Result<bool, BackendError> {
        let key = normalize_virtual_path(path)?;
        let files = self.files.read().map_err(|_| Self::lock_error())?;
        Ok(files.contains_key(&key))
    }

    fn put(&self, path: &str, content: &str) -> Result<(), BackendError> {
        let key = normalize_virtual_path(path)?;
        if key == "/" {
            return Err(BackendError::invalid_path(path, "is a directory"));
        }
        let mut files = self.files.write().map_err(|_| Self::lock_error())?;
        files.insert(key, content.to_string());
        Ok(())
    }

    fn file_paths(&self) -> Result<Vec<String>, BackendError> {
        let files = self.files.read().map_err(|_| Self::lock_error())?;
        Ok(files.keys().cloned().collect())
    }
}

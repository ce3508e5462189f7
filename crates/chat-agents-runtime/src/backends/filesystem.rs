use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{normalize_virtual_path, Backend, BackendError, FileInfo};

/// Backend over a real directory.
///
/// In virtual mode every path is interpreted relative to `root_dir` (so
/// `/notes.txt` is `<root_dir>/notes.txt`), paths are displayed in that
/// rooted form, and nothing outside the root is reachable. Without virtual
/// mode absolute paths are used as-is and relative ones resolve against the
/// root.
#[derive(Debug, Clone)]
pub struct FilesystemBackend {
    root_dir: PathBuf,
    virtual_mode: bool,
}

impl FilesystemBackend {
    pub fn new(root_dir: impl Into<PathBuf>, virtual_mode: bool) -> Self {
        Self {
            root_dir: root_dir.into(),
            virtual_mode,
        }
    }

    /// A sandboxed backend rooted at `root_dir`.
    pub fn sandboxed(root_dir: impl Into<PathBuf>) -> Self {
        Self::new(root_dir, true)
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, BackendError> {
        if self.virtual_mode {
            let normalized = normalize_virtual_path(path)?;
            let joined = self.root_dir.join(normalized.trim_start_matches('/'));
            self.ensure_within_root(path, &joined)?;
            return Ok(joined);
        }
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            Ok(candidate.to_path_buf())
        } else {
            Ok(self.root_dir.join(candidate))
        }
    }

    /// Rejects `joined` when its deepest existing ancestor really lives
    /// outside the root, which happens through symlinks.
    fn ensure_within_root(&self, path: &str, joined: &Path) -> Result<(), BackendError> {
        let existing = joined
            .ancestors()
            .take_while(|ancestor| ancestor.starts_with(&self.root_dir))
            .find(|ancestor| fs::symlink_metadata(ancestor).is_ok());
        let Some(existing) = existing else {
            return Ok(());
        };
        let root = fs::canonicalize(&self.root_dir)?;
        let escapes = match fs::canonicalize(existing) {
            Ok(real) => !real.starts_with(&root),
            // dangling symlink
            Err(_) => true,
        };
        if escapes {
            tracing::warn!(path, "rejected path resolving outside the sandbox root");
            return Err(BackendError::invalid_path(path, "resolves outside the root directory"));
        }
        Ok(())
    }

    fn display(&self, absolute: &Path) -> String {
        if !self.virtual_mode {
            return absolute.to_string_lossy().into_owned();
        }
        let relative = absolute.strip_prefix(&self.root_dir).unwrap_or(absolute);
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        format!("/{}", parts.join("/"))
    }
}

fn not_found_or_io(path: &str, err: std::io::Error) -> BackendError {
    if err.kind() == ErrorKind::NotFound {
        BackendError::NotFound(path.to_string())
    } else {
        BackendError::Io(err)
    }
}

impl Backend for FilesystemBackend {
    fn ls(&self, path: &str) -> Result<Vec<FileInfo>, BackendError> {
        let dir = self.resolve(path)?;
        let entries = fs::read_dir(&dir).map_err(|err| not_found_or_io(path, err))?;

        let mut infos = Vec::new();
        for entry in entries {
            let entry = entry?;
            let metadata = entry.metadata()?;
            infos.push(FileInfo {
                path: self.display(&entry.path()),
                is_dir: metadata.is_dir(),
                size: metadata.is_file().then(|| metadata.len()),
            });
        }
        infos.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(infos)
    }

    fn read_to_string(&self, path: &str) -> Result<String, BackendError> {
        let resolved = self.resolve(path)?;
        if resolved.is_dir() {
            return Err(BackendError::invalid_path(path, "is a directory"));
        }
        fs::read_to_string(&resolved).map_err(|err| not_found_or_io(path, err))
    }

    fn exists(&self, path: &str) -> Result<bool, BackendError> {
        Ok(self.resolve(path)?.exists())
    }

    fn put(&self, path: &str, content: &str) -> Result<(), BackendError> {
        let resolved = self.resolve(path)?;
        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&resolved, content)?;
        tracing::debug!(path = %resolved.display(), bytes = content.len(), "wrote file");
        Ok(())
    }

    fn file_paths(&self) -> Result<Vec<String>, BackendError> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.root_dir)
            .follow_links(false)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.file_type().is_file() {
                paths.push(self.display(entry.path()));
            }
        }
        paths.sort();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_mode_roots_paths_in_the_sandbox() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::sandboxed(dir.path());

        backend.write("/notes/todo.txt", "buy milk").unwrap();
        assert!(dir.path().join("notes/todo.txt").exists());
        assert_eq!(backend.read_to_string("notes/todo.txt").unwrap(), "buy milk");

        let listing = backend.ls("/").unwrap();
        assert_eq!(
            listing,
            vec![FileInfo {
                path: "/notes".into(),
                is_dir: true,
                size: None,
            }]
        );
        assert_eq!(backend.file_paths().unwrap(), vec!["/notes/todo.txt".to_string()]);
    }

    #[test]
    fn virtual_mode_blocks_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::sandboxed(dir.path());
        assert!(matches!(
            backend.write("../escape.txt", "x"),
            Err(BackendError::InvalidPath { .. })
        ));
        assert!(!dir.path().parent().unwrap().join("escape.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn virtual_mode_blocks_symlinks_leaving_the_root() {
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("secret.txt"), "top secret").unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("missing.txt"),
            dir.path().join("dangling.txt"),
        )
        .unwrap();
        let backend = FilesystemBackend::sandboxed(dir.path());

        assert!(matches!(
            backend.read_to_string("/link/secret.txt"),
            Err(BackendError::InvalidPath { .. })
        ));
        assert!(matches!(backend.ls("/link"), Err(BackendError::InvalidPath { .. })));
        assert!(matches!(
            backend.write("/link/planted.txt", "x"),
            Err(BackendError::InvalidPath { .. })
        ));
        assert!(matches!(
            backend.put("/dangling.txt", "x"),
            Err(BackendError::InvalidPath { .. })
        ));
        assert!(!outside.path().join("planted.txt").exists());
        assert!(!outside.path().join("missing.txt").exists());

        backend.write("/inside/ok.txt", "fine").unwrap();
        assert_eq!(backend.read_to_string("/inside/ok.txt").unwrap(), "fine");
    }

    #[test]
    fn write_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::sandboxed(dir.path());
        backend.write("/a.txt", "first").unwrap();
        assert!(matches!(
            backend.write("/a.txt", "second"),
            Err(BackendError::AlreadyExists(_))
        ));
        assert_eq!(backend.read_to_string("/a.txt").unwrap(), "first");
    }

    #[test]
    fn edit_updates_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::sandboxed(dir.path());
        backend.write("/a.txt", "hello world").unwrap();
        assert_eq!(backend.edit("/a.txt", "world", "rust", false).unwrap(), 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("a.txt")).unwrap(),
            "hello rust"
        );
    }

    #[test]
    fn missing_files_map_to_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::sandboxed(dir.path());
        assert!(matches!(
            backend.read_to_string("/nope.txt"),
            Err(BackendError::NotFound(path)) if path == "/nope.txt"
        ));
        assert!(matches!(backend.ls("/nope"), Err(BackendError::NotFound(_))));
    }

    #[test]
    fn non_virtual_mode_resolves_relative_paths_against_root() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path(), false);
        backend.write("plain.txt", "x").unwrap();
        assert!(dir.path().join("plain.txt").exists());
        let absolute = dir.path().join("plain.txt");
        assert_eq!(
            backend.read_to_string(absolute.to_str().unwrap()).unwrap(),
            "x"
        );
    }
}

use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
};

use nix::fcntl::{Flock, FlockArg};

use crate::error::{Error, Result};

/// The run's image directory. Emptied on creation and guarded by an exclusive lock
/// on `<dir>.lock` for as long as the value lives. The lock file itself is left in
/// place so every run contends on the same inode.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
    _lock: Flock<std::fs::File>,
}

impl WorkDir {
    pub fn prepare(path: &Path) -> Result<Self> {
        // `.`, `..`, `/` and friends have no final name to wipe safely
        if path.file_name().is_none() {
            return Err(Error::directory(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "refusing to wipe a directory without a name of its own",
                ),
            ));
        }
        let lock = lock(path)?;
        reset(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}

fn lock(path: &Path) -> Result<Flock<std::fs::File>> {
    let p = lock_path(path);
    if let Some(parent) = p.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| Error::directory(parent, e))?;
        }
    }
    let f = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&p)
        .map_err(|e| Error::directory(&p, e))?;
    Flock::lock(f, FlockArg::LockExclusiveNonblock).map_err(|(_, errno)| {
        log::error!("{} is held by another run", p.display());
        Error::directory(&p, std::io::Error::from(errno))
    })
}

fn reset(path: &Path) -> Result<()> {
    if path.exists() || path.is_symlink() {
        log::debug!("clearing {}", path.display());
        std::fs::remove_dir_all(path).map_err(|e| Error::directory(path, e))?;
    }
    std::fs::create_dir_all(path).map_err(|e| Error::directory(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_missing_dir_with_parents() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("a/b/images");
        let wd = WorkDir::prepare(&dir).unwrap();
        assert!(wd.path().is_dir());
        assert!(root.path().join("a/b/images.lock").exists());
    }

    #[test]
    fn leftovers_from_previous_run_are_removed() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("images");
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("old.jpg"), b"stale").unwrap();
        std::fs::write(dir.join("nested/older.jpg"), b"stale").unwrap();

        let wd = WorkDir::prepare(&dir).unwrap();
        assert_eq!(std::fs::read_dir(wd.path()).unwrap().count(), 0);
    }

    #[test]
    fn plain_file_in_the_way_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("images");
        std::fs::write(&dir, b"not a directory").unwrap();

        let err = WorkDir::prepare(&dir).unwrap_err();
        assert!(matches!(err, Error::Directory { .. }));
    }

    #[test]
    fn second_concurrent_run_is_refused() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("images");
        let first = WorkDir::prepare(&dir).unwrap();
        std::fs::write(first.path().join("a.jpg"), b"a").unwrap();

        let err = WorkDir::prepare(&dir).unwrap_err();
        assert!(matches!(err, Error::Directory { .. }));
        assert!(first.path().join("a.jpg").exists());

        drop(first);
        assert!(root.path().join("images.lock").exists());
        assert!(WorkDir::prepare(&dir).is_ok());
    }

    #[test]
    fn unnamed_paths_are_refused() {
        for p in [".", "..", "/", "./", "images/.."] {
            let err = WorkDir::prepare(Path::new(p)).unwrap_err();
            assert!(matches!(err, Error::Directory { .. }), "{}", p);
        }
        assert!(!Path::new(".lock").exists());
    }
}

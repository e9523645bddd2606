use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::abort::Abort;
use crate::error::{Error, Result};
use crate::storage::{ObjectSource, RemoteObject};

/// Copies selected objects into a local directory, one at a time.
pub struct DownloadHandler<'a, S: ObjectSource + ?Sized> {
    source: &'a S,
    abort: &'a Abort,
}

impl<'a, S: ObjectSource + ?Sized> DownloadHandler<'a, S> {
    pub fn new(source: &'a S, abort: &'a Abort) -> Self {
        Self { source, abort }
    }

    /// Downloads `objects` in order into `target_dir`, each named by the last
    /// segment of its key. Objects sharing that segment overwrite each other.
    ///
    /// Stops at the first failure: earlier files stay, the failing one is removed
    /// and the remaining objects are never requested.
    pub async fn download(
        &self,
        bucket: &str,
        target_dir: &Path,
        objects: &[RemoteObject],
    ) -> Result<usize> {
        let mut count = 0;
        for object in objects {
            let Some(name) = object.file_name() else {
                log::warn!("skipping directory placeholder {}", object.key);
                continue;
            };

            let mut pic = PathBuf::new();
            pic.push(target_dir);
            pic.push(name);

            let size = self.fetch_to(bucket, &object.key, &pic).await?;
            log::info!("Downloaded {} {} bytes", pic.display(), size);
            count += 1;
        }
        Ok(count)
    }

    async fn fetch_to(&self, bucket: &str, key: &str, pic: &Path) -> Result<u64> {
        let f = File::create(pic).map_err(|e| Error::Download {
            key: key.to_string(),
            reason: format!("unable to create {}: {}", pic.display(), e),
        })?;
        let mut w = BufWriter::new(f);

        let res = self.source.fetch(bucket, key, &mut w, self.abort).await;
        let res = res.and_then(|size| w.flush().map(|_| size).map_err(Error::from));
        drop(w);

        match res {
            Ok(size) => Ok(size),
            Err(e) => {
                if let Err(rm) = std::fs::remove_file(pic) {
                    log::error!("unable to remove partial file {}: {}", pic.display(), rm);
                }
                if e.is_cancelled() {
                    return Err(e);
                }
                Err(Error::Download {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemorySource;
    use chrono::{DateTime, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 4, 18, 0, 0, 0).unwrap()
    }

    async fn listed(source: &MemorySource) -> Vec<RemoteObject> {
        source.list("mybucket", "", &Abort::new(None)).await.unwrap()
    }

    #[tokio::test]
    async fn writes_files_by_last_segment() {
        let dir = tempfile::tempdir().unwrap();
        let source = MemorySource::default()
            .with("images/2022/a.jpg", t0(), b"aaa")
            .with("images/b.jpg", t0(), b"bb");
        let abort = Abort::new(None);

        let n = DownloadHandler::new(&source, &abort)
            .download("mybucket", dir.path(), &listed(&source).await)
            .await
            .unwrap();

        assert_eq!(n, 2);
        assert_eq!(std::fs::read(dir.path().join("a.jpg")).unwrap(), b"aaa");
        assert_eq!(std::fs::read(dir.path().join("b.jpg")).unwrap(), b"bb");
    }

    #[tokio::test]
    async fn first_failure_aborts_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let source = MemorySource::default()
            .with("images/1.jpg", t0(), b"one")
            .with_failing("images/2.jpg", t0())
            .with("images/3.jpg", t0(), b"three");
        let abort = Abort::new(None);

        let err = DownloadHandler::new(&source, &abort)
            .download("mybucket", dir.path(), &listed(&source).await)
            .await
            .unwrap_err();

        match err {
            Error::Download { key, .. } => assert_eq!(key, "images/2.jpg"),
            other => panic!("unexpected error: {}", other),
        }
        assert!(dir.path().join("1.jpg").exists());
        assert!(!dir.path().join("2.jpg").exists());
        assert!(!dir.path().join("3.jpg").exists());
        assert_eq!(source.fetched(), ["images/1.jpg", "images/2.jpg"]);
    }

    #[tokio::test]
    async fn same_file_name_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let source = MemorySource::default()
            .with("cam1/frame.jpg", t0(), b"first")
            .with("cam2/frame.jpg", t0(), b"second");
        let abort = Abort::new(None);

        let n = DownloadHandler::new(&source, &abort)
            .download("mybucket", dir.path(), &listed(&source).await)
            .await
            .unwrap();

        assert_eq!(n, 2);
        assert_eq!(std::fs::read(dir.path().join("frame.jpg")).unwrap(), b"second");
    }

    #[tokio::test]
    async fn directory_placeholders_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let source = MemorySource::default()
            .with("images/", t0(), b"")
            .with("images/a.jpg", t0(), b"a");
        let abort = Abort::new(None);

        let n = DownloadHandler::new(&source, &abort)
            .download("mybucket", dir.path(), &listed(&source).await)
            .await
            .unwrap();

        assert_eq!(n, 1);
        assert_eq!(source.fetched(), ["images/a.jpg"]);
    }

    #[tokio::test]
    async fn cancelled_run_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = MemorySource::default().with("images/a.jpg", t0(), b"a");
        let objects = listed(&source).await;
        let abort = Abort::new(None);
        abort.stop();

        let err = DownloadHandler::new(&source, &abort)
            .download("mybucket", dir.path(), &objects)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(!dir.path().join("a.jpg").exists());
    }

    #[tokio::test]
    async fn missing_target_dir_is_a_download_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = MemorySource::default().with("images/a.jpg", t0(), b"a");
        let abort = Abort::new(None);

        let err = DownloadHandler::new(&source, &abort)
            .download("mybucket", &dir.path().join("gone"), &listed(&source).await)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Download { .. }));
    }
}

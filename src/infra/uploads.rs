//! Runtime upload storage and retrieval helpers.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};

use crate::domain::uploads::{random_suffix, stored_filename};

/// URL prefix under which stored uploads are served.
pub const PUBLIC_PREFIX: &str = "/uploads";

/// Fresh suffixes tried before giving up on a name collision.
const MAX_NAME_ATTEMPTS: usize = 8;

/// Errors that can occur while interacting with the upload storage backend.
#[derive(Debug, Error)]
pub enum UploadStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result of storing an upload payload.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    /// Name of the file inside the storage root.
    pub stored_name: String,
    /// Web path clients use to fetch the file, e.g. `/uploads/cat_1a2b3c4d.png`.
    pub public_path: String,
    pub absolute_path: PathBuf,
    pub size_bytes: u64,
}

/// Filesystem-backed upload storage.
#[derive(Debug)]
pub struct UploadStorage {
    root: PathBuf,
}

impl UploadStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Write `data` under a freshly derived name.
    ///
    /// The root directory is re-created if it disappeared since start-up.
    /// Existing files are never overwritten.
    pub async fn store(
        &self,
        original_name: &str,
        data: Bytes,
    ) -> Result<StoredUpload, UploadStorageError> {
        self.store_with(original_name, data, random_suffix).await
    }

    async fn store_with(
        &self,
        original_name: &str,
        data: Bytes,
        mut next_suffix: impl FnMut() -> String,
    ) -> Result<StoredUpload, UploadStorageError> {
        fs::create_dir_all(&self.root).await?;

        let mut attempt = 0;
        let (stored_name, absolute_path, mut file) = loop {
            attempt += 1;
            let stored_name = stored_filename(original_name, &next_suffix());
            let absolute_path = self.resolve(&stored_name)?;
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&absolute_path)
                .await
            {
                Ok(file) => break (stored_name, absolute_path, file),
                Err(err)
                    if err.kind() == ErrorKind::AlreadyExists && attempt < MAX_NAME_ATTEMPTS =>
                {
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        };

        if let Err(err) = file.write_all(&data).await {
            drop(file);
            let _ = fs::remove_file(&absolute_path).await;
            return Err(err.into());
        }
        file.flush().await?;

        Ok(StoredUpload {
            public_path: format!("{PUBLIC_PREFIX}/{stored_name}"),
            stored_name,
            absolute_path,
            size_bytes: data.len() as u64,
        })
    }

    /// Attempt to read the stored payload into memory.
    pub async fn read(&self, stored_name: &str) -> Result<Bytes, UploadStorageError> {
        let absolute = self.resolve(stored_name)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    /// Resolve the absolute filesystem path for a stored upload.
    fn resolve(&self, stored_name: &str) -> Result<PathBuf, UploadStorageError> {
        let relative = Path::new(stored_name);
        if stored_name.is_empty()
            || relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::Prefix(_) | Component::RootDir
                )
            })
        {
            return Err(UploadStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_under_suffixed_name_and_reads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = UploadStorage::new(dir.path().to_path_buf()).expect("storage");

        let stored = storage
            .store("notes.txt", Bytes::from_static(b"hello"))
            .await
            .expect("store");

        assert!(stored.stored_name.starts_with("notes_"));
        assert!(stored.stored_name.ends_with(".txt"));
        assert_eq!(stored.public_path, format!("/uploads/{}", stored.stored_name));
        assert_eq!(stored.size_bytes, 5);
        assert_eq!(
            storage.read(&stored.stored_name).await.expect("read"),
            Bytes::from_static(b"hello")
        );
    }

    #[tokio::test]
    async fn recreates_missing_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("uploads");
        let storage = UploadStorage::new(root.clone()).expect("storage");
        std::fs::remove_dir(&root).expect("remove root");

        storage
            .store("a.png", Bytes::from_static(b"x"))
            .await
            .expect("store after root removal");
        assert!(root.is_dir());
    }

    #[tokio::test]
    async fn rejects_traversal_on_read() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = UploadStorage::new(dir.path().to_path_buf()).expect("storage");

        for candidate in ["../secret", "/etc/passwd", "a/../../b", ""] {
            assert!(matches!(
                storage.read(candidate).await,
                Err(UploadStorageError::InvalidPath)
            ));
        }
    }

    #[tokio::test]
    async fn suffix_collision_picks_a_new_name_without_overwriting() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = UploadStorage::new(dir.path().to_path_buf()).expect("storage");
        let taken = dir.path().join("photo_aaaaaaaa.png");
        std::fs::write(&taken, b"first").expect("seed existing upload");

        let mut suffixes = ["aaaaaaaa", "bbbbbbbb"].into_iter();
        let stored = storage
            .store_with("photo.png", Bytes::from_static(b"second"), || {
                suffixes.next().expect("suffix").to_string()
            })
            .await
            .expect("store");

        assert_eq!(stored.stored_name, "photo_bbbbbbbb.png");
        assert_eq!(std::fs::read(&taken).expect("read"), b"first");
        assert_eq!(
            std::fs::read(&stored.absolute_path).expect("read"),
            b"second"
        );
    }

    #[tokio::test]
    async fn gives_up_after_repeated_collisions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = UploadStorage::new(dir.path().to_path_buf()).expect("storage");
        std::fs::write(dir.path().join("photo_aaaaaaaa.png"), b"first").expect("seed");

        let result = storage
            .store_with("photo.png", Bytes::from_static(b"second"), || {
                "aaaaaaaa".to_string()
            })
            .await;

        match result {
            Err(UploadStorageError::Io(err)) => assert_eq!(err.kind(), ErrorKind::AlreadyExists),
            other => panic!("expected collision error, got {other:?}"),
        }
        assert_eq!(
            std::fs::read(dir.path().join("photo_aaaaaaaa.png")).expect("read"),
            b"first"
        );
    }
}

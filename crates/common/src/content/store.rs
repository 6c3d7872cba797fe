use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::io::AsyncWriteExt;
use xxhash_rust::xxh64::Xxh64;

use super::path::{ensure_descendant, storage_file_name};
use super::{ContentError, ContentRecord, Uid, UID_SEED};

/// Sidecar holding the uploaded file name of an object
pub const NAME_FILE: &str = "NAME";
/// Staging directory for uploads still being hashed
pub const INCOMING_DIR: &str = ".incoming";

/// Handle on a content-addressed storage root.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Open the store at `root`, creating it if needed.
    ///
    /// The root is canonicalized so descendant checks compare like with like.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, ContentError> {
        let root = root.as_ref();
        tokio::fs::create_dir_all(root).await?;
        let root = tokio::fs::canonicalize(root).await?;
        tokio::fs::create_dir_all(root.join(INCOMING_DIR)).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the object `uid`
    pub fn content_dir(&self, uid: Uid) -> PathBuf {
        self.root.join(uid.to_string())
    }

    fn staging_path(&self) -> PathBuf {
        self.root
            .join(INCOMING_DIR)
            .join(uuid::Uuid::new_v4().to_string())
    }

    /// Store the bytes of `stream` under the name `file_name`.
    ///
    /// The stream is hashed while it is spooled to a staging file, then the
    /// staging file is moved into place. Nothing outside the staging area is
    /// touched when the name is rejected or the stream fails. Storing bytes
    /// that already exist keeps the existing copy.
    pub async fn write<S, E>(&self, file_name: &str, stream: S) -> Result<ContentRecord, ContentError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let base = storage_file_name(file_name)?;

        let staging = self.staging_path();
        let result = match spool(&staging, stream).await {
            Ok((uid, size_bytes)) => self
                .commit(&staging, uid, &base, file_name)
                .await
                .map(|()| ContentRecord {
                    uid,
                    original_name: file_name.to_string(),
                    size_bytes,
                }),
            Err(e) => Err(e),
        };

        if result.is_err() {
            let _ = tokio::fs::remove_file(&staging).await;
        }
        result
    }

    /// Store an in-memory buffer.
    pub async fn write_bytes(
        &self,
        file_name: &str,
        data: impl Into<Bytes>,
    ) -> Result<ContentRecord, ContentError> {
        let chunk: Result<Bytes, std::io::Error> = Ok(data.into());
        self.write(file_name, futures::stream::iter([chunk])).await
    }

    async fn commit(
        &self,
        staging: &Path,
        uid: Uid,
        base: &str,
        file_name: &str,
    ) -> Result<(), ContentError> {
        let dir = self.content_dir(uid);
        let sidecar = dir.join(NAME_FILE);

        if tokio::fs::try_exists(&sidecar).await? {
            tracing::debug!(%uid, "content already stored, discarding duplicate upload");
            tokio::fs::remove_file(staging).await?;
            return Ok(());
        }

        let target = ensure_descendant(&self.root, &dir.join(base))?;
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::rename(staging, &target).await?;

        // The sidecar goes last; until it exists the object is not visible.
        let sidecar_staging = self.staging_path();
        tokio::fs::write(&sidecar_staging, file_name.as_bytes()).await?;
        if let Err(e) = tokio::fs::rename(&sidecar_staging, &sidecar).await {
            let _ = tokio::fs::remove_file(&sidecar_staging).await;
            return Err(e.into());
        }

        tracing::info!(%uid, file = %base, "stored new content");
        Ok(())
    }

    /// Resolve `uid` to the absolute path of its payload.
    ///
    /// Fails with [`ContentError::NotFound`] when the object, its sidecar or
    /// its payload is missing, and with [`ContentError::PathEscape`] when the
    /// recorded name would leave the storage root.
    pub async fn resolve(&self, uid: Uid) -> Result<PathBuf, ContentError> {
        let dir = self.content_dir(uid);

        let name = match tokio::fs::read(dir.join(NAME_FILE)).await {
            Ok(name) if !name.is_empty() => name,
            Ok(_) => return Err(ContentError::NotFound(uid)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ContentError::NotFound(uid))
            }
            Err(e) => return Err(e.into()),
        };
        let name = String::from_utf8(name)
            .map_err(|e| ContentError::InvalidFileName(String::from_utf8_lossy(e.as_bytes()).into()))?;

        let base = storage_file_name(&name)?;
        let path = ensure_descendant(&self.root, &dir.join(base))?;

        // Follow links too, so nothing planted in the tree can point outside it.
        let real = match tokio::fs::canonicalize(&path).await {
            Ok(real) => real,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ContentError::NotFound(uid))
            }
            Err(e) => return Err(e.into()),
        };
        ensure_descendant(&self.root, &real)
    }
}

/// Copy `stream` into a new file at `path`, hashing as it goes.
async fn spool<S, E>(path: &Path, stream: S) -> Result<(Uid, u64), ContentError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    futures::pin_mut!(stream);

    let mut file = tokio::fs::File::create(path).await?;
    let mut hasher = Xxh64::new(UID_SEED);
    let mut size_bytes = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ContentError::Stream(e.into()))?;
        hasher.update(&chunk);
        file.write_all(&chunk).await?;
        size_bytes += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;

    let uid = Uid::from(hasher.digest());
    tracing::debug!(%uid, size_bytes, "hashed upload");
    Ok((uid, size_bytes))
}

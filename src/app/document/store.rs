use crate::{core::store::ArtifactStore, err, error::DocAssistError, map_err};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Simple FS based implementation of an [ArtifactStore].
/// Artifacts are stored at `{base}/{index}/{document_id}/{name}`.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    /// The base directory to store the artifacts in.
    base: PathBuf,
}

impl FsArtifactStore {
    /// Create the store, creating the base directory if it does not exist.
    pub fn new(path: &str) -> Self {
        std::fs::create_dir_all(path).expect("unable to create upload directory");

        let base = Path::new(path)
            .canonicalize()
            .expect("unable to canonicalize");

        if !base.is_dir() {
            panic!("not a directory: {path}");
        }

        info!("Initialising fs store at {}", base.display());

        Self { base }
    }

    fn document_dir(&self, index: &str, document_id: &str) -> PathBuf {
        self.base.join(index).join(document_id)
    }
}

#[async_trait::async_trait]
impl ArtifactStore for FsArtifactStore {
    fn id(&self) -> &'static str {
        "fs"
    }

    async fn write(
        &self,
        index: &str,
        document_id: &str,
        name: &str,
        content: &[u8],
    ) -> Result<(), DocAssistError> {
        let dir = self.document_dir(index, document_id);
        map_err!(tokio::fs::create_dir_all(&dir).await);

        let path = dir.join(name);
        debug!("Writing {}", path.display());

        map_err!(tokio::fs::write(&path, content).await);
        Ok(())
    }

    async fn read(
        &self,
        index: &str,
        document_id: &str,
        name: &str,
    ) -> Result<Vec<u8>, DocAssistError> {
        let path = self.document_dir(index, document_id).join(name);
        debug!("Reading {}", path.display());

        match tokio::fs::read(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                err!(DoesNotExist, "'{name}' of document '{document_id}' in '{index}'")
            }
            Err(e) => Err(map_err!(Err(e))),
        }
    }

    async fn delete_document(
        &self,
        index: &str,
        document_id: &str,
    ) -> Result<(), DocAssistError> {
        let dir = self.document_dir(index, document_id);
        debug!("Removing {}", dir.display());

        match tokio::fs::remove_dir_all(&dir).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(map_err!(Err(e))),
        }
    }

    async fn delete_index(&self, index: &str) -> Result<(), DocAssistError> {
        let dir = self.base.join(index);
        debug!("Removing {}", dir.display());

        match tokio::fs::remove_dir_all(&dir).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(map_err!(Err(e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ArtifactStore, FsArtifactStore};
    use crate::error::{DocAssistErr, DocAssistError};

    const DIR: &str = "__fs_artifact_store_tests";
    const CONTENT: &str = "Hello world.";

    #[tokio::test]
    async fn works() {
        let store = FsArtifactStore::new(DIR);

        store
            .write("index", "doc", "foo.txt", CONTENT.as_bytes())
            .await
            .unwrap();

        let file = tokio::fs::read_to_string(format!("{DIR}/index/doc/foo.txt"))
            .await
            .unwrap();
        assert_eq!(CONTENT, file);

        let read = store.read("index", "doc", "foo.txt").await.unwrap();
        assert_eq!(CONTENT.as_bytes(), read);

        store
            .write("index", "doc", "foo.txt", b"Overwritten.")
            .await
            .unwrap();
        let read = store.read("index", "doc", "foo.txt").await.unwrap();
        assert_eq!(b"Overwritten.".to_vec(), read);

        let missing = store.read("index", "doc", "bar.txt").await;
        assert!(matches!(
            missing,
            Err(DocAssistError {
                error: DocAssistErr::DoesNotExist(_),
                ..
            })
        ));

        store.delete_document("index", "doc").await.unwrap();
        assert!(store.read("index", "doc", "foo.txt").await.is_err());

        // Deleting twice is fine
        store.delete_document("index", "doc").await.unwrap();

        store.write("other", "doc", "a.txt", b"a").await.unwrap();
        store.delete_index("other").await.unwrap();
        assert!(store.read("other", "doc", "a.txt").await.is_err());

        tokio::fs::remove_dir_all(DIR).await.unwrap();
    }
}

//! FileChunkStore - one JSON document per chunk on disk
//!
//! Layout: `<base_path>/<key>.json` holding `{"samples": [{t,lat,lon,alt,ox,oy,oz}, ...]}`.

use std::path::{Path, PathBuf};

use contracts::{ChunkDocument, ChunkStore, ContractError, FusedSample, SessionChunkKey};
use tracing::{debug, instrument};

const CHUNK_EXTENSION: &str = "json";

/// Chunk store writing JSON files under a base directory
#[derive(Debug, Clone)]
pub struct FileChunkStore {
    name: String,
    base_path: PathBuf,
}

impl FileChunkStore {
    /// Create the store, creating `base_path` if needed
    pub fn new(name: impl Into<String>, base_path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self {
            name: name.into(),
            base_path,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// File path of a chunk
    ///
    /// Keys are restricted to `[A-Za-z0-9_-]` so they cannot escape the base
    /// directory.
    pub fn path_for(&self, key: &SessionChunkKey) -> Result<PathBuf, ContractError> {
        let valid = !key.as_str().is_empty()
            && key
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ContractError::ChunkCodec {
                key: key.to_string(),
                message: "key contains characters not allowed in a file name".to_string(),
            });
        }
        Ok(self
            .base_path
            .join(format!("{}.{CHUNK_EXTENSION}", key.as_str())))
    }

    /// Keys of all stored chunks, sorted
    pub fn list_keys(&self) -> std::io::Result<Vec<SessionChunkKey>> {
        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(CHUNK_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(SessionChunkKey::from(stem));
            }
        }
        keys.sort();
        Ok(keys)
    }
}

impl ChunkStore for FileChunkStore {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_store_put",
        skip(self, samples),
        fields(store = %self.name, key = %key, samples = samples.len())
    )]
    async fn put_chunk(
        &self,
        key: &SessionChunkKey,
        samples: &[FusedSample],
    ) -> Result<(), ContractError> {
        let path = self.path_for(key)?;
        let body = serde_json::to_vec(&ChunkDocument::from_samples(samples)).map_err(|e| {
            ContractError::ChunkCodec {
                key: key.to_string(),
                message: e.to_string(),
            }
        })?;

        // Write-then-rename so readers never see a partial document
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| ContractError::chunk_write(key.as_str(), e.to_string()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| ContractError::chunk_write(key.as_str(), e.to_string()))?;

        debug!(bytes = body.len(), path = %path.display(), "Chunk written");
        Ok(())
    }

    #[instrument(name = "file_store_get", skip(self), fields(store = %self.name, key = %key))]
    async fn get_chunk(&self, key: &SessionChunkKey) -> Result<Vec<FusedSample>, ContractError> {
        let path = self.path_for(key)?;
        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ContractError::ChunkNotFound {
                    key: key.to_string(),
                });
            }
            Err(e) => return Err(ContractError::chunk_read(key.as_str(), e.to_string())),
        };

        let document: ChunkDocument =
            serde_json::from_slice(&body).map_err(|e| ContractError::ChunkCodec {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        Ok(document.into_samples())
    }
}

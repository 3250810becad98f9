//! File-backed policy checkpoints.
//!
//! One file per player under a data directory, framed with magic bytes
//! and a format version, then LZ4-compressed bincode. Compact, fast to
//! load, and easy to wipe per player.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::ai::AiPolicy;
use crate::error::{EngineError, EngineResult};
use crate::store::PolicyStore;

/// Magic bytes for file format identification.
const MAGIC: &[u8; 4] = b"SKIR";

/// Current format version.
const VERSION: u8 = 1;

/// Policy store writing one checkpoint file per player.
#[derive(Debug, Clone)]
pub struct FilePolicyStore {
    dir: PathBuf,
}

impl FilePolicyStore {
    /// Open (and create) the data directory.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> EngineResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| EngineError::storage(format!("create policy dir: {e}")))?;
        Ok(Self { dir })
    }

    /// Path of the checkpoint file for a player.
    #[must_use]
    pub fn policy_path(&self, player_id: &str) -> PathBuf {
        // Keep ids filesystem-safe.
        let safe: String = player_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("policy_{safe}.bin"))
    }

    fn read_policy(path: &Path) -> io::Result<AiPolicy> {
        let mut file = fs::File::open(path)?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "invalid file magic"));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported version: {}", version[0]),
            ));
        }

        let mut compressed = Vec::new();
        file.read_to_end(&mut compressed)?;

        let decompressed = lz4_flex::decompress_size_prepended(&compressed)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        bincode::deserialize(&decompressed)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn write_policy(path: &Path, policy: &AiPolicy) -> io::Result<()> {
        let encoded = bincode::serialize(policy)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let compressed = lz4_flex::compress_prepend_size(&encoded);

        let mut file = fs::File::create(path)?;
        file.write_all(MAGIC)?;
        file.write_all(&[VERSION])?;
        file.write_all(&compressed)?;
        Ok(())
    }
}

#[async_trait]
impl PolicyStore for FilePolicyStore {
    async fn load(&self, player_id: &str) -> EngineResult<Option<AiPolicy>> {
        let path = self.policy_path(player_id);
        if !path.exists() {
            return Ok(None);
        }
        Self::read_policy(&path)
            .map(Some)
            .map_err(|e| EngineError::storage(format!("load policy for {player_id}: {e}")))
    }

    async fn save(&self, policy: &AiPolicy) -> EngineResult<()> {
        let Some(player_id) = &policy.player_id else {
            // Global policies live in code, not on disk.
            return Ok(());
        };
        let path = self.policy_path(player_id);
        Self::write_policy(&path, policy)
            .map_err(|e| EngineError::storage(format!("save policy for {player_id}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = FilePolicyStore::open(dir.path()).unwrap();

        let mut policy = AiPolicy::for_player("u-42");
        policy.record_outcome(Some(true), ["MOVE", "SHOOT"]);

        store.save(&policy).await.unwrap();
        let loaded = store.load("u-42").await.unwrap().unwrap();
        assert_eq!(loaded, policy);
    }

    #[tokio::test]
    async fn test_missing_policy_is_none() {
        let dir = tempdir().unwrap();
        let store = FilePolicyStore::open(dir.path()).unwrap();
        assert!(store.load("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_magic_rejected() {
        let dir = tempdir().unwrap();
        let store = FilePolicyStore::open(dir.path()).unwrap();

        std::fs::write(store.policy_path("bad"), b"BAAD").unwrap();
        let err = store.load("bad").await.unwrap_err();
        assert!(matches!(err, EngineError::Storage(_)));
    }

    #[tokio::test]
    async fn test_global_policy_not_persisted() {
        let dir = tempdir().unwrap();
        let store = FilePolicyStore::open(dir.path()).unwrap();

        store.save(&AiPolicy::global_default()).await.unwrap();
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 0);
    }

    #[test]
    fn test_path_sanitization() {
        let dir = tempdir().unwrap();
        let store = FilePolicyStore::open(dir.path()).unwrap();
        let path = store.policy_path("user/../etc");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name, "policy_user____etc.bin");
    }
}

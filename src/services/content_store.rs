//! Content-addressed blob storage with optional per-project AES-256-GCM envelopes.
//!
//! Grounded on the hash-sharded filesystem layout and write-then-rename idiom of
//! the reference `FileStorageService`, generalized to a flat `<base>/<h0..2>/<h2..4>/<h>`
//! tree and an encrypted envelope variant.

use crate::error::{Error, Result};
use crate::services::key_derivation::derive_project_key;
use aes_gcm::aead::generic_array::typenum::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Key};
use rand::TryRngCore;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// The envelope uses a 16-byte IV per spec, not the 12-byte nonce the `aes-gcm`
/// crate defaults to for `Aes256Gcm`.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

const IV_LEN: usize = 16;
const TAG_LEN: usize = 16;
const STREAM_BUF: usize = 64 * 1024;

#[derive(Clone)]
pub struct ContentStore {
    base_path: PathBuf,
    encrypted: bool,
    master_key: Option<[u8; 32]>,
}

impl ContentStore {
    pub fn new(base_path: impl Into<PathBuf>, encrypted: bool, master_key: Option<[u8; 32]>) -> Self {
        Self {
            base_path: base_path.into(),
            encrypted,
            master_key,
        }
    }

    pub fn blob_path(&self, hash: &str) -> PathBuf {
        let l1 = &hash[0..2];
        let l2 = &hash[2..4];
        self.base_path.join(l1).join(l2).join(hash)
    }

    pub async fn exists(&self, hash: &str) -> bool {
        fs::metadata(self.blob_path(hash)).await.is_ok()
    }

    /// Hashes and stores `source_path`'s bytes, deduplicating on content hash.
    /// When the store is encrypted, the returned hash is the hash of the
    /// ciphertext envelope (IV || ciphertext || tag), not of the plaintext.
    pub async fn store(&self, source_path: &Path, project_id: Option<Uuid>) -> Result<(String, i64)> {
        if self.encrypted {
            self.store_encrypted(source_path, project_id.expect("project id required in encrypted mode"))
                .await
        } else {
            self.store_plain(source_path).await
        }
    }

    async fn store_plain(&self, source_path: &Path) -> Result<(String, i64)> {
        let mut src = fs::File::open(source_path).await?;
        let tmp_path = self.base_path.join(format!(".tmp-{}", Uuid::now_v7()));
        fs::create_dir_all(&self.base_path).await?;
        let mut tmp = fs::File::create(&tmp_path).await?;

        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; STREAM_BUF];
        let mut total: i64 = 0;
        loop {
            use tokio::io::AsyncReadExt;
            let n = src.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            tmp.write_all(&buf[..n]).await?;
            total += n as i64;
        }
        tmp.flush().await?;
        drop(tmp);

        let hash = hex::encode(hasher.finalize());
        self.finalize_temp(tmp_path, &hash, total).await
    }

    async fn store_encrypted(&self, source_path: &Path, project_id: Uuid) -> Result<(String, i64)> {
        let master = self
            .master_key
            .ok_or_else(|| Error::Internal("encryption enabled but no master key configured".into()))?;
        let key = derive_project_key(&master, project_id);

        let plaintext = fs::read(source_path).await?;

        let mut iv = [0u8; IV_LEN];
        rand::rngs::OsRng
            .try_fill_bytes(&mut iv)
            .expect("os rng failure");

        let cipher = Aes256Gcm16::new(Key::<Aes256Gcm16>::from_slice(key.as_ref()));
        let nonce = aes_gcm::aead::generic_array::GenericArray::from_slice(&iv);
        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_ref())
            .map_err(|_| Error::Internal("envelope encryption failed".into()))?;

        let mut envelope = Vec::with_capacity(IV_LEN + ciphertext.len());
        envelope.extend_from_slice(&iv);
        envelope.extend_from_slice(&ciphertext);

        let hash = hex::encode(Sha256::digest(&envelope));
        let total = envelope.len() as i64;

        fs::create_dir_all(&self.base_path).await?;
        let tmp_path = self.base_path.join(format!(".tmp-{}", Uuid::now_v7()));
        fs::write(&tmp_path, &envelope).await?;
        self.finalize_temp(tmp_path, &hash, total).await
    }

    async fn finalize_temp(&self, tmp_path: PathBuf, hash: &str, size: i64) -> Result<(String, i64)> {
        let final_path = self.blob_path(hash);
        if fs::metadata(&final_path).await.is_ok() {
            // Already stored under this hash; drop the duplicate write.
            let _ = fs::remove_file(&tmp_path).await;
            return Ok((hash.to_string(), size));
        }
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(&tmp_path, &final_path).await?;
        Ok((hash.to_string(), size))
    }

    /// Reads and, if encrypted, decrypts the blob for `hash`. A tag mismatch
    /// is fatal and never returned as data.
    pub async fn read(&self, hash: &str, project_id: Option<Uuid>) -> Result<Vec<u8>> {
        let path = self.blob_path(hash);
        let raw = fs::read(&path)
            .await
            .map_err(|_| Error::StorageInconsistent(hash.to_string()))?;

        if !self.encrypted {
            return Ok(raw);
        }

        let project_id = project_id.expect("project id required in encrypted mode");
        let master = self
            .master_key
            .ok_or_else(|| Error::Internal("encryption enabled but no master key configured".into()))?;
        let key = derive_project_key(&master, project_id);

        if raw.len() < IV_LEN + TAG_LEN {
            return Err(Error::CorruptedContent(hash.to_string()));
        }
        let (iv, ciphertext) = raw.split_at(IV_LEN);
        let cipher = Aes256Gcm16::new(Key::<Aes256Gcm16>::from_slice(key.as_ref()));
        let nonce = aes_gcm::aead::generic_array::GenericArray::from_slice(iv);
        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| Error::CorruptedContent(hash.to_string()))
    }

    pub async fn delete(&self, hash: &str) -> Result<()> {
        match fs::remove_file(self.blob_path(hash)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::io::AsyncWriteExt as _;

    async fn write_source(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).await.unwrap();
        f.write_all(data).await.unwrap();
        path
    }

    #[tokio::test]
    async fn store_is_content_addressed_and_dedupes() {
        let dir = tempdir().unwrap();
        let store = ContentStore::new(dir.path().join("blobs"), false, None);
        let src = write_source(dir.path(), "a.bin", b"hello world").await;

        let (h1, size1) = store.store(&src, None).await.unwrap();
        let (h2, size2) = store.store(&src, None).await.unwrap();

        assert_eq!(h1, h2);
        assert_eq!(size1, size2);
        assert!(store.exists(&h1).await);
    }

    #[tokio::test]
    async fn encrypted_round_trip() {
        let dir = tempdir().unwrap();
        let store = ContentStore::new(dir.path().join("blobs"), true, Some([9u8; 32]));
        let src = write_source(dir.path(), "secret.bin", b"top secret bytes").await;
        let project = Uuid::now_v7();

        let (hash, _) = store.store(&src, Some(project)).await.unwrap();
        let plaintext = store.read(&hash, Some(project)).await.unwrap();
        assert_eq!(plaintext, b"top secret bytes");
    }

    #[tokio::test]
    async fn tampered_ciphertext_is_rejected() {
        let dir = tempdir().unwrap();
        let store = ContentStore::new(dir.path().join("blobs"), true, Some([9u8; 32]));
        let src = write_source(dir.path(), "secret.bin", b"top secret bytes").await;
        let project = Uuid::now_v7();

        let (hash, _) = store.store(&src, Some(project)).await.unwrap();
        let path = store.blob_path(&hash);
        let mut bytes = fs::read(&path).await.unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&path, &bytes).await.unwrap();

        let err = store.read(&hash, Some(project)).await.unwrap_err();
        assert!(matches!(err, Error::CorruptedContent(_)));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = ContentStore::new(dir.path().join("blobs"), false, None);
        store.delete("does-not-exist").await.unwrap();
    }
}

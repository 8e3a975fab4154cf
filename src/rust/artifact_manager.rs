use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::classifier::builder::{VOCABULARY_FILE, WEIGHTS_FILE};

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Artifacts not downloaded: {0}")]
    NotDownloaded(String),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Artifact verification failed")]
    VerificationFailed,
    #[error("Hash mismatch: expected {expected}, got {actual} for {file_type} file")]
    HashMismatch {
        file_type: String,
        expected: String,
        actual: String,
    },
}

/// Where to fetch a named artifact set from and what it must hash to.
#[derive(Debug, Clone)]
pub struct ArtifactInfo {
    pub name: String,
    pub vocabulary_url: String,
    pub weights_url: String,
    /// Lowercase hex SHA-256 of the vocabulary file
    pub vocabulary_hash: String,
    /// Lowercase hex SHA-256 of the weights file
    pub weights_hash: String,
}

/// Caches vocabulary and weight artifacts on disk under `<dir>/<name>/`.
#[derive(Clone)]
pub struct ArtifactManager {
    artifacts_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ArtifactManager {
    /// Creates a new ArtifactManager with the default artifacts directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_artifacts_dir())
    }

    /// Returns the default artifacts directory path
    pub fn get_default_artifacts_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var("MOODLENS_CACHE") {
            return PathBuf::from(path).join("artifacts");
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("moodlens").join("artifacts");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("moodlens").join("artifacts");
        }

        // 4. If all else fails, use system temp directory
        env::temp_dir().join("moodlens").join("artifacts")
    }

    pub fn new<P: AsRef<Path>>(artifacts_dir: P) -> io::Result<Self> {
        let artifacts_dir = artifacts_dir.as_ref().to_path_buf();
        fs::create_dir_all(&artifacts_dir)?;
        Ok(Self {
            artifacts_dir,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    /// Directory holding one named artifact set
    pub fn get_artifact_dir(&self, name: &str) -> PathBuf {
        self.artifacts_dir.join(name)
    }

    pub fn get_vocabulary_path(&self, name: &str) -> PathBuf {
        self.get_artifact_dir(name).join(VOCABULARY_FILE)
    }

    pub fn get_weights_path(&self, name: &str) -> PathBuf {
        self.get_artifact_dir(name).join(WEIGHTS_FILE)
    }

    pub fn is_downloaded(&self, name: &str) -> bool {
        let vocabulary_path = self.get_vocabulary_path(name);
        let weights_path = self.get_weights_path(name);
        log::debug!(
            "Checking artifacts '{}': vocabulary {:?} (exists: {}), weights {:?} (exists: {})",
            name,
            vocabulary_path,
            vocabulary_path.exists(),
            weights_path,
            weights_path.exists()
        );
        vocabulary_path.exists() && weights_path.exists()
    }

    pub async fn download(&self, info: &ArtifactInfo) -> Result<(), ArtifactError> {
        let _lock = self.download_lock.lock().await;

        let artifact_dir = self.get_artifact_dir(&info.name);
        log::info!("Creating artifact directory at {:?}", artifact_dir);
        fs::create_dir_all(&artifact_dir)?;

        let vocabulary_path = self.get_vocabulary_path(&info.name);
        let vocabulary_result = self
            .fetch_if_stale(&info.vocabulary_url, &vocabulary_path, &info.vocabulary_hash, "vocabulary")
            .await;

        let weights_path = self.get_weights_path(&info.name);
        let weights_result = self
            .fetch_if_stale(&info.weights_url, &weights_path, &info.weights_hash, "weights")
            .await;

        match (vocabulary_result, weights_result) {
            (Ok(()), Ok(())) => {
                log::info!("Artifacts '{}' ready to use", info.name);
                Ok(())
            }
            (Err(e), _) | (_, Err(e)) => {
                log::error!("Failed to set up artifacts '{}': {}", info.name, e);
                let _ = self.remove_download(&info.name);
                Err(e)
            }
        }
    }

    async fn fetch_if_stale(
        &self,
        url: &str,
        path: &Path,
        expected_hash: &str,
        file_type: &str,
    ) -> Result<(), ArtifactError> {
        if path.exists() {
            log::info!("{} file exists at {:?}, verifying...", file_type, path);
            if self.verify_file(path, expected_hash)? {
                log::info!("Existing {} file verified successfully", file_type);
                return Ok(());
            }
            log::warn!("{} file verification failed, redownloading", file_type);
        }
        self.download_and_verify_file(url, path, expected_hash, file_type).await
    }

    fn verify_file(&self, path: &Path, expected_hash: &str) -> Result<bool, ArtifactError> {
        let bytes = fs::read(path)?;
        let hash = sha256_hex(&bytes);
        log::debug!("Verifying {:?}: calculated {}, expected {}", path, hash, expected_hash);
        Ok(hash.eq_ignore_ascii_case(expected_hash))
    }

    /// Checks both files of an artifact set against their expected digests.
    /// Missing files verify as `false`, not as an error.
    pub fn verify(&self, info: &ArtifactInfo) -> Result<bool, ArtifactError> {
        let vocabulary_path = self.get_vocabulary_path(&info.name);
        let weights_path = self.get_weights_path(&info.name);

        if !vocabulary_path.exists() || !weights_path.exists() {
            log::info!("Artifacts '{}' are incomplete", info.name);
            return Ok(false);
        }

        let vocabulary_ok = self.verify_file(&vocabulary_path, &info.vocabulary_hash)?;
        let weights_ok = self.verify_file(&weights_path, &info.weights_hash)?;

        log::info!(
            "Verification of '{}': vocabulary {}, weights {}",
            info.name,
            vocabulary_ok,
            weights_ok
        );

        Ok(vocabulary_ok && weights_ok)
    }

    async fn download_and_verify_file(
        &self,
        url: &str,
        path: &Path,
        expected_hash: &str,
        file_type: &str,
    ) -> Result<(), ArtifactError> {
        log::info!("Downloading {} file from {} to {:?}", file_type, url, path);
        let response = reqwest::get(url).await?.error_for_status()?;
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());

        let hash = sha256_hex(&bytes);
        if !hash.eq_ignore_ascii_case(expected_hash) {
            log::error!("{} hash mismatch: expected {}, got {}", file_type, expected_hash, hash);
            return Err(ArtifactError::HashMismatch {
                file_type: file_type.to_string(),
                expected: expected_hash.to_string(),
                actual: hash,
            });
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &bytes)?;

        if !self.verify_file(path, expected_hash)? {
            return Err(ArtifactError::VerificationFailed);
        }

        log::info!("{} file downloaded and verified successfully", file_type);
        Ok(())
    }

    pub fn remove_download(&self, name: &str) -> Result<(), ArtifactError> {
        for path in [self.get_vocabulary_path(name), self.get_weights_path(name)] {
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Ensures that an artifact set is downloaded and verified.
    /// If it doesn't exist, it will be downloaded.
    /// If verification fails, it will be re-downloaded.
    pub async fn ensure_downloaded(&self, info: &ArtifactInfo) -> Result<(), ArtifactError> {
        if !self.is_downloaded(&info.name) {
            log::info!("Artifacts '{}' not found, downloading...", info.name);
            self.download(info).await?;
        } else if !self.verify(info)? {
            log::info!("Artifacts '{}' failed verification, re-downloading...", info.name);
            self.remove_download(&info.name)?;
            self.download(info).await?;
        }
        Ok(())
    }

    /// Fails with [`ArtifactError::NotDownloaded`] unless both files are present.
    pub fn require(&self, name: &str) -> Result<PathBuf, ArtifactError> {
        if self.is_downloaded(name) {
            Ok(self.get_artifact_dir(name))
        } else {
            Err(ArtifactError::NotDownloaded(name.to_string()))
        }
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

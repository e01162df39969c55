use crate::error::StoreError;
use crate::types::AccessCredential;
use anyhow::{anyhow, Result};
use directories::ProjectDirs;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const CACHE_FILE: &str = "auth_cache.json";

/// Single-record file holding the access credential between runs.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "pocket", "pocket")
            .ok_or_else(|| anyhow!("Could not determine project directories"))?;
        Ok(proj_dirs.data_dir().join(CACHE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<AccessCredential, StoreError> {
        let unavailable = |reason: String| StoreError::Unavailable {
            path: self.path.clone(),
            reason,
        };

        let file = File::open(&self.path).map_err(|e| unavailable(e.to_string()))?;
        let credential: AccessCredential =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| unavailable(e.to_string()))?;

        if credential.access_token().is_empty() {
            return Err(unavailable("empty access token".to_string()));
        }

        debug!(path = %self.path.display(), "Loaded cached credential");
        Ok(credential)
    }

    /// Overwrites any previous record. Success is only reported once the bytes are on disk.
    pub fn save(&self, credential: &AccessCredential) -> Result<(), StoreError> {
        self.write(credential).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, credential: &AccessCredential) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(&self.path)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = file.metadata()?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms)?;
        }

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, credential)?;
        writer.write_all(b"\n")?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    }
}

use std::{fs, io, path::Path, path::PathBuf, sync::Mutex};

use crate::auth::{Credential, CredentialStore};
use crate::error::StoreError;

pub const DEFAULT_CREDENTIALS_PATH: &str = "data/credentials.json";

// Credential pair persisted as JSON, written via tmp file + rename.
// The last pair read or written is cached so `get` does not hit disk.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    cached: Mutex<Option<Credential>>,
}

impl FileCredentialStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            cached: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn load_credentials(path: &Path) -> Result<Credential, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StoreError::Missing),
        Err(e) => return Err(StoreError::Io(e)),
    };
    let credential: Credential = serde_json::from_str(&text)?;
    Ok(credential)
}

pub fn save_credentials(path: &Path, credential: &Credential) -> Result<(), StoreError> {
    let tmp_path = path.with_extension("json.tmp");
    let text = serde_json::to_string_pretty(credential)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(&tmp_path, text)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Result<Credential, StoreError> {
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(c) = cached.as_ref() {
            return Ok(c.clone());
        }
        let loaded = load_credentials(&self.path)?;
        *cached = Some(loaded.clone());
        Ok(loaded)
    }

    fn set(&self, credential: Credential) -> Result<(), StoreError> {
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        save_credentials(&self.path, &credential)?;
        *cached = Some(credential);
        Ok(())
    }
}

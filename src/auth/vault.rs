use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::error::VaultError;
use crate::session::state::Grant;

/// A session as kept between restarts
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub username: String,
    pub token: String,
    pub refresh_token: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl StoredSession {
    pub fn from_grant(grant: &Grant) -> Self {
        Self {
            username: grant.username.clone(),
            token: grant.token.clone(),
            refresh_token: grant.refresh_token.clone(),
            saved_at: Utc::now(),
        }
    }

    pub fn into_grant(self) -> Grant {
        Grant {
            username: self.username,
            token: self.token,
            refresh_token: self.refresh_token,
        }
    }

    /// SHA-256 over the length-prefixed fields, so no two field splits hash alike
    fn integrity_hash(&self) -> String {
        let mut hasher = Sha256::new();
        let mut field = |value: &str| {
            hasher.update((value.len() as u64).to_be_bytes());
            hasher.update(value.as_bytes());
        };
        field(&self.username);
        field(&self.token);
        match &self.refresh_token {
            Some(refresh_token) => {
                field("1");
                field(refresh_token);
            }
            None => field("0"),
        }
        field(&self.saved_at.to_rfc3339());
        format!("{:x}", hasher.finalize())
    }
}

impl fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredSession")
            .field("username", &self.username)
            .field("saved_at", &self.saved_at)
            .finish_non_exhaustive()
    }
}

/// On-disk layout: the session fields plus their hash
#[derive(Serialize, Deserialize)]
struct VaultPayload {
    #[serde(flatten)]
    session: StoredSession,
    integrity_hash: String,
}

/// Where a signed-in session is kept between restarts
#[async_trait]
pub trait TokenVault: Send + Sync {
    async fn save(&self, session: &StoredSession) -> Result<(), VaultError>;

    /// `Ok(None)` when nothing is stored
    async fn load(&self) -> Result<Option<StoredSession>, VaultError>;

    async fn clear(&self) -> Result<(), VaultError>;
}

/// Keeps the session only for the lifetime of the process
#[derive(Default)]
pub struct EphemeralVault {
    slot: RwLock<Option<StoredSession>>,
}

impl EphemeralVault {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenVault for EphemeralVault {
    async fn save(&self, session: &StoredSession) -> Result<(), VaultError> {
        *self.slot.write().await = Some(session.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<StoredSession>, VaultError> {
        Ok(self.slot.read().await.clone())
    }

    async fn clear(&self) -> Result<(), VaultError> {
        *self.slot.write().await = None;
        Ok(())
    }
}

/// JSON file with a SHA-256 integrity hash over the session fields
pub struct FileVault {
    path: PathBuf,
}

impl FileVault {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl TokenVault for FileVault {
    async fn save(&self, session: &StoredSession) -> Result<(), VaultError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let payload = VaultPayload {
            integrity_hash: session.integrity_hash(),
            session: session.clone(),
        };
        fs::write(&self.path, serde_json::to_vec_pretty(&payload)?).await?;

        info!(username = %session.username, path = %self.path.display(), "Session stored");
        Ok(())
    }

    async fn load(&self) -> Result<Option<StoredSession>, VaultError> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No stored session");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let payload: VaultPayload = serde_json::from_slice(&raw)?;
        if payload.session.integrity_hash() != payload.integrity_hash {
            error!(
                path = %self.path.display(),
                "Stored session integrity check failed, possible tampering"
            );
            return Err(VaultError::Tampered);
        }

        debug!(username = %payload.session.username, "Stored session loaded");
        Ok(Some(payload.session))
    }

    async fn clear(&self) -> Result<(), VaultError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(path = %self.path.display(), "Stored session removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

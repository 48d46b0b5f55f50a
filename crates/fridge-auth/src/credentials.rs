//! Credential storage for session tokens
//!
//! The store is the single source of truth for the access token, the refresh
//! token, and the cached profile of the signed-in user. The pipeline holds no
//! copy of its own: it reads the access token per request and writes a new
//! pair once per successful renewal.
//!
//! `FileCredentialStore` persists to a JSON file. All writes use atomic
//! temp-file + rename so a crash mid-write never leaves a half-updated token
//! pair behind. A tokio Mutex serializes writers; the published state sits
//! behind its own lock so readers never queue behind a file write.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Cached profile of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: u64,
    pub email: String,
    pub nickname: String,
}

/// On-disk shape of the credential file.
#[derive(Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<UserInfo>,
}

/// Durable key-value storage for session credentials.
///
/// Both tokens are always replaced together, and `clear` removes all three
/// values in a single write. Uses `Pin<Box<dyn Future>>` return types for
/// dyn-compatibility (`Arc<dyn CredentialStore>`).
pub trait CredentialStore: Send + Sync {
    fn access_token(&self) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + '_>>;

    fn refresh_token(&self) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + '_>>;

    /// Replace the access/refresh pair in one write.
    fn save_tokens(
        &self,
        access: String,
        refresh: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    fn user(&self) -> Pin<Box<dyn Future<Output = Result<Option<UserInfo>>> + Send + '_>>;

    fn save_user(&self, user: UserInfo) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Remove access token, refresh token and cached user in one write.
    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// JSON file backed credential store.
///
/// Reads take the state lock only long enough to clone a field. Writers hold
/// `writer` across the disk write and take the state lock just to publish,
/// so request-time reads don't wait on disk I/O.
pub struct FileCredentialStore {
    path: PathBuf,
    writer: Mutex<()>,
    state: RwLock<StoredSession>,
}

impl FileCredentialStore {
    /// Load credentials from the given file path.
    ///
    /// If the file doesn't exist, creates it as `{}` (signed-out cold start).
    /// Missing parent directories are created.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading credential file: {e}")))?;
            let session: StoredSession = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;
            info!(
                path = %path.display(),
                signed_in = session.refresh_token.is_some(),
                "loaded credentials"
            );
            session
        } else {
            info!(path = %path.display(), "credential file not found, starting signed out");
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(dir)
                    .await
                    .map_err(|e| Error::Io(format!("creating credential directory: {e}")))?;
            }
            let session = StoredSession::default();
            write_atomic(&path, &session).await?;
            session
        };

        Ok(Self {
            path,
            writer: Mutex::new(()),
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `update` to a copy of the state, persist it, then publish it.
    ///
    /// The in-memory state only changes after the file write succeeded, so
    /// readers never observe a value that is not on disk.
    async fn update(&self, update: impl FnOnce(&mut StoredSession)) -> Result<()> {
        let _writer = self.writer.lock().await;
        let mut next = self.state.read().await.clone();
        update(&mut next);
        write_atomic(&self.path, &next).await?;
        *self.state.write().await = next;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn access_token(&self) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + '_>> {
        Box::pin(async move { Ok(self.state.read().await.access_token.clone()) })
    }

    fn refresh_token(&self) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + '_>> {
        Box::pin(async move { Ok(self.state.read().await.refresh_token.clone()) })
    }

    fn save_tokens(
        &self,
        access: String,
        refresh: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.update(|s| {
                s.access_token = Some(access);
                s.refresh_token = Some(refresh);
            })
            .await?;
            debug!("saved token pair");
            Ok(())
        })
    }

    fn user(&self) -> Pin<Box<dyn Future<Output = Result<Option<UserInfo>>> + Send + '_>> {
        Box::pin(async move { Ok(self.state.read().await.user.clone()) })
    }

    fn save_user(&self, user: UserInfo) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let user_id = user.id;
            self.update(|s| s.user = Some(user)).await?;
            debug!(user_id, "saved user info");
            Ok(())
        })
    }

    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.update(|s| *s = StoredSession::default()).await?;
            info!("cleared stored credentials");
            Ok(())
        })
    }
}

/// In-process credential store with the same semantics as the file store.
#[derive(Default)]
pub struct MemoryCredentialStore {
    state: Mutex<StoredSession>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token pair.
    pub fn with_tokens(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(StoredSession {
                access_token: Some(access.into()),
                refresh_token: Some(refresh.into()),
                user: None,
            }),
        }
    }

    /// Store holding an access token but no refresh token.
    pub fn with_access_only(access: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(StoredSession {
                access_token: Some(access.into()),
                ..StoredSession::default()
            }),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn access_token(&self) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + '_>> {
        Box::pin(async move { Ok(self.state.lock().await.access_token.clone()) })
    }

    fn refresh_token(&self) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + '_>> {
        Box::pin(async move { Ok(self.state.lock().await.refresh_token.clone()) })
    }

    fn save_tokens(
        &self,
        access: String,
        refresh: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.access_token = Some(access);
            state.refresh_token = Some(refresh);
            Ok(())
        })
    }

    fn user(&self) -> Pin<Box<dyn Future<Output = Result<Option<UserInfo>>> + Send + '_>> {
        Box::pin(async move { Ok(self.state.lock().await.user.clone()) })
    }

    fn save_user(&self, user: UserInfo) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.state.lock().await.user = Some(user);
            Ok(())
        })
    }

    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            *self.state.lock().await = StoredSession::default();
            Ok(())
        })
    }
}

/// Write the session to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Sets file permissions to 0600 (owner read/write only) since
/// the file contains session tokens.
async fn write_atomic(path: &Path, data: &StoredSession) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::CredentialParse(format!("serializing credentials: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("credential path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".credentials.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credentials");
    Ok(())
}

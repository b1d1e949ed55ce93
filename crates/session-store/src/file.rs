//! File-backed session store
//!
//! Persists the session map as a JSON file so logins survive a process
//! restart. All writes go through atomic temp-file + rename to prevent
//! corruption on crash, and the file is chmod 0600 because pending
//! records contain live provider request secrets.
//!
//! A tokio Mutex serializes writers; reads take the lock briefly to clone
//! the record. Expired entries are dropped at load time and swept on each
//! write; a `get` of a stale entry hides it without touching disk, and the
//! next write reclaims it.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::record::{SessionRecord, SessionState};
use crate::store::SessionStore;

/// Durable session store backed by a JSON file.
pub struct FileStore {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    state: Mutex<HashMap<String, SessionRecord>>,
}

impl FileStore {
    /// Load sessions from the given file path.
    ///
    /// A missing file is a cold start: it is created as `{}` so future
    /// loads skip this path. Entries already past their expiry are not
    /// loaded.
    pub async fn load(path: PathBuf, clock: Arc<dyn Clock>) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading session file: {e}")))?;
            let mut sessions: HashMap<String, SessionRecord> = serde_json::from_str(&contents)
                .map_err(|e| Error::Parse(format!("parsing session file: {e}")))?;
            let now = clock.now();
            let before = sessions.len();
            sessions.retain(|_, r| !r.expired_at(now));
            info!(
                path = %path.display(),
                sessions = sessions.len(),
                expired = before - sessions.len(),
                "loaded session file"
            );
            sessions
        } else {
            info!(path = %path.display(), "session file not found, starting empty");
            let sessions = HashMap::new();
            write_atomic(&path, &sessions).await?;
            sessions
        };

        Ok(Self {
            path,
            clock,
            state: Mutex::new(state),
        })
    }

    /// Number of live (non-expired) records.
    pub async fn len(&self) -> usize {
        let now = self.clock.now();
        let state = self.state.lock().await;
        state.values().filter(|r| !r.expired_at(now)).count()
    }
}

impl SessionStore for FileStore {
    fn put<'a>(
        &'a self,
        session_id: &'a str,
        state: SessionState,
        ttl: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let now = self.clock.now();
            let record = SessionRecord {
                state,
                expires_at: now + ttl.as_secs(),
            };
            let mut map = self.state.lock().await;
            map.retain(|_, r| !r.expired_at(now));
            map.insert(session_id.to_string(), record);
            write_atomic(&self.path, &map).await
        })
    }

    fn get<'a>(
        &'a self,
        session_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<SessionRecord>>> + Send + 'a>> {
        Box::pin(async move {
            let now = self.clock.now();
            let map = self.state.lock().await;
            match map.get(session_id) {
                Some(record) if record.expired_at(now) => Ok(None),
                Some(record) => Ok(Some(record.clone())),
                None => Ok(None),
            }
        })
    }
}

/// Write the session map to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target, so a crash mid-write can never leave a truncated file.
/// Permissions are 0600 since pending records carry request secrets.
async fn write_atomic(path: &Path, data: &HashMap<String, SessionRecord>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::Parse(format!("serializing sessions: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("session file path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".sessions.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp session file: {e}")))?;

    // Set 0600 permissions (unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting session file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp session file: {e}")))?;

    debug!(path = %path.display(), "persisted sessions");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::record::UserIdentity;

    fn pending(secret: &str) -> SessionState {
        SessionState::Pending {
            request_secret: secret.into(),
        }
    }

    #[tokio::test]
    async fn cold_start_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        let clock = Arc::new(ManualClock::new(1_000));

        assert!(!path.exists());
        let store = FileStore::load(path.clone(), clock).await.unwrap();
        assert_eq!(store.len().await, 0);
        assert!(path.exists());

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: HashMap<String, SessionRecord> = serde_json::from_str(&contents).unwrap();
        assert!(parsed.is_empty());
    }

    #[tokio::test]
    async fn sessions_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        let clock = Arc::new(ManualClock::new(1_000));

        let store = FileStore::load(path.clone(), clock.clone()).await.unwrap();
        let identity = UserIdentity {
            provider_user_id: "42".into(),
            display_name: "Ada".into(),
            handle: "ada".into(),
            avatar_url: String::new(),
        };
        store
            .put(
                "abc123",
                SessionState::Authenticated { identity },
                Duration::from_secs(3_600),
            )
            .await
            .unwrap();

        let store2 = FileStore::load(path, clock).await.unwrap();
        let record = store2.get("abc123").await.unwrap().unwrap();
        assert_eq!(record.state.label(), "authenticated");
        assert_eq!(record.expires_at, 4_600);
    }

    #[tokio::test]
    async fn expired_entries_dropped_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        let clock = Arc::new(ManualClock::new(1_000));

        let store = FileStore::load(path.clone(), clock.clone()).await.unwrap();
        store
            .put("short", pending("s1"), Duration::from_secs(10))
            .await
            .unwrap();
        store
            .put("long", pending("s2"), Duration::from_secs(10_000))
            .await
            .unwrap();

        clock.advance(100);
        let store2 = FileStore::load(path, clock).await.unwrap();
        assert!(store2.get("short").await.unwrap().is_none());
        assert!(store2.get("long").await.unwrap().is_some());
        assert_eq!(store2.len().await, 1);
    }

    #[tokio::test]
    async fn get_past_ttl_is_none_without_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        let clock = Arc::new(ManualClock::new(1_000));

        let store = FileStore::load(path, clock.clone()).await.unwrap();
        store
            .put("abc123", pending("sec1"), Duration::from_secs(60))
            .await
            .unwrap();

        clock.advance(61);
        assert!(store.get("abc123").await.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_permissions_are_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        let clock = Arc::new(ManualClock::new(1_000));

        let store = FileStore::load(path.clone(), clock).await.unwrap();
        store
            .put("abc123", pending("sec1"), Duration::from_secs(60))
            .await
            .unwrap();

        let metadata = tokio::fs::metadata(&path).await.unwrap();
        let mode = metadata.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "session file must be 0600, got {mode:o}");
    }

    #[tokio::test]
    async fn corrupt_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        tokio::fs::write(&path, "not json at all").await.unwrap();

        let clock = Arc::new(ManualClock::new(1_000));
        let result = FileStore::load(path, clock).await;
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[tokio::test]
    async fn concurrent_writes_dont_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        let clock = Arc::new(ManualClock::new(1_000));
        let store = Arc::new(FileStore::load(path.clone(), clock).await.unwrap());

        let mut handles = vec![];
        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .put(
                        &format!("sid-{i}"),
                        SessionState::Pending {
                            request_secret: format!("sec-{i}"),
                        },
                        Duration::from_secs(900),
                    )
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(store.len().await, 10);
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: HashMap<String, SessionRecord> = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.len(), 10);
    }
}

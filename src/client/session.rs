use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::models::UserSummary;

/// What survives a client restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("session storage i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("stored session is unreadable: {0}")]
    Format(#[from] serde_json::Error),
}

/// Durable slot for at most one session.
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Result<Option<StoredSession>, StorageError>;
    fn save(&self, session: &StoredSession) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// Keeps the session as a JSON file. Saves replace the file in one rename,
/// so a crash mid-write leaves the previous session intact.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> Result<Option<StoredSession>, StorageError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, session: &StoredSession) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(session)?;
        // The temp file must live on the same filesystem for the rename to be atomic.
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&bytes)?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Process-local storage, mostly for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    slot: Mutex<Option<StoredSession>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: StoredSession) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> Result<Option<StoredSession>, StorageError> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, session: &StoredSession) -> Result<(), StorageError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Anonymous,
    Authenticated(StoredSession),
}

/// The token to attach to one request, and the session it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub token: Option<String>,
    pub epoch: u64,
}

/// Delivered to subscribers when the server rejects the current session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInvalidated {
    pub user: UserSummary,
    pub epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&SessionInvalidated) + Send + Sync>;

struct Current {
    state: SessionState,
    epoch: u64,
}

/// Owns the client's authentication state.
///
/// Every login, registration and logout starts a new epoch. Requests carry
/// the epoch they were sent under, so a 401 for an old session cannot log
/// out a newer one, and a burst of 401s for the same session ends it once.
pub struct SessionManager {
    current: RwLock<Current>,
    storage: Box<dyn SessionStorage>,
    subscribers: Mutex<Vec<(SubscriptionId, Callback)>>,
    next_subscription: AtomicU64,
}

impl SessionManager {
    /// Restores a persisted session if there is a readable one.
    pub fn initialize(storage: impl SessionStorage + 'static) -> Self {
        let state = match storage.load() {
            Ok(Some(session)) => {
                log::debug!("restored session for user {}", session.user.id);
                SessionState::Authenticated(session)
            }
            Ok(None) => SessionState::Anonymous,
            Err(e) => {
                log::warn!("ignoring stored session: {}", e);
                SessionState::Anonymous
            }
        };

        Self {
            current: RwLock::new(Current { state, epoch: 0 }),
            storage: Box::new(storage),
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    pub fn state(&self) -> SessionState {
        self.read(|current| current.state.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read(|current| matches!(current.state, SessionState::Authenticated(_)))
    }

    pub fn current_user(&self) -> Option<UserSummary> {
        self.read(|current| match &current.state {
            SessionState::Authenticated(session) => Some(session.user.clone()),
            SessionState::Anonymous => None,
        })
    }

    pub fn epoch(&self) -> u64 {
        self.read(|current| current.epoch)
    }

    pub fn credential(&self) -> Credential {
        self.read(|current| Credential {
            token: match &current.state {
                SessionState::Authenticated(session) => Some(session.token.clone()),
                SessionState::Anonymous => None,
            },
            epoch: current.epoch,
        })
    }

    /// Replaces whatever session exists with a new one.
    pub fn login(&self, token: String, user: UserSummary) {
        let session = StoredSession { token, user };
        let mut current = self.write();
        if let Err(e) = self.storage.save(&session) {
            log::warn!("could not persist session: {}", e);
        }
        current.epoch += 1;
        log::info!("session started for user {} (epoch {})", session.user.id, current.epoch);
        current.state = SessionState::Authenticated(session);
    }

    pub fn register(&self, token: String, user: UserSummary) {
        self.login(token, user);
    }

    pub fn logout(&self) {
        let mut current = self.write();
        self.clear_storage();
        current.epoch += 1;
        current.state = SessionState::Anonymous;
        log::info!("logged out (epoch {})", current.epoch);
    }

    /// Ends the session a rejected request was sent under.
    ///
    /// Returns `true` only for the call that actually ended the session.
    pub fn handle_unauthorized(&self, epoch: u64) -> bool {
        let invalidated = {
            let mut current = self.write();
            if current.epoch != epoch {
                log::debug!("ignoring 401 from epoch {} (now {})", epoch, current.epoch);
                return false;
            }
            let SessionState::Authenticated(session) = &current.state else {
                return false;
            };
            let user = session.user.clone();

            self.clear_storage();
            current.epoch += 1;
            current.state = SessionState::Anonymous;
            log::warn!("session for user {} rejected by server; logged out", user.id);
            SessionInvalidated { user, epoch }
        };

        // Callbacks run without any lock held so they may call back in.
        let callbacks: Vec<Callback> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            callback(&invalidated);
        }
        true
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&SessionInvalidated) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    fn clear_storage(&self) {
        if let Err(e) = self.storage.clear() {
            log::warn!("could not clear stored session: {}", e);
        }
    }

    fn read<T>(&self, f: impl FnOnce(&Current) -> T) -> T {
        f(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Current> {
        self.current.write().unwrap_or_else(PoisonError::into_inner)
    }
}

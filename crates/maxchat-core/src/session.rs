//! Persisted user identity and project tag
//!
//! The session is an explicit value: it is read once through
//! [`SessionStore::load`] and written back through the store whenever it
//! changes. Nothing reads it from ambient state.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PROJECT: &str = "General";

const USER_ID_PREFIX: &str = "user-";
const USER_ID_SUFFIX_LEN: usize = 8;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub project: String,
}

impl Session {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            project: DEFAULT_PROJECT.to_string(),
        }
    }
}

/// `user-` followed by eight random base-36 characters
pub fn generate_user_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    let suffix: String = (0..USER_ID_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{USER_ID_PREFIX}{suffix}")
}

#[derive(Serialize, Deserialize, Default)]
struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_project: Option<String>,
}

pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/maxchat/session.json`
    pub fn open_default() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(Self::new(config_dir.join("maxchat").join("session.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the session, generating and persisting a user id on first run
    pub fn load(&self) -> Result<Session> {
        let mut stored = self.read()?;

        let user_id = match stored.user_id.clone() {
            Some(id) if !id.is_empty() => id,
            _ => {
                let id = generate_user_id(&mut rand::thread_rng());
                tracing::info!(user_id = %id, "generated new user id");
                stored.user_id = Some(id.clone());
                self.write(&stored)?;
                id
            }
        };

        Ok(Session {
            user_id,
            project: stored
                .last_project
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| DEFAULT_PROJECT.to_string()),
        })
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        self.write(&StoredSession {
            user_id: Some(session.user_id.clone()),
            last_project: Some(session.project.clone()),
        })
    }

    pub fn set_project(&self, session: &mut Session, project: &str) -> Result<()> {
        session.project = project.to_string();
        self.save(session)
    }

    /// Forget the persisted project; the in-memory session falls back to the default
    pub fn clear_project(&self, session: &mut Session) -> Result<()> {
        let mut stored = self.read()?;
        stored.last_project = None;
        stored.user_id.get_or_insert_with(|| session.user_id.clone());
        self.write(&stored)?;
        session.project = DEFAULT_PROJECT.to_string();
        Ok(())
    }

    fn read(&self) -> Result<StoredSession> {
        if !self.path.exists() {
            return Ok(StoredSession::default());
        }
        let content = fs::read_to_string(&self.path)?;
        match serde_json::from_str(&content) {
            Ok(stored) => Ok(stored),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable session file");
                Ok(StoredSession::default())
            }
        }
    }

    fn write(&self, stored: &StoredSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(stored)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    #[test]
    fn test_generate_user_id_shape() {
        let id = generate_user_id(&mut StdRng::seed_from_u64(42));
        assert!(id.starts_with("user-"));
        assert_eq!(id.len(), 13);
        assert!(id[5..].chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_first_load_generates_and_persists_id() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));

        let first = store.load().unwrap();
        let second = store.load().unwrap();

        assert_eq!(first.user_id, second.user_id);
        assert_eq!(first.project, DEFAULT_PROJECT);
    }

    #[test]
    fn test_project_persists_until_cleared() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let mut session = store.load().unwrap();

        store.set_project(&mut session, "Thrillers").unwrap();
        assert_eq!(store.load().unwrap().project, "Thrillers");

        store.clear_project(&mut session).unwrap();
        assert_eq!(session.project, DEFAULT_PROJECT);
        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.project, DEFAULT_PROJECT);
        assert_eq!(reloaded.user_id, session.user_id);
    }

    #[test]
    fn test_corrupt_file_starts_fresh() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{ not json").unwrap();

        let session = SessionStore::new(&path).load().unwrap();
        assert!(session.user_id.starts_with("user-"));
    }
}

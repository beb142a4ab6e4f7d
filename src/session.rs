// src/session.rs
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::client::ApiClient;
use crate::models::{Season, User};
use crate::AppError;

// --- 1. 会话数据 ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub current_user: Option<User>,
    pub current_season: Option<Season>,
    #[serde(default)]
    pub available_users: Vec<User>,
}

impl Session {
    pub fn select_user(&mut self, user: User, season: Season) {
        self.current_user = Some(user);
        self.current_season = Some(season);
    }

    pub fn set_available_users(&mut self, users: Vec<User>) {
        self.available_users = users;
    }

    pub fn logout(&mut self) {
        self.current_user = None;
        self.current_season = None;
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_user.is_some()
    }

    /// 当前用户，未登录时返回 NotLoggedIn
    pub fn user(&self) -> Result<&User, AppError> {
        self.current_user.as_ref().ok_or(AppError::NotLoggedIn)
    }

    pub fn season(&self) -> Result<&Season, AppError> {
        self.current_season.as_ref().ok_or(AppError::NotLoggedIn)
    }

    /// 有用户就保存，没有就清掉存储
    pub fn persist<S: SessionStore>(&self, store: &S) -> Result<(), AppError> {
        if self.is_logged_in() {
            store.save(self)
        } else {
            store.clear()
        }
    }

    /// 恢复会话；存储内容损坏时当作没有会话
    pub fn restore<S: SessionStore>(store: &S) -> Session {
        match store.load() {
            Ok(Some(session)) => session,
            Ok(None) => Session::default(),
            Err(e) => {
                tracing::warn!("Failed to restore session: {}", e);
                Session::default()
            }
        }
    }
}

// --- 2. 存储 ---

pub trait SessionStore {
    fn load(&self) -> Result<Option<Session>, AppError>;
    fn save(&self, session: &Session) -> Result<(), AppError>;
    fn clear(&self) -> Result<(), AppError>;
}

/// JSON 文件，默认放在临时目录（对应浏览器的 sessionStorage）
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>, AppError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, session: &Session) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string(session)?)?;
        tracing::debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), AppError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    blob: Mutex<Option<String>>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>, AppError> {
        let blob = self.blob.lock().unwrap_or_else(|e| e.into_inner());
        match blob.as_deref() {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, session: &Session) -> Result<(), AppError> {
        let raw = serde_json::to_string(session)?;
        *self.blob.lock().unwrap_or_else(|e| e.into_inner()) = Some(raw);
        Ok(())
    }

    fn clear(&self) -> Result<(), AppError> {
        *self.blob.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

// --- 3. PIN 登录 ---

/// PIN 换用户，然后默认选第一个季节
pub async fn login_with_pin(client: &ApiClient, session: &mut Session, pin: &str) -> Result<(), AppError> {
    let user = client.login(pin).await?;
    let season = client
        .seasons()
        .await?
        .into_iter()
        .next()
        .ok_or(AppError::NoSeasons)?;

    tracing::info!(user = %user.name, season = season.year, "🌿 Logged in");
    session.select_user(user, season);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amy() -> User {
        User {
            id: 1,
            name: "Amy".into(),
            display_color: "#648655".into(),
            created_at: None,
        }
    }

    fn season_2026() -> Season {
        Season { id: 3, year: 2026, notes: None, created_at: None }
    }

    #[test]
    fn logged_in_session_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));

        let mut session = Session::default();
        session.set_available_users(vec![amy()]);
        session.select_user(amy(), season_2026());
        session.persist(&store).unwrap();

        let restored = Session::restore(&store);
        assert_eq!(restored, session);
        assert_eq!(restored.user().unwrap().name, "Amy");
    }

    #[test]
    fn logout_clears_storage() {
        let store = MemorySessionStore::default();
        let mut session = Session::default();
        session.select_user(amy(), season_2026());
        session.persist(&store).unwrap();
        assert!(store.load().unwrap().is_some());

        session.logout();
        session.persist(&store).unwrap();
        assert!(store.load().unwrap().is_none());
        assert!(matches!(session.user(), Err(AppError::NotLoggedIn)));
    }

    #[test]
    fn corrupt_blob_restores_as_empty_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let restored = Session::restore(&FileSessionStore::new(path));
        assert!(!restored.is_logged_in());
    }

    #[test]
    fn clearing_missing_file_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nothing.json"));
        assert!(store.clear().is_ok());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn blob_uses_browser_session_keys() {
        let mut session = Session::default();
        session.select_user(amy(), season_2026());
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("currentUser").is_some());
        assert!(json.get("currentSeason").is_some());
        assert!(json.get("availableUsers").is_some());
    }
}

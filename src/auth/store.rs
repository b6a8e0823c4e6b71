use super::{ AuthError, UserProfile };
use serde::{ Deserialize, Serialize };
use std::fs;
use std::path::{ Path, PathBuf };
use std::sync::{ Mutex, PoisonError };

/// Where the signed-in profile survives between runs.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<UserProfile>, AuthError>;
    fn save(&self, profile: &UserProfile) -> Result<(), AuthError>;
    fn clear(&self) -> Result<(), AuthError>;
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    is_authenticated: bool,
    #[serde(default)]
    user: Option<UserProfile>,
}

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
    fn load(&self) -> Result<Option<UserProfile>, AuthError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json_str = fs::read_to_string(&self.path)?;
        let stored: StoredSession = serde_json::from_str(&json_str)?;
        Ok(stored.user.filter(|_| stored.is_authenticated))
    }

    fn save(&self, profile: &UserProfile) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let stored = StoredSession {
            is_authenticated: true,
            user: Some(profile.clone()),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&stored)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<UserProfile>>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<UserProfile>, AuthError> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, profile: &UserProfile) -> Result<(), AuthError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(profile.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserRole;

    fn profile() -> UserProfile {
        UserProfile::new("ada@school.edu", "Ada", UserRole::Teacher)
    }

    #[test]
    fn file_store_round_trips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested/session.json"));

        assert_eq!(store.load().unwrap(), None);
        store.save(&profile()).unwrap();
        assert_eq!(store.load().unwrap(), Some(profile()));

        store.clear().unwrap();
        assert!(!store.path().exists());
        store.clear().unwrap();
    }

    #[test]
    fn file_layout_matches_browser_storage_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));
        store.save(&profile()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["isAuthenticated"], true);
        assert_eq!(raw["user"]["type"], "teacher");
        assert_eq!(raw["user"]["email"], "ada@school.edu");
    }

    #[test]
    fn unauthenticated_flag_hides_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{"isAuthenticated": false, "user": {"email": "x@y.z"}}"#).unwrap();
        assert_eq!(FileSessionStore::new(path).load().unwrap(), None);
    }
}

use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, create_dir_all};
use std::io::{BufReader, BufWriter, Cursor, Write};
use std::path::Path;

use crate::error::Result;
use crate::login::hash_password;
use crate::models::{Role, User};
use crate::seed;
use crate::store::HubState;

/// One JSON document per storage key inside the data directory
pub const USERS_FILE: &str = "users.json";
pub const RESOURCES_FILE: &str = "resources.json";
pub const REVIEWS_FILE: &str = "reviews.json";
pub const RECENTLY_VIEWED_FILE: &str = "recently_viewed.json";
pub const DOWNLOAD_HISTORY_FILE: &str = "download_history.json";
pub const PREFERENCES_FILE: &str = "preferences.json";

/// A user as found in `users.json`
///
/// Documents written by older versions may carry a plaintext `password`
/// instead of a hash and may lack `role`.
#[derive(Deserialize)]
struct StoredUser {
    #[serde(default)]
    role: Option<Role>,
    #[serde(default)]
    password: Option<String>,
    #[serde(flatten)]
    user: User,
}

impl StoredUser {
    fn into_user(self) -> Result<User> {
        let mut user = self.user;
        user.role = self.role.unwrap_or(if user.id == seed::DEMO_ADMIN_ID {
            Role::Admin
        } else {
            Role::User
        });

        if user.password_hash.is_empty() {
            if let Some(password) = self.password.filter(|p| !p.is_empty()) {
                user.password_hash = hash_password(&password)?;
            }
        }
        Ok(user)
    }
}

fn read_users(dir: &Path) -> Result<Vec<User>> {
    match read_json::<Option<Vec<StoredUser>>, _>(dir, USERS_FILE, || None) {
        Some(stored) => stored.into_iter().map(StoredUser::into_user).collect(),
        None => Ok(seed::demo_users()),
    }
}

/// Read one document, falling back when it is missing or unreadable
fn read_json<T, F>(dir: &Path, name: &str, fallback: F) -> T
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    let path = dir.join(name);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(_) => return fallback(),
    };

    match serde_json::from_str(&contents) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("ignoring unreadable {}: {}", path.display(), e);
            fallback()
        }
    }
}

fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let mut file = File::create(dir.join(name))?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

/// Fill in fields older documents may lack
///
/// Users without an email get `<dotted name>@campus.demo`; users with neither
/// a hash nor a legacy plaintext password get the demo password of their role.
pub fn normalize_state(state: &mut HubState) -> Result<()> {
    for user in &mut state.users {
        if user.email.trim().is_empty() {
            user.email = seed::demo_email(&user.name);
        }
        if user.password_hash.is_empty() {
            let default_password = if user.is_admin() {
                seed::DEMO_ADMIN_PASSWORD
            } else {
                seed::DEMO_PASSWORD
            };
            user.password_hash = hash_password(default_password)?;
        }
    }
    Ok(())
}

/// Load the whole state from a data directory
///
/// Missing documents fall back to the demo data (users, resources, reviews)
/// or to empty collections (history, preferences).
pub fn load_state(dir: &Path) -> Result<HubState> {
    let users = read_users(dir)?;
    let resources = read_json(dir, RESOURCES_FILE, || seed::demo_resources(&users));
    let reviews = read_json(dir, REVIEWS_FILE, seed::demo_reviews);

    let mut state = HubState {
        users,
        resources,
        reviews,
        recently_viewed: read_json(dir, RECENTLY_VIEWED_FILE, Vec::new),
        download_history: read_json(dir, DOWNLOAD_HISTORY_FILE, Vec::new),
        preferences: read_json(dir, PREFERENCES_FILE, Default::default),
    };
    normalize_state(&mut state)?;

    log::info!(
        "loaded {} users, {} resources, {} reviews from {}",
        state.users.len(),
        state.resources.len(),
        state.reviews.len(),
        dir.display()
    );
    Ok(state)
}

/// Write every document of the state into the data directory
pub fn save_state(dir: &Path, state: &HubState) -> Result<()> {
    if !dir.exists() {
        create_dir_all(dir)?;
    }

    write_json(dir, USERS_FILE, &state.users)?;
    write_json(dir, RESOURCES_FILE, &state.resources)?;
    write_json(dir, REVIEWS_FILE, &state.reviews)?;
    write_json(dir, RECENTLY_VIEWED_FILE, &state.recently_viewed)?;
    write_json(dir, DOWNLOAD_HISTORY_FILE, &state.download_history)?;
    write_json(dir, PREFERENCES_FILE, &state.preferences)?;

    Ok(())
}

/// Save a gzip-compressed bincode snapshot of the whole state
pub fn save_snapshot(state: &HubState, filename: &Path) -> Result<()> {
    let file = File::create(filename)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut writer = BufWriter::new(encoder);

    serialize_into(&mut writer, state)?;
    let encoder = writer.into_inner().map_err(|e| e.into_error())?;
    encoder.finish()?;

    Ok(())
}

pub fn load_snapshot(filename: &Path) -> Result<HubState> {
    let file = File::open(filename)?;
    let decoder = GzDecoder::new(file);
    let mut reader = BufReader::new(decoder);

    Ok(deserialize_from(&mut reader)?)
}

/// Serialize a snapshot into a memory buffer, e.g. for a download
pub fn snapshot_to_bytes(state: &HubState) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    serialize_into(&mut encoder, state)?;
    Ok(encoder.finish()?)
}

pub fn snapshot_from_bytes(buffer: &[u8]) -> Result<HubState> {
    let decoder = GzDecoder::new(Cursor::new(buffer));
    let mut reader = BufReader::new(decoder);

    Ok(deserialize_from(&mut reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::login::{LoginRequest, authenticate};
    use crate::models::Preferences;
    use tempfile::tempdir;

    #[test]
    fn empty_directory_loads_demo_data() {
        let dir = tempdir().unwrap();
        let state = load_state(dir.path()).unwrap();
        assert_eq!(state.users.len(), seed::demo_users().len());
        assert!(!state.resources.is_empty());
        assert!(state.recently_viewed.is_empty());
        assert!(state.users.iter().all(|u| !u.password_hash.is_empty()));
    }

    #[test]
    fn saved_state_loads_back() {
        let dir = tempdir().unwrap();
        let mut state = seed::demo_state().unwrap();
        state.preferences.insert(
            "u1".to_string(),
            Preferences {
                dark_mode: true,
                exam_mode: false,
            },
        );
        state.reviews.clear();

        save_state(dir.path(), &state).unwrap();
        let loaded = load_state(dir.path()).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn corrupt_document_falls_back() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(RECENTLY_VIEWED_FILE), "{ not json").unwrap();
        let state = load_state(dir.path()).unwrap();
        assert!(state.recently_viewed.is_empty());
    }

    #[test]
    fn users_missing_email_are_normalized() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(USERS_FILE),
            r#"[{"id":"u7","name":"Dev  Patel","college":"IIT Bombay","branch":"Civil","semester":"1","passwordHash":"x"}]"#,
        )
        .unwrap();
        let state = load_state(dir.path()).unwrap();
        assert_eq!(state.users[0].email, "dev.patel@campus.demo");
    }

    #[test]
    fn legacy_plaintext_passwords_are_hashed() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(USERS_FILE),
            r#"[
                {"id":"u2","name":"Rohan Mehta","email":"rohan@campus.demo","college":"IIT Delhi","branch":"EE","semester":"6","password":"admin-pw1"},
                {"id":"u9","name":"Isha Rao","email":"isha@campus.demo","college":"NIT Trichy","branch":"CS","semester":"2","role":"USER","password":"mysecret9"},
                {"id":"u10","name":"Old Timer","email":"old@campus.demo","college":"NIT Trichy","branch":"CS","semester":"2"}
            ]"#,
        )
        .unwrap();
        let state = load_state(dir.path()).unwrap();

        let login = |email: &str, password: &str| {
            let request = LoginRequest {
                email: Some(email.to_string()),
                password: password.to_string(),
                ..Default::default()
            };
            authenticate(&state.users, &request).map(|u| u.id.clone())
        };
        assert_eq!(login("isha@campus.demo", "mysecret9").unwrap(), "u9");
        assert!(login("isha@campus.demo", seed::DEMO_PASSWORD).is_err());
        assert_eq!(login("old@campus.demo", seed::DEMO_PASSWORD).unwrap(), "u10");

        // the demo admin keeps its role when the document predates roles
        assert!(state.users[0].is_admin());
        assert!(!state.users[2].is_admin());
        assert_eq!(login("rohan@campus.demo", "admin-pw1").unwrap(), "u2");

        // saved documents carry hashes only
        save_state(dir.path(), &state).unwrap();
        let written = fs::read_to_string(dir.path().join(USERS_FILE)).unwrap();
        assert!(!written.contains("mysecret9"));
        assert!(!written.contains("\"password\""));
    }

    #[test]
    fn snapshot_file_and_buffer() {
        let dir = tempdir().unwrap();
        let state = seed::demo_state().unwrap();

        let path = dir.path().join("campus.bin.gz");
        save_snapshot(&state, &path).unwrap();
        assert_eq!(load_snapshot(&path).unwrap(), state);

        let bytes = snapshot_to_bytes(&state).unwrap();
        assert_eq!(snapshot_from_bytes(&bytes).unwrap(), state);
        assert!(snapshot_from_bytes(b"definitely not gzip").is_err());
    }
}

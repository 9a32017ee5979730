use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::error::{FieldErrors, HubError, Result};
use crate::models::{Role, User};

/// Registration form data
///
/// Used to receive the sign-up form from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Display name
    pub name: String,

    /// Academic email address (used to log in)
    pub email: String,

    /// College the student belongs to; private resources are shared inside it
    pub college: String,

    /// Branch of study, e.g. "Computer Science"
    pub branch: String,

    /// Current semester, "1" to "8"
    #[serde(default = "default_semester")]
    pub semester: String,

    /// Password in plaintext (only transmitted, never stored)
    pub password: String,

    /// Requested role. Only `USER` can be self-registered.
    #[serde(default)]
    pub role: Option<Role>,
}

fn default_semester() -> String {
    "1".to_string()
}

/// Credential data for login
///
/// Either an email or a name/college pair identifies the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub college: Option<String>,

    pub password: String,
}

/// User session data
///
/// Represents an authenticated user session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Id of the authenticated user
    pub user_id: String,

    /// Time when the session expires
    pub expires_at: SystemTime,
}

lazy_static! {
    /// Global sessions storage
    ///
    /// Stores all active user sessions in a thread-safe map.
    static ref SESSIONS: RwLock<HashMap<String, Session>> = RwLock::new(HashMap::new());

    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

const SESSION_DURATION: u64 = 24 * 60 * 60; // 24 hours in seconds
const MIN_PASSWORD_LEN: usize = 6;

/// Semesters offered by the platform
pub const SEMESTERS: [&str; 8] = ["1", "2", "3", "4", "5", "6", "7", "8"];

/// Normalize an email for comparison
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_semester(semester: &str) -> bool {
    SEMESTERS.contains(&semester.trim())
}

fn validate_password(password: &str, errors: &mut FieldErrors) {
    if password.trim().is_empty() {
        errors.add("password", "Password is required.");
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add("password", "Password must be at least 6 characters.");
    }
}

/// Validate a sign-up form
///
/// Checks required fields, the email format, the password length and the
/// semester. Uniqueness of the email is checked by the store.
///
/// # Returns
/// * `FieldErrors` - Empty when the form is acceptable
pub fn validate_registration(request: &RegisterRequest) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if request.email.trim().is_empty() {
        errors.add("email", "Email is required.");
    } else if !is_valid_email(&request.email) {
        errors.add("email", "Enter a valid academic email.");
    }
    validate_password(&request.password, &mut errors);

    if request.name.trim().is_empty() {
        errors.add("name", "Name is required.");
    }
    if request.college.trim().is_empty() {
        errors.add("college", "College is required.");
    }
    if request.branch.trim().is_empty() {
        errors.add("branch", "Branch is required.");
    }
    if !is_valid_semester(&request.semester) {
        errors.add("semester", "Semester must be between 1 and 8.");
    }
    if request.role == Some(Role::Admin) {
        errors.add("role", "Admin accounts cannot be self-registered.");
    }

    errors
}

/// Validate a login form before looking anything up
pub fn validate_login(request: &LoginRequest) -> FieldErrors {
    let mut errors = FieldErrors::new();

    match request.email.as_deref().map(str::trim) {
        Some(email) if !email.is_empty() => {
            if !is_valid_email(email) {
                errors.add("email", "Enter a valid academic email.");
            }
        }
        _ => {
            let name = request.name.as_deref().unwrap_or("").trim();
            let college = request.college.as_deref().unwrap_or("").trim();
            if name.is_empty() || college.is_empty() {
                errors.add("email", "Email is required.");
            }
        }
    }
    validate_password(&request.password, &mut errors);

    errors
}

/// Find the user a login request refers to and check the password
///
/// With an email the match is on the trimmed, lowercased email. Without one,
/// name and college are compared case-insensitively. The first user whose
/// identity and password both match wins.
///
/// # Errors
/// * `HubError::InvalidCredentials` if no user matches or the password is wrong
pub fn authenticate<'a>(users: &'a [User], request: &LoginRequest) -> Result<&'a User> {
    let email = request
        .email
        .as_deref()
        .map(normalize_email)
        .filter(|e| !e.is_empty());
    let name = request.name.as_deref().map(|n| n.trim().to_lowercase());
    let college = request.college.as_deref().map(|c| c.trim().to_lowercase());

    users
        .iter()
        .filter(|user| match &email {
            Some(email) => normalize_email(&user.email) == *email,
            None => {
                name.as_deref() == Some(user.name.trim().to_lowercase().as_str())
                    && college.as_deref() == Some(user.college.trim().to_lowercase().as_str())
            }
        })
        .find(|user| password_matches(&request.password, user))
        .ok_or(HubError::InvalidCredentials)
}

/// An unreadable stored hash never matches
fn password_matches(password: &str, user: &User) -> bool {
    match verify_password(password, &user.password_hash) {
        Ok(matches) => matches,
        Err(e) => {
            log::warn!("user {} has an unusable password hash: {}", user.id, e);
            false
        }
    }
}

/// Rough password strength from 0 to 4
///
/// One point each for length, letters, digits and symbols.
pub fn password_strength(password: &str) -> u8 {
    let mut score = 0;
    if password.chars().count() >= MIN_PASSWORD_LEN {
        score += 1;
    }
    if password.chars().any(|c| c.is_ascii_alphabetic()) {
        score += 1;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        score += 1;
    }
    if password.chars().any(|c| !c.is_ascii_alphanumeric()) {
        score += 1;
    }
    score
}

/// Hash a password using Argon2
///
/// Creates a cryptographically secure hash of a password using Argon2id.
///
/// # Errors
/// * Returns an error if the password hashing fails
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HubError::PasswordHash(e.to_string()))
}

/// Verify a password against a stored hash
///
/// # Returns
/// * `Result<bool>` - True if the password matches, false if not
///
/// # Errors
/// * Returns an error if the hash is in an invalid format
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| HubError::PasswordHash("invalid hash format".into()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Create a new user session
///
/// # Returns
/// * `String` - A unique session ID
pub fn create_session(user_id: &str) -> String {
    let session_id = Uuid::new_v4().to_string();
    let expires_at = SystemTime::now() + Duration::from_secs(SESSION_DURATION);

    let session = Session {
        user_id: user_id.to_string(),
        expires_at,
    };

    let mut sessions = SESSIONS.write().unwrap_or_else(|e| e.into_inner());
    sessions.retain(|_, s| s.expires_at > SystemTime::now());
    sessions.insert(session_id.clone(), session);

    session_id
}

/// Validate a session
///
/// # Returns
/// * `Option<String>` - The user id for the session if valid, None otherwise
pub fn validate_session(session_id: &str) -> Option<String> {
    let sessions = SESSIONS.read().unwrap_or_else(|e| e.into_inner());

    sessions
        .get(session_id)
        .filter(|session| session.expires_at > SystemTime::now())
        .map(|session| session.user_id.clone())
}

/// End a session. Unknown ids are ignored.
pub fn end_session(session_id: &str) {
    let mut sessions = SESSIONS.write().unwrap_or_else(|e| e.into_inner());
    sessions.remove(session_id);
}

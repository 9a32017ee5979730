use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a registered user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// Kind of academic resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    Notes,
    #[serde(rename = "PYQ")]
    Pyq,
    Assignment,
    Project,
}

impl ResourceType {
    pub const ALL: [ResourceType; 4] = [
        ResourceType::Notes,
        ResourceType::Pyq,
        ResourceType::Assignment,
        ResourceType::Project,
    ];

    /// Previous-year papers, notes and assignments are what students revise from
    pub fn is_exam_oriented(self) -> bool {
        matches!(
            self,
            ResourceType::Notes | ResourceType::Pyq | ResourceType::Assignment
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Notes => "Notes",
            ResourceType::Pyq => "PYQ",
            ResourceType::Assignment => "Assignment",
            ResourceType::Project => "Project",
        }
    }

    /// Parse the display name used by forms and query strings
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visibility of a resource outside its college
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Privacy {
    #[default]
    Public,
    Private,
}

impl Privacy {
    pub fn as_str(self) -> &'static str {
        match self {
            Privacy::Public => "Public",
            Privacy::Private => "Private",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "public" => Some(Privacy::Public),
            "private" => Some(Privacy::Private),
            _ => None,
        }
    }
}

impl fmt::Display for Privacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User data structure representing a registered student or admin
///
/// The password is only ever stored as an Argon2 hash.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub college: String,
    pub branch: String,
    pub semester: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub password_hash: String,
    #[serde(default)]
    pub base_points: u32,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile::from(self)
    }
}

/// Public view of a user, safe to hand out over the API
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub college: String,
    pub branch: String,
    pub semester: String,
    pub role: Role,
    pub base_points: u32,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            college: user.college.clone(),
            branch: user.branch.clone(),
            semester: user.semester.clone(),
            role: user.role,
            base_points: user.base_points,
        }
    }
}

/// Metadata of the file attached to an upload. The file itself is not kept.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FileMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub mime: String,
    pub size: u64,
}

/// A shared academic document
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub title: String,
    pub subject: String,
    pub semester: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub tags: Vec<String>,
    pub privacy: Privacy,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub file_meta: Option<FileMeta>,
    #[serde(default)]
    pub featured: bool,
    pub owner_id: String,
    pub college: String,
    pub created_at: DateTime<Utc>,
}

/// A rating left by one user on one resource
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub resource_id: String,
    pub user_id: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewEntry {
    pub user_id: String,
    pub resource_id: String,
    pub viewed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DownloadEntry {
    pub user_id: String,
    pub resource_id: String,
    pub downloaded_at: DateTime<Utc>,
}

/// Per-user display toggles
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default)]
    pub exam_mode: bool,
}

/// Generate a record id of the form `<prefix>_<8 base36 chars>`
pub fn make_id(prefix: &str) -> String {
    const CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();

    let suffix: String = (0..8)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect();

    format!("{}_{}", prefix, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_carry_prefix_and_base36_suffix() {
        let id = make_id("rv");
        let (prefix, suffix) = id.split_once('_').unwrap();
        assert_eq!(prefix, "rv");
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn exam_oriented_types() {
        assert!(ResourceType::Pyq.is_exam_oriented());
        assert!(ResourceType::Notes.is_exam_oriented());
        assert!(ResourceType::Assignment.is_exam_oriented());
        assert!(!ResourceType::Project.is_exam_oriented());
    }

    #[test]
    fn storage_names_match_display_names() {
        assert_eq!(serde_json::to_string(&ResourceType::Pyq).unwrap(), "\"PYQ\"");
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        assert_eq!(ResourceType::parse("pyq"), Some(ResourceType::Pyq));
        assert_eq!(Privacy::parse(" Private "), Some(Privacy::Private));
        assert_eq!(Privacy::parse("All"), None);
    }

    #[test]
    fn users_without_role_or_points_deserialize_with_defaults() {
        let json = r#"{"id":"u9","name":"Kiran","college":"NIT","branch":"ECE","semester":"3"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.role, Role::User);
        assert_eq!(user.base_points, 0);
        assert!(user.email.is_empty());
    }
}

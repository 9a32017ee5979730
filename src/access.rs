//! Who may see and who may moderate a resource.

use crate::error::{HubError, Result};
use crate::models::{Privacy, Resource, User};

/// Public resources are visible to everyone, private ones only inside the
/// uploader's college.
pub fn can_access_resource(resource: &Resource, user: Option<&User>) -> bool {
    match user {
        Some(user) => resource.privacy == Privacy::Public || resource.college == user.college,
        None => false,
    }
}

/// Fail with `Forbidden` unless the user is an admin
pub fn require_admin(user: &User) -> Result<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(HubError::Forbidden("Admin access required".to_string()))
    }
}

/// Owners may remove their own uploads, admins may remove anything
pub fn can_delete_resource(resource: &Resource, user: &User) -> bool {
    user.is_admin() || resource.owner_id == user.id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResourceType, Role};
    use chrono::Utc;

    fn user(id: &str, college: &str, role: Role) -> User {
        User {
            id: id.to_string(),
            name: id.to_string(),
            email: format!("{}@campus.demo", id),
            college: college.to_string(),
            branch: "CSE".to_string(),
            semester: "3".to_string(),
            role,
            password_hash: String::new(),
            base_points: 0,
        }
    }

    fn resource(privacy: Privacy, college: &str) -> Resource {
        Resource {
            id: "r1".to_string(),
            title: "DBMS Notes".to_string(),
            subject: "DBMS".to_string(),
            semester: "4".to_string(),
            resource_type: ResourceType::Notes,
            tags: vec!["sql".to_string()],
            privacy,
            description: String::new(),
            file_meta: None,
            featured: false,
            owner_id: "owner".to_string(),
            college: college.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn public_resources_are_open_to_any_college() {
        let r = resource(Privacy::Public, "IIT Delhi");
        assert!(can_access_resource(&r, Some(&user("u1", "NIT Trichy", Role::User))));
    }

    #[test]
    fn private_resources_stay_inside_the_college() {
        let r = resource(Privacy::Private, "IIT Delhi");
        assert!(can_access_resource(&r, Some(&user("u1", "IIT Delhi", Role::User))));
        assert!(!can_access_resource(&r, Some(&user("u2", "NIT Trichy", Role::User))));
    }

    #[test]
    fn anonymous_access_is_denied() {
        let r = resource(Privacy::Public, "IIT Delhi");
        assert!(!can_access_resource(&r, None));
    }

    #[test]
    fn delete_rights() {
        let r = resource(Privacy::Public, "IIT Delhi");
        assert!(can_delete_resource(&r, &user("owner", "IIT Delhi", Role::User)));
        assert!(can_delete_resource(&r, &user("mod", "Elsewhere", Role::Admin)));
        assert!(!can_delete_resource(&r, &user("u3", "IIT Delhi", Role::User)));
        assert!(require_admin(&user("u3", "IIT Delhi", Role::User)).is_err());
    }
}

//! Demo data used when the data directory is empty.

use chrono::{DateTime, TimeZone, Utc};

use crate::error::Result;
use crate::login::hash_password;
use crate::models::{FileMeta, Privacy, Resource, ResourceType, Review, Role, User};
use crate::store::HubState;

/// Id of the demo admin; older user documents without roles rely on it
pub const DEMO_ADMIN_ID: &str = "u2";
pub const DEMO_PASSWORD: &str = "pass1234";
pub const DEMO_ADMIN_PASSWORD: &str = "admin1234";

fn day(month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, month, day, 9, 30, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

fn user(
    id: &str,
    name: &str,
    college: &str,
    branch: &str,
    semester: &str,
    base_points: u32,
) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        email: demo_email(name),
        college: college.to_string(),
        branch: branch.to_string(),
        semester: semester.to_string(),
        role: Role::User,
        password_hash: String::new(),
        base_points,
    }
}

/// `Meera Iyer` becomes `meera.iyer@campus.demo`
pub fn demo_email(name: &str) -> String {
    let local: Vec<String> = name
        .trim()
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    format!("{}@campus.demo", local.join("."))
}

pub fn demo_users() -> Vec<User> {
    let mut admin = user(DEMO_ADMIN_ID, "Rohan Mehta", "IIT Delhi", "Electrical Engineering", "6", 40);
    admin.role = Role::Admin;

    vec![
        user("u1", "Ananya Sharma", "IIT Delhi", "Computer Science", "4", 30),
        admin,
        user("u3", "Kavya Nair", "NIT Trichy", "Computer Science", "4", 20),
        user("u4", "Vikram Singh", "BITS Pilani", "Mechanical Engineering", "2", 10),
        user("u5", "Sara Thomas", "NIT Trichy", "Electronics", "6", 0),
    ]
}

#[allow(clippy::too_many_arguments)]
fn resource(
    id: &str,
    title: &str,
    subject: &str,
    semester: &str,
    kind: ResourceType,
    tags: &[&str],
    privacy: Privacy,
    owner: &User,
    created_at: DateTime<Utc>,
) -> Resource {
    Resource {
        id: id.to_string(),
        title: title.to_string(),
        subject: subject.to_string(),
        semester: semester.to_string(),
        resource_type: kind,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        privacy,
        description: format!("{} for {} students.", title, subject),
        file_meta: Some(FileMeta {
            name: format!("{}.pdf", id),
            mime: "application/pdf".to_string(),
            size: 240 * 1024,
        }),
        featured: false,
        owner_id: owner.id.clone(),
        college: owner.college.clone(),
        created_at,
    }
}

pub fn demo_resources(users: &[User]) -> Vec<Resource> {
    let owner = |id: &str| users.iter().find(|u| u.id == id).cloned();
    let (Some(u1), Some(u2), Some(u3), Some(u4)) = (owner("u1"), owner("u2"), owner("u3"), owner("u4"))
    else {
        return Vec::new();
    };

    let mut list = vec![
        resource(
            "r1",
            "DBMS Normalization Notes",
            "Database Management Systems",
            "4",
            ResourceType::Notes,
            &["normalization", "sql", "er-model"],
            Privacy::Public,
            &u1,
            day(2, 20),
        ),
        resource(
            "r2",
            "Operating Systems PYQ 2024",
            "Operating Systems",
            "4",
            ResourceType::Pyq,
            &["scheduling", "paging", "deadlock"],
            Privacy::Public,
            &u1,
            day(2, 24),
        ),
        resource(
            "r3",
            "Computer Networks Lab Assignment",
            "Computer Networks",
            "5",
            ResourceType::Assignment,
            &["tcp", "routing"],
            Privacy::Private,
            &u2,
            day(2, 26),
        ),
        resource(
            "r4",
            "Signals and Systems Formula Sheet",
            "Signals and Systems",
            "6",
            ResourceType::Notes,
            &["fourier", "laplace"],
            Privacy::Public,
            &u2,
            day(3, 1),
        ),
        resource(
            "r5",
            "Data Structures Mini Project",
            "Data Structures",
            "3",
            ResourceType::Project,
            &["trees", "graphs", "c++"],
            Privacy::Public,
            &u3,
            day(3, 3),
        ),
        resource(
            "r6",
            "Thermodynamics PYQ Collection",
            "Thermodynamics",
            "2",
            ResourceType::Pyq,
            &["entropy", "cycles"],
            Privacy::Private,
            &u4,
            day(3, 5),
        ),
    ];
    list[1].featured = true;
    // newest first, the way uploads are stored
    list.reverse();
    list
}

pub fn demo_reviews() -> Vec<Review> {
    let review = |id: &str, resource: &str, user: &str, rating: u8, comment: &str, d: u32| Review {
        id: id.to_string(),
        resource_id: resource.to_string(),
        user_id: user.to_string(),
        rating,
        comment: comment.to_string(),
        created_at: day(3, d),
    };

    vec![
        review("rv1", "r1", "u3", 5, "Clear examples of 3NF and BCNF.", 6),
        review("rv2", "r1", "u4", 4, "Good summary.", 6),
        review("rv3", "r2", "u3", 5, "Exactly what came in the exam.", 7),
        review("rv4", "r2", "u5", 5, "", 7),
        review("rv5", "r4", "u1", 3, "Missing z-transform.", 8),
        review("rv6", "r5", "u1", 4, "Neat code.", 8),
        review("rv7", "r5", "u2", 5, "", 9),
    ]
}

/// Complete demo state with hashed demo passwords
///
/// The admin (`u2`) logs in with [`DEMO_ADMIN_PASSWORD`], everyone else with
/// [`DEMO_PASSWORD`].
pub fn demo_state() -> Result<HubState> {
    let mut users = demo_users();
    let user_hash = hash_password(DEMO_PASSWORD)?;
    let admin_hash = hash_password(DEMO_ADMIN_PASSWORD)?;
    for user in &mut users {
        user.password_hash = if user.is_admin() {
            admin_hash.clone()
        } else {
            user_hash.clone()
        };
    }

    let resources = demo_resources(&users);
    Ok(HubState {
        users,
        resources,
        reviews: demo_reviews(),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::login::{LoginRequest, authenticate};
    use crate::stats::leaderboard;

    #[test]
    fn demo_emails_are_dotted() {
        assert_eq!(demo_email(" Meera  Iyer "), "meera.iyer@campus.demo");
    }

    #[test]
    fn demo_state_is_consistent() {
        let state = demo_state().unwrap();
        for review in &state.reviews {
            assert!(state.resources.iter().any(|r| r.id == review.resource_id));
            assert!(state.users.iter().any(|u| u.id == review.user_id));
        }
        assert!(state.resources.windows(2).all(|w| w[0].created_at >= w[1].created_at));

        let admin = LoginRequest {
            email: Some("rohan.mehta@campus.demo".to_string()),
            password: DEMO_ADMIN_PASSWORD.to_string(),
            ..Default::default()
        };
        assert!(authenticate(&state.users, &admin).unwrap().is_admin());
    }

    #[test]
    fn demo_leaderboard_has_a_clear_leader() {
        let state = demo_state().unwrap();
        let board = leaderboard(&state.users, &state.resources, &state.reviews);
        // u1: 30 + 3 five-star reviews, u2: 40 + none
        assert_eq!(board[0].user.id, "u1");
        assert_eq!(board[0].points, 45);
        assert_eq!(board[1].user.id, "u2");
    }
}

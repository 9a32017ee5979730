//! Derived state computed from the raw collections.
//!
//! Nothing here is cached: every read recomputes from users, resources,
//! reviews and the view/download history. The collections are small (tens to
//! low hundreds of records) so plain passes over slices are enough.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use crate::access::can_access_resource;
use crate::models::{DownloadEntry, Resource, Review, User, UserProfile, ViewEntry};

/// Points awarded to the uploader for each new resource
pub const UPLOAD_POINTS: u32 = 10;
/// Points awarded to an owner for every 5-star review received
pub const FIVE_STAR_POINTS: u32 = 5;
/// Average rating from which a resource counts as top rated
pub const TOP_RATED_THRESHOLD: f64 = 4.0;

const RECENTLY_VIEWED_LIMIT: usize = 6;
const ACTIVITY_LIMIT: usize = 8;
const RECOMMENDATION_LIMIT: usize = 10;

/// A resource together with its aggregated rating information
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStats {
    #[serde(flatten)]
    pub resource: Resource,
    pub average_rating: f64,
    pub rating_count: usize,
    pub is_top_rated: bool,
    pub is_exam_oriented: bool,
}

/// One row of the contributor leaderboard
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    #[serde(flatten)]
    pub user: UserProfile,
    pub upload_count: usize,
    pub five_stars: u32,
    pub points: u32,
}

/// Platform totals shown on the admin dashboard
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_users: usize,
    pub total_resources: usize,
    pub total_reviews: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Badge {
    #[serde(rename = "Admin Steward")]
    AdminSteward,
    #[serde(rename = "Contributor")]
    Contributor,
    #[serde(rename = "Campus Publisher")]
    CampusPublisher,
    #[serde(rename = "Peer Reviewer")]
    PeerReviewer,
    #[serde(rename = "Getting Started")]
    GettingStarted,
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Badge::AdminSteward => "Admin Steward",
            Badge::Contributor => "Contributor",
            Badge::CampusPublisher => "Campus Publisher",
            Badge::PeerReviewer => "Peer Reviewer",
            Badge::GettingStarted => "Getting Started",
        };
        f.write_str(name)
    }
}

/// Distinct resources a user has viewed, downloaded and rated
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub viewed_count: usize,
    pub downloaded_count: usize,
    pub rated_count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProgressItem {
    pub key: &'static str,
    pub label: &'static str,
    pub value: usize,
    pub target: usize,
}

impl Progress {
    /// Progress counters paired with their goal values
    pub fn items(&self) -> Vec<ProgressItem> {
        vec![
            ProgressItem {
                key: "viewed",
                label: "Resources Viewed",
                value: self.viewed_count,
                target: 20,
            },
            ProgressItem {
                key: "downloaded",
                label: "Resources Downloaded",
                value: self.downloaded_count,
                target: 12,
            },
            ProgressItem {
                key: "rated",
                label: "Resources Rated",
                value: self.rated_count,
                target: 8,
            },
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Upload,
    Review,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub id: String,
    pub kind: ActivityKind,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recommendation {
    #[serde(flatten)]
    pub resource: ResourceStats,
    pub score: f64,
}

/// Resource counts per subject and per type
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub by_subject: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub max_subject: usize,
    pub max_type: usize,
}

/// Mean rating of the given reviews, `0.0` when there are none
pub fn average_rating<'a, I>(reviews: I) -> f64
where
    I: IntoIterator<Item = &'a Review>,
{
    let (total, count) = reviews
        .into_iter()
        .fold((0u32, 0u32), |(total, count), review| {
            (total + u32::from(review.rating), count + 1)
        });

    if count == 0 {
        0.0
    } else {
        f64::from(total) / f64::from(count)
    }
}

/// Group reviews by the resource they belong to, keeping their order
pub fn reviews_by_resource(reviews: &[Review]) -> HashMap<&str, Vec<&Review>> {
    let mut grouped: HashMap<&str, Vec<&Review>> = HashMap::new();
    for review in reviews {
        grouped
            .entry(review.resource_id.as_str())
            .or_default()
            .push(review);
    }
    grouped
}

/// Attach rating aggregates to every resource
pub fn resources_with_stats(resources: &[Resource], reviews: &[Review]) -> Vec<ResourceStats> {
    let grouped = reviews_by_resource(reviews);

    resources
        .iter()
        .map(|resource| {
            let resource_reviews = grouped
                .get(resource.id.as_str())
                .map(Vec::as_slice)
                .unwrap_or_default();
            let average = average_rating(resource_reviews.iter().copied());

            ResourceStats {
                resource: resource.clone(),
                average_rating: average,
                rating_count: resource_reviews.len(),
                is_top_rated: average >= TOP_RATED_THRESHOLD,
                is_exam_oriented: resource.resource_type.is_exam_oriented(),
            }
        })
        .collect()
}

/// Rank every user by `basePoints + 5 × fiveStarReviewsReceived`
///
/// Only reviews whose resource still exists count towards the owner. Ties keep
/// the order of `users`.
pub fn leaderboard(users: &[User], resources: &[Resource], reviews: &[Review]) -> Vec<LeaderboardEntry> {
    let by_id: HashMap<&str, &Resource> = resources.iter().map(|r| (r.id.as_str(), r)).collect();

    let mut five_stars_received: HashMap<&str, u32> = HashMap::new();
    for review in reviews.iter().filter(|review| review.rating == 5) {
        if let Some(resource) = by_id.get(review.resource_id.as_str()) {
            *five_stars_received.entry(resource.owner_id.as_str()).or_default() += 1;
        }
    }

    let mut entries: Vec<LeaderboardEntry> = users
        .iter()
        .map(|user| {
            let upload_count = resources.iter().filter(|r| r.owner_id == user.id).count();
            let five_stars = five_stars_received.get(user.id.as_str()).copied().unwrap_or(0);

            LeaderboardEntry {
                user: user.profile(),
                upload_count,
                five_stars,
                points: user.base_points + five_stars * FIVE_STAR_POINTS,
            }
        })
        .collect();

    entries.sort_by(|a, b| b.points.cmp(&a.points));
    entries
}

/// 1-based rank and points of a user on the leaderboard
pub fn rank_of(leaderboard: &[LeaderboardEntry], user_id: &str) -> Option<(usize, u32)> {
    leaderboard
        .iter()
        .position(|entry| entry.user.id == user_id)
        .map(|idx| (idx + 1, leaderboard[idx].points))
}

pub fn admin_stats(users: &[User], resources: &[Resource], reviews: &[Review]) -> AdminStats {
    AdminStats {
        total_users: users.len(),
        total_resources: resources.len(),
        total_reviews: reviews.len(),
    }
}

/// Badges earned by a user, in display order
pub fn badges(user: &User, resources: &[Resource], reviews: &[Review]) -> Vec<Badge> {
    let uploads = resources.iter().filter(|r| r.owner_id == user.id).count();
    let ratings_given = reviews.iter().filter(|r| r.user_id == user.id).count();
    let mut earned = Vec::new();

    if user.is_admin() {
        earned.push(Badge::AdminSteward);
    }
    if uploads >= 1 {
        earned.push(Badge::Contributor);
    }
    if uploads >= 5 {
        earned.push(Badge::CampusPublisher);
    }
    if ratings_given >= 3 {
        earned.push(Badge::PeerReviewer);
    }
    if earned.is_empty() {
        earned.push(Badge::GettingStarted);
    }

    earned
}

pub fn progress(
    user_id: &str,
    views: &[ViewEntry],
    downloads: &[DownloadEntry],
    reviews: &[Review],
) -> Progress {
    let viewed: HashSet<&str> = views
        .iter()
        .filter(|entry| entry.user_id == user_id)
        .map(|entry| entry.resource_id.as_str())
        .collect();
    let downloaded: HashSet<&str> = downloads
        .iter()
        .filter(|entry| entry.user_id == user_id)
        .map(|entry| entry.resource_id.as_str())
        .collect();
    let rated: HashSet<&str> = reviews
        .iter()
        .filter(|review| review.user_id == user_id)
        .map(|review| review.resource_id.as_str())
        .collect();

    Progress {
        viewed_count: viewed.len(),
        downloaded_count: downloaded.len(),
        rated_count: rated.len(),
    }
}

/// The user's most recently viewed resources that still exist, newest first
pub fn recently_viewed(user_id: &str, views: &[ViewEntry], resources: &[ResourceStats]) -> Vec<ResourceStats> {
    let mut own: Vec<&ViewEntry> = views.iter().filter(|entry| entry.user_id == user_id).collect();
    own.sort_by(|a, b| b.viewed_at.cmp(&a.viewed_at));

    own.into_iter()
        .filter_map(|entry| resources.iter().find(|r| r.resource.id == entry.resource_id))
        .take(RECENTLY_VIEWED_LIMIT)
        .cloned()
        .collect()
}

/// Uploads and reviews by the user, newest first
pub fn activity(user_id: &str, resources: &[Resource], reviews: &[Review]) -> Vec<ActivityEvent> {
    let uploads = resources
        .iter()
        .filter(|resource| resource.owner_id == user_id)
        .map(|resource| ActivityEvent {
            id: format!("activity_upload_{}", resource.id),
            kind: ActivityKind::Upload,
            text: format!("Uploaded {}", resource.title),
            created_at: resource.created_at,
        });

    let rated = reviews
        .iter()
        .filter(|review| review.user_id == user_id)
        .map(|review| {
            let title = resources
                .iter()
                .find(|r| r.id == review.resource_id)
                .map(|r| r.title.as_str())
                .unwrap_or("a resource");
            ActivityEvent {
                id: format!("activity_review_{}", review.id),
                kind: ActivityKind::Review,
                text: format!("Rated {} {}/5", title, review.rating),
                created_at: review.created_at,
            }
        });

    let mut events: Vec<ActivityEvent> = uploads.chain(rated).collect();
    events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    events.truncate(ACTIVITY_LIMIT);
    events
}

/// Score every resource for the user and keep the best ten
///
/// Same semester +3, subject matching a branch keyword +2, subject equal to
/// the last viewed subject +2, accessible +1, plus the average rating.
pub fn recommendations(
    user: &User,
    resources: &[ResourceStats],
    recently_viewed: &[ResourceStats],
) -> Vec<Recommendation> {
    let branch = user.branch.to_lowercase();
    let branch_keywords: Vec<&str> = branch
        .split_whitespace()
        .filter(|word| word.chars().count() > 2)
        .collect();
    let preferred_subject = recently_viewed.first().map(|r| r.resource.subject.as_str());

    let mut scored: Vec<Recommendation> = resources
        .iter()
        .map(|stats| {
            let resource = &stats.resource;
            let subject = resource.subject.to_lowercase();

            let semester_score = if resource.semester == user.semester { 3.0 } else { 0.0 };
            let branch_score = if branch_keywords.iter().any(|k| subject.contains(k)) {
                2.0
            } else {
                0.0
            };
            let preference_score = if preferred_subject == Some(resource.subject.as_str()) {
                2.0
            } else {
                0.0
            };
            let access_score = if can_access_resource(resource, Some(user)) { 1.0 } else { 0.0 };

            Recommendation {
                resource: stats.clone(),
                score: semester_score
                    + branch_score
                    + preference_score
                    + access_score
                    + stats.average_rating,
            }
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(RECOMMENDATION_LIMIT);
    scored
}

pub fn analytics(resources: &[Resource]) -> Analytics {
    let mut by_subject: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_type: BTreeMap<String, usize> = BTreeMap::new();

    for resource in resources {
        *by_subject.entry(resource.subject.clone()).or_default() += 1;
        *by_type
            .entry(resource.resource_type.as_str().to_string())
            .or_default() += 1;
    }

    let max_subject = by_subject.values().copied().max().unwrap_or(0).max(1);
    let max_type = by_type.values().copied().max().unwrap_or(0).max(1);

    Analytics {
        by_subject,
        by_type,
        max_subject,
        max_type,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::models::{Privacy, ResourceType, Role};
    use chrono::TimeZone;

    pub fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
    }

    pub fn user(id: &str, college: &str, base_points: u32) -> User {
        User {
            id: id.to_string(),
            name: format!("User {}", id),
            email: format!("{}@campus.demo", id),
            college: college.to_string(),
            branch: "Computer Science".to_string(),
            semester: "4".to_string(),
            role: Role::User,
            password_hash: String::new(),
            base_points,
        }
    }

    pub fn resource(id: &str, owner: &str, subject: &str, kind: ResourceType, day: u32) -> Resource {
        Resource {
            id: id.to_string(),
            title: format!("{} {}", subject, kind),
            subject: subject.to_string(),
            semester: "4".to_string(),
            resource_type: kind,
            tags: vec!["exam".to_string()],
            privacy: Privacy::Public,
            description: String::new(),
            file_meta: None,
            featured: false,
            owner_id: owner.to_string(),
            college: "IIT Delhi".to_string(),
            created_at: at(day),
        }
    }

    pub fn review(id: &str, resource: &str, user: &str, rating: u8, day: u32) -> Review {
        Review {
            id: id.to_string(),
            resource_id: resource.to_string(),
            user_id: user.to_string(),
            rating,
            comment: String::new(),
            created_at: at(day),
        }
    }

    pub fn view(user: &str, resource: &str, day: u32) -> ViewEntry {
        ViewEntry {
            user_id: user.to_string(),
            resource_id: resource.to_string(),
            viewed_at: at(day),
        }
    }
}

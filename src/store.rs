//! The central state container.
//!
//! `Hub` owns the raw collections and is the only thing that mutates them.
//! Derived views (ratings, leaderboard, badges, ...) are recomputed from the
//! collections through [`crate::stats`] on every read.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::access::{can_access_resource, can_delete_resource, require_admin};
use crate::catalog::{self, Page, ResourceQuery};
use crate::downloader;
use crate::error::{FieldErrors, HubError, Result};
use crate::login::{self, LoginRequest, RegisterRequest};
use crate::models::{
    DownloadEntry, FileMeta, Preferences, Privacy, Resource, ResourceType, Review, Role, User,
    UserProfile, ViewEntry, make_id,
};
use crate::planner::{self, ResourceSummary, StudyPlan};
use crate::stats::{
    self, ActivityEvent, AdminStats, Analytics, Badge, LeaderboardEntry, Progress, ProgressItem,
    Recommendation, ResourceStats, UPLOAD_POINTS,
};

/// Most recent views kept, across all users
pub const VIEW_HISTORY_LIMIT: usize = 30;
/// Most recent downloads kept, across all users
pub const DOWNLOAD_HISTORY_LIMIT: usize = 60;
/// Largest accepted upload
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;
/// Accepted upload content types
pub const ALLOWED_MIME_TYPES: [&str; 4] = ["application/pdf", "image/png", "image/jpeg", "image/jpg"];

/// Everything that gets persisted
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HubState {
    pub users: Vec<User>,
    pub resources: Vec<Resource>,
    pub reviews: Vec<Review>,
    pub recently_viewed: Vec<ViewEntry>,
    pub download_history: Vec<DownloadEntry>,
    pub preferences: HashMap<String, Preferences>,
}

/// Upload form data, after the file part has been reduced to its metadata
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub title: String,
    pub subject: String,
    #[serde(default = "default_semester")]
    pub semester: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    /// Comma separated
    pub tags: String,
    #[serde(default)]
    pub privacy: Privacy,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub file: Option<FileMeta>,
}

fn default_semester() -> String {
    "1".to_string()
}

/// Everything the profile page shows about one user
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub user: UserProfile,
    pub rank: usize,
    pub points: u32,
    pub upload_count: usize,
    pub review_count: usize,
    pub badges: Vec<Badge>,
    pub progress: Progress,
    pub progress_items: Vec<ProgressItem>,
    pub activity: Vec<ActivityEvent>,
    pub recently_viewed: Vec<ResourceStats>,
    pub recommendations: Vec<Recommendation>,
    pub preferences: Preferences,
}

/// Split a comma separated tag list into trimmed, lowercased tags
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Check an attached file against the type and size limits
pub fn validate_file(file: Option<&FileMeta>) -> std::result::Result<(), &'static str> {
    let Some(file) = file else {
        return Err("Please upload a file (PDF/PNG/JPG).");
    };
    if !ALLOWED_MIME_TYPES.contains(&file.mime.as_str()) {
        return Err("Unsupported file type. Allowed: PDF, PNG, JPG.");
    }
    if file.size > MAX_UPLOAD_BYTES {
        return Err("File exceeds 5MB size limit.");
    }
    Ok(())
}

fn validate_upload(request: &UploadRequest) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if request.title.trim().is_empty() {
        errors.add("title", "Title is required.");
    }
    if request.subject.trim().is_empty() {
        errors.add("subject", "Subject is required.");
    }
    if parse_tags(&request.tags).is_empty() {
        errors.add("tags", "Tags are required.");
    }
    if !login::is_valid_semester(&request.semester) {
        errors.add("semester", "Semester must be between 1 and 8.");
    }
    if let Err(message) = validate_file(request.file.as_ref()) {
        errors.add("file", message);
    }

    errors
}

/// Push `entry` to the front, dropping any older entry for the same
/// (user, resource) pair, and keep at most `limit` entries.
fn push_history<T>(list: &mut Vec<T>, entry: T, limit: usize, same: impl Fn(&T) -> bool) {
    list.retain(|existing| !same(existing));
    list.insert(0, entry);
    list.truncate(limit);
}

#[derive(Debug, Clone, Default)]
pub struct Hub {
    state: HubState,
}

impl Hub {
    pub fn new(state: HubState) -> Self {
        Hub { state }
    }

    pub fn state(&self) -> &HubState {
        &self.state
    }

    /// Replace the whole state, e.g. after importing a snapshot
    pub fn replace_state(&mut self, state: HubState) {
        self.state = state;
    }

    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.state.users.iter().find(|u| u.id == user_id)
    }

    fn require_user(&self, user_id: &str) -> Result<&User> {
        self.user(user_id).ok_or(HubError::Unauthenticated)
    }

    /// Fail unless `actor_id` is a known admin
    pub fn ensure_admin(&self, actor_id: &str) -> Result<()> {
        require_admin(self.require_user(actor_id)?)
    }

    fn raw_resource(&self, resource_id: &str) -> Result<&Resource> {
        self.state
            .resources
            .iter()
            .find(|r| r.id == resource_id)
            .ok_or_else(|| HubError::NotFound("Resource".to_string()))
    }

    // ---- accounts ----

    /// Register a new user
    ///
    /// The new account starts with zero points and the `USER` role and is
    /// placed first in the user list.
    ///
    /// # Errors
    /// * `Validation` for bad input or an email that is already registered
    pub fn register_user(&mut self, request: RegisterRequest) -> Result<UserProfile> {
        let mut errors = login::validate_registration(&request);
        let email = login::normalize_email(&request.email);
        if !email.is_empty()
            && self
                .state
                .users
                .iter()
                .any(|u| login::normalize_email(&u.email) == email)
        {
            errors.add("email", "Email address is already registered.");
        }
        errors.into_result()?;

        let user = User {
            id: make_id("u"),
            name: request.name.trim().to_string(),
            email: request.email.trim().to_string(),
            college: request.college.trim().to_string(),
            branch: request.branch.trim().to_string(),
            semester: request.semester.trim().to_string(),
            role: Role::User,
            password_hash: login::hash_password(&request.password)?,
            base_points: 0,
        };
        log::info!("registered user {} ({})", user.id, user.college);

        let profile = user.profile();
        self.state.users.insert(0, user);
        Ok(profile)
    }

    /// Check credentials and return the matching user
    pub fn login_user(&self, request: &LoginRequest) -> Result<UserProfile> {
        login::validate_login(request).into_result()?;
        let user = login::authenticate(&self.state.users, request)?;
        Ok(user.profile())
    }

    pub fn preferences(&self, user_id: &str) -> Preferences {
        self.state
            .preferences
            .get(user_id)
            .copied()
            .unwrap_or_default()
    }

    pub fn set_preferences(&mut self, user_id: &str, preferences: Preferences) -> Result<Preferences> {
        self.require_user(user_id)?;
        self.state
            .preferences
            .insert(user_id.to_string(), preferences);
        Ok(preferences)
    }

    // ---- resources ----

    /// Publish a resource on behalf of `user_id`
    ///
    /// Tags are split on commas and lowercased, the owner's college is copied
    /// onto the resource and the owner earns upload points.
    pub fn upload_resource(&mut self, user_id: &str, request: UploadRequest) -> Result<Resource> {
        let owner = self.require_user(user_id)?.clone();
        validate_upload(&request).into_result()?;

        let resource = Resource {
            id: make_id("r"),
            title: request.title.trim().to_string(),
            subject: request.subject.trim().to_string(),
            semester: request.semester.trim().to_string(),
            resource_type: request.resource_type,
            tags: parse_tags(&request.tags),
            privacy: request.privacy,
            description: request.description.trim().to_string(),
            file_meta: request.file,
            featured: false,
            owner_id: owner.id.clone(),
            college: owner.college.clone(),
            created_at: Utc::now(),
        };

        if let Some(user) = self.state.users.iter_mut().find(|u| u.id == owner.id) {
            user.base_points += UPLOAD_POINTS;
        }
        self.state.resources.insert(0, resource.clone());
        log::info!("user {} uploaded resource {}", owner.id, resource.id);

        Ok(resource)
    }

    /// A single resource with stats, if the user may see it
    ///
    /// # Errors
    /// * `NotFound` if the resource does not exist
    /// * `Forbidden` if it is private to another college
    pub fn resource_for(&self, user_id: &str, resource_id: &str) -> Result<ResourceStats> {
        let user = self.require_user(user_id)?;
        let resource = self.raw_resource(resource_id)?;
        if !can_access_resource(resource, Some(user)) {
            return Err(HubError::Forbidden(
                "This resource is private to another college".to_string(),
            ));
        }

        let reviews: Vec<Review> = self
            .state
            .reviews
            .iter()
            .filter(|r| r.resource_id == resource_id)
            .cloned()
            .collect();
        let mut with_stats = stats::resources_with_stats(std::slice::from_ref(resource), &reviews);
        Ok(with_stats.remove(0))
    }

    /// Flip the featured flag. Admin only.
    pub fn toggle_featured(&mut self, actor_id: &str, resource_id: &str) -> Result<bool> {
        require_admin(self.require_user(actor_id)?)?;
        let resource = self
            .state
            .resources
            .iter_mut()
            .find(|r| r.id == resource_id)
            .ok_or_else(|| HubError::NotFound("Resource".to_string()))?;

        resource.featured = !resource.featured;
        log::info!("resource {} featured={}", resource.id, resource.featured);
        Ok(resource.featured)
    }

    /// Remove a resource along with its reviews and history entries
    pub fn delete_resource(&mut self, actor_id: &str, resource_id: &str) -> Result<()> {
        let actor = self.require_user(actor_id)?;
        let resource = self.raw_resource(resource_id)?;
        if !can_delete_resource(resource, actor) {
            return Err(HubError::Forbidden(
                "Only the owner or an admin can delete this resource".to_string(),
            ));
        }

        self.state.resources.retain(|r| r.id != resource_id);
        self.state.reviews.retain(|r| r.resource_id != resource_id);
        self.state
            .recently_viewed
            .retain(|e| e.resource_id != resource_id);
        self.state
            .download_history
            .retain(|e| e.resource_id != resource_id);
        log::info!("user {} deleted resource {}", actor_id, resource_id);

        Ok(())
    }

    pub fn resources_with_stats(&self) -> Vec<ResourceStats> {
        stats::resources_with_stats(&self.state.resources, &self.state.reviews)
    }

    /// Filtered, sorted and paginated resource list
    ///
    /// Exam mode comes from the query when given, otherwise from the user's
    /// preferences.
    pub fn browse(&self, user_id: &str, query: &ResourceQuery) -> Result<Page<ResourceStats>> {
        let hits = self.filtered(user_id, query)?;
        Ok(catalog::paginate(hits, query.page, query.per_page))
    }

    /// The same filtered list as [`Hub::browse`], unpaginated and grouped by
    /// subject
    pub fn browse_by_subject(
        &self,
        user_id: &str,
        query: &ResourceQuery,
    ) -> Result<BTreeMap<String, Vec<ResourceStats>>> {
        let hits = self.filtered(user_id, query)?;
        Ok(catalog::group_by_subject(&hits))
    }

    fn filtered(&self, user_id: &str, query: &ResourceQuery) -> Result<Vec<ResourceStats>> {
        self.require_user(user_id)?;
        let exam_mode = query
            .exam_mode
            .unwrap_or_else(|| self.preferences(user_id).exam_mode);

        Ok(catalog::filter_resources(
            &self.resources_with_stats(),
            query,
            exam_mode,
        ))
    }

    pub fn my_resources(&self, user_id: &str) -> Vec<ResourceStats> {
        self.resources_with_stats()
            .into_iter()
            .filter(|r| r.resource.owner_id == user_id)
            .collect()
    }

    pub fn subjects(&self) -> Vec<String> {
        catalog::subjects(&self.resources_with_stats())
    }

    pub fn analytics(&self) -> Analytics {
        stats::analytics(&self.state.resources)
    }

    // ---- reviews ----

    /// Rate a resource, or update the user's earlier rating of it
    ///
    /// # Errors
    /// * `Validation` if the rating is outside 1..=5
    /// * `NotFound` / `Forbidden` as for [`Hub::resource_for`]
    pub fn submit_review(
        &mut self,
        user_id: &str,
        resource_id: &str,
        rating: u8,
        comment: &str,
    ) -> Result<Review> {
        let user = self.require_user(user_id)?;
        let resource = self.raw_resource(resource_id)?;
        if !can_access_resource(resource, Some(user)) {
            return Err(HubError::Forbidden(
                "This resource is private to another college".to_string(),
            ));
        }
        if !(1..=5).contains(&rating) {
            let mut errors = FieldErrors::new();
            errors.add("rating", "Rating must be between 1 and 5.");
            return Err(HubError::Validation(errors));
        }

        let now = Utc::now();
        let comment = comment.trim().to_string();

        if let Some(existing) = self
            .state
            .reviews
            .iter_mut()
            .find(|r| r.resource_id == resource_id && r.user_id == user_id)
        {
            existing.rating = rating;
            existing.comment = comment;
            existing.created_at = now;
            return Ok(existing.clone());
        }

        let review = Review {
            id: make_id("rv"),
            resource_id: resource_id.to_string(),
            user_id: user_id.to_string(),
            rating,
            comment,
            created_at: now,
        };
        self.state.reviews.insert(0, review.clone());
        Ok(review)
    }

    pub fn reviews_for(&self, resource_id: &str) -> Vec<Review> {
        self.state
            .reviews
            .iter()
            .filter(|r| r.resource_id == resource_id)
            .cloned()
            .collect()
    }

    // ---- history ----

    pub fn track_view(&mut self, user_id: &str, resource_id: &str) {
        if user_id.is_empty() || resource_id.is_empty() {
            return;
        }
        let entry = ViewEntry {
            user_id: user_id.to_string(),
            resource_id: resource_id.to_string(),
            viewed_at: Utc::now(),
        };
        push_history(&mut self.state.recently_viewed, entry, VIEW_HISTORY_LIMIT, |e| {
            e.user_id == user_id && e.resource_id == resource_id
        });
    }

    pub fn track_download(&mut self, user_id: &str, resource_id: &str) {
        if user_id.is_empty() || resource_id.is_empty() {
            return;
        }
        let entry = DownloadEntry {
            user_id: user_id.to_string(),
            resource_id: resource_id.to_string(),
            downloaded_at: Utc::now(),
        };
        push_history(
            &mut self.state.download_history,
            entry,
            DOWNLOAD_HISTORY_LIMIT,
            |e| e.user_id == user_id && e.resource_id == resource_id,
        );
    }

    // ---- derived views ----

    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        stats::leaderboard(&self.state.users, &self.state.resources, &self.state.reviews)
    }

    /// Platform totals. Admin only.
    pub fn admin_stats(&self, actor_id: &str) -> Result<AdminStats> {
        require_admin(self.require_user(actor_id)?)?;
        Ok(stats::admin_stats(
            &self.state.users,
            &self.state.resources,
            &self.state.reviews,
        ))
    }

    /// Every resource with its rating stats as CSV. Admin only.
    pub fn resources_csv(&self, actor_id: &str) -> Result<String> {
        require_admin(self.require_user(actor_id)?)?;
        Ok(downloader::resources_to_csv(&self.resources_with_stats()))
    }

    pub fn badges(&self, user_id: &str) -> Vec<Badge> {
        match self.user(user_id) {
            Some(user) => stats::badges(user, &self.state.resources, &self.state.reviews),
            None => Vec::new(),
        }
    }

    pub fn progress(&self, user_id: &str) -> Progress {
        if self.user(user_id).is_none() {
            return Progress::default();
        }
        stats::progress(
            user_id,
            &self.state.recently_viewed,
            &self.state.download_history,
            &self.state.reviews,
        )
    }

    pub fn recently_viewed(&self, user_id: &str) -> Vec<ResourceStats> {
        stats::recently_viewed(
            user_id,
            &self.state.recently_viewed,
            &self.resources_with_stats(),
        )
    }

    pub fn activity(&self, user_id: &str) -> Vec<ActivityEvent> {
        stats::activity(user_id, &self.state.resources, &self.state.reviews)
    }

    pub fn recommendations(&self, user_id: &str) -> Vec<Recommendation> {
        match self.user(user_id) {
            Some(user) => stats::recommendations(
                user,
                &self.resources_with_stats(),
                &self.recently_viewed(user_id),
            ),
            None => Vec::new(),
        }
    }

    /// Everything the profile page needs in one go
    pub fn profile(&self, user_id: &str) -> Result<ProfileSummary> {
        let user = self.require_user(user_id)?;
        let board = self.leaderboard();
        let (rank, points) = stats::rank_of(&board, user_id).unwrap_or((0, 0));
        let progress = self.progress(user_id);

        Ok(ProfileSummary {
            user: user.profile(),
            rank,
            points,
            upload_count: self
                .state
                .resources
                .iter()
                .filter(|r| r.owner_id == user_id)
                .count(),
            review_count: self
                .state
                .reviews
                .iter()
                .filter(|r| r.user_id == user_id)
                .count(),
            badges: self.badges(user_id),
            progress_items: progress.items(),
            progress,
            activity: self.activity(user_id),
            recently_viewed: self.recently_viewed(user_id),
            recommendations: self.recommendations(user_id),
            preferences: self.preferences(user_id),
        })
    }

    // ---- planner ----

    pub fn study_plan(&self, subject: &str, exam_date: Option<NaiveDate>, today: NaiveDate) -> Result<StudyPlan> {
        planner::generate_plan(subject, exam_date, today, &self.resources_with_stats())
    }

    pub fn resource_summary(&self, user_id: &str, resource_id: &str) -> Result<ResourceSummary> {
        let stats = self.resource_for(user_id, resource_id)?;
        Ok(planner::resource_summary(&stats.resource))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;
    use crate::stats::fixtures;

    fn pdf(size: u64) -> Option<FileMeta> {
        Some(FileMeta {
            name: "notes.pdf".to_string(),
            mime: "application/pdf".to_string(),
            size,
        })
    }

    fn upload(title: &str, privacy: Privacy) -> UploadRequest {
        UploadRequest {
            title: title.to_string(),
            subject: "Operating Systems".to_string(),
            semester: "4".to_string(),
            resource_type: ResourceType::Notes,
            tags: " Paging, ,Scheduling ".to_string(),
            privacy,
            description: "Unit 3 revision".to_string(),
            file: pdf(2048),
        }
    }

    /// Users and resources without password hashes, for tests that never log in
    fn plain_hub() -> Hub {
        let mut admin = fixtures::user("admin", "IIT Delhi", 0);
        admin.role = Role::Admin;
        Hub::new(HubState {
            users: vec![
                fixtures::user("u1", "IIT Delhi", 0),
                fixtures::user("u2", "NIT Trichy", 0),
                admin,
            ],
            ..Default::default()
        })
    }

    #[test]
    fn upload_normalizes_and_awards_points() {
        let mut hub = plain_hub();
        let resource = hub.upload_resource("u1", upload("OS Notes", Privacy::Public)).unwrap();

        assert_eq!(resource.tags, vec!["paging", "scheduling"]);
        assert_eq!(resource.college, "IIT Delhi");
        assert_eq!(resource.owner_id, "u1");
        assert!(!resource.featured);
        assert!(resource.id.starts_with("r_"));
        assert_eq!(hub.user("u1").unwrap().base_points, UPLOAD_POINTS);
        assert_eq!(hub.state().resources[0].id, resource.id);
    }

    #[test]
    fn upload_validation_lists_every_problem() {
        let mut hub = plain_hub();
        let mut request = upload("  ", Privacy::Public);
        request.subject = String::new();
        request.tags = " , ".to_string();
        request.file = Some(FileMeta {
            name: "archive.zip".to_string(),
            mime: "application/zip".to_string(),
            size: 10,
        });

        match hub.upload_resource("u1", request) {
            Err(HubError::Validation(fields)) => {
                assert!(fields.contains("title"));
                assert!(fields.contains("subject"));
                assert!(fields.contains("tags"));
                assert_eq!(
                    fields.get("file"),
                    Some("Unsupported file type. Allowed: PDF, PNG, JPG.")
                );
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(hub.state().resources.is_empty());
        assert_eq!(hub.user("u1").unwrap().base_points, 0);
    }

    #[test]
    fn file_limits() {
        assert!(validate_file(pdf(MAX_UPLOAD_BYTES).as_ref()).is_ok());
        assert_eq!(
            validate_file(pdf(MAX_UPLOAD_BYTES + 1).as_ref()),
            Err("File exceeds 5MB size limit.")
        );
        assert_eq!(validate_file(None), Err("Please upload a file (PDF/PNG/JPG)."));
    }

    #[test]
    fn unknown_uploader_is_unauthenticated() {
        let mut hub = plain_hub();
        assert!(matches!(
            hub.upload_resource("ghost", upload("x", Privacy::Public)),
            Err(HubError::Unauthenticated)
        ));
    }

    #[test]
    fn private_resources_are_hidden_from_other_colleges() {
        let mut hub = plain_hub();
        let resource = hub.upload_resource("u1", upload("Secret", Privacy::Private)).unwrap();

        assert!(hub.resource_for("u1", &resource.id).is_ok());
        assert!(matches!(
            hub.resource_for("u2", &resource.id),
            Err(HubError::Forbidden(_))
        ));
        assert!(matches!(
            hub.submit_review("u2", &resource.id, 5, ""),
            Err(HubError::Forbidden(_))
        ));
        assert!(matches!(
            hub.resource_for("u1", "r_missing"),
            Err(HubError::NotFound(_))
        ));
    }

    #[test]
    fn second_review_updates_the_first() {
        let mut hub = plain_hub();
        let resource = hub.upload_resource("u1", upload("OS", Privacy::Public)).unwrap();

        let first = hub.submit_review("u2", &resource.id, 3, "ok").unwrap();
        let second = hub.submit_review("u2", &resource.id, 5, " great ").unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(hub.reviews_for(&resource.id).len(), 1);
        assert_eq!(second.comment, "great");
        let stats = hub.resource_for("u2", &resource.id).unwrap();
        assert_eq!(stats.average_rating, 5.0);
        assert_eq!(stats.rating_count, 1);
    }

    #[test]
    fn ratings_outside_one_to_five_are_rejected() {
        let mut hub = plain_hub();
        let resource = hub.upload_resource("u1", upload("OS", Privacy::Public)).unwrap();
        assert!(matches!(
            hub.submit_review("u2", &resource.id, 0, ""),
            Err(HubError::Validation(_))
        ));
        assert!(matches!(
            hub.submit_review("u2", &resource.id, 6, ""),
            Err(HubError::Validation(_))
        ));
    }

    #[test]
    fn five_star_reviews_lift_the_owner_on_the_leaderboard() {
        let mut hub = plain_hub();
        let resource = hub.upload_resource("u2", upload("OS", Privacy::Public)).unwrap();
        hub.submit_review("u1", &resource.id, 5, "").unwrap();
        hub.submit_review("admin", &resource.id, 5, "").unwrap();

        let board = hub.leaderboard();
        assert_eq!(board[0].user.id, "u2");
        assert_eq!(board[0].points, UPLOAD_POINTS + 10);
        assert_eq!(board[0].five_stars, 2);
    }

    #[test]
    fn featuring_is_admin_only() {
        let mut hub = plain_hub();
        let resource = hub.upload_resource("u1", upload("OS", Privacy::Public)).unwrap();

        assert!(matches!(
            hub.toggle_featured("u1", &resource.id),
            Err(HubError::Forbidden(_))
        ));
        assert!(hub.toggle_featured("admin", &resource.id).unwrap());
        assert!(!hub.toggle_featured("admin", &resource.id).unwrap());
        assert!(hub.admin_stats("u1").is_err());
        assert_eq!(hub.admin_stats("admin").unwrap().total_resources, 1);
    }

    #[test]
    fn delete_cascades_reviews_and_history() {
        let mut hub = plain_hub();
        let resource = hub.upload_resource("u1", upload("OS", Privacy::Public)).unwrap();
        hub.submit_review("u2", &resource.id, 4, "").unwrap();
        hub.track_view("u2", &resource.id);
        hub.track_download("u2", &resource.id);

        assert!(matches!(
            hub.delete_resource("u2", &resource.id),
            Err(HubError::Forbidden(_))
        ));
        hub.delete_resource("u1", &resource.id).unwrap();

        let state = hub.state();
        assert!(state.resources.is_empty());
        assert!(state.reviews.is_empty());
        assert!(state.recently_viewed.is_empty());
        assert!(state.download_history.is_empty());
    }

    #[test]
    fn history_is_deduplicated_and_capped() {
        let mut hub = plain_hub();
        for i in 0..40 {
            hub.track_view("u1", &format!("r{}", i));
        }
        hub.track_view("u1", "r35");

        let views = &hub.state().recently_viewed;
        assert_eq!(views.len(), VIEW_HISTORY_LIMIT);
        assert_eq!(views[0].resource_id, "r35");
        assert_eq!(views.iter().filter(|v| v.resource_id == "r35").count(), 1);

        for i in 0..70 {
            hub.track_download("u2", &format!("r{}", i));
        }
        assert_eq!(hub.state().download_history.len(), DOWNLOAD_HISTORY_LIMIT);
        assert_eq!(hub.progress("u2").downloaded_count, DOWNLOAD_HISTORY_LIMIT);
    }

    #[test]
    fn browse_uses_exam_mode_preference() {
        let mut hub = plain_hub();
        let notes = hub.upload_resource("u1", upload("OS Notes", Privacy::Public)).unwrap();
        hub.upload_resource("u1", upload("OS Draft", Privacy::Public)).unwrap();
        hub.submit_review("u2", &notes.id, 5, "").unwrap();

        assert_eq!(hub.browse("u2", &ResourceQuery::default()).unwrap().total, 2);

        hub.set_preferences(
            "u2",
            Preferences {
                dark_mode: true,
                exam_mode: true,
            },
        )
        .unwrap();
        let page = hub.browse("u2", &ResourceQuery::default()).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].resource.id, notes.id);

        let override_off = ResourceQuery {
            exam_mode: Some(false),
            ..Default::default()
        };
        assert_eq!(hub.browse("u2", &override_off).unwrap().total, 2);
    }

    #[test]
    fn grouped_browse_applies_the_same_filters() {
        let mut hub = plain_hub();
        hub.upload_resource("u1", upload("OS Notes", Privacy::Public)).unwrap();
        let mut dbms = upload("DBMS Notes", Privacy::Public);
        dbms.subject = "DBMS".to_string();
        hub.upload_resource("u1", dbms).unwrap();
        let mut dbms_pyq = upload("DBMS PYQ", Privacy::Public);
        dbms_pyq.subject = "DBMS".to_string();
        dbms_pyq.resource_type = ResourceType::Pyq;
        hub.upload_resource("u2", dbms_pyq).unwrap();

        let grouped = hub.browse_by_subject("u1", &ResourceQuery::default()).unwrap();
        let subjects: Vec<&str> = grouped.keys().map(String::as_str).collect();
        assert_eq!(subjects, ["DBMS", "Operating Systems"]);
        assert_eq!(grouped["DBMS"].len(), 2);

        let pyq_only = ResourceQuery {
            resource_type: Some("PYQ".to_string()),
            ..Default::default()
        };
        let grouped = hub.browse_by_subject("u1", &pyq_only).unwrap();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped["DBMS"][0].resource.title, "DBMS PYQ");

        assert!(matches!(
            hub.browse_by_subject("ghost", &ResourceQuery::default()),
            Err(HubError::Unauthenticated)
        ));
    }

    #[test]
    fn resource_csv_is_admin_only() {
        let mut hub = plain_hub();
        hub.upload_resource("u1", upload("OS Notes", Privacy::Private)).unwrap();

        assert!(matches!(hub.resources_csv("u1"), Err(HubError::Forbidden(_))));
        let csv = hub.resources_csv("admin").unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.contains(",OS Notes,Operating Systems,4,Notes,Private,paging scheduling,"));
    }

    #[test]
    fn registration_and_login_round_trip() {
        let mut hub = Hub::default();
        let request = RegisterRequest {
            name: "Arjun Rao".to_string(),
            email: "arjun@nitt.edu".to_string(),
            college: "NIT Trichy".to_string(),
            branch: "Mechanical".to_string(),
            semester: "2".to_string(),
            password: "hunter22".to_string(),
            role: None,
        };
        let profile = hub.register_user(request.clone()).unwrap();
        assert_eq!(profile.role, Role::User);
        assert_eq!(profile.base_points, 0);
        assert!(profile.id.starts_with("u_"));

        let mut duplicate = request;
        duplicate.email = " ARJUN@nitt.edu".to_string();
        match hub.register_user(duplicate) {
            Err(HubError::Validation(fields)) => assert!(fields.contains("email")),
            other => panic!("unexpected: {:?}", other),
        }

        let login = LoginRequest {
            email: Some("arjun@nitt.edu".to_string()),
            password: "hunter22".to_string(),
            ..Default::default()
        };
        assert_eq!(hub.login_user(&login).unwrap().id, profile.id);
    }

    #[test]
    fn profile_bundles_derived_views() {
        let mut hub = Hub::new(seed::demo_state().unwrap());
        let profile = hub.profile("u1").unwrap();
        assert!(profile.rank >= 1);
        assert_eq!(profile.badges.first(), Some(&Badge::Contributor));

        let first = hub.state().resources[0].id.clone();
        hub.track_view("u1", &first);
        let profile = hub.profile("u1").unwrap();
        assert_eq!(profile.recently_viewed[0].resource.id, first);
        assert_eq!(profile.progress.viewed_count, 1);
        assert_eq!(profile.progress_items.len(), 3);
        assert!(profile.recommendations.len() <= 10);
    }
}

use axum::{
    Extension, Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, Query, Request, State, multipart::MultipartError},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path as FsPath, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::catalog::ResourceQuery;
use crate::config::ServerConfig;
use crate::downloader::{self, PdfMeta};
use crate::error::{FieldErrors, HubError, Result};
use crate::login::{self, LoginRequest, RegisterRequest};
use crate::models::{FileMeta, Preferences, Privacy, ResourceType, Review, UserProfile};
use crate::planner::{PlanRequest, ResourceSummary};
use crate::saving;
use crate::stats::ResourceStats;
use crate::store::{Hub, MAX_UPLOAD_BYTES, UploadRequest};

const SESSION_COOKIE: &str = "session";
const MOCK_PDF_DIR: &str = "mock-pdfs";
/// Room for the largest upload plus the other form fields
const BODY_LIMIT: usize = MAX_UPLOAD_BYTES as usize + 1024 * 1024;

/// Shared server state: the hub behind a lock and where to persist it
pub struct AppState {
    hub: Mutex<Hub>,
    data_dir: PathBuf,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Load the hub from `data_dir`, seeding demo data where documents are missing
    pub fn load(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        let state = saving::load_state(&data_dir)?;
        saving::save_state(&data_dir, &state)?;

        Ok(AppState {
            hub: Mutex::new(Hub::new(state)),
            data_dir,
        })
    }

    pub fn hub(&self) -> MutexGuard<'_, Hub> {
        self.hub.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Write the current state to the data directory
    fn persist(&self, hub: &Hub) -> Result<()> {
        saving::save_state(&self.data_dir, hub.state())
    }

    fn mock_pdf_dir(&self) -> PathBuf {
        self.data_dir.join(MOCK_PDF_DIR)
    }
}

/// Id of the signed-in user, put into request extensions by [`require_auth`]
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

#[derive(Deserialize)]
struct StrengthForm {
    password: String,
}

#[derive(Deserialize)]
struct ReviewForm {
    rating: u8,
    #[serde(default)]
    comment: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResourceDetail {
    resource: ResourceStats,
    owner: Option<UserProfile>,
    reviews: Vec<Review>,
    my_review: Option<Review>,
    can_delete: bool,
    pdf: PdfMeta,
}

#[derive(Serialize)]
struct SummaryResponse {
    summary: ResourceSummary,
    pdf: PdfMeta,
}

/// Build the application router
pub fn router(state: SharedState) -> Router {
    let protected = Router::new()
        .route("/api/me", get(me))
        .route("/api/me/preferences", put(update_preferences))
        .route("/api/me/resources", get(my_resources))
        .route("/api/resources", get(list_resources).post(upload_resource))
        .route("/api/resources/grouped", get(grouped_resources))
        .route(
            "/api/resources/:id",
            get(get_resource).delete(delete_resource),
        )
        .route("/api/resources/:id/featured", post(toggle_featured))
        .route(
            "/api/resources/:id/reviews",
            get(list_reviews).post(submit_review),
        )
        .route("/api/resources/:id/download", get(download_resource))
        .route("/api/resources/:id/summary", get(resource_summary))
        .route("/api/subjects", get(subjects))
        .route("/api/analytics", get(analytics))
        .route("/api/leaderboard", get(leaderboard))
        .route("/api/leaderboard.csv", get(leaderboard_csv))
        .route("/api/leaderboard.xlsx", get(leaderboard_xlsx))
        .route("/api/planner", post(study_plan))
        .route("/api/admin/stats", get(admin_stats))
        .route("/api/admin/resources.csv", get(resources_csv))
        .route("/api/admin/export", get(export_snapshot))
        .route("/api/admin/import", post(import_snapshot))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/", get(serve_landing))
        .route("/api/health", get(health))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/password-strength", post(password_strength))
        .merge(protected)
        .nest_service("/mock-pdfs", ServeDir::new(state.mock_pdf_dir()))
        .layer(middleware::from_fn(log_requests))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}

/// Start the web server
pub async fn run(config: &ServerConfig) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::load(&config.data_dir)?);
    let app = router(state);

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr).await?;
    log::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;
    log::info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

/// Authentication middleware
///
/// Resolves the session cookie to a user that still exists and stores it in
/// the request extensions. Anything else is answered with 401.
pub async fn require_auth(
    State(state): State<SharedState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let user_id = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| login::validate_session(cookie.value()))
        .filter(|user_id| state.hub().user(user_id).is_some());

    match user_id {
        Some(user_id) => {
            request.extensions_mut().insert(CurrentUser(user_id));
            next.run(request).await
        }
        None => HubError::Unauthenticated.into_response(),
    }
}

fn session_cookie(session_id: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, session_id);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie
}

async fn serve_landing() -> Html<&'static str> {
    Html(include_str!("./static/landing.html"))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn register(
    State(state): State<SharedState>,
    jar: CookieJar,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<UserProfile>)> {
    let profile = {
        let mut hub = state.hub();
        let profile = hub.register_user(request)?;
        state.persist(&hub)?;
        profile
    };

    let session_id = login::create_session(&profile.id);
    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(session_id)),
        Json(profile),
    ))
}

async fn login(
    State(state): State<SharedState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<UserProfile>)> {
    let profile = state.hub().login_user(&request)?;
    log::info!("user {} signed in", profile.id);

    let session_id = login::create_session(&profile.id);
    Ok((jar.add(session_cookie(session_id)), Json(profile)))
}

async fn logout(jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        login::end_session(cookie.value());
    }
    (
        jar.remove(session_cookie(String::new())),
        Json(json!({ "status": "ok" })),
    )
}

const STRENGTH_LABELS: [&str; 5] = ["Very weak", "Weak", "Fair", "Strong", "Excellent"];

async fn password_strength(Json(form): Json<StrengthForm>) -> Json<serde_json::Value> {
    let score = login::password_strength(&form.password).min(4);
    Json(json!({
        "score": score,
        "max": 4,
        "label": STRENGTH_LABELS[usize::from(score)],
    }))
}

async fn me(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<impl IntoResponse> {
    let profile = state.hub().profile(&user_id)?;
    Ok(Json(profile))
}

async fn update_preferences(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(preferences): Json<Preferences>,
) -> Result<Json<Preferences>> {
    let mut hub = state.hub();
    let saved = hub.set_preferences(&user_id, preferences)?;
    state.persist(&hub)?;
    Ok(Json(saved))
}

async fn my_resources(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Json<Vec<ResourceStats>> {
    Json(state.hub().my_resources(&user_id))
}

async fn list_resources(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(query): Query<ResourceQuery>,
) -> Result<impl IntoResponse> {
    let page = state.hub().browse(&user_id, &query)?;
    Ok(Json(page))
}

async fn grouped_resources(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(query): Query<ResourceQuery>,
) -> Result<impl IntoResponse> {
    let grouped = state.hub().browse_by_subject(&user_id, &query)?;
    Ok(Json(grouped))
}

fn upload_field_error(field: &str, message: &str) -> HubError {
    let mut errors = FieldErrors::new();
    errors.add(field, message);
    HubError::Validation(errors)
}

/// Read the multipart upload form. Only the file's metadata is kept.
async fn read_upload_form(mut multipart: Multipart) -> Result<UploadRequest> {
    let mut title = String::new();
    let mut subject = String::new();
    let mut semester = "1".to_string();
    let mut resource_type = None;
    let mut tags = String::new();
    let mut privacy = Privacy::Public;
    let mut description = String::new();
    let mut file = None;

    let unreadable =
        |_: MultipartError| upload_field_error("file", "Could not read the upload form.");

    while let Some(field) = multipart.next_field().await.map_err(unreadable)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let mime = field.content_type().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(unreadable)?;
            file = Some(FileMeta {
                name: file_name,
                mime,
                size: bytes.len() as u64,
            });
            continue;
        }

        let value = field.text().await.map_err(unreadable)?;
        match name.as_str() {
            "title" => title = value,
            "subject" => subject = value,
            "semester" => semester = value,
            "type" => {
                resource_type = Some(
                    ResourceType::parse(&value)
                        .ok_or_else(|| upload_field_error("type", "Unknown resource type."))?,
                )
            }
            "tags" => tags = value,
            "privacy" => {
                privacy = Privacy::parse(&value)
                    .ok_or_else(|| upload_field_error("privacy", "Privacy must be Public or Private."))?
            }
            "description" => description = value,
            _ => {}
        }
    }

    Ok(UploadRequest {
        title,
        subject,
        semester,
        resource_type: resource_type.unwrap_or(ResourceType::Notes),
        tags,
        privacy,
        description,
        file,
    })
}

async fn upload_resource(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let request = read_upload_form(multipart).await?;

    let mut hub = state.hub();
    let resource = hub.upload_resource(&user_id, request)?;
    state.persist(&hub)?;

    Ok((StatusCode::CREATED, Json(resource)))
}

async fn get_resource(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(resource_id): Path<String>,
) -> Result<impl IntoResponse> {
    let mut hub = state.hub();
    let resource = hub.resource_for(&user_id, &resource_id)?;

    hub.track_view(&user_id, &resource_id);
    state.persist(&hub)?;

    let reviews = hub.reviews_for(&resource_id);
    let my_review = reviews.iter().find(|r| r.user_id == user_id).cloned();
    let owner = hub.user(&resource.resource.owner_id).map(|u| u.profile());
    let can_delete = hub
        .user(&user_id)
        .is_some_and(|u| u.is_admin() || u.id == resource.resource.owner_id);
    let pdf = downloader::mock_pdf_meta(&resource.resource);

    Ok(Json(ResourceDetail {
        resource,
        owner,
        reviews,
        my_review,
        can_delete,
        pdf,
    }))
}

async fn delete_resource(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(resource_id): Path<String>,
) -> Result<StatusCode> {
    let mut hub = state.hub();
    hub.delete_resource(&user_id, &resource_id)?;
    state.persist(&hub)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_featured(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(resource_id): Path<String>,
) -> Result<impl IntoResponse> {
    let mut hub = state.hub();
    let featured = hub.toggle_featured(&user_id, &resource_id)?;
    state.persist(&hub)?;
    Ok(Json(json!({ "id": resource_id, "featured": featured })))
}

async fn list_reviews(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(resource_id): Path<String>,
) -> Result<Json<Vec<Review>>> {
    let hub = state.hub();
    hub.resource_for(&user_id, &resource_id)?;
    Ok(Json(hub.reviews_for(&resource_id)))
}

async fn submit_review(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(resource_id): Path<String>,
    Json(form): Json<ReviewForm>,
) -> Result<Json<Review>> {
    let mut hub = state.hub();
    let review = hub.submit_review(&user_id, &resource_id, form.rating, &form.comment)?;
    state.persist(&hub)?;
    Ok(Json(review))
}

/// Bytes of the bundled sample PDF for this type, if one was installed
async fn bundled_pdf(dir: &FsPath, kind: ResourceType) -> Option<Vec<u8>> {
    tokio::fs::read(dir.join(downloader::mock_pdf_source(kind)))
        .await
        .ok()
}

async fn download_resource(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(resource_id): Path<String>,
) -> Result<Response> {
    let resource = {
        let mut hub = state.hub();
        let stats = hub.resource_for(&user_id, &resource_id)?;
        hub.track_download(&user_id, &resource_id);
        hub.track_view(&user_id, &resource_id);
        state.persist(&hub)?;
        stats.resource
    };

    let body = bundled_pdf(&state.mock_pdf_dir(), resource.resource_type)
        .await
        .unwrap_or_else(|| downloader::render_resource_pdf(&resource));
    let file_name = downloader::download_file_name(&resource);
    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        file_name.replace(|c: char| !c.is_ascii(), "_"),
        urlencoding::encode(&file_name)
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(body),
    )
        .into_response())
}

async fn resource_summary(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(resource_id): Path<String>,
) -> Result<impl IntoResponse> {
    let hub = state.hub();
    let summary = hub.resource_summary(&user_id, &resource_id)?;
    let stats = hub.resource_for(&user_id, &resource_id)?;

    Ok(Json(SummaryResponse {
        summary,
        pdf: downloader::mock_pdf_meta(&stats.resource),
    }))
}

async fn subjects(State(state): State<SharedState>) -> Json<Vec<String>> {
    Json(state.hub().subjects())
}

async fn analytics(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.hub().analytics())
}

async fn leaderboard(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.hub().leaderboard())
}

async fn leaderboard_csv(State(state): State<SharedState>) -> impl IntoResponse {
    let csv = downloader::leaderboard_to_csv(&state.hub().leaderboard());
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"leaderboard.csv\"",
            ),
        ],
        csv,
    )
}

async fn resources_csv(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<impl IntoResponse> {
    let csv = state.hub().resources_csv(&user_id)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"resources.csv\"",
            ),
        ],
        csv,
    ))
}

async fn leaderboard_xlsx(State(state): State<SharedState>) -> Response {
    let board = state.hub().leaderboard();
    match downloader::leaderboard_to_xlsx(&board) {
        Ok(buffer) => (
            [
                (
                    header::CONTENT_TYPE,
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                ),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"leaderboard.xlsx\"",
                ),
            ],
            buffer,
        )
            .into_response(),
        Err(e) => {
            log::error!("xlsx export failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn study_plan(
    State(state): State<SharedState>,
    Json(request): Json<PlanRequest>,
) -> Result<impl IntoResponse> {
    let today = Utc::now().date_naive();
    let plan = state
        .hub()
        .study_plan(&request.subject, request.exam_date, today)?;
    Ok(Json(plan))
}

async fn admin_stats(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<impl IntoResponse> {
    let stats = state.hub().admin_stats(&user_id)?;
    Ok(Json(stats))
}

async fn export_snapshot(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Response> {
    let buffer = {
        let hub = state.hub();
        hub.ensure_admin(&user_id)?;
        saving::snapshot_to_bytes(hub.state())?
    };

    Ok((
        [
            (header::CONTENT_TYPE, "application/gzip"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"campus-hub.bin.gz\"",
            ),
        ],
        buffer,
    )
        .into_response())
}

async fn import_snapshot(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    state.hub().ensure_admin(&user_id)?;

    let mut file_data = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| upload_field_error("snapshot", "Could not read the upload form."))?
    {
        if field.name() == Some("snapshot") {
            file_data = field
                .bytes()
                .await
                .map_err(|_| upload_field_error("snapshot", "Could not read the snapshot."))?
                .to_vec();
        }
    }

    if file_data.is_empty() {
        return Err(upload_field_error("snapshot", "No snapshot data received."));
    }

    let mut imported = saving::snapshot_from_bytes(&file_data)
        .map_err(|_| upload_field_error("snapshot", "Not a valid snapshot file."))?;
    saving::normalize_state(&mut imported)?;

    let mut hub = state.hub();
    hub.replace_state(imported);
    state.persist(&hub)?;
    log::info!("admin {} imported a snapshot", user_id);

    Ok(Json(json!({
        "status": "ok",
        "users": hub.state().users.len(),
        "resources": hub.state().resources.len(),
        "reviews": hub.state().reviews.len(),
    })))
}

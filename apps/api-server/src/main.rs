//! api-server - HTTP API for the video collection.
//!
//! Binds the domain's `VideoService` to JSON endpoints:
//! - `GET  /`                 app title
//! - `POST /api/videos`       add a video (URL validated, `video_id` derived)
//! - `GET  /api/videos`       list, optionally `?search_term=`
//! - `GET  /api/videos/:id`   detail
//! - `PUT  /api/videos/:id`   edit (re-validated, `video_id` re-derived)
//!
//! Storage is in-memory or SQLite (default, behind the `sqlite` feature).
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! cargo run -p api-server
//!
//! # throwaway storage, JSON logs
//! STORAGE_PROVIDER=memory LOG_FORMAT=json cargo run -p api-server
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use domain::adapters::memory_repo::InMemoryRepo;
use domain::service::VideoService;
use domain::{CoreError, ListOptions, NewVideo, Video, VideoDraft, VideoKey, VideoRepository};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Local repo abstraction supporting memory or sqlite (feature-gated).
enum AnyRepo {
    Memory(InMemoryRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite_adapter::SqliteRepo),
}

impl AnyRepo {
    fn memory() -> Self {
        AnyRepo::Memory(InMemoryRepo::new())
    }

    #[cfg(feature = "sqlite")]
    fn sqlite(db_path: Option<&std::path::Path>) -> Result<Self, CoreError> {
        let repo = match db_path {
            Some(path) => sqlite_adapter::SqliteRepo::open(path)?,
            None => sqlite_adapter::SqliteRepo::from_env()?,
        };
        Ok(AnyRepo::Sqlite(repo))
    }
}

impl VideoRepository for AnyRepo {
    fn insert(&self, draft: VideoDraft) -> Result<Video, CoreError> {
        match self {
            AnyRepo::Memory(r) => r.insert(draft),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.insert(draft),
        }
    }

    fn update(&self, video: &Video) -> Result<(), CoreError> {
        match self {
            AnyRepo::Memory(r) => r.update(video),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.update(video),
        }
    }

    fn get(&self, id: VideoKey) -> Result<Option<Video>, CoreError> {
        match self {
            AnyRepo::Memory(r) => r.get(id),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.get(id),
        }
    }

    fn list(&self, options: &ListOptions) -> Result<Vec<Video>, CoreError> {
        match self {
            AnyRepo::Memory(r) => r.list(options),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.list(options),
        }
    }

    fn count(&self) -> Result<usize, CoreError> {
        match self {
            AnyRepo::Memory(r) => r.count(),
            #[cfg(feature = "sqlite")]
            AnyRepo::Sqlite(r) => r.count(),
        }
    }
}

#[derive(Clone)]
struct AppState {
    videos: Arc<VideoService<AnyRepo>>,
    app_name: Arc<str>,
}

impl AppState {
    fn new(repo: AnyRepo, app_name: &str) -> Self {
        Self {
            videos: Arc::new(VideoService::new(repo)),
            app_name: Arc::from(app_name),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.warn_if_ephemeral();

    let repo = match build_repo(&cfg) {
        Ok(r) => r,
        Err(e) => {
            error!(err = %e, "storage init failed");
            std::process::exit(1);
        }
    };
    let state = AppState::new(repo, &cfg.app_name);

    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    let mut app = router(state)
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));

    // CORS - already validated in Config::from_env()
    let cors = if cfg.cors_allow_origin == HeaderValue::from_static("*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([cfg.cors_allow_origin.clone()]))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    };
    app = app.layer(cors);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    info!(%addr, "api-server listening");
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, err = %e, "bind failed");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        error!(err = %e, "server error");
        std::process::exit(1);
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/api/videos", get(list_videos).post(create_video))
        .route("/api/videos/:id", get(get_video).put(update_video))
        .with_state(state)
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

// Construct a repository instance based on config and feature flags.
fn build_repo(cfg: &config::Config) -> Result<AnyRepo, CoreError> {
    match cfg.storage_provider {
        #[cfg(feature = "sqlite")]
        config::StorageProvider::Sqlite => AnyRepo::sqlite(cfg.db_path.as_deref()),
        #[cfg(not(feature = "sqlite"))]
        config::StorageProvider::Sqlite => {
            warn!("built without the sqlite feature; falling back to memory storage");
            Ok(AnyRepo::memory())
        }
        config::StorageProvider::Memory => Ok(AnyRepo::memory()),
    }
}

#[derive(Serialize)]
struct HomeOut {
    app_name: String,
    video_count: usize,
    summary: String,
}

#[derive(Serialize)]
struct VideoOut {
    id: i64,
    name: String,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    video_id: String,
    embed_url: String,
}

#[derive(Serialize)]
struct ListOut {
    videos: Vec<VideoOut>,
    count: usize,
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    search_term: Option<String>,
}

#[derive(Deserialize)]
struct ListQuery {
    search_term: Option<String>,
}

fn video_to_out(video: Video) -> VideoOut {
    VideoOut {
        id: video.id.get(),
        embed_url: http_common::embed_url(video.video_id.as_str()),
        video_id: video.video_id.as_str().to_string(),
        name: video.name,
        url: video.url,
        notes: video.notes,
    }
}

/// Turn a domain error into a JSON error response.
fn error_response(err: CoreError) -> Response {
    match &err {
        CoreError::InvalidUrl { url, reason } => {
            warn!(%url, %reason, "rejected url");
            (
                StatusCode::BAD_REQUEST,
                Json(http_common::json_error_with_message(
                    "invalid_url",
                    &err.to_string(),
                )),
            )
                .into_response()
        }
        CoreError::InvalidInput(msg) => {
            warn!(%msg, "rejected input");
            (
                StatusCode::BAD_REQUEST,
                Json(http_common::json_error_with_message("invalid_request", msg)),
            )
                .into_response()
        }
        CoreError::DuplicateVideo(video_id) => {
            warn!(%video_id, "duplicate video");
            (
                StatusCode::CONFLICT,
                Json(http_common::json_err("duplicate_video")),
            )
                .into_response()
        }
        CoreError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(http_common::json_err("not_found")),
        )
            .into_response(),
        CoreError::Repository(_) => {
            error!(err = %err, "repository error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(http_common::json_err("internal")),
            )
                .into_response()
        }
    }
}

async fn home(State(state): State<AppState>) -> Response {
    match state.videos.count() {
        Ok(video_count) => Json(HomeOut {
            app_name: state.app_name.to_string(),
            video_count,
            summary: http_common::video_count_label(video_count),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn create_video(
    State(state): State<AppState>,
    Json(body): Json<NewVideo>,
) -> Response {
    match state.videos.save(body) {
        Ok(video) => {
            info!(id = %video.id, video_id = %video.video_id, "video added");
            (StatusCode::CREATED, Json(video_to_out(video))).into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn list_videos(State(state): State<AppState>, Query(q): Query<ListQuery>) -> Response {
    match state.videos.list(q.search_term.as_deref()) {
        Ok(videos) => {
            let count = videos.len();
            let search_term = ListOptions::from_term(q.search_term.as_deref()).search;
            Json(ListOut {
                videos: videos.into_iter().map(video_to_out).collect(),
                count,
                summary: http_common::video_count_label(count),
                search_term,
            })
            .into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn get_video(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    // Non-numeric keys cannot exist, so they are simply not found
    let Ok(key) = id.parse::<VideoKey>() else {
        return error_response(CoreError::NotFound);
    };
    match state.videos.get(key) {
        Ok(video) => Json(video_to_out(video)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn update_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<NewVideo>,
) -> Response {
    let Ok(key) = id.parse::<VideoKey>() else {
        return error_response(CoreError::NotFound);
    };
    match state.videos.update(key, body) {
        Ok(video) => {
            info!(id = %video.id, video_id = %video.video_id, "video updated");
            Json(video_to_out(video)).into_response()
        }
        Err(e) => error_response(e),
    }
}

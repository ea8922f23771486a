use crate::config::Config;
use crate::observability::{self, MetricName};
use crate::pipeline::artifacts::{read_cleaned_movies, read_movie_analytics};
use crate::query::{movies_by_genre, top_rated_candidates};
use crate::types::{MovieAnalytics, NormalizedMovie};
use axum::{
    extract::{Query, State},
    http::{Method, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use hyper::Server;
use metrics::counter;
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Tables the query service reads, loaded once at startup
#[derive(Debug, Clone)]
pub struct AppContext {
    pub movies: Vec<NormalizedMovie>,
    pub analytics: Vec<MovieAnalytics>,
    pub config: Config,
}

impl AppContext {
    /// Read the cleaned movies and the gold table. A missing or unreadable
    /// file leaves that table empty; the endpoints report it per request.
    pub fn load(config: &Config) -> Self {
        let movies = match read_cleaned_movies(&config.movies_cleaned()) {
            Ok(movies) => {
                info!("Loaded {} movies from {}", movies.len(), config.movies_cleaned().display());
                movies
            }
            Err(e) => {
                warn!("Movie data unavailable: {}", e);
                Vec::new()
            }
        };

        let analytics = match read_movie_analytics(&config.movie_analytics()) {
            Ok(rows) => {
                info!("Loaded {} analytics rows from {}", rows.len(), config.movie_analytics().display());
                rows
            }
            Err(e) => {
                warn!("Analytics data unavailable: {}", e);
                Vec::new()
            }
        };

        Self {
            movies,
            analytics,
            config: config.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TopByGenreParams {
    pub genre: Option<String>,
    pub top_n: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RandomTopRatedParams {
    pub genre: Option<String>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn not_found(message: impl Into<String>) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "message": message.into() }))).into_response()
}

async fn home() -> Html<&'static str> {
    Html("<h1>MovieLens API</h1><p>Try /api/movies/top_by_genre?genre=Comedy&amp;top_n=5</p>")
}

/// Health check endpoint
async fn health(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "movie-api",
        "version": env!("CARGO_PKG_VERSION"),
        "movies": ctx.movies.len(),
        "analytics_rows": ctx.analytics.len(),
    }))
}

async fn metrics_text() -> impl IntoResponse {
    observability::render().unwrap_or_default()
}

async fn top_by_genre(State(ctx): State<Arc<AppContext>>, Query(params): Query<TopByGenreParams>) -> Response {
    counter!(MetricName::HttpRequests.as_str(), "endpoint" => "top_by_genre").increment(1);

    let Some(genre) = params.genre.filter(|g| !g.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "Genre parameter is required");
    };
    let top_n = match params.top_n.as_deref() {
        None => ctx.config.server.default_top_n,
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(n) => n,
            Err(_) => return error_response(StatusCode::BAD_REQUEST, "top_n must be an integer"),
        },
    };

    if ctx.movies.is_empty() {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Movie data not available");
    }

    let mut matches = movies_by_genre(&ctx.movies, genre.trim());
    if matches.is_empty() {
        return not_found(format!("No movies found for genre: {genre}"));
    }
    matches.truncate(top_n);
    Json(matches).into_response()
}

async fn random_top_rated(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<RandomTopRatedParams>,
) -> Response {
    counter!(MetricName::HttpRequests.as_str(), "endpoint" => "random_top_rated").increment(1);

    if ctx.analytics.is_empty() {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Analytics data not available");
    }

    let genre = params.genre.as_deref().map(str::trim).filter(|g| !g.is_empty());
    let candidates = top_rated_candidates(
        &ctx.analytics,
        ctx.config.analytics.top_rated_min_average,
        ctx.config.analytics.top_rated_min_ratings,
        genre,
    );

    let pick = candidates.choose(&mut rand::thread_rng()).copied();
    match pick {
        Some(row) => Json(row).into_response(),
        None => not_found("No top-rated movies found"),
    }
}

/// Build the router with every route and the CORS layer
pub fn create_server(ctx: Arc<AppContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .route("/api/movies/top_by_genre", get(top_by_genre))
        .route("/api/movies/random_top_rated", get(random_top_rated))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(ctx)
}

/// Serve the query API until the process is stopped
pub async fn start_server(ctx: Arc<AppContext>, addr: SocketAddr) -> Result<(), hyper::Error> {
    let app = create_server(ctx);
    let port = addr.port();

    println!("🚀 Movie API running on http://localhost:{port}");
    println!("💚 Health check: http://localhost:{port}/health");
    println!("🎬 Top by genre: http://localhost:{port}/api/movies/top_by_genre?genre=Comedy");

    Server::bind(&addr).serve(app.into_make_service()).await
}

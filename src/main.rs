use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use axum::{
    extract::{Path as UrlPath, Query, State},
    http::{header, HeaderValue, Response, StatusCode},
    routing::{get, post},
    Router,
};
use cards::cache;
use pack::{
    generator::PackGenerator,
    handlers::{AppState, PackQuery},
    PackConfig,
};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use uuid::Uuid;

mod cards;
mod pack;

pub type Res<T> = Result<T, String>;

pub fn err<T, S: ToString>(message: S) -> Res<T> {
    Err(message.to_string())
}

const CONFIG_FILE: &str = "pack_config.json";
const API_KEY_VAR: &str = "POKEMON_TCG_API";

#[derive(serde::Serialize)]
struct Resp {
    message: String,
    success: bool,
}

impl Resp {
    fn axum<S: ToString>(message: S, status: StatusCode) -> Response<String> {
        match serde_json::ser::to_string(&Self {
            message: message.to_string(),
            success: status == StatusCode::OK,
        }) {
            Ok(body) => {
                let mut resp = Response::new(body);
                *resp.status_mut() = status;
                resp
            }
            Err(e) => {
                let mut resp = Response::new(format!("Failed to JSON encode response: {e}"));
                *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                resp
            }
        }
    }

    fn json<T: serde::Serialize>(value: &T) -> Response<String> {
        match serde_json::ser::to_string(value) {
            Ok(body) => {
                let mut resp = Response::new(body);
                resp.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                resp
            }
            Err(e) => Self::e500(format!("Failed to JSON encode response: {e}")),
        }
    }

    fn e404<S: ToString>(message: S) -> Response<String> {
        Self::axum(message, StatusCode::NOT_FOUND)
    }

    fn e500<S: ToString>(message: S) -> Response<String> {
        Self::axum(message, StatusCode::INTERNAL_SERVER_ERROR)
    }
}

async fn pack_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PackQuery>,
) -> Response<String> {
    pack::handlers::handle_pack_request(state, query).await
}

async fn open_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PackQuery>,
) -> Response<String> {
    pack::handlers::handle_open_request(state, query).await
}

async fn reveal_handler(
    State(state): State<Arc<AppState>>,
    UrlPath(session): UrlPath<Uuid>,
) -> Response<String> {
    pack::handlers::handle_reveal_request(state, session).await
}

/// Read pack settings from the data directory, falling back to the defaults
/// if there is no config file.
async fn load_config(data: &Path) -> Res<PackConfig> {
    let file = data.join(CONFIG_FILE);
    if !file.exists() {
        tracing::debug!("No {CONFIG_FILE} in data directory, using default pack settings.");
        return Ok(PackConfig::default());
    }

    let raw = tokio::fs::read(&file).await.map_err(|e| e.to_string())?;
    serde_json::from_slice(&raw).map_err(|e| format!("Invalid {}: {e}", file.display()))
}

async fn load_pack_generator(data: &Path) -> Res<PackGenerator> {
    let config = load_config(data).await?;
    let api_key = std::env::var(API_KEY_VAR).ok();
    if api_key.is_none() {
        tracing::warn!("{API_KEY_VAR} not set, API requests will be rate limited.");
    }

    let catalog = cache::load_catalog(data, &config.sets(), api_key.as_deref()).await?;
    if catalog.size() == 0 {
        return err("Card catalog is empty.");
    }
    tracing::debug!(
        "Succesfully populated card catalog with {} cards.",
        catalog.size()
    );

    PackGenerator::from_config(catalog, &config).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    const USAGE: &str = "Usage: packsim <static path> <data path> <port>";

    let content = std::env::args().nth(1).expect(USAGE);
    let data = std::env::args().nth(2).expect(USAGE);
    let port = std::env::args()
        .nth(3)
        .map(|s| {
            s.parse::<u16>()
                .unwrap_or_else(|_| panic!("Invalid port number: {s}"))
        })
        .expect(USAGE);

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let data = PathBuf::from(data);
    let generator = match load_pack_generator(&data).await {
        Ok(generator) => generator,
        Err(e) => panic!("Failed to load card catalog: {e}"),
    };
    let sets: Vec<&str> = generator.catalog().sets().collect();
    tracing::info!(
        "Opening {}-card packs from sets: {}",
        generator.cards_per_pack(),
        sets.join(", ")
    );

    let app = Router::new()
        .fallback_service(ServeDir::new(content).append_index_html_on_directories(true))
        .nest_service("/images", ServeDir::new(data.join("images")))
        .route("/api/pack", get(pack_handler))
        .route("/api/open", post(open_handler))
        .route("/api/reveal/:session", post(reveal_handler))
        .with_state(Arc::new(AppState::new(generator)))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .unwrap_or_else(|_| panic!("Failed to open port {port}"));

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Closed due to error: {e}");
    }
}

//! HTTP Server for the csvtoprism API.
//!
//! The browser front-end uploads a plate export, lets the user arrange
//! control groups, then asks the server to generate the Prism CSV files.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                              |
//! |--------|-------------------|------------------------------------------|
//! | GET    | `/health`         | Health check                             |
//! | POST   | `/api/upload`     | Upload a plate export, get the samples   |
//! | POST   | `/api/generate`   | Write raw and adjusted CSV for a request |
//! | GET    | `/api/logs`       | SSE stream for real-time logs            |

use axum::{
    extract::{Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, path::Path, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, GenerateRequest, GenerateResponse, UploadResponse};
use crate::config::ServerConfig;
use crate::error::{PipelineError, ServerError, ServerResult};
use crate::transform::builder::parse_sort_order;
use crate::transform::pipeline::{generate_csv, read_experiment_bytes, write_generated, ConvertOptions};

type AppState = Arc<ServerConfig>;

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(PipelineError::Grid(_))
            | ServerError::Pipeline(PipelineError::Experiment(_))
            | ServerError::Pipeline(PipelineError::Xls(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Pipeline(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        log_error(self.to_string());
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

/// Build the router (separate from [`start_server`] so it can be exercised in tests)
pub fn router(config: ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/upload", post(upload_export))
        .route("/api/generate", post(generate))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(Arc::new(config))
}

/// Start the HTTP server
pub async fn start_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    eprintln!("🚀 csvtoprism server running on http://localhost:{}", config.port);
    eprintln!("   POST /api/upload   - Upload plate export (xls/xlsx/csv)");
    eprintln!("   POST /api/generate - Generate raw + adjusted CSV");
    eprintln!("   GET  /api/logs     - SSE log stream");
    eprintln!("   GET  /health       - Health check");
    eprintln!("📁 Output directory: {}", config.output_dir.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(config)).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "csvtoprism",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "POST /api/upload",
            "generate": "POST /api/generate",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Experiment name for an uploaded file, which must be `<name>.<ext>`.
fn upload_name(file_name: &str) -> ServerResult<String> {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_name);

    match base.split('.').collect::<Vec<_>>().as_slice() {
        [name, ext] if !name.is_empty() && !ext.is_empty() => Ok(name.to_string()),
        _ => Err(ServerError::BadRequest(
            "malformed experiment file, must be of type <name>.xlsx".to_string(),
        )),
    }
}

/// Upload endpoint: plate export in, samples out
async fn upload_export(mut multipart: Multipart) -> ServerResult<Json<UploadResponse>> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut options = ConvertOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "xlsfile" | "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                file_data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?
                        .to_vec(),
                );
            }
            "sheet" => {
                let text = field.text().await.map_err(|e| ServerError::BadRequest(e.to_string()))?;
                options.sheet = text
                    .trim()
                    .parse()
                    .map_err(|_| ServerError::BadRequest(format!("Invalid sheet index: {}", text)))?;
            }
            "sortOrder" => {
                let text = field.text().await.map_err(|e| ServerError::BadRequest(e.to_string()))?;
                let order = parse_sort_order(&text)
                    .map_err(|_| ServerError::BadRequest(format!("Invalid sort order: {}", text)))?;
                options.sort_order = (!order.is_empty()).then_some(order);
            }
            _ => {}
        }
    }

    let bytes = file_data.ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;
    let file_name = file_name.unwrap_or_default();
    let name = upload_name(&file_name)?;

    log_info(format!("📄 Importing file: {} ({} bytes)", file_name, bytes.len()));

    let (experiment, parsed) =
        tokio::task::spawn_blocking(move || read_experiment_bytes(&name, &bytes, &options))
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))??;

    Ok(Json(UploadResponse::new(experiment, &parsed)))
}

/// Generate endpoint: experiment JSON in, CSV files out
async fn generate(
    State(config): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> ServerResult<Json<GenerateResponse>> {
    let name = request.experiment.name().to_string();
    if name.is_empty() {
        return Err(ServerError::BadRequest("experiment name is required".to_string()));
    }
    if name.contains(['/', '\\']) || name.starts_with('.') {
        return Err(ServerError::BadRequest(format!("invalid experiment name: {}", name)));
    }

    log_info(format!("⚙️  Generating CSV for {}", name));

    let output_dir = config.output_dir.clone();
    let job_name = name.clone();
    let (csv, files) = tokio::task::spawn_blocking(move || {
        let (_, _, csv) = generate_csv(&request.experiment, &request.groups)?;
        let files = write_generated(&job_name, &csv, &output_dir)?;
        Ok::<_, PipelineError>((csv, files))
    })
    .await
    .map_err(|e| ServerError::Internal(e.to_string()))??;

    Ok(Json(GenerateResponse::new(&name, csv, files)))
}

//! HTTP server for tab classification

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{ClassifyError, EpochMillis, RunOptions, RunOutcome, SharedOrchestrator, TabRecord};

/// Tab as sent by the host; `last_active_at` may be seconds or milliseconds
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabHttp {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub domain: String,
    #[serde(alias = "last_active_at")]
    pub last_active_at: i64,
    #[serde(default)]
    pub inactive: bool,
}

impl From<TabHttp> for TabRecord {
    fn from(tab: TabHttp) -> Self {
        TabRecord {
            id: tab.id,
            title: tab.title,
            url: tab.url,
            domain: tab.domain,
            last_active_at: EpochMillis::from_ambiguous(tab.last_active_at),
            inactive: tab.inactive,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequestHttp {
    pub tabs: Vec<TabHttp>,
    #[serde(default, alias = "forcePass2")]
    pub force_pass2: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

async fn classify_handler(
    State(orchestrator): State<SharedOrchestrator>,
    Json(req): Json<ClassifyRequestHttp>,
) -> Result<Json<RunOutcome>, (StatusCode, Json<ErrorResponse>)> {
    info!(
        "Received classify request: {} tabs, force_pass2={}",
        req.tabs.len(),
        req.force_pass2
    );

    let tabs: Vec<TabRecord> = req.tabs.into_iter().map(TabRecord::from).collect();
    let options = RunOptions {
        force_pass2: req.force_pass2,
    };

    match orchestrator.run(&tabs, options).await {
        Ok(outcome) => {
            info!(
                "Classification successful: {} results, {} cache hits, {} refined",
                outcome.results.len(),
                outcome.stats.cache_hits,
                outcome.stats.uncertain_refined
            );
            Ok(Json(outcome))
        }
        Err(e) => {
            error!("Classification failed: {:?}", e);
            Err(error_response(&e))
        }
    }
}

fn error_response(e: &ClassifyError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match e {
        ClassifyError::ModelLoad { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: "Classification failed".to_string(),
            details: Some(e.to_string()),
        }),
    )
}

/// Health check handler
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "tabsense".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Create and configure the HTTP server
pub fn create_router(orchestrator: SharedOrchestrator) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/classify", post(classify_handler))
        .with_state(orchestrator)
}

/// Run the HTTP server
pub async fn run_server(orchestrator: SharedOrchestrator, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    info!("Starting tabsense server on {}", addr);

    let app = create_router(orchestrator);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

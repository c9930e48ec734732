use crate::error::SearchError;
use crate::render::ResultsView;
use crate::widget::SearchSession;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

// ========== Request/Response Types ==========

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub total: usize,
    pub results: Vec<ResultResponse>,
    /// The fragment the widget would paint into the results container
    pub html: String,
}

#[derive(Debug, Serialize)]
pub struct ResultResponse {
    pub id: String,
    pub title: String,
    pub url: String,
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_documents: usize,
    pub total_tokens: usize,
    pub avg_docs_per_token: f64,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message: Some(message),
        }
    }
}

/// Shared state of the preview server
pub struct AppState {
    pub session: Arc<SearchSession>,
    pub max_results: usize,
}

// ========== Error Handling ==========

struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = format!("{:#}", self.0);
        let status = match self.0.downcast_ref::<SearchError>() {
            Some(SearchError::Query(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!("API error: {}", message);

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

// ========== Handlers ==========

async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::success("OK"))
}

async fn search_documents(
    State(state): State<Arc<AppState>>,
    Query(req): Query<SearchRequest>,
) -> Result<impl IntoResponse, AppError> {
    let query = req.q.trim().to_string();
    if query.is_empty() {
        return Ok(Json(ApiResponse::success(SearchResponse {
            query,
            total: 0,
            results: Vec::new(),
            html: String::new(),
        })));
    }

    let corpus = state.session.corpus();
    let mut hits = state.session.index().search(&query)?;
    let total = hits.len();
    hits.truncate(req.limit.unwrap_or(state.max_results).min(state.max_results));

    let mut view = ResultsView::default();
    view.render(&hits, corpus);

    let results = hits
        .iter()
        .filter_map(|hit| {
            corpus.get(&hit.doc_ref).map(|doc| ResultResponse {
                id: doc.id.clone(),
                title: doc.title.clone(),
                url: doc.url.clone(),
                score: hit.score,
            })
        })
        .collect();

    Ok(Json(ApiResponse::success(SearchResponse {
        query,
        total,
        results,
        html: view.html(),
    })))
}

async fn get_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = state.session.index().stats();

    Json(ApiResponse::success(StatsResponse {
        total_documents: stats.total_documents,
        total_tokens: stats.total_tokens,
        avg_docs_per_token: stats.avg_docs_per_token,
    }))
}

// ========== Router ==========

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/search", get(search_documents))
        .route("/stats", get(get_stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

use super::AppState;
use crate::assistant::diagnostic_message;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{ get, post },
    Json,
    Router,
};
use log::{ error, info, warn };
use serde::{ Deserialize, Serialize };
use std::error::Error;
use std::net::SocketAddr;
use tower_http::cors::{ Any, CorsLayer };

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FaqResponse {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub ok: bool,
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub intents: usize,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/faq", post(faq_handler))
        .route("/api/faq/suggestions", get(suggestions_handler))
        .route("/api/ask", post(ask_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_http_server(
    http_port: u16,
    state: AppState
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = format!("0.0.0.0:{}", http_port).parse::<SocketAddr>()?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e)
    })?;
    info!("Starting HTTP API server on: http://{}", addr);

    let app = router(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app.into_make_service()).await {
            error!("HTTP server error: {}", e);
        }
    });

    Ok(())
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        intents: state.intents.entries().len(),
    })
}

async fn faq_handler(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>
) -> Json<FaqResponse> {
    Json(FaqResponse {
        response: state.intents.respond(&req.message).to_string(),
    })
}

async fn suggestions_handler(State(state): State<AppState>) -> Json<SuggestionsResponse> {
    Json(SuggestionsResponse {
        suggestions: state.intents.suggestions().to_vec(),
    })
}

async fn ask_handler(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>
) -> impl IntoResponse {
    let query = req.message.trim();
    if query.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(AskResponse {
            ok: false,
            response: "message is empty".into(),
        }));
    }

    match state.assistant.ask(query).await {
        Ok(response) => (StatusCode::OK, Json(AskResponse { ok: true, response })),
        Err(e) => {
            warn!("Assistant request failed: {}", e);
            (StatusCode::OK, Json(AskResponse {
                ok: false,
                response: diagnostic_message(&e, state.assistant.endpoint()),
            }))
        }
    }
}

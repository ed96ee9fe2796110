use crate::chat::{ChatMessage, ChatRole};
use crate::error::{ApiError, ErrorResponse};
use crate::ollama::{ChatRelay, ChatRequest, ChatResult, HealthReport, HealthStatus, ModelsResponse};
use actix_web::{HttpResponse, Responder, get, post, web};
use utoipa::OpenApi;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (
            status = 200,
            description = "Assistant reply; relay failures carry success=false and an error",
            body = ChatResult
        ),
        (status = 400, description = "Malformed request body", body = ErrorResponse)
    )
)]
#[post("/api/chat")]
pub async fn chat(
    relay: web::Data<ChatRelay>,
    req: web::Json<ChatRequest>,
) -> impl Responder {
    let request_id = Uuid::new_v4();
    let ChatRequest {
        message,
        model,
        history,
    } = req.into_inner();

    tracing::info!(
        "[{request_id}] Chat requested with model {}",
        model.as_deref().unwrap_or(relay.default_model())
    );

    // The caller's history comes back updated so stateless clients can keep the thread going.
    let result = match history {
        Some(mut history) => {
            let mut result = relay.chat(&message, Some(&mut history), model.as_deref()).await;
            result.history = Some(history);
            result
        }
        None => relay.chat(&message, None, model.as_deref()).await,
    };

    if !result.success {
        tracing::info!(
            "[{request_id}] Chat failed: {}",
            result.error.as_deref().unwrap_or_default()
        );
    }

    HttpResponse::Ok().json(result)
}

#[utoipa::path(
    get,
    path = "/api/models",
    responses(
        (status = 200, description = "Models installed on the Ollama server", body = ModelsResponse),
        (status = 503, description = "Ollama could not list its models", body = ErrorResponse)
    )
)]
#[get("/api/models")]
pub async fn list_models(relay: web::Data<ChatRelay>) -> Result<HttpResponse, ApiError> {
    let models = relay
        .list_models()
        .await
        .map_err(|e| ApiError::service_unavailable(format!("Unable to list models: {e}")))?;

    Ok(HttpResponse::Ok().json(ModelsResponse {
        models,
        current_model: relay.default_model().to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Reachability of the Ollama server", body = HealthReport)
    )
)]
#[get("/api/health")]
pub async fn health(relay: web::Data<ChatRelay>) -> impl Responder {
    HttpResponse::Ok().json(relay.health().await)
}

#[derive(OpenApi)]
#[openapi(
    paths(chat, list_models, health),
    components(schemas(
        ChatRequest,
        ChatResult,
        ChatMessage,
        ChatRole,
        ModelsResponse,
        HealthReport,
        HealthStatus,
        ErrorResponse
    ))
)]
pub struct ChatApiDoc;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(chat).service(list_models).service(health);
}

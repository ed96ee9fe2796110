use crate::error::ErrorResponse;
use crate::image_gen::{GenerationRequest, GenerationResult, ImageRelay, ModelInfo};
use actix_web::{HttpResponse, Responder, get, post, web};
use utoipa::OpenApi;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/generate_image",
    request_body = GenerationRequest,
    responses(
        (
            status = 200,
            description = "Generation outcome; relay failures carry success=false and an error",
            body = GenerationResult
        ),
        (status = 400, description = "Malformed request body", body = ErrorResponse)
    )
)]
#[post("/api/generate_image")]
pub async fn generate_image(
    relay: web::Data<ImageRelay>,
    req: web::Json<GenerationRequest>,
) -> impl Responder {
    let request_id = Uuid::new_v4();
    let request = req.into_inner();

    tracing::info!(
        "[{request_id}] Image generation requested with model index {}",
        request.model_index
    );

    let result = relay.generate(&request.prompt, request.model_index).await;

    if result.success {
        tracing::info!("[{request_id}] Image generation succeeded");
    } else {
        tracing::info!(
            "[{request_id}] Image generation failed: {}",
            result.error.as_deref().unwrap_or_default()
        );
    }

    HttpResponse::Ok().json(result)
}

#[utoipa::path(
    get,
    path = "/api/models",
    responses(
        (status = 200, description = "Selectable text-to-image models", body = [ModelInfo])
    )
)]
#[get("/api/models")]
pub async fn list_models(relay: web::Data<ImageRelay>) -> impl Responder {
    HttpResponse::Ok().json(relay.models())
}

#[derive(OpenApi)]
#[openapi(
    paths(generate_image, list_models),
    components(schemas(GenerationRequest, GenerationResult, ModelInfo, ErrorResponse))
)]
pub struct ImageApiDoc;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(generate_image).service(list_models);
}

use actix_web::{App, HttpServer, web};
use ai_relay::config::{ImageRelayConfig, ServerConfig};
use ai_relay::image_gen::{IMAGE_MODELS, ImageRelay};
use ai_relay::server::{self, image_routes};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    server::init_tracing();

    let config = ImageRelayConfig::from_env();
    if config.api_key.is_none() {
        tracing::warn!("HUGGINGFACE_API_KEY is not set, generation requests will be rejected");
    }

    std::fs::create_dir_all(&config.output_dir)?;
    tracing::info!("Saving generated images to {}", config.output_dir.display());

    for (index, model) in IMAGE_MODELS.iter().enumerate() {
        tracing::info!("Model {index}: {} ({})", model.name, model.id);
    }

    let bind = ServerConfig::from_env(5000);
    tracing::info!("Starting image relay at http://{}:{}/swagger-ui/", bind.host, bind.port);

    let relay = web::Data::new(ImageRelay::new(config));

    HttpServer::new(move || {
        App::new()
            .app_data(relay.clone())
            .app_data(server::json_config())
            .configure(image_routes::configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", image_routes::ImageApiDoc::openapi()),
            )
    })
    .bind((bind.host.as_str(), bind.port))?
    .run()
    .await
}

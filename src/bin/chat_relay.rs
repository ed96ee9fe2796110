use actix_web::{App, HttpServer, web};
use ai_relay::config::{ChatRelayConfig, ServerConfig};
use ai_relay::ollama::ChatRelay;
use ai_relay::server::{self, chat_routes};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    server::init_tracing();

    let config = ChatRelayConfig::from_env();
    tracing::info!("Relaying chat to {} (default model {})", config.base_url, config.default_model);

    let relay = ChatRelay::new(config);
    match relay.list_models().await {
        Ok(models) => tracing::info!("Available models: {}", models.join(", ")),
        Err(e) => tracing::warn!("Could not list Ollama models: {e}"),
    }

    let bind = ServerConfig::from_env(5000);
    tracing::info!("Starting chat relay at http://{}:{}/swagger-ui/", bind.host, bind.port);

    let relay = web::Data::new(relay);

    HttpServer::new(move || {
        App::new()
            .app_data(relay.clone())
            .app_data(server::json_config())
            .configure(chat_routes::configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", chat_routes::ChatApiDoc::openapi()),
            )
    })
    .bind((bind.host.as_str(), bind.port))?
    .run()
    .await
}

//! # ai-relay
//!
//! Thin HTTP relays in front of AI services.
//!
//! Two independent relays are provided, each a single request/response round
//! trip with no retries and no shared mutable state:
//!
//! - **Image generation**: forwards a prompt to the Hugging Face Inference API,
//!   returns the picture as an inline `data:image/png;base64,...` URI and keeps
//!   a timestamped PNG copy on disk.
//! - **Chat**: forwards a message plus optional conversation history to a local
//!   Ollama server and returns the assistant's reply with timing metadata.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! ai-relay = { version = "0.1", default-features = false }
//! ```
//!
//! ### Generating an image
//!
//! ```rust,no_run
//! use ai_relay::{ImageRelay, ImageRelayConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let relay = ImageRelay::new(ImageRelayConfig {
//!         api_key: Some("hf_...".to_string()),
//!         ..ImageRelayConfig::default()
//!     });
//!
//!     let result = relay.generate("a lighthouse at dusk, oil painting", 0).await;
//!     if result.success {
//!         println!("{}", result.message.unwrap_or_default());
//!     } else {
//!         eprintln!("{}", result.error.unwrap_or_default());
//!     }
//! }
//! ```
//!
//! ### Chatting with history
//!
//! ```rust,no_run
//! use ai_relay::{ChatMessage, ChatRelay, ChatRelayConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let relay = ChatRelay::new(ChatRelayConfig::default());
//!     let mut history: Vec<ChatMessage> = Vec::new();
//!
//!     let reply = relay.try_chat("Why is the sky blue?", Some(&mut history), "llama3").await?;
//!     println!("{} ({:?})", reply.reply, reply.elapsed);
//!     assert_eq!(history.len(), 2);
//!     Ok(())
//! }
//! ```
//!
//! ## Server Mode
//!
//! With the `server` feature (enabled by default) two binaries are built,
//! `image-relay` and `chat-relay`, each exposing its relay over actix-web with
//! Swagger UI at `/swagger-ui/`.

// Core modules - always available
pub mod chat;
pub mod config;
pub mod core;
pub mod error;
pub mod image_gen;
pub mod ollama;

// Server-specific modules - only when server feature is enabled
#[cfg(feature = "server")]
pub mod server;

#[cfg(test)]
mod test_support;

// Re-export commonly used types for easier access
pub use chat::{ChatMessage, ChatRole};
pub use config::{ChatRelayConfig, ImageRelayConfig, ServerConfig};
pub use error::{ApiError, ErrorResponse, RelayError};
pub use image_gen::{
    GeneratedImage, GenerationRequest, GenerationResult, IMAGE_MODELS, ImageModel, ImageRelay, ModelInfo,
};
pub use ollama::{
    ChatReply, ChatRelay, ChatRequest, ChatResult, HealthReport, HealthStatus, ModelsResponse,
};

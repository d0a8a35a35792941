//! Serves the chat UI and proxies `/api/chat` to Gemini.

#[macro_use]
extern crate tracing;

use std::process::ExitCode;

use persona_chat_core::{ModelClient, PromptOptions};
use persona_chat_gemini_model::{GeminiConfigBuilder, GeminiProvider};
use persona_chat_server::{AppState, ServerConfig, app};
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    debug!("starting with {config:?}");

    let mut gemini = GeminiConfigBuilder::with_api_key(config.api_key.clone());
    if let Some(base_url) = &config.gemini_base_url {
        gemini = gemini.with_base_url(base_url.clone());
    }
    if let Some(model) = &config.gemini_model {
        gemini = gemini.with_model(model.clone());
    }
    let model_client = ModelClient::new(GeminiProvider::new(gemini.build()));
    let state = AppState::new(
        model_client,
        PromptOptions {
            debug_persona: config.debug_persona,
        },
    );
    if !config.static_dir.join("index.html").is_file() {
        warn!(
            "no index.html in {}, the UI will not load",
            config.static_dir.display()
        );
    }
    let router = app(state, &config.static_dir);

    let listener =
        match TcpListener::bind((config.host.as_str(), config.port)).await {
            Ok(listener) => listener,
            Err(err) => {
                error!("failed to bind {}:{}: {err}", config.host, config.port);
                return ExitCode::FAILURE;
            }
        };
    info!("listening on http://{}:{}", config.host, config.port);

    if let Err(err) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("server error: {err}");
        return ExitCode::FAILURE;
    }
    info!("bye");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {err}");
    }
}

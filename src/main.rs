//! Lumen - personal-site AI assistant backend
//!
//! Serves the chat API for a portfolio website's assistant widget: a
//! conversation engine with tool calling backed by Google Gemini, a Last.fm
//! now-playing lookup, and SQLite-persisted conversation history.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod conversation;
mod core;
mod providers;
mod render;
mod routes;
mod tools;

use config::{prompts, Config};
use crate::core::{ChatEngine, ConversationStore, KvStore};
use providers::{GeminiEndpoint, ModelEndpoint, ProxyEndpoint};
use tools::{
    current_time::CurrentTimeTool,
    now_playing::{LastFmConfig, NowPlayingTool},
    RelayToolExecutor, ToolExecutor, ToolRegistry,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub engine: Arc<ChatEngine>,
    pub store: Arc<ConversationStore>,
    pub kv: Arc<KvStore>,
    pub model: Arc<dyn ModelEndpoint>,
    pub tools: Arc<ToolRegistry>,
    pub lastfm: Option<LastFmConfig>,
    pub http: reqwest::Client,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lumen_ai=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let kv = Arc::new(KvStore::new(&config.data_dir.join("lumen.db")).await?);
    let store = Arc::new(ConversationStore::load(kv.clone()).await?);

    let http = reqwest::Client::new();

    let lastfm = match (&config.lastfm_api_key, &config.lastfm_username) {
        (Some(api_key), Some(username)) => Some(LastFmConfig {
            api_key: api_key.clone(),
            username: username.clone(),
        }),
        _ => {
            tracing::warn!("Last.fm credentials not set; music lookups will answer softly");
            None
        }
    };

    let mut registry = ToolRegistry::new();
    registry.register(NowPlayingTool::new(http.clone(), lastfm.clone()));
    registry.register(CurrentTimeTool);
    tracing::info!("registered {} tool(s)", registry.len());

    let model: Arc<dyn ModelEndpoint> = match &config.model_proxy_url {
        Some(url) => {
            tracing::info!(%url, "model calls go through a remote relay");
            Arc::new(ProxyEndpoint::new(http.clone(), url.clone()))
        }
        None => {
            let api_key = config
                .gemini_api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("GEMINI_API_KEY environment variable not set"))?;

            let system_instruction = match &config.persona_file {
                Some(path) => {
                    let persona = prompts::load_persona(path)?;
                    tracing::info!(
                        "using persona '{}' from {}",
                        persona.persona.name,
                        path.display()
                    );
                    persona.system_prompt.content
                }
                None => prompts::system_instruction(&config.site_owner),
            };

            let mut gemini = GeminiEndpoint::new(
                http.clone(),
                api_key,
                system_instruction,
                registry.declarations(),
            );
            if let Some(base_url) = &config.gemini_base_url {
                gemini = gemini.with_base_url(base_url);
            }
            if let Some(model) = &config.gemini_model {
                gemini = gemini.with_model(model);
            }
            Arc::new(gemini)
        }
    };

    let registry = Arc::new(registry);
    let executor: Arc<dyn ToolExecutor> = match &config.tool_proxy_url {
        Some(url) => {
            tracing::info!(%url, "tool calls go through a remote relay");
            Arc::new(RelayToolExecutor::new(http.clone(), url.clone()))
        }
        None => registry.clone(),
    };
    let engine = Arc::new(ChatEngine::new(store.clone(), model.clone(), executor));

    let state = AppState {
        config,
        engine,
        store,
        kv,
        model,
        tools: registry,
        lastfm,
        http,
    };

    let app = Router::new()
        .merge(routes::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state);

    tracing::info!("lumen API running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

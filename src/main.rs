use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};

use career_assist::channels::CliChannel;
use career_assist::chat::{
    ChatRouteState, KeywordClassifier, LocalReplyService, ReplyService, SessionController,
    SessionRegistry, UuidIds, chat_routes,
};
use career_assist::config::{AssistantConfig, SurfaceMode};
use career_assist::error::ChannelError;

/// How often idle HTTP sessions are swept.
const PRUNE_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AssistantConfig::from_env()?;

    eprintln!("🤖 Career Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Reply latency: {:?}", config.reply_latency);
    eprintln!("   Reply timeout: {:?}", config.reply_timeout);
    eprintln!("   Max message: {} chars", config.max_message_chars);
    eprintln!("   Session idle timeout: {:?}", config.session_idle_timeout);

    // ── Reply backend ───────────────────────────────────────────────────
    let reply: Arc<dyn ReplyService> = Arc::new(
        LocalReplyService::new(Arc::new(KeywordClassifier::default_rules()))
            .with_latency(config.reply_latency)
            .with_max_chars(config.max_message_chars),
    );

    match config.mode {
        SurfaceMode::Cli => {
            eprintln!("   Mode: cli\n");
            let controller = Arc::new(SessionController::from_config(
                &config,
                reply,
                Arc::new(UuidIds),
            ));
            CliChannel::new(controller).run().await?;
        }
        SurfaceMode::Http => {
            let port = config.http_port;
            let cors = cors_layer(&config.allowed_origins);
            let registry = SessionRegistry::new(config, reply, Arc::new(UuidIds));
            let app = chat_routes(ChatRouteState {
                registry: Arc::clone(&registry),
            })
            .layer(cors);

            let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
                .await
                .map_err(|e| ChannelError::StartupFailed {
                    name: "http".to_string(),
                    reason: e.to_string(),
                })?;

            eprintln!("   Mode: http");
            eprintln!("   Chat API: http://0.0.0.0:{}/api/chat/sessions\n", port);
            tracing::info!(port, "Chat HTTP server started");

            // Spawn session pruning task
            let pruner = Arc::clone(&registry);
            let pruning_handle = tokio::spawn(async move {
                let idle_timeout = pruner.idle_timeout();
                let mut interval = tokio::time::interval(PRUNE_INTERVAL.min(idle_timeout));
                interval.tick().await; // Skip immediate first tick
                loop {
                    interval.tick().await;
                    pruner.prune_idle(idle_timeout).await;
                }
            });

            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await?;

            pruning_handle.abort();
            registry.close_all().await;
        }
    }

    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

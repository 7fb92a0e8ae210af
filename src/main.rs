use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spackbot::config::BotConfig;
use spackbot::git::SpackStyleFixer;
use spackbot::github::{BackoffConfig, HttpClient, OctocrabClient, RateLimitedClient};
use spackbot::handlers::{GitLabSettings, HandlerSettings, register_defaults};
use spackbot::mirror::{MirrorStore, S3MirrorStore};
use spackbot::router::Router;
use spackbot::server::{AppState, build_router};
use spackbot::webhooks::WebhookSecret;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spackbot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = BotConfig::from_env().context("loading configuration")?;
    info!(?config, "Starting spackbot");

    let github = OctocrabClient::from_token(config.github_token.clone())
        .context("building GitHub client")?;
    let github = RateLimitedClient::new(github, BackoffConfig::default());

    let gitlab = config.gitlab.as_ref().map(|gitlab| GitLabSettings {
        client: Arc::new(RateLimitedClient::new(
            HttpClient::default(),
            BackoffConfig::default(),
        )),
        token: gitlab.token.clone(),
        base_url: gitlab.base_url.clone(),
        project_url: gitlab.project_url.clone(),
        mirror: gitlab.mirror_bucket.as_ref().map(|bucket| {
            Arc::new(S3MirrorStore::from_env(bucket.clone())) as Arc<dyn MirrorStore>
        }),
    });

    let mut builder = Router::builder();
    register_defaults(
        &mut builder,
        HandlerSettings {
            bot_name: config.bot_name.clone(),
            gitlab,
            style_fixer: Arc::new(SpackStyleFixer::new(config.spack_upstream.clone())),
        },
    );
    let router = builder.build();
    for (route, handler) in router.routes() {
        info!(%route, handler, "Registered handler");
    }

    let state = AppState::new(
        router,
        Arc::new(github),
        WebhookSecret::new(config.webhook_secret.as_bytes()),
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!("listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("serving")?;
    Ok(())
}

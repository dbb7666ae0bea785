use anyhow::Context;
use sodia::{config::Settings, db, routes, services, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sodia=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env().context("invalid configuration")?;

    let pool = db::create_pool(&settings.database)
        .await
        .context("failed to open database")?;
    db::run_migrations(&pool)
        .await
        .context("failed to run migrations")?;

    let mailer = services::create_mailer(&settings.mail);
    let addr = settings.addr.clone();
    let environment = settings.environment.clone();

    let app = routes::build_router(AppState::new(settings, pool, mailer));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(env = %environment, "Server running on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

use bankroll_tracker::{api, config::Config, db::init_db, Repository};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };
    let repo = Arc::new(Repository::new(pool));

    if let Some(admin) = &config.bootstrap_admin {
        match repo.ensure_admin(&admin.username, &admin.email).await {
            Ok(user) => tracing::info!(user_id = %user.id, email = %user.email, "Bootstrap admin ready"),
            Err(e) => {
                eprintln!("Failed to seed bootstrap admin: {}", e);
                std::process::exit(1);
            }
        }
    }

    if config.stripe_webhook_secret.is_none() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET is not set, billing webhooks will be rejected");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = api::create_router(api::AppState::new(repo, config));

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
